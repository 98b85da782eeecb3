//! Saving and loading [`Camera`]s and [`Settings`] in a compact binary format.
//!
//! Each file is a 4-byte magic number, a little-endian `u32` format version, and then a
//! sequence of fixed-layout records whose fields are all 32-bit little-endian words.
//! Settings files are followed by one record per light.

use std::io::{self, Read, Write};

use brickwork::automata::Neighbourhood;
use brickwork::light::{Attenuation, Light};
use brickwork::math::Rgb;
use brickwork::settings::{Plane, Settings, ToneMapping};
use bytemuck::{Pod, Zeroable};
use euclid::{Point3D, Vector3D};

use crate::camera::{Camera, Projection, Viewport};

#[cfg(test)]
mod tests;

const CAMERA_MAGIC: [u8; 4] = *b"BWCM";
const SETTINGS_MAGIC: [u8; 4] = *b"BWST";
/// Version written by this library, and the only one it reads.
pub const FORMAT_VERSION: u32 = 1;
/// Largest number of lights a settings file may contain.
pub const MAX_LIGHTS: usize = 1024;

/// Error from [`load_camera()`], [`load_settings()`], or their saving counterparts.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PersistError {
    /// The data does not start with the expected magic number.
    #[error("not a saved {expected}")]
    WrongMagic {
        /// What kind of data was expected.
        expected: &'static str,
    },
    /// The data is in a format version this library does not understand.
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u32),
    /// The data ended before all records were read.
    #[error("saved data is truncated")]
    Truncated,
    /// A field has a value which does not correspond to anything.
    #[error("invalid value for {0}")]
    InvalidValue(&'static str),
    /// There are more lights than [`MAX_LIGHTS`].
    #[error("{0} lights is more than the supported {MAX_LIGHTS}")]
    TooManyLights(usize),
    /// Reading or writing failed.
    #[error("I/O error")]
    Io(#[source] io::Error),
}

impl From<io::Error> for PersistError {
    fn from(error: io::Error) -> Self {
        if error.kind() == io::ErrorKind::UnexpectedEof {
            Self::Truncated
        } else {
            Self::Io(error)
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// Writes `camera`, including its viewport and lens parameters but not its motion since
/// the previous frame.
pub fn save_camera(writer: &mut impl Write, camera: &Camera) -> Result<(), PersistError> {
    let viewport = camera.viewport();
    let record = CameraRecord {
        position: camera.position.to_array(),
        target: camera.target.to_array(),
        fov_y: camera.fov_y,
        near: camera.near,
        far: camera.far,
        lens_radius: camera.lens_radius,
        focal_distance: camera.focal_distance,
        panini_distance: camera.panini_distance,
        panini_squeeze: camera.panini_squeeze,
        projection: match camera.projection {
            Projection::Pinhole => 0,
            Projection::DepthOfField => 1,
            Projection::Panini => 2,
        },
        width: viewport.width,
        height: viewport.height,
    };
    write_header(writer, CAMERA_MAGIC)?;
    write_record(writer, &record)?;
    Ok(())
}

/// Reads a camera written by [`save_camera()`]. The camera starts out not moving.
pub fn load_camera(reader: &mut impl Read) -> Result<Camera, PersistError> {
    read_header(reader, CAMERA_MAGIC, "camera")?;
    let record: CameraRecord = read_record(reader)?;
    let mut camera = Camera::new(
        Point3D::from(record.position),
        Point3D::from(record.target),
        Viewport::new(record.width, record.height),
    );
    camera.fov_y = record.fov_y;
    camera.near = record.near;
    camera.far = record.far;
    camera.lens_radius = record.lens_radius;
    camera.focal_distance = record.focal_distance;
    camera.panini_distance = record.panini_distance;
    camera.panini_squeeze = record.panini_squeeze;
    camera.projection = match record.projection {
        0 => Projection::Pinhole,
        1 => Projection::DepthOfField,
        2 => Projection::Panini,
        _ => return Err(PersistError::InvalidValue("projection")),
    };
    camera.update_previous_state();
    Ok(camera)
}

/// Writes every field of `settings`.
pub fn save_settings(writer: &mut impl Write, settings: &Settings) -> Result<(), PersistError> {
    let light_count = settings.lights.len();
    if light_count > MAX_LIGHTS {
        return Err(PersistError::TooManyLights(light_count));
    }
    let lights = settings
        .lights
        .iter()
        .map(LightRecord::new)
        .collect::<Result<Vec<_>, _>>()?;
    let record = SettingsRecord::new(settings, light_count as u32)?;

    write_header(writer, SETTINGS_MAGIC)?;
    write_record(writer, &record)?;
    for light in &lights {
        write_record(writer, light)?;
    }
    Ok(())
}

/// Reads settings written by [`save_settings()`]. They are returned as written, without
/// [repair](Settings::repair).
pub fn load_settings(reader: &mut impl Read) -> Result<Settings, PersistError> {
    read_header(reader, SETTINGS_MAGIC, "settings")?;
    let record: SettingsRecord = read_record(reader)?;
    let light_count = record.light_count as usize;
    if light_count > MAX_LIGHTS {
        return Err(PersistError::TooManyLights(light_count));
    }
    let mut settings = record.to_settings()?;
    settings.lights = (0..light_count)
        .map(|_| read_record::<LightRecord>(reader)?.to_light())
        .collect::<Result<_, _>>()?;
    Ok(settings)
}

// -------------------------------------------------------------------------------------------------

fn write_header(writer: &mut impl Write, magic: [u8; 4]) -> io::Result<()> {
    writer.write_all(&magic)?;
    writer.write_all(&FORMAT_VERSION.to_le_bytes())
}

fn read_header(
    reader: &mut impl Read,
    magic: [u8; 4],
    expected: &'static str,
) -> Result<(), PersistError> {
    let mut found = [0; 4];
    reader.read_exact(&mut found)?;
    if found != magic {
        return Err(PersistError::WrongMagic { expected });
    }
    let mut version = [0; 4];
    reader.read_exact(&mut version)?;
    match u32::from_le_bytes(version) {
        FORMAT_VERSION => Ok(()),
        other => Err(PersistError::UnsupportedVersion(other)),
    }
}

/// Writes a record, which must consist of 32-bit fields only, as little-endian words.
fn write_record<R: Pod>(writer: &mut impl Write, record: &R) -> io::Result<()> {
    for word in bytemuck::must_cast_slice::<R, u32>(core::slice::from_ref(record)) {
        writer.write_all(&word.to_le_bytes())?;
    }
    Ok(())
}

fn read_record<R: Pod>(reader: &mut impl Read) -> Result<R, PersistError> {
    let mut record = R::zeroed();
    for word in bytemuck::must_cast_slice_mut::<R, u32>(core::slice::from_mut(&mut record)) {
        let mut bytes = [0; 4];
        reader.read_exact(&mut bytes)?;
        *word = u32::from_le_bytes(bytes);
    }
    Ok(record)
}

// -------------------------------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[repr(C)]
struct CameraRecord {
    position: [f32; 3],
    target: [f32; 3],
    fov_y: f32,
    near: f32,
    far: f32,
    lens_radius: f32,
    focal_distance: f32,
    panini_distance: f32,
    panini_squeeze: f32,
    projection: u32,
    width: u32,
    height: u32,
}

bitflags::bitflags! {
    /// The `bool` fields of [`Settings`].
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    struct SettingsFlags: u32 {
        const PATH_TRACING = 1 << 0;
        const STEP_THROUGH = 1 << 1;
        const NORMALS = 1 << 2;
        const UV = 1 << 3;
        const DEBUG_DRAW = 1 << 4;
        const DEBUG_LINES = 1 << 5;
        const ACCUMULATE = 1 << 6;
        const REPROJECTION = 1 << 7;
        const ANTI_ALIASING = 1 << 8;
        const JITTER = 1 << 9;
        const FOCUS_CENTER = 1 << 10;
        const FOCUS_MOUSE = 1 << 11;
        const ENVIRONMENT_LIGHT = 1 << 12;
        const USE_HDR = 1 << 13;
        const RENDER_FLOOR = 1 << 14;
    }
}

#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[repr(C)]
struct SettingsRecord {
    flags: u32,
    anti_aliasing_samples: u32,
    focus_pixel: [u32; 2],
    max_depth: u32,
    min_depth_russian_roulette: u32,
    russian_roulette_threshold: f32,
    reprojection_depth_threshold: f32,
    reprojection_normal_threshold: f32,
    reprojection_blend: f32,
    exposure: f32,
    tone_mapping: u32,
    floor_y: f32,
    floor_color: [f32; 3],
    sun_size: f32,
    sky_zenith: [f32; 3],
    sky_horizon: [f32; 3],
    ground_color: [f32; 3],
    /// Bit `n` is set if a live cell with `n` neighbours survives.
    survival: u32,
    /// Bit `n` is set if a dead cell with `n` neighbours comes alive.
    spawn: u32,
    start_state: u32,
    neighbourhood: u32,
    probability: f32,
    fps: f32,
    radius: i32,
    light_count: u32,
}

impl SettingsRecord {
    fn new(s: &Settings, light_count: u32) -> Result<Self, PersistError> {
        let mut flags = SettingsFlags::empty();
        for (flag, value) in [
            (SettingsFlags::PATH_TRACING, s.path_tracing),
            (SettingsFlags::STEP_THROUGH, s.step_through),
            (SettingsFlags::NORMALS, s.normals),
            (SettingsFlags::UV, s.uv),
            (SettingsFlags::DEBUG_DRAW, s.debug_draw),
            (SettingsFlags::DEBUG_LINES, s.debug_lines),
            (SettingsFlags::ACCUMULATE, s.accumulate),
            (SettingsFlags::REPROJECTION, s.reprojection),
            (SettingsFlags::ANTI_ALIASING, s.anti_aliasing),
            (SettingsFlags::JITTER, s.jitter),
            (SettingsFlags::FOCUS_CENTER, s.focus_center),
            (SettingsFlags::FOCUS_MOUSE, s.focus_mouse),
            (SettingsFlags::ENVIRONMENT_LIGHT, s.environment_light),
            (SettingsFlags::USE_HDR, s.use_hdr),
            (SettingsFlags::RENDER_FLOOR, s.render_floor),
        ] {
            flags.set(flag, value);
        }
        let rule = &s.automata.rule;

        Ok(Self {
            flags: flags.bits(),
            anti_aliasing_samples: s.anti_aliasing_samples,
            focus_pixel: s.focus_pixel,
            max_depth: s.max_depth,
            min_depth_russian_roulette: s.min_depth_russian_roulette,
            russian_roulette_threshold: s.russian_roulette_threshold,
            reprojection_depth_threshold: s.reprojection_depth_threshold,
            reprojection_normal_threshold: s.reprojection_normal_threshold,
            reprojection_blend: s.reprojection_blend,
            exposure: s.exposure,
            tone_mapping: match s.tone_mapping {
                ToneMapping::None => 0,
                ToneMapping::Reinhard => 1,
                ToneMapping::ReinhardModified => 2,
                ToneMapping::Uncharted2 => 3,
                ToneMapping::Aces => 4,
                _ => return Err(PersistError::InvalidValue("tone_mapping")),
            },
            floor_y: s.floor.y,
            floor_color: s.floor.color.into(),
            sun_size: s.sun_size,
            sky_zenith: s.sky_zenith.into(),
            sky_horizon: s.sky_horizon.into(),
            ground_color: s.ground_color.into(),
            survival: counts_to_bits(&rule.survival),
            spawn: counts_to_bits(&rule.spawn),
            start_state: u32::from(rule.start_state),
            neighbourhood: match rule.neighbourhood {
                Neighbourhood::Moore => 0,
                Neighbourhood::VonNeumann => 1,
            },
            probability: s.automata.probability,
            fps: s.automata.fps,
            radius: s.automata.radius,
            light_count,
        })
    }

    fn to_settings(self) -> Result<Settings, PersistError> {
        let flags = SettingsFlags::from_bits(self.flags)
            .ok_or(PersistError::InvalidValue("flags"))?;
        let mut s = Settings::default();
        s.path_tracing = flags.contains(SettingsFlags::PATH_TRACING);
        s.step_through = flags.contains(SettingsFlags::STEP_THROUGH);
        s.normals = flags.contains(SettingsFlags::NORMALS);
        s.uv = flags.contains(SettingsFlags::UV);
        s.debug_draw = flags.contains(SettingsFlags::DEBUG_DRAW);
        s.debug_lines = flags.contains(SettingsFlags::DEBUG_LINES);
        s.accumulate = flags.contains(SettingsFlags::ACCUMULATE);
        s.reprojection = flags.contains(SettingsFlags::REPROJECTION);
        s.anti_aliasing = flags.contains(SettingsFlags::ANTI_ALIASING);
        s.jitter = flags.contains(SettingsFlags::JITTER);
        s.focus_center = flags.contains(SettingsFlags::FOCUS_CENTER);
        s.focus_mouse = flags.contains(SettingsFlags::FOCUS_MOUSE);
        s.environment_light = flags.contains(SettingsFlags::ENVIRONMENT_LIGHT);
        s.use_hdr = flags.contains(SettingsFlags::USE_HDR);
        s.render_floor = flags.contains(SettingsFlags::RENDER_FLOOR);

        s.anti_aliasing_samples = self.anti_aliasing_samples;
        s.focus_pixel = self.focus_pixel;
        s.max_depth = self.max_depth;
        s.min_depth_russian_roulette = self.min_depth_russian_roulette;
        s.russian_roulette_threshold = self.russian_roulette_threshold;
        s.reprojection_depth_threshold = self.reprojection_depth_threshold;
        s.reprojection_normal_threshold = self.reprojection_normal_threshold;
        s.reprojection_blend = self.reprojection_blend;
        s.exposure = self.exposure;
        s.tone_mapping = match self.tone_mapping {
            0 => ToneMapping::None,
            1 => ToneMapping::Reinhard,
            2 => ToneMapping::ReinhardModified,
            3 => ToneMapping::Uncharted2,
            4 => ToneMapping::Aces,
            _ => return Err(PersistError::InvalidValue("tone_mapping")),
        };
        s.floor = Plane {
            y: self.floor_y,
            color: Rgb::from(self.floor_color),
        };
        s.sun_size = self.sun_size;
        s.sky_zenith = Rgb::from(self.sky_zenith);
        s.sky_horizon = Rgb::from(self.sky_horizon);
        s.ground_color = Rgb::from(self.ground_color);

        let rule = &mut s.automata.rule;
        rule.survival = bits_to_counts(self.survival)?;
        rule.spawn = bits_to_counts(self.spawn)?;
        rule.start_state = u8::try_from(self.start_state)
            .map_err(|_| PersistError::InvalidValue("start_state"))?;
        rule.neighbourhood = match self.neighbourhood {
            0 => Neighbourhood::Moore,
            1 => Neighbourhood::VonNeumann,
            _ => return Err(PersistError::InvalidValue("neighbourhood")),
        };
        s.automata.probability = self.probability;
        s.automata.fps = self.fps;
        s.automata.radius = self.radius;
        Ok(s)
    }
}

fn counts_to_bits(table: &[bool; 27]) -> u32 {
    table
        .iter()
        .enumerate()
        .filter(|&(_, &set)| set)
        .fold(0, |bits, (count, _)| bits | (1 << count))
}

fn bits_to_counts(bits: u32) -> Result<[bool; 27], PersistError> {
    if bits >> 27 != 0 {
        return Err(PersistError::InvalidValue("neighbour counts"));
    }
    Ok(core::array::from_fn(|count| bits & (1 << count) != 0))
}

#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[repr(C)]
struct LightRecord {
    kind: u32,
    position: [f32; 3],
    direction: [f32; 3],
    rotation: [f32; 3],
    color: [f32; 3],
    intensity: f32,
    attenuation: [f32; 3],
    cutoff: f32,
    outer_cutoff: f32,
    size: [f32; 2],
    samples: u32,
}

impl LightRecord {
    const AMBIENT: u32 = 0;
    const POINT: u32 = 1;
    const SPOT: u32 = 2;
    const AREA: u32 = 3;
    const DIRECTIONAL: u32 = 4;

    fn new(light: &Light) -> Result<Self, PersistError> {
        let base = Self {
            color: light.color().into(),
            intensity: light.intensity(),
            ..Self::zeroed()
        };
        let attenuation = |a: &Attenuation| [a.constant, a.linear, a.quadratic];
        Ok(match light {
            Light::Ambient { .. } => Self {
                kind: Self::AMBIENT,
                ..base
            },
            Light::Point {
                position,
                attenuation: a,
                ..
            } => Self {
                kind: Self::POINT,
                position: position.to_array(),
                attenuation: attenuation(a),
                ..base
            },
            Light::Spot {
                position,
                direction,
                cutoff,
                outer_cutoff,
                attenuation: a,
                ..
            } => Self {
                kind: Self::SPOT,
                position: position.to_array(),
                direction: direction.to_array(),
                cutoff: *cutoff,
                outer_cutoff: *outer_cutoff,
                attenuation: attenuation(a),
                ..base
            },
            Light::Area {
                position,
                size,
                rotation,
                samples,
                ..
            } => Self {
                kind: Self::AREA,
                position: position.to_array(),
                rotation: rotation.to_array(),
                size: *size,
                samples: *samples,
                ..base
            },
            Light::Directional { direction, .. } => Self {
                kind: Self::DIRECTIONAL,
                direction: direction.to_array(),
                ..base
            },
            _ => return Err(PersistError::InvalidValue("light")),
        })
    }

    fn to_light(self) -> Result<Light, PersistError> {
        let color = Rgb::from(self.color);
        let intensity = self.intensity;
        let [constant, linear, quadratic] = self.attenuation;
        let attenuation = Attenuation {
            constant,
            linear,
            quadratic,
        };
        Ok(match self.kind {
            Self::AMBIENT => Light::Ambient { color, intensity },
            Self::POINT => Light::Point {
                position: Point3D::from(self.position),
                color,
                intensity,
                attenuation,
            },
            Self::SPOT => Light::Spot {
                position: Point3D::from(self.position),
                direction: Vector3D::from(self.direction),
                color,
                intensity,
                cutoff: self.cutoff,
                outer_cutoff: self.outer_cutoff,
                attenuation,
            },
            Self::AREA => Light::Area {
                position: Point3D::from(self.position),
                size: self.size,
                rotation: Vector3D::from(self.rotation),
                color,
                intensity,
                samples: self.samples,
            },
            Self::DIRECTIONAL => Light::Directional {
                direction: Vector3D::from(self.direction),
                color,
                intensity,
            },
            _ => return Err(PersistError::InvalidValue("light kind")),
        })
    }
}
