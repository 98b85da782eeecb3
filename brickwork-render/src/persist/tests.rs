use super::*;
use euclid::{point3, vec3};
use pretty_assertions::assert_eq;
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor};

fn sample_camera() -> Camera {
    let mut camera = Camera::new(
        point3(1.0, 2.0, 3.0),
        point3(0.5, 0.25, -4.0),
        Viewport::new(320, 200),
    );
    camera.fov_y = 0.8;
    camera.near = 0.05;
    camera.projection = Projection::DepthOfField;
    camera.lens_radius = 0.3;
    camera.focal_distance = 7.5;
    camera.panini_squeeze = 0.25;
    camera.update_previous_state();
    camera
}

fn sample_settings() -> Settings {
    let mut settings = Settings::default();
    settings.path_tracing = false;
    settings.normals = true;
    settings.accumulate = true;
    settings.reprojection = false;
    settings.focus_pixel = [17, 23];
    settings.max_depth = 7;
    settings.exposure = 1.5;
    settings.tone_mapping = ToneMapping::Aces;
    settings.floor = Plane {
        y: -0.5,
        color: Rgb::new(0.1, 0.2, 0.3),
    };
    settings.automata.rule.spawn[26] = true;
    settings.automata.rule.start_state = 200;
    settings.automata.rule.neighbourhood = Neighbourhood::VonNeumann;
    settings.automata.radius = -3;
    settings.lights.push(Light::Spot {
        position: point3(1.0, 2.0, 3.0),
        direction: vec3(0.0, -1.0, 0.0),
        color: Rgb::new(1.0, 0.5, 0.25),
        intensity: 4.0,
        cutoff: 0.3,
        outer_cutoff: 0.5,
        attenuation: Attenuation {
            constant: 1.0,
            linear: 0.5,
            quadratic: 0.25,
        },
    });
    settings
}

fn camera_bytes() -> Vec<u8> {
    let mut bytes = Vec::new();
    save_camera(&mut bytes, &sample_camera()).unwrap();
    bytes
}

#[test]
fn camera_round_trip() {
    let loaded = load_camera(&mut Cursor::new(camera_bytes())).unwrap();
    assert_eq!(loaded, sample_camera());
}

#[test]
fn settings_round_trip() {
    let settings = sample_settings();
    // Every kind of light is represented.
    assert_eq!(settings.lights.len(), 5);
    let mut bytes = Vec::new();
    save_settings(&mut bytes, &settings).unwrap();
    assert_eq!(load_settings(&mut Cursor::new(bytes)).unwrap(), settings);
}

#[test]
fn layout_is_little_endian() {
    let bytes = camera_bytes();
    assert_eq!(&bytes[..4], b"BWCM");
    assert_eq!(&bytes[4..8], &[1, 0, 0, 0]);
    assert_eq!(&bytes[8..12], &1.0f32.to_le_bytes());
    // Header plus 16 words.
    assert_eq!(bytes.len(), 8 + 16 * 4);
    assert_eq!(&bytes[bytes.len() - 8..bytes.len() - 4], &320u32.to_le_bytes());
}

#[test]
fn wrong_magic() {
    let mut bytes = Vec::new();
    save_settings(&mut bytes, &Settings::default()).unwrap();
    assert!(matches!(
        load_camera(&mut Cursor::new(bytes)),
        Err(PersistError::WrongMagic { expected: "camera" })
    ));
}

#[test]
fn unsupported_version() {
    let mut bytes = camera_bytes();
    bytes[4] = 2;
    assert!(matches!(
        load_camera(&mut Cursor::new(bytes)),
        Err(PersistError::UnsupportedVersion(2))
    ));
}

#[test]
fn truncated() {
    let mut bytes = Vec::new();
    save_settings(&mut bytes, &sample_settings()).unwrap();
    for len in [0, 6, 40, bytes.len() - 1] {
        assert!(
            matches!(
                load_settings(&mut Cursor::new(&bytes[..len])),
                Err(PersistError::Truncated)
            ),
            "{len}"
        );
    }
}

#[test]
fn invalid_projection() {
    let mut bytes = camera_bytes();
    let index = bytes.len() - 12;
    bytes[index] = 9;
    assert!(matches!(
        load_camera(&mut Cursor::new(bytes)),
        Err(PersistError::InvalidValue("projection"))
    ));
}

#[test]
fn too_many_lights() {
    let mut settings = Settings::default();
    settings.lights = vec![
        Light::Ambient {
            color: Rgb::ONE,
            intensity: 1.0
        };
        MAX_LIGHTS + 1
    ];
    assert!(matches!(
        save_settings(&mut Vec::new(), &settings),
        Err(PersistError::TooManyLights(n)) if n == MAX_LIGHTS + 1
    ));
}

#[test]
fn file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("view.bwst");
    {
        let mut writer = BufWriter::new(File::create(&path).unwrap());
        save_settings(&mut writer, &sample_settings()).unwrap();
        save_camera(&mut writer, &sample_camera()).unwrap();
    }
    let mut reader = BufReader::new(File::open(&path).unwrap());
    assert_eq!(load_settings(&mut reader).unwrap(), sample_settings());
    assert_eq!(load_camera(&mut reader).unwrap(), sample_camera());
}
