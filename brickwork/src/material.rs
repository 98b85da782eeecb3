//! Surface materials and the table that voxels refer to them through.

use core::fmt;
use std::sync::Arc;

use imgref::ImgVec;

use crate::math::{FreeVector, Rgb};

/// Optical properties of a voxel's surface and interior.
///
/// Two materials compare equal if their roughness, metallicity, transparency, and index
/// of refraction are equal; this is what [`MaterialTable::find_or_insert()`] deduplicates
/// on.
#[derive(Clone, Debug)]
#[allow(clippy::exhaustive_structs)]
pub struct Material {
    /// 0 is a perfect mirror; 1 is entirely diffuse.
    pub roughness: f32,
    /// 0 is a dielectric; 1 is a metal, which reflects with its own color.
    pub metallic: f32,
    /// 0 is opaque; 1 transmits all light that is not reflected.
    pub transparency: f32,
    /// Index of refraction, at least 1.
    pub ior: f32,
    /// Color of emitted light.
    pub emission_color: Rgb,
    /// Strength of emitted light; 0 means the material does not glow.
    pub emission_intensity: f32,
    /// Attenuation per unit distance of light passing through the material.
    pub absorption_coefficient: f32,
    /// Image applied to each voxel face.
    pub texture: Option<Texture>,
}

impl Material {
    /// The material used where no other is specified: a fully rough, opaque dielectric.
    pub const DEFAULT: Self = Self {
        roughness: 1.0,
        metallic: 0.0,
        transparency: 0.0,
        ior: 1.0,
        emission_color: Rgb::ONE,
        emission_intensity: 0.0,
        absorption_coefficient: 1.0,
        texture: None,
    };

    /// Light emitted by the surface.
    #[inline]
    pub fn emission(&self) -> Rgb {
        self.emission_color * self.emission_intensity
    }

    /// Fraction of light arriving from `view_direction` (pointing away from the surface)
    /// that is reflected specularly off a surface with the given unit `normal`.
    ///
    /// This is a microfacet estimate `D·G·F` for the mirror direction, which is the only
    /// specular direction the path tracer follows; there the half vector is the normal.
    /// With `α = roughness²` and `c = view_direction·normal`:
    ///
    /// * `D = c² / (c² + α(1 - c²))`, the GGX distribution normalized to 1 at `c = 1`;
    /// * `G = G₁(c)²` with Schlick-GGX `G₁(c) = c / (c(1 - k) + k)`, `k = α/2`;
    /// * `F = f₀ + (1 - f₀)(1 - c)⁵` (Schlick) with `f₀ = ((ior - 1)/(ior + 1))²`.
    ///
    /// A smooth surface reflects exactly the Fresnel fraction; rough ones reflect less,
    /// and nothing at grazing angles.
    pub fn reflectivity(&self, view_direction: FreeVector, normal: FreeVector) -> f32 {
        let c = view_direction.dot(normal).min(1.0);
        if c <= 0.0 {
            return 0.0;
        }
        let c2 = c * c;
        let alpha = self.roughness * self.roughness;

        let distribution = c2 / (c2 + alpha * (1.0 - c2));
        let k = alpha / 2.0;
        let g1 = c / (c * (1.0 - k) + k);
        let geometry = g1 * g1;
        let f0 = ((self.ior - 1.0) / (self.ior + 1.0)).powi(2);
        let fresnel = f0 + (1.0 - f0) * (1.0 - c).powi(5);

        (distribution * geometry * fresnel).clamp(0.0, 1.0)
    }

    /// Light of color `incident` after passing `distance` through this material
    /// (Beer–Lambert attenuation), scaled by the transparency.
    pub fn transmitted(&self, incident: Rgb, distance: f32) -> Rgb {
        if self.transparency <= 0.0 {
            return Rgb::ZERO;
        }
        incident * ((-self.absorption_coefficient * distance).exp() * self.transparency)
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl PartialEq for Material {
    fn eq(&self, other: &Self) -> bool {
        self.roughness == other.roughness
            && self.metallic == other.metallic
            && self.transparency == other.transparency
            && self.ior == other.ior
    }
}

// -------------------------------------------------------------------------------------------------

/// An image applied to voxel faces, sampled with the nearest texel.
#[derive(Clone)]
pub struct Texture {
    image: Arc<ImgVec<Rgb>>,
    /// If true, the texture is multiplied with the voxel's color; otherwise it replaces it.
    pub combine: bool,
}

impl Texture {
    /// Wraps an image. Texel `(0, 0)` is at `uv = [0, 0]`.
    pub fn new(image: ImgVec<Rgb>, combine: bool) -> Self {
        Self {
            image: Arc::new(image),
            combine,
        }
    }

    /// The image.
    pub fn image(&self) -> &ImgVec<Rgb> {
        &self.image
    }

    /// Returns the texel containing `uv`, clamping out-of-range coordinates to the edges.
    pub fn sample(&self, [u, v]: [f32; 2]) -> Rgb {
        let (width, height) = (self.image.width(), self.image.height());
        if width == 0 || height == 0 {
            return Rgb::MISSING_TEXTURE;
        }
        let x = ((u * width as f32) as usize).min(width - 1);
        let y = ((v * height as f32) as usize).min(height - 1);
        self.image[(x, y)]
    }
}

impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("width", &self.image.width())
            .field("height", &self.image.height())
            .field("combine", &self.combine)
            .finish_non_exhaustive()
    }
}

// -------------------------------------------------------------------------------------------------

/// The materials of a [`Scene`](crate::scene::Scene), indexed by the top byte of each
/// [`PackedVoxel`](crate::math::PackedVoxel).
///
/// The table always contains at least [`Material::DEFAULT`] at index 0 and never
/// more than 256 entries.
#[derive(Clone, Debug, PartialEq)]
pub struct MaterialTable {
    materials: Vec<Material>,
}

impl MaterialTable {
    /// Maximum number of materials, since the index is stored in 8 bits.
    pub const CAPACITY: usize = 256;

    /// Constructs a table containing only the default material.
    pub fn new() -> Self {
        Self {
            materials: vec![Material::DEFAULT],
        }
    }

    /// Returns the number of materials.
    #[inline]
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    /// Always false; present for API regularity.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Returns the material with the given index, if there is one.
    #[inline]
    pub fn get(&self, index: u8) -> Option<&Material> {
        self.materials.get(usize::from(index))
    }

    /// Returns the material with the given index, or [`Material::DEFAULT`] if there is
    /// none.
    #[inline]
    pub fn get_or_default(&self, index: u8) -> &Material {
        static DEFAULT: Material = Material::DEFAULT;
        self.get(index).unwrap_or(&DEFAULT)
    }

    /// Returns mutable access to an existing material.
    pub fn get_mut(&mut self, index: u8) -> Option<&mut Material> {
        self.materials.get_mut(usize::from(index))
    }

    /// Iterates over all materials in index order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Material> + '_ {
        self.materials.iter()
    }

    /// Returns the index of a material equal to `material`, adding it if there is none.
    pub fn find_or_insert(&mut self, material: Material) -> Result<u8, MaterialTableFullError> {
        if let Some(index) = self.materials.iter().position(|m| *m == material) {
            return Ok(index as u8);
        }
        if self.materials.len() >= Self::CAPACITY {
            return Err(MaterialTableFullError);
        }
        self.materials.push(material);
        Ok((self.materials.len() - 1) as u8)
    }

    /// Removes every material except index 0, which is reset to the default.
    pub fn clear(&mut self) {
        self.materials.clear();
        self.materials.push(Material::DEFAULT);
    }
}

impl Default for MaterialTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Error returned by [`MaterialTable::find_or_insert()`] when all 256 indices are in use.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[error("material table is full ({} entries)", MaterialTable::CAPACITY)]
#[non_exhaustive]
pub struct MaterialTableFullError;
