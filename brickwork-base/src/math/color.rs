//! Color data types. This module is private but reexported by its parent.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign, Div, DivAssign, Mul, Sub};

use euclid::{Vector3D, vec3};

/// A floating-point RGB color value.
///
/// * Color components are linear (gamma = 1).
/// * Components are nominally in the range 0 to 1, but radiance values produced by
///   the integrator are unbounded until tone mapped.
#[derive(Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rgb(Vector3D<f32, Intensity>);

/// Unit-of-measure type for vectors that contain color channels.
#[derive(Debug, Eq, PartialEq)]
pub enum Intensity {}

impl Rgb {
    /// Black; the constant equal to `Rgb::new(0., 0., 0.)`.
    pub const ZERO: Rgb = Rgb(vec3(0.0, 0.0, 0.0));
    /// Nominal white; the constant equal to `Rgb::new(1., 1., 1.)`.
    pub const ONE: Rgb = Rgb(vec3(1.0, 1.0, 1.0));
    /// The color reported for a textured surface whose texture is missing.
    pub const MISSING_TEXTURE: Rgb = Rgb(vec3(1.0, 0.0, 1.0));

    /// Constructs a color from components.
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self(vec3(r, g, b))
    }

    /// Constructs a shade of gray.
    #[inline]
    pub const fn from_luminance(luminance: f32) -> Self {
        Self::new(luminance, luminance, luminance)
    }

    /// Unpacks a `0xRRGGBB` color, mapping each 8-bit channel to the range 0 to 1.
    #[inline]
    pub fn from_packed(rgb: u32) -> Self {
        let channel = |shift: u32| f32::from(((rgb >> shift) & 0xFF) as u8) / 255.0;
        Self::new(channel(16), channel(8), channel(0))
    }

    /// Packs the color as `0xRRGGBB`, clamping each channel to the range 0 to 1.
    #[inline]
    pub fn to_packed(self) -> u32 {
        let [r, g, b] = self.to_srgb8_linear();
        (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
    }

    /// Returns the red color component.
    #[inline]
    pub const fn red(self) -> f32 {
        self.0.x
    }
    /// Returns the green color component.
    #[inline]
    pub const fn green(self) -> f32 {
        self.0.y
    }
    /// Returns the blue color component.
    #[inline]
    pub const fn blue(self) -> f32 {
        self.0.z
    }

    /// Combines the color components to produce their luminance.
    #[inline]
    pub fn luminance(self) -> f32 {
        // Rec. 709 coefficients
        self.red() * 0.2126 + self.green() * 0.7152 + self.blue() * 0.0722
    }

    /// Squared length of the color considered as a 3-vector.
    #[inline]
    pub fn length_squared(self) -> f32 {
        self.0.square_length()
    }

    /// Scales the color so that its length as a 3-vector is `length`.
    /// Black is left unchanged.
    #[inline]
    #[must_use]
    pub fn with_length(self, length: f32) -> Self {
        let current = self.0.length();
        if current > 0.0 {
            Self(self.0 * (length / current))
        } else {
            self
        }
    }

    /// Applies a function to each component.
    #[inline]
    #[must_use]
    pub fn map(self, mut f: impl FnMut(f32) -> f32) -> Self {
        Self::new(f(self.red()), f(self.green()), f(self.blue()))
    }

    /// Linear interpolation; `t = 0` returns `self` and `t = 1` returns `other`.
    #[inline]
    #[must_use]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        Self(self.0.lerp(other.0, t))
    }

    /// Clamps each component to the range 0 to 1.
    #[inline]
    #[must_use]
    pub fn clamp01(self) -> Self {
        self.map(|c| c.clamp(0.0, 1.0))
    }

    /// Returns whether every component is exactly zero.
    #[inline]
    pub fn is_black(self) -> bool {
        self == Self::ZERO
    }

    /// Converts to 8-bit channels without any transfer function, clamping to 0 to 1.
    #[inline]
    pub fn to_srgb8_linear(self) -> [u8; 3] {
        let c = self.clamp01();
        [c.red(), c.green(), c.blue()].map(|x| (x * 255.0).round() as u8)
    }

    /// Converts to 8-bit RGBA with full opacity, without any transfer function.
    #[inline]
    pub fn to_rgba8(self) -> [u8; 4] {
        let [r, g, b] = self.to_srgb8_linear();
        [r, g, b, 255]
    }
}

impl From<[f32; 3]> for Rgb {
    #[inline]
    fn from([r, g, b]: [f32; 3]) -> Self {
        Self::new(r, g, b)
    }
}
impl From<Rgb> for [f32; 3] {
    #[inline]
    fn from(value: Rgb) -> Self {
        value.0.to_array()
    }
}
impl From<Vector3D<f32, Intensity>> for Rgb {
    #[inline]
    fn from(value: Vector3D<f32, Intensity>) -> Self {
        Self(value)
    }
}

impl Add<Rgb> for Rgb {
    type Output = Self;
    #[inline]
    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}
impl AddAssign<Rgb> for Rgb {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}
impl Sub<Rgb> for Rgb {
    type Output = Self;
    #[inline]
    fn sub(self, other: Self) -> Self {
        Self(self.0 - other.0)
    }
}
/// Multiplies two color values componentwise.
impl Mul<Rgb> for Rgb {
    type Output = Self;
    #[inline]
    fn mul(self, other: Rgb) -> Self {
        Self(self.0.component_mul(other.0))
    }
}
impl Mul<f32> for Rgb {
    type Output = Self;
    #[inline]
    fn mul(self, scalar: f32) -> Self {
        Self(self.0 * scalar)
    }
}
impl Div<f32> for Rgb {
    type Output = Self;
    #[inline]
    fn div(self, scalar: f32) -> Self {
        Self(self.0 / scalar)
    }
}
impl DivAssign<f32> for Rgb {
    #[inline]
    fn div_assign(&mut self, scalar: f32) {
        self.0 /= scalar;
    }
}

impl Sum for Rgb {
    #[inline]
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |a, b| a + b)
    }
}

impl fmt::Debug for Rgb {
    #[allow(clippy::missing_inline_in_public_items)]
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            fmt,
            "Rgb({:?}, {:?}, {:?})",
            self.red(),
            self.green(),
            self.blue()
        )
    }
}
