use core::fmt;

use crate::math::Rgb;

/// The contents of one voxel cell: 24 bits of `0xRRGGBB` color in the low bits and an
/// 8-bit material table index in the high byte.
///
/// The value zero means the cell is empty. A voxel whose color bits are zero is always
/// stored as zero, whatever its material index, so that “has color” and “is filled” agree.
#[derive(Clone, Copy, Default, Eq, Hash, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(transparent)]
pub struct PackedVoxel(u32);

impl PackedVoxel {
    /// The empty voxel.
    pub const EMPTY: Self = Self(0);

    /// Mask selecting the color bits.
    pub const RGB_MASK: u32 = 0x00FF_FFFF;

    /// Packs a `0xRRGGBB` color with a material index.
    ///
    /// Bits of `rgb` above the low 24 are ignored.
    /// If the color is zero, the result is [`PackedVoxel::EMPTY`].
    ///
    /// ```
    /// # use brickwork_base::math::PackedVoxel;
    /// let v = PackedVoxel::new(0xff0000, 1);
    /// assert_eq!(v.rgb(), 0xff0000);
    /// assert_eq!(v.material_index(), 1);
    /// assert_eq!(PackedVoxel::new(0, 7), PackedVoxel::EMPTY);
    /// ```
    #[inline]
    pub const fn new(rgb: u32, material_index: u8) -> Self {
        let rgb = rgb & Self::RGB_MASK;
        if rgb == 0 {
            Self::EMPTY
        } else {
            Self(rgb | ((material_index as u32) << 24))
        }
    }

    /// Reinterprets a raw stored word.
    ///
    /// Unlike [`PackedVoxel::new`], this does not normalize a colorless word to zero;
    /// it is intended for words that were produced by this type.
    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the raw stored word.
    #[inline]
    pub const fn to_bits(self) -> u32 {
        self.0
    }

    /// Returns whether this is the empty voxel.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns the `0xRRGGBB` color bits.
    #[inline]
    pub const fn rgb(self) -> u32 {
        self.0 & Self::RGB_MASK
    }

    /// Returns the material table index stored in the top byte.
    #[inline]
    pub const fn material_index(self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Returns the color as a linear [`Rgb`] value with channels in 0 to 1.
    #[inline]
    pub fn albedo(self) -> Rgb {
        Rgb::from_packed(self.rgb())
    }
}

impl fmt::Debug for PackedVoxel {
    #[allow(clippy::missing_inline_in_public_items)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "PackedVoxel(EMPTY)")
        } else {
            write!(
                f,
                "PackedVoxel(#{:06x} m{})",
                self.rgb(),
                self.material_index()
            )
        }
    }
}
