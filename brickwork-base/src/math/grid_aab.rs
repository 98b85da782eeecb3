//! Axis-aligned integer-coordinate box volumes ([`GridAab`]).

use core::fmt;
use core::ops::Range;

use euclid::point3;

use crate::math::{Aab, Axis, FreeCoordinate, GridCoordinate, GridPoint, GridSize, GridVector};

/// An axis-aligned box with integer coordinates, whose volume is no larger than
/// [`usize::MAX`].
///
/// [`GridAab`]s are used to specify the extent of voxel and brick grids. Cell positions
/// are identified by their most negative corner, so a box contains a cell when
/// `lower <= cell < upper` on every axis.
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct GridAab {
    lower_bounds: GridPoint,
    /// Constructor checks ensure this is not smaller than `lower_bounds`.
    upper_bounds: GridPoint,
    /// Cached so that [`GridAab::linear_index`] need not recheck for overflow.
    volume: usize,
}

impl GridAab {
    /// Box of zero size at `[0, 0, 0]`.
    pub const ORIGIN_EMPTY: GridAab = GridAab {
        lower_bounds: point3(0, 0, 0),
        upper_bounds: point3(0, 0, 0),
        volume: 0,
    };

    /// Constructs a [`GridAab`] from coordinate lower bounds and sizes.
    ///
    /// Panics if the sizes are negative or the result would not be representable.
    /// Use [`GridAab::checked_from_lower_size`] when the input is not trusted.
    #[inline]
    #[track_caller]
    pub fn from_lower_size(lower_bounds: impl Into<GridPoint>, sizes: impl Into<GridSize>) -> Self {
        match Self::checked_from_lower_size(lower_bounds.into(), sizes.into()) {
            Ok(aab) => aab,
            Err(error) => panic!("{error}"),
        }
    }

    /// Constructs a [`GridAab`] from coordinate lower bounds and sizes.
    ///
    /// Returns [`Err`] if a size is negative, an upper bound would overflow, or the volume
    /// would not fit in [`usize`].
    ///
    /// ```
    /// # use brickwork_base::math::GridAab;
    /// assert!(GridAab::checked_from_lower_size([0, 0, 0], [16, 16, 16]).is_ok());
    /// assert!(GridAab::checked_from_lower_size([0, 0, 0], [-1, 16, 16]).is_err());
    /// assert!(GridAab::checked_from_lower_size([i32::MAX, 0, 0], [2, 1, 1]).is_err());
    /// ```
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn checked_from_lower_size(
        lower_bounds: impl Into<GridPoint>,
        sizes: impl Into<GridSize>,
    ) -> Result<Self, GridOverflowError> {
        let lower_bounds = lower_bounds.into();
        let sizes = sizes.into();
        let error = GridOverflowError {
            lower_bounds,
            size: sizes,
        };
        if sizes.width < 0 || sizes.height < 0 || sizes.depth < 0 {
            return Err(error);
        }
        let upper = |axis: Axis| lower_bounds[axis].checked_add(sizes[axis]);
        let (Some(ux), Some(uy), Some(uz)) = (upper(Axis::X), upper(Axis::Y), upper(Axis::Z))
        else {
            return Err(error);
        };
        let volume = (sizes.width as usize)
            .checked_mul(sizes.height as usize)
            .and_then(|area| area.checked_mul(sizes.depth as usize))
            .ok_or(error)?;
        Ok(Self {
            lower_bounds,
            upper_bounds: point3(ux, uy, uz),
            volume,
        })
    }

    /// Computes the volume of this box in cells.
    #[inline]
    pub const fn volume(&self) -> usize {
        self.volume
    }

    /// Returns whether the box contains no cells.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.volume == 0
    }

    /// Inclusive lower bounds on cell coordinates, or the most negative corner of the box.
    #[inline]
    pub const fn lower_bounds(&self) -> GridPoint {
        self.lower_bounds
    }

    /// Exclusive upper bounds on cell coordinates, or the most positive corner of the box.
    #[inline]
    pub const fn upper_bounds(&self) -> GridPoint {
        self.upper_bounds
    }

    /// Size of the box in each axis.
    #[inline]
    pub fn size(&self) -> GridSize {
        let extent = self.upper_bounds - self.lower_bounds;
        GridSize::new(extent.x, extent.y, extent.z)
    }

    /// The range of coordinates for cells within the box along the given axis.
    #[inline]
    pub fn axis_range(&self, axis: Axis) -> Range<GridCoordinate> {
        self.lower_bounds[axis]..self.upper_bounds[axis]
    }

    /// Returns whether the box includes the given cell in its volume.
    ///
    /// ```
    /// # use brickwork_base::math::GridAab;
    /// let b = GridAab::from_lower_size([4, 4, 4], [6, 6, 6]);
    /// assert!(!b.contains_cube([3, 5, 5].into()));
    /// assert!(b.contains_cube([4, 5, 5].into()));
    /// assert!(b.contains_cube([9, 5, 5].into()));
    /// assert!(!b.contains_cube([10, 5, 5].into()));
    /// ```
    #[inline]
    pub fn contains_cube(&self, cube: GridPoint) -> bool {
        Axis::ALL.into_iter().all(|axis| {
            cube[axis] >= self.lower_bounds[axis] && cube[axis] < self.upper_bounds[axis]
        })
    }

    /// Returns the row-major index of `cube` within this box, X varying fastest and Z
    /// slowest, or [`None`] if the cube is outside the box.
    ///
    /// ```
    /// # use brickwork_base::math::GridAab;
    /// let b = GridAab::from_lower_size([0, 0, 0], [8, 8, 8]);
    /// assert_eq!(b.linear_index([1, 2, 3].into()), Some(1 + 2 * 8 + 3 * 64));
    /// assert_eq!(b.linear_index([8, 0, 0].into()), None);
    /// ```
    #[inline]
    pub fn linear_index(&self, cube: GridPoint) -> Option<usize> {
        if !self.contains_cube(cube) {
            return None;
        }
        let size = self.size();
        let offset = cube - self.lower_bounds;
        // Cannot overflow since the volume was checked at construction.
        Some(
            offset.x as usize
                + size.width as usize * (offset.y as usize + size.height as usize * offset.z as usize),
        )
    }

    /// Inverse of [`GridAab::linear_index`].
    #[inline]
    pub fn cube_at_index(&self, index: usize) -> Option<GridPoint> {
        if index >= self.volume {
            return None;
        }
        let size = self.size();
        let (w, h) = (size.width as usize, size.height as usize);
        let offset = GridVector::new(
            (index % w) as GridCoordinate,
            ((index / w) % h) as GridCoordinate,
            (index / (w * h)) as GridCoordinate,
        );
        Some(self.lower_bounds + offset)
    }

    /// Iterate over all cells that this contains, in [`GridAab::linear_index`] order.
    ///
    /// ```
    /// # use brickwork_base::math::{GridAab, GridPoint};
    /// let b = GridAab::from_lower_size([10, 20, 30], [2, 1, 2]);
    /// assert_eq!(
    ///     b.interior_iter().collect::<Vec<GridPoint>>(),
    ///     vec![
    ///         GridPoint::new(10, 20, 30),
    ///         GridPoint::new(11, 20, 30),
    ///         GridPoint::new(10, 20, 31),
    ///         GridPoint::new(11, 20, 31),
    ///     ],
    /// );
    /// ```
    #[inline]
    pub fn interior_iter(self) -> impl ExactSizeIterator<Item = GridPoint> + Clone {
        (0..self.volume).map(move |index| {
            self.cube_at_index(index)
                .unwrap_or_else(|| unreachable!("index {index} within volume"))
        })
    }

    /// Returns the intersection of `self` and `other`, or [`None`] if it contains no cells.
    #[must_use]
    #[allow(clippy::missing_inline_in_public_items)]
    pub fn intersection(self, other: GridAab) -> Option<GridAab> {
        let lower = self.lower_bounds.max(other.lower_bounds);
        let upper = self.upper_bounds.min(other.upper_bounds);
        if lower.x >= upper.x || lower.y >= upper.y || lower.z >= upper.z {
            return None;
        }
        let extent = upper - lower;
        Self::checked_from_lower_size(lower, GridSize::new(extent.x, extent.y, extent.z)).ok()
    }

    /// Converts this box to floating-point coordinates.
    #[inline]
    pub fn to_free(self) -> Aab {
        Aab::from_lower_upper(
            self.lower_bounds.map(|c| c as FreeCoordinate),
            self.upper_bounds.map(|c| c as FreeCoordinate),
        )
    }
}

impl fmt::Debug for GridAab {
    #[allow(clippy::missing_inline_in_public_items)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let l = self.lower_bounds;
        let u = self.upper_bounds;
        write!(
            f,
            "GridAab({:?}..{:?}, {:?}..{:?}, {:?}..{:?})",
            l.x, u.x, l.y, u.y, l.z, u.z
        )
    }
}

/// Error when a [`GridAab`] cannot be constructed from the given input.
#[derive(Clone, Copy, Debug, displaydoc::Display, Eq, PartialEq)]
#[displaydoc("grid box of size {size:?} at {lower_bounds:?} is negative or overflows")]
pub struct GridOverflowError {
    lower_bounds: GridPoint,
    size: GridSize,
}

impl core::error::Error for GridOverflowError {}
