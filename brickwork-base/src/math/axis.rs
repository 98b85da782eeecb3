use core::fmt;

use crate::math::Rgb;

/// Enumeration of the axes of three-dimensional space.
///
/// Can be used to infallibly index 3-component arrays and vectors.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
}

impl Axis {
    /// All three axes in the standard order, [X, Y, Z].
    ///
    /// This is also the order in which ties between axes are broken during traversal.
    pub const ALL: [Self; 3] = [Self::X, Self::Y, Self::Z];

    /// Returns the color used to draw this axis in debug overlays.
    ///
    /// * X = red
    /// * Y = green
    /// * Z = blue
    #[mutants::skip]
    #[inline]
    pub fn color(self) -> Rgb {
        match self {
            Axis::X => Rgb::new(1.0, 0.0, 0.0),
            Axis::Y => Rgb::new(0.0, 1.0, 0.0),
            Axis::Z => Rgb::new(0.0, 0.0, 1.0),
        }
    }

    /// Convert the axis to a number for indexing 3-element arrays.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns the unit vector pointing along the positive direction of this axis.
    #[inline]
    pub fn unit_vector(self) -> crate::math::FreeVector {
        let mut v = crate::math::FreeVector::zero();
        v[self] = 1.0;
        v
    }

    /// Maps X to Y, Y to Z, and Z to X.
    #[inline]
    #[must_use]
    pub const fn increment(self) -> Self {
        match self {
            Axis::X => Axis::Y,
            Axis::Y => Axis::Z,
            Axis::Z => Axis::X,
        }
    }

    /// Maps X to Z, Y to X, and Z to Y.
    #[inline]
    #[must_use]
    pub const fn decrement(self) -> Self {
        match self {
            Axis::X => Axis::Z,
            Axis::Y => Axis::X,
            Axis::Z => Axis::Y,
        }
    }
}

/// Format the axis as one of the strings "x", "y", or "z" (lowercase).
impl fmt::LowerHex for Axis {
    #[allow(clippy::missing_inline_in_public_items)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        })
    }
}
/// Format the axis as one of the strings "X", "Y", or "Z" (uppercase).
impl fmt::UpperHex for Axis {
    #[allow(clippy::missing_inline_in_public_items)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
        })
    }
}

impl From<Axis> for usize {
    #[inline]
    fn from(value: Axis) -> Self {
        value as usize
    }
}

mod impl_index_axis {
    use super::Axis;
    use core::ops;

    impl<T> ops::Index<Axis> for [T; 3] {
        type Output = T;

        #[inline]
        fn index(&self, index: Axis) -> &Self::Output {
            &self[index as usize]
        }
    }
    impl<T> ops::IndexMut<Axis> for [T; 3] {
        #[inline]
        fn index_mut(&mut self, index: Axis) -> &mut Self::Output {
            &mut self[index as usize]
        }
    }

    macro_rules! impl_xyz_e {
        ($x:ident $y:ident $z:ident, $($type:tt)*) => {
            impl<T, U> ops::Index<Axis> for $($type)*<T, U> {
                type Output = T;

                #[inline]
                fn index(&self, index: Axis) -> &Self::Output {
                    match index {
                        Axis::X => &self.$x,
                        Axis::Y => &self.$y,
                        Axis::Z => &self.$z,
                    }
                }
            }
            impl<T, U> ops::IndexMut<Axis> for $($type)*<T, U> {
                #[inline]
                fn index_mut(&mut self, index: Axis) -> &mut Self::Output {
                    match index {
                        Axis::X => &mut self.$x,
                        Axis::Y => &mut self.$y,
                        Axis::Z => &mut self.$z,
                    }
                }
            }
        };
    }
    impl_xyz_e!(x y z, euclid::Vector3D);
    impl_xyz_e!(x y z, euclid::Point3D);
    impl_xyz_e!(width height depth, euclid::Size3D);
}

#[cfg(test)]
mod tests {
    use super::*;
    use euclid::vec3;

    #[test]
    fn axis_conversion() {
        for (i, axis) in Axis::ALL.into_iter().enumerate() {
            assert_eq!(usize::from(axis), i);
            assert_eq!(axis.index(), i);
        }
    }

    #[test]
    fn axis_fmt() {
        use Axis::*;
        assert_eq!(
            format!("{X:x} {Y:x} {Z:x} {X:X} {Y:X} {Z:X}"),
            "x y z X Y Z"
        );
    }

    #[test]
    fn index_vector() {
        let mut v = vec3::<i32, ()>(10, 20, 30);
        assert_eq!([v[Axis::X], v[Axis::Y], v[Axis::Z]], [10, 20, 30]);
        v[Axis::Y] = 5;
        assert_eq!(v, vec3(10, 5, 30));
    }

    #[test]
    fn inc_dec_properties() {
        for axis in Axis::ALL {
            assert_ne!(axis, axis.increment());
            assert_ne!(axis, axis.decrement());
            assert_eq!(axis, axis.increment().decrement());
            assert_eq!(axis, axis.decrement().increment());
        }
    }

    #[test]
    fn unit_vector_matches_index() {
        for axis in Axis::ALL {
            let v = axis.unit_vector();
            assert_eq!(v[axis], 1.0);
            assert_eq!(v.length(), 1.0);
        }
    }
}
