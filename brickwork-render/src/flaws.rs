use core::fmt;

bitflags::bitflags! {
    /// Deficiencies of a rendering.
    ///
    /// This type describes the ways in which a rendered frame could fail to accurately
    /// represent the scene, or fail to comply with the requested
    /// [`Settings`](brickwork::settings::Settings).
    ///
    /// It is a [`bitflags`] generated bit-flag type. *Note: We make no guarantees that
    /// the numeric value of flags will stay the same across versions*; please treat this
    /// as a set of named values only.
    ///
    /// The [empty](Self::empty) set means no flaws are present.
    #[derive(Clone, Copy, Debug, Default, Hash, Eq, Ord, PartialEq, PartialOrd)]
    pub struct Flaws: u16 {
        /// The frame is the first since the frame history was reset, so it is noisier
        /// than the ones which will follow if nothing changes.
        const UNFINISHED = 1 << 0;

        /// Antialiasing has not been used, despite being requested by the settings,
        /// because reprojection traces a single centered sample per pixel.
        const NO_ANTIALIASING = 1 << 1;

        /// Some pixels were brighter than the firefly limit and have been darkened.
        const CLAMPED = 1 << 2;
    }
}

impl fmt::Display for Flaws {
    /// Displays the flags as text like “`UNFINISHED | CLAMPED`".
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
