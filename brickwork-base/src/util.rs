//! Tools that we could imagine being in the Rust standard library, but aren't.

use core::fmt;

// -------------------------------------------------------------------------------------------------

#[doc(hidden)]
pub mod log;

// -------------------------------------------------------------------------------------------------

/// Formats a duration in seconds with a fixed number of significant digits, for
/// log messages whose columns should line up from one frame to the next.
///
/// ```
/// use core::time::Duration;
/// use brickwork_base::util::StatusSeconds;
///
/// assert_eq!(StatusSeconds(Duration::from_millis(1234)).to_string(), "  1.234 s");
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[allow(clippy::exhaustive_structs)]
pub struct StatusSeconds(pub core::time::Duration);

impl fmt::Display for StatusSeconds {
    #[allow(clippy::missing_inline_in_public_items)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:7.3} s", self.0.as_secs_f64())
    }
}
