//! Per-pixel memory of previous frames, for accumulation and reprojection.

use brickwork::math::{FreeCoordinate, Rgb};
use brickwork::settings::Settings;

use crate::camera::Viewport;

/// Primary hits farther away than this are not blended with previous frames.
pub const REPROJECTION_MAX_DEPTH: FreeCoordinate = 5.0;

/// What is remembered about one pixel.
///
/// The [`Default`] value is the zero of the accumulation sums.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[allow(clippy::exhaustive_structs)]
pub struct HistorySample {
    /// Averaged color, or the running sum while accumulating.
    pub color: Rgb,
    /// Distance to the surface seen, or the running sum while accumulating.
    pub depth: FreeCoordinate,
}

impl HistorySample {
    /// A pixel with nothing to reuse. Its infinite depth never agrees with a fresh sample.
    pub const EMPTY: Self = Self {
        color: Rgb::ZERO,
        depth: FreeCoordinate::INFINITY,
    };

    fn weighted(self, weight: f32) -> Self {
        if weight == 0.0 {
            return Self::default();
        }
        Self {
            color: self.color * weight,
            depth: self.depth * weight,
        }
    }

    fn plus(self, other: Self) -> Self {
        Self {
            color: self.color + other.color,
            depth: self.depth + other.depth,
        }
    }
}

/// Two frames of [`HistorySample`]s, and the count of frames accumulated so far.
///
/// In reprojection mode, each frame reads the previous buffer and writes the current
/// one; [`History::swap()`] exchanges them afterward. In accumulation mode only the
/// current buffer is used, holding running sums.
#[derive(Clone, Debug)]
pub struct History {
    viewport: Viewport,
    current: Vec<HistorySample>,
    previous: Vec<HistorySample>,
    frame_index: u32,
}

impl History {
    /// Creates empty history for images of the given size.
    ///
    /// Returns [`None`] if the pixel count does not fit in memory.
    pub fn new(viewport: Viewport) -> Option<Self> {
        let len = viewport.pixel_count()?;
        Some(Self {
            viewport,
            current: vec![HistorySample::EMPTY; len],
            previous: vec![HistorySample::EMPTY; len],
            frame_index: 1,
        })
    }

    #[allow(missing_docs)]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Number of the frame being accumulated, counting from 1 after a reset.
    pub fn frame_index(&self) -> u32 {
        self.frame_index
    }

    /// Forgets all previous frames.
    pub fn reset(&mut self) {
        self.frame_index = 1;
        self.current.fill(HistorySample::EMPTY);
        self.previous.fill(HistorySample::EMPTY);
    }

    /// Finishes a reprojected frame: it becomes the previous frame.
    pub fn swap(&mut self) {
        core::mem::swap(&mut self.current, &mut self.previous);
    }

    /// Finishes an accumulated frame.
    pub fn advance(&mut self) {
        self.frame_index = self.frame_index.saturating_add(1);
    }

    /// Returns the buffer to write this frame into, and a reader of the previous frame.
    pub(crate) fn split(&mut self) -> (&mut [HistorySample], PreviousFrame<'_>) {
        (
            &mut self.current,
            PreviousFrame {
                samples: &self.previous,
                width: self.viewport.width as usize,
                height: self.viewport.height as usize,
            },
        )
    }

    #[cfg(test)]
    pub(crate) fn previous_mut(&mut self) -> &mut [HistorySample] {
        &mut self.previous
    }
}

/// Adds a fresh sample to a pixel's running sums and returns the pixel's average.
///
/// The first frame after a reset starts the sums over.
pub(crate) fn accumulate(
    slot: &mut HistorySample,
    color: Rgb,
    depth: FreeCoordinate,
    frame_index: u32,
) -> Rgb {
    if frame_index <= 1 {
        *slot = HistorySample::default();
    }
    slot.color += color;
    slot.depth += depth;
    slot.color / frame_index.max(1) as f32
}

// -------------------------------------------------------------------------------------------------

/// Read access to the previous frame of a [`History`].
#[derive(Clone, Copy, Debug)]
pub(crate) struct PreviousFrame<'a> {
    samples: &'a [HistorySample],
    width: usize,
    height: usize,
}

impl PreviousFrame<'_> {
    /// Bilinearly interpolates the previous frame at fractional pixel coordinates, where
    /// pixel centers are at half-integers.
    pub(crate) fn sample(&self, x: f32, y: f32) -> HistorySample {
        if self.width == 0 || self.height == 0 {
            return HistorySample::EMPTY;
        }
        let fx = (x - 0.5).min(self.width as f32 - 2.0).max(0.0);
        let fy = (y - 0.5).min(self.height as f32 - 2.0).max(0.0);
        let (x0, y0) = (fx as usize, fy as usize);
        let (x1, y1) = ((x0 + 1).min(self.width - 1), (y0 + 1).min(self.height - 1));
        let (tx, ty) = (fx - x0 as f32, fy - y0 as f32);
        let texel = |x: usize, y: usize| self.samples[y * self.width + x];
        let top = texel(x0, y0)
            .weighted(1.0 - tx)
            .plus(texel(x1, y0).weighted(tx));
        let bottom = texel(x0, y1)
            .weighted(1.0 - tx)
            .plus(texel(x1, y1).weighted(tx));
        top.weighted(1.0 - ty).plus(bottom.weighted(ty))
    }

    /// Blends a fresh sample with what the previous frame saw at the same surface.
    ///
    /// `position` is where the surface appeared in the previous frame, as computed by
    /// [`Camera::reproject()`](crate::camera::Camera::reproject). The previous color is
    /// used only if the position is inside the image and the previous depth agrees with
    /// the fresh one; its weight falls off as the depths differ.
    ///
    /// Returns the blended color and whether the previous frame was used.
    pub(crate) fn reproject(
        &self,
        settings: &Settings,
        fresh: HistorySample,
        position: Option<[f32; 2]>,
        camera_delta: FreeCoordinate,
    ) -> (Rgb, bool) {
        let Some([x, y]) = position else {
            return (fresh.color, false);
        };
        if !(x > 0.0 && x < self.width as f32 && y > 0.0 && y < self.height as f32) {
            return (fresh.color, false);
        }
        let previous = self.sample(x, y);
        let depth_difference = (previous.depth - (fresh.depth + camera_delta)).abs();
        if depth_difference >= settings.reprojection_depth_threshold {
            return (fresh.color, false);
        }
        let confidence = (settings.reprojection_blend - 3.0 * depth_difference).max(0.0);
        (fresh.color.lerp(previous.color, confidence), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn history_with(width: u32, height: u32, f: impl Fn(usize, usize) -> HistorySample) -> History {
        let mut history = History::new(Viewport::new(width, height)).unwrap();
        for (i, slot) in history.previous_mut().iter_mut().enumerate() {
            *slot = f(i % width as usize, i / width as usize);
        }
        history
    }

    fn up_sample(color: Rgb, depth: f32) -> HistorySample {
        HistorySample { color, depth }
    }

    #[test]
    fn bilinear_sampling() {
        let mut history = history_with(3, 3, |x, y| {
            up_sample(Rgb::from_luminance((x + 3 * y) as f32), 1.0)
        });
        let (_, previous) = history.split();
        assert_eq!(previous.sample(0.5, 0.5).color, Rgb::from_luminance(0.0));
        assert_eq!(previous.sample(1.5, 1.5).color, Rgb::from_luminance(4.0));
        assert_eq!(previous.sample(1.0, 1.0).color, Rgb::from_luminance(2.0));
        // The lower corner of the sampled square is clamped to the second to last texel.
        assert_eq!(previous.sample(-5.0, 0.5).color, Rgb::from_luminance(0.0));
        assert_eq!(previous.sample(9.0, 9.0).color, Rgb::from_luminance(4.0));
    }

    #[test]
    fn single_pixel_sampling() {
        let mut history = history_with(1, 1, |_, _| up_sample(Rgb::ONE, 1.0));
        let (_, previous) = history.split();
        assert_eq!(previous.sample(0.5, 0.5).color, Rgb::ONE);
    }

    #[test]
    fn reuse_when_depths_agree() {
        let settings = Settings::default();
        let old = Rgb::new(1.0, 0.0, 0.0);
        let mut history = history_with(4, 4, |_, _| up_sample(old, 2.0));
        let (_, previous) = history.split();
        let fresh = up_sample(Rgb::new(0.0, 1.0, 0.0), 2.0);

        let (color, reused) = previous.reproject(&settings, fresh, Some([2.0, 2.0]), 0.0);
        assert!(reused);
        let blend = settings.reprojection_blend;
        assert_eq!(color, fresh.color.lerp(old, blend));

        // The weight of the previous frame falls with the depth difference.
        let (color, reused) = previous.reproject(&settings, fresh, Some([2.0, 2.0]), 0.01);
        assert!(reused);
        assert!((color.red() - (blend - 0.03)).abs() < 1e-5, "{color:?}");
    }

    #[test]
    fn reject_mismatches() {
        let settings = Settings::default();
        let mut history = history_with(4, 4, |_, _| up_sample(Rgb::ONE, 2.0));
        let (_, previous) = history.split();
        let fresh = up_sample(Rgb::ZERO, 2.0);

        for position in [None, Some([0.0, 2.0]), Some([2.0, 4.0]), Some([-1.0, 2.0])] {
            assert_eq!(
                previous.reproject(&settings, fresh, position, 0.0),
                (Rgb::ZERO, false),
                "{position:?}"
            );
        }
        // Depth too different.
        assert_eq!(
            previous.reproject(&settings, up_sample(Rgb::ZERO, 2.5), Some([2.0, 2.0]), 0.0),
            (Rgb::ZERO, false)
        );
    }

    #[test]
    fn camera_motion_is_part_of_the_depth() {
        let settings = Settings::default();
        let mut history = history_with(4, 4, |_, _| up_sample(Rgb::ONE, 2.0));
        let (_, previous) = history.split();
        let nearer = up_sample(Rgb::ZERO, 1.5);
        assert!(!previous.reproject(&settings, nearer, Some([2.0, 2.0]), 0.0).1);
        assert!(previous.reproject(&settings, nearer, Some([2.0, 2.0]), 0.5).1);
    }

    #[test]
    fn reuse_depends_on_depth_alone() {
        // The surface seen may have turned, but if its depth agrees it is reused.
        let mut settings = Settings::default();
        settings.reprojection_normal_threshold = 1.0;
        let mut history = history_with(4, 4, |_, _| up_sample(Rgb::ONE, 2.0));
        let (_, previous) = history.split();
        let (color, reused) =
            previous.reproject(&settings, up_sample(Rgb::ZERO, 2.0), Some([2.0, 2.0]), 0.0);
        assert!(reused);
        assert_eq!(color, Rgb::ZERO.lerp(Rgb::ONE, settings.reprojection_blend));
    }

    #[test]
    fn empty_neighbor_blocks_reuse() {
        let settings = Settings::default();
        let mut history = history_with(4, 4, |x, _| {
            if x == 2 {
                HistorySample::EMPTY
            } else {
                up_sample(Rgb::ONE, 2.0)
            }
        });
        let (_, previous) = history.split();
        let fresh = up_sample(Rgb::ZERO, 2.0);
        // Centered on a valid pixel, so the empty one has weight 0.
        assert!(previous.reproject(&settings, fresh, Some([1.5, 1.5]), 0.0).1);
        // Partly covering the empty pixel.
        assert!(!previous.reproject(&settings, fresh, Some([2.0, 1.5]), 0.0).1);
    }

    #[test]
    fn empty_history_is_never_reused() {
        let settings = Settings::default();
        let mut history = History::new(Viewport::new(4, 4)).unwrap();
        let (_, previous) = history.split();
        let fresh = up_sample(Rgb::ONE, 0.01);
        assert_eq!(
            previous.reproject(&settings, fresh, Some([2.0, 2.0]), 0.0),
            (Rgb::ONE, false)
        );
    }

    #[test]
    fn accumulation_averages() {
        let mut history = History::new(Viewport::new(1, 1)).unwrap();
        let mut average = Rgb::ZERO;
        for value in [1.0, 2.0, 6.0] {
            let frame_index = history.frame_index();
            let (current, _) = history.split();
            average = accumulate(&mut current[0], Rgb::from_luminance(value), 1.0, frame_index);
            history.advance();
        }
        assert_eq!(average, Rgb::from_luminance(3.0));
        assert_eq!(history.frame_index(), 4);

        history.reset();
        assert_eq!(history.frame_index(), 1);
        let (current, _) = history.split();
        assert_eq!(current[0], HistorySample::EMPTY);

        // Sums restart on the first frame after a reset.
        let (current, _) = history.split();
        let average = accumulate(&mut current[0], Rgb::from_luminance(5.0), 1.0, 1);
        assert_eq!(average, Rgb::from_luminance(5.0));
        assert_eq!(current[0].depth, 1.0);
    }

    #[test]
    fn swap_makes_current_previous() {
        let mut history = History::new(Viewport::new(1, 1)).unwrap();
        let (current, _) = history.split();
        current[0] = up_sample(Rgb::ONE, 1.0);
        history.swap();
        let (current, previous) = history.split();
        assert_eq!(current[0], HistorySample::EMPTY);
        assert_eq!(previous.sample(0.5, 0.5), up_sample(Rgb::ONE, 1.0));
    }
}
