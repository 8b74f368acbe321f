#![forbid(unsafe_code)]

//! Pointer-to-row geometry.

/// Default navigator row height in pixels.
pub const DEFAULT_ROW_HEIGHT: f64 = 24.0;

/// Pointer position relative to the navigator list.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerSample {
    /// Pointer y in viewport coordinates.
    pub pointer_y: f64,
    /// Top of the list container in viewport coordinates.
    pub container_top: f64,
    /// Scroll offset of the list container.
    pub scroll_top: f64,
}

impl PointerSample {
    #[inline]
    pub const fn new(pointer_y: f64, container_top: f64, scroll_top: f64) -> Self {
        Self {
            pointer_y,
            container_top,
            scroll_top,
        }
    }

    /// Pointer at `y` in an unscrolled container whose top is at 0.
    #[inline]
    pub const fn at(y: f64) -> Self {
        Self::new(y, 0.0, 0.0)
    }

    fn is_finite(&self) -> bool {
        self.pointer_y.is_finite() && self.container_top.is_finite() && self.scroll_top.is_finite()
    }
}

/// Fixed-height row layout of the navigator list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoverGeometry {
    /// Row height in pixels.
    pub row_height: f64,
}

impl Default for HoverGeometry {
    fn default() -> Self {
        Self {
            row_height: DEFAULT_ROW_HEIGHT,
        }
    }
}

impl HoverGeometry {
    #[inline]
    pub const fn new(row_height: f64) -> Self {
        Self { row_height }
    }

    /// Unbounded row index under the pointer; negative above the list.
    ///
    /// `None` when the sample or the row height is unusable.
    #[must_use]
    pub fn raw_index(&self, sample: PointerSample) -> Option<i64> {
        if !self.row_height.is_finite() || self.row_height <= 0.0 || !sample.is_finite() {
            return None;
        }
        let offset = sample.pointer_y - sample.container_top + sample.scroll_top;
        let index = (offset / self.row_height).floor();
        if !index.is_finite() {
            return None;
        }
        // Saturates on overflow.
        Some(index as i64)
    }

    /// Row under the pointer, if it falls within a list of `len` rows.
    #[must_use]
    pub fn resolve(&self, sample: PointerSample, len: usize) -> Option<usize> {
        let index = self.raw_index(sample)?;
        let index = usize::try_from(index).ok()?;
        (index < len).then_some(index)
    }

    /// Sample pointing at the middle of row `index`.
    #[must_use]
    pub fn row_center(&self, index: usize) -> PointerSample {
        PointerSample::at((index as f64 + 0.5) * self.row_height)
    }
}
