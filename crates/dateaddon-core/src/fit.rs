//! Text fitting: pick a font size so the displayed text fills its container
//! without overflowing.
//!
//! The fitting functions are pure. Text metrics come from a [`Measure`]
//! oracle supplied by the rendering surface, so the algorithms can be unit
//! tested against synthetic metrics.

use tracing::trace;

/// Font size below which sizes are rendered at [`SCALE_BASE_FONT_SIZE`] with
/// a compensating transform (proportional strategy only).
pub const SCALE_THRESHOLD_PX: f64 = 12.0;

/// Font size applied while scaling below [`SCALE_THRESHOLD_PX`].
pub const SCALE_BASE_FONT_SIZE: f64 = 12.0;

/// Smallest effective size the proportional strategy targets.
const MIN_PROPORTIONAL_TARGET: f64 = 0.1;

/// Measured content box of the container.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContainerSize {
    pub width: f64,
    pub height: f64,
}

impl ContainerSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// A zero (or negative) dimension leaves nothing to fit into.
    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    pub fn min_side(&self) -> f64 {
        self.width.min(self.height)
    }
}

/// Measured extent of rendered text.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextBox {
    pub width: f64,
    pub height: f64,
}

impl TextBox {
    /// True when the box overflows `container` in either direction.
    pub fn overflows(&self, container: ContainerSize) -> bool {
        self.width > container.width || self.height > container.height
    }
}

/// Font properties used for one measurement pass.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font_family: String,
    pub font_weight: String,
    pub font_size_px: f64,
    pub letter_spacing_px: f64,
}

impl TextStyle {
    fn at_size(&self, font_size_px: f64, letter_spacing_percent: f64) -> Self {
        Self {
            font_size_px,
            letter_spacing_px: font_size_px * letter_spacing_percent / 100.0,
            ..self.clone()
        }
    }
}

/// Text measurement oracle, `measure(text, style) -> box`.
///
/// Lines are laid out without wrapping, one below the other.
pub trait Measure {
    fn measure(&self, lines: &[&str], style: &TextStyle) -> TextBox;
}

impl<F> Measure for F
where
    F: Fn(&[&str], &TextStyle) -> TextBox,
{
    fn measure(&self, lines: &[&str], style: &TextStyle) -> TextBox {
        self(lines, style)
    }
}

/// Fixed-advance metrics: every character is `advance * size` wide and every
/// line `line_height * size` tall.
///
/// Used by surfaces without a real text engine (terminal preview, tests).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApproximateMetrics {
    pub advance: f64,
    pub line_height: f64,
}

impl Default for ApproximateMetrics {
    fn default() -> Self {
        Self {
            advance: 0.6,
            line_height: 1.2,
        }
    }
}

impl Measure for ApproximateMetrics {
    fn measure(&self, lines: &[&str], style: &TextStyle) -> TextBox {
        let size = style.font_size_px;
        let width = lines
            .iter()
            .map(|line| {
                let chars = line.chars().count() as f64;
                chars * (size * self.advance + style.letter_spacing_px)
            })
            .fold(0.0, f64::max);

        TextBox {
            width,
            height: lines.len() as f64 * size * self.line_height,
        }
    }
}

/// Font size, letter spacing and compensating scale to apply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitResult {
    pub font_size_px: f64,
    pub letter_spacing_px: f64,
    /// Uniform transform anchored at the centre; 1.0 means none.
    pub scale_factor: f64,
}

impl FitResult {
    /// Result for a fixed, user-chosen size.
    pub fn fixed(font_size_px: f64, letter_spacing_percent: f64) -> Self {
        Self {
            font_size_px,
            letter_spacing_px: font_size_px * letter_spacing_percent / 100.0,
            scale_factor: 1.0,
        }
    }

    /// Size the text appears at after the transform.
    pub fn effective_font_size(&self) -> f64 {
        self.font_size_px * self.scale_factor
    }
}

/// Algorithm mapping (text, container) to a font size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FitStrategy {
    /// Largest integer size in `[min, max]` whose rendered box fits, found by
    /// bisection. Deterministic; about ten measurements for default bounds.
    BinarySearch {
        min_font_size: f64,
        max_font_size: f64,
    },
    /// Start at the container's smaller side and step down until the text
    /// fits or `floor` is reached.
    LinearShrink { step: f64, floor: f64 },
    /// `size = min(width, height)` without measuring. Sizes below
    /// [`SCALE_THRESHOLD_PX`] render at [`SCALE_BASE_FONT_SIZE`] scaled down.
    Proportional,
}

impl Default for FitStrategy {
    fn default() -> Self {
        Self::BinarySearch {
            min_font_size: 0.1,
            max_font_size: 1000.0,
        }
    }
}

impl FitStrategy {
    pub const VALID: &'static [&'static str] = &["binary_search", "linear_shrink", "proportional"];

    /// Smallest font size this strategy will ever produce.
    pub fn floor(&self) -> f64 {
        match *self {
            Self::BinarySearch { min_font_size, .. } => min_font_size,
            Self::LinearShrink { floor, .. } => floor,
            Self::Proportional => SCALE_BASE_FONT_SIZE,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::BinarySearch { .. } => "binary_search",
            Self::LinearShrink { .. } => "linear_shrink",
            Self::Proportional => "proportional",
        }
    }
}

/// Computes a [`FitResult`] with one strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextFitter {
    strategy: FitStrategy,
}

impl TextFitter {
    pub fn new(strategy: FitStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> FitStrategy {
        self.strategy
    }

    /// Fit `lines` into `container`.
    ///
    /// Returns `None` when there is no text to measure. A degenerate container
    /// yields the strategy's floor without measuring.
    pub fn fit(
        &self,
        lines: &[&str],
        container: ContainerSize,
        style: &TextStyle,
        letter_spacing_percent: f64,
        measure: &dyn Measure,
    ) -> Option<FitResult> {
        if lines.iter().all(|l| l.is_empty()) {
            return None;
        }

        let result = match self.strategy {
            FitStrategy::BinarySearch {
                min_font_size,
                max_font_size,
            } => {
                let size = binary_search_fit(
                    lines,
                    container,
                    style,
                    letter_spacing_percent,
                    min_font_size,
                    max_font_size,
                    measure,
                );
                FitResult::fixed(size, letter_spacing_percent)
            }
            FitStrategy::LinearShrink { step, floor } => {
                let size = linear_shrink_fit(
                    lines,
                    container,
                    style,
                    letter_spacing_percent,
                    step,
                    floor,
                    measure,
                );
                FitResult::fixed(size, letter_spacing_percent)
            }
            FitStrategy::Proportional => proportional_fit(container, letter_spacing_percent),
        };

        trace!(
            "Fit ({}) {}x{} -> {:.1}px (scale {:.3})",
            self.strategy.name(),
            container.width,
            container.height,
            result.font_size_px,
            result.scale_factor
        );

        Some(result)
    }
}

/// Bisection over integer sizes for the largest size that fits.
///
/// Returns `min_font_size` when nothing larger fits (or the container is
/// degenerate).
pub fn binary_search_fit(
    lines: &[&str],
    container: ContainerSize,
    style: &TextStyle,
    letter_spacing_percent: f64,
    min_font_size: f64,
    max_font_size: f64,
    measure: &dyn Measure,
) -> f64 {
    if container.is_degenerate() || max_font_size <= min_font_size {
        return min_font_size;
    }

    let fits = |size: f64| {
        !measure
            .measure(lines, &style.at_size(size, letter_spacing_percent))
            .overflows(container)
    };

    let mut lo = min_font_size;
    let mut hi = max_font_size.floor();
    if hi > lo && fits(hi) {
        return hi;
    }

    let mut best = min_font_size;
    while hi - lo > 1.0 {
        let mid = ((lo + hi) / 2.0).floor();
        if mid <= lo || mid >= hi {
            break;
        }
        if fits(mid) {
            best = mid;
            lo = mid;
        } else {
            hi = mid;
        }
    }

    best
}

/// Step down from the container's smaller side until the text fits.
pub fn linear_shrink_fit(
    lines: &[&str],
    container: ContainerSize,
    style: &TextStyle,
    letter_spacing_percent: f64,
    step: f64,
    floor: f64,
    measure: &dyn Measure,
) -> f64 {
    let start = container.min_side();
    if container.is_degenerate() || start <= floor {
        return floor;
    }

    let step = if step > 0.0 { step } else { 1.0 };
    let mut size = start;
    while size > floor
        && measure
            .measure(lines, &style.at_size(size, letter_spacing_percent))
            .overflows(container)
    {
        size = (size - step).max(floor);
    }

    size
}

/// Closed-form fit: the smaller container side, with the sub-threshold
/// scale workaround.
pub fn proportional_fit(container: ContainerSize, letter_spacing_percent: f64) -> FitResult {
    let target = if container.is_degenerate() {
        MIN_PROPORTIONAL_TARGET
    } else {
        container.min_side().max(MIN_PROPORTIONAL_TARGET)
    };

    if target < SCALE_THRESHOLD_PX {
        FitResult {
            font_size_px: SCALE_BASE_FONT_SIZE,
            letter_spacing_px: SCALE_BASE_FONT_SIZE * letter_spacing_percent / 100.0,
            scale_factor: target / SCALE_BASE_FONT_SIZE,
        }
    } else {
        FitResult::fixed(target, letter_spacing_percent)
    }
}
