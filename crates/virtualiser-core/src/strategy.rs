#![forbid(unsafe_code)]

//! Sizing strategies: how many turns stay visible, and how many a reveal
//! batch uncovers.
//!
//! The engine is written once against [`SizingStrategy`]. Two built-ins are
//! provided as standalone structs ([`CountSizing`], [`PageHeightSizing`]);
//! [`SizingKind`] selects between them from configuration and delegates to
//! the same logic.
//!
//! Every strategy must be monotonic in its budget (a larger budget never
//! keeps fewer turns) and must make progress (a batch over a non-empty hidden
//! set is at least one turn). The engine clamps the batch to `1..=hidden`
//! regardless, so a misbehaving custom strategy cannot stall a reveal.

/// Default number of turns kept visible by [`CountSizing`].
pub const DEFAULT_VISIBLE_COUNT: usize = 20;
/// Default number of turns revealed per batch by [`CountSizing`].
pub const DEFAULT_REVEAL_COUNT: usize = 10;
/// Default viewport heights kept visible by [`PageHeightSizing`].
pub const DEFAULT_VISIBLE_PAGES: f64 = 3.0;
/// Default viewport heights revealed per batch by [`PageHeightSizing`].
pub const DEFAULT_REVEAL_PAGES: f64 = 1.0;

/// Read-only view over an ordered run of turns (oldest first) for sizing
/// decisions.
///
/// `height` may be expensive (it can force layout), so strategies should
/// only measure what they need.
pub trait TurnMetrics {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rendered height of the turn at `index`. A turn that has left the
    /// document measures `0.0`.
    fn height(&mut self, index: usize) -> f64;

    fn viewport_height(&self) -> f64;
}

/// How the engine keeps the user's view steady across a reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollContinuity {
    /// Capture the scroll offset before the mutation and restore it after.
    RestoreOffset,
    /// Scroll so the bottom of the last revealed turn meets the viewport
    /// bottom, i.e. the old top of visible content.
    AlignLastRevealed,
}

pub trait SizingStrategy: core::fmt::Debug {
    /// Number of newest turns to keep visible out of `turns`.
    fn keep_count(&self, turns: &mut dyn TurnMetrics) -> usize;

    /// Number of newest-hidden turns to reveal out of `hidden`.
    fn batch_size(&self, hidden: &mut dyn TurnMetrics) -> usize;

    fn continuity(&self) -> ScrollContinuity;

    /// Human-readable strategy name for logs.
    fn name(&self) -> &str;

    /// Optional key-value debug stats.
    fn debug_stats(&self) -> Vec<(String, String)> {
        Vec::new()
    }
}

// ---------------------------------------------------------------------------
// Count-based
// ---------------------------------------------------------------------------

/// Fixed turn counts: keep the newest `visible`, reveal `batch` at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountSizing {
    visible: usize,
    batch: usize,
}

impl CountSizing {
    /// Zero budgets are clamped to 1.
    #[must_use]
    pub const fn new(visible: usize, batch: usize) -> Self {
        Self {
            visible: if visible == 0 { 1 } else { visible },
            batch: if batch == 0 { 1 } else { batch },
        }
    }

    #[must_use]
    pub const fn visible(&self) -> usize {
        self.visible
    }

    #[must_use]
    pub const fn batch(&self) -> usize {
        self.batch
    }
}

impl Default for CountSizing {
    fn default() -> Self {
        Self::new(DEFAULT_VISIBLE_COUNT, DEFAULT_REVEAL_COUNT)
    }
}

impl SizingStrategy for CountSizing {
    fn keep_count(&self, turns: &mut dyn TurnMetrics) -> usize {
        self.visible.min(turns.len())
    }

    fn batch_size(&self, hidden: &mut dyn TurnMetrics) -> usize {
        self.batch.min(hidden.len())
    }

    fn continuity(&self) -> ScrollContinuity {
        ScrollContinuity::RestoreOffset
    }

    fn name(&self) -> &str {
        "Count"
    }

    fn debug_stats(&self) -> Vec<(String, String)> {
        vec![
            ("strategy".into(), "Count".into()),
            ("visible".into(), self.visible.to_string()),
            ("batch".into(), self.batch.to_string()),
        ]
    }
}

// ---------------------------------------------------------------------------
// Page-height-based
// ---------------------------------------------------------------------------

/// Viewport-height budgets: keep the newest turns filling `visible_pages`
/// viewports, reveal roughly `reveal_pages` viewports at a time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageHeightSizing {
    visible_pages: f64,
    reveal_pages: f64,
}

fn sanitize_pages(pages: f64) -> f64 {
    if pages.is_finite() { pages.max(0.0) } else { 0.0 }
}

impl PageHeightSizing {
    /// Negative or non-finite page counts are treated as zero, which keeps
    /// (or reveals) exactly one turn.
    #[must_use]
    pub fn new(visible_pages: f64, reveal_pages: f64) -> Self {
        Self {
            visible_pages: sanitize_pages(visible_pages),
            reveal_pages: sanitize_pages(reveal_pages),
        }
    }

    #[must_use]
    pub fn visible_pages(&self) -> f64 {
        self.visible_pages
    }

    #[must_use]
    pub fn reveal_pages(&self) -> f64 {
        self.reveal_pages
    }
}

impl Default for PageHeightSizing {
    fn default() -> Self {
        Self::new(DEFAULT_VISIBLE_PAGES, DEFAULT_REVEAL_PAGES)
    }
}

/// Walk from the newest turn backwards, accumulating height until `target`
/// is met. Returns the number of turns walked; at least one for a non-empty
/// run.
pub fn count_filling_height(turns: &mut dyn TurnMetrics, target: f64) -> usize {
    let mut total = 0.0;
    let mut count = 0;
    for index in (0..turns.len()).rev() {
        total += turns.height(index);
        count += 1;
        if total >= target {
            break;
        }
    }
    count
}

impl SizingStrategy for PageHeightSizing {
    fn keep_count(&self, turns: &mut dyn TurnMetrics) -> usize {
        let target = turns.viewport_height() * self.visible_pages;
        count_filling_height(turns, target)
    }

    fn batch_size(&self, hidden: &mut dyn TurnMetrics) -> usize {
        let target = hidden.viewport_height() * self.reveal_pages;
        count_filling_height(hidden, target)
    }

    fn continuity(&self) -> ScrollContinuity {
        ScrollContinuity::AlignLastRevealed
    }

    fn name(&self) -> &str {
        "PageHeight"
    }

    fn debug_stats(&self) -> Vec<(String, String)> {
        vec![
            ("strategy".into(), "PageHeight".into()),
            ("visible_pages".into(), self.visible_pages.to_string()),
            ("reveal_pages".into(), self.reveal_pages.to_string()),
        ]
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Built-in strategy selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizingKind {
    Count(CountSizing),
    PageHeight(PageHeightSizing),
}

impl Default for SizingKind {
    fn default() -> Self {
        Self::Count(CountSizing::default())
    }
}

impl SizingStrategy for SizingKind {
    fn keep_count(&self, turns: &mut dyn TurnMetrics) -> usize {
        match self {
            Self::Count(s) => s.keep_count(turns),
            Self::PageHeight(s) => s.keep_count(turns),
        }
    }

    fn batch_size(&self, hidden: &mut dyn TurnMetrics) -> usize {
        match self {
            Self::Count(s) => s.batch_size(hidden),
            Self::PageHeight(s) => s.batch_size(hidden),
        }
    }

    fn continuity(&self) -> ScrollContinuity {
        match self {
            Self::Count(s) => s.continuity(),
            Self::PageHeight(s) => s.continuity(),
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Count(s) => s.name(),
            Self::PageHeight(s) => s.name(),
        }
    }

    fn debug_stats(&self) -> Vec<(String, String)> {
        match self {
            Self::Count(s) => s.debug_stats(),
            Self::PageHeight(s) => s.debug_stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fixed heights, with a measurement counter.
    struct Heights {
        heights: Vec<f64>,
        viewport: f64,
        measured: usize,
    }

    impl Heights {
        fn new(heights: Vec<f64>, viewport: f64) -> Self {
            Self {
                heights,
                viewport,
                measured: 0,
            }
        }

        fn uniform(count: usize, height: f64, viewport: f64) -> Self {
            Self::new(vec![height; count], viewport)
        }
    }

    impl TurnMetrics for Heights {
        fn len(&self) -> usize {
            self.heights.len()
        }

        fn height(&mut self, index: usize) -> f64 {
            self.measured += 1;
            self.heights[index]
        }

        fn viewport_height(&self) -> f64 {
            self.viewport
        }
    }

    #[test]
    fn count_keeps_at_most_budget() {
        let s = CountSizing::default();
        assert_eq!(s.keep_count(&mut Heights::uniform(35, 1.0, 1.0)), 20);
        assert_eq!(s.keep_count(&mut Heights::uniform(10, 1.0, 1.0)), 10);
        assert_eq!(s.keep_count(&mut Heights::uniform(0, 1.0, 1.0)), 0);
    }

    #[test]
    fn count_batch_is_capped_by_hidden() {
        let s = CountSizing::default();
        assert_eq!(s.batch_size(&mut Heights::uniform(15, 1.0, 1.0)), 10);
        assert_eq!(s.batch_size(&mut Heights::uniform(5, 1.0, 1.0)), 5);
    }

    #[test]
    fn count_zero_budget_clamps_to_one() {
        let s = CountSizing::new(0, 0);
        assert_eq!(s.visible(), 1);
        assert_eq!(s.batch(), 1);
    }

    #[test]
    fn count_never_measures() {
        let mut turns = Heights::uniform(50, 100.0, 800.0);
        CountSizing::default().keep_count(&mut turns);
        assert_eq!(turns.measured, 0);
    }

    #[test]
    fn pages_keep_enough_height() {
        // 3 pages of 800px = 2400px; 100px turns -> 24 turns.
        let s = PageHeightSizing::default();
        assert_eq!(s.keep_count(&mut Heights::uniform(50, 100.0, 800.0)), 24);
    }

    #[test]
    fn pages_keep_all_when_short() {
        let s = PageHeightSizing::default();
        assert_eq!(s.keep_count(&mut Heights::uniform(5, 100.0, 800.0)), 5);
    }

    #[test]
    fn pages_walk_from_newest_and_stop_early() {
        // Newest turn alone fills the page.
        let mut turns = Heights::new(vec![10.0, 10.0, 10.0, 900.0], 800.0);
        let s = PageHeightSizing::new(1.0, 1.0);
        assert_eq!(s.keep_count(&mut turns), 1);
        assert_eq!(turns.measured, 1);
    }

    #[test]
    fn pages_batch_reveals_at_least_one() {
        let s = PageHeightSizing::new(3.0, 0.0);
        assert_eq!(s.batch_size(&mut Heights::uniform(4, 0.0, 800.0)), 1);
        assert_eq!(s.batch_size(&mut Heights::uniform(4, 100.0, 0.0)), 1);
    }

    #[test]
    fn pages_treat_vanished_turns_as_zero_height() {
        // 0.0 entries model turns removed mid-measurement.
        let mut turns = Heights::new(vec![500.0, 0.0, 0.0, 400.0], 800.0);
        assert_eq!(PageHeightSizing::new(1.0, 1.0).batch_size(&mut turns), 4);
    }

    #[test]
    fn pages_sanitize_invalid_budgets() {
        let s = PageHeightSizing::new(f64::NAN, -2.0);
        assert_eq!(s.visible_pages(), 0.0);
        assert_eq!(s.reveal_pages(), 0.0);
    }

    #[test]
    fn continuity_differs_by_strategy() {
        assert_eq!(
            SizingKind::Count(CountSizing::default()).continuity(),
            ScrollContinuity::RestoreOffset
        );
        assert_eq!(
            SizingKind::PageHeight(PageHeightSizing::default()).continuity(),
            ScrollContinuity::AlignLastRevealed
        );
    }

    #[test]
    fn kind_delegates() {
        let kind = SizingKind::Count(CountSizing::new(3, 2));
        assert_eq!(kind.name(), "Count");
        assert_eq!(kind.keep_count(&mut Heights::uniform(10, 1.0, 1.0)), 3);
        assert_eq!(kind.batch_size(&mut Heights::uniform(10, 1.0, 1.0)), 2);
        assert_eq!(kind.debug_stats()[1], ("visible".to_string(), "3".to_string()));
    }
}
