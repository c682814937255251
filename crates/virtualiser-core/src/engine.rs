#![forbid(unsafe_code)]

//! The virtualisation engine.
//!
//! [`Engine`] decides which turns are hidden, reveals them in batches as the
//! placeholder approaches the viewport, and keeps the user's view steady
//! while content is inserted above the fold.
//!
//! # Invariants
//!
//! After every public operation:
//!
//! 1. The hidden turns form a prefix of the turn sequence (document order).
//! 2. A placeholder exists iff at least one turn is hidden, and it sits
//!    immediately before the oldest visible turn.
//!
//! The engine caches nothing about the document. Each operation rescans the
//! live page through the [`ledger`](crate::ledger), so host re-renders
//! between calls cannot leave it holding stale turns.
//!
//! # Re-entrancy
//!
//! [`Engine::reveal_batch`] is gated by a busy flag. A trigger that arrives
//! while a batch is in flight is dropped, not queued: once the batch
//! finishes, the relocated placeholder gets a fresh proximity subscription
//! which re-triggers if it is still in range.

use tracing::{debug, info, trace};

use crate::config::VirtualiserConfig;
use crate::ledger::{self, Turn};
use crate::observer::ViewportObserver;
use crate::page::{HostPage, ProximitySensor};
use crate::placeholder;
use crate::strategy::{ScrollContinuity, SizingStrategy, TurnMetrics};

/// Result of [`Engine::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Every turn fits the visible budget; the document was not touched.
    WithinBudget { total: usize },
    /// The oldest `hidden` turns are hidden and a placeholder was inserted.
    Hidden { hidden: usize, kept: usize },
    /// Every turn fits the budget but stale hidden turns were left over
    /// (the host removed turns since the last apply); they were revealed.
    Reset { revealed: usize },
}

impl ApplyOutcome {
    #[must_use]
    pub const fn hidden(self) -> usize {
        match self {
            Self::Hidden { hidden, .. } => hidden,
            Self::WithinBudget { .. } | Self::Reset { .. } => 0,
        }
    }
}

/// Result of [`Engine::reveal_batch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealOutcome {
    /// Another batch was in flight; this trigger was dropped.
    Busy,
    /// Nothing was hidden; the placeholder is gone and the observer stopped.
    Exhausted,
    Revealed { revealed: usize, remaining: usize },
}

/// [`TurnMetrics`] over live turns, measuring through the host page.
struct PageMetrics<'a, P: HostPage> {
    page: &'a mut P,
    turns: &'a [Turn<P::Element>],
}

impl<P: HostPage> TurnMetrics for PageMetrics<'_, P> {
    fn len(&self) -> usize {
        self.turns.len()
    }

    fn height(&mut self, index: usize) -> f64 {
        let turn = &self.turns[index];
        match self.page.measure_height(&turn.element) {
            Some(height) if height.is_finite() => height.max(0.0),
            Some(_) => 0.0,
            None => {
                debug!(
                    target: "virtualiser::engine",
                    turn_id = %turn.id,
                    "turn left the document mid-measurement; counting zero height"
                );
                0.0
            }
        }
    }

    fn viewport_height(&self) -> f64 {
        self.page.viewport_height()
    }
}

/// Unhide every hidden turn and drop the placeholder. Returns the number of
/// turns revealed.
///
/// Used directly by the navigation coordinator when it has to reset a page
/// without a live engine.
pub fn reveal_all_turns<P: HostPage>(page: &mut P) -> usize {
    let hidden = ledger::hidden_turns(page);
    for turn in &hidden {
        ledger::unhide(page, &turn.element);
    }
    placeholder::remove_all(page);
    hidden.len()
}

/// Per-conversation virtualisation state.
///
/// Constructed when a conversation is activated and dropped on navigation;
/// nothing leaks from one conversation to the next.
#[derive(Debug)]
pub struct Engine {
    strategy: Box<dyn SizingStrategy>,
    observer: ViewportObserver,
    revealing: bool,
}

impl Engine {
    /// Build an engine from configuration.
    #[must_use]
    pub fn new(config: &VirtualiserConfig) -> Self {
        Self::with_strategy(Box::new(config.sizing_kind()), config.reveal_margin_px)
    }

    /// Build an engine around an explicit strategy.
    #[must_use]
    pub fn with_strategy(strategy: Box<dyn SizingStrategy>, reveal_margin_px: f64) -> Self {
        Self {
            strategy,
            observer: ViewportObserver::new(reveal_margin_px),
            revealing: false,
        }
    }

    #[must_use]
    pub fn strategy(&self) -> &dyn SizingStrategy {
        self.strategy.as_ref()
    }

    #[must_use]
    pub fn observer(&self) -> &ViewportObserver {
        &self.observer
    }

    /// Whether a reveal batch is in flight.
    #[must_use]
    pub fn is_revealing(&self) -> bool {
        self.revealing
    }

    /// Force the busy flag, simulating a batch in flight.
    #[cfg(any(test, feature = "test-helpers"))]
    pub fn set_revealing(&mut self, revealing: bool) {
        self.revealing = revealing;
    }

    /// Every turn, oldest first.
    pub fn messages<P: HostPage>(&self, page: &P) -> Vec<Turn<P::Element>> {
        ledger::all_turns(page)
    }

    /// Hidden turns, oldest first.
    pub fn hidden_messages<P: HostPage>(&self, page: &P) -> Vec<Turn<P::Element>> {
        ledger::hidden_turns(page)
    }

    /// Hide the oldest turns beyond the visible budget.
    ///
    /// Recomputes the hide set from the full live document on every call
    /// (already-hidden turns included) and replaces any existing placeholder.
    /// Under budget with nothing hidden this performs no writes at all.
    pub fn apply<P: ProximitySensor>(&mut self, page: &mut P) -> ApplyOutcome {
        let turns = ledger::all_turns(page);
        let total = turns.len();
        let keep = {
            let mut metrics = PageMetrics {
                page: &mut *page,
                turns: &turns,
            };
            // At least one turn stays visible to anchor the placeholder.
            self.strategy.keep_count(&mut metrics).min(total).max(1)
        };

        if keep >= total {
            if ledger::hidden_count(page) == 0 && placeholder::locate(page).is_none() {
                trace!(
                    target: "virtualiser::engine",
                    total,
                    strategy = self.strategy.name(),
                    "all turns fit the visible budget"
                );
                return ApplyOutcome::WithinBudget { total };
            }
            let revealed = reveal_all_turns(page);
            self.observer.rewatch(page);
            debug!(
                target: "virtualiser::engine",
                total,
                revealed,
                "within budget; cleared stale hidden turns"
            );
            return ApplyOutcome::Reset { revealed };
        }

        let hidden = total - keep;
        placeholder::remove_all(page);
        for turn in &turns[..hidden] {
            ledger::hide(page, &turn.element);
        }
        // A shrinking hide set (host removed turns, or the page budget grew)
        // must not leave hidden turns past the boundary.
        for turn in &turns[hidden..] {
            if ledger::is_hidden(page, &turn.element) {
                ledger::unhide(page, &turn.element);
            }
        }
        placeholder::insert(page, &turns[hidden].element, hidden);
        self.observer.rewatch(page);

        if self.strategy.continuity() == ScrollContinuity::AlignLastRevealed {
            let viewport = page.viewport_height();
            let hidden_height: f64 = {
                let mut metrics = PageMetrics {
                    page: &mut *page,
                    turns: &turns[..hidden],
                };
                (0..hidden).map(|i| metrics.height(i)).sum()
            };
            let pages = if viewport > 0.0 {
                hidden_height / viewport
            } else {
                0.0
            };
            info!(
                target: "virtualiser::engine",
                hidden,
                kept = keep,
                hidden_px = hidden_height.round(),
                hidden_pages = format_args!("{pages:.1}"),
                strategy = self.strategy.name(),
                "hid older turns"
            );
        } else {
            info!(
                target: "virtualiser::engine",
                hidden,
                kept = keep,
                strategy = self.strategy.name(),
                "hid older turns"
            );
        }
        ApplyOutcome::Hidden { hidden, kept: keep }
    }

    /// Reveal one batch of the newest hidden turns.
    pub fn reveal_batch<P: ProximitySensor>(&mut self, page: &mut P) -> RevealOutcome {
        if self.revealing {
            trace!(
                target: "virtualiser::engine",
                "reveal already in flight; trigger dropped"
            );
            return RevealOutcome::Busy;
        }
        self.revealing = true;
        let outcome = self.reveal_batch_inner(page);
        self.revealing = false;
        outcome
    }

    fn reveal_batch_inner<P: ProximitySensor>(&mut self, page: &mut P) -> RevealOutcome {
        let scroll_before = page.scroll_offset();
        let hidden = ledger::hidden_turns(page);
        if hidden.is_empty() {
            placeholder::update(page, 0);
            self.observer.stop(page);
            return RevealOutcome::Exhausted;
        }

        let batch = {
            let mut metrics = PageMetrics {
                page: &mut *page,
                turns: &hidden,
            };
            self.strategy.batch_size(&mut metrics)
        }
        .clamp(1, hidden.len());
        let first = hidden.len() - batch;
        let revealed = &hidden[first..];

        for turn in revealed {
            ledger::unhide(page, &turn.element);
        }

        let remaining = first;
        if remaining > 0 {
            placeholder::place(page, &revealed[0].element, remaining);
            self.observer.rewatch(page);
        } else {
            placeholder::update(page, 0);
            self.observer.stop(page);
        }

        match self.strategy.continuity() {
            ScrollContinuity::RestoreOffset => page.scroll_to(scroll_before),
            ScrollContinuity::AlignLastRevealed => {
                if let Some(last) = revealed.last() {
                    page.scroll_bottom_into_view(&last.element);
                }
            }
        }

        debug!(
            target: "virtualiser::engine",
            revealed = batch,
            remaining,
            strategy = self.strategy.name(),
            "revealed batch"
        );
        RevealOutcome::Revealed {
            revealed: batch,
            remaining,
        }
    }

    /// Unhide everything and remove the placeholder. No batching, no scroll
    /// adjustment. Returns the number of turns revealed.
    pub fn reveal_all<P: ProximitySensor>(&mut self, page: &mut P) -> usize {
        let had_marker = placeholder::locate(page).is_some();
        let revealed = reveal_all_turns(page);
        if revealed > 0 || had_marker {
            self.observer.rewatch(page);
            info!(
                target: "virtualiser::engine",
                revealed,
                "revealed all hidden turns"
            );
        }
        revealed
    }

    /// Watch the placeholder, restoring it first if hidden turns remain but
    /// the host dropped it.
    pub fn start_observer<P: ProximitySensor>(&mut self, page: &mut P) {
        self.restore_placeholder(page);
        self.observer.start(page);
    }

    fn restore_placeholder<P: ProximitySensor>(&mut self, page: &mut P) {
        if placeholder::locate(page).is_some() {
            return;
        }
        let hidden = ledger::hidden_count(page);
        if hidden == 0 {
            return;
        }
        let turns = ledger::all_turns(page);
        if let Some(boundary) = turns.get(hidden) {
            placeholder::insert(page, &boundary.element, hidden);
        }
    }

    pub fn stop_observer<P: ProximitySensor>(&mut self, page: &mut P) {
        self.observer.stop(page);
    }

    /// Deliver an intersection notification for the watched placeholder.
    ///
    /// Returns the reveal outcome when the notification triggered a batch.
    pub fn on_proximity<P: ProximitySensor>(
        &mut self,
        page: &mut P,
        is_intersecting: bool,
    ) -> Option<RevealOutcome> {
        if self.revealing {
            return None;
        }
        if !self.observer.notify(is_intersecting) {
            return None;
        }
        Some(self.reveal_batch(page))
    }
}
