//! Property-based invariant tests for the virtualisation engine.
//!
//! These tests verify structural invariants that must hold for any transcript:
//!
//! 1. apply() under budget performs no document writes and creates no marker.
//! 2. After apply(), the hidden turns are a prefix of the transcript.
//! 3. reveal_batch() strictly decreases a non-empty hidden count.
//! 4. Repeated reveal_batch() reaches zero within `hidden` calls, and the
//!    marker is absent exactly when nothing is hidden.
//! 5. reveal_all() is idempotent.
//! 6. reveal_batch() while a batch is in flight writes nothing.

use proptest::prelude::*;
use virtualiser_core::testing::MemoryPage;
use virtualiser_core::{CountSizing, Engine, PageHeightSizing, RevealOutcome, placeholder};

// ── Helpers ─────────────────────────────────────────────────────────────

fn page_with_heights(heights: &[f64], viewport: f64) -> MemoryPage {
    let mut page = MemoryPage::new(viewport);
    for (i, &h) in heights.iter().enumerate() {
        page.push_turn(&format!("turn-{i}"), h);
    }
    page
}

fn heights(max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    proptest::collection::vec(1.0f64..=900.0, 0..=max_len)
}

fn engine_for(use_pages: bool, visible: usize, batch: usize) -> Engine {
    if use_pages {
        Engine::with_strategy(
            Box::new(PageHeightSizing::new(visible as f64 / 4.0, batch as f64 / 4.0)),
            200.0,
        )
    } else {
        Engine::with_strategy(Box::new(CountSizing::new(visible, batch)), 200.0)
    }
}

/// Hidden turns form a prefix, and the marker (if any) sits right before the
/// first visible turn.
fn check_layout(page: &MemoryPage) -> Result<(), TestCaseError> {
    let hidden = page.hidden_indices();
    let expected: Vec<usize> = (0..hidden.len()).collect();
    prop_assert_eq!(&hidden, &expected, "hidden set is not a prefix");

    let markers = page.placeholder_ids();
    if hidden.is_empty() {
        prop_assert!(markers.is_empty(), "marker present with nothing hidden");
    } else {
        prop_assert_eq!(markers.len(), 1, "expected exactly one marker");
        prop_assert_eq!(placeholder::count(page), Some(hidden.len()));
        let turns = virtualiser_core::ledger::all_turns(page);
        let boundary = turns[hidden.len()].element;
        prop_assert_eq!(
            page.index_of(markers[0]).map(|i| i + 1),
            page.index_of(boundary),
            "marker is not adjacent to the oldest visible turn"
        );
    }
    Ok(())
}

// ═════════════════════════════════════════════════════════════════════════
// 1. No-op under budget
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn apply_under_budget_writes_nothing(total in 0usize..=30, extra in 0usize..=10) {
        let mut page = MemoryPage::with_turns(total, 100.0);
        let mut engine = engine_for(false, total + extra, 10);
        let before = page.mutation_count();

        let outcome = engine.apply(&mut page);
        prop_assert_eq!(outcome.hidden(), 0);
        prop_assert_eq!(page.mutation_count(), before);
        prop_assert!(page.placeholder_ids().is_empty());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Prefix invariant after apply
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn apply_hides_a_prefix(
        hs in heights(60),
        use_pages in any::<bool>(),
        visible in 1usize..=25,
        batch in 1usize..=12,
    ) {
        let mut page = page_with_heights(&hs, 800.0);
        let mut engine = engine_for(use_pages, visible, batch);
        engine.apply(&mut page);
        check_layout(&page)?;

        // Re-entrant apply recomputes the same state.
        let hidden = page.hidden_indices();
        engine.apply(&mut page);
        check_layout(&page)?;
        prop_assert_eq!(page.hidden_indices(), hidden);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3 + 4. Progress and termination
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn reveal_batches_terminate(
        hs in heights(60),
        use_pages in any::<bool>(),
        visible in 1usize..=25,
        batch in 1usize..=12,
    ) {
        let mut page = page_with_heights(&hs, 800.0);
        let mut engine = engine_for(use_pages, visible, batch);
        engine.apply(&mut page);
        engine.start_observer(&mut page);

        let initial = page.hidden_indices().len();
        let mut calls = 0;
        while !page.hidden_indices().is_empty() {
            let before = page.hidden_indices().len();
            let outcome = engine.reveal_batch(&mut page);
            calls += 1;
            let after = page.hidden_indices().len();
            prop_assert!(after < before, "no progress: {} -> {}", before, after);
            prop_assert!(
                matches!(outcome, RevealOutcome::Revealed { remaining, .. } if remaining == after),
                "reveal outcome did not report remaining == {}",
                after
            );
            check_layout(&page)?;
            prop_assert!(calls <= initial, "took more than {} calls", initial);
        }
        prop_assert!(page.placeholder_ids().is_empty());
        prop_assert_eq!(engine.reveal_batch(&mut page), RevealOutcome::Exhausted);
        prop_assert!(!engine.observer().is_running());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Idempotent reveal_all
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn reveal_all_is_idempotent(total in 0usize..=60, visible in 1usize..=25) {
        let mut page = MemoryPage::with_turns(total, 100.0);
        let mut engine = engine_for(false, visible, 10);
        engine.apply(&mut page);

        engine.reveal_all(&mut page);
        let after_first = page.mutation_count();
        prop_assert!(page.hidden_indices().is_empty());
        prop_assert!(page.placeholder_ids().is_empty());

        prop_assert_eq!(engine.reveal_all(&mut page), 0);
        prop_assert_eq!(page.mutation_count(), after_first);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Re-entrancy guard
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn busy_reveal_writes_nothing(total in 0usize..=60, visible in 1usize..=25) {
        let mut page = MemoryPage::with_turns(total, 100.0);
        let mut engine = engine_for(false, visible, 10);
        engine.apply(&mut page);
        let before = page.mutation_count();
        let hidden = page.hidden_indices();

        engine.set_revealing(true);
        prop_assert_eq!(engine.reveal_batch(&mut page), RevealOutcome::Busy);
        prop_assert_eq!(page.mutation_count(), before);
        prop_assert_eq!(page.hidden_indices(), hidden);
    }
}
