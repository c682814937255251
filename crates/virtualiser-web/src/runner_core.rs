#![forbid(unsafe_code)]

//! Platform-independent runner core wrapping the navigation coordinator.
//!
//! This module contains the logic shared between the wasm-bindgen exports
//! and the native test harness. No JS/WASM types here: the page type is a
//! parameter, so native tests drive the same code over
//! `virtualiser_core::testing::MemoryPage`.

use serde::Serialize;
use tracing::debug;
use virtualiser_core::engine::reveal_all_turns;
use virtualiser_core::{
    Activation, ActionError, ApplyOutcome, DisablePlan, NavigationCoordinator, NavigationEvent,
    PollStatus, ProximitySensor, RevealOutcome, Turn, VirtualiserConfig, ledger,
};
use web_time::Instant;

/// Snapshot of runner state for UI chrome and diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunnerStatus {
    pub conversation: Option<String>,
    pub generation: u64,
    pub loading: bool,
    /// An engine exists for the current conversation.
    pub active: bool,
    pub strategy: Option<String>,
    pub turns: usize,
    pub hidden: usize,
    pub observing: bool,
    pub revealing: bool,
}

/// Platform-independent virtualiser runner over a host page `P`.
pub struct RunnerCore<P: ProximitySensor> {
    page: P,
    coordinator: NavigationCoordinator,
}

impl<P: ProximitySensor> RunnerCore<P> {
    pub fn new(page: P, config: VirtualiserConfig) -> Self {
        Self {
            page,
            coordinator: NavigationCoordinator::new(config),
        }
    }

    pub fn page_mut(&mut self) -> &mut P {
        &mut self.page
    }

    pub fn coordinator(&self) -> &NavigationCoordinator {
        &self.coordinator
    }

    // -- Navigation ---------------------------------------------------------

    pub fn navigate(&mut self, href: &str, path: &str, now: Instant) -> NavigationEvent {
        self.coordinator.navigate(&mut self.page, href, path, now)
    }

    pub fn poll(&mut self, now: Instant) -> PollStatus {
        self.coordinator.poll(&self.page, now)
    }

    pub fn activate(&mut self, generation: u64, enabled: bool) -> Activation {
        self.coordinator.activate(&mut self.page, generation, enabled)
    }

    pub fn generation(&self) -> u64 {
        self.coordinator.generation()
    }

    pub fn conversation(&self) -> Result<String, ActionError> {
        self.coordinator.require_conversation()
    }

    pub fn is_loading(&self) -> bool {
        self.coordinator.is_loading()
    }

    // -- Engine surface -----------------------------------------------------

    /// Every turn, oldest first.
    pub fn messages(&self) -> Vec<Turn<P::Element>> {
        ledger::all_turns(&self.page)
    }

    /// Hidden turns, oldest first.
    pub fn hidden_messages(&self) -> Vec<Turn<P::Element>> {
        ledger::hidden_turns(&self.page)
    }

    /// Apply to the current page. Does not start observing.
    pub fn apply(&mut self) -> ApplyOutcome {
        self.coordinator.ensure_engine().apply(&mut self.page)
    }

    pub fn reveal_batch(&mut self) -> Option<RevealOutcome> {
        self.coordinator.reveal_batch(&mut self.page)
    }

    pub fn reveal_all(&mut self) -> usize {
        match self.coordinator.engine_mut() {
            Some(engine) => engine.reveal_all(&mut self.page),
            None => reveal_all_turns(&mut self.page),
        }
    }

    pub fn start_observer(&mut self) {
        self.coordinator
            .ensure_engine()
            .start_observer(&mut self.page);
    }

    pub fn stop_observer(&mut self) {
        if let Some(engine) = self.coordinator.engine_mut() {
            engine.stop_observer(&mut self.page);
        }
    }

    /// Intersection notification from the host.
    pub fn on_proximity(&mut self, is_intersecting: bool) -> Option<RevealOutcome> {
        self.coordinator.on_proximity(&mut self.page, is_intersecting)
    }

    /// The user clicked the placeholder.
    pub fn on_placeholder_click(&mut self) -> Option<RevealOutcome> {
        let outcome = self.reveal_batch();
        debug!(
            target: "virtualiser::web",
            ?outcome,
            "placeholder clicked"
        );
        outcome
    }

    // -- Actions ------------------------------------------------------------

    pub fn plan_disable(&self) -> DisablePlan {
        self.coordinator.plan_disable(&self.page)
    }

    /// Finish an enable action begun during `generation`.
    pub fn complete_enable(&mut self, generation: u64) -> Result<ApplyOutcome, ActionError> {
        self.coordinator.complete_enable(&mut self.page, generation)
    }

    /// Finish a disable action begun during `generation`.
    pub fn complete_disable(&mut self, generation: u64) -> Result<usize, ActionError> {
        self.coordinator.complete_disable(&mut self.page, generation)
    }

    // -- Diagnostics --------------------------------------------------------

    pub fn status(&self) -> RunnerStatus {
        let engine = self.coordinator.engine();
        RunnerStatus {
            conversation: self.coordinator.current_conversation().map(str::to_owned),
            generation: self.coordinator.generation(),
            loading: self.coordinator.is_loading(),
            active: engine.is_some(),
            strategy: engine.map(|e| e.strategy().name().to_owned()),
            turns: ledger::turn_count(&self.page),
            hidden: ledger::hidden_count(&self.page),
            observing: engine.is_some_and(|e| e.observer().is_running()),
            revealing: engine.is_some_and(|e| e.is_revealing()),
        }
    }

    pub fn status_json(&self) -> String {
        serde_json::to_string(&self.status()).unwrap_or_else(|_| "{}".to_string())
    }
}
