#![forbid(unsafe_code)]

//! Navigation coordination: per-conversation engine lifecycle.
//!
//! The host page is a single-page app, so "navigation" is a location change
//! without a reload. On every change the coordinator tears down the previous
//! conversation (observer stopped, every hidden turn revealed, engine
//! dropped), then waits for the new conversation's turns to render before
//! asking whether virtualisation is enabled for it.
//!
//! The coordinator is host-driven and deterministic: it never sleeps or
//! spawns. The host calls [`NavigationCoordinator::navigate`] when the
//! location changes, [`NavigationCoordinator::poll`] on the interval the
//! coordinator asks for, and [`NavigationCoordinator::activate`] once it has
//! looked up enablement. Each navigation bumps a generation counter; an
//! activation carrying an older generation is discarded, so a slow
//! enablement lookup can never apply to the wrong conversation.

use std::future::Future;

use tracing::{debug, info, warn};
use web_time::{Duration, Instant};

use crate::config::{VirtualiserConfig, WaitPolicy};
use crate::engine::{self, ApplyOutcome, Engine, RevealOutcome};
use crate::ledger;
use crate::page::ProximitySensor;
use crate::storage::{self, EnablementStore, StorageBackend, StorageError};

// ---------------------------------------------------------------------------
// Bounded waiting
// ---------------------------------------------------------------------------

/// One step of a [`BoundedWait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStep {
    /// The condition held.
    Ready { elapsed: Duration },
    /// Not yet; poll again after this long.
    Retry { after: Duration },
    /// The timeout elapsed without the condition holding.
    TimedOut { elapsed: Duration },
}

impl WaitStep {
    #[must_use]
    pub const fn is_finished(self) -> bool {
        !matches!(self, Self::Retry { .. })
    }
}

/// One-shot bounded poll. Once finished, every further poll repeats the
/// terminal step.
#[derive(Debug, Clone)]
pub struct BoundedWait {
    policy: WaitPolicy,
    started: Instant,
    finished: Option<WaitStep>,
}

impl BoundedWait {
    #[must_use]
    pub fn new(policy: WaitPolicy, now: Instant) -> Self {
        Self {
            policy,
            started: now,
            finished: None,
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished.is_some()
    }

    /// Feed the current time and whether the condition holds.
    pub fn poll(&mut self, now: Instant, satisfied: bool) -> WaitStep {
        if let Some(step) = self.finished {
            return step;
        }
        let elapsed = now.saturating_duration_since(self.started);
        let timeout = self.policy.timeout();
        let step = if satisfied {
            WaitStep::Ready { elapsed }
        } else if elapsed >= timeout {
            WaitStep::TimedOut { elapsed }
        } else {
            WaitStep::Retry {
                after: self.policy.poll_interval().min(timeout - elapsed),
            }
        };
        if step.is_finished() {
            self.finished = Some(step);
        }
        step
    }
}

/// Wait until `predicate` holds, polling on `policy`'s interval.
///
/// `clock` reads the current time and `sleep` yields for the requested
/// duration, so the same loop runs under a browser timer or a fake clock.
pub async fn wait_until<C, S, F, P>(
    policy: WaitPolicy,
    clock: C,
    mut sleep: S,
    mut predicate: P,
) -> WaitStep
where
    C: Fn() -> Instant,
    S: FnMut(Duration) -> F,
    F: Future<Output = ()>,
    P: FnMut() -> bool,
{
    let mut wait = BoundedWait::new(policy, clock());
    loop {
        match wait.poll(clock(), predicate()) {
            WaitStep::Retry { after } => sleep(after).await,
            step => return step,
        }
    }
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// Result of [`NavigationCoordinator::navigate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationEvent {
    /// Same location as before; nothing happened.
    Unchanged,
    /// Previous conversation torn down; waiting for content.
    Started {
        generation: u64,
        conversation: Option<String>,
    },
}

/// Result of [`NavigationCoordinator::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    /// No wait in progress.
    Idle,
    /// Still waiting; poll again after `retry_after`.
    Waiting { retry_after: Duration },
    /// Turns appeared. The host should look up enablement and call
    /// [`NavigationCoordinator::activate`] with this generation.
    Ready { generation: u64, elapsed: Duration },
    /// No turns appeared before the timeout; nothing will be applied.
    TimedOut { generation: u64, elapsed: Duration },
}

/// Result of [`NavigationCoordinator::activate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// A newer navigation happened since this generation started.
    Superseded,
    Disabled,
    Active(ApplyOutcome),
}

/// What disabling the current conversation would do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisablePlan {
    /// Nothing is hidden; disable right away.
    Immediate,
    /// Disabling reveals `hidden` turns; ask the user first.
    NeedsConfirmation { hidden: usize },
}

/// Errors from the enable/disable actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// The current location is not a conversation.
    NoConversation,
    /// The user navigated away before the action completed.
    Superseded,
    Storage(StorageError),
}

impl std::fmt::Display for ActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoConversation => write!(f, "no conversation id found"),
            Self::Superseded => write!(f, "navigated away before the action completed"),
            Self::Storage(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ActionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::NoConversation | Self::Superseded => None,
            Self::Storage(e) => Some(e),
        }
    }
}

impl From<StorageError> for ActionError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

/// Owns the engine for the active conversation.
#[derive(Debug)]
pub struct NavigationCoordinator {
    config: VirtualiserConfig,
    location: Option<String>,
    conversation: Option<String>,
    generation: u64,
    pending: Option<BoundedWait>,
    /// Turns appeared; waiting for the host to call `activate`.
    resolving: bool,
    engine: Option<Engine>,
}

impl NavigationCoordinator {
    #[must_use]
    pub fn new(config: VirtualiserConfig) -> Self {
        Self {
            config,
            location: None,
            conversation: None,
            generation: 0,
            pending: None,
            resolving: false,
            engine: None,
        }
    }

    #[must_use]
    pub fn config(&self) -> &VirtualiserConfig {
        &self.config
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn current_conversation(&self) -> Option<&str> {
        self.conversation.as_deref()
    }

    /// Whether the current navigation is still settling: waiting for the
    /// host to render turns, or for the enablement lookup to activate.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.pending.is_some() || self.resolving
    }

    #[must_use]
    pub fn engine(&self) -> Option<&Engine> {
        self.engine.as_ref()
    }

    pub fn engine_mut(&mut self) -> Option<&mut Engine> {
        self.engine.as_mut()
    }

    /// The active engine, created from configuration if there is none.
    pub fn ensure_engine(&mut self) -> &mut Engine {
        let config = &self.config;
        self.engine.get_or_insert_with(|| Engine::new(config))
    }

    /// Record the current location. `href` identifies the location; the
    /// conversation id is taken from `path`.
    ///
    /// On a change, the previous conversation is torn down and a new wait
    /// for content begins.
    pub fn navigate<P: ProximitySensor>(
        &mut self,
        page: &mut P,
        href: &str,
        path: &str,
        now: Instant,
    ) -> NavigationEvent {
        if self.location.as_deref() == Some(href) {
            return NavigationEvent::Unchanged;
        }
        let first = self.location.is_none();
        self.teardown(page);
        self.location = Some(href.to_owned());
        self.conversation = storage::conversation_id(path);
        self.generation += 1;
        self.pending = Some(BoundedWait::new(self.config.wait, now));
        self.resolving = false;

        if first {
            info!(
                target: "virtualiser::navigation",
                conversation = self.conversation.as_deref().unwrap_or("(none)"),
                "initialising"
            );
        } else {
            info!(
                target: "virtualiser::navigation",
                conversation = self.conversation.as_deref().unwrap_or("(none)"),
                generation = self.generation,
                "location changed"
            );
        }
        NavigationEvent::Started {
            generation: self.generation,
            conversation: self.conversation.clone(),
        }
    }

    fn teardown<P: ProximitySensor>(&mut self, page: &mut P) {
        let revealed = match self.engine.take() {
            Some(mut engine) => {
                engine.stop_observer(page);
                engine.reveal_all(page)
            }
            None => engine::reveal_all_turns(page),
        };
        if revealed > 0 {
            debug!(
                target: "virtualiser::navigation",
                revealed,
                "previous conversation restored"
            );
        }
    }

    /// Check whether the awaited turns have rendered.
    pub fn poll<P: ProximitySensor>(&mut self, page: &P, now: Instant) -> PollStatus {
        let Some(wait) = self.pending.as_mut() else {
            return PollStatus::Idle;
        };
        let satisfied = ledger::turn_count(page) > 0;
        match wait.poll(now, satisfied) {
            WaitStep::Retry { after } => PollStatus::Waiting { retry_after: after },
            WaitStep::Ready { elapsed } => {
                self.pending = None;
                self.resolving = true;
                info!(
                    target: "virtualiser::navigation",
                    elapsed_ms = elapsed.as_millis() as u64,
                    "messages appeared"
                );
                PollStatus::Ready {
                    generation: self.generation,
                    elapsed,
                }
            }
            WaitStep::TimedOut { elapsed } => {
                self.pending = None;
                warn!(
                    target: "virtualiser::navigation",
                    elapsed_ms = elapsed.as_millis() as u64,
                    "timed out waiting for messages"
                );
                PollStatus::TimedOut {
                    generation: self.generation,
                    elapsed,
                }
            }
        }
    }

    /// Finish a wait that reported [`PollStatus::Ready`] for `generation`.
    pub fn activate<P: ProximitySensor>(
        &mut self,
        page: &mut P,
        generation: u64,
        enabled: bool,
    ) -> Activation {
        if generation != self.generation {
            debug!(
                target: "virtualiser::navigation",
                stale = generation,
                current = self.generation,
                "discarding superseded activation"
            );
            return Activation::Superseded;
        }
        self.resolving = false;
        info!(
            target: "virtualiser::navigation",
            conversation = self.conversation.as_deref().unwrap_or("(none)"),
            enabled,
            "virtualisation state resolved"
        );
        if !enabled {
            return Activation::Disabled;
        }
        Activation::Active(self.enable_current(page))
    }

    /// The current conversation, or [`ActionError::NoConversation`].
    pub fn require_conversation(&self) -> Result<String, ActionError> {
        self.conversation.clone().ok_or(ActionError::NoConversation)
    }

    /// Apply to the current page and start observing, creating the engine
    /// if needed.
    pub fn enable_current<P: ProximitySensor>(&mut self, page: &mut P) -> ApplyOutcome {
        let engine = self.ensure_engine();
        let outcome = engine.apply(page);
        engine.start_observer(page);
        outcome
    }

    #[must_use]
    pub fn plan_disable<P: ProximitySensor>(&self, page: &P) -> DisablePlan {
        match ledger::hidden_count(page) {
            0 => DisablePlan::Immediate,
            hidden => DisablePlan::NeedsConfirmation { hidden },
        }
    }

    /// Reveal everything, stop observing and drop the engine. Returns the
    /// number of turns revealed.
    pub fn disable_current<P: ProximitySensor>(&mut self, page: &mut P) -> usize {
        match self.engine.take() {
            Some(mut engine) => {
                let revealed = engine.reveal_all(page);
                engine.stop_observer(page);
                revealed
            }
            None => engine::reveal_all_turns(page),
        }
    }

    /// Finish an enable action started during `generation`: apply and
    /// observe, unless the user has navigated since.
    pub fn complete_enable<P: ProximitySensor>(
        &mut self,
        page: &mut P,
        generation: u64,
    ) -> Result<ApplyOutcome, ActionError> {
        self.check_generation(generation)?;
        Ok(self.enable_current(page))
    }

    /// Finish a disable action started during `generation`. After a
    /// navigation the teardown has already revealed everything.
    pub fn complete_disable<P: ProximitySensor>(
        &mut self,
        page: &mut P,
        generation: u64,
    ) -> Result<usize, ActionError> {
        self.check_generation(generation)?;
        Ok(self.disable_current(page))
    }

    fn check_generation(&self, generation: u64) -> Result<(), ActionError> {
        if generation == self.generation {
            return Ok(());
        }
        debug!(
            target: "virtualiser::navigation",
            stale = generation,
            current = self.generation,
            "discarding superseded action"
        );
        Err(ActionError::Superseded)
    }

    /// Persist enablement for the current conversation, then apply.
    pub async fn enable<P, B>(
        &mut self,
        page: &mut P,
        store: &EnablementStore<B>,
    ) -> Result<ApplyOutcome, ActionError>
    where
        P: ProximitySensor,
        B: StorageBackend,
    {
        let generation = self.generation;
        let conversation = self.require_conversation()?;
        store.enable(&conversation).await?;
        self.complete_enable(page, generation)
    }

    /// Persist disablement for the current conversation, then reveal
    /// everything. Callers should consult [`plan_disable`](Self::plan_disable)
    /// first.
    pub async fn disable<P, B>(
        &mut self,
        page: &mut P,
        store: &EnablementStore<B>,
    ) -> Result<usize, ActionError>
    where
        P: ProximitySensor,
        B: StorageBackend,
    {
        let generation = self.generation;
        let conversation = self.require_conversation()?;
        store.disable(&conversation).await?;
        self.complete_disable(page, generation)
    }

    /// Forward a proximity notification to the active engine.
    pub fn on_proximity<P: ProximitySensor>(
        &mut self,
        page: &mut P,
        is_intersecting: bool,
    ) -> Option<RevealOutcome> {
        self.engine.as_mut()?.on_proximity(page, is_intersecting)
    }

    /// Reveal one batch on explicit request (placeholder click).
    pub fn reveal_batch<P: ProximitySensor>(&mut self, page: &mut P) -> Option<RevealOutcome> {
        Some(self.engine.as_mut()?.reveal_batch(page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placeholder;
    use crate::storage::MemoryBackend;
    use crate::testing::MemoryPage;
    use pollster::block_on;
    use std::cell::Cell;

    const CONV_A: &str = "/c/aaaa-1111";
    const CONV_B: &str = "/c/bbbb-2222";

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn started(coordinator: &mut NavigationCoordinator, page: &mut MemoryPage, path: &str, now: Instant) -> u64 {
        match coordinator.navigate(page, path, path, now) {
            NavigationEvent::Started { generation, .. } => generation,
            NavigationEvent::Unchanged => panic!("expected navigation to start"),
        }
    }

    #[test]
    fn bounded_wait_retries_then_times_out() {
        let t0 = Instant::now();
        let mut wait = BoundedWait::new(WaitPolicy::default(), t0);
        assert_eq!(wait.poll(t0, false), WaitStep::Retry { after: ms(200) });
        assert_eq!(
            wait.poll(t0 + ms(14_900), false),
            WaitStep::Retry { after: ms(100) }
        );
        assert_eq!(
            wait.poll(t0 + ms(15_000), false),
            WaitStep::TimedOut { elapsed: ms(15_000) }
        );
        // One-shot: the condition turning true later changes nothing.
        assert_eq!(
            wait.poll(t0 + ms(15_200), true),
            WaitStep::TimedOut { elapsed: ms(15_000) }
        );
    }

    #[test]
    fn bounded_wait_ready_reports_elapsed() {
        let t0 = Instant::now();
        let mut wait = BoundedWait::new(WaitPolicy::default(), t0);
        assert_eq!(wait.poll(t0 + ms(600), true), WaitStep::Ready { elapsed: ms(600) });
        assert!(wait.is_finished());
    }

    #[test]
    fn wait_until_with_fake_clock() {
        let t0 = Instant::now();
        let offset = Cell::new(Duration::ZERO);
        let checks = Cell::new(0);
        let step = block_on(wait_until(
            WaitPolicy::default(),
            || t0 + offset.get(),
            |after| {
                offset.set(offset.get() + after);
                async {}
            },
            || {
                checks.set(checks.get() + 1);
                checks.get() == 4
            },
        ));
        assert_eq!(step, WaitStep::Ready { elapsed: ms(600) });
    }

    #[test]
    fn wait_until_gives_up() {
        let t0 = Instant::now();
        let offset = Cell::new(Duration::ZERO);
        let policy = WaitPolicy {
            timeout_ms: 1_000,
            poll_interval_ms: 300,
        };
        let step = block_on(wait_until(
            policy,
            || t0 + offset.get(),
            |after| {
                offset.set(offset.get() + after);
                async {}
            },
            || false,
        ));
        assert_eq!(step, WaitStep::TimedOut { elapsed: ms(1_000) });
    }

    #[test]
    fn navigate_same_location_is_unchanged() {
        let mut page = MemoryPage::with_turns(3, 100.0);
        let mut coordinator = NavigationCoordinator::new(VirtualiserConfig::default());
        let t0 = Instant::now();
        started(&mut coordinator, &mut page, CONV_A, t0);
        assert_eq!(
            coordinator.navigate(&mut page, CONV_A, CONV_A, t0),
            NavigationEvent::Unchanged
        );
        assert_eq!(coordinator.generation(), 1);
    }

    #[test]
    fn navigate_extracts_conversation() {
        let mut page = MemoryPage::new(800.0);
        let mut coordinator = NavigationCoordinator::new(VirtualiserConfig::default());
        let t0 = Instant::now();
        assert_eq!(
            coordinator.navigate(&mut page, "https://host/c/abc-123?x=1", "/c/abc-123", t0),
            NavigationEvent::Started {
                generation: 1,
                conversation: Some("abc-123".into())
            }
        );
        assert!(coordinator.is_loading());
        started(&mut coordinator, &mut page, "/", t0);
        assert_eq!(coordinator.current_conversation(), None);
        assert_eq!(
            coordinator.require_conversation(),
            Err(ActionError::NoConversation)
        );
    }

    #[test]
    fn poll_waits_for_turns() {
        let mut page = MemoryPage::new(800.0);
        let mut coordinator = NavigationCoordinator::new(VirtualiserConfig::default());
        let t0 = Instant::now();
        let generation = started(&mut coordinator, &mut page, CONV_A, t0);

        assert_eq!(
            coordinator.poll(&page, t0),
            PollStatus::Waiting { retry_after: ms(200) }
        );
        page.push_turn("t0", 100.0);
        assert_eq!(
            coordinator.poll(&page, t0 + ms(200)),
            PollStatus::Ready {
                generation,
                elapsed: ms(200)
            }
        );
        assert_eq!(coordinator.poll(&page, t0 + ms(400)), PollStatus::Idle);
    }

    #[test]
    fn loading_lasts_until_activation() {
        let mut page = MemoryPage::with_turns(35, 100.0);
        let mut coordinator = NavigationCoordinator::new(VirtualiserConfig::default());
        let t0 = Instant::now();
        let generation = started(&mut coordinator, &mut page, CONV_A, t0);

        assert!(matches!(coordinator.poll(&page, t0), PollStatus::Ready { .. }));
        // Enablement lookup still in flight.
        assert!(coordinator.is_loading());
        assert_eq!(coordinator.poll(&page, t0 + ms(200)), PollStatus::Idle);
        assert!(coordinator.is_loading());

        coordinator.activate(&mut page, generation, false);
        assert!(!coordinator.is_loading());
    }

    #[test]
    fn stale_activation_keeps_newer_navigation_loading() {
        let mut page = MemoryPage::with_turns(35, 100.0);
        let mut coordinator = NavigationCoordinator::new(VirtualiserConfig::default());
        let t0 = Instant::now();
        let stale = started(&mut coordinator, &mut page, CONV_A, t0);
        coordinator.poll(&page, t0);
        started(&mut coordinator, &mut page, CONV_B, t0 + ms(50));

        assert_eq!(
            coordinator.activate(&mut page, stale, true),
            Activation::Superseded
        );
        assert!(coordinator.is_loading());
    }

    #[test]
    fn timeout_clears_loading_state() {
        let mut page = MemoryPage::new(800.0);
        let mut coordinator = NavigationCoordinator::new(VirtualiserConfig::default());
        let t0 = Instant::now();
        let generation = started(&mut coordinator, &mut page, CONV_A, t0);
        assert_eq!(
            coordinator.poll(&page, t0 + ms(15_000)),
            PollStatus::TimedOut {
                generation,
                elapsed: ms(15_000)
            }
        );
        assert!(!coordinator.is_loading());
    }

    #[test]
    fn activate_enabled_applies_and_observes() {
        let mut page = MemoryPage::with_turns(35, 100.0);
        let mut coordinator = NavigationCoordinator::new(VirtualiserConfig::default());
        let t0 = Instant::now();
        let generation = started(&mut coordinator, &mut page, CONV_A, t0);
        coordinator.poll(&page, t0);

        assert_eq!(
            coordinator.activate(&mut page, generation, true),
            Activation::Active(ApplyOutcome::Hidden {
                hidden: 15,
                kept: 20
            })
        );
        let engine = coordinator.engine().expect("engine");
        assert!(engine.observer().is_running());
        assert_eq!(page.watched(), placeholder::locate(&page));
    }

    #[test]
    fn activate_disabled_leaves_page_alone() {
        let mut page = MemoryPage::with_turns(35, 100.0);
        let mut coordinator = NavigationCoordinator::new(VirtualiserConfig::default());
        let t0 = Instant::now();
        let generation = started(&mut coordinator, &mut page, CONV_A, t0);
        let before = page.mutation_count();

        assert_eq!(
            coordinator.activate(&mut page, generation, false),
            Activation::Disabled
        );
        assert_eq!(page.mutation_count(), before);
        assert!(coordinator.engine().is_none());
    }

    #[test]
    fn stale_activation_is_discarded() {
        let mut page = MemoryPage::with_turns(35, 100.0);
        let mut coordinator = NavigationCoordinator::new(VirtualiserConfig::default());
        let t0 = Instant::now();
        let stale = started(&mut coordinator, &mut page, CONV_A, t0);
        started(&mut coordinator, &mut page, CONV_B, t0 + ms(50));

        assert_eq!(
            coordinator.activate(&mut page, stale, true),
            Activation::Superseded
        );
        assert!(page.hidden_indices().is_empty());
        assert!(coordinator.engine().is_none());
    }

    #[test]
    fn navigation_tears_down_previous_conversation() {
        let mut page = MemoryPage::with_turns(35, 100.0);
        let mut coordinator = NavigationCoordinator::new(VirtualiserConfig::default());
        let t0 = Instant::now();
        let generation = started(&mut coordinator, &mut page, CONV_A, t0);
        coordinator.activate(&mut page, generation, true);
        assert_eq!(page.hidden_indices().len(), 15);

        started(&mut coordinator, &mut page, CONV_B, t0 + ms(1_000));
        assert!(page.hidden_indices().is_empty());
        assert!(placeholder::locate(&page).is_none());
        assert_eq!(page.watched(), None);
        assert!(coordinator.engine().is_none());
    }

    #[test]
    fn plan_disable_reports_hidden_count() {
        let mut page = MemoryPage::with_turns(35, 100.0);
        let mut coordinator = NavigationCoordinator::new(VirtualiserConfig::default());
        assert_eq!(coordinator.plan_disable(&page), DisablePlan::Immediate);
        coordinator.enable_current(&mut page);
        assert_eq!(
            coordinator.plan_disable(&page),
            DisablePlan::NeedsConfirmation { hidden: 15 }
        );
    }

    #[test]
    fn enable_and_disable_actions_persist() {
        let mut page = MemoryPage::with_turns(35, 100.0);
        let store = EnablementStore::new(MemoryBackend::new());
        let mut coordinator = NavigationCoordinator::new(VirtualiserConfig::default());
        started(&mut coordinator, &mut page, "/c/abc", Instant::now());

        let outcome = block_on(coordinator.enable(&mut page, &store)).expect("enable");
        assert_eq!(outcome.hidden(), 15);
        assert!(block_on(store.is_enabled(Some("abc"))));

        let revealed = block_on(coordinator.disable(&mut page, &store)).expect("disable");
        assert_eq!(revealed, 15);
        assert!(!block_on(store.is_enabled(Some("abc"))));
        assert!(page.hidden_indices().is_empty());
        assert!(coordinator.engine().is_none());
    }

    #[test]
    fn action_completion_after_navigation_is_discarded() {
        let mut page = MemoryPage::with_turns(35, 100.0);
        let mut coordinator = NavigationCoordinator::new(VirtualiserConfig::default());
        let t0 = Instant::now();
        let generation = started(&mut coordinator, &mut page, CONV_A, t0);

        // Storage write in flight while the user switches conversation.
        started(&mut coordinator, &mut page, CONV_B, t0 + ms(30));
        let before = page.mutation_count();
        assert_eq!(
            coordinator.complete_enable(&mut page, generation),
            Err(ActionError::Superseded)
        );
        assert_eq!(
            coordinator.complete_disable(&mut page, generation),
            Err(ActionError::Superseded)
        );
        assert_eq!(page.mutation_count(), before);
        assert!(coordinator.engine().is_none());

        let current = coordinator.generation();
        assert_eq!(
            coordinator.complete_enable(&mut page, current),
            Ok(ApplyOutcome::Hidden {
                hidden: 15,
                kept: 20
            })
        );
    }

    #[test]
    fn enable_without_conversation_fails_before_writing() {
        let mut page = MemoryPage::with_turns(35, 100.0);
        let store = EnablementStore::new(MemoryBackend::new());
        let mut coordinator = NavigationCoordinator::new(VirtualiserConfig::default());
        started(&mut coordinator, &mut page, "/", Instant::now());

        assert_eq!(
            block_on(coordinator.enable(&mut page, &store)),
            Err(ActionError::NoConversation)
        );
        assert_eq!(store.backend().writes(), 0);
        assert!(page.hidden_indices().is_empty());
    }

    #[test]
    fn failed_write_does_not_apply() {
        let mut page = MemoryPage::with_turns(35, 100.0);
        let store = EnablementStore::new(MemoryBackend::new());
        store.backend().set_fail_writes(true);
        let mut coordinator = NavigationCoordinator::new(VirtualiserConfig::default());
        started(&mut coordinator, &mut page, "/c/abc", Instant::now());

        assert!(matches!(
            block_on(coordinator.enable(&mut page, &store)),
            Err(ActionError::Storage(_))
        ));
        assert!(page.hidden_indices().is_empty());
    }

    #[test]
    fn proximity_without_engine_is_ignored() {
        let mut page = MemoryPage::with_turns(35, 100.0);
        let mut coordinator = NavigationCoordinator::new(VirtualiserConfig::default());
        assert_eq!(coordinator.on_proximity(&mut page, true), None);
        assert_eq!(coordinator.reveal_batch(&mut page), None);
    }
}
