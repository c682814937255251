#![forbid(unsafe_code)]

//! Viewport observer: proximity watching of the placeholder marker.
//!
//! The observer owns the lifecycle of the host's intersection subscription
//! and turns raw intersection notifications into at most one reveal request
//! per arming. Arming happens every time a subscription is (re)created; the
//! host delivers an initial notification for a fresh subscription, so a
//! marker that is still in range after a reveal re-triggers on its own.

use tracing::{debug, trace};

use crate::page::ProximitySensor;
use crate::placeholder;

/// Default distance above the viewport top at which a reveal is requested.
pub const DEFAULT_REVEAL_MARGIN_PX: f64 = 200.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Stopped,
    /// Started, but there was no marker to watch.
    Idle,
    Watching {
        armed: bool,
    },
}

#[derive(Debug, Clone)]
pub struct ViewportObserver {
    margin_px: f64,
    state: State,
}

impl ViewportObserver {
    #[must_use]
    pub fn new(margin_px: f64) -> Self {
        let margin_px = if margin_px.is_finite() {
            margin_px.max(0.0)
        } else {
            DEFAULT_REVEAL_MARGIN_PX
        };
        Self {
            margin_px,
            state: State::Stopped,
        }
    }

    #[must_use]
    pub fn margin_px(&self) -> f64 {
        self.margin_px
    }

    /// Whether `start` has been called without a matching `stop`.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state != State::Stopped
    }

    /// Whether the next intersecting notification will fire.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        matches!(self.state, State::Watching { armed: true })
    }

    /// Start watching the current marker, tearing down any prior watch.
    pub fn start<P: ProximitySensor>(&mut self, page: &mut P) {
        if self.is_running() {
            page.unwatch();
        }
        self.state = State::Idle;
        self.watch_current(page);
    }

    /// Stop watching. No-op when not started.
    pub fn stop<P: ProximitySensor>(&mut self, page: &mut P) {
        if !self.is_running() {
            return;
        }
        page.unwatch();
        self.state = State::Stopped;
        debug!(target: "virtualiser::observer", "proximity observer disconnected");
    }

    /// Recreate the subscription after the marker moved or was replaced.
    /// No-op when not started.
    pub fn rewatch<P: ProximitySensor>(&mut self, page: &mut P) {
        if !self.is_running() {
            return;
        }
        page.unwatch();
        self.state = State::Idle;
        self.watch_current(page);
    }

    /// Feed one intersection notification. Returns `true` when a reveal
    /// should run; the observer disarms until the next (re)watch.
    pub fn notify(&mut self, is_intersecting: bool) -> bool {
        match self.state {
            State::Watching { armed: true } if is_intersecting => {
                self.state = State::Watching { armed: false };
                trace!(target: "virtualiser::observer", "marker entered proximity region");
                true
            }
            _ => false,
        }
    }

    fn watch_current<P: ProximitySensor>(&mut self, page: &mut P) {
        if let Some(marker) = placeholder::locate(page) {
            page.watch(&marker, self.margin_px);
            self.state = State::Watching { armed: true };
            debug!(
                target: "virtualiser::observer",
                margin_px = self.margin_px,
                "watching marker"
            );
        }
    }
}

impl Default for ViewportObserver {
    fn default() -> Self {
        Self::new(DEFAULT_REVEAL_MARGIN_PX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger;
    use crate::testing::MemoryPage;

    fn page_with_marker() -> MemoryPage {
        let mut page = MemoryPage::with_turns(4, 100.0);
        let turns = ledger::all_turns(&page);
        placeholder::insert(&mut page, &turns[2].element, 2);
        page
    }

    #[test]
    fn start_watches_marker_and_arms() {
        let mut page = page_with_marker();
        let mut observer = ViewportObserver::default();
        observer.start(&mut page);

        assert!(observer.is_running());
        assert!(observer.is_armed());
        assert_eq!(page.watched(), placeholder::locate(&page));
        assert_eq!(page.watch_margin(), Some(200.0));
    }

    #[test]
    fn start_without_marker_runs_idle() {
        let mut page = MemoryPage::with_turns(2, 100.0);
        let mut observer = ViewportObserver::default();
        observer.start(&mut page);
        assert!(observer.is_running());
        assert!(!observer.is_armed());
        assert_eq!(page.watched(), None);
    }

    #[test]
    fn restart_disconnects_prior_watch() {
        let mut page = page_with_marker();
        let mut observer = ViewportObserver::default();
        observer.start(&mut page);
        observer.start(&mut page);
        assert_eq!(page.watch_calls(), 2);
        assert_eq!(page.unwatch_calls(), 1);
    }

    #[test]
    fn stop_is_idempotent() {
        let mut page = page_with_marker();
        let mut observer = ViewportObserver::default();
        observer.stop(&mut page);
        assert_eq!(page.unwatch_calls(), 0);

        observer.start(&mut page);
        observer.stop(&mut page);
        observer.stop(&mut page);
        assert_eq!(page.unwatch_calls(), 1);
        assert!(!observer.is_running());
        assert_eq!(page.watched(), None);
    }

    #[test]
    fn fires_once_per_arming() {
        let mut page = page_with_marker();
        let mut observer = ViewportObserver::default();
        observer.start(&mut page);

        assert!(!observer.notify(false));
        assert!(observer.notify(true));
        assert!(!observer.notify(true));

        observer.rewatch(&mut page);
        assert!(observer.notify(true));
    }

    #[test]
    fn rewatch_when_stopped_does_nothing() {
        let mut page = page_with_marker();
        let mut observer = ViewportObserver::default();
        observer.rewatch(&mut page);
        assert_eq!(page.watch_calls(), 0);
        assert!(!observer.notify(true));
    }

    #[test]
    fn invalid_margin_falls_back() {
        assert_eq!(ViewportObserver::new(f64::NAN).margin_px(), 200.0);
        assert_eq!(ViewportObserver::new(-5.0).margin_px(), 0.0);
    }
}
