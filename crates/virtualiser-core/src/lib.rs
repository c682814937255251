#![forbid(unsafe_code)]

//! `virtualiser-core` hides the older turns of a long chat transcript and
//! reveals them in batches as the user scrolls back up.
//!
//! Design goals:
//! - **Host-driven**: the embedding environment owns the document, the
//!   clock and the event loop. The core reads and writes the document only
//!   through [`page::HostPage`] and never sleeps or spawns.
//! - **Stateless over the document**: which turns exist and which are hidden
//!   is re-read from the live page on every operation ([`ledger`]).
//! - **No browser bindings**: suitable for native tests; `virtualiser-web`
//!   supplies the `web-sys` implementation.
//!
//! The moving parts, bottom-up:
//! - [`ledger`] scans turns and owns the hidden flag.
//! - [`placeholder`] maintains the single "N older messages hidden" marker.
//! - [`observer`] watches the marker's proximity to the viewport.
//! - [`strategy`] decides how many turns stay visible and how many a batch
//!   reveals.
//! - [`engine`] ties them together: `apply`, `reveal_batch`, `reveal_all`.
//! - [`navigation`] owns the engine per conversation and waits for content
//!   after the host navigates.
//! - [`storage`] persists which conversations are enabled.

pub mod config;
pub mod engine;
pub mod ledger;
pub mod navigation;
pub mod observer;
pub mod page;
pub mod placeholder;
pub mod storage;
pub mod strategy;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

pub use config::{ConfigError, StrategySelection, VirtualiserConfig, WaitPolicy};
pub use engine::{ApplyOutcome, Engine, RevealOutcome};
pub use ledger::Turn;
pub use navigation::{
    Activation, ActionError, BoundedWait, DisablePlan, NavigationCoordinator, NavigationEvent,
    PollStatus, WaitStep, wait_until,
};
pub use page::{HostPage, ProximitySensor, Selector};
pub use storage::{EnablementStore, StorageBackend, StorageError, conversation_id};
pub use strategy::{CountSizing, PageHeightSizing, ScrollContinuity, SizingKind, SizingStrategy};
