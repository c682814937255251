#![forbid(unsafe_code)]

//! Browser binding for `virtualiser-core`.
//!
//! `WebPage` implements the core's host-page traits over `web-sys`.
//! [`Virtualiser`] is the `wasm-bindgen` export that owns a `WebPage` and
//! drives the navigation coordinator from DOM callbacks. The logic it shares
//! with native tests lives in `runner_core`.

#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::{Virtualiser, WebPage, WebStorage};

// Runner core is used by the wasm module and by native tests.
#[cfg(any(target_arch = "wasm32", test))]
mod runner_core;
