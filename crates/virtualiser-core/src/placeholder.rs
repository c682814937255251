#![forbid(unsafe_code)]

//! The single "N older messages hidden" marker.
//!
//! The marker is located by class on every call rather than held as a
//! handle, so a host re-render that drops it never leaves a stale reference
//! behind. At most one marker exists after any operation here.

use tracing::debug;

use crate::page::{HostPage, Selector};

/// Class carried by the marker element.
pub const PLACEHOLDER_CLASS: &str = "virtualiser-hidden-placeholder";

/// Attribute carrying the hidden count.
pub const COUNT_ATTR: &str = "data-hidden-count";

pub const PLACEHOLDER_SELECTOR: Selector = Selector::Class(PLACEHOLDER_CLASS);

/// Label shown inside the marker.
#[must_use]
pub fn label(count: usize) -> String {
    let plural = if count == 1 { "" } else { "s" };
    format!("{count} older message{plural} hidden - scroll up to reveal")
}

/// The current marker, if any.
pub fn locate<P: HostPage>(page: &P) -> Option<P::Element> {
    page.query_first(PLACEHOLDER_SELECTOR)
}

/// Hidden count carried by the current marker.
pub fn count<P: HostPage>(page: &P) -> Option<usize> {
    let marker = locate(page)?;
    page.attribute(&marker, COUNT_ATTR)?.parse().ok()
}

/// Insert a fresh marker immediately before `before`, replacing any existing
/// one.
pub fn insert<P: HostPage>(page: &mut P, before: &P::Element, count: usize) -> Option<P::Element> {
    remove_all(page);
    let marker = page.create_marker(PLACEHOLDER_CLASS)?;
    page.set_attribute(&marker, "role", "button");
    page.set_attribute(&marker, "tabindex", "0");
    write_count(page, &marker, count);
    if !page.insert_before(&marker, before) {
        debug!(
            target: "virtualiser::placeholder",
            "boundary turn has no parent; marker not inserted"
        );
        return None;
    }
    Some(marker)
}

/// Show `count` on the current marker, or remove it when `count` is zero.
pub fn update<P: HostPage>(page: &mut P, count: usize) {
    let Some(marker) = locate(page) else {
        return;
    };
    if count == 0 {
        page.remove(&marker);
        debug!(
            target: "virtualiser::placeholder",
            "all turns revealed, marker removed"
        );
    } else {
        write_count(page, &marker, count);
    }
}

/// Show `count` on the marker and move it before `before`. Inserts a fresh
/// marker when the host dropped the previous one.
pub fn place<P: HostPage>(page: &mut P, before: &P::Element, count: usize) -> Option<P::Element> {
    if let Some(marker) = locate(page) {
        write_count(page, &marker, count);
        if page.insert_before(&marker, before) {
            return Some(marker);
        }
    }
    debug!(
        target: "virtualiser::placeholder",
        count,
        "marker missing; inserting a fresh one"
    );
    insert(page, before, count)
}

/// Remove every marker. Returns how many were removed.
pub fn remove_all<P: HostPage>(page: &mut P) -> usize {
    let markers = page.query_all(PLACEHOLDER_SELECTOR);
    for marker in &markers {
        page.remove(marker);
    }
    markers.len()
}

fn write_count<P: HostPage>(page: &mut P, marker: &P::Element, count: usize) {
    page.set_attribute(marker, COUNT_ATTR, &count.to_string());
    page.set_text(marker, &label(count));
}
