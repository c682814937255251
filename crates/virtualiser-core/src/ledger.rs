#![forbid(unsafe_code)]

//! Visibility ledger: the authoritative read of which turns exist and which
//! are hidden.
//!
//! There is no cached state. Every call scans the live document, so turns
//! added or removed by the host between calls are always reflected. The
//! ledger is also the only writer of the hidden flag.

use crate::page::{HostPage, Selector};

/// Attribute the host page stamps on every conversation turn.
pub const TURN_ID_ATTR: &str = "data-turn-id";

/// Attribute the virtualiser owns to mark a hidden turn.
pub const HIDDEN_ATTR: &str = "data-virtualiser-hidden";

/// `article[data-turn-id]`
pub const TURN_SELECTOR: Selector = Selector::Attribute {
    tag: "article",
    name: TURN_ID_ATTR,
    value: None,
};

/// `article[data-virtualiser-hidden="true"]`
pub const HIDDEN_SELECTOR: Selector = Selector::Attribute {
    tag: "article",
    name: HIDDEN_ATTR,
    value: Some("true"),
};

/// One conversation turn as seen at scan time.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn<E> {
    /// Host-assigned identifier (`data-turn-id`); empty if the attribute
    /// vanished between the scan and the read.
    pub id: String,
    pub element: E,
}

fn scan<P: HostPage>(page: &P, selector: Selector) -> Vec<Turn<P::Element>> {
    page.query_all(selector)
        .into_iter()
        .map(|element| Turn {
            id: page.attribute(&element, TURN_ID_ATTR).unwrap_or_default(),
            element,
        })
        .collect()
}

/// Every turn in document order (oldest first).
pub fn all_turns<P: HostPage>(page: &P) -> Vec<Turn<P::Element>> {
    scan(page, TURN_SELECTOR)
}

/// Turns currently flagged hidden, in document order.
pub fn hidden_turns<P: HostPage>(page: &P) -> Vec<Turn<P::Element>> {
    scan(page, HIDDEN_SELECTOR)
}

/// Number of turns currently in the document.
pub fn turn_count<P: HostPage>(page: &P) -> usize {
    page.query_all(TURN_SELECTOR).len()
}

/// Number of turns currently flagged hidden.
pub fn hidden_count<P: HostPage>(page: &P) -> usize {
    page.query_all(HIDDEN_SELECTOR).len()
}

#[must_use]
pub fn is_hidden<P: HostPage>(page: &P, element: &P::Element) -> bool {
    page.attribute(element, HIDDEN_ATTR).as_deref() == Some("true")
}

/// Flag `element` hidden and take it out of layout.
pub fn hide<P: HostPage>(page: &mut P, element: &P::Element) {
    page.set_display_none(element, true);
    page.set_attribute(element, HIDDEN_ATTR, "true");
}

/// Clear the hidden flag and restore the element's layout.
pub fn unhide<P: HostPage>(page: &mut P, element: &P::Element) {
    page.set_display_none(element, false);
    page.remove_attribute(element, HIDDEN_ATTR);
}
