#![forbid(unsafe_code)]

//! Host page capabilities consumed by the virtualiser.
//!
//! The core never touches a browser API directly. Everything it needs from
//! the live document is expressed as [`HostPage`] (queries, attribute and
//! style writes, layout reads, scrolling, marker insertion) plus
//! [`ProximitySensor`] (viewport intersection subscriptions).
//!
//! `virtualiser-web` implements both over `web-sys`; tests use
//! [`MemoryPage`](crate::testing::MemoryPage).

use core::fmt;

/// Element selectors the core issues against the host document.
///
/// Kept deliberately small: the core only ever scans for attribute-tagged
/// elements and for its own marker class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// `tag[name]` when `value` is `None`, otherwise `tag[name="value"]`.
    Attribute {
        tag: &'static str,
        name: &'static str,
        value: Option<&'static str>,
    },
    /// `.class`
    Class(&'static str),
}

impl Selector {
    /// Render as a CSS selector string.
    #[must_use]
    pub fn to_css(self) -> String {
        match self {
            Self::Attribute {
                tag,
                name,
                value: None,
            } => format!("{tag}[{name}]"),
            Self::Attribute {
                tag,
                name,
                value: Some(value),
            } => format!("{tag}[{name}=\"{value}\"]"),
            Self::Class(class) => format!(".{class}"),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css())
    }
}

/// Read/write access to the live, externally-owned document.
///
/// Every read must reflect the document at call time. Implementations must
/// tolerate stale handles: writes to an element that has left the document
/// are silently ignored, and reads return `None` where they can.
pub trait HostPage {
    /// Opaque element handle. Equality is element identity.
    type Element: Clone + PartialEq + fmt::Debug;

    /// All elements matching `selector`, in document order.
    fn query_all(&self, selector: Selector) -> Vec<Self::Element>;

    /// First element matching `selector` in document order.
    fn query_first(&self, selector: Selector) -> Option<Self::Element> {
        self.query_all(selector).into_iter().next()
    }

    fn attribute(&self, element: &Self::Element, name: &str) -> Option<String>;

    fn set_attribute(&mut self, element: &Self::Element, name: &str, value: &str);

    fn remove_attribute(&mut self, element: &Self::Element, name: &str);

    /// Toggle `display: none` on the element's inline style.
    fn set_display_none(&mut self, element: &Self::Element, hidden: bool);

    /// Whether the element is still attached to the document.
    fn is_connected(&self, element: &Self::Element) -> bool;

    /// Rendered height of the element's layout box in CSS pixels.
    ///
    /// An element hidden with `display: none` is shown, measured and hidden
    /// again synchronously, with no paint opportunity in between. Returns
    /// `None` when the element is no longer in the document.
    fn measure_height(&mut self, element: &Self::Element) -> Option<f64>;

    /// Height of the layout viewport in CSS pixels.
    fn viewport_height(&self) -> f64;

    /// Current vertical scroll offset of the document.
    fn scroll_offset(&self) -> f64;

    fn scroll_to(&mut self, offset: f64);

    /// Scroll (instantly) so the element's bottom edge meets the viewport's
    /// bottom edge.
    fn scroll_bottom_into_view(&mut self, element: &Self::Element);

    /// Create a detached `div` carrying `class`. `None` if the document
    /// refused to create it.
    fn create_marker(&mut self, class: &str) -> Option<Self::Element>;

    fn set_text(&mut self, element: &Self::Element, text: &str);

    /// Move (or insert) `element` so it immediately precedes `reference`
    /// under the same parent. Returns `false` when `reference` has no parent.
    fn insert_before(&mut self, element: &Self::Element, reference: &Self::Element) -> bool;

    /// Detach `element` from the document.
    fn remove(&mut self, element: &Self::Element);
}

/// Viewport intersection subscriptions.
///
/// At most one target is watched at a time. [`watch`](Self::watch) binds a
/// subscription to one element instance; callers must [`unwatch`](Self::unwatch)
/// and watch again whenever the target element is replaced or moved.
/// Intersection notifications are delivered by the host back into
/// [`Engine::on_proximity`](crate::engine::Engine::on_proximity).
pub trait ProximitySensor: HostPage {
    /// Start watching `target` against the viewport extended upward by
    /// `top_margin_px`, firing as soon as any part of it intersects.
    fn watch(&mut self, target: &Self::Element, top_margin_px: f64);

    /// Tear down the current subscription, if any.
    fn unwatch(&mut self);
}
