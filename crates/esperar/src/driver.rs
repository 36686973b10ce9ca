//! The driver seam: abstract traits for the browser protocol client.
//!
//! Esperar does not implement a wire protocol. It drives any client that
//! can implement [`Driver`] and [`Element`]: a WebDriver binding, a CDP
//! client, or the in-crate [`mock`](crate::mock) doubles used in tests.
//! Every method on this seam may fail with a [`DriverError`]; the
//! `NotFound` and `Stale` kinds are expected during page transitions and
//! are treated as transient by the wait engine, never as faults.

use crate::locator::Locator;
use crate::result::DriverResult;
use std::sync::Arc;

/// WebDriver key code for Enter, accepted by `send_keys`.
pub const ENTER: &str = "\u{e007}";

/// One resolved DOM node, as seen at the time of lookup.
///
/// A handle may go stale if the DOM changes; implementations signal this
/// with [`DriverError::Stale`](crate::result::DriverError::Stale) and the
/// caller re-resolves through the locator.
pub trait Element: Send + Sync {
    /// Whether the node is currently rendered visible
    fn is_displayed(&self) -> DriverResult<bool>;

    /// Whether the node is currently enabled for interaction
    fn is_enabled(&self) -> DriverResult<bool>;

    /// The rendered text content of the node
    fn text(&self) -> DriverResult<String>;

    /// An attribute value, if the attribute is present
    fn attribute(&self, name: &str) -> DriverResult<Option<String>>;

    /// Clear any current value (text inputs)
    fn clear(&self) -> DriverResult<()>;

    /// Send a key sequence to the node
    fn send_keys(&self, keys: &str) -> DriverResult<()>;

    /// Click the node
    fn click(&self) -> DriverResult<()>;

    /// Select the option with the given visible label (select elements)
    fn select_by_visible_text(&self, label: &str) -> DriverResult<()>;

    /// Select the option with the given `value` attribute (select elements)
    fn select_by_value(&self, value: &str) -> DriverResult<()>;

    /// Select the option at the given zero-based index (select elements)
    fn select_by_index(&self, index: usize) -> DriverResult<()>;

    /// Visible text of the first selected option (select elements)
    fn first_selected_option_text(&self) -> DriverResult<String>;

    /// `value` attribute of the first selected option (select elements)
    fn first_selected_option_value(&self) -> DriverResult<String>;
}

/// A resolved, possibly-stale reference to one DOM node
pub type ElementHandle = Arc<dyn Element>;

/// One live browser-automation connection.
///
/// Owned by whoever created it; page objects receive a shared reference
/// and never close the session.
pub trait Driver: Send + Sync {
    /// Navigate the session to a URL
    fn navigate(&self, url: &str) -> DriverResult<()>;

    /// The URL the session is currently at
    fn current_url(&self) -> DriverResult<String>;

    /// The current page title
    fn title(&self) -> DriverResult<String>;

    /// Resolve a locator to all matching elements, in document order.
    ///
    /// An empty vector and a `NotFound` error both mean "nothing there
    /// right now"; clients may use either.
    fn find_elements(&self, locator: &Locator) -> DriverResult<Vec<ElementHandle>>;
}

/// Shared reference to a live session
pub type SharedDriver = Arc<dyn Driver>;
