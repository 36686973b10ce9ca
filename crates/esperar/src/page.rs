//! Page objects: typed views over a live session.
//!
//! [`PageObject`] is the base every concrete page embeds. It owns a shared
//! driver handle plus a wait policy, and exposes the rendered-element wait
//! primitives page classes are built from. The [`Page`] trait is what the
//! [`registry`](crate::registry) constructs and caches; [`UrlPattern`]
//! declares which URLs a page type claims.

use crate::conditions;
use crate::driver::{ElementHandle, SharedDriver};
use crate::element::ElementFacade;
use crate::locator::Locator;
use crate::result::{EsperarError, EsperarResult};
use crate::wait::{ConditionWaiter, WaitPolicy};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Pattern a page type uses to claim URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UrlPattern {
    /// Exact URL match
    Exact(String),
    /// Prefix match
    Prefix(String),
    /// Contains substring
    Contains(String),
    /// Regex match
    Regex(String),
    /// Glob pattern (e.g., "*/checkout/*")
    Glob(String),
    /// Match any URL
    Any,
}

impl UrlPattern {
    /// Check if a URL matches this pattern
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Exact(pattern) => url == pattern,
            Self::Prefix(pattern) => url.starts_with(pattern),
            Self::Contains(pattern) => url.contains(pattern),
            Self::Regex(pattern) => regex::Regex::new(pattern)
                .map(|re| re.is_match(url))
                .unwrap_or(false),
            Self::Glob(pattern) => Self::glob_matches(pattern, url),
            Self::Any => true,
        }
    }

    /// Simple glob matching for URLs
    fn glob_matches(pattern: &str, url: &str) -> bool {
        let parts: Vec<&str> = pattern.split('*').collect();
        if parts.is_empty() {
            return url.is_empty();
        }

        let mut pos = 0;
        for (i, part) in parts.iter().enumerate() {
            if part.is_empty() {
                continue;
            }
            if let Some(found) = url[pos..].find(part) {
                if i == 0 && found != 0 {
                    return false;
                }
                pos += found + part.len();
            } else {
                return false;
            }
        }

        // If pattern ends with *, any remaining URL is fine
        // Otherwise, must have consumed all of URL
        pattern.ends_with('*') || pos == url.len()
    }
}

/// Base state shared by every concrete page class.
///
/// Cloning is cheap: clones share the driver and copy the policy, so a
/// page can hand out facades with independent timeout overrides.
#[derive(Clone)]
pub struct PageObject {
    driver: SharedDriver,
    policy: WaitPolicy,
}

impl std::fmt::Debug for PageObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageObject")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl PageObject {
    /// Create a page base with element-default wait policy
    #[must_use]
    pub fn new(driver: SharedDriver) -> Self {
        Self::with_policy(driver, WaitPolicy::element_defaults())
    }

    /// Create a page base with an explicit policy
    #[must_use]
    pub fn with_policy(driver: SharedDriver, policy: WaitPolicy) -> Self {
        Self { driver, policy }
    }

    /// The session this page is bound to
    #[must_use]
    pub fn driver(&self) -> &SharedDriver {
        &self.driver
    }

    /// The wait policy applied to this page's waits and facades
    #[must_use]
    pub const fn policy(&self) -> &WaitPolicy {
        &self.policy
    }

    /// Override the wait timeout for this page and facades created after
    pub fn set_wait_for_timeout(&mut self, timeout_ms: u64) {
        self.policy.timeout_ms = timeout_ms;
    }

    /// Override the polling interval for this page and facades created after
    pub fn set_polling_interval(&mut self, poll_interval_ms: u64) {
        self.policy.poll_interval_ms = poll_interval_ms;
    }

    /// A facade over the element behind `locator`, inheriting this page's
    /// policy
    #[must_use]
    pub fn element(&self, locator: Locator) -> ElementFacade {
        ElementFacade::with_policy(self.driver.clone(), locator, self.policy.clone())
    }

    /// Navigate the session to `url`
    ///
    /// # Errors
    ///
    /// Propagates the driver failure if navigation is refused.
    pub fn open_at(&self, url: &str) -> EsperarResult<()> {
        debug!(url, "navigating");
        self.driver.navigate(url)?;
        Ok(())
    }

    /// The session's current page title
    pub fn title(&self) -> EsperarResult<String> {
        Ok(self.driver.title()?)
    }

    /// The URL the session is currently at
    pub fn current_url(&self) -> EsperarResult<String> {
        Ok(self.driver.current_url()?)
    }

    /// Immediate check: does the page body contain `needle` right now?
    /// Absence and transient failures both come back as `false`.
    #[must_use]
    pub fn contains_text(&self, needle: &str) -> bool {
        matches!(
            conditions::page_contains_text(self.driver.as_ref(), needle),
            Ok(true)
        )
    }

    /// All elements currently matching `locator`, in document order
    pub fn resolve_all(&self, locator: &Locator) -> EsperarResult<Vec<ElementHandle>> {
        Ok(self.driver.find_elements(locator)?)
    }

    fn waiter(&self) -> ConditionWaiter {
        ConditionWaiter::new(self.policy.clone())
    }

    // ------------------------------------------------------------------
    // Rendered-element waits
    // ------------------------------------------------------------------

    /// Wait until `locator` resolves to a displayed element.
    ///
    /// # Errors
    ///
    /// [`EsperarError::ElementNotVisible`] on timeout.
    pub fn wait_for_rendered_elements(&self, locator: &Locator) -> EsperarResult<()> {
        self.waiter()
            .wait_until(&format!("{locator} to render"), || {
                conditions::is_displayed(self.driver.as_ref(), locator)
            })
            .map_err(|err| Self::as_not_visible(locator, err))?;
        Ok(())
    }

    /// Wait until `locator` resolves to at least one element, displayed
    /// or not.
    pub fn wait_for_elements_present(&self, locator: &Locator) -> EsperarResult<()> {
        self.waiter()
            .wait_until(&format!("{locator} to be present"), || {
                Ok(!self.driver.find_elements(locator)?.is_empty())
            })
            .map_err(|err| Self::as_not_visible(locator, err))?;
        Ok(())
    }

    /// Wait until no displayed element matches `locator`.
    ///
    /// # Errors
    ///
    /// [`EsperarError::UnexpectedElementVisible`] on timeout.
    pub fn wait_for_rendered_elements_to_disappear(&self, locator: &Locator) -> EsperarResult<()> {
        self.waiter()
            .wait_until(&format!("{locator} to disappear"), || {
                conditions::is_not_displayed(self.driver.as_ref(), locator)
            })
            .map_err(|err| match err {
                EsperarError::WaitTimedOut { timeout_ms, .. } => {
                    EsperarError::UnexpectedElementVisible {
                        subject: locator.to_string(),
                        timeout_ms,
                    }
                }
                other => other,
            })?;
        Ok(())
    }

    /// Wait until ANY of the locators resolves to a displayed element.
    ///
    /// This is one wait with one timeout budget shared across all
    /// candidates, not a sequence of per-candidate waits.
    pub fn wait_for_any_rendered_element_of(&self, locators: &[Locator]) -> EsperarResult<()> {
        let described = locators
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" or ");
        self.waiter()
            .wait_until(&format!("any of {described} to render"), || {
                conditions::any_displayed(self.driver.as_ref(), locators)
            })
            .map_err(|err| match err {
                EsperarError::WaitTimedOut {
                    timeout_ms, cause, ..
                } => EsperarError::ElementNotVisible {
                    subject: format!("any of {described}"),
                    timeout_ms,
                    cause,
                },
                other => other,
            })?;
        Ok(())
    }

    fn as_not_visible(locator: &Locator, err: EsperarError) -> EsperarError {
        match err {
            EsperarError::WaitTimedOut {
                timeout_ms, cause, ..
            } => EsperarError::ElementNotVisible {
                subject: locator.to_string(),
                timeout_ms,
                cause,
            },
            other => other,
        }
    }

    // ------------------------------------------------------------------
    // Text and title waits
    // ------------------------------------------------------------------

    /// Wait until the page body contains `needle`
    pub fn wait_for_text_to_appear(&self, needle: &str) -> EsperarResult<()> {
        self.waiter()
            .wait_until(&format!("page to contain '{needle}'"), || {
                conditions::page_contains_text(self.driver.as_ref(), needle)
            })?;
        Ok(())
    }

    /// Wait until the element behind `scope` contains `needle`
    pub fn wait_for_text_to_appear_in(&self, scope: &Locator, needle: &str) -> EsperarResult<()> {
        self.waiter()
            .wait_until(&format!("{scope} to contain '{needle}'"), || {
                conditions::contains_text(self.driver.as_ref(), scope, needle)
            })?;
        Ok(())
    }

    /// Wait until the page body no longer contains `needle`.
    ///
    /// # Errors
    ///
    /// [`EsperarError::UnexpectedElementVisible`] on timeout.
    pub fn wait_for_text_to_disappear(&self, needle: &str) -> EsperarResult<()> {
        self.waiter()
            .wait_until(&format!("'{needle}' to disappear"), || {
                conditions::page_does_not_contain_text(self.driver.as_ref(), needle)
            })
            .map_err(|err| match err {
                EsperarError::WaitTimedOut { timeout_ms, .. } => {
                    EsperarError::UnexpectedElementVisible {
                        subject: format!("text '{needle}'"),
                        timeout_ms,
                    }
                }
                other => other,
            })?;
        Ok(())
    }

    /// Wait until any of the needles appears within `scope`
    pub fn wait_for_any_text_to_appear_in(
        &self,
        scope: &Locator,
        needles: &[&str],
    ) -> EsperarResult<()> {
        self.waiter()
            .wait_until(&format!("{scope} to contain one of {needles:?}"), || {
                conditions::contains_any_text(self.driver.as_ref(), scope, needles)
            })?;
        Ok(())
    }

    /// Wait until any of the needles appears in the page body
    pub fn wait_for_any_text_to_appear(&self, needles: &[&str]) -> EsperarResult<()> {
        self.wait_for_any_text_to_appear_in(&Locator::tag_name("body"), needles)
    }

    /// Wait until the page title equals `expected`
    pub fn wait_for_title_to_appear(&self, expected: &str) -> EsperarResult<()> {
        self.waiter()
            .wait_until(&format!("title to be '{expected}'"), || {
                conditions::title_equals(self.driver.as_ref(), expected)
            })?;
        Ok(())
    }

    /// Wait until the page title no longer equals `previous`
    pub fn wait_for_title_to_disappear(&self, previous: &str) -> EsperarResult<()> {
        self.waiter()
            .wait_until(&format!("title to change from '{previous}'"), || {
                conditions::title_differs(self.driver.as_ref(), previous)
            })?;
        Ok(())
    }

    /// Unconditional settle delay; see [`crate::wait::wait_a_bit`]
    pub fn wait_a_bit(&self, millis: u64) {
        crate::wait::wait_a_bit(millis);
    }
}

/// A typed page class the registry can construct and cache.
///
/// `at` receives the prepared base and may fail, which the registry
/// normalizes into [`EsperarError::WrongPage`]. A page that declares a
/// [`UrlPattern`] is only constructed when the session's current URL
/// matches it.
pub trait Page: Sized + Send + Sync + 'static {
    /// Build this page over the prepared base.
    ///
    /// # Errors
    ///
    /// Any error here means the page cannot be used against the current
    /// session state.
    fn at(base: PageObject) -> EsperarResult<Self>;

    /// The URLs this page type claims; `None` claims every URL
    #[must_use]
    fn url_pattern() -> Option<UrlPattern> {
        None
    }

    /// Name used in diagnostics; defaults to the type name
    #[must_use]
    fn page_name() -> &'static str {
        std::any::type_name::<Self>()
    }
}
