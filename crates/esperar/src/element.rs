//! Element facade: wait-then-act and wait-then-assert over one element.
//!
//! The facade holds a locator, not a handle: every wait and every action
//! re-resolves the element through the driver, so a handle going stale
//! between polls is just "not currently present". All operations share the
//! facade's [`WaitPolicy`].

use crate::conditions;
use crate::driver::{ElementHandle, SharedDriver, ENTER};
use crate::locator::Locator;
use crate::result::{DriverError, DriverResult, EsperarError, EsperarResult};
use crate::wait::{ConditionWaiter, WaitPolicy};

/// Wraps one element behind a locator, exposing wait-then-act operations
/// (type, click, select) and wait-then-assert operations
/// (`should_be_visible`, `should_contain_text`).
#[derive(Clone)]
pub struct ElementFacade {
    driver: SharedDriver,
    locator: Locator,
    policy: WaitPolicy,
}

impl std::fmt::Debug for ElementFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementFacade")
            .field("locator", &self.locator)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl ElementFacade {
    /// Create a facade with the element-default wait policy
    /// (`NotFound` and `Stale` ignored while polling)
    #[must_use]
    pub fn new(driver: SharedDriver, locator: Locator) -> Self {
        Self::with_policy(driver, locator, WaitPolicy::element_defaults())
    }

    /// Create a facade with an explicit policy
    #[must_use]
    pub fn with_policy(driver: SharedDriver, locator: Locator, policy: WaitPolicy) -> Self {
        Self {
            driver,
            locator,
            policy,
        }
    }

    /// The locator this facade resolves
    #[must_use]
    pub const fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Override the wait timeout for subsequent waits
    pub fn set_wait_for_timeout(&mut self, timeout_ms: u64) {
        self.policy.timeout_ms = timeout_ms;
    }

    /// Override the polling interval for subsequent waits
    pub fn set_polling_interval(&mut self, poll_interval_ms: u64) {
        self.policy.poll_interval_ms = poll_interval_ms;
    }

    fn waiter(&self) -> ConditionWaiter {
        ConditionWaiter::new(self.policy.clone())
    }

    fn resolve(&self) -> DriverResult<ElementHandle> {
        self.driver
            .find_elements(&self.locator)?
            .into_iter()
            .next()
            .ok_or_else(|| DriverError::NotFound {
                locator: self.locator.to_string(),
            })
    }

    // ------------------------------------------------------------------
    // Waits
    // ------------------------------------------------------------------

    /// Wait until the element is displayed.
    ///
    /// # Errors
    ///
    /// [`EsperarError::ElementNotVisible`] on timeout, carrying the last
    /// observed driver failure.
    pub fn wait_until_visible(&self) -> EsperarResult<&Self> {
        self.waiter()
            .wait_until(&format!("{} to be visible", self.locator), || {
                conditions::is_displayed(self.driver.as_ref(), &self.locator)
            })
            .map_err(|err| Self::as_not_visible(&self.locator, err))?;
        Ok(self)
    }

    /// Wait until the element is no longer displayed (or gone).
    ///
    /// # Errors
    ///
    /// [`EsperarError::UnexpectedElementVisible`] on timeout.
    pub fn wait_until_not_visible(&self) -> EsperarResult<&Self> {
        self.waiter()
            .wait_until(&format!("{} to disappear", self.locator), || {
                conditions::is_not_displayed(self.driver.as_ref(), &self.locator)
            })
            .map_err(|err| match err {
                EsperarError::WaitTimedOut { timeout_ms, .. } => {
                    EsperarError::UnexpectedElementVisible {
                        subject: self.locator.to_string(),
                        timeout_ms,
                    }
                }
                other => other,
            })?;
        Ok(self)
    }

    /// Wait until the element is enabled
    pub fn wait_until_enabled(&self) -> EsperarResult<&Self> {
        self.waiter()
            .wait_until(&format!("{} to be enabled", self.locator), || {
                conditions::is_enabled(self.driver.as_ref(), &self.locator)
            })
            .map_err(|err| Self::as_not_visible(&self.locator, err))?;
        Ok(self)
    }

    /// Wait until the element is disabled
    pub fn wait_until_disabled(&self) -> EsperarResult<&Self> {
        self.waiter()
            .wait_until(&format!("{} to be disabled", self.locator), || {
                Ok(!conditions::is_enabled(self.driver.as_ref(), &self.locator)?)
            })
            .map_err(|err| Self::as_not_visible(&self.locator, err))?;
        Ok(self)
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
    // Wait-then-act
    // ------------------------------------------------------------------

    /// Wait for the element to be enabled, clear it, then type `value`
    pub fn type_into(&self, value: &str) -> EsperarResult<&Self> {
        self.wait_until_enabled()?;
        let element = self.resolve()?;
        element.clear()?;
        element.send_keys(value)?;
        Ok(self)
    }

    /// Like [`type_into`](Self::type_into), then press Enter
    pub fn type_and_enter(&self, value: &str) -> EsperarResult<&Self> {
        self.type_into(value)?;
        self.resolve()?.send_keys(ENTER)?;
        Ok(self)
    }

    /// Wait for the element to be enabled, then select the option with the
    /// given visible label
    pub fn select_by_visible_text(&self, label: &str) -> EsperarResult<&Self> {
        self.wait_until_enabled()?;
        self.resolve()?.select_by_visible_text(label)?;
        Ok(self)
    }

    /// Wait for the element to be enabled, then select the option with the
    /// given `value` attribute
    pub fn select_by_value(&self, value: &str) -> EsperarResult<&Self> {
        self.wait_until_enabled()?;
        self.resolve()?.select_by_value(value)?;
        Ok(self)
    }

    /// Wait for the element to be enabled, then select the option at the
    /// given zero-based index
    pub fn select_by_index(&self, index: usize) -> EsperarResult<&Self> {
        self.wait_until_enabled()?;
        self.resolve()?.select_by_index(index)?;
        Ok(self)
    }

    /// Wait for the element to be enabled, then click it.
    ///
    /// A single transient failure during the click itself is retried
    /// exactly once against a freshly resolved handle; a second failure
    /// propagates as fatal.
    pub fn click(&self) -> EsperarResult<&Self> {
        self.wait_until_enabled()?;
        match self.resolve().and_then(|element| element.click()) {
            Ok(()) => Ok(self),
            Err(failure) if failure.kind().is_transient() => {
                self.resolve().and_then(|element| element.click())?;
                Ok(self)
            }
            Err(failure) => Err(failure.into()),
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Is the element present and displayed right now?
    ///
    /// Never fails: not-found and stale both come back as `false`.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        matches!(
            conditions::is_displayed(self.driver.as_ref(), &self.locator),
            Ok(true)
        )
    }

    /// Identical check to [`is_visible`](Self::is_visible); the name
    /// documents the no-wait, immediate contract relied on by the
    /// assertion helpers.
    #[must_use]
    pub fn is_currently_visible(&self) -> bool {
        self.is_visible()
    }

    /// Is the element present and enabled right now? Never fails.
    #[must_use]
    pub fn is_currently_enabled(&self) -> bool {
        matches!(
            conditions::is_enabled(self.driver.as_ref(), &self.locator),
            Ok(true)
        )
    }

    /// Is the element attached to the DOM at all, displayed or not?
    ///
    /// Presence is derived from failure classification on the driver seam,
    /// never from inspecting error message text.
    #[must_use]
    pub fn is_present(&self) -> bool {
        match self.resolve() {
            Ok(_) => true,
            Err(failure) => !matches!(failure.kind(), crate::result::FailureKind::NotFound),
        }
    }

    /// Wait for visibility, then return the rendered text
    pub fn text(&self) -> EsperarResult<String> {
        self.wait_until_visible()?;
        Ok(self.resolve()?.text()?)
    }

    /// Wait for visibility, then return the `value` attribute (empty if unset)
    pub fn value(&self) -> EsperarResult<String> {
        self.wait_until_visible()?;
        Ok(self.resolve()?.attribute("value")?.unwrap_or_default())
    }

    /// Wait for visibility, then return the element's text if non-empty,
    /// else its `value` attribute, else the empty string.
    ///
    /// Inputs and text nodes expose content differently; this is the
    /// fallback chain that papers over the difference.
    pub fn get_text_value(&self) -> EsperarResult<String> {
        self.wait_until_visible()?;
        let element = self.resolve()?;
        let text = element.text()?;
        if !text.is_empty() {
            return Ok(text);
        }
        let value = element.attribute("value")?.unwrap_or_default();
        Ok(value)
    }

    /// Wait for visibility, then return the visible text of the first
    /// selected option
    pub fn get_selected_visible_text(&self) -> EsperarResult<String> {
        self.wait_until_visible()?;
        Ok(self.resolve()?.first_selected_option_text()?)
    }

    /// Wait for visibility, then return the `value` attribute of the first
    /// selected option
    pub fn get_selected_value(&self) -> EsperarResult<String> {
        self.wait_until_visible()?;
        Ok(self.resolve()?.first_selected_option_value()?)
    }

    // ------------------------------------------------------------------
    // Assertions
    // ------------------------------------------------------------------

    /// Assert the element is visible right now
    pub fn should_be_visible(&self) -> EsperarResult<()> {
        if self.is_currently_visible() {
            Ok(())
        } else {
            Err(EsperarError::AssertionFailed {
                message: format!("element {} should be visible", self.locator),
            })
        }
    }

    /// Assert the element is not visible right now
    pub fn should_not_be_visible(&self) -> EsperarResult<()> {
        if self.is_currently_visible() {
            Err(EsperarError::AssertionFailed {
                message: format!("element {} should not be visible", self.locator),
            })
        } else {
            Ok(())
        }
    }

    /// Assert the element is attached to the DOM right now, displayed or not
    pub fn should_be_present(&self) -> EsperarResult<()> {
        if self.is_present() {
            Ok(())
        } else {
            Err(EsperarError::AssertionFailed {
                message: format!("element {} should be present", self.locator),
            })
        }
    }

    /// Assert the element is not attached to the DOM right now
    pub fn should_not_be_present(&self) -> EsperarResult<()> {
        if self.is_present() {
            Err(EsperarError::AssertionFailed {
                message: format!("element {} should not be present", self.locator),
            })
        } else {
            Ok(())
        }
    }

    /// Assert the element is enabled right now
    pub fn should_be_enabled(&self) -> EsperarResult<()> {
        if self.is_currently_enabled() {
            Ok(())
        } else {
            Err(EsperarError::AssertionFailed {
                message: format!("element {} should be enabled", self.locator),
            })
        }
    }

    /// Assert the element is not enabled right now
    pub fn should_not_be_enabled(&self) -> EsperarResult<()> {
        if self.is_currently_enabled() {
            Err(EsperarError::AssertionFailed {
                message: format!("element {} should not be enabled", self.locator),
            })
        } else {
            Ok(())
        }
    }

    /// Assert the element's rendered text contains `needle`
    pub fn should_contain_text(&self, needle: &str) -> EsperarResult<()> {
        if self.currently_contains_text(needle) {
            Ok(())
        } else {
            Err(EsperarError::AssertionFailed {
                message: format!(
                    "the text '{needle}' was not found in element {}",
                    self.locator
                ),
            })
        }
    }

    /// Assert the element's rendered text does not contain `needle`
    pub fn should_not_contain_text(&self, needle: &str) -> EsperarResult<()> {
        if self.currently_contains_text(needle) {
            Err(EsperarError::AssertionFailed {
                message: format!(
                    "the text '{needle}' was unexpectedly found in element {}",
                    self.locator
                ),
            })
        } else {
            Ok(())
        }
    }

    fn currently_contains_text(&self, needle: &str) -> bool {
        matches!(
            conditions::contains_text(self.driver.as_ref(), &self.locator, needle),
            Ok(true)
        )
    }

    // ------------------------------------------------------------------
    // Fluent combinators
    // ------------------------------------------------------------------

    /// Cosmetic combinator for call-site readability; returns `self` unchanged
    #[must_use]
    pub const fn and(&self) -> &Self {
        self
    }

    /// Cosmetic combinator for call-site readability; returns `self` unchanged
    #[must_use]
    pub const fn then(&self) -> &Self {
        self
    }
}
