//! Named boolean predicates over elements and pages.
//!
//! Each function resolves its locator fresh on every call, so a predicate
//! polled by [`ConditionWaiter`](crate::wait::ConditionWaiter) always sees
//! the current DOM. Negated variants are the logical complement evaluated
//! fresh, not a cached `!previous`: a locator that no longer resolves
//! counts as "not displayed".
//!
//! These predicates classify and propagate; they never log or translate
//! errors. That is the callers' job.

use crate::driver::Driver;
use crate::locator::Locator;
use crate::result::{DriverError, DriverResult};

/// True iff the locator resolves and the first match reports visible.
pub fn is_displayed(driver: &dyn Driver, locator: &Locator) -> DriverResult<bool> {
    match driver.find_elements(locator)?.first() {
        Some(element) => element.is_displayed(),
        None => Ok(false),
    }
}

/// True iff the locator resolves to zero elements or none of them is
/// displayed. Transient failures mean the element is gone, which satisfies
/// the condition.
pub fn is_not_displayed(driver: &dyn Driver, locator: &Locator) -> DriverResult<bool> {
    let elements = match driver.find_elements(locator) {
        Ok(elements) => elements,
        Err(failure) if failure.kind().is_transient() => return Ok(true),
        Err(failure) => return Err(failure),
    };
    for element in &elements {
        match element.is_displayed() {
            Ok(true) => return Ok(false),
            Ok(false) => {}
            Err(failure) if failure.kind().is_transient() => {}
            Err(failure) => return Err(failure),
        }
    }
    Ok(true)
}

/// True iff the locator resolves and the first match reports enabled.
pub fn is_enabled(driver: &dyn Driver, locator: &Locator) -> DriverResult<bool> {
    match driver.find_elements(locator)?.first() {
        Some(element) => element.is_enabled(),
        None => Ok(false),
    }
}

/// True iff the resolved element's rendered text contains `needle`
/// (case-sensitive substring).
pub fn contains_text(driver: &dyn Driver, locator: &Locator, needle: &str) -> DriverResult<bool> {
    match driver.find_elements(locator)?.first() {
        Some(element) => Ok(element.text()?.contains(needle)),
        None => Ok(false),
    }
}

/// True iff any of the locators currently resolves to a displayed element.
///
/// Used for races: the caller runs ONE wait whose predicate is this OR, so
/// a single timeout budget is shared across all candidates. If nothing is
/// displayed but a candidate raised a transient failure, that failure is
/// surfaced so the wait records it as the last cause.
pub fn any_displayed(driver: &dyn Driver, locators: &[Locator]) -> DriverResult<bool> {
    let mut last_transient: Option<DriverError> = None;
    for locator in locators {
        match is_displayed(driver, locator) {
            Ok(true) => return Ok(true),
            Ok(false) => {}
            Err(failure) if failure.kind().is_transient() => last_transient = Some(failure),
            Err(failure) => return Err(failure),
        }
    }
    match last_transient {
        Some(failure) => Err(failure),
        None => Ok(false),
    }
}

/// True iff `needle` appears anywhere in the page body text.
pub fn page_contains_text(driver: &dyn Driver, needle: &str) -> DriverResult<bool> {
    contains_text(driver, &Locator::tag_name("body"), needle)
}

/// True iff `needle` no longer appears anywhere in the page body text.
/// A body that cannot be resolved has no text, which satisfies the
/// condition.
pub fn page_does_not_contain_text(driver: &dyn Driver, needle: &str) -> DriverResult<bool> {
    match page_contains_text(driver, needle) {
        Ok(present) => Ok(!present),
        Err(failure) if failure.kind().is_transient() => Ok(true),
        Err(failure) => Err(failure),
    }
}

/// True iff any of the needles satisfies [`contains_text`] within `scope`.
pub fn contains_any_text(
    driver: &dyn Driver,
    scope: &Locator,
    needles: &[&str],
) -> DriverResult<bool> {
    let text = match driver.find_elements(scope)?.first() {
        Some(element) => element.text()?,
        None => return Ok(false),
    };
    Ok(needles.iter().any(|needle| text.contains(needle)))
}

/// True iff the session's current page title equals `expected`.
pub fn title_equals(driver: &dyn Driver, expected: &str) -> DriverResult<bool> {
    Ok(driver.title()? == expected)
}

/// True iff the session's current page title contains `needle`.
pub fn title_contains(driver: &dyn Driver, needle: &str) -> DriverResult<bool> {
    Ok(driver.title()?.contains(needle))
}

/// Logical complement of [`title_equals`], evaluated fresh.
pub fn title_differs(driver: &dyn Driver, expected: &str) -> DriverResult<bool> {
    Ok(driver.title()? != expected)
}
