//! Scriptable test doubles for the driver seam.
//!
//! [`MockElement`] plays back scripted `is_displayed`/`is_enabled`
//! sequences (the last value repeats) and can inject transient failures,
//! so tests can reproduce page transitions: an element that is absent for
//! two polls and visible on the third, a click that goes stale once, and
//! so on. [`MockDriver`] maps locators to elements and records every
//! navigation. Both are exported so downstream suites can unit-test their
//! own page objects without a browser.

use crate::driver::{Driver, Element, ElementHandle, SharedDriver};
use crate::locator::Locator;
use crate::result::{DriverError, DriverResult, EsperarError, EsperarResult, FailureKind};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn failure_of(kind: FailureKind, subject: &str) -> DriverError {
    match kind {
        FailureKind::NotFound => DriverError::NotFound {
            locator: subject.to_string(),
        },
        FailureKind::Stale => DriverError::Stale {
            subject: subject.to_string(),
        },
        FailureKind::InvalidSelector => DriverError::InvalidSelector {
            selector: subject.to_string(),
            message: "scripted failure".to_string(),
        },
        FailureKind::Session => DriverError::Session {
            message: format!("scripted failure for {subject}"),
        },
    }
}

#[derive(Debug, Default)]
struct ElementState {
    displayed: Vec<bool>,
    displayed_step: usize,
    enabled: Vec<bool>,
    enabled_step: usize,
    text: String,
    attributes: HashMap<String, String>,
    options: Vec<(String, String)>,
    selected_option: Option<String>,
    selected_value: Option<String>,
    stale_remaining: usize,
    click_transient_failures: usize,
    clicks: usize,
    clears: usize,
    sent_keys: Vec<String>,
    selections: Vec<String>,
}

fn step(script: &[bool], cursor: &mut usize) -> bool {
    let value = script.get(*cursor).or_else(|| script.last()).copied();
    *cursor += 1;
    value.unwrap_or(false)
}

/// A scriptable DOM-node double
#[derive(Debug)]
pub struct MockElement {
    state: Mutex<ElementState>,
}

impl MockElement {
    /// An element that is displayed and enabled
    #[must_use]
    pub fn visible() -> Self {
        Self {
            state: Mutex::new(ElementState {
                displayed: vec![true],
                enabled: vec![true],
                ..ElementState::default()
            }),
        }
    }

    /// An element that resolves but is not displayed
    #[must_use]
    pub fn hidden() -> Self {
        Self {
            state: Mutex::new(ElementState {
                displayed: vec![false],
                enabled: vec![true],
                ..ElementState::default()
            }),
        }
    }

    /// Script successive `is_displayed` answers; the last value repeats
    #[must_use]
    pub fn with_displayed_sequence(self, sequence: &[bool]) -> Self {
        lock(&self.state).displayed = sequence.to_vec();
        self
    }

    /// Script successive `is_enabled` answers; the last value repeats
    #[must_use]
    pub fn with_enabled_sequence(self, sequence: &[bool]) -> Self {
        lock(&self.state).enabled = sequence.to_vec();
        self
    }

    /// Set the rendered text
    #[must_use]
    pub fn with_text(self, text: impl Into<String>) -> Self {
        lock(&self.state).text = text.into();
        self
    }

    /// Set an attribute value
    #[must_use]
    pub fn with_attribute(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        lock(&self.state).attributes.insert(name.into(), value.into());
        self
    }

    /// Set the first selected option's visible text
    #[must_use]
    pub fn with_selected_option(self, text: impl Into<String>) -> Self {
        lock(&self.state).selected_option = Some(text.into());
        self
    }

    /// Add a selectable option (`value` attribute + visible label), in
    /// document order
    #[must_use]
    pub fn with_option(self, value: impl Into<String>, label: impl Into<String>) -> Self {
        lock(&self.state).options.push((value.into(), label.into()));
        self
    }

    /// Raise `Stale` for the next `count` interactions of any kind
    #[must_use]
    pub fn stale_for(self, count: usize) -> Self {
        lock(&self.state).stale_remaining = count;
        self
    }

    /// Raise a transient `Stale` for the next `count` clicks only
    #[must_use]
    pub fn failing_clicks(self, count: usize) -> Self {
        lock(&self.state).click_transient_failures = count;
        self
    }

    fn check_stale(state: &mut ElementState) -> DriverResult<()> {
        if state.stale_remaining > 0 {
            state.stale_remaining -= 1;
            return Err(failure_of(FailureKind::Stale, "mock element"));
        }
        Ok(())
    }

    /// Number of successful clicks observed
    #[must_use]
    pub fn click_count(&self) -> usize {
        lock(&self.state).clicks
    }

    /// Number of clears observed
    #[must_use]
    pub fn clear_count(&self) -> usize {
        lock(&self.state).clears
    }

    /// Key sequences sent so far
    #[must_use]
    pub fn typed(&self) -> Vec<String> {
        lock(&self.state).sent_keys.clone()
    }

    /// Option labels selected so far
    #[must_use]
    pub fn selections(&self) -> Vec<String> {
        lock(&self.state).selections.clone()
    }
}

impl Element for MockElement {
    fn is_displayed(&self) -> DriverResult<bool> {
        let mut state = lock(&self.state);
        Self::check_stale(&mut state)?;
        let ElementState {
            displayed,
            displayed_step,
            ..
        } = &mut *state;
        Ok(step(displayed, displayed_step))
    }

    fn is_enabled(&self) -> DriverResult<bool> {
        let mut state = lock(&self.state);
        Self::check_stale(&mut state)?;
        let ElementState {
            enabled,
            enabled_step,
            ..
        } = &mut *state;
        Ok(step(enabled, enabled_step))
    }

    fn text(&self) -> DriverResult<String> {
        let mut state = lock(&self.state);
        Self::check_stale(&mut state)?;
        Ok(state.text.clone())
    }

    fn attribute(&self, name: &str) -> DriverResult<Option<String>> {
        let mut state = lock(&self.state);
        Self::check_stale(&mut state)?;
        Ok(state.attributes.get(name).cloned())
    }

    fn clear(&self) -> DriverResult<()> {
        let mut state = lock(&self.state);
        Self::check_stale(&mut state)?;
        state.clears += 1;
        Ok(())
    }

    fn send_keys(&self, keys: &str) -> DriverResult<()> {
        let mut state = lock(&self.state);
        Self::check_stale(&mut state)?;
        state.sent_keys.push(keys.to_string());
        Ok(())
    }

    fn click(&self) -> DriverResult<()> {
        let mut state = lock(&self.state);
        Self::check_stale(&mut state)?;
        if state.click_transient_failures > 0 {
            state.click_transient_failures -= 1;
            return Err(failure_of(FailureKind::Stale, "mock element click"));
        }
        state.clicks += 1;
        Ok(())
    }

    fn select_by_visible_text(&self, label: &str) -> DriverResult<()> {
        let mut state = lock(&self.state);
        Self::check_stale(&mut state)?;
        state.selections.push(label.to_string());
        state.selected_option = Some(label.to_string());
        state.selected_value = state
            .options
            .iter()
            .find(|(_, option_label)| option_label == label)
            .map(|(value, _)| value.clone());
        Ok(())
    }

    fn select_by_value(&self, value: &str) -> DriverResult<()> {
        let mut state = lock(&self.state);
        Self::check_stale(&mut state)?;
        let label = state
            .options
            .iter()
            .find(|(option_value, _)| option_value == value)
            .map(|(_, label)| label.clone())
            .ok_or_else(|| {
                failure_of(FailureKind::NotFound, &format!("option with value '{value}'"))
            })?;
        state.selections.push(label.clone());
        state.selected_option = Some(label);
        state.selected_value = Some(value.to_string());
        Ok(())
    }

    fn select_by_index(&self, index: usize) -> DriverResult<()> {
        let mut state = lock(&self.state);
        Self::check_stale(&mut state)?;
        let (value, label) = state
            .options
            .get(index)
            .cloned()
            .ok_or_else(|| {
                failure_of(FailureKind::NotFound, &format!("option at index {index}"))
            })?;
        state.selections.push(label.clone());
        state.selected_option = Some(label);
        state.selected_value = Some(value);
        Ok(())
    }

    fn first_selected_option_text(&self) -> DriverResult<String> {
        let mut state = lock(&self.state);
        Self::check_stale(&mut state)?;
        state
            .selected_option
            .clone()
            .ok_or_else(|| failure_of(FailureKind::NotFound, "selected option"))
    }

    fn first_selected_option_value(&self) -> DriverResult<String> {
        let mut state = lock(&self.state);
        Self::check_stale(&mut state)?;
        state
            .selected_value
            .clone()
            .ok_or_else(|| failure_of(FailureKind::NotFound, "selected option value"))
    }
}

#[derive(Default)]
struct DriverState {
    current_url: String,
    title: String,
    elements: HashMap<Locator, Vec<ElementHandle>>,
    find_failures: HashMap<Locator, (FailureKind, usize)>,
    navigate_failures: Option<(FailureKind, usize)>,
    navigations: Vec<String>,
}

impl std::fmt::Debug for MockDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("MockDriver")
            .field("current_url", &state.current_url)
            .field("title", &state.title)
            .field("navigations", &state.navigations)
            .finish_non_exhaustive()
    }
}

/// A scriptable session double
pub struct MockDriver {
    state: Mutex<DriverState>,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDriver {
    /// Create an empty driver at a blank URL
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DriverState {
                current_url: "about:blank".to_string(),
                ..DriverState::default()
            }),
        }
    }

    /// Set the URL reported by `current_url` without recording a navigation
    pub fn set_current_url(&self, url: impl Into<String>) {
        lock(&self.state).current_url = url.into();
    }

    /// Set the page title
    pub fn set_title(&self, title: impl Into<String>) {
        lock(&self.state).title = title.into();
    }

    /// Add an element resolved by `locator` (document order = place order)
    pub fn place(&self, locator: Locator, element: &Arc<MockElement>) {
        lock(&self.state)
            .elements
            .entry(locator)
            .or_default()
            .push(element.clone() as ElementHandle);
    }

    /// Remove all elements resolved by `locator`
    pub fn remove(&self, locator: &Locator) {
        lock(&self.state).elements.remove(locator);
    }

    /// Script the next `times` `find_elements` calls for `locator` to fail
    pub fn fail_find(&self, locator: Locator, kind: FailureKind, times: usize) {
        lock(&self.state).find_failures.insert(locator, (kind, times));
    }

    /// Script the next `times` `navigate` calls to fail
    pub fn fail_navigations(&self, kind: FailureKind, times: usize) {
        lock(&self.state).navigate_failures = Some((kind, times));
    }

    /// URLs navigated to, in order
    #[must_use]
    pub fn navigations(&self) -> Vec<String> {
        lock(&self.state).navigations.clone()
    }
}

impl Driver for MockDriver {
    fn navigate(&self, url: &str) -> DriverResult<()> {
        let mut state = lock(&self.state);
        if let Some((kind, remaining)) = &mut state.navigate_failures {
            if *remaining > 0 {
                *remaining -= 1;
                let kind = *kind;
                return Err(failure_of(kind, url));
            }
        }
        state.navigations.push(url.to_string());
        state.current_url = url.to_string();
        Ok(())
    }

    fn current_url(&self) -> DriverResult<String> {
        Ok(lock(&self.state).current_url.clone())
    }

    fn title(&self) -> DriverResult<String> {
        Ok(lock(&self.state).title.clone())
    }

    fn find_elements(&self, locator: &Locator) -> DriverResult<Vec<ElementHandle>> {
        let mut state = lock(&self.state);
        if let Some((kind, remaining)) = state.find_failures.get_mut(locator) {
            if *remaining > 0 {
                *remaining -= 1;
                let kind = *kind;
                return Err(failure_of(kind, &locator.to_string()));
            }
        }
        Ok(state.elements.get(locator).cloned().unwrap_or_default())
    }
}

#[derive(Debug, Default)]
struct FactoryInner {
    attempts: AtomicUsize,
    fail_first: AtomicUsize,
    created: Mutex<Vec<Arc<MockDriver>>>,
}

/// A driver factory that counts realization attempts.
///
/// Optionally fails the first N attempts with `UnsupportedDriver`, for
/// exercising proxy retry behavior.
#[derive(Debug, Clone, Default)]
pub struct CountingFactory {
    inner: Arc<FactoryInner>,
}

impl CountingFactory {
    /// A factory that always succeeds
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory whose first `count` attempts fail
    #[must_use]
    pub fn failing_first(count: usize) -> Self {
        let factory = Self::default();
        factory.inner.fail_first.store(count, Ordering::SeqCst);
        factory
    }

    /// Total realization attempts so far, failed ones included
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.inner.attempts.load(Ordering::SeqCst)
    }

    /// The most recently created driver, if any attempt succeeded
    #[must_use]
    pub fn last_driver(&self) -> Option<Arc<MockDriver>> {
        lock(&self.inner.created).last().cloned()
    }

    /// The closure handed to a `DriverSessionProxy`
    #[must_use]
    pub fn factory(&self) -> impl Fn() -> EsperarResult<SharedDriver> + Send + Sync + 'static {
        let inner = self.inner.clone();
        move || {
            let attempt = inner.attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < inner.fail_first.load(Ordering::SeqCst) {
                return Err(EsperarError::UnsupportedDriver {
                    message: "scripted driver construction failure".to_string(),
                });
            }
            let driver = Arc::new(MockDriver::new());
            lock(&inner.created).push(driver.clone());
            Ok(driver as SharedDriver)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod element_tests {
        use super::*;

        #[test]
        fn test_displayed_sequence_repeats_last_value() {
            let element = MockElement::visible().with_displayed_sequence(&[false, true]);
            assert!(!element.is_displayed().unwrap());
            assert!(element.is_displayed().unwrap());
            assert!(element.is_displayed().unwrap());
        }

        #[test]
        fn test_stale_budget_is_consumed() {
            let element = MockElement::visible().stale_for(1);
            assert!(element.is_displayed().is_err());
            assert!(element.is_displayed().unwrap());
        }

        #[test]
        fn test_click_failures_then_success() {
            let element = MockElement::visible().failing_clicks(1);
            assert!(element.click().is_err());
            element.click().unwrap();
            assert_eq!(element.click_count(), 1);
        }

        #[test]
        fn test_interaction_recording() {
            let element = MockElement::visible();
            element.clear().unwrap();
            element.send_keys("hello").unwrap();
            element.select_by_visible_text("Large").unwrap();
            assert_eq!(element.clear_count(), 1);
            assert_eq!(element.typed(), vec!["hello".to_string()]);
            assert_eq!(element.selections(), vec!["Large".to_string()]);
            assert_eq!(element.first_selected_option_text().unwrap(), "Large");
        }

        #[test]
        fn test_select_by_value_resolves_the_option() {
            let element = MockElement::visible()
                .with_option("s", "Small")
                .with_option("l", "Large");
            element.select_by_value("l").unwrap();
            assert_eq!(element.first_selected_option_text().unwrap(), "Large");
            assert_eq!(element.first_selected_option_value().unwrap(), "l");
            assert!(element.select_by_value("xxl").is_err());
        }

        #[test]
        fn test_select_by_index_is_zero_based_and_bounded() {
            let element = MockElement::visible()
                .with_option("s", "Small")
                .with_option("l", "Large");
            element.select_by_index(0).unwrap();
            assert_eq!(element.first_selected_option_text().unwrap(), "Small");
            assert_eq!(element.first_selected_option_value().unwrap(), "s");
            assert!(element.select_by_index(2).is_err());
        }
    }

    mod driver_tests {
        use super::*;

        #[test]
        fn test_navigate_records_and_updates_url() {
            let driver = MockDriver::new();
            driver.navigate("https://example.com/login").unwrap();
            assert_eq!(driver.current_url().unwrap(), "https://example.com/login");
            assert_eq!(driver.navigations(), vec!["https://example.com/login"]);
        }

        #[test]
        fn test_place_and_remove() {
            let driver = MockDriver::new();
            let element = Arc::new(MockElement::visible());
            driver.place(Locator::id("x"), &element);
            assert_eq!(driver.find_elements(&Locator::id("x")).unwrap().len(), 1);
            driver.remove(&Locator::id("x"));
            assert!(driver.find_elements(&Locator::id("x")).unwrap().is_empty());
        }

        #[test]
        fn test_scripted_navigate_failures_run_out() {
            let driver = MockDriver::new();
            driver.fail_navigations(FailureKind::Session, 1);
            assert!(driver.navigate("https://example.com/a").is_err());
            assert!(driver.navigations().is_empty());
            driver.navigate("https://example.com/b").unwrap();
            assert_eq!(driver.navigations(), vec!["https://example.com/b"]);
        }

        #[test]
        fn test_scripted_find_failures_run_out() {
            let driver = MockDriver::new();
            driver.fail_find(Locator::id("x"), FailureKind::Stale, 2);
            assert!(driver.find_elements(&Locator::id("x")).is_err());
            assert!(driver.find_elements(&Locator::id("x")).is_err());
            assert!(driver.find_elements(&Locator::id("x")).is_ok());
        }
    }

    mod factory_tests {
        use super::*;

        #[test]
        fn test_counts_attempts_and_exposes_drivers() {
            let counting = CountingFactory::new();
            let factory = counting.factory();
            assert!(factory().is_ok());
            assert_eq!(counting.attempts(), 1);
            assert!(counting.last_driver().is_some());
        }

        #[test]
        fn test_failing_first_then_recovering() {
            let counting = CountingFactory::failing_first(1);
            let factory = counting.factory();
            assert!(matches!(
                factory(),
                Err(EsperarError::UnsupportedDriver { .. })
            ));
            assert!(factory().is_ok());
            assert_eq!(counting.attempts(), 2);
        }
    }
}
