//! Page resolution and caching.
//!
//! [`PageRegistry`] turns a page type into a live instance bound to the
//! current session. Resolution verifies the page's declared
//! [`UrlPattern`](crate::page::UrlPattern) against the session's current
//! URL; any failure on that path is normalized into
//! [`EsperarError::WrongPage`] so callers never have to distinguish
//! "wrong page" from "broken page object". The last resolved instance is
//! cached and handed back only when the caller asserts, via
//! [`on_same_page`](PageRegistry::on_same_page), that no navigation
//! happened since.

use crate::config::Config;
use crate::driver::SharedDriver;
use crate::page::{Page, PageObject};
use crate::proxy::DriverSessionProxy;
use crate::result::{EsperarError, EsperarResult};
use crate::wait::WaitPolicy;
use std::any::{Any, TypeId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Where the registry gets its session from
enum SessionSource {
    /// A session that already exists
    Direct(SharedDriver),
    /// A proxy that realizes the session on first use
    Proxied(Arc<DriverSessionProxy>),
}

struct CachedPage {
    type_id: TypeId,
    instance: Arc<dyn Any + Send + Sync>,
    resolved_at: String,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Resolves, caches and navigates page objects over one session.
pub struct PageRegistry {
    source: SessionSource,
    config: Config,
    default_url: Option<String>,
    policy: WaitPolicy,
    cache: Mutex<Option<CachedPage>>,
    same_page: AtomicBool,
    started: AtomicBool,
}

impl std::fmt::Debug for PageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageRegistry")
            .field("default_url", &self.default_url)
            .field("policy", &self.policy)
            .field("started", &self.started.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl PageRegistry {
    /// A registry over an already-open session
    #[must_use]
    pub fn new(driver: SharedDriver) -> Self {
        Self::build(SessionSource::Direct(driver), Config::default())
    }

    /// A registry over a deferred session
    #[must_use]
    pub fn with_proxy(proxy: Arc<DriverSessionProxy>) -> Self {
        Self::build(SessionSource::Proxied(proxy), Config::default())
    }

    fn build(source: SessionSource, config: Config) -> Self {
        let policy = config.policy();
        Self {
            source,
            config,
            default_url: None,
            policy,
            cache: Mutex::new(None),
            same_page: AtomicBool::new(false),
            started: AtomicBool::new(false),
        }
    }

    /// Replace the registry configuration (base URL, timeouts, resource root)
    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.policy = config.policy();
        self.config = config;
        self
    }

    /// Set the URL [`start`](Self::start) navigates to when the
    /// configuration declares no base URL
    #[must_use]
    pub fn with_default_url(mut self, url: impl Into<String>) -> Self {
        self.default_url = Some(url.into());
        self
    }

    /// Override the wait policy handed to resolved pages
    #[must_use]
    pub fn with_policy(mut self, policy: WaitPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The session, realizing it if the registry is proxied
    pub fn session(&self) -> EsperarResult<SharedDriver> {
        match &self.source {
            SessionSource::Direct(driver) => Ok(driver.clone()),
            SessionSource::Proxied(proxy) => proxy.session(),
        }
    }

    /// Assert that no navigation happened since the last resolution.
    ///
    /// The hint is consumed by the next [`get`](Self::get): a matching
    /// cached instance is returned without re-resolving.
    pub fn on_same_page(&self) {
        self.same_page.store(true, Ordering::SeqCst);
    }

    /// Resolve an instance of `P` against the current session state.
    ///
    /// # Errors
    ///
    /// [`EsperarError::WrongPage`] when the session's URL does not match
    /// `P`'s declared pattern or `P`'s constructor fails;
    /// session-realization errors pass through unchanged.
    pub fn get<P: Page>(&self) -> EsperarResult<Arc<P>> {
        // the hint is one-shot, consumed whether or not the cache hits
        if self.same_page.swap(false, Ordering::SeqCst) {
            if let Some(cached) = self.cached_instance::<P>() {
                debug!(page = P::page_name(), "returning cached page");
                return Ok(cached);
            }
        }

        let session = self.session()?;
        let current_url = session.current_url().map_err(|err| wrong_page::<P>(&err))?;

        if let Some(pattern) = P::url_pattern() {
            if !pattern.matches(&current_url) {
                return Err(EsperarError::WrongPage {
                    page: P::page_name().to_string(),
                    cause: format!("current URL '{current_url}' does not match {pattern:?}"),
                });
            }
        }

        let base = PageObject::with_policy(session, self.policy.clone());
        let instance = Arc::new(P::at(base).map_err(|err| wrong_page::<P>(&err))?);
        debug!(page = P::page_name(), url = %current_url, "resolved page");

        *lock(&self.cache) = Some(CachedPage {
            type_id: TypeId::of::<P>(),
            instance: instance.clone(),
            resolved_at: current_url,
        });
        Ok(instance)
    }

    /// Shorthand alias of [`get`](Self::get)
    pub fn current_page_at<P: Page>(&self) -> EsperarResult<Arc<P>> {
        self.get::<P>()
    }

    fn cached_instance<P: Page>(&self) -> Option<Arc<P>> {
        let cache = lock(&self.cache);
        let cached = cache.as_ref()?;
        if cached.type_id != TypeId::of::<P>() {
            return None;
        }
        cached.instance.clone().downcast::<P>().ok()
    }

    /// The URL the last resolution happened at, if any page is cached
    #[must_use]
    pub fn last_resolved_url(&self) -> Option<String> {
        lock(&self.cache)
            .as_ref()
            .map(|cached| cached.resolved_at.clone())
    }

    /// URL-pattern check for `P` without instantiating or caching.
    ///
    /// A page with no declared pattern is current at any URL. Session
    /// failures come back as `false`.
    #[must_use]
    pub fn is_current_page_at<P: Page>(&self) -> bool {
        let Some(pattern) = P::url_pattern() else {
            return true;
        };
        self.session()
            .and_then(|session| Ok(session.current_url()?))
            .map(|url| pattern.matches(&url))
            .unwrap_or(false)
    }

    /// The start URL after default resolution: the configured base URL if
    /// set, else the registry default, with `resource:` URLs resolved to
    /// local files
    #[must_use]
    pub fn start_url(&self) -> Option<String> {
        self.config
            .base_url
            .clone()
            .or_else(|| self.default_url.clone())
            .map(|url| self.config.resolve_start_url(&url))
    }

    /// Navigate to the resolved start URL, at most once per registry.
    ///
    /// With no start URL this is a no-op. On a proxied, still-unrealized
    /// session the navigation is queued and fires right after
    /// realization; it never forces realization by itself.
    ///
    /// # Errors
    ///
    /// Immediate navigation failures are returned. A queued navigation
    /// runs after this call has returned, so its failure can only be
    /// logged (`warn`), never returned; the registry stays usable and
    /// later resolutions report their own errors.
    pub fn start(&self) -> EsperarResult<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let Some(url) = self.start_url() else {
            return Ok(());
        };
        match &self.source {
            SessionSource::Direct(driver) => {
                driver.navigate(&url)?;
            }
            SessionSource::Proxied(proxy) => {
                proxy.on_open(move |session| {
                    if let Err(err) = session.navigate(&url) {
                        warn!(%url, error = %err, "deferred start navigation failed");
                    }
                });
            }
        }
        Ok(())
    }

    /// Alias of [`start`](Self::start) that reads better at proxy call
    /// sites: arrange the opening navigation for whenever the session
    /// actually opens.
    pub fn notify_when_driver_opens(&self) -> EsperarResult<()> {
        self.start()
    }
}

fn wrong_page<P: Page>(cause: &dyn std::fmt::Display) -> EsperarError {
    EsperarError::WrongPage {
        page: P::page_name().to_string(),
        cause: cause.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::Driver;
    use crate::mock::{CountingFactory, MockDriver};
    use crate::page::UrlPattern;

    #[derive(Debug)]
    struct AnyPage {
        base: PageObject,
    }

    impl Page for AnyPage {
        fn at(base: PageObject) -> EsperarResult<Self> {
            Ok(Self { base })
        }
    }

    #[derive(Debug)]
    struct CheckoutPage {
        base: PageObject,
    }

    impl Page for CheckoutPage {
        fn at(base: PageObject) -> EsperarResult<Self> {
            Ok(Self { base })
        }

        fn url_pattern() -> Option<UrlPattern> {
            Some(UrlPattern::Contains("/checkout".to_string()))
        }

        fn page_name() -> &'static str {
            "CheckoutPage"
        }
    }

    #[derive(Debug)]
    struct BrokenPage;

    impl Page for BrokenPage {
        fn at(_base: PageObject) -> EsperarResult<Self> {
            Err(EsperarError::AssertionFailed {
                message: "constructor refused".to_string(),
            })
        }

        fn page_name() -> &'static str {
            "BrokenPage"
        }
    }

    fn direct_registry() -> (Arc<MockDriver>, PageRegistry) {
        let driver = Arc::new(MockDriver::new());
        driver.set_current_url("https://example.com/checkout/confirm");
        let registry = PageRegistry::new(driver.clone());
        (driver, registry)
    }

    mod resolution_tests {
        use super::*;

        #[test]
        fn test_get_binds_the_page_to_the_session() {
            let (driver, registry) = direct_registry();
            let page = registry.get::<CheckoutPage>().unwrap();
            assert_eq!(
                page.base.driver().current_url().unwrap(),
                driver.current_url().unwrap()
            );
            assert_eq!(
                registry.last_resolved_url().as_deref(),
                Some("https://example.com/checkout/confirm")
            );
        }

        #[test]
        fn test_url_mismatch_is_a_wrong_page_error() {
            let (driver, registry) = direct_registry();
            driver.set_current_url("https://example.com/cart");
            let err = registry.get::<CheckoutPage>().unwrap_err();
            match err {
                EsperarError::WrongPage { page, cause } => {
                    assert_eq!(page, "CheckoutPage");
                    assert!(cause.contains("https://example.com/cart"));
                }
                other => panic!("expected WrongPage, got {other:?}"),
            }
        }

        #[test]
        fn test_constructor_failure_is_normalized_to_wrong_page() {
            let (_driver, registry) = direct_registry();
            let err = registry.get::<BrokenPage>().unwrap_err();
            match err {
                EsperarError::WrongPage { page, cause } => {
                    assert_eq!(page, "BrokenPage");
                    assert!(cause.contains("constructor refused"));
                }
                other => panic!("expected WrongPage, got {other:?}"),
            }
        }

        #[test]
        fn test_resolution_logs_do_not_interfere() {
            let _ = tracing_subscriber::fmt().with_test_writer().try_init();
            let (_driver, registry) = direct_registry();
            registry.get::<CheckoutPage>().unwrap();
        }

        #[test]
        fn test_page_without_pattern_resolves_anywhere() {
            let (driver, registry) = direct_registry();
            driver.set_current_url("https://anywhere.example/");
            registry.get::<AnyPage>().unwrap();
        }

        #[test]
        fn test_current_page_at_is_a_get_alias() {
            let (_driver, registry) = direct_registry();
            let page = registry.current_page_at::<CheckoutPage>().unwrap();
            registry.on_same_page();
            let again = registry.get::<CheckoutPage>().unwrap();
            assert!(Arc::ptr_eq(&page, &again));
        }

        #[test]
        fn test_is_current_page_at_checks_without_caching() {
            let (driver, registry) = direct_registry();
            assert!(registry.is_current_page_at::<CheckoutPage>());
            assert!(registry.is_current_page_at::<AnyPage>());
            assert!(registry.last_resolved_url().is_none());

            driver.set_current_url("https://example.com/cart");
            assert!(!registry.is_current_page_at::<CheckoutPage>());
        }
    }

    mod caching_tests {
        use super::*;

        #[test]
        fn test_same_page_hint_returns_the_identical_instance() {
            let (_driver, registry) = direct_registry();
            let first = registry.get::<CheckoutPage>().unwrap();
            registry.on_same_page();
            let second = registry.get::<CheckoutPage>().unwrap();
            assert!(Arc::ptr_eq(&first, &second));
        }

        #[test]
        fn test_without_hint_every_get_re_resolves() {
            let (_driver, registry) = direct_registry();
            let first = registry.get::<CheckoutPage>().unwrap();
            let second = registry.get::<CheckoutPage>().unwrap();
            assert!(!Arc::ptr_eq(&first, &second));
        }

        #[test]
        fn test_intervening_resolution_of_another_type_invalidates() {
            let (_driver, registry) = direct_registry();
            let first = registry.get::<CheckoutPage>().unwrap();
            registry.get::<AnyPage>().unwrap();
            registry.on_same_page();
            let third = registry.get::<CheckoutPage>().unwrap();
            assert!(!Arc::ptr_eq(&first, &third));
        }

        #[test]
        fn test_hint_is_consumed_even_on_cache_miss() {
            let (_driver, registry) = direct_registry();
            registry.on_same_page();
            // nothing cached yet: full resolution, hint spent
            let first = registry.get::<CheckoutPage>().unwrap();
            let second = registry.get::<CheckoutPage>().unwrap();
            assert!(!Arc::ptr_eq(&first, &second));
        }
    }

    mod start_tests {
        use super::*;

        #[test]
        fn test_start_navigates_a_direct_session_once() {
            let driver = Arc::new(MockDriver::new());
            let registry =
                PageRegistry::new(driver.clone()).with_default_url("https://example.com/home");
            registry.start().unwrap();
            registry.start().unwrap();
            assert_eq!(driver.navigations(), vec!["https://example.com/home"]);
        }

        #[test]
        fn test_start_without_any_url_is_a_no_op() {
            let driver = Arc::new(MockDriver::new());
            let registry = PageRegistry::new(driver.clone());
            registry.start().unwrap();
            assert!(driver.navigations().is_empty());
        }

        #[test]
        fn test_configured_base_url_wins_over_registry_default() {
            let driver = Arc::new(MockDriver::new());
            let config = Config {
                base_url: Some("https://staging.example.com/".to_string()),
                ..Config::default()
            };
            let registry = PageRegistry::new(driver.clone())
                .with_config(config)
                .with_default_url("https://example.com/home");
            registry.start().unwrap();
            assert_eq!(driver.navigations(), vec!["https://staging.example.com/"]);
        }

        #[test]
        fn test_deferred_start_navigates_after_realization_exactly_once() {
            let counting = CountingFactory::new();
            let proxy = Arc::new(DriverSessionProxy::new(counting.factory()));
            let registry = PageRegistry::with_proxy(proxy.clone())
                .with_default_url("https://example.com/start");

            registry.notify_when_driver_opens().unwrap();
            // arranging the navigation must not open a session
            assert!(!proxy.is_realized());
            assert_eq!(counting.attempts(), 0);

            registry.get::<AnyPage>().unwrap();
            let driver = counting.last_driver().unwrap();
            assert_eq!(driver.navigations(), vec!["https://example.com/start"]);

            registry.get::<AnyPage>().unwrap();
            registry.start().unwrap();
            assert_eq!(driver.navigations(), vec!["https://example.com/start"]);
        }

        #[test]
        fn test_start_on_an_already_realized_proxy_navigates_immediately() {
            let counting = CountingFactory::new();
            let proxy = Arc::new(DriverSessionProxy::new(counting.factory()));
            proxy.session().unwrap();
            let registry = PageRegistry::with_proxy(proxy)
                .with_default_url("https://example.com/start");
            registry.start().unwrap();
            let driver = counting.last_driver().unwrap();
            assert_eq!(driver.navigations(), vec!["https://example.com/start"]);
        }

        #[test]
        fn test_failed_deferred_navigation_is_logged_not_fatal() {
            let _ = tracing_subscriber::fmt().with_test_writer().try_init();
            let driver = Arc::new(MockDriver::new());
            driver.fail_navigations(crate::result::FailureKind::Session, 1);
            let session = driver.clone();
            let proxy = Arc::new(DriverSessionProxy::new(move || {
                Ok(session.clone() as crate::driver::SharedDriver)
            }));
            let registry = PageRegistry::with_proxy(proxy.clone())
                .with_default_url("https://example.com/start");
            registry.notify_when_driver_opens().unwrap();

            // realization fires the queued navigation, which fails
            proxy.session().unwrap();
            assert!(driver.navigations().is_empty());

            // latch spent, no retry, and the registry stays usable
            registry.start().unwrap();
            assert!(driver.navigations().is_empty());
            registry.get::<AnyPage>().unwrap();
        }

        #[test]
        fn test_session_realization_failure_passes_through() {
            let counting = CountingFactory::failing_first(1);
            let proxy = Arc::new(DriverSessionProxy::new(counting.factory()));
            let registry = PageRegistry::with_proxy(proxy);
            let err = registry.get::<AnyPage>().unwrap_err();
            assert!(matches!(err, EsperarError::UnsupportedDriver { .. }));
        }
    }
}
