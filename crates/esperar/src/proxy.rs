//! Deferred session creation.
//!
//! [`DriverSessionProxy`] stands in for a browser session that has not
//! been opened yet. The first call that needs the real session realizes
//! it through the supplied factory, exactly once; listeners registered
//! before realization fire right after it, listeners registered after
//! fire immediately. A failed realization leaves the proxy unrealized so
//! a later call can retry with corrected configuration.

use crate::driver::SharedDriver;
use crate::result::EsperarResult;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Builds the real session on demand
pub type DriverFactory = Box<dyn Fn() -> EsperarResult<SharedDriver> + Send + Sync>;

/// Invoked once with the realized session
pub type OpenListener = Box<dyn FnOnce(&SharedDriver) + Send>;

#[derive(Default)]
struct ProxyState {
    session: Option<SharedDriver>,
    listeners: Vec<OpenListener>,
}

/// Two-state stand-in for a browser session: unrealized until first use,
/// then a pass-through to the real thing.
pub struct DriverSessionProxy {
    factory: DriverFactory,
    state: Mutex<ProxyState>,
}

impl std::fmt::Debug for DriverSessionProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverSessionProxy")
            .field("realized", &self.is_realized())
            .finish_non_exhaustive()
    }
}

fn lock(mutex: &Mutex<ProxyState>) -> MutexGuard<'_, ProxyState> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl DriverSessionProxy {
    /// Create an unrealized proxy around a session factory
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> EsperarResult<SharedDriver> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            state: Mutex::new(ProxyState::default()),
        }
    }

    /// Whether the real session exists yet
    #[must_use]
    pub fn is_realized(&self) -> bool {
        lock(&self.state).session.is_some()
    }

    /// The real session, realizing it on first call.
    ///
    /// # Errors
    ///
    /// [`EsperarError::UnsupportedDriver`](crate::result::EsperarError::UnsupportedDriver)
    /// (or whatever the factory raises) if construction fails; the proxy
    /// stays unrealized and the next call retries.
    pub fn session(&self) -> EsperarResult<SharedDriver> {
        let pending;
        let session;
        {
            let mut state = lock(&self.state);
            if let Some(existing) = &state.session {
                return Ok(existing.clone());
            }
            session = (self.factory)()?;
            debug!("session realized");
            state.session = Some(session.clone());
            pending = std::mem::take(&mut state.listeners);
        }
        // fire outside the lock so a listener can call back into the proxy
        for listener in pending {
            listener(&session);
        }
        Ok(session)
    }

    /// Register a listener for realization.
    ///
    /// Fires once with the real session: right after realization if the
    /// proxy is still unrealized, immediately if it already happened.
    pub fn on_open<F>(&self, listener: F)
    where
        F: FnOnce(&SharedDriver) + Send + 'static,
    {
        let realized = {
            let mut state = lock(&self.state);
            match &state.session {
                Some(session) => Some(session.clone()),
                None => {
                    state.listeners.push(Box::new(listener));
                    return;
                }
            }
        };
        if let Some(session) = realized {
            listener(&session);
        }
    }

    /// Navigate the (possibly just-realized) session to `url`
    pub fn navigate(&self, url: &str) -> EsperarResult<()> {
        self.session()?.navigate(url)?;
        Ok(())
    }

    /// Current URL of the (possibly just-realized) session
    pub fn current_url(&self) -> EsperarResult<String> {
        Ok(self.session()?.current_url()?)
    }

    /// Current title of the (possibly just-realized) session
    pub fn title(&self) -> EsperarResult<String> {
        Ok(self.session()?.title()?)
    }
}
