//! Esperar: Page-Object Test Automation Layer
//!
//! Esperar (Spanish: "to wait/expect") sits above a browser-driving
//! protocol client and lets test authors declare expectations about UI
//! state ("this element is visible", "this text appears") without writing
//! polling loops, while sharing browser sessions across page objects
//! safely.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                  ESPERAR Architecture                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌───────────────┐   ┌───────────────────┐   │
//! │  │ Test code │──►│ PageRegistry  │──►│ DriverSessionProxy│   │
//! │  └───────────┘   └───────┬───────┘   └─────────┬─────────┘   │
//! │                          ▼                     ▼             │
//! │                  ┌───────────────┐   ┌───────────────────┐   │
//! │                  │ PageObject /  │──►│ protocol client   │   │
//! │                  │ ElementFacade │   │ (Driver trait)    │   │
//! │                  └───────┬───────┘   └───────────────────┘   │
//! │                          ▼                                   │
//! │                  ┌───────────────┐                           │
//! │                  │ConditionWaiter│                           │
//! │                  └───────────────┘                           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! All waits block the calling thread; a session and its cached page
//! instance must not be driven from multiple threads at once.

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

/// Environment-driven configuration (base URL, timings, resource root)
pub mod config;

/// Named boolean predicates consumed by the wait engine
pub mod conditions;

/// The driver seam: traits a protocol client implements
pub mod driver;

/// Wait-then-act and wait-then-assert over a single element
pub mod element;

/// Selector expressions
pub mod locator;

/// Scriptable test doubles for the driver seam
pub mod mock;

/// Page-object base behavior and the `Page` trait
pub mod page;

/// Deferred session creation with open listeners
pub mod proxy;

/// Page resolution, caching and start navigation
pub mod registry;

/// Error and result types
pub mod result;

/// The condition-polling wait engine
pub mod wait;

pub use config::Config;
pub use driver::{Driver, Element, ElementHandle, SharedDriver, ENTER};
pub use element::ElementFacade;
pub use locator::{Locator, Strategy};
pub use page::{Page, PageObject, UrlPattern};
pub use proxy::{DriverFactory, DriverSessionProxy, OpenListener};
pub use registry::PageRegistry;
pub use result::{DriverError, DriverResult, EsperarError, EsperarResult, FailureKind};
pub use wait::{
    wait_a_bit, ConditionWaiter, WaitPolicy, WaitResult, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_WAIT_TIMEOUT_MS,
};

#[cfg(test)]
mod tests {
    use super::*;

    mod error_tests {
        use super::*;

        #[test]
        fn test_esperar_error_display() {
            let err = EsperarError::WaitTimedOut {
                condition: "spinner to vanish".to_string(),
                timeout_ms: 5000,
                cause: None,
            };
            let msg = err.to_string();
            assert!(msg.contains("5000"));
            assert!(msg.contains("spinner"));
        }
    }

    mod surface_tests {
        use super::*;
        use crate::mock::MockDriver;
        use std::sync::Arc;

        #[test]
        fn test_end_to_end_surface_composes() {
            let driver: SharedDriver = Arc::new(MockDriver::new());
            let registry = PageRegistry::new(driver).with_default_url("https://example.com/");
            assert_eq!(
                registry.start_url().as_deref(),
                Some("https://example.com/")
            );
        }
    }
}
