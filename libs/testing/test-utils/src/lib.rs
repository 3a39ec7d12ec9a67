//! Shared test utilities for mail testing
//!
//! This crate provides reusable test infrastructure:
//! - `TestMailpit`: Mailpit SMTP sink container with automatic cleanup (feature: "mailpit")
//! - `init_tracing`: test-friendly tracing subscriber (always available)
//!
//! # Usage
//!
//! ```rust,ignore
//! use test_utils::TestMailpit;
//!
//! #[tokio::test]
//! async fn my_smtp_test() {
//!     let mailpit = TestMailpit::new().await;
//!     let (host, port) = (mailpit.smtp_host(), mailpit.smtp_port());
//!
//!     // send something to host:port ...
//!
//!     let messages = mailpit.wait_for_messages(1).await;
//!     assert_eq!(messages[0].subject, "Hello");
//! }
//! ```

#[cfg(feature = "mailpit")]
mod mailpit;

#[cfg(feature = "mailpit")]
pub use mailpit::{MailpitAddress, MailpitMessage, TestMailpit};

use tracing_subscriber::EnvFilter;

/// Install a tracing subscriber that writes through the test harness
///
/// Honours `RUST_LOG` and defaults to `debug`. Safe to call from every test;
/// only the first call installs the subscriber.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing();
        init_tracing();
        tracing::debug!("still fine");
    }
}
