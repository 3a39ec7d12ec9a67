//! Sender implementations

pub mod memory;
pub mod smtp;

pub use memory::MemRecorder;
pub use smtp::Transmitter;

use crate::config::TxConfig;
use crate::error::MailResult;
use crate::models::{Mail, Message};
use async_trait::async_trait;

/// Option for a single [`Sender::send`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOption {
    /// Address recipients after the first as Cc instead of Bcc
    AsCc,
}

/// Address recipients after the first as Cc instead of Bcc
pub fn as_cc() -> SendOption {
    SendOption::AsCc
}

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct SendOptions {
    pub as_cc: bool,
}

impl SendOptions {
    pub fn from_options(options: &[SendOption]) -> Self {
        let mut opts = Self::default();
        for option in options {
            match option {
                SendOption::AsCc => opts.as_cc = true,
            }
        }
        opts
    }
}

/// Anything that can deliver a rendered [`Message`]
///
/// The first address in `to` is the primary recipient; the rest are Bcc
/// unless [`SendOption::AsCc`] is given.
#[async_trait]
pub trait Sender: Send + Sync {
    async fn send(
        &self,
        from: &str,
        to: &[String],
        message: &Message,
        options: &[SendOption],
    ) -> MailResult<()>;
}

/// Sender whose configuration can be replaced at runtime
pub trait ConfigurableSender: Sender {
    /// Replace the configuration. Safe to call while sends are in flight.
    fn update_tx_config(&self, cfg: TxConfig) -> MailResult<()>;
}

/// Sender that records mails for assertions
#[async_trait]
pub trait Recorder: Sender {
    async fn seen(&self, mail: &Mail) -> MailResult<bool>;
}

/// Recorder that also stores the configuration it was given
pub trait ConfigurableRecorder: ConfigurableSender + Recorder {
    fn tx_config(&self) -> Option<TxConfig>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_options_default_to_bcc() {
        assert!(!SendOptions::from_options(&[]).as_cc);
        assert!(SendOptions::from_options(&[as_cc()]).as_cc);
    }
}
