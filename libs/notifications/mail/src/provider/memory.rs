//! In-memory recorder for tests

use super::{ConfigurableRecorder, ConfigurableSender, Recorder, SendOption, Sender};
use crate::config::TxConfig;
use crate::error::MailResult;
use crate::models::{Mail, Message};
use async_trait::async_trait;
use std::sync::{PoisonError, RwLock};
use tokio::sync::Mutex;

/// Sender that records every mail instead of transmitting it
#[derive(Debug, Default)]
pub struct MemRecorder {
    mails: Mutex<Vec<Mail>>,
    cfg: RwLock<Option<TxConfig>>,
}

impl MemRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded mails
    pub async fn mails(&self) -> Vec<Mail> {
        self.mails.lock().await.clone()
    }

    /// Get the count of recorded mails
    pub async fn sent_count(&self) -> usize {
        self.mails.lock().await.len()
    }

    /// Clear all recorded mails
    pub async fn clear(&self) {
        self.mails.lock().await.clear();
    }
}

#[async_trait]
impl Sender for MemRecorder {
    async fn send(
        &self,
        from: &str,
        to: &[String],
        message: &Message,
        _options: &[SendOption],
    ) -> MailResult<()> {
        self.mails
            .lock()
            .await
            .push(Mail::new(from, to.to_vec(), message.clone()));
        Ok(())
    }
}

#[async_trait]
impl Recorder for MemRecorder {
    /// True if the log is non-empty and every recorded mail equals `mail`.
    ///
    /// Note this is not "any recorded mail equals `mail`": once two different
    /// mails are recorded it is false for both of them.
    async fn seen(&self, mail: &Mail) -> MailResult<bool> {
        let mails = self.mails.lock().await;
        if mails.is_empty() {
            return Ok(false);
        }

        Ok(mails.iter().all(|recorded| recorded == mail))
    }
}

impl ConfigurableSender for MemRecorder {
    fn update_tx_config(&self, cfg: TxConfig) -> MailResult<()> {
        *self.cfg.write().unwrap_or_else(PoisonError::into_inner) = Some(cfg);
        Ok(())
    }
}

impl ConfigurableRecorder for MemRecorder {
    fn tx_config(&self) -> Option<TxConfig> {
        self.cfg
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
