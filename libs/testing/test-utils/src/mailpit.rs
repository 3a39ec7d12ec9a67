//! Mailpit test infrastructure
//!
//! Provides a `TestMailpit` helper that runs a Mailpit container: an SMTP sink
//! that accepts any credentials and exposes received mail over an HTTP API.

use serde::Deserialize;
use std::time::Duration;
use testcontainers::core::IntoContainerPort;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};

const SMTP_PORT: u16 = 1025;
const HTTP_PORT: u16 = 8025;
const POLL_INTERVAL: Duration = Duration::from_millis(200);
const POLL_ATTEMPTS: usize = 50;

/// Address as reported by the Mailpit API
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MailpitAddress {
    pub name: String,
    pub address: String,
}

/// Summary of a received message as reported by the Mailpit API
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MailpitMessage {
    pub from: MailpitAddress,
    pub to: Option<Vec<MailpitAddress>>,
    pub cc: Option<Vec<MailpitAddress>>,
    pub bcc: Option<Vec<MailpitAddress>>,
    pub subject: String,
    #[serde(default)]
    pub attachments: usize,
}

impl MailpitMessage {
    fn addresses(list: &Option<Vec<MailpitAddress>>) -> Vec<&str> {
        list.iter()
            .flatten()
            .map(|a| a.address.as_str())
            .collect()
    }

    pub fn to_addresses(&self) -> Vec<&str> {
        Self::addresses(&self.to)
    }

    pub fn cc_addresses(&self) -> Vec<&str> {
        Self::addresses(&self.cc)
    }

    pub fn bcc_addresses(&self) -> Vec<&str> {
        Self::addresses(&self.bcc)
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    messages: Vec<MailpitMessage>,
}

/// Test Mailpit wrapper that ensures proper cleanup
///
/// The container is automatically stopped and removed when this struct is dropped.
pub struct TestMailpit {
    #[allow(dead_code)]
    container: ContainerAsync<GenericImage>,
    smtp_port: u16,
    api_url: String,
    client: reqwest::Client,
}

impl TestMailpit {
    /// Start a Mailpit container and wait until its API is ready
    pub async fn new() -> Self {
        let container = GenericImage::new("axllent/mailpit", "latest")
            .with_exposed_port(SMTP_PORT.tcp())
            .with_exposed_port(HTTP_PORT.tcp())
            .with_env_var("MP_SMTP_AUTH_ACCEPT_ANY", "1")
            .with_env_var("MP_SMTP_AUTH_ALLOW_INSECURE", "1")
            .start()
            .await
            .expect("Failed to start Mailpit container");

        let smtp_port = container
            .get_host_port_ipv4(SMTP_PORT.tcp())
            .await
            .expect("Failed to get Mailpit SMTP port");
        let http_port = container
            .get_host_port_ipv4(HTTP_PORT.tcp())
            .await
            .expect("Failed to get Mailpit HTTP port");

        let mailpit = Self {
            container,
            smtp_port,
            api_url: format!("http://127.0.0.1:{}", http_port),
            client: reqwest::Client::new(),
        };
        mailpit.wait_until_ready().await;

        tracing::info!(smtp_port, http_port, "Test Mailpit ready");
        mailpit
    }

    async fn wait_until_ready(&self) {
        let url = format!("{}/readyz", self.api_url);
        for _ in 0..POLL_ATTEMPTS {
            if let Ok(response) = self.client.get(&url).send().await {
                if response.status().is_success() {
                    return;
                }
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        panic!("Mailpit did not become ready");
    }

    /// Host the SMTP server is reachable on
    pub fn smtp_host(&self) -> &str {
        "localhost"
    }

    /// Mapped SMTP port on the host
    pub fn smtp_port(&self) -> u16 {
        self.smtp_port
    }

    /// All messages received so far, newest first
    pub async fn messages(&self) -> Vec<MailpitMessage> {
        let response: MessagesResponse = self
            .client
            .get(format!("{}/api/v1/messages", self.api_url))
            .send()
            .await
            .expect("Failed to query Mailpit")
            .json()
            .await
            .expect("Failed to decode Mailpit messages");

        response.messages
    }

    /// Poll until at least `count` messages have arrived
    pub async fn wait_for_messages(&self, count: usize) -> Vec<MailpitMessage> {
        for _ in 0..POLL_ATTEMPTS {
            let messages = self.messages().await;
            if messages.len() >= count {
                return messages;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        panic!("Mailpit did not receive {} message(s)", count);
    }
}

// Container is automatically cleaned up when TestMailpit is dropped
impl Drop for TestMailpit {
    fn drop(&mut self) {
        tracing::debug!("Cleaning up test Mailpit container");
    }
}
