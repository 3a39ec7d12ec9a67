//! SMTP transmitter using lettre

use super::{ConfigurableSender, SendOption, SendOptions, Sender};
use crate::attachment::extension_for;
use crate::config::TxConfig;
use crate::error::{MailError, MailResult};
use crate::models::{Attachment, Message};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment as MimeAttachment, Mailbox, MessageBuilder, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use validator::Validate;

/// Prefix of the per-send attachment directory
const TMP_DIR_PREFIX: &str = "mail-";

/// Port on which the server expects TLS from the first byte
const IMPLICIT_TLS_PORT: u16 = 465;

/// Config together with the transport derived from it; always swapped as one value
struct Connection {
    config: TxConfig,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl Connection {
    fn new(config: TxConfig) -> MailResult<Self> {
        let port = u16::try_from(config.port)
            .map_err(|_| MailError::InvalidConfig(format!("port {} is out of range", config.port)))?;
        let creds = Credentials::new(config.user.clone(), config.password.clone());

        let builder = if port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
        } else {
            let tls = TlsParameters::new(config.host.clone())?;
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
                .tls(Tls::Opportunistic(tls))
        };
        let transport = builder.port(port).credentials(creds).build();

        Ok(Self { config, transport })
    }
}

/// Sender that transmits mails through an SMTP server
///
/// Created unconfigured with [`Transmitter::new`] or configured with
/// [`Transmitter::dial`]. The configuration can be replaced at any time with
/// [`ConfigurableSender::update_tx_config`]; a send in progress keeps using the
/// configuration it started with.
#[derive(Default)]
pub struct Transmitter {
    connection: RwLock<Option<Arc<Connection>>>,
}

impl Transmitter {
    /// Create an unconfigured transmitter
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `cfg` and create a transmitter configured with it
    ///
    /// No connection is opened until the first send.
    pub fn dial(cfg: TxConfig) -> MailResult<Self> {
        cfg.validate()?;

        let tx = Self::new();
        tx.update_tx_config(cfg)?;
        Ok(tx)
    }

    /// Snapshot of the current configuration
    pub fn tx_config(&self) -> Option<TxConfig> {
        self.connection().map(|connection| connection.config.clone())
    }

    fn connection(&self) -> Option<Arc<Connection>> {
        self.connection
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl fmt::Debug for Transmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transmitter")
            .field("config", &self.tx_config())
            .finish()
    }
}

impl ConfigurableSender for Transmitter {
    fn update_tx_config(&self, cfg: TxConfig) -> MailResult<()> {
        let connection = Arc::new(Connection::new(cfg)?);

        tracing::debug!(
            host = %connection.config.host,
            port = connection.config.port,
            "SMTP transmitter configured"
        );

        *self
            .connection
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(connection);
        Ok(())
    }
}

#[async_trait]
impl Sender for Transmitter {
    async fn send(
        &self,
        from: &str,
        to: &[String],
        message: &Message,
        options: &[SendOption],
    ) -> MailResult<()> {
        if from.is_empty() {
            return Err(MailError::MissingFrom);
        }
        let Some((primary, others)) = to.split_first() else {
            return Err(MailError::MissingRecipients);
        };

        let opts = SendOptions::from_options(options);
        let connection = self.connection().ok_or(MailError::NotConfigured)?;

        let mut builder = lettre::Message::builder()
            .from(from.parse::<Mailbox>()?)
            .to(primary.parse::<Mailbox>()?);
        for recipient in others {
            let mailbox: Mailbox = recipient.parse()?;
            builder = if opts.as_cc {
                builder.cc(mailbox)
            } else {
                builder.bcc(mailbox)
            };
        }
        let builder = builder.subject(message.topic.as_str());

        let dir = tempfile::Builder::new()
            .prefix(TMP_DIR_PREFIX)
            .tempdir_in(connection.config.tmp_root())
            .map_err(MailError::TempDir)?;

        let result: MailResult<()> = async {
            let email = build_message(builder, message, dir.path()).await?;
            connection.transport.send(email).await?;
            Ok(())
        }
        .await;

        let cleanup = dir.close().map_err(MailError::Cleanup);

        if result.is_ok() {
            tracing::info!(
                from = %from,
                to = %primary,
                recipients = to.len(),
                subject = %message.topic,
                attachments = message.attachments.len(),
                "Email sent successfully"
            );
        }

        settle(result, cleanup)
    }
}

/// Combine the send outcome with the tmp-dir cleanup outcome.
///
/// A cleanup failure is returned only when the send itself succeeded; after a
/// failed send the original error is kept and the cleanup failure is logged.
fn settle(result: MailResult<()>, cleanup: MailResult<()>) -> MailResult<()> {
    match (result, cleanup) {
        (Ok(()), cleanup) => cleanup,
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(cleanup_err)) => {
            tracing::warn!(error = %cleanup_err, send_error = %err, "Failed to remove attachment tmp-dir");
            Err(err)
        }
    }
}

fn parse_content_type(kind: &str) -> MailResult<ContentType> {
    ContentType::parse(kind).map_err(|e| MailError::ContentType(format!("{kind}: {e}")))
}

/// File name for an attachment inside the scoped directory
///
/// Only the final path component of the attachment name is used.
fn attachment_filename(attachment: &Attachment) -> String {
    let stem = Path::new(&attachment.name)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or("attachment");

    format!("{}.{}", stem, extension_for(&attachment.kind))
}

/// Write `attachment` into `dir` and return its path
async fn write_attachment(dir: &Path, attachment: &Attachment) -> MailResult<PathBuf> {
    let path = dir.join(attachment_filename(attachment));

    tokio::fs::write(&path, &attachment.content)
        .await
        .map_err(|source| MailError::WriteAttachment {
            path: path.clone(),
            source,
        })?;

    tracing::debug!(path = %path.display(), kind = %attachment.kind, "Attachment written to tmp-dir");
    Ok(path)
}

/// Attach the file at `path` under its file name
async fn attach_file(path: &Path, kind: &str) -> MailResult<SinglePart> {
    let content = tokio::fs::read(path)
        .await
        .map_err(|source| MailError::ReadAttachment {
            path: path.to_path_buf(),
            source,
        })?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(MimeAttachment::new(filename).body(content, parse_content_type(kind)?))
}

async fn build_message(
    builder: MessageBuilder,
    message: &Message,
    dir: &Path,
) -> MailResult<lettre::Message> {
    let body = SinglePart::builder()
        .header(parse_content_type(&message.content_type)?)
        .body(message.body.clone());

    if message.attachments.is_empty() {
        return Ok(builder.singlepart(body)?);
    }

    let mut parts = MultiPart::mixed().singlepart(body);
    for attachment in &message.attachments {
        let path = write_attachment(dir, attachment).await?;
        parts = parts.singlepart(attach_file(&path, &attachment.kind).await?);
    }

    Ok(builder.multipart(parts)?)
}
