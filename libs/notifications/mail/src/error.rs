//! Error types for templating and sending mail.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for mail operations.
pub type MailResult<T> = Result<T, MailError>;

/// Errors that can occur while rendering or sending a message.
#[derive(Error, Debug)]
pub enum MailError {
    /// Sender address was empty
    #[error("from cannot be empty")]
    MissingFrom,

    /// Recipient list was empty
    #[error("at least one 'to' email-address must be given")]
    MissingRecipients,

    /// Send was attempted before `dial` or `update_tx_config`
    #[error("transmitter is not configured, yet")]
    NotConfigured,

    /// Transmitter configuration failed validation
    #[error("invalid transmitter config: {0}")]
    InvalidConfig(String),

    /// Topic or body template failed to parse
    #[error("template syntax error: {0}")]
    Template(#[from] handlebars::TemplateError),

    /// Topic or body template failed to render
    #[error("template render error: {0}")]
    Render(#[from] handlebars::RenderError),

    /// `timef` was given a layout it cannot format with
    #[error("invalid time format: {0}")]
    TimeFormat(String),

    /// Detected attachment type is not on the allow-list
    #[error("MIME type {0} is not allowed")]
    AttachmentTypeNotAllowed(String),

    /// Attachment processing failed while executing a template
    #[error("wrong attachment: {0}")]
    WrongAttachment(#[source] Box<MailError>),

    /// From/To/Cc/Bcc address could not be parsed
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// Body or attachment content-type could not be parsed
    #[error("invalid content-type: {0}")]
    ContentType(String),

    /// Outgoing message could not be assembled
    #[error("failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    /// Scoped attachment directory could not be created
    #[error("couldn't create tmp-dir for attachments: {0}")]
    TempDir(#[source] std::io::Error),

    /// Attachment could not be written into the scoped directory
    #[error("couldn't write attachment to tmp-dir {path:?}: {source}")]
    WriteAttachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Materialized attachment could not be read back for attaching
    #[error("couldn't read attachment {path:?}: {source}")]
    ReadAttachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Scoped attachment directory could not be removed
    #[error("couldn't remove tmp-dir for attachments: {0}")]
    Cleanup(#[source] std::io::Error),

    /// Dial or transmission failure from the SMTP transport
    #[error(transparent)]
    Transport(#[from] lettre::transport::smtp::Error),
}

impl From<validator::ValidationErrors> for MailError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}
