//! Templated email messages and the senders that deliver them
//!
//! ## Components
//!
//! - **Templates**: Handlebars-based [`Template`] rendering a topic/body pair and
//!   validating attachments against an allow-list of sniffed MIME types
//! - **Senders**: the [`Sender`] trait with an SMTP [`Transmitter`] (via lettre)
//!   and an in-memory [`MemRecorder`] for tests
//! - **Config**: [`TxConfig`] with validation and environment loading
//!
//! ## Usage
//!
//! ```ignore
//! use mail::{Sender, Template, Transmitter, TxConfig};
//! use mail::templates::{allow_attachments, with_attachments};
//!
//! let tx = Transmitter::dial(TxConfig::from_env()?)?;
//! let tpl = Template::new("{{name}} says hello!", "{{quote}}", [allow_attachments(["image/png"])])?;
//!
//! let msg = tpl.execute(&data, [with_attachments(attachments)])?;
//! tx.send("me@example.de", &["ava@example.de".to_string()], &msg, &[]).await?;
//! ```

pub mod attachment;
pub mod config;
pub mod error;
pub mod models;
pub mod provider;
pub mod templates;

pub use attachment::{detect_content_type, process_attachments};
pub use config::{ConfigError, TxConfig};
pub use error::{MailError, MailResult};
pub use models::{Attachment, Mail, Message, RequestAttachment};
pub use provider::{
    as_cc, ConfigurableRecorder, ConfigurableSender, MemRecorder, Recorder, SendOption, Sender,
    Transmitter,
};
pub use templates::{Template, TemplateOption};
