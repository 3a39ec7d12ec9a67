//! Message templates rendered with Handlebars
//!
//! A [`Template`] is built once from a topic and a body source plus a list of
//! [`TemplateOption`]s, and then executed any number of times against a data
//! context. Options passed to [`Template::execute`] only affect that call.
//!
//! Template sources use Handlebars syntax:
//! - Variables: `{{name}}`
//! - Conditionals: `{{#if condition}}...{{/if}}`
//! - Loops: `{{#each items}}...{{/each}}`
//! - Timestamps: `{{timef sent_at "date-long-de"}}`
//!
//! Rendering is strict, so referencing a missing field is an error.

mod timef;

pub use timef::{timef, TimefHelper};

use crate::attachment::process_attachments;
use crate::error::{MailError, MailResult};
use crate::models::{Message, RequestAttachment};
use handlebars::{Handlebars, HelperDef};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Content-type of a message when no [`content_type`] option is given
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";

const TOPIC: &str = "topic";
const BODY: &str = "body";

type BoxedHelper = Box<dyn HelperDef + Send + Sync>;
type HelperTable = HashMap<String, BoxedHelper>;

#[derive(Clone, Debug)]
struct Settings {
    allowed_attachment_types: HashSet<String>,
    content_type: String,
    attachments: Vec<RequestAttachment>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            allowed_attachment_types: HashSet::new(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            attachments: Vec::new(),
        }
    }
}

/// Option to configure a [`Template`] at construction or per execution
pub enum TemplateOption {
    /// Replace the set of MIME types accepted as attachments
    AllowAttachments(HashSet<String>),
    /// Content-type of the rendered body
    ContentType(String),
    /// Merge helpers into the render function table, replacing same-named ones
    Helpers(Vec<(String, BoxedHelper)>),
    /// Replace the attachments processed when rendering
    Attachments(Vec<RequestAttachment>),
}

impl TemplateOption {
    fn apply(self, settings: &mut Settings, helpers: &mut HelperTable) {
        match self {
            Self::AllowAttachments(types) => settings.allowed_attachment_types = types,
            Self::ContentType(kind) => settings.content_type = kind,
            Self::Helpers(new_helpers) => helpers.extend(new_helpers),
            Self::Attachments(attachments) => settings.attachments = attachments,
        }
    }
}

impl std::fmt::Debug for TemplateOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AllowAttachments(types) => f.debug_tuple("AllowAttachments").field(types).finish(),
            Self::ContentType(kind) => f.debug_tuple("ContentType").field(kind).finish(),
            Self::Helpers(helpers) => f
                .debug_tuple("Helpers")
                .field(&helpers.iter().map(|(name, _)| name).collect::<Vec<_>>())
                .finish(),
            Self::Attachments(attachments) => {
                f.debug_tuple("Attachments").field(&attachments.len()).finish()
            }
        }
    }
}

/// Allow attachments of the given MIME types, e.g. `"image/png"`
pub fn allow_attachments<I, S>(types: I) -> TemplateOption
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    TemplateOption::AllowAttachments(types.into_iter().map(Into::into).collect())
}

/// Set the content-type of the message body, e.g. `"text/html"`
pub fn content_type(kind: impl Into<String>) -> TemplateOption {
    TemplateOption::ContentType(kind.into())
}

/// Register a helper callable from the topic and body sources
pub fn template_helper(
    name: impl Into<String>,
    helper: impl HelperDef + Send + Sync + 'static,
) -> TemplateOption {
    TemplateOption::Helpers(vec![(name.into(), Box::new(helper))])
}

/// Register several helpers at once
pub fn template_helpers<I, S>(helpers: I) -> TemplateOption
where
    I: IntoIterator<Item = (S, BoxedHelper)>,
    S: Into<String>,
{
    TemplateOption::Helpers(
        helpers
            .into_iter()
            .map(|(name, helper)| (name.into(), helper))
            .collect(),
    )
}

/// Attach the given files when rendering
pub fn with_attachments(attachments: impl Into<Vec<RequestAttachment>>) -> TemplateOption {
    TemplateOption::Attachments(attachments.into())
}

fn is_html(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case("text/html"))
}

fn configure_escaping(registry: &mut Handlebars<'static>, content_type: &str) {
    if is_html(content_type) {
        registry.register_escape_fn(handlebars::html_escape);
    } else {
        registry.register_escape_fn(handlebars::no_escape);
    }
}

/// Topic/body template pair with its rendering configuration
///
/// Cheap to clone; the compiled templates are shared.
#[derive(Clone, Debug)]
pub struct Template {
    registry: Arc<Handlebars<'static>>,
    settings: Settings,
}

impl Template {
    /// Build a template from topic and body sources.
    ///
    /// Options are applied left to right before both sources are parsed. A
    /// syntax error in either source fails construction.
    pub fn new(
        topic: &str,
        body: &str,
        options: impl IntoIterator<Item = TemplateOption>,
    ) -> MailResult<Self> {
        let mut settings = Settings::default();
        let mut helpers = HelperTable::new();
        helpers.insert("timef".to_string(), Box::new(TimefHelper));

        for option in options {
            option.apply(&mut settings, &mut helpers);
        }

        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        configure_escaping(&mut registry, &settings.content_type);
        for (name, helper) in helpers {
            registry.register_helper(&name, helper);
        }

        registry.register_template_string(TOPIC, topic)?;
        registry.register_template_string(BODY, body)?;

        Ok(Self {
            registry: Arc::new(registry),
            settings,
        })
    }

    /// Render a message from `data`.
    ///
    /// `options` apply to a copy of this template's configuration, so one
    /// template can be executed concurrently with different attachments.
    pub fn execute<T: Serialize>(
        &self,
        data: &T,
        options: impl IntoIterator<Item = TemplateOption>,
    ) -> MailResult<Message> {
        let mut settings = self.settings.clone();
        let mut helpers = HelperTable::new();
        for option in options {
            option.apply(&mut settings, &mut helpers);
        }

        let registry = self.registry_for(&settings, helpers);

        let topic = registry.render(TOPIC, data)?;
        let body = registry.render(BODY, data)?;

        let attachments =
            process_attachments(&settings.allowed_attachment_types, &settings.attachments)
                .map_err(|e| MailError::WrongAttachment(Box::new(e)))?;

        Ok(Message {
            topic,
            body,
            attachments,
            content_type: settings.content_type,
        })
    }

    /// Shared registry, or a per-call copy when the call changes helpers or escaping
    fn registry_for(&self, settings: &Settings, helpers: HelperTable) -> Cow<'_, Handlebars<'static>> {
        let escaping_changed = is_html(&settings.content_type) != is_html(&self.settings.content_type);
        if helpers.is_empty() && !escaping_changed {
            return Cow::Borrowed(self.registry.as_ref());
        }

        let mut registry = self.registry.as_ref().clone();
        configure_escaping(&mut registry, &settings.content_type);
        for (name, helper) in helpers {
            registry.register_helper(&name, helper);
        }
        Cow::Owned(registry)
    }

    /// Content-type rendered messages carry
    pub fn content_type(&self) -> &str {
        &self.settings.content_type
    }

    /// MIME types accepted as attachments
    pub fn allowed_attachment_types(&self) -> &HashSet<String> {
        &self.settings.allowed_attachment_types
    }

    /// Attachments processed on every execution unless overridden
    pub fn attachments(&self) -> &[RequestAttachment] {
        &self.settings.attachments
    }
}
