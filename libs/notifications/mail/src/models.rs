use serde::{Deserialize, Serialize};

/// Attachment of a rendered message
///
/// `kind` is the MIME type detected from `content`, never a caller-asserted one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub kind: String,
    #[serde(with = "base64_bytes")]
    pub content: Vec<u8>,
}

/// Message rendered from a template, ready to be handed to a sender
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub topic: String,
    pub body: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub content_type: String,
}

/// Caller-supplied attachment, typically part of a request payload
///
/// On the wire `content` is base64 encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestAttachment {
    pub name: String,
    #[serde(with = "base64_bytes")]
    pub content: Vec<u8>,
}

impl RequestAttachment {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// A mail as recorded by [`MemRecorder`](crate::provider::MemRecorder)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    pub from: String,
    pub to: Vec<String>,
    pub message: Message,
}

impl Mail {
    pub fn new(from: impl Into<String>, to: Vec<String>, message: Message) -> Self {
        Self {
            from: from.into(),
            to,
            message,
        }
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
