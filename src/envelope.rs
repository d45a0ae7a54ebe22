//! The envelope delivered to subscribers and its wire codec.
//!
//! On the wire an envelope is a structured object whose `Body` field holds
//! the published bytes as a string. This is the shape existing listeners
//! read, so it never changes:
//!
//! ```text
//! {"Body":"{\"ref\":\"refs/heads/main\"}","Topic":"/github/acme","Time":1700000000000000}
//! ```
//!
//! Bodies that are not valid UTF-8 are written as lowercase hex and tagged
//! with `"BodyEncoding":"hex"`.

use crate::error::{HookbotError, Result};
use crate::topics::TopicPath;
use crate::types::Timestamp;
use serde::{Deserialize, Serialize};

/// Serialization used for envelopes on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireFormat {
    /// JSON text, suitable for streamed HTTP bodies and text frames.
    #[default]
    Json,
    /// MessagePack with named fields, for binary frames.
    MessagePack,
}

/// A published payload plus optional metadata.
///
/// Immutable once built; the broker shares one instance across every
/// matching subscriber of a publish.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    body: Vec<u8>,
    topic: Option<TopicPath>,
    timestamp: Option<Timestamp>,
}

impl Envelope {
    /// An envelope carrying only a body.
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            topic: None,
            timestamp: None,
        }
    }

    /// An envelope for a publish to `topic`, stamped with the current time.
    pub fn published(topic: TopicPath, body: impl Into<Vec<u8>>) -> Self {
        Self::with_metadata(body, topic, Timestamp::now())
    }

    pub fn with_metadata(body: impl Into<Vec<u8>>, topic: TopicPath, timestamp: Timestamp) -> Self {
        Self {
            body: body.into(),
            topic: Some(topic),
            timestamp: Some(timestamp),
        }
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The body as text, if it is valid UTF-8.
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }

    pub fn topic(&self) -> Option<&TopicPath> {
        self.topic.as_ref()
    }

    pub fn timestamp(&self) -> Option<Timestamp> {
        self.timestamp
    }

    pub fn encode(&self, format: WireFormat) -> Result<Vec<u8>> {
        encode(self, format)
    }

    pub fn decode(bytes: &[u8], format: WireFormat) -> Result<Self> {
        decode(bytes, format)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum BodyEncoding {
    Hex,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireEnvelope {
    #[serde(rename = "Body")]
    body: String,

    #[serde(rename = "BodyEncoding", default, skip_serializing_if = "Option::is_none")]
    body_encoding: Option<BodyEncoding>,

    #[serde(rename = "Topic", default, skip_serializing_if = "Option::is_none")]
    topic: Option<String>,

    #[serde(rename = "Time", default, skip_serializing_if = "Option::is_none")]
    time: Option<i64>,
}

impl WireEnvelope {
    fn from_envelope(envelope: &Envelope) -> Self {
        let (body, body_encoding) = match std::str::from_utf8(&envelope.body) {
            Ok(text) => (text.to_string(), None),
            Err(_) => (hex::encode(&envelope.body), Some(BodyEncoding::Hex)),
        };

        Self {
            body,
            body_encoding,
            topic: envelope.topic.as_ref().map(|t| t.to_string()),
            time: envelope.timestamp.map(|t| t.0),
        }
    }

    fn into_envelope(self) -> Result<Envelope> {
        let body = match self.body_encoding {
            None => self.body.into_bytes(),
            Some(BodyEncoding::Hex) => hex::decode(&self.body)
                .map_err(|e| HookbotError::Decode(format!("invalid hex body: {}", e)))?,
        };

        let topic = self
            .topic
            .map(|t| {
                TopicPath::parse(&t)
                    .map_err(|e| HookbotError::Decode(format!("invalid topic: {}", e)))
            })
            .transpose()?;

        Ok(Envelope {
            body,
            topic,
            timestamp: self.time.map(Timestamp),
        })
    }
}

/// Serialize an envelope for delivery.
pub fn encode(envelope: &Envelope, format: WireFormat) -> Result<Vec<u8>> {
    let wire = WireEnvelope::from_envelope(envelope);
    match format {
        WireFormat::Json => {
            serde_json::to_vec(&wire).map_err(|e| HookbotError::Encode(e.to_string()))
        }
        WireFormat::MessagePack => Ok(rmp_serde::to_vec_named(&wire)?),
    }
}

/// Parse wire bytes back into an envelope.
pub fn decode(bytes: &[u8], format: WireFormat) -> Result<Envelope> {
    let wire: WireEnvelope = match format {
        WireFormat::Json => serde_json::from_slice(bytes)?,
        WireFormat::MessagePack => rmp_serde::from_slice(bytes)?,
    };
    wire.into_envelope()
}
