//! Topic paths and the subscribe request grammar.

use crate::error::{HookbotError, Result};
use std::fmt;
use std::str::FromStr;

/// Separator between topic segments.
pub const TOPIC_DELIMITER: char = '/';

/// Subscribe flag requesting a match on all descendant topics.
pub const RECURSIVE_FLAG: &str = "recursive";

/// A rooted, `/`-delimited topic such as `/github/org/repo`.
///
/// Stored as its canonical segment list, so `/foo/` and `/foo` are the
/// same path. The root `/` has no segments.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TopicPath {
    segments: Vec<String>,
}

impl TopicPath {
    /// The root topic `/`.
    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Parse a topic as it appears on the wire.
    pub fn parse(topic: &str) -> Result<Self> {
        if topic.is_empty() {
            return Err(HookbotError::malformed(topic, "topic is empty"));
        }
        let Some(body) = topic.strip_prefix(TOPIC_DELIMITER) else {
            return Err(HookbotError::malformed(topic, "topic must start with '/'"));
        };

        // A single trailing delimiter does not add a segment.
        let body = body.strip_suffix(TOPIC_DELIMITER).unwrap_or(body);
        if body.is_empty() {
            if topic.len() > 1 {
                return Err(HookbotError::malformed(topic, "empty segment"));
            }
            return Ok(Self::root());
        }

        let mut segments = Vec::new();
        for segment in body.split(TOPIC_DELIMITER) {
            validate_segment(topic, segment)?;
            segments.push(segment.to_string());
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments; zero for the root.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The enclosing topic, or `None` for the root.
    pub fn parent(&self) -> Option<TopicPath> {
        if self.is_root() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Append one segment.
    pub fn child(&self, segment: &str) -> Result<TopicPath> {
        validate_segment(segment, segment)?;
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Ok(Self { segments })
    }

    /// True if `self`'s segments are a strict prefix of `other`'s.
    pub fn is_ancestor_of(&self, other: &TopicPath) -> bool {
        self.segments.len() < other.segments.len()
            && other.segments.starts_with(&self.segments)
    }
}

fn validate_segment(topic: &str, segment: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(HookbotError::malformed(topic, "empty segment"));
    }
    if segment == "." || segment == ".." {
        return Err(HookbotError::malformed(
            topic,
            format!("relative segment {:?}", segment),
        ));
    }
    if let Some(c) = segment
        .chars()
        .find(|c| c.is_control() || c.is_whitespace() || matches!(c, '?' | '#' | '/'))
    {
        return Err(HookbotError::malformed(
            topic,
            format!("disallowed character {:?}", c),
        ));
    }
    Ok(())
}

impl fmt::Display for TopicPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return write!(f, "{}", TOPIC_DELIMITER);
        }
        for segment in &self.segments {
            write!(f, "{}{}", TOPIC_DELIMITER, segment)?;
        }
        Ok(())
    }
}

impl fmt::Debug for TopicPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TopicPath({})", self)
    }
}

impl FromStr for TopicPath {
    type Err = HookbotError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A parsed subscribe topic: `<path>[?flag[&flag...]]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscribeRequest {
    pub topic: TopicPath,
    pub recursive: bool,
}

impl SubscribeRequest {
    pub fn parse(raw: &str) -> Result<Self> {
        let (path, flags) = match raw.split_once('?') {
            Some((path, flags)) => (path, Some(flags)),
            None => (raw, None),
        };

        let topic = TopicPath::parse(path)?;
        let mut recursive = false;

        for flag in flags.into_iter().flat_map(|f| f.split('&')) {
            match flag {
                "" => {}
                RECURSIVE_FLAG => recursive = true,
                other => {
                    return Err(HookbotError::malformed(
                        raw,
                        format!("unrecognized flag {:?}", other),
                    ))
                }
            }
        }

        Ok(Self { topic, recursive })
    }
}

impl FromStr for SubscribeRequest {
    type Err = HookbotError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for SubscribeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.topic)?;
        if self.recursive {
            // Keep the trailing slash so the round trip reads naturally.
            if !self.topic.is_root() {
                write!(f, "{}", TOPIC_DELIMITER)?;
            }
            write!(f, "?{}", RECURSIVE_FLAG)?;
        }
        Ok(())
    }
}
