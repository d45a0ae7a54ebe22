//! Subscription pattern matching.

use super::path::{SubscribeRequest, TopicPath};

/// Does a subscription to `pattern` receive a publish to `topic`?
///
/// Non-recursive patterns match only the identical topic. Recursive
/// patterns also match every descendant.
pub fn matches(pattern: &TopicPath, recursive: bool, topic: &TopicPath) -> bool {
    pattern == topic || (recursive && pattern.is_ancestor_of(topic))
}

/// A pattern together with its recursive flag.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TopicFilter {
    pub pattern: TopicPath,
    pub recursive: bool,
}

impl TopicFilter {
    pub fn exact(pattern: TopicPath) -> Self {
        Self {
            pattern,
            recursive: false,
        }
    }

    pub fn recursive(pattern: TopicPath) -> Self {
        Self {
            pattern,
            recursive: true,
        }
    }

    pub fn matches(&self, topic: &TopicPath) -> bool {
        matches(&self.pattern, self.recursive, topic)
    }
}

impl From<SubscribeRequest> for TopicFilter {
    fn from(req: SubscribeRequest) -> Self {
        Self {
            pattern: req.topic,
            recursive: req.recursive,
        }
    }
}
