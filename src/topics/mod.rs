//! Hierarchical topics.
//!
//! Topics are rooted `/`-delimited paths. Subscriptions name a pattern
//! topic and may ask for recursive delivery with a `?recursive` marker:
//!
//! ```ignore
//! let req = SubscribeRequest::parse("/github/acme/?recursive")?;
//! let filter = TopicFilter::from(req);
//!
//! assert!(filter.matches(&TopicPath::parse("/github/acme/widgets")?));
//! ```

mod matcher;
mod path;

pub use matcher::{matches, TopicFilter};
pub use path::{SubscribeRequest, TopicPath, RECURSIVE_FLAG, TOPIC_DELIMITER};
