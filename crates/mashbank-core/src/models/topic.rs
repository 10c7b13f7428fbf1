use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{MashResult, ServiceError};

/// Minimum topic name length.
pub const TOPIC_NAME_MIN: usize = 2;

/// Maximum topic name length.
pub const TOPIC_NAME_MAX: usize = 64;

fn name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9_-]+$").expect("static regex"))
}

/// A validated topic name: `[a-z0-9_-]{2..64}`, also the directory name
/// under the working directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicName(String);

impl TopicName {
    pub fn new(name: &str) -> MashResult<Self> {
        if name.len() < TOPIC_NAME_MIN
            || name.len() > TOPIC_NAME_MAX
            || !name_regex().is_match(name)
        {
            return Err(ServiceError::InvalidTopicName {
                name: name.to_string(),
            }
            .into());
        }
        Ok(TopicName(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TopicName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TopicName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
