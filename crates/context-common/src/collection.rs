use serde::{Deserialize, Serialize};

/// An ordered list of groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Member group keys, in display order.
    #[serde(default)]
    pub group_keys: Vec<String>,
}

impl Collection {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            description: None,
            group_keys: Vec::new(),
        }
    }

    pub fn with_groups<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_keys = keys.into_iter().map(Into::into).collect();
        self
    }
}
