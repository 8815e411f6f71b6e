use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a group's values are meant to be presented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupType {
    #[default]
    Text,
    Graph,
}

impl GroupType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupType::Text => "text",
            GroupType::Graph => "graph",
        }
    }
}

impl fmt::Display for GroupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(GroupType::Text),
            "graph" => Ok(GroupType::Graph),
            other => Err(format!("Unknown group type: {}", other)),
        }
    }
}

/// An ordered list of services queried together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub group_type: GroupType,
    #[serde(default)]
    pub graphable: bool,
    /// Member service keys, in display order.
    #[serde(default)]
    pub service_keys: Vec<String>,
}

impl Group {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            description: None,
            group_type: GroupType::Text,
            graphable: false,
            service_keys: Vec::new(),
        }
    }

    pub fn with_services<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.service_keys = keys.into_iter().map(Into::into).collect();
        self
    }
}
