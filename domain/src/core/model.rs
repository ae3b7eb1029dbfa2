//! Model identifier and descriptor value objects

use serde::{Deserialize, Serialize};

/// Opaque identifier of an upstream model (Value Object).
///
/// The engine never interprets the id beyond routing it to the gateway.
/// Gateway-style ids of the form `provider/name` are common but not required.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Provider segment of a `provider/name` id, if present.
    pub fn provider(&self) -> Option<&str> {
        self.0.split_once('/').map(|(provider, _)| provider)
    }

    /// Human-friendly short name: the part after `provider/`, else the full id.
    pub fn short_name(&self) -> &str {
        self.0.split_once('/').map_or(self.0.as_str(), |(_, name)| name)
    }
}

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ModelId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ModelId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Immutable description of an upstream model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub id: ModelId,
    pub display_name: String,
    pub provider: String,
}

impl ModelDescriptor {
    /// Derive a descriptor from a bare id.
    pub fn from_id(id: ModelId) -> Self {
        let provider = id.provider().unwrap_or("unknown").to_string();
        let display_name = id.short_name().to_string();
        Self {
            id,
            display_name,
            provider,
        }
    }
}
