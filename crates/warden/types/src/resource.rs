//! Hierarchical resource identifiers.
//!
//! A resource path has the canonical shape
//! `/subscriptions/{sub}/resourceGroups/{group}/providers/{provider}/{kind}/{name}`.
//! Segments are positional: a malformed path yields empty segments rather
//! than an error, only an empty path is rejected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ResourceIdError;

const SUBSCRIPTION_SEGMENT: usize = 2;
const GROUP_SEGMENT: usize = 4;
const PROVIDER_SEGMENT: usize = 6;
const KIND_SEGMENT: usize = 7;
const NAME_SEGMENT: usize = 8;

/// A parsed resource path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId {
    path: String,
}

impl ResourceId {
    /// Parse a resource path.
    pub fn parse(path: impl Into<String>) -> Result<Self, ResourceIdError> {
        let path = path.into();
        if path.is_empty() {
            return Err(ResourceIdError::Empty);
        }
        Ok(Self { path })
    }

    fn segment(&self, index: usize) -> &str {
        self.path.split('/').nth(index).unwrap_or("")
    }

    pub fn subscription_id(&self) -> &str {
        self.segment(SUBSCRIPTION_SEGMENT)
    }

    pub fn resource_group(&self) -> &str {
        self.segment(GROUP_SEGMENT)
    }

    pub fn provider(&self) -> &str {
        self.segment(PROVIDER_SEGMENT)
    }

    /// Resource type segment, e.g. `virtualMachineScaleSets`.
    pub fn kind(&self) -> &str {
        self.segment(KIND_SEGMENT)
    }

    pub fn name(&self) -> &str {
        self.segment(NAME_SEGMENT)
    }

    /// The path as given at construction.
    pub fn as_str(&self) -> &str {
        &self.path
    }

    /// Canonical path rebuilt from the positional segments.
    pub fn uri(&self) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/{}/{}/{}",
            self.subscription_id(),
            self.resource_group(),
            self.provider(),
            self.kind(),
            self.name()
        )
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl FromStr for ResourceId {
    type Err = ResourceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ResourceId {
    type Error = ResourceIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ResourceId> for String {
    fn from(id: ResourceId) -> Self {
        id.path
    }
}
