//! Task descriptors.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Opaque description of the work a job performs.
///
/// Always non-blank; construct through [`TaskDescriptor::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskDescriptor(String);

impl TaskDescriptor {
    pub fn parse(raw: impl Into<String>) -> DomainResult<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(DomainError::validation("task must not be blank"));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl core::fmt::Display for TaskDescriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TaskDescriptor {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<TaskDescriptor> for String {
    fn from(value: TaskDescriptor) -> Self {
        value.0
    }
}
