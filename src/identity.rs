use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{StudyError, StudyResult};

/// The authenticated user every row is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns `None` for blank ids, which count as an anonymous caller.
    pub fn parse(id: &str) -> Option<Self> {
        let trimmed = id.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Mutations refuse anonymous callers outright
pub(crate) fn require_owner(owner: Option<&OwnerId>) -> StudyResult<&OwnerId> {
    owner.ok_or(StudyError::Auth)
}

/// Resolves the caller of an operation to an owner, or `None` when anonymous.
pub trait IdentityProvider {
    fn resolve(&self) -> Option<OwnerId>;
}

/// Identity fixed at construction, e.g. from a CLI flag or config file.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    owner: Option<OwnerId>,
}

impl StaticIdentity {
    pub fn new(user: Option<&str>) -> Self {
        Self {
            owner: user.and_then(OwnerId::parse),
        }
    }

    pub fn anonymous() -> Self {
        Self { owner: None }
    }
}

impl IdentityProvider for StaticIdentity {
    fn resolve(&self) -> Option<OwnerId> {
        self.owner.clone()
    }
}
