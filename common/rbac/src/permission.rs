use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::ValidationError;

/// Upper bound on permissions accepted by a single bulk assignment.
pub const MAX_PERMISSIONS: usize = 250;

/// Value that grants every permission.
pub const WILDCARD: &str = "*";

/// Where a permission applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Admin,
    All,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Admin => "admin",
            Scope::All => "all",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "" => Err(ValidationError::ScopeRequired),
            "admin" => Ok(Scope::Admin),
            "all" => Ok(Scope::All),
            _ => Err(ValidationError::ScopeInvalid),
        }
    }
}

/// A dot-delimited permission pattern such as `admin.roles.*`.
///
/// `scope` is kept as the raw stored string so rows with an unknown scope can
/// still be loaded and reported through [`Permission::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: Uuid,
    pub value: String,
    pub scope: String,
    #[serde(default)]
    pub description: String,
}

impl Permission {
    pub fn new(value: impl Into<String>, scope: Scope) -> Self {
        Self {
            id: Uuid::new_v4(),
            value: value.into(),
            scope: scope.as_str().to_string(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.value.is_empty() {
            return Err(ValidationError::ValueRequired);
        }
        self.scope().map(|_| ())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn scope(&self) -> Result<Scope, ValidationError> {
        self.scope.parse()
    }

    /// Whole-string, case-sensitive glob match where `*` spans any run of
    /// characters, dots included.
    pub fn matches(&self, requested: &str) -> bool {
        if self.value == WILDCARD {
            return true;
        }

        match self.pattern() {
            Ok(pattern) => pattern.is_match(requested),
            Err(err) => {
                debug!(value = %self.value, %err, "permission pattern failed to compile");
                false
            }
        }
    }

    fn pattern(&self) -> Result<Regex, regex::Error> {
        let escaped = regex::escape(&self.value).replace(r"\*", ".*");
        Regex::new(&format!("^{escaped}$"))
    }
}

/// Ordered permission list used for bulk assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions(pub Vec<Permission>);

impl Permissions {
    pub fn new(items: Vec<Permission>) -> Self {
        Self(items)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Permission> {
        self.0.iter()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.0.len() > MAX_PERMISSIONS {
            return Err(ValidationError::LimitExceeded);
        }
        self.0.iter().try_for_each(Permission::validate)
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn into_inner(self) -> Vec<Permission> {
        self.0
    }
}

impl From<Vec<Permission>> for Permissions {
    fn from(value: Vec<Permission>) -> Self {
        Self(value)
    }
}

impl<'a> IntoIterator for &'a Permissions {
    type Item = &'a Permission;
    type IntoIter = std::slice::Iter<'a, Permission>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
