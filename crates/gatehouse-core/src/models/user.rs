use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::auth::SessionError;

/// User identity as issued by the identity service.
///
/// Kept as the JSON object the service sent, untouched: no field is
/// required and no field's type is checked. Only non-objects are rejected.
/// `name` is read for display and may be missing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserIdentity(Map<String, Value>);

impl UserIdentity {
    /// Identity with the usual `id` and `name` fields.
    pub fn new(id: impl Into<Value>, name: impl Into<String>) -> Self {
        Self::default()
            .with_field("id", id)
            .with_field("name", Value::String(name.into()))
    }

    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn with_email(self, email: impl Into<String>) -> Self {
        self.with_field("email", Value::String(email.into()))
    }

    pub fn with_role(self, role: impl Into<String>) -> Self {
        self.with_field("role", Value::String(role.into()))
    }

    /// Display name, if the record carries a string `name`.
    pub fn name(&self) -> Option<&str> {
        self.get_str("name")
    }

    pub fn id(&self) -> Option<&Value> {
        self.0.get("id")
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

/// Opaque bearer token. Never inspected, only stored, returned and replaced.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Result<Self, SessionError> {
        let token = token.into();
        if token.is_empty() {
            return Err(SessionError::EmptyCredential);
        }
        Ok(Self(token))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl TryFrom<String> for Credential {
    type Error = SessionError;

    fn try_from(token: String) -> Result<Self, Self::Error> {
        Self::new(token)
    }
}

impl From<Credential> for String {
    fn from(credential: Credential) -> Self {
        credential.0
    }
}

// Redacted so tokens never end up in logs
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(<{} bytes>)", self.0.len())
    }
}
