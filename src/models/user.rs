//! User record, creation payload and list wrapper.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ValidationError;

/// Department assigned when a payload omits one.
pub const DEFAULT_DEPARTMENT: &str = "General";

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
    )
    .expect("email regex is valid")
});

/// A persisted user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct User {
    /// Storage-assigned identifier.
    #[schema(example = 1)]
    pub id: i32,
    /// Display name.
    #[schema(example = "Ann")]
    pub name: String,
    /// Unique email address.
    #[schema(example = "ann@x.com")]
    pub email: String,
    /// Department.
    #[schema(example = "General")]
    pub department: String,
}

/// Creation payload as received on the wire.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UserCreate {
    /// Display name, must be non-empty.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Department, defaults to "General".
    #[serde(default)]
    pub department: Option<String>,
}

/// A creation payload that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    name: String,
    email: String,
    department: String,
}

impl UserCreate {
    /// Validate the payload and apply defaults.
    pub fn validate(self) -> Result<NewUser, ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::new("name", "must not be empty"));
        }

        if !is_valid_email(&self.email) {
            return Err(ValidationError::new(
                "email",
                "value is not a valid email address",
            ));
        }

        Ok(NewUser {
            name: self.name,
            email: self.email,
            department: self
                .department
                .unwrap_or_else(|| DEFAULT_DEPARTMENT.to_string()),
        })
    }
}

impl NewUser {
    /// Name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Email.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Department.
    pub fn department(&self) -> &str {
        &self.department
    }

    /// Attach a storage-assigned id.
    pub fn into_user(self, id: i32) -> User {
        User {
            id,
            name: self.name,
            email: self.email,
            department: self.department,
        }
    }
}

/// Response body of `GET /api/users`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserList {
    /// Number of users returned.
    pub count: usize,
    /// Users in ascending id order.
    pub users: Vec<User>,
}

impl From<Vec<User>> for UserList {
    fn from(users: Vec<User>) -> Self {
        Self {
            count: users.len(),
            users,
        }
    }
}

fn is_valid_email(email: &str) -> bool {
    email.len() <= 254 && EMAIL_RE.is_match(email)
}
