use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity that performed an administrative action.
///
/// The back-office admin is not a stored record, so columns such as
/// `assigned_by` and `verified_by` hold either the admin sentinel or a
/// customer id. The string codec keeps the column a plain text field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum Actor {
    SystemAdmin,
    Customer(Uuid),
}

const ADMIN_SENTINEL: &str = "admin";

impl Actor {
    pub fn is_admin(&self) -> bool {
        matches!(self, Actor::SystemAdmin)
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::SystemAdmin => f.write_str(ADMIN_SENTINEL),
            Actor::Customer(id) => write!(f, "{}", id),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid actor reference: {0}")]
pub struct ParseActorError(String);

impl FromStr for Actor {
    type Err = ParseActorError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw == ADMIN_SENTINEL {
            return Ok(Actor::SystemAdmin);
        }
        Uuid::parse_str(raw)
            .map(Actor::Customer)
            .map_err(|_| ParseActorError(raw.to_string()))
    }
}
