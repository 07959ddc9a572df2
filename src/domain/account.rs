use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::*;

/// A named pool of money tracked for one identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub balance: f64,
    pub color: String,
}

impl Account {
    /// Creates an account with a freshly generated identifier.
    pub fn new(name: impl Into<String>, balance: f64, color: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), name, balance, color)
    }

    pub fn with_id(
        id: impl Into<String>,
        name: impl Into<String>,
        balance: f64,
        color: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            balance,
            color: color.into(),
        }
    }
}

impl Identifiable for Account {
    fn id(&self) -> &str {
        &self.id
    }
}
