//! User profile Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use crate::domain::value_objects::{PaymentMethod, ShippingAddress};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str { match self { Self::User => "user", Self::Admin => "admin" } }
    pub fn is_admin(&self) -> bool { matches!(self, Self::Admin) }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Role {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role {other:?}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub(crate) id: Uuid,
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) role: Role,
    pub(crate) address: Option<ShippingAddress>,
    pub(crate) payment_method: Option<PaymentMethod>,
    pub(crate) created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(length(min = 3, message = "Name must be at least 3 characters"))]
    pub name: String,
}

impl User {
    pub fn new(name: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id: Uuid::now_v7(), name: name.into(), email: email.into(), role,
            address: None, payment_method: None, created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn email(&self) -> &str { &self.email }
    pub fn role(&self) -> Role { self.role }
    pub fn address(&self) -> Option<&ShippingAddress> { self.address.as_ref() }
    pub fn payment_method(&self) -> Option<PaymentMethod> { self.payment_method }

    pub fn rename(&mut self, name: impl Into<String>) { self.name = name.into(); }
    pub fn set_address(&mut self, address: ShippingAddress) { self.address = Some(address); }
    pub fn set_payment_method(&mut self, method: PaymentMethod) { self.payment_method = Some(method); }
}
