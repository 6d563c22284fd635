//! Authorization checks shared by every privileged operation.
//!
//! Identity and role come from the upstream session provider and are trusted as given.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::Role;
use crate::{Result, StorefrontError};

/// The caller of an action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn user(user_id: Uuid) -> Self { Self { user_id, role: Role::User } }
    pub fn admin(user_id: Uuid) -> Self { Self { user_id, role: Role::Admin } }
    pub fn is_admin(&self) -> bool { self.role.is_admin() }
}

pub fn require_admin(actor: &Actor) -> Result<()> {
    if actor.is_admin() {
        return Ok(());
    }
    tracing::debug!(user_id = %actor.user_id, role = %actor.role, "admin permission denied");
    Err(StorefrontError::Unauthorized)
}

/// Owners may act on their own records; admins on anyone's.
pub fn require_owner_or_admin(actor: &Actor, owner: Uuid) -> Result<()> {
    if actor.is_admin() || actor.user_id == owner {
        return Ok(());
    }
    tracing::debug!(user_id = %actor.user_id, %owner, "owner permission denied");
    Err(StorefrontError::Unauthorized)
}
