use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::domain::order::UserId;

// ============================================================================
// Access Control - Actor identity and the policy gating every mutation
// ============================================================================
//
// Identity is resolved upstream. This module only sees an actor id and a
// closed set of capability tags parsed once at the boundary.
//
// ============================================================================

/// Actor id used by asynchronous event processing
pub const SYSTEM_ACTOR_ID: UserId = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    User,
}

impl Role {
    /// Tag forwarded to downstream services
    pub fn as_tag(&self) -> &'static str {
        match self {
            Role::Admin => "ROLE_ADMIN",
            Role::User => "ROLE_USER",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ROLE_ADMIN" | "ADMIN" => Ok(Role::Admin),
            "ROLE_USER" | "USER" => Ok(Role::User),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Set of capabilities held by an actor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roles(BTreeSet<Role>);

impl Roles {
    pub fn empty() -> Self {
        Self(BTreeSet::new())
    }

    pub fn of(roles: &[Role]) -> Self {
        Self(roles.iter().copied().collect())
    }

    /// Parse a comma-separated header value. Blank entries are skipped,
    /// unrecognized tags fail the whole parse.
    pub fn parse_header(value: &str) -> Result<Self, UnknownRole> {
        value
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(Role::from_str)
            .collect::<Result<BTreeSet<_>, _>>()
            .map(Self)
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_header(&self) -> String {
        self.0.iter().map(Role::as_tag).collect::<Vec<_>>().join(",")
    }
}

impl fmt::Display for Roles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_header())
    }
}

/// Who is acting on an order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    pub roles: Roles,
}

impl Actor {
    pub fn new(id: UserId, roles: Roles) -> Self {
        Self { id, roles }
    }

    pub fn user(id: UserId) -> Self {
        Self::new(id, Roles::of(&[Role::User]))
    }

    pub fn admin(id: UserId) -> Self {
        Self::new(id, Roles::of(&[Role::Admin]))
    }

    /// Non-human identity for payment event processing. Holds admin so
    /// status changes pass the admin check.
    pub fn system() -> Self {
        Self::admin(SYSTEM_ACTOR_ID)
    }

    pub fn is_admin(&self) -> bool {
        self.roles.contains(Role::Admin)
    }
}

// ============================================================================
// Access Policy
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessDenied {
    #[error("Admin role required")]
    AdminRequired,

    #[error("Roles are missing")]
    MissingRoles,

    #[error("Actor {actor_id} may not act on resources owned by {owner_id}")]
    NotOwner { actor_id: UserId, owner_id: UserId },
}

/// Pure checks over (actor id, actor roles, resource owner id)
pub struct AccessPolicy;

impl AccessPolicy {
    pub fn require_admin(roles: &Roles) -> Result<(), AccessDenied> {
        if roles.contains(Role::Admin) {
            Ok(())
        } else {
            Err(AccessDenied::AdminRequired)
        }
    }

    pub fn require_owner_or_admin(
        resource_owner_id: UserId,
        actor_id: UserId,
        roles: &Roles,
    ) -> Result<(), AccessDenied> {
        if roles.is_empty() {
            return Err(AccessDenied::MissingRoles);
        }

        if roles.contains(Role::Admin) {
            return Ok(());
        }

        if roles.contains(Role::User) && resource_owner_id == actor_id {
            return Ok(());
        }

        Err(AccessDenied::NotOwner {
            actor_id,
            owner_id: resource_owner_id,
        })
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
