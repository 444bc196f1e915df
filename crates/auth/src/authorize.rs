use serde::{Deserialize, Serialize};

use flockerp_core::{DomainError, DomainResult, UserId};

use crate::{Permission, Role};

/// The `(actorId, actorRole)` pair every workflow operation receives.
///
/// The role is trusted as given; authentication happens before this point.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }
}

/// Check that `actor` holds `permission`.
///
/// - No IO
/// - No panics
pub fn authorize(actor: &Actor, permission: Permission) -> DomainResult<()> {
    if permission.granted_to(actor.role) {
        Ok(())
    } else {
        Err(DomainError::unauthorized(actor.role, permission.action()))
    }
}
