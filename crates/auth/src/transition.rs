//! Role-gated state machines as explicit edge tables.
//!
//! A workflow declares its whole edge set once as a `static` table and
//! consults it with [`TransitionTable::check`] before emitting a status event.

use flockerp_core::{DomainError, DomainResult};

use crate::Role;

/// One allowed move: from any state in `from` to `to`, by any role in `roles`.
#[derive(Debug)]
pub struct Edge<S: 'static> {
    pub from: &'static [S],
    pub to: S,
    pub roles: &'static [Role],
}

/// Full edge set of one entity's state machine.
#[derive(Debug)]
pub struct TransitionTable<S: 'static> {
    entity: &'static str,
    edges: &'static [Edge<S>],
}

impl<S> TransitionTable<S>
where
    S: Copy + PartialEq + core::fmt::Display,
{
    pub const fn new(entity: &'static str, edges: &'static [Edge<S>]) -> Self {
        Self { entity, edges }
    }

    pub fn entity(&self) -> &'static str {
        self.entity
    }

    pub fn edges(&self) -> &'static [Edge<S>] {
        self.edges
    }

    pub fn permits(&self, from: S, to: S, role: Role) -> bool {
        self.edges
            .iter()
            .any(|e| e.to == to && e.from.contains(&from) && e.roles.contains(&role))
    }

    /// Fails with `InvalidTransition` naming current status, requested status and role.
    pub fn check(&self, from: S, to: S, role: Role) -> DomainResult<()> {
        if self.permits(from, to, role) {
            Ok(())
        } else {
            Err(DomainError::invalid_transition(self.entity, from, to, role))
        }
    }

    /// States `role` may move to from `from`.
    pub fn allowed_targets(&self, from: S, role: Role) -> Vec<S> {
        let mut targets = Vec::new();
        for e in self.edges {
            if e.from.contains(&from) && e.roles.contains(&role) && !targets.contains(&e.to) {
                targets.push(e.to);
            }
        }
        targets
    }

    /// A state with no outgoing edge for any role.
    pub fn is_terminal(&self, state: S) -> bool {
        !self.edges.iter().any(|e| e.from.contains(&state))
    }
}
