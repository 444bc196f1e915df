//! `flockerp-auth`: role context and role-gated transition tables.
//!
//! Identity is established elsewhere: every workflow operation receives an
//! already-resolved [`Actor`]. This crate only decides what that actor's role
//! may do.

pub mod authorize;
pub mod permissions;
pub mod roles;
pub mod transition;

pub use authorize::{Actor, authorize};
pub use permissions::Permission;
pub use roles::Role;
pub use transition::{Edge, TransitionTable};
