use core::str::FromStr;

use serde::{Deserialize, Serialize};

use flockerp_core::DomainError;

/// Closed set of business roles.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Submits purchase orders and receives physical stock.
    OrderManager,
    Accountant,
    Manager,
    /// Final approver (CEO).
    Executive,
    Admin,
    Customer,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::OrderManager,
        Role::Accountant,
        Role::Manager,
        Role::Executive,
        Role::Admin,
        Role::Customer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::OrderManager => "ORDER_MANAGER",
            Role::Accountant => "ACCOUNTANT",
            Role::Manager => "MANAGER",
            Role::Executive => "EXECUTIVE",
            Role::Admin => "ADMIN",
            Role::Customer => "CUSTOMER",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DomainError::validation(format!("unknown role '{s}'")))
    }
}
