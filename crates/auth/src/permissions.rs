use serde::{Deserialize, Serialize};

use crate::Role;

/// Actions outside the status state machines that are still role-gated.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    CreateOrder,
    GenerateInvoice,
    CreateRequest,
    ReceiveStock,
    ApproveStock,
    ManageLedger,
    SellStock,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::CreateOrder => "purchasing.order.create",
            Permission::GenerateInvoice => "invoicing.invoice.generate",
            Permission::CreateRequest => "approvals.request.create",
            Permission::ReceiveStock => "receiving.stock_item.receive",
            Permission::ApproveStock => "receiving.stock_item.approve",
            Permission::ManageLedger => "stock.ledger.manage",
            Permission::SellStock => "sales.chicken_order.place",
        }
    }

    /// Short verb phrase used in authorization errors.
    pub fn action(self) -> &'static str {
        match self {
            Permission::CreateOrder => "create orders",
            Permission::GenerateInvoice => "generate invoices",
            Permission::CreateRequest => "create requests",
            Permission::ReceiveStock => "receive stock",
            Permission::ApproveStock => "approve stock",
            Permission::ManageLedger => "manage the stock ledger",
            Permission::SellStock => "sell stock",
        }
    }

    pub fn granted_to(self, role: Role) -> bool {
        use Role::*;
        match self {
            Permission::CreateOrder => matches!(role, OrderManager | Admin),
            Permission::GenerateInvoice => matches!(role, Accountant | Admin),
            Permission::CreateRequest => role != Customer,
            Permission::ReceiveStock => matches!(role, OrderManager | Admin),
            Permission::ApproveStock => role == Accountant,
            Permission::ManageLedger => matches!(role, Manager | Executive | Admin),
            Permission::SellStock => matches!(role, OrderManager | Manager | Admin),
        }
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
