//! Customer chicken orders (event-sourced).
//!
//! An order only records what was sold and at what price. The stock it
//! consumes is debited from the ledger by the workflow engine in the same
//! commit.

pub mod order;

pub use order::{
    ChangeChickenOrderQuantity, ChickenOrder, ChickenOrderCommand, ChickenOrderEvent,
    ChickenOrderId, ChickenOrderPlaced, ChickenOrderQuantityChanged, CustomerDetails,
    PlaceChickenOrder,
};
