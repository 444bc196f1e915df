use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use flockerp_auth::{Actor, Permission, authorize};
use flockerp_core::{Aggregate, AggregateId, AggregateRoot, DomainError, UserId, money};
use flockerp_events::Event;
use flockerp_stock::ItemKind;

/// Chicken order identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChickenOrderId(pub AggregateId);

impl ChickenOrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ChickenOrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Aggregate root: ChickenOrder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChickenOrder {
    id: ChickenOrderId,
    customer: CustomerDetails,
    item_kind: Option<ItemKind>,
    quantity: i64,
    /// Price in smallest currency unit.
    unit_price: u64,
    total: u64,
    placed_by: Option<UserId>,
    version: u64,
    created: bool,
}

impl ChickenOrder {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: ChickenOrderId) -> Self {
        Self {
            id,
            customer: CustomerDetails::default(),
            item_kind: None,
            quantity: 0,
            unit_price: 0,
            total: 0,
            placed_by: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ChickenOrderId {
        self.id
    }

    pub fn exists(&self) -> bool {
        self.created
    }

    pub fn customer(&self) -> &CustomerDetails {
        &self.customer
    }

    pub fn item_kind(&self) -> Option<ItemKind> {
        self.item_kind
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn unit_price(&self) -> u64 {
        self.unit_price
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn placed_by(&self) -> Option<UserId> {
        self.placed_by
    }
}

impl AggregateRoot for ChickenOrder {
    type Id = ChickenOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: PlaceChickenOrder. `unit_price` is already resolved by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceChickenOrder {
    pub order_id: ChickenOrderId,
    pub customer: CustomerDetails,
    pub item_kind: ItemKind,
    pub quantity: i64,
    pub unit_price: u64,
    pub placed_by: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangeChickenOrderQuantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeChickenOrderQuantity {
    pub order_id: ChickenOrderId,
    pub quantity: i64,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChickenOrderCommand {
    PlaceChickenOrder(PlaceChickenOrder),
    ChangeChickenOrderQuantity(ChangeChickenOrderQuantity),
}

/// Event: ChickenOrderPlaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChickenOrderPlaced {
    pub order_id: ChickenOrderId,
    pub customer: CustomerDetails,
    pub item_kind: ItemKind,
    pub quantity: i64,
    pub unit_price: u64,
    pub total: u64,
    pub placed_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ChickenOrderQuantityChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChickenOrderQuantityChanged {
    pub order_id: ChickenOrderId,
    pub previous_quantity: i64,
    pub quantity: i64,
    pub total: u64,
    pub changed_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

impl ChickenOrderQuantityChanged {
    /// Positive when more stock is taken, negative when stock goes back.
    pub fn delta(&self) -> i64 {
        self.quantity - self.previous_quantity
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChickenOrderEvent {
    ChickenOrderPlaced(ChickenOrderPlaced),
    ChickenOrderQuantityChanged(ChickenOrderQuantityChanged),
}

impl Event for ChickenOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ChickenOrderEvent::ChickenOrderPlaced(_) => "sales.chicken_order.placed",
            ChickenOrderEvent::ChickenOrderQuantityChanged(_) => {
                "sales.chicken_order.quantity_changed"
            }
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ChickenOrderEvent::ChickenOrderPlaced(e) => e.occurred_at,
            ChickenOrderEvent::ChickenOrderQuantityChanged(e) => e.occurred_at,
        }
    }
}

impl Aggregate for ChickenOrder {
    type Command = ChickenOrderCommand;
    type Event = ChickenOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ChickenOrderEvent::ChickenOrderPlaced(e) => {
                self.id = e.order_id;
                self.customer = e.customer.clone();
                self.item_kind = Some(e.item_kind);
                self.quantity = e.quantity;
                self.unit_price = e.unit_price;
                self.total = e.total;
                self.placed_by = Some(e.placed_by);
                self.created = true;
            }
            ChickenOrderEvent::ChickenOrderQuantityChanged(e) => {
                self.quantity = e.quantity;
                self.total = e.total;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ChickenOrderCommand::PlaceChickenOrder(cmd) => self.handle_place(cmd),
            ChickenOrderCommand::ChangeChickenOrderQuantity(cmd) => {
                self.handle_change_quantity(cmd)
            }
        }
    }
}

impl ChickenOrder {
    fn ensure_order_id(&self, order_id: ChickenOrderId) -> Result<(), DomainError> {
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    fn handle_place(&self, cmd: &PlaceChickenOrder) -> Result<Vec<ChickenOrderEvent>, DomainError> {
        self.ensure_order_id(cmd.order_id)?;
        authorize(&cmd.placed_by, Permission::SellStock)?;
        if self.created {
            return Err(DomainError::conflict("chicken order already exists"));
        }
        if cmd.customer.name.trim().is_empty() {
            return Err(DomainError::validation("customer name is required"));
        }
        if cmd.unit_price == 0 {
            return Err(DomainError::validation("unit_price must be positive"));
        }
        let total = money::line_total(cmd.quantity, cmd.unit_price)?;

        Ok(vec![ChickenOrderEvent::ChickenOrderPlaced(ChickenOrderPlaced {
            order_id: cmd.order_id,
            customer: cmd.customer.clone(),
            item_kind: cmd.item_kind,
            quantity: cmd.quantity,
            unit_price: cmd.unit_price,
            total,
            placed_by: cmd.placed_by.id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_quantity(
        &self,
        cmd: &ChangeChickenOrderQuantity,
    ) -> Result<Vec<ChickenOrderEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found("chicken order", cmd.order_id));
        }
        self.ensure_order_id(cmd.order_id)?;
        authorize(&cmd.actor, Permission::SellStock)?;
        if cmd.quantity == self.quantity {
            return Ok(Vec::new());
        }
        let total = money::line_total(cmd.quantity, self.unit_price)?;

        Ok(vec![ChickenOrderEvent::ChickenOrderQuantityChanged(
            ChickenOrderQuantityChanged {
                order_id: cmd.order_id,
                previous_quantity: self.quantity,
                quantity: cmd.quantity,
                total,
                changed_by: cmd.actor.id,
                occurred_at: cmd.occurred_at,
            },
        )])
    }
}
