use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use flockerp_auth::{Actor, Edge, Role, TransitionTable};
use flockerp_core::{Aggregate, AggregateId, AggregateRoot, DomainError, UserId, money};
use flockerp_events::Event;
use flockerp_stock::{FeedType, StockKind};

/// Purchase order identifier, derived from the business order number.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PurchaseOrderId(pub AggregateId);

impl PurchaseOrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }

    /// The same order number always maps to the same stream, which is how a
    /// reused number is detected.
    pub fn for_number(order_number: &str) -> Self {
        Self(AggregateId::derived("purchasing.order", order_number.trim()))
    }
}

impl core::fmt::Display for PurchaseOrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Purchase order status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    InProgress,
    AccountantApproved,
    ManagerApproved,
    Approved,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::InProgress => "IN_PROGRESS",
            OrderStatus::AccountantApproved => "ACCOUNTANT_APPROVED",
            OrderStatus::ManagerApproved => "MANAGER_APPROVED",
            OrderStatus::Approved => "APPROVED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Rejected => "REJECTED",
        }
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub static ORDER_TRANSITIONS: TransitionTable<OrderStatus> = TransitionTable::new(
    "order",
    &[
        Edge {
            from: &[OrderStatus::Pending],
            to: OrderStatus::InProgress,
            roles: &[Role::Accountant],
        },
        Edge {
            from: &[OrderStatus::InProgress],
            to: OrderStatus::Approved,
            roles: &[Role::Manager, Role::Executive],
        },
        Edge {
            from: &[OrderStatus::Pending, OrderStatus::InProgress],
            to: OrderStatus::Cancelled,
            roles: &[Role::Accountant, Role::Manager, Role::Executive],
        },
    ],
);

/// Supplier and delivery details captured with the order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierDetails {
    pub company_name: String,
    pub farm_name: Option<String>,
    pub farm_number: Option<String>,
    pub village_name: Option<String>,
    pub region: Option<String>,
    pub po_box: Option<String>,
    pub contact_name: Option<String>,
    pub phone_number: Option<String>,
}

/// Purchase order line.
///
/// `kind`/`feed_type` may be supplied explicitly at creation; when absent the
/// description is classified when stock items are spawned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub description: String,
    pub quantity: i64,
    /// Price in smallest currency unit.
    pub unit_price: u64,
    pub total_price: u64,
    #[serde(default)]
    pub kind: Option<StockKind>,
    #[serde(default)]
    pub feed_type: Option<FeedType>,
}

impl OrderLine {
    pub fn new(description: impl Into<String>, quantity: i64, unit_price: u64) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_price,
            total_price: 0,
            kind: None,
            feed_type: None,
        }
    }

    pub fn with_kind(mut self, kind: StockKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_feed_type(mut self, feed_type: FeedType) -> Self {
        self.kind = Some(StockKind::Feed);
        self.feed_type = Some(feed_type);
        self
    }

    fn normalized(&self) -> Result<Self, DomainError> {
        let description = self.description.trim();
        if description.is_empty() {
            return Err(DomainError::validation("line description is required"));
        }
        if self.feed_type.is_some() && matches!(self.kind, Some(k) if k != StockKind::Feed) {
            return Err(DomainError::validation(format!(
                "line '{description}' has a feed type but kind {}",
                self.kind.map(StockKind::as_str).unwrap_or_default()
            )));
        }
        Ok(Self {
            description: description.to_string(),
            quantity: self.quantity,
            unit_price: self.unit_price,
            total_price: money::line_total(self.quantity, self.unit_price)?,
            kind: self.kind,
            feed_type: self.feed_type,
        })
    }
}

/// Aggregate root: PurchaseOrder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseOrder {
    id: PurchaseOrderId,
    order_number: String,
    order_date: Option<NaiveDate>,
    supplier: SupplierDetails,
    lines: Vec<OrderLine>,
    total_amount: u64,
    status: OrderStatus,
    submitted_by: Option<UserId>,
    approved_by: Option<UserId>,
    invoice_id: Option<AggregateId>,
    stock_item_ids: Vec<AggregateId>,
    version: u64,
    created: bool,
}

impl PurchaseOrder {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: PurchaseOrderId) -> Self {
        Self {
            id,
            order_number: String::new(),
            order_date: None,
            supplier: SupplierDetails::default(),
            lines: Vec::new(),
            total_amount: 0,
            status: OrderStatus::Pending,
            submitted_by: None,
            approved_by: None,
            invoice_id: None,
            stock_item_ids: Vec::new(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> PurchaseOrderId {
        self.id
    }

    pub fn exists(&self) -> bool {
        self.created
    }

    pub fn order_number(&self) -> &str {
        &self.order_number
    }

    pub fn order_date(&self) -> Option<NaiveDate> {
        self.order_date
    }

    pub fn supplier(&self) -> &SupplierDetails {
        &self.supplier
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn total_amount(&self) -> u64 {
        self.total_amount
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn submitted_by(&self) -> Option<UserId> {
        self.submitted_by
    }

    pub fn approved_by(&self) -> Option<UserId> {
        self.approved_by
    }

    pub fn invoice_id(&self) -> Option<AggregateId> {
        self.invoice_id
    }

    pub fn stock_item_ids(&self) -> &[AggregateId] {
        &self.stock_item_ids
    }
}

impl AggregateRoot for PurchaseOrder {
    type Id = PurchaseOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreatePurchaseOrder.
///
/// `claimed_total` is whatever the client sent; it is ignored in favour of the
/// recomputed total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePurchaseOrder {
    pub order_id: PurchaseOrderId,
    pub order_number: String,
    pub order_date: NaiveDate,
    pub supplier: SupplierDetails,
    pub lines: Vec<OrderLine>,
    pub claimed_total: Option<u64>,
    pub submitted_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangeOrderStatus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeOrderStatus {
    pub order_id: PurchaseOrderId,
    pub to: OrderStatus,
    pub actor: Actor,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: MarkInvoiced (the order's single invoice was issued).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkInvoiced {
    pub order_id: PurchaseOrderId,
    pub invoice_id: AggregateId,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordStockSpawned (receivable stock items exist for this order).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordStockSpawned {
    pub order_id: PurchaseOrderId,
    pub stock_item_ids: Vec<AggregateId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseOrderCommand {
    CreatePurchaseOrder(CreatePurchaseOrder),
    ChangeOrderStatus(ChangeOrderStatus),
    MarkInvoiced(MarkInvoiced),
    RecordStockSpawned(RecordStockSpawned),
}

/// Event: OrderCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreated {
    pub order_id: PurchaseOrderId,
    pub order_number: String,
    pub order_date: NaiveDate,
    pub supplier: SupplierDetails,
    pub lines: Vec<OrderLine>,
    pub total_amount: u64,
    pub submitted_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderStatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusChanged {
    pub order_id: PurchaseOrderId,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub changed_by: UserId,
    pub role: Role,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderInvoiced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderInvoiced {
    pub order_id: PurchaseOrderId,
    pub invoice_id: AggregateId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockItemsSpawned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockItemsSpawned {
    pub order_id: PurchaseOrderId,
    pub stock_item_ids: Vec<AggregateId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseOrderEvent {
    OrderCreated(OrderCreated),
    OrderStatusChanged(OrderStatusChanged),
    OrderInvoiced(OrderInvoiced),
    StockItemsSpawned(StockItemsSpawned),
}

impl Event for PurchaseOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PurchaseOrderEvent::OrderCreated(_) => "purchasing.order.created",
            PurchaseOrderEvent::OrderStatusChanged(_) => "purchasing.order.status_changed",
            PurchaseOrderEvent::OrderInvoiced(_) => "purchasing.order.invoiced",
            PurchaseOrderEvent::StockItemsSpawned(_) => "purchasing.order.stock_spawned",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PurchaseOrderEvent::OrderCreated(e) => e.occurred_at,
            PurchaseOrderEvent::OrderStatusChanged(e) => e.occurred_at,
            PurchaseOrderEvent::OrderInvoiced(e) => e.occurred_at,
            PurchaseOrderEvent::StockItemsSpawned(e) => e.occurred_at,
        }
    }
}

impl Aggregate for PurchaseOrder {
    type Command = PurchaseOrderCommand;
    type Event = PurchaseOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PurchaseOrderEvent::OrderCreated(e) => {
                self.id = e.order_id;
                self.order_number = e.order_number.clone();
                self.order_date = Some(e.order_date);
                self.supplier = e.supplier.clone();
                self.lines = e.lines.clone();
                self.total_amount = e.total_amount;
                self.status = OrderStatus::Pending;
                self.submitted_by = Some(e.submitted_by);
                self.created = true;
            }
            PurchaseOrderEvent::OrderStatusChanged(e) => {
                self.status = e.to;
                if e.to == OrderStatus::Approved {
                    self.approved_by = Some(e.changed_by);
                }
            }
            PurchaseOrderEvent::OrderInvoiced(e) => {
                self.invoice_id = Some(e.invoice_id);
            }
            PurchaseOrderEvent::StockItemsSpawned(e) => {
                self.stock_item_ids = e.stock_item_ids.clone();
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PurchaseOrderCommand::CreatePurchaseOrder(cmd) => self.handle_create(cmd),
            PurchaseOrderCommand::ChangeOrderStatus(cmd) => self.handle_change_status(cmd),
            PurchaseOrderCommand::MarkInvoiced(cmd) => self.handle_mark_invoiced(cmd),
            PurchaseOrderCommand::RecordStockSpawned(cmd) => self.handle_stock_spawned(cmd),
        }
    }
}

impl PurchaseOrder {
    fn ensure_order_id(&self, order_id: PurchaseOrderId) -> Result<(), DomainError> {
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    fn ensure_created(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found("order", self.id));
        }
        Ok(())
    }

    fn handle_create(
        &self,
        cmd: &CreatePurchaseOrder,
    ) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_order_id(cmd.order_id)?;
        let order_number = cmd.order_number.trim();
        if order_number.is_empty() {
            return Err(DomainError::validation("order number is required"));
        }
        if self.created {
            return Err(DomainError::duplicate(format!(
                "order number {order_number} already exists"
            )));
        }
        if cmd.supplier.company_name.trim().is_empty() {
            return Err(DomainError::validation("supplier company name is required"));
        }
        if cmd.lines.is_empty() {
            return Err(DomainError::validation("an order needs at least one line"));
        }

        // Trust boundary: totals are recomputed, never taken from the caller.
        let lines = cmd
            .lines
            .iter()
            .map(OrderLine::normalized)
            .collect::<Result<Vec<_>, _>>()?;
        let total_amount = money::sum(lines.iter().map(|l| l.total_price))?;

        Ok(vec![PurchaseOrderEvent::OrderCreated(OrderCreated {
            order_id: cmd.order_id,
            order_number: order_number.to_string(),
            order_date: cmd.order_date,
            supplier: cmd.supplier.clone(),
            lines,
            total_amount,
            submitted_by: cmd.submitted_by,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_status(
        &self,
        cmd: &ChangeOrderStatus,
    ) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_order_id(cmd.order_id)?;
        ORDER_TRANSITIONS.check(self.status, cmd.to, cmd.actor.role)?;

        Ok(vec![PurchaseOrderEvent::OrderStatusChanged(
            OrderStatusChanged {
                order_id: cmd.order_id,
                from: self.status,
                to: cmd.to,
                changed_by: cmd.actor.id,
                role: cmd.actor.role,
                reason: cmd.reason.clone(),
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_mark_invoiced(
        &self,
        cmd: &MarkInvoiced,
    ) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_order_id(cmd.order_id)?;

        // Invariant: only approved orders are invoiceable.
        if self.status != OrderStatus::Approved {
            return Err(DomainError::InvalidTransition {
                entity: "order",
                from: self.status.to_string(),
                to: "INVOICED".to_string(),
                role: cmd.actor.role.to_string(),
            });
        }
        if let Some(existing) = self.invoice_id {
            return Err(DomainError::duplicate(format!(
                "order {} already has invoice {existing}",
                self.order_number
            )));
        }

        Ok(vec![PurchaseOrderEvent::OrderInvoiced(OrderInvoiced {
            order_id: cmd.order_id,
            invoice_id: cmd.invoice_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_stock_spawned(
        &self,
        cmd: &RecordStockSpawned,
    ) -> Result<Vec<PurchaseOrderEvent>, DomainError> {
        self.ensure_created()?;
        self.ensure_order_id(cmd.order_id)?;
        if self.invoice_id.is_none() {
            return Err(DomainError::invariant(
                "stock items can only be spawned for an invoiced order",
            ));
        }
        if !self.stock_item_ids.is_empty() {
            return Err(DomainError::duplicate(format!(
                "stock items already spawned for order {}",
                self.order_number
            )));
        }

        Ok(vec![PurchaseOrderEvent::StockItemsSpawned(StockItemsSpawned {
            order_id: cmd.order_id,
            stock_item_ids: cmd.stock_item_ids.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}
