use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use flockerp_auth::Actor;
use flockerp_core::{Aggregate, AggregateId, AggregateRoot, DomainError, UserId};
use flockerp_events::Event;
use flockerp_purchasing::PurchaseOrderId;
use flockerp_stock::{FeedType, StockKind};

/// Stock item identifier, derived from the owning order and line position.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StockItemId(pub AggregateId);

impl StockItemId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }

    pub fn for_line(order_id: PurchaseOrderId, line_index: u32) -> Self {
        Self(AggregateId::derived(
            "receiving.stock_item",
            &format!("{order_id}/{line_index}"),
        ))
    }
}

impl core::fmt::Display for StockItemId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockStatus {
    Pending,
    PartiallyReceived,
    FullyReceived,
    Approved,
}

impl StockStatus {
    /// Status as a pure function of the quantities and the approval flag.
    pub fn derive(received: i64, expected: i64, approved: bool) -> Self {
        if approved {
            StockStatus::Approved
        } else if received == 0 {
            StockStatus::Pending
        } else if received >= expected {
            StockStatus::FullyReceived
        } else {
            StockStatus::PartiallyReceived
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StockStatus::Pending => "PENDING",
            StockStatus::PartiallyReceived => "PARTIALLY_RECEIVED",
            StockStatus::FullyReceived => "FULLY_RECEIVED",
            StockStatus::Approved => "APPROVED",
        }
    }
}

impl core::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate root: StockItem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockItem {
    id: StockItemId,
    order_id: Option<PurchaseOrderId>,
    invoice_id: Option<AggregateId>,
    line_index: u32,
    description: String,
    kind: StockKind,
    feed_type: Option<FeedType>,
    expected_quantity: i64,
    received_quantity: i64,
    unit_price: u64,
    received_by: Option<UserId>,
    received_at: Option<DateTime<Utc>>,
    notes: Option<String>,
    approved_by: Option<UserId>,
    approved_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl StockItem {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: StockItemId) -> Self {
        Self {
            id,
            order_id: None,
            invoice_id: None,
            line_index: 0,
            description: String::new(),
            kind: StockKind::Feed,
            feed_type: None,
            expected_quantity: 0,
            received_quantity: 0,
            unit_price: 0,
            received_by: None,
            received_at: None,
            notes: None,
            approved_by: None,
            approved_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> StockItemId {
        self.id
    }

    pub fn exists(&self) -> bool {
        self.created
    }

    pub fn order_id(&self) -> Option<PurchaseOrderId> {
        self.order_id
    }

    pub fn invoice_id(&self) -> Option<AggregateId> {
        self.invoice_id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn kind(&self) -> StockKind {
        self.kind
    }

    pub fn feed_type(&self) -> Option<FeedType> {
        self.feed_type
    }

    pub fn expected_quantity(&self) -> i64 {
        self.expected_quantity
    }

    pub fn received_quantity(&self) -> i64 {
        self.received_quantity
    }

    pub fn unit_price(&self) -> u64 {
        self.unit_price
    }

    pub fn received_by(&self) -> Option<UserId> {
        self.received_by
    }

    pub fn received_at(&self) -> Option<DateTime<Utc>> {
        self.received_at
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn approved_by(&self) -> Option<UserId> {
        self.approved_by
    }

    pub fn approved_at(&self) -> Option<DateTime<Utc>> {
        self.approved_at
    }

    pub fn is_approved(&self) -> bool {
        self.approved_by.is_some()
    }

    pub fn status(&self) -> StockStatus {
        StockStatus::derive(
            self.received_quantity,
            self.expected_quantity,
            self.is_approved(),
        )
    }
}

impl AggregateRoot for StockItem {
    type Id = StockItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateStockItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateStockItem {
    pub stock_item_id: StockItemId,
    pub order_id: PurchaseOrderId,
    pub invoice_id: AggregateId,
    pub line_index: u32,
    pub description: String,
    pub kind: StockKind,
    pub feed_type: Option<FeedType>,
    pub expected_quantity: i64,
    pub unit_price: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReceiveStockItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveStockItem {
    pub stock_item_id: StockItemId,
    pub quantity: i64,
    pub receiver: Actor,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ApproveStockItem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveStockItem {
    pub stock_item_id: StockItemId,
    pub approver: Actor,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockItemCommand {
    CreateStockItem(CreateStockItem),
    ReceiveStockItem(ReceiveStockItem),
    ApproveStockItem(ApproveStockItem),
}

/// Event: StockItemCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockItemCreated {
    pub stock_item_id: StockItemId,
    pub order_id: PurchaseOrderId,
    pub invoice_id: AggregateId,
    pub line_index: u32,
    pub description: String,
    pub kind: StockKind,
    pub feed_type: Option<FeedType>,
    pub expected_quantity: i64,
    pub unit_price: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockReceived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReceived {
    pub stock_item_id: StockItemId,
    pub quantity: i64,
    pub received_after: i64,
    pub status_after: StockStatus,
    pub received_by: UserId,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockApproved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockApproved {
    pub stock_item_id: StockItemId,
    pub approved_quantity: i64,
    pub approved_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockItemEvent {
    StockItemCreated(StockItemCreated),
    StockReceived(StockReceived),
    StockApproved(StockApproved),
}

impl Event for StockItemEvent {
    fn event_type(&self) -> &'static str {
        match self {
            StockItemEvent::StockItemCreated(_) => "receiving.stock_item.created",
            StockItemEvent::StockReceived(_) => "receiving.stock_item.received",
            StockItemEvent::StockApproved(_) => "receiving.stock_item.approved",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            StockItemEvent::StockItemCreated(e) => e.occurred_at,
            StockItemEvent::StockReceived(e) => e.occurred_at,
            StockItemEvent::StockApproved(e) => e.occurred_at,
        }
    }
}

impl Aggregate for StockItem {
    type Command = StockItemCommand;
    type Event = StockItemEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            StockItemEvent::StockItemCreated(e) => {
                self.id = e.stock_item_id;
                self.order_id = Some(e.order_id);
                self.invoice_id = Some(e.invoice_id);
                self.line_index = e.line_index;
                self.description = e.description.clone();
                self.kind = e.kind;
                self.feed_type = e.feed_type;
                self.expected_quantity = e.expected_quantity;
                self.unit_price = e.unit_price;
                self.created = true;
            }
            StockItemEvent::StockReceived(e) => {
                self.received_quantity = e.received_after;
                self.received_by = Some(e.received_by);
                self.received_at = Some(e.occurred_at);
                if let Some(note) = e.notes.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
                    self.notes = Some(match self.notes.take() {
                        Some(existing) => format!("{existing}; {note}"),
                        None => note.to_string(),
                    });
                }
            }
            StockItemEvent::StockApproved(e) => {
                self.approved_by = Some(e.approved_by);
                self.approved_at = Some(e.occurred_at);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            StockItemCommand::CreateStockItem(cmd) => self.handle_create(cmd),
            StockItemCommand::ReceiveStockItem(cmd) => self.handle_receive(cmd),
            StockItemCommand::ApproveStockItem(cmd) => self.handle_approve(cmd),
        }
    }
}

impl StockItem {
    fn ensure_stock_item_id(&self, id: StockItemId) -> Result<(), DomainError> {
        if self.id != id {
            return Err(DomainError::invariant("stock_item_id mismatch"));
        }
        Ok(())
    }

    fn ensure_open(&self, attempted: &str, actor: &Actor) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found("stock item", self.id));
        }
        // Idempotency guard: nothing happens to an approved item.
        if self.is_approved() {
            return Err(DomainError::invalid_transition(
                "stock item",
                StockStatus::Approved,
                attempted,
                actor.role,
            ));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateStockItem) -> Result<Vec<StockItemEvent>, DomainError> {
        self.ensure_stock_item_id(cmd.stock_item_id)?;
        if self.created {
            return Err(DomainError::duplicate(format!(
                "stock item {} already exists",
                cmd.stock_item_id
            )));
        }
        if cmd.expected_quantity <= 0 {
            return Err(DomainError::validation("expected quantity must be positive"));
        }
        if cmd.kind == StockKind::Feed && cmd.feed_type.is_none() {
            return Err(DomainError::classification(format!(
                "feed type of '{}'",
                cmd.description
            )));
        }

        Ok(vec![StockItemEvent::StockItemCreated(StockItemCreated {
            stock_item_id: cmd.stock_item_id,
            order_id: cmd.order_id,
            invoice_id: cmd.invoice_id,
            line_index: cmd.line_index,
            description: cmd.description.clone(),
            kind: cmd.kind,
            feed_type: cmd.feed_type,
            expected_quantity: cmd.expected_quantity,
            unit_price: cmd.unit_price,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_receive(&self, cmd: &ReceiveStockItem) -> Result<Vec<StockItemEvent>, DomainError> {
        self.ensure_stock_item_id(cmd.stock_item_id)?;
        self.ensure_open("RECEIVED", &cmd.receiver)?;
        if cmd.quantity <= 0 {
            return Err(DomainError::validation("received quantity must be positive"));
        }

        let would_be = self
            .received_quantity
            .checked_add(cmd.quantity)
            .ok_or_else(|| DomainError::validation("received quantity overflows"))?;
        if would_be > self.expected_quantity {
            return Err(DomainError::OverReceipt {
                would_be,
                expected: self.expected_quantity,
            });
        }

        Ok(vec![StockItemEvent::StockReceived(StockReceived {
            stock_item_id: cmd.stock_item_id,
            quantity: cmd.quantity,
            received_after: would_be,
            status_after: StockStatus::derive(would_be, self.expected_quantity, false),
            received_by: cmd.receiver.id,
            notes: cmd.notes.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_approve(&self, cmd: &ApproveStockItem) -> Result<Vec<StockItemEvent>, DomainError> {
        self.ensure_stock_item_id(cmd.stock_item_id)?;
        self.ensure_open("APPROVED", &cmd.approver)?;

        // Invariant: approval only after at least one receipt.
        if self.received_quantity == 0 {
            return Err(DomainError::NotReceived(self.id.to_string()));
        }
        if self.kind == StockKind::Feed && self.feed_type.is_none() {
            return Err(DomainError::classification(format!(
                "feed type of '{}'",
                self.description
            )));
        }

        Ok(vec![StockItemEvent::StockApproved(StockApproved {
            stock_item_id: cmd.stock_item_id,
            approved_quantity: self.received_quantity,
            approved_by: cmd.approver.id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flockerp_auth::Role;
    use flockerp_events::execute;
    use proptest::prelude::*;

    fn test_order_id() -> PurchaseOrderId {
        PurchaseOrderId::for_number("PO-7")
    }

    fn test_item_id() -> StockItemId {
        StockItemId::for_line(test_order_id(), 0)
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn created_item(expected: i64) -> StockItem {
        let mut item = StockItem::empty(test_item_id());
        execute(
            &mut item,
            &StockItemCommand::CreateStockItem(CreateStockItem {
                stock_item_id: test_item_id(),
                order_id: test_order_id(),
                invoice_id: AggregateId::new(),
                line_index: 0,
                description: "Sasso chicks".to_string(),
                kind: StockKind::SassoChicks,
                feed_type: None,
                expected_quantity: expected,
                unit_price: 2_000,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        item
    }

    fn receive(quantity: i64, notes: Option<&str>) -> StockItemCommand {
        StockItemCommand::ReceiveStockItem(ReceiveStockItem {
            stock_item_id: test_item_id(),
            quantity,
            receiver: Actor::new(UserId::new(), Role::OrderManager),
            notes: notes.map(str::to_string),
            occurred_at: test_time(),
        })
    }

    fn approve() -> StockItemCommand {
        StockItemCommand::ApproveStockItem(ApproveStockItem {
            stock_item_id: test_item_id(),
            approver: Actor::new(UserId::new(), Role::Accountant),
            occurred_at: test_time(),
        })
    }

    #[test]
    fn partial_over_and_full_receipt() {
        let mut item = created_item(100);
        assert_eq!(item.status(), StockStatus::Pending);

        execute(&mut item, &receive(60, None)).unwrap();
        assert_eq!(item.status(), StockStatus::PartiallyReceived);
        assert_eq!(item.received_quantity(), 60);

        let err = execute(&mut item, &receive(50, None)).unwrap_err();
        assert_eq!(
            err,
            DomainError::OverReceipt {
                would_be: 110,
                expected: 100
            }
        );
        assert_eq!(item.received_quantity(), 60);

        execute(&mut item, &receive(40, None)).unwrap();
        assert_eq!(item.status(), StockStatus::FullyReceived);
        assert_eq!(item.received_quantity(), 100);
    }

    #[test]
    fn notes_are_appended() {
        let mut item = created_item(10);
        execute(&mut item, &receive(4, Some("first truck"))).unwrap();
        execute(&mut item, &receive(3, None)).unwrap();
        execute(&mut item, &receive(3, Some("2 weak birds"))).unwrap();
        assert_eq!(item.notes(), Some("first truck; 2 weak birds"));
    }

    #[test]
    fn approval_requires_a_receipt() {
        let item = created_item(10);
        assert!(matches!(
            item.handle(&approve()),
            Err(DomainError::NotReceived(_))
        ));
    }

    #[test]
    fn partially_received_items_can_be_approved_once() {
        let mut item = created_item(10);
        execute(&mut item, &receive(4, None)).unwrap();
        let events = execute(&mut item, &approve()).unwrap();
        match &events[0] {
            StockItemEvent::StockApproved(e) => assert_eq!(e.approved_quantity, 4),
            _ => panic!("Expected StockApproved event"),
        }
        assert_eq!(item.status(), StockStatus::Approved);

        let before = item.clone();
        assert!(matches!(
            execute(&mut item, &approve()),
            Err(DomainError::InvalidTransition { .. })
        ));
        assert!(matches!(
            execute(&mut item, &receive(1, None)),
            Err(DomainError::InvalidTransition { .. })
        ));
        assert_eq!(item, before);
    }

    #[test]
    fn feed_item_without_feed_type_cannot_be_created() {
        let item = StockItem::empty(test_item_id());
        let err = item
            .handle(&StockItemCommand::CreateStockItem(CreateStockItem {
                stock_item_id: test_item_id(),
                order_id: test_order_id(),
                invoice_id: AggregateId::new(),
                line_index: 0,
                description: "Chicken feed".to_string(),
                kind: StockKind::Feed,
                feed_type: None,
                expected_quantity: 5,
                unit_price: 1,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Classification(_)));
    }

    #[test]
    fn receive_on_missing_item_is_not_found() {
        let item = StockItem::empty(test_item_id());
        assert!(matches!(
            item.handle(&receive(1, None)),
            Err(DomainError::NotFound { .. })
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: 0 <= received <= expected, and status is always the
        /// derived function of the quantities.
        #[test]
        fn received_stays_within_expected(
            expected in 1i64..500,
            receipts in prop::collection::vec(-5i64..200, 0..30)
        ) {
            let mut item = created_item(expected);
            for q in receipts {
                let before = item.received_quantity();
                match execute(&mut item, &receive(q, None)) {
                    Ok(_) => prop_assert_eq!(item.received_quantity(), before + q),
                    Err(_) => prop_assert_eq!(item.received_quantity(), before),
                }
                prop_assert!(item.received_quantity() >= 0);
                prop_assert!(item.received_quantity() <= expected);
                prop_assert_eq!(
                    item.status(),
                    StockStatus::derive(item.received_quantity(), expected, false)
                );
            }
        }
    }
}
