//! Stock ledger: per-kind on-hand quantity, pricing and derived box valuation.
//!
//! One event-sourced `StockLedgerEntry` per [`ItemKind`]. Its stream id is
//! derived from the kind, so concurrent writers of the same kind contend on the
//! same stream version and the store's compare-and-swap serializes them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use flockerp_core::{Aggregate, AggregateId, AggregateRoot, DomainError};
use flockerp_events::Event;

use crate::kind::ItemKind;

/// Ledger entry identifier (one per item kind).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LedgerEntryId(pub AggregateId);

impl LedgerEntryId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }

    pub fn for_kind(kind: ItemKind) -> Self {
        Self(AggregateId::derived("stock.ledger", kind.as_str()))
    }
}

impl core::fmt::Display for LedgerEntryId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Sticky pricing fields; only the `Some` ones are applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceHints {
    pub units_per_container: Option<i64>,
    /// Price of one full container (box), minor currency units.
    pub container_price: Option<u64>,
    pub selling_unit_price: Option<u64>,
    pub buying_unit_price: Option<u64>,
}

impl PriceHints {
    pub fn is_empty(&self) -> bool {
        self.units_per_container.is_none()
            && self.container_price.is_none()
            && self.selling_unit_price.is_none()
            && self.buying_unit_price.is_none()
    }

    fn validate(&self) -> Result<(), DomainError> {
        if let Some(units) = self.units_per_container {
            if units <= 0 {
                return Err(DomainError::validation("units per container must be positive"));
            }
        }
        Ok(())
    }
}

/// Baselines for an entry opened lazily by its first credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerDefaults {
    pub minimum_threshold: i64,
    pub units_per_container: i64,
}

impl Default for LedgerDefaults {
    fn default() -> Self {
        Self {
            minimum_threshold: 100,
            units_per_container: 100,
        }
    }
}

/// Aggregate root: StockLedgerEntry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockLedgerEntry {
    id: LedgerEntryId,
    item_kind: Option<ItemKind>,
    on_hand: i64,
    total_received: i64,
    total_sold: i64,
    minimum_threshold: i64,
    units_per_container: i64,
    container_price: u64,
    selling_unit_price: Option<u64>,
    buying_unit_price: Option<u64>,
    version: u64,
    created: bool,
}

impl StockLedgerEntry {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: LedgerEntryId) -> Self {
        Self {
            id,
            item_kind: None,
            on_hand: 0,
            total_received: 0,
            total_sold: 0,
            minimum_threshold: 0,
            units_per_container: 1,
            container_price: 0,
            selling_unit_price: None,
            buying_unit_price: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> LedgerEntryId {
        self.id
    }

    pub fn exists(&self) -> bool {
        self.created
    }

    pub fn item_kind(&self) -> Option<ItemKind> {
        self.item_kind
    }

    pub fn on_hand(&self) -> i64 {
        self.on_hand
    }

    pub fn total_received(&self) -> i64 {
        self.total_received
    }

    pub fn total_sold(&self) -> i64 {
        self.total_sold
    }

    pub fn minimum_threshold(&self) -> i64 {
        self.minimum_threshold
    }

    pub fn units_per_container(&self) -> i64 {
        self.units_per_container
    }

    pub fn container_price(&self) -> u64 {
        self.container_price
    }

    pub fn selling_unit_price(&self) -> Option<u64> {
        self.selling_unit_price
    }

    pub fn buying_unit_price(&self) -> Option<u64> {
        self.buying_unit_price
    }

    /// `ceil(on_hand / units_per_container)`.
    pub fn container_count(&self) -> i64 {
        let per = self.units_per_container.max(1);
        // on_hand is never negative, so the unsigned ceiling is exact.
        (self.on_hand as u64).div_ceil(per as u64) as i64
    }

    pub fn total_container_value(&self) -> u64 {
        (self.container_count() as u64).saturating_mul(self.container_price)
    }

    pub fn is_below_threshold(&self) -> bool {
        self.created && self.on_hand <= self.minimum_threshold
    }
}

impl AggregateRoot for StockLedgerEntry {
    type Id = LedgerEntryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreditStock (receipt). Opens the entry if it does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditStock {
    pub item_kind: ItemKind,
    pub quantity: i64,
    pub price_hints: PriceHints,
    pub defaults: LedgerDefaults,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DebitStock (sale or consumption).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebitStock {
    pub item_kind: ItemKind,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReturnStock (previously sold units come back).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnStock {
    pub item_kind: ItemKind,
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetMinimumThreshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetMinimumThreshold {
    pub item_kind: ItemKind,
    pub value: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetPricing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetPricing {
    pub item_kind: ItemKind,
    pub price_hints: PriceHints,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockLedgerCommand {
    CreditStock(CreditStock),
    DebitStock(DebitStock),
    ReturnStock(ReturnStock),
    SetMinimumThreshold(SetMinimumThreshold),
    SetPricing(SetPricing),
}

/// Event: LedgerEntryOpened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntryOpened {
    pub entry_id: LedgerEntryId,
    pub item_kind: ItemKind,
    pub minimum_threshold: i64,
    pub units_per_container: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockCredited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockCredited {
    pub entry_id: LedgerEntryId,
    pub item_kind: ItemKind,
    pub quantity: i64,
    pub on_hand_after: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockDebited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockDebited {
    pub entry_id: LedgerEntryId,
    pub item_kind: ItemKind,
    pub quantity: i64,
    pub on_hand_after: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockReturned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReturned {
    pub entry_id: LedgerEntryId,
    pub item_kind: ItemKind,
    pub quantity: i64,
    pub on_hand_after: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: MinimumThresholdSet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinimumThresholdSet {
    pub entry_id: LedgerEntryId,
    pub item_kind: ItemKind,
    pub value: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PricingUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingUpdated {
    pub entry_id: LedgerEntryId,
    pub item_kind: ItemKind,
    pub price_hints: PriceHints,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockLedgerEvent {
    LedgerEntryOpened(LedgerEntryOpened),
    StockCredited(StockCredited),
    StockDebited(StockDebited),
    StockReturned(StockReturned),
    MinimumThresholdSet(MinimumThresholdSet),
    PricingUpdated(PricingUpdated),
}

impl Event for StockLedgerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            StockLedgerEvent::LedgerEntryOpened(_) => "stock.ledger.opened",
            StockLedgerEvent::StockCredited(_) => "stock.ledger.credited",
            StockLedgerEvent::StockDebited(_) => "stock.ledger.debited",
            StockLedgerEvent::StockReturned(_) => "stock.ledger.returned",
            StockLedgerEvent::MinimumThresholdSet(_) => "stock.ledger.threshold_set",
            StockLedgerEvent::PricingUpdated(_) => "stock.ledger.pricing_updated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            StockLedgerEvent::LedgerEntryOpened(e) => e.occurred_at,
            StockLedgerEvent::StockCredited(e) => e.occurred_at,
            StockLedgerEvent::StockDebited(e) => e.occurred_at,
            StockLedgerEvent::StockReturned(e) => e.occurred_at,
            StockLedgerEvent::MinimumThresholdSet(e) => e.occurred_at,
            StockLedgerEvent::PricingUpdated(e) => e.occurred_at,
        }
    }
}

impl Aggregate for StockLedgerEntry {
    type Command = StockLedgerCommand;
    type Event = StockLedgerEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            StockLedgerEvent::LedgerEntryOpened(e) => {
                self.id = e.entry_id;
                self.item_kind = Some(e.item_kind);
                self.minimum_threshold = e.minimum_threshold;
                self.units_per_container = e.units_per_container;
                self.created = true;
            }
            StockLedgerEvent::StockCredited(e) => {
                self.on_hand = e.on_hand_after;
                self.total_received += e.quantity;
            }
            StockLedgerEvent::StockDebited(e) => {
                self.on_hand = e.on_hand_after;
                self.total_sold += e.quantity;
            }
            StockLedgerEvent::StockReturned(e) => {
                self.on_hand = e.on_hand_after;
                self.total_sold -= e.quantity;
            }
            StockLedgerEvent::MinimumThresholdSet(e) => {
                self.minimum_threshold = e.value;
            }
            StockLedgerEvent::PricingUpdated(e) => {
                let hints = &e.price_hints;
                if let Some(v) = hints.units_per_container {
                    self.units_per_container = v;
                }
                if let Some(v) = hints.container_price {
                    self.container_price = v;
                }
                if hints.selling_unit_price.is_some() {
                    self.selling_unit_price = hints.selling_unit_price;
                }
                if hints.buying_unit_price.is_some() {
                    self.buying_unit_price = hints.buying_unit_price;
                }
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            StockLedgerCommand::CreditStock(cmd) => self.handle_credit(cmd),
            StockLedgerCommand::DebitStock(cmd) => self.handle_debit(cmd),
            StockLedgerCommand::ReturnStock(cmd) => self.handle_return(cmd),
            StockLedgerCommand::SetMinimumThreshold(cmd) => self.handle_set_threshold(cmd),
            StockLedgerCommand::SetPricing(cmd) => self.handle_set_pricing(cmd),
        }
    }
}

impl StockLedgerEntry {
    fn ensure_kind(&self, kind: ItemKind) -> Result<(), DomainError> {
        if self.id != LedgerEntryId::for_kind(kind) {
            return Err(DomainError::invariant("item kind does not match ledger entry"));
        }
        Ok(())
    }

    fn ensure_exists(&self, kind: ItemKind) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found("stock ledger entry", kind));
        }
        Ok(())
    }

    fn handle_credit(&self, cmd: &CreditStock) -> Result<Vec<StockLedgerEvent>, DomainError> {
        self.ensure_kind(cmd.item_kind)?;
        if cmd.quantity < 0 {
            return Err(DomainError::validation("credit quantity must not be negative"));
        }
        cmd.price_hints.validate()?;

        let mut events = Vec::with_capacity(3);
        if !self.created {
            if cmd.defaults.units_per_container <= 0 || cmd.defaults.minimum_threshold < 0 {
                return Err(DomainError::validation("invalid ledger defaults"));
            }
            events.push(StockLedgerEvent::LedgerEntryOpened(LedgerEntryOpened {
                entry_id: self.id,
                item_kind: cmd.item_kind,
                minimum_threshold: cmd.defaults.minimum_threshold,
                units_per_container: cmd.defaults.units_per_container,
                occurred_at: cmd.occurred_at,
            }));
        }

        let on_hand_after = self
            .on_hand
            .checked_add(cmd.quantity)
            .ok_or_else(|| DomainError::validation("credit overflows on-hand quantity"))?;
        events.push(StockLedgerEvent::StockCredited(StockCredited {
            entry_id: self.id,
            item_kind: cmd.item_kind,
            quantity: cmd.quantity,
            on_hand_after,
            occurred_at: cmd.occurred_at,
        }));

        if !cmd.price_hints.is_empty() {
            events.push(StockLedgerEvent::PricingUpdated(PricingUpdated {
                entry_id: self.id,
                item_kind: cmd.item_kind,
                price_hints: cmd.price_hints,
                occurred_at: cmd.occurred_at,
            }));
        }

        Ok(events)
    }

    fn handle_debit(&self, cmd: &DebitStock) -> Result<Vec<StockLedgerEvent>, DomainError> {
        self.ensure_kind(cmd.item_kind)?;
        self.ensure_exists(cmd.item_kind)?;
        if cmd.quantity <= 0 {
            return Err(DomainError::validation("debit quantity must be positive"));
        }

        // Invariant: on-hand never goes negative.
        if cmd.quantity > self.on_hand {
            return Err(DomainError::InsufficientStock {
                item_kind: cmd.item_kind.to_string(),
                available: self.on_hand,
                requested: cmd.quantity,
            });
        }

        Ok(vec![StockLedgerEvent::StockDebited(StockDebited {
            entry_id: self.id,
            item_kind: cmd.item_kind,
            quantity: cmd.quantity,
            on_hand_after: self.on_hand - cmd.quantity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_return(&self, cmd: &ReturnStock) -> Result<Vec<StockLedgerEvent>, DomainError> {
        self.ensure_kind(cmd.item_kind)?;
        self.ensure_exists(cmd.item_kind)?;
        if cmd.quantity <= 0 {
            return Err(DomainError::validation("return quantity must be positive"));
        }
        if cmd.quantity > self.total_sold {
            return Err(DomainError::validation(format!(
                "cannot return {} units of {}: only {} sold",
                cmd.quantity, cmd.item_kind, self.total_sold
            )));
        }

        Ok(vec![StockLedgerEvent::StockReturned(StockReturned {
            entry_id: self.id,
            item_kind: cmd.item_kind,
            quantity: cmd.quantity,
            on_hand_after: self.on_hand + cmd.quantity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_threshold(
        &self,
        cmd: &SetMinimumThreshold,
    ) -> Result<Vec<StockLedgerEvent>, DomainError> {
        self.ensure_kind(cmd.item_kind)?;
        self.ensure_exists(cmd.item_kind)?;
        if cmd.value < 0 {
            return Err(DomainError::validation("minimum threshold must not be negative"));
        }

        Ok(vec![StockLedgerEvent::MinimumThresholdSet(MinimumThresholdSet {
            entry_id: self.id,
            item_kind: cmd.item_kind,
            value: cmd.value,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_pricing(&self, cmd: &SetPricing) -> Result<Vec<StockLedgerEvent>, DomainError> {
        self.ensure_kind(cmd.item_kind)?;
        self.ensure_exists(cmd.item_kind)?;
        if cmd.price_hints.is_empty() {
            return Err(DomainError::validation("no pricing fields supplied"));
        }
        cmd.price_hints.validate()?;

        Ok(vec![StockLedgerEvent::PricingUpdated(PricingUpdated {
            entry_id: self.id,
            item_kind: cmd.item_kind,
            price_hints: cmd.price_hints,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flockerp_events::execute;
    use proptest::prelude::*;

    const KIND: ItemKind = ItemKind::SassoChicks;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn test_entry() -> StockLedgerEntry {
        StockLedgerEntry::empty(LedgerEntryId::for_kind(KIND))
    }

    fn credit(quantity: i64, hints: PriceHints) -> StockLedgerCommand {
        StockLedgerCommand::CreditStock(CreditStock {
            item_kind: KIND,
            quantity,
            price_hints: hints,
            defaults: LedgerDefaults::default(),
            occurred_at: test_time(),
        })
    }

    fn debit(quantity: i64) -> StockLedgerCommand {
        StockLedgerCommand::DebitStock(DebitStock {
            item_kind: KIND,
            quantity,
            occurred_at: test_time(),
        })
    }

    #[test]
    fn first_credit_opens_entry_with_defaults() {
        let mut entry = test_entry();
        let events = execute(&mut entry, &credit(1000, PriceHints::default())).unwrap();

        assert_eq!(events.len(), 2);
        match &events[0] {
            StockLedgerEvent::LedgerEntryOpened(e) => {
                assert_eq!(e.item_kind, KIND);
                assert_eq!(e.minimum_threshold, 100);
                assert_eq!(e.units_per_container, 100);
            }
            _ => panic!("Expected LedgerEntryOpened event"),
        }
        assert_eq!(entry.on_hand(), 1000);
        assert_eq!(entry.total_received(), 1000);
        assert_eq!(entry.version(), 2);
    }

    #[test]
    fn debit_then_oversell_is_rejected_without_change() {
        let mut entry = test_entry();
        let hints = PriceHints {
            buying_unit_price: Some(5),
            ..PriceHints::default()
        };
        execute(&mut entry, &credit(1000, hints)).unwrap();
        execute(&mut entry, &debit(400)).unwrap();
        assert_eq!(entry.on_hand(), 600);
        assert_eq!(entry.total_sold(), 400);

        let before = entry.clone();
        let err = execute(&mut entry, &debit(700)).unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientStock {
                item_kind: "SASSO_CHICKS".to_string(),
                available: 600,
                requested: 700,
            }
        );
        assert_eq!(entry, before);
    }

    #[test]
    fn debit_on_missing_entry_is_not_found() {
        let entry = test_entry();
        let err = entry.handle(&debit(1)).unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[test]
    fn negative_and_zero_quantities_are_rejected() {
        let mut entry = test_entry();
        assert!(matches!(
            entry.handle(&credit(-5, PriceHints::default())),
            Err(DomainError::Validation(_))
        ));
        execute(&mut entry, &credit(10, PriceHints::default())).unwrap();
        assert!(matches!(entry.handle(&debit(0)), Err(DomainError::Validation(_))));
        assert!(matches!(entry.handle(&debit(-3)), Err(DomainError::Validation(_))));
    }

    #[test]
    fn container_fields_are_derived_from_on_hand() {
        let mut entry = test_entry();
        let hints = PriceHints {
            container_price: Some(250_000),
            ..PriceHints::default()
        };
        execute(&mut entry, &credit(250, hints)).unwrap();

        assert_eq!(entry.container_count(), 3);
        assert_eq!(entry.total_container_value(), 750_000);

        execute(&mut entry, &debit(50)).unwrap();
        assert_eq!(entry.container_count(), 2);
        assert_eq!(entry.total_container_value(), 500_000);
    }

    #[test]
    fn container_count_holds_at_the_top_of_the_range() {
        let mut entry = test_entry();
        execute(&mut entry, &credit(i64::MAX, PriceHints::default())).unwrap();

        assert_eq!(entry.on_hand(), i64::MAX);
        assert_eq!(entry.container_count(), i64::MAX / 100 + 1);
    }

    #[test]
    fn pricing_hints_are_sticky() {
        let mut entry = test_entry();
        let first = PriceHints {
            selling_unit_price: Some(3_000),
            buying_unit_price: Some(2_000),
            ..PriceHints::default()
        };
        execute(&mut entry, &credit(10, first)).unwrap();

        let second = PriceHints {
            buying_unit_price: Some(2_200),
            ..PriceHints::default()
        };
        execute(&mut entry, &credit(10, second)).unwrap();

        assert_eq!(entry.selling_unit_price(), Some(3_000));
        assert_eq!(entry.buying_unit_price(), Some(2_200));
    }

    #[test]
    fn set_pricing_and_threshold_leave_quantities_alone() {
        let mut entry = test_entry();
        execute(&mut entry, &credit(500, PriceHints::default())).unwrap();

        execute(
            &mut entry,
            &StockLedgerCommand::SetPricing(SetPricing {
                item_kind: KIND,
                price_hints: PriceHints {
                    units_per_container: Some(50),
                    ..PriceHints::default()
                },
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        execute(
            &mut entry,
            &StockLedgerCommand::SetMinimumThreshold(SetMinimumThreshold {
                item_kind: KIND,
                value: 600,
                occurred_at: test_time(),
            }),
        )
        .unwrap();

        assert_eq!(entry.on_hand(), 500);
        assert_eq!(entry.container_count(), 10);
        assert!(entry.is_below_threshold());
    }

    #[test]
    fn threshold_comparison_is_inclusive() {
        let mut entry = test_entry();
        execute(&mut entry, &credit(100, PriceHints::default())).unwrap();
        assert!(entry.is_below_threshold());
        execute(&mut entry, &credit(1, PriceHints::default())).unwrap();
        assert!(!entry.is_below_threshold());
    }

    #[test]
    fn returns_cannot_exceed_units_sold() {
        let mut entry = test_entry();
        execute(&mut entry, &credit(100, PriceHints::default())).unwrap();
        execute(&mut entry, &debit(30)).unwrap();

        let ret = |quantity| {
            StockLedgerCommand::ReturnStock(ReturnStock {
                item_kind: KIND,
                quantity,
                occurred_at: test_time(),
            })
        };
        assert!(matches!(entry.handle(&ret(31)), Err(DomainError::Validation(_))));

        execute(&mut entry, &ret(10)).unwrap();
        assert_eq!(entry.on_hand(), 80);
        assert_eq!(entry.total_sold(), 20);
    }

    #[test]
    fn entry_rejects_commands_for_another_kind() {
        let entry = test_entry();
        let cmd = StockLedgerCommand::CreditStock(CreditStock {
            item_kind: ItemKind::BroilerChicks,
            quantity: 1,
            price_hints: PriceHints::default(),
            defaults: LedgerDefaults::default(),
            occurred_at: test_time(),
        });
        assert!(matches!(
            entry.handle(&cmd),
            Err(DomainError::InvariantViolation(_))
        ));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Credit(i64),
        Debit(i64),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0i64..500).prop_map(Op::Credit),
            (1i64..800).prop_map(Op::Debit),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: on-hand never goes negative and always equals received - sold.
        #[test]
        fn on_hand_is_never_negative(ops in prop::collection::vec(op(), 1..40)) {
            let mut entry = test_entry();
            for op in ops {
                let before = entry.clone();
                let result = match op {
                    Op::Credit(q) => execute(&mut entry, &credit(q, PriceHints::default())),
                    Op::Debit(q) => execute(&mut entry, &debit(q)),
                };
                if result.is_err() {
                    prop_assert_eq!(&entry, &before);
                }
                prop_assert!(entry.on_hand() >= 0);
                prop_assert_eq!(entry.on_hand(), entry.total_received() - entry.total_sold());
            }
        }
    }
}
