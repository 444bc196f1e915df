//! Feed taxonomy and feed stock records.
//!
//! Feed is not counted in a ledger. Each approved feed receipt becomes one
//! `FeedStockRecord` carrying its sub-type and supplying company.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use flockerp_core::{Aggregate, AggregateId, AggregateRoot, DomainError};
use flockerp_events::Event;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedType {
    BroilerStarter,
    BroilerStarterMp,
    BroilerStarterMv,
    BroilerGrower,
    BroilerGrowerMp,
    BroilerGrowerMv,
    BroilerFinisher,
    LayerStarter,
    BackboneLayerStarter,
    LayerGrower,
    BackboneLayerGrower,
    CompleteLayerMash,
    BackboneCompleteLayerMash,
    LocalFeed,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedCompany {
    Silverland,
    Arvines,
    Backbone,
    Local,
}

impl FeedType {
    /// Best-effort sub-type from a free-text description.
    pub fn classify(description: &str) -> Option<FeedType> {
        let d = description.to_lowercase();
        let has = |word: &str| d.contains(word);
        // "mp"/"mv" are brand suffixes; match them as whole tokens only.
        let token = |word: &str| d.split(|c: char| !c.is_ascii_alphanumeric()).any(|t| t == word);

        if has("broiler") && has("starter") {
            return Some(if token("mp") {
                FeedType::BroilerStarterMp
            } else if token("mv") {
                FeedType::BroilerStarterMv
            } else {
                FeedType::BroilerStarter
            });
        }
        if has("broiler") && has("grower") {
            return Some(if token("mp") {
                FeedType::BroilerGrowerMp
            } else if token("mv") {
                FeedType::BroilerGrowerMv
            } else {
                FeedType::BroilerGrower
            });
        }
        if has("broiler") && has("finisher") {
            return Some(FeedType::BroilerFinisher);
        }
        if has("layer") && has("starter") {
            return Some(if has("backbone") {
                FeedType::BackboneLayerStarter
            } else {
                FeedType::LayerStarter
            });
        }
        if has("layer") && has("grower") {
            return Some(if has("backbone") {
                FeedType::BackboneLayerGrower
            } else {
                FeedType::LayerGrower
            });
        }
        if has("layer") && has("mash") {
            return Some(if has("backbone") {
                FeedType::BackboneCompleteLayerMash
            } else {
                FeedType::CompleteLayerMash
            });
        }
        if has("local") && has("feed") {
            return Some(FeedType::LocalFeed);
        }
        None
    }

    pub fn company(self) -> FeedCompany {
        match self {
            FeedType::BackboneLayerStarter
            | FeedType::BackboneLayerGrower
            | FeedType::BackboneCompleteLayerMash => FeedCompany::Backbone,
            FeedType::LocalFeed => FeedCompany::Local,
            FeedType::BroilerStarterMp
            | FeedType::BroilerStarterMv
            | FeedType::BroilerGrowerMp
            | FeedType::BroilerGrowerMv => FeedCompany::Arvines,
            FeedType::BroilerStarter
            | FeedType::BroilerGrower
            | FeedType::BroilerFinisher
            | FeedType::LayerStarter
            | FeedType::LayerGrower
            | FeedType::CompleteLayerMash => FeedCompany::Silverland,
        }
    }
}

/// Feed stock record identifier, one per approved stock item.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedStockRecordId(pub AggregateId);

impl FeedStockRecordId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }

    /// The record that an approved stock item produces.
    pub fn for_stock_item(stock_item: AggregateId) -> Self {
        Self(AggregateId::derived("stock.feed_record", &stock_item.to_string()))
    }
}

impl core::fmt::Display for FeedStockRecordId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Aggregate root: FeedStockRecord.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedStockRecord {
    id: FeedStockRecordId,
    feed_type: Option<FeedType>,
    company: Option<FeedCompany>,
    quantity: i64,
    price_per_unit: u64,
    total_price: u64,
    source_stock_item: Option<AggregateId>,
    version: u64,
    created: bool,
}

impl FeedStockRecord {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: FeedStockRecordId) -> Self {
        Self {
            id,
            feed_type: None,
            company: None,
            quantity: 0,
            price_per_unit: 0,
            total_price: 0,
            source_stock_item: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> FeedStockRecordId {
        self.id
    }

    pub fn exists(&self) -> bool {
        self.created
    }

    pub fn feed_type(&self) -> Option<FeedType> {
        self.feed_type
    }

    pub fn company(&self) -> Option<FeedCompany> {
        self.company
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn price_per_unit(&self) -> u64 {
        self.price_per_unit
    }

    pub fn total_price(&self) -> u64 {
        self.total_price
    }

    pub fn source_stock_item(&self) -> Option<AggregateId> {
        self.source_stock_item
    }
}

impl AggregateRoot for FeedStockRecord {
    type Id = FeedStockRecordId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RecordFeedReceipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFeedReceipt {
    pub record_id: FeedStockRecordId,
    pub feed_type: FeedType,
    pub quantity: i64,
    pub price_per_unit: u64,
    pub source_stock_item: AggregateId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedStockCommand {
    RecordFeedReceipt(RecordFeedReceipt),
}

/// Event: FeedReceiptRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedReceiptRecorded {
    pub record_id: FeedStockRecordId,
    pub feed_type: FeedType,
    pub company: FeedCompany,
    pub quantity: i64,
    pub price_per_unit: u64,
    pub total_price: u64,
    pub source_stock_item: AggregateId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedStockEvent {
    FeedReceiptRecorded(FeedReceiptRecorded),
}

impl Event for FeedStockEvent {
    fn event_type(&self) -> &'static str {
        match self {
            FeedStockEvent::FeedReceiptRecorded(_) => "stock.feed.receipt_recorded",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            FeedStockEvent::FeedReceiptRecorded(e) => e.occurred_at,
        }
    }
}

impl Aggregate for FeedStockRecord {
    type Command = FeedStockCommand;
    type Event = FeedStockEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            FeedStockEvent::FeedReceiptRecorded(e) => {
                self.id = e.record_id;
                self.feed_type = Some(e.feed_type);
                self.company = Some(e.company);
                self.quantity = e.quantity;
                self.price_per_unit = e.price_per_unit;
                self.total_price = e.total_price;
                self.source_stock_item = Some(e.source_stock_item);
                self.created = true;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            FeedStockCommand::RecordFeedReceipt(cmd) => self.handle_record(cmd),
        }
    }
}

impl FeedStockRecord {
    fn handle_record(&self, cmd: &RecordFeedReceipt) -> Result<Vec<FeedStockEvent>, DomainError> {
        if self.created {
            return Err(DomainError::duplicate(format!(
                "feed receipt already recorded for stock item {}",
                cmd.source_stock_item
            )));
        }
        if cmd.quantity <= 0 {
            return Err(DomainError::validation("feed quantity must be positive"));
        }
        let total_price = (cmd.quantity as u64)
            .checked_mul(cmd.price_per_unit)
            .ok_or_else(|| DomainError::validation("feed total price overflows"))?;

        Ok(vec![FeedStockEvent::FeedReceiptRecorded(FeedReceiptRecorded {
            record_id: cmd.record_id,
            feed_type: cmd.feed_type,
            company: cmd.feed_type.company(),
            quantity: cmd.quantity,
            price_per_unit: cmd.price_per_unit,
            total_price,
            source_stock_item: cmd.source_stock_item,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flockerp_events::execute;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn classifies_broiler_feeds_with_brand_suffix() {
        assert_eq!(
            FeedType::classify("Broiler Starter MP 50kg"),
            Some(FeedType::BroilerStarterMp)
        );
        assert_eq!(
            FeedType::classify("broiler grower (mv)"),
            Some(FeedType::BroilerGrowerMv)
        );
        assert_eq!(
            FeedType::classify("Broiler starter crumbs"),
            Some(FeedType::BroilerStarter)
        );
        assert_eq!(
            FeedType::classify("broiler finisher pellets"),
            Some(FeedType::BroilerFinisher)
        );
    }

    #[test]
    fn brand_suffix_must_be_a_whole_word() {
        // "compound" contains "mp" but is not the MP brand.
        assert_eq!(
            FeedType::classify("Broiler starter compound"),
            Some(FeedType::BroilerStarter)
        );
    }

    #[test]
    fn classifies_layer_feeds_and_backbone_variants() {
        assert_eq!(
            FeedType::classify("Layer starter"),
            Some(FeedType::LayerStarter)
        );
        assert_eq!(
            FeedType::classify("Backbone layer grower"),
            Some(FeedType::BackboneLayerGrower)
        );
        assert_eq!(
            FeedType::classify("Complete layer mash backbone"),
            Some(FeedType::BackboneCompleteLayerMash)
        );
        assert_eq!(
            FeedType::classify("Local feed mix"),
            Some(FeedType::LocalFeed)
        );
        assert_eq!(FeedType::classify("Chicken feed"), None);
    }

    #[test]
    fn company_follows_feed_type() {
        assert_eq!(FeedType::BackboneLayerStarter.company(), FeedCompany::Backbone);
        assert_eq!(FeedType::LocalFeed.company(), FeedCompany::Local);
        assert_eq!(FeedType::BroilerGrowerMp.company(), FeedCompany::Arvines);
        assert_eq!(FeedType::BroilerFinisher.company(), FeedCompany::Silverland);
    }

    #[test]
    fn record_is_created_once_per_stock_item() {
        let stock_item = AggregateId::new();
        let record_id = FeedStockRecordId::for_stock_item(stock_item);
        let mut record = FeedStockRecord::empty(record_id);
        let cmd = FeedStockCommand::RecordFeedReceipt(RecordFeedReceipt {
            record_id,
            feed_type: FeedType::BroilerStarterMv,
            quantity: 20,
            price_per_unit: 65_000,
            source_stock_item: stock_item,
            occurred_at: test_time(),
        });

        execute(&mut record, &cmd).unwrap();
        assert_eq!(record.company(), Some(FeedCompany::Arvines));
        assert_eq!(record.total_price(), 1_300_000);

        let err = record.handle(&cmd).unwrap_err();
        assert!(matches!(err, DomainError::Duplicate(_)));
    }
}
