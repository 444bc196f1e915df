use core::str::FromStr;

use serde::{Deserialize, Serialize};

use flockerp_core::DomainError;

use crate::feed::FeedType;

/// Key of a stock ledger entry: the kinds of live stock sold by count.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemKind {
    SassoChicks,
    BroilerChicks,
}

impl ItemKind {
    pub const ALL: [ItemKind; 2] = [ItemKind::SassoChicks, ItemKind::BroilerChicks];

    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::SassoChicks => "SASSO_CHICKS",
            ItemKind::BroilerChicks => "BROILER_CHICKS",
        }
    }
}

impl core::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ItemKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DomainError::validation(format!("unknown item kind '{s}'")))
    }
}

/// Kind of a receivable stock line.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockKind {
    SassoChicks,
    BroilerChicks,
    Feed,
}

impl StockKind {
    /// Keyword classifier over a free-text line description.
    ///
    /// Chick variants need both the breed and "chick"; anything mentioning
    /// "feed" or naming a known feed type is feed. Returns `None` for
    /// non-stock lines (transport, vaccines, ...).
    pub fn classify(description: &str) -> Option<StockKind> {
        let d = description.to_lowercase();
        if d.contains("sasso") && d.contains("chick") {
            return Some(StockKind::SassoChicks);
        }
        if d.contains("broiler") && d.contains("chick") {
            return Some(StockKind::BroilerChicks);
        }
        if d.contains("feed") || FeedType::classify(&d).is_some() {
            return Some(StockKind::Feed);
        }
        None
    }

    /// Ledger the kind credits on approval; feed has no count ledger.
    pub fn ledger_kind(self) -> Option<ItemKind> {
        match self {
            StockKind::SassoChicks => Some(ItemKind::SassoChicks),
            StockKind::BroilerChicks => Some(ItemKind::BroilerChicks),
            StockKind::Feed => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StockKind::SassoChicks => "SASSO_CHICKS",
            StockKind::BroilerChicks => "BROILER_CHICKS",
            StockKind::Feed => "FEED",
        }
    }
}

impl From<ItemKind> for StockKind {
    fn from(value: ItemKind) -> Self {
        match value {
            ItemKind::SassoChicks => StockKind::SassoChicks,
            ItemKind::BroilerChicks => StockKind::BroilerChicks,
        }
    }
}

impl core::fmt::Display for StockKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
