use std::collections::HashMap;

use parking_lot::RwLock;
use rust_decimal::Decimal;

use crate::Isin;

/// Read-only unit price lookup used for valuation.
pub trait PriceOracle: Send + Sync {
    /// Authoritative price at call time, or `None` when the instrument is unknown.
    fn price(&self, isin: &Isin) -> Option<Decimal>;
}

/// In-memory price table, typically seeded from configuration.
#[derive(Debug, Default)]
pub struct StaticPriceOracle {
    prices: RwLock<HashMap<Isin, Decimal>>,
}

impl StaticPriceOracle {
    pub fn new(prices: impl IntoIterator<Item = (Isin, Decimal)>) -> Self {
        Self {
            prices: RwLock::new(prices.into_iter().collect()),
        }
    }

    pub fn set_price(&self, isin: Isin, price: Decimal) {
        self.prices.write().insert(isin, price);
    }

    pub fn len(&self) -> usize {
        self.prices.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.read().is_empty()
    }
}

impl PriceOracle for StaticPriceOracle {
    fn price(&self, isin: &Isin) -> Option<Decimal> {
        self.prices.read().get(isin).copied()
    }
}
