use chrono::NaiveDate;
use ibor_core::Isin;

pub const DEFAULT_TRADE_LIMIT: usize = 50;

/// Filter describing which trades to load from storage, newest first.
#[derive(Clone, Debug)]
pub struct TradeQuery {
    pub isin: Option<Isin>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub limit: usize,
}

impl Default for TradeQuery {
    fn default() -> Self {
        Self {
            isin: None,
            from_date: None,
            to_date: None,
            limit: DEFAULT_TRADE_LIMIT,
        }
    }
}

impl TradeQuery {
    pub fn with_isin(mut self, isin: Isin) -> Self {
        self.isin = Some(isin);
        self
    }

    /// Restrict to trade dates within `[from, to]`; either bound may be open.
    pub fn with_trade_date_range(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.from_date = from;
        self.to_date = to;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }
}
