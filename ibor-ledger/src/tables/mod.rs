//! Table accessors, one module per table family, all as methods on [`crate::LedgerSession`].

mod cash;
mod journals;
mod nav;
mod positions;
mod trades;

pub use cash::NewCashEntry;
