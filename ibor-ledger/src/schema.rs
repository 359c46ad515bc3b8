//! Storage schema.
//!
//! Amount columns are scaled integers (see `ibor_core::money`): `*_cents` at 2
//! decimals, journal and NAV amounts at 4, `*_micros` quantities at 6. Every
//! idempotency key is a primary key or unique index so duplicates are rejected
//! by the store itself, and the append-only tables refuse updates via triggers.

pub(crate) const LEDGER_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS trades (
    trade_id TEXT PRIMARY KEY,
    isin TEXT NOT NULL CHECK (length(isin) = 12),
    quantity INTEGER NOT NULL CHECK (quantity > 0),
    price_cents INTEGER NOT NULL CHECK (price_cents > 0),
    side TEXT NOT NULL CHECK (side IN ('BUY', 'SELL')),
    trade_date TEXT NOT NULL,
    settle_date TEXT NOT NULL CHECK (settle_date >= trade_date),
    status TEXT NOT NULL,
    portfolio_id TEXT NOT NULL,
    version INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS trades_idx_settle_date ON trades(settle_date);
CREATE INDEX IF NOT EXISTS trades_idx_trade_date ON trades(trade_date, created_at);
CREATE TRIGGER IF NOT EXISTS trades_immutable_fields
    BEFORE UPDATE OF trade_id, isin, quantity, price_cents, side, trade_date, settle_date,
        portfolio_id, created_at ON trades
BEGIN
    SELECT RAISE(ABORT, 'trades are immutable except for status');
END;

CREATE TABLE IF NOT EXISTS positions (
    isin TEXT PRIMARY KEY,
    quantity_micros INTEGER NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS processed_trades (
    trade_id TEXT PRIMARY KEY,
    isin TEXT NOT NULL,
    applied_delta_micros INTEGER NOT NULL,
    processed_at TEXT NOT NULL
);
CREATE TRIGGER IF NOT EXISTS processed_trades_no_update BEFORE UPDATE ON processed_trades
BEGIN
    SELECT RAISE(ABORT, 'processed_trades rows are immutable');
END;
CREATE TRIGGER IF NOT EXISTS processed_trades_no_delete BEFORE DELETE ON processed_trades
BEGIN
    SELECT RAISE(ABORT, 'processed_trades rows are immutable');
END;

CREATE TABLE IF NOT EXISTS cash_ledger (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    portfolio_id TEXT NOT NULL,
    delta_cents INTEGER NOT NULL,
    balance_cents INTEGER,
    currency TEXT NOT NULL,
    reason TEXT NOT NULL,
    trade_id TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS cash_ledger_idx_portfolio ON cash_ledger(portfolio_id, created_at);
CREATE UNIQUE INDEX IF NOT EXISTS cash_ledger_uq_trade
    ON cash_ledger(trade_id) WHERE trade_id IS NOT NULL;
CREATE TRIGGER IF NOT EXISTS cash_ledger_no_update BEFORE UPDATE ON cash_ledger
BEGIN
    SELECT RAISE(ABORT, 'cash_ledger rows are append-only');
END;

CREATE TABLE IF NOT EXISTS cash_applied_trades (
    trade_id TEXT PRIMARY KEY,
    portfolio_id TEXT NOT NULL,
    delta_cents INTEGER NOT NULL,
    applied_at TEXT NOT NULL
);
CREATE TRIGGER IF NOT EXISTS cash_applied_trades_no_update BEFORE UPDATE ON cash_applied_trades
BEGIN
    SELECT RAISE(ABORT, 'cash_applied_trades rows are immutable');
END;
CREATE TRIGGER IF NOT EXISTS cash_applied_trades_no_delete BEFORE DELETE ON cash_applied_trades
BEGIN
    SELECT RAISE(ABORT, 'cash_applied_trades rows are immutable');
END;

CREATE TABLE IF NOT EXISTS journals (
    journal_id TEXT PRIMARY KEY,
    trade_id TEXT NOT NULL,
    journal_type TEXT NOT NULL CHECK (journal_type IN ('TRADE_DATE', 'SETTLEMENT_DATE')),
    created_at TEXT NOT NULL,
    UNIQUE (trade_id, journal_type)
);
CREATE INDEX IF NOT EXISTS journals_idx_created ON journals(created_at);
CREATE TRIGGER IF NOT EXISTS journals_no_update BEFORE UPDATE ON journals
BEGIN
    SELECT RAISE(ABORT, 'journals are immutable');
END;
CREATE TRIGGER IF NOT EXISTS journals_no_delete BEFORE DELETE ON journals
BEGIN
    SELECT RAISE(ABORT, 'journals are immutable');
END;

CREATE TABLE IF NOT EXISTS journal_lines (
    journal_id TEXT NOT NULL REFERENCES journals(journal_id),
    line_no INTEGER NOT NULL,
    account TEXT NOT NULL,
    debit INTEGER NOT NULL CHECK (debit >= 0),
    credit INTEGER NOT NULL CHECK (credit >= 0),
    CHECK ((debit = 0) <> (credit = 0)),
    PRIMARY KEY (journal_id, line_no)
);
CREATE TRIGGER IF NOT EXISTS journal_lines_no_update BEFORE UPDATE ON journal_lines
BEGIN
    SELECT RAISE(ABORT, 'journal lines are immutable');
END;
CREATE TRIGGER IF NOT EXISTS journal_lines_no_delete BEFORE DELETE ON journal_lines
BEGIN
    SELECT RAISE(ABORT, 'journal lines are immutable');
END;

CREATE TABLE IF NOT EXISTS settlement_markers (
    trade_id TEXT PRIMARY KEY,
    settled_at TEXT NOT NULL
);
CREATE TRIGGER IF NOT EXISTS settlement_markers_no_update BEFORE UPDATE ON settlement_markers
BEGIN
    SELECT RAISE(ABORT, 'settlement markers are immutable');
END;
CREATE TRIGGER IF NOT EXISTS settlement_markers_no_delete BEFORE DELETE ON settlement_markers
BEGIN
    SELECT RAISE(ABORT, 'settlement markers are immutable');
END;

CREATE TABLE IF NOT EXISTS nav_snapshots (
    snapshot_id TEXT PRIMARY KEY,
    portfolio_id TEXT NOT NULL,
    calculation_date TEXT NOT NULL,
    gross_value INTEGER NOT NULL,
    fee_accrual INTEGER NOT NULL,
    net_value INTEGER NOT NULL,
    shares_outstanding INTEGER NOT NULL CHECK (shares_outstanding > 0),
    nav_per_share INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS nav_snapshots_idx_portfolio_date
    ON nav_snapshots(portfolio_id, calculation_date);
CREATE TRIGGER IF NOT EXISTS nav_snapshots_no_update BEFORE UPDATE ON nav_snapshots
BEGIN
    SELECT RAISE(ABORT, 'nav snapshots are immutable');
END;
CREATE TRIGGER IF NOT EXISTS nav_snapshots_no_delete BEFORE DELETE ON nav_snapshots
BEGIN
    SELECT RAISE(ABORT, 'nav snapshots are immutable');
END;
"#;
