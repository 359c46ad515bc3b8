//! Column encodings shared by the table accessors.

use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use ibor_core::money;
use rusqlite::{Connection, Params, Row};
use rust_decimal::Decimal;

use crate::{LedgerError, LedgerResult};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Fixed-width RFC 3339 so that lexical order matches chronological order.
pub(crate) fn encode_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode_ts(raw: &str) -> LedgerResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|err| LedgerError::Serialization(format!("invalid timestamp {raw}: {err}")))
}

pub(crate) fn encode_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(crate) fn decode_date(raw: &str) -> LedgerResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|err| LedgerError::Serialization(format!("invalid date {raw}: {err}")))
}

pub(crate) fn decode<T>(raw: &str, what: &str) -> LedgerResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse::<T>()
        .map_err(|err| LedgerError::Serialization(format!("invalid {what} {raw}: {err}")))
}

pub(crate) fn encode_fixed(value: Decimal, scale: u32, what: &str) -> LedgerResult<i64> {
    money::to_fixed(value, scale)
        .ok_or_else(|| LedgerError::InvalidState(format!("{what} {value} is out of range")))
}

pub(crate) fn decode_fixed(raw: i64, scale: u32) -> Decimal {
    money::from_fixed(raw, scale)
}

/// Run `sql` and map every row.
pub(crate) fn query_all<T, P, F>(
    conn: &Connection,
    sql: &str,
    params: P,
    map: F,
) -> LedgerResult<Vec<T>>
where
    P: Params,
    F: Fn(&Row<'_>) -> LedgerResult<T>,
{
    let mut stmt = conn.prepare_cached(sql)?;
    let mut rows = stmt.query(params)?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(map(row)?);
    }
    Ok(out)
}

/// Run `sql` and map the first row, if any.
pub(crate) fn query_first<T, P, F>(
    conn: &Connection,
    sql: &str,
    params: P,
    map: F,
) -> LedgerResult<Option<T>>
where
    P: Params,
    F: FnOnce(&Row<'_>) -> LedgerResult<T>,
{
    let mut stmt = conn.prepare_cached(sql)?;
    let mut rows = stmt.query(params)?;
    match rows.next()? {
        Some(row) => map(row).map(Some),
        None => Ok(None),
    }
}
