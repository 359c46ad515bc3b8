use std::path::Path;
use std::process::Command;

use anyhow::Result;
use assert_cmd::prelude::*;
use serde_json::Value;
use tempfile::tempdir;

const APPLE: &str = "US0378331005";

fn ibor(workdir: &Path, args: &[&str]) -> Command {
    let binary = assert_cmd::cargo::cargo_bin!("ibor");
    let mut cmd = Command::new(binary);
    cmd.current_dir(workdir)
        .env_remove("RUST_LOG")
        .arg("--database")
        .arg(workdir.join("ibor.db"))
        .args(args);
    cmd
}

fn run_json(workdir: &Path, args: &[&str]) -> Result<Value> {
    let output = ibor(workdir, args).assert().success().get_output().stdout.clone();
    Ok(serde_json::from_slice(&output)?)
}

fn book_apple(workdir: &Path, trade_id: &str) -> Result<Value> {
    run_json(
        workdir,
        &[
            "trade",
            "book",
            "--isin",
            APPLE,
            "--quantity",
            "100",
            "--price",
            "175.50",
            "--side",
            "BUY",
            "--trade-date",
            "2024-01-05",
            "--trade-id",
            trade_id,
        ],
    )
}

#[test]
fn books_trade_idempotently() -> Result<()> {
    let temp = tempdir()?;
    let trade_id = "6f1c1a8e-2f4a-4c55-9a51-0d7f5a1c2b3d";

    let first = book_apple(temp.path(), trade_id)?;
    assert_eq!(first["tradeId"], trade_id);
    assert_eq!(first["status"], "NEW");
    assert_eq!(first["idempotentHit"], false);

    let second = book_apple(temp.path(), trade_id)?;
    assert_eq!(second["idempotentHit"], true);

    let positions = run_json(temp.path(), &["positions"])?;
    assert_eq!(positions.as_array().map(Vec::len), Some(1));
    assert_eq!(positions[0]["isin"], APPLE);

    let balance = run_json(temp.path(), &["cash", "balance"])?;
    assert_eq!(balance["balance"], "-17550.00");
    assert_eq!(balance["currency"], "USD");

    let trade = run_json(temp.path(), &["trade", "show", trade_id])?;
    assert_eq!(trade["settleDate"], "2024-01-09");
    Ok(())
}

#[test]
fn settles_and_reports_journals() -> Result<()> {
    let temp = tempdir()?;
    let trade_id = "0b6f0f3e-7d0c-4e8e-8f52-3c1d2e4f5a6b";
    book_apple(temp.path(), trade_id)?;

    let settled = run_json(temp.path(), &["settle", "--date", "2024-01-09"])?;
    assert_eq!(settled["settled"], 1);
    let again = run_json(temp.path(), &["settle", "--date", "2024-01-09"])?;
    assert_eq!(again["settled"], 0);

    let journals = run_json(temp.path(), &["journals", "trade", trade_id])?;
    assert_eq!(journals.as_array().map(Vec::len), Some(2));
    let recent = run_json(temp.path(), &["journals", "recent", "--limit", "1"])?;
    assert_eq!(recent.as_array().map(Vec::len), Some(1));
    Ok(())
}

#[test]
fn rejects_invalid_trade_with_field_name() -> Result<()> {
    let temp = tempdir()?;
    let output = ibor(
        temp.path(),
        &[
            "trade",
            "book",
            "--isin",
            "BAD",
            "--quantity",
            "1",
            "--price",
            "1.00",
            "--side",
            "SELL",
            "--trade-date",
            "2024-01-05",
        ],
    )
    .assert()
    .failure()
    .get_output()
    .stderr
    .clone();
    assert!(String::from_utf8_lossy(&output).contains("isin"));
    Ok(())
}

#[test]
fn cash_reset_requires_operator_and_nav_snapshots() -> Result<()> {
    let temp = tempdir()?;
    ibor(temp.path(), &["cash", "reset", "--operator", " "])
        .assert()
        .failure();

    let reset = run_json(
        temp.path(),
        &["cash", "reset", "--operator", "ops", "--amount", "1000.00"],
    )?;
    assert_eq!(reset["balance"], "1000.00");

    let nav = run_json(temp.path(), &["nav", "calculate"])?;
    assert_eq!(nav["grossValue"], "1000.0000");
    let latest = run_json(temp.path(), &["nav", "latest"])?;
    assert_eq!(latest["id"], nav["id"]);
    Ok(())
}

#[test]
fn shows_resolved_configuration() -> Result<()> {
    let temp = tempdir()?;
    let output = ibor(temp.path(), &["config", "show"])
        .env("IBOR__NAV__FEE_RATE", "0.01")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let rendered = String::from_utf8(output)?;
    assert!(rendered.contains("fee_rate = \"0.01\""));
    assert!(rendered.contains("US0378331005"));
    Ok(())
}
