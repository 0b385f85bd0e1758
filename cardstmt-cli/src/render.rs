//! Human-readable and CSV output for parsed statements.

use anyhow::{Context, Result};
use cardstmt_core::{StatementRecord, TransactionRecord};
use std::fmt::Display;
use std::io::Write;

/// Shown for every field the profile could not find.
pub const NOT_AVAILABLE: &str = "N/A";

fn field<T: Display>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map_or_else(|| NOT_AVAILABLE.to_string(), |v| v.to_string())
}

pub fn write_table<W: Write>(out: &mut W, record: &StatementRecord, show_transactions: bool) -> Result<()> {
    let rows = [
        ("Bank", record.bank.clone()),
        ("Card (last 4)", field(&record.card_last4)),
        ("Statement date", field(&record.statement_date)),
        ("Statement period", field(&record.statement_period)),
        ("Payment due date", field(&record.due_date)),
        ("Total due", field(&record.total_due)),
        ("Minimum due", field(&record.minimum_due)),
    ];
    for (label, value) in rows {
        writeln!(out, "{:<18}{}", format!("{label}:"), value)?;
    }
    writeln!(
        out,
        "{:<18}{} ({} credits)",
        "Transactions:",
        record.transactions.len(),
        record.credit_count()
    )?;

    if show_transactions && !record.transactions.is_empty() {
        writeln!(out)?;
        for t in &record.transactions {
            writeln!(
                out,
                "  {:<12} {:<48} {:>12}{}",
                t.date,
                t.description,
                field(&t.amount),
                if t.credit { " CR" } else { "" }
            )?;
        }
    }
    Ok(())
}

/// Write transactions as CSV with a `date,description,amount,credit` header.
pub fn write_csv<W: Write>(out: W, transactions: &[TransactionRecord]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    for t in transactions {
        wtr.serialize(t).context("write CSV row")?;
    }
    wtr.flush().context("flush CSV")?;
    Ok(())
}
