//! Import of expense-sharing CSV exports.
//!
//! The header row starts with five metadata columns
//! (`Date, Description, Category, Cost, Currency`) followed by one column per
//! member. Each data row is one expense; a member cell holds that member's
//! net effect, positive for whoever paid more than their share.

use crate::amount::Amount;
use crate::error::{LedgerError, Result};
use crate::ledger::{GroupId, Ledger, Share, Transaction};
use csv::{ReaderBuilder, StringRecord, Trim};
use log::{debug, warn};
use std::collections::HashSet;
use std::io::Read;
use std::str::FromStr;

/// Number of leading metadata columns before the member columns.
pub const METADATA_COLUMNS: usize = 5;

const DESCRIPTION_COLUMN: usize = 1;
const CURRENCY_COLUMN: usize = 4;

/// Description used by the summary row at the end of an export.
const TOTAL_BALANCE_ROW: &str = "total balance";

/// A parsed export, ready to be loaded into a [`Ledger`].
#[derive(Debug, Clone, Default)]
pub struct Export {
    /// Member names in column order.
    pub members: Vec<String>,

    /// One transaction per paying member per expense row, in file order.
    pub transactions: Vec<Transaction>,
}

impl Export {
    /// Registers the members as users, creates a group for them and records
    /// every transaction in it.
    pub fn load_into(&self, ledger: &mut Ledger, group_name: &str) -> Result<GroupId> {
        let group = ledger.create_group(group_name);
        for member in &self.members {
            ledger.create_user(member);
            ledger.add_member(group, member)?;
        }
        for transaction in &self.transactions {
            ledger.add_transaction(group, transaction.clone())?;
        }
        Ok(group)
    }
}

/// Reads a whole export.
///
/// Summary rows (`Total balance`) and blank lines are skipped. Any malformed
/// expense row aborts the import.
pub fn read_export<R: Read>(reader: R) -> Result<Export> {
    let mut csv_reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let members = parse_header(csv_reader.headers()?)?;
    let mut transactions = Vec::new();
    let mut currency: Option<String> = None;

    for (row_idx, result) in csv_reader.records().enumerate() {
        let record = result?;
        let row = record
            .position()
            .map_or(row_idx + 2, |pos| pos.line() as usize);

        if record.len() != METADATA_COLUMNS + members.len() {
            return Err(LedgerError::InvalidRecord {
                row,
                message: format!(
                    "expected {} columns, found {}",
                    METADATA_COLUMNS + members.len(),
                    record.len()
                ),
            });
        }

        let description = &record[DESCRIPTION_COLUMN];
        if description.eq_ignore_ascii_case(TOTAL_BALANCE_ROW) {
            debug!("Row {}: Skipping summary row", row);
            continue;
        }

        let row_currency = &record[CURRENCY_COLUMN];
        let first = currency.get_or_insert_with(|| row_currency.to_string());
        if first.as_str() != row_currency {
            warn!(
                "Row {}: Currency {} differs from {}; amounts are summed without conversion",
                row, row_currency, first
            );
        }

        transactions.extend(parse_expense(&record, &members, row)?);
    }

    debug!(
        "Imported {} transactions for {} members",
        transactions.len(),
        members.len()
    );

    Ok(Export {
        members,
        transactions,
    })
}

fn parse_header(header: &StringRecord) -> Result<Vec<String>> {
    if header.len() <= METADATA_COLUMNS {
        return Err(LedgerError::InvalidRecord {
            row: 1,
            message: "header has no member columns".to_string(),
        });
    }

    let mut seen = HashSet::new();
    let mut members = Vec::with_capacity(header.len() - METADATA_COLUMNS);
    for name in header.iter().skip(METADATA_COLUMNS) {
        if name.is_empty() {
            return Err(LedgerError::InvalidRecord {
                row: 1,
                message: "empty member name".to_string(),
            });
        }
        if !seen.insert(name) {
            return Err(LedgerError::DuplicateMember(name.to_string()));
        }
        members.push(name.to_string());
    }

    Ok(members)
}

/// Turns one expense row into transactions, one per member who paid.
fn parse_expense(
    record: &StringRecord,
    members: &[String],
    row: usize,
) -> Result<Vec<Transaction>> {
    let mut creditors: Vec<(&str, Amount)> = Vec::new();
    let mut debtors: Vec<(&str, Amount)> = Vec::new();
    let mut total = Amount::ZERO;

    for (member, cell) in members.iter().zip(record.iter().skip(METADATA_COLUMNS)) {
        let value = if cell.is_empty() {
            Amount::ZERO
        } else {
            Amount::from_str(cell).map_err(|e| LedgerError::InvalidRecord {
                row,
                message: format!("invalid amount '{}' for {}: {}", cell, member, e),
            })?
        };

        total = total
            .checked_add(value)
            .ok_or(LedgerError::AmountOverflow)?;
        if value.is_positive() {
            creditors.push((member.as_str(), value));
        } else if value.is_negative() {
            debtors.push((member.as_str(), -value));
        }
    }

    if creditors.is_empty() {
        return Err(LedgerError::MissingCreditor { row });
    }
    if !total.is_zero() {
        return Err(LedgerError::UnbalancedRow { row, total });
    }

    Ok(allocate(&record[DESCRIPTION_COLUMN], &creditors, &debtors))
}

/// Splits the debtors of a row across its creditors in column order.
fn allocate(
    description: &str,
    creditors: &[(&str, Amount)],
    debtors: &[(&str, Amount)],
) -> Vec<Transaction> {
    let mut transactions: Vec<Transaction> = creditors
        .iter()
        .map(|(creditor, _)| Transaction::new(description, *creditor, Vec::new()))
        .collect();
    let mut credits: Vec<Amount> = creditors.iter().map(|(_, credit)| *credit).collect();
    let mut current = 0;

    for &(debtor, owed) in debtors {
        let mut owed = owed;
        while owed.is_positive() && current < credits.len() {
            let part = owed.min(credits[current]);
            transactions[current].shares.push(Share::new(debtor, part));
            owed -= part;
            credits[current] -= part;
            if credits[current].is_zero() {
                current += 1;
            }
        }
    }

    transactions.retain(|transaction| !transaction.shares.is_empty());
    transactions
}
