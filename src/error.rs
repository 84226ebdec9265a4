//! Error types for the ledger and the debt simplifier.

use crate::amount::Amount;
use thiserror::Error;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors that can occur while recording, importing or simplifying debts.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Failed to open or read the input file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    /// Balances handed to the simplifier do not sum to zero
    #[error("Unconserved balances: total is {total}, expected 0")]
    UnconservedBalances { total: Amount },

    /// One side of the matching ran out before the other
    #[error("Unsettled balances: {creditors} creditor(s) and {debtors} debtor(s) left unmatched")]
    UnsettledBalances { creditors: usize, debtors: usize },

    /// The same debtor was matched with the same creditor twice
    #[error("Debtor {debtor} was matched with creditor {creditor} more than once")]
    DuplicatePairing { debtor: String, creditor: String },

    /// A sum of amounts left the representable decimal range
    #[error("Amount overflow: values exceed the supported decimal range")]
    AmountOverflow,

    /// User is not registered in the ledger
    #[error("User {0} does not exist")]
    UnknownUser(String),

    /// Group id is not known to the ledger
    #[error("Group {0} does not exist")]
    UnknownGroup(usize),

    /// Creditor or debtor is not a member of the group
    #[error("{person} is not a member of group {group}")]
    UnknownMember { person: String, group: String },

    /// A share amount was negative
    #[error("Invalid share of {amount} for {debtor}: shares must not be negative")]
    InvalidShare { debtor: String, amount: Amount },

    /// Invalid export record
    #[error("Invalid record at row {row}: {message}")]
    InvalidRecord { row: usize, message: String },

    /// Export row without anybody who paid
    #[error("No creditor found at row {row}")]
    MissingCreditor { row: usize },

    /// Export row whose member cells do not cancel out
    #[error("Row {row} does not balance: member cells sum to {total}")]
    UnbalancedRow { row: usize, total: Amount },

    /// Member name appears twice in the export header
    #[error("Duplicate member column {0}")]
    DuplicateMember(String),

    /// Missing input file argument
    #[error("Missing input file argument. Usage: debt-simplifier <export.csv> [--csv]")]
    MissingArgument,
}
