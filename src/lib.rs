//! # Debt Simplifier
//!
//! Tracks who owes whom inside a group and reduces the web of pairwise debts
//! to a short list of settling payments.
//!
//! ## Design Principles
//!
//! - **Exact arithmetic**: Amounts use `rust_decimal` and are never rounded
//! - **Conservation**: Balances always sum to zero; the simplifier refuses input that doesn't
//! - **Greedy settlement**: The largest creditor is always paid by the largest debtor
//! - **Deterministic output**: Ties are broken by name, reports are sorted by name
//!
//! ## Example
//!
//! ```
//! use debt_simplifier::{simplify, Amount, Balances};
//!
//! let balances: Balances = [("alice", 10), ("bob", -4), ("carol", -6)]
//!     .into_iter()
//!     .map(|(name, value)| (name.to_string(), Amount::from(value)))
//!     .collect();
//!
//! let settlement = simplify(&balances).unwrap();
//! assert_eq!(settlement["bob"]["alice"], Amount::from(-4));
//! assert_eq!(settlement["carol"]["alice"], Amount::from(-6));
//! ```

pub mod amount;
pub mod error;
pub mod import;
pub mod ledger;
pub mod queue;
pub mod report;
pub mod simplify;

pub use amount::Amount;
pub use error::{LedgerError, Result};
pub use import::{read_export, Export};
pub use ledger::{Group, GroupId, Ledger, Share, Transaction};
pub use queue::{BalanceQueue, Orientation};
pub use simplify::{
    aggregate, simplify, simplify_from_distribution, total_transfers, Balances, Distribution,
};
