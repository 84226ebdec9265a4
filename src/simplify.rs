//! Debt simplification.
//!
//! Nets a pairwise distribution into per-person balances and matches
//! creditors against debtors greedily: the largest creditor is always paid by
//! the largest debtor, and whichever side still has something left goes back
//! into its queue.
//!
//! The greedy match settles `n` nonzero balances in at most `n - 1` transfers
//! and runs in `O(n log n)`. It is a heuristic: finding the true minimum number
//! of transfers is NP-hard in general, and some inputs admit fewer transfers
//! than the greedy result.

use crate::amount::Amount;
use crate::error::{LedgerError, Result};
use crate::queue::{BalanceQueue, Orientation};
use log::debug;
use std::collections::HashMap;

/// Net position per person. Positive means the person is owed money.
pub type Balances = HashMap<String, Amount>;

/// Pairwise ledger: `distribution[a][b] = x` means `a` is owed `x` by `b`
/// (negative `x` means `a` owes `b`).
pub type Distribution = HashMap<String, HashMap<String, Amount>>;

/// Collapses a distribution into net balances, one per row.
///
/// A person with an empty row still appears with a zero balance.
///
/// # Errors
///
/// Returns [`LedgerError::AmountOverflow`] if the credits or the debts of a row
/// on their own leave the decimal range.
pub fn aggregate(distribution: &Distribution) -> Result<Balances> {
    distribution
        .iter()
        .map(|(person, row)| {
            let balance = net_total(row.values().copied())?;
            Ok((person.clone(), balance))
        })
        .collect()
}

/// Computes a settlement for the given balances.
///
/// The result holds debtor rows only; each entry is the negated amount the
/// debtor pays that creditor. People with a zero balance do not appear.
///
/// # Errors
///
/// Returns [`LedgerError::UnconservedBalances`] if the balances do not sum to
/// zero, and [`LedgerError::AmountOverflow`] if the credits or the debts on
/// their own exceed the decimal range. The other error variants signal a
/// broken matching invariant and are unreachable for conserved input.
pub fn simplify(balances: &Balances) -> Result<Distribution> {
    check_conservation(balances)?;

    let mut creditors = BalanceQueue::new(Orientation::Max);
    let mut debtors = BalanceQueue::new(Orientation::Min);

    for (person, &balance) in balances {
        if balance.is_positive() {
            creditors.push(person.clone(), balance);
        } else if balance.is_negative() {
            debtors.push(person.clone(), balance);
        }
    }

    let mut settlement = Distribution::new();

    while let Some((creditor, credit)) = creditors.pop() {
        let (debtor, debt) = debtors
            .pop()
            .ok_or_else(|| LedgerError::UnsettledBalances {
                creditors: creditors.len() + 1,
                debtors: 0,
            })?;

        let amount = credit.min(debt.abs());
        let still_owes = debt + amount;
        let still_owed = credit - amount;

        if still_owes.is_negative() {
            debtors.push(debtor.clone(), still_owes);
        } else if still_owed.is_positive() {
            creditors.push(creditor.clone(), still_owed);
        }

        debug!("{} pays {} to {}", debtor, amount, creditor);

        let row = settlement.entry(debtor.clone()).or_default();
        if row.contains_key(&creditor) {
            return Err(LedgerError::DuplicatePairing { debtor, creditor });
        }
        row.insert(creditor, -amount);
    }

    if !debtors.is_empty() {
        return Err(LedgerError::UnsettledBalances {
            creditors: 0,
            debtors: debtors.len(),
        });
    }

    Ok(settlement)
}

fn check_conservation(balances: &Balances) -> Result<()> {
    let total = net_total(balances.values().copied())?;
    if !total.is_zero() {
        return Err(LedgerError::UnconservedBalances { total });
    }
    Ok(())
}

/// Sums positive and negative values separately, so the outcome does not
/// depend on iteration order. Fails if either side alone leaves the decimal
/// range; their difference always fits.
fn net_total(values: impl Iterator<Item = Amount>) -> Result<Amount> {
    let mut credit = Amount::ZERO;
    let mut debit = Amount::ZERO;

    for value in values {
        if value.is_positive() {
            credit = credit.checked_add(value).ok_or(LedgerError::AmountOverflow)?;
        } else if value.is_negative() {
            debit = debit.checked_sub(value).ok_or(LedgerError::AmountOverflow)?;
        }
    }

    Ok(credit - debit)
}

/// Aggregates a distribution and simplifies the resulting balances.
pub fn simplify_from_distribution(distribution: &Distribution) -> Result<Distribution> {
    simplify(&aggregate(distribution)?)
}

/// Counts payments in a distribution.
///
/// Each payment shows up once as a negative entry on the payer's row; the
/// positive mirror entries are not counted.
pub fn total_transfers(distribution: &Distribution) -> usize {
    distribution
        .values()
        .flat_map(|row| row.values())
        .filter(|amount| amount.is_negative())
        .count()
}
