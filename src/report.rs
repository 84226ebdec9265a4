//! Console and CSV rendering of balances and settlements.
//!
//! Every writer sorts by name so output is reproducible regardless of map
//! iteration order.

use crate::amount::Amount;
use crate::error::Result;
use crate::ledger::Group;
use crate::simplify::{self, Balances, Distribution};
use serde::Serialize;
use std::io::Write;

/// A single debtor-to-creditor payment, amount positive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Payment<'a> {
    pub debtor: &'a str,
    pub creditor: &'a str,
    pub amount: Amount,
}

/// Flattens a settlement into payments sorted by debtor, then creditor.
///
/// Only negative entries are payments; anything else is ignored.
pub fn payments(settlement: &Distribution) -> Vec<Payment<'_>> {
    let mut payments: Vec<Payment<'_>> = settlement
        .iter()
        .flat_map(|(debtor, row)| {
            row.iter()
                .filter(|(_, amount)| amount.is_negative())
                .map(move |(creditor, amount)| Payment {
                    debtor: debtor.as_str(),
                    creditor: creditor.as_str(),
                    amount: -*amount,
                })
        })
        .collect();
    payments.sort_by(|a, b| (a.debtor, a.creditor).cmp(&(b.debtor, b.creditor)));
    payments
}

/// Writes `Balances:` followed by one `- name: amount` line per person.
pub fn write_balances<W: Write>(writer: &mut W, balances: &Balances) -> Result<()> {
    let mut people: Vec<_> = balances.iter().collect();
    people.sort_by(|a, b| a.0.cmp(b.0));

    writeln!(writer, "Balances:")?;
    for (person, balance) in people {
        writeln!(writer, "- {}: {}", person, balance)?;
    }
    Ok(())
}

/// Writes how many transfers the settlement saves over the raw distribution.
pub fn write_summary<W: Write>(writer: &mut W, raw: usize, simplified: usize) -> Result<()> {
    let saved = raw.saturating_sub(simplified);
    let plural = if saved == 1 { "" } else { "s" };
    writeln!(
        writer,
        "Simplify debts saved {} balance transfer{} ({} -> {})",
        saved, plural, raw, simplified
    )?;
    Ok(())
}

/// Writes one block per debtor: their total, then each creditor they pay.
pub fn write_settlement<W: Write>(writer: &mut W, settlement: &Distribution) -> Result<()> {
    let payments = payments(settlement);

    for block in payments.chunk_by(|a, b| a.debtor == b.debtor) {
        let total: Amount = block.iter().map(|p| p.amount).sum();
        writeln!(writer)?;
        writeln!(writer, "{} owes {} in total", block[0].debtor, total)?;
        for payment in block {
            writeln!(writer, "- owes {} to {}", payment.amount, payment.creditor)?;
        }
    }
    Ok(())
}

/// Writes the full console report for a group and its settlement.
pub fn write_report<W: Write>(
    writer: &mut W,
    group: &Group,
    settlement: &Distribution,
) -> Result<()> {
    write_balances(writer, group.balances())?;
    writeln!(writer)?;
    write_summary(
        writer,
        group.total_transfers(),
        simplify::total_transfers(settlement),
    )?;
    write_settlement(writer, settlement)?;
    Ok(())
}

/// Writes the settlement as `debtor,creditor,amount` CSV.
///
/// The header is always written, even for an empty settlement.
pub fn write_settlement_csv<W: Write>(writer: W, settlement: &Distribution) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    csv_writer.write_record(["debtor", "creditor", "amount"])?;
    for payment in payments(settlement) {
        csv_writer.serialize(payment)?;
    }

    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settlement(entries: &[(&str, &str, i64)]) -> Distribution {
        let mut settlement = Distribution::new();
        for (debtor, creditor, amount) in entries {
            settlement
                .entry(debtor.to_string())
                .or_insert_with(HashMap::new)
                .insert(creditor.to_string(), Amount::from(-amount));
        }
        settlement
    }

    fn render<F>(f: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> Result<()>,
    {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_balances_sorted_by_name() {
        let balances: Balances = [("bob", -3), ("alice", 3)]
            .iter()
            .map(|(n, v)| (n.to_string(), Amount::from(*v)))
            .collect();

        let out = render(|w| write_balances(w, &balances));
        assert_eq!(out, "Balances:\n- alice: 3.00\n- bob: -3.00\n");
    }

    #[test]
    fn test_summary_pluralisation() {
        assert_eq!(
            render(|w| write_summary(w, 3, 2)),
            "Simplify debts saved 1 balance transfer (3 -> 2)\n"
        );
        assert_eq!(
            render(|w| write_summary(w, 5, 2)),
            "Simplify debts saved 3 balance transfers (5 -> 2)\n"
        );
        assert_eq!(
            render(|w| write_summary(w, 0, 0)),
            "Simplify debts saved 0 balance transfers (0 -> 0)\n"
        );
    }

    #[test]
    fn test_settlement_blocks() {
        let s = settlement(&[("dave", "alice", 4), ("carl", "bob", 2), ("carl", "alice", 5)]);

        let out = render(|w| write_settlement(w, &s));
        assert_eq!(
            out,
            "\ncarl owes 7.00 in total\n- owes 5.00 to alice\n- owes 2.00 to bob\n\
             \ndave owes 4.00 in total\n- owes 4.00 to alice\n"
        );
    }

    #[test]
    fn test_settlement_totals_are_per_debtor() {
        let s = settlement(&[
            ("bob", "alice", 1),
            ("bob", "carl", 2),
            ("bob", "dora", 3),
            ("erin", "alice", 10),
            ("fay", "carl", 7),
            ("fay", "dora", 8),
        ]);

        let out = render(|w| write_settlement(w, &s));
        let totals: Vec<&str> = out.lines().filter(|l| l.ends_with("in total")).collect();
        assert_eq!(
            totals,
            vec![
                "bob owes 6.00 in total",
                "erin owes 10.00 in total",
                "fay owes 15.00 in total",
            ]
        );
        assert_eq!(out.lines().filter(|l| l.starts_with("- owes")).count(), 6);
    }

    #[test]
    fn test_payments_skip_non_negative_entries() {
        let mut s = settlement(&[("bob", "alice", 4)]);
        s.entry("alice".to_string())
            .or_default()
            .insert("bob".to_string(), Amount::from(4));

        let flat = payments(&s);
        assert_eq!(
            flat,
            vec![Payment {
                debtor: "bob",
                creditor: "alice",
                amount: Amount::from(4),
            }]
        );
    }

    #[test]
    fn test_settlement_csv() {
        let s = settlement(&[("bob", "alice", 4), ("carol", "alice", 6)]);

        let out = render(|w| write_settlement_csv(w, &s));
        assert_eq!(out, "debtor,creditor,amount\nbob,alice,4.00\ncarol,alice,6.00\n");
    }

    #[test]
    fn test_empty_settlement_csv_has_header() {
        let out = render(|w| write_settlement_csv(w, &Distribution::new()));
        assert_eq!(out, "debtor,creditor,amount\n");
    }
}
