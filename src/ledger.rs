//! Users, groups and the running pairwise distribution.
//!
//! [`Ledger`] is the top-level context. It owns the user registry and every
//! group; nothing is shared through globals or back-references.

use crate::amount::Amount;
use crate::error::{LedgerError, Result};
use crate::simplify::{self, Balances, Distribution};
use log::debug;
use std::collections::HashMap;

/// Identifier of a group within a [`Ledger`].
pub type GroupId = usize;

/// One debtor's part of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Share {
    pub debtor: String,
    pub amount: Amount,
}

impl Share {
    pub fn new(debtor: impl Into<String>, amount: Amount) -> Self {
        Share {
            debtor: debtor.into(),
            amount,
        }
    }
}

/// An expense paid by one creditor on behalf of some debtors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Free-form label, e.g. "Dinner".
    pub description: String,

    /// Member who paid.
    pub creditor: String,

    /// What each debtor owes the creditor for this expense.
    pub shares: Vec<Share>,
}

impl Transaction {
    pub fn new(
        description: impl Into<String>,
        creditor: impl Into<String>,
        shares: Vec<Share>,
    ) -> Self {
        Transaction {
            description: description.into(),
            creditor: creditor.into(),
            shares,
        }
    }
}

/// A set of members sharing expenses.
///
/// # Invariants
///
/// - Local balances always sum to zero
/// - `distribution[a][b] == -distribution[b][a]`, and neither side is stored when zero
/// - No member has an entry against themselves
#[derive(Debug, Clone)]
pub struct Group {
    id: GroupId,
    name: String,

    /// Net position of each member within this group.
    balances: Balances,

    /// Pairwise amounts between members. Every member has a (possibly empty) row.
    distribution: Distribution,

    /// Accepted transactions, oldest first.
    transactions: Vec<Transaction>,
}

impl Group {
    fn new(id: GroupId, name: String) -> Self {
        Group {
            id,
            name,
            balances: Balances::new(),
            distribution: Distribution::new(),
            transactions: Vec::new(),
        }
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member names in ascending order.
    pub fn members(&self) -> Vec<&str> {
        let mut members: Vec<&str> = self.balances.keys().map(String::as_str).collect();
        members.sort_unstable();
        members
    }

    pub fn is_member(&self, person: &str) -> bool {
        self.distribution.contains_key(person)
    }

    pub fn balances(&self) -> &Balances {
        &self.balances
    }

    pub fn distribution(&self) -> &Distribution {
        &self.distribution
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Minimal settlement of the group's current balances.
    pub fn simplify_debts(&self) -> Result<Distribution> {
        simplify::simplify(&self.balances)
    }

    /// Number of payments recorded in the raw distribution.
    pub fn total_transfers(&self) -> usize {
        simplify::total_transfers(&self.distribution)
    }

    fn add_member(&mut self, person: &str) -> bool {
        if self.is_member(person) {
            return false;
        }
        self.balances.insert(person.to_string(), Amount::ZERO);
        self.distribution.insert(person.to_string(), HashMap::new());
        true
    }

    /// Checks a transaction against the member list without touching state.
    fn validate(&self, transaction: &Transaction) -> Result<()> {
        if !self.is_member(&transaction.creditor) {
            return Err(self.unknown_member(&transaction.creditor));
        }

        for share in &transaction.shares {
            if !self.is_member(&share.debtor) {
                return Err(self.unknown_member(&share.debtor));
            }
            if share.amount.is_negative() {
                return Err(LedgerError::InvalidShare {
                    debtor: share.debtor.clone(),
                    amount: share.amount,
                });
            }
        }

        Ok(())
    }

    fn unknown_member(&self, person: &str) -> LedgerError {
        LedgerError::UnknownMember {
            person: person.to_string(),
            group: self.name.clone(),
        }
    }

    /// Computes every value a transaction changes without writing any of them.
    ///
    /// Zero shares and shares owed by the creditor to themselves produce no
    /// postings.
    fn stage(
        &self,
        transaction: &Transaction,
        users: &HashMap<String, Amount>,
    ) -> Result<Postings> {
        let creditor = transaction.creditor.as_str();
        let owed_to_creditor = self.distribution.get(creditor);
        let mut postings = Postings::default();

        for share in &transaction.shares {
            if share.amount.is_zero() {
                debug!("Skipping zero share for {}", share.debtor);
                continue;
            }
            if share.debtor == transaction.creditor {
                debug!("Skipping {}'s own share of {}", share.debtor, share.amount);
                continue;
            }

            let debtor = share.debtor.as_str();
            let amount = share.amount;

            post(&mut postings.balances, creditor, self.balance_of(creditor), amount)?;
            post(&mut postings.balances, debtor, self.balance_of(debtor), -amount)?;

            let entry = owed_to_creditor
                .and_then(|row| row.get(debtor))
                .copied()
                .unwrap_or_default();
            post(&mut postings.entries, debtor, entry, amount)?;

            let credit = users.get(creditor).copied().unwrap_or_default();
            let debit = users.get(debtor).copied().unwrap_or_default();
            post(&mut postings.users, creditor, credit, amount)?;
            post(&mut postings.users, debtor, debit, -amount)?;
        }

        Ok(postings)
    }

    /// Writes staged balances and the creditor's pairwise entries, mirroring
    /// each entry and dropping it when it reaches zero.
    fn apply(&mut self, creditor: &str, postings: &Postings) {
        for (person, &balance) in &postings.balances {
            self.balances.insert(person.clone(), balance);
        }
        for (debtor, &amount) in &postings.entries {
            self.set_entry(creditor, debtor, amount);
            self.set_entry(debtor, creditor, -amount);
        }
    }

    fn balance_of(&self, person: &str) -> Amount {
        self.balances.get(person).copied().unwrap_or_default()
    }

    fn set_entry(&mut self, owner: &str, other: &str, value: Amount) {
        let Some(row) = self.distribution.get_mut(owner) else {
            return;
        };

        if value.is_zero() {
            row.remove(other);
        } else {
            row.insert(other.to_string(), value);
        }
    }
}

/// New values produced by one transaction, keyed by person.
#[derive(Debug, Default)]
struct Postings {
    /// Group balances.
    balances: HashMap<String, Amount>,

    /// `distribution[creditor][debtor]` for each debtor of the transaction.
    entries: HashMap<String, Amount>,

    /// Ledger-wide user balances.
    users: HashMap<String, Amount>,
}

/// Adds `delta` to the staged value for `key`, starting from `current` the
/// first time the key is seen.
fn post(
    staged: &mut HashMap<String, Amount>,
    key: &str,
    current: Amount,
    delta: Amount,
) -> Result<()> {
    let base = staged.get(key).copied().unwrap_or(current);
    let next = base.checked_add(delta).ok_or(LedgerError::AmountOverflow)?;
    staged.insert(key.to_string(), next);
    Ok(())
}

/// Registry of users and groups.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    /// Overall balance of every user across all groups.
    users: HashMap<String, Amount>,

    groups: HashMap<GroupId, Group>,

    next_group_id: GroupId,
}

impl Ledger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user. Returns `false` if the name was already taken.
    pub fn create_user(&mut self, name: &str) -> bool {
        if self.users.contains_key(name) {
            return false;
        }
        self.users.insert(name.to_string(), Amount::ZERO);
        true
    }

    /// Overall balance of a user across every group.
    pub fn user_balance(&self, name: &str) -> Option<Amount> {
        self.users.get(name).copied()
    }

    /// Creates an empty group and returns its id.
    pub fn create_group(&mut self, name: &str) -> GroupId {
        let id = self.next_group_id;
        self.next_group_id += 1;
        self.groups.insert(id, Group::new(id, name.to_string()));
        id
    }

    pub fn group(&self, id: GroupId) -> Result<&Group> {
        self.groups.get(&id).ok_or(LedgerError::UnknownGroup(id))
    }

    fn group_mut(&mut self, id: GroupId) -> Result<&mut Group> {
        self.groups.get_mut(&id).ok_or(LedgerError::UnknownGroup(id))
    }

    /// Adds a registered user to a group. Returns `false` if already a member.
    pub fn add_member(&mut self, group: GroupId, user: &str) -> Result<bool> {
        if !self.users.contains_key(user) {
            return Err(LedgerError::UnknownUser(user.to_string()));
        }
        Ok(self.group_mut(group)?.add_member(user))
    }

    /// Records a transaction in a group.
    ///
    /// The whole transaction is validated and every resulting balance computed
    /// first; on error nothing changes. Zero shares and shares owed by the
    /// creditor to themselves are skipped.
    pub fn add_transaction(&mut self, group: GroupId, transaction: Transaction) -> Result<()> {
        let target = self
            .groups
            .get_mut(&group)
            .ok_or(LedgerError::UnknownGroup(group))?;
        target.validate(&transaction)?;

        let postings = target.stage(&transaction, &self.users)?;
        target.apply(&transaction.creditor, &postings);
        for (user, &balance) in &postings.users {
            if let Some(slot) = self.users.get_mut(user) {
                *slot = balance;
            }
        }

        debug!(
            "Recorded '{}' paid by {} in group {}",
            transaction.description, transaction.creditor, target.name
        );
        target.transactions.push(transaction);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn amt(s: &str) -> Amount {
        Amount::from_str(s).unwrap()
    }

    fn ledger_with(members: &[&str]) -> (Ledger, GroupId) {
        let mut ledger = Ledger::new();
        let group = ledger.create_group("trip");
        for member in members {
            ledger.create_user(member);
            ledger.add_member(group, member).unwrap();
        }
        (ledger, group)
    }

    fn dinner(creditor: &str, shares: &[(&str, &str)]) -> Transaction {
        Transaction::new(
            "Dinner",
            creditor,
            shares.iter().map(|(d, a)| Share::new(*d, amt(a))).collect(),
        )
    }

    #[test]
    fn test_create_user_is_idempotent() {
        let mut ledger = Ledger::new();
        assert!(ledger.create_user("alice"));
        assert!(!ledger.create_user("alice"));
        assert_eq!(ledger.user_balance("alice"), Some(Amount::ZERO));
        assert_eq!(ledger.user_balance("bob"), None);
    }

    #[test]
    fn test_group_ids_are_sequential() {
        let mut ledger = Ledger::new();
        assert_eq!(ledger.create_group("a"), 0);
        assert_eq!(ledger.create_group("b"), 1);
        assert_eq!(ledger.group(1).unwrap().name(), "b");
        assert!(matches!(ledger.group(7), Err(LedgerError::UnknownGroup(7))));
    }

    #[test]
    fn test_add_member_requires_registered_user() {
        let mut ledger = Ledger::new();
        let group = ledger.create_group("trip");
        assert!(matches!(
            ledger.add_member(group, "ghost"),
            Err(LedgerError::UnknownUser(_))
        ));

        ledger.create_user("alice");
        assert!(ledger.add_member(group, "alice").unwrap());
        assert!(!ledger.add_member(group, "alice").unwrap());
        assert_eq!(ledger.group(group).unwrap().members(), vec!["alice"]);
    }

    #[test]
    fn test_transaction_updates_balances_and_distribution() {
        let (mut ledger, group) = ledger_with(&["alice", "bob", "carol"]);
        ledger
            .add_transaction(group, dinner("alice", &[("bob", "10"), ("carol", "12.50")]))
            .unwrap();

        let g = ledger.group(group).unwrap();
        assert_eq!(g.balances()["alice"], amt("22.50"));
        assert_eq!(g.balances()["bob"], amt("-10"));
        assert_eq!(g.balances()["carol"], amt("-12.50"));

        assert_eq!(g.distribution()["alice"]["bob"], amt("10"));
        assert_eq!(g.distribution()["bob"]["alice"], amt("-10"));
        assert_eq!(g.distribution()["carol"]["alice"], amt("-12.5"));
        assert_eq!(g.total_transfers(), 2);
        assert_eq!(g.transactions().len(), 1);

        assert_eq!(ledger.user_balance("alice"), Some(amt("22.50")));
        assert_eq!(ledger.user_balance("carol"), Some(amt("-12.50")));
    }

    #[test]
    fn test_opposite_debts_net_out_and_leave_no_zero_entries() {
        let (mut ledger, group) = ledger_with(&["alice", "bob"]);
        ledger.add_transaction(group, dinner("alice", &[("bob", "5")])).unwrap();
        ledger.add_transaction(group, dinner("bob", &[("alice", "5")])).unwrap();

        let g = ledger.group(group).unwrap();
        assert!(g.distribution()["alice"].is_empty());
        assert!(g.distribution()["bob"].is_empty());
        assert_eq!(g.balances()["alice"], Amount::ZERO);
        assert_eq!(g.total_transfers(), 0);
    }

    #[test]
    fn test_zero_and_self_shares_are_skipped() {
        let (mut ledger, group) = ledger_with(&["alice", "bob"]);
        ledger
            .add_transaction(group, dinner("alice", &[("alice", "5"), ("bob", "0")]))
            .unwrap();

        let g = ledger.group(group).unwrap();
        assert!(g.distribution()["alice"].is_empty());
        assert_eq!(g.balances()["alice"], Amount::ZERO);
        assert_eq!(g.transactions().len(), 1);
    }

    #[test]
    fn test_invalid_transaction_changes_nothing() {
        let (mut ledger, group) = ledger_with(&["alice", "bob"]);

        let err = ledger
            .add_transaction(group, dinner("alice", &[("bob", "5"), ("mallory", "5")]))
            .unwrap_err();
        assert!(
            matches!(err, LedgerError::UnknownMember { ref person, .. } if person == "mallory")
        );

        let err = ledger
            .add_transaction(group, dinner("alice", &[("bob", "-5")]))
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidShare { .. }));

        let err = ledger
            .add_transaction(group, dinner("mallory", &[("bob", "5")]))
            .unwrap_err();
        assert!(matches!(err, LedgerError::UnknownMember { .. }));

        let g = ledger.group(group).unwrap();
        assert_eq!(g.balances()["bob"], Amount::ZERO);
        assert!(g.transactions().is_empty());
        assert_eq!(ledger.user_balance("bob"), Some(Amount::ZERO));
    }

    #[test]
    fn test_repeated_debtor_accumulates_within_transaction() {
        let (mut ledger, group) = ledger_with(&["alice", "bob"]);
        ledger.add_transaction(group, dinner("bob", &[("alice", "2")])).unwrap();
        ledger
            .add_transaction(group, dinner("alice", &[("bob", "5"), ("bob", "3")]))
            .unwrap();

        let g = ledger.group(group).unwrap();
        assert_eq!(g.distribution()["alice"]["bob"], amt("6"));
        assert_eq!(g.distribution()["bob"]["alice"], amt("-6"));
        assert_eq!(g.balances()["bob"], amt("-6"));
        assert_eq!(ledger.user_balance("alice"), Some(amt("6")));
    }

    #[test]
    fn test_overflowing_transaction_changes_nothing() {
        let max = "79228162514264337593543950335";
        let (mut ledger, group) = ledger_with(&["alice", "bob", "carol"]);
        ledger.add_transaction(group, dinner("alice", &[("bob", max)])).unwrap();

        let err = ledger
            .add_transaction(group, dinner("alice", &[("carol", "1"), ("bob", "1")]))
            .unwrap_err();
        assert!(matches!(err, LedgerError::AmountOverflow));

        let g = ledger.group(group).unwrap();
        assert_eq!(g.balances()["alice"], amt(max));
        assert_eq!(g.balances()["carol"], Amount::ZERO);
        assert!(g.distribution()["carol"].is_empty());
        assert_eq!(g.transactions().len(), 1);
        assert_eq!(ledger.user_balance("carol"), Some(Amount::ZERO));
    }

    #[test]
    fn test_user_balance_spans_groups() {
        let mut ledger = Ledger::new();
        for user in ["alice", "bob"] {
            ledger.create_user(user);
        }
        let trip = ledger.create_group("trip");
        let flat = ledger.create_group("flat");
        for group in [trip, flat] {
            ledger.add_member(group, "alice").unwrap();
            ledger.add_member(group, "bob").unwrap();
        }

        ledger.add_transaction(trip, dinner("alice", &[("bob", "8")])).unwrap();
        ledger.add_transaction(flat, dinner("bob", &[("alice", "3")])).unwrap();

        assert_eq!(ledger.user_balance("alice"), Some(amt("5")));
        assert_eq!(ledger.user_balance("bob"), Some(amt("-5")));
        assert_eq!(ledger.group(flat).unwrap().balances()["alice"], amt("-3"));
    }

    #[test]
    fn test_group_simplify_debts() {
        let (mut ledger, group) = ledger_with(&["alice", "bob", "carol"]);
        ledger.add_transaction(group, dinner("alice", &[("bob", "7")])).unwrap();
        ledger.add_transaction(group, dinner("bob", &[("carol", "7")])).unwrap();

        let g = ledger.group(group).unwrap();
        assert_eq!(g.total_transfers(), 2);

        let settlement = g.simplify_debts().unwrap();
        assert_eq!(settlement.len(), 1);
        assert_eq!(settlement["carol"]["alice"], amt("-7"));
    }
}
