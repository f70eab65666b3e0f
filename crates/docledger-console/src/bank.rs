//! Transactional transfer component: a small banking ledger demonstrating
//! atomic multi-document updates, rollback, and the hazard of skipping the
//! transaction.
//!
//! Three transfer strategies live here:
//!
//! - [`transfer_unchecked`] applies the debit, the credit, and the ledger
//!   write as three independent commits. A fault partway through leaves the
//!   earlier steps applied. This is the demonstration, not a bug; it must
//!   stay non-atomic.
//! - [`transfer_atomic`] runs the same steps inside one transaction scope
//!   with an insufficient-funds check before any write.
//! - [`transfer_forced_failure`] mirrors the atomic path but injects a fault
//!   after the balance updates and before commit, proving the abort discards
//!   the provisional writes.

use docledger_core::error::Error as StoreError;
use docledger_core::filter::Filter;
use docledger_core::store::Store;
use docledger_core::transaction::Transaction;
use docledger_core::types::DocumentId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{info, warn};

use crate::console::{Console, ConsoleError, pause};
use crate::display::Table;

pub const ACCOUNTS: &str = "accounts";
pub const MOVEMENTS: &str = "movements";

/// How many ledger entries the status view shows.
const RECENT_MOVEMENTS: usize = 5;

/// A bank account document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub account_id: i64,
    pub holder_name: String,
    pub balance: Decimal,
}

/// An append-only ledger entry describing one transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movement {
    pub kind: String,
    pub source_account_id: i64,
    pub destination_account_id: i64,
    pub amount: Decimal,
    pub status: String,
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("insufficient funds in account {account_id}: balance {balance}, requested {amount}")]
    InsufficientFunds {
        account_id: i64,
        balance: Decimal,
        amount: Decimal,
    },

    #[error("no such account: {0}")]
    UnknownAccount(i64),

    #[error("simulated fault before commit")]
    SimulatedFault,

    #[error("malformed account or movement record: {0}")]
    BadRecord(#[from] serde_json::Error),

    #[error("invalid amount: {0}")]
    BadAmount(#[from] rust_decimal::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

const SEED_ACCOUNTS: &[(i64, &str, &str)] = &[
    (1, "Alice Carter", "1000.0"),
    (2, "Maria Gomez", "1500.0"),
    (3, "Acme Logistics", "5000.0"),
    (4, "Carl Jensen", "750.0"),
    (5, "Ana Duarte", "3000.0"),
];

/// Seed the accounts and movements collections on first use.
///
/// Returns `true` if seeding happened, `false` if the collections already
/// existed.
pub fn ensure_seeded(store: &Store) -> Result<bool, TransferError> {
    if store.has_collection(ACCOUNTS) {
        return Ok(false);
    }
    let mut docs = Vec::with_capacity(SEED_ACCOUNTS.len());
    for (id, holder, balance) in SEED_ACCOUNTS {
        let account = Account {
            account_id: *id,
            holder_name: (*holder).to_string(),
            balance: balance.parse()?,
        };
        docs.push(serde_json::to_value(account)?);
    }
    store.insert_many(ACCOUNTS, docs)?;
    store.create_collection(MOVEMENTS)?;
    info!("seeded accounts and movements collections");
    Ok(true)
}

fn account_filter(account_id: i64) -> Filter {
    Filter::eq("account_id", json!(account_id))
}

fn decode_account(doc: &Value) -> Result<Account, TransferError> {
    Ok(serde_json::from_value(doc.clone())?)
}

fn movement_doc(from: i64, to: i64, amount: Decimal) -> Result<Value, TransferError> {
    let movement = Movement {
        kind: "transfer".to_string(),
        source_account_id: from,
        destination_account_id: to,
        amount,
        status: "completed".to_string(),
    };
    Ok(serde_json::to_value(movement)?)
}

/// Transfer without a transaction: three independent commits.
///
/// No funds check, no rollback. A failure partway through leaves the
/// earlier steps applied, which is exactly the inconsistency this path
/// exists to demonstrate.
pub fn transfer_unchecked(
    store: &Store,
    from: i64,
    to: i64,
    amount: Decimal,
) -> Result<(), TransferError> {
    transfer_unchecked_inner(store, from, to, amount, false)
}

/// `fail_between_updates` injects a fault after the debit has committed and
/// before the credit, so tests can reproduce the partial-failure state.
fn transfer_unchecked_inner(
    store: &Store,
    from: i64,
    to: i64,
    amount: Decimal,
    fail_between_updates: bool,
) -> Result<(), TransferError> {
    let (_, doc) = store
        .find_one(ACCOUNTS, &account_filter(from))?
        .ok_or(TransferError::UnknownAccount(from))?;
    let source = decode_account(&doc)?;
    store.update_many(
        ACCOUNTS,
        &account_filter(from),
        "balance",
        json!(source.balance - amount),
    )?;

    if fail_between_updates {
        return Err(TransferError::SimulatedFault);
    }

    // Re-read after the debit so a self-transfer nets to zero.
    let (_, doc) = store
        .find_one(ACCOUNTS, &account_filter(to))?
        .ok_or(TransferError::UnknownAccount(to))?;
    let destination = decode_account(&doc)?;
    store.update_many(
        ACCOUNTS,
        &account_filter(to),
        "balance",
        json!(destination.balance + amount),
    )?;

    store.insert_one(MOVEMENTS, movement_doc(from, to, amount)?)?;
    info!(from, to, amount = %amount, "unchecked transfer applied");
    Ok(())
}

/// Apply the debit and the credit inside a transaction scope.
fn apply_balance_updates(
    txn: &mut Transaction,
    from: i64,
    to: i64,
    amount: Decimal,
) -> Result<(), TransferError> {
    let (_, doc) = txn
        .find_one(ACCOUNTS, &account_filter(from))?
        .ok_or(TransferError::UnknownAccount(from))?;
    let source = decode_account(&doc)?;
    txn.update_many(
        ACCOUNTS,
        &account_filter(from),
        "balance",
        json!(source.balance - amount),
    )?;

    let (_, doc) = txn
        .find_one(ACCOUNTS, &account_filter(to))?
        .ok_or(TransferError::UnknownAccount(to))?;
    let destination = decode_account(&doc)?;
    txn.update_many(
        ACCOUNTS,
        &account_filter(to),
        "balance",
        json!(destination.balance + amount),
    )?;

    Ok(())
}

/// Atomic transfer: funds check, debit, credit, and ledger write in one
/// transaction. Any error aborts and the committed state is untouched.
pub fn transfer_atomic(
    store: &Store,
    from: i64,
    to: i64,
    amount: Decimal,
) -> Result<(), TransferError> {
    store.transact(|txn| {
        let (_, doc) = txn
            .find_one(ACCOUNTS, &account_filter(from))?
            .ok_or(TransferError::UnknownAccount(from))?;
        let source = decode_account(&doc)?;

        // Validate before any write so an abort here has nothing to undo.
        if source.balance < amount {
            return Err(TransferError::InsufficientFunds {
                account_id: from,
                balance: source.balance,
                amount,
            });
        }

        apply_balance_updates(txn, from, to, amount)?;
        txn.insert_one(MOVEMENTS, movement_doc(from, to, amount)?)?;
        Ok(())
    })?;
    info!(from, to, amount = %amount, "atomic transfer committed");
    Ok(())
}

/// Structurally the atomic path, but a fault is injected after the balance
/// updates and before commit. Always returns an error; the abort leaves
/// both balances at their pre-call values and writes no movement.
pub fn transfer_forced_failure(
    store: &Store,
    from: i64,
    to: i64,
    amount: Decimal,
) -> Result<(), TransferError> {
    let result = store.transact(|txn| {
        apply_balance_updates(txn, from, to, amount)?;
        Err(TransferError::SimulatedFault)
    });
    if let Err(e) = &result {
        warn!(error = %e, "forced-failure transfer aborted");
    }
    result
}

/// All accounts ordered by account id ascending.
pub fn account_balances(store: &Store) -> Result<Vec<Account>, TransferError> {
    let mut accounts = store
        .find(ACCOUNTS, &Filter::All)?
        .iter()
        .map(|(_, doc)| decode_account(doc))
        .collect::<Result<Vec<_>, _>>()?;
    accounts.sort_by_key(|account| account.account_id);
    Ok(accounts)
}

/// The `limit` most recent movements, newest first, each paired with its
/// document id. Ids are assigned in insertion order, so the id doubles as
/// the movement's sequence number.
pub fn recent_movements(
    store: &Store,
    limit: usize,
) -> Result<Vec<(DocumentId, Movement)>, TransferError> {
    store
        .find(MOVEMENTS, &Filter::All)?
        .iter()
        .rev()
        .take(limit)
        .map(|(id, doc)| Ok((*id, serde_json::from_value(doc.clone())?)))
        .collect()
}

/// Run the transactional transfers submenu.
pub fn run(store: &Store, console: &mut dyn Console) -> Result<(), ConsoleError> {
    console.panel("Transactional transfers");

    match ensure_seeded(store) {
        Ok(true) => console.line("Created 'accounts' and 'movements' with seed data."),
        Ok(false) => {}
        Err(e) => {
            console.line(&format!("Error: {e}"));
            return Ok(());
        }
    }

    loop {
        console.table(&menu());
        let choice = console.prompt("Select an operation (0-4): ")?;
        match choice.as_str() {
            "0" => break,
            "1" => unchecked_prompt(store, console)?,
            "2" => atomic_prompt(store, console)?,
            "3" => forced_failure_prompt(store, console),
            "4" => status_view(store, console),
            _ => console.line("Invalid option, try again."),
        }
        pause(console)?;
    }
    Ok(())
}

fn menu() -> Table {
    let mut table =
        Table::new(["Option", "Operation", "Description"]).with_title("Transfer operations");
    table.add_row(["1", "Unchecked transfer", "Move money without a transaction"]);
    table.add_row(["2", "Atomic transfer", "Move money inside a transaction"]);
    table.add_row(["3", "Forced failure", "Inject a fault and watch the rollback"]);
    table.add_row(["4", "Account status", "Show balances and recent movements"]);
    table.add_row(["0", "Back", "Return to the main menu"]);
    table
}

/// Prompt for source/destination/amount; `None` on malformed input (which is
/// reported, not fatal).
fn read_transfer_input(
    console: &mut dyn Console,
) -> Result<Option<(i64, i64, Decimal)>, ConsoleError> {
    let from = console.prompt("Source account (1-5): ")?;
    let Ok(from) = from.parse::<i64>() else {
        console.line("Invalid account id.");
        return Ok(None);
    };
    let to = console.prompt("Destination account (1-5): ")?;
    let Ok(to) = to.parse::<i64>() else {
        console.line("Invalid account id.");
        return Ok(None);
    };
    let amount = console.prompt("Amount to transfer: ")?;
    let Ok(amount) = amount.parse::<Decimal>() else {
        console.line("Invalid amount.");
        return Ok(None);
    };
    Ok(Some((from, to, amount)))
}

fn unchecked_prompt(store: &Store, console: &mut dyn Console) -> Result<(), ConsoleError> {
    console.line("Transfer WITHOUT a transaction:");
    let Some((from, to, amount)) = read_transfer_input(console)? else {
        return Ok(());
    };
    match transfer_unchecked(store, from, to, amount) {
        Ok(()) => console.line("Transfer completed (no transaction)."),
        Err(e) => {
            console.line(&format!("Error: {e}"));
            console.line("Warning: earlier steps of this transfer were NOT rolled back.");
        }
    }
    Ok(())
}

fn atomic_prompt(store: &Store, console: &mut dyn Console) -> Result<(), ConsoleError> {
    console.line("Transfer WITH a transaction:");
    let Some((from, to, amount)) = read_transfer_input(console)? else {
        return Ok(());
    };
    match transfer_atomic(store, from, to, amount) {
        Ok(()) => console.line("Transaction committed."),
        Err(e) => console.line(&format!("Transaction failed (rolled back): {e}")),
    }
    Ok(())
}

fn forced_failure_prompt(store: &Store, console: &mut dyn Console) {
    console.line("Simulated failed transaction:");
    console.line("Transferring $100.00 from account 1 to account 2, then forcing an error.");
    match transfer_forced_failure(store, 1, 2, Decimal::from(100)) {
        Err(e) => {
            console.line(&format!("Transaction failed (expected): {e}"));
            console.line("Rollback left both balances untouched.");
        }
        Ok(()) => console.line("Unexpected: the forced failure did not fail."),
    }
}

fn status_view(store: &Store, console: &mut dyn Console) {
    let accounts = match account_balances(store) {
        Ok(accounts) => accounts,
        Err(e) => {
            console.line(&format!("Error: {e}"));
            return;
        }
    };
    let mut table = Table::new(["Account", "Holder", "Balance"]).with_title("Account balances");
    for account in &accounts {
        table.add_row([
            account.account_id.to_string(),
            account.holder_name.clone(),
            format!("${:.2}", account.balance),
        ]);
    }
    console.table(&table);

    let movements = match recent_movements(store, RECENT_MOVEMENTS) {
        Ok(movements) => movements,
        Err(e) => {
            console.line(&format!("Error: {e}"));
            return;
        }
    };
    if movements.is_empty() {
        console.line("No movements yet.");
        return;
    }
    let mut table =
        Table::new(["Seq", "Kind", "Detail", "Amount", "Status"]).with_title("Last 5 movements");
    for (id, movement) in &movements {
        table.add_row([
            id.to_string(),
            movement.kind.clone(),
            format!(
                "{} -> {}",
                movement.source_account_id, movement.destination_account_id
            ),
            format!("${:.2}", movement.amount),
            movement.status.clone(),
        ]);
    }
    console.table(&table);
}
