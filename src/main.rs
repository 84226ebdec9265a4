//! Debt Simplifier CLI
//!
//! Reads an expense-sharing CSV export, nets everybody's balance and prints
//! the shortest settlement the greedy matcher finds.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- export.csv          # console report
//! cargo run -- export.csv --csv    # debtor,creditor,amount rows
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `debug` or `warn` to control logging verbosity

use debt_simplifier::{read_export, report, Ledger, LedgerError, Result};
use std::env;
use std::fs::File;
use std::io::{self, BufReader};
use std::process;

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        return Err(LedgerError::MissingArgument);
    }

    let input_path = &args[1];
    let csv_output = args[2..].iter().any(|arg| arg == "--csv");

    let file = File::open(input_path)?;
    let export = read_export(BufReader::new(file))?;

    let mut ledger = Ledger::new();
    let group_id = export.load_into(&mut ledger, input_path)?;
    let group = ledger.group(group_id)?;
    let settlement = group.simplify_debts()?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if csv_output {
        report::write_settlement_csv(handle, &settlement)?;
    } else {
        report::write_report(&mut handle, group, &settlement)?;
    }

    Ok(())
}
