use crate::actions::{Action, CliError, Outcome};
use ledger::journal::Direction;
use ledger::Ledger;
use std::fmt;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(name = "ledger-cli")]
pub struct Cli {
    /// Print results as JSON
    #[structopt(long = "json")]
    json: bool,
    #[structopt(subcommand)]
    action: Action,
}

impl Cli {
    pub fn execute(self, ledger: &Ledger, history_limit: usize) -> ResponseHandler {
        let result = self.action.execute(ledger, history_limit);
        ResponseHandler {
            json: self.json,
            result,
        }
    }
}

pub struct ResponseHandler {
    json: bool,
    result: Result<Outcome, CliError>,
}

impl ResponseHandler {
    /// Prints the outcome and reports whether the command succeeded.
    pub fn process_response(self) -> bool {
        match self.result {
            Ok(outcome) if self.json => match serde_json::to_string_pretty(&outcome) {
                Ok(json) => {
                    println!("{}", json);
                    true
                }
                Err(err) => {
                    eprintln!("Error while serializing the result: {:?}", err);
                    false
                }
            },
            Ok(outcome) => {
                print!("{}", outcome);
                true
            }
            Err(err) => {
                eprintln!("Error: {}", err);
                false
            }
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::UserCreated { user_id } => writeln!(f, "Created user {}", user_id),
            Outcome::Balance { btc, usdt } => {
                writeln!(f, "BTC:  {}", btc)?;
                writeln!(f, "USDT: {}", usdt)
            }
            Outcome::Receipt(receipt) => writeln!(
                f,
                "Transaction {} committed (reference {})",
                receipt.transaction_id, receipt.reference
            ),
            Outcome::DepositOpened { deposit_id } => writeln!(f, "Opened deposit {}", deposit_id),
            Outcome::Deposit(deposit) => writeln!(f, "Deposit {} is {}", deposit.id, deposit.status),
            Outcome::Deposits { deposits } => {
                if deposits.is_empty() {
                    return writeln!(f, "No pending deposits");
                }
                for deposit in deposits {
                    writeln!(
                        f,
                        "{}  {}  {}  opened {}",
                        deposit.id, deposit.currency, deposit.address, deposit.created_at
                    )?;
                }
                Ok(())
            }
            Outcome::History { entries } => {
                if entries.is_empty() {
                    return writeln!(f, "No transactions yet");
                }
                for entry in entries {
                    let (sign, preposition) = match entry.direction {
                        Direction::Incoming => ("+", "from"),
                        Direction::Outgoing => ("-", "to"),
                    };
                    let party = entry
                        .counterparty
                        .as_ref()
                        .map(|c| format!(" {} {}", preposition, c.display_name()))
                        .unwrap_or_default();
                    writeln!(
                        f,
                        "{}  {}{}  {}{}  {}",
                        entry.created_at.format("%Y-%m-%d %H:%M"),
                        sign,
                        entry.amount,
                        entry.tx_type,
                        party,
                        entry.reference
                    )?;
                }
                Ok(())
            }
            Outcome::Stats(stats) => {
                writeln!(f, "Users:            {}", stats.total_users)?;
                writeln!(f, "Transactions:     {}", stats.total_transactions)?;
                writeln!(f, "Pending deposits: {}", stats.pending_deposits)?;
                writeln!(
                    f,
                    "Total BTC:        {}",
                    core_types::Money::new(core_types::Currency::BTC, stats.total_btc_sats)
                )?;
                writeln!(
                    f,
                    "Total USDT:       {}",
                    core_types::Money::new(core_types::Currency::USDT, stats.total_usdt_cents)
                )
            }
        }
    }
}
