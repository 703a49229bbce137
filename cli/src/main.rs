use cli::cli::Cli;
use ledger::{Ledger, LedgerSettings};
use models::Store;
use structopt::StructOpt;
use utils::xlogging::init_log;

fn run() -> Result<bool, Box<dyn std::error::Error>> {
    let settings = utils::config::get_config_from_env::<LedgerSettings>()?;
    let logger = init_log(&settings.logging_settings)?;

    let store = Store::open(&settings.store)?;
    slog::debug!(logger, "Opened store at {}", settings.store.database_path);
    let ledger = Ledger::from_settings(store, &settings, logger);

    Ok(Cli::from_args().execute(&ledger, settings.history_limit).process_response())
}

fn main() {
    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("Failed to start: {}", err);
            std::process::exit(2);
        }
    }
}
