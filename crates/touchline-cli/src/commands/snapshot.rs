use crate::commands::common::open_store;
use crate::config::CliConfig;
use crate::error::CliError;

pub fn run_snapshot(clear: bool, config: &CliConfig) -> Result<(), CliError> {
    let store = open_store(config)?;

    if clear {
        store.clear_snapshot()?;
        println!("Snapshot cleared.");
        return Ok(());
    }

    match store.load_snapshot()? {
        Some(snapshot) => println!("{}", serde_json::to_string_pretty(&snapshot)?),
        None => println!("No snapshot stored."),
    }
    Ok(())
}
