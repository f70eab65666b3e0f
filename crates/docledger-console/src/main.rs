//! docledger — an interactive console for document CRUD and transactional
//! transfer demonstrations against an embedded document store.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use docledger_core::store::Store;

mod bank;
mod console;
mod crud;
mod display;

use console::{Console, ConsoleError, LineConsole};
use display::Table;

/// Interactive document-store playground: generic CRUD plus a transactional
/// banking demonstration.
#[derive(Parser, Debug)]
#[command(name = "docledger", version)]
struct Cli {
    /// Store snapshot path (default: ~/.local/share/docledger/store.json).
    #[arg(long)]
    db: Option<PathBuf>,

    /// Keep everything in memory; nothing is written to disk.
    #[arg(long)]
    ephemeral: bool,
}

fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("docledger")
        .join("store.json")
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let store = if cli.ephemeral {
        Store::in_memory()
    } else {
        let path = cli.db.clone().unwrap_or_else(default_db_path);
        if let Some(parent) = path.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            eprintln!("Cannot create data directory {}: {e}", parent.display());
            process::exit(1);
        }
        match Store::open(&path) {
            Ok(store) => store,
            Err(e) => {
                eprintln!("Cannot open store at {}: {e}", path.display());
                process::exit(1);
            }
        }
    };

    let mut console = match LineConsole::new() {
        Ok(console) => console,
        Err(e) => {
            eprintln!("Cannot initialize terminal: {e}");
            process::exit(1);
        }
    };

    match run(&store, &mut console) {
        Ok(()) | Err(ConsoleError::Closed) => {}
        Err(e) => {
            eprintln!("Console error: {e}");
            process::exit(1);
        }
    }
}

/// Main menu loop. Returns when the user exits or the input stream closes.
fn run(store: &Store, console: &mut dyn Console) -> Result<(), ConsoleError> {
    loop {
        console.panel("docledger");
        console.table(&main_menu());
        let choice = console.prompt("Select an option (0-2): ")?;
        match choice.as_str() {
            "0" => break,
            "1" => crud::run(store, console)?,
            "2" => bank::run(store, console)?,
            _ => console.line("Invalid option, try again."),
        }
    }
    console.line("Bye!");
    Ok(())
}

fn main_menu() -> Table {
    let mut table = Table::new(["Option", "Section", "Description"]).with_title("Main menu");
    table.add_row(["1", "Documents", "Generic CRUD against any collection"]);
    table.add_row(["2", "Transfers", "Transactional banking demonstration"]);
    table.add_row(["0", "Exit", "Quit the console"]);
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::ScriptedConsole;

    // ---- Cli parsing tests ----

    #[test]
    fn test_cli_no_args() {
        let cli = Cli::try_parse_from(["bin"]).unwrap();
        assert!(cli.db.is_none());
        assert!(!cli.ephemeral);
    }

    #[test]
    fn test_cli_db_path() {
        let cli = Cli::try_parse_from(["bin", "--db", "/tmp/test.json"]).unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/test.json")));
    }

    #[test]
    fn test_cli_ephemeral_flag() {
        let cli = Cli::try_parse_from(["bin", "--ephemeral"]).unwrap();
        assert!(cli.ephemeral);
    }

    #[test]
    fn test_cli_db_missing_value() {
        assert!(Cli::try_parse_from(["bin", "--db"]).is_err());
    }

    #[test]
    fn test_cli_unknown_flag() {
        assert!(Cli::try_parse_from(["bin", "--verbose"]).is_err());
    }

    // ---- main menu tests ----

    #[test]
    fn test_main_menu_exit() {
        let store = Store::in_memory();
        let mut console = ScriptedConsole::new(&["0"]);
        run(&store, &mut console).unwrap();
        assert!(console.output().contains("Bye!"));
    }

    #[test]
    fn test_main_menu_invalid_choice_loops() {
        let store = Store::in_memory();
        let mut console = ScriptedConsole::new(&["7", "0"]);
        run(&store, &mut console).unwrap();
        assert!(console.output().contains("Invalid option"));
    }

    #[test]
    fn test_main_menu_closed_input_is_clean_exit() {
        let store = Store::in_memory();
        let mut console = ScriptedConsole::new(&[]);
        let result = run(&store, &mut console);
        assert!(matches!(result, Err(ConsoleError::Closed)));
    }

    #[test]
    fn test_main_menu_dispatches_to_sections() {
        let store = Store::in_memory();
        // Enter documents, back out; enter transfers, back out; exit.
        let mut console = ScriptedConsole::new(&["1", "0", "2", "0", "0"]);
        run(&store, &mut console).unwrap();

        let output = console.output();
        assert!(output.contains("Document operations"));
        assert!(output.contains("Transactional transfers"));
    }
}
