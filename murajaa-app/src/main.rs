mod cli;
pub mod api;
pub mod tui;

use anyhow::Result;
use clap::Parser; // needed for Cli::parse()
use std::sync::Arc;
use tokio::runtime::Runtime;

use cli::commands::{open_store, run_cli};
use cli::opts::{Cli, Command};
use tui::app::TuiApp;

fn main() -> Result<()> {
    let args = Cli::parse();

    match &args.cmd {
        // Run TUI on its own thread/runtime (no nested Tokio)
        Command::Tui => {
            let rt = Arc::new(Runtime::new()?);
            let store = rt.block_on(open_store(&args.store, args.db_path.clone()))?;
            let mut app = TuiApp::new(store, rt);
            app.run()
        }
        // Everything else uses a single runtime here
        _ => {
            let rt = Runtime::new()?;
            rt.block_on(run_cli(args))
        }
    }
}
