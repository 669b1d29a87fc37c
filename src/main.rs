// Entrypoint for the CLI application.
// - Keeps `main` small: resolve settings, build the API client, confirm the
//   server is reachable, then hand over to the menu loop.
// - Returns `anyhow::Result`; request failures are handled inside the UI.
// - Ctrl-C stops a running realtime view; anywhere else it ends the session.

use anyhow::Context;
use clap::Parser;
use dialoguer::Confirm;
use mt5admin_cli::api::ApiClient;
use mt5admin_cli::config::{init_logging, Cli, ServerStore, Settings};
use mt5admin_cli::poll::Interrupts;
use mt5admin_cli::render;
use mt5admin_cli::ui::{change_server, main_menu, print_unreachable};
use std::process;
use tracing::info;

/// Exit status for a session ended by Ctrl-C.
const INTERRUPTED_EXIT: i32 = 130;

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let store = ServerStore::in_home();
    let settings = Settings::resolve(cli, store.load());
    init_logging(&settings.log_level);
    info!(server = %settings.endpoint.base_url(), "mt5admin starting");

    let interrupts = Interrupts::new();
    let handler = interrupts.clone();
    ctrlc::set_handler(move || {
        if !handler.interrupt() {
            render::restore_cursor();
            println!("\nGoodbye!");
            info!("mt5admin interrupted");
            process::exit(INTERRUPTED_EXIT);
        }
    })
    .context("Failed to install the Ctrl-C handler")?;
    let poll = settings.poll.with_interrupts(interrupts);

    let mut api = ApiClient::new(settings.endpoint)?;

    println!("Checking connection to {}...", api.endpoint().base_url());
    if !render::with_spinner("Checking server...", || api.check_health()) {
        print_unreachable(api.endpoint().base_url());
        if Confirm::new()
            .with_prompt("Change the server address?")
            .default(true)
            .interact()?
        {
            change_server(&mut api, &store)?;
        }
    }

    // Blocks until the operator chooses "Exit".
    main_menu(api, poll, store)?;
    info!("mt5admin stopped");
    Ok(())
}
