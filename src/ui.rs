// UI layer: interactive menus built on `dialoguer`. Each flow is a small
// synchronous function that prompts, calls the API client and prints the
// outcome. Request failures are shown to the operator and never end the
// session; only terminal I/O errors propagate.

mod account;
mod remote;
mod store;

use crate::api::ApiClient;
use crate::config::{normalize_server, ServerStore};
use crate::error::Failure;
use crate::model::Reply;
use crate::poll::PollLoop;
use crate::render::{self, RULE_WIDTH};
use anyhow::Result;
use chrono::Local;
use dialoguer::{Confirm, Input, Select};
use std::io;
use tracing::warn;

/// Main interactive menu. Checks the server on every visit and runs until the
/// operator chooses "Exit".
pub fn main_menu(mut api: ApiClient, poll: PollLoop, store: ServerStore) -> Result<()> {
    loop {
        render::screen(api.endpoint().base_url(), "MAIN MENU");

        if !render::with_spinner("Checking server...", || api.check_health()) {
            print_unreachable(api.endpoint().base_url());
            let items = ["Retry", "Change server", "Exit"];
            match Select::new().items(&items).default(0).interact()? {
                0 => continue,
                1 => {
                    change_server(&mut api, &store)?;
                    continue;
                }
                _ => break,
            }
        }

        println!("Connected to server");
        let items = [
            "MT5 account info (realtime)",
            "Send Discord test message",
            "Remote settings",
            "Document store",
            "Change server",
            "Exit",
        ];
        let selection = Select::new()
            .with_prompt("Choose an action")
            .items(&items)
            .default(0)
            .interact()?;
        match selection {
            0 => account::show_realtime(&api, &poll)?,
            1 => discord_test(&api)?,
            2 => remote::settings_menu(&api)?,
            3 => store::store_menu(&api)?,
            4 => change_server(&mut api, &store)?,
            _ => break,
        }
    }
    println!("Goodbye!");
    Ok(())
}

/// Troubleshooting hints shown when the health check fails.
pub fn print_unreachable(server: &str) {
    println!("Cannot reach the server at {}", server);
    println!("Check that:");
    println!("  - the bot's admin service is running");
    println!("  - the address and port are correct");
    println!("  - the port is open in the firewall");
    println!();
}

/// Ask for a new address, point the client at it and remember it for the
/// next run.
pub fn change_server(api: &mut ApiClient, store: &ServerStore) -> Result<()> {
    let input: String = Input::new()
        .with_prompt("New server (URL, host:port or IP)")
        .allow_empty(true)
        .interact_text()?;
    let Some(server) = normalize_server(&input) else {
        println!("Server unchanged");
        return Ok(());
    };

    api.reconfigure(server.as_str());
    match store.save(&server) {
        Ok(()) => println!("Server changed to {} (saved to {})", server, store.path().display()),
        Err(e) => {
            warn!(error = %e, "could not persist server");
            println!("Server changed to {} (not saved: {})", server, e);
        }
    }
    pause()
}

fn discord_test(api: &ApiClient) -> Result<()> {
    render::screen(api.endpoint().base_url(), "DISCORD TEST MESSAGE");
    println!("Sends a test message to the bot's Discord channel");
    println!("{}", render::rule('-', RULE_WIDTH));

    let input: String = Input::new()
        .with_prompt("Message (empty for the default)")
        .allow_empty(true)
        .interact_text()?;
    let message = if input.trim().is_empty() {
        format!(
            "Test message from mt5admin - {}",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        )
    } else {
        input.trim().to_string()
    };

    println!("\nMessage: {}", message);
    if !Confirm::new().with_prompt("Send this message?").interact()? {
        println!("Cancelled");
        return pause();
    }

    match render::with_spinner("Sending...", || api.send_discord_test(&message)) {
        Ok(notice) => {
            println!("Discord message sent");
            println!("Result: {}", notice.message.as_deref().unwrap_or("sent"));
        }
        Err(e) => {
            println!("Discord message failed");
            println!("Error: {}", e);
        }
    }
    pause()
}

/// Unwrap a store/settings reply, printing whatever went wrong.
fn settle<T>(outcome: Result<Reply<T>, Failure>) -> Option<T> {
    match outcome {
        Ok(reply) => match reply.into_result() {
            Ok(body) => Some(body),
            Err(e) => {
                println!("Server error: {}", e);
                None
            }
        },
        Err(e) => {
            println!("Request failed: {}", e);
            None
        }
    }
}

/// Operator must type `word` exactly to go ahead.
fn confirm_typed(word: &str) -> Result<bool> {
    let typed: String = Input::new()
        .with_prompt(format!("Type '{}' to confirm", word))
        .allow_empty(true)
        .interact_text()?;
    Ok(typed.trim() == word)
}

/// Select among `items` with a trailing "Back" entry; `None` means back.
fn pick(prompt: &str, items: &[String]) -> Result<Option<usize>> {
    let mut choices: Vec<&str> = items.iter().map(String::as_str).collect();
    choices.push("Back");
    let selection = Select::new()
        .with_prompt(prompt)
        .items(&choices)
        .default(0)
        .interact()?;
    Ok((selection < items.len()).then_some(selection))
}

/// Wait for Enter before returning to the previous menu.
fn pause() -> Result<()> {
    println!("\n{}", render::rule('=', RULE_WIDTH));
    println!("Press Enter to go back...");
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(())
}
