// Realtime MT5 account view: refreshes on the poll interval until the
// operator presses Enter or Ctrl-C.

use crate::api::ApiClient;
use crate::poll::PollLoop;
use crate::render::{self, RULE_WIDTH};
use anyhow::Result;
use crossbeam_channel::{bounded, Receiver};
use std::io;
use std::thread;
use std::time::Duration;
use tracing::warn;

pub fn show_realtime(api: &ApiClient, poll: &PollLoop) -> Result<()> {
    let every = poll.interval().as_secs();
    println!("Starting realtime updates every {}s...", every);
    thread::sleep(Duration::from_millis(500));

    let (enter_tx, enter_rx) = bounded(1);
    let report = poll.start(
        move || {
            wait_for_enter();
            let _ = enter_tx.send(());
        },
        || api.account_info(),
        |iteration, outcome| {
            render::screen(api.endpoint().base_url(), "MT5 ACCOUNT INFO (REALTIME)");
            println!("{} Refreshing... (update #{})", render::spinner_frame(iteration), iteration);
            match outcome {
                Ok(snapshot) => {
                    println!("{}", render::account_snapshot(snapshot));
                    println!("\n{}", render::rule('=', RULE_WIDTH));
                    println!(
                        "Update #{} - every {}s - press Enter or Ctrl-C to stop",
                        iteration, every
                    );
                }
                Err(failure) => println!("{}", render::poll_failure(failure)),
            }
        },
    );

    println!(
        "\nStopped realtime updates after {} refreshes ({} failed)",
        report.reads, report.failures
    );
    finish(&enter_rx)
}

/// Hold the screen until Enter. After Ctrl-C the listener is still reading
/// stdin, so its line is the one awaited instead of a second reader.
fn finish(enter: &Receiver<()>) -> Result<()> {
    if enter.try_recv().is_ok() {
        return super::pause();
    }
    println!("\nPress Enter to return to the menu...");
    let _ = enter.recv();
    Ok(())
}

fn wait_for_enter() {
    let mut line = String::new();
    if let Err(e) = io::stdin().read_line(&mut line) {
        warn!(error = %e, "stdin closed, stopping realtime view");
    }
}
