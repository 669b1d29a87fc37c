// Presentation helpers: turn decoded responses into terminal text. The
// formatting functions return strings so they can be tested without a
// terminal; the few that touch the terminal are at the bottom.

use chrono::Local;
use crossterm::cursor::{MoveTo, Show};
use crossterm::execute;
use crossterm::terminal::{Clear, ClearType};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{Map, Value};
use std::io::{self, Write};
use std::time::Duration;

use crate::error::Failure;
use crate::model::{AccountSnapshot, PositionSummary};

pub const TITLE: &str = "MT5 & FIREBASE ADMIN";
pub const RULE_WIDTH: usize = 60;
/// Width of the positions and documents tables and their rules.
pub const TABLE_WIDTH: usize = 80;
const CELL_WIDTH: usize = 30;

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const TITLE_FIELDS: [&str; 4] = ["title", "name", "subject", "heading"];
const DATE_FIELDS: [&str; 6] = [
    "created_at",
    "updated_at",
    "timestamp",
    "date",
    "crawled_at",
    "published_date",
];

pub fn rule(ch: char, width: usize) -> String {
    ch.to_string().repeat(width)
}

/// `1234567.891` as `1,234,567.89`.
pub fn money(amount: f64) -> String {
    let formatted = format!("{:.2}", amount.abs());
    let (whole, frac) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));
    let sign = if amount < 0.0 && formatted != "0.00" { "-" } else { "" };
    format!("{}{}.{}", sign, group_thousands(whole), frac)
}

/// Integer count with thousands separators.
pub fn count(n: u64) -> String {
    group_thousands(&n.to_string())
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(digit);
    }
    out
}

/// Cut cells longer than the column to 28 characters plus `..`.
pub fn truncate_cell(text: &str) -> String {
    if text.chars().count() > CELL_WIDTH {
        let head: String = text.chars().take(CELL_WIDTH - 2).collect();
        format!("{}..", head)
    } else {
        text.to_string()
    }
}

/// Display form of a JSON scalar: strings without quotes, missing as `N/A`.
pub fn scalar(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "N/A".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

pub fn spinner_frame(iteration: u64) -> &'static str {
    SPINNER_FRAMES[(iteration % SPINNER_FRAMES.len() as u64) as usize]
}

pub fn header_lines(server: &str) -> Vec<String> {
    vec![
        rule('=', RULE_WIDTH),
        TITLE.to_string(),
        rule('=', RULE_WIDTH),
        format!("Server: {}", server),
        format!("Time:   {}", Local::now().format("%Y-%m-%d %H:%M:%S")),
        rule('-', RULE_WIDTH),
    ]
}

/// Full realtime view of one account snapshot. Sections missing from the
/// response are skipped.
pub fn account_snapshot(snapshot: &AccountSnapshot) -> String {
    let mut lines = Vec::new();

    if let Some(account) = &snapshot.account {
        lines.push(String::new());
        lines.push("ACCOUNT".to_string());
        lines.push(format!("  Login:        {}", scalar(account.login.as_ref())));
        lines.push(format!("  Server:       {}", account.server.as_deref().unwrap_or("N/A")));
        lines.push(format!("  Balance:      ${}", money(account.balance)));
        lines.push(format!("  Equity:       ${}", money(account.equity)));
        lines.push(format!("  Profit:       ${}", money(account.profit)));
        lines.push(format!("  Margin:       ${}", money(account.margin)));
        lines.push(format!("  Free margin:  ${}", money(account.free_margin)));
        lines.push(format!("  Margin level: {}%", money(account.margin_level)));
        lines.push(format!("  Currency:     {}", account.currency.as_deref().unwrap_or("N/A")));
    }

    if let Some(positions) = &snapshot.positions {
        lines.push(String::new());
        lines.push(format!("OPEN POSITIONS ({})", positions.len()));
        if positions.is_empty() {
            lines.push("  No open positions".to_string());
        } else {
            lines.push(format!(
                "{:<10} {:<10} {:<6} {:<8} {:<10} {:<14} {:<15}",
                "Ticket", "Symbol", "Type", "Volume", "Price", "Profit", "Comment"
            ));
            lines.push(rule('-', TABLE_WIDTH));
            for pos in positions {
                let marker = if pos.profit > 0.0 {
                    "+"
                } else if pos.profit < 0.0 {
                    "-"
                } else {
                    " "
                };
                lines.push(format!(
                    "{:<10} {:<10} {:<6} {:<8.2} {:<10.5} {} ${:<11.2} {:<15}",
                    scalar(pos.ticket.as_ref()),
                    pos.symbol.as_deref().unwrap_or("N/A"),
                    pos.side_label(),
                    pos.volume,
                    pos.price_open,
                    marker,
                    pos.profit,
                    pos.comment.as_deref().unwrap_or("N/A"),
                ));
            }
        }
    }

    if let Some(summary) = &snapshot.summary {
        lines.push(String::new());
        lines.push("OVERVIEW".to_string());
        lines.extend(summary_lines(summary));
    }

    if let Some(today) = &snapshot.today_summary {
        lines.push(String::new());
        lines.push(format!("TODAY ({})", today.period.as_deref().unwrap_or("today")));
        lines.extend(summary_lines(today));
    }

    if let Some(timestamp) = &snapshot.timestamp {
        lines.push(String::new());
        lines.push(format!("Updated at: {}", scalar(Some(timestamp))));
    }

    lines.join("\n")
}

fn summary_lines(summary: &PositionSummary) -> Vec<String> {
    vec![
        format!("  Open positions: {}", summary.total_positions),
        format!("  Total profit:   ${}", money(summary.total_profit)),
        format!("  Winning:        {}", summary.profitable_positions),
        format!("  Losing:         {}", summary.losing_positions),
    ]
}

/// What the realtime view shows when a refresh fails.
pub fn poll_failure(failure: &Failure) -> String {
    [
        format!("Could not fetch MT5 account info: {}", failure),
        "Possible causes:".to_string(),
        "  - the bot is not running".to_string(),
        "  - MT5 is not connected".to_string(),
        "  - the server does not support this endpoint".to_string(),
        String::new(),
        "Retrying...".to_string(),
    ]
    .join("\n")
}

/// One row of the document browser: ID, a title-like field, a date-like field.
pub fn document_row(doc: &Map<String, Value>) -> String {
    let id = truncate_cell(&scalar(doc.get("id")));
    let title = TITLE_FIELDS
        .iter()
        .find_map(|field| doc.get(*field))
        .map(|v| truncate_cell(&scalar(Some(v))))
        .unwrap_or_else(|| "N/A".to_string());
    let date = DATE_FIELDS
        .iter()
        .find_map(|field| doc.get(*field))
        .map(|v| scalar(Some(v)).chars().take(20).collect::<String>())
        .unwrap_or_else(|| "N/A".to_string());
    format!("{:<30} {:<30} {:<20}", id, title, date)
}

pub fn document_table(docs: &[Map<String, Value>]) -> String {
    let mut lines = vec![
        format!("{:<30} {:<30} {:<20}", "ID", "Title/Name", "Date"),
        rule('-', TABLE_WIDTH),
    ];
    lines.extend(docs.iter().map(document_row));
    lines.join("\n")
}

/// Clear the terminal and home the cursor.
pub fn clear_screen() -> io::Result<()> {
    let mut stdout = io::stdout();
    execute!(stdout, Clear(ClearType::All), MoveTo(0, 0))?;
    stdout.flush()
}

/// Make the cursor visible again after a prompt was abandoned mid-way.
pub fn restore_cursor() {
    let _ = execute!(io::stdout(), Show);
}

/// Clear the screen and print the header followed by a section title.
pub fn screen(server: &str, section: &str) {
    let _ = clear_screen();
    for line in header_lines(server) {
        println!("{}", line);
    }
    println!("{}", section);
    println!("{}", rule('=', RULE_WIDTH));
}

/// Run `f` while a spinner shows `message`.
pub fn with_spinner<T>(message: &str, f: impl FnOnce() -> T) -> T {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    let out = f();
    spinner.finish_and_clear();
    out
}
