//! CLI output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};

use crate::auth::{Decision, SessionState};
use crate::notifications::{Notification, NotificationSummary};

/// Print a success message
pub fn success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print an error message
pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

/// Print a warning message
pub fn warn(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}

/// Print an info message
pub fn info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}

/// Format a guard decision as a colored string
pub fn format_decision(decision: Decision) -> String {
    match decision {
        Decision::Allow => "allow".green().to_string(),
        Decision::RedirectToLogin => format!("{} -> {}", "login required".red(), "/login"),
        Decision::RedirectToUnauthorized => {
            format!("{} -> {}", "unauthorized".yellow(), "/unauthorized")
        }
    }
}

/// Print the current session
pub fn print_session_detail(state: &SessionState) {
    println!("{}", "Session".bold().underline());
    println!();

    if !state.is_authenticated {
        println!("  {} {}", "Status:".bold(), "not logged in".red());
        return;
    }

    println!("  {} {}", "Status:".bold(), "logged in".green());
    if let Some(identity) = &state.identity {
        println!("  {} {}", "Email:".bold(), identity.email);
        println!("  {} {}", "User ID:".bold(), identity.subject_id);
    }
    if let Some(role) = state.role {
        println!("  {} {}", "Role:".bold(), role.to_string().cyan());
    }
}

/// Print a table of notifications
pub fn print_notification_table(summary: &NotificationSummary) {
    if summary.items.is_empty() {
        info("No notifications");
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").fg(Color::Cyan),
            Cell::new("").fg(Color::Cyan),
            Cell::new("Title").fg(Color::Cyan),
            Cell::new("Message").fg(Color::Cyan),
            Cell::new("Created").fg(Color::Cyan),
        ]);

    for item in &summary.items {
        let (marker, color) = if item.is_read {
            ("○", Color::DarkGrey)
        } else {
            ("●", Color::Green)
        };

        table.add_row(vec![
            Cell::new(item.id),
            Cell::new(marker).fg(color),
            Cell::new(&item.title),
            Cell::new(&item.message),
            Cell::new(item.created_at.format("%Y-%m-%d %H:%M").to_string()),
        ]);
    }

    println!("{table}");
    println!("{} unread", summary.unread_count);
}

/// Print a single notification as it arrives
pub fn print_new_notification(item: &Notification) {
    println!(
        "{} {} {} {}",
        item.created_at.format("%H:%M").to_string().dimmed(),
        "●".green(),
        item.title.bold(),
        item.message
    );
}

/// Confirm an action with the user
pub fn confirm(message: &str) -> bool {
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .unwrap_or(false)
}
