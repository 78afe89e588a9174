//! Colored CLI display utilities for session statistics.

use std::fmt::Write as _;
use std::io::{self, Write};

use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;

use crate::monitor::MonitorStatus;
use crate::parser::{MissionOutcome, TransactionKind};
use crate::stats::SessionStats;

/// Number of recent transactions and missions shown in the summary.
const RECENT_SHOWN: usize = 5;

/// Get current timestamp in the same format as tracing.
fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Truncate a string to a maximum number of characters, adding ellipsis if
/// truncated.
#[must_use]
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        "...".to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{kept}...")
    }
}

/// Format an amount of money as whole aUEC with thousands separators.
#[must_use]
pub fn format_money(amount: f64) -> String {
    #[allow(clippy::cast_possible_truncation)]
    let rounded = amount.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0 {
        format!("-{grouped} aUEC")
    } else {
        format!("{grouped} aUEC")
    }
}

/// Format a number of seconds as `1h 02m 03s`.
#[must_use]
pub fn format_duration(secs: f64) -> String {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let total = secs.max(0.0) as u64;
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}h {minutes:02}m {seconds:02}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds:02}s")
    } else {
        format!("{seconds}s")
    }
}

fn clock(ts: Option<DateTime<Utc>>) -> String {
    ts.map_or_else(|| "--:--:--".to_string(), |t| t.format("%H:%M:%S").to_string())
}

fn or_unknown(value: Option<&str>) -> &str {
    value.unwrap_or("Unknown")
}

/// Render the full statistics report as plain text.
#[must_use]
pub fn format_stats(stats: &SessionStats) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== Session ===");
    let _ = writeln!(
        out,
        "Player:       {} ({})",
        or_unknown(stats.player.as_deref()),
        or_unknown(stats.player_id.as_deref())
    );
    let _ = writeln!(
        out,
        "Game Version: {} (Branch: {})",
        or_unknown(stats.game_version.as_deref()),
        or_unknown(stats.branch.as_deref())
    );
    let _ = writeln!(out, "Map:          {}", or_unknown(stats.map.as_deref()));
    if let Some(uptime) = stats.uptime_secs {
        let _ = writeln!(out, "Uptime:       {}", format_duration(uptime));
    }

    let trade = &stats.trade;
    let _ = writeln!(out);
    let _ = writeln!(out, "=== Trading ===");
    let _ = writeln!(out, "Total Earned:    {}", format_money(trade.money_earned));
    let _ = writeln!(out, "Total Spent:     {}", format_money(trade.money_spent));
    let _ = writeln!(out, "Net Profit:      {}", format_money(trade.net_profit));
    let _ = writeln!(out, "Items Purchased: {}", trade.items_purchased);
    let _ = writeln!(out, "Items Sold:      {}", trade.items_sold);
    let _ = writeln!(out, "Transactions:    {}", stats.items_moved_count);
    let _ = writeln!(out, "Shops Visited:   {}", stats.containers.len());

    if !stats.recent_transactions.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "--- Recent Transactions ---");
        for t in stats.recent_transactions.iter().rev().take(RECENT_SHOWN) {
            let action = match t.kind {
                TransactionKind::Purchase => "Bought",
                TransactionKind::Sale => "Sold",
            };
            let _ = writeln!(
                out,
                "{} - {action} {}x {} for {} at {}",
                clock(t.timestamp),
                t.quantity.unsigned_abs(),
                truncate(&t.item_id, 40),
                format_money(t.price),
                t.container_id
            );
        }
    }

    let missions = &stats.missions;
    let _ = writeln!(out);
    let _ = writeln!(out, "=== Missions ===");
    let _ = writeln!(out, "Completed: {}", missions.completed);
    let _ = writeln!(out, "Abandoned: {}", missions.abandoned);
    let _ = writeln!(out, "Failed:    {}", missions.failed);
    let _ = writeln!(out, "Total:     {}", missions.total());

    if !stats.recent_missions.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "--- Recent Missions ---");
        for m in stats.recent_missions.iter().rev().take(RECENT_SHOWN) {
            let outcome = match m.outcome {
                MissionOutcome::Completed => "Completed",
                MissionOutcome::Abandoned => "Abandoned",
                MissionOutcome::Failed => "Failed",
            };
            let _ = writeln!(
                out,
                "{} - {outcome}: {} - {} (ID: {})",
                clock(m.timestamp),
                m.player,
                m.reason,
                truncate(&m.mission_id, 11)
            );
        }
    }

    let _ = writeln!(out);
    let _ = write!(out, "Last Update: {}", clock(stats.last_updated_at));
    out
}

/// Print the full statistics report.
pub fn print_stats(stats: &SessionStats) {
    println!("{}", format_stats(stats));
    let _ = io::stdout().flush();
}

/// Print a one-line summary of a published snapshot.
pub fn print_snapshot(stats: &SessionStats) {
    let net = stats.trade.net_profit;
    let net_str = format_money(net);
    let net_colored = if net < 0.0 {
        net_str.red().to_string()
    } else {
        net_str.green().to_string()
    };
    println!(
        "{} {} player={} moved={} net={} missions={}/{}/{}",
        timestamp().dimmed(),
        "[STATS]".blue().bold(),
        or_unknown(stats.player.as_deref()).cyan(),
        stats.items_moved_count,
        net_colored,
        stats.missions.completed.green(),
        stats.missions.abandoned.yellow(),
        stats.missions.failed.red()
    );
    let _ = io::stdout().flush();
}

/// Print a snapshot as a single JSON line.
pub fn print_json(stats: &SessionStats) {
    match serde_json::to_string(stats) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::warn!(error = %e, "Failed to serialize snapshot"),
    }
    let _ = io::stdout().flush();
}

/// Print monitor start information.
pub fn print_monitor_start(path: &str) {
    println!(
        "{} {} watching {}",
        timestamp().dimmed(),
        "[MONITOR]".blue().bold(),
        path.cyan()
    );
    let _ = io::stdout().flush();
}

/// Print the monitor status when a run ends.
pub fn print_monitor_stop(status: &MonitorStatus) {
    println!(
        "{} {} stopped after {} lines, {} events",
        timestamp().dimmed(),
        "[MONITOR]".blue().bold(),
        status.lines_read,
        status.events_applied
    );
    if status.total_faults > 0 {
        println!(
            "{} {} {} poll failures, last: {}",
            timestamp().dimmed(),
            "[MONITOR]".yellow().bold(),
            status.total_faults,
            status.last_fault.as_deref().unwrap_or("unknown").dimmed()
        );
    }
    let _ = io::stdout().flush();
}

/// Print an error message.
pub fn print_error(message: &str) {
    eprintln!("{} {}", "[ERROR]".red().bold(), message);
}
