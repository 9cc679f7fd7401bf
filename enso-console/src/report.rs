//! Leaderboard and mission listings in console, JSON and CSV form.
use anyhow::Result;
use chrono::Duration;
use colored::Colorize;
use enso_game::{LeaderboardEntry, MissionSet};
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct LeaderboardRow<'a> {
    rank: usize,
    team: &'a str,
    stage: u32,
    hints: &'a str,
    elapsed_secs: Option<i64>,
}

impl<'a> From<&'a LeaderboardEntry> for LeaderboardRow<'a> {
    fn from(entry: &'a LeaderboardEntry) -> Self {
        Self {
            rank: entry.rank,
            team: &entry.identity,
            stage: entry.stage,
            hints: &entry.hints,
            elapsed_secs: entry.elapsed.map(|d| d.num_seconds()),
        }
    }
}

/// `M min S s`, the way finish times are shown to players.
#[must_use]
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.num_seconds().max(0);
    format!("{} min {} s", secs / 60, secs % 60)
}

pub fn generate_console_leaderboard<W: Write + ?Sized>(
    writer: &mut W,
    entries: &[LeaderboardEntry],
    total: u32,
) -> Result<()> {
    writeln!(writer, "{}", "🏆 Leaderboard".bright_cyan().bold())?;
    writeln!(writer, "{}", "==============".cyan())?;
    if entries.is_empty() {
        writeln!(writer, "No teams have played yet.")?;
        return Ok(());
    }
    for entry in entries {
        let status = entry.elapsed.map_or_else(
            || {
                let cleared = entry.stage.saturating_sub(1).min(total);
                format!("in progress ({cleared}/{total})").yellow()
            },
            |elapsed| format!("finished in {}", format_elapsed(elapsed)).green(),
        );
        let hints = if entry.hints.is_empty() { "-" } else { entry.hints.as_str() };
        writeln!(
            writer,
            "{:>3}. {:<20} {:<6} {}",
            entry.rank,
            entry.identity.bold(),
            hints,
            status
        )?;
    }
    Ok(())
}

pub fn generate_json_leaderboard<W: Write + ?Sized>(
    writer: &mut W,
    entries: &[LeaderboardEntry],
) -> Result<()> {
    let rows: Vec<LeaderboardRow<'_>> = entries.iter().map(LeaderboardRow::from).collect();
    let json_output = serde_json::to_string_pretty(&rows)?;
    writeln!(writer, "{json_output}")?;
    Ok(())
}

pub fn generate_csv_leaderboard<W: Write + ?Sized>(
    writer: &mut W,
    entries: &[LeaderboardEntry],
) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in entries.iter().map(LeaderboardRow::from) {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn generate_mission_list<W: Write + ?Sized>(writer: &mut W, set: &MissionSet) -> Result<()> {
    writeln!(writer, "Mission set: {} ({} missions)", set.name, set.len())?;
    for mission in &set.missions {
        writeln!(writer, "  {}. {}", mission.ordinal, mission.title)?;
    }
    Ok(())
}
