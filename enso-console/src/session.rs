//! Terminal render loop: show the current mission, read one line, apply one
//! engine operation or view change, render again.
use anyhow::Result;
use colored::Colorize;
use enso_game::numbers::usize_to_f64;
use enso_game::{
    Clock, Dataset, MissionEngine, ProgressState, ProgressStore, StartMode, ViewFilter,
};
use std::io::{BufRead, Write};

const DEFAULT_ROWS: usize = 5;
const BAR_WIDTH: usize = 20;

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Answer(String),
    Data(usize),
    Years(i32, i32),
    /// `None` clears the month filter.
    Month(Option<u32>),
    Column(String),
    Hints,
    Reset,
    Help,
    Quit,
}

/// Parse a line. Lines not starting with `:` are answers.
///
/// # Errors
///
/// Returns a message for unknown commands or bad arguments.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let trimmed = line.trim();
    let Some(rest) = trimmed.strip_prefix(':') else {
        return Ok(Command::Answer(trimmed.to_string()));
    };
    let mut parts = rest.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();
    match (name, args.as_slice()) {
        ("data", []) => Ok(Command::Data(DEFAULT_ROWS)),
        ("data", [n]) => n
            .parse()
            .map(Command::Data)
            .map_err(|_| format!("not a row count: {n}")),
        ("years", [from, to]) => match (from.parse::<i32>(), to.parse::<i32>()) {
            (Ok(a), Ok(b)) if a <= b => Ok(Command::Years(a, b)),
            _ => Err(format!("invalid year range: {from} {to}")),
        },
        ("month", ["all"]) => Ok(Command::Month(None)),
        ("month", [m]) => match m.parse::<u32>() {
            Ok(month) if (1..=12).contains(&month) => Ok(Command::Month(Some(month))),
            _ => Err(format!("invalid month: {m}")),
        },
        ("column", words) if !words.is_empty() => Ok(Command::Column(words.join(" "))),
        ("hints", []) => Ok(Command::Hints),
        ("reset", []) => Ok(Command::Reset),
        ("help", []) => Ok(Command::Help),
        ("quit" | "q", []) => Ok(Command::Quit),
        _ => Err(format!("unknown command :{rest}")),
    }
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Every mission passed and the passphrase entered.
    Solved,
    Quit,
    /// Input ran out before the run was finished.
    InputClosed,
}

/// Player-chosen adjustments layered over a mission's own view filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ViewAdjust {
    years: Option<(i32, i32)>,
    month: Option<Option<u32>>,
    column: Option<String>,
}

impl ViewAdjust {
    fn apply(&self, base: &ViewFilter) -> ViewFilter {
        ViewFilter {
            column: self.column.clone().or_else(|| base.column.clone()),
            years: self.years.or(base.years),
            month: self.month.unwrap_or(base.month),
        }
    }
}

/// One identity playing through the engine against a loaded table.
pub struct Session<'a, S, C> {
    engine: &'a MissionEngine<S, C>,
    dataset: &'a Dataset,
    state: ProgressState,
    adjust: ViewAdjust,
}

impl<'a, S: ProgressStore, C: Clock> Session<'a, S, C> {
    pub const fn new(
        engine: &'a MissionEngine<S, C>,
        dataset: &'a Dataset,
        state: ProgressState,
    ) -> Self {
        Self {
            engine,
            dataset,
            state,
            adjust: ViewAdjust {
                years: None,
                month: None,
                column: None,
            },
        }
    }

    #[must_use]
    pub const fn state(&self) -> &ProgressState {
        &self.state
    }

    /// Drive the loop until the passphrase is solved, the player quits or
    /// input ends.
    ///
    /// # Errors
    ///
    /// Returns an error if writing output, reading input or saving progress fails.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> Result<SessionOutcome> {
        let mut lines = input.lines();
        let mut dirty = true;
        loop {
            let complete = self.engine.is_complete(&self.state);
            if dirty {
                if complete {
                    self.render_completion(out)?;
                } else {
                    self.render_mission(out)?;
                }
                dirty = false;
            }
            let prompt = if complete { "passphrase>" } else { "answer>" };
            write!(out, "{} ", prompt.cyan())?;
            out.flush()?;

            let Some(line) = lines.next().transpose()? else {
                writeln!(out)?;
                return Ok(SessionOutcome::InputClosed);
            };
            let command = match parse_command(&line) {
                Ok(command) => command,
                Err(message) => {
                    writeln!(out, "{}", message.yellow())?;
                    continue;
                }
            };

            match command {
                Command::Answer(raw) if complete => {
                    if self.engine.final_passphrase_check(&self.state, &raw) {
                        writeln!(out, "{}", "🎯 Passphrase accepted. Case closed!".green().bold())?;
                        return Ok(SessionOutcome::Solved);
                    }
                    writeln!(out, "{}", "❌ Incorrect, try again.".red())?;
                }
                Command::Answer(raw) => dirty = self.answer(&raw, out)?,
                Command::Data(n) => self.render_rows(n, out)?,
                Command::Years(from, to) => {
                    self.adjust.years = Some((from, to));
                    dirty = true;
                }
                Command::Month(month) => {
                    self.adjust.month = Some(month);
                    dirty = true;
                }
                Command::Column(name) => {
                    if self.dataset.columns.contains(&name) {
                        self.adjust.column = Some(name);
                        dirty = true;
                    } else {
                        writeln!(
                            out,
                            "{}",
                            format!("unknown column; choose from: {}", self.dataset.columns.join(", "))
                                .yellow()
                        )?;
                    }
                }
                Command::Hints => writeln!(out, "Hints so far: {}", self.hint_line())?,
                Command::Reset => {
                    let identity = self.state.identity.clone();
                    self.engine.reset(&identity)?;
                    self.state = self.engine.start(&identity, StartMode::Fresh)?;
                    self.adjust = ViewAdjust::default();
                    writeln!(out, "{}", "Progress reset. Back to mission 1.".yellow())?;
                    dirty = true;
                }
                Command::Help => render_help(out)?,
                Command::Quit => return Ok(SessionOutcome::Quit),
            }
        }
    }

    fn active_filter(&self) -> Result<ViewFilter> {
        let mission = self.engine.current(&self.state)?;
        Ok(self.adjust.apply(&mission.view))
    }

    /// Submit an answer; returns whether the mission advanced.
    fn answer<W: Write>(&mut self, raw: &str, out: &mut W) -> Result<bool> {
        let mission = self.engine.current(&self.state)?.clone();
        let filter = self.active_filter()?;
        let view = self.dataset.view(&filter);
        let result = self.engine.submit(&mut self.state, &mission, &view, raw)?;
        if let Some(hint) = result.hint.filter(|_| result.accepted) {
            writeln!(
                out,
                "{} {}",
                "✅ Correct!".green().bold(),
                format!("Hint token: {hint}").bright_white()
            )?;
            self.adjust = ViewAdjust::default();
            Ok(true)
        } else {
            writeln!(out, "{}", "❌ Incorrect, try again.".red())?;
            Ok(false)
        }
    }

    fn hint_line(&self) -> String {
        if self.state.hints.is_empty() {
            "(none yet)".to_string()
        } else {
            self.state.hints.join(" - ")
        }
    }

    fn render_mission<W: Write>(&self, out: &mut W) -> Result<()> {
        let mission = self.engine.current(&self.state)?;
        let filter = self.active_filter()?;
        let view = self.dataset.view(&filter);
        let total = self.engine.total();

        writeln!(out)?;
        writeln!(out, "{}", progress_bar(self.engine.progress(&self.state)).blue())?;
        writeln!(
            out,
            "{}",
            format!("🔍 Mission {}/{}: {}", mission.ordinal, total, mission.title)
                .bright_cyan()
                .bold()
        )?;
        writeln!(out, "{}", mission.prompt)?;
        writeln!(
            out,
            "   view: {} | years {} | month {} | {} points",
            view.column(),
            filter
                .years
                .or_else(|| self.dataset.year_bounds())
                .map_or_else(|| "-".to_string(), |(a, b)| format!("{a}-{b}")),
            filter.month.map_or_else(|| "all".to_string(), |m| m.to_string()),
            view.len()
        )?;
        writeln!(out, "   hints: {}", self.hint_line())?;
        writeln!(out, "   {}", "type :help for commands".dimmed())?;
        Ok(())
    }

    fn render_rows<W: Write>(&self, n: usize, out: &mut W) -> Result<()> {
        if self.engine.is_complete(&self.state) {
            writeln!(out, "All missions are complete.")?;
            return Ok(());
        }
        let view = self.dataset.view(&self.active_filter()?);
        writeln!(out, "{:<14} {}", self.dataset.date_column, view.column())?;
        for (date, value) in view.head(n) {
            writeln!(out, "{date:<14} {value:>6.2}")?;
        }
        if view.is_empty() {
            writeln!(out, "{}", "(no rows match the current view)".yellow())?;
        }
        Ok(())
    }

    fn render_completion<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out)?;
        writeln!(out, "{}", progress_bar(1.0).blue())?;
        writeln!(out, "{}", "🎉 All missions complete!".bright_green().bold())?;
        if let Some(elapsed) = self.state.elapsed() {
            let secs = elapsed.num_seconds().max(0);
            writeln!(out, "Total time: {} min {} s", secs / 60, secs % 60)?;
        }
        writeln!(out, "Hint tokens: {}", self.hint_line())?;
        writeln!(out, "Combine the tokens and enter the final passphrase.")?;
        Ok(())
    }
}

fn render_help<W: Write>(out: &mut W) -> Result<()> {
    writeln!(out, "Commands:")?;
    writeln!(out, "  :data [n]        show the latest n rows of the current view")?;
    writeln!(out, "  :years FROM TO   limit the view to a year range")?;
    writeln!(out, "  :month M|all     limit the view to one calendar month")?;
    writeln!(out, "  :column NAME     switch the data column")?;
    writeln!(out, "  :hints           list hint tokens collected so far")?;
    writeln!(out, "  :reset           wipe progress and start over")?;
    writeln!(out, "  :quit            leave (progress is kept)")?;
    writeln!(out, "Anything else is submitted as your answer.")?;
    Ok(())
}

fn progress_bar(ratio: f64) -> String {
    let target = ratio * usize_to_f64(BAR_WIDTH);
    let filled = (0..BAR_WIDTH)
        .take_while(|&i| usize_to_f64(i) < target)
        .count();
    format!(
        "[{}{}] {:>3.0}%",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        ratio * 100.0
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use enso_game::{MemoryStore, MissionSet};
    use std::io::Cursor;

    fn table() -> Dataset {
        Dataset::from_csv_str(
            "날짜,ONI index\n\
             2025년 02월,-0.4\n\
             2025년 01월,-0.6\n\
             2024년 08월,-0.2\n\
             2023년 12월,2.0\n",
        )
        .unwrap()
    }

    fn play(script: &str) -> (SessionOutcome, ProgressState, String) {
        let data = table();
        let engine = MissionEngine::new(MissionSet::decoder(), MemoryStore::new()).unwrap();
        let state = engine.start("testers", StartMode::Fresh).unwrap();
        let mut session = Session::new(&engine, &data, state);
        let mut out = Vec::new();
        let outcome = session.run(Cursor::new(script), &mut out).unwrap();
        (
            outcome,
            session.state().clone(),
            String::from_utf8(out).unwrap(),
        )
    }

    #[test]
    fn parses_commands_and_answers() {
        assert_eq!(parse_command(" 2025 "), Ok(Command::Answer("2025".into())));
        assert_eq!(parse_command(":data"), Ok(Command::Data(DEFAULT_ROWS)));
        assert_eq!(parse_command(":data 3"), Ok(Command::Data(3)));
        assert_eq!(parse_command(":years 2020 2023"), Ok(Command::Years(2020, 2023)));
        assert!(parse_command(":years 2023 2020").is_err());
        assert_eq!(parse_command(":month 8"), Ok(Command::Month(Some(8))));
        assert_eq!(parse_command(":month all"), Ok(Command::Month(None)));
        assert!(parse_command(":month 13").is_err());
        assert_eq!(
            parse_command(":column nino3.4 수온 평균"),
            Ok(Command::Column("nino3.4 수온 평균".into()))
        );
        assert_eq!(parse_command(":q"), Ok(Command::Quit));
        assert!(parse_command(":dance").is_err());
    }

    #[test]
    fn full_run_solves_the_passphrase() {
        // mean = (2.0 - 0.2 - 0.6 - 0.4) / 4 = 0.2
        let (outcome, state, out) = play("2025\n1\n1\n0.20\nenzo\nenso\n");
        assert_eq!(outcome, SessionOutcome::Solved);
        assert_eq!(state.passphrase_so_far(), "ENSO");
        assert!(out.contains("Hint token: O"));
        assert!(out.contains("Total time:"));
        assert!(out.contains("Incorrect, try again."));
        assert!(out.contains("Case closed"));
    }

    #[test]
    fn wrong_answers_allow_unlimited_retries() {
        let (outcome, state, out) = play("2024\n2023\n2025\n");
        assert_eq!(outcome, SessionOutcome::InputClosed);
        assert_eq!(state.current_mission, 2);
        assert_eq!(out.matches("Incorrect, try again.").count(), 2);
    }

    #[test]
    fn view_commands_change_the_judged_rows() {
        // With the view narrowed to 2023 the most recent year is 2023.
        let (_, state, out) = play(":years 2023 2023\n:data 2\n2023\n:quit\n");
        assert_eq!(state.current_mission, 2);
        assert!(out.contains("2023년 12월"));
        assert!(!out.contains("2025년 01월"));
    }

    #[test]
    fn reset_starts_over_and_quit_keeps_progress() {
        let (outcome, state, out) = play("2025\n:hints\n:reset\n:quit\n");
        assert_eq!(outcome, SessionOutcome::Quit);
        assert_eq!(state.current_mission, 1);
        assert!(state.hints.is_empty());
        assert!(out.contains("Hints so far: E"));
        assert!(out.contains("Progress reset"));
    }

    #[test]
    fn bad_commands_are_reported_not_fatal() {
        let (outcome, _, out) = play(":month 0\n:column nope\n:help\n:q\n");
        assert_eq!(outcome, SessionOutcome::Quit);
        assert!(out.contains("invalid month"));
        assert!(out.contains("unknown column"));
        assert!(out.contains("Commands:"));
    }

    #[test]
    fn progress_bar_fills_proportionally() {
        assert!(progress_bar(0.0).starts_with("[--------------------]"));
        assert!(progress_bar(0.5).starts_with("[##########----------]"));
        assert!(progress_bar(1.0).contains("100%"));
    }
}
