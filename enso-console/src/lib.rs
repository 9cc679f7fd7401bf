//! Terminal front-end for the ENSO cipher challenge.
//!
//! Wires the platform-agnostic `enso-game` engine to a CSV table on disk (or
//! the bundled one), a shared CSV progress file and a line-oriented terminal
//! session.

pub mod loader;
pub mod report;
pub mod session;
pub mod store;

use anyhow::{Context, Result};
use enso_game::MissionSet;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};

/// Resolve `--missions`: a built-in set name or a path to a JSON mission set.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a mission set.
pub fn load_mission_set(arg: &str) -> Result<MissionSet> {
    match arg {
        "decoder" => Ok(MissionSet::decoder()),
        "case-file" => Ok(MissionSet::case_file()),
        path => {
            let path = Path::new(path);
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read mission set {}", path.display()))?;
            MissionSet::from_json(&json)
                .with_context(|| format!("invalid mission set {}", path.display()))
        }
    }
}

/// Where listings and leaderboards are written.
pub enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    /// # Errors
    ///
    /// Returns an error if the output file cannot be created.
    pub fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    pub fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    /// # Errors
    ///
    /// Returns an error if buffered output cannot be flushed.
    pub fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::PathBuf;

    pub fn temp_path(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "enso-console-{}-{label}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ))
    }
}
