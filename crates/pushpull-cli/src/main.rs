// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `pushpull`: drive push/pull constraints from a scenario file and manage the
//! persisted defaults.
//!
//! # Usage
//! ```text
//! pushpull simulate scenario.json [--output frames.jsonl]
//! pushpull prefs show | set <key> <value> | reset | path
//! ```
//!
//! Frames are written as JSON lines on stdout (or `--output`); logs go to
//! stderr, filtered by `RUST_LOG` or the `log_filter` preference.

// The CLI is expected to print to stdout.
#![allow(clippy::print_stdout)]

mod scenario;

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pushpull_config::{ConstraintPrefs, FsPrefsStore, PrefsService};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::scenario::{validate, Scenario, Simulation};

#[derive(Parser, Debug)]
#[command(author, version, about = "Push/pull distance constraint tools")]
struct Args {
    /// Directory holding preference files (defaults to the platform config dir)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate a scenario frame by frame and emit JSON lines
    Simulate {
        /// Scenario JSON file
        scenario: PathBuf,
        /// Write frames here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Show or edit persisted preferences
    Prefs {
        #[command(subcommand)]
        action: PrefsAction,
    },
}

#[derive(Subcommand, Debug)]
enum PrefsAction {
    /// Print the effective preferences as JSON
    Show,
    /// Set one preference (default_push, default_pull, degenerate_policy, log_filter)
    Set {
        /// Preference name
        key: String,
        /// New value
        value: String,
    },
    /// Restore defaults
    Reset,
    /// Print the preferences file location
    Path,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let store = match &args.config_dir {
        Some(dir) => FsPrefsStore::in_dir(dir),
        None => FsPrefsStore::user().context("locate preferences")?,
    };
    let config = PrefsService::new(store);
    let loaded = config.load();
    let prefs = loaded.as_ref().cloned().unwrap_or_default();

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&prefs.log_filter)
            .with_context(|| format!("invalid log_filter {:?}", prefs.log_filter))?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
    if let Err(err) = &loaded {
        warn!(%err, "preferences unreadable, using defaults");
    }

    match args.cmd {
        Command::Simulate { scenario, output } => simulate(&scenario, output, &prefs),
        Command::Prefs { action } => run_prefs(&config, prefs, action),
    }
}

fn simulate(path: &Path, output: Option<PathBuf>, prefs: &ConstraintPrefs) -> Result<()> {
    let text =
        fs::read_to_string(path).with_context(|| format!("read scenario {}", path.display()))?;
    let scenario = Scenario::from_json(&text)?;
    validate(&scenario)?;
    let frames = scenario.frames.frames()?;
    let mut sim = Simulation::build(&scenario, prefs.settings())?;

    let sink: Box<dyn Write> = match &output {
        Some(file) => Box::new(
            fs::File::create(file).with_context(|| format!("create {}", file.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    let mut out = BufWriter::new(sink);

    let mut failures = 0_usize;
    for frame in &frames {
        let record = sim.step(*frame)?;
        failures += record
            .constraints
            .values()
            .filter(|c| c.failure.is_some())
            .count();
        serde_json::to_writer(&mut out, &record)?;
        writeln!(out)?;
    }
    out.flush()?;

    if failures > 0 {
        warn!(failures, "some constraint evaluations failed");
    }
    info!(
        frames = frames.len(),
        constraints = sim.scene().nodes().count(),
        "simulation finished"
    );
    Ok(())
}

fn run_prefs(
    config: &PrefsService<FsPrefsStore>,
    mut prefs: ConstraintPrefs,
    action: PrefsAction,
) -> Result<()> {
    match action {
        PrefsAction::Show => {
            println!("{}", serde_json::to_string_pretty(&prefs)?);
        }
        PrefsAction::Set { key, value } => {
            config.update(&mut prefs, &key, &value)?;
            info!(%key, %value, "preference updated");
        }
        PrefsAction::Reset => {
            config.reset().context("save preferences")?;
            info!("preferences reset");
        }
        PrefsAction::Path => {
            println!("{}", config.store().path().display());
        }
    }
    Ok(())
}
