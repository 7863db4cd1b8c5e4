use crate::config::Config;
use clap::Parser;
use std::path::{Path, PathBuf};

/// Command-line entry point for the simulator (§6, §9.4 ambient stack).
/// The direct analogue of the teacher's `CliOpts`: a thin `clap`-derived
/// wrapper that loads a config file and hands it to the library's
/// `run`/`run_with_analysis` entry points.
#[derive(Debug, Parser)]
#[clap(version, about = "Discrete-event simulator for a two-layer L1/L2 consensus protocol")]
pub struct Cli {
  #[clap(subcommand)]
  pub command: Command,
}

#[derive(Debug, clap::Subcommand)]
pub enum Command {
  /// Run the simulation once and write the event table to a CSV file.
  Run {
    #[clap(long, parse(from_os_str), help = "path to a JSON or TOML config file")]
    config: PathBuf,

    #[clap(
      long,
      parse(from_os_str),
      default_value = "events.csv",
      help = "path to write the resulting event table as CSV"
    )]
    out: PathBuf,
  },

  /// Run the simulation and print the partition-analysis timeline as CSV
  /// to stdout.
  Partitions {
    #[clap(long, parse(from_os_str), help = "path to a JSON or TOML config file")]
    config: PathBuf,
  },

  /// Run the simulation and print the slashing signal log as CSV to
  /// stdout.
  Slashing {
    #[clap(long, parse(from_os_str), help = "path to a JSON or TOML config file")]
    config: PathBuf,

    #[clap(
      long,
      default_value = "current",
      help = "slashing scoring heuristic: \"current\" or \"round-aware\""
    )]
    heuristic: String,
  },
}

/// Parses the `--heuristic` flag into the strategy enum the slashing
/// engine expects (§4.8).
pub fn parse_heuristic(name: &str) -> anyhow::Result<crate::slashing::HeuristicStrategy> {
  match name {
    "current" => Ok(crate::slashing::HeuristicStrategy::Current),
    "round-aware" | "round_aware" => Ok(crate::slashing::HeuristicStrategy::RoundAware),
    other => anyhow::bail!("unknown slashing heuristic: {other}"),
  }
}

/// Reads and deserializes a `Config` from `path`, inferring JSON vs. TOML
/// from the file extension and defaulting to JSON when the extension is
/// absent or unrecognized.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
  let text = std::fs::read_to_string(path)?;
  let config = match path.extension().and_then(|ext| ext.to_str()) {
    Some("toml") => toml::from_str(&text)?,
    _ => serde_json::from_str(&text)?,
  };
  Ok(config)
}
