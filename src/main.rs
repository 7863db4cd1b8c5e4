mod attestation;
mod block;
mod cli;
mod committee;
mod config;
mod error;
mod events;
mod hash;
mod ids;
mod l1;
mod partition;
mod propagate;
mod simulator;
mod slashing;
mod slot;
mod topology;
mod validator;

#[cfg(test)]
mod test;

use {
  cli::{Cli, Command},
  clap::Parser,
  tracing::{info, Level},
  tracing_subscriber::{
    filter::filter_fn,
    prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
    Layer,
  },
};

fn init_logging() {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::fmt::layer().with_filter(filter_fn(move |metadata| {
        metadata.level() <= &Level::INFO
      })),
    )
    .init();
}

fn main() -> anyhow::Result<()> {
  init_logging();

  let cli = Cli::parse();

  match cli.command {
    Command::Run { config, out } => {
      let config = cli::load_config(&config)?;
      info!(
        total_validators = config.total_validators,
        committee_size = config.committee_size,
        epochs = config.epochs_to_simulate,
        "starting simulation run"
      );
      let table = simulator::run(&config)?;
      std::fs::write(&out, table.to_csv()?)?;
      info!(rows = table.len(), path = %out.display(), "wrote event table");
    }

    Command::Partitions { config } => {
      let config = cli::load_config(&config)?;
      let (table, handle) = simulator::run_with_analysis(&config)?;
      info!(rows = table.len(), "simulation complete, analyzing partitions");

      let analyzer = handle.analyzer();
      println!(
        "slot,num_partitions,largest_component_size,can_reach_consensus,online_count,offline_count"
      );
      for row in analyzer.timeline() {
        println!(
          "{},{},{},{},{},{}",
          row.slot,
          row.num_partitions,
          row.largest_component_size,
          row.can_reach_consensus,
          row.online_count,
          row.offline_count,
        );
      }
    }

    Command::Slashing { config, heuristic } => {
      let config = cli::load_config(&config)?;
      let (_table, handle) = simulator::run_with_analysis(&config)?;
      info!("simulation complete, signalling slashing proposals");

      let log = slashing::signal_slashing(
        handle.store(),
        handle.committees(),
        &config,
        cli::parse_heuristic(&heuristic)?,
      );
      println!("slot,round,proposer,proposal_id,proposal_size");
      for signal in &log.signals {
        println!(
          "{},{},{},{},{}",
          signal.slot,
          signal.round,
          signal.proposer,
          signal.proposal_id,
          signal.proposal.ids.len(),
        );
      }
    }
  }

  Ok(())
}
