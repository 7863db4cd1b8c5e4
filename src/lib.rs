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
pub mod test;

pub use attestation::Attestation;
pub use block::Block;
pub use cli::{Cli, Command};
pub use committee::Committee;
pub use config::{Config, ProfileRates, SlashingConfig};
pub use error::SimError;
pub use events::{CellValue, Event, EventKind, EventStore, EventTable};
pub use hash::Hash16;
pub use ids::ValidatorId;
pub use l1::L1Outcome;
pub use partition::{Partition, PartitionAnalyzer, PartitionSnapshot, TimelineRow};
pub use simulator::{run, run_with_analysis, SimulationHandle};
pub use slashing::{signal_slashing, HeuristicStrategy, Proposal, SlashingLog, SlashingSignal};
pub use topology::Topology;
pub use validator::{Profile, Validator};
