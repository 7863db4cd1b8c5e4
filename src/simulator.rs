use crate::{
  block::GENESIS_PARENT_HASH,
  committee::Committee,
  config::Config,
  error::SimError,
  events::{Event, EventKind, EventStore, EventTable},
  ids::ValidatorId,
  partition::PartitionAnalyzer,
  slot,
  topology::Topology,
  validator::{Profile, Validator},
};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::collections::{BTreeMap, HashMap};
use tracing::info;

/// Owns every piece of mutable and static simulation state: the event
/// store, the static topology, the validator map, the last proposed
/// block's hash, and the committee drawn for each epoch so far (§4.9,
/// §9 "Global mutable state"). All subsystems take this value, or
/// immutable views derived from it, by reference.
pub struct Simulator {
  store: EventStore,
  topology: Topology,
  validators: HashMap<ValidatorId, Validator>,
  id_of: Vec<ValidatorId>,
  index_of: HashMap<ValidatorId, usize>,
  committees: BTreeMap<u64, Committee>,
  last_block_hash: String,
  propagation_rng: ChaCha20Rng,
}

/// Splits `total` honest/lazy/byzantine validators by the config ratios.
/// Rounding is applied to the honest and lazy counts only; byzantine gets
/// whatever remains, so the three counts always sum to `total` exactly.
fn assign_profiles(config: &Config) -> Vec<Profile> {
  let total = config.total_validators;
  let honest_count = (total as f64 * config.honest_ratio).round() as usize;
  let lazy_count =
    (total as f64 * config.lazy_ratio).round() as usize;
  let honest_count = honest_count.min(total);
  let lazy_count = lazy_count.min(total - honest_count);
  (0..total)
    .map(|i| {
      if i < honest_count {
        Profile::Honest
      } else if i < honest_count + lazy_count {
        Profile::Lazy
      } else {
        Profile::Byzantine
      }
    })
    .collect()
}

impl Simulator {
  fn new(config: &Config) -> Self {
    let id_of: Vec<ValidatorId> =
      (0..config.total_validators).map(ValidatorId::new).collect();
    let profiles = assign_profiles(config);

    let mut validators = HashMap::with_capacity(id_of.len());
    for (i, id) in id_of.iter().enumerate() {
      let profile = profiles[i];
      let rates = match profile {
        Profile::Honest => config.honest,
        Profile::Lazy => config.lazy,
        Profile::Byzantine => config.byzantine,
      };
      validators.insert(
        id.clone(),
        Validator::new(id.clone(), profile, rates, config.random_seed, i),
      );
    }

    let ordered_validators: Vec<Validator> =
      id_of.iter().map(|id| validators[id].clone()).collect();
    let topology = Topology::build(config, &ordered_validators);

    let index_of: HashMap<ValidatorId, usize> = id_of
      .iter()
      .enumerate()
      .map(|(i, id)| (id.clone(), i))
      .collect();

    Self {
      store: EventStore::new(),
      topology,
      validators,
      id_of,
      index_of,
      committees: BTreeMap::new(),
      last_block_hash: GENESIS_PARENT_HASH.to_owned(),
      propagation_rng: ChaCha20Rng::seed_from_u64(config.random_seed),
    }
  }

  /// Runs the full epoch/slot driver loop (§4.9), appending every event
  /// the run produces to the owned store.
  fn drive(&mut self, config: &Config) -> Result<(), SimError> {
    self.store.append(
      Event::new(0.0, 0, EventKind::SimulationStart)
        .with_data("total_validators", config.total_validators)
        .with_data("epochs", config.epochs_to_simulate),
    );
    info!(
      total_validators = config.total_validators,
      epochs = config.epochs_to_simulate,
      committee_size = config.committee_size,
      "simulation started"
    );

    let slot_duration_ms = config.slot_duration_ms();
    let mut final_slot_end = 0.0;

    for epoch in 0..config.epochs_to_simulate {
      let epoch_start_slot = epoch * config.slots_per_epoch;
      let epoch_start_ms =
        epoch_start_slot as f64 * slot_duration_ms;

      let committee = Committee::draw(
        config.random_seed,
        epoch,
        &self.id_of,
        config.committee_size,
        config.slots_per_epoch,
      )?;

      self.store.append(
        Event::new(epoch_start_ms, epoch_start_slot, EventKind::EpochStart)
          .with_data("epoch", epoch),
      );

      let committee_ids: Vec<&str> =
        committee.members.iter().map(ValidatorId::as_str).collect();
      let committee_json = serde_json::to_string(&committee_ids)
        .expect("committee member ids are always valid JSON strings");
      self.store.append(
        Event::new(
          epoch_start_ms,
          epoch_start_slot,
          EventKind::CommitteeSelected,
        )
        .with_data("epoch", epoch)
        .with_data("committee_size", committee.members.len())
        .with_data("committee", committee_json),
      );
      info!(epoch, committee_size = committee.members.len(), "committee drawn");

      self.committees.insert(epoch, committee.clone());

      for offset in 0..config.slots_per_epoch {
        let slot = epoch_start_slot + offset;
        slot::run_slot(
          config,
          &self.topology,
          &self.id_of,
          &self.index_of,
          &mut self.validators,
          &committee,
          slot,
          &mut self.last_block_hash,
          &mut self.propagation_rng,
          &mut self.store,
        );
        final_slot_end = (slot as f64 + 1.0) * slot_duration_ms;
      }
    }

    self.store.append(Event::new(
      final_slot_end,
      config.epochs_to_simulate * config.slots_per_epoch,
      EventKind::SimulationEnd,
    ));
    info!(events = self.store.len(), "simulation finished");

    Ok(())
  }
}

/// A finished simulation's read-only state, handed back by
/// `run_with_analysis` so a caller can additionally build a
/// `PartitionAnalyzer` over it (§6 "External interfaces"). Splitting this
/// out of `Simulator` is what lets the analyzer borrow the store and
/// topology without fighting the borrow checker over a value that also
/// needs a `&mut` driver loop during the run itself.
pub struct SimulationHandle {
  store: EventStore,
  topology: Topology,
  committees: BTreeMap<u64, Committee>,
  config: Config,
  id_of: Vec<ValidatorId>,
}

impl SimulationHandle {
  pub fn store(&self) -> &EventStore {
    &self.store
  }

  pub fn committees(&self) -> &BTreeMap<u64, Committee> {
    &self.committees
  }

  /// Builds a `PartitionAnalyzer` borrowing this handle's store, topology
  /// and committees (§4.7).
  pub fn analyzer(&self) -> PartitionAnalyzer<'_> {
    PartitionAnalyzer::new(
      &self.store,
      &self.topology,
      &self.committees,
      &self.config,
      self.id_of.clone(),
    )
  }
}

/// Validates `config`, runs one full simulation, and returns the
/// resulting event table (§6).
pub fn run(config: &Config) -> Result<EventTable, SimError> {
  config.validate()?;
  let mut sim = Simulator::new(config);
  sim.drive(config)?;
  Ok(EventTable::from_store(&sim.store))
}

/// As `run`, but also returns a `SimulationHandle` exposing the
/// `PartitionAnalyzer` over the finished event stream (§6).
pub fn run_with_analysis(
  config: &Config,
) -> Result<(EventTable, SimulationHandle), SimError> {
  config.validate()?;
  let mut sim = Simulator::new(config);
  sim.drive(config)?;
  let table = EventTable::from_store(&sim.store);
  let handle = SimulationHandle {
    store: sim.store,
    topology: sim.topology,
    committees: sim.committees,
    config: config.clone(),
    id_of: sim.id_of,
  };
  Ok((table, handle))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test::default_config;

  #[test]
  fn run_produces_simulation_start_and_end() {
    let config = default_config();
    let table = run(&config).unwrap();
    let event_type_col = table
      .columns
      .iter()
      .position(|c| c == "event_type")
      .unwrap();
    let kinds: Vec<String> = table
      .rows
      .iter()
      .map(|row| row[event_type_col].as_ref().unwrap().to_csv_field())
      .collect();
    assert_eq!(kinds.first().unwrap(), "SimulationStart");
    assert_eq!(kinds.last().unwrap(), "SimulationEnd");
  }

  #[test]
  fn same_seed_same_config_is_deterministic() {
    let config = default_config();
    let a = run(&config).unwrap();
    let b = run(&config).unwrap();
    assert_eq!(a.columns, b.columns);
    assert_eq!(a.rows.len(), b.rows.len());
  }

  #[test]
  fn rejects_invalid_config_before_producing_events() {
    let mut config = default_config();
    config.committee_size = config.total_validators + 1;
    assert!(run(&config).is_err());
  }

  #[test]
  fn run_with_analysis_exposes_a_working_analyzer() {
    let config = default_config();
    let (table, handle) = run_with_analysis(&config).unwrap();
    assert!(!table.is_empty());
    let timeline = handle.analyzer().timeline();
    assert!(!timeline.is_empty());
  }
}
