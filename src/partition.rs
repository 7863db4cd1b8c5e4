use crate::{
  committee::Committee,
  config::Config,
  events::{EventKind, EventStore},
  ids::ValidatorId,
  topology::Topology,
};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// One connected component of the online-validator subgraph at a given
/// slot (§4.7).
#[derive(Debug, Clone)]
pub struct Partition {
  pub members: Vec<ValidatorId>,
  pub size: usize,
  pub density: f64,
  pub avg_degree: f64,
  pub committee_members_present: usize,
}

/// All partitions at one slot, plus whether the current committee can
/// reach a super-majority within any single one of them (§4.7).
#[derive(Debug, Clone)]
pub struct PartitionSnapshot {
  pub slot: u64,
  pub partitions: Vec<Partition>,
  pub can_reach_consensus: bool,
}

/// One row of `timeline()` (§4.7).
#[derive(Debug, Clone)]
pub struct TimelineRow {
  pub slot: u64,
  pub num_partitions: usize,
  pub largest_component_size: usize,
  pub can_reach_consensus: bool,
  pub online_count: usize,
  pub offline_count: usize,
}

/// Pure, read-only analysis layer over a finished simulation's event
/// store and static topology (§4.7). Every method here is a pure
/// function of already-recorded events; nothing here mutates the store.
pub struct PartitionAnalyzer<'a> {
  store: &'a EventStore,
  topology: &'a Topology,
  committees: &'a BTreeMap<u64, Committee>,
  config: &'a Config,
  index_of: HashMap<ValidatorId, usize>,
  id_of: Vec<ValidatorId>,
}

impl<'a> PartitionAnalyzer<'a> {
  pub fn new(
    store: &'a EventStore,
    topology: &'a Topology,
    committees: &'a BTreeMap<u64, Committee>,
    config: &'a Config,
    id_of: Vec<ValidatorId>,
  ) -> Self {
    let index_of = id_of
      .iter()
      .enumerate()
      .map(|(i, id)| (id.clone(), i))
      .collect();
    Self {
      store,
      topology,
      committees,
      config,
      index_of,
      id_of,
    }
  }

  fn epoch_of(&self, slot: u64) -> u64 {
    slot / self.config.slots_per_epoch
  }

  fn end_of_slot(&self, slot: u64) -> f64 {
    match self.store.slot_start_time(slot) {
      Some(start) => start + self.config.slot_duration_ms(),
      None => (slot + 1) as f64 * self.config.slot_duration_ms(),
    }
  }

  /// Online vector reconstructed by replaying `NodeOnline`/`NodeOffline`
  /// up to the end of slot `s` (§4.7). Validators start online at
  /// simulation time zero.
  pub fn network_state_at(&self, slot: u64) -> Vec<bool> {
    let mut online = vec![true; self.id_of.len()];
    let end = self.end_of_slot(slot);
    for event in self.store.iter() {
      if event.time_ms > end {
        break;
      }
      let flip = match event.kind {
        EventKind::NodeOnline => Some(true),
        EventKind::NodeOffline => Some(false),
        _ => None,
      };
      if let (Some(state), Some(actor)) = (flip, event.actor.as_ref()) {
        if let Some(&idx) = self.index_of.get(actor) {
          online[idx] = state;
        }
      }
    }
    online
  }

  /// Connected components of the subgraph induced by online nodes and
  /// mesh edges (§4.7).
  pub fn partitions_at(&self, slot: u64) -> PartitionSnapshot {
    let online = self.network_state_at(slot);
    let n = online.len();
    let mut visited = vec![false; n];
    let mut partitions = Vec::new();

    let epoch = self.epoch_of(slot);
    let committee_members: HashSet<&ValidatorId> = self
      .committees
      .get(&epoch)
      .map(|c| c.members.iter().collect())
      .unwrap_or_default();

    for start in 0..n {
      if visited[start] || !online[start] {
        continue;
      }
      let mut component = Vec::new();
      let mut queue = VecDeque::new();
      queue.push_back(start);
      visited[start] = true;
      while let Some(u) = queue.pop_front() {
        component.push(u);
        for v in self.topology.neighbors(u) {
          if online[v] && !visited[v] {
            visited[v] = true;
            queue.push_back(v);
          }
        }
      }

      let size = component.len();
      let mut edges = 0usize;
      for &u in &component {
        for v in self.topology.neighbors(u) {
          if component.contains(&v) {
            edges += 1;
          }
        }
      }
      edges /= 2;
      let possible_edges = if size > 1 { size * (size - 1) / 2 } else { 1 };
      let density = edges as f64 / possible_edges as f64;
      let avg_degree = if size > 0 {
        (2 * edges) as f64 / size as f64
      } else {
        0.0
      };
      let members: Vec<ValidatorId> =
        component.iter().map(|&i| self.id_of[i].clone()).collect();
      let committee_members_present =
        members.iter().filter(|m| committee_members.contains(m)).count();

      partitions.push(Partition {
        members,
        size,
        density,
        avg_degree,
        committee_members_present,
      });
    }

    let threshold = self.config.threshold();
    let can_reach_consensus = partitions
      .iter()
      .any(|p| p.committee_members_present >= threshold);

    PartitionSnapshot {
      slot,
      partitions,
      can_reach_consensus,
    }
  }

  pub fn can_reach_consensus_at(&self, slot: u64) -> bool {
    self.partitions_at(slot).can_reach_consensus
  }

  /// One row per absolute slot observed in the event store.
  pub fn timeline(&self) -> Vec<TimelineRow> {
    let max_slot = self
      .store
      .iter()
      .map(|e| e.slot)
      .max()
      .unwrap_or(0);

    (0..=max_slot)
      .map(|slot| {
        let snapshot = self.partitions_at(slot);
        let online_count: usize =
          snapshot.partitions.iter().map(|p| p.size).sum();
        let offline_count = self.id_of.len().saturating_sub(online_count);
        TimelineRow {
          slot,
          num_partitions: snapshot.partitions.len(),
          largest_component_size: snapshot
            .partitions
            .iter()
            .map(|p| p.size)
            .max()
            .unwrap_or(0),
          can_reach_consensus: snapshot.can_reach_consensus,
          online_count,
          offline_count,
        }
      })
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::events::Event;
  use crate::test::default_config;

  fn ids(n: usize) -> Vec<ValidatorId> {
    (0..n).map(ValidatorId::new).collect()
  }

  #[test]
  fn network_state_defaults_to_online() {
    let store = EventStore::new();
    let config = default_config();
    let validators: Vec<_> = (0..10)
      .map(|i| crate::validator::Validator::new(
        ValidatorId::new(i),
        crate::validator::Profile::Honest,
        config.honest,
        config.random_seed,
        i,
      ))
      .collect();
    let topology = Topology::build(&config, &validators);
    let committees = BTreeMap::new();
    let analyzer =
      PartitionAnalyzer::new(&store, &topology, &committees, &config, ids(10));
    let state = analyzer.network_state_at(0);
    assert!(state.iter().all(|&online| online));
  }

  #[test]
  fn offline_flip_is_reflected() {
    let mut store = EventStore::new();
    store.append(
      Event::new(0.0, 0, EventKind::SlotStart),
    );
    store.append(
      Event::new(0.0, 0, EventKind::NodeOffline).with_actor(ValidatorId::new(2)),
    );
    let config = default_config();
    let validators: Vec<_> = (0..10)
      .map(|i| crate::validator::Validator::new(
        ValidatorId::new(i),
        crate::validator::Profile::Honest,
        config.honest,
        config.random_seed,
        i,
      ))
      .collect();
    let topology = Topology::build(&config, &validators);
    let committees = BTreeMap::new();
    let analyzer =
      PartitionAnalyzer::new(&store, &topology, &committees, &config, ids(10));
    let state = analyzer.network_state_at(0);
    assert!(!state[2]);
    assert!(state[0]);
  }

  #[test]
  fn partition_sizes_sum_to_online_count() {
    let store = EventStore::new();
    let config = default_config();
    let validators: Vec<_> = (0..30)
      .map(|i| crate::validator::Validator::new(
        ValidatorId::new(i),
        crate::validator::Profile::Honest,
        config.honest,
        config.random_seed,
        i,
      ))
      .collect();
    let topology = Topology::build(&config, &validators);
    let committees = BTreeMap::new();
    let analyzer =
      PartitionAnalyzer::new(&store, &topology, &committees, &config, ids(30));
    let snapshot = analyzer.partitions_at(0);
    let total: usize = snapshot.partitions.iter().map(|p| p.size).sum();
    assert_eq!(total, 30);
  }
}
