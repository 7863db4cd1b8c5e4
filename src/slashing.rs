use crate::{
  committee::Committee,
  config::Config,
  events::{EventKind, EventStore},
  hash::short_digest_hex,
  ids::ValidatorId,
};
use std::collections::{BTreeMap, HashMap, HashSet};

/// A canonical, sorted set of validators a proposer is signalling for
/// slashing (§4.8). Its id is the first 8 hex digits of the digest of the
/// comma-joined member list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
  pub ids: Vec<ValidatorId>,
}

impl Proposal {
  pub fn new(mut ids: Vec<ValidatorId>) -> Self {
    ids.sort();
    ids.dedup();
    Self { ids }
  }

  pub fn id(&self) -> String {
    let joined = self
      .ids
      .iter()
      .map(ValidatorId::as_str)
      .collect::<Vec<_>>()
      .join(",");
    short_digest_hex(joined.as_bytes())
  }
}

/// One row of the slashing signal log: a proposer's vote, at a given
/// slot, for a specific proposal (§4.8).
#[derive(Debug, Clone)]
pub struct SlashingSignal {
  pub slot: u64,
  pub round: u64,
  pub proposer: ValidatorId,
  pub proposal: Proposal,
  pub proposal_id: String,
}

#[derive(Debug, Default)]
pub struct SlashingLog {
  pub signals: Vec<SlashingSignal>,
}

/// The two scoring strategies from §4.8. A closed, two-member set is
/// dispatched with a `match`, not a trait object (§9 design notes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeuristicStrategy {
  Current,
  RoundAware,
}

/// Fraction of an epoch's proposed slots in which each committee member
/// of that epoch failed to produce an `AttestationCreated` (§4.8).
/// Slots of the epoch in which no block was proposed are excluded from
/// both the numerator and denominator.
fn epoch_summary(
  store: &EventStore,
  committee: &Committee,
  epoch: u64,
  slots_per_epoch: u64,
) -> HashMap<ValidatorId, f64> {
  let start = epoch * slots_per_epoch;
  let end = start + slots_per_epoch;
  let proposed_slots: Vec<u64> = (start..end)
    .filter(|&s| {
      store
        .events_for_slot(s)
        .iter()
        .any(|e| e.kind == EventKind::BlockProposed)
    })
    .collect();

  let mut result = HashMap::new();
  if proposed_slots.is_empty() {
    for member in &committee.members {
      result.insert(member.clone(), 0.0);
    }
    return result;
  }

  for member in &committee.members {
    let missed = proposed_slots
      .iter()
      .filter(|&&s| {
        !store.events_for_slot(s).iter().any(|e| {
          e.kind == EventKind::AttestationCreated && e.actor.as_ref() == Some(member)
        })
      })
      .count();
    result.insert(member.clone(), missed as f64 / proposed_slots.len() as f64);
  }
  result
}

fn is_online_at(store: &EventStore, id: &ValidatorId, time_ms: f64) -> bool {
  let mut online = true;
  for event in store.iter() {
    if event.time_ms > time_ms {
      break;
    }
    if event.actor.as_ref() == Some(id) {
      match event.kind {
        EventKind::NodeOnline => online = true,
        EventKind::NodeOffline => online = false,
        _ => {}
      }
    }
  }
  online
}

/// Memoizes per-epoch summaries across the whole run, since agreement
/// checks for consecutive slots in the same epoch repeatedly need the
/// same lookback window.
struct SummaryCache<'a> {
  store: &'a EventStore,
  committees: &'a BTreeMap<u64, Committee>,
  slots_per_epoch: u64,
  cache: HashMap<u64, HashMap<ValidatorId, f64>>,
}

impl<'a> SummaryCache<'a> {
  fn new(
    store: &'a EventStore,
    committees: &'a BTreeMap<u64, Committee>,
    slots_per_epoch: u64,
  ) -> Self {
    Self {
      store,
      committees,
      slots_per_epoch,
      cache: HashMap::new(),
    }
  }

  fn fraction_missed(&mut self, id: &ValidatorId, epoch: u64) -> Option<f64> {
    let committee = self.committees.get(&epoch)?;
    if !committee.members.contains(id) {
      return None;
    }
    let summary = self.cache.entry(epoch).or_insert_with(|| {
      epoch_summary(self.store, committee, epoch, self.slots_per_epoch)
    });
    summary.get(id).copied()
  }

  /// The proposer agrees with `proposal` iff every id in it had
  /// `fraction_missed >= 0.75` in at least one of the last `lookback`
  /// epochs before `current_epoch` (§4.8).
  fn agrees(&mut self, proposal: &Proposal, current_epoch: u64, lookback: u64) -> bool {
    let lo = current_epoch.saturating_sub(lookback);
    proposal.ids.iter().all(|id| {
      (lo..current_epoch).any(|epoch| {
        self.fraction_missed(id, epoch).map(|f| f >= 0.75).unwrap_or(false)
      })
    })
  }
}

/// Runs the slashing-signalling game over a finished simulation's event
/// stream (§4.8). This is a pure derived-stream computation: it never
/// mutates `store` and is not invoked automatically by `run`/
/// `run_with_analysis` (§4.9).
pub fn signal_slashing(
  store: &EventStore,
  committees: &BTreeMap<u64, Committee>,
  config: &Config,
  strategy: HeuristicStrategy,
) -> SlashingLog {
  let round_size = config.slashing.round_size.max(1);
  let lookback = config.slashing.lookback_epochs;
  let slots_per_epoch = config.slots_per_epoch;

  let mut cache = SummaryCache::new(store, committees, slots_per_epoch);
  let mut known_proposals: HashMap<String, Proposal> = HashMap::new();
  let mut log = SlashingLog::default();

  let max_slot = committees
    .values()
    .flat_map(|c| c.proposer_schedule.keys().copied())
    .max()
    .unwrap_or(0);

  for slot in 0..=max_slot {
    let epoch = slot / slots_per_epoch;
    let committee = match committees.get(&epoch) {
      Some(c) => c,
      None => continue,
    };
    let proposer = match committee.proposer_for(slot) {
      Some(p) => p.clone(),
      None => continue,
    };

    let slot_start = store
      .slot_start_time(slot)
      .unwrap_or(slot as f64 * config.slot_duration_ms());
    if !is_online_at(store, &proposer, slot_start) {
      continue;
    }

    let mut candidates: Vec<Proposal> = Vec::new();
    if epoch >= 1 {
      if let Some(prev_committee) = committees.get(&(epoch - 1)) {
        let summary = epoch_summary(store, prev_committee, epoch - 1, slots_per_epoch);
        let ids: Vec<ValidatorId> = summary
          .into_iter()
          .filter(|(_, fraction)| *fraction == 1.0)
          .map(|(id, _)| id)
          .collect();
        if !ids.is_empty() {
          candidates.push(Proposal::new(ids));
        }
      }
    }
    candidates.extend(known_proposals.values().cloned());

    let mut seen = HashSet::new();
    let mut best: Option<(Proposal, f64)> = None;
    for proposal in candidates {
      let id = proposal.id();
      if !seen.insert(id.clone()) {
        continue;
      }
      let agree = cache.agrees(&proposal, epoch, lookback);
      let score = match strategy {
        HeuristicStrategy::Current => {
          if agree {
            -(proposal.ids.len() as f64)
          } else {
            0.0
          }
        }
        HeuristicStrategy::RoundAware => {
          if !agree {
            0.0
          } else {
            let round = slot / round_size;
            let existing_votes = log
              .signals
              .iter()
              .filter(|s| s.round == round && s.proposal_id == id)
              .count() as f64;
            let slot_in_round = slot % round_size;
            let slots_remaining = (round_size - slot_in_round - 1) as f64;
            if 1.0 + existing_votes + slots_remaining <= round_size as f64 / 2.0 {
              0.0
            } else {
              -((existing_votes + 1.0).powf(0.1)) * proposal.ids.len() as f64
            }
          }
        }
      };

      if score < 0.0 {
        let better = match &best {
          Some((_, best_score)) => score < *best_score,
          None => true,
        };
        if better {
          best = Some((proposal, score));
        }
      }
    }

    if let Some((winner, _)) = best {
      let round = slot / round_size;
      let id = winner.id();
      known_proposals.entry(id.clone()).or_insert_with(|| winner.clone());
      log.signals.push(SlashingSignal {
        slot,
        round,
        proposer,
        proposal: winner,
        proposal_id: id,
      });
    }
  }

  log
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn proposal_id_is_stable_under_reordering() {
    let a = Proposal::new(vec![ValidatorId::new(2), ValidatorId::new(1)]);
    let b = Proposal::new(vec![ValidatorId::new(1), ValidatorId::new(2)]);
    assert_eq!(a.id(), b.id());
  }

  #[test]
  fn proposal_id_differs_for_different_sets() {
    let a = Proposal::new(vec![ValidatorId::new(1)]);
    let b = Proposal::new(vec![ValidatorId::new(2)]);
    assert_ne!(a.id(), b.id());
  }

  #[test]
  fn empty_store_produces_no_signals() {
    let store = EventStore::new();
    let committees = BTreeMap::new();
    let config = crate::test::default_config();
    let log = signal_slashing(&store, &committees, &config, HeuristicStrategy::Current);
    assert!(log.signals.is_empty());
  }
}
