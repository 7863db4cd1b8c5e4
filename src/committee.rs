use crate::{error::SimError, ids::ValidatorId};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::collections::BTreeMap;

/// Seed for the once-per-epoch committee draw (§4.3).
pub fn epoch_seed(base_seed: u64, epoch: u64) -> u64 {
  base_seed.wrapping_add(epoch.wrapping_mul(1000))
}

/// Seed for the once-per-slot proposer draw (§4.3).
pub fn slot_seed(base_seed: u64, slot: u64) -> u64 {
  base_seed.wrapping_add(slot.wrapping_mul(10))
}

/// The committee for one epoch: an ordered member list and the proposer
/// assigned to each absolute slot of the epoch (§3 Data Model).
#[derive(Debug, Clone)]
pub struct Committee {
  pub epoch: u64,
  pub members: Vec<ValidatorId>,
  pub proposer_schedule: BTreeMap<u64, ValidatorId>,
}

impl Committee {
  /// Draws a committee for `epoch` out of `validator_set`, seeded
  /// deterministically from `base_seed` (§4.3). `validator_set` is the
  /// full pool; members are drawn without replacement via a Fisher-Yates
  /// partial shuffle (`rand::seq::index::sample`), and each slot's
  /// proposer is drawn uniformly from the resulting member list with its
  /// own per-slot seed.
  pub fn draw(
    base_seed: u64,
    epoch: u64,
    validator_set: &[ValidatorId],
    committee_size: usize,
    slots_per_epoch: u64,
  ) -> Result<Self, SimError> {
    if validator_set.len() < committee_size {
      return Err(SimError::ValidatorPoolTooSmall {
        needed: committee_size,
        available: validator_set.len(),
      });
    }

    let mut rng = ChaCha20Rng::seed_from_u64(epoch_seed(base_seed, epoch));
    let chosen =
      rand::seq::index::sample(&mut rng, validator_set.len(), committee_size);
    let members: Vec<ValidatorId> = chosen
      .into_iter()
      .map(|i| validator_set[i].clone())
      .collect();

    let mut proposer_schedule = BTreeMap::new();
    for offset in 0..slots_per_epoch {
      let absolute_slot = epoch * slots_per_epoch + offset;
      let mut slot_rng =
        ChaCha20Rng::seed_from_u64(slot_seed(base_seed, absolute_slot));
      let pick = rand::Rng::gen_range(&mut slot_rng, 0..members.len());
      proposer_schedule.insert(absolute_slot, members[pick].clone());
    }

    Ok(Self {
      epoch,
      members,
      proposer_schedule,
    })
  }

  pub fn proposer_for(&self, slot: u64) -> Option<&ValidatorId> {
    self.proposer_schedule.get(&slot)
  }

  /// Committee members minus the slot's proposer (§4.3).
  pub fn attesters_for(&self, slot: u64) -> Vec<ValidatorId> {
    match self.proposer_for(slot) {
      Some(proposer) => self
        .members
        .iter()
        .filter(|m| *m != proposer)
        .cloned()
        .collect(),
      None => self.members.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn pool(n: usize) -> Vec<ValidatorId> {
    (0..n).map(ValidatorId::new).collect()
  }

  #[test]
  fn deterministic_across_runs() {
    let pool = pool(100);
    let a = Committee::draw(42, 0, &pool, 48, 4).unwrap();
    let b = Committee::draw(42, 0, &pool, 48, 4).unwrap();
    assert_eq!(a.members, b.members);
    assert_eq!(a.proposer_schedule, b.proposer_schedule);
  }

  #[test]
  fn proposer_always_a_member() {
    let pool = pool(100);
    let committee = Committee::draw(42, 1, &pool, 48, 8).unwrap();
    for slot in 8..16 {
      let proposer = committee.proposer_for(slot).unwrap();
      assert!(committee.members.contains(proposer));
    }
  }

  #[test]
  fn too_small_pool_is_an_error() {
    let pool = pool(10);
    assert!(Committee::draw(42, 0, &pool, 48, 4).is_err());
  }

  #[test]
  fn attesters_exclude_proposer() {
    let pool = pool(100);
    let committee = Committee::draw(42, 0, &pool, 48, 4).unwrap();
    let proposer = committee.proposer_for(0).unwrap().clone();
    let attesters = committee.attesters_for(0);
    assert_eq!(attesters.len(), committee.members.len() - 1);
    assert!(!attesters.contains(&proposer));
  }
}
