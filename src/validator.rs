use crate::{config::ProfileRates, hash, ids::ValidatorId};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Fixed-at-creation behaviour class of a validator (§3 Data Model).
/// A closed, three-member set is better modelled as an enum with `match`
/// dispatch than as a trait object (§9 design notes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
  Honest,
  Lazy,
  Byzantine,
}

/// A single validator's fixed identity and profile, plus the mutable
/// per-slot state (`is_online`) and the independent PRNG that drives all
/// of its stochastic decisions.
///
/// The PRNG is seeded with `base_seed + validator_index` (§9 design
/// notes: "Random sources"), so per-validator decisions are reproducible
/// regardless of the order slots or validators are iterated in.
#[derive(Debug, Clone)]
pub struct Validator {
  pub id: ValidatorId,
  pub profile: Profile,
  pub rates: ProfileRates,
  pub is_online: bool,
  pub is_private: bool,
  rng: ChaCha8Rng,
}

impl Validator {
  pub fn new(
    id: ValidatorId,
    profile: Profile,
    rates: ProfileRates,
    base_seed: u64,
    index: usize,
  ) -> Self {
    let mut rng = ChaCha8Rng::seed_from_u64(base_seed.wrapping_add(index as u64));
    let is_private = rng.gen_bool(rates.private_peer_prob.clamp(0.0, 1.0));
    Self {
      id,
      profile,
      rates,
      is_online: true,
      is_private,
      rng,
    }
  }

  /// Runs the online/offline transition for one slot start (§4.2).
  /// Returns `Some(true)` if the validator just came online, `Some(false)`
  /// if it just went offline, `None` if nothing changed.
  pub fn transition_online(&mut self) -> Option<bool> {
    if self.is_online {
      if self.rng.gen_bool(self.rates.downtime_prob.clamp(0.0, 1.0)) {
        self.is_online = false;
        return Some(false);
      }
    } else if self.rng.gen_bool(self.rates.recovery_prob.clamp(0.0, 1.0)) {
      self.is_online = true;
      return Some(true);
    }
    None
  }

  /// Decides whether the scheduled proposer proposes this slot (§4.2).
  pub fn decide_propose(&mut self, slot: u64) -> bool {
    if !self.is_online {
      return false;
    }
    if self.profile == Profile::Byzantine && slot % 10 == 0 {
      return false;
    }
    self.rng.gen_bool(self.rates.proposal_rate.clamp(0.0, 1.0))
  }

  /// Decides whether a committee member attests, given it has received the
  /// block and has `time_remaining_ms` until the attestation deadline
  /// (§4.2). `block_proposer` is hashed to implement Byzantine selective
  /// withholding.
  pub fn decide_attest(
    &mut self,
    block_proposer: &ValidatorId,
    time_remaining_ms: f64,
  ) -> bool {
    if !self.is_online {
      return false;
    }
    const PROCESSING_FLOOR_MS: f64 = 500.0;
    if time_remaining_ms <= PROCESSING_FLOOR_MS {
      return false;
    }
    if self.profile == Profile::Byzantine
      && hash::small_hash_u64(block_proposer.as_str().as_bytes()) % 5 == 0
    {
      return false;
    }
    let time_factor = if time_remaining_ms < 1_000.0 {
      0.5
    } else if time_remaining_ms < 3_000.0 {
      0.8
    } else {
      1.0
    };
    self
      .rng
      .gen_bool((self.rates.attestation_rate * time_factor).clamp(0.0, 1.0))
  }

  /// Draws a response delay (time from block receipt to attestation
  /// creation) from the validator's profile Gaussian, clamped to a 100 ms
  /// floor (§4.5).
  pub fn draw_response_delay_ms(&mut self) -> f64 {
    let normal =
      Normal::new(self.rates.response_mean_ms, self.rates.response_std_ms.max(0.0))
        .expect("response_std_ms must be finite and non-negative");
    normal.sample(&mut self.rng).max(100.0)
  }

  /// Draws a placeholder transaction count for a proposed block. The core
  /// protocol is silent on how many transactions a block carries (fee and
  /// reward modelling are explicitly out of scope, §1), so this is a
  /// uniform draw with no semantic effect on the engine beyond giving the
  /// `Block.tx_count` field a deterministic, non-degenerate value.
  pub fn draw_tx_count(&mut self) -> u32 {
    self.rng.gen_range(0..=500)
  }
}
