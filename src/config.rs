use crate::error::SimError;
use serde::{Deserialize, Serialize};

fn default_eth_slot_seconds() -> u64 {
  12
}

fn default_l1_deadline_ms() -> u64 {
  18_000
}

fn default_lookback_epochs() -> u64 {
  50
}

/// The five per-profile stochastic rates from §4.2/§6 of the spec, plus the
/// two parameters of the Gaussian used to draw an attester's response delay.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProfileRates {
  pub proposal_rate: f64,
  pub attestation_rate: f64,
  pub downtime_prob: f64,
  pub recovery_prob: f64,
  pub private_peer_prob: f64,
  pub response_mean_ms: f64,
  pub response_std_ms: f64,
}

/// Parameters of the slashing-signalling game (§4.8).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SlashingConfig {
  pub round_size: u64,

  #[serde(default = "default_lookback_epochs")]
  pub lookback_epochs: u64,
}

/// Top-level simulation configuration. Every field not documented as
/// defaulted is required; `Config::validate` rejects anything that
/// violates the inequalities laid out in §6 of the specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
  /// Total number of validators created at simulation start.
  pub total_validators: usize,

  /// Size of the per-epoch committee. Must not exceed `total_validators`.
  pub committee_size: usize,

  /// Fraction of validators with the `Honest` profile.
  pub honest_ratio: f64,
  /// Fraction of validators with the `Lazy` profile.
  pub lazy_ratio: f64,
  /// Fraction of validators with the `Byzantine` profile.
  pub byzantine_ratio: f64,

  /// Number of slots per epoch.
  pub slots_per_epoch: u64,
  /// Number of epochs to simulate.
  pub epochs_to_simulate: u64,
  /// Duration of one Aztec (L2) slot, in seconds. Must be at least 12.
  pub aztec_slot_duration_seconds: u64,
  /// Duration of one Ethereum (L1) slot, in seconds.
  #[serde(default = "default_eth_slot_seconds")]
  pub ethereum_slot_duration_seconds: u64,
  /// Deadline, relative to slot start, for L1 submission to be considered.
  #[serde(default = "default_l1_deadline_ms")]
  pub l1_submission_deadline_ms: u64,

  /// GossipSub target mesh degree.
  pub d: usize,
  /// GossipSub low-water mesh degree.
  pub d_lo: usize,
  /// GossipSub high-water mesh degree.
  pub d_hi: usize,
  /// GossipSub lazy-push degree.
  pub d_lazy: usize,

  /// Base one-hop latency, in milliseconds, before jitter.
  pub base_latency_ms: f64,
  /// Standard deviation of the latency jitter, in milliseconds.
  pub latency_variance_ms: f64,
  /// Probability that a mesh hop silently drops a message.
  pub packet_loss_rate: f64,

  pub honest: ProfileRates,
  pub lazy: ProfileRates,
  pub byzantine: ProfileRates,

  pub slashing: SlashingConfig,

  /// Seed for every deterministic PRNG in the engine (see `DESIGN.md` for
  /// how the seed is split across topology, committee and per-validator
  /// roles).
  pub random_seed: u64,
}

impl Config {
  pub fn validate(&self) -> Result<(), SimError> {
    if self.committee_size == 0 {
      return Err(SimError::ConfigInvalid(
        "committee_size must be >= 1".into(),
      ));
    }
    if self.total_validators < self.committee_size {
      return Err(SimError::ConfigInvalid(format!(
        "total_validators ({}) must be >= committee_size ({})",
        self.total_validators, self.committee_size
      )));
    }

    let ratio_sum =
      self.honest_ratio + self.lazy_ratio + self.byzantine_ratio;
    if (ratio_sum - 1.0).abs() > 1e-3 {
      return Err(SimError::ConfigInvalid(format!(
        "honest + lazy + byzantine ratios must sum to 1.0 (got {ratio_sum})"
      )));
    }
    for (name, ratio) in [
      ("honest_ratio", self.honest_ratio),
      ("lazy_ratio", self.lazy_ratio),
      ("byzantine_ratio", self.byzantine_ratio),
    ] {
      if !(0.0..=1.0).contains(&ratio) {
        return Err(SimError::ConfigInvalid(format!(
          "{name} must be within [0, 1] (got {ratio})"
        )));
      }
    }

    if self.slots_per_epoch == 0 {
      return Err(SimError::ConfigInvalid(
        "slots_per_epoch must be >= 1".into(),
      ));
    }
    if self.aztec_slot_duration_seconds < 12 {
      return Err(SimError::ConfigInvalid(
        "aztec_slot_duration_seconds must be >= 12".into(),
      ));
    }

    if !(self.d_lo <= self.d && self.d <= self.d_hi) {
      return Err(SimError::ConfigInvalid(format!(
        "gossip degree bounds must satisfy d_lo <= d <= d_hi (got {}, {}, \
         {})",
        self.d_lo, self.d, self.d_hi
      )));
    }

    if !(0.0..=1.0).contains(&self.packet_loss_rate) {
      return Err(SimError::ConfigInvalid(format!(
        "packet_loss_rate must be within [0, 1] (got {})",
        self.packet_loss_rate
      )));
    }

    Ok(())
  }

  pub fn slot_duration_ms(&self) -> f64 {
    (self.aztec_slot_duration_seconds * 1000) as f64
  }

  pub fn eth_slot_ms(&self) -> f64 {
    (self.ethereum_slot_duration_seconds * 1000) as f64
  }

  /// ⅔ + 1 super-majority threshold for the committee.
  pub fn threshold(&self) -> usize {
    (self.committee_size * 2) / 3 + 1
  }
}

#[cfg(test)]
mod tests {
  use crate::test::default_config;

  #[test]
  fn rejects_small_pool() {
    let mut cfg = default_config();
    cfg.total_validators = cfg.committee_size - 1;
    assert!(cfg.validate().is_err());
  }

  #[test]
  fn rejects_bad_ratios() {
    let mut cfg = default_config();
    cfg.honest_ratio = 0.5;
    cfg.lazy_ratio = 0.5;
    cfg.byzantine_ratio = 0.5;
    assert!(cfg.validate().is_err());
  }

  #[test]
  fn rejects_bad_gossip_bounds() {
    let mut cfg = default_config();
    cfg.d_lo = cfg.d_hi + 1;
    assert!(cfg.validate().is_err());
  }

  #[test]
  fn accepts_default() {
    assert!(default_config().validate().is_ok());
  }

  #[test]
  fn threshold_matches_spec_example() {
    let mut cfg = default_config();
    cfg.committee_size = 48;
    assert_eq!(cfg.threshold(), 33);
  }
}
