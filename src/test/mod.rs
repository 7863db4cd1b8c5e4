use crate::config::{Config, ProfileRates, SlashingConfig};
use crate::validator::Profile;

/// Shared fixture used across module test suites: a small but internally
/// consistent configuration that passes `Config::validate`.
pub fn default_config() -> Config {
  Config {
    total_validators: 100,
    committee_size: 48,
    honest_ratio: 0.7,
    lazy_ratio: 0.2,
    byzantine_ratio: 0.1,
    slots_per_epoch: 4,
    epochs_to_simulate: 2,
    aztec_slot_duration_seconds: 36,
    ethereum_slot_duration_seconds: 12,
    l1_submission_deadline_ms: 18_000,
    d: 8,
    d_lo: 4,
    d_hi: 12,
    d_lazy: 4,
    base_latency_ms: 100.0,
    latency_variance_ms: 20.0,
    packet_loss_rate: 0.0,
    honest: default_profile_rates(Profile::Honest),
    lazy: default_profile_rates(Profile::Lazy),
    byzantine: default_profile_rates(Profile::Byzantine),
    slashing: SlashingConfig {
      round_size: 8,
      lookback_epochs: 50,
    },
    random_seed: 42,
  }
}

pub fn default_profile_rates(profile: Profile) -> ProfileRates {
  match profile {
    Profile::Honest => ProfileRates {
      proposal_rate: 0.98,
      attestation_rate: 0.97,
      downtime_prob: 0.01,
      recovery_prob: 0.9,
      private_peer_prob: 0.2,
      response_mean_ms: 500.0,
      response_std_ms: 100.0,
    },
    Profile::Lazy => ProfileRates {
      proposal_rate: 0.8,
      attestation_rate: 0.6,
      downtime_prob: 0.1,
      recovery_prob: 0.5,
      private_peer_prob: 0.4,
      response_mean_ms: 1500.0,
      response_std_ms: 400.0,
    },
    Profile::Byzantine => ProfileRates {
      proposal_rate: 0.5,
      attestation_rate: 0.3,
      downtime_prob: 0.2,
      recovery_prob: 0.2,
      private_peer_prob: 0.3,
      response_mean_ms: 2500.0,
      response_std_ms: 800.0,
    },
  }
}
