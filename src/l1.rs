use crate::{
  block::Block,
  config::Config,
  events::{Event, EventKind},
  ids::ValidatorId,
};
use std::collections::HashMap;

/// Decided outcome of the L1 submission post-processor for one slot
/// (§4.6): the `L1Submission` event always emitted, and the `L1Finalized`
/// event emitted only on success.
pub struct L1Outcome {
  pub submission: Event,
  pub finalized: Option<Event>,
}

/// Replays the proposer's received attestations to decide whether a
/// proposed block reached L1, and if so when (§4.6). Pure function of
/// the slot's gathered attestation-receipt times; does not touch the
/// event store itself so it can be unit-tested against hand-built
/// candidate lists.
///
/// `attestation_receipts` are `(attester, time relative to slot start in
/// ms)` pairs harvested from this slot's `AttestationReceivedP2P` events
/// whose `subject` is the proposer. The proposer's own attestation is
/// prepended by this function at `time = 100 ms`, per spec.
pub fn process_l1_submission(
  config: &Config,
  slot: u64,
  slot_start_ms: f64,
  proposer: &ValidatorId,
  block: &Block,
  attestation_receipts: &[(ValidatorId, f64)],
) -> L1Outcome {
  const PROPOSER_SELF_ATTEST_TIME_MS: f64 = 100.0;

  // Earliest-wins dedup per attester (§9, resolving the spec's open
  // question about duplicate deliveries).
  let mut earliest: HashMap<ValidatorId, f64> = HashMap::new();
  earliest.insert(proposer.clone(), PROPOSER_SELF_ATTEST_TIME_MS);
  for (attester, time) in attestation_receipts {
    earliest
      .entry(attester.clone())
      .and_modify(|t| {
        if *time < *t {
          *t = *time;
        }
      })
      .or_insert(*time);
  }

  let deadline = config.l1_submission_deadline_ms as f64;
  let mut candidates: Vec<(ValidatorId, f64)> = earliest
    .into_iter()
    .filter(|(_, time)| *time < deadline)
    .collect();
  candidates.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());

  let threshold = config.threshold();

  if candidates.len() < threshold {
    let submission = Event::new(
      slot_start_ms + deadline,
      slot,
      EventKind::L1Submission,
    )
    .with_actor(proposer.clone())
    .with_data("status", "failed")
    .with_data("failure_reason", "insufficient_attestations")
    .with_data("attestation_count", candidates.len());
    return L1Outcome {
      submission,
      finalized: None,
    };
  }

  let threshold_set = &candidates[..threshold];
  let threshold_time = threshold_set.last().unwrap().1;
  let attesters: Vec<String> = threshold_set
    .iter()
    .map(|(id, _)| id.as_str().to_owned())
    .collect();
  let attesters_json = serde_json::to_string(&attesters).unwrap();

  let abs = slot_start_ms + threshold_time;
  let eth_slot_ms = config.eth_slot_ms();
  let eth_slot = (abs / eth_slot_ms).floor();
  let offset = abs - eth_slot * eth_slot_ms;
  let next_eth_slot = eth_slot + 1.0 + if offset > 4000.0 { 1.0 } else { 0.0 };
  let inclusion_time_ms = next_eth_slot * eth_slot_ms - slot_start_ms;

  let slot_duration_ms = config.slot_duration_ms();
  let success = inclusion_time_ms <= slot_duration_ms;

  let mut submission = Event::new(
    slot_start_ms + threshold_time,
    slot,
    EventKind::L1Submission,
  )
  .with_actor(proposer.clone())
  .with_data("status", if success { "success" } else { "failed" })
  .with_data("attesters", attesters_json.clone())
  .with_data("attestation_count", attesters.len())
  .with_data("submission_time_ms", threshold_time)
  .with_data("ethereum_slot", eth_slot as i64)
  .with_data("time_into_eth_slot", offset);

  if !success {
    submission = submission.with_data("failure_reason", "inclusion_too_late");
  }

  let finalized = if success {
    Some(
      Event::new(slot_start_ms + inclusion_time_ms, slot, EventKind::L1Finalized)
        .with_actor(proposer.clone())
        .with_data("block_hash", block.hash.to_hex())
        .with_data("attesters", attesters_json)
        .with_data("attestation_count", attesters.len())
        .with_data("ethereum_block", next_eth_slot as i64)
        .with_data("inclusion_time_ms", inclusion_time_ms),
    )
  } else {
    None
  };

  L1Outcome {
    submission,
    finalized,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::block::GENESIS_PARENT_HASH;
  use crate::test::default_config;

  fn block() -> Block {
    Block::propose(0, ValidatorId::new(0), GENESIS_PARENT_HASH.to_owned(), 1, 0.0)
  }

  #[test]
  fn insufficient_attestations_fails_with_no_finalization() {
    let config = default_config();
    let proposer = ValidatorId::new(0);
    let receipts: Vec<(ValidatorId, f64)> = (1..5)
      .map(|i| (ValidatorId::new(i), 200.0 + i as f64))
      .collect();
    let outcome =
      process_l1_submission(&config, 0, 0.0, &proposer, &block(), &receipts);
    assert!(outcome
      .submission
      .data
      .iter()
      .any(|(k, v)| *k == "status" && v.to_csv_field() == "failed"));
    assert!(outcome.finalized.is_none());
  }

  #[test]
  fn enough_fast_attestations_succeed() {
    let mut config = default_config();
    config.committee_size = 4;
    let proposer = ValidatorId::new(0);
    let receipts: Vec<(ValidatorId, f64)> = (1..4)
      .map(|i| (ValidatorId::new(i), 150.0 + i as f64))
      .collect();
    let outcome =
      process_l1_submission(&config, 0, 0.0, &proposer, &block(), &receipts);
    assert!(outcome
      .submission
      .data
      .iter()
      .any(|(k, v)| *k == "status" && v.to_csv_field() == "success"));
    assert!(outcome.finalized.is_some());
  }

  #[test]
  fn dedup_keeps_earliest_per_attester() {
    let mut config = default_config();
    config.committee_size = 4;
    let proposer = ValidatorId::new(0);
    let mut receipts: Vec<(ValidatorId, f64)> = (1..4)
      .map(|i| (ValidatorId::new(i), 150.0 + i as f64))
      .collect();
    // duplicate delivery of validator_0001 arriving much later should not
    // push the dedup'd time backwards.
    receipts.push((ValidatorId::new(1), 9000.0));
    let outcome =
      process_l1_submission(&config, 0, 0.0, &proposer, &block(), &receipts);
    assert!(outcome.finalized.is_some());
  }

  #[test]
  fn entries_past_deadline_are_discarded() {
    let mut config = default_config();
    config.committee_size = 4;
    config.l1_submission_deadline_ms = 1000;
    let proposer = ValidatorId::new(0);
    let receipts: Vec<(ValidatorId, f64)> = (1..4)
      .map(|i| (ValidatorId::new(i), 2000.0 + i as f64))
      .collect();
    let outcome =
      process_l1_submission(&config, 0, 0.0, &proposer, &block(), &receipts);
    assert!(outcome.finalized.is_none());
  }
}
