use crate::{
  attestation::Attestation,
  block::Block,
  committee::Committee,
  config::Config,
  events::{Event, EventKind, EventStore},
  ids::ValidatorId,
  l1,
  propagate::{self, ATTESTATION_MAX_HOPS, BLOCK_MAX_HOPS},
  validator::Validator,
};
use rand_chacha::ChaCha20Rng;
use std::collections::HashMap;

const PROPOSER_SELF_ATTEST_DELAY_MS: f64 = 100.0;

fn online_vector(id_of: &[ValidatorId], validators: &HashMap<ValidatorId, Validator>) -> Vec<bool> {
  id_of.iter().map(|id| validators[id].is_online).collect()
}

/// Runs one absolute slot's status/proposal/propagation/attestation/L1
/// phases and appends every resulting event to `store` (§4.5). `topology`
/// indices and `id_of` must agree on validator ordering.
#[allow(clippy::too_many_arguments)]
pub fn run_slot(
  config: &Config,
  topology: &crate::topology::Topology,
  id_of: &[ValidatorId],
  index_of: &HashMap<ValidatorId, usize>,
  validators: &mut HashMap<ValidatorId, Validator>,
  committee: &Committee,
  slot: u64,
  last_block_hash: &mut String,
  propagation_rng: &mut ChaCha20Rng,
  store: &mut EventStore,
) {
  let slot_start = slot as f64 * config.slot_duration_ms();

  store.append(
    Event::new(slot_start, slot, EventKind::SlotStart)
      .with_data("slot_duration_ms", config.slot_duration_ms()),
  );

  // 1. Status update phase.
  for id in id_of {
    let flip = validators.get_mut(id).unwrap().transition_online();
    if let Some(online) = flip {
      let kind = if online {
        EventKind::NodeOnline
      } else {
        EventKind::NodeOffline
      };
      store.append(Event::new(slot_start, slot, kind).with_actor(id.clone()));
    }
  }

  let proposer = match committee.proposer_for(slot) {
    Some(p) => p.clone(),
    None => return,
  };
  store.append(
    Event::new(slot_start, slot, EventKind::ProposerAssigned).with_actor(proposer.clone()),
  );

  // 2. Proposal phase.
  let will_propose = validators.get_mut(&proposer).unwrap().decide_propose(slot);
  let mut block_proposed = false;
  let mut attestation_receipts: Vec<(ValidatorId, f64)> = Vec::new();

  if will_propose {
    let tx_count = validators.get_mut(&proposer).unwrap().draw_tx_count();
    let block = Block::propose(
      slot,
      proposer.clone(),
      last_block_hash.clone(),
      tx_count,
      slot_start,
    );
    store.append(
      Event::new(slot_start, slot, EventKind::BlockProposed)
        .with_actor(proposer.clone())
        .with_data("parent_hash", block.parent_hash.clone())
        .with_data("transactions", block.tx_count)
        .with_data("block_hash", block.hash.to_hex()),
    );
    block_proposed = true;

    // 3. Block propagation.
    let proposer_idx = index_of[&proposer];
    let is_online = online_vector(id_of, validators);
    let deliveries = propagate::propagate(
      topology,
      proposer_idx,
      &is_online,
      BLOCK_MAX_HOPS,
      false,
      config.packet_loss_rate,
      propagation_rng,
    );
    let mut delivery_time_by_idx: HashMap<usize, f64> = HashMap::new();
    for delivery in &deliveries {
      delivery_time_by_idx.insert(delivery.receiver, delivery.time_ms);
      store.append(
        Event::new(slot_start + delivery.time_ms, slot, EventKind::BlockReceivedP2P)
          .with_actor(id_of[delivery.sender].clone())
          .with_subject(id_of[delivery.receiver].clone())
          .with_data("proposer", proposer.as_str().to_owned())
          .with_data("hops", delivery.hop)
          .with_data("delivery_time_ms", delivery.time_ms),
      );
    }

    // 4. Attestation phase (batched per §4.5).
    let mut batch: Vec<Event> = Vec::new();

    let proposer_attestation = Attestation::create(
      proposer.clone(),
      slot,
      block.hash,
      PROPOSER_SELF_ATTEST_DELAY_MS,
    );
    batch.push(
      Event::new(
        slot_start + PROPOSER_SELF_ATTEST_DELAY_MS,
        slot,
        EventKind::AttestationCreated,
      )
      .with_actor(proposer.clone())
      .with_data("delay_ms", PROPOSER_SELF_ATTEST_DELAY_MS)
      .with_data("signature", proposer_attestation.signature.to_hex()),
    );
    attestation_receipts.push((proposer.clone(), PROPOSER_SELF_ATTEST_DELAY_MS));

    let deadline_ms = config.l1_submission_deadline_ms as f64;
    for attester in committee.attesters_for(slot) {
      let Some(&idx) = index_of.get(&attester) else {
        continue;
      };
      let Some(&block_dt) = delivery_time_by_idx.get(&idx) else {
        continue;
      };
      let time_remaining = deadline_ms - block_dt;
      let validator = validators.get_mut(&attester).unwrap();
      if !validator.decide_attest(&proposer, time_remaining) {
        continue;
      }
      let response_delay = validator.draw_response_delay_ms();
      let attest_time = block_dt + response_delay;
      let attestation =
        Attestation::create(attester.clone(), slot, block.hash, response_delay);

      batch.push(
        Event::new(slot_start + attest_time, slot, EventKind::AttestationCreated)
          .with_actor(attester.clone())
          .with_data("delay_ms", response_delay)
          .with_data("signature", attestation.signature.to_hex()),
      );

      let attester_online = online_vector(id_of, validators);
      let att_deliveries = propagate::propagate(
        topology,
        idx,
        &attester_online,
        ATTESTATION_MAX_HOPS,
        true,
        config.packet_loss_rate,
        propagation_rng,
      );
      for delivery in &att_deliveries {
        let absolute_delivery = attest_time + delivery.time_ms;
        batch.push(
          Event::new(
            slot_start + absolute_delivery,
            slot,
            EventKind::AttestationReceivedP2P,
          )
          .with_actor(id_of[delivery.sender].clone())
          .with_subject(id_of[delivery.receiver].clone())
          .with_data("attester", attester.as_str().to_owned())
          .with_data("hops", delivery.hop)
          .with_data("delivery_time_ms", delivery.time_ms),
        );
        if id_of[delivery.receiver] == proposer {
          attestation_receipts.push((attester.clone(), attest_time + delivery.time_ms));
        }
      }
    }
    store.append_batch(batch);

    // 5. L1 submission post-processing.
    let outcome = l1::process_l1_submission(
      config,
      slot,
      slot_start,
      &proposer,
      &block,
      &attestation_receipts,
    );
    store.append(outcome.submission);
    if let Some(finalized) = outcome.finalized {
      store.append(finalized);
    }
    *last_block_hash = block.hash.to_hex();
  }

  // 6. Slot end.
  store.append(
    Event::new(slot_start + config.slot_duration_ms(), slot, EventKind::SlotEnd)
      .with_data("block_proposed", block_proposed),
  );
}
