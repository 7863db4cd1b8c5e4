use crate::{hash::Hash16, hash::digest_truncated, ids::ValidatorId};
use serde::{Deserialize, Serialize};

/// The literal parent hash of the very first block of the simulation
/// (§3 Data Model).
pub const GENESIS_PARENT_HASH: &str = "genesis";

/// A proposed Aztec block (§3 Data Model). Forking is not modelled: there
/// is exactly one "most recently proposed block" across the whole
/// simulation, and every subsequent block's `parent_hash` is that block's
/// hash regardless of which validator proposed it or whether it was ever
/// finalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
  pub slot: u64,
  pub proposer: ValidatorId,
  pub parent_hash: String,
  pub tx_count: u32,
  pub timestamp_ms: f64,
  pub hash: Hash16,
}

impl Block {
  pub fn propose(
    slot: u64,
    proposer: ValidatorId,
    parent_hash: String,
    tx_count: u32,
    timestamp_ms: f64,
  ) -> Self {
    let hash = digest_truncated(&[
      &slot.to_le_bytes(),
      proposer.as_str().as_bytes(),
      parent_hash.as_bytes(),
      &tx_count.to_le_bytes(),
      &timestamp_ms.to_bits().to_le_bytes(),
    ]);
    Self {
      slot,
      proposer,
      parent_hash,
      tx_count,
      timestamp_ms,
      hash,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hash_is_deterministic_function_of_fields() {
    let a = Block::propose(
      1,
      ValidatorId::new(0),
      GENESIS_PARENT_HASH.to_owned(),
      10,
      0.0,
    );
    let b = Block::propose(
      1,
      ValidatorId::new(0),
      GENESIS_PARENT_HASH.to_owned(),
      10,
      0.0,
    );
    assert_eq!(a.hash, b.hash);
  }

  #[test]
  fn different_slots_hash_differently() {
    let a = Block::propose(
      1,
      ValidatorId::new(0),
      GENESIS_PARENT_HASH.to_owned(),
      10,
      0.0,
    );
    let b = Block::propose(
      2,
      ValidatorId::new(0),
      GENESIS_PARENT_HASH.to_owned(),
      10,
      0.0,
    );
    assert_ne!(a.hash, b.hash);
  }
}
