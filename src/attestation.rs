use crate::{
  hash::{digest_truncated, Hash16},
  ids::ValidatorId,
};
use serde::{Deserialize, Serialize};

/// A committee member's vote for a block (§3 Data Model). `signature` is a
/// deterministic identifier, not a cryptographic signature — see §1
/// Non-goals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attestation {
  pub validator: ValidatorId,
  pub slot: u64,
  pub block_hash: Hash16,
  pub propagation_delay_ms: f64,
  pub signature: Hash16,
}

impl Attestation {
  pub fn create(
    validator: ValidatorId,
    slot: u64,
    block_hash: Hash16,
    propagation_delay_ms: f64,
  ) -> Self {
    let signature = digest_truncated(&[
      validator.as_str().as_bytes(),
      &slot.to_le_bytes(),
      block_hash.as_bytes(),
    ]);
    Self {
      validator,
      slot,
      block_hash,
      propagation_delay_ms,
      signature,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn signature_is_deterministic() {
    let a =
      Attestation::create(ValidatorId::new(0), 1, digest_truncated(&[b"x"]), 120.0);
    let b =
      Attestation::create(ValidatorId::new(0), 1, digest_truncated(&[b"x"]), 999.0);
    assert_eq!(a.signature, b.signature, "signature excludes delay");
  }
}
