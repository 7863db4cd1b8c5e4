use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use std::fmt;

/// A 16-byte truncated digest, used throughout the engine as a
/// deterministic identifier (block hash, attestation signature, slashing
/// proposal id) rather than a cryptographically meaningful value — see
/// §1 Non-goals: "cryptographic validity of signatures" is explicitly out
/// of scope.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash16([u8; 16]);

impl Hash16 {
  pub fn as_bytes(&self) -> &[u8; 16] {
    &self.0
  }

  pub fn to_hex(&self) -> String {
    hex::encode(self.0)
  }
}

impl fmt::Display for Hash16 {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.to_hex())
  }
}

impl fmt::Debug for Hash16 {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Hash16({})", self.to_hex())
  }
}

impl Serialize for Hash16 {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(&self.to_hex())
  }
}

impl<'de> Deserialize<'de> for Hash16 {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: serde::Deserializer<'de>,
  {
    let s = String::deserialize(deserializer)?;
    let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
    let arr: [u8; 16] = bytes
      .try_into()
      .map_err(|_| serde::de::Error::custom("expected 16 bytes"))?;
    Ok(Self(arr))
  }
}

/// Hashes the concatenation of `parts` with SHA3-256 and truncates the
/// digest to 16 bytes. Used for block hashes and attestation signatures
/// (§3 Data Model) and for slashing-proposal ids (§4.8, first 8 hex
/// digits of this same digest).
pub fn digest_truncated(parts: &[&[u8]]) -> Hash16 {
  let mut hasher = Sha3_256::new();
  for part in parts {
    hasher.update(part);
  }
  let digest = hasher.finalize();
  let mut out = [0u8; 16];
  out.copy_from_slice(&digest[..16]);
  Hash16(out)
}

/// First 8 hex digits of the SHA3-256 digest of `data` — the slashing
/// proposal id format from §4.8.
pub fn short_digest_hex(data: &[u8]) -> String {
  let mut hasher = Sha3_256::new();
  hasher.update(data);
  let digest = hasher.finalize();
  hex::encode(&digest[..4])
}

/// Collapses `data` to a `u64` via the low 8 bytes of its SHA3-256 digest.
/// Used for the `hash(proposer) mod 5 == 0` and `hash(proposer) mod 5`
/// Byzantine-withholding checks in §4.2, where "hash" only needs to be a
/// deterministic, well-distributed function of the input.
pub fn small_hash_u64(data: &[u8]) -> u64 {
  let mut hasher = Sha3_256::new();
  hasher.update(data);
  let digest = hasher.finalize();
  let mut bytes = [0u8; 8];
  bytes.copy_from_slice(&digest[..8]);
  u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn truncated_digest_is_deterministic() {
    let a = digest_truncated(&[b"hello", b"world"]);
    let b = digest_truncated(&[b"hello", b"world"]);
    assert_eq!(a, b);
    assert_ne!(a, digest_truncated(&[b"hello", b"there"]));
  }

  #[test]
  fn hex_roundtrip() {
    let h = digest_truncated(&[b"x"]);
    let hex = h.to_hex();
    assert_eq!(hex.len(), 32);
  }

  #[test]
  fn short_digest_is_eight_hex_chars() {
    assert_eq!(short_digest_hex(b"a,b,c").len(), 8);
  }
}
