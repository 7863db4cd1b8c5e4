use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a validator, `validator_NNNN` zero-padded to four
/// digits. Wrapping a plain `String` (rather than the raw index) keeps the
/// event stream self-describing once it is exported to a table.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ValidatorId(String);

impl ValidatorId {
  pub fn new(index: usize) -> Self {
    Self(format!("validator_{index:04}"))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for ValidatorId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl AsRef<str> for ValidatorId {
  fn as_ref(&self) -> &str {
    &self.0
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn zero_padded() {
    assert_eq!(ValidatorId::new(7).as_str(), "validator_0007");
    assert_eq!(ValidatorId::new(1234).as_str(), "validator_1234");
  }
}
