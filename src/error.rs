use thiserror::Error;

/// Fatal errors that prevent a simulation from running at all.
///
/// `TopologyUnderConnected` from the specification is deliberately not a
/// variant here: it is a recoverable condition, reported through a
/// `tracing::warn!` at topology-construction time rather than surfaced to
/// the caller as a `Result` error (see `topology::build`).
#[derive(Debug, Error)]
pub enum SimError {
  #[error("invalid configuration: {0}")]
  ConfigInvalid(String),

  #[error(
    "validator pool too small: need {needed} members for the committee, \
     only {available} available"
  )]
  ValidatorPoolTooSmall { needed: usize, available: usize },
}
