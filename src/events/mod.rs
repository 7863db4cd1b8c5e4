mod store;
mod table;

pub use store::EventStore;
pub use table::{CellValue, EventTable};

use crate::ids::ValidatorId;
use serde::{Deserialize, Serialize};

/// The closed set of event kinds (§3 Data Model). Declaration order here
/// is cosmetic only — `kind_rank` below is the explicit, load-bearing
/// ordering used to break ties between simultaneous events (§9 design
/// notes: "do not rely on language enum iteration order").
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
  SimulationStart,
  SimulationEnd,
  EpochStart,
  SlotStart,
  SlotEnd,
  CommitteeSelected,
  ProposerAssigned,
  BlockProposed,
  BlockReceivedP2P,
  AttestationCreated,
  AttestationReceivedP2P,
  L1Submission,
  L1Finalized,
  NodeOnline,
  NodeOffline,
  MessageDropped,
}

impl EventKind {
  /// Explicit rank used as the tiebreaker for events sharing a timestamp.
  /// Chosen to match the actual order subsystems emit same-timestamp
  /// events in during one slot: the slot is announced, online status is
  /// settled, the proposer is assigned, and so on through to the slot's
  /// close.
  pub fn rank(self) -> u8 {
    match self {
      EventKind::SimulationStart => 0,
      EventKind::EpochStart => 1,
      EventKind::CommitteeSelected => 2,
      EventKind::SlotStart => 3,
      EventKind::NodeOnline => 4,
      EventKind::NodeOffline => 5,
      EventKind::ProposerAssigned => 6,
      EventKind::BlockProposed => 7,
      EventKind::BlockReceivedP2P => 8,
      EventKind::AttestationCreated => 9,
      EventKind::AttestationReceivedP2P => 10,
      EventKind::L1Submission => 11,
      EventKind::L1Finalized => 12,
      EventKind::SlotEnd => 13,
      EventKind::MessageDropped => 14,
      EventKind::SimulationEnd => 15,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      EventKind::SimulationStart => "SimulationStart",
      EventKind::SimulationEnd => "SimulationEnd",
      EventKind::EpochStart => "EpochStart",
      EventKind::SlotStart => "SlotStart",
      EventKind::SlotEnd => "SlotEnd",
      EventKind::CommitteeSelected => "CommitteeSelected",
      EventKind::ProposerAssigned => "ProposerAssigned",
      EventKind::BlockProposed => "BlockProposed",
      EventKind::BlockReceivedP2P => "BlockReceivedP2P",
      EventKind::AttestationCreated => "AttestationCreated",
      EventKind::AttestationReceivedP2P => "AttestationReceivedP2P",
      EventKind::L1Submission => "L1Submission",
      EventKind::L1Finalized => "L1Finalized",
      EventKind::NodeOnline => "NodeOnline",
      EventKind::NodeOffline => "NodeOffline",
      EventKind::MessageDropped => "MessageDropped",
    }
  }
}

/// A single immutable entry in the event stream (§3 Data Model). `data` is
/// a flat set of named, typed values rather than a generic string map,
/// per §9's guidance to use a tagged payload in a statically typed
/// target; each producer (slot driver, propagator, ...) supplies exactly
/// the keys relevant to its event kind.
#[derive(Debug, Clone)]
pub struct Event {
  pub time_ms: f64,
  pub slot: u64,
  pub kind: EventKind,
  pub actor: Option<ValidatorId>,
  pub subject: Option<ValidatorId>,
  pub data: Vec<(&'static str, CellValue)>,
}

impl Event {
  pub fn new(time_ms: f64, slot: u64, kind: EventKind) -> Self {
    Self {
      time_ms,
      slot,
      kind,
      actor: None,
      subject: None,
      data: Vec::new(),
    }
  }

  pub fn with_actor(mut self, actor: ValidatorId) -> Self {
    self.actor = Some(actor);
    self
  }

  pub fn with_subject(mut self, subject: ValidatorId) -> Self {
    self.subject = Some(subject);
    self
  }

  pub fn with_data(mut self, key: &'static str, value: impl Into<CellValue>) -> Self {
    self.data.push((key, value.into()));
    self
  }

  /// The `(time, kind_rank)` composite key used to keep the store in the
  /// total order required by §3's invariant.
  pub fn order_key(&self) -> (u64, u8) {
    (self.time_ms.to_bits(), self.kind.rank())
  }
}
