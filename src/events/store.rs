use super::{Event, EventKind};
use crate::ids::ValidatorId;
use std::collections::BTreeMap;

/// Time-ordered append-only event log (§4.1).
///
/// Backed by a `BTreeMap` keyed on `(time bits, kind rank, insertion
/// sequence)` so that iteration is always the canonical total order from
/// §3 and insertion is `O(log n)`. The sequence number is the tiebreaker
/// of last resort: it is itself assigned in the deterministic order
/// producers call `append`/`append_batch`, so it never introduces
/// nondeterminism of its own.
#[derive(Default)]
pub struct EventStore {
  events: BTreeMap<(u64, u8, u64), Event>,
  slot_starts: BTreeMap<u64, f64>,
  next_seq: u64,
}

impl EventStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn key_for(&mut self, event: &Event) -> (u64, u8, u64) {
    let (time_bits, rank) = event.order_key();
    let seq = self.next_seq;
    self.next_seq += 1;
    (time_bits, rank, seq)
  }

  /// O(log n) insertion maintaining the `(time, kind_rank)` total order.
  pub fn append(&mut self, event: Event) {
    if event.kind == EventKind::SlotStart {
      self.slot_starts.insert(event.slot, event.time_ms);
    }
    let key = self.key_for(&event);
    self.events.insert(key, event);
  }

  /// Batched insertion (§4.1): for an empty store, or a batch larger than
  /// ten items, sort the batch up front and merge it in; otherwise append
  /// one at a time. Either path produces the identical final order.
  pub fn append_batch(&mut self, mut batch: Vec<Event>) {
    if self.events.is_empty() || batch.len() > 10 {
      batch.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
      for event in batch {
        self.append(event);
      }
    } else {
      for event in batch.drain(..) {
        self.append(event);
      }
    }
  }

  pub fn len(&self) -> usize {
    self.events.len()
  }

  pub fn is_empty(&self) -> bool {
    self.events.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Event> {
    self.events.values()
  }

  pub fn events_for_slot(&self, slot: u64) -> Vec<&Event> {
    self.iter().filter(|e| e.slot == slot).collect()
  }

  pub fn events_for_validator(&self, id: &ValidatorId) -> Vec<&Event> {
    self
      .iter()
      .filter(|e| e.actor.as_ref() == Some(id) || e.subject.as_ref() == Some(id))
      .collect()
  }

  pub fn events_by_kind(&self, kind: EventKind) -> Vec<&Event> {
    self.iter().filter(|e| e.kind == kind).collect()
  }

  pub fn events_in_range(&self, t0: f64, t1: f64) -> Vec<&Event> {
    self
      .iter()
      .filter(|e| e.time_ms >= t0 && e.time_ms <= t1)
      .collect()
  }

  /// The time of the `SlotStart` event for `slot`, if one has been
  /// recorded.
  pub fn slot_start_time(&self, slot: u64) -> Option<f64> {
    self.slot_starts.get(&slot).copied()
  }

  /// All events up to time `t` in which `validator` is the subject of a
  /// `…ReceivedP2P` event or the actor of `BlockProposed`,
  /// `AttestationCreated`, or `L1Submission` (§4.1).
  pub fn view_at(&self, validator: &ValidatorId, t: f64) -> Vec<&Event> {
    self
      .iter()
      .filter(|e| e.time_ms <= t)
      .filter(|e| match e.kind {
        EventKind::BlockReceivedP2P | EventKind::AttestationReceivedP2P => {
          e.subject.as_ref() == Some(validator)
        }
        EventKind::BlockProposed
        | EventKind::AttestationCreated
        | EventKind::L1Submission => e.actor.as_ref() == Some(validator),
        _ => false,
      })
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ev(time_ms: f64, kind: EventKind) -> Event {
    Event::new(time_ms, 0, kind)
  }

  #[test]
  fn orders_by_time_then_rank() {
    let mut store = EventStore::new();
    store.append(ev(10.0, EventKind::SlotEnd));
    store.append(ev(10.0, EventKind::SlotStart));
    store.append(ev(5.0, EventKind::BlockProposed));
    let times_and_kinds: Vec<_> =
      store.iter().map(|e| (e.time_ms, e.kind)).collect();
    assert_eq!(
      times_and_kinds,
      vec![
        (5.0, EventKind::BlockProposed),
        (10.0, EventKind::SlotStart),
        (10.0, EventKind::SlotEnd),
      ]
    );
  }

  #[test]
  fn batching_produces_same_order_as_individual_appends() {
    let events: Vec<Event> = (0..20)
      .map(|i| ev((20 - i) as f64, EventKind::AttestationCreated))
      .collect();

    let mut individually = EventStore::new();
    for e in events.clone() {
      individually.append(e);
    }

    let mut batched = EventStore::new();
    batched.append_batch(events);

    let a: Vec<f64> = individually.iter().map(|e| e.time_ms).collect();
    let b: Vec<f64> = batched.iter().map(|e| e.time_ms).collect();
    assert_eq!(a, b);
  }

  #[test]
  fn no_two_events_share_a_position() {
    let mut store = EventStore::new();
    for _ in 0..50 {
      store.append(ev(1.0, EventKind::AttestationCreated));
    }
    assert_eq!(store.len(), 50);
  }

  #[test]
  fn out_of_range_queries_are_empty() {
    let store = EventStore::new();
    assert!(store.events_for_slot(3).is_empty());
    assert!(store.events_in_range(0.0, 100.0).is_empty());
  }
}
