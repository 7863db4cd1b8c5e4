use crate::topology::Topology;
use rand::Rng;
use rand_chacha::ChaCha20Rng;

/// One delivery produced by a propagation flood: `sender` is the
/// immediate forwarder, not necessarily the originator (§3 Data Model,
/// "PropagationTrace").
#[derive(Debug, Clone, Copy)]
pub struct Delivery {
  pub receiver: usize,
  pub time_ms: f64,
  pub hop: u32,
  pub sender: usize,
}

/// Attestation propagation scales latency by this factor and uses a
/// shallower hop cap than block propagation (§4.4).
pub const ATTESTATION_LATENCY_FACTOR: f64 = 0.7;
pub const BLOCK_MAX_HOPS: u32 = 10;
pub const ATTESTATION_MAX_HOPS: u32 = 8;

/// Breadth-first flood of a message from `source` over the mesh, honoring
/// per-hop online status and packet loss (§4.4). The same routine serves
/// both block and attestation propagation; callers pick `max_hops` and
/// `is_attestation` accordingly. `rng` is the simulation's dedicated
/// propagation PRNG (see `DESIGN.md`): packet-loss draws happen on every
/// call, across the whole run, so they get their own persistent,
/// sequentially-advanced source rather than reusing the topology-
/// construction PRNG (which runs once) or a per-validator PRNG (which
/// would tie packet loss to validator identity instead of to the
/// message).
pub fn propagate(
  topology: &Topology,
  source: usize,
  is_online: &[bool],
  max_hops: u32,
  is_attestation: bool,
  packet_loss_rate: f64,
  rng: &mut ChaCha20Rng,
) -> Vec<Delivery> {
  let n = topology.len();
  let mut delivered_at_hop: Vec<Option<u32>> = vec![None; n];
  let mut delivery_time = vec![0.0; n];
  let mut sender = vec![source; n];
  delivered_at_hop[source] = Some(0);

  let mut deliveries = Vec::new();

  if !is_online[source] {
    return deliveries;
  }

  for h in 1..=max_hops {
    let frontier: Vec<usize> = (0..n)
      .filter(|&i| delivered_at_hop[i] == Some(h - 1))
      .collect();
    if frontier.is_empty() {
      break;
    }

    for u in frontier {
      if !is_online[u] {
        continue;
      }
      for v in topology.neighbors(u) {
        if delivered_at_hop[v].is_some() || !is_online[v] {
          continue;
        }
        if rng.gen_bool(packet_loss_rate.clamp(0.0, 1.0)) {
          continue;
        }
        let mut latency = topology.latency_ms(u, v);
        if is_attestation {
          latency *= ATTESTATION_LATENCY_FACTOR;
        }
        let time_ms = delivery_time[u] + latency;
        delivery_time[v] = time_ms;
        sender[v] = u;
        delivered_at_hop[v] = Some(h);
        deliveries.push(Delivery {
          receiver: v,
          time_ms,
          hop: h,
          sender: u,
        });
      }
    }
  }

  deliveries
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Config;
  use crate::ids::ValidatorId;
  use crate::test::default_config;
  use crate::validator::{Profile, Validator};
  use rand::SeedableRng;

  fn topology_of(n: usize, config: &Config) -> Topology {
    let validators: Vec<Validator> = (0..n)
      .map(|i| {
        Validator::new(
          ValidatorId::new(i),
          Profile::Honest,
          config.honest,
          config.random_seed,
          i,
        )
      })
      .collect();
    Topology::build(config, &validators)
  }

  #[test]
  fn no_packet_loss_reaches_every_online_connected_node() {
    let config = default_config();
    let topology = topology_of(40, &config);
    let is_online = vec![true; 40];
    let mut rng = ChaCha20Rng::seed_from_u64(1);
    let deliveries =
      propagate(&topology, 0, &is_online, BLOCK_MAX_HOPS, false, 0.0, &mut rng);
    assert!(deliveries.len() <= 39);
    for d in &deliveries {
      assert_ne!(d.receiver, 0);
    }
  }

  #[test]
  fn offline_source_reaches_nobody() {
    let config = default_config();
    let topology = topology_of(20, &config);
    let mut is_online = vec![true; 20];
    is_online[0] = false;
    let mut rng = ChaCha20Rng::seed_from_u64(1);
    let deliveries =
      propagate(&topology, 0, &is_online, BLOCK_MAX_HOPS, false, 0.0, &mut rng);
    assert!(deliveries.is_empty());
  }

  #[test]
  fn total_packet_loss_reaches_nobody() {
    let config = default_config();
    let topology = topology_of(20, &config);
    let is_online = vec![true; 20];
    let mut rng = ChaCha20Rng::seed_from_u64(1);
    let deliveries =
      propagate(&topology, 0, &is_online, BLOCK_MAX_HOPS, false, 1.0, &mut rng);
    assert!(deliveries.is_empty());
  }

  #[test]
  fn attestation_scales_latency_down() {
    let config = default_config();
    let topology = topology_of(10, &config);
    let is_online = vec![true; 10];
    let mut rng_block = ChaCha20Rng::seed_from_u64(7);
    let mut rng_att = ChaCha20Rng::seed_from_u64(7);
    let blocks =
      propagate(&topology, 0, &is_online, BLOCK_MAX_HOPS, false, 0.0, &mut rng_block);
    let atts = propagate(
      &topology,
      0,
      &is_online,
      ATTESTATION_MAX_HOPS,
      true,
      0.0,
      &mut rng_att,
    );
    for (b, a) in blocks.iter().zip(atts.iter()) {
      if b.receiver == a.receiver && b.hop == 1 {
        assert!(a.time_ms <= b.time_ms);
      }
    }
  }
}
