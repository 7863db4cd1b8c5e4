use crate::{config::Config, ids::ValidatorId, validator::Validator};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rand_distr::{Distribution, Normal};
use tracing::warn;

const LATENCY_FLOOR_MS: f64 = 50.0;

/// The static P2P topology: a mesh adjacency matrix used for real message
/// delivery, a lazy adjacency matrix used only for (unsimulated) metadata
/// announcements, and a symmetric latency matrix (§3 Data Model, §4.4).
///
/// Built once, after validator online/private status and behaviour are
/// known, from a third PRNG role distinct from the committee/slot and
/// per-validator roles (§9 design notes).
#[derive(Debug, Clone)]
pub struct Topology {
  n: usize,
  mesh: Vec<Vec<bool>>,
  lazy: Vec<Vec<bool>>,
  latency: Vec<Vec<f64>>,
}

impl Topology {
  pub fn build(config: &Config, validators: &[Validator]) -> Self {
    let n = validators.len();
    let mut rng = ChaCha20Rng::seed_from_u64(config.random_seed);

    let mut mesh = vec![vec![false; n]; n];
    let mut lazy = vec![vec![false; n]; n];
    let mut latency = vec![vec![0.0; n]; n];

    for i in 0..n {
      for j in (i + 1)..n {
        let normal = Normal::new(0.0, config.latency_variance_ms.max(0.0))
          .expect("latency_variance_ms must be finite and non-negative");
        let jitter = normal.sample(&mut rng);
        let sample = (config.base_latency_ms + jitter).max(LATENCY_FLOOR_MS);
        latency[i][j] = sample;
        latency[j][i] = sample;
      }
    }

    let public: Vec<usize> =
      (0..n).filter(|&i| !validators[i].is_private).collect();
    let private: Vec<usize> =
      (0..n).filter(|&i| validators[i].is_private).collect();

    let degree =
      |mesh: &[Vec<bool>], node: usize| -> usize { mesh[node].iter().filter(|&&b| b).count() };

    // Public nodes connect to other public nodes only.
    for &node in &public {
      while degree(&mesh, node) < config.d {
        let candidates: Vec<usize> = public
          .iter()
          .copied()
          .filter(|&other| {
            other != node && !mesh[node][other] && degree(&mesh, other) < config.d_hi
          })
          .collect();
        if candidates.is_empty() {
          break;
        }
        let pick = candidates[rng.gen_range(0..candidates.len())];
        mesh[node][pick] = true;
        mesh[pick][node] = true;
      }
    }

    // Private nodes may only dial out to public nodes; private-private
    // edges are forbidden. It is expected and tolerated for a private
    // node to end up below D_lo if public capacity runs out (§4.4).
    for &node in &private {
      while degree(&mesh, node) < config.d {
        let candidates: Vec<usize> = public
          .iter()
          .copied()
          .filter(|&other| !mesh[node][other] && degree(&mesh, other) < config.d_hi)
          .collect();
        if candidates.is_empty() {
          break;
        }
        let pick = candidates[rng.gen_range(0..candidates.len())];
        mesh[node][pick] = true;
        mesh[pick][node] = true;
      }
      if degree(&mesh, node) < config.d_lo {
        warn!(
          validator = %validators[node].id,
          degree = degree(&mesh, node),
          d_lo = config.d_lo,
          "private node under-connected: no public mesh capacity remained"
        );
      }
    }

    for node in 0..n {
      let non_mesh: Vec<usize> = (0..n)
        .filter(|&other| other != node && !mesh[node][other])
        .collect();
      let lazy_count = config.d_lazy.min(non_mesh.len());
      let chosen = rand::seq::index::sample(&mut rng, non_mesh.len(), lazy_count);
      for idx in chosen.into_iter() {
        let other = non_mesh[idx];
        lazy[node][other] = true;
        lazy[other][node] = true;
      }
    }

    Self {
      n,
      mesh,
      lazy,
      latency,
    }
  }

  pub fn len(&self) -> usize {
    self.n
  }

  pub fn is_connected(&self, a: usize, b: usize) -> bool {
    self.mesh[a][b]
  }

  pub fn is_lazily_connected(&self, a: usize, b: usize) -> bool {
    self.lazy[a][b]
  }

  pub fn latency_ms(&self, a: usize, b: usize) -> f64 {
    self.latency[a][b]
  }

  pub fn neighbors(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
    (0..self.n).filter(move |&other| self.mesh[node][other])
  }

  pub fn degree(&self, node: usize) -> usize {
    self.neighbors(node).count()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test::default_config;
  use crate::validator::Profile;

  fn validators(n: usize, config: &Config) -> Vec<Validator> {
    (0..n)
      .map(|i| {
        Validator::new(
          ValidatorId::new(i),
          Profile::Honest,
          config.honest,
          config.random_seed,
          i,
        )
      })
      .collect()
  }

  #[test]
  fn latency_floor_is_enforced() {
    let mut config = default_config();
    config.base_latency_ms = -1000.0;
    config.latency_variance_ms = 0.0;
    let validators = validators(20, &config);
    let topology = Topology::build(&config, &validators);
    for i in 0..20 {
      for j in 0..20 {
        if i != j {
          assert!(topology.latency_ms(i, j) >= LATENCY_FLOOR_MS);
        }
      }
    }
  }

  #[test]
  fn latency_matrix_is_symmetric() {
    let config = default_config();
    let validators = validators(30, &config);
    let topology = Topology::build(&config, &validators);
    for i in 0..30 {
      for j in 0..30 {
        assert_eq!(topology.latency_ms(i, j), topology.latency_ms(j, i));
      }
    }
  }

  #[test]
  fn mesh_is_bidirectional() {
    let config = default_config();
    let validators = validators(40, &config);
    let topology = Topology::build(&config, &validators);
    for i in 0..40 {
      for j in 0..40 {
        assert_eq!(topology.is_connected(i, j), topology.is_connected(j, i));
      }
    }
  }

  #[test]
  fn public_nodes_reach_target_degree_when_pool_allows() {
    let config = default_config();
    let validators = validators(60, &config);
    let topology = Topology::build(&config, &validators);
    for i in 0..60 {
      assert!(topology.degree(i) <= config.d_hi);
    }
  }
}
