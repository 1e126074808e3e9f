//! Synthetic networks and subgraph builders.
//!
//! A generator validates its parameters first, then replaces the graph's contents. Randomness is
//! drawn from the caller's RNG, so a seeded generator reproduces the same network.

use std::collections::{BTreeSet, HashSet};

use rand::{
    seq::{IteratorRandom, SliceRandom},
    Rng,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    config::Canvas,
    edge::EdgeType,
    error::{Error, Result},
    event::{Event, Task},
    graph::Graph,
    layout::{circle_position, grid_position},
    vertex::{Position, VertexId},
};

/// Directedness of a generated network.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    Directed,
    #[default]
    Undirected,
}

/// The two Erdős–Rényi variants.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum RandomModel {
    /// `G(n, p)`: every candidate tie exists independently with probability `p`.
    Probability(f64),
    /// `G(n, m)`: exactly `m` ties drawn uniformly from the candidates.
    Edges(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErdosRenyi {
    pub vertices: usize,
    pub model: RandomModel,
    pub mode: Mode,
    /// Allow ties from a vertex to itself.
    pub self_loops: bool,
}

/// Preferential attachment. Each new vertex ties to `edges_per_step` distinct earlier vertices,
/// each picked with weight `alpha + degree^power`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScaleFree {
    pub vertices: usize,
    pub power: f64,
    /// Size of the seed clique.
    pub initial: usize,
    pub edges_per_step: usize,
    pub alpha: f64,
    pub mode: Mode,
}

/// Watts–Strogatz: a ring lattice whose ties are rewired with probability `beta`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SmallWorld {
    pub vertices: usize,
    /// Even number of lattice neighbours per vertex.
    pub degree: usize,
    pub beta: f64,
    pub mode: Mode,
}

/// Every vertex tied to its `degree / 2` nearest neighbours on each side of a ring.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingLattice {
    pub vertices: usize,
    pub degree: usize,
}

/// A random network where every vertex has exactly `degree` ties (out and in ties when
/// directed).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Regular {
    pub vertices: usize,
    pub degree: usize,
    pub mode: Mode,
    /// Let the shuffle place ties from a vertex to itself. Directed mode only.
    pub self_loops: bool,
}

/// A `dimension`-dimensional grid of side `length`, every vertex tied to the vertices up to
/// `neighborhood` steps away along each axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lattice {
    pub length: usize,
    pub dimension: u32,
    pub neighborhood: usize,
    /// Wrap each axis around, making a torus.
    pub circular: bool,
    pub mode: Mode,
}

impl Graph {
    /// Replaces the graph with an Erdős–Rényi random network.
    ///
    /// # Examples
    ///
    /// ```
    /// use rand::{rngs::SmallRng, SeedableRng};
    /// use socnet::{
    ///     generators::{ErdosRenyi, Mode, RandomModel},
    ///     graph::Graph,
    /// };
    ///
    /// let mut graph = Graph::new();
    /// let mut rng = SmallRng::seed_from_u64(7);
    /// let params = ErdosRenyi {
    ///     vertices: 10,
    ///     model: RandomModel::Edges(12),
    ///     mode: Mode::Undirected,
    ///     self_loops: false,
    /// };
    ///
    /// graph.erdos_renyi(&params, &mut rng).unwrap();
    /// assert_eq!(graph.vertex_count(), 10);
    /// assert_eq!(graph.edge_count(), 12);
    /// ```
    #[instrument(skip(self, rng))]
    pub fn erdos_renyi<R: Rng + ?Sized>(&mut self, params: &ErdosRenyi, rng: &mut R) -> Result<()> {
        let n = params.vertices;
        let candidates = candidate_pairs(n, params.mode, params.self_loops);

        match params.model {
            RandomModel::Probability(p) if !(0.0..=1.0).contains(&p) => {
                return Err(Error::invalid(format!("probability {p} outside [0, 1]")));
            }
            RandomModel::Edges(m) if m > candidates.len() => {
                return Err(Error::invalid(format!(
                    "{m} edges requested but only {} are possible",
                    candidates.len()
                )));
            }
            _ => {}
        }

        let ids = self.begin_generation(n, params.mode, params.self_loops, circle_position);
        let chosen: Vec<(usize, usize)> = match params.model {
            RandomModel::Probability(p) => candidates
                .into_iter()
                .filter(|_| rng.gen::<f64>() < p)
                .collect(),
            RandomModel::Edges(m) => candidates.choose_multiple(rng, m).copied().collect(),
        };

        for (a, b) in chosen {
            self.link(ids[a], ids[b], params.mode)?;
        }

        self.finish_generation(n);
        Ok(())
    }

    /// Replaces the graph with a preferential-attachment network grown from a seed clique.
    #[instrument(skip(self, rng))]
    pub fn scale_free<R: Rng + ?Sized>(&mut self, params: &ScaleFree, rng: &mut R) -> Result<()> {
        let ScaleFree {
            vertices: n,
            power,
            initial,
            edges_per_step: m,
            alpha,
            mode,
        } = *params;

        if initial == 0 || initial > n {
            return Err(Error::invalid(format!(
                "seed size {initial} must be between 1 and {n}"
            )));
        }
        if m == 0 || m > initial {
            return Err(Error::invalid(format!(
                "edges per step {m} must be between 1 and the seed size {initial}"
            )));
        }
        if !(power.is_finite() && power >= 0.0) || !(alpha.is_finite() && alpha >= 0.0) {
            return Err(Error::invalid("power and alpha must be finite and non-negative"));
        }

        let ids = self.begin_generation(n, mode, false, circle_position);
        let mut degrees = vec![0.0_f64; n];

        for a in 0..initial {
            for b in a + 1..initial {
                self.link(ids[a], ids[b], mode)?;
                degrees[a] += 1.0;
                degrees[b] += 1.0;
            }
        }

        for new in initial..n {
            let mut weights: Vec<f64> = degrees[..new]
                .iter()
                .map(|d| alpha + d.powf(power))
                .collect();
            let mut targets = BTreeSet::new();

            while targets.len() < m {
                let target = match roulette(&weights, rng) {
                    Some(target) => target,
                    None => match (0..new).filter(|t| !targets.contains(t)).choose(rng) {
                        Some(target) => target,
                        None => break,
                    },
                };
                targets.insert(target);
                weights[target] = 0.0;
            }

            for target in targets {
                self.link(ids[new], ids[target], mode)?;
                degrees[new] += 1.0;
                degrees[target] += 1.0;
            }
            self.progress(Task::Generator, new + 1);
        }

        self.finish_generation(n);
        Ok(())
    }

    /// Replaces the graph with a Watts–Strogatz small world.
    ///
    /// Each lattice tie `i -> i + j` is rewired with probability `beta` to a vertex `i` is not yet
    /// tied to, so the number of ties never changes.
    #[instrument(skip(self, rng))]
    pub fn small_world<R: Rng + ?Sized>(&mut self, params: &SmallWorld, rng: &mut R) -> Result<()> {
        let SmallWorld {
            vertices: n,
            degree,
            beta,
            mode,
        } = *params;

        check_ring_degree(n, degree)?;
        if !(0.0..=1.0).contains(&beta) {
            return Err(Error::invalid(format!("rewiring probability {beta} outside [0, 1]")));
        }

        let ids = self.begin_generation(n, mode, false, circle_position);
        for (a, b) in ring_pairs(n, degree / 2) {
            self.link(ids[a], ids[b], mode)?;
        }

        for i in 0..n {
            for step in 1..=degree / 2 {
                if rng.gen::<f64>() >= beta {
                    continue;
                }

                let (source, old) = (ids[i], ids[(i + step) % n]);
                let replacement = ids
                    .iter()
                    .copied()
                    .filter(|&w| w != source && !self.tied(source, w))
                    .choose(rng);

                if let Some(target) = replacement {
                    self.unlink(source, old)?;
                    self.link(source, target, mode)?;
                }
            }
            self.progress(Task::Generator, i + 1);
        }

        self.finish_generation(n);
        Ok(())
    }

    /// Replaces the graph with an undirected ring lattice.
    ///
    /// # Examples
    ///
    /// ```
    /// use socnet::{generators::RingLattice, graph::Graph};
    ///
    /// let mut graph = Graph::new();
    /// graph.ring_lattice(&RingLattice { vertices: 6, degree: 4 }).unwrap();
    ///
    /// assert_eq!(graph.edge_count(), 12);
    /// assert!(graph.ring_lattice(&RingLattice { vertices: 6, degree: 3 }).is_err());
    /// ```
    pub fn ring_lattice(&mut self, params: &RingLattice) -> Result<()> {
        let RingLattice { vertices: n, degree } = *params;
        check_ring_degree(n, degree)?;

        let ids = self.begin_generation(n, Mode::Undirected, false, circle_position);
        for (a, b) in ring_pairs(n, degree / 2) {
            self.link(ids[a], ids[b], Mode::Undirected)?;
        }

        self.finish_generation(n);
        Ok(())
    }

    /// Replaces the graph with a random `k`-regular network.
    ///
    /// A deterministic regular network is built first and then shuffled with degree-preserving
    /// swaps (`a-b, c-d` becomes `a-d, c-b`).
    #[instrument(skip(self, rng))]
    pub fn regular<R: Rng + ?Sized>(&mut self, params: &Regular, rng: &mut R) -> Result<()> {
        let Regular {
            vertices: n,
            degree: k,
            mode,
            self_loops,
        } = *params;
        let undirected = mode == Mode::Undirected;

        if n > 0 && k > n - 1 {
            return Err(Error::invalid(format!(
                "degree {k} exceeds {} for {n} vertices",
                n - 1
            )));
        }
        if undirected && (n * k) % 2 == 1 {
            return Err(Error::invalid(format!(
                "no undirected {k}-regular network on {n} vertices: n * k is odd"
            )));
        }

        let mut ties: Vec<(usize, usize)> = if undirected {
            let mut ties = ring_pairs(n, k / 2);
            if k % 2 == 1 {
                ties.extend((0..n / 2).map(|i| (i, i + n / 2)));
            }
            ties
        } else {
            (0..n)
                .flat_map(|i| (1..=k).map(move |step| (i, (i + step) % n)))
                .collect()
        };

        let key = |a: usize, b: usize| if undirected { (a.min(b), a.max(b)) } else { (a, b) };
        let mut present: HashSet<(usize, usize)> = ties.iter().map(|&(a, b)| key(a, b)).collect();
        let loops_allowed = self_loops && !undirected;

        for _ in 0..ties.len() * 4 {
            let (i, j) = (rng.gen_range(0..ties.len()), rng.gen_range(0..ties.len()));
            let (a, b) = ties[i];
            let (c, d) = if undirected && rng.gen::<bool>() {
                (ties[j].1, ties[j].0)
            } else {
                ties[j]
            };

            let distinct = a != c && b != d;
            let loops_ok = loops_allowed || (a != d && c != b);
            if !distinct || !loops_ok || present.contains(&key(a, d)) || present.contains(&key(c, b)) {
                continue;
            }

            present.remove(&key(a, b));
            present.remove(&key(c, d));
            present.insert(key(a, d));
            present.insert(key(c, b));
            ties[i] = (a, d);
            ties[j] = (c, b);
        }

        let ids = self.begin_generation(n, mode, loops_allowed, circle_position);
        for (a, b) in ties {
            self.link(ids[a], ids[b], mode)?;
        }

        self.finish_generation(n);
        Ok(())
    }

    /// Replaces the graph with a `d`-dimensional lattice of `length^d` vertices.
    ///
    /// Directed lattices only tie each vertex forward along each axis.
    pub fn lattice(&mut self, params: &Lattice) -> Result<()> {
        let Lattice {
            length,
            dimension,
            neighborhood,
            circular,
            mode,
        } = *params;

        if length < 2 || dimension == 0 {
            return Err(Error::invalid("a lattice needs length >= 2 and dimension >= 1"));
        }
        if neighborhood == 0 || neighborhood >= length {
            return Err(Error::invalid(format!(
                "neighborhood {neighborhood} must be between 1 and {}",
                length - 1
            )));
        }
        let n = length
            .checked_pow(dimension)
            .ok_or_else(|| Error::invalid(format!("{length}^{dimension} vertices overflow")))?;

        let placement = if dimension == 2 { grid_position } else { circle_position };
        let ids = self.begin_generation(n, mode, false, placement);

        for i in 0..n {
            let mut stride = 1;
            for _ in 0..dimension {
                let coordinate = (i / stride) % length;
                for step in 1..=neighborhood {
                    let moved = coordinate + step;
                    if moved >= length && !circular {
                        break;
                    }
                    let j = i - coordinate * stride + (moved % length) * stride;
                    if j != i {
                        self.link(ids[i], ids[j], mode)?;
                    }
                }
                stride *= length;
            }
            self.progress(Task::Generator, i + 1);
        }

        self.finish_generation(n);
        Ok(())
    }

    //
    // Subgraph builders
    //

    /// Ties every pair of the given vertices, in both directions when the graph is directed.
    pub fn add_clique(&mut self, members: &[VertexId]) -> Result<()> {
        self.check_members(members, 2)?;
        let mode = self.mode();

        for (i, &a) in members.iter().enumerate() {
            for &b in &members[i + 1..] {
                self.link(a, b, mode)?;
                if mode == Mode::Directed {
                    self.link(b, a, mode)?;
                }
            }
        }

        self.invalidate();
        Ok(())
    }

    /// Ties `center` to every leaf.
    pub fn add_star(&mut self, center: VertexId, leaves: &[VertexId]) -> Result<()> {
        let members: Vec<VertexId> = std::iter::once(center).chain(leaves.iter().copied()).collect();
        self.check_members(&members, 2)?;
        let mode = self.mode();

        for &leaf in leaves {
            self.link(center, leaf, mode)?;
        }

        self.invalidate();
        Ok(())
    }

    /// Ties consecutive vertices and closes the ring.
    pub fn add_cycle(&mut self, members: &[VertexId]) -> Result<()> {
        self.check_members(members, 3)?;
        let mode = self.mode();

        for (&a, &b) in members.iter().zip(members.iter().cycle().skip(1)) {
            self.link(a, b, mode)?;
        }

        self.invalidate();
        Ok(())
    }

    /// Ties consecutive vertices.
    pub fn add_line(&mut self, members: &[VertexId]) -> Result<()> {
        self.check_members(members, 2)?;
        let mode = self.mode();

        for pair in members.windows(2) {
            self.link(pair[0], pair[1], mode)?;
        }

        self.invalidate();
        Ok(())
    }

    //
    // Private
    //

    fn mode(&self) -> Mode {
        if self.is_directed() {
            Mode::Directed
        } else {
            Mode::Undirected
        }
    }

    fn check_members(&self, members: &[VertexId], min: usize) -> Result<()> {
        if members.len() < min {
            return Err(Error::invalid(format!("at least {min} vertices are needed")));
        }

        let mut seen = HashSet::new();
        for &id in members {
            self.vertex(id)?;
            if !seen.insert(id) {
                return Err(Error::invalid(format!("vertex {id} listed twice")));
            }
        }

        Ok(())
    }

    /// Resets the graph to `n` fresh vertices in the requested mode.
    fn begin_generation(
        &mut self,
        n: usize,
        mode: Mode,
        self_loops: bool,
        placement: fn(usize, usize, Canvas) -> Position,
    ) -> Vec<VertexId> {
        self.clear();
        match mode {
            Mode::Directed => self.set_directed(),
            Mode::Undirected => self.set_undirected(),
        }
        self.allow_self_loops(self_loops);

        self.notify(Event::ComputationStarted {
            task: Task::Generator,
            total: n,
        });

        let canvas = self.canvas();
        (0..n)
            .map(|i| self.add_vertex_at(placement(i, n, canvas)))
            .collect()
    }

    fn finish_generation(&mut self, n: usize) {
        self.invalidate();
        self.progress(Task::Generator, n);
        self.notify(Event::ComputationFinished {
            task: Task::Generator,
        });
        debug!(vertices = n, edges = self.edge_count(), "network generated");
    }

    /// Writes a unit tie without invalidating; callers invalidate once when done.
    fn link(&mut self, a: VertexId, b: VertexId, mode: Mode) -> Result<()> {
        match mode {
            Mode::Directed => {
                self.insert_arc_checked(a, b, 1.0)?;
            }
            Mode::Undirected => {
                let relation = self.current_relation();
                self.write_arc(relation, a, b, 1.0, EdgeType::Undirected);
                self.write_arc(relation, b, a, 1.0, EdgeType::Undirected);
            }
        }
        Ok(())
    }

    fn unlink(&mut self, a: VertexId, b: VertexId) -> Result<()> {
        self.remove_edge(a, b)
    }

    /// Whether a tie joins the pair either way.
    fn tied(&self, a: VertexId, b: VertexId) -> bool {
        self.has_edge(a, b) || self.has_edge(b, a)
    }
}

/// Every tie a random network may contain, as dense positions.
fn candidate_pairs(n: usize, mode: Mode, self_loops: bool) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for a in 0..n {
        if self_loops {
            pairs.push((a, a));
        }
        let targets = match mode {
            Mode::Directed => 0..n,
            Mode::Undirected => a + 1..n,
        };
        pairs.extend(targets.filter(|&b| b != a).map(|b| (a, b)));
    }
    pairs
}

/// `i -> i + step` for every vertex and `step` in `1..=half`.
fn ring_pairs(n: usize, half: usize) -> Vec<(usize, usize)> {
    (0..n)
        .flat_map(|i| (1..=half).map(move |step| (i, (i + step) % n)))
        .collect()
}

fn check_ring_degree(n: usize, degree: usize) -> Result<()> {
    if degree % 2 == 1 {
        return Err(Error::invalid(format!("ring degree {degree} must be even")));
    }
    if degree >= n.max(1) {
        return Err(Error::invalid(format!(
            "ring degree {degree} must be smaller than the {n} vertices"
        )));
    }
    Ok(())
}

/// Picks an index with probability proportional to its weight, `None` when all weights are zero.
fn roulette<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> Option<usize> {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return None;
    }

    let mut remaining = rng.gen::<f64>() * total;
    for (i, &weight) in weights.iter().enumerate() {
        if remaining < weight {
            return Some(i);
        }
        remaining -= weight;
    }

    // Rounding left a sliver past the last bucket.
    weights.iter().rposition(|&w| w > 0.0)
}
