//! Shortest paths from every vertex, with the shortest-path counting needed by betweenness and
//! stress centrality fused into the same pass.
//!
//! Unweighted traversals use breadth-first search, weighted ones Dijkstra. In both cases the
//! dependency accumulation follows Ulrik Brandes, "A Faster Algorithm for Betweenness
//! Centrality" (2001), which keeps the whole computation at O(V·E) for unweighted graphs instead
//! of re-running a pass per centrality index.

use std::{
    cmp::Ordering,
    collections::{BinaryHeap, VecDeque},
};

use nalgebra::DMatrix;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::{
    config::TraversalConfig,
    error::Result,
    event::{Event, Metric, Task},
    graph::{check_weights, DenseIndex, Direction, Graph, EPSILON},
    vertex::VertexId,
};

/// All-pairs shortest path data for one traversal configuration.
#[derive(Clone, Debug, Serialize)]
pub struct Geodesics {
    config: TraversalConfig,
    index: DenseIndex,
    /// `distances[(s, t)]`, `f64::INFINITY` when `t` can't be reached from `s`.
    distances: DMatrix<f64>,
    /// Number of distinct shortest paths from `s` to `t`.
    path_counts: DMatrix<f64>,
    /// Raw betweenness summed over ordered pairs.
    pub(crate) betweenness: Vec<f64>,
    /// Raw stress summed over ordered pairs.
    pub(crate) stress: Vec<f64>,
    diameter: f64,
    total_distance: f64,
    connected_pairs: usize,
}

impl Geodesics {
    pub fn config(&self) -> TraversalConfig {
        self.config
    }

    pub fn index(&self) -> &DenseIndex {
        &self.index
    }

    pub fn distances(&self) -> &DMatrix<f64> {
        &self.distances
    }

    pub fn path_counts(&self) -> &DMatrix<f64> {
        &self.path_counts
    }

    /// Distance between two vertices in the index, `None` if either isn't part of it.
    pub fn distance(&self, source: VertexId, target: VertexId) -> Option<f64> {
        Some(self.distances[(self.index.get(source)?, self.index.get(target)?)])
    }

    /// The largest finite distance.
    pub fn diameter(&self) -> f64 {
        self.diameter
    }

    /// Sum of all finite distances between distinct vertices.
    pub fn total_distance(&self) -> f64 {
        self.total_distance
    }

    /// Ordered pairs of distinct vertices joined by a path.
    pub fn connected_pairs(&self) -> usize {
        self.connected_pairs
    }

    /// Mean length of the existing geodesics, undefined when there are none.
    pub fn average_distance(&self) -> Option<f64> {
        (self.connected_pairs > 0).then(|| self.total_distance / self.connected_pairs as f64)
    }

    /// Every ordered pair is joined by a path.
    pub fn is_connected(&self) -> bool {
        let n = self.index.len();
        self.connected_pairs == n * n.saturating_sub(1)
    }

    /// Finite distances from the `i`th vertex to the others.
    pub(crate) fn reach_from(&self, i: usize) -> Vec<f64> {
        finite_except(self.distances.row(i).iter(), i)
    }

    /// Finite distances from the others to the `i`th vertex.
    pub(crate) fn reach_to(&self, i: usize) -> Vec<f64> {
        finite_except(self.distances.column(i).iter(), i)
    }
}

impl Graph {
    /// Computes (or returns the cached) shortest paths between every pair of vertices.
    ///
    /// Only one configuration is cached at a time; asking for another recomputes.
    ///
    /// # Examples
    ///
    /// ```
    /// use socnet::config::TraversalConfig;
    /// use socnet::graph::Graph;
    ///
    /// let mut graph = Graph::new();
    /// let (a, b, c) = (graph.add_vertex(), graph.add_vertex(), graph.add_vertex());
    /// graph.add_edge(a, b, 1.0).unwrap();
    /// graph.add_edge(b, c, 1.0).unwrap();
    ///
    /// let geodesics = graph.geodesics(TraversalConfig::default()).unwrap();
    /// assert_eq!(geodesics.distance(a, c), Some(2.0));
    /// assert_eq!(geodesics.distance(c, a), Some(f64::INFINITY));
    /// assert_eq!(geodesics.diameter(), 2.0);
    /// ```
    #[instrument(skip(self))]
    pub fn geodesics(&mut self, config: TraversalConfig) -> Result<&Geodesics> {
        let cached = self.cache.geodesics.take().filter(|g| g.config == config);

        let geodesics = match cached {
            Some(geodesics) => geodesics,
            None => self.compute_geodesics(config)?,
        };

        let geodesics: &Geodesics = self.cache.geodesics.insert(geodesics);
        Ok(geodesics)
    }

    fn compute_geodesics(&mut self, config: TraversalConfig) -> Result<Geodesics> {
        let index = self.dense_index(config.drop_isolates);
        let adjacency = self.dense_adjacency(&index, Direction::Outbound);
        check_weights(&adjacency, config.into())?;

        self.notify(Event::ComputationStarted {
            task: Task::Geodesics,
            total: index.len(),
        });
        let geodesics = compute(index, &adjacency, config, |done| {
            self.progress(Task::Geodesics, done)
        });
        self.notify(Event::ComputationFinished {
            task: Task::Geodesics,
        });

        debug!(
            diameter = geodesics.diameter,
            pairs = geodesics.connected_pairs,
            "geodesics computed"
        );
        self.metric_ready(Metric::Distances);
        Ok(geodesics)
    }

    /// The length of the shortest path from `source` to `target`, `f64::INFINITY` if there is
    /// none.
    pub fn distance(
        &mut self,
        source: VertexId,
        target: VertexId,
        config: TraversalConfig,
    ) -> Result<f64> {
        self.vertex(source)?;
        self.vertex(target)?;

        if source == target {
            return Ok(0.0);
        }

        // Vertices left out of the index are dropped isolates: nothing reaches them.
        Ok(self
            .geodesics(config)?
            .distance(source, target)
            .unwrap_or(f64::INFINITY))
    }

    /// The largest finite distance between two vertices.
    pub fn diameter(&mut self, config: TraversalConfig) -> Result<f64> {
        Ok(self.geodesics(config)?.diameter())
    }

    /// Mean geodesic length, `None` when no pair is connected.
    pub fn average_distance(&mut self, config: TraversalConfig) -> Result<Option<f64>> {
        Ok(self.geodesics(config)?.average_distance())
    }

    /// Number of ordered vertex pairs joined by at least one path.
    pub fn geodesics_count(&mut self, config: TraversalConfig) -> Result<usize> {
        Ok(self.geodesics(config)?.connected_pairs())
    }

    /// Whether a path leads from `source` to `target` in the current relation.
    pub fn is_reachable(&mut self, source: VertexId, target: VertexId) -> Result<bool> {
        Ok(self
            .distance(source, target, TraversalConfig::default())?
            .is_finite())
    }

    /// Whether every vertex reaches every other one.
    pub fn is_connected(&mut self) -> Result<bool> {
        Ok(self.geodesics(TraversalConfig::default())?.is_connected())
    }

    /// The largest finite distance from a vertex, `None` when it reaches nobody.
    pub fn eccentricity(&mut self, id: VertexId, config: TraversalConfig) -> Result<Option<f64>> {
        self.vertex(id)?;
        let geodesics = self.geodesics(config)?;

        Ok(geodesics
            .index()
            .get(id)
            .and_then(|i| geodesics.reach_from(i).into_iter().reduce(f64::max)))
    }
}

//
// Helpers
//

fn finite_except<'a>(distances: impl Iterator<Item = &'a f64>, skip: usize) -> Vec<f64> {
    distances
        .enumerate()
        .filter(|(j, d)| *j != skip && d.is_finite())
        .map(|(_, d)| *d)
        .collect()
}

/// Shortest-path data from one source.
struct SingleSource {
    distance: Vec<f64>,
    sigma: Vec<f64>,
    predecessors: Vec<Vec<usize>>,
    /// Vertices in non-decreasing distance order.
    order: Vec<usize>,
}

impl SingleSource {
    fn new(n: usize, source: usize) -> Self {
        let mut distance = vec![f64::INFINITY; n];
        let mut sigma = vec![0.0; n];
        distance[source] = 0.0;
        sigma[source] = 1.0;

        Self {
            distance,
            sigma,
            predecessors: vec![Vec::new(); n],
            order: Vec::with_capacity(n),
        }
    }
}

fn bfs(source: usize, adjacency: &[Vec<(usize, f64)>]) -> SingleSource {
    let mut state = SingleSource::new(adjacency.len(), source);
    let mut queue = VecDeque::new();
    queue.push_back(source);

    while let Some(v) = queue.pop_front() {
        state.order.push(v);

        for &(w, _) in &adjacency[v] {
            if state.distance[w].is_infinite() {
                state.distance[w] = state.distance[v] + 1.0;
                queue.push_back(w);
            }
            if state.distance[w] == state.distance[v] + 1.0 {
                state.sigma[w] += state.sigma[v];
                state.predecessors[w].push(v);
            }
        }
    }

    state
}

#[derive(PartialEq)]
struct Candidate {
    cost: f64,
    vertex: usize,
}

impl Eq for Candidate {}

impl Ord for Candidate {
    // Reversed so the `BinaryHeap` pops the cheapest candidate first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.vertex.cmp(&self.vertex))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn dijkstra(
    source: usize,
    adjacency: &[Vec<(usize, f64)>],
    config: TraversalConfig,
) -> SingleSource {
    let n = adjacency.len();
    let mut state = SingleSource::new(n, source);
    let mut settled = vec![false; n];
    let mut heap = BinaryHeap::new();
    heap.push(Candidate {
        cost: 0.0,
        vertex: source,
    });

    while let Some(Candidate { vertex: v, .. }) = heap.pop() {
        if settled[v] {
            continue;
        }
        settled[v] = true;
        state.order.push(v);

        for &(w, weight) in &adjacency[v] {
            if w == v || settled[w] {
                continue;
            }

            let alternative = state.distance[v] + config.edge_cost(weight);

            if alternative < state.distance[w] - EPSILON {
                state.distance[w] = alternative;
                state.sigma[w] = state.sigma[v];
                state.predecessors[w] = vec![v];
                heap.push(Candidate {
                    cost: alternative,
                    vertex: w,
                });
            } else if (alternative - state.distance[w]).abs() <= EPSILON {
                state.sigma[w] += state.sigma[v];
                state.predecessors[w].push(v);
            }
        }
    }

    state
}

/// Runs one traversal per source and folds the results together.
fn compute(
    index: DenseIndex,
    adjacency: &[Vec<(usize, f64)>],
    config: TraversalConfig,
    mut progress: impl FnMut(usize),
) -> Geodesics {
    let n = index.len();

    let mut distances = DMatrix::from_element(n, n, f64::INFINITY);
    let mut path_counts = DMatrix::zeros(n, n);
    let mut betweenness = vec![0.0; n];
    let mut stress = vec![0.0; n];
    let mut diameter: f64 = 0.0;
    let mut total_distance = 0.0;
    let mut connected_pairs = 0;

    for s in 0..n {
        let state = if config.weighted {
            dijkstra(s, adjacency, config)
        } else {
            bfs(s, adjacency)
        };

        for t in 0..n {
            distances[(s, t)] = state.distance[t];
            path_counts[(s, t)] = state.sigma[t];

            if t != s && state.distance[t].is_finite() {
                connected_pairs += 1;
                total_distance += state.distance[t];
                diameter = diameter.max(state.distance[t]);
            }
        }

        // Accumulate dependencies in reverse distance order. `delta` counts pair dependencies
        // for betweenness, `suffixes` counts shortest-path continuations for stress.
        let mut delta = vec![0.0; n];
        let mut suffixes = vec![0.0; n];

        for &w in state.order.iter().rev() {
            for &v in &state.predecessors[w] {
                delta[v] += state.sigma[v] / state.sigma[w] * (1.0 + delta[w]);
                suffixes[v] += 1.0 + suffixes[w];
            }

            if w != s {
                betweenness[w] += delta[w];
                stress[w] += state.sigma[w] * suffixes[w];
            }
        }

        progress(s + 1);
    }

    Geodesics {
        config,
        index,
        distances,
        path_counts,
        betweenness,
        stress,
        diameter,
        total_distance,
        connected_pairs,
    }
}
