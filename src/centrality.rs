//! Centrality and prestige indices.
//!
//! Every index yields, per vertex, a raw score and a standardized score in `[0, 1]`, plus
//! [`GroupStats`] over the standardized scores. A score that cannot be computed for a vertex, such
//! as closeness for a vertex that does not reach the rest of the graph, is `None` rather than a
//! zero that would pass for a real measurement.
//!
//! Prestige indices ([`Index::is_prestige`]) read inbound ties and distances *to* a vertex; the
//! others read outbound ties and distances *from* it.

use nalgebra::{DMatrix, DVector, SymmetricEigen};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    config::{AdjacencyOptions, TraversalConfig},
    error::{Error, Result},
    event::{Event, Metric, Task},
    graph::{check_weights, DenseIndex, Direction, Graph},
    matrix::{self, Inversion},
    vertex::VertexId,
};

/// PageRank damping factor.
const DAMPING: f64 = 0.85;
/// Iteration bound for PageRank and non-symmetric eigenvector centrality.
const MAX_ITERATIONS: usize = 100;
const TOLERANCE: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Index {
    /// Out-degree, or out-strength when weighted.
    Degree,
    /// Inverse of the summed distances to every other vertex.
    Closeness,
    /// Closeness restricted to the vertices a vertex actually reaches.
    InfluenceRangeCloseness,
    /// Share of the shortest paths between other pairs that pass through a vertex.
    Betweenness,
    /// Number of shortest paths between other pairs that pass through a vertex.
    Stress,
    /// Inverse of the largest distance to a reachable vertex.
    Eccentricity,
    /// Gil-Schmidt power: inverse distances to reachable vertices, summed.
    Power,
    /// Stephenson-Zelen information centrality.
    Information,
    Eigenvector,
    /// In-degree, or in-strength when weighted.
    DegreePrestige,
    /// Lin's proximity prestige over a vertex's influence domain.
    ProximityPrestige,
    PageRank,
}

impl Index {
    pub const ALL: [Index; 12] = [
        Index::Degree,
        Index::Closeness,
        Index::InfluenceRangeCloseness,
        Index::Betweenness,
        Index::Stress,
        Index::Eccentricity,
        Index::Power,
        Index::Information,
        Index::Eigenvector,
        Index::DegreePrestige,
        Index::ProximityPrestige,
        Index::PageRank,
    ];

    /// Whether the index reads inbound ties.
    pub fn is_prestige(self) -> bool {
        matches!(
            self,
            Index::DegreePrestige | Index::ProximityPrestige | Index::PageRank
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct VertexScore {
    pub id: VertexId,
    pub raw: Option<f64>,
    pub std: Option<f64>,
}

/// Aggregates over the defined standardized scores.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct GroupStats {
    /// Number of vertices with a defined score.
    pub defined: usize,
    pub min: f64,
    pub max: f64,
    pub sum: f64,
    pub mean: f64,
    pub variance: f64,
    /// Freeman group centralization: `Σ (max - score)` over its largest possible value, so it
    /// lies in `[0, 1]`. Degree, closeness and betweenness use their star-graph bounds; the other
    /// indices use `n - 1`, the bound for any scores in `[0, 1]`. Only available on graphs of at
    /// least three vertices where every score is defined.
    pub centralization: Option<f64>,
}

impl GroupStats {
    fn new(index: Index, config: TraversalConfig, symmetric: bool, scores: &[VertexScore]) -> Self {
        let values: Vec<f64> = scores.iter().filter_map(|s| s.std).collect();
        if values.is_empty() {
            return Self::default();
        }

        let count = values.len() as f64;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let sum: f64 = values.iter().sum();
        let mean = sum / count;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;

        let n = scores.len() as f64;
        let bound = match index {
            _ if scores.len() < 3 || values.len() < scores.len() => None,
            Index::Degree | Index::DegreePrestige if !config.weighted && symmetric => Some(n - 2.0),
            Index::Closeness if !config.weighted => Some((n - 1.0) * (n - 2.0) / (2.0 * n - 3.0)),
            _ => Some(n - 1.0),
        };
        let centralization = bound.map(|bound| values.iter().map(|v| max - v).sum::<f64>() / bound);

        Self {
            defined: values.len(),
            min,
            max,
            sum,
            mean,
            variance,
            centralization,
        }
    }
}

/// The scores of one index under one configuration.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Prominence {
    index: Index,
    config: TraversalConfig,
    /// Ordered by vertex id.
    scores: Vec<VertexScore>,
    stats: GroupStats,
}

impl Prominence {
    pub fn index(&self) -> Index {
        self.index
    }

    pub fn config(&self) -> TraversalConfig {
        self.config
    }

    pub fn scores(&self) -> &[VertexScore] {
        &self.scores
    }

    pub fn stats(&self) -> &GroupStats {
        &self.stats
    }

    pub fn get(&self, id: VertexId) -> Option<&VertexScore> {
        self.scores
            .binary_search_by_key(&id, |s| s.id)
            .ok()
            .map(|i| &self.scores[i])
    }

    /// The raw score of a vertex.
    ///
    /// Fails with [`Error::Undefined`] when the vertex has no score: either it was excluded from
    /// the computation or the index is not defined for it.
    pub fn score(&self, id: VertexId) -> Result<f64> {
        self.get(id)
            .and_then(|s| s.raw)
            .ok_or_else(|| self.undefined(id))
    }

    /// The standardized score of a vertex.
    pub fn std_score(&self, id: VertexId) -> Result<f64> {
        self.get(id)
            .and_then(|s| s.std)
            .ok_or_else(|| self.undefined(id))
    }

    /// Defined scores, highest standardized score first.
    pub fn ranked(&self) -> Vec<&VertexScore> {
        let mut ranked: Vec<&VertexScore> = self.scores.iter().filter(|s| s.std.is_some()).collect();
        ranked.sort_by(|a, b| {
            b.std
                .unwrap_or_default()
                .total_cmp(&a.std.unwrap_or_default())
                .then(a.id.cmp(&b.id))
        });
        ranked
    }

    fn undefined(&self, id: VertexId) -> Error {
        Error::Undefined(format!("{:?} of vertex {id}", self.index))
    }
}

/// How raw scores are brought into `[0, 1]`.
#[derive(Clone, Copy, Debug)]
enum Scale {
    By(f64),
    Sum,
    Max,
}

impl Scale {
    fn apply(self, raw: &[Option<f64>]) -> Vec<Option<f64>> {
        let factor = match self {
            Scale::By(factor) => factor,
            Scale::Sum => reciprocal(raw.iter().flatten().sum()),
            Scale::Max => reciprocal(raw.iter().flatten().copied().fold(0.0, f64::max)),
        };
        raw.iter().map(|r| r.map(|r| r * factor)).collect()
    }
}

/// `1 / x`, or `0` so that an all-zero vector standardizes to zeros.
fn reciprocal(x: f64) -> f64 {
    if x == 0.0 {
        0.0
    } else {
        1.0 / x
    }
}

struct Scored {
    index: DenseIndex,
    raw: Vec<Option<f64>>,
    scale: Scale,
}

impl Graph {
    /// Computes (or returns the cached) scores of a centrality or prestige index.
    ///
    /// # Examples
    ///
    /// ```
    /// use socnet::centrality::Index;
    /// use socnet::config::TraversalConfig;
    /// use socnet::graph::Graph;
    ///
    /// let mut graph = Graph::new();
    /// graph.set_undirected();
    /// let hub = graph.add_vertex();
    /// for _ in 0..3 {
    ///     let leaf = graph.add_vertex();
    ///     graph.add_edge(hub, leaf, 1.0).unwrap();
    /// }
    ///
    /// let degree = graph.prominence(Index::Degree, TraversalConfig::default()).unwrap();
    /// assert_eq!(degree.score(hub).unwrap(), 3.0);
    /// assert_eq!(degree.std_score(hub).unwrap(), 1.0);
    /// assert!(degree.stats().centralization.unwrap() > 0.99);
    /// ```
    #[instrument(skip(self))]
    pub fn prominence(&mut self, index: Index, config: TraversalConfig) -> Result<&Prominence> {
        let key = (index, config);

        let prominence = match self.cache.prominence.remove(&key) {
            Some(prominence) => prominence,
            None => self.compute_prominence(index, config)?,
        };

        let prominence: &Prominence = self.cache.prominence.entry(key).or_insert(prominence);
        Ok(prominence)
    }

    /// The raw score of one vertex.
    pub fn centrality(&mut self, id: VertexId, index: Index, config: TraversalConfig) -> Result<f64> {
        self.vertex(id)?;
        self.prominence(index, config)?.score(id)
    }

    //
    // Private
    //

    fn compute_prominence(&mut self, index: Index, config: TraversalConfig) -> Result<Prominence> {
        let dense = self.dense_index(config.drop_isolates);
        check_weights(&self.dense_adjacency(&dense, Direction::Outbound), config.into())?;
        let symmetric = matrix::is_symmetric(&self.adjacency_values(&dense, config.into()));

        self.notify(Event::ComputationStarted {
            task: Task::Centrality,
            total: dense.len(),
        });
        let computed = self.score_index(index, config, symmetric);
        self.notify(Event::ComputationFinished {
            task: Task::Centrality,
        });
        let Scored { index: dense, raw, scale } = computed?;

        let std = scale.apply(&raw);
        let scores: Vec<VertexScore> = dense
            .ids()
            .iter()
            .zip(raw)
            .zip(std)
            .map(|((id, raw), std)| VertexScore { id: *id, raw, std })
            .collect();
        let stats = GroupStats::new(index, config, symmetric, &scores);
        debug!(?index, defined = stats.defined, max = stats.max, "prominence computed");

        self.metric_ready(Metric::Prominence(index));
        Ok(Prominence {
            index,
            config,
            scores,
            stats,
        })
    }

    fn score_index(&mut self, index: Index, config: TraversalConfig, symmetric: bool) -> Result<Scored> {
        match index {
            Index::Degree => Ok(self.degree_scores(config, Direction::Outbound)),
            Index::DegreePrestige => Ok(self.degree_scores(config, Direction::Inbound)),
            Index::Information => self.information_scores(config),
            Index::Eigenvector => Ok(self.eigenvector_scores(config)),
            Index::PageRank => Ok(self.pagerank_scores(config)),
            _ => self.geodesic_scores(index, config, symmetric),
        }
    }

    fn degree_scores(&self, config: TraversalConfig, direction: Direction) -> Scored {
        let index = self.dense_index(config.drop_isolates);
        let raw = self
            .dense_adjacency(&index, direction)
            .iter()
            .map(|ties| {
                Some(if config.weighted {
                    ties.iter().map(|(_, w)| w).sum()
                } else {
                    ties.len() as f64
                })
            })
            .collect();

        let scale = if config.weighted {
            Scale::Sum
        } else {
            Scale::By(reciprocal(index.len().saturating_sub(1) as f64))
        };

        Scored { index, raw, scale }
    }

    /// The indices read off the all-pairs geodesics.
    fn geodesic_scores(
        &mut self,
        index: Index,
        config: TraversalConfig,
        symmetric: bool,
    ) -> Result<Scored> {
        let geodesics = self.geodesics(config)?;
        let n = geodesics.index().len();
        let others = n.saturating_sub(1) as f64;
        // Each unordered pair is counted from both ends in a symmetric graph.
        let pair_factor = if symmetric { 0.5 } else { 1.0 };

        let raw = (0..n)
            .map(|i| match index {
                Index::Closeness => {
                    let reach = geodesics.reach_from(i);
                    let total: f64 = reach.iter().sum();
                    (n > 1 && reach.len() == n - 1 && total > 0.0).then(|| 1.0 / total)
                }
                Index::InfluenceRangeCloseness => influence_range(&geodesics.reach_from(i), others),
                Index::ProximityPrestige => influence_range(&geodesics.reach_to(i), others),
                Index::Betweenness => Some(geodesics.betweenness[i] * pair_factor),
                Index::Stress => Some(geodesics.stress[i] * pair_factor),
                Index::Eccentricity => geodesics
                    .reach_from(i)
                    .into_iter()
                    .reduce(f64::max)
                    .filter(|e| *e > 0.0)
                    .map(|e| 1.0 / e),
                Index::Power => Some(
                    geodesics
                        .reach_from(i)
                        .iter()
                        .filter(|d| **d > 0.0)
                        .map(|d| 1.0 / d)
                        .sum(),
                ),
                _ => None,
            })
            .collect();

        // The fixed factors assume every distance is at least one hop. Weighted distances can be
        // shorter, so those indices fall back to the observed maximum.
        let scale = match index {
            Index::Betweenness if n > 2 => {
                Scale::By(1.0 / (pair_factor * (n - 1) as f64 * (n - 2) as f64))
            }
            Index::Betweenness => Scale::By(0.0),
            _ if config.weighted => Scale::Max,
            Index::Closeness => Scale::By(others),
            Index::Power => Scale::By(reciprocal(others)),
            Index::InfluenceRangeCloseness | Index::ProximityPrestige => Scale::By(1.0),
            _ => Scale::Max,
        };

        Ok(Scored {
            index: geodesics.index().clone(),
            raw,
            scale,
        })
    }

    /// Stephenson-Zelen information centrality over the symmetrized graph without isolates.
    fn information_scores(&self, config: TraversalConfig) -> Result<Scored> {
        let index = self.dense_index(true);
        let options = AdjacencyOptions::from(config)
            .symmetrize(true)
            .drop_isolates(true);
        let adjacency = self.adjacency_values(&index, options);
        let n = index.len();

        if n == 0 {
            return Ok(Scored {
                index,
                raw: vec![],
                scale: Scale::Sum,
            });
        }

        let b = DMatrix::from_fn(n, n, |i, j| {
            if i == j {
                1.0 + adjacency.row(i).sum() - adjacency[(i, i)]
            } else {
                1.0 - adjacency[(i, j)]
            }
        });
        let c = matrix::invert(&b, Inversion::Lu)?;

        let trace = c.trace();
        let row = c.row(0).sum();
        let raw = (0..n)
            .map(|i| {
                let d = c[(i, i)] + (trace - 2.0 * row) / n as f64;
                (d > 0.0).then(|| 1.0 / d)
            })
            .collect();

        Ok(Scored {
            index,
            raw,
            scale: Scale::Sum,
        })
    }

    fn eigenvector_scores(&self, config: TraversalConfig) -> Scored {
        let index = self.dense_index(config.drop_isolates);
        let adjacency = self.adjacency_values(&index, config.into());

        let vector = if matrix::is_symmetric(&adjacency) {
            principal_eigenvector(adjacency)
        } else {
            power_iteration(&adjacency)
        };

        Scored {
            index,
            raw: vector.into_iter().map(Some).collect(),
            scale: Scale::Max,
        }
    }

    /// PageRank by power iteration. Dangling vertices spread their rank evenly.
    fn pagerank_scores(&self, config: TraversalConfig) -> Scored {
        let index = self.dense_index(config.drop_isolates);
        let options = AdjacencyOptions::from(config);
        let outbound: Vec<Vec<(usize, f64)>> = self
            .dense_adjacency(&index, Direction::Outbound)
            .into_iter()
            .map(|ties| {
                ties.into_iter()
                    .map(|(j, w)| (j, if config.weighted { options.cell_value(w) } else { 1.0 }))
                    .collect()
            })
            .collect();

        let n = index.len();
        if n == 0 {
            return Scored {
                index,
                raw: vec![],
                scale: Scale::Max,
            };
        }

        let out_weight: Vec<f64> = outbound
            .iter()
            .map(|ties| ties.iter().map(|(_, w)| w).sum())
            .collect();
        let base = (1.0 - DAMPING) / n as f64;

        let mut scores = vec![1.0 / n as f64; n];
        for iteration in 0..MAX_ITERATIONS {
            let mut next = vec![base; n];

            for (u, ties) in outbound.iter().enumerate() {
                if out_weight[u] > 0.0 {
                    for (v, w) in ties {
                        next[*v] += DAMPING * scores[u] * w / out_weight[u];
                    }
                } else {
                    let share = DAMPING * scores[u] / n as f64;
                    next.iter_mut().for_each(|s| *s += share);
                }
            }

            let diff: f64 = scores.iter().zip(&next).map(|(a, b)| (a - b).abs()).sum();
            scores = next;

            if diff < TOLERANCE {
                debug!(iterations = iteration + 1, "pagerank converged");
                break;
            }
        }

        Scored {
            index,
            raw: scores.into_iter().map(Some).collect(),
            scale: Scale::Max,
        }
    }
}

/// `(reach / others) / mean distance`, `None` when nothing is reached.
fn influence_range(reach: &[f64], others: f64) -> Option<f64> {
    let count = reach.len() as f64;
    let total: f64 = reach.iter().sum();

    (count > 0.0 && total > 0.0).then(|| (count / others) / (total / count))
}

/// Component magnitudes of the eigenvector of the largest eigenvalue.
fn principal_eigenvector(matrix: DMatrix<f64>) -> Vec<f64> {
    sorted_eigenvalue_vector_pairs(matrix)
        .first()
        .map(|(_, vector)| vector.iter().map(|x| x.abs()).collect())
        .unwrap_or_default()
}

/// Computes the eigenvalues and corresponding eigenvectors of the supplied symmetric matrix,
/// largest eigenvalue first.
fn sorted_eigenvalue_vector_pairs(matrix: DMatrix<f64>) -> Vec<(f64, DVector<f64>)> {
    // The decomposition requires a matrix with at least a dim of 1x1.
    if matrix.is_empty() {
        return vec![];
    }

    let eigen = SymmetricEigen::new(matrix);

    let mut pairs: Vec<(f64, DVector<f64>)> = eigen
        .eigenvalues
        .iter()
        .zip(eigen.eigenvectors.column_iter())
        .map(|(value, vector)| (*value, vector.clone_owned()))
        .collect();

    pairs.sort_unstable_by(|(a, _), (b, _)| b.total_cmp(a));
    pairs
}

/// Dominant eigenvector of `Aᵀ` by power iteration: a vertex scores the sum of the scores of the
/// vertices pointing at it. Iterates on `Aᵀ + I`, which has the same eigenvectors but no
/// oscillation on periodic graphs.
fn power_iteration(adjacency: &DMatrix<f64>) -> Vec<f64> {
    let n = adjacency.nrows();
    let shifted = adjacency.transpose() + DMatrix::<f64>::identity(n, n);
    let mut scores = DVector::from_element(n, 1.0 / (n as f64).sqrt());

    for _ in 0..MAX_ITERATIONS {
        let mut next = &shifted * &scores;
        let norm = next.norm();
        if norm == 0.0 {
            break;
        }
        next.unscale_mut(norm);

        let diff = (&next - &scores).norm();
        scores = next;
        if diff < TOLERANCE {
            break;
        }
    }

    scores.iter().copied().collect()
}
