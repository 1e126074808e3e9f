//! Agglomerative hierarchical clustering.
//!
//! Clusters are numbered the usual way: the `n` input vertices are clusters `0..n` (in matrix
//! order) and the cluster created by merge step `s` is `n + s`.

use std::fmt;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    config::{AdjacencyOptions, TraversalConfig},
    error::{Error, Result},
    event::{Event, Task},
    graph::Graph,
    matrix::{self, Dissimilarity, Profile, VertexMatrix},
    vertex::VertexId,
};

/// How the proximity of two clusters follows from the proximities of their members.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Linkage {
    /// Closest pair of members.
    Single,
    /// Farthest pair of members.
    Complete,
    /// Mean over all member pairs (UPGMA).
    #[default]
    Average,
}

/// Whether larger matrix values mean closer (similarity) or farther (dissimilarity).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Proximity {
    Similarity,
    Dissimilarity,
}

/// Which matrix holds the tie profiles compared when clustering a graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClusterSource {
    Adjacency,
    /// Geodesic distances. Unreachable pairs count as one step beyond the diameter.
    Distances,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MergeStep {
    /// Proximity at which the two clusters were joined.
    pub level: f64,
    pub merged: (usize, usize),
    /// Id of the new cluster.
    pub cluster: usize,
    pub size: usize,
    /// Member vertices of the new cluster. Empty unless the dendrogram was built detailed.
    pub members: Vec<VertexId>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Dendrogram {
    ids: Vec<VertexId>,
    steps: Vec<MergeStep>,
}

impl Dendrogram {
    /// The clustered vertices; leaf cluster `i` is `ids[i]`.
    pub fn ids(&self) -> &[VertexId] {
        &self.ids
    }

    pub fn steps(&self) -> &[MergeStep] {
        &self.steps
    }

    /// The partition into `k` clusters obtained by stopping `k - 1` merges before the end.
    pub fn cut(&self, k: usize) -> Result<Vec<Vec<VertexId>>> {
        let n = self.ids.len();
        if k == 0 || k > n {
            return Err(Error::invalid(format!("cannot cut {n} vertices into {k} clusters")));
        }

        let mut clusters: Vec<Option<Vec<VertexId>>> = self.ids.iter().map(|id| Some(vec![*id])).collect();
        for step in &self.steps[..n - k] {
            let mut members = clusters[step.merged.0].take().unwrap_or_default();
            members.extend(clusters[step.merged.1].take().unwrap_or_default());
            members.sort_unstable();
            clusters.push(Some(members));
        }

        let mut partition: Vec<Vec<VertexId>> = clusters.into_iter().flatten().collect();
        partition.sort();
        Ok(partition)
    }
}

impl fmt::Display for Dendrogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            write!(
                f,
                "{:>10.4}  {:>4} + {:<4} -> {:<4} ({})",
                step.level, step.merged.0, step.merged.1, step.cluster, step.size
            )?;
            if !step.members.is_empty() {
                write!(f, " {:?}", step.members)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Clusters the rows of a proximity matrix.
///
/// Fails when the matrix holds undefined (`NaN`) or infinite values.
///
/// # Examples
///
/// ```
/// use nalgebra::dmatrix;
/// use socnet::clustering::{cluster, Linkage, Proximity};
/// use socnet::matrix::VertexMatrix;
///
/// let distances = VertexMatrix::new(
///     vec![1, 2, 3],
///     dmatrix![0.0, 1.0, 5.0;
///              1.0, 0.0, 4.0;
///              5.0, 4.0, 0.0],
/// )
/// .unwrap();
///
/// let dendrogram = cluster(&distances, Proximity::Dissimilarity, Linkage::Single, false).unwrap();
/// assert_eq!(dendrogram.steps()[0].merged, (0, 1));
/// assert_eq!(dendrogram.steps()[1].level, 4.0);
/// assert_eq!(dendrogram.cut(2).unwrap(), vec![vec![1, 2], vec![3]]);
/// ```
pub fn cluster(
    matrix: &VertexMatrix,
    proximity: Proximity,
    linkage: Linkage,
    detailed: bool,
) -> Result<Dendrogram> {
    cluster_with_progress(matrix, proximity, linkage, detailed, |_| {})
}

fn cluster_with_progress(
    matrix: &VertexMatrix,
    proximity: Proximity,
    linkage: Linkage,
    detailed: bool,
    mut progress: impl FnMut(usize),
) -> Result<Dendrogram> {
    let n = matrix.len();
    if matrix.values.nrows() != n || matrix.values.ncols() != n {
        return Err(Error::invalid("proximity matrix must be square and labelled"));
    }
    if matrix.values.iter().any(|v| !v.is_finite()) {
        return Err(Error::invalid("proximity matrix holds undefined values"));
    }

    // Work with distances throughout: negated similarities order the same way.
    let sign = match proximity {
        Proximity::Similarity => -1.0,
        Proximity::Dissimilarity => 1.0,
    };
    let mut distance: DMatrix<f64> = matrix.values.map(|v| sign * v);

    let mut alive = vec![true; n];
    let mut cluster_of: Vec<usize> = (0..n).collect();
    let mut members: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();
    let mut steps = Vec::with_capacity(n.saturating_sub(1));

    for step in 0..n.saturating_sub(1) {
        let mut best: Option<(usize, usize, f64)> = None;
        for a in (0..n).filter(|a| alive[*a]) {
            for b in (a + 1..n).filter(|b| alive[*b]) {
                if best.map_or(true, |(.., d)| distance[(a, b)] < d) {
                    best = Some((a, b, distance[(a, b)]));
                }
            }
        }
        let Some((a, b, level)) = best else {
            break;
        };

        let (size_a, size_b) = (members[a].len() as f64, members[b].len() as f64);
        for k in (0..n).filter(|k| alive[*k] && *k != a && *k != b) {
            let (da, db) = (distance[(k, a)], distance[(k, b)]);
            let merged = match linkage {
                Linkage::Single => da.min(db),
                Linkage::Complete => da.max(db),
                Linkage::Average => (size_a * da + size_b * db) / (size_a + size_b),
            };
            distance[(k, a)] = merged;
            distance[(a, k)] = merged;
        }

        let absorbed = std::mem::take(&mut members[b]);
        members[a].extend(absorbed);
        alive[b] = false;

        let cluster = n + step;
        let merged = (cluster_of[a], cluster_of[b]);
        cluster_of[a] = cluster;

        let mut ids: Vec<VertexId> = if detailed {
            members[a].iter().map(|i| matrix.ids()[*i]).collect()
        } else {
            vec![]
        };
        ids.sort_unstable();

        steps.push(MergeStep {
            level: sign * level,
            merged,
            cluster,
            size: members[a].len(),
            members: ids,
        });
        progress(step + 1);
    }

    Ok(Dendrogram {
        ids: matrix.ids().to_vec(),
        steps,
    })
}

impl Graph {
    /// Clusters the vertices by the dissimilarity of their tie profiles.
    #[instrument(skip(self))]
    pub fn hierarchical_clustering(
        &mut self,
        source: ClusterSource,
        metric: Dissimilarity,
        linkage: Linkage,
        detailed: bool,
    ) -> Result<Dendrogram> {
        let input = match source {
            ClusterSource::Adjacency => self.adjacency_matrix(AdjacencyOptions::default()),
            ClusterSource::Distances => {
                let mut distances = self.distance_matrix(TraversalConfig::default())?;
                let beyond = self.diameter(TraversalConfig::default())? + 1.0;
                distances
                    .values
                    .apply(|d| *d = if d.is_finite() { *d } else { beyond });
                distances
            }
        };

        let mut profiles = input;
        profiles.values = matrix::dissimilarity(&profiles.values, metric, Profile::Rows, true);

        self.notify(Event::ComputationStarted {
            task: Task::Clustering,
            total: profiles.len().saturating_sub(1),
        });
        let dendrogram = cluster_with_progress(
            &profiles,
            Proximity::Dissimilarity,
            linkage,
            detailed,
            |done| self.progress(Task::Clustering, done),
        );
        self.notify(Event::ComputationFinished {
            task: Task::Clustering,
        });

        let dendrogram = dendrogram?;
        debug!(steps = dendrogram.steps.len(), "clustering finished");
        Ok(dendrogram)
    }
}
