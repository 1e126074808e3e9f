//! Cohesion measures and the transforms that derive new ties from existing ones.

use std::collections::{BTreeSet, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    config::{AdjacencyOptions, TraversalConfig},
    edge::{Dyad, EdgeType},
    error::Result,
    event::Metric,
    graph::{Direction, Graph},
    vertex::VertexId,
};

/// How many ties are returned. Self-loops are ignored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Reciprocity {
    pub arcs: usize,
    /// Arcs whose opposite arc exists.
    pub reciprocated_arcs: usize,
    /// Pairs tied in both directions.
    pub mutual_dyads: usize,
    /// Pairs tied in at least one direction.
    pub connected_dyads: usize,
    /// `reciprocated_arcs / arcs`.
    pub arc: f64,
    /// `mutual_dyads / connected_dyads`.
    pub dyad: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Connectedness {
    /// Symmetric and every vertex reaches every other one.
    Connected,
    /// Every vertex reaches every other one along directed paths.
    StronglyConnected,
    /// Of every pair, at least one reaches the other.
    Unilateral,
    /// Connected once directions are ignored.
    WeaklyConnected,
    Disconnected,
}

/// `(source, target, weight, kind)`.
type Arc = (VertexId, VertexId, f64, EdgeType);

impl Graph {
    /// Arc and dyad reciprocity of the current relation.
    ///
    /// # Examples
    ///
    /// ```
    /// use socnet::graph::Graph;
    ///
    /// let mut graph = Graph::new();
    /// let (a, b, c) = (graph.add_vertex(), graph.add_vertex(), graph.add_vertex());
    /// graph.add_edge(a, b, 1.0).unwrap();
    /// graph.add_edge(b, a, 1.0).unwrap();
    /// graph.add_edge(a, c, 1.0).unwrap();
    ///
    /// let reciprocity = graph.reciprocity();
    /// assert_eq!(reciprocity.arc, 2.0 / 3.0);
    /// assert_eq!(reciprocity.dyad, 0.5);
    /// ```
    pub fn reciprocity(&mut self) -> Reciprocity {
        if let Some(reciprocity) = self.cache.reciprocity {
            return reciprocity;
        }

        let arcs: Vec<Arc> = self
            .arcs()
            .into_iter()
            .filter(|(s, t, ..)| s != t)
            .collect();
        let reciprocated_arcs = arcs
            .iter()
            .filter(|(s, t, ..)| self.has_edge(*t, *s))
            .count();
        let mutual_dyads = reciprocated_arcs / 2;
        let connected_dyads = arcs
            .iter()
            .map(|(s, t, ..)| Dyad::new(*s, *t))
            .collect::<HashSet<_>>()
            .len();

        let reciprocity = Reciprocity {
            arcs: arcs.len(),
            reciprocated_arcs,
            mutual_dyads,
            connected_dyads,
            arc: ratio(reciprocated_arcs, arcs.len()),
            dyad: ratio(mutual_dyads, connected_dyads),
        };

        self.cache.reciprocity = Some(reciprocity);
        self.metric_ready(Metric::Reciprocity);
        reciprocity
    }

    /// Share of the possible ties among a vertex's neighbours that exist.
    ///
    /// `None` for vertices with fewer than two neighbours.
    pub fn clustering_coefficient(&self, id: VertexId) -> Result<Option<f64>> {
        let relation = self.current_relation();
        let vertex = self.vertex(id)?;

        let neighbours: BTreeSet<VertexId> = vertex
            .outbound(relation)
            .map(|(target, _)| target)
            .chain(vertex.inbound(relation).map(|(source, _)| source))
            .filter(|n| *n != id)
            .collect();

        let k = neighbours.len();
        if k < 2 {
            return Ok(None);
        }

        let mut ties = 0;
        for n in &neighbours {
            ties += self
                .vertex(*n)?
                .outbound(relation)
                .filter(|(target, _)| target != n && neighbours.contains(target))
                .count();
        }

        Ok(Some(ties as f64 / (k * (k - 1)) as f64))
    }

    /// Mean clustering coefficient over the vertices where it is defined.
    pub fn average_clustering_coefficient(&self) -> Option<f64> {
        let coefficients: Vec<f64> = self
            .vertex_ids()
            .filter_map(|id| self.clustering_coefficient(id).ok().flatten())
            .collect();

        (!coefficients.is_empty())
            .then(|| coefficients.iter().sum::<f64>() / coefficients.len() as f64)
    }

    /// Classifies how well the current relation holds the vertices together.
    pub fn connectedness(&mut self) -> Result<Connectedness> {
        let symmetric = self.is_symmetric();
        let geodesics = self.geodesics(TraversalConfig::default())?;
        let distances = geodesics.distances();
        let n = geodesics.index().len();

        let strong = distances.iter().all(|d| d.is_finite());
        let unilateral = (0..n).all(|i| {
            (i + 1..n).all(|j| distances[(i, j)].is_finite() || distances[(j, i)].is_finite())
        });

        Ok(match (strong, symmetric) {
            (true, true) => Connectedness::Connected,
            (true, false) => Connectedness::StronglyConnected,
            (false, true) => Connectedness::Disconnected,
            (false, false) if unilateral => Connectedness::Unilateral,
            (false, false) if self.weakly_connected() => Connectedness::WeaklyConnected,
            (false, false) => Connectedness::Disconnected,
        })
    }

    /// Adds the missing opposite of every arc in the current relation. A pair tied both ways
    /// ends up with the larger of its two weights.
    pub fn symmetrize(&mut self) {
        let relation = self.current_relation();

        for (source, target, weight, kind) in self.arcs() {
            if source == target {
                continue;
            }

            let weight = self.edge_weight(target, source).map_or(weight, |w| w.max(weight));
            let kind = match kind {
                EdgeType::Undirected => EdgeType::Undirected,
                _ => EdgeType::Reciprocated,
            };
            self.write_arc(relation, source, target, weight, kind);
            self.write_arc(relation, target, source, weight, kind);
        }

        self.invalidate();
    }

    /// Creates (and switches to) a relation holding an undirected tie for every reciprocated pair
    /// of the current relation. Returns the new relation's index.
    pub fn symmetrize_strong_ties(&mut self) -> usize {
        let mut ties = Vec::new();
        for (source, target, weight, _) in self.arcs() {
            if source < target {
                if let Some(reverse) = self.edge_weight(target, source) {
                    ties.extend(undirected(source, target, weight.max(reverse)));
                }
            }
        }

        self.derive_relation("strong ties", ties)
    }

    /// Creates (and switches to) a relation tying every pair of vertices that are both targets of
    /// a common source, weighted by the number of such sources.
    pub fn cocitation(&mut self) -> usize {
        let index = self.dense_index(false);
        let adjacency = self.adjacency_values(&index, AdjacencyOptions::default());
        let cocitations = adjacency.transpose() * &adjacency;

        let mut ties = Vec::new();
        for i in 0..index.len() {
            for j in i + 1..index.len() {
                if cocitations[(i, j)] > 0.0 {
                    ties.extend(undirected(index.id(i), index.id(j), cocitations[(i, j)]));
                }
            }
        }

        self.derive_relation("cocitation", ties)
    }

    /// Creates (and switches to) a binary relation keeping the ties heavier than `threshold`.
    pub fn dichotomize(&mut self, threshold: f64) -> usize {
        let kept: HashSet<(VertexId, VertexId)> = self
            .arcs()
            .into_iter()
            .filter(|(.., weight, _)| *weight > threshold)
            .map(|(source, target, ..)| (source, target))
            .collect();

        let ties = kept
            .iter()
            .map(|&(source, target)| {
                let kind = match self.edge(source, target).map(|e| e.kind) {
                    Ok(EdgeType::Undirected) => EdgeType::Undirected,
                    _ if source != target && kept.contains(&(target, source)) => {
                        EdgeType::Reciprocated
                    }
                    _ => EdgeType::Directed,
                };
                (source, target, 1.0, kind)
            })
            .collect();

        self.derive_relation(format!("dichotomized > {threshold}"), ties)
    }

    //
    // Private
    //

    /// Every arc of the current relation, undirected ties as two arcs.
    fn arcs(&self) -> Vec<Arc> {
        let relation = self.current_relation();
        self.vertices()
            .iter()
            .flat_map(|v| {
                v.outbound(relation)
                    .map(move |(target, tie)| (v.id(), target, tie.weight, tie.kind))
            })
            .collect()
    }

    fn derive_relation(&mut self, name: impl Into<String>, arcs: Vec<Arc>) -> usize {
        let relation = self.add_relation(name, true);
        let count = arcs.len();

        for (source, target, weight, kind) in arcs {
            self.write_arc(relation, source, target, weight, kind);
        }

        debug!(relation, arcs = count, "derived relation");
        self.invalidate();
        relation
    }

    fn weakly_connected(&self) -> bool {
        let index = self.dense_index(false);
        let adjacency = self.dense_adjacency(&index, Direction::Either);
        if adjacency.is_empty() {
            return true;
        }

        let mut seen = vec![false; adjacency.len()];
        let mut queue = VecDeque::from([0]);
        seen[0] = true;
        while let Some(v) = queue.pop_front() {
            for (w, _) in &adjacency[v] {
                if !seen[*w] {
                    seen[*w] = true;
                    queue.push_back(*w);
                }
            }
        }

        seen.into_iter().all(|s| s)
    }
}

fn undirected(a: VertexId, b: VertexId, weight: f64) -> [Arc; 2] {
    [
        (a, b, weight, EdgeType::Undirected),
        (b, a, weight, EdgeType::Undirected),
    ]
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{complete, cycle, from_arcs, path, star};

    #[test]
    fn reciprocity() {
        let mut graph = from_arcs(3, &[(1, 2), (2, 1), (1, 3)]);
        let reciprocity = graph.reciprocity();

        assert_eq!(reciprocity.arcs, 3);
        assert_eq!(reciprocity.reciprocated_arcs, 2);
        assert_eq!(reciprocity.mutual_dyads, 1);
        assert_eq!(reciprocity.connected_dyads, 2);
        assert_eq!(reciprocity.dyad, 0.5);
        assert_eq!(graph.cache.reciprocity, Some(reciprocity));

        assert_eq!(Graph::new().reciprocity(), Reciprocity::default());
    }

    #[test]
    fn undirected_graph_is_fully_reciprocal() {
        let mut graph = cycle(4);
        let reciprocity = graph.reciprocity();

        assert_eq!(reciprocity.arc, 1.0);
        assert_eq!(reciprocity.dyad, 1.0);
        assert_eq!(reciprocity.connected_dyads, 4);
    }

    #[test]
    fn clustering_coefficient() {
        let graph = complete(4);
        assert_eq!(graph.clustering_coefficient(1), Ok(Some(1.0)));
        assert_eq!(graph.average_clustering_coefficient(), Some(1.0));

        let graph = star(4, false);
        assert_eq!(graph.clustering_coefficient(1), Ok(Some(0.0)));
        assert_eq!(graph.clustering_coefficient(2), Ok(None));
        assert_eq!(graph.average_clustering_coefficient(), Some(0.0));

        assert!(graph.clustering_coefficient(9).unwrap_err().is_not_found());
    }

    #[test]
    fn directed_clustering_coefficient() {
        // 1 points at 2 and 3, and one of the two possible arcs between them exists.
        let graph = from_arcs(3, &[(1, 2), (1, 3), (2, 3)]);
        assert_eq!(graph.clustering_coefficient(1), Ok(Some(0.5)));
    }

    #[test]
    fn connectedness() {
        assert_eq!(cycle(4).connectedness(), Ok(Connectedness::Connected));
        assert_eq!(
            from_arcs(3, &[(1, 2), (2, 3), (3, 1)]).connectedness(),
            Ok(Connectedness::StronglyConnected)
        );
        assert_eq!(
            path(3, true).connectedness(),
            Ok(Connectedness::Unilateral)
        );
        assert_eq!(
            from_arcs(3, &[(1, 2), (3, 2)]).connectedness(),
            Ok(Connectedness::WeaklyConnected)
        );
        assert_eq!(
            from_arcs(3, &[(1, 2)]).connectedness(),
            Ok(Connectedness::Disconnected)
        );
    }

    #[test]
    fn symmetrize() {
        let mut graph = from_arcs(3, &[(1, 2), (2, 3)]);
        graph.set_edge_weight(2, 3, 2.0).unwrap();
        graph.add_edge(3, 2, 1.0).unwrap();
        assert!(!graph.is_symmetric());

        graph.symmetrize();
        assert!(graph.is_symmetric());
        assert_eq!(graph.edge_weight(2, 1), Some(1.0));
        assert_eq!(graph.edge_weight(3, 2), Some(2.0));
        assert_eq!(graph.edge(2, 1).unwrap().kind, EdgeType::Reciprocated);

        let once = graph.edges();
        graph.symmetrize();
        assert_eq!(graph.edges(), once);
    }

    #[test]
    fn strong_ties() {
        let mut graph = from_arcs(3, &[(1, 2), (2, 1), (2, 3)]);
        let relation = graph.symmetrize_strong_ties();

        assert_eq!(relation, 1);
        assert_eq!(graph.current_relation(), 1);
        assert_eq!(graph.relations().current_name(), "strong ties");
        assert_eq!(graph.edge(1, 2).unwrap().kind, EdgeType::Undirected);
        assert!(!graph.has_edge(2, 3));

        graph.set_relation(0).unwrap();
        assert!(graph.has_edge(2, 3));
    }

    #[test]
    fn cocitation() {
        let mut graph = from_arcs(4, &[(1, 2), (1, 3), (4, 2), (4, 3)]);
        graph.cocitation();

        assert_eq!(graph.edge_weight(2, 3), Some(2.0));
        assert_eq!(graph.edge_weight(3, 2), Some(2.0));
        assert!(!graph.has_edge(1, 4));
    }

    #[test]
    fn dichotomize() {
        let mut graph = from_arcs(3, &[(1, 2), (2, 3), (3, 2)]);
        graph.set_edge_weight(1, 2, 5.0).unwrap();
        graph.set_edge_weight(2, 3, 3.0).unwrap();
        graph.set_edge_weight(3, 2, 4.0).unwrap();

        graph.dichotomize(2.0);

        assert_eq!(graph.edge_weight(1, 2), Some(1.0));
        assert_eq!(graph.edge(1, 2).unwrap().kind, EdgeType::Directed);
        assert_eq!(graph.edge(2, 3).unwrap().kind, EdgeType::Reciprocated);
        assert!(!graph.is_weighted());

        graph.previous_relation();
        assert_eq!(graph.edge_weight(1, 2), Some(5.0));
    }
}
