//! Maximal clique enumeration.
//!
//! Directions are ignored: two vertices are adjacent when a tie joins them either way. Self-loops
//! are ignored too. Only cliques of at least two vertices are recorded.

use std::collections::{BTreeMap, BTreeSet};

use nalgebra::DMatrix;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::{
    error::Result,
    event::{Event, Metric, Task},
    graph::{Direction, Graph},
    matrix::VertexMatrix,
    vertex::VertexId,
};

/// Every maximal clique of the current relation.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CliqueCensus {
    /// Members in ascending id order. Largest cliques first, then lexicographic.
    cliques: Vec<Vec<VertexId>>,
}

impl CliqueCensus {
    pub fn cliques(&self) -> &[Vec<VertexId>] {
        &self.cliques
    }

    pub fn len(&self) -> usize {
        self.cliques.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cliques.is_empty()
    }

    /// Size of the largest clique, `0` when there is none.
    pub fn clique_number(&self) -> usize {
        self.cliques.first().map_or(0, Vec::len)
    }

    /// Maximal cliques containing `id` with at least `min_size` members.
    pub fn containing(&self, id: VertexId, min_size: usize) -> Vec<&[VertexId]> {
        self.cliques
            .iter()
            .filter(|c| c.len() >= min_size && c.binary_search(&id).is_ok())
            .map(Vec::as_slice)
            .collect()
    }

    /// Maximal cliques of exactly `size` members.
    pub fn of_size(&self, size: usize) -> Vec<&[VertexId]> {
        self.cliques
            .iter()
            .filter(|c| c.len() == size)
            .map(Vec::as_slice)
            .collect()
    }

    /// Clique size to number of maximal cliques of that size.
    pub fn size_distribution(&self) -> BTreeMap<usize, usize> {
        let mut sizes = BTreeMap::new();
        for clique in &self.cliques {
            *sizes.entry(clique.len()).or_insert(0) += 1;
        }
        sizes
    }
}

impl Graph {
    /// Enumerates (or returns the cached) maximal cliques.
    ///
    /// # Examples
    ///
    /// ```
    /// use socnet::graph::Graph;
    ///
    /// let mut graph = Graph::new();
    /// graph.set_undirected();
    /// let ids: Vec<_> = (0..4).map(|_| graph.add_vertex()).collect();
    /// graph.add_edge(ids[0], ids[1], 1.0).unwrap();
    /// graph.add_edge(ids[1], ids[2], 1.0).unwrap();
    /// graph.add_edge(ids[2], ids[0], 1.0).unwrap();
    /// graph.add_edge(ids[2], ids[3], 1.0).unwrap();
    ///
    /// let census = graph.cliques();
    /// assert_eq!(census.cliques(), [vec![1, 2, 3], vec![3, 4]]);
    /// assert_eq!(census.containing(3, 2).len(), 2);
    /// ```
    #[instrument(skip(self))]
    pub fn cliques(&mut self) -> &CliqueCensus {
        if self.cache.cliques.is_none() {
            let census = self.enumerate_cliques();
            self.cache.cliques = Some(census);
            self.metric_ready(Metric::Cliques);
        }

        self.cache.cliques.get_or_insert_with(CliqueCensus::default)
    }

    /// Maximal cliques containing a vertex, with at least `min_size` members.
    pub fn cliques_containing(&mut self, id: VertexId, min_size: usize) -> Result<Vec<Vec<VertexId>>> {
        self.vertex(id)?;
        Ok(self
            .cliques()
            .containing(id, min_size)
            .into_iter()
            .map(<[VertexId]>::to_vec)
            .collect())
    }

    pub fn cliques_of_size(&mut self, size: usize) -> Vec<Vec<VertexId>> {
        self.cliques()
            .of_size(size)
            .into_iter()
            .map(<[VertexId]>::to_vec)
            .collect()
    }

    /// Number of maximal cliques each pair of vertices shares. The diagonal holds the number of
    /// cliques each vertex belongs to.
    pub fn clique_comembership_matrix(&mut self) -> VertexMatrix {
        let index = self.dense_index(false);
        let n = index.len();
        let mut values = DMatrix::<f64>::zeros(n, n);

        for clique in self.cliques().cliques() {
            let members: Vec<usize> = clique.iter().filter_map(|id| index.get(*id)).collect();
            for &i in &members {
                for &j in &members {
                    values[(i, j)] += 1.0;
                }
            }
        }

        VertexMatrix::indexed(&index, values)
    }

    fn enumerate_cliques(&mut self) -> CliqueCensus {
        let index = self.dense_index(false);
        let neighbours: Vec<BTreeSet<usize>> = self
            .dense_adjacency(&index, Direction::Either)
            .into_iter()
            .enumerate()
            .map(|(i, ties)| ties.into_iter().map(|(j, _)| j).filter(|j| *j != i).collect())
            .collect();
        let n = neighbours.len();

        self.notify(Event::ComputationStarted {
            task: Task::Cliques,
            total: n,
        });

        let mut found = Vec::new();
        let mut candidates: BTreeSet<usize> = (0..n).collect();
        let mut excluded = BTreeSet::new();

        // The outer level visits every vertex so progress can be reported per vertex.
        for v in 0..n {
            bron_kerbosch(
                &BTreeSet::from([v]),
                candidates.intersection(&neighbours[v]).copied().collect(),
                excluded.intersection(&neighbours[v]).copied().collect(),
                &neighbours,
                &mut found,
            );
            candidates.remove(&v);
            excluded.insert(v);
            self.progress(Task::Cliques, v + 1);
        }

        self.notify(Event::ComputationFinished { task: Task::Cliques });

        let mut cliques: Vec<Vec<VertexId>> = found
            .into_iter()
            .map(|clique| clique.into_iter().map(|i| index.id(i)).collect())
            .collect();
        cliques.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        debug!(count = cliques.len(), "cliques enumerated");
        CliqueCensus { cliques }
    }
}

/// Bron-Kerbosch with pivoting. Every call owns its candidate and excluded sets so sibling
/// branches never share state.
fn bron_kerbosch(
    clique: &BTreeSet<usize>,
    mut candidates: BTreeSet<usize>,
    mut excluded: BTreeSet<usize>,
    neighbours: &[BTreeSet<usize>],
    found: &mut Vec<BTreeSet<usize>>,
) {
    let Some(pivot) = candidates
        .union(&excluded)
        .max_by_key(|u| neighbours[**u].intersection(&candidates).count())
        .copied()
    else {
        if clique.len() >= 2 {
            found.push(clique.clone());
        }
        return;
    };

    let branches: Vec<usize> = candidates.difference(&neighbours[pivot]).copied().collect();
    for v in branches {
        let mut grown = clique.clone();
        grown.insert(v);

        bron_kerbosch(
            &grown,
            candidates.intersection(&neighbours[v]).copied().collect(),
            excluded.intersection(&neighbours[v]).copied().collect(),
            neighbours,
            found,
        );

        candidates.remove(&v);
        excluded.insert(v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{complete, cycle, from_arcs, from_edges, path};

    #[test]
    fn complete_graph() {
        let mut graph = complete(5);
        let census = graph.cliques();

        assert_eq!(census.len(), 1);
        assert_eq!(census.cliques()[0], vec![1, 2, 3, 4, 5]);
        assert_eq!(census.clique_number(), 5);
    }

    #[test]
    fn cycle_has_edge_cliques() {
        let mut graph = cycle(5);
        assert_eq!(graph.cliques_of_size(2).len(), 5);
        assert!(graph.cliques_of_size(3).is_empty());
    }

    #[test]
    fn overlapping_triangles() {
        // Two triangles sharing the edge 2-3.
        let mut graph = from_edges(4, &[(1, 2), (1, 3), (2, 3), (2, 4), (3, 4)]);

        assert_eq!(graph.cliques().cliques(), [vec![1, 2, 3], vec![2, 3, 4]]);
        assert_eq!(graph.cliques_containing(2, 3).unwrap().len(), 2);
        assert_eq!(graph.cliques_containing(1, 3).unwrap(), vec![vec![1, 2, 3]]);
        assert!(graph.cliques_containing(1, 4).unwrap().is_empty());
        assert!(graph.cliques_containing(7, 2).unwrap_err().is_not_found());
        assert_eq!(graph.cliques().size_distribution(), BTreeMap::from([(3, 2)]));
    }

    #[test]
    fn directions_and_loops_ignored() {
        let mut graph = from_arcs(3, &[(1, 2), (2, 3), (3, 1)]);
        graph.allow_self_loops(true);
        graph.add_edge(1, 1, 1.0).unwrap();

        assert_eq!(graph.cliques().cliques(), [vec![1, 2, 3]]);
    }

    #[test]
    fn isolates_form_no_clique() {
        let mut graph = path(2, false);
        graph.add_vertex();

        assert_eq!(graph.cliques().cliques(), [vec![1, 2]]);
        assert!(Graph::new().cliques().is_empty());
    }

    #[test]
    fn comembership() {
        let mut graph = from_edges(4, &[(1, 2), (1, 3), (2, 3), (2, 4), (3, 4)]);
        let matrix = graph.clique_comembership_matrix();

        assert_eq!(matrix.get(2, 3), Some(2.0));
        assert_eq!(matrix.get(1, 4), Some(0.0));
        assert_eq!(matrix.get(1, 1), Some(1.0));
        assert_eq!(matrix.get(2, 2), Some(2.0));
    }

    #[test]
    fn cache_and_events() {
        let mut graph = complete(3);
        let events = graph.subscribe();

        graph.cliques();
        graph.cliques();

        let received: Vec<Event> = events.try_iter().collect();
        assert_eq!(
            received
                .iter()
                .filter(|e| matches!(e, Event::MetricReady(Metric::Cliques)))
                .count(),
            1
        );
        assert!(received.contains(&Event::Progress {
            task: Task::Cliques,
            done: 3
        }));

        graph.add_vertex();
        assert!(graph.cache.cliques.is_none());
    }
}
