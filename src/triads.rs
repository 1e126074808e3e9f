//! Triad census: every 3-vertex subgraph classified into one of the 16 MAN
//! (mutual-asymmetric-null) types.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    config::AdjacencyOptions,
    event::{Event, Metric, Task},
    graph::Graph,
};

/// The MAN labels, in census order.
pub const TRIAD_TYPES: [&str; 16] = [
    "003", "012", "102", "021D", "021U", "021C", "111D", "111U", "030T", "030C", "201", "120D",
    "120U", "120C", "210", "300",
];

/// Maps the 6-bit arc code of a triple to its (1-based) MAN type.
const TRICODES: [usize; 64] = [
    1, 2, 2, 3, 2, 4, 6, 8, 2, 6, 5, 7, 3, 8, 7, 11, 2, 6, 4, 8, 5, 9, 9, 13, 6, 10, 9, 14, 7, 14,
    12, 15, 2, 5, 6, 7, 6, 9, 10, 14, 4, 9, 9, 12, 8, 13, 14, 15, 3, 7, 8, 11, 7, 12, 14, 15, 8,
    14, 13, 15, 11, 15, 15, 16,
];

/// Frequencies of the 16 triad types, in [`TRIAD_TYPES`] order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriadCensus {
    counts: [u64; 16],
}

impl TriadCensus {
    pub fn counts(&self) -> &[u64; 16] {
        &self.counts
    }

    /// The frequency of a type by its MAN label, e.g. `"030T"`.
    pub fn count(&self, label: &str) -> Option<u64> {
        TRIAD_TYPES
            .iter()
            .position(|t| *t == label)
            .map(|i| self.counts[i])
    }

    /// Number of triples classified, `C(n, 3)`.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        TRIAD_TYPES.iter().copied().zip(self.counts.iter().copied())
    }
}

impl Graph {
    /// Classifies (or returns the cached classification of) every triple of vertices.
    ///
    /// # Examples
    ///
    /// ```
    /// use socnet::graph::Graph;
    ///
    /// let mut graph = Graph::new();
    /// let (a, b, c) = (graph.add_vertex(), graph.add_vertex(), graph.add_vertex());
    /// graph.add_edge(a, b, 1.0).unwrap();
    /// graph.add_edge(b, c, 1.0).unwrap();
    /// graph.add_edge(a, c, 1.0).unwrap();
    ///
    /// let census = graph.triad_census();
    /// assert_eq!(census.count("030T"), Some(1));
    /// assert_eq!(census.total(), 1);
    /// ```
    #[instrument(skip(self))]
    pub fn triad_census(&mut self) -> TriadCensus {
        if let Some(census) = self.cache.triads {
            return census;
        }

        let index = self.dense_index(false);
        let adjacency = self.adjacency_values(&index, AdjacencyOptions::default());
        let n = index.len();
        let tie = |a: usize, b: usize| usize::from(adjacency[(a, b)] != 0.0);

        self.notify(Event::ComputationStarted {
            task: Task::TriadCensus,
            total: n,
        });

        let mut census = TriadCensus::default();
        for u in 0..n {
            for (v, w) in (u + 1..n).tuple_combinations() {
                let code = tie(v, u)
                    + 2 * tie(u, v)
                    + 4 * tie(v, w)
                    + 8 * tie(w, v)
                    + 16 * tie(u, w)
                    + 32 * tie(w, u);
                census.counts[TRICODES[code] - 1] += 1;
            }
            self.progress(Task::TriadCensus, u + 1);
        }

        self.notify(Event::ComputationFinished {
            task: Task::TriadCensus,
        });
        debug!(triples = census.total(), "triad census computed");

        self.cache.triads = Some(census);
        self.metric_ready(Metric::TriadCensus);
        census
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{complete, from_arcs, star};

    #[test]
    fn empty_and_small() {
        assert_eq!(Graph::new().triad_census().total(), 0);
        assert_eq!(from_arcs(2, &[(1, 2)]).triad_census().total(), 0);
    }

    #[test]
    fn single_triple_types() {
        let cases: [(&[(u32, u32)], &str); 16] = [
            (&[], "003"),
            (&[(1, 2)], "012"),
            (&[(1, 2), (2, 1)], "102"),
            (&[(1, 2), (1, 3)], "021D"),
            (&[(2, 1), (3, 1)], "021U"),
            (&[(1, 2), (2, 3)], "021C"),
            (&[(1, 2), (2, 1), (3, 1)], "111D"),
            (&[(1, 2), (2, 1), (1, 3)], "111U"),
            (&[(1, 2), (2, 3), (1, 3)], "030T"),
            (&[(1, 2), (2, 3), (3, 1)], "030C"),
            (&[(1, 2), (2, 1), (1, 3), (3, 1)], "201"),
            (&[(1, 2), (2, 1), (3, 1), (3, 2)], "120D"),
            (&[(1, 2), (2, 1), (1, 3), (2, 3)], "120U"),
            (&[(1, 2), (2, 1), (1, 3), (3, 2)], "120C"),
            (&[(1, 2), (2, 1), (1, 3), (3, 1), (2, 3)], "210"),
            (&[(1, 2), (2, 1), (1, 3), (3, 1), (2, 3), (3, 2)], "300"),
        ];

        for (arcs, label) in cases {
            let census = from_arcs(3, arcs).triad_census();
            assert_eq!(census.count(label), Some(1), "{label}");
            assert_eq!(census.total(), 1);
        }
    }

    #[test]
    fn complete_graph_is_all_mutual() {
        let census = complete(5).triad_census();

        assert_eq!(census.count("300"), Some(10));
        assert_eq!(census.total(), 10);
    }

    #[test]
    fn directed_star() {
        // Every triple with the centre is 021D, every leaf-only triple is 003.
        let census = star(5, true).triad_census();

        assert_eq!(census.count("021D"), Some(6));
        assert_eq!(census.count("003"), Some(4));
        assert_eq!(census.count("nope"), None);
    }

    #[test]
    fn cached_until_mutation() {
        let mut graph = from_arcs(3, &[(1, 2)]);
        graph.triad_census();
        assert!(graph.cache.triads.is_some());

        graph.add_edge(2, 1, 1.0).unwrap();
        assert_eq!(graph.triad_census().count("102"), Some(1));
    }

    #[test]
    fn iter_labels() {
        let census = complete(3).triad_census();
        let labels: Vec<&str> = census.iter().map(|(label, _)| label).collect();

        assert_eq!(labels, TRIAD_TYPES);
    }
}
