//! Small graphs shared by the unit tests.

use crate::graph::Graph;

/// Builds a graph with vertices `1..=n` and the given arcs.
pub(crate) fn from_arcs(n: u32, arcs: &[(u32, u32)]) -> Graph {
    let mut graph = Graph::new();
    for _ in 0..n {
        graph.add_vertex();
    }
    for (source, target) in arcs {
        graph.add_edge(*source, *target, 1.0).unwrap();
    }
    graph
}

/// Builds a graph with vertices `1..=n` and the given undirected ties.
pub(crate) fn from_edges(n: u32, edges: &[(u32, u32)]) -> Graph {
    let mut graph = from_arcs(n, &[]);
    graph.set_undirected();
    for (a, b) in edges {
        graph.add_edge(*a, *b, 1.0).unwrap();
    }
    graph
}

/// `1 - 2 - ... - n`, directed when asked.
pub(crate) fn path(n: u32, directed: bool) -> Graph {
    let links: Vec<(u32, u32)> = (1..n).map(|i| (i, i + 1)).collect();
    if directed {
        from_arcs(n, &links)
    } else {
        from_edges(n, &links)
    }
}

/// Vertex 1 at the centre, `2..=n` around it.
pub(crate) fn star(n: u32, directed: bool) -> Graph {
    let links: Vec<(u32, u32)> = (2..=n).map(|leaf| (1, leaf)).collect();
    if directed {
        from_arcs(n, &links)
    } else {
        from_edges(n, &links)
    }
}

pub(crate) fn complete(n: u32) -> Graph {
    let mut links = vec![];
    for a in 1..=n {
        for b in a + 1..=n {
            links.push((a, b));
        }
    }
    from_edges(n, &links)
}

pub(crate) fn cycle(n: u32) -> Graph {
    let mut links: Vec<(u32, u32)> = (1..n).map(|i| (i, i + 1)).collect();
    links.push((n, 1));
    from_edges(n, &links)
}

pub(crate) fn assert_close(a: f64, b: f64) {
    assert!((a - b).abs() < 1e-6, "{a} != {b}");
}
