//! A module for working with edges.
//!
//! Edges have no storage of their own: they live as entries in their endpoints' adjacency maps.
//! The types here are the views handed out by the graph.

use std::{
    cmp::Ordering,
    hash::{Hash, Hasher},
};

use serde::{Deserialize, Serialize};

use crate::vertex::VertexId;

/// How an edge relates its two endpoints.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeType {
    /// A one-way arc.
    #[default]
    Directed,
    /// Two arcs in opposite directions, each with its own weight.
    Reciprocated,
    /// A single symmetric tie, stored as two mirrored entries of equal weight.
    Undirected,
}

/// A snapshot of an edge in a given relation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: VertexId,
    pub target: VertexId,
    pub relation: usize,
    pub weight: f64,
    pub kind: EdgeType,
    pub label: String,
    pub color: String,
}

impl Edge {
    /// Returns the unordered pair of endpoints.
    pub fn dyad(&self) -> Dyad {
        Dyad::new(self.source, self.target)
    }
}

/// An unordered pair of vertices. `(a, b)` and `(b, a)` compare and hash the same.
#[derive(Clone, Copy, Debug, Eq)]
pub struct Dyad {
    a: VertexId,
    b: VertexId,
}

impl Dyad {
    /// Creates a new dyad from two vertices.
    ///
    /// # Examples
    ///
    /// ```
    /// use socnet::edge::Dyad;
    ///
    /// assert_eq!(Dyad::new(1, 2), Dyad::new(2, 1));
    /// ```
    pub fn new(a: VertexId, b: VertexId) -> Self {
        Self { a, b }
    }

    /// Returns the endpoints, smallest first.
    ///
    /// # Examples
    ///
    /// ```
    /// use socnet::edge::Dyad;
    ///
    /// assert_eq!(Dyad::new(7, 3).ordered(), (3, 7));
    /// ```
    pub fn ordered(&self) -> (VertexId, VertexId) {
        match self.a.cmp(&self.b) {
            Ordering::Greater => (self.b, self.a),
            _ => (self.a, self.b),
        }
    }

    /// Returns whether the dyad contains the given vertex.
    pub fn contains(&self, vertex: VertexId) -> bool {
        self.a == vertex || self.b == vertex
    }

    pub fn is_loop(&self) -> bool {
        self.a == self.b
    }
}

//
// Trait implementations
//

impl PartialEq for Dyad {
    fn eq(&self, other: &Self) -> bool {
        self.ordered() == other.ordered()
    }
}

impl Hash for Dyad {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Same hash for (a, b) as for (b, a).
        self.ordered().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn contains() {
        let dyad = Dyad::new(1, 2);

        assert!(dyad.contains(1));
        assert!(dyad.contains(2));
        assert!(!dyad.contains(3));
    }

    #[test]
    fn is_loop() {
        assert!(Dyad::new(4, 4).is_loop());
        assert!(!Dyad::new(4, 5).is_loop());
    }

    #[test]
    fn edge_dyad() {
        let edge = Edge {
            source: 3,
            target: 1,
            relation: 0,
            weight: 1.0,
            kind: EdgeType::Directed,
            label: String::new(),
            color: String::new(),
        };

        assert_eq!(edge.dyad().ordered(), (1, 3));
    }

    //
    // Trait implementations
    //

    #[test]
    fn partial_eq() {
        assert_eq!(Dyad::new(1, 2), Dyad::new(1, 2));
        assert_eq!(Dyad::new(1, 2), Dyad::new(2, 1));
        assert_ne!(Dyad::new(1, 2), Dyad::new(1, 3));
    }

    #[test]
    fn hash() {
        use std::collections::hash_map::DefaultHasher;

        let mut h1 = DefaultHasher::new();
        let mut h2 = DefaultHasher::new();

        Dyad::new(1, 2).hash(&mut h1);
        Dyad::new(2, 1).hash(&mut h2);

        // Verify k1 == k2 => hash(k1) == hash(k2).
        assert_eq!(h1.finish(), h2.finish());

        let set: HashSet<Dyad> = [Dyad::new(1, 2), Dyad::new(2, 1)].into_iter().collect();
        assert_eq!(set.len(), 1);
    }
}
