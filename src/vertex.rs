//! Vertex records and their per-relation adjacency.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::edge::EdgeType;

/// External vertex identifier. Unique among live vertices.
pub type VertexId = u32;

/// A point on the canvas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Position) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Display metadata carried for the presentation layer; no algorithm reads it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Appearance {
    pub size: u32,
    pub shape: String,
    pub color: String,
}

impl Default for Appearance {
    fn default() -> Self {
        Self {
            size: 8,
            shape: "circle".into(),
            color: "red".into(),
        }
    }
}

/// An outbound adjacency entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tie {
    pub weight: f64,
    pub kind: EdgeType,
    pub label: String,
    pub color: String,
}

/// An inbound adjacency entry: the weight and tag of the arc arriving from a neighbour.
///
/// The tag mirrors the source's outbound [`Tie`], so `kind != Directed` flags a returned tie.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct InTie {
    pub weight: f64,
    pub kind: EdgeType,
}

impl InTie {
    pub fn is_reciprocal(&self) -> bool {
        self.kind != EdgeType::Directed
    }
}

/// Neighbour id to entry, per relation. `BTreeMap` keeps iteration order stable between runs.
pub(crate) type Ties<T> = HashMap<usize, BTreeMap<VertexId, T>>;

#[derive(Clone, Debug, PartialEq)]
pub struct Vertex {
    id: VertexId,
    pub(crate) label: String,
    pub(crate) position: Position,
    pub(crate) appearance: Appearance,
    /// Arcs leaving this vertex.
    pub(crate) outbound: Ties<Tie>,
    /// Arcs arriving at this vertex.
    pub(crate) inbound: Ties<InTie>,
}

impl Vertex {
    pub(crate) fn new(id: VertexId, position: Position) -> Self {
        Self {
            id,
            label: String::new(),
            position,
            appearance: Appearance::default(),
            outbound: HashMap::new(),
            inbound: HashMap::new(),
        }
    }

    pub fn id(&self) -> VertexId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn appearance(&self) -> &Appearance {
        &self.appearance
    }

    /// Outbound ties in a relation.
    pub fn outbound(&self, relation: usize) -> impl Iterator<Item = (VertexId, &Tie)> + '_ {
        self.outbound
            .get(&relation)
            .into_iter()
            .flat_map(|ties| ties.iter().map(|(id, tie)| (*id, tie)))
    }

    /// Inbound tie weights in a relation.
    pub fn inbound(&self, relation: usize) -> impl Iterator<Item = (VertexId, f64)> + '_ {
        self.inbound
            .get(&relation)
            .into_iter()
            .flat_map(|ties| ties.iter().map(|(id, tie)| (*id, tie.weight)))
    }

    pub fn in_tie(&self, relation: usize, source: VertexId) -> Option<InTie> {
        self.inbound.get(&relation)?.get(&source).copied()
    }

    pub fn out_tie(&self, relation: usize, target: VertexId) -> Option<&Tie> {
        self.outbound.get(&relation)?.get(&target)
    }

    pub fn out_degree(&self, relation: usize) -> usize {
        self.outbound.get(&relation).map_or(0, BTreeMap::len)
    }

    pub fn in_degree(&self, relation: usize) -> usize {
        self.inbound.get(&relation).map_or(0, BTreeMap::len)
    }

    /// No tie in either direction in the relation.
    pub fn is_isolated(&self, relation: usize) -> bool {
        self.out_degree(relation) == 0 && self.in_degree(relation) == 0
    }

    pub(crate) fn out_mut(&mut self, relation: usize) -> &mut BTreeMap<VertexId, Tie> {
        self.outbound.entry(relation).or_default()
    }

    pub(crate) fn in_mut(&mut self, relation: usize) -> &mut BTreeMap<VertexId, InTie> {
        self.inbound.entry(relation).or_default()
    }

    /// Drops every entry pointing at `other`, across all relations.
    pub(crate) fn forget(&mut self, other: VertexId) {
        for ties in self.outbound.values_mut() {
            ties.remove(&other);
        }
        for ties in self.inbound.values_mut() {
            ties.remove(&other);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tie(weight: f64) -> Tie {
        Tie {
            weight,
            kind: EdgeType::Directed,
            label: String::new(),
            color: String::new(),
        }
    }

    fn in_tie(weight: f64, kind: EdgeType) -> InTie {
        InTie { weight, kind }
    }

    #[test]
    fn degrees_per_relation() {
        let mut vertex = Vertex::new(1, Position::default());
        vertex.out_mut(0).insert(2, tie(1.0));
        vertex.out_mut(0).insert(3, tie(2.0));
        vertex.in_mut(1).insert(2, in_tie(1.0, EdgeType::Directed));

        assert_eq!(vertex.out_degree(0), 2);
        assert_eq!(vertex.in_degree(0), 0);
        assert_eq!(vertex.in_degree(1), 1);
        assert!(!vertex.is_isolated(1));
        assert!(vertex.is_isolated(2));
    }

    #[test]
    fn forget() {
        let mut vertex = Vertex::new(1, Position::default());
        vertex.out_mut(0).insert(2, tie(1.0));
        vertex.out_mut(1).insert(2, tie(1.0));
        vertex.in_mut(0).insert(2, in_tie(1.0, EdgeType::Reciprocated));

        assert!(vertex.in_tie(0, 2).unwrap().is_reciprocal());
        assert_eq!(vertex.inbound(0).collect::<Vec<_>>(), vec![(2, 1.0)]);

        vertex.forget(2);

        assert!(vertex.is_isolated(0));
        assert!(vertex.is_isolated(1));
    }

    #[test]
    fn position_distance() {
        assert_eq!(Position::new(0.0, 0.0).distance(&Position::new(3.0, 4.0)), 5.0);
    }
}
