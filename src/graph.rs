//! A module for working with graphs.
//!
//! [`Graph`] owns every vertex in an arena (`Vec<Vertex>`) alongside a lookup table from external
//! [`VertexId`] to arena slot. Edges live inside their endpoints' adjacency maps, scoped by
//! relation. Derived results are cached and every structural mutation drops the whole cache
//! before returning.

use std::{
    collections::{BTreeMap, HashMap},
    sync::mpsc::Receiver,
};

use serde::Serialize;
use tracing::{debug, trace};

use crate::{
    centrality::{Index, Prominence},
    cliques::CliqueCensus,
    cohesion::Reciprocity,
    config::{AdjacencyOptions, Canvas, TraversalConfig},
    edge::{Edge, EdgeType},
    error::{Error, Result},
    event::{Event, Metric, Notifier},
    relation::Relations,
    traversal::Geodesics,
    triads::TriadCensus,
    vertex::{InTie, Position, Tie, Vertex, VertexId},
};

/// Weights closer than this are considered equal.
pub(crate) const EPSILON: f64 = 1e-9;

/// Everything derived from the graph. `None` means dirty.
#[derive(Clone, Debug, Default)]
pub(crate) struct Cache {
    pub(crate) symmetric: Option<bool>,
    pub(crate) weighted: Option<bool>,
    pub(crate) density: Option<f64>,
    pub(crate) reciprocity: Option<Reciprocity>,
    pub(crate) geodesics: Option<Geodesics>,
    pub(crate) prominence: HashMap<(Index, TraversalConfig), Prominence>,
    pub(crate) cliques: Option<CliqueCensus>,
    pub(crate) triads: Option<TriadCensus>,
}

/// A contiguous numbering of a subset of vertices, used to address matrix rows and columns.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DenseIndex {
    ids: Vec<VertexId>,
    #[serde(skip)]
    slots: HashMap<VertexId, usize>,
}

impl DenseIndex {
    pub(crate) fn new(ids: Vec<VertexId>) -> Self {
        let slots = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        Self { ids, slots }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[VertexId] {
        &self.ids
    }

    pub fn id(&self, i: usize) -> VertexId {
        self.ids[i]
    }

    /// The dense position of a vertex, if it is part of this index.
    pub fn get(&self, id: VertexId) -> Option<usize> {
        self.slots.get(&id).copied()
    }
}

/// Which adjacency map to read when building dense neighbour lists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Direction {
    Outbound,
    Inbound,
    /// Both, merged. A pair tied both ways keeps the larger weight.
    Either,
}

/// A multi-relational graph of weighted ties.
#[derive(Clone, Debug)]
pub struct Graph {
    /// Vertex arena in creation order.
    vertices: Vec<Vertex>,
    /// External id to arena slot. Rebuilt for the shifted tail when a vertex is removed.
    slots: HashMap<VertexId, usize>,
    relations: Relations,
    canvas: Canvas,
    /// New ties are undirected.
    undirected: bool,
    self_loops: bool,
    modified: bool,
    pub(crate) cache: Cache,
    notifier: Notifier,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    /// Creates an empty, directed graph with a single relation.
    ///
    /// # Examples
    ///
    /// ```
    /// use socnet::graph::Graph;
    ///
    /// let graph = Graph::new();
    /// assert_eq!(graph.vertex_count(), 0);
    /// assert_eq!(graph.relations().count(), 1);
    /// ```
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            slots: HashMap::new(),
            relations: Relations::new(),
            canvas: Canvas::default(),
            undirected: false,
            self_loops: false,
            modified: false,
            cache: Cache::default(),
            notifier: Notifier::default(),
        }
    }

    /// Returns a receiver for the engine's notifications, replacing any previous one.
    pub fn subscribe(&mut self) -> Receiver<Event> {
        self.notifier.subscribe()
    }

    /// Drops every vertex, relation and cached result.
    pub fn clear(&mut self) {
        debug!(vertices = self.vertices.len(), "clearing graph");
        self.vertices.clear();
        self.slots.clear();
        self.relations.clear();
        self.undirected = false;
        self.invalidate();
        self.modified = false;
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn set_canvas(&mut self, canvas: Canvas) {
        self.canvas = canvas;
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Acknowledges the current state, e.g. after the caller persisted it.
    pub fn mark_saved(&mut self) {
        self.modified = false;
    }

    pub fn allow_self_loops(&mut self, allow: bool) {
        self.self_loops = allow;
    }

    pub fn self_loops_allowed(&self) -> bool {
        self.self_loops
    }

    //
    // Relations
    //

    pub fn relations(&self) -> &Relations {
        &self.relations
    }

    pub fn current_relation(&self) -> usize {
        self.relations.current()
    }

    /// Adds a relation, optionally switching to it.
    pub fn add_relation(&mut self, name: impl Into<String>, switch: bool) -> usize {
        let index = self.relations.add(name, switch);
        if switch {
            self.relation_changed();
        }
        index
    }

    pub fn rename_relation(&mut self, name: impl Into<String>) {
        self.relations.rename_current(name);
        self.modified = true;
    }

    pub fn set_relation(&mut self, index: usize) -> Result<()> {
        if self.relations.set(index)? {
            self.relation_changed();
        }
        Ok(())
    }

    /// Moves to the next relation. Does nothing on the last one.
    pub fn next_relation(&mut self) -> bool {
        let moved = self.relations.next();
        if moved {
            self.relation_changed();
        }
        moved
    }

    /// Moves to the previous relation. Does nothing on the first one.
    pub fn previous_relation(&mut self) -> bool {
        let moved = self.relations.previous();
        if moved {
            self.relation_changed();
        }
        moved
    }

    //
    // Vertices
    //

    /// Creates a vertex at the canvas centre and returns its id.
    pub fn add_vertex(&mut self) -> VertexId {
        let (x, y) = self.canvas.center();
        self.add_vertex_at(Position::new(x, y))
    }

    /// Creates a vertex at the given position and returns its id.
    ///
    /// Ids continue from the largest live id, so a live id is never handed out twice.
    ///
    /// # Examples
    ///
    /// ```
    /// use socnet::graph::Graph;
    /// use socnet::vertex::Position;
    ///
    /// let mut graph = Graph::new();
    /// let a = graph.add_vertex_at(Position::new(10.0, 10.0));
    /// let b = graph.add_vertex();
    ///
    /// assert_eq!((a, b), (1, 2));
    /// ```
    pub fn add_vertex_at(&mut self, position: Position) -> VertexId {
        let id = self.max_vertex_id().map_or(1, |max| max + 1);

        self.slots.insert(id, self.vertices.len());
        self.vertices.push(Vertex::new(id, position));
        trace!(id, "vertex created");

        self.invalidate();
        id
    }

    /// Removes a vertex together with every tie touching it, in all relations.
    pub fn remove_vertex(&mut self, id: VertexId) -> Result<()> {
        let slot = self.slot(id)?;
        let removed = self.vertices.remove(slot);

        // Rewrite the neighbours' adjacency maps.
        let mut neighbours: Vec<VertexId> = removed
            .outbound
            .values()
            .flat_map(|ties| ties.keys().copied())
            .chain(
                removed
                    .inbound
                    .values()
                    .flat_map(|ties| ties.keys().copied()),
            )
            .collect();
        neighbours.sort_unstable();
        neighbours.dedup();

        self.slots.remove(&id);
        for (i, vertex) in self.vertices.iter().enumerate().skip(slot) {
            self.slots.insert(vertex.id(), i);
        }

        for neighbour in neighbours {
            if let Some(&i) = self.slots.get(&neighbour) {
                self.vertices[i].forget(id);
            }
        }

        debug!(id, "vertex removed");
        self.invalidate();
        Ok(())
    }

    pub fn contains_vertex(&self, id: VertexId) -> bool {
        self.slots.contains_key(&id)
    }

    pub fn vertex(&self, id: VertexId) -> Result<&Vertex> {
        Ok(&self.vertices[self.slot(id)?])
    }

    /// Vertices in creation order.
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices.iter().map(Vertex::id)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Vertex count ignoring vertices with no tie in the current relation.
    pub fn vertex_count_connected(&self) -> usize {
        let relation = self.current_relation();
        self.vertices
            .iter()
            .filter(|v| !v.is_isolated(relation))
            .count()
    }

    // New ids always exceed every live id, so the arena is sorted by id.
    pub fn max_vertex_id(&self) -> Option<VertexId> {
        self.vertices.last().map(Vertex::id)
    }

    pub fn min_vertex_id(&self) -> Option<VertexId> {
        self.vertices.first().map(Vertex::id)
    }

    /// First vertex carrying the label.
    pub fn vertex_by_label(&self, label: &str) -> Option<VertexId> {
        self.vertices
            .iter()
            .find(|v| v.label == label)
            .map(Vertex::id)
    }

    pub fn set_vertex_label(&mut self, id: VertexId, label: impl Into<String>) -> Result<()> {
        self.vertex_mut(id)?.label = label.into();
        self.modified = true;
        Ok(())
    }

    /// Moves a vertex. Positions are geometry only and leave cached metrics intact.
    pub fn set_vertex_position(&mut self, id: VertexId, position: Position) -> Result<()> {
        self.vertex_mut(id)?.position = position;
        self.modified = true;
        Ok(())
    }

    pub fn set_vertex_size(&mut self, id: VertexId, size: u32) -> Result<()> {
        self.vertex_mut(id)?.appearance.size = size;
        self.modified = true;
        Ok(())
    }

    pub fn set_vertex_shape(&mut self, id: VertexId, shape: impl Into<String>) -> Result<()> {
        self.vertex_mut(id)?.appearance.shape = shape.into();
        self.modified = true;
        Ok(())
    }

    pub fn set_vertex_color(&mut self, id: VertexId, color: impl Into<String>) -> Result<()> {
        self.vertex_mut(id)?.appearance.color = color.into();
        self.modified = true;
        Ok(())
    }

    /// Number of outbound ties in the current relation.
    pub fn out_degree(&self, id: VertexId) -> Result<usize> {
        Ok(self.vertex(id)?.out_degree(self.current_relation()))
    }

    /// Number of inbound ties in the current relation.
    pub fn in_degree(&self, id: VertexId) -> Result<usize> {
        Ok(self.vertex(id)?.in_degree(self.current_relation()))
    }

    /// Sum of outbound tie weights in the current relation.
    pub fn out_strength(&self, id: VertexId) -> Result<f64> {
        let relation = self.current_relation();
        Ok(self
            .vertex(id)?
            .outbound(relation)
            .map(|(_, tie)| tie.weight)
            .sum())
    }

    /// Sum of inbound tie weights in the current relation.
    pub fn in_strength(&self, id: VertexId) -> Result<f64> {
        let relation = self.current_relation();
        Ok(self.vertex(id)?.inbound(relation).map(|(_, w)| w).sum())
    }

    pub fn is_isolated(&self, id: VertexId) -> Result<bool> {
        Ok(self.vertex(id)?.is_isolated(self.current_relation()))
    }

    pub fn isolated_vertices(&self) -> Vec<VertexId> {
        let relation = self.current_relation();
        self.vertices
            .iter()
            .filter(|v| v.is_isolated(relation))
            .map(Vertex::id)
            .collect()
    }

    pub fn vertices_with_outbound(&self) -> usize {
        let relation = self.current_relation();
        self.vertices
            .iter()
            .filter(|v| v.out_degree(relation) > 0)
            .count()
    }

    pub fn vertices_with_inbound(&self) -> usize {
        let relation = self.current_relation();
        self.vertices
            .iter()
            .filter(|v| v.in_degree(relation) > 0)
            .count()
    }

    /// Vertices with at least one tie that is returned.
    pub fn vertices_with_reciprocated(&self) -> usize {
        let relation = self.current_relation();
        self.vertices
            .iter()
            .filter(|v| {
                v.outbound(relation)
                    .any(|(target, _)| target != v.id() && self.has_arc(target, v.id()))
            })
            .count()
    }

    //
    // Edges
    //

    /// Adds a tie from `source` to `target` in the current relation.
    ///
    /// In undirected mode (see [`Graph::set_undirected`]) the tie is undirected. Otherwise it is
    /// an arc, tagged reciprocated when the opposite arc already exists. Adding an existing edge
    /// updates its weight.
    ///
    /// # Examples
    ///
    /// ```
    /// use socnet::edge::EdgeType;
    /// use socnet::graph::Graph;
    ///
    /// let mut graph = Graph::new();
    /// let (a, b) = (graph.add_vertex(), graph.add_vertex());
    ///
    /// assert_eq!(graph.add_edge(a, b, 1.0).unwrap(), EdgeType::Directed);
    /// assert_eq!(graph.add_edge(b, a, 2.0).unwrap(), EdgeType::Reciprocated);
    /// assert_eq!(graph.edge_weight(a, b), Some(1.0));
    /// assert!(graph.add_edge(a, 42, 1.0).is_err());
    /// ```
    pub fn add_edge(&mut self, source: VertexId, target: VertexId, weight: f64) -> Result<EdgeType> {
        if self.undirected {
            self.add_undirected_edge(source, target, weight)?;
            return Ok(EdgeType::Undirected);
        }

        let kind = self.insert_arc_checked(source, target, weight)?;
        self.invalidate();
        Ok(kind)
    }

    /// Adds a symmetric tie, writing both directions at once.
    pub fn add_undirected_edge(
        &mut self,
        source: VertexId,
        target: VertexId,
        weight: f64,
    ) -> Result<()> {
        self.check_new_edge(source, target, weight)?;

        let relation = self.current_relation();
        self.write_arc(relation, source, target, weight, EdgeType::Undirected);
        self.write_arc(relation, target, source, weight, EdgeType::Undirected);

        self.invalidate();
        Ok(())
    }

    /// Removes a tie from the current relation. An undirected tie goes in both directions; the
    /// surviving half of a reciprocated pair becomes a plain arc.
    pub fn remove_edge(&mut self, source: VertexId, target: VertexId) -> Result<()> {
        let relation = self.current_relation();
        let tie = self.tie(source, target)?.clone();

        self.erase_arc(relation, source, target);

        match tie.kind {
            EdgeType::Undirected => self.erase_arc(relation, target, source),
            EdgeType::Reciprocated => self.set_arc_kind(relation, target, source, EdgeType::Directed),
            EdgeType::Directed => {}
        }

        self.invalidate();
        Ok(())
    }

    /// The weight of the `source -> target` tie in the current relation, if any.
    pub fn edge_weight(&self, source: VertexId, target: VertexId) -> Option<f64> {
        self.tie(source, target).ok().map(|tie| tie.weight)
    }

    pub fn has_edge(&self, source: VertexId, target: VertexId) -> bool {
        self.has_arc(source, target)
    }

    /// Whether both `source -> target` and `target -> source` exist in the current relation.
    pub fn is_reciprocated(&self, source: VertexId, target: VertexId) -> bool {
        self.has_arc(source, target) && self.has_arc(target, source)
    }

    pub fn edge(&self, source: VertexId, target: VertexId) -> Result<Edge> {
        let tie = self.tie(source, target)?;
        Ok(Edge {
            source,
            target,
            relation: self.current_relation(),
            weight: tie.weight,
            kind: tie.kind,
            label: tie.label.clone(),
            color: tie.color.clone(),
        })
    }

    /// Edges of the current relation. Undirected ties are listed once, smallest id first.
    pub fn edges(&self) -> Vec<Edge> {
        let relation = self.current_relation();

        self.vertices
            .iter()
            .flat_map(|v| {
                v.outbound(relation).filter_map(move |(target, tie)| {
                    if tie.kind == EdgeType::Undirected && target < v.id() {
                        return None;
                    }

                    Some(Edge {
                        source: v.id(),
                        target,
                        relation,
                        weight: tie.weight,
                        kind: tie.kind,
                        label: tie.label.clone(),
                        color: tie.color.clone(),
                    })
                })
            })
            .collect()
    }

    /// Number of edges in the current relation, undirected ties counted once.
    pub fn edge_count(&self) -> usize {
        self.edges().len()
    }

    /// Number of arcs in the current relation, undirected ties counted twice.
    pub fn arc_count(&self) -> usize {
        let relation = self.current_relation();
        self.vertices.iter().map(|v| v.out_degree(relation)).sum()
    }

    /// Changes a tie's weight. An undirected tie changes in both directions.
    pub fn set_edge_weight(&mut self, source: VertexId, target: VertexId, weight: f64) -> Result<()> {
        check_weight(weight)?;
        let relation = self.current_relation();
        let kind = self.tie(source, target)?.kind;

        self.write_arc(relation, source, target, weight, kind);
        if kind == EdgeType::Undirected {
            self.write_arc(relation, target, source, weight, kind);
        }

        self.invalidate();
        Ok(())
    }

    pub fn set_edge_label(
        &mut self,
        source: VertexId,
        target: VertexId,
        label: impl Into<String>,
    ) -> Result<()> {
        let label = label.into();
        let relation = self.current_relation();
        let kind = self.tie(source, target)?.kind;

        self.tie_mut(relation, source, target)?.label = label.clone();
        if kind == EdgeType::Undirected {
            self.tie_mut(relation, target, source)?.label = label;
        }

        self.modified = true;
        Ok(())
    }

    pub fn set_edge_color(
        &mut self,
        source: VertexId,
        target: VertexId,
        color: impl Into<String>,
    ) -> Result<()> {
        let color = color.into();
        let relation = self.current_relation();
        let kind = self.tie(source, target)?.kind;

        self.tie_mut(relation, source, target)?.color = color.clone();
        if kind == EdgeType::Undirected {
            self.tie_mut(relation, target, source)?.color = color;
        }

        self.modified = true;
        Ok(())
    }

    /// Retags a tie.
    ///
    /// Making a tie undirected or reciprocated creates the opposite arc with the same weight if it
    /// is missing. Making an undirected tie directed drops the opposite arc. A reciprocated pair
    /// cannot be made directed while both arcs exist; remove one of them instead.
    pub fn set_edge_type(&mut self, source: VertexId, target: VertexId, kind: EdgeType) -> Result<()> {
        let relation = self.current_relation();
        let tie = self.tie(source, target)?.clone();
        let reverse = self.tie(target, source).ok().cloned();

        match kind {
            EdgeType::Undirected | EdgeType::Reciprocated => {
                let reverse_weight = match (kind, &reverse) {
                    (EdgeType::Reciprocated, Some(r)) => r.weight,
                    _ => tie.weight,
                };
                self.write_arc(relation, source, target, tie.weight, kind);
                self.write_arc(relation, target, source, reverse_weight, kind);
            }
            EdgeType::Directed => match tie.kind {
                EdgeType::Undirected => {
                    self.set_arc_kind(relation, source, target, EdgeType::Directed);
                    self.erase_arc(relation, target, source);
                }
                EdgeType::Reciprocated if reverse.is_some() => {
                    return Err(Error::invalid(format!(
                        "tie {source} -> {target} is reciprocated; remove {target} -> {source} \
                         to make it directed"
                    )));
                }
                _ => self.set_arc_kind(relation, source, target, EdgeType::Directed),
            },
        }

        self.invalidate();
        Ok(())
    }

    //
    // Graph-wide properties
    //

    /// Switches to undirected mode and turns every tie of the current relation into an undirected
    /// one. A pair tied both ways keeps the larger weight.
    pub fn set_undirected(&mut self) {
        let relation = self.current_relation();

        for edge in self.edges() {
            let weight = match self.edge_weight(edge.target, edge.source) {
                Some(reverse) => edge.weight.max(reverse),
                None => edge.weight,
            };
            self.write_arc(relation, edge.source, edge.target, weight, EdgeType::Undirected);
            self.write_arc(relation, edge.target, edge.source, weight, EdgeType::Undirected);
        }

        self.undirected = true;
        self.invalidate();
    }

    /// Switches to directed mode. Existing undirected ties become reciprocated arcs.
    pub fn set_directed(&mut self) {
        let relation = self.current_relation();
        let undirected: Vec<Edge> = self
            .edges()
            .into_iter()
            .filter(|e| e.kind == EdgeType::Undirected)
            .collect();

        for edge in undirected {
            self.set_arc_kind(relation, edge.source, edge.target, EdgeType::Reciprocated);
            self.set_arc_kind(relation, edge.target, edge.source, EdgeType::Reciprocated);
        }

        self.undirected = false;
        self.invalidate();
    }

    pub fn is_directed(&self) -> bool {
        !self.undirected
    }

    /// Whether any tie of the current relation has a weight other than 1.
    pub fn is_weighted(&mut self) -> bool {
        if let Some(weighted) = self.cache.weighted {
            return weighted;
        }

        let relation = self.current_relation();
        let weighted = self.vertices.iter().any(|v| {
            v.outbound(relation)
                .any(|(_, tie)| (tie.weight - 1.0).abs() > EPSILON)
        });

        self.cache.weighted = Some(weighted);
        weighted
    }

    /// Whether every arc of the current relation has an opposite arc of equal weight.
    pub fn is_symmetric(&mut self) -> bool {
        if let Some(symmetric) = self.cache.symmetric {
            return symmetric;
        }

        let relation = self.current_relation();
        let symmetric = self.vertices.iter().all(|v| {
            v.outbound(relation).all(|(target, tie)| {
                self.edge_weight(target, v.id())
                    .is_some_and(|w| (w - tie.weight).abs() < EPSILON)
            })
        });

        self.cache.symmetric = Some(symmetric);
        symmetric
    }

    /// Computes the density of the graph, the ratio of arcs to the maximum possible arcs.
    ///
    /// Self-loops are not counted. Graphs with fewer than two vertices have density 0.
    ///
    /// # Examples
    ///
    /// ```
    /// use socnet::graph::Graph;
    ///
    /// let mut graph = Graph::new();
    /// let (a, b, c) = (graph.add_vertex(), graph.add_vertex(), graph.add_vertex());
    ///
    /// graph.add_undirected_edge(a, b, 1.0).unwrap();
    /// assert_eq!(graph.density(), 1.0 / 3.0);
    ///
    /// graph.add_edge(a, c, 1.0).unwrap();
    /// assert_eq!(graph.density(), 3.0 / 6.0);
    /// ```
    pub fn density(&mut self) -> f64 {
        if let Some(density) = self.cache.density {
            return density;
        }

        let n = self.vertex_count() as f64;
        let density = if n < 2.0 {
            0.0
        } else {
            let relation = self.current_relation();
            let arcs = self
                .vertices
                .iter()
                .flat_map(|v| v.outbound(relation).filter(move |(t, _)| *t != v.id()))
                .count() as f64;

            arcs / (n * (n - 1.0))
        };

        self.cache.density = Some(density);
        density
    }

    /// The dense numbering of the vertices taking part in a computation.
    pub fn dense_index(&self, drop_isolates: bool) -> DenseIndex {
        let relation = self.current_relation();
        DenseIndex::new(
            self.vertices
                .iter()
                .filter(|v| !drop_isolates || !v.is_isolated(relation))
                .map(Vertex::id)
                .collect(),
        )
    }

    //
    // Crate internals
    //

    /// Marks the graph modified and drops every cached result.
    ///
    /// This must be called by every structural mutation since the cached state won't correspond
    /// to the new graph.
    pub(crate) fn invalidate(&mut self) {
        self.cache = Cache::default();
        self.modified = true;

        let (vertices, edges) = (self.vertex_count(), self.arc_count());
        self.notifier.emit(Event::GraphModified { vertices, edges });
    }

    pub(crate) fn notify(&mut self, event: Event) {
        self.notifier.emit(event);
    }

    pub(crate) fn progress(&mut self, task: crate::event::Task, done: usize) {
        self.notifier.progress(task, done);
    }

    pub(crate) fn metric_ready(&mut self, metric: Metric) {
        self.notifier.emit(Event::MetricReady(metric));
    }

    /// Neighbour lists over the dense index, as `(dense position, weight)` pairs.
    ///
    /// Ties to vertices outside the index are skipped.
    pub(crate) fn dense_adjacency(
        &self,
        index: &DenseIndex,
        direction: Direction,
    ) -> Vec<Vec<(usize, f64)>> {
        let relation = self.current_relation();

        index
            .ids()
            .iter()
            .map(|id| {
                // Safety: every id in the index was taken from this graph.
                let vertex = &self.vertices[self.slots[id]];
                let mut merged: BTreeMap<usize, f64> = BTreeMap::new();

                let mut push = |other: VertexId, weight: f64| {
                    if let Some(j) = index.get(other) {
                        merged
                            .entry(j)
                            .and_modify(|w| *w = w.max(weight))
                            .or_insert(weight);
                    }
                };

                if direction != Direction::Inbound {
                    for (target, tie) in vertex.outbound(relation) {
                        push(target, tie.weight);
                    }
                }
                if direction != Direction::Outbound {
                    for (source, weight) in vertex.inbound(relation) {
                        push(source, weight);
                    }
                }

                merged.into_iter().collect()
            })
            .collect()
    }

    /// Writes a new arc and updates the reciprocity tags of the pair.
    pub(crate) fn insert_arc_checked(
        &mut self,
        source: VertexId,
        target: VertexId,
        weight: f64,
    ) -> Result<EdgeType> {
        self.check_new_edge(source, target, weight)?;
        let relation = self.current_relation();

        let kind = if source != target && self.has_arc(target, source) {
            self.set_arc_kind(relation, target, source, EdgeType::Reciprocated);
            EdgeType::Reciprocated
        } else {
            EdgeType::Directed
        };

        self.write_arc(relation, source, target, weight, kind);
        Ok(kind)
    }

    /// Writes `source -> target` into both endpoints' maps, keeping label and colour if the arc
    /// already exists. Callers have checked that both vertices exist.
    pub(crate) fn write_arc(
        &mut self,
        relation: usize,
        source: VertexId,
        target: VertexId,
        weight: f64,
        kind: EdgeType,
    ) {
        let (s, t) = (self.slots[&source], self.slots[&target]);

        self.vertices[s]
            .out_mut(relation)
            .entry(target)
            .and_modify(|tie| {
                tie.weight = weight;
                tie.kind = kind;
            })
            .or_insert_with(|| Tie {
                weight,
                kind,
                label: String::new(),
                color: "black".into(),
            });
        self.vertices[t]
            .in_mut(relation)
            .insert(source, InTie { weight, kind });
    }

    pub(crate) fn erase_arc(&mut self, relation: usize, source: VertexId, target: VertexId) {
        if let Some(&s) = self.slots.get(&source) {
            self.vertices[s].out_mut(relation).remove(&target);
        }
        if let Some(&t) = self.slots.get(&target) {
            self.vertices[t].in_mut(relation).remove(&source);
        }
    }

    //
    // Private
    //

    fn relation_changed(&mut self) {
        let index = self.relations.current();
        let name = self.relations.current_name().to_string();
        debug!(index, name, "relation changed");

        self.invalidate();
        self.notifier.emit(Event::RelationChanged { index, name });
    }

    fn slot(&self, id: VertexId) -> Result<usize> {
        self.slots
            .get(&id)
            .copied()
            .ok_or(Error::VertexNotFound(id))
    }

    fn vertex_mut(&mut self, id: VertexId) -> Result<&mut Vertex> {
        let slot = self.slot(id)?;
        Ok(&mut self.vertices[slot])
    }

    fn has_arc(&self, source: VertexId, target: VertexId) -> bool {
        self.tie(source, target).is_ok()
    }

    fn tie(&self, source: VertexId, target: VertexId) -> Result<&Tie> {
        let relation = self.current_relation();
        self.vertex(source)?
            .out_tie(relation, target)
            .ok_or(Error::EdgeNotFound {
                from: source,
                to: target,
                relation,
            })
    }

    fn tie_mut(&mut self, relation: usize, source: VertexId, target: VertexId) -> Result<&mut Tie> {
        self.vertex_mut(source)?
            .outbound
            .get_mut(&relation)
            .and_then(|ties| ties.get_mut(&target))
            .ok_or(Error::EdgeNotFound {
                from: source,
                to: target,
                relation,
            })
    }

    /// Retags `source -> target` on both endpoints. A missing arc is left alone.
    fn set_arc_kind(&mut self, relation: usize, source: VertexId, target: VertexId, kind: EdgeType) {
        match self.tie_mut(relation, source, target) {
            Ok(tie) => tie.kind = kind,
            Err(_) => return,
        }

        let entry = self.slots.get(&target).and_then(|&t| {
            self.vertices[t]
                .inbound
                .get_mut(&relation)
                .and_then(|ties| ties.get_mut(&source))
        });
        if let Some(entry) = entry {
            entry.kind = kind;
        }
    }

    fn check_new_edge(&self, source: VertexId, target: VertexId, weight: f64) -> Result<()> {
        self.slot(source)?;
        self.slot(target)?;

        if source == target && !self.self_loops {
            return Err(Error::invalid(format!("self-loop on vertex {source}")));
        }

        check_weight(weight)
    }
}

fn check_weight(weight: f64) -> Result<()> {
    if weight.is_finite() {
        Ok(())
    } else {
        Err(Error::invalid(format!("edge weight must be finite, got {weight}")))
    }
}

/// Rejects weights a weighted computation cannot use: negative weights, and zero weights when
/// they get inverted. Unweighted options read every tie as 1 and always pass.
pub(crate) fn check_weights(
    adjacency: &[Vec<(usize, f64)>],
    options: AdjacencyOptions,
) -> Result<()> {
    if !options.weighted && !options.inverse_weights {
        return Ok(());
    }

    for &(_, weight) in adjacency.iter().flatten() {
        if weight < 0.0 {
            return Err(Error::unsupported(format!(
                "negative weight {weight} in a weighted computation"
            )));
        }
        if weight == 0.0 && options.inverse_weights {
            return Err(Error::unsupported("zero weight with inverse weights"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{path, star};

    #[test]
    fn new() {
        let graph = Graph::new();

        assert_eq!(graph.vertex_count(), 0);
        assert_eq!(graph.edge_count(), 0);
        assert!(!graph.is_modified());
    }

    #[test]
    fn add_vertex_ids() {
        let mut graph = Graph::new();
        let a = graph.add_vertex();
        let b = graph.add_vertex();
        let c = graph.add_vertex();

        assert_eq!((a, b, c), (1, 2, 3));

        // Removing a middle vertex doesn't lead to a live id being reused.
        graph.remove_vertex(b).unwrap();
        assert_eq!(graph.add_vertex(), 4);
        assert_eq!(graph.vertex_ids().collect::<Vec<_>>(), vec![1, 3, 4]);
    }

    #[test]
    fn remove_missing_vertex() {
        let mut graph = Graph::new();

        assert_eq!(graph.remove_vertex(7), Err(Error::VertexNotFound(7)));
    }

    #[test]
    fn remove_star_center() {
        let mut graph = star(5, false);
        let center = 1;

        graph.remove_vertex(center).unwrap();

        assert_eq!(graph.vertex_count(), 4);
        assert_eq!(graph.edge_count(), 0);
        for leaf in graph.vertex_ids().collect::<Vec<_>>() {
            assert_eq!(graph.out_degree(leaf).unwrap(), 0);
            assert_eq!(graph.in_degree(leaf).unwrap(), 0);
            assert!(graph.is_isolated(leaf).unwrap());
        }
    }

    #[test]
    fn remove_vertex_across_relations() {
        let mut graph = path(3, true);
        graph.add_relation("second", true);
        graph.add_edge(3, 1, 1.0).unwrap();

        graph.remove_vertex(1).unwrap();

        assert_eq!(graph.edge_count(), 0);
        graph.set_relation(0).unwrap();
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.has_edge(2, 3));
    }

    #[test]
    fn slots_follow_removal() {
        let mut graph = path(4, true);
        graph.remove_vertex(2).unwrap();

        // The tail of the arena shifted; lookups must still land on the right vertex.
        assert_eq!(graph.vertex(3).unwrap().id(), 3);
        assert_eq!(graph.vertex(4).unwrap().id(), 4);
        assert!(graph.has_edge(3, 4));
    }

    #[test]
    fn self_loops() {
        let mut graph = Graph::new();
        let a = graph.add_vertex();

        assert!(matches!(
            graph.add_edge(a, a, 1.0),
            Err(Error::InvalidParameter(_))
        ));

        graph.allow_self_loops(true);
        assert_eq!(graph.add_edge(a, a, 1.0), Ok(EdgeType::Directed));
    }

    #[test]
    fn undirected_edge_is_symmetric() {
        let mut graph = Graph::new();
        let (a, b) = (graph.add_vertex(), graph.add_vertex());
        graph.add_undirected_edge(a, b, 3.0).unwrap();

        assert_eq!(graph.edge_weight(a, b), Some(3.0));
        assert_eq!(graph.edge_weight(b, a), Some(3.0));
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.arc_count(), 2);
        assert!(graph.is_symmetric());
    }

    #[test]
    fn remove_edge_kinds() {
        let mut graph = Graph::new();
        let (a, b, c) = (graph.add_vertex(), graph.add_vertex(), graph.add_vertex());
        graph.add_undirected_edge(a, b, 1.0).unwrap();
        graph.add_edge(a, c, 1.0).unwrap();
        graph.add_edge(c, a, 1.0).unwrap();

        graph.remove_edge(b, a).unwrap();
        assert!(!graph.has_edge(a, b));
        assert!(!graph.has_edge(b, a));

        graph.remove_edge(a, c).unwrap();
        assert_eq!(graph.edge(c, a).unwrap().kind, EdgeType::Directed);

        assert!(graph.remove_edge(a, c).unwrap_err().is_not_found());
    }

    #[test]
    fn set_edge_type() {
        let mut graph = Graph::new();
        let (a, b) = (graph.add_vertex(), graph.add_vertex());
        graph.add_edge(a, b, 2.0).unwrap();

        graph.set_edge_type(a, b, EdgeType::Undirected).unwrap();
        assert_eq!(graph.edge_weight(b, a), Some(2.0));
        assert_eq!(graph.edge(b, a).unwrap().kind, EdgeType::Undirected);

        graph.set_edge_type(a, b, EdgeType::Directed).unwrap();
        assert!(!graph.has_edge(b, a));
        assert_eq!(graph.edge(a, b).unwrap().kind, EdgeType::Directed);
    }

    #[test]
    fn reciprocated_pair_cannot_become_directed() {
        let mut graph = Graph::new();
        let (a, b) = (graph.add_vertex(), graph.add_vertex());
        graph.add_edge(a, b, 1.0).unwrap();
        graph.add_edge(b, a, 3.0).unwrap();

        assert!(matches!(
            graph.set_edge_type(a, b, EdgeType::Directed),
            Err(Error::InvalidParameter(_))
        ));
        assert_eq!(graph.edge(a, b).unwrap().kind, EdgeType::Reciprocated);
        assert_eq!(graph.edge_weight(b, a), Some(3.0));

        // Dropping one arc leaves a plain directed tie.
        graph.remove_edge(b, a).unwrap();
        graph.set_edge_type(a, b, EdgeType::Directed).unwrap();
        assert_eq!(graph.edge(a, b).unwrap().kind, EdgeType::Directed);
    }

    #[test]
    fn inbound_entries_mirror_reciprocity() {
        let mut graph = Graph::new();
        let (a, b) = (graph.add_vertex(), graph.add_vertex());
        let in_tie = |graph: &Graph, source, target| {
            graph.vertex(target).unwrap().in_tie(0, source).unwrap()
        };

        graph.add_edge(a, b, 2.0).unwrap();
        assert_eq!(
            in_tie(&graph, a, b),
            InTie {
                weight: 2.0,
                kind: EdgeType::Directed
            }
        );

        graph.add_edge(b, a, 1.0).unwrap();
        assert!(in_tie(&graph, a, b).is_reciprocal());
        assert!(in_tie(&graph, b, a).is_reciprocal());

        graph.remove_edge(b, a).unwrap();
        assert!(!in_tie(&graph, a, b).is_reciprocal());
        assert!(graph.vertex(a).unwrap().in_tie(0, b).is_none());

        graph.set_edge_type(a, b, EdgeType::Undirected).unwrap();
        assert_eq!(in_tie(&graph, b, a).kind, EdgeType::Undirected);

        graph.set_directed();
        assert_eq!(in_tie(&graph, a, b).kind, EdgeType::Reciprocated);
        assert_eq!(in_tie(&graph, b, a).kind, EdgeType::Reciprocated);
    }

    #[test]
    fn edge_metadata() {
        let mut graph = Graph::new();
        let (a, b) = (graph.add_vertex(), graph.add_vertex());
        graph.add_undirected_edge(a, b, 1.0).unwrap();

        graph.set_edge_label(a, b, "kin").unwrap();
        graph.set_edge_color(a, b, "blue").unwrap();

        let edge = graph.edge(b, a).unwrap();
        assert_eq!(edge.label, "kin");
        assert_eq!(edge.color, "blue");
    }

    #[test]
    fn set_undirected_and_back() {
        let mut graph = path(3, true);
        graph.add_edge(2, 1, 4.0).unwrap();

        graph.set_undirected();
        assert!(!graph.is_directed());
        assert!(graph.is_symmetric());
        assert_eq!(graph.edge_weight(2, 1), Some(4.0));
        assert_eq!(graph.edge_weight(1, 2), Some(4.0));
        assert_eq!(graph.edge_count(), 2);

        graph.set_directed();
        assert_eq!(graph.edge(1, 2).unwrap().kind, EdgeType::Reciprocated);
        assert_eq!(graph.edge_count(), 4);
    }

    #[test]
    fn density() {
        let mut graph = Graph::new();
        assert_eq!(graph.density(), 0.0);

        let mut graph = path(3, true);
        assert_eq!(graph.density(), 2.0 / 6.0);

        graph.add_edge(3, 1, 1.0).unwrap();
        assert_eq!(graph.density(), 3.0 / 6.0);
    }

    #[test]
    fn is_weighted() {
        let mut graph = path(3, true);
        assert!(!graph.is_weighted());

        graph.set_edge_weight(1, 2, 2.5).unwrap();
        assert!(graph.is_weighted());
    }

    #[test]
    fn reciprocated_counts() {
        let mut graph = path(3, true);
        graph.add_edge(2, 1, 1.0).unwrap();

        assert_eq!(graph.vertices_with_outbound(), 2);
        assert_eq!(graph.vertices_with_inbound(), 2);
        assert_eq!(graph.vertices_with_reciprocated(), 2);
    }

    #[test]
    fn vertex_metadata() {
        let mut graph = Graph::new();
        let a = graph.add_vertex();
        graph.set_vertex_label(a, "alice").unwrap();
        graph.set_vertex_size(a, 12).unwrap();
        graph.set_vertex_shape(a, "box").unwrap();
        graph.set_vertex_color(a, "green").unwrap();

        assert_eq!(graph.vertex_by_label("alice"), Some(a));
        let vertex = graph.vertex(a).unwrap();
        assert_eq!(vertex.appearance().size, 12);
        assert_eq!(vertex.appearance().shape, "box");
        assert_eq!(vertex.appearance().color, "green");
        assert!(graph.set_vertex_label(99, "x").is_err());
    }

    #[test]
    fn relations_scope_edges() {
        let mut graph = path(3, true);
        assert_eq!(graph.add_relation("other", true), 1);
        assert_eq!(graph.edge_count(), 0);

        graph.add_edge(3, 2, 1.0).unwrap();
        assert!(graph.previous_relation());
        assert_eq!(graph.edge_count(), 2);
        assert!(!graph.has_edge(3, 2));

        assert!(graph.set_relation(5).is_err());
    }

    #[test]
    fn clear() {
        let mut graph = path(4, true);
        graph.add_relation("r", true);
        graph.clear();

        assert_eq!(graph.vertex_count(), 0);
        assert_eq!(graph.relations().count(), 1);
        assert!(graph.cache.density.is_none());
        assert_eq!(graph.add_vertex(), 1);
    }

    #[test]
    fn events() {
        let mut graph = Graph::new();
        let events = graph.subscribe();

        graph.add_vertex();
        graph.add_relation("r", true);

        let events: Vec<Event> = events.try_iter().collect();
        assert_eq!(
            events[0],
            Event::GraphModified {
                vertices: 1,
                edges: 0
            }
        );
        assert!(events.contains(&Event::RelationChanged {
            index: 1,
            name: "r".into()
        }));
    }

    //
    // Private
    //

    #[test]
    fn clear_cache_on_mutation() {
        let mut graph = path(3, true);
        graph.density();
        graph.is_symmetric();
        graph.is_weighted();

        assert!(graph.cache.density.is_some());
        assert!(graph.cache.symmetric.is_some());
        assert!(graph.cache.weighted.is_some());

        graph.add_edge(3, 1, 1.0).unwrap();

        assert!(graph.cache.density.is_none());
        assert!(graph.cache.symmetric.is_none());
        assert!(graph.cache.weighted.is_none());
    }

    #[test]
    fn clear_cache_on_relation_switch() {
        let mut graph = path(3, true);
        graph.density();
        graph.add_relation("r", true);

        assert!(graph.cache.density.is_none());
        assert_eq!(graph.density(), 0.0);
    }

    #[test]
    fn positions_keep_cache() {
        let mut graph = path(3, true);
        graph.density();
        graph
            .set_vertex_position(1, Position::new(5.0, 5.0))
            .unwrap();

        assert!(graph.cache.density.is_some());
    }

    #[test]
    fn dense_index() {
        let mut graph = path(3, true);
        graph.add_vertex();

        let all = graph.dense_index(false);
        assert_eq!(all.ids(), &[1, 2, 3, 4]);

        let connected = graph.dense_index(true);
        assert_eq!(connected.ids(), &[1, 2, 3]);
        assert_eq!(connected.get(3), Some(2));
        assert_eq!(connected.get(4), None);
    }

    #[test]
    fn dense_adjacency() {
        let graph = path(3, true);
        let index = graph.dense_index(false);

        assert_eq!(
            graph.dense_adjacency(&index, Direction::Outbound),
            vec![vec![(1, 1.0)], vec![(2, 1.0)], vec![]]
        );
        assert_eq!(
            graph.dense_adjacency(&index, Direction::Inbound),
            vec![vec![], vec![(0, 1.0)], vec![(1, 1.0)]]
        );
        assert_eq!(
            graph.dense_adjacency(&index, Direction::Either)[1],
            vec![(0, 1.0), (2, 1.0)]
        );
    }
}
