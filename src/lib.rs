//! Socnet is an in-memory analytics engine for social and complex networks: weighted, directed or
//! undirected, with several relations over the same set of actors.
//!
//! # Basic usage
//!
//! The library is centered around the [`Graph`](graph::Graph) structure. Vertices and ties are
//! added to it directly or produced by one of the [`generators`]. Once built, distances,
//! centrality and prestige indices, cohesion measures and matrix representations can be
//! computed. Results are cached until the next structural change.
//!
//! ```rust
//! use socnet::{
//!     centrality::Index,
//!     config::{AdjacencyOptions, TraversalConfig},
//!     graph::Graph,
//! };
//!
//! // Construct the graph instance.
//! let mut graph = Graph::new();
//! graph.set_undirected();
//!
//! // Vertices get consecutive ids starting at 1.
//! let (a, b, c) = (graph.add_vertex(), graph.add_vertex(), graph.add_vertex());
//! graph.add_edge(a, b, 1.0).unwrap();
//! graph.add_edge(a, c, 1.0).unwrap();
//!
//! // Compute some metrics on that state of the graph.
//! let density = graph.density();
//! assert_eq!(density, 2.0 / 3.0);
//!
//! let config = TraversalConfig::default();
//! assert_eq!(graph.distance(b, c, config).unwrap(), 2.0);
//! assert_eq!(graph.centrality(a, Index::Betweenness, config).unwrap(), 1.0);
//!
//! // Matrices can be pretty printed...
//! println!("{}", graph.laplacian_matrix(AdjacencyOptions::default()).values);
//! // ...outputs:
//! //  ┌          ┐
//! //  │  2 -1 -1 │
//! //  │ -1  1  0 │
//! //  │ -1  0  1 │
//! //  └          ┘
//! ```

pub mod centrality;
pub mod cliques;
pub mod clustering;
pub mod cohesion;
pub mod config;
pub mod edge;
pub mod error;
pub mod event;
pub mod generators;
pub mod graph;
pub mod layout;
pub mod matrix;
pub mod relation;
pub mod traversal;
pub mod triads;
pub mod vertex;

#[cfg(test)]
mod fixtures;

pub use error::{Error, Result};
pub use graph::Graph;
