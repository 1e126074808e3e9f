//! Configuration passed explicitly to traversals, matrix builders and layouts.
//!
//! Nothing in the engine reads global toggles: every analysis call receives one of these structs
//! so results are reproducible from the call alone.

use serde::{Deserialize, Serialize};

/// Controls how edges are turned into path lengths.
///
/// # Examples
///
/// ```
/// use socnet::config::TraversalConfig;
///
/// let config = TraversalConfig::default().weighted(true).inverse_weights(true);
/// assert_eq!(config.edge_cost(4.0), 0.25);
///
/// // Unweighted traversals count hops.
/// assert_eq!(TraversalConfig::default().edge_cost(4.0), 1.0);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraversalConfig {
    /// Use edge weights as path costs (Dijkstra) instead of hop counts (BFS).
    pub weighted: bool,
    /// Cost is `1 / weight`, so a heavier tie is a shorter one. Only meaningful when `weighted`.
    pub inverse_weights: bool,
    /// Exclude isolated vertices from sources, targets and every averaged denominator.
    pub drop_isolates: bool,
}

impl TraversalConfig {
    pub fn weighted(mut self, weighted: bool) -> Self {
        self.weighted = weighted;
        self
    }

    pub fn inverse_weights(mut self, inverse: bool) -> Self {
        self.inverse_weights = inverse;
        self
    }

    pub fn drop_isolates(mut self, drop: bool) -> Self {
        self.drop_isolates = drop;
        self
    }

    /// The traversal cost of an edge of the given weight under this configuration.
    pub fn edge_cost(&self, weight: f64) -> f64 {
        match (self.weighted, self.inverse_weights) {
            (false, _) => 1.0,
            (true, false) => weight,
            (true, true) => 1.0 / weight,
        }
    }
}

/// Options for building an adjacency matrix.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AdjacencyOptions {
    /// Store edge weights instead of `1.0`.
    pub weighted: bool,
    /// Store `1 / weight`. Implies `weighted`.
    pub inverse_weights: bool,
    /// Make the matrix symmetric by taking the larger of `a[i][j]` and `a[j][i]`.
    pub symmetrize: bool,
    pub drop_isolates: bool,
}

impl AdjacencyOptions {
    pub fn weighted(mut self, weighted: bool) -> Self {
        self.weighted = weighted;
        self
    }

    pub fn inverse_weights(mut self, inverse: bool) -> Self {
        self.inverse_weights = inverse;
        self
    }

    pub fn symmetrize(mut self, symmetrize: bool) -> Self {
        self.symmetrize = symmetrize;
        self
    }

    pub fn drop_isolates(mut self, drop: bool) -> Self {
        self.drop_isolates = drop;
        self
    }

    pub(crate) fn cell_value(&self, weight: f64) -> f64 {
        if self.inverse_weights {
            1.0 / weight
        } else if self.weighted {
            weight
        } else {
            1.0
        }
    }
}

impl From<TraversalConfig> for AdjacencyOptions {
    fn from(config: TraversalConfig) -> Self {
        Self {
            weighted: config.weighted,
            inverse_weights: config.weighted && config.inverse_weights,
            symmetrize: false,
            drop_isolates: config.drop_isolates,
        }
    }
}

/// The drawing area positions live in.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: f64,
    pub height: f64,
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

impl Canvas {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn center(&self) -> (f64, f64) {
        (self.width / 2.0, self.height / 2.0)
    }

    pub fn min_dimension(&self) -> f64 {
        self.width.min(self.height)
    }
}

/// Settings shared by the iterative layout solvers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub max_iterations: usize,
    /// Scatter vertices randomly over the canvas before iterating.
    pub randomize_first: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            randomize_first: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_cost() {
        let plain = TraversalConfig::default();
        assert_eq!(plain.edge_cost(3.0), 1.0);

        // Inverse weights are ignored unless weights are considered.
        assert_eq!(plain.inverse_weights(true).edge_cost(3.0), 1.0);

        let weighted = TraversalConfig::default().weighted(true);
        assert_eq!(weighted.edge_cost(3.0), 3.0);
        assert_eq!(weighted.inverse_weights(true).edge_cost(2.0), 0.5);
    }

    #[test]
    fn adjacency_from_traversal() {
        let options: AdjacencyOptions = TraversalConfig::default()
            .inverse_weights(true)
            .drop_isolates(true)
            .into();

        assert!(!options.inverse_weights);
        assert!(options.drop_isolates);
        assert_eq!(options.cell_value(4.0), 1.0);
    }

    #[test]
    fn serde_round_trip() {
        let config = TraversalConfig::default().weighted(true);
        let json = serde_json::to_string(&config).unwrap();

        assert_eq!(
            json,
            r#"{"weighted":true,"inverse_weights":false,"drop_isolates":false}"#
        );
        assert_eq!(
            serde_json::from_str::<TraversalConfig>(&json).unwrap(),
            config
        );
    }
}
