//! Dense matrices derived from the graph, and the linear algebra run on them.
//!
//! Matrices are transient: they are built from the current relation on request and never written
//! back into the graph. Rows and columns follow a [`DenseIndex`] so a matrix cell is addressed in
//! O(1) by dense position, with [`VertexMatrix`] mapping positions back to vertex ids.

use std::{fmt, ops::Sub};

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    config::{AdjacencyOptions, TraversalConfig},
    error::{Error, Result},
    graph::{check_weights, DenseIndex, Direction, Graph, EPSILON},
    vertex::VertexId,
};

/// Pivots smaller than this fraction of the largest entry are treated as zero.
const SINGULAR_EPSILON: f64 = 1e-12;

/// A square matrix whose rows and columns are labelled by vertex ids.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VertexMatrix {
    #[serde(flatten)]
    index: DenseIndex,
    pub values: DMatrix<f64>,
}

impl VertexMatrix {
    /// Labels the rows and columns of `values` with `ids`, in order.
    ///
    /// # Examples
    ///
    /// ```
    /// use nalgebra::dmatrix;
    /// use socnet::matrix::VertexMatrix;
    ///
    /// let matrix = VertexMatrix::new(vec![4, 9], dmatrix![0.0, 1.0; 2.0, 0.0]).unwrap();
    /// assert_eq!(matrix.get(9, 4), Some(2.0));
    /// assert_eq!(matrix.get(1, 4), None);
    ///
    /// assert!(VertexMatrix::new(vec![4], dmatrix![0.0, 1.0; 2.0, 0.0]).is_err());
    /// ```
    pub fn new(ids: Vec<VertexId>, values: DMatrix<f64>) -> Result<Self> {
        let n = ids.len();
        if values.shape() != (n, n) {
            return Err(Error::invalid(format!(
                "{n} ids cannot label a {}x{} matrix",
                values.nrows(),
                values.ncols()
            )));
        }

        let index = DenseIndex::new(ids);
        if index.ids().iter().enumerate().any(|(i, id)| index.get(*id) != Some(i)) {
            return Err(Error::invalid("duplicate vertex ids"));
        }

        Ok(Self { index, values })
    }

    pub(crate) fn indexed(index: &DenseIndex, values: DMatrix<f64>) -> Self {
        Self {
            index: index.clone(),
            values,
        }
    }

    pub fn ids(&self) -> &[VertexId] {
        self.index.ids()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// The cell for a pair of vertex ids.
    pub fn get(&self, row: VertexId, column: VertexId) -> Option<f64> {
        let i = self.index.get(row)?;
        let j = self.index.get(column)?;
        Some(self.values[(i, j)])
    }

    /// Row-major copy of the values, for export.
    pub fn rows(&self) -> Vec<Vec<f64>> {
        self.values
            .row_iter()
            .map(|row| row.iter().copied().collect())
            .collect()
    }
}

impl fmt::Display for VertexMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>6}", "")?;
        for id in self.ids() {
            write!(f, " {id:>8}")?;
        }
        writeln!(f)?;

        for (id, row) in self.ids().iter().zip(self.values.row_iter()) {
            write!(f, "{id:>6}")?;
            for value in row.iter() {
                if value.is_infinite() {
                    write!(f, " {:>8}", "∞")?;
                } else {
                    write!(f, " {value:>8.3}")?;
                }
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

/// Which tie profile describes a vertex when comparing two of them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Profile {
    /// Outbound ties (matrix rows).
    #[default]
    Rows,
    /// Inbound ties (matrix columns).
    Columns,
    /// Both, concatenated.
    Both,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Similarity {
    /// Share of positions where both profiles agree on the presence of a tie.
    SimpleMatching,
    /// Shared ties over ties present in either profile.
    Jaccard,
    Cosine,
    /// Pearson product-moment correlation. `NaN` when a profile has zero variance.
    Pearson,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dissimilarity {
    Euclidean,
    Manhattan,
    /// Number of positions where exactly one profile has a tie.
    Hamming,
    /// `1 - Jaccard similarity`.
    Jaccard,
    Chebyshev,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Inversion {
    #[default]
    Lu,
    GaussJordan,
}

impl Graph {
    /// Constructs the adjacency matrix of the current relation.
    ///
    /// # Examples
    ///
    /// ```
    /// use nalgebra::dmatrix;
    /// use socnet::config::AdjacencyOptions;
    /// use socnet::graph::Graph;
    ///
    /// let mut graph = Graph::new();
    /// let (a, b) = (graph.add_vertex(), graph.add_vertex());
    /// graph.add_edge(a, b, 3.0).unwrap();
    ///
    /// assert_eq!(
    ///     graph.adjacency_matrix(AdjacencyOptions::default()).values,
    ///     dmatrix![0.0, 1.0;
    ///              0.0, 0.0]
    /// );
    /// assert_eq!(
    ///     graph
    ///         .adjacency_matrix(AdjacencyOptions::default().weighted(true).symmetrize(true))
    ///         .values,
    ///     dmatrix![0.0, 3.0;
    ///              3.0, 0.0]
    /// );
    /// ```
    pub fn adjacency_matrix(&self, options: AdjacencyOptions) -> VertexMatrix {
        let index = self.dense_index(options.drop_isolates);
        VertexMatrix::indexed(&index, self.adjacency_values(&index, options))
    }

    /// Constructs the degree matrix: out-degrees (or strengths, when weighted) on the diagonal.
    pub fn degree_matrix(&self, options: AdjacencyOptions) -> VertexMatrix {
        let adjacency = self.adjacency_matrix(options);
        let n = adjacency.len();
        let mut matrix = DMatrix::<f64>::zeros(n, n);

        for (i, row) in adjacency.values.row_iter().enumerate() {
            // Rows are visited in index order, so the row number is the diagonal position.
            matrix[(i, i)] = row.sum();
        }

        VertexMatrix {
            index: adjacency.index,
            values: matrix,
        }
    }

    /// Constructs the laplacian matrix, `D - A`.
    ///
    /// # Examples
    ///
    /// ```
    /// use nalgebra::dmatrix;
    /// use socnet::config::AdjacencyOptions;
    /// use socnet::graph::Graph;
    ///
    /// let mut graph = Graph::new();
    /// let (a, b) = (graph.add_vertex(), graph.add_vertex());
    /// graph.add_undirected_edge(a, b, 1.0).unwrap();
    ///
    /// assert_eq!(
    ///     graph.laplacian_matrix(AdjacencyOptions::default()).values,
    ///     dmatrix![1.0, -1.0;
    ///              -1.0, 1.0]
    /// );
    /// ```
    pub fn laplacian_matrix(&self, options: AdjacencyOptions) -> VertexMatrix {
        let adjacency = self.adjacency_matrix(options);
        let degree = self.degree_matrix(options);

        VertexMatrix {
            index: adjacency.index,
            values: degree.values.sub(&adjacency.values),
        }
    }

    /// Geodesic distances, `f64::INFINITY` for unreachable pairs.
    pub fn distance_matrix(&mut self, config: TraversalConfig) -> Result<VertexMatrix> {
        let geodesics = self.geodesics(config)?;
        Ok(VertexMatrix::indexed(geodesics.index(), geodesics.distances().clone()))
    }

    /// Number of shortest paths between each pair.
    pub fn shortest_paths_matrix(&mut self, config: TraversalConfig) -> Result<VertexMatrix> {
        let geodesics = self.geodesics(config)?;
        Ok(VertexMatrix::indexed(
            geodesics.index(),
            geodesics.path_counts().clone(),
        ))
    }

    /// `1` where a path of any length leads from the row vertex to the column vertex.
    ///
    /// The diagonal is `1` for vertices lying on a cycle (or carrying a self-loop).
    pub fn reachability_matrix(&mut self, drop_isolates: bool) -> Result<VertexMatrix> {
        let config = TraversalConfig::default().drop_isolates(drop_isolates);
        let index = self.dense_index(drop_isolates);
        let inbound = self.dense_adjacency(&index, Direction::Inbound);
        let distances = self.geodesics(config)?.distances();
        let n = index.len();

        let values = DMatrix::from_fn(n, n, |i, j| {
            let reachable = if i == j {
                inbound[i]
                    .iter()
                    .any(|(k, _)| *k == i || distances[(i, *k)].is_finite())
            } else {
                distances[(i, j)].is_finite()
            };
            f64::from(u8::from(reachable))
        });

        Ok(VertexMatrix::indexed(&index, values))
    }

    /// Number of walks of exactly `length` steps between each pair: the adjacency matrix raised
    /// to `length`.
    #[instrument(skip(self))]
    pub fn walks_matrix(&self, length: usize, options: AdjacencyOptions) -> Result<VertexMatrix> {
        if length == 0 {
            return Err(Error::invalid("walk length must be at least 1"));
        }

        let index = self.dense_index(options.drop_isolates);
        check_weights(&self.dense_adjacency(&index, Direction::Outbound), options)?;
        let adjacency = self.adjacency_values(&index, options);

        let mut walks = adjacency.clone();
        for _ in 1..length {
            walks = &walks * &adjacency;
        }

        Ok(VertexMatrix::indexed(&index, walks))
    }

    /// Walks of every length from 1 to `n - 1`, summed.
    #[instrument(skip(self))]
    pub fn total_walks_matrix(&self, options: AdjacencyOptions) -> VertexMatrix {
        let index = self.dense_index(options.drop_isolates);
        let adjacency = self.adjacency_values(&index, options);
        let n = index.len();

        let mut power = adjacency.clone();
        let mut total = DMatrix::zeros(n, n);
        for _ in 1..n {
            total += &power;
            power = &power * &adjacency;
        }

        VertexMatrix::indexed(&index, total)
    }

    /// Number of walks of `length` steps from `source` to `target`.
    pub fn walks_between(&self, source: VertexId, target: VertexId, length: usize) -> Result<f64> {
        self.vertex(source)?;
        self.vertex(target)?;

        let walks = self.walks_matrix(length, AdjacencyOptions::default())?;
        Ok(walks.get(source, target).unwrap_or(0.0))
    }

    /// Inverse of the adjacency matrix.
    ///
    /// Fails with [`Error::Unsupported`] on weights the options cannot use, such as a zero weight
    /// under inverse weights.
    pub fn inverse_adjacency_matrix(
        &self,
        options: AdjacencyOptions,
        method: Inversion,
    ) -> Result<VertexMatrix> {
        let index = self.dense_index(options.drop_isolates);
        check_weights(&self.dense_adjacency(&index, Direction::Outbound), options)?;
        let adjacency = self.adjacency_matrix(options);
        Ok(VertexMatrix {
            values: invert(&adjacency.values, method)?,
            index: adjacency.index,
        })
    }

    /// Pairwise similarity of the vertices' tie profiles.
    pub fn similarity_matrix(
        &self,
        measure: Similarity,
        profile: Profile,
        diagonal: bool,
        options: AdjacencyOptions,
    ) -> VertexMatrix {
        let adjacency = self.adjacency_matrix(options);
        VertexMatrix {
            values: similarity(&adjacency.values, measure, profile, diagonal),
            index: adjacency.index,
        }
    }

    /// Pairwise dissimilarity (distance) of the vertices' tie profiles.
    pub fn dissimilarity_matrix(
        &self,
        metric: Dissimilarity,
        profile: Profile,
        diagonal: bool,
        options: AdjacencyOptions,
    ) -> VertexMatrix {
        let adjacency = self.adjacency_matrix(options);
        VertexMatrix {
            values: dissimilarity(&adjacency.values, metric, profile, diagonal),
            index: adjacency.index,
        }
    }

    pub(crate) fn adjacency_values(
        &self,
        index: &DenseIndex,
        options: AdjacencyOptions,
    ) -> DMatrix<f64> {
        let n = index.len();
        let mut matrix = DMatrix::<f64>::zeros(n, n);

        for (i, neighbours) in self
            .dense_adjacency(index, Direction::Outbound)
            .into_iter()
            .enumerate()
        {
            for (j, weight) in neighbours {
                matrix[(i, j)] = options.cell_value(weight);
            }
        }

        if options.symmetrize {
            symmetrize(&mut matrix);
        }

        matrix
    }
}

//
// Linear algebra
//

/// Whether `m[(i, j)] == m[(j, i)]` everywhere.
pub fn is_symmetric(matrix: &DMatrix<f64>) -> bool {
    matrix.is_square()
        && (0..matrix.nrows()).all(|i| {
            (i + 1..matrix.ncols()).all(|j| (matrix[(i, j)] - matrix[(j, i)]).abs() < EPSILON)
        })
}

/// Makes a square matrix symmetric by keeping the larger of each mirrored pair of cells.
pub fn symmetrize(matrix: &mut DMatrix<f64>) {
    let n = matrix.nrows().min(matrix.ncols());
    for i in 0..n {
        for j in i + 1..n {
            let value = matrix[(i, j)].max(matrix[(j, i)]);
            matrix[(i, j)] = value;
            matrix[(j, i)] = value;
        }
    }
}

/// Inverts a square matrix.
///
/// Fails with [`Error::Singular`] when a pivot is (numerically) zero relative to the largest entry
/// of the matrix, so a well-conditioned matrix of small values still inverts.
///
/// # Examples
///
/// ```
/// use nalgebra::{dmatrix, DMatrix};
/// use socnet::error::Error;
/// use socnet::matrix::{invert, Inversion};
///
/// let identity = DMatrix::<f64>::identity(2, 2);
/// assert_eq!(invert(&identity, Inversion::Lu).unwrap(), identity);
///
/// let singular = dmatrix![1.0, 2.0;
///                         0.0, 0.0];
/// assert_eq!(invert(&singular, Inversion::Lu), Err(Error::Singular));
/// ```
pub fn invert(matrix: &DMatrix<f64>, method: Inversion) -> Result<DMatrix<f64>> {
    if !matrix.is_square() {
        return Err(Error::invalid(format!(
            "cannot invert a {}x{} matrix",
            matrix.nrows(),
            matrix.ncols()
        )));
    }

    if matrix.is_empty() {
        return Ok(matrix.clone());
    }

    let inverse = match method {
        Inversion::Lu => {
            let tolerance = SINGULAR_EPSILON * matrix.amax();
            let lu = matrix.clone().lu();
            if lu.u().diagonal().iter().any(|pivot| pivot.abs() <= tolerance) {
                return Err(Error::Singular);
            }
            lu.try_inverse()
                .filter(|inverse| inverse.iter().all(|x| x.is_finite()))
                .ok_or(Error::Singular)?
        }
        Inversion::GaussJordan => gauss_jordan(matrix)?,
    };

    debug!(n = matrix.nrows(), ?method, "matrix inverted");
    Ok(inverse)
}

/// Gauss-Jordan elimination with partial pivoting on `[A | I]`.
fn gauss_jordan(matrix: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    let n = matrix.nrows();
    let tolerance = SINGULAR_EPSILON * matrix.amax();
    let mut a = matrix.clone();
    let mut inverse = DMatrix::<f64>::identity(n, n);

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&x, &y| a[(x, col)].abs().total_cmp(&a[(y, col)].abs()))
            .unwrap_or(col);

        if a[(pivot, col)].abs() <= tolerance {
            return Err(Error::Singular);
        }

        a.swap_rows(pivot, col);
        inverse.swap_rows(pivot, col);

        let scale = a[(col, col)];
        for k in 0..n {
            a[(col, k)] /= scale;
            inverse[(col, k)] /= scale;
        }

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = a[(row, col)];
            if factor == 0.0 {
                continue;
            }
            for k in 0..n {
                a[(row, k)] -= factor * a[(col, k)];
                inverse[(row, k)] -= factor * inverse[(col, k)];
            }
        }
    }

    Ok(inverse)
}

/// Tie profile of vertex `i`, skipping the positions of `i` and `j` unless `diagonal` is set.
fn profile_pair(
    matrix: &DMatrix<f64>,
    profile: Profile,
    diagonal: bool,
    i: usize,
    j: usize,
) -> (Vec<f64>, Vec<f64>) {
    let n = matrix.nrows();
    let mut x = Vec::with_capacity(2 * n);
    let mut y = Vec::with_capacity(2 * n);

    for k in 0..n {
        if !diagonal && (k == i || k == j) {
            continue;
        }
        if profile != Profile::Columns {
            x.push(matrix[(i, k)]);
            y.push(matrix[(j, k)]);
        }
        if profile != Profile::Rows {
            x.push(matrix[(k, i)]);
            y.push(matrix[(k, j)]);
        }
    }

    (x, y)
}

/// Pairwise similarity of the rows and/or columns of a square matrix.
pub fn similarity(
    matrix: &DMatrix<f64>,
    measure: Similarity,
    profile: Profile,
    diagonal: bool,
) -> DMatrix<f64> {
    let n = matrix.nrows();

    DMatrix::from_fn(n, n, |i, j| {
        let (x, y) = profile_pair(matrix, profile, diagonal, i, j);
        let pairs = x.iter().zip(&y);

        match measure {
            Similarity::SimpleMatching => {
                if x.is_empty() {
                    return 1.0;
                }
                let matches = pairs.filter(|(a, b)| (**a != 0.0) == (**b != 0.0)).count();
                matches as f64 / x.len() as f64
            }
            Similarity::Jaccard => jaccard(&x, &y),
            Similarity::Cosine => {
                let dot: f64 = pairs.map(|(a, b)| a * b).sum();
                let norm = x.iter().map(|a| a * a).sum::<f64>().sqrt()
                    * y.iter().map(|b| b * b).sum::<f64>().sqrt();
                if norm == 0.0 {
                    f64::NAN
                } else {
                    dot / norm
                }
            }
            Similarity::Pearson => pearson(&x, &y),
        }
    })
}

/// Pairwise dissimilarity of the rows and/or columns of a square matrix.
pub fn dissimilarity(
    matrix: &DMatrix<f64>,
    metric: Dissimilarity,
    profile: Profile,
    diagonal: bool,
) -> DMatrix<f64> {
    let n = matrix.nrows();

    DMatrix::from_fn(n, n, |i, j| {
        if i == j {
            return 0.0;
        }

        let (x, y) = profile_pair(matrix, profile, diagonal, i, j);
        let differences = x.iter().zip(&y).map(|(a, b)| (a - b).abs());

        match metric {
            Dissimilarity::Euclidean => differences.map(|d| d * d).sum::<f64>().sqrt(),
            Dissimilarity::Manhattan => differences.sum(),
            Dissimilarity::Chebyshev => differences.fold(0.0, f64::max),
            Dissimilarity::Hamming => x
                .iter()
                .zip(&y)
                .filter(|(a, b)| (**a != 0.0) != (**b != 0.0))
                .count() as f64,
            Dissimilarity::Jaccard => 1.0 - jaccard(&x, &y),
        }
    })
}

/// Two empty profiles are identical, so their similarity is 1.
fn jaccard(x: &[f64], y: &[f64]) -> f64 {
    let (mut both, mut either) = (0usize, 0usize);
    for (a, b) in x.iter().zip(y) {
        let (a, b) = (*a != 0.0, *b != 0.0);
        both += usize::from(a && b);
        either += usize::from(a || b);
    }

    if either == 0 {
        1.0
    } else {
        both as f64 / either as f64
    }
}

fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len() as f64;
    if x.is_empty() {
        return f64::NAN;
    }

    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let (mut covariance, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        covariance += (a - mean_x) * (b - mean_y);
        var_x += (a - mean_x).powi(2);
        var_y += (b - mean_y).powi(2);
    }

    if var_x == 0.0 || var_y == 0.0 {
        return f64::NAN;
    }

    covariance / (var_x * var_y).sqrt()
}

#[cfg(test)]
mod tests {
    use nalgebra::dmatrix;

    use super::*;
    use crate::fixtures::{assert_close, from_arcs, path, star};

    #[test]
    fn adjacency_matrix() {
        let graph = Graph::new();
        assert_eq!(
            graph.adjacency_matrix(AdjacencyOptions::default()).values,
            dmatrix![]
        );

        let graph = path(3, false);
        assert_eq!(
            graph.adjacency_matrix(AdjacencyOptions::default()).values,
            dmatrix![0.0, 1.0, 0.0;
                     1.0, 0.0, 1.0;
                     0.0, 1.0, 0.0]
        );
    }

    #[test]
    fn adjacency_inverse_weights() {
        let mut graph = path(2, true);
        graph.set_edge_weight(1, 2, 4.0).unwrap();

        let options = AdjacencyOptions::default().inverse_weights(true);
        assert_eq!(graph.adjacency_matrix(options).values, dmatrix![0.0, 0.25; 0.0, 0.0]);
    }

    #[test]
    fn adjacency_drops_isolates() {
        let mut graph = path(2, true);
        graph.add_vertex();

        let matrix = graph.adjacency_matrix(AdjacencyOptions::default().drop_isolates(true));
        assert_eq!(matrix.ids(), [1, 2]);
        assert_eq!(matrix.values, dmatrix![0.0, 1.0; 0.0, 0.0]);
    }

    #[test]
    fn degree_matrix() {
        let graph = star(3, false);

        assert_eq!(
            graph.degree_matrix(AdjacencyOptions::default()).values,
            dmatrix![2.0, 0.0, 0.0;
                     0.0, 1.0, 0.0;
                     0.0, 0.0, 1.0]
        );
    }

    #[test]
    fn laplacian_matrix() {
        let graph = star(3, false);

        assert_eq!(
            graph.laplacian_matrix(AdjacencyOptions::default()).values,
            dmatrix![2.0, -1.0, -1.0;
                     -1.0, 1.0, 0.0;
                     -1.0, 0.0, 1.0]
        );
    }

    #[test]
    fn degree_from_row_sums() {
        let graph = from_arcs(4, &[(1, 2), (1, 3), (3, 4), (4, 1)]);
        let adjacency = graph.adjacency_matrix(AdjacencyOptions::default());

        for (i, id) in adjacency.ids().iter().enumerate() {
            assert_eq!(
                adjacency.values.row(i).sum() as usize,
                graph.out_degree(*id).unwrap()
            );
        }
    }

    #[test]
    fn distance_matrix() {
        let mut graph = path(3, true);
        let matrix = graph.distance_matrix(TraversalConfig::default()).unwrap();

        assert_eq!(matrix.get(1, 3), Some(2.0));
        assert_eq!(matrix.get(3, 1), Some(f64::INFINITY));
        assert!(matrix.to_string().contains('∞'));
    }

    #[test]
    fn reachability_matrix() {
        let mut graph = from_arcs(4, &[(1, 2), (2, 3), (3, 2)]);
        let matrix = graph.reachability_matrix(false).unwrap();

        assert_eq!(
            matrix.values,
            dmatrix![0.0, 1.0, 1.0, 0.0;
                     0.0, 1.0, 1.0, 0.0;
                     0.0, 1.0, 1.0, 0.0;
                     0.0, 0.0, 0.0, 0.0]
        );
    }

    #[test]
    fn walks() {
        let graph = from_arcs(3, &[(1, 2), (2, 3), (3, 1)]);
        let options = AdjacencyOptions::default();

        assert_eq!(
            graph.walks_matrix(1, options).unwrap(),
            graph.adjacency_matrix(options)
        );
        assert_eq!(graph.walks_between(1, 3, 2).unwrap(), 1.0);
        assert_eq!(graph.walks_between(1, 1, 3).unwrap(), 1.0);
        assert_eq!(graph.walks_between(1, 2, 2).unwrap(), 0.0);
        assert!(matches!(
            graph.walks_matrix(0, options),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn total_walks() {
        let graph = path(3, true);

        assert_eq!(
            graph.total_walks_matrix(AdjacencyOptions::default()).values,
            dmatrix![0.0, 1.0, 1.0;
                     0.0, 0.0, 1.0;
                     0.0, 0.0, 0.0]
        );
    }

    #[test]
    fn invert_methods_agree() {
        let matrix = dmatrix![4.0, 7.0, 2.0;
                              3.0, 6.0, 1.0;
                              2.0, 5.0, 3.0];

        let lu = invert(&matrix, Inversion::Lu).unwrap();
        let gj = invert(&matrix, Inversion::GaussJordan).unwrap();

        for (a, b) in lu.iter().zip(gj.iter()) {
            assert_close(*a, *b);
        }

        let identity = &matrix * &lu;
        for i in 0..3 {
            for j in 0..3 {
                assert_close(identity[(i, j)], if i == j { 1.0 } else { 0.0 });
            }
        }
    }

    #[test]
    fn invert_singular() {
        let zero_row = dmatrix![1.0, 2.0;
                                0.0, 0.0];

        assert_eq!(invert(&zero_row, Inversion::Lu), Err(Error::Singular));
        assert_eq!(invert(&zero_row, Inversion::GaussJordan), Err(Error::Singular));
        assert!(matches!(
            invert(&DMatrix::zeros(2, 3), Inversion::Lu),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn invert_small_scale() {
        // Well conditioned, with a determinant of 1e-15.
        let matrix = DMatrix::<f64>::identity(3, 3) * 1e-5;

        for method in [Inversion::Lu, Inversion::GaussJordan] {
            let inverse = invert(&matrix, method).unwrap();
            for i in 0..3 {
                for j in 0..3 {
                    assert_close(inverse[(i, j)], if i == j { 1e5 } else { 0.0 });
                }
            }
        }

        let zero_row = dmatrix![1e-5, 2e-5;
                                0.0, 0.0];
        assert_eq!(invert(&zero_row, Inversion::Lu), Err(Error::Singular));
        assert_eq!(invert(&zero_row, Inversion::GaussJordan), Err(Error::Singular));
    }

    #[test]
    fn unusable_weights_unsupported() {
        let mut graph = path(3, false);
        graph.set_edge_weight(1, 2, 0.0).unwrap();
        let inverse = AdjacencyOptions::default().inverse_weights(true);

        assert!(matches!(
            graph.inverse_adjacency_matrix(inverse, Inversion::Lu),
            Err(Error::Unsupported(_))
        ));
        assert!(matches!(
            graph.walks_matrix(2, inverse),
            Err(Error::Unsupported(_))
        ));

        graph.set_edge_weight(2, 3, -2.0).unwrap();
        assert!(matches!(
            graph.walks_matrix(1, AdjacencyOptions::default().weighted(true)),
            Err(Error::Unsupported(_))
        ));
        assert!(graph.walks_matrix(1, AdjacencyOptions::default()).is_ok());
    }

    #[test]
    fn vertex_matrix_lookup() {
        let matrix = VertexMatrix::new(
            vec![10, 3, 7],
            dmatrix![0.0, 1.0, 2.0;
                     3.0, 0.0, 4.0;
                     5.0, 6.0, 0.0],
        )
        .unwrap();

        assert_eq!(matrix.get(3, 7), Some(4.0));
        assert_eq!(matrix.get(7, 10), Some(5.0));
        assert_eq!(matrix.get(3, 8), None);
        assert_eq!(matrix.ids(), [10, 3, 7]);

        assert!(matches!(
            VertexMatrix::new(vec![1, 2], dmatrix![0.0, 1.0, 2.0]),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            VertexMatrix::new(vec![1, 1], DMatrix::zeros(2, 2)),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn inverse_adjacency() {
        let graph = path(2, false);
        let inverse = graph
            .inverse_adjacency_matrix(AdjacencyOptions::default(), Inversion::Lu)
            .unwrap();

        assert_eq!(inverse.values, dmatrix![0.0, 1.0; 1.0, 0.0]);

        // A directed path has an all-zero last row.
        assert_eq!(
            path(2, true).inverse_adjacency_matrix(AdjacencyOptions::default(), Inversion::Lu),
            Err(Error::Singular)
        );
    }

    #[test]
    fn symmetrize_matrix() {
        let mut matrix = dmatrix![0.0, 2.0; 1.0, 0.0];
        assert!(!is_symmetric(&matrix));

        symmetrize(&mut matrix);
        assert!(is_symmetric(&matrix));
        assert_eq!(matrix, dmatrix![0.0, 2.0; 2.0, 0.0]);
    }

    #[test]
    fn similarity_measures() {
        // Vertices 1 and 2 point at the same two targets.
        let matrix = dmatrix![0.0, 0.0, 1.0, 1.0;
                              0.0, 0.0, 1.0, 1.0;
                              0.0, 0.0, 0.0, 1.0;
                              0.0, 0.0, 0.0, 0.0];

        let matching = similarity(&matrix, Similarity::SimpleMatching, Profile::Rows, true);
        assert_eq!(matching[(0, 1)], 1.0);
        assert_eq!(matching[(0, 2)], 0.75);

        // Without the diagonal, rows 1 and 3 are compared on columns 2 and 4 only.
        let matching = similarity(&matrix, Similarity::SimpleMatching, Profile::Rows, false);
        assert_eq!(matching[(0, 2)], 1.0);

        let jaccard = similarity(&matrix, Similarity::Jaccard, Profile::Rows, true);
        assert_eq!(jaccard[(0, 1)], 1.0);
        assert_eq!(jaccard[(0, 2)], 0.5);
        assert_eq!(jaccard[(0, 3)], 0.0);

        let pearson = similarity(&matrix, Similarity::Pearson, Profile::Rows, true);
        assert_close(pearson[(0, 1)], 1.0);
        // The last row is constant.
        assert!(pearson[(0, 3)].is_nan());

        let cosine = similarity(&matrix, Similarity::Cosine, Profile::Rows, true);
        assert_close(cosine[(0, 2)], 1.0 / 2f64.sqrt());
    }

    #[test]
    fn dissimilarity_metrics() {
        let matrix = dmatrix![0.0, 2.0, 0.0;
                              1.0, 0.0, 0.0;
                              0.0, 0.0, 0.0];

        let euclidean = dissimilarity(&matrix, Dissimilarity::Euclidean, Profile::Rows, true);
        assert_close(euclidean[(0, 1)], 5f64.sqrt());
        assert_eq!(euclidean[(1, 1)], 0.0);

        let manhattan = dissimilarity(&matrix, Dissimilarity::Manhattan, Profile::Rows, true);
        assert_eq!(manhattan[(0, 1)], 3.0);
        assert_eq!(manhattan[(0, 2)], 2.0);

        let chebyshev = dissimilarity(&matrix, Dissimilarity::Chebyshev, Profile::Rows, true);
        assert_eq!(chebyshev[(0, 1)], 2.0);

        let hamming = dissimilarity(&matrix, Dissimilarity::Hamming, Profile::Both, true);
        assert_eq!(hamming[(0, 2)], 2.0);

        let jaccard = dissimilarity(&matrix, Dissimilarity::Jaccard, Profile::Rows, true);
        assert_eq!(jaccard[(0, 1)], 1.0);
    }

    #[test]
    fn exports_as_table() {
        let graph = path(2, true);
        let matrix = graph.adjacency_matrix(AdjacencyOptions::default());

        assert_eq!(matrix.rows(), vec![vec![0.0, 1.0], vec![0.0, 0.0]]);

        let json = serde_json::to_value(&matrix).unwrap();
        assert_eq!(json["ids"], serde_json::json!([1, 2]));
    }
}
