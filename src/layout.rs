//! Vertex placement: simple layouts, prominence layouts and force-directed solvers.
//!
//! Layouts only move vertices. They never touch ties, so cached metrics survive them.

use std::{
    collections::VecDeque,
    f64::consts::{FRAC_PI_2, TAU},
};

use nalgebra::Vector2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use crate::{
    centrality::Index,
    config::{Canvas, LayoutConfig, TraversalConfig},
    error::Result,
    event::{Event, Task},
    graph::{DenseIndex, Direction, Graph},
    vertex::Position,
};

/// Closer than this, two vertices are treated as coincident.
const MIN_DISTANCE: f64 = 0.01;

const EADES_SPRING: f64 = 2.0;
const EADES_STEP: f64 = 0.1;

/// Energy gradient below which Kamada–Kawai stops early.
const KK_TOLERANCE: f64 = 1e-3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ForceModel {
    /// Logarithmic springs between neighbours, inverse-square repulsion between the rest.
    Eades,
    /// Attraction `d^2 / k` between neighbours, repulsion `k^2 / d` between every pair, damped
    /// by a cooling temperature.
    FruchtermanReingold,
    /// Springs between every pair with rest lengths proportional to graph distance.
    KamadaKawai,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProminenceLayout {
    /// Concentric rings, the most prominent vertices in the centre.
    #[default]
    Radial,
    /// Horizontal levels, the most prominent vertices at the top.
    Levels,
}

impl Graph {
    /// The ideal edge length for the current canvas, `sqrt(area / n)`.
    pub fn optimal_distance(&self) -> f64 {
        (self.canvas().area() / self.vertex_count().max(1) as f64).sqrt()
    }

    /// Scatters every vertex uniformly over the canvas.
    pub fn layout_random<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<()> {
        let canvas = self.canvas();
        let index = self.dense_index(false);
        let points: Vec<Vector2<f64>> = (0..index.len())
            .map(|_| random_point(canvas, rng))
            .collect();

        self.apply_points(&index, &points)
    }

    /// Places the vertices evenly on a circle around the canvas centre, in id order.
    pub fn layout_circular(&mut self) -> Result<()> {
        let canvas = self.canvas();
        let index = self.dense_index(false);
        let n = index.len();
        let points: Vec<Vector2<f64>> = (0..n)
            .map(|i| to_point(circle_position(i, n, canvas)))
            .collect();

        self.apply_points(&index, &points)
    }

    /// Places vertices by their standardized score on a prominence index.
    ///
    /// Vertices without a defined score (or dropped as isolates) are placed as the least
    /// prominent.
    pub fn layout_by_prominence(
        &mut self,
        index: Index,
        config: TraversalConfig,
        style: ProminenceLayout,
    ) -> Result<()> {
        let canvas = self.canvas();
        let dense = self.dense_index(false);
        let n = dense.len();

        let prominence = self.prominence(index, config)?;
        let max = prominence
            .scores()
            .iter()
            .filter_map(|s| s.std)
            .fold(0.0_f64, f64::max);
        let levels: Vec<f64> = dense
            .ids()
            .iter()
            .map(|&id| match prominence.get(id).and_then(|s| s.std) {
                Some(_) if max <= 0.0 => 1.0,
                Some(score) => score / max,
                None => 0.0,
            })
            .collect();

        let (cx, cy) = canvas.center();
        let margin = 0.05 * canvas.min_dimension();

        let mut points = Vec::with_capacity(n);
        for (i, &level) in levels.iter().enumerate() {
            let point = match style {
                ProminenceLayout::Radial => {
                    let radius = (0.5 * canvas.min_dimension() - margin) * (1.0 - level);
                    let angle = TAU * i as f64 / n as f64 - FRAC_PI_2;
                    Vector2::new(cx + radius * angle.cos(), cy + radius * angle.sin())
                }
                ProminenceLayout::Levels => {
                    let x = self.vertex(dense.id(i))?.position().x;
                    Vector2::new(x, margin + (canvas.height - 2.0 * margin) * (1.0 - level))
                }
            };
            points.push(point);
        }

        self.apply_points(&dense, &points)
    }

    /// Runs a force-directed solver for at most `config.max_iterations` iterations.
    ///
    /// Starts from the current positions, or from random ones when `config.randomize_first` is
    /// set. Vertices that all share one position are first spread on a circle.
    ///
    /// # Examples
    ///
    /// ```
    /// use rand::{rngs::SmallRng, SeedableRng};
    /// use socnet::{config::LayoutConfig, graph::Graph, layout::ForceModel};
    ///
    /// let mut graph = Graph::new();
    /// let (a, b, c) = (graph.add_vertex(), graph.add_vertex(), graph.add_vertex());
    /// graph.add_edge(a, b, 1.0).unwrap();
    /// graph.add_edge(b, c, 1.0).unwrap();
    ///
    /// let mut rng = SmallRng::seed_from_u64(1);
    /// graph
    ///     .layout_force_directed(ForceModel::FruchtermanReingold, LayoutConfig::default(), &mut rng)
    ///     .unwrap();
    ///
    /// let canvas = graph.canvas();
    /// for vertex in graph.vertices() {
    ///     let p = vertex.position();
    ///     assert!((0.0..=canvas.width).contains(&p.x));
    ///     assert!((0.0..=canvas.height).contains(&p.y));
    /// }
    /// ```
    #[instrument(skip(self, rng))]
    pub fn layout_force_directed<R: Rng + ?Sized>(
        &mut self,
        model: ForceModel,
        config: LayoutConfig,
        rng: &mut R,
    ) -> Result<()> {
        let canvas = self.canvas();
        let index = self.dense_index(false);
        let n = index.len();
        if n == 0 {
            return Ok(());
        }

        let mut points = if config.randomize_first {
            (0..n).map(|_| random_point(canvas, rng)).collect()
        } else {
            let current = self.points(&index)?;
            if n > 1 && current.iter().all(|p| (p - current[0]).norm() < MIN_DISTANCE) {
                (0..n)
                    .map(|i| to_point(circle_position(i, n, canvas)))
                    .collect()
            } else {
                current
            }
        };

        let neighbours: Vec<Vec<usize>> = self
            .dense_adjacency(&index, Direction::Either)
            .into_iter()
            .enumerate()
            .map(|(i, ties)| ties.into_iter().map(|(j, _)| j).filter(|&j| j != i).collect())
            .collect();
        let k = self.optimal_distance();

        self.notify(Event::ComputationStarted {
            task: Task::Layout,
            total: config.max_iterations,
        });

        let springs = (model == ForceModel::KamadaKawai).then(|| Springs::new(&neighbours, canvas));
        for iteration in 0..config.max_iterations {
            let moved = match (model, springs.as_ref()) {
                (ForceModel::Eades, _) => {
                    eades_step(&mut points, &neighbours, k);
                    true
                }
                (ForceModel::FruchtermanReingold, _) => {
                    let temperature =
                        canvas.width / 10.0 * (1.0 - iteration as f64 / config.max_iterations as f64);
                    fruchterman_reingold_step(&mut points, &neighbours, k, temperature);
                    true
                }
                (ForceModel::KamadaKawai, Some(springs)) => springs.step(&mut points),
                (ForceModel::KamadaKawai, None) => false,
            };

            for point in &mut points {
                clamp(point, canvas);
            }
            self.progress(Task::Layout, iteration + 1);

            if !moved {
                trace!(iteration, "layout converged");
                break;
            }
        }

        self.notify(Event::ComputationFinished { task: Task::Layout });
        debug!(?model, vertices = n, optimal_distance = k, "layout applied");

        self.apply_points(&index, &points)
    }

    fn points(&self, index: &DenseIndex) -> Result<Vec<Vector2<f64>>> {
        index
            .ids()
            .iter()
            .map(|&id| Ok(to_point(self.vertex(id)?.position())))
            .collect()
    }

    fn apply_points(&mut self, index: &DenseIndex, points: &[Vector2<f64>]) -> Result<()> {
        for (&id, point) in index.ids().iter().zip(points) {
            self.set_vertex_position(id, Position::new(point.x, point.y))?;
        }
        Ok(())
    }
}

/// The `i`-th of `n` evenly spaced points on a circle filling most of the canvas.
pub(crate) fn circle_position(i: usize, n: usize, canvas: Canvas) -> Position {
    let (cx, cy) = canvas.center();
    let radius = 0.4 * canvas.min_dimension();
    let angle = TAU * i as f64 / n.max(1) as f64 - FRAC_PI_2;

    Position::new(cx + radius * angle.cos(), cy + radius * angle.sin())
}

/// The `i`-th cell of a square grid big enough for `n` vertices, filled row by row.
pub(crate) fn grid_position(i: usize, n: usize, canvas: Canvas) -> Position {
    let side = (n as f64).sqrt().ceil().max(1.0) as usize;
    let (column, row) = (i % side, i / side);
    let cell_x = canvas.width / (side + 1) as f64;
    let cell_y = canvas.height / (side + 1) as f64;

    Position::new(cell_x * (column + 1) as f64, cell_y * (row + 1) as f64)
}

fn to_point(position: Position) -> Vector2<f64> {
    Vector2::new(position.x, position.y)
}

fn random_point<R: Rng + ?Sized>(canvas: Canvas, rng: &mut R) -> Vector2<f64> {
    Vector2::new(rng.gen::<f64>() * canvas.width, rng.gen::<f64>() * canvas.height)
}

fn clamp(point: &mut Vector2<f64>, canvas: Canvas) {
    point.x = point.x.clamp(0.0, canvas.width);
    point.y = point.y.clamp(0.0, canvas.height);
}

/// Unit vector from `b` to `a` and their distance. Coincident points get a fixed direction
/// picked from the pair so they separate deterministically.
fn separation(a: &Vector2<f64>, b: &Vector2<f64>, i: usize, j: usize) -> (Vector2<f64>, f64) {
    let delta = a - b;
    let distance = delta.norm();
    if distance >= MIN_DISTANCE {
        return (delta / distance, distance);
    }

    let angle = (7 * i + 13 * j) as f64;
    (Vector2::new(angle.cos(), angle.sin()), MIN_DISTANCE)
}

fn adjacent(neighbours: &[Vec<usize>], i: usize, j: usize) -> bool {
    neighbours[i].binary_search(&j).is_ok()
}

/// Net pairwise forces, positive values pushing a pair apart.
fn pairwise_displacements(
    points: &[Vector2<f64>],
    force: impl Fn(usize, usize, f64) -> f64,
) -> Vec<Vector2<f64>> {
    let n = points.len();
    let mut displacements = vec![Vector2::zeros(); n];

    for i in 0..n {
        for j in i + 1..n {
            let (direction, distance) = separation(&points[i], &points[j], i, j);
            let push = direction * force(i, j, distance);
            displacements[i] += push;
            displacements[j] -= push;
        }
    }

    displacements
}

/// One Eades iteration. A vertex moves at most `k` per step, so near-coincident pairs separate
/// gradually instead of being flung apart by the inverse-square repulsion.
fn eades_step(points: &mut [Vector2<f64>], neighbours: &[Vec<usize>], k: f64) {
    let displacements = pairwise_displacements(points, |i, j, distance| {
        let relative = distance / k;
        if adjacent(neighbours, i, j) {
            -EADES_SPRING * relative.ln()
        } else {
            1.0 / (relative * relative)
        }
    });

    for (point, displacement) in points.iter_mut().zip(displacements) {
        let step = displacement * EADES_STEP * k;
        let length = step.norm();
        if length > k {
            *point += step / length * k;
        } else {
            *point += step;
        }
    }
}

fn fruchterman_reingold_step(
    points: &mut [Vector2<f64>],
    neighbours: &[Vec<usize>],
    k: f64,
    temperature: f64,
) {
    let displacements = pairwise_displacements(points, |i, j, distance| {
        let repulsion = k * k / distance;
        if adjacent(neighbours, i, j) {
            repulsion - distance * distance / k
        } else {
            repulsion
        }
    });

    for (point, displacement) in points.iter_mut().zip(displacements) {
        let length = displacement.norm();
        if length > 0.0 {
            *point += displacement / length * length.min(temperature);
        }
    }
}

/// Kamada–Kawai spring system: rest lengths and stiffnesses for every pair.
struct Springs {
    lengths: Vec<Vec<f64>>,
    strengths: Vec<Vec<f64>>,
}

impl Springs {
    fn new(neighbours: &[Vec<usize>], canvas: Canvas) -> Self {
        let n = neighbours.len();
        let hops: Vec<Vec<Option<usize>>> = (0..n).map(|s| bfs(neighbours, s)).collect();

        // Disconnected pairs sit one step beyond the longest finite distance.
        let longest = hops.iter().flatten().flatten().copied().max().unwrap_or(0);
        let far = longest + 1;

        let unit = 0.9 * canvas.min_dimension() / far as f64;
        let lengths = hops
            .iter()
            .map(|row| row.iter().map(|h| unit * h.unwrap_or(far) as f64).collect())
            .collect();
        let strengths = hops
            .iter()
            .map(|row| {
                row.iter()
                    .map(|h| match h.unwrap_or(far) {
                        0 => 0.0,
                        d => 1.0 / (d * d) as f64,
                    })
                    .collect()
            })
            .collect();

        Self { lengths, strengths }
    }

    /// Moves the vertex with the largest energy gradient by one Newton–Raphson step. Returns
    /// `false` once every gradient is below tolerance.
    fn step(&self, points: &mut [Vector2<f64>]) -> bool {
        let gradients: Vec<(f64, f64)> = (0..points.len()).map(|m| self.gradient(points, m)).collect();
        let Some((m, &(gx, gy))) = gradients
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.0.hypot(a.1).total_cmp(&b.0.hypot(b.1)))
        else {
            return false;
        };

        if gx.hypot(gy) < KK_TOLERANCE {
            return false;
        }

        let (mut xx, mut xy, mut yy) = (0.0, 0.0, 0.0);
        for i in (0..points.len()).filter(|&i| i != m) {
            let delta = points[m] - points[i];
            let distance = delta.norm().max(MIN_DISTANCE);
            let cube = distance.powi(3);
            let (k, l) = (self.strengths[m][i], self.lengths[m][i]);

            xx += k * (1.0 - l * delta.y * delta.y / cube);
            xy += k * l * delta.x * delta.y / cube;
            yy += k * (1.0 - l * delta.x * delta.x / cube);
        }

        let determinant = xx * yy - xy * xy;
        if determinant.abs() < f64::EPSILON {
            return false;
        }

        points[m].x += (xy * gy - yy * gx) / determinant;
        points[m].y += (xy * gx - xx * gy) / determinant;
        true
    }

    fn gradient(&self, points: &[Vector2<f64>], m: usize) -> (f64, f64) {
        let (mut gx, mut gy) = (0.0, 0.0);
        for i in (0..points.len()).filter(|&i| i != m) {
            let (direction, distance) = separation(&points[m], &points[i], m, i);
            let delta = direction * distance;
            let (k, l) = (self.strengths[m][i], self.lengths[m][i]);

            gx += k * (delta.x - l * delta.x / distance);
            gy += k * (delta.y - l * delta.y / distance);
        }
        (gx, gy)
    }
}

fn bfs(neighbours: &[Vec<usize>], source: usize) -> Vec<Option<usize>> {
    let mut hops = vec![None; neighbours.len()];
    hops[source] = Some(0);
    let mut queue = VecDeque::from([source]);

    while let Some(u) = queue.pop_front() {
        let next = hops[u].map_or(0, |h| h + 1);
        for &v in &neighbours[u] {
            if hops[v].is_none() {
                hops[v] = Some(next);
                queue.push_back(v);
            }
        }
    }

    hops
}
