use rand::{rngs::SmallRng, SeedableRng};
use socnet::{
    centrality::Index,
    config::{AdjacencyOptions, LayoutConfig, TraversalConfig},
    generators::{Mode, SmallWorld},
    layout::ForceModel,
    Graph, Result,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    // A star: one hub tied to five leaves.
    let mut graph = Graph::new();
    graph.set_undirected();
    let hub = graph.add_vertex();
    let leaves: Vec<_> = (0..5).map(|_| graph.add_vertex()).collect();
    graph.add_star(hub, &leaves)?;

    let config = TraversalConfig::default();
    println!("density: {:.3}", graph.density());
    println!("diameter: {}", graph.diameter(config)?);

    for index in [Index::Degree, Index::Closeness, Index::Betweenness, Index::Eigenvector] {
        let prominence = graph.prominence(index, config)?;
        println!("\n{index:?}");
        for score in prominence.scores() {
            println!("  {:>3}: {:?}", score.id, score.std);
        }
        if let Some(centralization) = prominence.stats().centralization {
            println!("  centralization: {centralization:.3}");
        }
    }

    println!("\nadjacency\n{}", graph.adjacency_matrix(AdjacencyOptions::default()));
    println!("distances\n{}", graph.distance_matrix(config)?);

    // Removing the hub leaves five isolates.
    graph.remove_vertex(hub)?;
    println!("after removing the hub: {} isolates", graph.isolated_vertices().len());

    // A small world, laid out on the canvas.
    let mut rng = SmallRng::seed_from_u64(2024);
    let params = SmallWorld {
        vertices: 20,
        degree: 4,
        beta: 0.2,
        mode: Mode::Undirected,
    };
    graph.small_world(&params, &mut rng)?;
    graph.layout_force_directed(ForceModel::KamadaKawai, LayoutConfig::default(), &mut rng)?;

    println!("\nsmall world: {} edges", graph.edge_count());
    println!("average clustering: {:?}", graph.average_clustering_coefficient());
    println!("average distance: {:?}", graph.average_distance(config)?);
    println!("triad census: {:?}", graph.triad_census().counts());

    Ok(())
}
