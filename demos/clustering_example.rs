use kmeans2d::{KMeans, KMeansConfig, Matrix};
use ndarray::{Axis, concatenate};
use ndarray_rand::RandomExt;
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand::rngs::StdRng;
use ndarray_rand::rand_distr::Uniform;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

const SAMPLE: [(f64, f64); 10] = [
    (1.0, 1.0),
    (9.4, 6.4),
    (2.5, 2.1),
    (8.0, 7.7),
    (0.5, 2.2),
    (7.9, 8.4),
    (7.0, 7.0),
    (2.8, 0.8),
    (1.2, 3.0),
    (7.8, 6.1),
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Usage: clustering_example [config.json] [--verbose]
    let args: Vec<String> = std::env::args().skip(1).collect();
    let verbose = args.iter().any(|a| a == "--verbose");

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match args.iter().find(|a| !a.starts_with("--")) {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => KMeansConfig::new(2),
    };

    println!("=== K-Means on the sample points (k={}) ===\n", config.k);

    let mut kmeans = KMeans::from_config(&config);
    for &(x, y) in &SAMPLE {
        kmeans.add_point(x, y)?;
    }

    let clusters = kmeans.run()?;
    for cluster in clusters {
        println!("{}\n", cluster);
    }
    println!("Converged after {} rounds", kmeans.rounds());
    println!("Inertia: {:.4}", kmeans.inertia()?);

    println!("\n=== K-Means on generated blobs ===\n");

    let mut rng = StdRng::seed_from_u64(7);
    let low = Matrix::random_using((15, 2), Uniform::new(0.0, 3.0), &mut rng);
    let high = Matrix::random_using((15, 2), Uniform::new(7.0, 10.0), &mut rng);
    let x = concatenate(Axis(0), &[low.view(), high.view()])?;

    let mut kmeans = KMeans::new(2).random_state(config.seed.unwrap_or(42));
    kmeans.fit(&x)?;

    for label in kmeans.centroid_labels() {
        println!("{}", label);
    }
    println!("Labels: {}", kmeans.labels()?);
    println!("Inertia: {:.4}", kmeans.inertia()?);

    Ok(())
}
