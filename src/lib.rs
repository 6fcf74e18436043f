pub use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

pub mod cluster;
pub mod error;
pub mod point;

pub use cluster::{
    Cluster, FixedSampler, KMeans, KMeansConfig, Phase, RandomSampler, Sampler, cluster_points,
};
pub use error::KMeansError;
pub use point::Point;

pub type Vector = Array1<f64>;
pub type Matrix = Array2<f64>;
