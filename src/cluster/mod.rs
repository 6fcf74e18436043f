//! K-means clustering of points in the plane.
//!
//! This module provides:
//! - `Cluster`: a centroid plus the points currently assigned to it
//! - `KMeans`: the engine that alternates nearest-centroid assignment and
//!   centroid recomputation until memberships stop changing
//! - `Sampler`: the strategy choosing the initial centroids
//!
//! # Examples
//!
//! ## Driving the engine point by point
//! ```rust
//! use kmeans2d::{FixedSampler, KMeans};
//!
//! let mut kmeans = KMeans::new(2).sampler(FixedSampler::new(vec![0, 3]));
//! for (x, y) in [(1.0, 1.0), (1.5, 2.0), (3.0, 4.0), (8.0, 8.0), (9.0, 7.5)] {
//!     kmeans.add_point(x, y).unwrap();
//! }
//!
//! let clusters = kmeans.run().unwrap();
//! for cluster in clusters {
//!     println!("{}", cluster);
//! }
//! assert_eq!(clusters[1].list_members(), vec!["(8, 8)", "(9, 7.5)"]);
//! ```
//!
//! ## Fitting a matrix
//! ```rust
//! use kmeans2d::KMeans;
//! use ndarray::array;
//!
//! let x = array![
//!     [1.0, 1.0],
//!     [1.5, 2.0],
//!     [3.0, 4.0],
//!     [5.0, 7.0],
//!     [3.5, 5.0],
//!     [4.5, 5.0]
//! ];
//!
//! let mut kmeans = KMeans::new(2).random_state(42).max_rounds(100);
//! kmeans.fit(&x).unwrap();
//!
//! let labels = kmeans.labels().unwrap();
//! assert_eq!(labels.len(), x.nrows());
//! println!("Inertia: {:.4}", kmeans.inertia().unwrap());
//! ```

mod centroid;
mod kmeans;
mod sampler;

pub use centroid::Cluster;
pub use kmeans::{KMeans, KMeansConfig, Phase, cluster_points};
pub use sampler::{FixedSampler, RandomSampler, Sampler};
