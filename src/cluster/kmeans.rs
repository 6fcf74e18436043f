use super::{Cluster, RandomSampler, Sampler};
use crate::{KMeansError, Matrix, Point, Vector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, trace, warn};

const DEFAULT_MAX_ROUNDS: usize = 300;

fn default_max_rounds() -> usize {
    DEFAULT_MAX_ROUNDS
}

/// Serializable settings for a [`KMeans`] run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KMeansConfig {
    pub k: usize,
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,
    /// Seed for the initial centroid sampling. `None` uses thread-local randomness.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl KMeansConfig {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_rounds: DEFAULT_MAX_ROUNDS,
            seed: None,
        }
    }
}

/// Where the engine is in the clustering loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Initialized,
    Assigning,
    Updating,
    Converged,
}

#[derive(Debug)]
pub struct KMeans {
    k: usize,
    max_rounds: usize,
    points: Vec<Point>,
    clusters: Vec<Cluster>,
    assignments: Vec<usize>,
    sampler: Box<dyn Sampler>,
    rounds: usize,
    phase: Phase,
}

impl KMeans {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_rounds: DEFAULT_MAX_ROUNDS,
            points: Vec::new(),
            clusters: Vec::new(),
            assignments: Vec::new(),
            sampler: Box::new(RandomSampler::thread()),
            rounds: 0,
            phase: Phase::Uninitialized,
        }
    }

    pub fn from_config(config: &KMeansConfig) -> Self {
        let kmeans = Self::new(config.k).max_rounds(config.max_rounds);
        match config.seed {
            Some(seed) => kmeans.random_state(seed),
            None => kmeans,
        }
    }

    pub fn max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn random_state(self, random_state: u64) -> Self {
        self.sampler(RandomSampler::seeded(random_state))
    }

    pub fn sampler(mut self, sampler: impl Sampler + 'static) -> Self {
        self.sampler = Box::new(sampler);
        self
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Number of assignment rounds executed since initialization.
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Adds a point to the data set. Any previous run is discarded.
    pub fn add_point(&mut self, x: f64, y: f64) -> Result<(), KMeansError> {
        let point = Point::new(x, y);
        if !point.is_finite() {
            return Err(KMeansError::NonFiniteCoordinate { x, y });
        }

        self.reset();
        self.points.push(point);
        Ok(())
    }

    pub fn add_points<I>(&mut self, points: I) -> Result<(), KMeansError>
    where
        I: IntoIterator<Item = Point>,
    {
        for point in points {
            self.add_point(point.x(), point.y())?;
        }
        Ok(())
    }

    /// Picks `k` distinct points as the initial centroids, one cluster per point.
    pub fn select_random_centroids(&mut self) -> Result<(), KMeansError> {
        self.validate()?;
        self.reset();

        let n_points = self.points.len();
        let indices = self.sampler.sample(n_points, self.k);

        if indices.len() != self.k {
            return Err(KMeansError::invalid(format!(
                "sampler returned {} indices, expected {}",
                indices.len(),
                self.k
            )));
        }
        if let Some(&idx) = indices.iter().find(|&&idx| idx >= n_points) {
            return Err(KMeansError::invalid(format!(
                "sampler returned index {} for {} points",
                idx, n_points
            )));
        }
        let unique: HashSet<usize> = indices.iter().copied().collect();
        if unique.len() != indices.len() {
            return Err(KMeansError::invalid("sampler returned duplicate indices"));
        }

        self.clusters = indices
            .iter()
            .enumerate()
            .map(|(id, &idx)| Cluster::new(id, self.points[idx]))
            .collect();
        self.assignments = vec![0; n_points];
        self.phase = Phase::Initialized;

        debug!(k = self.k, ?indices, centroids = ?self.centroid_labels(), "selected initial centroids");
        Ok(())
    }

    /// Runs one round: reassign every point and, unless memberships are unchanged,
    /// move the centroids. Returns `true` once converged.
    pub fn step(&mut self) -> Result<bool, KMeansError> {
        match self.phase {
            Phase::Uninitialized => return Err(KMeansError::NotFitted),
            Phase::Converged => return Ok(true),
            _ => {}
        }

        self.phase = Phase::Assigning;
        self.rounds += 1;
        debug!(round = self.rounds, centroids = ?self.centroid_labels(), "starting round");

        let before = self.membership_snapshot();
        for cluster in &mut self.clusters {
            cluster.clear_members();
        }
        self.assign_points();
        let after = self.membership_snapshot();

        debug!(round = self.rounds, ?before, ?after, "assigned points");

        if memberships_match(&before, &after) {
            self.phase = Phase::Converged;
            info!(rounds = self.rounds, "k-means converged");
            return Ok(true);
        }

        self.phase = Phase::Updating;
        for cluster in &mut self.clusters {
            if cluster.is_empty() {
                warn!(
                    round = self.rounds,
                    cluster = cluster.id(),
                    "cluster has no members, keeping its centroid"
                );
            }
            cluster.recompute_centroid();
        }

        Ok(false)
    }

    /// Initializes the clusters and iterates until memberships stop changing.
    pub fn run(&mut self) -> Result<&[Cluster], KMeansError> {
        self.select_random_centroids()?;

        while self.rounds < self.max_rounds {
            if self.step()? {
                return Ok(&self.clusters);
            }
        }

        warn!(rounds = self.rounds, "k-means stopped before converging");
        Err(KMeansError::NonConvergence {
            rounds: self.rounds,
        })
    }

    /// Replaces the point set with the rows of an `n x 2` matrix and runs.
    pub fn fit(&mut self, x: &Matrix) -> Result<&[Cluster], KMeansError> {
        check_columns(x)?;

        let points: Vec<Point> = x.rows().into_iter().map(Point::from_row).collect();
        if let Some(bad) = points.iter().find(|p| !p.is_finite()) {
            return Err(KMeansError::NonFiniteCoordinate {
                x: bad.x(),
                y: bad.y(),
            });
        }

        self.reset();
        self.points = points;
        self.run()
    }

    /// Index of the cluster holding each point, in point order.
    pub fn labels(&self) -> Result<Vector, KMeansError> {
        self.ensure_converged()?;
        Ok(self.assignments.iter().map(|&c| c as f64).collect())
    }

    pub fn predict(&self, x: &Matrix) -> Result<Vector, KMeansError> {
        self.ensure_converged()?;
        check_columns(x)?;

        Ok(x
            .rows()
            .into_iter()
            .map(|row| nearest_cluster(&self.clusters, &Point::from_row(row)) as f64)
            .collect())
    }

    /// Distance from every row of `x` to every centroid.
    pub fn transform(&self, x: &Matrix) -> Result<Matrix, KMeansError> {
        self.ensure_converged()?;
        check_columns(x)?;

        let mut distances = Matrix::zeros((x.nrows(), self.clusters.len()));
        for (i, row) in x.rows().into_iter().enumerate() {
            let point = Point::from_row(row);
            for (k, cluster) in self.clusters.iter().enumerate() {
                distances[[i, k]] = cluster.distance_to(&point);
            }
        }

        Ok(distances)
    }

    /// Within-cluster sum of squared distances.
    pub fn inertia(&self) -> Result<f64, KMeansError> {
        self.ensure_converged()?;

        Ok(self
            .clusters
            .iter()
            .flat_map(|cluster| {
                cluster.members().iter().map(move |p| {
                    let d = cluster.distance_to(p);
                    d * d
                })
            })
            .sum())
    }

    pub fn membership_snapshot(&self) -> Vec<Vec<String>> {
        self.clusters.iter().map(Cluster::list_members).collect()
    }

    pub fn centroid_labels(&self) -> Vec<String> {
        self.clusters.iter().map(Cluster::centroid_label).collect()
    }

    fn assign_points(&mut self) {
        for (i, point) in self.points.iter().enumerate() {
            let nearest = nearest_cluster(&self.clusters, point);
            trace!(point = %point, cluster = nearest, "assigned point");
            self.clusters[nearest].add_member(*point);
            self.assignments[i] = nearest;
        }
    }

    fn validate(&self) -> Result<(), KMeansError> {
        if self.k == 0 {
            return Err(KMeansError::invalid("k must be > 0"));
        }
        if self.max_rounds == 0 {
            return Err(KMeansError::invalid("max_rounds must be > 0"));
        }
        if self.points.len() < self.k {
            return Err(KMeansError::InsufficientPoints {
                k: self.k,
                available: self.points.len(),
            });
        }
        Ok(())
    }

    fn ensure_converged(&self) -> Result<(), KMeansError> {
        if self.phase == Phase::Converged {
            Ok(())
        } else {
            Err(KMeansError::NotFitted)
        }
    }

    fn reset(&mut self) {
        self.clusters.clear();
        self.assignments.clear();
        self.rounds = 0;
        self.phase = Phase::Uninitialized;
    }
}

/// Clusters `points` into `k` groups and returns the final clusters.
pub fn cluster_points(
    points: &[Point],
    k: usize,
    sampler: impl Sampler + 'static,
) -> Result<Vec<Cluster>, KMeansError> {
    let mut kmeans = KMeans::new(k).sampler(sampler);
    kmeans.add_points(points.iter().copied())?;
    Ok(kmeans.run()?.to_vec())
}

// First cluster wins on ties.
fn nearest_cluster(clusters: &[Cluster], point: &Point) -> usize {
    let mut min_distance = f64::INFINITY;
    let mut closest_cluster = 0;

    for (k, cluster) in clusters.iter().enumerate() {
        let distance = cluster.distance_to(point);
        if distance < min_distance {
            min_distance = distance;
            closest_cluster = k;
        }
    }

    closest_cluster
}

/// Compares memberships as multisets, so a relabelling of clusters between rounds
/// counts as no change.
fn memberships_match(before: &[Vec<String>], after: &[Vec<String>]) -> bool {
    if before.len() != after.len() {
        return false;
    }

    let mut before = before.to_vec();
    let mut after = after.to_vec();
    before.sort();
    after.sort();
    before == after
}

fn check_columns(x: &Matrix) -> Result<(), KMeansError> {
    if x.ncols() != 2 {
        return Err(KMeansError::DimensionMismatch {
            expected: 2,
            found: x.ncols(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FixedSampler;
    use ndarray::array;

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

    fn sample_kmeans(k: usize) -> KMeans {
        let mut kmeans = KMeans::new(k);
        for &(x, y) in &SAMPLE {
            kmeans.add_point(x, y).unwrap();
        }
        kmeans
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_kmeans_separated_start() {
        let mut kmeans = sample_kmeans(2).sampler(FixedSampler::new(vec![0, 1]));
        let clusters = kmeans.run().unwrap();

        assert_eq!(clusters.len(), 2);
        assert_eq!(
            clusters[0].list_members(),
            strings(&["(1, 1)", "(2.5, 2.1)", "(0.5, 2.2)", "(2.8, 0.8)", "(1.2, 3)"])
        );
        assert_eq!(
            clusters[1].list_members(),
            strings(&["(9.4, 6.4)", "(8, 7.7)", "(7.9, 8.4)", "(7, 7)", "(7.8, 6.1)"])
        );

        let low = clusters[0].centroid();
        assert!((low.x() - 1.6).abs() < 1e-10);
        assert!((low.y() - 1.82).abs() < 1e-10);
        let high = clusters[1].centroid();
        assert!((high.x() - 8.02).abs() < 1e-10);
        assert!((high.y() - 7.12).abs() < 1e-10);

        assert_eq!(kmeans.rounds(), 2);
        assert_eq!(kmeans.phase(), Phase::Converged);
    }

    #[test]
    fn test_kmeans_terminates_from_any_seed() {
        for seed in 0..20 {
            let mut kmeans = sample_kmeans(2).random_state(seed).max_rounds(50);
            let clusters = kmeans.run().unwrap();

            let total: usize = clusters.iter().map(Cluster::len).sum();
            assert_eq!(total, SAMPLE.len());
        }
    }

    #[test]
    fn test_kmeans_seeded_is_deterministic() {
        let mut a = sample_kmeans(3).random_state(11);
        let mut b = sample_kmeans(3).random_state(11);
        assert_eq!(a.run().unwrap(), b.run().unwrap());
    }

    #[test]
    fn test_kmeans_labels_and_inertia() {
        let mut kmeans = sample_kmeans(2).sampler(FixedSampler::new(vec![0, 1]));
        kmeans.run().unwrap();

        let labels = kmeans.labels().unwrap();
        assert_eq!(
            labels,
            array![0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0]
        );

        let expected: f64 = kmeans
            .clusters()
            .iter()
            .flat_map(|c| c.members().iter().map(move |p| c.distance_to(p).powi(2)))
            .sum();
        assert!((kmeans.inertia().unwrap() - expected).abs() < 1e-10);
        assert!(kmeans.inertia().unwrap() > 0.0);
    }

    #[test]
    fn test_kmeans_k_equals_points() {
        let mut kmeans = KMeans::new(3).sampler(FixedSampler::new(vec![2, 0, 1]));
        kmeans.add_point(0.0, 0.0).unwrap();
        kmeans.add_point(5.0, 5.0).unwrap();
        kmeans.add_point(10.0, 0.0).unwrap();

        let clusters = kmeans.run().unwrap();
        assert!(clusters.iter().all(|c| c.len() == 1));
        assert_eq!(clusters[0].list_members(), strings(&["(10, 0)"]));
        assert_eq!(kmeans.rounds(), 2);
    }

    #[test]
    fn test_kmeans_insufficient_points() {
        let mut kmeans = KMeans::new(3);
        kmeans.add_point(1.0, 2.0).unwrap();
        kmeans.add_point(3.0, 4.0).unwrap();

        assert_eq!(
            kmeans.run().unwrap_err(),
            KMeansError::InsufficientPoints { k: 3, available: 2 }
        );
    }

    #[test]
    fn test_kmeans_zero_clusters() {
        let mut kmeans = sample_kmeans(0);
        assert!(matches!(
            kmeans.run(),
            Err(KMeansError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_kmeans_rejects_non_finite() {
        let mut kmeans = KMeans::new(1);
        assert!(matches!(
            kmeans.add_point(f64::NAN, 1.0),
            Err(KMeansError::NonFiniteCoordinate { .. })
        ));
        assert!(kmeans.points().is_empty());
    }

    #[test]
    fn test_kmeans_round_cap() {
        let mut kmeans = sample_kmeans(2).max_rounds(1);
        assert_eq!(
            kmeans.run().unwrap_err(),
            KMeansError::NonConvergence { rounds: 1 }
        );
        assert!(kmeans.labels().is_err());
    }

    #[test]
    fn test_kmeans_bad_sampler() {
        let mut kmeans = sample_kmeans(2).sampler(FixedSampler::new(vec![4, 4]));
        assert!(matches!(
            kmeans.run(),
            Err(KMeansError::InvalidConfiguration { .. })
        ));

        let mut kmeans = sample_kmeans(2).sampler(FixedSampler::new(vec![0, 42]));
        assert!(matches!(
            kmeans.run(),
            Err(KMeansError::InvalidConfiguration { .. })
        ));

        let mut kmeans = sample_kmeans(2).sampler(FixedSampler::new(vec![0]));
        assert!(matches!(
            kmeans.run(),
            Err(KMeansError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_step_keeps_empty_cluster_centroid() {
        let mut kmeans = KMeans::new(2).sampler(FixedSampler::new(vec![0, 1]));
        kmeans
            .add_points([Point::new(1.0, 1.0), Point::new(1.0, 1.0), Point::new(5.0, 5.0)])
            .unwrap();

        assert_eq!(kmeans.step(), Err(KMeansError::NotFitted));
        kmeans.select_random_centroids().unwrap();
        assert_eq!(kmeans.phase(), Phase::Initialized);

        // Both centroids coincide, so every tie goes to cluster 0.
        assert!(!kmeans.step().unwrap());
        assert_eq!(kmeans.clusters()[0].len(), 3);
        assert!(kmeans.clusters()[1].is_empty());
        assert_eq!(kmeans.clusters()[1].centroid(), Point::new(1.0, 1.0));
        assert_eq!(kmeans.phase(), Phase::Updating);

        while !kmeans.step().unwrap() {}
        assert_eq!(kmeans.rounds(), 3);
        assert_eq!(
            kmeans.membership_snapshot(),
            vec![strings(&["(5, 5)"]), strings(&["(1, 1)", "(1, 1)"])]
        );
    }

    #[test]
    fn test_memberships_match_ignores_cluster_order() {
        let a = vec![strings(&["(1, 1)"]), strings(&["(2, 2)", "(3, 3)"])];
        let b = vec![strings(&["(2, 2)", "(3, 3)"]), strings(&["(1, 1)"])];
        assert!(memberships_match(&a, &b));

        let c = vec![strings(&["(1, 1)", "(2, 2)"]), strings(&["(3, 3)"])];
        assert!(!memberships_match(&a, &c));

        let empty = vec![Vec::new(), Vec::new()];
        assert!(!memberships_match(&empty, &a));
    }

    #[test]
    fn test_nearest_cluster_tie_goes_first() {
        let clusters = vec![
            Cluster::new(0, Point::new(0.0, 0.0)),
            Cluster::new(1, Point::new(2.0, 0.0)),
        ];
        assert_eq!(nearest_cluster(&clusters, &Point::new(1.0, 0.0)), 0);
        assert_eq!(nearest_cluster(&clusters, &Point::new(1.5, 0.0)), 1);
    }

    #[test]
    fn test_kmeans_fit_predict_transform() {
        let x = array![[0.0, 0.0], [1.0, 1.0], [10.0, 10.0], [11.0, 11.0]];

        let mut kmeans = KMeans::new(2).sampler(FixedSampler::new(vec![0, 2]));
        kmeans.fit(&x).unwrap();
        assert_eq!(kmeans.labels().unwrap(), array![0.0, 0.0, 1.0, 1.0]);

        let x_test = array![[0.5, 0.5], [10.5, 10.5]];
        assert_eq!(kmeans.predict(&x_test).unwrap(), array![0.0, 1.0]);

        let distances = kmeans.transform(&x_test).unwrap();
        assert_eq!(distances.shape(), &[2, 2]);
        assert!(distances.iter().all(|&d| d >= 0.0));
        assert!(distances[[0, 0]] < 1e-10);
    }

    #[test]
    fn test_kmeans_predict_without_fit() {
        let x = array![[1.0, 2.0], [3.0, 4.0]];
        let kmeans = KMeans::new(2);
        assert_eq!(kmeans.predict(&x), Err(KMeansError::NotFitted));
    }

    #[test]
    fn test_kmeans_dimension_mismatch() {
        let x = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let mut kmeans = KMeans::new(2);
        assert_eq!(
            kmeans.fit(&x).unwrap_err(),
            KMeansError::DimensionMismatch {
                expected: 2,
                found: 3
            }
        );
    }

    #[test]
    fn test_config_builds_engine() {
        let config = KMeansConfig {
            k: 2,
            max_rounds: 7,
            seed: Some(3),
        };
        let kmeans = KMeans::from_config(&config);
        assert_eq!(kmeans.k(), 2);
        assert_eq!(kmeans.max_rounds, 7);
        assert_eq!(KMeansConfig::new(4).max_rounds, DEFAULT_MAX_ROUNDS);
    }

    #[test]
    fn test_cluster_points_entry_point() {
        let points: Vec<Point> = SAMPLE.iter().copied().map(Point::from).collect();
        let clusters = cluster_points(&points, 2, FixedSampler::new(vec![0, 1])).unwrap();
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].len(), 5);
        assert_eq!(clusters[1].len(), 5);
    }
}
