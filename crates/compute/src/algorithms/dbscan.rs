use std::collections::VecDeque;

use fraudlens_core::FeatureMatrix;

/// Result of DBSCAN clustering.
#[derive(Debug, Clone)]
pub struct DbscanResult {
    /// Cluster label per row; `None` marks noise.
    pub labels: Vec<Option<usize>>,
    /// Total number of clusters found.
    pub num_clusters: usize,
}

impl DbscanResult {
    /// Number of members in each cluster, indexed by cluster label.
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0usize; self.num_clusters];
        for label in self.labels.iter().flatten() {
            sizes[*label] += 1;
        }
        sizes
    }

    pub fn noise_count(&self) -> usize {
        self.labels.iter().filter(|l| l.is_none()).count()
    }
}

/// Run DBSCAN density-based clustering over the rows of `points`.
///
/// # Arguments
/// * `points`: one row per point
/// * `eps`: neighborhood radius (Euclidean distance)
/// * `min_pts`: minimum number of neighbors (including the point itself) to form a core point
///
/// Neighbor lists are computed up front, so time is O(n²) and memory grows
/// with the number of neighbor pairs. Sized for scoring batches of a few
/// thousand rows; larger batches will exceed the processing target.
pub fn dbscan(points: &FeatureMatrix, eps: f64, min_pts: usize) -> DbscanResult {
    let n = points.rows();
    if n == 0 {
        return DbscanResult {
            labels: Vec::new(),
            num_clusters: 0,
        };
    }

    let eps_sq = eps * eps;

    // Pre-compute pairwise neighbor lists to avoid redundant distance calculations.
    let neighbors: Vec<Vec<usize>> = (0..n)
        .map(|i| {
            let row_i = points.row(i);
            (0..n)
                .filter(|&j| squared_euclidean(row_i, points.row(j)) <= eps_sq)
                .collect()
        })
        .collect();

    let mut labels: Vec<Option<usize>> = vec![None; n];
    let mut visited = vec![false; n];
    let mut current_cluster = 0usize;

    for i in 0..n {
        if visited[i] {
            continue;
        }
        visited[i] = true;

        if neighbors[i].len() < min_pts {
            // Not a core point; tentatively noise (may be claimed by a cluster later).
            continue;
        }

        labels[i] = Some(current_cluster);

        let mut queue: VecDeque<usize> = neighbors[i]
            .iter()
            .copied()
            .filter(|&j| j != i)
            .collect();

        while let Some(j) = queue.pop_front() {
            if labels[j].is_none() {
                labels[j] = Some(current_cluster);
            }

            if visited[j] {
                continue;
            }
            visited[j] = true;

            if neighbors[j].len() >= min_pts {
                for &nb in &neighbors[j] {
                    if labels[nb].is_none() {
                        queue.push_back(nb);
                    }
                }
            }
        }

        current_cluster += 1;
    }

    DbscanResult {
        labels,
        num_clusters: current_cluster,
    }
}

#[inline]
fn squared_euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
