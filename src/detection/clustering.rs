//! Incremental single-pass clustering of 3D flows.
//!
//! Two flows are "similar" when their start points are close, their lengths
//! agree, and their directions agree. A flow joins a cluster if it is similar
//! to any member. When a flow bridges several clusters they are merged, so
//! the final partition is the connected components of the similarity graph
//! regardless of insertion order.

use super::Flow3D;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterThresholds {
    /// Max distance (m) between start points.
    pub start_diff: f64,
    /// Max difference (m) between flow lengths.
    pub length_diff: f64,
    /// Max angle (rad) between directions.
    pub radian_diff: f64,
}

impl ClusterThresholds {
    pub fn is_similar(&self, a: &Flow3D, b: &Flow3D) -> bool {
        (a.start - b.start).norm() <= self.start_diff
            && (a.length() - b.length()).abs() <= self.length_diff
            && a.radian_to(b) <= self.radian_diff
    }
}

/// Flows believed to share one rigid motion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cluster {
    pub flows: Vec<Flow3D>,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    fn accepts(&self, flow: &Flow3D, thresholds: &ClusterThresholds) -> bool {
        self.flows.iter().any(|m| thresholds.is_similar(flow, m))
    }
}

pub struct IncrementalClusterer {
    thresholds: ClusterThresholds,
    clusters: Vec<Cluster>,
}

impl IncrementalClusterer {
    pub fn new(thresholds: ClusterThresholds) -> Self {
        Self {
            thresholds,
            clusters: Vec::new(),
        }
    }

    pub fn num_clusters(&self) -> usize {
        self.clusters.len()
    }

    pub fn insert(&mut self, flow: Flow3D) {
        let mut target: Option<usize> = None;
        let mut i = 0;
        while i < self.clusters.len() {
            if !self.clusters[i].accepts(&flow, &self.thresholds) {
                i += 1;
                continue;
            }
            match target {
                None => {
                    self.clusters[i].flows.push(flow);
                    target = Some(i);
                    i += 1;
                }
                Some(t) => {
                    // t < i always, so removing i leaves t in place
                    let merged = self.clusters.remove(i);
                    self.clusters[t].flows.extend(merged.flows);
                }
            }
        }

        if target.is_none() {
            self.clusters.push(Cluster { flows: vec![flow] });
        }
    }

    /// Drop clusters smaller than `min_size`. The index of a surviving
    /// cluster in the returned list is its label.
    pub fn finish(self, min_size: usize) -> Vec<Cluster> {
        self.clusters
            .into_iter()
            .filter(|c| c.len() >= min_size)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Point2, Vector3};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;

    fn thresholds() -> ClusterThresholds {
        ClusterThresholds {
            start_diff: 0.10,
            length_diff: 0.10,
            radian_diff: 0.17,
        }
    }

    fn flow(start: [f64; 3], motion: [f64; 3]) -> Flow3D {
        let start = Vector3::from(start);
        Flow3D::new(
            start,
            start + Vector3::from(motion),
            Point2::origin(),
            Point2::origin(),
        )
    }

    /// Sort members so partitions can be compared independent of order.
    fn canonical(clusters: &[Cluster]) -> Vec<Vec<[i64; 3]>> {
        let key = |f: &Flow3D| {
            [
                (f.start.x * 1e6).round() as i64,
                (f.start.y * 1e6).round() as i64,
                (f.start.z * 1e6).round() as i64,
            ]
        };
        let mut out: Vec<Vec<[i64; 3]>> = clusters
            .iter()
            .map(|c| {
                let mut keys: Vec<_> = c.flows.iter().map(key).collect();
                keys.sort();
                keys
            })
            .collect();
        out.sort();
        out
    }

    #[test]
    fn test_similar_flows_share_cluster() {
        // start 0.02 apart, lengths 0.30 vs 0.31, ~0.05 rad apart
        let a = flow([0.0, 0.0, 2.0], [0.30, 0.0, 0.0]);
        let b = flow([0.02, 0.0, 2.0], [0.31 * 0.05f64.cos(), 0.31 * 0.05f64.sin(), 0.0]);

        assert!(thresholds().is_similar(&a, &b));

        let mut clusterer = IncrementalClusterer::new(thresholds());
        clusterer.insert(a);
        clusterer.insert(b);
        let clusters = clusterer.finish(1);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 2);
    }

    #[test]
    fn test_dissimilar_direction_splits() {
        let a = flow([0.0, 0.0, 2.0], [0.3, 0.0, 0.0]);
        let b = flow([0.0, 0.0, 2.0], [0.0, 0.3, 0.0]);

        let mut clusterer = IncrementalClusterer::new(thresholds());
        clusterer.insert(a);
        clusterer.insert(b);
        assert_eq!(clusterer.num_clusters(), 2);
    }

    #[test]
    fn test_bridging_flow_merges_clusters() {
        // a and c are 0.16 apart; b sits between them
        let a = flow([0.00, 0.0, 2.0], [0.3, 0.0, 0.0]);
        let c = flow([0.16, 0.0, 2.0], [0.3, 0.0, 0.0]);
        let b = flow([0.08, 0.0, 2.0], [0.3, 0.0, 0.0]);
        assert!(!thresholds().is_similar(&a, &c));

        let mut clusterer = IncrementalClusterer::new(thresholds());
        clusterer.insert(a);
        clusterer.insert(c);
        assert_eq!(clusterer.num_clusters(), 2);

        clusterer.insert(b);
        let clusters = clusterer.finish(1);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 3);
    }

    #[test]
    fn test_merge_keeps_scanning_after_removal() {
        // Three clusters on a circle of radius 0.09 are pairwise 0.156 apart;
        // a flow at the center bridges all of them
        let mut clusterer = IncrementalClusterer::new(thresholds());
        clusterer.insert(flow([-3.0, 0.0, 2.0], [0.3, 0.0, 0.0]));
        for k in 0..3 {
            let phi = k as f64 * 2.0 * std::f64::consts::PI / 3.0;
            clusterer.insert(flow([0.09 * phi.cos(), 0.09 * phi.sin(), 2.0], [0.3, 0.0, 0.0]));
        }
        clusterer.insert(flow([3.0, 0.0, 2.0], [0.3, 0.0, 0.0]));
        assert_eq!(clusterer.num_clusters(), 5);

        clusterer.insert(flow([0.0, 0.0, 2.0], [0.3, 0.0, 0.0]));

        let clusters = clusterer.finish(1);
        let sizes: Vec<usize> = clusters.iter().map(Cluster::len).collect();
        assert_eq!(sizes, vec![1, 4, 1]);
        assert!((clusters[2].flows[0].start.x - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_partition_independent_of_order() {
        let mut flows = Vec::new();
        // Chain of 8 along x, a separate blob, and a fast mover at the same place
        for i in 0..8 {
            flows.push(flow([i as f64 * 0.07, 0.0, 2.0], [0.2, 0.0, 0.0]));
        }
        for i in 0..5 {
            flows.push(flow([3.0, i as f64 * 0.05, 1.0], [0.0, 0.0, -0.4]));
        }
        for i in 0..3 {
            flows.push(flow([i as f64 * 0.07, 0.0, 2.0], [0.0, 0.0, 0.9]));
        }

        let mut reference = IncrementalClusterer::new(thresholds());
        for f in &flows {
            reference.insert(*f);
        }
        let expected = canonical(&reference.finish(1));
        assert_eq!(expected.len(), 3);

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            flows.shuffle(&mut rng);
            let mut clusterer = IncrementalClusterer::new(thresholds());
            for f in &flows {
                clusterer.insert(*f);
            }
            assert_eq!(canonical(&clusterer.finish(1)), expected);
        }
    }

    #[test]
    fn test_undersized_clusters_dropped() {
        let mut clusterer = IncrementalClusterer::new(thresholds());
        for i in 0..4 {
            clusterer.insert(flow([i as f64 * 0.05, 0.0, 2.0], [0.3, 0.0, 0.0]));
        }
        clusterer.insert(flow([5.0, 0.0, 2.0], [0.3, 0.0, 0.0]));

        let clusters = clusterer.finish(3);
        assert_eq!(clusters.len(), 1);
        assert!(clusters.iter().all(|c| c.len() >= 3));
    }
}
