//! ClusterTrees phase: label every tree of the forest high or low quality.
//!
//! With the `hypersphere` method each tree is a point with one coordinate
//! per class: the mean membership the tree gave that class over the
//! reference instances that truly belong to it. Trees inside the sphere
//! centered on the ideal point (every coordinate 1.0) are high quality.

use csv::StringRecord;
use fforest_types::{ClusteringTreesMethod, RunState};

use crate::construction::artifacts::{format_float, StoredMembershipTable};
use crate::errors::PipelineError;
use crate::phase::{layout, parameters};
use crate::reduction::{forest_memberships, require_forest_artifacts};
use crate::table;

pub const KEY_ID_TREE: &str = "ID_tree";
pub const KEY_ID_CLUSTER: &str = "ID_cluster";
pub const KEY_DISTANCE: &str = "distance";

/// Cluster of a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeQuality {
    Low = 0,
    High = 1,
}

/// An n-sphere under the Euclidean norm.
#[derive(Debug, Clone, PartialEq)]
pub struct HyperSphere {
    pub center: Vec<f64>,
    pub radius: f64,
}

impl HyperSphere {
    #[must_use]
    pub fn distance_to(&self, point: &[f64]) -> f64 {
        self.center
            .iter()
            .zip(point)
            .map(|(c, p)| (p - c).powi(2))
            .sum::<f64>()
            .sqrt()
    }

    /// Whether `point` lies inside the sphere or on its surface.
    #[must_use]
    pub fn contains(&self, point: &[f64]) -> bool {
        self.distance_to(point) <= self.radius
    }
}

/// Membership the tree gave each class over the instances of that class.
/// Classes with no reference instance are left out.
#[must_use]
pub fn tree_point(memberships: &StoredMembershipTable, classes: &[String]) -> Vec<f64> {
    classes
        .iter()
        .filter_map(|class| {
            let degrees: Vec<f64> = memberships
                .rows
                .iter()
                .filter(|row| row.true_class == *class)
                .map(|row| memberships.degree(row, class))
                .collect();
            if degrees.is_empty() {
                return None;
            }
            let count = f64::from(u32::try_from(degrees.len()).unwrap_or(u32::MAX));
            Some(degrees.iter().sum::<f64>() / count)
        })
        .collect()
}

/// One cluster assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeCluster {
    pub tree: String,
    pub quality: TreeQuality,
    pub distance: f64,
}

/// Cluster every tree of `forest` with a hypersphere of radius
/// `threshold × √dimension` around the ideal point.
#[must_use]
pub fn hypersphere(
    forest: &[(String, StoredMembershipTable)],
    classes: &[String],
    threshold: f64,
) -> Vec<TreeCluster> {
    forest
        .iter()
        .map(|(tree, memberships)| {
            let point = tree_point(memberships, classes);
            let dimension = f64::from(u32::try_from(point.len()).unwrap_or(u32::MAX));
            let sphere = HyperSphere {
                center: vec![1.0; point.len()],
                radius: threshold * dimension.sqrt(),
            };
            let distance = sphere.distance_to(&point);
            let quality = if sphere.contains(&point) {
                TreeQuality::High
            } else {
                TreeQuality::Low
            };
            TreeCluster {
                tree: tree.clone(),
                quality,
                distance,
            }
        })
        .collect()
}

/// Execute the cluster trees phase.
///
/// # Errors
///
/// Returns [`PipelineError::MissingArtifact`] when a tree artifact is
/// missing, and I/O failures.
pub fn execute(state: &RunState) -> Result<(), PipelineError> {
    let params = parameters(state)?;
    let layout = layout(state)?;
    require_forest_artifacts(layout)?;

    let header = StringRecord::from(vec![KEY_ID_TREE, KEY_ID_CLUSTER, KEY_DISTANCE]);
    for norm in &state.norms {
        let forest = forest_memberships(layout, &params.dialect_output, norm)?;
        let clusters = match params.clustering_trees_method {
            ClusteringTreesMethod::Hypersphere => {
                hypersphere(&forest, &state.possible_classes, params.quality_threshold)
            }
        };
        let path = layout.cluster_files.get(norm).ok_or_else(|| {
            PipelineError::infrastructure(format!("no cluster file path for norm '{norm}'"))
        })?;
        let rows = clusters.iter().map(|cluster| {
            [
                cluster.tree.clone(),
                (cluster.quality as u8).to_string(),
                format_float(cluster.distance),
            ]
        });
        table::write_table(path, &params.dialect_output, Some(&header), rows)?;

        let high = clusters
            .iter()
            .filter(|cluster| cluster.quality == TreeQuality::High)
            .count();
        tracing::info!(
            norm,
            method = %params.clustering_trees_method,
            high_quality = high,
            low_quality = clusters.len() - high,
            path = %path.display(),
            "Trees clustered"
        );
    }
    Ok(())
}
