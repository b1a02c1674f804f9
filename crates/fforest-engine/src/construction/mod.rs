//! Construct phase: build every tree of the forest with the external tree
//! builder, one process per tree, and dump its artifacts.
//!
//! Workers are bounded by a semaphore and joined with a full barrier. A
//! failed worker does not stop its siblings: it is logged and its artifacts
//! stay absent, which the reduction phase reports as a missing artifact.

pub mod artifacts;
pub mod invoke;
pub mod parser;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use fforest_types::{Dialect, RunState, TreeLayout};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::errors::PipelineError;
use crate::phase::{layout, parameters};
use invoke::TreeBuilderCommand;

/// Outcome of the construct phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstructionSummary {
    pub built: Vec<String>,
    pub failed: Vec<String>,
}

/// Everything a worker needs, shared between workers.
struct BuildContext {
    command: TreeBuilderCommand,
    reference: PathBuf,
    dialect: Dialect,
    norms: Vec<String>,
    classes: Vec<String>,
}

/// Remove the artifacts a previous run left for `tree`.
fn remove_stale_artifacts(tree: &TreeLayout) -> Result<(), PipelineError> {
    for path in tree
        .classification_vectors
        .values()
        .chain(tree.membership_tables.values())
    {
        match std::fs::remove_file(path) {
            Ok(()) => tracing::debug!(path = %path.display(), "Removed stale artifact"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(PipelineError::infrastructure(format!(
                    "Failed to remove stale artifact {}: {e}",
                    path.display()
                )))
            }
        }
    }
    Ok(())
}

fn dump_artifacts(
    context: &BuildContext,
    tree: &TreeLayout,
    output: &str,
) -> Result<(), PipelineError> {
    let table = parser::parse_tree_output(output, context.norms.len()).map_err(|reason| {
        PipelineError::MalformedTreeOutput {
            tree: tree.name.clone(),
            reason,
        }
    })?;

    for norm in &context.norms {
        let (Some(vector), Some(membership)) = (
            tree.classification_vectors.get(norm),
            tree.membership_tables.get(norm),
        ) else {
            return Err(PipelineError::infrastructure(format!(
                "no artifact path for norm '{norm}' in tree {}",
                tree.name
            )));
        };
        artifacts::write_classification_vector(vector, &context.dialect, &table, norm)?;
        artifacts::write_membership_table(
            membership,
            &context.dialect,
            &table,
            norm,
            &context.classes,
        )?;
    }

    tracing::info!(
        tree = tree.name,
        instances = table.len(),
        norms = context.norms.len(),
        directory = %tree.directory.display(),
        "Tree artifacts written"
    );
    Ok(())
}

async fn build_tree(context: Arc<BuildContext>, tree: TreeLayout) -> Result<(), PipelineError> {
    let output = context
        .command
        .run(&tree.name, &tree.table, &context.reference)
        .await?;
    tokio::task::spawn_blocking(move || dump_artifacts(&context, &tree, &output))
        .await
        .map_err(|e| PipelineError::infrastructure(format!("Artifact task panicked: {e}")))?
}

async fn collect_tree_results(
    mut join_set: JoinSet<(String, Result<(), PipelineError>)>,
) -> Result<ConstructionSummary, PipelineError> {
    let mut summary = ConstructionSummary::default();
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((tree, Ok(()))) => summary.built.push(tree),
            Ok((tree, Err(error))) => {
                tracing::error!(tree, error = %error, "Tree construction failed");
                summary.failed.push(tree);
            }
            Err(join_err) => {
                return Err(PipelineError::infrastructure(format!(
                    "Tree task panicked: {join_err}"
                )));
            }
        }
    }
    summary.built.sort();
    summary.failed.sort();
    Ok(summary)
}

/// Execute the construct phase.
///
/// # Errors
///
/// Returns infrastructure errors (stale artifacts that cannot be removed, a
/// panicked worker). Tree builder failures are logged, not returned.
pub async fn execute(state: &RunState) -> Result<ConstructionSummary, PipelineError> {
    let params = parameters(state)?;
    let layout = layout(state)?;

    for tree in &layout.trees {
        remove_stale_artifacts(tree)?;
    }

    let context = Arc::new(BuildContext {
        command: TreeBuilderCommand::new(params),
        reference: layout.reference_table.clone(),
        dialect: params.dialect_output.clone(),
        norms: state.norms.clone(),
        classes: state.possible_classes.clone(),
    });
    let parallelism = usize::try_from(params.parallelism.max(1)).unwrap_or(1);
    let semaphore = Arc::new(Semaphore::new(parallelism));

    tracing::info!(
        trees = layout.trees.len(),
        parallelism,
        builder = %params.tree_builder.display(),
        "Building forest"
    );

    let mut join_set = JoinSet::new();
    for tree in &layout.trees {
        let permit = semaphore.clone().acquire_owned().await.map_err(|e| {
            PipelineError::Infrastructure(anyhow::anyhow!("Semaphore closed: {e}"))
        })?;
        let context = context.clone();
        let tree = tree.clone();
        join_set.spawn(async move {
            let _permit = permit;
            let name = tree.name.clone();
            (name, build_tree(context, tree).await)
        });
    }

    let summary = collect_tree_results(join_set).await?;
    if summary.failed.is_empty() {
        tracing::info!(built = summary.built.len(), "Forest built");
    } else {
        tracing::warn!(
            built = summary.built.len(),
            failed = summary.failed.len(),
            "Forest built with failed trees; their artifacts are missing"
        );
    }
    Ok(summary)
}

/// Paths of every artifact the construct phase writes, in tree order.
#[must_use]
pub fn expected_artifacts(trees: &[TreeLayout]) -> Vec<&Path> {
    trees
        .iter()
        .flat_map(|tree| {
            tree.classification_vectors
                .values()
                .chain(tree.membership_tables.values())
                .map(PathBuf::as_path)
        })
        .collect()
}
