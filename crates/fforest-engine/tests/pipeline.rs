//! End-to-end runs of the experiment pipeline against a stand-in tree
//! builder.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Once;

use fforest_engine::{parse_experiment, run_experiment, ExperimentConfig, PipelineError, RunOptions};
use fforest_state::{JsonFileSnapshotStore, SnapshotStore};
use fforest_types::Phase;

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../tests/fixtures")
}

static BUILDER_VARIABLE: Once = Once::new();

/// Point `FFOREST_TREE_BUILDER` at the fixture script once per test binary,
/// so the fixture configuration resolves while tests run concurrently.
fn set_builder_variable() {
    BUILDER_VARIABLE.call_once(|| {
        std::env::set_var("FFOREST_TREE_BUILDER", fixtures().join("fake_builder.sh"));
    });
}

struct Workspace {
    dir: tempfile::TempDir,
    config: ExperimentConfig,
    database: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let builder = install_script(dir.path(), "builder.sh", &fixtures().join("fake_builder.sh"));
        set_builder_variable();
        let mut config = parse_experiment(&fixtures().join("experiment.yaml")).unwrap();
        config.forest.tree_builder = builder;
        let database = dir.path().join("flowers.csv");
        std::fs::copy(fixtures().join("flowers.csv"), &database).unwrap();
        Self {
            dir,
            config,
            database,
        }
    }

    fn options(&self) -> RunOptions {
        RunOptions {
            parent_dir: self.dir.path().to_path_buf(),
            ..RunOptions::new(&self.database)
        }
    }

    fn main_directory(&self) -> PathBuf {
        self.dir.path().join("flowers")
    }

    fn snapshot(&self) -> JsonFileSnapshotStore {
        JsonFileSnapshotStore::in_directory(&self.main_directory())
    }
}

fn install_script(dir: &Path, name: &str, source: &Path) -> PathBuf {
    let path = dir.join(name);
    std::fs::copy(source, &path).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_else(|e| panic!("{}: {e}", path.display()))
}

#[tokio::test]
async fn full_run_writes_every_artifact() {
    let ws = Workspace::new();

    let outcome = run_experiment(&ws.config, &ws.options()).await.unwrap();

    assert_eq!(outcome.executed, Phase::ALL.to_vec());
    let stats = &outcome.statistics;
    assert_eq!(stats.original_rows, Some(40));
    assert_eq!((stats.train_rows, stats.test_rows), (Some(30), Some(10)));
    assert_eq!((stats.reference_rows, stats.subtrain_rows), (Some(6), Some(24)));
    assert_eq!(
        stats.subsubtrain_rows.values().copied().collect::<Vec<_>>(),
        [8, 8, 8]
    );

    let main = ws.main_directory();
    let subtrain = main.join("subtrain");
    assert!(main.join("environment.json").is_file());
    assert_eq!(read(&main.join("header.txt")), "ID,sepal,petal,species\n");

    for tree in ["subsubtrain_1", "subsubtrain_2", "subsubtrain_3"] {
        for norm in ["classic", "zadeh"] {
            let vector = subtrain.join(tree).join(format!("cclassified_vector_{norm}.csv"));
            assert_eq!(read(&vector).lines().count(), 6);
            assert!(read(&vector).lines().all(|line| line.ends_with(",1.0")));
            let membership = subtrain.join(tree).join(format!("membership_{norm}.csv"));
            assert!(read(&membership).starts_with("ID,trueclass,A,B\n"));
        }
    }

    let difficulty = read(&subtrain.join("difficulty_vector_classic.csv"));
    assert_eq!(difficulty.lines().count(), 6);
    assert!(difficulty.lines().all(|line| line.ends_with(",0.75")));

    assert_eq!(
        read(&subtrain.join("quality_zadeh.csv")),
        "ID_tree,quality\nsubsubtrain_1,0.5625\nsubsubtrain_2,0.5625\nsubsubtrain_3,0.5625\n"
    );
    let clusters = read(&subtrain.join("clusters_classic.csv"));
    assert!(clusters.starts_with("ID_tree,ID_cluster,distance\n"));
    assert!(clusters.lines().skip(1).all(|line| line.contains(",1,")));

    let matrix = read(&subtrain.join("classes_matrices/A/matrix_A_classic.csv"));
    assert!(matrix.starts_with("ID,subsubtrain_1,subsubtrain_2,subsubtrain_3\n"));

    let statistics: serde_json::Value =
        serde_json::from_str(&read(&outcome.statistics_file.unwrap())).unwrap();
    assert_eq!(statistics["quality"]["classic"]["subsubtrain_2"], 0.5625);
}

#[tokio::test]
async fn resuming_reruns_later_phases_identically() {
    let ws = Workspace::new();
    run_experiment(&ws.config, &ws.options()).await.unwrap();
    let subtrain = ws.main_directory().join("subtrain");
    let difficulty = read(&subtrain.join("difficulty_vector_zadeh.csv"));
    let quality = read(&subtrain.join("quality_classic.csv"));

    let options = RunOptions {
        resume_phase: Some(Phase::Reduce),
        ..ws.options()
    };
    let outcome = run_experiment(&ws.config, &options).await.unwrap();

    assert_eq!(
        outcome.executed,
        [
            Phase::Reduce,
            Phase::Quality,
            Phase::ClassMatrices,
            Phase::ClusterTrees,
            Phase::End
        ]
    );
    assert_eq!(read(&subtrain.join("difficulty_vector_zadeh.csv")), difficulty);
    assert_eq!(read(&subtrain.join("quality_classic.csv")), quality);
}

#[tokio::test]
async fn missing_membership_table_is_fatal_at_reduction() {
    let ws = Workspace::new();
    let stop_after_construct = RunOptions {
        last_phase: Phase::Construct,
        ..ws.options()
    };
    run_experiment(&ws.config, &stop_after_construct).await.unwrap();

    let removed = ws
        .main_directory()
        .join("subtrain/subsubtrain_2/membership_zadeh.csv");
    std::fs::remove_file(&removed).unwrap();

    let resume = RunOptions {
        resume_phase: Some(Phase::Reduce),
        ..ws.options()
    };
    let err = run_experiment(&ws.config, &resume).await.unwrap_err();

    assert!(matches!(err, PipelineError::MissingArtifact { ref path } if *path == removed));
    let snapshot = ws.snapshot().load().unwrap().unwrap();
    assert_eq!(snapshot.current_phase, Phase::Reduce);
    assert_eq!(snapshot.last_completed_phase, Some(Phase::Construct));
}

#[tokio::test]
async fn failing_tree_builder_surfaces_as_missing_artifact() {
    let ws = Workspace::new();
    let failing = write_script(ws.dir.path(), "failing.sh", "echo 'no memory' >&2\nexit 2");
    let options = RunOptions {
        tree_builder: Some(failing),
        ..ws.options()
    };

    let err = run_experiment(&ws.config, &options).await.unwrap_err();

    assert!(matches!(err, PipelineError::MissingArtifact { .. }), "got: {err}");
    let snapshot = ws.snapshot().load().unwrap().unwrap();
    assert_eq!(snapshot.last_completed_phase, Some(Phase::Construct));
}

#[tokio::test]
async fn resume_past_completed_work_is_rejected() {
    let ws = Workspace::new();
    let splits_only = RunOptions {
        last_phase: Phase::SubsubtrainSplit,
        ..ws.options()
    };
    run_experiment(&ws.config, &splits_only).await.unwrap();

    let skip_construction = RunOptions {
        resume_phase: Some(Phase::Quality),
        ..ws.options()
    };
    let err = run_experiment(&ws.config, &skip_construction)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::UnprocessablePhase {
            requested: Phase::Quality,
            last_completed: Some(Phase::SubsubtrainSplit),
        }
    ));
}

#[tokio::test]
async fn invalid_class_column_aborts_before_writing() {
    let ws = Workspace::new();
    let mut config = ws.config.clone();
    config.class = Some(fforest_types::ColumnRef::Name("colour".into()));

    let err = run_experiment(&config, &ws.options()).await.unwrap_err();

    assert!(matches!(err, PipelineError::UnknownColumn { .. }));
    assert!(!ws.main_directory().exists());
}

#[test]
fn recorded_builder_output_parses() {
    use fforest_engine::construction::parser::parse_tree_output;

    let output = read(&fixtures().join("builder_output.txt"));
    let table = parse_tree_output(&output, 3).unwrap();

    assert_eq!(table.len(), 3);
    let five = table.get("5").unwrap();
    assert_eq!(five.true_class, "A");
    assert_eq!(five.degree("classic", "A"), None);
    assert!(!five.is_correctly_classified("classic"));
    assert!(table.get("0").unwrap().is_correctly_classified("luka"));
    assert!(table.get("3").unwrap().is_correctly_classified("zadeh"));
}

#[test]
fn fixture_configuration_resolves_the_builder_variable() {
    set_builder_variable();
    let config = parse_experiment(&fixtures().join("experiment.yaml")).unwrap();
    assert_eq!(config.forest.tree_builder, fixtures().join("fake_builder.sh"));
}
