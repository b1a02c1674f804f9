use anyhow::Result;

use fforest_engine::{run_experiment, ExperimentConfig, RunOptions};

/// Execute the `run` command: run or resume an experiment and print a summary.
pub async fn execute(config: &ExperimentConfig, options: &RunOptions) -> Result<()> {
    tracing::info!(
        database = %options.database.display(),
        trees = options.trees.unwrap_or(config.forest.trees),
        resume_phase = ?options.resume_phase,
        last_phase = %options.last_phase,
        "Experiment configured"
    );

    let outcome = match run_experiment(config, options).await {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::error!(error = %err, "Experiment failed");
            return Err(err.into());
        }
    };

    println!(
        "Experiment '{}' completed successfully.",
        options.database.display()
    );
    let phases: Vec<String> = outcome.executed.iter().map(ToString::to_string).collect();
    println!("  Phases:          {}", phases.join(" -> "));
    println!("  Run directory:   {}", outcome.main_directory.display());
    let stats = &outcome.statistics;
    if let Some(rows) = stats.original_rows {
        println!("  Input rows:      {rows}");
    }
    if let (Some(train), Some(test)) = (stats.train_rows, stats.test_rows) {
        println!("  Train / test:    {train} / {test}");
    }
    if let (Some(reference), Some(subtrain)) = (stats.reference_rows, stats.subtrain_rows) {
        println!("  Reference:       {reference} (subtrain {subtrain})");
    }
    if !stats.subsubtrain_rows.is_empty() {
        println!("  Trees:           {}", stats.subsubtrain_rows.len());
    }
    if let Some(path) = &outcome.statistics_file {
        println!("  Statistics:      {}", path.display());
    }
    println!("  Duration:        {:.2}s", outcome.duration_secs);
    Ok(())
}
