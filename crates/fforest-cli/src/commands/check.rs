use anyhow::Result;

use fforest_engine::{check_experiment, ExperimentConfig, RunOptions};

/// Execute the `check` command: validate the configuration and resolve its
/// columns against the input table.
pub fn execute(config: &ExperimentConfig, options: &RunOptions) -> Result<()> {
    let report = check_experiment(config, options)?;

    println!("Experiment configuration: OK");
    println!("  Input table:     {}", options.database.display());
    println!("  Columns:         {}", report.columns.width);
    println!("  Rows:            {}", report.columns.rows);
    match report.columns.identifier {
        Some(index) => println!("  Identifier:      column {index}"),
        None => println!("  Identifier:      generated"),
    }
    match report.columns.class {
        Some(index) => println!("  Class:           column {index}"),
        None => println!("  Class:           none"),
    }
    println!("  Classes:         {}", report.columns.classes.join(", "));
    println!("  Trees:           {}", report.trees);
    println!("  Norms:           {}", report.norms.join(", "));
    println!("  Run directory:   {}", report.main_directory.display());
    Ok(())
}
