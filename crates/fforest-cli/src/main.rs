mod commands;
mod logging;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use fforest_types::Phase;

#[derive(Parser)]
#[command(
    name = "fforest",
    version,
    about = "Fuzzy random forest experiment pipeline"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace); defaults to the experiment's verbosity
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run (or resume) an experiment
    Run(RunArgs),
    /// Validate the experiment configuration against the input table
    Check {
        /// Input table
        database: PathBuf,
        /// Path to experiment YAML file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Input table
    database: PathBuf,
    /// Path to experiment YAML file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Directory in which the run directory is created
    #[arg(long, default_value = ".")]
    parent_dir: PathBuf,
    /// Run directory name (default: stem of the input table)
    #[arg(long)]
    main_directory: Option<String>,
    /// Resume at this phase using the run's snapshot
    #[arg(long)]
    resume_phase: Option<Phase>,
    /// Stop after this phase (the end phase still runs)
    #[arg(long, default_value = "end")]
    last_phase: Phase,
    /// Tree builder executable
    #[arg(long)]
    tree_builder: Option<PathBuf>,
    /// Number of trees in the forest
    #[arg(long)]
    trees: Option<u32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.command {
        Commands::Run(args) => args.config.as_deref(),
        Commands::Check { config, .. } => config.as_deref(),
    };
    let config = commands::load_config(config_path)?;

    logging::init(cli.log_level.as_deref(), config.verbosity);

    match cli.command {
        Commands::Run(args) => {
            let options = fforest_engine::RunOptions {
                parent_dir: args.parent_dir,
                main_directory: args.main_directory,
                resume_phase: args.resume_phase,
                last_phase: args.last_phase,
                tree_builder: args.tree_builder,
                trees: args.trees,
                ..fforest_engine::RunOptions::new(args.database)
            };
            commands::run::execute(&config, &options).await
        }
        Commands::Check { database, .. } => {
            commands::check::execute(&config, &fforest_engine::RunOptions::new(database))
        }
    }
}
