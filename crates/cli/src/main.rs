use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use knob_application::{experiment_name, filter_by_experiment_name, filter_objectives, filter_scenarios, Application};
use knob_generation::{Generated, Generator};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "knobctl", version, about = "Knob CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Yaml, Json }

#[derive(Args, Debug)]
struct Selection {
    /// Application file
    #[arg(short = 'f', long = "filename")]
    filename: PathBuf,
    /// Scenario to generate for (required when the application has several)
    #[arg(long = "scenario")]
    scenario: Option<String>,
    /// Objectives to optimize, in order
    #[arg(long = "objectives", value_delimiter = ',')]
    objectives: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate resources
    Generate {
        #[command(subcommand)]
        what: GenerateCommands,
    },
    /// Print the experiment name for an application
    ExperimentName {
        #[command(flatten)]
        selection: Selection,
    },
}

#[derive(Subcommand, Debug)]
enum GenerateCommands {
    /// Generate an experiment from an application
    Experiment {
        #[command(flatten)]
        selection: Selection,
        /// Experiment name; selects the scenario and objectives it encodes
        #[arg(long = "name", conflicts_with_all = ["scenario", "objectives"])]
        name: Option<String>,
        /// Also print the scanned resources
        #[arg(long = "include-resources", action = ArgAction::SetTrue)]
        include_resources: bool,
        /// Output format
        #[arg(short = 'o', long = "output", value_enum, default_value_t = Output::Yaml)]
        output: Output,
    },
}

fn init_tracing() {
    let env = std::env::var("KNOB_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

/// Loads the application and narrows it to the requested scenario and objectives.
fn load(selection: &Selection, name: Option<&str>) -> Result<Application> {
    let mut app = Application::load(&selection.filename)?;
    match name {
        Some(name) => filter_by_experiment_name(&mut app, name)?,
        None => {
            filter_scenarios(&mut app, selection.scenario.as_deref().unwrap_or_default())?;
            filter_objectives(&mut app, &selection.objectives[..])?;
        }
    }
    Ok(app)
}

fn render(out: &Generated, output: Output) -> Result<String> {
    let mut docs = vec![serde_yaml::to_value(&out.experiment).context("encode experiment")?];
    docs.extend(out.resources.iter().cloned());
    Ok(match output {
        Output::Yaml => docs.iter().map(serde_yaml::to_string).collect::<Result<Vec<_>, _>>()?.join("---\n"),
        Output::Json => serde_json::to_string_pretty(&docs)?,
    })
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate { what: GenerateCommands::Experiment { selection, name, include_resources, output } } => {
            let app = load(&selection, name.as_deref())?;
            info!(application = %app.name(), file = %selection.filename.display(), "generate experiment invoked");
            let mut generator = Generator::new(app);
            generator.include_resources = include_resources;
            let out = generator.generate()?;
            print!("{}", render(&out, output)?);
            if output == Output::Json { println!(); }
        }
        Commands::ExperimentName { selection } => {
            let app = load(&selection, None)?;
            println!("{}", experiment_name(&app));
        }
    }
    Ok(())
}
