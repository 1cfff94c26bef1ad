use std::{io, path::PathBuf};

use clap::Parser;
use color_eyre as ey;
use ey::eyre::{eyre, Context};
use prism_content::{
    group::GROUPS_FILE_NAME, AssetKey, AssetStore, FileSystemStore, Groups, PipelineConfig, Strategy, VariantPipeline,
};
use prism_shared::log::{self, info, warn};

/// Name of the configuration file that is used when no `--config` is given.
const CONFIG_FILE_NAME: &str = "prism.yaml";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
enum CommandLineArguments {
    /// Creates the variants of all graphs in the store
    Run(Run),
    /// Prints the configured profiles
    Profiles {
        /// Configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Prints a stored asset together with its labels
    Inspect {
        /// Root directory of the asset store
        #[arg(short, long)]
        root: PathBuf,

        /// Key of the asset relative to the root
        asset: PathBuf,
    },
}

#[derive(Parser, Debug)]
struct Run {
    /// Root directory of the asset store
    #[arg(short, long)]
    root: PathBuf,

    /// Configuration file. Defaults to `prism.yaml` in the root directory when it exists.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides the strategy of the configuration
    #[arg(short, long, value_enum)]
    strategy: Option<StrategyArgument>,

    /// Only runs the profiles with the given names
    #[arg(short, long = "profile")]
    profiles: Vec<String>,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy)]
enum StrategyArgument {
    Destructive,
    NonDestructive,
}

impl From<StrategyArgument> for Strategy {
    fn from(value: StrategyArgument) -> Self {
        match value {
            StrategyArgument::Destructive => Strategy::Destructive,
            StrategyArgument::NonDestructive => Strategy::NonDestructive,
        }
    }
}

fn load_config(config: Option<&PathBuf>, root: Option<&PathBuf>) -> ey::Result<PipelineConfig> {
    let path = match (config, root) {
        (Some(config), _) => Some(config.clone()),
        (None, Some(root)) => Some(root.join(CONFIG_FILE_NAME)).filter(|path| path.exists()),
        (None, None) => None,
    };
    match path {
        Some(path) => PipelineConfig::load(&path).wrap_err_with(|| format!("Failed to load the configuration '{}'", path.display())),
        None => {
            info!("Using the default configuration");
            Ok(PipelineConfig::default())
        }
    }
}

fn run(run: &Run) -> ey::Result<()> {
    let mut config = load_config(run.config.as_ref(), Some(&run.root))?;
    if let Some(strategy) = run.strategy {
        config.strategy = strategy.into();
    }
    if !run.profiles.is_empty() {
        if let Some(unknown) = run.profiles.iter().find(|name| config.profile(name).is_none()) {
            return Err(eyre!("Profile '{unknown}' is not configured"));
        }
        config.profiles.retain(|profile| run.profiles.contains(&profile.name));
    }

    let mut store = FileSystemStore::new(&run.root).wrap_err("Failed to open the asset store")?;
    let groups_path = run.root.join(GROUPS_FILE_NAME);
    let mut groups = Groups::load(&groups_path).wrap_err("Failed to load the distribution groups")?;

    let pipeline = VariantPipeline::new(config);
    let cancellation = pipeline.cancellation_token();
    ctrlc::set_handler(move || {
        warn!("Cancelling after the current graph");
        cancellation.cancel();
    })
    .wrap_err("Failed to set the Ctrl+C handler")?;

    let working_set = pipeline
        .collect_working_set(&store, &groups)
        .wrap_err("Failed to collect the working set")?;
    let report = pipeline.run(&mut store, &mut groups, &working_set);
    groups.save(&groups_path).wrap_err("Failed to save the distribution groups")?;

    for skip in &report.skips {
        warn!("{skip}");
    }
    info!("{}", report.to_string().trim_end());
    Ok(())
}

fn main() -> ey::Result<()> {
    color_eyre::install()?;

    // Setup logging
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                prism_shared::chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(log::LevelFilter::Info)
        .chain(io::stdout())
        .apply()
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;

    let command_line_arguments = CommandLineArguments::parse();
    match &command_line_arguments {
        CommandLineArguments::Run(arguments) => run(arguments)?,
        CommandLineArguments::Profiles { config } => {
            let config = load_config(config.as_ref(), None)?;
            for profile in &config.profiles {
                println!(
                    "{}: suffix {}, {} up to {}px on {}, group '{}', label '{}'",
                    profile.name,
                    profile.suffix,
                    profile.format,
                    profile.max_dimension,
                    profile.platform,
                    profile.group(),
                    profile.label()
                );
            }
        }
        CommandLineArguments::Inspect { root, asset } => {
            let store = FileSystemStore::new(root).wrap_err("Failed to open the asset store")?;
            let key = AssetKey::new(asset);
            let stored = store.load(&key).wrap_err_with(|| format!("Failed to load {key}"))?;
            let labels = store.labels(&key).wrap_err_with(|| format!("Failed to read the labels of {key}"))?;
            println!("{stored:#?}");
            println!("labels: {labels:?}");
        }
    }
    Ok(())
}
