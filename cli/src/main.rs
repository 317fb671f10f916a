mod interactive;
mod output;

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use larder_core::{AppConfig, Ingredient, IngredientStore, RecipeManager, Submission};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::output::ConsoleProgress;

#[derive(Parser)]
#[command(name = "larder")]
#[command(about = "Turn the contents of your pantry into AI-generated recipes", long_about = None)]
struct Cli {
    /// Use canned responses instead of calling the AI service
    #[arg(long, global = true)]
    fake: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Chat model to use
    #[arg(long, global = true)]
    model: Option<String>,

    /// Directory containing the prompt fragments
    #[arg(long, global = true)]
    prompt_dir: Option<PathBuf>,

    /// Directory for the ingredient list, request logs and images
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Print recipes as JSON instead of Markdown
    #[arg(long, global = true)]
    plain: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Strictness {
    Yes,
    No,
}

#[derive(Subcommand)]
enum Commands {
    /// Add an ingredient, written as name-quantity-unit (e.g. apples-2-pounds)
    Add { ingredient: String },
    /// Remove every ingredient with this name
    Remove { name: String },
    /// Remove all ingredients
    Clear,
    /// Show the stored ingredients
    List,
    /// Ask for recipes using the stored ingredients
    Submit {
        /// Free-text instructions: cuisine, allergies, servings, time limits...
        #[arg(long, default_value = "")]
        instructions: String,
        /// Whether the recipe may only use the listed ingredients
        #[arg(long, value_enum, default_value = "yes")]
        strict: Strictness,
        /// Skip image generation
        #[arg(long)]
        no_image: bool,
    },
    /// Menu-driven session
    Interactive,
}

/// Install the log subscriber. `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "larder_core=debug,larder=debug,info",
        _ => "trace",
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

impl Cli {
    /// Environment first, then flags on top.
    fn load_config(&self) -> Result<AppConfig> {
        let config = AppConfig::from_env().context("Failed to read configuration")?;
        self.apply_overrides(config)
    }

    /// Apply flags and reject unknown models before any command runs.
    fn apply_overrides(&self, mut config: AppConfig) -> Result<AppConfig> {
        if self.fake {
            config.ai.fake = true;
        }
        if let Some(model) = &self.model {
            config.ai.model = model.clone();
        }
        if let Some(dir) = &self.prompt_dir {
            config.prompt_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if self.plain {
            config.markdown = false;
        }

        config
            .ai
            .validate_model()
            .context("Invalid model configuration")?;
        Ok(config)
    }
}

fn build_manager(config: &AppConfig) -> Result<RecipeManager> {
    let manager = RecipeManager::from_config(config).context("Failed to start recipe manager")?;
    Ok(manager.with_progress(Box::new(ConsoleProgress)))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.load_config()?;
    let store = IngredientStore::new(config.items_path());

    match &cli.command {
        Commands::Add { ingredient } => {
            let ingredient: Ingredient = ingredient.parse()?;
            store.add(ingredient.clone())?;
            println!("Added {}", ingredient);
        }
        Commands::Remove { name } => {
            let removed = store.remove(name)?;
            if removed == 0 {
                println!("No ingredient named '{}'", name);
            } else {
                println!("Removed {}", name);
            }
        }
        Commands::Clear => {
            store.clear()?;
            println!("Ingredient list cleared");
        }
        Commands::List => {
            output::print_ingredients(&mut io::stdout(), &store.list()?)?;
        }
        Commands::Submit {
            instructions,
            strict,
            no_image,
        } => {
            let manager = build_manager(&config)?;
            let submission = Submission {
                instructions: instructions.clone(),
                is_strict: *strict == Strictness::Yes,
                generate_image: !no_image,
            };
            let outcome = manager.submit(&submission).await?;
            output::print_outcome(&mut io::stdout(), &outcome, config.markdown)?;
        }
        Commands::Interactive => {
            let manager = build_manager(&config)?;
            let stdin = io::stdin();
            let mut session = interactive::Session::new(
                &manager,
                stdin.lock(),
                io::stdout(),
                config.markdown,
            );
            session.run().await?;
        }
    }

    Ok(())
}
