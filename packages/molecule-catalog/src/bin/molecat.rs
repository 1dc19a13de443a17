//! Molecule catalog CLI
//!
//! # Usage
//!
//! ```bash
//! # Create the schema
//! molecat --database molecules.db init
//!
//! # Add a molecule with one equivalent and one synonym
//! molecat add --name voglibose --formula C10H21NO7 --mass 267.277 --equivalent 1 --synonym vog
//!
//! # Reconcile associations of molecule 2
//! molecat update --id 2 --name voglibose --formula C10H21NO7 --mass 267.277 --synonym vog --synonym vague
//!
//! # Seed an empty catalog from a JSON array of molecules
//! molecat seed molecules.json
//! ```

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use molecule_catalog::{CatalogConfig, Molecule, MoleculeService, SeedOutcome, SqliteGateway};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "molecat")]
#[command(about = "Molecule catalog - equivalents and synonyms kept in sync", long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database path (overrides config and MOLECAT_DATABASE)
    #[arg(short, long, global = true)]
    database: Option<String>,

    /// Log filter, e.g. "debug" or "molecule_catalog=trace"
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the schema if missing
    Init,

    /// Add a molecule
    Add(MoleculeArgs),

    /// Reconcile the associations of an existing molecule
    Update {
        /// Molecule id
        #[arg(long)]
        id: i64,

        #[command(flatten)]
        molecule: MoleculeArgs,
    },

    /// Exact-match search by name
    Search {
        term: String,
    },

    /// Print one molecule with its associations
    Show {
        id: i64,
    },

    /// Report whether the catalog holds any molecule
    Check,

    /// Seed an empty catalog from a JSON array of molecules
    Seed {
        file: PathBuf,
    },
}

#[derive(Args)]
struct MoleculeArgs {
    #[arg(long)]
    name: String,

    #[arg(long)]
    formula: String,

    #[arg(long)]
    mass: f64,

    /// Equivalent molecule id (repeatable)
    #[arg(long = "equivalent")]
    equivalents: Vec<i64>,

    /// Synonym (repeatable)
    #[arg(long = "synonym")]
    synonyms: Vec<String>,
}

impl MoleculeArgs {
    fn into_molecule(self) -> anyhow::Result<Molecule> {
        if self.name.trim().is_empty() {
            bail!("--name must not be empty");
        }
        if !(self.mass > 0.0) {
            bail!("--mass must be positive, got {}", self.mass);
        }
        Ok(Molecule::new(self.name, self.formula, self.mass)
            .with_equivalents(self.equivalents)
            .with_synonyms(self.synonyms))
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<CatalogConfig> {
    let mut config = match &cli.config {
        Some(path) => CatalogConfig::from_yaml(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => CatalogConfig::default(),
    }
    .with_env_overrides();

    if let Some(database) = &cli.database {
        config.database = database.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    Ok(config)
}

fn init_tracing(config: &CatalogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_tracing(&config);

    let gateway = SqliteGateway::from_location(&config.database)
        .with_context(|| format!("opening database {}", config.database))?;
    let service = MoleculeService::from_config(gateway, &config);

    match cli.command {
        Commands::Init => {
            println!("Schema ready at {}", config.database);
        }
        Commands::Add(args) => {
            let id = service.add_molecule(&args.into_molecule()?).await?;
            println!("{}", id);
        }
        Commands::Update { id, molecule } => {
            let report = service
                .update_molecule(&molecule.into_molecule()?.with_id(id))
                .await?;
            print_json(&report)?;
        }
        Commands::Search { term } => {
            print_json(&service.search(&term).await?)?;
        }
        Commands::Show { id } => {
            print_json(&service.get_molecule(id).await?)?;
        }
        Commands::Check => {
            println!("{}", service.exists_any().await?);
        }
        Commands::Seed { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let molecules: Vec<Molecule> = serde_json::from_str(&content)
                .with_context(|| format!("parsing {}", file.display()))?;
            match service.seed(&molecules).await? {
                SeedOutcome::Seeded(count) => println!("Seeded {} molecules", count),
                SeedOutcome::Skipped => println!("Catalog not empty, nothing seeded"),
            }
        }
    }

    Ok(())
}
