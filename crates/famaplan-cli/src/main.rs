mod ai_cmds;
mod config;
mod draft;
mod plan_cmds;
#[cfg(test)]
mod test_util;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use famaplan_core::distill::{DistillationPipeline, MemorySummaryCache, PgSummaryCache, SummaryCache};
use famaplan_db::config::DbConfig;
use famaplan_db::pool::{self, DatabaseStatus};

use config::FamaplanConfig;

#[derive(Parser)]
#[command(name = "famaplan", about = "Business plan drafting for municipal support applications")]
struct Cli {
    /// Database URL (overrides FAMAPLAN_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a famaplan config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = DbConfig::DEFAULT_URL)]
        db_url: String,
        /// Generator API key to store in the config file
        #[arg(long)]
        api_key: Option<String>,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Initialize the famaplan database (requires config file or env vars)
    DbInit,
    /// Plan management
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Fill the AI-owned sections of a draft from its executive summary
    Distill {
        /// Path to the draft file
        file: PathBuf,
        /// Skip the shared database cache
        #[arg(long)]
        no_cache: bool,
    },
    /// Draft professional text for one section from rough notes
    Assist {
        /// Section title, e.g. "Análise de Mercado"
        #[arg(long)]
        section: String,
        /// Rough notes to expand
        notes: String,
    },
    /// Regenerate the strategy section of a draft
    Strategy {
        /// Path to the draft file
        file: PathBuf,
    },
    /// Regenerate the three-year projections of a draft
    Projections {
        /// Path to the draft file
        file: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum PlanCommands {
    /// Start a new draft file (no database required)
    New {
        /// Path to write the draft to
        file: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// List saved plans, newest first
    List {
        /// Only plans whose name or ID contains this text (case-insensitive)
        #[arg(long)]
        search: Option<String>,
    },
    /// Show a saved plan
    Show {
        /// Plan ID, e.g. "PN 2024-0001"
        plan_id: String,
    },
    /// Print the identifier the next new plan would get
    NextId,
    /// Save a draft, allocating its identifier on first save
    Save {
        /// Path to the draft file
        file: PathBuf,
    },
    /// Write a saved plan to a draft file for editing
    Load {
        /// Plan ID to load
        plan_id: String,
        /// Path to write the draft to
        file: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Delete a saved plan
    Delete {
        /// Plan ID to delete
        plan_id: String,
    },
}

/// Execute the `famaplan init` command: write config file.
fn cmd_init(db_url: &str, api_key: Option<String>, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let has_key = api_key.is_some();
    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        generator: config::GeneratorSection {
            api_key,
            ..config::GeneratorSection::default()
        },
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    if has_key {
        println!("  generator.api_key = (set)");
    } else {
        println!(
            "  generator.api_key not set; export {} to use the AI commands",
            config::ENV_API_KEY
        );
    }
    println!();
    println!("Next: run `famaplan db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `famaplan db-init` command: create the database if needed,
/// migrate it and report what it holds.
async fn cmd_db_init(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = FamaplanConfig::resolve(cli_db_url)?;
    let db_name = resolved.db_config.database_name().unwrap_or("famaplan");

    match pool::ensure_database_exists(&resolved.db_config).await? {
        DatabaseStatus::Created => println!("Created database {db_name}."),
        DatabaseStatus::Existing => println!("Using existing database {db_name}."),
    }

    let db_pool = pool::create_pool(&resolved.db_config).await?;
    let result = async {
        pool::run_migrations(&db_pool).await?;
        pool::store_counts(&db_pool).await
    }
    .await;
    db_pool.close().await;
    let counts = result?;

    println!("Database ready.");
    println!("  Plans:            {}", counts.plans);
    println!("  Cached summaries: {}", counts.cached_summaries);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init {
            db_url,
            api_key,
            force,
        } => {
            cmd_init(&db_url, api_key, force)?;
        }
        Commands::DbInit => {
            cmd_db_init(cli.database_url.as_deref()).await?;
        }
        Commands::Plan {
            command: PlanCommands::New { file, force },
        } => {
            plan_cmds::cmd_new(&file, force)?;
        }
        Commands::Plan { command } => {
            let resolved = FamaplanConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = plan_cmds::run_plan_command(command, &db_pool).await;
            db_pool.close().await;
            result?;
        }
        Commands::Distill { file, no_cache } => {
            let resolved = FamaplanConfig::resolve(cli.database_url.as_deref())?;
            let generator = ai_cmds::build_generator(&resolved)?;
            if no_cache {
                let cache: Arc<dyn SummaryCache> = Arc::new(MemorySummaryCache::new());
                let pipeline = DistillationPipeline::new(generator, cache);
                ai_cmds::cmd_distill(&pipeline, &file).await?;
            } else {
                let db_pool = pool::create_pool(&resolved.db_config).await?;
                let cache: Arc<dyn SummaryCache> = Arc::new(PgSummaryCache::new(db_pool.clone()));
                let pipeline = DistillationPipeline::new(generator, cache);
                let result = ai_cmds::cmd_distill(&pipeline, &file).await;
                db_pool.close().await;
                result?;
            }
        }
        Commands::Assist { section, notes } => {
            let resolved = FamaplanConfig::resolve(cli.database_url.as_deref())?;
            let generator = ai_cmds::build_generator(&resolved)?;
            ai_cmds::cmd_assist(generator.as_ref(), &section, &notes).await?;
        }
        Commands::Strategy { file } => {
            let resolved = FamaplanConfig::resolve(cli.database_url.as_deref())?;
            let generator = ai_cmds::build_generator(&resolved)?;
            ai_cmds::cmd_strategy(generator.as_ref(), &file).await?;
        }
        Commands::Projections { file } => {
            let resolved = FamaplanConfig::resolve(cli.database_url.as_deref())?;
            let generator = ai_cmds::build_generator(&resolved)?;
            ai_cmds::cmd_projections(generator.as_ref(), &file).await?;
        }
    }

    Ok(())
}
