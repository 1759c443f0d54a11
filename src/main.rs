use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use clap::{CommandFactory, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use flowdeck_catalog::HttpCatalog;
use flowdeck_core::config::{dirs_home, AppConfig};
use flowdeck_core::event::EventBus;
use flowdeck_core::traits::{CatalogSource, DownloadSink, SettingsSchemaSource, WorkflowStore};
use flowdeck_core::types::{store_key, WorkflowDocument, STORE_KEY_PREFIX};
use flowdeck_designer::palette::{PaletteState, PaletteView};
use flowdeck_designer::{load_catalog, toolbar, Designer, Palette};
use flowdeck_store::{FileDownloads, SqliteStore};
use flowdeck_tui::ConfigGallery;

const DEFAULT_CONFIG: &str = "flowdeck.toml";

#[derive(Parser)]
#[command(name = "flowdeck", version, about = "Visual editor for agent workflows")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the workflow editor (default)
    Edit {
        /// Open a workflow JSON file
        #[arg(long, conflicts_with = "workflow")]
        open: Option<PathBuf>,
        /// Open a saved workflow by id
        #[arg(long)]
        workflow: Option<String>,
        /// Name for a new workflow
        #[arg(long)]
        name: Option<String>,
    },
    /// List saved workflows
    List,
    /// Print a saved workflow as JSON
    Show {
        /// Workflow id
        id: String,
    },
    /// Write a saved workflow to the downloads directory
    Export {
        /// Workflow id
        id: String,
    },
    /// Delete a saved workflow
    Delete {
        /// Workflow id
        id: String,
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Print the agent catalog
    Catalog {
        /// Only show agents matching this term
        #[arg(long)]
        search: Option<String>,
    },
    /// Show current configuration
    Config,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Handle completions before config loading
    if let Some(Commands::Completions { shell }) = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "flowdeck", &mut std::io::stdout());
        return Ok(());
    }

    let (config, config_path) = load_config(&cli.config)?;
    let workspace = config.workspace_dir();
    std::fs::create_dir_all(&workspace).ok();

    let command = cli.command.unwrap_or(Commands::Edit {
        open: None,
        workflow: None,
        name: None,
    });

    // The editor owns the terminal, so its logs go to a file.
    let log_file = match command {
        Commands::Edit { .. } => Some(workspace.join("flowdeck.log")),
        _ => None,
    };
    init_tracing(log_file.as_deref())?;

    match &config_path {
        Some(path) => info!(path = %path.display(), "Loaded config"),
        None => warn!("No config file found, using defaults"),
    }

    match command {
        Commands::Edit {
            open,
            workflow,
            name,
        } => {
            let store: Arc<dyn WorkflowStore> = Arc::new(SqliteStore::open(&config.store_path())?);
            let downloads: Arc<dyn DownloadSink> =
                Arc::new(FileDownloads::new(config.downloads_dir()));
            let schemas: Arc<dyn SettingsSchemaSource> = Arc::new(config.settings_schemas.clone());
            let catalog: Arc<dyn CatalogSource> = Arc::new(HttpCatalog::new(&config.catalog)?);
            let event_bus = Arc::new(EventBus::default());

            let name = name.unwrap_or_else(|| config.editor.default_name.clone());
            let mut designer = Designer::new(name, store.clone(), downloads)
                .with_events(event_bus.clone())
                .with_schemas(schemas);

            if let Some(path) = open {
                designer = designer.with_document(toolbar::load_from_file(&path)?)?;
                info!(path = %path.display(), "Opened workflow file");
            } else if let Some(id) = workflow {
                designer = designer.with_document(toolbar::load_from_store(store.as_ref(), &id)?)?;
                info!(workflow = %id, "Opened saved workflow");
            }

            let gallery = Arc::new(
                ConfigGallery::new(config.templates.clone()).with_events(event_bus.clone()),
            );
            flowdeck_tui::run_tui(designer, catalog, event_bus, gallery).await?;
        }
        Commands::List => {
            let store = SqliteStore::open(&config.store_path())?;
            let entries = store.entries(STORE_KEY_PREFIX)?;
            if entries.is_empty() {
                println!("No saved workflows in {}", config.store_path().display());
                return Ok(());
            }
            for entry in entries {
                let summary = store
                    .get(&entry.key)?
                    .and_then(|json| serde_json::from_str::<WorkflowDocument>(&json).ok());
                match summary {
                    Some(doc) => println!(
                        "{}  {:<30} {:>3} nodes {:>3} edges  {}",
                        doc.id,
                        doc.name,
                        doc.nodes.len(),
                        doc.edges.len(),
                        entry.updated_at.format("%Y-%m-%d %H:%M"),
                    ),
                    None => println!("{}  (unreadable)", entry.key),
                }
            }
        }
        Commands::Show { id } => {
            let store = SqliteStore::open(&config.store_path())?;
            match store.get(&store_key(&id))? {
                Some(json) => println!("{}", json),
                None => anyhow::bail!("No saved workflow with id {}", id),
            }
        }
        Commands::Export { id } => {
            let store = SqliteStore::open(&config.store_path())?;
            let doc = toolbar::load_from_store(&store, &id)?;
            let downloads = FileDownloads::new(config.downloads_dir());
            let file = toolbar::export(&doc, &downloads)?;
            println!("Exported {}", downloads.dir().join(file).display());
        }
        Commands::Delete { id, yes } => {
            let store = SqliteStore::open(&config.store_path())?;
            let key = store_key(&id);
            if store.get(&key)?.is_none() {
                anyhow::bail!("No saved workflow with id {}", id);
            }
            let confirmed = yes
                || dialoguer::Confirm::new()
                    .with_prompt(format!("Delete workflow {}?", id))
                    .default(false)
                    .interact()
                    .unwrap_or(false);
            if !confirmed {
                println!("Cancelled.");
                return Ok(());
            }
            store.remove(&key)?;
            println!("Deleted {}", id);
        }
        Commands::Catalog { search } => {
            let source = HttpCatalog::new(&config.catalog)?;
            let catalog = load_catalog(&source).await;
            let state = PaletteState::default();
            let palette = Palette::new(&catalog, &state);
            print_palette(palette.view(search.as_deref().unwrap_or_default()));
        }
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
        Commands::Completions { .. } => unreachable!("handled before config load"),
    }

    Ok(())
}

/// `--config` if it exists, else `~/.flowdeck/config.toml`, else defaults.
fn load_config(path: &Path) -> anyhow::Result<(AppConfig, Option<PathBuf>)> {
    if path.exists() {
        return Ok((AppConfig::load(path)?, Some(path.to_path_buf())));
    }
    if path != Path::new(DEFAULT_CONFIG) {
        anyhow::bail!("Config file not found: {}", path.display());
    }

    let home_config = dirs_home().map(|h| h.join(".flowdeck").join("config.toml"));
    match home_config {
        Some(path) if path.exists() => Ok((AppConfig::load(&path)?, Some(path))),
        _ => Ok((AppConfig::default(), None)),
    }
}

fn init_tracing(log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = || {
        EnvFilter::try_from_env("FLOWDECK_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("flowdeck=info,warn"))
    };

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn print_palette(view: PaletteView<'_>) {
    match view {
        PaletteView::Empty => println!("No agents available."),
        PaletteView::Results(agents) if agents.is_empty() => println!("No matching agents."),
        PaletteView::Results(agents) => {
            for agent in agents {
                println!(
                    "{:<24} {:<20} {}",
                    agent.agent_name,
                    agent.category_name,
                    agent.capabilities.join(", ")
                );
            }
        }
        PaletteView::Grouped(groups) => {
            for group in groups {
                println!("{} ({})", group.category_name, group.agents.len());
                for agent in group.agents {
                    println!("  {:<24} {}", agent.agent_name, agent.capabilities.join(", "));
                }
            }
        }
    }
}
