//! persona-sync command-line entry point
//!
//! Loads configuration, the persona catalog and the JSON user store, then
//! runs the requested command. Resyncs always use the headless driver.

use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing::{debug, info};

use persona_sync::batch::{BatchEngine, DriverKind, FailurePolicy};
use persona_sync::cli::{Cli, Commands, ConfigSubcommand, PersonaSubcommand};
use persona_sync::config::{self, SyncConfig};
use persona_sync::error::{Error, Result};
use persona_sync::logging;
use persona_sync::persona::{PersonaRegistry, PersonaRoleResolver};
use persona_sync::store::{JsonFileUserStore, UserStore};
use persona_sync::version;

/// Exit code when a resync finished but some users were not saved
const EXIT_SAVE_FAILURES: i32 = 50;

fn main() {
    let cli = Cli::parse();

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprint!("{}", e.format_for_terminal());
            e.exit_code()
        }
    };
    process::exit(code);
}

/// Execute the command and return the process exit code.
fn run(cli: Cli) -> Result<i32> {
    // Light commands skip config-driven logging
    match &cli.command {
        Commands::Version => {
            print!("{}", version::build_info());
            return Ok(0);
        }
        Commands::Config { subcommand } => {
            logging::init_simple(tracing::Level::WARN)?;
            return handle_config_command(&cli, subcommand.clone());
        }
        _ => {}
    }

    let config = load_config(&cli)?;
    let _log_guards = logging::init_logging(&config.logging, cli.verbose, cli.quiet)?;

    let build = version::build_info();
    debug!(version = %build.full_version(), "Starting persona-sync");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Internal(format!("Failed to create runtime: {}", e)))?;

    match cli.command {
        Commands::Resync {
            persona,
            chunk_size,
            halt_on_failure,
            dry_run,
            json,
        } => {
            let opts = ResyncOptions {
                chunk_size,
                halt_on_failure,
                dry_run,
                json,
            };
            runtime.block_on(resync(&config, &persona, opts))
        }
        Commands::Members { persona } => runtime.block_on(members(&config, &persona)),
        Commands::Roles { uid } => roles(&config, uid),
        Commands::Persona { subcommand } => handle_persona_command(&config, subcommand),
        Commands::Version | Commands::Config { .. } => Ok(0),
    }
}

/// Load configuration and apply storage overrides from the command line.
fn load_config(cli: &Cli) -> Result<SyncConfig> {
    let mut config = SyncConfig::load(cli.config.as_deref())?;
    config.override_storage(cli.users_file.as_deref(), cli.personas_file.as_deref());
    Ok(config)
}

fn load_registry(config: &SyncConfig) -> Result<Arc<PersonaRegistry>> {
    Ok(Arc::new(PersonaRegistry::load(&config.personas_file())?))
}

// ─────────────────────────────────────────────────────────────────
// Resync
// ─────────────────────────────────────────────────────────────────

struct ResyncOptions {
    chunk_size: Option<usize>,
    halt_on_failure: bool,
    dry_run: bool,
    json: bool,
}

async fn resync(config: &SyncConfig, persona_id: &str, opts: ResyncOptions) -> Result<i32> {
    let registry = load_registry(config)?;
    let persona = registry.require(persona_id)?.clone();

    let resolver = PersonaRoleResolver::new(registry.clone());
    let store = Arc::new(JsonFileUserStore::open(config.users_file(), Some(resolver))?);

    let mut settings = config.batch.clone();
    if settings.driver != DriverKind::Headless {
        debug!(driver = %settings.driver, "Command-line resync runs headless");
        settings.driver = DriverKind::Headless;
    }
    if let Some(size) = opts.chunk_size {
        settings.chunk_size = size;
    }
    if opts.halt_on_failure {
        settings.failure_policy = FailurePolicy::Halt;
    }

    let engine = BatchEngine::from_settings(store, &settings)?;

    if opts.dry_run {
        let plan = engine.plan(&persona).await?;
        if opts.json {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        } else {
            println!(
                "Persona '{}': {} user(s) in {} chunk(s) of up to {}",
                plan.persona_id(),
                plan.total_users(),
                plan.len(),
                plan.chunk_size()
            );
            for op in plan.operations() {
                let ids: Vec<String> = op.user_ids.iter().map(|id| id.to_string()).collect();
                println!("  chunk {}: {}", op.index + 1, ids.join(" "));
            }
        }
        return Ok(0);
    }

    let report = engine.process(&persona).await?.into_report();
    info!("{}", report.summary());

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report);
    }

    Ok(if report.is_success() { 0 } else { EXIT_SAVE_FAILURES })
}

// ─────────────────────────────────────────────────────────────────
// Read-only commands
// ─────────────────────────────────────────────────────────────────

async fn members(config: &SyncConfig, persona_id: &str) -> Result<i32> {
    let store = JsonFileUserStore::open(config.users_file(), None)?;
    let ids = store.query_user_ids_by_persona(persona_id).await?;

    for uid in ids {
        let name = store.get(uid).map(|u| u.name).unwrap_or_default();
        println!("{}\t{}", uid, name);
    }
    Ok(0)
}

fn roles(config: &SyncConfig, uid: u64) -> Result<i32> {
    let registry = load_registry(config)?;
    let store = JsonFileUserStore::open(config.users_file(), None)?;
    let user = store.get(uid).ok_or(Error::UserNotFound { uid })?;

    let resolver = PersonaRoleResolver::new(registry);
    println!("User {} ({})", user.name, user.uid);
    println!("Personas: {}", user.personas.join(", "));
    println!("Roles:");
    for role in resolver.roles_from_user(&user) {
        println!("  - {}", role);
    }
    Ok(0)
}

fn handle_persona_command(config: &SyncConfig, subcommand: PersonaSubcommand) -> Result<i32> {
    let registry = load_registry(config)?;

    match subcommand {
        PersonaSubcommand::List => {
            for persona in registry.list() {
                println!(
                    "{:<20} {:<24} {}",
                    persona.id(),
                    persona.label(),
                    persona.roles().join(", ")
                );
            }
        }
        PersonaSubcommand::Show { id } => {
            let persona = registry.require(&id)?;
            println!("{}", persona);
            for role in persona.roles() {
                println!("  - {}", role);
            }
        }
    }
    Ok(0)
}

// ─────────────────────────────────────────────────────────────────
// Config
// ─────────────────────────────────────────────────────────────────

fn handle_config_command(cli: &Cli, subcommand: ConfigSubcommand) -> Result<i32> {
    match subcommand {
        ConfigSubcommand::Show => {
            let cfg = load_config(cli)?;
            println!("{}", toml::to_string_pretty(&cfg)?);
        }
        ConfigSubcommand::Init { path, force } => {
            let written = config::init_config(path.as_deref(), force)?;
            println!("Configuration file created: {}", written.display());
        }
        ConfigSubcommand::Validate => {
            load_config(cli)?;
            println!("Configuration is valid.");
        }
    }
    Ok(0)
}
