use anyhow::{bail, Context, Result};
use autolot_core::embed::{EmbedMode, EmbedOptions, Shadow, Theme};
use autolot_core::import::parse_csv_file;
use autolot_core::sync::Notice;
use autolot_core::vin::accept_scanned_vin;
use autolot_core::{
    get_default_config_path, AppConfig, Condition, ErrorKind, FilterUpdate, JsonFileMirror,
    NetworkStatus, NewVehicle, RestClient, Status, StoreFailure, VehiclePatch, VehicleStore,
};
use clap::{Args, Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use uuid::Uuid;

/// AutoLot - offline-first vehicle inventory
#[derive(Parser)]
#[command(name = "autolot")]
#[command(about = "Offline-first vehicle inventory", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Work from the local mirror only
    #[arg(long, global = true)]
    offline: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List vehicles, optionally filtered
    List {
        /// Case-insensitive match on "year make model"
        #[arg(long)]
        search: Option<String>,

        #[arg(long, value_parser = parse_condition)]
        condition: Vec<Condition>,

        #[arg(long, value_parser = parse_status)]
        status: Vec<Status>,

        #[arg(long)]
        min_price: Option<f64>,

        #[arg(long)]
        max_price: Option<f64>,

        #[arg(long)]
        min_year: Option<i32>,

        #[arg(long)]
        max_year: Option<i32>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Add a vehicle
    Add {
        #[arg(long)]
        make: String,

        #[arg(long)]
        model: String,

        #[arg(long)]
        year: i32,

        #[arg(long)]
        price: f64,

        #[arg(long, value_parser = parse_condition, default_value = "new")]
        condition: Condition,

        #[arg(long, value_parser = parse_status, default_value = "available")]
        status: Status,

        #[arg(long, default_value = "")]
        description: String,

        /// Specification entry as KEY=VALUE (repeatable)
        #[arg(long = "spec", value_parser = parse_key_val)]
        specs: Vec<(String, String)>,

        /// Image URL (repeatable)
        #[arg(long = "image")]
        images: Vec<String>,
    },

    /// Update fields of a vehicle
    Update {
        id: Uuid,

        #[command(flatten)]
        fields: PatchArgs,
    },

    /// Delete a vehicle
    Delete { id: Uuid },

    /// Reconcile the local mirror with the remote store now
    Sync,

    /// Insert sample vehicles when the inventory is empty
    Seed,

    /// Import vehicles from a CSV file
    Import { path: PathBuf },

    /// Check a scanned VIN
    Vin { code: String },

    /// Print an iframe snippet embedding the inventory
    Embed {
        #[arg(long, value_parser = parse_mode, default_value = "display")]
        mode: EmbedMode,

        #[arg(long, default_value_t = 800)]
        height: u32,

        #[arg(long, value_parser = parse_theme, default_value = "light")]
        theme: Theme,

        #[arg(long, default_value_t = 8)]
        radius: u32,

        #[arg(long, value_parser = parse_shadow, default_value = "md")]
        shadow: Shadow,

        /// Override the configured embed origin
        #[arg(long)]
        base_url: Option<String>,
    },
}

#[derive(Args)]
struct PatchArgs {
    #[arg(long)]
    make: Option<String>,

    #[arg(long)]
    model: Option<String>,

    #[arg(long)]
    year: Option<i32>,

    #[arg(long)]
    price: Option<f64>,

    #[arg(long, value_parser = parse_condition)]
    condition: Option<Condition>,

    #[arg(long, value_parser = parse_status)]
    status: Option<Status>,

    #[arg(long)]
    description: Option<String>,

    /// Replace all specifications with these KEY=VALUE entries
    #[arg(long = "spec", value_parser = parse_key_val)]
    specs: Vec<(String, String)>,

    /// Replace all images with these URLs
    #[arg(long = "image")]
    images: Vec<String>,
}

impl From<PatchArgs> for VehiclePatch {
    fn from(args: PatchArgs) -> Self {
        Self {
            make: args.make,
            model: args.model,
            year: args.year,
            price: args.price,
            condition: args.condition,
            status: args.status,
            description: args.description,
            specifications: (!args.specs.is_empty()).then(|| args.specs.into_iter().collect()),
            images: (!args.images.is_empty()).then_some(args.images),
        }
    }
}

fn parse_condition(s: &str) -> Result<Condition, String> {
    Condition::parse(s).ok_or_else(|| format!("expected one of: new, used, certified (got {s:?})"))
}

fn parse_status(s: &str) -> Result<Status, String> {
    Status::parse(s).ok_or_else(|| format!("expected one of: available, sold, pending (got {s:?})"))
}

fn parse_mode(s: &str) -> Result<EmbedMode, String> {
    match s {
        "display" => Ok(EmbedMode::Display),
        "edit" => Ok(EmbedMode::Edit),
        _ => Err(format!("expected display or edit (got {s:?})")),
    }
}

fn parse_theme(s: &str) -> Result<Theme, String> {
    match s {
        "light" => Ok(Theme::Light),
        "dark" => Ok(Theme::Dark),
        _ => Err(format!("expected light or dark (got {s:?})")),
    }
}

fn parse_shadow(s: &str) -> Result<Shadow, String> {
    match s {
        "none" => Ok(Shadow::None),
        "sm" => Ok(Shadow::Sm),
        "md" => Ok(Shadow::Md),
        "lg" => Ok(Shadow::Lg),
        _ => Err(format!("expected none, sm, md or lg (got {s:?})")),
    }
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE (got {s:?})"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err("specification key must not be empty".to_string());
    }
    Ok((key.to_string(), value.trim().to_string()))
}

fn print_notices(rx: &mut broadcast::Receiver<Notice>) {
    while let Ok(notice) = rx.try_recv() {
        eprintln!("{}", notice);
    }
}

/// Whether a recorded failure should fail the process. A listing that fell
/// back to the local mirror still printed usable rows.
fn failure_is_fatal(listing: bool, failure: &StoreFailure) -> bool {
    !(listing && failure.kind == ErrorKind::RemoteFailure)
}

fn open_store(config: &AppConfig, offline: bool) -> Result<VehicleStore> {
    let remote = RestClient::from_config(config)?;
    let mirror = JsonFileMirror::new(&config.mirror_dir);
    let network = NetworkStatus::new(!offline);

    info!(
        "Remote {} ({}), mirror {:?}",
        remote.table_url(),
        if offline { "offline" } else { "online" },
        mirror.path()
    );

    Ok(VehicleStore::new(
        Arc::new(remote),
        Arc::new(mirror),
        Arc::new(network),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Notices already reach the user on stderr; keep logs quiet unless asked.
    let directive = if cli.verbose { "debug" } else { "warn" };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let config_path = cli.config.clone().unwrap_or_else(get_default_config_path);
    let config = AppConfig::load_or_default(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    // Commands that never touch the inventory.
    match &cli.command {
        Commands::Vin { code } => {
            match accept_scanned_vin(code) {
                Some(vin) => println!("{}", vin),
                None => bail!("Not a 17-character VIN: {:?}", code.trim()),
            }
            return Ok(());
        }
        Commands::Embed {
            mode,
            height,
            theme,
            radius,
            shadow,
            base_url,
        } => {
            let options = EmbedOptions {
                mode: *mode,
                height: *height,
                theme: *theme,
                border_radius: *radius,
                shadow: *shadow,
                ..EmbedOptions::new(base_url.as_deref().unwrap_or(&config.embed_base_url))
            };
            println!("{}", options.generate());
            return Ok(());
        }
        _ => {}
    }

    let store = open_store(&config, cli.offline)?;
    let mut notices = store.subscribe_notices();
    let listing = matches!(cli.command, Commands::List { .. });

    match cli.command {
        Commands::List {
            search,
            condition,
            status,
            min_price,
            max_price,
            min_year,
            max_year,
            json,
        } => {
            store.fetch().await;
            store
                .set_filters(FilterUpdate {
                    search,
                    condition: Some(condition),
                    status: Some(status),
                    min_price,
                    max_price,
                    min_year,
                    max_year,
                })
                .await;

            let visible = store.visible().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&visible)?);
            } else {
                for v in &visible {
                    println!(
                        "{}  {:<32} {:>12.2}  {:<9} {}",
                        v.id,
                        v.title(),
                        v.price,
                        v.condition,
                        v.status
                    );
                }
                println!("{} of {} vehicles", visible.len(), store.vehicles().await.len());
            }
        }
        Commands::Add {
            make,
            model,
            year,
            price,
            condition,
            status,
            description,
            specs,
            images,
        } => {
            let fields = NewVehicle {
                make,
                model,
                year,
                price,
                condition,
                status,
                description,
                specifications: specs.into_iter().collect::<BTreeMap<_, _>>(),
                images,
            };
            if let Some(vehicle) = store.create(fields).await {
                println!("{}", vehicle.id);
            }
        }
        Commands::Update { id, fields } => {
            let patch = VehiclePatch::from(fields);
            if patch.is_empty() {
                bail!("Nothing to update: pass at least one field flag");
            }
            if let Some(vehicle) = store.update(id, patch).await {
                println!("{}  {}", vehicle.id, vehicle.title());
            }
        }
        Commands::Delete { id } => {
            store.delete(id).await;
        }
        Commands::Sync => {
            if let Some(count) = store.reconcile().await {
                println!("{} vehicles in sync", count);
            }
        }
        Commands::Seed => {
            let count = store.seed_if_empty().await;
            println!("{} sample vehicles inserted", count);
        }
        Commands::Import { path } => {
            let drafts = parse_csv_file(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let report = store.import(drafts).await;
            for skip in &report.skipped {
                eprintln!("line {}: {}", skip.line, skip.reason);
            }
            println!("{} imported, {} skipped", report.imported, report.skipped.len());
            print_notices(&mut notices);
            if !report.skipped.is_empty() {
                bail!("{} rows were not imported", report.skipped.len());
            }
            return Ok(());
        }
        Commands::Vin { .. } | Commands::Embed { .. } => {}
    }

    print_notices(&mut notices);
    if let Some(failure) = store
        .last_error()
        .await
        .filter(|f| failure_is_fatal(listing, f))
    {
        bail!("{:?}: {}", failure.kind, failure.message);
    }
    Ok(())
}
