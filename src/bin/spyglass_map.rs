use std::fs;
use std::process::ExitCode;
use std::sync::Arc;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use spyglass_mapper::app::{App, GenerateResult, TracingSink};
use spyglass_mapper::config::{ConfigLoader, ResolvedConfig, parse_bind};
use spyglass_mapper::error::MapperError;
use spyglass_mapper::esi::{EsiClient, EsiEndpoints};
use spyglass_mapper::fetch::{FetchClient, HttpTransport};
use spyglass_mapper::layout::DotlanClient;
use spyglass_mapper::output::JsonOutput;
use spyglass_mapper::render::UniformStatus;
use spyglass_mapper::server;
use spyglass_mapper::service::{MapListing, MapService};
use spyglass_mapper::store::MapStore;

#[derive(Parser)]
#[command(name = "spyglass-map")]
#[command(about = "Generate and serve per-region jump maps of New Eden")]
#[command(version)]
struct Cli {
    /// JSON config file (defaults to ./spyglass.json when present)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Directory holding the galaxy snapshot and the maps directory
    #[arg(long, global = true)]
    output_dir: Option<Utf8PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Download the universe and region layouts, then write all maps")]
    Generate(GenerateArgs),
    #[command(about = "Serve the stored maps over HTTP")]
    Serve(ServeArgs),
    #[command(about = "List stored map identifiers")]
    List(ListArgs),
    #[command(about = "Render one stored map to SVG")]
    Render(RenderArgs),
}

#[derive(Args)]
struct GenerateArgs {
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ServeArgs {
    #[arg(long)]
    bind: Option<String>,
}

#[derive(Args)]
struct ListArgs {
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct RenderArgs {
    id: String,

    /// Write the SVG here instead of stdout
    #[arg(long)]
    out: Option<Utf8PathBuf>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(mapper) = report.downcast_ref::<MapperError>() {
            return ExitCode::from(map_exit_code(mapper));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &MapperError) -> u8 {
    match error {
        MapperError::UnknownMapDocument(_)
        | MapperError::MissingGalaxy(_)
        | MapperError::ConfigRead(_) => 2,
        MapperError::RetriesExceeded { .. }
        | MapperError::Transport { .. }
        | MapperError::Decode { .. }
        | MapperError::HttpClient(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ConfigLoader::resolve(cli.config.as_deref())?;
    let root = cli.output_dir.unwrap_or_else(|| Utf8PathBuf::from("."));
    let store = MapStore::with_layout(root, &config.galaxy_file, &config.maps_dir);

    match cli.command {
        Commands::Generate(args) => run_generate(args, store, config),
        Commands::Serve(args) => run_serve(args, store, config),
        Commands::List(args) => run_list(args, store),
        Commands::Render(args) => run_render(args, store),
    }
}

fn run_generate(args: GenerateArgs, store: MapStore, config: ResolvedConfig) -> miette::Result<()> {
    let transport = HttpTransport::new(&config.user_agent, config.request_timeout)?;
    let universe = EsiClient::new(
        FetchClient::new(transport.clone(), config.max_attempts),
        EsiEndpoints::new(&config.esi_base_url),
    );
    let layouts = DotlanClient::new(transport, &config.layout_url_template);
    let app = App::new(store, universe, layouts, config);

    if args.json {
        let result = app.generate(&JsonOutput)?;
        JsonOutput::print_generate(&result).into_diagnostic()?;
    } else {
        let result = app.generate(&TracingSink)?;
        print_generate_summary(&result);
    }
    Ok(())
}

fn run_serve(args: ServeArgs, store: MapStore, config: ResolvedConfig) -> miette::Result<()> {
    let bind = match args.bind {
        Some(bind) => parse_bind(&bind)?,
        None => config.bind,
    };
    let service = MapService::open(store, Arc::new(UniformStatus::default()))?;
    server::serve(service, bind)?;
    Ok(())
}

fn run_list(args: ListArgs, store: MapStore) -> miette::Result<()> {
    let listing = MapListing {
        maps: store.list_maps()?,
    };
    if args.json {
        JsonOutput::print_list(&listing).into_diagnostic()?;
    } else {
        for id in &listing.maps {
            println!("{id}");
        }
    }
    Ok(())
}

fn run_render(args: RenderArgs, store: MapStore) -> miette::Result<()> {
    let service = MapService::open(store, Arc::new(UniformStatus::default()))?;
    let svg = service.render(&args.id)?;
    match args.out {
        Some(path) => fs::write(path.as_std_path(), svg).into_diagnostic()?,
        None => print!("{svg}"),
    }
    Ok(())
}

fn print_generate_summary(result: &GenerateResult) {
    println!("spyglass-map summary");
    println!(
        "  universe: {} regions, {} constellations, {} systems, {} stargates",
        result.regions, result.constellations, result.systems, result.stargates
    );
    if result.dangling_references > 0 {
        println!("  dangling references: {}", result.dangling_references);
    }
    println!("  maps written: {} ({})", result.maps.len(), result.maps_dir);
    if !result.skipped_regions.is_empty() {
        println!("  skipped regions: {}", result.skipped_regions.join(", "));
    }
    println!("  galaxy snapshot: {}", result.galaxy_path);
}
