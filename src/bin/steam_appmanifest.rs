use std::collections::HashSet;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use steam_appmanifest::app::App;
use steam_appmanifest::community::CommunityHttpClient;
use steam_appmanifest::config::{ConfigLoader, Settings};
use steam_appmanifest::domain::AppId;
use steam_appmanifest::error::AppManifestError;
use steam_appmanifest::output::JsonOutput;
use steam_appmanifest::tui::Tui;

#[derive(Parser)]
#[command(name = "steam-appmanifest")]
#[command(about = "Generate Steam appmanifest files for games owned by a public profile")]
#[command(version, author)]
struct Cli {
    /// Settings file (defaults to steam-appmanifest.json in the config dir)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "List the games owned by a profile as JSON")]
    Games(GamesArgs),
    #[command(about = "Write appmanifest files for owned games")]
    Write(WriteArgs),
}

#[derive(Args)]
struct GamesArgs {
    profile: String,

    #[arg(long)]
    filter: Option<String>,
}

#[derive(Args)]
struct WriteArgs {
    profile: String,

    /// Steam library directory (the steamapps folder)
    #[arg(long)]
    library: Option<String>,

    #[arg(long = "app", value_name = "APP_ID", required_unless_present = "all")]
    apps: Vec<String>,

    /// Select every game that passes --filter
    #[arg(long, conflicts_with = "apps")]
    all: bool,

    #[arg(long)]
    filter: Option<String>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<AppManifestError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &AppManifestError) -> u8 {
    match error {
        AppManifestError::EmptyInput
        | AppManifestError::InvalidLibraryPath(_)
        | AppManifestError::ProfileUnavailable(_) => 2,
        AppManifestError::Network(_) | AppManifestError::Status { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = ConfigLoader::resolve(cli.config.as_deref())?;
    let client = CommunityHttpClient::with_options(&settings.base_url, settings.timeout)?;

    match cli.command {
        Some(Commands::Games(args)) => run_games(args, client, &settings),
        Some(Commands::Write(args)) => run_write(args, client, &settings),
        None => {
            let app = App::new(client, settings.library_path.as_str());
            let mut tui = Tui::new(app, settings.profile.clone());
            tui.run()
        }
    }
}

fn run_games(
    args: GamesArgs,
    client: CommunityHttpClient,
    settings: &Settings,
) -> miette::Result<()> {
    let mut app = App::new(client, settings.library_path.as_str());
    app.refresh(&args.profile, &JsonOutput)?;
    if let Some(filter) = &args.filter {
        app.library_mut().set_filter(filter);
    }
    JsonOutput::print_games(&app.games(&args.profile)).into_diagnostic()?;
    Ok(())
}

fn run_write(
    args: WriteArgs,
    client: CommunityHttpClient,
    settings: &Settings,
) -> miette::Result<()> {
    let library_path = args
        .library
        .clone()
        .unwrap_or_else(|| settings.library_path.to_string());
    let mut app = App::new(client, library_path);
    app.refresh(&args.profile, &JsonOutput)?;
    if let Some(filter) = &args.filter {
        app.library_mut().set_filter(filter);
    }

    if args.all {
        let handles: Vec<_> = app
            .library()
            .visible_records()
            .iter()
            .map(|entry| entry.handle)
            .collect();
        for handle in handles {
            app.library_mut().toggle(handle);
        }
    } else {
        let mut seen = HashSet::new();
        for raw in &args.apps {
            let app_id: AppId = raw.parse()?;
            if !seen.insert(app_id.clone()) {
                continue;
            }
            if !app.library_mut().toggle_app(&app_id) {
                return Err(miette::Report::msg(format!(
                    "app {app_id} is not in the games list of {}",
                    args.profile.trim()
                )));
            }
        }
    }

    let report = app.write_selected(&JsonOutput)?;
    JsonOutput::print_report(&report).into_diagnostic()?;
    Ok(())
}
