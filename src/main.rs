mod ui;

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use egui::Vec2;
use log::{error, info, warn};

use tridash::api::{ApiClient, DataScope};
use tridash::auth::{AuthState, FileTokenStore};
use tridash::config::AppConfig;
use tridash::export::{ExportFormat, ExportHistory, ExportJob, run_export};
use tridash::feedback::{FeedbackChart, load_feedback};
use tridash::filters::{FilterInput, SortOrder};
use tridash::i18n::Text;
use tridash::import::preview_users_csv;
use tridash::TridashError;
use tridash::timestamp::to_display_string;
use ui::DashboardApp;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    /// Overrides the API base URL from the config file
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Opens the dashboard window (default)
    Dashboard,
    Login {
        #[arg(short, long)]
        username: String,
        /// Read from stdin when omitted
        #[arg(short, long)]
        password: Option<String>,
    },
    Logout,
    /// Downloads sensor data to files
    Export {
        #[arg(short, long, value_enum, default_value_t = FormatArg::Csv)]
        format: FormatArg,
        /// Export another participant's data (admin only)
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        sensor_id: Option<String>,
        /// Split into one file per this many days
        #[arg(long)]
        split_days: Option<u32>,
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
    /// Registers participants from a CSV file (admin only)
    ImportUsers {
        #[arg(short, long)]
        input: PathBuf,
        /// Only check the file, do not upload
        #[arg(long)]
        dry_run: bool,
    },
    /// Prints a summary of one race's sensor data
    Feedback {
        #[arg(short, long)]
        competition: String,
        #[arg(short, long)]
        offset: Option<u32>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    Csv,
    Json,
    Excel,
}

impl From<FormatArg> for ExportFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Csv => ExportFormat::Csv,
            FormatArg::Json => ExportFormat::Json,
            FormatArg::Excel => ExportFormat::Excel,
        }
    }
}

fn auth_state() -> AuthState {
    match FileTokenStore::new_default() {
        Ok(store) => AuthState::new(store),
        Err(e) => {
            warn!("Session will not be persisted: {}", e);
            AuthState::in_memory()
        }
    }
}

fn runtime() -> Result<tokio::runtime::Runtime, TridashError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| TridashError::RuntimeError { source: e })
}

fn require_session(client: &ApiClient) -> Result<(), TridashError> {
    if client.auth().is_authenticated() {
        Ok(())
    } else {
        Err(TridashError::Unauthorized)
    }
}

fn dashboard(config: AppConfig, client: ApiClient) -> Result<(), TridashError> {
    let mut native_options = eframe::NativeOptions::default();
    native_options.viewport = native_options
        .viewport
        .with_inner_size(Vec2::new(1200., 800.))
        .with_min_inner_size(Vec2::new(800., 500.));

    eframe::run_native(
        "Tridash",
        native_options,
        Box::new(|cc| Ok(Box::new(DashboardApp::new(cc, config, client)?))),
    )
    .expect("could not start app");
    Ok(())
}

fn login(client: &ApiClient, username: &str, password: Option<String>) -> Result<(), TridashError> {
    let password = match password {
        Some(password) => password,
        None => {
            print!("Password: ");
            io::stdout()
                .flush()
                .map_err(|e| TridashError::RuntimeError { source: e })?;
            let mut line = String::new();
            io::stdin()
                .lock()
                .read_line(&mut line)
                .map_err(|e| TridashError::RuntimeError { source: e })?;
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };
    let session = runtime()?.block_on(client.login(username, &password))?;
    println!(
        "Logged in as {}{}",
        session.account.username(),
        if session.account.is_admin() { " (admin)" } else { "" }
    );
    Ok(())
}

fn export(
    client: &ApiClient,
    config: &AppConfig,
    format: ExportFormat,
    user: Option<String>,
    input: FilterInput,
    split_days: Option<u32>,
    output: &Path,
) -> Result<(), TridashError> {
    require_session(client)?;
    let job = ExportJob {
        scope: user.map_or(DataScope::Own, DataScope::User),
        filters: input.parse()?,
        order: SortOrder::Asc,
        format,
        split_days,
    };
    let delay = Duration::from_millis(config.export_delay_ms);
    let records = runtime()?.block_on(run_export(client, &job, output, delay, Utc::now()))?;

    match ExportHistory::load_default() {
        Ok(mut history) => {
            for record in &records {
                history.push(record.clone());
            }
            if let Err(e) = history.save() {
                error!("Error while saving export history: {}", e);
            }
        }
        Err(e) => warn!("Export history unavailable: {}", e),
    }
    for record in &records {
        match record.rows {
            Some(rows) => println!("{} ({} rows)", record.path.display(), rows),
            None => println!("{}", record.path.display()),
        }
    }
    Ok(())
}

fn import_users(client: &ApiClient, input: &Path, dry_run: bool) -> Result<(), TridashError> {
    let bytes = std::fs::read(input).map_err(|e| TridashError::CsvImportError { source: e.into() })?;
    let preview = preview_users_csv(&bytes)?;
    println!("{} rows", preview.rows.len());
    if !preview.unknown_columns.is_empty() {
        println!("Ignored columns: {}", preview.unknown_columns.join(", "));
    }
    for problem in &preview.problems {
        println!("line {}: {}", problem.line, problem.reason);
    }
    if !preview.is_uploadable() {
        return Err(TridashError::InvalidUserInput {
            field: input.display().to_string(),
            reason: "fix the listed rows before uploading".to_string(),
        });
    }
    if dry_run {
        return Ok(());
    }

    require_session(client)?;
    let file_name = input
        .file_name()
        .map_or_else(|| "users.csv".to_string(), |n| n.to_string_lossy().into_owned());
    let result = runtime()?.block_on(client.import_users(&file_name, bytes))?;
    println!("Created {}, skipped {}", result.created, result.skipped);
    for error in &result.errors {
        println!("  {}", error);
    }
    Ok(())
}

fn feedback(
    client: &ApiClient,
    config: &AppConfig,
    competition: &str,
    offset: Option<u32>,
) -> Result<(), TridashError> {
    require_session(client)?;
    let data = runtime()?.block_on(load_feedback(client, competition))?;
    let offset = offset.unwrap_or(config.default_offset_minutes);
    let chart = FeedbackChart::build(&data, offset, Utc::now(), config.locale);

    if let Some(competition) = &data.competition {
        println!("{} ({})", competition.name, competition.date);
    }
    let Some(range) = chart.window.range.filter(|_| chart.has_data()) else {
        println!("{}", config.locale.text(Text::NoData));
        return Ok(());
    };
    println!(
        "{} - {}",
        to_display_string(&range.start),
        to_display_string(&range.end)
    );
    for segment in &chart.window.segments {
        println!(
            "  {:<6} {} - {}",
            config.locale.text(segment.kind.label()),
            to_display_string(&segment.start),
            to_display_string(&segment.end)
        );
    }
    for series in &chart.chart.series {
        let values = series.values();
        if values.is_empty() {
            continue;
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        println!(
            "  {:<20} {:>3} points, {:.1} - {:.1}",
            series.label,
            values.len(),
            min,
            max
        );
    }
    Ok(())
}

fn run(cli: Args) -> Result<(), TridashError> {
    let mut config = AppConfig::from_local_file().unwrap_or_default();
    if let Some(api_url) = cli.api_url {
        config.api_base_url = api_url;
    }
    info!("Using API at {}", config.base_url());
    let client = ApiClient::new(config.base_url(), auth_state())?;

    match cli.command.unwrap_or(Commands::Dashboard) {
        Commands::Dashboard => dashboard(config, client),
        Commands::Login { username, password } => login(&client, &username, password),
        Commands::Logout => {
            client.logout();
            println!("Logged out");
            Ok(())
        }
        Commands::Export {
            format,
            user,
            start,
            end,
            sensor_id,
            split_days,
            output,
        } => {
            let input = FilterInput {
                sensor_id: sensor_id.unwrap_or_default(),
                start_date: start.unwrap_or_default(),
                end_date: end.unwrap_or_default(),
                ..Default::default()
            };
            export(
                &client,
                &config,
                format.into(),
                user,
                input,
                split_days,
                &output,
            )
        }
        Commands::ImportUsers { input, dry_run } => import_users(&client, &input, dry_run),
        Commands::Feedback {
            competition,
            offset,
        } => feedback(&client, &config, &competition, offset),
    }
}

fn main() {
    #[cfg(debug_assertions)]
    colog::init();

    let cli = Args::parse();
    ctrlc::set_handler(move || {
        println!("Exiting...");
        std::process::exit(0);
    })
    .expect("Could not set Ctrl-C handler");

    if let Err(e) = run(cli) {
        error!("{}", e);
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
