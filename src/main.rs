//! PPA Steward CLI
//!
//! Entry point for the `ppa-steward` command-line tool.

use clap::{ArgAction, Parser, Subcommand};
use ppa_catalog::{ChannelRef, ANY_VERSION};
use ppa_steward::archive::{LaunchpadArchive, Session};
use ppa_steward::builds::BuildQuery;
use ppa_steward::channel::EnsureChannelRequest;
use ppa_steward::commands;
use ppa_steward::config::{default_config_path, EffectiveConfig, EnvOverrides, CONFIG_PATH_ENV};
use ppa_steward::version::{MatchMode, SchemeKind};
use ppa_steward::{
    project_name, CommandReport, DputUploader, EngineError, FailureThreshold, Intent, OrderBy,
    ReconcileRequest,
};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
const LOG_ENV: &str = "PPA_STEWARD_LOG";

#[derive(Parser)]
#[command(name = "ppa-steward")]
#[command(about = "Retention and reconciliation for hosted package archives", version)]
struct Cli {
    /// Path to config file (default: ~/.config/ppa-steward/config.toml)
    #[arg(long, short = 'c', global = true, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,

    /// Archive API root, e.g. https://api.launchpad.net/devel
    #[arg(long, global = true)]
    service_root: Option<String>,

    /// Report what would change without changing anything
    #[arg(long, global = true)]
    check: bool,

    /// Output in human-readable format instead of JSON
    #[arg(long, global = true)]
    human: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Archive(ArchiveCommand),

    /// Upload a source .changes file to a PPA
    Upload {
        #[arg(long)]
        source_changes: PathBuf,

        #[arg(long)]
        project: String,

        #[arg(long)]
        ppa: String,
    },

    /// Show the effective configuration (secrets redacted)
    Config,
}

/// Commands that talk to the archive web service
#[derive(Subcommand)]
enum ArchiveCommand {
    /// Ensure a source package is present or absent in a PPA
    SourcePackage {
        /// Project or person owning the PPA
        #[arg(long)]
        project: String,

        /// PPA name
        #[arg(long)]
        ppa: String,

        /// Source package name (or pattern, see --match)
        #[arg(long)]
        name: String,

        /// Version to match; '*' matches any
        #[arg(long, default_value = ANY_VERSION)]
        version: String,

        /// present or absent
        #[arg(long, default_value = "present")]
        ensure: String,

        /// exact, starts_with, ends_with, contains or regex
        #[arg(long = "match", default_value = "exact")]
        match_mode: String,

        /// Source .changes file to upload when the package is missing
        #[arg(long)]
        source_changes: Option<PathBuf>,

        /// any or all: which deletion failures fail the command
        #[arg(long)]
        fail_on: Option<String>,
    },

    /// Delete old publications beyond the retention cap
    Prune {
        #[arg(long)]
        project: String,

        /// PPA name
        #[arg(long)]
        name: String,

        /// Number of newest publications to keep
        #[arg(long, allow_negative_numbers = true)]
        max_sources: Option<i64>,

        /// date or version
        #[arg(long)]
        order_by: Option<String>,

        /// normalized or debian
        #[arg(long)]
        version_scheme: Option<String>,

        /// any or all: which deletion failures fail the command
        #[arg(long)]
        fail_on: Option<String>,
    },

    /// List recent builds of a source package
    BuildRecords {
        #[arg(long)]
        project: String,

        #[arg(long)]
        ppa: String,

        #[arg(long)]
        source_name: String,

        #[arg(long)]
        source_version: Option<String>,

        /// Build identifier (suffix of the build link)
        #[arg(long)]
        build_id: Option<String>,

        /// Window in minutes
        #[arg(long)]
        time_frame: Option<u32>,
    },

    /// Ensure a PPA is present or absent
    Ppa {
        #[arg(long)]
        project: String,

        #[arg(long)]
        name: String,

        /// present or absent
        #[arg(long, default_value = "present")]
        ensure: String,

        #[arg(long)]
        displayname: Option<String>,

        #[arg(long)]
        description: Option<String>,
    },

    /// Show a PPA and its published sources
    PpaInfo {
        #[arg(long)]
        project: String,

        #[arg(long)]
        name: String,
    },

    /// Show a project and its PPAs
    ProjectInfo {
        #[arg(long)]
        project: String,
    },

    /// Search people and teams by name
    UserInfo {
        #[arg(long)]
        name: String,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Archive(command) => command.name(),
            Commands::Upload { .. } => "upload",
            Commands::Config => "config",
        }
    }
}

impl ArchiveCommand {
    fn name(&self) -> &'static str {
        match self {
            ArchiveCommand::SourcePackage { .. } => "source-package",
            ArchiveCommand::Prune { .. } => "prune",
            ArchiveCommand::BuildRecords { .. } => "build-records",
            ArchiveCommand::Ppa { .. } => "ppa",
            ArchiveCommand::PpaInfo { .. } => "ppa-info",
            ArchiveCommand::ProjectInfo { .. } => "project-info",
            ArchiveCommand::UserInfo { .. } => "user-info",
        }
    }

    /// Whether the command mutates the archive outside of --check
    fn mutates(&self) -> bool {
        matches!(
            self,
            ArchiveCommand::SourcePackage { .. }
                | ArchiveCommand::Prune { .. }
                | ArchiveCommand::Ppa { .. }
        )
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match load_config(&cli) {
        Ok(c) => c,
        Err(report) => finish(report, cli.human),
    };

    // Uploads go through the upload tool, which carries its own auth
    let report = match &cli.command {
        Commands::Config => run_config(&config, cli.human),
        Commands::Upload {
            source_changes,
            project,
            ppa,
        } => run_upload(&config, source_changes, project, ppa, cli.check),
        Commands::Archive(command) => {
            let required = command.mutates() && !cli.check;
            match connect(&config, required) {
                Ok(archive) => run_archive_command(&archive, &config, command, cli.check),
                Err(e) => CommandReport::new(command.name()).fail(&e),
            }
        }
    };

    finish(report, cli.human);
}

fn run_archive_command(
    archive: &LaunchpadArchive,
    config: &EffectiveConfig,
    command: &ArchiveCommand,
    check: bool,
) -> CommandReport {
    match command {
        ArchiveCommand::SourcePackage {
            project,
            ppa,
            name,
            version,
            ensure,
            match_mode,
            source_changes,
            ..
        } => run_source_package(
            archive,
            config,
            SourcePackageArgs {
                project,
                ppa,
                name,
                version,
                ensure,
                match_mode,
                source_changes: source_changes.clone(),
            },
            check,
        ),
        ArchiveCommand::Prune { project, name, .. } => {
            run_prune(archive, config, project, name, check)
        }
        ArchiveCommand::BuildRecords {
            project,
            ppa,
            source_name,
            source_version,
            build_id,
            ..
        } => run_build_records(
            archive,
            config,
            project,
            ppa,
            source_name,
            source_version.clone(),
            build_id.clone(),
        ),
        ArchiveCommand::Ppa {
            project,
            name,
            ensure,
            displayname,
            description,
        } => run_ppa(
            archive,
            project,
            name,
            ensure,
            displayname.clone(),
            description.clone(),
            check,
        ),
        ArchiveCommand::PpaInfo { project, name } => {
            commands::ppa_info(archive, &project_name(project), name)
        }
        ArchiveCommand::ProjectInfo { project } => {
            commands::project_info_report(archive, &project_name(project))
        }
        ArchiveCommand::UserInfo { name } => commands::user_info(archive, name),
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Print a report and exit with its status
fn finish(report: CommandReport, human: bool) -> ! {
    if human {
        print!("{}", report.to_human());
    } else {
        match report.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing report: {}", e);
                process::exit(1);
            }
        }
    }
    process::exit(report.exit_code());
}

/// Merge builtin, file, environment and flag layers
fn load_config(cli: &Cli) -> Result<EffectiveConfig, CommandReport> {
    let command = cli.command.name();
    let overrides =
        cli_overrides(cli).map_err(|e| CommandReport::new(command).fail(&e))?;

    let (path, required) = match &cli.config {
        Some(p) => (Some(p.clone()), true),
        None => (default_config_path(), false),
    };
    EffectiveConfig::build(path.as_deref(), required, &EnvOverrides::from_env(), overrides)
        .map_err(|e| CommandReport::new(command).fail_with("config", e.to_string()))
}

/// Config values supplied as flags, validated before anything else runs
fn cli_overrides(cli: &Cli) -> Result<Option<Value>, EngineError> {
    let mut archive = Map::new();
    let mut retention = Map::new();
    let mut builds = Map::new();

    if let Some(root) = &cli.service_root {
        archive.insert("service_root".into(), json!(root));
    }

    match &cli.command {
        Commands::Archive(ArchiveCommand::SourcePackage { fail_on, .. }) => {
            if let Some(raw) = fail_on {
                let threshold: FailureThreshold = raw.parse()?;
                retention.insert("failure_threshold".into(), json!(threshold));
            }
        }
        Commands::Archive(ArchiveCommand::Prune {
            max_sources,
            order_by,
            version_scheme,
            fail_on,
            ..
        }) => {
            if let Some(cap) = max_sources {
                if *cap < 0 {
                    return Err(EngineError::invalid_input(format!(
                        "max-sources must not be negative (got {cap})"
                    )));
                }
                retention.insert("max_sources".into(), json!(cap));
            }
            if let Some(raw) = order_by {
                let order: OrderBy = raw.parse()?;
                retention.insert("order_by".into(), json!(order));
            }
            if let Some(raw) = version_scheme {
                let scheme: SchemeKind = raw.parse()?;
                retention.insert("version_scheme".into(), json!(scheme));
            }
            if let Some(raw) = fail_on {
                let threshold: FailureThreshold = raw.parse()?;
                retention.insert("failure_threshold".into(), json!(threshold));
            }
        }
        Commands::Archive(ArchiveCommand::BuildRecords { time_frame, .. }) => {
            if let Some(minutes) = time_frame {
                builds.insert("time_frame_minutes".into(), json!(minutes));
            }
        }
        _ => {}
    }

    let mut layer = Map::new();
    for (key, table) in [("archive", archive), ("retention", retention), ("builds", builds)] {
        if !table.is_empty() {
            layer.insert(key.into(), Value::Object(table));
        }
    }
    Ok(if layer.is_empty() {
        None
    } else {
        Some(Value::Object(layer))
    })
}

fn connect(config: &EffectiveConfig, required: bool) -> Result<LaunchpadArchive, EngineError> {
    let settings = config.settings();
    let credentials = settings.credentials.resolve()?;
    let session = Session::resolve(&settings.archive.consumer, credentials, required)?;
    tracing::debug!(
        service_root = %settings.archive.service_root,
        authenticated = session.is_authenticated(),
        "connecting"
    );
    Ok(LaunchpadArchive::new(
        &settings.archive.service_root,
        settings.archive.timeout(),
        session,
    )?)
}

fn uploader(config: &EffectiveConfig) -> DputUploader {
    let upload = &config.settings().upload;
    DputUploader::new(&upload.command).with_args(upload.args.clone())
}

struct SourcePackageArgs<'a> {
    project: &'a str,
    ppa: &'a str,
    name: &'a str,
    version: &'a str,
    ensure: &'a str,
    match_mode: &'a str,
    source_changes: Option<PathBuf>,
}

fn run_source_package(
    archive: &LaunchpadArchive,
    config: &EffectiveConfig,
    args: SourcePackageArgs<'_>,
    check: bool,
) -> CommandReport {
    let parsed = args.ensure.parse::<Intent>().and_then(|intent| {
        let mode: MatchMode = args.match_mode.parse()?;
        Ok((intent, mode))
    });
    let (intent, mode) = match parsed {
        Ok(p) => p,
        Err(e) => return CommandReport::new("source-package").fail(&e),
    };

    let mut request = ReconcileRequest::new(ChannelRef::new(args.project, args.ppa), args.name, intent)
        .with_version(args.version)
        .with_match_mode(mode);
    if let Some(path) = args.source_changes {
        request = request.with_upload_manifest(path);
    }
    if check {
        request = request.with_dry_run();
    }

    let threshold = config.settings().retention.failure_threshold;
    commands::source_package(archive, &uploader(config), &request, threshold)
}

fn run_prune(
    archive: &LaunchpadArchive,
    config: &EffectiveConfig,
    project: &str,
    name: &str,
    check: bool,
) -> CommandReport {
    let retention = &config.settings().retention;
    let mut policy = retention.policy();
    if check {
        policy = policy.with_dry_run();
    }
    commands::prune(
        archive,
        &project_name(project),
        name,
        policy,
        retention.failure_threshold,
    )
}

fn run_build_records(
    archive: &LaunchpadArchive,
    config: &EffectiveConfig,
    project: &str,
    ppa: &str,
    source_name: &str,
    source_version: Option<String>,
    build_id: Option<String>,
) -> CommandReport {
    let query = BuildQuery {
        build_id,
        version: source_version,
        window_minutes: config.settings().builds.time_frame_minutes,
    };
    commands::build_records(archive, &ChannelRef::new(project, ppa), source_name, &query)
}

fn run_ppa(
    archive: &LaunchpadArchive,
    project: &str,
    name: &str,
    ensure: &str,
    displayname: Option<String>,
    description: Option<String>,
    check: bool,
) -> CommandReport {
    let intent: Intent = match ensure.parse() {
        Ok(i) => i,
        Err(e) => return CommandReport::new("ppa").fail(&e),
    };
    let mut request = EnsureChannelRequest::new(project_name(project), name, intent);
    if let Some(d) = displayname {
        request = request.with_display_name(d);
    }
    if let Some(d) = description {
        request = request.with_description(d);
    }
    if check {
        request = request.with_dry_run();
    }
    commands::ppa(archive, &request)
}

fn run_upload(
    config: &EffectiveConfig,
    source_changes: &Path,
    project: &str,
    ppa: &str,
    check: bool,
) -> CommandReport {
    commands::upload(
        &uploader(config),
        source_changes,
        &ChannelRef::new(project, ppa),
        check,
    )
}

fn run_config(config: &EffectiveConfig, human: bool) -> ! {
    if human {
        for source in &config.sources {
            match &source.path {
                Some(path) => println!("{:?}: {}", source.origin, path),
                None => println!("{:?}", source.origin),
            }
        }
        match serde_json::to_string_pretty(&config.config) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing config: {}", e);
                process::exit(1);
            }
        }
    } else {
        match config.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing config: {}", e);
                process::exit(1);
            }
        }
    }
    process::exit(0);
}
