//! Binary entry point for the graphload CLI.
#![forbid(unsafe_code)]

#[path = "cli/config.rs"]
mod config;
#[path = "cli/ui.rs"]
mod ui;

use std::error::Error;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use graphload::{
    cli::{run_import_with_progress, EdgeImportConfig, ImportConfig, ImportSummary, NodeImportConfig},
    transport::{RecordingTransport, RedisOptions, RedisTransport},
};
use tracing_subscriber::EnvFilter;

use config::{CliConfig, Profile, ProfileUpdate};
use ui::{format_bytes, format_duration, Theme, Ui};

#[derive(Parser, Debug)]
#[command(
    name = "graphload",
    version,
    about = "Bulk-load CSV nodes and edges into a graph with GRAPH.BULK",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for structured responses"
    )]
    format: OutputFormat,

    #[arg(
        long,
        global = true,
        env = "GRAPHLOAD_CONFIG",
        value_name = "FILE",
        help = "CLI config file (defaults to the user config directory)"
    )]
    config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        env = "GRAPHLOAD_PROFILE",
        value_name = "NAME",
        help = "Profile supplying connection defaults"
    )]
    profile: Option<String>,

    #[arg(long, global = true, value_enum, default_value_t = Theme::Auto)]
    theme: Theme,

    #[arg(long, short, global = true, help = "Plain output without icons or spinners")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Default)]
struct ConnectArgs {
    #[arg(long, help = "Server host")]
    host: Option<String>,

    #[arg(long, help = "Server port")]
    port: Option<u16>,

    #[arg(long, help = "ACL user sent with AUTH")]
    username: Option<String>,

    #[arg(long, env = "GRAPHLOAD_PASSWORD", hide_env_values = true, help = "Password sent with AUTH")]
    password: Option<String>,

    #[arg(long, value_name = "MS", help = "Socket read/write timeout")]
    io_timeout_ms: Option<u64>,
}

#[derive(Args, Debug)]
struct ImportCmd {
    #[arg(long, help = "Target graph key (falls back to the profile's graph)")]
    graph: Option<String>,

    #[arg(
        long,
        value_name = "FILE",
        action = ArgAction::Append,
        required = true,
        help = "CSV file containing nodes (repeatable)"
    )]
    nodes: Vec<PathBuf>,

    #[arg(
        long,
        value_name = "FILE",
        action = ArgAction::Append,
        help = "CSV file containing edges (repeatable)"
    )]
    edges: Vec<PathBuf>,

    #[arg(long, default_value = "id", help = "Node id column name")]
    node_id_column: String,

    #[arg(long, help = "Column containing each node's label")]
    node_label_column: Option<String>,

    #[arg(long, value_name = "LABEL", help = "Label for every node (default: file stem)")]
    node_label: Option<String>,

    #[arg(long, value_name = "col1,col2", help = "Explicit node property columns")]
    node_props: Option<String>,

    #[arg(long, default_value = "src", help = "Edge source column name")]
    edge_src_column: String,

    #[arg(long, default_value = "dst", help = "Edge destination column name")]
    edge_dst_column: String,

    #[arg(long, help = "Column containing edge types")]
    edge_type_column: Option<String>,

    #[arg(long, value_name = "TYPE", help = "Type for every edge (default: file stem)")]
    edge_type: Option<String>,

    #[arg(long, value_name = "col1,col2", help = "Explicit edge property columns")]
    edge_props: Option<String>,

    #[arg(long, value_name = "BYTES", help = "Per-command payload ceiling")]
    max_task_bytes: Option<usize>,

    #[arg(long, help = "Encode without connecting; prints what would be sent")]
    dry_run: bool,

    #[arg(long, help = "Delete an existing graph key before loading")]
    replace: bool,

    #[arg(long, help = "Delete the graph key if a bulk command fails")]
    drop_on_failure: bool,

    #[command(flatten)]
    connect: ConnectArgs,
}

#[derive(Subcommand, Debug)]
enum ProfileCmd {
    #[command(about = "List configured profiles")]
    List,
    #[command(about = "Show one profile")]
    Show { name: String },
    #[command(about = "Create or update a profile")]
    Set {
        name: String,
        #[arg(long)]
        graph: Option<String>,
        #[arg(long, value_name = "BYTES")]
        max_task_bytes: Option<usize>,
        #[command(flatten)]
        connect: ConnectArgs,
    },
    #[command(about = "Delete a profile")]
    Delete { name: String },
    #[command(about = "Set or clear the default profile")]
    Default {
        name: Option<String>,
        #[arg(long, conflicts_with = "name")]
        clear: bool,
    },
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Load nodes/edges from CSV files")]
    Import(ImportCmd),
    #[command(subcommand, about = "Manage connection profiles")]
    Profile(ProfileCmd),
    #[command(about = "Print shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() {
    init_tracing();
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("GRAPHLOAD_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let ui = Ui::new(cli.theme, cli.quiet || cli.format == OutputFormat::Json);
    match &cli.command {
        Command::Import(cmd) => {
            let config = CliConfig::load(cli.config.clone())?;
            let profile = config.resolve(cli.profile.as_deref())?;
            run_import_cmd(&cli, cmd, profile, &ui)?;
        }
        Command::Profile(cmd) => {
            let mut config = CliConfig::load(cli.config.clone())?;
            run_profile_cmd(&cli, cmd, &mut config, &ui)?;
        }
        Command::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(*shell, &mut command, "graphload", &mut io::stdout());
        }
    }
    Ok(())
}

fn run_import_cmd(
    cli: &Cli,
    cmd: &ImportCmd,
    profile: Option<&Profile>,
    ui: &Ui,
) -> Result<(), Box<dyn Error>> {
    let import_cfg = build_import_config(cmd, profile)?;
    let label = if cmd.dry_run {
        format!("Encoding {} (dry run)", import_cfg.graph)
    } else {
        format!("Loading {}", import_cfg.graph)
    };
    let task = ui.task(label);
    let progress = |p: graphload::bulk::SendProgress| {
        task.update(format!(
            "task {}/{}, {}",
            p.task + 1,
            p.total,
            format_bytes(p.bytes)
        ));
    };

    let summary = if cmd.dry_run {
        let mut transport = RecordingTransport::new();
        run_import_with_progress(&import_cfg, &mut transport, progress)?
    } else {
        let opts = build_redis_options(&cmd.connect, profile);
        let mut transport = RedisTransport::connect(&opts)?;
        run_import_with_progress(&import_cfg, &mut transport, progress)?
    };
    let elapsed = task.finish();

    emit(cli.format, &summary, || {
        print_import_text(ui, &summary, cmd.dry_run, elapsed)
    })
}

fn run_profile_cmd(
    cli: &Cli,
    cmd: &ProfileCmd,
    config: &mut CliConfig,
    ui: &Ui,
) -> Result<(), Box<dyn Error>> {
    match cmd {
        ProfileCmd::List => {
            let profiles: Vec<&Profile> = config.profiles().collect();
            let default = config.default_profile_name().map(str::to_string);
            emit(cli.format, &profiles, || {
                if profiles.is_empty() {
                    ui.info("No profiles configured");
                }
                ui.list(
                    "Profiles",
                    profiles.iter().map(|p| {
                        if default.as_deref() == Some(p.name.as_str()) {
                            format!("{} (default)", p.name)
                        } else {
                            p.name.clone()
                        }
                    }),
                );
            })?;
        }
        ProfileCmd::Show { name } => {
            let profile = config.resolve(Some(name.as_str()))?.ok_or("profile not found")?;
            emit(cli.format, profile, || print_profile_text(ui, profile))?;
        }
        ProfileCmd::Set {
            name,
            graph,
            max_task_bytes,
            connect,
        } => {
            let update = ProfileUpdate {
                host: connect.host.clone(),
                port: connect.port,
                username: connect.username.clone(),
                password: connect.password.clone(),
                graph: graph.clone(),
                max_task_bytes: *max_task_bytes,
                io_timeout_ms: connect.io_timeout_ms,
            };
            config.upsert_profile(name, update)?;
            let path = config.persist()?;
            ui.success(&format!("Saved profile '{name}' to {}", path.display()));
        }
        ProfileCmd::Delete { name } => {
            config.delete_profile(name)?;
            let path = config.persist()?;
            ui.success(&format!("Deleted profile '{name}' from {}", path.display()));
        }
        ProfileCmd::Default { name, clear } => {
            if *clear {
                config.set_default_profile(None)?;
                config.persist()?;
                ui.success("Cleared default profile");
            } else if let Some(name) = name {
                config.set_default_profile(Some(name.as_str()))?;
                config.persist()?;
                ui.success(&format!("Default profile set to '{name}'"));
            } else {
                match config.default_profile_name() {
                    Some(name) => println!("{name}"),
                    None => ui.info("No default profile"),
                }
            }
        }
    }
    Ok(())
}

fn build_import_config(
    cmd: &ImportCmd,
    profile: Option<&Profile>,
) -> Result<ImportConfig, Box<dyn Error>> {
    if cmd.edge_type.is_some() && cmd.edge_type_column.is_some() {
        return Err("use either --edge-type or --edge-type-column, not both".into());
    }
    if cmd.node_label.is_some() && cmd.node_label_column.is_some() {
        return Err("use either --node-label or --node-label-column, not both".into());
    }
    let graph = cmd
        .graph
        .clone()
        .or_else(|| profile.and_then(|p| p.graph.clone()))
        .ok_or("--graph is required (or set it on a profile)")?;

    let mut cfg = ImportConfig::new(graph);
    if let Some(max) = cmd
        .max_task_bytes
        .or_else(|| profile.and_then(|p| p.max_task_bytes))
    {
        cfg.max_task_bytes = max;
    }
    cfg.replace = cmd.replace;
    cfg.drop_on_failure = cmd.drop_on_failure;
    cfg.nodes = cmd
        .nodes
        .iter()
        .map(|path| NodeImportConfig {
            id_column: cmd.node_id_column.clone(),
            label_column: cmd.node_label_column.clone(),
            static_label: trimmed(&cmd.node_label),
            prop_columns: parse_prop_option(&cmd.node_props),
            ..NodeImportConfig::new(path)
        })
        .collect();
    cfg.edges = cmd
        .edges
        .iter()
        .map(|path| EdgeImportConfig {
            src_column: cmd.edge_src_column.clone(),
            dst_column: cmd.edge_dst_column.clone(),
            type_column: cmd.edge_type_column.clone(),
            static_type: trimmed(&cmd.edge_type),
            prop_columns: parse_prop_option(&cmd.edge_props),
            ..EdgeImportConfig::new(path)
        })
        .collect();
    Ok(cfg)
}

fn build_redis_options(args: &ConnectArgs, profile: Option<&Profile>) -> RedisOptions {
    let mut opts = RedisOptions::default();
    if let Some(host) = args.host.clone().or_else(|| profile.and_then(|p| p.host.clone())) {
        opts.host = host;
    }
    if let Some(port) = args.port.or_else(|| profile.and_then(|p| p.port)) {
        opts.port = port;
    }
    opts.username = args
        .username
        .clone()
        .or_else(|| profile.and_then(|p| p.username.clone()));
    opts.password = args
        .password
        .clone()
        .or_else(|| profile.and_then(|p| p.password.clone()));
    opts.io_timeout = args
        .io_timeout_ms
        .or_else(|| profile.and_then(|p| p.io_timeout_ms))
        .map(Duration::from_millis);
    opts
}

fn trimmed(raw: &Option<String>) -> Option<String> {
    raw.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_prop_option(raw: &Option<String>) -> Option<Vec<String>> {
    raw.as_ref().map(|value| split_list(value, ','))
}

fn split_list(input: &str, delim: char) -> Vec<String> {
    input
        .split(delim)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn emit<T, F>(format: OutputFormat, value: &T, printer: F) -> Result<(), Box<dyn Error>>
where
    T: serde::Serialize + ?Sized,
    F: FnOnce(),
{
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{json}");
        }
        OutputFormat::Text => printer(),
    }
    Ok(())
}

fn print_import_text(ui: &Ui, summary: &ImportSummary, dry_run: bool, elapsed: Duration) {
    let title = if dry_run { "Dry run" } else { "Import" };
    ui.section(
        title,
        [
            ("graph", summary.graph.clone()),
            ("nodes", summary.nodes.to_string()),
            ("edges", summary.edges.to_string()),
            ("duplicate nodes", summary.duplicate_nodes.to_string()),
            ("commands", summary.tasks.to_string()),
            ("payload", format_bytes(summary.bytes)),
            ("elapsed", format_duration(elapsed)),
        ],
    );
    if !dry_run {
        ui.list("Replies", summary.replies.iter().cloned());
    }
    if summary.duplicate_nodes > 0 {
        ui.warn(&format!(
            "{} node rows reused an existing id and were skipped",
            summary.duplicate_nodes
        ));
    }
    ui.success(&format!(
        "{} {} nodes and {} edges",
        if dry_run { "Encoded" } else { "Loaded" },
        summary.nodes,
        summary.edges
    ));
}

fn print_profile_text(ui: &Ui, profile: &Profile) {
    let show = |value: Option<String>| value.unwrap_or_else(|| "-".into());
    ui.section(
        &format!("Profile {}", profile.name),
        [
            ("host", show(profile.host.clone())),
            ("port", show(profile.port.map(|p| p.to_string()))),
            ("username", show(profile.username.clone())),
            (
                "password",
                show(profile.password.as_ref().map(|_| "********".to_string())),
            ),
            ("graph", show(profile.graph.clone())),
            (
                "max task bytes",
                show(profile.max_task_bytes.map(|b| b.to_string())),
            ),
            (
                "io timeout",
                show(profile.io_timeout_ms.map(|ms| format!("{ms}ms"))),
            ),
        ],
    );
}
