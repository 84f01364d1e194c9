use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{debug, info};

use jason_view_lib::config::{Preferences, Settings};
use jason_view_lib::file::{open_source, open_url, Source, SourceError};
use jason_view_lib::logging::setup_logging;
use jason_view_lib::node::copy_node_value;
use jason_view_lib::relay::{self, RelayState};
use jason_view_lib::{AppState, HttpTransport, NodeKind, NodePath, RenderNode, Retrieved, Retriever};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file (defaults to the per-user config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless JASON_VIEW_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show a JSON file (or stdin) as a tree.
    View {
        /// Input file; `-` or nothing reads stdin.
        file: Option<PathBuf>,
        #[command(flatten)]
        display: DisplayArgs,
    },
    /// Show the JSON currently on the clipboard.
    Paste {
        #[command(flatten)]
        display: DisplayArgs,
    },
    /// Retrieve JSON from a URL, falling back through the relay tiers.
    Fetch {
        url: String,
        /// Relay endpoint to use instead of the configured one.
        #[arg(long = "relay", value_name = "URL", conflicts_with = "no_relay")]
        relay_url: Option<String>,
        /// Skip the first-party relay tier.
        #[arg(long)]
        no_relay: bool,
        #[command(flatten)]
        display: DisplayArgs,
    },
    /// Copy the full value at PATH to the clipboard.
    Copy {
        path: String,
        file: Option<PathBuf>,
    },
    /// Serve the relay endpoint.
    Relay {
        #[arg(long)]
        bind: Option<String>,
    },
    /// Show or change the persisted theme.
    Theme { mode: Option<ThemeMode> },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ThemeMode {
    Dark,
    Light,
    Toggle,
}

#[derive(Debug, Args)]
struct DisplayArgs {
    /// Toggle the node at this path (repeatable, applied in order).
    #[arg(long = "toggle", value_name = "PATH")]
    toggles: Vec<String>,
    /// Expand every container.
    #[arg(long)]
    all: bool,
    /// Print the render tree as JSON.
    #[arg(long)]
    json: bool,
    /// Override the string display length.
    #[arg(long)]
    max_len: Option<usize>,
}

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::load_default_location()?,
    };
    debug!(?settings);
    Ok(settings)
}

fn file_source(file: Option<PathBuf>) -> Source {
    match file {
        Some(p) if p.as_os_str() != "-" => Source::File(p),
        _ => Source::Stdin,
    }
}

fn report_retrieval(retrieved: &Retrieved) {
    eprintln!(
        "retrieved via {}{}",
        retrieved.strategy,
        if retrieved.valid_json { "" } else { " (body is not valid JSON)" }
    );
}

fn show(state: &AppState, display: &DisplayArgs) -> anyhow::Result<()> {
    {
        let mut guard = state.doc.write();
        let Some(doc) = guard.as_mut() else { bail!("No document loaded") };
        if display.all {
            doc.expand_all();
        }
        for raw in &display.toggles {
            let path = NodePath::parse_flat(raw)?;
            doc.toggle(&path);
        }
    }
    let root = state.render(&NodePath::root())?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if display.json {
        serde_json::to_writer_pretty(&mut out, &root)?;
        writeln!(out)?;
    } else {
        print_tree(&mut out, &root, 0)?;
    }
    Ok(())
}

fn print_tree(out: &mut impl Write, node: &RenderNode, depth: usize) -> std::io::Result<()> {
    let indent = "  ".repeat(depth);
    if !node.kind.is_container() {
        return if node.label.is_empty() {
            writeln!(out, "{indent}{}", node.display)
        } else {
            writeln!(out, "{indent}{}: {}", node.label, node.display)
        };
    }

    match (node.has_children, node.expanded) {
        (false, _) => {
            let empty = if node.kind == NodeKind::Object { "{}" } else { "[]" };
            writeln!(out, "{indent}  {} {empty}", node.label)?;
        }
        (true, true) => writeln!(out, "{indent}▼ {}", node.label)?,
        // the root banner already carries the count
        (true, false) if node.path.is_root() => writeln!(out, "{indent}▶ {}", node.label)?,
        (true, false) => writeln!(out, "{indent}▶ {} {}", node.label, node.display)?,
    }

    for child in node.children.iter().flatten() {
        print_tree(out, child, depth + 1)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);
    let mut settings = load_settings(&cli)?;

    match cli.command {
        Command::View { file, display } => {
            if let Some(max) = display.max_len {
                settings.max_display_len = max;
            }
            let state = AppState::new(settings.view_options());
            open_source(&state, &file_source(file))?;
            show(&state, &display)?;
        }
        Command::Paste { display } => {
            if let Some(max) = display.max_len {
                settings.max_display_len = max;
            }
            let state = AppState::new(settings.view_options());
            open_source(&state, &Source::Clipboard)?;
            show(&state, &display)?;
        }
        Command::Fetch { url, relay_url, no_relay, display } => {
            if let Some(max) = display.max_len {
                settings.max_display_len = max;
            }
            let relay_endpoint = if no_relay {
                None
            } else {
                relay_url.as_deref().or(settings.relay_endpoint())
            };
            let transport = Arc::new(HttpTransport::new(settings.timeout())?);
            let retriever = Retriever::standard(transport, relay_endpoint, &settings.third_party, settings.timeout());
            let state = AppState::new(settings.view_options());

            match open_url(&state, &retriever, &url).await {
                Ok((retrieved, _)) => report_retrieval(&retrieved),
                Err(SourceError::Unparsable { retrieved, source }) => {
                    report_retrieval(&retrieved);
                    return Err(source.into());
                }
                Err(e) => return Err(e.into()),
            }
            show(&state, &display)?;
        }
        Command::Copy { path, file } => {
            let state = AppState::new(settings.view_options());
            open_source(&state, &file_source(file))?;
            let path = NodePath::parse_flat(&path)?;
            copy_node_value(&state, &path).map_err(anyhow::Error::msg)?;
            eprintln!("copied `{path}`");
        }
        Command::Relay { bind } => {
            let bind = bind.unwrap_or_else(|| settings.relay_bind.clone());
            let transport = Arc::new(HttpTransport::new(settings.timeout())?);
            info!(%bind, "starting relay");
            relay::serve(&bind, RelayState { transport })
                .await
                .with_context(|| format!("relay on {bind} failed"))?;
        }
        Command::Theme { mode } => {
            let path = Preferences::default_path()?;
            let mut prefs = Preferences::load(&path)?;
            if let Some(mode) = mode {
                prefs.dark_mode = match mode {
                    ThemeMode::Dark => true,
                    ThemeMode::Light => false,
                    ThemeMode::Toggle => !prefs.dark_mode,
                };
                prefs.save(&path)?;
            }
            println!("{}", if prefs.dark_mode { "dark" } else { "light" });
        }
    }

    Ok(())
}
