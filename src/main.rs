//! CLI entry point for `chatscroll`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use chatscroll::config::{self, Config};
use chatscroll::service::{ChatService, ServiceSettings};
use chatscroll::store::RecordStore;

#[derive(Parser)]
#[command(
    name = "chatscroll",
    version,
    about = "Browse very large chat exports without loading them all at once"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Export dialect (ca, en, es, all). Overrides the config file.
    #[arg(long, value_name = "CODE", global = true)]
    dialect: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve a chat export over HTTP
    Serve {
        file: PathBuf,
        /// Attachment directory (defaults to the export's directory)
        #[arg(short, long, value_name = "DIR")]
        attachments: Option<PathBuf>,
        #[arg(long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
        /// Parse on the first request instead of at startup
        #[arg(long)]
        lazy: bool,
    },
    /// Browse a chat export in the terminal
    Browse {
        file: PathBuf,
        /// Attachment directory (defaults to the export's directory)
        #[arg(short, long, value_name = "DIR")]
        attachments: Option<PathBuf>,
    },
    /// Show statistics
    Stats {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Search messages by sender or content
    Search {
        file: PathBuf,
        query: String,
        #[arg(long)]
        json: bool,
    },
    /// Show the effective configuration, or write the default one
    Config {
        /// Write the default configuration file
        #[arg(long)]
        init: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    // The terminal browser owns the screen, so it logs to the file only.
    let to_stderr = !matches!(cli.command, Commands::Browse { .. });
    setup_logging(log_level, &config, to_stderr);

    let dialect = cli.dialect.as_deref();
    match cli.command {
        Commands::Serve {
            file,
            attachments,
            host,
            port,
            lazy,
        } => cmd_serve(&config, dialect, &file, attachments, host, port, lazy),
        Commands::Browse { file, attachments } => {
            cmd_browse(&config, dialect, &file, attachments)
        }
        Commands::Stats { file, json } => cmd_stats(&config, dialect, &file, json),
        Commands::Search { file, query, json } => {
            cmd_search(&config, dialect, &file, &query, json)
        }
        Commands::Config { init } => cmd_config(&config, init),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with optional stderr output and file logging.
fn setup_logging(level: &str, config: &Config, to_stderr: bool) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer =
        to_stderr.then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    let log_path = config::log_file_path(config);
    let file_layer = match (log_path.parent(), log_path.file_name()) {
        (Some(dir), Some(name)) if std::fs::create_dir_all(dir).is_ok() => {
            let file_appender = tracing_appender::rolling::never(dir, name);
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(file_appender),
            )
        }
        _ => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();
}

fn ensure_exists(path: &Path) -> anyhow::Result<()> {
    if !path.is_file() {
        anyhow::bail!("Chat export not found: {}", path.display());
    }
    Ok(())
}

/// Attachment directory: explicit, else the directory holding the export.
fn attachment_root(file: &Path, explicit: Option<PathBuf>) -> Option<PathBuf> {
    explicit.or_else(|| {
        let parent = file.parent()?;
        Some(if parent.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            parent.to_path_buf()
        })
    })
}

fn parse_progress_bar() -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Parsing [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Parse an export with a progress bar.
fn load_store(config: &Config, dialect: Option<&str>, file: &Path) -> anyhow::Result<RecordStore> {
    ensure_exists(file)?;
    let pb = parse_progress_bar()?;
    let store = RecordStore::load(
        file,
        config.parser.dialect(dialect),
        config.parser.timestamp_policy,
        Some(&|current: u64, total: u64| {
            pb.set_length(total);
            pb.set_position(current);
        }),
    )?;
    pb.finish_and_clear();
    Ok(store)
}

fn cmd_serve(
    config: &Config,
    dialect: Option<&str>,
    file: &Path,
    attachments: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    lazy: bool,
) -> anyhow::Result<()> {
    ensure_exists(file)?;
    let root = attachment_root(file, attachments);
    let service = Arc::new(ChatService::new(
        file,
        root,
        ServiceSettings::from_config(config, dialect),
    ));

    if !lazy {
        let pb = parse_progress_bar()?;
        let store = service.load(Some(&|current: u64, total: u64| {
            pb.set_length(total);
            pb.set_position(current);
        }))?;
        pb.finish_and_clear();
        eprintln!("  {} messages loaded", store.len());
    }

    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    eprintln!("  Serving {} on http://{host}:{port}", file.display());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(chatscroll::server::run(service, &host, port))
}

fn cmd_browse(
    config: &Config,
    dialect: Option<&str>,
    file: &Path,
    attachments: Option<PathBuf>,
) -> anyhow::Result<()> {
    ensure_exists(file)?;
    let root = attachment_root(file, attachments);
    let service = Arc::new(ChatService::new(
        file,
        root,
        ServiceSettings::from_config(config, dialect),
    ));
    chatscroll::tui::run_tui(service, &config.viewer)
}

fn cmd_stats(
    config: &Config,
    dialect: Option<&str>,
    file: &Path,
    json: bool,
) -> anyhow::Result<()> {
    let start = Instant::now();
    let store = load_store(config, dialect, file)?;
    let elapsed = start.elapsed();
    let file_size = std::fs::metadata(file)?.len();

    if json {
        print_stats_json(file, file_size, &store, elapsed)
    } else {
        print_stats_table(file, file_size, &store, elapsed);
        Ok(())
    }
}

fn cmd_search(
    config: &Config,
    dialect: Option<&str>,
    file: &Path,
    query: &str,
    json: bool,
) -> anyhow::Result<()> {
    if query.trim().is_empty() {
        anyhow::bail!("Search query is empty");
    }
    let store = load_store(config, dialect, file)?;
    let results: Vec<usize> = chatscroll::viewer::filter::search(store.messages(), query)
        .map(|(i, _)| i)
        .collect();

    if json {
        print_search_results_json(&store, &results)
    } else {
        print_search_results_table(&store, &results);
        Ok(())
    }
}

fn cmd_config(config: &Config, init: bool) -> anyhow::Result<()> {
    if init {
        if let Some(path) = config::config_file_path().filter(|p| p.exists()) {
            anyhow::bail!("Config file already exists: {}", path.display());
        }
        let path = config::save_config(&Config::default())?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    if let Some(path) = config::config_file_path() {
        let state = if path.exists() { "" } else { " (not present, defaults)" };
        println!("# {}{state}", path.display());
    }
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "chatscroll", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

/// Print statistics in a human-readable table.
fn print_stats_table(
    path: &Path,
    file_size: u64,
    store: &RecordStore,
    elapsed: std::time::Duration,
) {
    use humansize::{format_size, BINARY};

    println!();
    println!("  {:<20} {}", "File", path.display());
    println!("  {:<20} {}", "File size", format_size(file_size, BINARY));
    println!("  {:<20} {}", "Messages", store.len());

    if let Some(range) = store.time_range() {
        println!(
            "  {:<20} {} - {}",
            "Time range",
            range.first_timestamp.format("%Y-%m-%d %H:%M"),
            range.last_timestamp.format("%Y-%m-%d %H:%M")
        );
    }

    let system = store
        .messages()
        .iter()
        .filter(|m| m.is_system_message)
        .count();
    let with_att = store
        .messages()
        .iter()
        .filter(|m| m.has_attachments())
        .count();
    println!("  {:<20} {}", "System messages", system);
    println!(
        "  {:<20} {} ({} files)",
        "With attachments",
        with_att,
        store.attachment_count()
    );
    println!("  {:<20} {:.2?}", "Parse time", elapsed);

    let warnings = store.warnings();
    if !warnings.is_empty() {
        println!();
        println!("  Parse warnings: {}", warnings.len());
        for w in warnings.iter().take(10) {
            println!("    {w}");
        }
        if warnings.len() > 10 {
            println!("    ... and {} more", warnings.len() - 10);
        }
    }

    let top = store.top_senders(10);
    if !top.is_empty() {
        println!();
        println!("  Top senders:");
        for (sender, count) in &top {
            println!("    {count:>6}  {sender}");
        }
    }
    println!();
}

/// Print statistics as JSON.
fn print_stats_json(
    path: &Path,
    file_size: u64,
    store: &RecordStore,
    elapsed: std::time::Duration,
) -> anyhow::Result<()> {
    let top: Vec<serde_json::Value> = store
        .top_senders(10)
        .into_iter()
        .map(|(sender, count)| serde_json::json!({ "sender": sender, "count": count }))
        .collect();

    let output = serde_json::json!({
        "file": path.display().to_string(),
        "file_size": file_size,
        "message_count": store.len(),
        "time_range": store.time_range(),
        "attachment_count": store.attachment_count(),
        "parse_time_ms": elapsed.as_millis() as u64,
        "warnings": store.warnings(),
        "top_senders": top,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Print search results as a human-readable table.
fn print_search_results_table(store: &RecordStore, results: &[usize]) {
    println!();
    println!("  {} result(s)", results.len());
    println!();

    if results.is_empty() {
        return;
    }

    println!("  {:<8} {:<17} {:<20} {}", "#", "Date", "Sender", "Message");
    println!("  {}", "-".repeat(98));

    for &idx in results {
        let Some(m) = store.get(idx) else { continue };
        let date = m.timestamp.format("%Y-%m-%d %H:%M").to_string();
        let sender: String = m.sender.chars().take(19).collect();
        let first_line = m.content.lines().next().unwrap_or("");
        let body: String = first_line.chars().take(50).collect();
        println!("  {:<8} {:<17} {:<20} {}", idx, date, sender, body);
    }
    println!();
}

/// Print search results as JSON.
fn print_search_results_json(store: &RecordStore, results: &[usize]) -> anyhow::Result<()> {
    let items: Vec<serde_json::Value> = results
        .iter()
        .filter_map(|&idx| store.get(idx).map(|m| (idx, m)))
        .map(|(idx, m)| {
            serde_json::json!({
                "index": idx,
                "timestamp": m.timestamp,
                "sender": m.sender,
                "content": m.content,
                "attachments": m.attachments,
                "is_system_message": m.is_system_message,
            })
        })
        .collect();

    let output = serde_json::json!({
        "result_count": items.len(),
        "results": items,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
