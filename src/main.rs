//! Command-line host for chapter summaries.
//!
//! The binary only wires things together:
//! - Parse command-line arguments.
//! - Load configuration from `conf/config.toml` (or `--config`).
//! - Open the book, run the summary pipeline and print the outcome.
//! - Cancel the in-flight request on Ctrl-C.

use anyhow::{Context, Result, anyhow, bail};
use chapter_recap::cache::{Bookmark, load_bookmark, save_bookmark};
use chapter_recap::cancellation::CancellationToken;
use chapter_recap::client::SummaryClient;
use chapter_recap::config::{
    AppConfig, DEFAULT_CONFIG_PATH, load_config, save_config, serialize_config,
};
use chapter_recap::document::open_document;
use chapter_recap::error::RecapError;
use chapter_recap::pipeline::summarize_current_chapter;
use chapter_recap::store::SummaryStore;
use std::env;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

const USAGE: &str = "\
Usage: chapter-recap [--config PATH] <command>

Commands:
  toc <book>                              List the detected table of contents
  summarize <book> [--page N] [--no-save] Summarize the chapter containing page N
  history                                 List saved summaries, newest first
  show <record>                           Print a saved summary
  delete <record>                         Remove a saved summary
  config                                  Print the effective configuration
  init                                    Write a default config file";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Toc {
        book: PathBuf,
    },
    Summarize {
        book: PathBuf,
        page: Option<usize>,
        save: bool,
    },
    History,
    Show {
        record: PathBuf,
    },
    Delete {
        record: PathBuf,
    },
    Config,
    Init,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Cli {
    config_path: PathBuf,
    command: Command,
}

fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle) {
        error!("{err:?}");
        match err.downcast_ref::<RecapError>() {
            Some(RecapError::Cancelled) => {
                eprintln!("Cancelled.");
                std::process::exit(130);
            }
            Some(recap) => eprintln!("{}", recap.user_message()),
            None => eprintln!("{err:#}"),
        }
        std::process::exit(1);
    }
}

fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let cli = parse_args(env::args().skip(1))?;
    let config = load_config(&cli.config_path);
    set_log_level(reload_handle, config.log_level.as_filter_str());
    info!(
        config = %cli.config_path.display(),
        level = %config.log_level,
        model = %config.model,
        "Starting chapter-recap"
    );

    match cli.command {
        Command::Toc { book } => print_toc(&book, &config),
        Command::Summarize { book, page, save } => summarize(&book, page, save, &config),
        Command::History => print_history(&config),
        Command::Show { record } => {
            let store = SummaryStore::new(config.summary_dir());
            let record = store.read_record(&record)?;
            println!("Chapter: {}", record.chapter_title);
            println!("Date: {}", record.timestamp);
            println!("Model: {}", record.model);
            println!();
            println!("{}", record.content);
            Ok(())
        }
        Command::Delete { record } => {
            SummaryStore::new(config.summary_dir()).delete(&record)?;
            println!("Deleted {}", record.display());
            Ok(())
        }
        Command::Config => {
            let mut shown = config.clone();
            if shown.has_api_key() {
                shown.api_key = "<set>".to_string();
            }
            print!("{}", serialize_config(&shown)?);
            Ok(())
        }
        Command::Init => {
            if cli.config_path.exists() {
                bail!("Config already exists at {}", cli.config_path.display());
            }
            save_config(&cli.config_path, &AppConfig::default())?;
            println!("Wrote {}", cli.config_path.display());
            Ok(())
        }
    }
}

fn print_toc(book: &Path, config: &AppConfig) -> Result<()> {
    let doc = open_document(book, config)?;
    let toc = doc.toc();
    if toc.is_empty() {
        println!("No table of contents found.");
        return Ok(());
    }
    println!("{} pages", doc.page_count());
    for entry in toc {
        println!(
            "{:>5}  {}{}",
            entry.page,
            "  ".repeat(entry.depth),
            entry.title
        );
    }
    Ok(())
}

fn summarize(book: &Path, page: Option<usize>, save: bool, config: &AppConfig) -> Result<()> {
    if !config.has_api_key() {
        return Err(RecapError::MissingApiKey.into());
    }
    let cache_dir = config.cache_dir();
    let page = match page {
        Some(page) => page,
        None => {
            let page = load_bookmark(&cache_dir, book).map_or(1, |bm| bm.page);
            info!(page, "No --page given, using cached position");
            page
        }
    };

    let doc = open_document(book, config)?;
    let client = SummaryClient::from_config(config)?;
    let store = save.then(|| SummaryStore::new(config.summary_dir()));

    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    if let Err(err) = ctrlc::set_handler(move || handler_token.cancel()) {
        warn!("Failed to install Ctrl-C handler: {err}");
    }

    let summary = summarize_current_chapter(
        doc.as_ref(),
        page,
        config,
        &client,
        store.as_ref(),
        &cancel,
    )
    .with_context(|| format!("Failed to summarize page {page} of {}", book.display()))?;

    save_bookmark(
        &cache_dir,
        book,
        &Bookmark {
            page,
            last_summary: summary.saved_path.clone(),
        },
    );

    let span = &summary.span;
    println!(
        "{} (pages {}-{}, {} in chapter, {} extraction)",
        span.title,
        span.start_page,
        span.end_page,
        span.page_count(),
        summary.strategy
    );
    if summary.truncated {
        println!("Note: the chapter was truncated to fit the input budget.");
    }
    println!();
    println!("{}", summary.response.content);
    println!();
    if let Some(usage) = summary.response.usage {
        println!(
            "Tokens: {} prompt, {} completion, {} total",
            usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
        );
    }
    match (&summary.saved_path, save) {
        (Some(path), _) => println!("Saved to {}", path.display()),
        (None, true) => println!("The summary could not be saved."),
        (None, false) => {}
    }
    Ok(())
}

fn print_history(config: &AppConfig) -> Result<()> {
    let store = SummaryStore::new(config.summary_dir());
    let records = store.list()?;
    if records.is_empty() {
        println!("No saved summaries in {}", store.dir().display());
        return Ok(());
    }
    for record in records {
        let name = record
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        println!("{}  {}  [{}]", record.timestamp, record.chapter_title, name);
    }
    Ok(())
}

fn parse_args<I>(args: I) -> Result<Cli>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter().peekable();
    let mut config_path = PathBuf::from(DEFAULT_CONFIG_PATH);
    if args.peek().is_some_and(|arg| arg == "--config") {
        args.next();
        config_path = args
            .next()
            .map(PathBuf::from)
            .ok_or_else(|| anyhow!("--config needs a path\n\n{USAGE}"))?;
    }

    let name = args.next().ok_or_else(|| anyhow!(USAGE))?;
    let command = match name.as_str() {
        "toc" => Command::Toc {
            book: existing_book(args.next())?,
        },
        "summarize" => {
            let book = existing_book(args.next())?;
            let mut page = None;
            let mut save = true;
            while let Some(flag) = args.next() {
                match flag.as_str() {
                    "--page" => {
                        let raw = args
                            .next()
                            .ok_or_else(|| anyhow!("--page needs a number"))?;
                        let parsed: usize = raw
                            .parse()
                            .with_context(|| format!("Invalid page number '{raw}'"))?;
                        if parsed == 0 {
                            bail!("Pages are numbered from 1");
                        }
                        page = Some(parsed);
                    }
                    "--no-save" => save = false,
                    other => bail!("Unknown option '{other}'\n\n{USAGE}"),
                }
            }
            Command::Summarize { book, page, save }
        }
        "history" => Command::History,
        "show" => Command::Show {
            record: record_arg(args.next())?,
        },
        "delete" => Command::Delete {
            record: record_arg(args.next())?,
        },
        "config" => Command::Config,
        "init" => Command::Init,
        other => bail!("Unknown command '{other}'\n\n{USAGE}"),
    };

    if let Some(extra) = args.next() {
        bail!("Unexpected argument '{extra}'\n\n{USAGE}");
    }
    Ok(Cli {
        config_path,
        command,
    })
}

fn existing_book(arg: Option<String>) -> Result<PathBuf> {
    let path = arg
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("Missing path to book\n\n{USAGE}"))?;
    if !path.exists() {
        return Err(anyhow!("File not found: {}", path.display()));
    }
    Ok(path)
}

fn record_arg(arg: Option<String>) -> Result<PathBuf> {
    arg.map(PathBuf::from)
        .ok_or_else(|| anyhow!("Missing summary file name\n\n{USAGE}"))
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(filter_layer),
        )
        .init();
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    // RUST_LOG wins over the config file.
    if env::var_os("RUST_LOG").is_some() {
        return;
    }
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(err) = handle.modify(|filter| *filter = parsed) {
        warn!(%level, "Failed to update log level from config: {err}");
    }
}
