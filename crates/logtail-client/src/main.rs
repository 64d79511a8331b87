//! `logtail` command-line interface

use anyhow::{bail, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use logtail_client::logging::{self, LogFormat};
use logtail_client::{fetch_index, format_record, index_url, HttpRangeFetcher, TailController, TextCursor};
use logtail_core::{filtered, RoleFilter, TailConfig};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use url::Url;

fn cli() -> Command {
    Command::new("logtail")
        .version(logtail_client::VERSION)
        .about("Tail remote append-only logs over HTTP range requests")
        .subcommand_required(true)
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .global(true)
                .default_value("text")
                .value_parser(["text", "json"])
                .help("Diagnostics format on stderr"),
        )
        .subcommand(
            Command::new("tail")
                .about("Print a log, optionally following new writes")
                .arg(Arg::new("url").required(true).help("Log file URL"))
                .arg(
                    Arg::new("follow")
                        .short('f')
                        .long("follow")
                        .action(ArgAction::SetTrue)
                        .help("Keep polling until interrupted"),
                )
                .arg(
                    Arg::new("offset")
                        .long("offset")
                        .value_parser(value_parser!(u64))
                        .help("Start at this byte offset instead of the end"),
                )
                .arg(
                    Arg::new("chunk-size")
                        .long("chunk-size")
                        .value_parser(value_parser!(u64))
                        .help("Bytes per range request"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("TOML configuration file"),
                ),
        )
        .subcommand(
            Command::new("index")
                .about("List deployment index records")
                .arg(Arg::new("base-url").required(true).help("Cluster base URL"))
                .arg(
                    Arg::new("role")
                        .long("role")
                        .default_value("")
                        .help("Role substring, or '-' for records outside any role"),
                ),
        )
}

fn tail_config(args: &ArgMatches) -> anyhow::Result<TailConfig> {
    let mut config = match args.get_one::<PathBuf>("config") {
        Some(path) => TailConfig::load(path)?,
        None => TailConfig::default(),
    };
    if args.get_flag("follow") {
        config.follow = true;
    }
    if let Some(chunk_size) = args.get_one::<u64>("chunk-size") {
        config.chunk_size = *chunk_size;
    }
    config.validate()?;
    Ok(config)
}

fn write_out(text: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()
}

async fn tail(args: &ArgMatches) -> anyhow::Result<()> {
    let config = tail_config(args)?;
    let url = args
        .get_one::<String>("url")
        .context("url is required")?;
    let url = Url::parse(url).with_context(|| format!("invalid url '{url}'"))?;

    let fetcher = Arc::new(HttpRangeFetcher::from_config(&config)?);
    let follow = config.follow;
    let mut controller = TailController::new(url.as_str(), fetcher, config);
    if let Some(offset) = args.get_one::<u64>("offset") {
        controller = controller.with_offset(*offset);
    }

    let (handle, task) = controller.spawn();
    let mut updates = handle.subscribe();
    let mut cursor = TextCursor::new();

    let outcome = loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let state = updates.borrow_and_update().clone();
                if let Err(e) = write_out(cursor.advance(&state)) {
                    break Err(e.into());
                }
                if state.decode_error {
                    tracing::warn!("log contains invalid utf-8, text withheld");
                }
                if !follow && (!state.loading || state.has_error()) {
                    break match &state.error {
                        Some(error) => Err(anyhow::anyhow!("{} ({})", error.message, error.request)),
                        None => Ok(()),
                    };
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break Ok(());
            }
        }
    };

    handle.cancel();
    task.await?;
    outcome
}

async fn index(args: &ArgMatches) -> anyhow::Result<()> {
    let base = args
        .get_one::<String>("base-url")
        .context("base-url is required")?;
    let base = Url::parse(base).with_context(|| format!("invalid base url '{base}'"))?;
    let url = index_url(&base)?;
    let filter = RoleFilter::parse(args.get_one::<String>("role").map_or("", String::as_str));

    let fetcher = HttpRangeFetcher::from_config(&TailConfig::default())?;
    let records = fetch_index(&fetcher, &url)
        .await
        .with_context(|| format!("fetching {url}"))?;

    let matching = filtered(&records, &filter);
    if matching.is_empty() && !records.is_empty() {
        info!(total = records.len(), "no records match the role filter");
    }
    for record in matching {
        println!("{}", format_record(record));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();

    let format: LogFormat = match matches.get_one::<String>("log-format") {
        Some(format) => format.parse().map_err(anyhow::Error::msg)?,
        None => LogFormat::default(),
    };
    logging::init(None, format)?;

    match matches.subcommand() {
        Some(("tail", args)) => tail(args).await,
        Some(("index", args)) => index(args).await,
        Some((other, _)) => bail!("unknown command '{other}'"),
        None => Ok(()),
    }
}
