//! `trendstore` - CLI for the trendstore service
//!
//! Runs the HTTP server or inspects the configured database directly.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::Context;
use clap::Parser;

use trendstore::cli::{
    Cli, Command, ConfigCommand, HistoryCommand, RecentCommand, ShowCommand,
};
use trendstore::{api, init_logging, AppState, Config, Limit, Storage};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config =
        Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    init_logging(cli.verbosity(), &config.logging);

    match cli.command {
        Command::Serve(serve_cmd) => {
            serve_cmd.apply(&mut config);
            config.validate()?;
            handle_serve(config)
        }
        Command::Keys(keys_cmd) => handle_keys(&config, keys_cmd.json),
        Command::Recent(recent_cmd) => handle_recent(&config, &recent_cmd),
        Command::History(history_cmd) => handle_history(&config, &history_cmd),
        Command::Show(show_cmd) => handle_show(&config, &show_cmd),
        Command::Status(status_cmd) => handle_status(&config, status_cmd.json),
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

fn open_storage(config: &Config) -> anyhow::Result<Storage> {
    let location = config.database_location()?;
    Storage::open_location(&location)
        .with_context(|| format!("failed to open database {location}"))
}

fn handle_serve(config: Config) -> anyhow::Result<()> {
    let storage = open_storage(&config)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(api::serve(AppState::new(storage, config)))?;
    Ok(())
}

fn handle_keys(config: &Config, json: bool) -> anyhow::Result<()> {
    let mut keys = open_storage(config)?.list_keys()?;
    keys.sort();

    if json {
        println!("{}", serde_json::to_string_pretty(&keys)?);
    } else {
        for key in keys {
            println!("{key}");
        }
    }
    Ok(())
}

fn handle_recent(config: &Config, cmd: &RecentCommand) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    let limit = Limit::new(cmd.limit)?;

    if cmd.json {
        let points = storage.recent_window(cmd.key.as_deref(), limit)?;
        println!("{}", serde_json::to_string_pretty(&points)?);
    } else {
        for sample in storage.recent_samples(cmd.key.as_deref(), limit)? {
            let point = sample.to_chart_point();
            println!("{}  {:<24} {}", point.x, sample.key, point.y);
        }
    }
    Ok(())
}

fn handle_history(config: &Config, cmd: &HistoryCommand) -> anyhow::Result<()> {
    let samples = open_storage(config)?.full_history(cmd.key.as_deref())?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&samples)?);
    } else {
        for sample in samples {
            println!(
                "{:>8}  {}  {:<24} {}",
                sample.id,
                trendstore::sample::format_timestamp(&sample.timestamp),
                sample.key,
                sample.value
            );
        }
    }
    Ok(())
}

fn handle_show(config: &Config, cmd: &ShowCommand) -> anyhow::Result<()> {
    let Some(sample) = open_storage(config)?.get(cmd.id)? else {
        anyhow::bail!("no sample with id {}", cmd.id);
    };

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&sample)?);
    } else {
        println!("Id:         {}", sample.id);
        println!("Key:        {}", sample.key);
        println!("Value:      {}", sample.value);
        println!(
            "Timestamp:  {}",
            trendstore::sample::format_timestamp(&sample.timestamp)
        );
    }
    Ok(())
}

fn handle_status(config: &Config, json: bool) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    let stats = storage.stats()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        let format = |ts: Option<chrono::DateTime<chrono::Utc>>| {
            ts.map_or_else(|| "-".to_string(), |ts| trendstore::sample::format_timestamp(&ts))
        };
        println!("trendstore status");
        println!("-----------------");
        println!("Database:      {}", storage.path().display());
        println!("Size:          {} bytes", stats.db_size_bytes);
        println!("Samples:       {}", stats.total_samples);
        println!("Keys:          {}", stats.distinct_keys);
        println!("Oldest:        {}", format(stats.oldest_sample));
        println!("Newest:        {}", format(stats.newest_sample));
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Server]");
                println!("  Host:          {}", config.server.host);
                println!("  Port:          {}", config.server.port);
                println!("  CORS:          {}", config.server.cors_enabled);
                println!();
                println!("[Storage]");
                println!("  Database URL:  {}", config.storage.database_url);
                if let Ok(location) = config.database_location() {
                    println!("  Database:      {location}");
                }
                println!();
                println!("[Logging]");
                println!(
                    "  Filter:        {}",
                    config.logging.filter.as_deref().unwrap_or("(default)")
                );
                println!("  Format:        {:?}", config.logging.format);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
