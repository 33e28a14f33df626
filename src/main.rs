use std::{fs, path::PathBuf, sync::Arc};

use actix_web::{App, HttpServer, middleware::Logger, web};
use anyhow::Result;
use assembler::HistoryAssembler;
use cache::HistoryCache;
use clap::{Parser, Subcommand};
use config::Config;
use error::CursError;
use fetcher::BnmFetcher;
use server::AppState;

mod assembler;
mod cache;
mod config;
mod error;
mod exchange_rate;
mod fetcher;
mod parser;
mod server;
mod table;
#[cfg(test)]
mod test_support;
mod val_curs;

/// Official exchange rates of the National Bank of Moldova.
#[derive(Parser)]
#[command(name = "curs", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the dashboard API (default)
    Serve,

    /// Fetch a window once and write the pivoted table as CSV
    Export {
        /// Number of trailing days, today included
        #[arg(short, long, default_value_t = 30)]
        days: i64,

        /// Comma-separated currency codes
        #[arg(short, long)]
        currencies: Option<String>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[actix_web::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(e) = dotenv {
        log::debug!("No .env file loaded: {}", e);
    }

    let cli = Cli::parse();
    let config = Config::load()?;
    log::debug!("Configuration: {:?}", config);

    let fetcher = BnmFetcher::new(config.source_url.clone(), config.fetch_timeout)?;
    let assembler =
        HistoryAssembler::new(Arc::new(fetcher), config.concurrency, config.deadline)
            .with_max_days(config.max_days);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config, assembler).await,
        Commands::Export {
            days,
            currencies,
            output,
        } => export(assembler, days, currencies.as_deref(), output).await,
    }
}

async fn serve(config: Config, assembler: HistoryAssembler) -> Result<()> {
    let state = web::Data::new(AppState {
        cache: HistoryCache::new(assembler, config.cache_ttl),
    });

    log::info!("Serving {} rates on http://{}", config.source_url, config.bind);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .configure(server::configure)
    })
    .bind(config.bind)?
    .run()
    .await?;

    Ok(())
}

async fn export(
    assembler: HistoryAssembler,
    days: i64,
    currencies: Option<&str>,
    output: Option<PathBuf>,
) -> Result<()> {
    assembler.check_window(days)?;

    let codes = table::parse_selection(currencies);
    if codes.is_empty() {
        return Err(CursError::NoSelection.into());
    }

    let history = assembler.assemble(days).await?;
    if history.is_empty() {
        return Err(CursError::NoData.into());
    }

    let csv = table::pivot(&table::filter_codes(&history, &codes)).to_csv()?;
    match output {
        Some(path) => {
            fs::write(&path, csv)?;
            log::info!("Wrote {}", path.display());
        }
        None => print!("{}", String::from_utf8_lossy(&csv)),
    }

    Ok(())
}
