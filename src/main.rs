use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use tickerplot::config::Config;
use tickerplot::db::schema::create_all_tables;
use tickerplot::db::{Catalog, SqliteStore};
use tickerplot::fetch::HttpFetcher;
use tickerplot::import::Importer;
use tickerplot::nse::{resolve_current_symbol, NseFeeds, PageArg};
use tickerplot::telemetry::{init_tracing, Telemetry};

fn main() -> anyhow::Result<()> {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = Config::load(config_path.as_deref()).context("loading configuration")?;

    init_tracing(&config.log)?;
    tracing::info!("Starting tickerplot import...");

    let store = SqliteStore::open(&config.database_path).with_context(|| {
        format!("opening database {}", config.database_path.display())
    })?;
    let telemetry = Telemetry::current();
    let mut catalog = Catalog::new(Arc::new(store), telemetry.clone());
    create_all_tables(&mut catalog)?;

    let fetcher = HttpFetcher::new(&config.http)?;
    let feeds = NseFeeds::new(fetcher, config.feeds.clone(), telemetry);
    let mut importer = Importer::new(feeds, catalog);

    let summary = importer
        .import_all_stocks(PageArg::Null, -1i64)
        .context("importing NSE equity listing")?;
    tracing::info!(
        "Equity listing: {} fetched, {} new",
        summary.fetched,
        summary.inserted
    );

    let changes = importer.feeds().symbol_changes()?;
    let renamed = changes
        .iter()
        .filter(|c| resolve_current_symbol(&changes, &c.previous_symbol) != c.previous_symbol)
        .count();
    tracing::info!(
        "Symbol changes: {} records, {} symbols renamed",
        changes.len(),
        renamed
    );

    Ok(())
}
