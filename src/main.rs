use std::sync::Arc;
use std::time::Duration;

use nimbus_core::{AppError, Config};
use nimbus_weather::{
    ingest_payload, ChannelRefreshTrigger, Clock, ExpirationPolicy, FreshnessCache, SqliteStore,
    SystemClock, WeatherError, WeatherWidget,
};

/// How long to wait for current weather before printing what we have
const LOAD_TIMEOUT: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    nimbus_core::init()?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let outcome = match args.as_slice() {
        [] => show().await,
        [command, path] if command == "ingest" => ingest(path),
        _ => {
            eprintln!("Usage: nimbus [ingest <payload.json>]");
            std::process::exit(2);
        }
    };

    if let Err(e) = outcome {
        tracing::error!("{}", e);
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }
    Ok(())
}

fn open_store(config: &Config) -> Result<SqliteStore, AppError> {
    std::fs::create_dir_all(&config.config_dir)?;
    Ok(SqliteStore::new(config.database_path())?)
}

fn service_error(e: WeatherError) -> AppError {
    AppError::Service(e.to_string())
}

/// Cache a fetched provider response, stamped with the configured horizons
fn ingest(path: &str) -> Result<(), AppError> {
    let (config, _validation) = Config::load_validated()?;
    let store = open_store(&config)?;

    let raw = std::fs::read_to_string(path)?;
    let policy = ExpirationPolicy::from_config(&config.weather);
    let record = ingest_payload(&store, &raw, &policy, SystemClock.now_ms())
        .map_err(service_error)?;

    tracing::info!(
        "Cached weather from {} (refresh due at {}, expires at {})",
        path,
        record.fresh_expiration,
        record.hard_expiration
    );
    Ok(())
}

async fn show() -> Result<(), AppError> {
    let (config, _validation) = Config::load_validated()?;
    let store = Arc::new(open_store(&config)?);

    let (trigger, mut refresh_requests) = ChannelRefreshTrigger::new();
    tokio::spawn(async move {
        while let Some(request) = refresh_requests.recv().await {
            // Fetching happens elsewhere; results arrive through `nimbus ingest`.
            tracing::info!(
                "Weather refresh requested at {}; waiting for the fetcher to update the store",
                request.requested_at
            );
        }
    });

    let cache = FreshnessCache::builder(store, Arc::new(trigger))
        .location_permitted(config.weather.location_enabled)
        .build();
    let widget = WeatherWidget::new(cache.clone(), config.weather.temperature_unit.clone());
    cache.initialize().map_err(service_error)?;

    match tokio::time::timeout(LOAD_TIMEOUT, cache.request_load()).await {
        Ok(Ok(())) => tracing::info!("Current weather loaded"),
        Ok(Err(e)) => tracing::warn!("{}", e),
        Err(_) => tracing::info!("No current weather yet"),
    }

    let sun = cache.sun_info(cache.current().as_deref()).await;
    let view = widget.view();

    println!("Nimbus - weather widget");
    println!("  Store:       {}", config.database_path().display());
    println!("  Cache state: {:?}", cache.state());
    println!("  Daytime:     {}", sun.is_day);
    if view.is_empty() {
        println!("  Weather:     (no current data)");
    } else {
        println!("  Icon:        {}", view.icon_class);
        println!("  Conditions:  {}", view.tooltip);
        println!("  Temperature: {}", view.temperature);
    }

    Ok(())
}
