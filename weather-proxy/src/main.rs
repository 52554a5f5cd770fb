use std::error::Error;

use axum::Router;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use weather_proxy::cache::{CacheConfig, CachedWeatherClient};
use weather_proxy::config::ProxyConfig;
use weather_proxy::envcanada::{EnvCanadaClient, EnvCanadaConfig, MockEnvCanadaClient};
use weather_proxy::web::{AppState, create_router};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        error!(error = %e, "weather proxy stopped");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    let config = ProxyConfig::from_env()?;
    let cache_config = CacheConfig::default();

    let app = build_app(&config, &cache_config).await?;

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!(
        addr = %listener.local_addr()?,
        ttl_secs = cache_config.ttl.as_secs(),
        "weather proxy listening"
    );
    info!("  GET /GetWeather/{{locationCode}} - current conditions");
    info!("  GET /health                      - health check");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the router over either the live upstream or the mock feeds.
async fn build_app(
    config: &ProxyConfig,
    cache_config: &CacheConfig,
) -> Result<Router, Box<dyn Error>> {
    if let Some(dir) = &config.mock_dir {
        let mock = MockEnvCanadaClient::new(dir)?;
        let weather = CachedWeatherClient::new(mock, config.code_scheme, cache_config);
        let scheme = weather.scheme();

        let (servable, rejected) = weather.source().servable_codes(scheme).await;
        warn!(
            dir = %dir.display(),
            scheme = scheme.as_str(),
            codes = ?servable,
            "serving mock feeds; upstream will not be contacted"
        );
        if !rejected.is_empty() {
            warn!(
                scheme = scheme.as_str(),
                codes = ?rejected,
                "mock feeds not reachable under this code scheme; set WEATHER_CODE_SCHEME to serve them"
            );
        }
        return Ok(create_router(AppState::new(weather)));
    }

    let mut upstream = EnvCanadaConfig::new().with_base_url(&config.upstream_base_url);
    if let Some(secs) = config.upstream_timeout_secs {
        upstream = upstream.with_timeout(secs);
    }
    info!(base_url = %upstream.base_url, "using Environment Canada upstream");

    let client = EnvCanadaClient::new(upstream)?;
    let weather = CachedWeatherClient::new(client, config.code_scheme, cache_config);
    info!(scheme = weather.scheme().as_str(), "validating location codes");
    Ok(create_router(AppState::new(weather)))
}
