//! API Cache - command-line front end
//!
//! Fetches JSON from an API through the persistent response cache, and
//! administers that cache.

use std::ops::Range;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_cache::cache::init_shared;
use api_cache::{ApiProvider, CachePolicy, ClearMethod, Config, FetchMethod, FetchOptions, QueryParams};

#[derive(Debug, Parser)]
#[command(name = "api_cache", version, about = "Fetch API data through a persistent response cache")]
struct Cli {
    /// Base URL endpoints are resolved against (overrides API_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Cache snapshot file (overrides CACHE_PATH)
    #[arg(long, global = true)]
    cache_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch an endpoint and print the JSON response
    Fetch {
        /// Endpoint path appended to the base URL
        endpoint: Option<String>,

        /// Query parameter as name=value (repeatable)
        #[arg(short, long = "query", value_parser = parse_query_pair)]
        query: Vec<(String, String)>,

        /// Send a POST instead of a GET
        #[arg(long)]
        post: bool,

        /// Use the cache with CACHE_DEFAULT_TTL
        #[arg(long)]
        cache: bool,

        /// Use the cache with this TTL in seconds
        #[arg(long)]
        ttl: Option<u64>,

        /// Accepted status codes, e.g. 200..300
        #[arg(long, value_parser = parse_status_range, default_value = "200..300")]
        status_range: Range<u16>,
    },
    /// Remove cached responses
    Clear {
        /// Only remove entries whose TTL has elapsed
        #[arg(long)]
        expired: bool,
    },
    /// Print cache statistics as JSON
    Stats,
}

fn parse_query_pair(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .filter(|(name, _)| !name.is_empty())
        .ok_or_else(|| format!("expected name=value, got `{s}`"))
}

fn parse_status_range(s: &str) -> Result<Range<u16>, String> {
    let (lo, hi) = s
        .split_once("..")
        .ok_or_else(|| format!("expected LO..HI, got `{s}`"))?;
    let lo: u16 = lo.trim().parse().map_err(|e| format!("bad lower bound: {e}"))?;
    let hi: u16 = hi.trim().parse().map_err(|e| format!("bad upper bound: {e}"))?;
    if lo >= hi {
        return Err(format!("empty status range `{s}`"));
    }
    Ok(lo..hi)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout carries only the fetched JSON.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    if let Some(cache_path) = cli.cache_path {
        config.cache_path = cache_path;
    }

    match cli.command {
        Command::Fetch {
            endpoint,
            query,
            post,
            cache,
            ttl,
            status_range,
        } => {
            let provider = ApiProvider::from_config(&config)?;

            let query: QueryParams = query.into_iter().collect();
            let method = if post {
                FetchMethod::Post(query)
            } else {
                FetchMethod::Get(query)
            };
            let policy = match (ttl, cache) {
                (Some(secs), _) => CachePolicy::Persistent(Duration::from_secs(secs)),
                (None, true) => CachePolicy::Persistent(config.default_ttl()),
                (None, false) => CachePolicy::None,
            };
            let options = FetchOptions {
                endpoint,
                method,
                status_range,
                cache: policy,
            };

            let value: serde_json::Value = provider.fetch(options).await?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Command::Clear { expired } => {
            let store = init_shared(&config.cache_path)?;
            let method = if expired {
                ClearMethod::Expired
            } else {
                ClearMethod::All
            };
            let removed = store
                .clear(method)
                .await
                .with_context(|| format!("clearing cache at {}", config.cache_path.display()))?;
            info!("Removed {} cached responses", removed);
        }
        Command::Stats => {
            let store = init_shared(&config.cache_path)?;
            println!("{}", serde_json::to_string_pretty(&store.stats().await)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_cache::provider::DEFAULT_STATUS_RANGE;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_query_pair() {
        assert_eq!(
            parse_query_pair("user=rj").unwrap(),
            ("user".to_string(), "rj".to_string())
        );
        assert_eq!(
            parse_query_pair("q=a=b").unwrap(),
            ("q".to_string(), "a=b".to_string())
        );
        assert!(parse_query_pair("novalue").is_err());
        assert!(parse_query_pair("=x").is_err());
    }

    #[test]
    fn test_parse_status_range() {
        assert_eq!(parse_status_range("200..300").unwrap(), DEFAULT_STATUS_RANGE);
        assert_eq!(parse_status_range("200..500").unwrap(), 200..500);
        assert!(parse_status_range("300..200").is_err());
        assert!(parse_status_range("200").is_err());
    }

    #[test]
    fn test_fetch_args() {
        let cli = Cli::parse_from([
            "api_cache", "fetch", "user", "-q", "id=7", "--ttl", "30", "--post",
        ]);
        match cli.command {
            Command::Fetch {
                endpoint,
                query,
                post,
                ttl,
                status_range,
                ..
            } => {
                assert_eq!(endpoint.as_deref(), Some("user"));
                assert_eq!(query, vec![("id".to_string(), "7".to_string())]);
                assert!(post);
                assert_eq!(ttl, Some(30));
                assert_eq!(status_range, 200..300);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_clear_args() {
        let cli = Cli::parse_from(["api_cache", "--cache-path", "/tmp/c.json", "clear", "--expired"]);
        assert_eq!(cli.cache_path, Some(PathBuf::from("/tmp/c.json")));
        assert!(matches!(cli.command, Command::Clear { expired: true }));
    }
}
