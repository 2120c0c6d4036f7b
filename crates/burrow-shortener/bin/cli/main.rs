mod cli;

use crate::cli::{Command, LogFormatArg, StorageBackendArg, CLI};
use burrow_core::{ClickMetadata, KvStore};
use burrow_generator::RandomGenerator;
use burrow_shortener::{
    ClickOutcome, RetryPolicy, Shortener, ShortenerService, ShortenerSettings,
};
use burrow_storage::{InMemoryStore, RedisStore, RedisStoreConfig};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CLI::parse();
    init_tracing(config.log_format);

    info!(storage_backend = %config.storage, "starting burrow");

    let settings = ShortenerSettings::builder()
        .allocation_attempts(config.allocation_attempts)
        .click_retry(
            RetryPolicy::builder()
                .max_attempts(config.click_attempts)
                .build(),
        )
        .build();

    let shortener: Arc<dyn Shortener> = match config.storage {
        StorageBackendArg::InMemory => build(InMemoryStore::new(), settings),
        StorageBackendArg::Redis => {
            let url = config
                .redis_url
                .ok_or("redis url is required when storage backend is redis")?;
            let store = RedisStore::connect(
                RedisStoreConfig::builder()
                    .url(url)
                    .key_prefix(config.redis_key_prefix)
                    .build(),
            )
            .await?;
            build(store, settings)
        }
    };

    run(shortener.as_ref(), config.command).await
}

fn init_tracing(format: LogFormatArg) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormatArg::Text => subscriber.init(),
        LogFormatArg::Json => subscriber.json().init(),
    }
}

fn build<S: KvStore>(store: S, settings: ShortenerSettings) -> Arc<dyn Shortener> {
    Arc::new(ShortenerService::with_settings(
        Arc::new(store),
        RandomGenerator::new(),
        settings,
    ))
}

async fn run(shortener: &dyn Shortener, command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Shorten { url, owner } => {
            let code = shortener.create_short_link(&url, &owner).await?;
            println!("{code}");
        }
        Command::Resolve { code } => match shortener.resolve_short_link(&code).await? {
            Some(link) => println!("{}\t{} clicks", link.long_url, link.click_count),
            None => return Err(format!("no link for '{code}'").into()),
        },
        Command::List { owner } => {
            let links = match owner {
                Some(owner) => shortener.list_links_for_owner(&owner).await?,
                None => shortener.list_all_links().await?,
            };
            for link in links {
                println!(
                    "{}\t{}\t{}\t{}",
                    link.short_code, link.owner_id, link.click_count, link.long_url
                );
            }
        }
        Command::Click {
            code,
            ip,
            user_agent,
            country,
        } => {
            let metadata = ClickMetadata {
                ip_address: ip,
                user_agent,
                country,
            };
            match shortener.record_click(&code, Some(metadata)).await? {
                ClickOutcome::Recorded(link) => println!("{}", link.click_count),
                ClickOutcome::Conflict => {
                    return Err(format!("click on '{code}' kept conflicting, try again").into())
                }
                ClickOutcome::NotFound => return Err(format!("no link for '{code}'").into()),
            }
        }
        Command::Clicks { code } => {
            for event in shortener.list_click_events(&code).await? {
                println!(
                    "{}\t{}\t{}\t{}",
                    event.sequence,
                    event.created_at,
                    event.metadata.ip_address.as_deref().unwrap_or("-"),
                    event.metadata.country.as_deref().unwrap_or("-"),
                );
            }
        }
        Command::Watch { code, count } => {
            let mut watch = shortener.subscribe_to_link_updates(&code).await?;
            info!(code = %watch.short_code(), "waiting for updates");
            let mut seen = 0;
            while count.is_none_or(|limit| seen < limit) {
                let Some(update) = watch.next().await else {
                    break;
                };
                let link = update?;
                println!("{}\t{} clicks", link.short_code, link.click_count);
                seen += 1;
            }
            watch.close();
        }
    }

    Ok(())
}
