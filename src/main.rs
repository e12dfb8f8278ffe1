use anyhow::Result;
use notice_core::{AppError, Config, NotificationRecord};
use notice_services::{NotificationFeed, StoreClient};
use notice_weather::{NotifierConfig, WeatherClient, WeatherNotifier};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    notice_core::init()?;

    let (config, _) = Config::load_validated().map_err(report)?;

    if !config.weather.enabled {
        tracing::info!("Weather notifications are disabled in config; nothing to do");
        return Ok(());
    }

    let client = WeatherClient::from_settings(&config.weather).map_err(report)?;
    let store = if config.store.persist {
        Some(StoreClient::from_settings(&config.store).map_err(report)?)
    } else {
        None
    };

    let feed = NotificationFeed::new();
    let mut persisting = JoinSet::new();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut notifier = WeatherNotifier::new(client);
    let handle = notifier
        .start(NotifierConfig::from(&config.weather), tx)
        .map_err(report)?;

    tracing::info!("Notice started; press Ctrl-C to stop");

    loop {
        tokio::select! {
            record = rx.recv() => match record {
                Some(record) => deliver(record, &feed, store.as_ref(), &mut persisting),
                None => break,
            },
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    tracing::error!("Failed to listen for Ctrl-C: {}", e);
                }
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    notifier.stop(&handle).map_err(report)?;
    handle.finished().await;

    // The task has exited and dropped its sender; drain what the last cycle emitted.
    while let Some(record) = rx.recv().await {
        deliver(record, &feed, store.as_ref(), &mut persisting);
    }

    while persisting.join_next().await.is_some() {}

    tracing::info!(
        total = feed.len(),
        unread = feed.unread_count(),
        "Notice stopped"
    );
    Ok(())
}

fn deliver(
    record: NotificationRecord,
    feed: &NotificationFeed,
    store: Option<&StoreClient>,
    persisting: &mut JoinSet<()>,
) {
    tracing::info!(
        category = %record.category,
        at = %record.display_time(),
        "{}: {}",
        record.title,
        record.description
    );

    if let Some(store) = store {
        let store = store.clone();
        let to_save = record.clone();
        persisting.spawn(async move {
            if let Err(e) = store.create(&to_save).await {
                tracing::warn!(
                    "Failed to persist notification '{}': {} ({})",
                    to_save.title,
                    e,
                    e.user_message()
                );
            }
        });
    }

    feed.push(record);
}

/// Log the full error and show the user-facing message.
fn report(err: impl Into<AppError>) -> anyhow::Error {
    let err = err.into();
    tracing::error!("{}", err);
    eprintln!("notice: {}", err.user_message());
    err.into()
}
