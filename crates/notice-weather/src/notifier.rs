//! Periodic weather notifier.
//!
//! `start` runs one cycle straight away and then one per interval on a
//! spawned task; `stop` cancels the timer. A cycle already in flight when
//! `stop` is called still finishes and emits. Cycles never overlap: the
//! next tick is only awaited after the previous cycle returns, and missed
//! ticks are skipped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use notice_core::{NotificationRecord, NotificationSink, NotifierError, WeatherSettings};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::alert::derive_weather_alert;
use crate::client::WeatherSource;
use crate::error::WeatherFetchError;
use crate::format::{error_notification, format_weather_notification};
use crate::types::{UnitSystem, WeatherReading};

static NEXT_NOTIFIER_ID: AtomicU64 = AtomicU64::new(1);

/// What to poll and how often.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifierConfig {
    pub location: String,
    pub units: UnitSystem,
    pub interval_minutes: u32,
}

impl NotifierConfig {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            units: UnitSystem::Metric,
            interval_minutes: 60,
        }
    }

    pub fn with_units(mut self, units: UnitSystem) -> Self {
        self.units = units;
        self
    }

    pub fn with_interval_minutes(mut self, minutes: u32) -> Self {
        self.interval_minutes = minutes;
        self
    }

    /// Poll period. A zero interval is treated as one minute.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.interval_minutes.max(1)) * 60)
    }
}

impl From<&WeatherSettings> for NotifierConfig {
    fn from(settings: &WeatherSettings) -> Self {
        Self {
            location: settings.location.clone(),
            units: settings.units,
            interval_minutes: settings.interval_minutes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifierState {
    Idle,
    Running,
}

/// Token for a running timer, returned by [`WeatherNotifier::start`].
///
/// Dropping the handle cancels the timer.
#[derive(Debug)]
pub struct NotifierHandle {
    owner: u64,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl NotifierHandle {
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait for the timer task to exit. Only returns after `stop`, once any
    /// in-flight cycle has emitted.
    pub async fn finished(mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("Weather notifier task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for NotifierHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Polls a [`WeatherSource`] on a timer and pushes records into a sink.
pub struct WeatherNotifier<S> {
    id: u64,
    source: Arc<S>,
    active: Option<CancellationToken>,
}

impl<S: WeatherSource> WeatherNotifier<S> {
    pub fn new(source: S) -> Self {
        Self::from_arc(Arc::new(source))
    }

    pub fn from_arc(source: Arc<S>) -> Self {
        Self {
            id: NEXT_NOTIFIER_ID.fetch_add(1, Ordering::Relaxed),
            source,
            active: None,
        }
    }

    pub fn state(&self) -> NotifierState {
        match &self.active {
            Some(token) if !token.is_cancelled() => NotifierState::Running,
            _ => NotifierState::Idle,
        }
    }

    /// Start polling. The first cycle runs immediately, then every
    /// `config.interval()`. Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// `AlreadyRunning` if a previous start has not been stopped, and
    /// `NoRuntime` outside a tokio runtime.
    pub fn start<K: NotificationSink>(
        &mut self,
        config: NotifierConfig,
        sink: K,
    ) -> Result<NotifierHandle, NotifierError> {
        if self.state() == NotifierState::Running {
            return Err(NotifierError::AlreadyRunning);
        }

        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| NotifierError::NoRuntime)?;

        tracing::info!(
            location = %config.location,
            units = %config.units,
            interval_minutes = config.interval_minutes,
            "Starting weather notifier"
        );

        let cancel = CancellationToken::new();
        let task = runtime.spawn(poll_loop(
            self.source.clone(),
            config,
            sink,
            cancel.clone(),
        ));

        self.active = Some(cancel.clone());
        Ok(NotifierHandle {
            owner: self.id,
            cancel,
            task: Some(task),
        })
    }

    /// Cancel the timer behind `handle`. Stopping an already stopped handle
    /// is a no-op.
    ///
    /// # Errors
    /// `ForeignHandle` if `handle` was issued by another notifier.
    pub fn stop(&mut self, handle: &NotifierHandle) -> Result<(), NotifierError> {
        if handle.owner != self.id {
            return Err(NotifierError::ForeignHandle);
        }

        if !handle.cancel.is_cancelled() {
            handle.cancel.cancel();
            tracing::info!("Weather notifier stopped");
        }

        if self.state() == NotifierState::Idle {
            self.active = None;
        }
        Ok(())
    }
}

async fn poll_loop<S: WeatherSource, K: NotificationSink>(
    source: Arc<S>,
    config: NotifierConfig,
    sink: K,
    cancel: CancellationToken,
) {
    run_cycle(source.as_ref(), &config, &sink).await;

    let period = config.interval();
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => run_cycle(source.as_ref(), &config, &sink).await,
        }
    }

    tracing::debug!("Weather notifier loop exited");
}

/// One fetch, format, emit pass. Failures become a single `system` record.
pub async fn run_cycle<S: WeatherSource, K: NotificationSink>(
    source: &S,
    config: &NotifierConfig,
    sink: &K,
) {
    for record in cycle_records(source, config).await {
        sink.emit(record);
    }
}

async fn cycle_records<S: WeatherSource>(
    source: &S,
    config: &NotifierConfig,
) -> Vec<NotificationRecord> {
    match fetch(source, config).await {
        Ok(reading) => {
            tracing::debug!(
                location = %reading.location,
                code = reading.condition_code,
                temperature = reading.temperature,
                "Weather reading received"
            );
            let mut records = vec![format_weather_notification(&reading)];
            records.extend(derive_weather_alert(&reading));
            records
        }
        Err(e) => {
            tracing::warn!("Weather cycle failed: {}", e);
            vec![error_notification(&e)]
        }
    }
}

async fn fetch<S: WeatherSource>(
    source: &S,
    config: &NotifierConfig,
) -> Result<WeatherReading, WeatherFetchError> {
    let location = config.location.trim();
    if location.is_empty() {
        return Err(WeatherFetchError::InvalidLocation);
    }
    source.fetch_current_conditions(location, config.units).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use notice_core::Category;
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use tokio::sync::mpsc;

    struct FakeSource {
        reading: WeatherReading,
        fail: AtomicBool,
        calls: AtomicUsize,
        latency: Duration,
    }

    impl FakeSource {
        fn new(temperature: f64, code: i32) -> Arc<Self> {
            Self::slow(temperature, code, Duration::ZERO)
        }

        fn slow(temperature: f64, code: i32, latency: Duration) -> Arc<Self> {
            Arc::new(Self {
                reading: WeatherReading {
                    location: "Paris".to_string(),
                    temperature,
                    condition_code: code,
                    description: "clear sky".to_string(),
                    icon: "01d".to_string(),
                    units: UnitSystem::Metric,
                },
                fail: AtomicBool::new(false),
                calls: AtomicUsize::new(0),
                latency,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl WeatherSource for FakeSource {
        async fn fetch_current_conditions(
            &self,
            _location: &str,
            units: UnitSystem,
        ) -> Result<WeatherReading, WeatherFetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.latency.is_zero() {
                time::sleep(self.latency).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(WeatherFetchError::Status { status: 503 });
            }
            Ok(WeatherReading {
                units,
                ..self.reading.clone()
            })
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<NotificationRecord>) -> Vec<NotificationRecord> {
        let mut out = Vec::new();
        while let Ok(record) = rx.try_recv() {
            out.push(record);
        }
        out
    }

    fn paris(minutes: u32) -> NotifierConfig {
        NotifierConfig::new("Paris").with_interval_minutes(minutes)
    }

    #[tokio::test(start_paused = true)]
    async fn test_heat_scenario_emits_weather_then_alert() {
        let source = FakeSource::new(40.0, 800);
        let mut notifier = WeatherNotifier::from_arc(source.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = notifier.start(paris(1), tx).unwrap();
        time::sleep(Duration::from_secs(1)).await;

        let records = drain(&mut rx);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].category, Category::Weather);
        assert_eq!(records[0].title, "Current Weather in Paris");
        assert_eq!(records[0].description, "Clear sky. Temperature: 40°C");
        assert_eq!(records[1].category, Category::WeatherAlert);
        assert_eq!(records[1].title, "Heat Alert for Paris");
        assert_ne!(records[0].id, records[1].id);

        notifier.stop(&handle).unwrap();
        handle.finished().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_follow_interval() {
        let source = FakeSource::new(20.0, 800);
        let mut notifier = WeatherNotifier::from_arc(source.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = notifier.start(paris(1), tx).unwrap();
        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(source.calls(), 1);

        time::sleep(Duration::from_secs(30)).await;
        assert_eq!(source.calls(), 1, "no tick before the interval elapses");

        time::sleep(Duration::from_secs(30)).await;
        assert_eq!(source.calls(), 2);

        time::sleep(Duration::from_secs(120)).await;
        assert_eq!(source.calls(), 4);
        assert_eq!(drain(&mut rx).len(), 4);

        notifier.stop(&handle).unwrap();
        handle.finished().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_before_first_tick_runs_exactly_one_cycle() {
        let source = FakeSource::new(20.0, 800);
        let mut notifier = WeatherNotifier::from_arc(source.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = notifier.start(paris(1), tx).unwrap();
        notifier.stop(&handle).unwrap();
        assert_eq!(notifier.state(), NotifierState::Idle);
        handle.finished().await;

        time::sleep(Duration::from_secs(600)).await;
        assert_eq!(source.calls(), 1);
        let records = drain(&mut rx);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].category, Category::Weather);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_fetch_still_emits_cycle() {
        let source = FakeSource::slow(40.0, 800, Duration::from_secs(5));
        let mut notifier = WeatherNotifier::from_arc(source.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = notifier.start(paris(1), tx).unwrap();
        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(source.calls(), 1);
        assert!(drain(&mut rx).is_empty(), "fetch should still be pending");

        notifier.stop(&handle).unwrap();
        assert_eq!(notifier.state(), NotifierState::Idle);
        handle.finished().await;

        let records = drain(&mut rx);
        let categories: Vec<_> = records.iter().map(|r| r.category).collect();
        assert_eq!(categories, vec![Category::Weather, Category::WeatherAlert]);

        time::sleep(Duration::from_secs(300)).await;
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_cycle_emits_system_record_and_keeps_polling() {
        let source = FakeSource::new(40.0, 800);
        source.fail.store(true, Ordering::SeqCst);
        let mut notifier = WeatherNotifier::from_arc(source.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = notifier.start(paris(1), tx).unwrap();
        time::sleep(Duration::from_secs(1)).await;

        let records = drain(&mut rx);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].category, Category::System);
        assert_eq!(records[0].description, "Weather API error: 503");
        assert_eq!(notifier.state(), NotifierState::Running);

        source.fail.store(false, Ordering::SeqCst);
        time::sleep(Duration::from_secs(60)).await;

        let records = drain(&mut rx);
        let categories: Vec<_> = records.iter().map(|r| r.category).collect();
        assert_eq!(categories, vec![Category::Weather, Category::WeatherAlert]);

        notifier.stop(&handle).unwrap();
        handle.finished().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_location_fails_before_fetch() {
        let source = FakeSource::new(20.0, 800);
        let mut notifier = WeatherNotifier::from_arc(source.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = notifier.start(NotifierConfig::new("   "), tx).unwrap();
        notifier.stop(&handle).unwrap();
        handle.finished().await;

        assert_eq!(source.calls(), 0);
        let records = drain(&mut rx);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].category, Category::System);
        assert_eq!(records[0].description, "Invalid city name");
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_while_running_is_rejected() {
        let source = FakeSource::new(20.0, 800);
        let mut notifier = WeatherNotifier::from_arc(source);
        let (tx, _rx) = mpsc::unbounded_channel();

        let handle = notifier.start(paris(5), tx.clone()).unwrap();
        assert_eq!(notifier.state(), NotifierState::Running);
        assert_eq!(
            notifier.start(paris(5), tx.clone()).unwrap_err(),
            NotifierError::AlreadyRunning
        );

        notifier.stop(&handle).unwrap();
        handle.finished().await;

        let restarted = notifier.start(paris(10), tx).unwrap();
        assert_eq!(notifier.state(), NotifierState::Running);
        notifier.stop(&restarted).unwrap();
        restarted.finished().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent() {
        let mut notifier = WeatherNotifier::from_arc(FakeSource::new(20.0, 800));
        let (tx, _rx) = mpsc::unbounded_channel();

        let handle = notifier.start(paris(1), tx).unwrap();
        notifier.stop(&handle).unwrap();
        notifier.stop(&handle).unwrap();
        assert!(handle.is_stopped());
        assert_eq!(notifier.state(), NotifierState::Idle);
        handle.finished().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_foreign_handle_is_rejected() {
        let mut first = WeatherNotifier::from_arc(FakeSource::new(20.0, 800));
        let mut second = WeatherNotifier::from_arc(FakeSource::new(20.0, 800));
        let (tx, _rx) = mpsc::unbounded_channel();

        let handle = first.start(paris(1), tx).unwrap();
        assert_eq!(second.stop(&handle).unwrap_err(), NotifierError::ForeignHandle);
        assert_eq!(first.state(), NotifierState::Running);

        first.stop(&handle).unwrap();
        handle.finished().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_cancels_timer() {
        let source = FakeSource::new(20.0, 800);
        let mut notifier = WeatherNotifier::from_arc(source.clone());
        let (tx, _rx) = mpsc::unbounded_channel();

        let handle = notifier.start(paris(1), tx).unwrap();
        time::sleep(Duration::from_secs(1)).await;
        drop(handle);

        assert_eq!(notifier.state(), NotifierState::Idle);
        time::sleep(Duration::from_secs(300)).await;
        assert_eq!(source.calls(), 1);
    }

    #[test]
    fn test_start_outside_runtime_fails() {
        let mut notifier = WeatherNotifier::from_arc(FakeSource::new(20.0, 800));
        let (tx, _rx) = mpsc::unbounded_channel();
        assert_eq!(
            notifier.start(paris(1), tx).unwrap_err(),
            NotifierError::NoRuntime
        );
    }

    #[test]
    fn test_config_defaults_and_interval() {
        let config = NotifierConfig::new("Paris");
        assert_eq!(config.units, UnitSystem::Metric);
        assert_eq!(config.interval_minutes, 60);
        assert_eq!(config.interval(), Duration::from_secs(3600));
        assert_eq!(
            config.with_interval_minutes(0).interval(),
            Duration::from_secs(60)
        );
    }

    #[test]
    fn test_config_from_settings() {
        let settings = WeatherSettings {
            location: "Austin".to_string(),
            units: UnitSystem::Imperial,
            interval_minutes: 15,
            ..WeatherSettings::default()
        };
        let config = NotifierConfig::from(&settings);
        assert_eq!(config.location, "Austin");
        assert_eq!(config.units, UnitSystem::Imperial);
        assert_eq!(config.interval_minutes, 15);
    }
}
