//! The debounced request dispatcher.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use geolive_core::{
    DispatchEvent, DispatchStats, DispatcherState, Endpoint, OutputSink, SessionSeq, SessionState,
    ValueSource,
};
use geolive_settings::{GeoliveSettings, SettingsError};
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tracing::Instrument;

use crate::config::DispatchConfig;
use crate::gate::DeliveryGate;
use crate::schedule::Schedule;
use crate::session;
use crate::transport::Connector;
use crate::ws::WsConnector;

#[derive(Default)]
pub(crate) struct Counters {
    triggers: AtomicU64,
    superseded: AtomicU64,
    sessions_opened: AtomicU64,
    delivered: AtomicU64,
    discarded: AtomicU64,
    failures: AtomicU64,
}

impl Counters {
    pub fn opened(&self) {
        let _ = self.sessions_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn delivered(&self) {
        let _ = self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn discarded(&self) {
        let _ = self.discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failed(&self) {
        let _ = self.failures.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> DispatchStats {
        DispatchStats {
            triggers: self.triggers.load(Ordering::Relaxed),
            superseded: self.superseded.load(Ordering::Relaxed),
            sessions_opened: self.sessions_opened.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// State shared between the dispatcher handle, its timer, and its sessions.
pub(crate) struct Shared {
    pub name: String,
    pub endpoint: Endpoint,
    pub sink: Arc<dyn OutputSink>,
    pub connector: Arc<dyn Connector>,
    pub config: DispatchConfig,
    pub gate: DeliveryGate,
    pub counters: Counters,
    source: Arc<dyn ValueSource>,
    schedule: Mutex<Schedule>,
    /// Sessions that have not reached a terminal state.
    sessions: Mutex<BTreeMap<SessionSeq, SessionState>>,
    events: broadcast::Sender<DispatchEvent>,
    state: watch::Sender<DispatcherState>,
}

impl Shared {
    pub fn publish(&self, event: DispatchEvent) {
        let _ = self.events.send(event);
    }

    /// Record that session `seq` entered `state`; terminal states drop it.
    pub fn track_session(&self, seq: SessionSeq, state: SessionState) {
        tracing::trace!(?state, "session state");
        let mut sessions = self.sessions.lock();
        if state.is_terminal() {
            let _ = sessions.remove(&seq);
        } else {
            let _ = sessions.insert(seq, state);
        }
    }

    fn publish_state(&self, schedule: &Schedule) {
        let _ = self.state.send_replace(schedule.state());
    }

    /// Timer body: wait out the quiet window, then dispatch unless superseded.
    async fn fire_after(self: Arc<Self>, window: Duration, seq: SessionSeq, value: String) {
        tokio::time::sleep(window).await;
        {
            let mut schedule = self.schedule.lock();
            if !schedule.fire(seq) {
                return;
            }
            self.publish_state(&schedule);
        }
        self.dispatch(seq, value).await;
    }

    async fn dispatch(&self, seq: SessionSeq, value: String) {
        let span = tracing::info_span!("session", channel = %self.name, seq = seq.get());
        session::run(self, seq, value).instrument(span).await;

        let mut schedule = self.schedule.lock();
        schedule.finish();
        self.publish_state(&schedule);
    }
}

/// Debounces triggers from one input control and dispatches the last value
/// over a fresh session once the quiet window passes.
///
/// Triggers must be issued from within a tokio runtime. Dropping the
/// dispatcher aborts a pending timer; sessions already running finish.
pub struct Dispatcher {
    shared: Arc<Shared>,
}

impl Dispatcher {
    /// Dispatcher over WebSocket with the default config.
    pub fn new(
        name: impl Into<String>,
        endpoint: Endpoint,
        source: Arc<dyn ValueSource>,
        sink: Arc<dyn OutputSink>,
    ) -> Self {
        Self::builder(name, endpoint, source, sink).build()
    }

    /// Start building a dispatcher.
    pub fn builder(
        name: impl Into<String>,
        endpoint: Endpoint,
        source: Arc<dyn ValueSource>,
        sink: Arc<dyn OutputSink>,
    ) -> DispatcherBuilder {
        DispatcherBuilder {
            name: name.into(),
            endpoint,
            source,
            sink,
            connector: None,
            config: DispatchConfig::default(),
        }
    }

    /// Dispatcher for a configured channel, over WebSocket.
    pub fn from_settings(
        settings: &GeoliveSettings,
        channel: &str,
        source: Arc<dyn ValueSource>,
        sink: Arc<dyn OutputSink>,
    ) -> Result<Self, SettingsError> {
        let endpoint = settings.endpoint_for(channel)?;
        let config = DispatchConfig::from_settings(settings, channel)?;
        let mut connector = WsConnector::new();
        if settings.server.connect_timeout_ms > 0 {
            connector = connector
                .with_connect_timeout(Duration::from_millis(settings.server.connect_timeout_ms));
        }
        Ok(Self::builder(channel, endpoint, source, sink)
            .connector(Arc::new(connector))
            .config(config)
            .build())
    }

    /// Read the bound control and schedule a dispatch of its value.
    pub fn notify_input_changed(&self) -> SessionSeq {
        let value = self.shared.source.current_value();
        self.notify_value(value)
    }

    /// Schedule a dispatch of `value`, superseding any pending one.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn notify_value(&self, value: impl Into<String>) -> SessionSeq {
        let value = value.into();
        let shared = &self.shared;
        let _ = shared.counters.triggers.fetch_add(1, Ordering::Relaxed);
        let window = shared.config.quiet_window;

        let mut schedule = shared.schedule.lock();
        let (seq, superseded) = if window.is_zero() {
            let superseded = schedule.cancel();
            let seq = schedule.dispatch_now();
            let runner = Arc::clone(shared);
            let pending = value.clone();
            drop(tokio::spawn(async move {
                runner.dispatch(seq, pending).await;
            }));
            (seq, superseded)
        } else {
            let runner = Arc::clone(shared);
            let pending = value.clone();
            let armed = schedule
                .arm(move |seq| tokio::spawn(runner.fire_after(window, seq, pending)));
            (armed.seq, armed.superseded)
        };
        shared.publish_state(&schedule);
        drop(schedule);

        if let Some(old) = superseded {
            let _ = shared.counters.superseded.fetch_add(1, Ordering::Relaxed);
            shared.publish(DispatchEvent::Superseded { seq: old });
        }
        tracing::debug!(channel = %shared.name, seq = seq.get(), value = %value, "armed");
        shared.publish(DispatchEvent::Armed { seq, value });
        seq
    }

    /// Cancel the pending dispatch without scheduling a new one.
    pub fn cancel_pending(&self) -> bool {
        let cancelled = {
            let mut schedule = self.shared.schedule.lock();
            let cancelled = schedule.cancel();
            self.shared.publish_state(&schedule);
            cancelled
        };
        match cancelled {
            Some(seq) => {
                let _ = self.shared.counters.superseded.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(channel = %self.shared.name, seq = seq.get(), "pending dispatch cancelled");
                self.shared.publish(DispatchEvent::Superseded { seq });
                true
            }
            None => false,
        }
    }

    /// Resolve once no timer is pending and no session is in flight.
    pub async fn wait_idle(&self) {
        let mut rx = self.shared.state.subscribe();
        let _ = rx.wait_for(|state| *state == DispatcherState::Idle).await;
    }

    /// Receive dispatch events from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<DispatchEvent> {
        self.shared.events.subscribe()
    }

    /// Sessions still opening or open, oldest first.
    pub fn sessions(&self) -> Vec<(SessionSeq, SessionState)> {
        self.shared
            .sessions
            .lock()
            .iter()
            .map(|(seq, state)| (*seq, *state))
            .collect()
    }

    /// Counter snapshot.
    pub fn stats(&self) -> DispatchStats {
        self.shared.counters.snapshot()
    }

    /// Current state.
    pub fn state(&self) -> DispatcherState {
        *self.shared.state.borrow()
    }

    /// Channel name.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Bound endpoint.
    pub fn endpoint(&self) -> &Endpoint {
        &self.shared.endpoint
    }

    /// Bound sink.
    pub fn sink(&self) -> &Arc<dyn OutputSink> {
        &self.shared.sink
    }

    /// Active config.
    pub fn config(&self) -> &DispatchConfig {
        &self.shared.config
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        let mut schedule = self.shared.schedule.lock();
        if schedule.cancel().is_some() {
            self.shared.publish_state(&schedule);
        }
    }
}

/// Builder for [`Dispatcher`].
pub struct DispatcherBuilder {
    name: String,
    endpoint: Endpoint,
    source: Arc<dyn ValueSource>,
    sink: Arc<dyn OutputSink>,
    connector: Option<Arc<dyn Connector>>,
    config: DispatchConfig,
}

impl DispatcherBuilder {
    /// Use `connector` instead of a plain [`WsConnector`].
    #[must_use]
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Use `config` instead of the defaults.
    #[must_use]
    pub fn config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Finish building.
    pub fn build(self) -> Dispatcher {
        let connector = self
            .connector
            .unwrap_or_else(|| Arc::new(WsConnector::new()));
        let (events, _) = broadcast::channel(self.config.event_capacity.max(1));
        let (state, _) = watch::channel(DispatcherState::Idle);

        tracing::info!(
            channel = %self.name,
            endpoint = %self.endpoint,
            sink = self.sink.selector(),
            quiet_window_ms = u64::try_from(self.config.quiet_window.as_millis()).unwrap_or(u64::MAX),
            delivery = %self.config.delivery,
            "dispatcher attached"
        );

        Dispatcher {
            shared: Arc::new(Shared {
                name: self.name,
                endpoint: self.endpoint,
                sink: self.sink,
                connector,
                gate: DeliveryGate::new(self.config.delivery),
                config: self.config,
                counters: Counters::default(),
                source: self.source,
                schedule: Mutex::new(Schedule::default()),
                sessions: Mutex::new(BTreeMap::new()),
                events,
                state,
            }),
        }
    }
}
