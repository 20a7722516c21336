//! Dashboard session.
//!
//! A [`Session`] owns the state store and price histories of one dashboard and applies every
//! inbound frame to them. [`Session::run`] drives it from a [`ConnectionManager`] on a single task,
//! so frames are applied strictly in arrival order and each frame is applied completely before the
//! next one is read. Readers observe the result through [`DashboardView`] snapshots published on a
//! `watch` channel.

use crate::{
    config::FeedConfig,
    connection::{ConnectionEvent, ConnectionManager, ConnectionState},
    derive::{
        ActivityBucket, ChangeBar, EstimatedChanges, GainersLosers, MindshareSplit, SocialMetrics,
        TreemapEntry, activity_buckets, change_summary, mindshare_split, rank_gainers_losers,
        social_metrics, treemap_entries,
    },
    error::FeedError,
    history::{DetailHistory, HistoryBuffer, HistoryPoint},
    message::{FeedMessage, FeedRequest},
    store::{SocialStatus, StateStore, symbol_key},
    types::InstrumentSnapshot,
    websocket::Connector,
};
use chrono::{DateTime, Utc};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

/// Format of the "last updated" label
pub const LAST_UPDATED_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// What applying one inbound frame did
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// `crypto_data` merged into the store
    Instruments {
        applied: usize,
        primary_appended: bool,
        detail_appended: bool,
    },
    /// `twitter_data` snapshot stored for `symbol`
    Social { symbol: String },
    /// `twitter_data` error, recorded against the outstanding request if there was one
    SocialError {
        symbol: Option<String>,
        error: String,
    },
    /// Unknown frame type, nothing changed
    Ignored { kind: String },
    /// Frame could not be parsed, nothing changed
    Dropped(FeedError),
}

/// Commands accepted by a running session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Open the detail view of a symbol and request its social data
    Focus(String),
    /// Close the detail view
    Unfocus,
    /// Disconnect and stop the session
    Shutdown,
}

/// Everything a dashboard renders, computed from one consistent state
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DashboardView {
    /// Instruments in first-arrival order
    pub instruments: Vec<InstrumentSnapshot>,
    /// Primary tracked instrument with its live series
    pub primary: Option<SymbolView>,
    /// Focused instrument with its detail series
    pub focused: Option<SymbolView>,
    pub ranking: GainersLosers,
    pub treemap: Vec<TreemapEntry>,
    pub connection: ConnectionState,
    /// Wall-clock time of the last `crypto_data`, formatted with [`LAST_UPDATED_FORMAT`]
    pub last_updated: Option<String>,
}

/// One symbol's instrument data, series and social data
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolView {
    pub symbol: String,
    pub instrument: Option<InstrumentSnapshot>,
    pub series: Vec<HistoryPoint>,
    pub social: SocialStatus,
    pub changes: Option<[ChangeBar; 3]>,
    pub estimates: Option<EstimatedChanges>,
    pub mindshare: Option<MindshareSplit>,
    pub activity: Vec<ActivityBucket>,
    pub social_metrics: Option<SocialMetrics>,
}

#[derive(Debug, Clone)]
pub struct Session {
    primary: String,
    store: StateStore,
    price_history: HistoryBuffer,
    detail: DetailHistory,
    /// Symbol of the outstanding per-instrument social request
    social_request: Option<String>,
    connection: ConnectionState,
}

impl Session {
    pub fn new(config: &FeedConfig) -> Self {
        Self {
            primary: config.primary_symbol().map(symbol_key).unwrap_or_default(),
            store: StateStore::new(),
            price_history: HistoryBuffer::new(config.price_capacity),
            detail: DetailHistory::new(config.detail_capacity),
            social_request: None,
            connection: ConnectionState::Disconnected,
        }
    }

    /// Parse and apply one raw text frame. A frame that fails to parse changes nothing.
    pub fn handle_frame(&mut self, text: &str, received_at: DateTime<Utc>) -> FrameOutcome {
        match FeedMessage::parse(text) {
            Ok(message) => self.apply(message, received_at),
            Err(error) => {
                error!("Failed to parse feed frame: {}", error);
                FrameOutcome::Dropped(error)
            }
        }
    }

    /// Apply one classified frame.
    pub fn apply(&mut self, message: FeedMessage, received_at: DateTime<Utc>) -> FrameOutcome {
        match message {
            FeedMessage::CryptoData(snapshots) => self.apply_instruments(snapshots, received_at),
            FeedMessage::TwitterData(snapshot) => {
                let symbol = symbol_key(&snapshot.symbol);
                if self.social_request.as_deref() == Some(symbol.as_str()) {
                    self.social_request = None;
                }
                debug!(
                    "Received social data for {}: {} posts",
                    symbol, snapshot.total_tweets
                );
                self.store.apply_social(snapshot);
                FrameOutcome::Social { symbol }
            }
            FeedMessage::TwitterError(error) => {
                let symbol = self.social_request.take();
                match &symbol {
                    Some(symbol) => {
                        warn!("Social data request for {} failed: {}", symbol, error);
                        self.store.apply_social_error(symbol, error.clone());
                    }
                    None => warn!("Feed reported a social data error: {}", error),
                }
                FrameOutcome::SocialError { symbol, error }
            }
            FeedMessage::Unrecognised { kind } => {
                debug!("Ignoring frame of unknown type {}", kind);
                FrameOutcome::Ignored { kind }
            }
        }
    }

    fn apply_instruments(
        &mut self,
        snapshots: Vec<InstrumentSnapshot>,
        received_at: DateTime<Utc>,
    ) -> FrameOutcome {
        let mut primary_appended = false;
        let mut detail_appended = false;

        for snapshot in &snapshots {
            let key = symbol_key(&snapshot.symbol);
            if key == self.primary {
                self.price_history.append(received_at, snapshot.current_price);
                primary_appended = true;
            }
            detail_appended |=
                self.detail
                    .observe(&key, snapshot.current_price, &snapshot.sparkline, received_at);
        }

        let applied = self.store.apply_instruments(snapshots, received_at);
        FrameOutcome::Instruments {
            applied,
            primary_appended,
            detail_appended,
        }
    }

    /// Focus the detail view on `symbol` and return the social request to send for it.
    ///
    /// A symbol already in the store seeds its series from the embedded sparkline straight away.
    pub fn focus(&mut self, symbol: &str, now: DateTime<Utc>) -> FeedRequest {
        let key = symbol_key(symbol);
        self.detail.focus(&key);

        if let Some(instrument) = self.store.instrument(&key) {
            self.detail
                .observe(&key, instrument.current_price, &instrument.sparkline, now);
        }

        self.store.mark_social_pending(&key);
        self.social_request = Some(key.clone());
        info!("Focused {}", key);
        FeedRequest::TwitterData { symbol: key }
    }

    pub fn unfocus(&mut self) {
        if let Some(symbol) = self.detail.focused() {
            info!("Unfocused {}", symbol);
        }
        self.detail.unfocus();
        self.social_request = None;
    }

    pub fn focused(&self) -> Option<&str> {
        self.detail.focused()
    }

    /// Social request for the focused symbol, re-armed as outstanding
    fn refocus_request(&mut self) -> Option<FeedRequest> {
        let symbol = self.detail.focused()?.to_string();
        self.social_request = Some(symbol.clone());
        Some(FeedRequest::TwitterData { symbol })
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn price_history(&self) -> &HistoryBuffer {
        &self.price_history
    }

    pub fn detail(&self) -> &DetailHistory {
        &self.detail
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    /// Compute the full dashboard view from the current state.
    pub fn view(&self) -> DashboardView {
        let primary = (!self.primary.is_empty())
            .then(|| self.symbol_view(&self.primary, self.price_history.as_series()));

        let focused = self.detail.focused().map(|symbol| {
            let series = self
                .detail
                .focused_buffer()
                .map(HistoryBuffer::as_series)
                .unwrap_or_default();
            self.symbol_view(symbol, series)
        });

        DashboardView {
            instruments: self.store.instruments().cloned().collect(),
            primary,
            focused,
            ranking: rank_gainers_losers(self.store.instruments()),
            treemap: treemap_entries(self.store.instruments()),
            connection: self.connection,
            last_updated: self.store.last_updated().map(format_last_updated),
        }
    }

    fn symbol_view(&self, symbol: &str, series: Vec<HistoryPoint>) -> SymbolView {
        let instrument = self.store.instrument(symbol);
        let social = self.store.social(symbol);
        let snapshot = social.snapshot();

        SymbolView {
            symbol: symbol.to_string(),
            instrument: instrument.cloned(),
            series,
            social: social.clone(),
            changes: instrument.map(change_summary),
            estimates: instrument.map(EstimatedChanges::from_instrument),
            mindshare: snapshot.map(|social| mindshare_split(social.mindshare)),
            activity: snapshot.map(activity_buckets).unwrap_or_default(),
            social_metrics: snapshot.map(social_metrics),
        }
    }

    /// Drive the session until shutdown.
    ///
    /// Connects through `manager`, applies every frame, executes `commands` and publishes a fresh
    /// [`DashboardView`] after each of them. Histories survive reconnects.
    pub async fn run<C: Connector>(
        mut self,
        mut manager: ConnectionManager<C>,
        mut commands: mpsc::Receiver<SessionCommand>,
        views: watch::Sender<DashboardView>,
    ) {
        manager.start();

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(SessionCommand::Focus(symbol)) => {
                        let request = self.focus(&symbol, Utc::now());
                        send_request(&mut manager, &request).await;
                    }
                    Some(SessionCommand::Unfocus) => self.unfocus(),
                    Some(SessionCommand::Shutdown) | None => {
                        manager.disconnect().await;
                        self.connection = manager.state();
                        views.send_replace(self.view());
                        info!("Session stopped");
                        break;
                    }
                },
                event = manager.next_event() => match event {
                    Some(event) => self.on_connection_event(event, &mut manager).await,
                    None => {
                        debug!("Connection manager has nothing left to do");
                        break;
                    }
                },
            }

            views.send_replace(self.view());
        }
    }

    async fn on_connection_event<C: Connector>(
        &mut self,
        event: ConnectionEvent,
        manager: &mut ConnectionManager<C>,
    ) {
        match event {
            ConnectionEvent::Connecting => debug!("Reconnect timer elapsed, opening feed"),
            ConnectionEvent::Connected => {
                info!("Feed connected");
                if let Some(request) = self.refocus_request() {
                    send_request(manager, &request).await;
                }
            }
            ConnectionEvent::Frame(text) => {
                self.handle_frame(&text, Utc::now());
            }
            ConnectionEvent::Disconnected(reason) if reason.is_transport() => {
                debug!(
                    "Feed disconnected ({}), keeping {} history points",
                    reason,
                    self.price_history.len()
                );
            }
            ConnectionEvent::Disconnected(reason) => {
                error!("Dropped feed connection after a local failure: {}", reason);
            }
        }
        self.connection = manager.state();
    }
}

async fn send_request<C: Connector>(manager: &mut ConnectionManager<C>, request: &FeedRequest) {
    match manager.send(request).await {
        Ok(()) => debug!("Sent {:?}", request),
        Err(error) if error.is_transport() => {
            debug!("Deferred {:?} until the feed reconnects: {}", request, error)
        }
        Err(error) => warn!("Failed to send {:?}: {}", request, error),
    }
}

pub fn format_last_updated(time: DateTime<Utc>) -> String {
    time.format(LAST_UPDATED_FORMAT).to_string()
}

/// Handle to a session running on its own task
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    views: watch::Receiver<DashboardView>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Validate `config` and spawn a session connecting through `connector`.
    pub fn spawn<C>(config: FeedConfig, connector: C) -> Result<Self, FeedError>
    where
        C: Connector + 'static,
    {
        config.validate()?;

        let session = Session::new(&config);
        let manager = ConnectionManager::new(connector, &config);
        let (command_tx, command_rx) = mpsc::channel(config.channel_buffer_size);
        let (view_tx, view_rx) = watch::channel(session.view());

        let task = tokio::spawn(session.run(manager, command_rx, view_tx));

        Ok(Self {
            commands: command_tx,
            views: view_rx,
            task,
        })
    }

    /// Latest published view
    pub fn view(&self) -> DashboardView {
        self.views.borrow().clone()
    }

    /// Receiver notified on every published view
    pub fn views(&self) -> watch::Receiver<DashboardView> {
        self.views.clone()
    }

    pub async fn focus(&self, symbol: impl Into<String>) -> Result<(), FeedError> {
        self.command(SessionCommand::Focus(symbol.into())).await
    }

    pub async fn unfocus(&self) -> Result<(), FeedError> {
        self.command(SessionCommand::Unfocus).await
    }

    /// Disconnect and wait for the session task to finish.
    pub async fn shutdown(self) {
        if self.commands.send(SessionCommand::Shutdown).await.is_err() {
            debug!("Session already stopped");
        }
        if let Err(error) = self.task.await {
            error!("Session task failed: {}", error);
        }
    }

    async fn command(&self, command: SessionCommand) -> Result<(), FeedError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| FeedError::Closed)
    }
}
