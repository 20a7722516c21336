/// Crypto Pulse - real-time sync core of a crypto price & social sentiment dashboard
///
/// Keeps one dashboard in sync with a WebSocket feed pushing instrument snapshots and social
/// snapshots:
/// - Wire protocol for inbound frames and outbound subscriptions
/// - Connection manager with fixed-delay reconnection and subscription replay
/// - State store merging instrument and social data per symbol
/// - Bounded price histories for the live and detail sparklines
/// - Derived views: gainers/losers ranking, treemap, mindshare split, activity buckets
pub mod config;
pub mod connection;
pub mod derive;
pub mod error;
pub mod history;
pub mod message;
pub mod session;
pub mod store;
pub mod types;
pub mod websocket;

// Re-export commonly used types for convenience
pub use config::FeedConfig;
pub use connection::{ConnectionEvent, ConnectionManager, ConnectionState};
pub use error::FeedError;
pub use history::{DetailHistory, HistoryBuffer, HistoryPoint};
pub use message::{FeedMessage, FeedRequest};
pub use session::{DashboardView, FrameOutcome, Session, SessionCommand, SessionHandle, SymbolView};
pub use store::{SocialStatus, StateStore};
pub use types::{FeedTime, InstrumentSnapshot, SocialSnapshot, TopPost};
pub use websocket::{Connector, FeedChannel, WsChannel, WsConnector};
