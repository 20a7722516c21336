use crypto_pulse::{
    DashboardView, FeedConfig, SessionHandle, SocialStatus, SymbolView, WsConnector,
    websocket::install_crypto_provider,
};
use std::error::Error;
use tracing::{info, warn};

/// Get the symbol to open the detail view for from FOCUS env var (default: none)
fn get_focus() -> Option<String> {
    std::env::var("FOCUS")
        .ok()
        .map(|symbol| symbol.trim().to_uppercase())
        .filter(|symbol| !symbol.is_empty())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    install_crypto_provider();

    // Initialize logging
    init_logging();

    let config = FeedConfig::from_env()?;
    info!(
        "Starting pulse monitor for {} at {}",
        config.symbols.join(","),
        config.url
    );

    let session = SessionHandle::spawn(config, WsConnector)?;

    if let Some(symbol) = get_focus() {
        session.focus(symbol).await?;
    }

    let mut views = session.views();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    warn!("Session stopped unexpectedly");
                    break;
                }
                let view = views.borrow_and_update().clone();
                log_view(&view);
            }
            _ = &mut shutdown => {
                info!("Received Ctrl-C, shutting down");
                break;
            }
        }
    }

    session.shutdown().await;
    Ok(())
}

fn log_view(view: &DashboardView) {
    let Some(primary) = &view.primary else {
        return;
    };

    info!(
        "[{}] {} {} | points={} | social={} | updated={}",
        view.connection,
        primary.symbol,
        price_label(primary),
        primary.series.len(),
        social_label(&primary.social),
        view.last_updated.as_deref().unwrap_or("-"),
    );

    if let Some(focused) = &view.focused {
        info!(
            "  focus {} {} | points={} | social={}",
            focused.symbol,
            price_label(focused),
            focused.series.len(),
            social_label(&focused.social),
        );
    }

    let gainers: Vec<&str> = view.ranking.gainers.iter().map(|r| r.symbol.as_str()).collect();
    let losers: Vec<&str> = view.ranking.losers.iter().map(|r| r.symbol.as_str()).collect();
    if !gainers.is_empty() {
        info!("  gainers={:?} losers={:?}", gainers, losers);
    }
}

fn price_label(view: &SymbolView) -> String {
    match &view.instrument {
        Some(instrument) => format!(
            "${:.2} ({:+.2}% 24h)",
            instrument.current_price, instrument.price_change_24h
        ),
        None => "waiting for price".to_string(),
    }
}

fn social_label(status: &SocialStatus) -> String {
    match status {
        SocialStatus::Pending => "pending".to_string(),
        SocialStatus::Ready(snapshot) => format!(
            "{} posts, mindshare {:.1}%",
            snapshot.total_tweets, snapshot.mindshare
        ),
        SocialStatus::Failed(error) => format!("error: {error}"),
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
