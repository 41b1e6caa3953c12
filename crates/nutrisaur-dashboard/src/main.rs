use anyhow::bail;
use tracing::{info, warn};

use nutrisaur_dashboard::api_view::ApiDashboard;
use nutrisaur_dashboard::client::DashboardClient;
use nutrisaur_dashboard::dispatch::Panel;
use nutrisaur_dashboard::poller::FallbackPoller;
use nutrisaur_dashboard::reconnect::ReconnectPolicy;
use nutrisaur_dashboard::transport::HttpTransport;
use nutrisaur_dashboard::view::ConnectionStatus;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nutrisaur_dashboard=debug".into()),
        )
        .init();

    let base_url =
        std::env::var("NUTRISAUR_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".to_string());
    let barangay = std::env::var("NUTRISAUR_BARANGAY").unwrap_or_default();
    info!("Watching {} (barangay {:?})", base_url, barangay);

    let http = reqwest::Client::new();
    let client = DashboardClient::new(
        ApiDashboard::new(http.clone(), base_url.as_str()),
        HttpTransport::new(http, base_url.as_str()),
        barangay,
        ReconnectPolicy::default(),
    );

    let stream = client.spawn();
    let poller_client = client.clone();
    let poller = tokio::spawn(async move { FallbackPoller::default().run(&poller_client).await });

    let result = tokio::select! {
        status = stream => status.map_err(anyhow::Error::from),
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            Ok(ConnectionStatus::Disconnected)
        }
    };
    poller.abort();
    report(client.view());

    let status = result?;
    if status == ConnectionStatus::Failed {
        bail!("Community event stream stopped: {}", status.label());
    }
    Ok(())
}

fn report(view: &ApiDashboard) {
    let status = view.status().map_or("never connected", |s| s.label());
    info!("Last connection status: {}", status);
    if view.is_updating() {
        warn!("Exiting with an update in flight");
    }
    match view.snapshot(Panel::CommunityMetrics) {
        Some(metrics) => info!("Last community metrics: {}", metrics),
        None => info!("No community metrics received"),
    }
}
