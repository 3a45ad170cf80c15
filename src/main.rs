use yomiage::config::Config;
use yomiage::provider;
use yomiage::relay::{self, RelayState};
use yomiage::session;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("yomiage starting");

    let config = Config::load();
    let settings = config.provider_settings();
    if !config.has_credential() {
        log::warn!(
            "No API key for {}; translate requests will fail until one is set",
            settings.kind.as_str()
        );
    }

    let provider = provider::from_settings(&settings, reqwest::Client::new());
    log::info!("Provider: {} ({})", provider.name(), settings.model);

    let app = relay::router(RelayState::new(provider));
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;

    log::info!("Listening on http://{}", listener.local_addr()?);
    log::info!("  GET  /               - Browser UI");
    log::info!("  GET  /health         - Health check");
    log::info!("  GET  /api/status     - Provider and credential status");
    log::info!("  POST {}  - Streamed conversion", relay::TRANSLATE_PATH);
    log::info!("  POST {} - Page events", session::SESSION_PATH);

    axum::serve(listener, app).await?;
    Ok(())
}
