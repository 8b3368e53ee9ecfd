use commentferry_lib::config::{CrawlerConfig, DEFAULT_PORT};
use commentferry_lib::signer::Signers;
use tracing_subscriber::{fmt, EnvFilter};

fn main() {
    // Lightweight CLI flags (no external deps).
    // Usage (cargo): cargo run --bin server -- --insecure
    // Usage (binary): ./server --insecure
    let mut insecure = false;
    for arg in std::env::args().skip(1) {
        if arg.as_str() == "--insecure" {
            insecure = true;
        }
    }

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("commentferry_lib=debug,info")),
        )
        .init();

    let port = std::env::var("COMMENTFERRY_PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);

    let mut config = CrawlerConfig::from_env();
    if insecure {
        config.accept_invalid_certs = true;
    }
    let signers = Signers::from_env(Some(config.signer_timeout_secs));

    let rt = tokio::runtime::Runtime::new().expect("failed to create tokio runtime");
    rt.block_on(async move {
        if let Err(e) = commentferry_lib::server::start_server(port, config, signers).await {
            eprintln!("server error: {}", e);
            std::process::exit(1);
        }
    });
}
