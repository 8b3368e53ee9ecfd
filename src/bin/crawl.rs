use commentferry_lib::config::CrawlerConfig;
use commentferry_lib::signer::Signers;
use commentferry_lib::CommentPipeline;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, EnvFilter};

const SAMPLE_URL: &str = "https://www.douyin.com/discover?modal_id=7258913772092296485";

fn main() {
    // Usage: crawl [URL] [--max-pages N] [--insecure]
    let mut url: Option<String> = None;
    let mut max_pages: Option<u32> = None;
    let mut insecure = false;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--insecure" => insecure = true,
            "--max-pages" => max_pages = args.next().and_then(|n| n.parse().ok()),
            _ if url.is_none() && !arg.starts_with("--") => url = Some(arg.clone()),
            _ => eprintln!("ignoring argument: {}", arg),
        }
    }

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("commentferry_lib=debug,info")),
        )
        .init();

    let mut config = CrawlerConfig::from_env();
    if insecure {
        config.accept_invalid_certs = true;
    }
    if let Some(n) = max_pages {
        config.max_pages = n.max(1);
    }
    let signers = Signers::from_env(Some(config.signer_timeout_secs));
    let url = url.unwrap_or_else(|| SAMPLE_URL.to_string());

    let rt = tokio::runtime::Runtime::new().expect("failed to create tokio runtime");
    rt.block_on(async move {
        let pipeline = match CommentPipeline::new(config, signers) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, "failed to build pipeline");
                return;
            }
        };

        let cancel = CancellationToken::new();
        let ctrl_c = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                ctrl_c.cancel();
            }
        });

        match pipeline.crawl(&url, &cancel).await {
            Ok(result) => match result.page {
                Some(page) if !page.comments.is_empty() => {
                    for c in &page.comments {
                        println!("{}: {}", c.nickname, c.text);
                    }
                }
                Some(page) => println!("no comments returned (total={})", page.total),
                None => tracing::error!(url = %url, "comment fetch failed"),
            },
            Err(e) => tracing::error!(url = %url, error = %e, "crawl failed"),
        }
    });
}
