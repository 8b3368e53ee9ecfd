use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::adapters::{adapter_for_url, ContentId, PlatformAdapter};
use crate::config::CrawlerConfig;
use crate::error::{CommentFerryError, Result};
use crate::fetcher::{CommentFetcher, CommentPage, PageOutcome};
use crate::http::HttpClient;
use crate::request::{RequestAssembler, RequestParams};
use crate::session::{SessionBootstrapper, SessionCredentials};
use crate::signer::Signers;
use crate::token::TokenGenerator;

/// Outcome of one pipeline invocation.
///
/// `page` is `None` when the first fetch produced nothing usable (transport
/// failure or blank body). Otherwise it holds every comment fetched, in order.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlResult {
    pub platform: String,
    pub content_id: String,
    pub pages_fetched: u32,
    pub page: Option<CommentPage>,
}

/// Bootstrap, sign and fetch, one invocation at a time or many concurrently.
///
/// Nothing per-invocation is stored on the pipeline itself: credentials and
/// tokens live on the stack of `crawl`.
pub struct CommentPipeline {
    config: CrawlerConfig,
    signers: Signers,
    http: HttpClient,
}

impl CommentPipeline {
    pub fn new(config: CrawlerConfig, signers: Signers) -> Result<Self> {
        let http = HttpClient::from_config(&config)?;
        Ok(Self {
            config,
            signers,
            http,
        })
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    pub fn signers(&self) -> &Signers {
        &self.signers
    }

    /// Crawl using the configured page limit.
    pub async fn crawl(&self, url: &str, cancel: &CancellationToken) -> Result<CrawlResult> {
        self.crawl_pages(url, self.config.max_pages, cancel).await
    }

    /// Crawl at most `max_pages` pages (at least one) of the thread behind `url`.
    pub async fn crawl_pages(
        &self,
        url: &str,
        max_pages: u32,
        cancel: &CancellationToken,
    ) -> Result<CrawlResult> {
        let adapter = adapter_for_url(url, self.config.api_base_override.as_deref())?;
        let content_id = adapter.parse_input(url)?;

        let span = info_span!(
            "crawl",
            invocation = %Uuid::new_v4(),
            platform = adapter.platform_id(),
            content_id = %content_id,
        );

        self.run(adapter.as_ref(), &content_id, max_pages.max(1), cancel)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        adapter: &dyn PlatformAdapter,
        content_id: &ContentId,
        max_pages: u32,
        cancel: &CancellationToken,
    ) -> Result<CrawlResult> {
        let user_agent = self.config.user_agent.as_str();

        let credentials: Option<SessionCredentials> = if adapter.requires_session_bootstrap() {
            let bootstrapper =
                SessionBootstrapper::new(&self.http, user_agent, self.config.bootstrap.clone());
            Some(
                bootstrapper
                    .bootstrap(&adapter.referer_url(content_id), cancel)
                    .await?,
            )
        } else {
            None
        };

        let assembler = RequestAssembler::new(
            self.signers.for_scheme(adapter.signature_scheme()),
            user_agent,
        );
        let fetcher = CommentFetcher::new(&self.http);
        let tokens = TokenGenerator::new(self.config.token_length);

        let mut merged: Option<CommentPage> = None;
        let mut pages_fetched: u32 = 0;
        let mut cursor: u64 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(CommentFerryError::Cancelled);
            }

            let token = tokens.generate();
            let params = RequestParams {
                content_id,
                credentials: credentials.as_ref(),
                token: &token,
                cursor,
                count: self.config.page_size,
                user_agent,
            };
            let signed = assembler.assemble(adapter, &params).await?;

            let fetched = tokio::select! {
                _ = cancel.cancelled() => return Err(CommentFerryError::Cancelled),
                page = fetcher.fetch(&signed) => page,
            };

            let page = match fetched {
                PageOutcome::Page(page) => page,
                PageOutcome::Malformed if merged.is_none() => {
                    pages_fetched += 1;
                    merged = Some(CommentPage::default());
                    break;
                }
                PageOutcome::Malformed => {
                    warn!(cursor, pages_fetched, "unreadable page; keeping earlier pages");
                    break;
                }
                PageOutcome::Missing => {
                    if merged.is_some() {
                        warn!(cursor, pages_fetched, "page fetch failed; keeping earlier pages");
                    }
                    break;
                }
            };
            pages_fetched += 1;

            let advanced = page.cursor > cursor;
            let stop = !page.has_more
                || page.is_empty()
                || !advanced
                || pages_fetched >= max_pages;
            cursor = page.cursor;

            match merged.as_mut() {
                Some(acc) => {
                    acc.total = page.total;
                    acc.cursor = page.cursor;
                    acc.has_more = page.has_more;
                    acc.comments.extend(page.comments);
                }
                None => merged = Some(page),
            }

            if stop {
                break;
            }
        }

        match &merged {
            Some(page) => info!(
                pages_fetched,
                total = page.total,
                comments = page.comments.len(),
                "crawl finished"
            ),
            None => warn!("crawl finished without a comment page"),
        }

        Ok(CrawlResult {
            platform: adapter.platform_id().to_string(),
            content_id: content_id.to_string(),
            pages_fetched,
            page: merged,
        })
    }
}
