pub mod adapters;
pub mod config;
pub mod cookies;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod pipeline;
pub mod request;
pub mod server;
pub mod session;
pub mod signer;
pub mod token;

pub use error::{CommentFerryError, Result};
pub use pipeline::{CommentPipeline, CrawlResult};
