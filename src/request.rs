use std::sync::Arc;

use wreq::header::HeaderMap;

use crate::adapters::PlatformAdapter;
use crate::error::{CommentFerryError, Result};
use crate::signer::SignatureProvider;

pub use crate::adapters::EndpointParams as RequestParams;

/// A comment-list request ready to dispatch. The signature is already part
/// of `url`.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub url: String,
    pub headers: HeaderMap,
}

/// Everything after the first `?`, or `""` when there is no query.
pub fn query_of(url: &str) -> &str {
    url.split_once('?').map(|(_, q)| q).unwrap_or("")
}

pub struct RequestAssembler {
    signer: Arc<dyn SignatureProvider>,
    user_agent: String,
}

impl RequestAssembler {
    pub fn new(signer: Arc<dyn SignatureProvider>, user_agent: &str) -> Self {
        Self {
            signer,
            user_agent: user_agent.to_string(),
        }
    }

    /// Build the unsigned endpoint, sign its query and append the signature.
    ///
    /// Signing failures are returned as-is and never retried.
    pub async fn assemble(
        &self,
        adapter: &dyn PlatformAdapter,
        params: &RequestParams<'_>,
    ) -> Result<SignedRequest> {
        if self.signer.scheme() != adapter.signature_scheme() {
            return Err(CommentFerryError::signature(
                adapter.signature_scheme(),
                format!("signer is for {}", self.signer.scheme()),
            ));
        }

        let unsigned = adapter.build_endpoint(params)?;
        let headers = adapter.header_set(params)?;

        let signature = self
            .signer
            .sign(query_of(&unsigned), &self.user_agent)
            .await?;
        let url = adapter.attach_signature(&unsigned, &signature);

        tracing::debug!(
            platform = adapter.platform_id(),
            cursor = params.cursor,
            query_len = query_of(&unsigned).len(),
            "request assembled"
        );

        Ok(SignedRequest { url, headers })
    }
}
