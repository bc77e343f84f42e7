use clap::Args;

use common::crypto::{CryptoError, SealedText, Secret};
use sepa_daemon::http_server::api::client::ApiError;
use sepa_daemon::http_server::api::paste::GetRequest;

#[derive(Args, Debug, Clone)]
pub struct Get {
    #[command(flatten)]
    pub request: GetRequest,

    /// Base64 key the paste was sealed under; opens it locally
    #[arg(long)]
    pub key: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum PasteGetError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Get {
    type Error = PasteGetError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let response = ctx.client.call(self.request.clone()).await?;

        match &self.key {
            Some(key) => {
                let secret = Secret::from_base64(key)?;
                let sealed = SealedText::parse(&response.content)?;
                Ok(secret.open(&sealed)?)
            }
            None => Ok(response.content),
        }
    }
}
