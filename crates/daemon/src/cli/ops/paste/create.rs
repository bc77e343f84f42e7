use std::io::Read;

use clap::Args;

use common::crypto::{CryptoError, Secret};
use sepa_daemon::http_server::api::client::ApiError;
use sepa_daemon::http_server::api::paste::CreateRequest;

#[derive(Args, Debug, Clone)]
pub struct Create {
    /// Text to share (read from stdin if not set)
    #[arg(long)]
    pub content: Option<String>,

    /// Seal the text under a fresh key before uploading
    #[arg(long)]
    pub encrypt: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum PasteCreateError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
    #[error("failed to read stdin: {0}")]
    Stdin(#[from] std::io::Error),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Create {
    type Error = PasteCreateError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let text = match &self.content {
            Some(content) => content.clone(),
            None => {
                let mut buff = String::new();
                std::io::stdin().read_to_string(&mut buff)?;
                buff
            }
        };

        let (content, secret) = if self.encrypt {
            let secret = Secret::generate();
            (secret.seal(&text)?.to_string(), Some(secret))
        } else {
            (text, None)
        };

        let response = ctx
            .client
            .call(CreateRequest {
                content: Some(content),
            })
            .await?;

        let mut lines = vec![format!("id:  {}", response.id), format!("url: {}", response.url)];
        if let Some(secret) = secret {
            lines.push(format!("key: {}", secret.to_base64()));
        }
        Ok(lines.join("\n"))
    }
}
