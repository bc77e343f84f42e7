use std::convert::Infallible;

use clap::Args;

use sepa_daemon::state::AppState;

#[derive(Args, Debug, Clone)]
pub struct Health;

#[async_trait::async_trait]
impl crate::cli::op::Op for Health {
    type Error = Infallible;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut lines = vec!["Config:".to_string()];
        match AppState::load(ctx.config_path.clone()) {
            Ok(state) => {
                lines.push(format!("  file:         {}", state.config_path.display()));
                lines.push(format!("  api_port:     {}", state.config.api_port));
                lines.push(format!(
                    "  rate_limit:   {} requests / {}s",
                    state.config.rate_limit.max_requests, state.config.rate_limit.window_secs
                ));
            }
            Err(e) => lines.push(format!("  {}", e)),
        }

        let base = ctx.client.base_url();
        lines.push(String::new());
        lines.push(format!("Service ({}):", base));

        for probe in ["livez", "readyz"] {
            let status = match base.join(&format!("/_status/{}", probe)) {
                Ok(url) => match ctx.client.http_client().get(url).send().await {
                    Ok(resp) if resp.status().is_success() => "OK".to_string(),
                    Ok(resp) => format!("UNHEALTHY ({})", resp.status()),
                    Err(_) => "NOT REACHABLE".to_string(),
                },
                Err(e) => format!("BAD URL ({})", e),
            };
            lines.push(format!("  {:<7} {}", format!("{}:", probe), status));
        }

        Ok(lines.join("\n"))
    }
}
