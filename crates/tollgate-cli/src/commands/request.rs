use anyhow::Context;

use crate::cli::GetArgs;
use crate::client::{AppContext, CliError, CliResult};
use crate::output::render_body;

pub(crate) async fn handle_get(ctx: &AppContext, args: GetArgs) -> CliResult<()> {
    let path = args.path.trim();
    if path.is_empty() {
        return Err(CliError::validation("request path cannot be empty"));
    }
    let gateway = &ctx.gateway;
    let response = gateway.send(gateway.get(path)).await?;
    let body = response
        .bytes()
        .await
        .with_context(|| format!("failed to read response from {path}"))
        .map_err(CliError::failure)?;
    render_body(&body)
}
