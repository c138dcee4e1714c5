use tollgate_session::read_credential;
use tracing::warn;

use crate::cli::OutputFormat;
use crate::client::{AppContext, CliResult};
use crate::output::render_session;

pub(crate) fn handle_session_show(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    let principal = ctx.hydrate()?;
    let storage = ctx.session.storage();
    let has_credential = read_credential(storage.as_ref())
        .unwrap_or_else(|err| {
            warn!(error = %err, "failed to read stored credential");
            None
        })
        .is_some();
    render_session(principal.as_ref(), has_credential, format)
}

pub(crate) fn handle_session_clear(ctx: &AppContext) -> CliResult<()> {
    ctx.session.session().clear_user()?;
    println!("session cleared ({})", ctx.session_file().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ConnectSettings;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;
    use tollgate_session::{TOKEN_KEY, USER_KEY};
    use tollgate_test_support::fixtures::principal;

    fn context_in(dir: &TempDir) -> AppContext {
        AppContext::connect(&ConnectSettings {
            api_url: "http://127.0.0.1:9/".parse().expect("valid URL"),
            timeout: Duration::from_secs(1),
            session_file: dir.path().join("session.json"),
            location: "/session".to_string(),
        })
        .expect("context builds")
    }

    #[test]
    fn show_restores_persisted_user() {
        let dir = TempDir::new().expect("tempdir");
        let writer = context_in(&dir);
        writer
            .session
            .session()
            .set_user(principal("ADMIN"))
            .expect("persist user");

        let reader = context_in(&dir);
        handle_session_show(&reader, OutputFormat::Json).expect("show succeeds");
        assert!(reader.session.session().is_admin());
    }

    #[test]
    fn show_reports_corrupt_file_as_validation() {
        let dir = TempDir::new().expect("tempdir");
        fs::write(dir.path().join("session.json"), r#"{"user":"{not json"}"#)
            .expect("write session file");
        let ctx = context_in(&dir);
        let err = handle_session_show(&ctx, OutputFormat::Table).expect_err("corrupt data");
        assert_eq!(err.exit_code(), 2);
        assert!(err.display_message().contains("session clear"));
    }

    #[test]
    fn clear_removes_user_and_token() {
        let dir = TempDir::new().expect("tempdir");
        let ctx = context_in(&dir);
        ctx.session
            .session()
            .set_user(principal("user"))
            .expect("persist user");
        ctx.session.storage().set(TOKEN_KEY, "tok").expect("persist token");

        handle_session_clear(&ctx).expect("clear succeeds");
        handle_session_clear(&ctx).expect("clear is idempotent");
        let storage = ctx.session.storage();
        assert_eq!(storage.get(USER_KEY).expect("read"), None);
        assert_eq!(storage.get(TOKEN_KEY).expect("read"), None);
        handle_session_show(&context_in(&dir), OutputFormat::Table).expect("show succeeds");
    }

    #[test]
    fn clear_recovers_malformed_session_file() {
        let dir = TempDir::new().expect("tempdir");
        fs::write(dir.path().join("session.json"), r#"{"user": {"id":1}"#)
            .expect("write session file");
        let ctx = context_in(&dir);
        let err = handle_session_show(&ctx, OutputFormat::Table).expect_err("corrupt file");
        assert_eq!(err.exit_code(), 2);

        handle_session_clear(&ctx).expect("clear succeeds");
        assert!(!dir.path().join("session.json").exists());
        handle_session_show(&context_in(&dir), OutputFormat::Table).expect("show succeeds");
    }
}
