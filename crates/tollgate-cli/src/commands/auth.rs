use anyhow::Context;
use serde::{Deserialize, Serialize};
use tollgate_session::{Principal, write_credential};
use tracing::{info, warn};

use crate::cli::{LoginArgs, OutputFormat};
use crate::client::{AppContext, CliError, CliResult};
use crate::output::{render_body, render_principal};

pub(crate) const LOGIN_PATH: &str = "/api/login";
pub(crate) const LOGOUT_PATH: &str = "/api/logout";
pub(crate) const ME_PATH: &str = "/api/me";

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
    user: Principal,
}

pub(crate) async fn handle_login(
    ctx: &AppContext,
    args: LoginArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let username = args.username.trim();
    if username.is_empty() {
        return Err(CliError::validation("username cannot be empty"));
    }
    let password = match args.password {
        Some(password) => password,
        None => rpassword::prompt_password("Password: ")
            .context("failed to read password")
            .map_err(CliError::failure)?,
    };
    if password.is_empty() {
        return Err(CliError::validation("password cannot be empty"));
    }

    let gateway = &ctx.gateway;
    let login: LoginResponse = gateway
        .send_json(gateway.post(LOGIN_PATH).json(&LoginRequest {
            username,
            password: &password,
        }))
        .await
        .map_err(CliError::from_login)?;

    let storage = ctx.session.storage();
    write_credential(storage.as_ref(), &login.token)
        .with_context(|| format!("failed to store credential in {}", ctx.session_file().display()))
        .map_err(CliError::failure)?;
    ctx.session.session().set_user(login.user.clone())?;
    info!(username = %login.user.username, "logged in");
    render_principal(&login.user, format)
}

pub(crate) async fn handle_logout(ctx: &AppContext) -> CliResult<()> {
    let gateway = &ctx.gateway;
    if let Err(err) = gateway.send(gateway.post(LOGOUT_PATH)).await {
        warn!(error = %err, "server logout failed; clearing local session anyway");
        eprintln!("warning: server logout failed: {err}");
    }
    ctx.session.session().clear_user()?;
    println!("logged out");
    Ok(())
}

pub(crate) async fn handle_whoami(ctx: &AppContext) -> CliResult<()> {
    let gateway = &ctx.gateway;
    let response = gateway.send(gateway.get(ME_PATH)).await?;
    let body = response
        .bytes()
        .await
        .context("failed to read /api/me response")
        .map_err(CliError::failure)?;
    render_body(&body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ConnectSettings;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;
    use tollgate_session::{TOKEN_KEY, USER_KEY, read_credential};
    use tollgate_test_support::fixtures::principal;

    fn context_for(server: &MockServer, dir: &TempDir, location: &str) -> AppContext {
        AppContext::connect(&ConnectSettings {
            api_url: server.base_url().parse().expect("valid URL"),
            timeout: Duration::from_secs(5),
            session_file: dir.path().join("session.json"),
            location: location.to_string(),
        })
        .expect("context builds")
    }

    fn login_args(password: &str) -> LoginArgs {
        LoginArgs {
            username: "admin".to_string(),
            password: Some(password.to_string()),
        }
    }

    #[tokio::test]
    async fn login_persists_token_and_user() {
        let server = MockServer::start_async().await;
        let user = principal("Admin");
        let body = json!({"token": "tok-abc", "user": user});
        let mock = server.mock(move |when, then| {
            when.method(POST)
                .path(LOGIN_PATH)
                .json_body(json!({"username": "admin", "password": "secret"}));
            then.status(200).json_body(body);
        });

        let dir = TempDir::new().expect("tempdir");
        let ctx = context_for(&server, &dir, "/");
        handle_login(&ctx, login_args("secret"), OutputFormat::Json)
            .await
            .expect("login succeeds");
        mock.assert();

        let storage = ctx.session.storage();
        assert_eq!(
            read_credential(storage.as_ref()).expect("read").as_deref(),
            Some("tok-abc")
        );
        assert_eq!(ctx.session.session().current_user(), Some(user.clone()));
        assert!(ctx.session.session().is_admin());

        let reopened = context_for(&server, &dir, "/");
        assert_eq!(reopened.hydrate().expect("hydrate"), Some(user));
    }

    #[tokio::test]
    async fn bad_credentials_fail_without_session() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path(LOGIN_PATH);
            then.status(401)
                .json_body(json!({"error": "Invalid username or password"}));
        });

        let dir = TempDir::new().expect("tempdir");
        let ctx = context_for(&server, &dir, "/");
        let err = handle_login(&ctx, login_args("wrong"), OutputFormat::Table)
            .await
            .expect_err("login rejected");
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.display_message(), "Invalid username or password");
        assert!(ctx.session.session().current_user().is_none());
        assert!(!dir.path().join("session.json").exists());
    }

    #[tokio::test]
    async fn blank_username_is_validation_error() {
        let server = MockServer::start_async().await;
        let dir = TempDir::new().expect("tempdir");
        let ctx = context_for(&server, &dir, "/");
        let err = handle_login(
            &ctx,
            LoginArgs {
                username: "  ".to_string(),
                password: Some("secret".to_string()),
            },
            OutputFormat::Table,
        )
        .await
        .expect_err("validation error");
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn logout_clears_session_even_when_server_fails() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path(LOGOUT_PATH)
                .header("authorization", "Bearer tok-abc");
            then.status(500);
        });

        let dir = TempDir::new().expect("tempdir");
        let ctx = context_for(&server, &dir, "/logout");
        ctx.session
            .session()
            .set_user(principal("user"))
            .expect("persist user");
        ctx.session.storage().set(TOKEN_KEY, "tok-abc").expect("persist token");

        handle_logout(&ctx).await.expect("logout succeeds");
        mock.assert();
        let storage = ctx.session.storage();
        assert_eq!(storage.get(TOKEN_KEY).expect("read"), None);
        assert_eq!(storage.get(USER_KEY).expect("read"), None);
        assert!(ctx.session.session().current_user().is_none());
    }

    #[tokio::test]
    async fn whoami_sends_bearer_and_prints_user() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path(ME_PATH)
                .header("authorization", "Bearer tok-abc");
            then.status(200).json_body(json!({
                "id": "1",
                "username": "admin",
                "role": "Admin",
                "created_at": "2024-05-01T00:00:00Z"
            }));
        });

        let dir = TempDir::new().expect("tempdir");
        let ctx = context_for(&server, &dir, "/whoami");
        ctx.session.storage().set(TOKEN_KEY, "tok-abc").expect("persist token");
        handle_whoami(&ctx).await.expect("whoami succeeds");
        mock.assert();
    }

    #[tokio::test]
    async fn whoami_with_expired_session_clears_file() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path(ME_PATH);
            then.status(401);
        });

        let dir = TempDir::new().expect("tempdir");
        let ctx = context_for(&server, &dir, "/whoami");
        ctx.session
            .session()
            .set_user(principal("user"))
            .expect("persist user");
        ctx.session.storage().set(TOKEN_KEY, "stale").expect("persist token");

        let err = handle_whoami(&ctx).await.expect_err("401 propagates");
        assert_eq!(err.exit_code(), 3);
        let storage = ctx.session.storage();
        assert_eq!(storage.get(TOKEN_KEY).expect("read"), None);
        assert_eq!(storage.get(USER_KEY).expect("read"), None);
    }
}
