//! Output renderers and formatting helpers for CLI commands.

use anyhow::anyhow;
use serde::Serialize;
use serde_json::{Value, json};
use tollgate_session::Principal;

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

pub(crate) fn render_principal(principal: &Principal, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&json!({
            "user": principal,
            "is_admin": principal.is_admin(),
        })),
        OutputFormat::Table => {
            print!("{}", principal_table(principal));
            Ok(())
        }
    }
}

pub(crate) fn render_session(
    principal: Option<&Principal>,
    has_credential: bool,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&json!({
            "authenticated": principal.is_some(),
            "is_admin": principal.is_some_and(Principal::is_admin),
            "credential": has_credential,
            "user": principal,
        })),
        OutputFormat::Table => {
            match principal {
                Some(principal) => print!("{}", principal_table(principal)),
                None => println!("no active session"),
            }
            println!("credential: {}", if has_credential { "stored" } else { "none" });
            Ok(())
        }
    }
}

/// Print a response body, pretty-printing it when it is JSON.
pub(crate) fn render_body(body: &[u8]) -> CliResult<()> {
    match serde_json::from_slice::<Value>(body) {
        Ok(value) => print_json(&value),
        Err(_) => {
            println!("{}", String::from_utf8_lossy(body));
            Ok(())
        }
    }
}

pub(crate) fn principal_table(principal: &Principal) -> String {
    let mut text = format!(
        "id: {}\nusername: {}\nrole: {}\nadmin: {}\n",
        principal.id,
        principal.username,
        principal.role,
        if principal.is_admin() { "yes" } else { "no" }
    );
    if !principal.email.is_empty() {
        text.push_str(&format!("email: {}\n", principal.email));
    }
    text.push_str(&format!("created: {}\n", principal.created_at));
    text
}

fn print_json(value: &impl Serialize) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_test_support::fixtures::principal;

    #[test]
    fn principal_table_lists_fields() {
        let text = principal_table(&principal("Admin"));
        assert!(text.contains("username: admin-user\n"));
        assert!(text.contains("role: Admin\n"));
        assert!(text.contains("admin: yes\n"));
        assert!(text.contains("email: ops@example.test\n"));
    }

    #[test]
    fn principal_table_skips_missing_email() {
        let mut user = principal("User");
        user.email.clear();
        let text = principal_table(&user);
        assert!(text.contains("admin: no\n"));
        assert!(!text.contains("email:"));
    }

    #[test]
    fn renderers_accept_every_format() -> CliResult<()> {
        let user = principal("user");
        for format in [OutputFormat::Table, OutputFormat::Json] {
            render_principal(&user, format)?;
            render_session(Some(&user), true, format)?;
            render_session(None, false, format)?;
        }
        render_body(br#"{"ok":true}"#)?;
        render_body(b"plain text")?;
        Ok(())
    }
}
