use anyhow::{Context, Result};
use log::info;

use super::{Checks, report};
use crate::api::{AuthApi, token_from};
use crate::config::Settings;
use crate::http::{ApiClient, Method};

/// Logs in with the given credentials, falling back to the configured ones.
#[tracing::instrument(skip(settings, password, checks))]
pub fn login(
    settings: &Settings,
    email: Option<&str>,
    password: Option<&str>,
    checks: &Checks,
) -> Result<()> {
    let email = email
        .or(settings.api_username.as_deref())
        .context("No email given: pass --email or set API_USERNAME")?;
    let password = password
        .or(settings.api_password.as_deref())
        .context("No password given: pass --password or set API_PASSWORD")?;

    let client = ApiClient::from_settings(settings)?;
    let url = client.config().url_for("login");
    let response = AuthApi::new(&client)
        .login(email, password, &[])
        .with_context(|| format!("POST {} did not complete", url))?;

    if response.is_success() && token_from(&response).is_some() {
        info!("Login succeeded for {}", email);
    }

    report(Method::Post, &url, &response, checks, settings)
}
