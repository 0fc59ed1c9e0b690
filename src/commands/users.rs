use anyhow::{Context, Result};

use super::{Checks, report};
use crate::api::UsersApi;
use crate::config::Settings;
use crate::http::{ApiClient, Method};

#[derive(clap::Subcommand, Debug, Clone, PartialEq)]
pub enum UsersCommand {
    /// List users
    List {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        per_page: Option<u32>,
    },
    /// Get a single user
    Get { id: u64 },
    /// Delete a user
    Delete { id: u64 },
}

#[tracing::instrument(skip(settings, checks))]
pub fn users(settings: &Settings, command: &UsersCommand, checks: &Checks) -> Result<()> {
    let client = ApiClient::from_settings(settings)?;
    let api = UsersApi::new(&client);

    let (method, endpoint, result) = match command {
        UsersCommand::List { page, per_page } => {
            (Method::Get, "users".to_string(), api.list(*page, *per_page))
        }
        UsersCommand::Get { id } => (Method::Get, format!("users/{}", id), api.get(*id)),
        UsersCommand::Delete { id } => (Method::Delete, format!("users/{}", id), api.delete(*id)),
    };

    let url = client.config().url_for(&endpoint);
    let response = result.with_context(|| format!("{} {} did not complete", method, url))?;

    report(method, &url, &response, checks, settings)
}
