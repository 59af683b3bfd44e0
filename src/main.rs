mod app;
mod auth;
mod config;
mod db;
mod dto;
mod error;
mod groups;
mod jobs;
mod profile;
mod sparse;
mod state;
mod users;

#[cfg(test)]
mod test_support;

use tracing::{info, warn};

use crate::auth::services::grant_admin;
use crate::state::AppState;
use crate::users::{
    dto::Registration,
    services::{register, RegisterOutcome},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "careerhub=debug,axum=info,tower_http=info,sqlx=warn".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let state = AppState::init().await?;
    state.db.migrate().await?;
    bootstrap_admin(&state).await?;

    app::serve(app::build_app(state)).await
}

/// Create (or promote) the account named by `BOOTSTRAP_ADMIN_USERNAME` so a
/// fresh database has someone who can moderate.
async fn bootstrap_admin(state: &AppState) -> anyhow::Result<()> {
    let (Ok(username), Ok(password)) = (
        std::env::var("BOOTSTRAP_ADMIN_USERNAME"),
        std::env::var("BOOTSTRAP_ADMIN_PASSWORD"),
    ) else {
        return Ok(());
    };

    let registration = Registration {
        username: username.clone(),
        password: password.clone(),
        first_name: "Site".into(),
        last_name: "Administrator".into(),
        email: format!("{username}@localhost.localdomain"),
        city: None,
        state: None,
        birthday: None,
        tagline: None,
        photo: None,
    };
    let user_id = match register(&state.db, registration).await? {
        RegisterOutcome::Created(id) => id,
        RegisterOutcome::AlreadyExists => {
            match auth::services::authenticate(&state.db, &username, &password).await {
                Some(credential) => credential.user_id,
                None => {
                    warn!(%username, "bootstrap admin exists with a different password; skipping");
                    return Ok(());
                }
            }
        }
        RegisterOutcome::Failed => anyhow::bail!("could not create bootstrap admin {username}"),
    };

    if grant_admin(&state.db, user_id).await? {
        info!(user_id, %username, "bootstrap admin ready");
    }
    Ok(())
}
