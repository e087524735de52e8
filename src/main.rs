#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
// #![doc = include_str!("../README.md")]

use std::net::SocketAddr;

use anyhow::Result;
use anyhow::anyhow;
use axum::extract::Request;
use tokio::net::TcpListener;
use tracing_subscriber::prelude::*;
use url_alias::App;
use url_alias::api::Capability;
use url_alias::api::JwtKeys;
use url_alias::api::generate_token;
use url_alias::config::Config;
use url_alias::create_app;
use url_alias::storage::Memory;
use url_alias::storage::Postgres;
use url_alias::storage::Storage;
use url_alias::utils::env_var;
use url_alias::utils::env_var_or_else;
use uuid::Uuid;

mod graceful_shutdown;
mod root;

const DEFAULT_RUST_LOG: &str = "url_alias=debug,tower_http=debug";
const DEFAULT_ADDRESS: &str = "0.0.0.0:6000";

/// Lifetime of the token logged for a generated `JWT_SECRET`, in seconds
const TEMPORARY_TOKEN_EXPIRES_IN: i64 = 60 * 60 * 24;

#[tokio::main]
async fn main() -> Result<()> {
    setup_environment();
    setup_tracing();

    let config = Config::from_env()?;
    let jwt_keys = setup_jwt_keys()?;
    let address = setup_address()?;

    if config.enabled {
        tracing::info!("Url alias resolution is enabled");
    } else {
        tracing::info!("Url alias resolution is disabled, set `URL_ALIAS_ENABLE` to enable it");
    }

    let app = if let Some(database_url) = env_var("DATABASE_URL") {
        tracing::info!("Using Postgres storage");

        setup_app(config, Postgres::connect(&database_url).await?, jwt_keys)
    } else {
        tracing::info!("`DATABASE_URL` is not set, using memory storage");

        setup_app(config, Memory::new(), jwt_keys)
    };

    let listener = TcpListener::bind(address).await?;
    tracing::info!("Listening on {}", address);

    axum::serve(listener, axum::ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(graceful_shutdown::handler())
        .await?;

    Ok(())
}

/// Create the app with the pages of the binary
fn setup_app<S: Storage>(config: Config, storage: S, jwt_keys: JwtKeys) -> App {
    create_app(config, storage, jwt_keys, root::routes::<S>())
}

fn setup_environment() {
    dotenvy::dotenv().ok();
}

fn setup_tracing() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::registry;

    registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_RUST_LOG.into()),
        ))
        .with(fmt::layer())
        .init();
}

/// Keys for the management API tokens
///
/// Without `JWT_SECRET` a temporary secret is generated, together with a token granting every
/// capability, so the API can be tried out right away
fn setup_jwt_keys() -> Result<JwtKeys> {
    if let Some(jwt_secret) = env_var("JWT_SECRET") {
        return Ok(JwtKeys::new(jwt_secret.as_bytes()));
    }

    let jwt_secret = Uuid::new_v4().simple().to_string();
    tracing::info!("`JWT_SECRET` is not set, generating temporary one: {jwt_secret}");

    let jwt_keys = JwtKeys::new(jwt_secret.as_bytes());

    let access_token = generate_token(
        &jwt_keys,
        "temporary",
        &Capability::ALL,
        TEMPORARY_TOKEN_EXPIRES_IN,
    )
    .map_err(|err| anyhow!("Could not generate temporary token: {err:?}"))?;

    tracing::info!("Temporary API token: {access_token}");

    Ok(jwt_keys)
}

fn setup_address() -> Result<SocketAddr> {
    let mut address =
        env_var_or_else("ADDRESS", || String::from(DEFAULT_ADDRESS)).parse::<SocketAddr>()?;

    // optional override of just the port
    if let Some(port) = env_var("PORT") {
        let port = port.parse::<u16>()?;

        address.set_port(port);
    }

    Ok(address)
}
