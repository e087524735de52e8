#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
// easier to use when using the functions as callback of foreign functions
#![allow(clippy::needless_pass_by_value)]
// errors are documented on the storage trait and the API error type
#![allow(clippy::missing_errors_doc)]

//! Url aliases
//!
//! Friendly public paths (`/about-us`) for internal paths (`/content/42`):
//!
//! - requests for an alias continue as if the target was requested
//! - browsers asking for a target are redirected to its alias
//! - aliases are managed through `/api/url-alia`
//! - owners of resources register aliases with [`aliases::create_if_absent`] and
//!   [`aliases::upsert`]

use std::convert::Infallible;
use std::sync::Arc;

use axum::Extension;
use axum::Router;
use axum::extract::Request;
use axum::middleware::from_fn_with_state;
use axum::response::Response;
use axum::routing::get;
use tower::Layer;
use tower::util::BoxCloneService;
use tower_http::trace::TraceLayer;

use crate::api::JwtKeys;
use crate::config::Config;
use crate::resolver::Resolver;
use crate::resolver::url_alias_middleware;
use crate::storage::Storage;

pub mod aliases;
pub mod api;
pub mod config;
pub mod health;
pub mod resolver;
pub mod storage;
#[cfg(test)]
mod tests;
pub mod utils;

/// The complete application, resolver included
pub type App = BoxCloneService<Request, Response, Infallible>;

/// Create the application
///
/// The routes of the caller are merged with the API and the health check, after which the
/// whole router is wrapped by the resolver. Resolution happens before routing, so the routes
/// only see the target of an alias.
pub fn create_app<S: Storage>(config: Config, storage: S, jwt_keys: JwtKeys, routes: Router) -> App {
    let config = Arc::new(config);

    let resolver = Resolver::new(storage.clone(), Arc::clone(&config));

    let router = Router::new()
        .nest("/api", api::router::<S>())
        .route("/health", get(health::liveness))
        .merge(routes)
        .layer(TraceLayer::new_for_http())
        .layer(Extension(storage))
        .layer(Extension(config))
        .layer(Extension(jwt_keys));

    let app = from_fn_with_state(resolver, url_alias_middleware::<S>).layer(router);

    BoxCloneService::new(app)
}
