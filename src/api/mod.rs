//! All API endpoint setup

use axum::Router;
use axum::routing::get;

use crate::storage::Storage;

pub use capabilities::Authorize;
pub use capabilities::Capability;
pub use capabilities::CreateGrant;
pub use capabilities::DeleteGrant;
pub use capabilities::Grant;
pub use capabilities::Granted;
pub use capabilities::JwtKeys;
pub use capabilities::Principal;
pub use capabilities::UpdateGrant;
pub use capabilities::generate_token;
pub use request::Form;
pub use request::PathParameters;
pub use request::QueryParameters;
pub use request::parse_path;
pub use response::Error;
pub use response::Meta;
pub use response::Success;

mod capabilities;
mod request;
mod response;
mod url_aliases;

/// Get the Axum router for all API routes
pub fn router<S: Storage>() -> Router {
    let url_aliases = Router::new()
        .route("/", get(url_aliases::list::<S>).post(url_aliases::create::<S>))
        .route("/count", get(url_aliases::count::<S>))
        .route(
            "/{id}",
            get(url_aliases::single::<S>)
                .put(url_aliases::update::<S>)
                .delete(url_aliases::delete::<S>),
        );

    Router::new().nest("/url-alia", url_aliases)
}
