//! The root!
//!
//! Pages served by the binary itself, behind the resolver

use axum::Extension;
use axum::Router;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::routing::get;
use url_alias::api::Error;
use url_alias::api::PathParameters;
use url_alias::resolver::CurrentUrl;
use url_alias::resolver::PathBeforeAlias;
use url_alias::storage;
use url_alias::storage::Storage;

/// Routes of the binary
pub fn routes<S: Storage>() -> Router {
    Router::new()
        .route("/url-alias/{id}", get(url_alias_page::<S>))
        .fallback(fallback)
}

/// The page every permanent link points to
async fn url_alias_page<S: Storage>(
    Extension(storage): Extension<S>,
    PathParameters(id): PathParameters<i64>,
) -> Result<String, Error> {
    let url_alias = storage
        .find_single_alias_by_id(id)
        .await
        .map_err(|err| match err {
            storage::Error::NotFound => Error::not_found("Url alias not found"),
            err @ storage::Error::Connection(_) => Error::internal_server_error(err),
        })?;

    Ok(format!(
        "{} -> {} ({})",
        url_alias.alias, url_alias.target, url_alias.locale
    ))
}

/// The root!
///
/// All requests no route claims end up here, rewritten or not
async fn fallback(request: Request) -> (StatusCode, String) {
    let path = request.uri().path();

    let path_before_alias = request
        .extensions()
        .get::<PathBeforeAlias>()
        .map_or(path, |path_before_alias| path_before_alias.0.as_str());

    if let Some(current_url) = request.extensions().get::<CurrentUrl>() {
        tracing::debug!(r#"No page for "{path}", requested as "{}""#, current_url.0);
    } else {
        tracing::debug!(r#"No page for "{path_before_alias}""#);
    }

    (StatusCode::NOT_FOUND, format!("Nothing at {path_before_alias}"))
}
