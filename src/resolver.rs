//! The resolver!
//!
//! Decides for every incoming request whether it passes through untouched, continues with the
//! target of an alias as its path, or is redirected to the alias of the target it asked for.
//!
//! Runs before routing, so the router only ever sees the rewritten path.

use std::str::Utf8Error;
use std::sync::Arc;

use axum::extract::Request;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::Method;
use axum::http::StatusCode;
use axum::http::Uri;
use axum::http::header::ACCEPT;
use axum::http::header::LOCATION;
use axum::http::request::Parts;
use axum::http::uri::PathAndQuery;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use percent_encoding::AsciiSet;
use percent_encoding::CONTROLS;
use percent_encoding::percent_decode_str;
use percent_encoding::utf8_percent_encode;

use crate::aliases::normalize_path;
use crate::config::Config;
use crate::storage::Storage;

/// Methods that take part in resolution, all others pass through
const ELIGIBLE_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
];

/// Characters to encode when a stored path becomes part of an URI again
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'%');

/// The decoded path as it was before resolution
///
/// Always available to handlers behind the resolver
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathBeforeAlias(pub String);

/// The path the client asked for, only available when the path was rewritten
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurrentUrl(pub String);

/// What the resolver needs to know about a request
pub trait AliasRequest {
    /// Method of the request
    fn method(&self) -> &Method;

    /// Raw, still encoded, path of the request
    fn raw_path(&self) -> &str;

    /// Raw query string, without the `?`
    fn query(&self) -> Option<&str>;

    /// Will the response be rendered as an HTML document?
    fn renders_html(&self) -> bool;
}

impl AliasRequest for Parts {
    fn method(&self) -> &Method {
        &self.method
    }

    fn raw_path(&self) -> &str {
        self.uri.path()
    }

    fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    fn renders_html(&self) -> bool {
        headers_accept_html(&self.headers)
    }
}

impl<B> AliasRequest for axum::http::Request<B> {
    fn method(&self) -> &Method {
        axum::http::Request::method(self)
    }

    fn raw_path(&self) -> &str {
        self.uri().path()
    }

    fn query(&self) -> Option<&str> {
        self.uri().query()
    }

    fn renders_html(&self) -> bool {
        headers_accept_html(self.headers())
    }
}

/// Does any of the `Accept` headers list HTML?
fn headers_accept_html(headers: &HeaderMap) -> bool {
    headers
        .get_all(ACCEPT)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(accepts_html)
}

/// Does an `Accept` header list HTML?
fn accepts_html(accept: &str) -> bool {
    accept
        .split(',')
        .filter_map(|media_range| media_range.trim().parse::<mime::Mime>().ok())
        .any(|media_range| media_range.essence_str() == mime::TEXT_HTML.essence_str())
}

/// Outcome of resolving a request
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Continue as is
    PassThrough {
        /// The decoded path, when resolution got far enough to decode it
        path: Option<String>,
    },

    /// Continue with the target as path
    Rewrite {
        /// The decoded path of the request
        path: String,

        /// Path to continue with
        target: String,
    },

    /// Send the client to the alias
    Redirect {
        /// The decoded path of the request
        path: String,

        /// Location including the query string as it was requested
        location: String,
    },
}

/// Error when the path of a request can not be understood
#[derive(Debug)]
pub struct PathError(Utf8Error);

impl std::error::Error for PathError {}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invalid path: {}", self.0)
    }
}

/// Resolver of url aliases
pub struct Resolver<S: Storage> {
    /// Storage to look up aliases in
    storage: S,

    /// Resolution configuration
    config: Arc<Config>,
}

impl<S: Storage> Clone for Resolver<S> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S: Storage> Resolver<S> {
    /// Create a resolver
    pub fn new(storage: S, config: Arc<Config>) -> Self {
        Self { storage, config }
    }

    /// Resolve a request
    ///
    /// Failing lookups are logged and treated as if nothing was found
    ///
    /// # Errors
    ///
    /// Will return `Err` when the path of the request is not valid UTF-8 after decoding
    pub async fn resolve<R>(&self, request: &R) -> Result<Resolution, PathError>
    where
        R: AliasRequest + ?Sized,
    {
        if !self.config.enabled {
            return Ok(Resolution::PassThrough { path: None });
        }

        if !ELIGIBLE_METHODS.contains(request.method()) {
            return Ok(Resolution::PassThrough { path: None });
        }

        let path = decode_path(request.raw_path()).map_err(PathError)?;

        // Stored paths are normalized, compare like with like
        let lookup = normalize_path(&path);

        if self.config.is_public_path(&lookup) {
            return Ok(Resolution::PassThrough { path: Some(path) });
        }

        let alias = match self
            .storage
            .find_single_alias_by_alias_or_target(&lookup)
            .await
        {
            Ok(alias) => alias,
            Err(err) => {
                tracing::error!(r#"Could not look up alias for "{lookup}": {err}"#);

                None
            }
        };

        let Some(alias) = alias.filter(|alias| !alias.alias.is_empty() && !alias.target.is_empty())
        else {
            tracing::debug!(r#"No alias for "{lookup}""#);

            return Ok(Resolution::PassThrough { path: Some(path) });
        };

        if alias.target == lookup && alias.alias != lookup && request.renders_html() {
            let location = match request.query() {
                Some(query) if !query.is_empty() => format!("{}?{query}", alias.alias),
                _ => alias.alias,
            };

            tracing::debug!(r#"Target "{path}" redirecting to alias: {location}"#);

            Ok(Resolution::Redirect { path, location })
        } else {
            tracing::debug!(r#"Path "{path}" continues as: {}"#, alias.target);

            Ok(Resolution::Rewrite {
                path,
                target: alias.target,
            })
        }
    }
}

/// URL decode a path
///
/// Uses percentage encoding for the decoding, might error in case of invalid UTF-8
fn decode_path(path: &str) -> Result<String, Utf8Error> {
    percent_decode_str(path)
        .decode_utf8()
        .map(|decoded| decoded.to_string())
}

/// URL decode a path for information only, invalid UTF-8 is replaced
fn decode_path_lossy(path: &str) -> String {
    percent_decode_str(path).decode_utf8_lossy().to_string()
}

/// URL encode a stored path
fn encode_path(path: &str) -> String {
    utf8_percent_encode(path, PATH).to_string()
}

/// Replace the path of an URI, keeping everything else
fn rewrite_uri(uri: &Uri, target: &str) -> Result<Uri, String> {
    let path = encode_path(target);

    let path_and_query = match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path,
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query =
        Some(PathAndQuery::try_from(path_and_query).map_err(|err| err.to_string())?);

    Uri::from_parts(parts).map_err(|err| err.to_string())
}

/// Build the `302 Found` response for a redirect
fn redirect_response(location: &str) -> Result<Response, String> {
    let location = match location.split_once('?') {
        Some((path, query)) => format!("{}?{query}", encode_path(path)),
        None => encode_path(location),
    };

    let location = HeaderValue::from_str(&location).map_err(|err| err.to_string())?;

    Ok((StatusCode::FOUND, [(LOCATION, location)]).into_response())
}

/// The resolver middleware
///
/// Needs to wrap the router as a whole, otherwise routing already happened
pub async fn url_alias_middleware<S: Storage>(
    State(resolver): State<Resolver<S>>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();
    let raw_path = parts.uri.path().to_string();

    let resolution = match resolver.resolve(&parts).await {
        Ok(resolution) => resolution,
        Err(err) => {
            tracing::debug!(r#"Could not parse path "{raw_path}": {err}"#);

            return (StatusCode::INTERNAL_SERVER_ERROR, "Error on parse url").into_response();
        }
    };

    match resolution {
        Resolution::PassThrough { path } => {
            let path = path.unwrap_or_else(|| decode_path_lossy(&raw_path));

            parts.extensions.insert(PathBeforeAlias(path));
        }
        Resolution::Rewrite { path, target } => {
            match rewrite_uri(&parts.uri, &target) {
                Ok(uri) => {
                    parts.uri = uri;
                    parts.extensions.insert(CurrentUrl(path.clone()));
                }
                Err(err) => {
                    tracing::error!(r#"Could not continue "{path}" as "{target}": {err}"#);
                }
            }

            parts.extensions.insert(PathBeforeAlias(path));
        }
        Resolution::Redirect { path, location } => match redirect_response(&location) {
            Ok(response) => return response,
            Err(err) => {
                tracing::error!(r#"Could not redirect "{path}" to "{location}": {err}"#);

                parts.extensions.insert(PathBeforeAlias(path));
            }
        },
    }

    next.run(Request::from_parts(parts, body)).await
}
