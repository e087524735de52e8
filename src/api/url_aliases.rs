//! Url aliases API endpoints
//!
//! Everything related to the url aliases management

use std::sync::Arc;

use axum::Extension;
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde::Serialize;
use url::Url;

use crate::aliases::UrlAlias;
use crate::config::Config;
use crate::storage;
use crate::storage::AliasValues;
use crate::storage::DEFAULT_LIMIT;
use crate::storage::ListOrder;
use crate::storage::ListQuery;
use crate::storage::MAX_LIMIT;
use crate::storage::Storage;

use super::CreateGrant;
use super::DeleteGrant;
use super::Error;
use super::Form;
use super::Granted;
use super::Meta;
use super::PathParameters;
use super::QueryParameters;
use super::Success;
use super::UpdateGrant;
use super::parse_path;

/// Url alias response going to the user
///
/// Basically filtering which fields are shown to the user
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlAliasResponse {
    /// Url alias ID
    pub id: i64,

    /// The public facing path
    pub alias: String,

    /// The internal path
    pub target: String,

    /// Locale of the alias
    pub locale: String,

    /// Creation date
    pub created_at: NaiveDateTime,

    /// Last updated at
    pub updated_at: NaiveDateTime,

    /// Full link to the page of the url alias itself
    pub link_permanent: String,
}

impl UrlAliasResponse {
    /// Create a response from an [`UrlAlias`](UrlAlias)
    fn from_url_alias(url_alias: UrlAlias, origin: &Url) -> Self {
        let link_permanent = url_alias.link_permanent(origin);

        Self {
            id: url_alias.id,
            alias: url_alias.alias,
            target: url_alias.target,
            locale: url_alias.locale,
            created_at: url_alias.created_at,
            updated_at: url_alias.updated_at,
            link_permanent,
        }
    }

    /// Create a response from multiple [`UrlAlias`](UrlAlias)es
    fn from_url_alias_multiple(url_aliases: Vec<UrlAlias>, origin: &Url) -> Vec<Self> {
        url_aliases
            .into_iter()
            .map(|url_alias| Self::from_url_alias(url_alias, origin))
            .collect()
    }
}

/// Request bodies are wrapped in a field named after the resource
#[derive(Debug, Deserialize)]
pub struct UrlAliasBody<F> {
    #[serde(rename = "url-alia")]
    url_alias: F,
}

/// Query parameters of the list endpoints
#[derive(Debug, Default, Deserialize)]
pub struct ListParameters {
    /// Free text filter on alias and target
    q: Option<String>,

    /// Order like `createdAt desc`
    order: Option<String>,

    /// Maximum amount of results
    limit: Option<u32>,

    /// Amount of results to skip
    offset: Option<u32>,
}

impl ListParameters {
    fn into_query(self) -> ListQuery {
        ListQuery {
            filter: self.q.map(|q| q.trim().to_string()),
            order: self
                .order
                .as_deref()
                .and_then(ListOrder::parse)
                .unwrap_or_default(),
            limit: self.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT),
            offset: self.offset.unwrap_or(0),
        }
    }
}

/// List url aliases
///
/// Request:
/// ```sh
/// curl -v 'http://localhost:6000/api/url-alia?q=about&order=alias%20asc&limit=10'
/// ```
///
/// Response:
/// ```json
/// { "url-alia": [ { "id": 1, "alias": "/about-us" ... } ], "meta": { "count": 1 } }
/// ```
pub async fn list<S: Storage>(
    Extension(storage): Extension<S>,
    Extension(config): Extension<Arc<Config>>,
    QueryParameters(parameters): QueryParameters<ListParameters>,
) -> Result<Success<Vec<UrlAliasResponse>>, Error> {
    let query = parameters.into_query();

    let (url_aliases, count) = storage
        .find_aliases(&query)
        .await
        .map_err(Error::internal_server_error)?;

    Ok(Success::ok(UrlAliasResponse::from_url_alias_multiple(
        url_aliases,
        &config.origin,
    ))
    .with_meta(Meta { count }))
}

/// Count url aliases, with the same filter as the list
///
/// Request:
/// ```sh
/// curl -v 'http://localhost:6000/api/url-alia/count?q=about'
/// ```
///
/// Response:
/// ```json
/// { "meta": { "count": 1 } }
/// ```
pub async fn count<S: Storage>(
    Extension(storage): Extension<S>,
    QueryParameters(parameters): QueryParameters<ListParameters>,
) -> Result<Success<()>, Error> {
    let query = ListQuery {
        limit: 0,
        ..parameters.into_query()
    };

    let (_, count) = storage
        .find_aliases(&query)
        .await
        .map_err(Error::internal_server_error)?;

    Ok(Success::meta(Meta { count }))
}

/// Get single url alias
///
/// Request:
/// ```sh
/// curl -v http://localhost:6000/api/url-alia/1
/// ```
///
/// Response:
/// ```json
/// { "url-alia": { "id": 1, "alias": "/about-us" ... } }
/// ```
pub async fn single<S: Storage>(
    Extension(storage): Extension<S>,
    Extension(config): Extension<Arc<Config>>,
    PathParameters(id): PathParameters<i64>,
) -> Result<Success<UrlAliasResponse>, Error> {
    fetch_url_alias(&storage, id)
        .await
        .map(|url_alias| Success::ok(UrlAliasResponse::from_url_alias(url_alias, &config.origin)))
}

/// Create url alias form
///
/// Fields to create an url alias
#[derive(Debug, Deserialize)]
pub struct CreateUrlAliasForm {
    /// The public facing path
    alias: String,

    /// The internal path
    target: String,

    /// Locale, falls back to the configured default
    locale: Option<String>,
}

/// Create an url alias based on the [`CreateUrlAliasForm`](CreateUrlAliasForm) form
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     -H 'Authorization: Bearer tokentokentoken' \
///     -d '{ "url-alia": { "alias": "/about-us", "target": "/content/42" } }' \
///     http://localhost:6000/api/url-alia
/// ```
///
/// Response
/// ```json
/// { "url-alia": { "id": 1, "alias": "/about-us" ... } }
/// ```
pub async fn create<S: Storage>(
    Extension(storage): Extension<S>,
    Extension(config): Extension<Arc<Config>>,
    granted: Granted<CreateGrant>,
    Form(body): Form<UrlAliasBody<CreateUrlAliasForm>>,
) -> Result<Success<UrlAliasResponse>, Error> {
    let form = body.url_alias;

    let alias = parse_path("Alias", &form.alias)?;
    let target = parse_path("Target", &form.target)?;
    let locale = parse_locale(form.locale.as_deref(), &config.default_locale);

    validate_pair(&alias, &target)?;

    let values = AliasValues::new(&alias, &target, &locale);

    let url_alias = storage
        .create_alias(&values)
        .await
        .map_err(Error::internal_server_error)?;

    tracing::info!(
        r#"{} created alias "{}" for "{}""#,
        granted.principal.subject,
        url_alias.alias,
        url_alias.target
    );

    Ok(Success::created(UrlAliasResponse::from_url_alias(
        url_alias,
        &config.origin,
    )))
}

/// Update url alias form
///
/// Only the provided fields are changed
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUrlAliasForm {
    /// The public facing path
    alias: Option<String>,

    /// The internal path
    target: Option<String>,

    /// Locale of the alias
    locale: Option<String>,
}

/// Update an url alias based on the [`UpdateUrlAliasForm`](UpdateUrlAliasForm) form
///
/// Request:
/// ```sh
/// curl -v -XPUT -H 'Content-Type: application/json' \
///     -H 'Authorization: Bearer tokentokentoken' \
///     -d '{ "url-alia": { "alias": "/who-we-are" } }' \
///     http://localhost:6000/api/url-alia/1
/// ```
///
/// Response
/// ```json
/// { "url-alia": { "id": 1, "alias": "/who-we-are" ... } }
/// ```
pub async fn update<S: Storage>(
    Extension(storage): Extension<S>,
    Extension(config): Extension<Arc<Config>>,
    granted: Granted<UpdateGrant>,
    PathParameters(id): PathParameters<i64>,
    Form(body): Form<UrlAliasBody<UpdateUrlAliasForm>>,
) -> Result<Success<UrlAliasResponse>, Error> {
    let form = body.url_alias;

    let mut url_alias = fetch_url_alias(&storage, id).await?;

    if let Some(alias) = form.alias {
        url_alias.alias = parse_path("Alias", &alias)?;
    }

    if let Some(target) = form.target {
        url_alias.target = parse_path("Target", &target)?;
    }

    if let Some(locale) = form.locale {
        url_alias.locale = parse_locale(Some(&locale), &url_alias.locale);
    }

    validate_pair(&url_alias.alias, &url_alias.target)?;

    let url_alias = storage
        .save_alias(&url_alias)
        .await
        .map_err(|err| map_storage_error(&err))?;

    tracing::info!(
        r#"{} updated alias {} to "{}" for "{}""#,
        granted.principal.subject,
        url_alias.id,
        url_alias.alias,
        url_alias.target
    );

    Ok(Success::ok(UrlAliasResponse::from_url_alias(
        url_alias,
        &config.origin,
    )))
}

/// Delete an url alias
///
/// Request:
/// ```sh
/// curl -v -XDELETE \
///     -H 'Authorization: Bearer tokentokentoken' \
///     http://localhost:6000/api/url-alia/1
/// ```
pub async fn delete<S: Storage>(
    Extension(storage): Extension<S>,
    granted: Granted<DeleteGrant>,
    PathParameters(id): PathParameters<i64>,
) -> Result<Success<&'static str>, Error> {
    storage
        .delete_alias_by_id(id)
        .await
        .map_err(|err| map_storage_error(&err))?;

    tracing::info!("{} deleted alias {id}", granted.principal.subject);

    Ok(Success::<&'static str>::no_content())
}

/// Pick the locale from the form, or the fallback when there is none
fn parse_locale(locale: Option<&str>, fallback: &str) -> String {
    locale
        .map(str::trim)
        .filter(|locale| !locale.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

/// Rules that need both the alias and the target
fn validate_pair(alias: &str, target: &str) -> Result<(), Error> {
    if alias == "/api" || alias.starts_with("/api/") {
        return Err(Error::bad_request(r#"Alias can not start with "/api/""#));
    }

    if alias == target {
        return Err(Error::bad_request("Alias and target can not be the same"));
    }

    Ok(())
}

/// Unknown url aliases are a 404, everything else is on us
fn map_storage_error(err: &storage::Error) -> Error {
    match err {
        storage::Error::NotFound => Error::not_found("Url alias not found"),
        storage::Error::Connection(_) => Error::internal_server_error(err),
    }
}

/// Fetch url alias from storage
async fn fetch_url_alias<S: Storage>(storage: &S, id: i64) -> Result<UrlAlias, Error> {
    storage
        .find_single_alias_by_id(id)
        .await
        .map_err(|err| map_storage_error(&err))
}
