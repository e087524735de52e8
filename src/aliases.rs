//! Url aliases
//!
//! The record mapping a public path to an internal path, and the helpers other parts of an
//! application use to register aliases for the resources they own

use chrono::NaiveDateTime;
use unicode_normalization::UnicodeNormalization;
use url::Url;

use crate::config::Config;
use crate::storage::Error;
use crate::storage::Result;
use crate::storage::Storage;

/// Alias for an internal path
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UrlAlias {
    /// Url alias ID, `0` when it is not saved yet
    pub id: i64,

    /// The public facing path, like `/about-us`
    pub alias: String,

    /// The internal path, like `/content/42`
    pub target: String,

    /// Locale of the alias
    pub locale: String,

    /// Creation date
    pub created_at: NaiveDateTime,

    /// Last updated at
    pub updated_at: NaiveDateTime,
}

impl UrlAlias {
    /// An url alias that is not saved yet
    pub fn draft(alias: &str, target: &str, locale: &str) -> Self {
        Self {
            id: 0,
            alias: alias.to_string(),
            target: target.to_string(),
            locale: locale.to_string(),
            created_at: NaiveDateTime::default(),
            updated_at: NaiveDateTime::default(),
        }
    }

    /// Is the url alias never saved?
    pub fn is_new(&self) -> bool {
        self.id == 0
    }

    /// Path of the page of the url alias itself
    ///
    /// Empty for unsaved aliases
    pub fn path(&self) -> String {
        if self.is_new() {
            String::new()
        } else {
            format!("/url-alias/{}", self.id)
        }
    }

    /// Full link to the page of the url alias itself
    pub fn link_permanent(&self, origin: &Url) -> String {
        format!("{}{}", origin.as_str().trim_end_matches('/'), self.path())
    }
}

/// Normalize a path before it is stored or compared
///
/// - Surrounding whitespace is removed
/// - Unicode normalization (NFC)
/// - Trailing slashes are removed, except for the root itself
pub fn normalize_path(path: &str) -> String {
    let path = path.trim().nfc().collect::<String>();

    let trimmed = path.trim_end_matches('/');

    if trimmed.is_empty() && path.starts_with('/') {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Pick the given locale, or the configured default when there is none
fn locale_or_default<'a>(config: &'a Config, locale: Option<&'a str>) -> &'a str {
    locale
        .filter(|locale| !locale.is_empty())
        .unwrap_or(&config.default_locale)
}

/// Find the alias of a target, a missing alias is not an error
async fn find_by_target<S: Storage>(storage: &S, target: &str) -> Result<Option<UrlAlias>> {
    match storage.find_single_alias_by_target(target).await {
        Ok(alias) => Ok(Some(alias)),
        Err(Error::NotFound) => Ok(None),
        Err(err) => Err(err),
    }
}

/// Make sure a target has an alias
///
/// When the target already has an alias it is kept as is, even when it differs from the
/// requested alias
pub async fn create_if_absent<S: Storage>(
    storage: &S,
    config: &Config,
    alias: &str,
    target: &str,
    locale: Option<&str>,
) -> Result<UrlAlias> {
    let target = normalize_path(target);

    if let Some(existing) = find_by_target(storage, &target).await? {
        tracing::debug!(
            r#"Target "{target}" already has alias "{}", skipping"#,
            existing.alias
        );

        return Ok(existing);
    }

    let alias = normalize_path(alias);
    let draft = UrlAlias::draft(&alias, &target, locale_or_default(config, locale));

    let created = storage.save_alias(&draft).await?;

    tracing::debug!(r#"Created alias "{alias}" for target "{target}""#);

    Ok(created)
}

/// Make sure a target has exactly the requested alias
///
/// An existing alias of the target with a different path is updated in place, its target and
/// locale are left untouched
pub async fn upsert<S: Storage>(
    storage: &S,
    config: &Config,
    alias: &str,
    target: &str,
    locale: Option<&str>,
) -> Result<UrlAlias> {
    let alias = normalize_path(alias);
    let target = normalize_path(target);

    if let Some(mut existing) = find_by_target(storage, &target).await? {
        if existing.alias == alias {
            return Ok(existing);
        }

        tracing::debug!(
            r#"Moving target "{target}" from alias "{}" to "{alias}""#,
            existing.alias
        );

        existing.alias = alias;

        return storage.save_alias(&existing).await;
    }

    let draft = UrlAlias::draft(&alias, &target, locale_or_default(config, locale));

    let created = storage.save_alias(&draft).await?;

    tracing::debug!(r#"Created alias "{}" for target "{target}""#, created.alias);

    Ok(created)
}

/// Remove every alias of a target, used when the target itself is removed
pub async fn delete_by_target<S: Storage>(storage: &S, target: &str) -> Result<u64> {
    let target = normalize_path(target);

    let deleted = storage.delete_aliases_by_target(&target).await?;

    tracing::debug!(r#"Deleted {deleted} alias(es) of target "{target}""#);

    Ok(deleted)
}
