//! Memory storage
//!
//! Will be destroyed on system shutdown

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering as AtomicOrdering;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::aliases::UrlAlias;

use super::AliasValues;
use super::Error;
use super::ListOrder;
use super::ListQuery;
use super::OrderColumn;
use super::Result;
use super::Storage;

/// An in-memory storage
///
/// Will be destroyed on system shutdown
#[derive(Clone, Debug)]
pub struct Memory {
    /// All url aliases in storage
    aliases: Arc<Mutex<HashMap<i64, UrlAlias>>>,

    /// Last handed out ID
    last_id: Arc<AtomicI64>,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory {
    /// Create a new empty Memory storage
    pub fn new() -> Self {
        Self {
            aliases: Arc::new(Mutex::new(HashMap::new())),
            last_id: Arc::new(AtomicI64::new(0)),
        }
    }

    /// Hand out the next ID
    fn next_id(&self) -> i64 {
        self.last_id.fetch_add(1, AtomicOrdering::SeqCst) + 1
    }
}

/// Most recently created first, ID breaks the tie
fn newest_first(a: &UrlAlias, b: &UrlAlias) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}

/// Compare two url aliases for a list order
fn compare(order: ListOrder, a: &UrlAlias, b: &UrlAlias) -> Ordering {
    let ordering = match order.column {
        OrderColumn::Id => a.id.cmp(&b.id),
        OrderColumn::Alias => a.alias.cmp(&b.alias),
        OrderColumn::Target => a.target.cmp(&b.target),
        OrderColumn::Locale => a.locale.cmp(&b.locale),
        OrderColumn::CreatedAt => a.created_at.cmp(&b.created_at),
        OrderColumn::UpdatedAt => a.updated_at.cmp(&b.updated_at),
    }
    .then_with(|| a.id.cmp(&b.id));

    if order.descending {
        ordering.reverse()
    } else {
        ordering
    }
}

/// Case-insensitive substring match on alias or target
fn matches_filter(alias: &UrlAlias, filter: Option<&str>) -> bool {
    let Some(filter) = filter else {
        return true;
    };

    let filter = filter.to_lowercase();

    alias.alias.to_lowercase().contains(&filter) || alias.target.to_lowercase().contains(&filter)
}

#[async_trait]
impl Storage for Memory {
    async fn find_single_alias_by_alias_or_target(&self, path: &str) -> Result<Option<UrlAlias>> {
        Ok(self
            .aliases
            .lock()
            .await
            .values()
            .filter(|alias| alias.alias == path || alias.target == path)
            .min_by(|a, b| newest_first(a, b))
            .cloned())
    }

    async fn find_single_alias_by_id(&self, id: i64) -> Result<UrlAlias> {
        self.aliases
            .lock()
            .await
            .get(&id)
            .cloned()
            .ok_or(Error::NotFound)
    }

    async fn find_single_alias_by_target(&self, target: &str) -> Result<UrlAlias> {
        self.aliases
            .lock()
            .await
            .values()
            .filter(|alias| alias.target == target)
            .min_by(|a, b| newest_first(a, b))
            .cloned()
            .ok_or(Error::NotFound)
    }

    async fn create_alias(&self, values: &AliasValues<'_>) -> Result<UrlAlias> {
        let now = Utc::now().naive_utc();

        let alias = UrlAlias {
            id: self.next_id(),
            alias: values.alias.to_string(),
            target: values.target.to_string(),
            locale: values.locale.to_string(),
            created_at: now,
            updated_at: now,
        };

        self.aliases.lock().await.insert(alias.id, alias.clone());

        Ok(alias)
    }

    async fn update_alias(&self, id: i64, values: &AliasValues<'_>) -> Result<UrlAlias> {
        self.aliases
            .lock()
            .await
            .get_mut(&id)
            .map(|alias| {
                alias.alias = values.alias.to_string();
                alias.target = values.target.to_string();
                alias.locale = values.locale.to_string();
                alias.updated_at = Utc::now().naive_utc();

                alias.clone()
            })
            .ok_or(Error::NotFound)
    }

    async fn delete_alias_by_id(&self, id: i64) -> Result<()> {
        self.aliases
            .lock()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(Error::NotFound)
    }

    async fn delete_aliases_by_target(&self, target: &str) -> Result<u64> {
        let mut aliases = self.aliases.lock().await;

        let before = aliases.len();
        aliases.retain(|_, alias| alias.target != target);

        Ok((before - aliases.len()) as u64)
    }

    async fn find_aliases(&self, query: &ListQuery) -> Result<(Vec<UrlAlias>, u64)> {
        let mut aliases = self
            .aliases
            .lock()
            .await
            .values()
            .filter(|alias| matches_filter(alias, query.active_filter()))
            .cloned()
            .collect::<Vec<UrlAlias>>();

        let count = aliases.len() as u64;

        aliases.sort_by(|a, b| compare(query.order, a, b));

        let page = aliases
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .collect();

        Ok((page, count))
    }
}
