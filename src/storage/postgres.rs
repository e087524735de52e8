//! Postgres storage

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::PgPool;
use sqlx::QueryBuilder;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;

use crate::aliases::UrlAlias;

use super::AliasValues;
use super::Error;
use super::ListQuery;
use super::Result;
use super::Storage;

/// Migrator to run migrations on startup
static MIGRATOR: Migrator = sqlx::migrate!();

/// Columns selected for every url alias
const COLUMNS: &str = "id, alias, target, locale, created_at, updated_at";

/// Postgres storage
#[derive(Clone)]
pub struct Postgres {
    /// Pool of connections
    connection_pool: PgPool,
}

impl Postgres {
    /// Create Postgres storage from a connection string
    ///
    /// Migrations will be run
    pub async fn connect(database_connection_string: &str) -> Result<Self> {
        let connection_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_connection_string)
            .await
            .map_err(connection_error)?;

        Self::new_with_pool(connection_pool).await
    }

    /// Create Postgres storage with existing pool
    ///
    /// Migrations will be run
    pub async fn new_with_pool(connection_pool: PgPool) -> Result<Self> {
        MIGRATOR
            .run(&connection_pool)
            .await
            .map_err(|err| Error::Connection(format!("Migrations could not run: {err}")))?;

        Ok(Self { connection_pool })
    }
}

/// `SQLx` version of an url alias
#[derive(sqlx::FromRow)]
struct SqlxUrlAlias {
    /// Url alias ID
    id: i64,

    /// Public facing path
    alias: String,

    /// Internal path
    target: String,

    /// Locale
    locale: String,

    /// Creation date
    created_at: NaiveDateTime,

    /// Last updated at
    updated_at: NaiveDateTime,
}

impl UrlAlias {
    /// Create url alias from `SQLx` version
    fn from_sqlx_alias(alias: SqlxUrlAlias) -> Self {
        Self {
            id: alias.id,
            alias: alias.alias,
            target: alias.target,
            locale: alias.locale,
            created_at: alias.created_at,
            updated_at: alias.updated_at,
        }
    }

    /// Maybe create url alias from `SQLx` version
    fn from_sqlx_alias_optional(alias: Option<SqlxUrlAlias>) -> Option<Self> {
        alias.map(Self::from_sqlx_alias)
    }
}

/// Escape the LIKE metacharacters of a user provided filter
fn like_pattern(filter: &str) -> String {
    let mut pattern = String::with_capacity(filter.len() + 2);

    pattern.push('%');
    for ch in filter.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');

    pattern
}

/// Add the free text filter to a query
fn push_filter(query: &mut QueryBuilder<'_, sqlx::Postgres>, filter: Option<&str>) {
    if let Some(filter) = filter {
        let pattern = like_pattern(filter);

        query
            .push(" WHERE (alias ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR target ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait]
impl Storage for Postgres {
    async fn find_single_alias_by_alias_or_target(&self, path: &str) -> Result<Option<UrlAlias>> {
        let alias = sqlx::query_as::<_, SqlxUrlAlias>(&format!(
            r"
            SELECT {COLUMNS}
            FROM url_aliases
            WHERE alias = $1 OR target = $1
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "
        ))
        .bind(path)
        .fetch_optional(&self.connection_pool)
        .await
        .map(UrlAlias::from_sqlx_alias_optional)
        .map_err(connection_error)?;

        Ok(alias)
    }

    async fn find_single_alias_by_id(&self, id: i64) -> Result<UrlAlias> {
        sqlx::query_as::<_, SqlxUrlAlias>(&format!(
            r"
            SELECT {COLUMNS}
            FROM url_aliases
            WHERE id = $1
            "
        ))
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
        .map(UrlAlias::from_sqlx_alias_optional)
        .map_err(connection_error)?
        .ok_or(Error::NotFound)
    }

    async fn find_single_alias_by_target(&self, target: &str) -> Result<UrlAlias> {
        sqlx::query_as::<_, SqlxUrlAlias>(&format!(
            r"
            SELECT {COLUMNS}
            FROM url_aliases
            WHERE target = $1
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "
        ))
        .bind(target)
        .fetch_optional(&self.connection_pool)
        .await
        .map(UrlAlias::from_sqlx_alias_optional)
        .map_err(connection_error)?
        .ok_or(Error::NotFound)
    }

    async fn create_alias(&self, values: &AliasValues<'_>) -> Result<UrlAlias> {
        let alias = sqlx::query_as::<_, SqlxUrlAlias>(&format!(
            r"
            INSERT INTO url_aliases (alias, target, locale)
            VALUES ($1, $2, $3)
            RETURNING {COLUMNS}
            "
        ))
        .bind(values.alias)
        .bind(values.target)
        .bind(values.locale)
        .fetch_one(&self.connection_pool)
        .await
        .map(UrlAlias::from_sqlx_alias)
        .map_err(connection_error)?;

        Ok(alias)
    }

    async fn update_alias(&self, id: i64, values: &AliasValues<'_>) -> Result<UrlAlias> {
        sqlx::query_as::<_, SqlxUrlAlias>(&format!(
            r"
            UPDATE url_aliases
            SET alias = $1, target = $2, locale = $3, updated_at = CURRENT_TIMESTAMP
            WHERE id = $4
            RETURNING {COLUMNS}
            "
        ))
        .bind(values.alias)
        .bind(values.target)
        .bind(values.locale)
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
        .map(UrlAlias::from_sqlx_alias_optional)
        .map_err(connection_error)?
        .ok_or(Error::NotFound)
    }

    async fn delete_alias_by_id(&self, id: i64) -> Result<()> {
        let result = sqlx::query(
            r"
            DELETE FROM url_aliases
            WHERE id = $1
            ",
        )
        .bind(id)
        .execute(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        if result.rows_affected() == 0 {
            Err(Error::NotFound)
        } else {
            Ok(())
        }
    }

    async fn delete_aliases_by_target(&self, target: &str) -> Result<u64> {
        let result = sqlx::query(
            r"
            DELETE FROM url_aliases
            WHERE target = $1
            ",
        )
        .bind(target)
        .execute(&self.connection_pool)
        .await
        .map_err(connection_error)?;

        Ok(result.rows_affected())
    }

    async fn find_aliases(&self, query: &ListQuery) -> Result<(Vec<UrlAlias>, u64)> {
        let mut select = QueryBuilder::<sqlx::Postgres>::new(format!(
            "SELECT {COLUMNS} FROM url_aliases"
        ));
        push_filter(&mut select, query.active_filter());

        // column names come from a fixed list, never from the request
        select
            .push(format!(
                " ORDER BY {column} {direction}, id {direction}",
                column = query.order.column.column_name(),
                direction = query.order.direction(),
            ))
            .push(" LIMIT ")
            .push_bind(i64::from(query.limit))
            .push(" OFFSET ")
            .push_bind(i64::from(query.offset));

        let aliases = select
            .build_query_as::<SqlxUrlAlias>()
            .fetch_all(&self.connection_pool)
            .await
            .map_err(connection_error)?
            .into_iter()
            .map(UrlAlias::from_sqlx_alias)
            .collect();

        let mut count = QueryBuilder::<sqlx::Postgres>::new("SELECT COUNT(*) FROM url_aliases");
        push_filter(&mut count, query.active_filter());

        let count = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.connection_pool)
            .await
            .map_err(connection_error)?;

        Ok((aliases, u64::try_from(count).unwrap_or_default()))
    }
}

/// Utility function for mapping any error into a connection error
fn connection_error(err: sqlx::Error) -> Error {
    match err {
        sqlx::Error::RowNotFound => Error::NotFound,
        err => Error::Connection(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::storage::ListOrder;
    use crate::storage::OrderColumn;

    #[test]
    fn test_like_pattern() {
        assert_eq!("%about%", like_pattern("about"));
        assert_eq!("%100\\%%", like_pattern("100%"));
        assert_eq!("%snake\\_case%", like_pattern("snake_case"));
        assert_eq!("%back\\\\slash%", like_pattern("back\\slash"));
    }

    #[sqlx::test]
    #[ignore = "requires a Postgres database in DATABASE_URL"]
    async fn test_postgres_newest_wins(pool: PgPool) {
        let storage = Postgres::new_with_pool(pool).await.unwrap();

        let values = AliasValues {
            alias: "/about-us",
            target: "/content/42",
            locale: "en",
        };

        let first = storage.create_alias(&values).await.unwrap();
        let second = storage.create_alias(&values).await.unwrap();
        assert!(second.id > first.id);

        let found = storage
            .find_single_alias_by_alias_or_target("/content/42")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.id, found.id);

        let found = storage
            .find_single_alias_by_target("/content/42")
            .await
            .unwrap();
        assert_eq!(second.id, found.id);

        let missing = storage
            .find_single_alias_by_alias_or_target("/nothing")
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[sqlx::test]
    #[ignore = "requires a Postgres database in DATABASE_URL"]
    async fn test_postgres_crud(pool: PgPool) {
        let storage = Postgres::new_with_pool(pool).await.unwrap();

        let created = storage
            .create_alias(&AliasValues {
                alias: "/about-us",
                target: "/content/42",
                locale: "en",
            })
            .await
            .unwrap();

        let updated = storage
            .update_alias(
                created.id,
                &AliasValues {
                    alias: "/about",
                    target: "/content/42",
                    locale: "en",
                },
            )
            .await
            .unwrap();
        assert_eq!("/about", updated.alias);

        storage
            .create_alias(&AliasValues {
                alias: "/100%-real",
                target: "/content/43",
                locale: "en",
            })
            .await
            .unwrap();

        let query = ListQuery {
            filter: Some("%".to_string()),
            order: ListOrder {
                column: OrderColumn::Alias,
                descending: false,
            },
            ..ListQuery::default()
        };
        let (aliases, count) = storage.find_aliases(&query).await.unwrap();
        assert_eq!(1, count);
        assert_eq!("/100%-real", aliases[0].alias);

        assert_eq!(
            1,
            storage.delete_aliases_by_target("/content/43").await.unwrap()
        );

        storage.delete_alias_by_id(created.id).await.unwrap();
        assert!(matches!(
            storage.find_single_alias_by_id(created.id).await,
            Err(Error::NotFound)
        ));
        assert!(matches!(
            storage.delete_alias_by_id(created.id).await,
            Err(Error::NotFound)
        ));
    }
}
