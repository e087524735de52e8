//! All things related to the storage of url aliases

use core::fmt;

use async_trait::async_trait;

pub use memory::Memory;
pub use postgres::Postgres;

use crate::aliases::UrlAlias;

mod memory;
mod postgres;

/// Default amount of records in a single page
pub const DEFAULT_LIMIT: u32 = 20;

/// Maximum amount of records in a single page
pub const MAX_LIMIT: u32 = 200;

/// Storage errors
#[derive(Debug)]
pub enum Error {
    /// The requested record does not exist
    NotFound,

    /// A connection error with the storage
    Connection(String),
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::NotFound => write!(f, "Record not found"),
            Error::Connection(error) => write!(f, "Connection error: {error}"),
        }
    }
}

/// Result type for all storage interactions
pub type Result<T> = core::result::Result<T, Error>;

/// Values to create or update an url alias with
pub struct AliasValues<'a> {
    /// The public facing path
    pub alias: &'a str,

    /// The internal path the alias points to
    pub target: &'a str,

    /// The locale of the alias
    pub locale: &'a str,
}

impl<'a> AliasValues<'a> {
    /// Values for a fresh url alias
    pub fn new(alias: &'a str, target: &'a str, locale: &'a str) -> Self {
        Self {
            alias,
            target,
            locale,
        }
    }

    /// Take the values from an existing record
    pub fn from_alias(alias: &'a UrlAlias) -> Self {
        Self {
            alias: &alias.alias,
            target: &alias.target,
            locale: &alias.locale,
        }
    }
}

/// Columns a list of url aliases can be ordered by
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderColumn {
    /// Identifier
    Id,

    /// Alias path
    Alias,

    /// Target path
    Target,

    /// Locale
    Locale,

    /// Creation date
    CreatedAt,

    /// Last updated at
    UpdatedAt,
}

impl OrderColumn {
    /// Parse a column name as used by the outside world
    ///
    /// Both camelCase and snake_case are accepted
    fn parse(column: &str) -> Option<Self> {
        match column {
            "id" => Some(Self::Id),
            "alias" => Some(Self::Alias),
            "target" => Some(Self::Target),
            "locale" => Some(Self::Locale),
            "createdAt" | "created_at" => Some(Self::CreatedAt),
            "updatedAt" | "updated_at" => Some(Self::UpdatedAt),
            _ => None,
        }
    }

    /// The column name in storage
    pub fn column_name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Alias => "alias",
            Self::Target => "target",
            Self::Locale => "locale",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
        }
    }
}

/// Ordering of a list of url aliases
///
/// Equal values are always ordered by ID in the same direction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListOrder {
    /// Column to order by
    pub column: OrderColumn,

    /// Descending order
    pub descending: bool,
}

impl Default for ListOrder {
    /// Newest first
    fn default() -> Self {
        Self {
            column: OrderColumn::CreatedAt,
            descending: true,
        }
    }
}

impl ListOrder {
    /// Parse an order from the outside world
    ///
    /// ```text
    /// createdAt
    /// createdAt desc
    /// alias ASC
    /// ```
    ///
    /// Returns `None` for unknown columns or directions
    pub fn parse(order: &str) -> Option<Self> {
        let mut parts = order.split_whitespace();

        let column = OrderColumn::parse(parts.next()?)?;

        let descending = match parts.next() {
            None => false,
            Some(direction) if direction.eq_ignore_ascii_case("asc") => false,
            Some(direction) if direction.eq_ignore_ascii_case("desc") => true,
            Some(_) => return None,
        };

        if parts.next().is_some() {
            return None;
        }

        Some(Self { column, descending })
    }

    /// SQL direction keyword
    pub fn direction(self) -> &'static str {
        if self.descending { "DESC" } else { "ASC" }
    }
}

/// Query for a list of url aliases
#[derive(Clone, Debug)]
pub struct ListQuery {
    /// Case-insensitive substring to look for in the alias or target
    pub filter: Option<String>,

    /// Order of the results
    pub order: ListOrder,

    /// Maximum amount of results
    pub limit: u32,

    /// Amount of results to skip
    pub offset: u32,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            filter: None,
            order: ListOrder::default(),
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl ListQuery {
    /// The filter, if it contains anything to filter on
    pub fn active_filter(&self) -> Option<&str> {
        self.filter.as_deref().filter(|filter| !filter.is_empty())
    }
}

/// Storage with all supported operations
#[async_trait]
pub trait Storage: Clone + Send + Sync + 'static {
    /// Find the newest url alias where either the alias or the target equals the path
    ///
    /// Nothing found is not an error
    async fn find_single_alias_by_alias_or_target(&self, path: &str) -> Result<Option<UrlAlias>>;

    /// Find a single url alias by its ID
    async fn find_single_alias_by_id(&self, id: i64) -> Result<UrlAlias>;

    /// Find the newest url alias for a target
    async fn find_single_alias_by_target(&self, target: &str) -> Result<UrlAlias>;

    /// Create an url alias
    async fn create_alias(&self, values: &AliasValues<'_>) -> Result<UrlAlias>;

    /// Update all mutable fields of an url alias
    async fn update_alias(&self, id: i64, values: &AliasValues<'_>) -> Result<UrlAlias>;

    /// Create the url alias when it was never saved, update it otherwise
    async fn save_alias(&self, alias: &UrlAlias) -> Result<UrlAlias> {
        let values = AliasValues::from_alias(alias);

        if alias.is_new() {
            self.create_alias(&values).await
        } else {
            self.update_alias(alias.id, &values).await
        }
    }

    /// Hard-delete a single url alias
    async fn delete_alias_by_id(&self, id: i64) -> Result<()>;

    /// Hard-delete all url aliases of a target, returns the amount deleted
    async fn delete_aliases_by_target(&self, target: &str) -> Result<u64>;

    /// Find a page of url aliases and the total amount matching the filter
    async fn find_aliases(&self, query: &ListQuery) -> Result<(Vec<UrlAlias>, u64)>;
}
