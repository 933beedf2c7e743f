use serde::de::DeserializeOwned;
use serde::Deserialize;
use snafu::{Location, ResultExt as _, Snafu};
use surrealdb::{
    engine::any::Any,
    opt::{auth, IntoQuery, QueryResult},
    Surreal,
};
use url::Url;

pub use surrealdb::sql::Thing;

pub use query::{Filter, FilterValue, ListQuery, Page, SortOrder};
pub use record::{Record, Table};
pub use store::DocumentStore;

use crate::Located;

/// Typed record ids.
mod record;

/// List queries over a collection.
mod query;

/// The document store contract and its SurrealDB implementation.
mod store;

pub type Result<T, E = DatabaseError> = std::result::Result<T, E>;

const SCHEMA: &str = include_str!("../schema.surrealql");

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DatabaseError {
    #[snafu(display("cannot connect to the database `{url}` at {location}: {source}"))]
    Connection {
        url: String,
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("failed to query the database at {location}: {source}"))]
    Query {
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("failed to deserialize the database response at {location}: {source}"))]
    Deserialize {
        source: surrealdb::Error,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("failed to parse the database response at {location}: response is empty"))]
    EmptyQuery {
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("record `{id}` does not exist"))]
    NotFound {
        id: String,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("`{field}` is not a valid field name"))]
    InvalidField {
        field: String,
        #[snafu(implicit)]
        location: Location,
    },
}

impl DatabaseError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DatabaseError::NotFound { .. })
    }
}

impl Located for DatabaseError {
    fn location(&self) -> Location {
        match self {
            DatabaseError::Connection { location, .. }
            | DatabaseError::Query { location, .. }
            | DatabaseError::Deserialize { location, .. }
            | DatabaseError::EmptyQuery { location, .. }
            | DatabaseError::NotFound { location, .. }
            | DatabaseError::InvalidField { location, .. } => *location,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(rename = "surreal_url")]
    pub url: Url,
    #[serde(rename = "surreal_ns", default = "default_name")]
    pub namespace: String,
    #[serde(rename = "surreal_db", default = "default_name")]
    pub database: String,
    #[serde(flatten)]
    pub credentials: Option<DatabaseCredentials>,
}

fn default_name() -> String {
    "reelfeed".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseCredentials {
    #[serde(rename = "surreal_user")]
    pub username: String,
    #[serde(rename = "surreal_pass")]
    pub password: String,
}

/// Handle to the document store.
///
/// Cloning is cheap, every clone shares the same connection.
#[derive(Debug, Clone)]
pub struct Database {
    database: Surreal<Any>,
}

impl Database {
    /// Connects to the store described by `config`, signs in when credentials are present and
    /// selects the namespace and database.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let url = config.url.to_string();

        let database = surrealdb::engine::any::connect(url.as_str())
            .await
            .context(ConnectionSnafu { url: url.clone() })?;

        if let Some(credentials) = &config.credentials {
            database
                .signin(auth::Database {
                    namespace: &config.namespace,
                    database: &config.database,
                    username: &credentials.username,
                    password: &credentials.password,
                })
                .await
                .context(ConnectionSnafu { url: url.clone() })?;
        }

        database
            .use_ns(&config.namespace)
            .use_db(&config.database)
            .await
            .context(ConnectionSnafu { url })?;

        tracing::info!(namespace = %config.namespace, database = %config.database, "connected to the document store");

        Ok(Self { database })
    }

    /// Starts an embedded in-memory store. Nothing is persisted.
    pub async fn memory() -> Result<Self> {
        let url = "mem://";
        let database = surrealdb::engine::any::connect(url)
            .await
            .context(ConnectionSnafu { url })?;

        database
            .use_ns(default_name())
            .use_db(default_name())
            .await
            .context(ConnectionSnafu { url })?;

        Ok(Self { database })
    }

    /// Defines the collections and their indexes. Safe to run on every start.
    pub async fn apply_schema(&self) -> Result<()> {
        self.sql(SCHEMA).execute().await?;
        tracing::debug!("applied database schema");
        Ok(())
    }

    /// Create a builder to execute arbitrary SurrealQL on the database.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let videos: Vec<Video> = db.sql("SELECT * FROM videos WHERE author_id = $author")
    ///     .bind(("author", author))
    ///     .fetch_first()
    ///     .await?;
    /// ```
    pub fn sql(&self, query: impl IntoQuery) -> Bindings<'_> {
        Bindings {
            query: self.database.query(query),
        }
    }
}

#[derive(Debug)]
pub struct Bindings<'a> {
    query: surrealdb::method::Query<'a, Any>,
}

impl Bindings<'_> {
    pub fn bind(mut self, params: impl serde::Serialize) -> Self {
        let query = self.query;
        self.query = query.bind(params);
        self
    }

    /// Execute the query and return every statement's result. Fails if any statement failed.
    pub async fn execute(self) -> Result<surrealdb::Response> {
        let response = self.query.await.context(QuerySnafu)?;
        let response = response.check().context(QuerySnafu)?;
        tracing::trace!(?response, "executed query");
        Ok(response)
    }

    /// Execute the query and return the first statement's result as a deserialized value.
    pub async fn fetch_first<T: DeserializeOwned>(self) -> Result<T>
    where
        usize: QueryResult<T>,
    {
        let mut statements = self.execute().await?;
        statements.take::<T>(0).context(DeserializeSnafu)
    }

    /// Execute the queries and deserialize every statement's result.
    pub async fn fetch_all<T: DeserializeOwned>(self) -> Result<Vec<T>>
    where
        usize: QueryResult<T>,
    {
        let mut statements = self.execute().await?;
        let size = statements.num_statements();

        let mut results = Vec::with_capacity(size);
        for i in 0..size {
            results.push(statements.take::<T>(i).context(DeserializeSnafu)?);
        }

        Ok(results)
    }
}
