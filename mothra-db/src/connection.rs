//! Database connection descriptor and vendor-specific pools
//!
//! A [`DbConnection`] is the value that flows between workflow components: it
//! carries credentials, not a live socket. [`DbConnection::connect`] opens an
//! sqlx pool for the duration of one component call.

use mothra_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::Row;
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Supported database vendors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    Mysql,
    Postgres,
}

impl FromStr for Vendor {
    type Err = Error;

    /// Unknown vendor strings are rejected rather than defaulting to PostgreSQL
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql" => Ok(Vendor::Mysql),
            "postgres" | "postgresql" | "pgsql" => Ok(Vendor::Postgres),
            other => Err(Error::invalid(format!(
                "Unsupported database vendor '{}' (expected 'mysql' or 'postgres')",
                other
            ))),
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vendor::Mysql => write!(f, "mysql"),
            Vendor::Postgres => write!(f, "postgres"),
        }
    }
}

impl Vendor {
    pub fn default_port(&self) -> u16 {
        match self {
            Vendor::Mysql => 3306,
            Vendor::Postgres => 5432,
        }
    }

    /// Quote an identifier for use in generated SQL
    pub fn quote_ident(&self, ident: &str) -> String {
        match self {
            Vendor::Mysql => format!("`{}`", ident.replace('`', "``")),
            Vendor::Postgres => format!("\"{}\"", ident.replace('"', "\"\"")),
        }
    }

    /// Select expression reading a column as text
    pub fn text_column(&self, column: &str) -> String {
        match self {
            Vendor::Mysql => format!("CAST({} AS CHAR)", self.quote_ident(column)),
            Vendor::Postgres => format!("{}::text", self.quote_ident(column)),
        }
    }
}

/// Connection descriptor passed between workflow components
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct DbConnection {
    pub vendor: Vendor,
    /// Host name, optionally with `:port`
    pub host: String,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for DbConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConnection")
            .field("vendor", &self.vendor)
            .field("host", &self.host)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

impl DbConnection {
    pub fn new(
        vendor: Vendor,
        host: impl Into<String>,
        database: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            vendor,
            host: host.into(),
            database: database.into(),
            user: user.into(),
            password: password.into(),
        }
    }

    /// Split `host[:port]`
    pub fn host_and_port(&self) -> Result<(String, u16)> {
        match self.host.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|_| {
                    Error::invalid(format!("invalid port in host '{}'", self.host))
                })?;
                Ok((host.to_string(), port))
            }
            None => Ok((self.host.clone(), self.vendor.default_port())),
        }
    }

    /// Open a small pool; authentication and network errors propagate unchanged
    pub async fn connect(&self) -> Result<DbPool> {
        let (host, port) = self.host_and_port()?;

        let pool = match self.vendor {
            Vendor::Mysql => {
                let options = MySqlConnectOptions::new()
                    .host(&host)
                    .port(port)
                    .username(&self.user)
                    .password(&self.password)
                    .database(&self.database);
                DbPool::MySql(
                    MySqlPoolOptions::new()
                        .max_connections(2)
                        .connect_with(options)
                        .await?,
                )
            }
            Vendor::Postgres => {
                let options = PgConnectOptions::new()
                    .host(&host)
                    .port(port)
                    .username(&self.user)
                    .password(&self.password)
                    .database(&self.database);
                DbPool::Postgres(
                    PgPoolOptions::new()
                        .max_connections(2)
                        .connect_with(options)
                        .await?,
                )
            }
        };

        info!(
            vendor = %self.vendor,
            host = %host,
            database = %self.database,
            "Database connection established"
        );
        Ok(pool)
    }
}

/// Live pool for one of the supported vendors
#[derive(Debug, Clone)]
pub enum DbPool {
    MySql(MySqlPool),
    Postgres(PgPool),
}

impl DbPool {
    pub fn vendor(&self) -> Vendor {
        match self {
            DbPool::MySql(_) => Vendor::Mysql,
            DbPool::Postgres(_) => Vendor::Postgres,
        }
    }

    /// Run a query whose select list is all text (or NULL) and return the rows.
    ///
    /// Callers cast columns with [`Vendor::text_column`] so both drivers decode
    /// every cell as `Option<String>`.
    pub async fn fetch_text_rows(
        &self,
        sql: &str,
        binds: &[&str],
    ) -> Result<Vec<Vec<Option<String>>>> {
        match self {
            DbPool::MySql(pool) => {
                let mut query = sqlx::query(sql);
                for bind in binds {
                    query = query.bind(*bind);
                }
                let rows = query.fetch_all(pool).await?;
                rows.iter()
                    .map(|row| {
                        (0..row.len())
                            .map(|i| row.try_get::<Option<String>, _>(i).map_err(Error::from))
                            .collect::<Result<Vec<_>>>()
                    })
                    .collect()
            }
            DbPool::Postgres(pool) => {
                let mut query = sqlx::query(sql);
                for bind in binds {
                    query = query.bind(*bind);
                }
                let rows = query.fetch_all(pool).await?;
                rows.iter()
                    .map(|row| {
                        (0..row.len())
                            .map(|i| row.try_get::<Option<String>, _>(i).map_err(Error::from))
                            .collect::<Result<Vec<_>>>()
                    })
                    .collect()
            }
        }
    }

    pub async fn close(&self) {
        match self {
            DbPool::MySql(pool) => pool.close().await,
            DbPool::Postgres(pool) => pool.close().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_parsing_is_strict() {
        assert_eq!("mysql".parse::<Vendor>().unwrap(), Vendor::Mysql);
        assert_eq!("PostgreSQL".parse::<Vendor>().unwrap(), Vendor::Postgres);
        let err = "oracle".parse::<Vendor>().unwrap_err();
        assert!(err.to_string().contains("oracle"));
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(Vendor::Mysql.quote_ident("a`b"), "`a``b`");
        assert_eq!(Vendor::Postgres.quote_ident("a\"b"), "\"a\"\"b\"");
        assert_eq!(Vendor::Postgres.text_column("id"), "\"id\"::text");
    }

    #[test]
    fn test_host_and_port() {
        let conn = DbConnection::new(Vendor::Mysql, "db.local:3307", "d", "u", "p");
        assert_eq!(conn.host_and_port().unwrap(), ("db.local".to_string(), 3307));

        let conn = DbConnection::new(Vendor::Postgres, "db.local", "d", "u", "p");
        assert_eq!(conn.host_and_port().unwrap().1, 5432);

        let conn = DbConnection::new(Vendor::Mysql, "db.local:abc", "d", "u", "p");
        assert!(conn.host_and_port().is_err());
    }

    #[test]
    fn test_debug_hides_password() {
        let conn = DbConnection::new(Vendor::Mysql, "h", "d", "u", "secret");
        assert!(!format!("{:?}", conn).contains("secret"));
    }
}
