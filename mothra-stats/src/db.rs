//! Reading `auth_user` from the workflow platform database

use crate::UserActivity;
use chrono::NaiveDate;
use mothra_common::{Error, Result};
use mothra_db::{DbPool, Vendor};
use sqlx::mysql::MySqlPoolOptions;
use sqlx::postgres::PgPoolOptions;
use tracing::{debug, info};

/// Connect using a `mysql://` or `postgres://` URL
pub async fn connect(database_url: &str) -> Result<DbPool> {
    let scheme = database_url
        .split_once("://")
        .map(|(scheme, _)| scheme)
        .ok_or_else(|| Error::Config("database URL has no scheme".to_string()))?;
    let vendor: Vendor = scheme.parse()?;

    let pool = match vendor {
        Vendor::Mysql => DbPool::MySql(
            MySqlPoolOptions::new()
                .max_connections(1)
                .connect(database_url)
                .await?,
        ),
        Vendor::Postgres => DbPool::Postgres(
            PgPoolOptions::new()
                .max_connections(1)
                .connect(database_url)
                .await?,
        ),
    };
    info!(vendor = %vendor, "Connected to statistics database");
    Ok(pool)
}

/// Calendar date at the start of a timestamp's text form
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    let day = text.get(..10).unwrap_or(text);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|e| Error::invalid(format!("bad timestamp '{}': {}", text, e)))
}

pub async fn fetch_users(pool: &DbPool) -> Result<Vec<UserActivity>> {
    let vendor = pool.vendor();
    let sql = format!(
        "SELECT {}, {} FROM {}",
        vendor.text_column("date_joined"),
        vendor.text_column("last_login"),
        vendor.quote_ident("auth_user")
    );
    let rows = pool.fetch_text_rows(&sql, &[]).await?;
    debug!(rows = rows.len(), "Fetched auth_user rows");

    rows.into_iter()
        .filter_map(|row| {
            let mut cells = row.into_iter();
            let joined = cells.next().flatten()?;
            let login = cells.next().flatten();
            Some((joined, login))
        })
        .map(|(joined, login)| {
            Ok(UserActivity {
                date_joined: parse_date(&joined)?,
                last_login: login.as_deref().map(parse_date).transpose()?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_from_either_vendor() {
        let expected = NaiveDate::from_ymd_opt(2014, 3, 7).unwrap();
        assert_eq!(parse_date("2014-03-07 10:11:12").unwrap(), expected);
        assert_eq!(parse_date("2014-03-07 10:11:12.123+00").unwrap(), expected);
        assert!(parse_date("07.03.2014").is_err());
    }

    #[tokio::test]
    async fn test_url_without_scheme() {
        assert!(matches!(connect("localhost/db").await, Err(Error::Config(_))));
        assert!(matches!(
            connect("sqlite://x.db").await,
            Err(Error::InvalidInput(_))
        ));
    }
}
