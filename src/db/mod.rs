//! SQLite persistence for buyers and their per-day revenue records.
//!
//! All writes that accumulate values are single upsert statements so that
//! concurrent postbacks add up instead of clobbering each other.

mod migrations;

use crate::model::{Buyer, RevenueRecord};
use crate::Result;
use anyhow::{bail, Context};
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// The schema version this build expects. `load` migrates older databases up
/// to it.
const SCHEMA_VERSION: i32 = 1;

/// Handle to the SQLite database. Cheap to clone; clones share the pool.
#[derive(Debug, Clone)]
pub struct Db {
    pool: SqlitePool,
}

impl Db {
    /// Creates a new database file at `path` and brings it to the current
    /// schema version. Errors if the file already exists.
    pub(crate) async fn init(path: &Path) -> Result<Self> {
        if path.exists() {
            bail!("Database file already exists: {}", path.display());
        }
        let pool = connect(path, true).await?;
        sqlx::query("CREATE TABLE schema_version (version INTEGER NOT NULL)")
            .execute(&pool)
            .await
            .context("Failed to create schema_version table")?;
        sqlx::query("INSERT INTO schema_version (version) VALUES (0)")
            .execute(&pool)
            .await
            .context("Failed to seed schema_version")?;
        migrations::run(&pool, 0, SCHEMA_VERSION).await?;
        debug!("created database at {}", path.display());
        Ok(Self { pool })
    }

    /// Opens an existing database, migrating it forward if it is behind.
    pub(crate) async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!(
                "Database file not found: {}, run 'afftrack init' first",
                path.display()
            );
        }
        let pool = connect(path, false).await?;
        let (version,): (i32,) = sqlx::query_as("SELECT MAX(version) FROM schema_version")
            .fetch_one(&pool)
            .await
            .context("Failed to read the schema version")?;
        migrations::run(&pool, version, SCHEMA_VERSION).await?;
        Ok(Self { pool })
    }

    /// Adds `amount` to the buyer's lifetime revenue and bumps the lifetime
    /// deposit count, creating the buyer row on first sight. Returns the
    /// buyer's id.
    pub(crate) async fn accumulate_buyer(&self, name: &str, amount: f64) -> Result<i64> {
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO buyers (name, count_revenue, count_firstdeps) \
             VALUES (?, ?, 1) \
             ON CONFLICT (name) DO UPDATE SET \
                 count_revenue = count_revenue + excluded.count_revenue, \
                 count_firstdeps = count_firstdeps + 1 \
             RETURNING id",
        )
        .bind(name)
        .bind(amount)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("Failed to accumulate revenue for buyer '{name}'"))?;
        Ok(id)
    }

    /// Adds `amount` of income (and one deposit) to the buyer's record for
    /// `date`, creating the record if the day has no row yet.
    pub(crate) async fn accumulate_revenue(
        &self,
        buyer_id: i64,
        date: NaiveDate,
        amount: f64,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO revenue_records (buyer_id, date, income, profit, firstdeps) \
             VALUES (?, ?, ?, ?, 1) \
             ON CONFLICT (buyer_id, date) DO UPDATE SET \
                 income = income + excluded.income, \
                 profit = profit + excluded.profit, \
                 firstdeps = firstdeps + 1",
        )
        .bind(buyer_id)
        .bind(date)
        .bind(amount)
        .bind(amount)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to record revenue for buyer {buyer_id} on {date}"))?;
        Ok(())
    }

    /// Total income and deposits for a buyer over `[start, end]` inclusive.
    pub(crate) async fn sum_revenue(
        &self,
        buyer_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(f64, i64)> {
        let row: (f64, i64) = sqlx::query_as(
            "SELECT COALESCE(SUM(income), 0.0), COALESCE(SUM(firstdeps), 0) \
             FROM revenue_records WHERE buyer_id = ? AND date BETWEEN ? AND ?",
        )
        .bind(buyer_id)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await
        .context("Failed to sum revenue")?;
        Ok(row)
    }

    /// A buyer's per-day records over `[start, end]` inclusive, oldest first.
    pub(crate) async fn revenue_in_range(
        &self,
        buyer_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RevenueRecord>> {
        sqlx::query_as(
            "SELECT * FROM revenue_records \
             WHERE buyer_id = ? AND date BETWEEN ? AND ? ORDER BY date",
        )
        .bind(buyer_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch revenue records")
    }

    pub(crate) async fn buyer_by_name(&self, name: &str) -> Result<Option<Buyer>> {
        sqlx::query_as("SELECT * FROM buyers WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to fetch buyer '{name}'"))
    }

    /// All buyers, ordered by name.
    pub(crate) async fn buyers(&self) -> Result<Vec<Buyer>> {
        sqlx::query_as("SELECT * FROM buyers ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch buyers")
    }

    /// Sets (does not add to) the buyer's manual reject adjustment.
    pub(crate) async fn set_reject(&self, name: &str, amount: f64) -> Result<()> {
        let result = sqlx::query("UPDATE buyers SET reject = ? WHERE name = ?")
            .bind(amount)
            .bind(name)
            .execute(&self.pool)
            .await
            .context("Failed to set the reject adjustment")?;
        if result.rows_affected() == 0 {
            bail!("No buyer named '{name}'");
        }
        Ok(())
    }
}

async fn connect(path: &Path, create: bool) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
        .context("Failed to parse the SQLite connection string")?
        .create_if_missing(create);
    SqlitePoolOptions::new()
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open the database at {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn test_db() -> (TempDir, Db) {
        let tmp = TempDir::new().unwrap();
        let db = Db::init(&tmp.path().join("test.sqlite")).await.unwrap();
        (tmp, db)
    }

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn init_refuses_existing_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("test.sqlite");
        Db::init(&path).await.unwrap();
        assert!(Db::init(&path).await.is_err());
        Db::load(&path).await.unwrap();
    }

    #[tokio::test]
    async fn load_requires_existing_file() {
        let tmp = TempDir::new().unwrap();
        let err = Db::load(&tmp.path().join("missing.sqlite"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("afftrack init"));
    }

    #[tokio::test]
    async fn buyer_accumulation_adds_up() {
        let (_tmp, db) = test_db().await;
        let id1 = db.accumulate_buyer("Artur", 100.0).await.unwrap();
        let id2 = db.accumulate_buyer("Artur", 50.0).await.unwrap();
        assert_eq!(id1, id2);

        let buyer = db.buyer_by_name("Artur").await.unwrap().unwrap();
        assert_eq!(buyer.count_revenue(), 150.0);
        assert_eq!(buyer.count_firstdeps(), 2);
        assert_eq!(buyer.reject(), 0.0);
    }

    #[tokio::test]
    async fn revenue_accumulation_merges_same_day() {
        let (_tmp, db) = test_db().await;
        let id = db.accumulate_buyer("Artur", 100.0).await.unwrap();
        db.accumulate_revenue(id, day("2024-01-01"), 100.0)
            .await
            .unwrap();
        db.accumulate_revenue(id, day("2024-01-01"), 50.0)
            .await
            .unwrap();
        db.accumulate_revenue(id, day("2024-01-02"), 25.0)
            .await
            .unwrap();

        let records = db
            .revenue_in_range(id, day("2024-01-01"), day("2024-01-31"))
            .await
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].income(), 150.0);
        assert_eq!(records[0].firstdeps(), 2);
        assert_eq!(records[1].income(), 25.0);

        let (income, firstdeps) = db
            .sum_revenue(id, day("2024-01-01"), day("2024-01-31"))
            .await
            .unwrap();
        assert_eq!(income, 175.0);
        assert_eq!(firstdeps, 3);
    }

    #[tokio::test]
    async fn sum_revenue_range_is_inclusive() {
        let (_tmp, db) = test_db().await;
        let id = db.accumulate_buyer("Artur", 0.0).await.unwrap();
        for (date, amount) in [("2024-01-01", 1.0), ("2024-01-02", 2.0), ("2024-01-03", 4.0)] {
            db.accumulate_revenue(id, day(date), amount).await.unwrap();
        }
        let (income, _) = db
            .sum_revenue(id, day("2024-01-01"), day("2024-01-02"))
            .await
            .unwrap();
        assert_eq!(income, 3.0);
    }

    #[tokio::test]
    async fn empty_range_sums_to_zero() {
        let (_tmp, db) = test_db().await;
        let id = db.accumulate_buyer("Artur", 0.0).await.unwrap();
        let (income, firstdeps) = db
            .sum_revenue(id, day("2030-01-01"), day("2030-01-31"))
            .await
            .unwrap();
        assert_eq!(income, 0.0);
        assert_eq!(firstdeps, 0);
    }

    #[tokio::test]
    async fn buyers_are_name_ordered() {
        let (_tmp, db) = test_db().await;
        for name in ["Vlad", "Artur", "Mike"] {
            db.accumulate_buyer(name, 1.0).await.unwrap();
        }
        let names: Vec<_> = db
            .buyers()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.name().to_string())
            .collect();
        assert_eq!(names, vec!["Artur", "Mike", "Vlad"]);
    }

    #[tokio::test]
    async fn set_reject_replaces_the_value() {
        let (_tmp, db) = test_db().await;
        db.accumulate_buyer("Artur", 1.0).await.unwrap();
        db.set_reject("Artur", 10.0).await.unwrap();
        db.set_reject("Artur", 4.0).await.unwrap();
        let buyer = db.buyer_by_name("Artur").await.unwrap().unwrap();
        assert_eq!(buyer.reject(), 4.0);

        assert!(db.set_reject("Nobody", 1.0).await.is_err());
    }
}
