//! Schema migrations, named `migration_NN_up.sql` / `migration_NN_down.sql`
//! where the up script moves the schema from version `NN-1` to `NN`.

use crate::Result;
use anyhow::{bail, Context};
use sqlx::{Executor, SqlitePool};
use tracing::debug;

struct Migration {
    /// The version the up script produces.
    version: i32,
    up_sql: &'static str,
    down_sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    up_sql: include_str!("migration_01_up.sql"),
    down_sql: include_str!("migration_01_down.sql"),
}];

/// Walks the schema from `current_ver` to `target_ver`, one migration per
/// transaction with the `schema_version` update included. All required
/// migrations are checked for existence before any of them run.
pub(crate) async fn run(pool: &SqlitePool, current_ver: i32, target_ver: i32) -> Result<()> {
    if current_ver == target_ver {
        debug!("database already at schema version {target_ver}");
        return Ok(());
    }
    validate(current_ver, target_ver)?;

    if current_ver < target_ver {
        for version in (current_ver + 1)..=target_ver {
            let migration = find(version)?;
            debug!("applying migration {version:02}");
            apply(pool, migration.up_sql, version).await?;
        }
    } else {
        for version in (target_ver + 1..=current_ver).rev() {
            let migration = find(version)?;
            debug!("reverting migration {version:02}");
            apply(pool, migration.down_sql, version - 1).await?;
        }
    }
    Ok(())
}

fn find(version: i32) -> Result<&'static Migration> {
    MIGRATIONS
        .iter()
        .find(|m| m.version == version)
        .with_context(|| format!("Migration {version} not found"))
}

async fn apply(pool: &SqlitePool, sql: &str, new_version: i32) -> Result<()> {
    let mut tx = pool
        .begin()
        .await
        .context("Failed to begin migration transaction")?;
    tx.execute(sql)
        .await
        .context("Failed to execute migration SQL")?;
    sqlx::query("DELETE FROM schema_version")
        .execute(&mut *tx)
        .await
        .context("Failed to clear schema_version")?;
    sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
        .bind(new_version)
        .execute(&mut *tx)
        .await
        .context("Failed to update schema_version")?;
    tx.commit()
        .await
        .context("Failed to commit migration transaction")
}

fn validate(current_ver: i32, target_ver: i32) -> Result<()> {
    let (start, end) = if current_ver < target_ver {
        (current_ver + 1, target_ver)
    } else {
        (target_ver + 1, current_ver)
    };
    for version in start..=end {
        if !MIGRATIONS.iter().any(|m| m.version == version) {
            bail!(
                "Migration {version} is missing but required to go from \
                 version {current_ver} to {target_ver}"
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use std::str::FromStr;
    use tempfile::TempDir;

    async fn bootstrapped_db() -> (TempDir, SqlitePool) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.sqlite");
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))
            .unwrap()
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();
        sqlx::query("CREATE TABLE schema_version (version INTEGER NOT NULL)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO schema_version (version) VALUES (0)")
            .execute(&pool)
            .await
            .unwrap();
        (temp_dir, pool)
    }

    async fn schema_version(pool: &SqlitePool) -> i32 {
        let row: (i32,) = sqlx::query_as("SELECT MAX(version) FROM schema_version")
            .fetch_one(pool)
            .await
            .unwrap();
        row.0
    }

    async fn table_exists(pool: &SqlitePool, table_name: &str) -> bool {
        let row: (i32,) =
            sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?")
                .bind(table_name)
                .fetch_one(pool)
                .await
                .unwrap();
        row.0 > 0
    }

    #[tokio::test]
    async fn up_creates_tables() {
        let (_temp_dir, pool) = bootstrapped_db().await;
        assert_eq!(schema_version(&pool).await, 0);
        run(&pool, 0, 1).await.unwrap();
        assert_eq!(schema_version(&pool).await, 1);
        assert!(table_exists(&pool, "buyers").await);
        assert!(table_exists(&pool, "revenue_records").await);
    }

    #[tokio::test]
    async fn down_drops_tables() {
        let (_temp_dir, pool) = bootstrapped_db().await;
        run(&pool, 0, 1).await.unwrap();
        run(&pool, 1, 0).await.unwrap();
        assert_eq!(schema_version(&pool).await, 0);
        assert!(!table_exists(&pool, "buyers").await);
        assert!(!table_exists(&pool, "revenue_records").await);
    }

    #[tokio::test]
    async fn no_op_at_target_version() {
        let (_temp_dir, pool) = bootstrapped_db().await;
        run(&pool, 0, 1).await.unwrap();
        run(&pool, 1, 1).await.unwrap();
        assert_eq!(schema_version(&pool).await, 1);
    }

    #[test]
    fn missing_migration_is_rejected() {
        assert!(validate(0, 1).is_ok());
        assert!(validate(1, 0).is_ok());
        assert!(validate(0, 2).is_err());
    }
}
