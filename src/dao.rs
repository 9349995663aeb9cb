use crate::error::AppError;
use crate::model::LinkEntry;
use crate::store::LinkStore;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::error::ErrorKind;
use sqlx::{Error, SqlitePool};

/// SQLite-backed [`LinkStore`]. Conflicting writes are serialized by the
/// storage engine; click increments happen in SQL so no update is lost.
pub struct SqliteLinkStore {
    pool: SqlitePool,
}

impl SqliteLinkStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LinkStore for SqliteLinkStore {
    async fn save(&self, code: &str, url: &str) -> Result<LinkEntry, AppError> {
        sqlx::query_as(
            r#"
              insert into links (short_code, original_url, created_at, clicks) values (?, ?, ?, 0)
              returning short_code, original_url, created_at, clicks
            "#,
        )
        .bind(code)
        .bind(url)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| match err {
            Error::Database(db_err) if db_err.kind() == ErrorKind::UniqueViolation => {
                AppError::DuplicateCode
            }
            other => AppError::Storage(other),
        })
    }

    async fn lookup(&self, code: &str) -> Result<Option<LinkEntry>, AppError> {
        Ok(sqlx::query_as(
            "select short_code, original_url, created_at, clicks from links where short_code = ?",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn increment_clicks(&self, code: &str) -> Result<(), AppError> {
        sqlx::query("update links set clicks = clicks + 1 where short_code = ?")
            .bind(code)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<LinkEntry>, AppError> {
        Ok(sqlx::query_as(
            r#"
              select short_code, original_url, created_at, clicks from links
              order by created_at desc
            "#,
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn delete(&self, code: &str) -> Result<u64, AppError> {
        let result = sqlx::query("delete from links where short_code = ?")
            .bind(code)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn count(&self) -> Result<i64, AppError> {
        Ok(sqlx::query_scalar("select count(*) from links")
            .fetch_one(&self.pool)
            .await?)
    }

    async fn total_clicks(&self) -> Result<i64, AppError> {
        Ok(
            sqlx::query_scalar("select coalesce(sum(clicks), 0) from links")
                .fetch_one(&self.pool)
                .await?,
        )
    }

    async fn top_by_clicks(&self, limit: i64) -> Result<Vec<LinkEntry>, AppError> {
        Ok(sqlx::query_as(
            r#"
              select short_code, original_url, created_at, clicks from links
              order by clicks desc, created_at desc
              limit ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations;
    use chrono::Duration;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::Arc;

    async fn store() -> SqliteLinkStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        migrations::run(&pool).await.unwrap();
        SqliteLinkStore::new(pool)
    }

    #[tokio::test]
    async fn save_then_lookup_round_trips() {
        let store = store().await;
        store.save("abc123", "https://example.com").await.unwrap();

        let entry = store.lookup("abc123").await.unwrap().unwrap();
        assert_eq!(entry.short_code, "abc123");
        assert_eq!(entry.original_url, "https://example.com");
        assert_eq!(entry.clicks, 0);

        assert!(store.lookup("zzz999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_code_maps_to_duplicate_error() {
        let store = store().await;
        store.save("abc123", "https://example.com").await.unwrap();
        assert!(matches!(
            store.save("abc123", "https://other.example").await,
            Err(AppError::DuplicateCode)
        ));
    }

    #[tokio::test]
    async fn clicks_only_ever_grow() {
        let store = store().await;
        store.save("abc123", "https://example.com").await.unwrap();

        let mut previous = 0;
        for _ in 0..5 {
            store.increment_clicks("abc123").await.unwrap();
            let clicks = store.lookup("abc123").await.unwrap().unwrap().clicks;
            assert!(clicks > previous);
            previous = clicks;
        }
        assert_eq!(previous, 5);
    }

    #[tokio::test]
    async fn concurrent_increments_settle_at_the_exact_total() {
        let store = Arc::new(store().await);
        store.save("abc123", "https://example.com").await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.increment_clicks("abc123").await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.lookup("abc123").await.unwrap().unwrap().clicks, 10);
    }

    #[tokio::test]
    async fn delete_reports_rows_affected() {
        let store = store().await;
        store.save("abc123", "https://example.com").await.unwrap();
        assert_eq!(store.delete("abc123").await.unwrap(), 1);
        assert_eq!(store.delete("abc123").await.unwrap(), 0);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn top_by_clicks_orders_by_clicks_then_recency() {
        let store = store().await;
        let now = Utc::now();
        for (code, clicks, age_minutes) in
            [("older", 5i64, 10i64), ("newer", 5, 1), ("cold", 1, 5)]
        {
            sqlx::query(
                "insert into links (short_code, original_url, created_at, clicks) values (?, ?, ?, ?)",
            )
            .bind(code)
            .bind("https://example.com")
            .bind(now - Duration::minutes(age_minutes))
            .bind(clicks)
            .execute(&store.pool)
            .await
            .unwrap();
        }

        let top = store.top_by_clicks(10).await.unwrap();
        let codes: Vec<&str> = top.iter().map(|e| e.short_code.as_str()).collect();
        assert_eq!(codes, vec!["newer", "older", "cold"]);

        let limited = store.top_by_clicks(2).await.unwrap();
        assert_eq!(limited.len(), 2);
    }

    #[tokio::test]
    async fn list_all_is_newest_first() {
        let store = store().await;
        let now = Utc::now();
        for (code, age_minutes) in [("first", 10i64), ("second", 5), ("third", 1)] {
            sqlx::query(
                "insert into links (short_code, original_url, created_at, clicks) values (?, ?, ?, 0)",
            )
            .bind(code)
            .bind("https://example.com")
            .bind(now - Duration::minutes(age_minutes))
            .execute(&store.pool)
            .await
            .unwrap();
        }

        let all = store.list_all().await.unwrap();
        let codes: Vec<&str> = all.iter().map(|e| e.short_code.as_str()).collect();
        assert_eq!(codes, vec!["third", "second", "first"]);
        assert_eq!(store.total_clicks().await.unwrap(), 0);
    }
}
