use crate::error::AppError;
use crate::model::VisitorRecord;
use chrono::{DateTime, Months, Utc};
use sqlx::SqlitePool;

/// Visitor records older than this are purged.
pub const RETENTION_MONTHS: u32 = 12;

/// Append-only log of anonymized visits.
///
/// Inserts run on the task queue; a failed write is logged there and never
/// reaches the request that triggered it.
#[derive(Clone)]
pub struct VisitorLedger {
    pool: SqlitePool,
}

impl VisitorLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        hashed_address: &str,
        user_agent: &str,
        path: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            "insert into visitors (hashed_address, user_agent, path, timestamp) values (?, ?, ?, ?)",
        )
        .bind(hashed_address)
        .bind(user_agent)
        .bind(path)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Deletes records past the retention window, reporting how many went.
    pub async fn prune_expired(&self) -> Result<u64, AppError> {
        let result = sqlx::query("delete from visitors where timestamp < ?")
            .bind(retention_cutoff(Utc::now()))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn recent(&self, limit: i64) -> Result<Vec<VisitorRecord>, AppError> {
        Ok(sqlx::query_as(
            r#"
              select id, hashed_address, user_agent, path, timestamp, country from visitors
              order by timestamp desc
              limit ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn total(&self) -> Result<i64, AppError> {
        Ok(sqlx::query_scalar("select count(*) from visitors")
            .fetch_one(&self.pool)
            .await?)
    }

    pub async fn unique(&self) -> Result<i64, AppError> {
        Ok(
            sqlx::query_scalar("select count(distinct hashed_address) from visitors")
                .fetch_one(&self.pool)
                .await?,
        )
    }

    pub async fn since(&self, moment: DateTime<Utc>) -> Result<i64, AppError> {
        Ok(
            sqlx::query_scalar("select count(*) from visitors where timestamp >= ?")
                .bind(moment)
                .fetch_one(&self.pool)
                .await?,
        )
    }
}

fn retention_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    // sub_months can only fail at the edge of the representable range;
    // the epoch fallback turns pruning into a no-op there
    now.checked_sub_months(Months::new(RETENTION_MONTHS))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn ledger() -> VisitorLedger {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        migrations::run(&pool).await.unwrap();
        VisitorLedger::new(pool)
    }

    async fn insert_at(ledger: &VisitorLedger, hashed: &str, timestamp: DateTime<Utc>) {
        sqlx::query(
            "insert into visitors (hashed_address, user_agent, path, timestamp) values (?, '', '/', ?)",
        )
        .bind(hashed)
        .bind(timestamp)
        .execute(&ledger.pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn inserted_rows_carry_only_the_hashed_address() {
        let ledger = ledger().await;
        ledger
            .insert("deadbeefdeadbeef", "curl/8.0", "/s/abc123")
            .await
            .unwrap();

        let records = ledger.recent(10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].hashed_address, "deadbeefdeadbeef");
        assert_eq!(records[0].user_agent, "curl/8.0");
        assert_eq!(records[0].path, "/s/abc123");
        assert!(records[0].country.is_none());
    }

    #[tokio::test]
    async fn pruning_removes_all_and_only_expired_records() {
        let ledger = ledger().await;
        let now = Utc::now();
        insert_at(
            &ledger,
            "ancient0ancient0",
            now.checked_sub_months(Months::new(13)).unwrap(),
        )
        .await;
        insert_at(
            &ledger,
            "recent00recent00",
            now.checked_sub_months(Months::new(1)).unwrap(),
        )
        .await;

        assert_eq!(ledger.prune_expired().await.unwrap(), 1);

        let remaining = ledger.recent(10).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].hashed_address, "recent00recent00");

        // idempotent once everything inside the window remains
        assert_eq!(ledger.prune_expired().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn counters_distinguish_total_and_unique() {
        let ledger = ledger().await;
        ledger.insert("aaaa", "", "/").await.unwrap();
        ledger.insert("aaaa", "", "/about").await.unwrap();
        ledger.insert("bbbb", "", "/").await.unwrap();

        assert_eq!(ledger.total().await.unwrap(), 3);
        assert_eq!(ledger.unique().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn since_counts_only_newer_records() {
        let ledger = ledger().await;
        let now = Utc::now();
        insert_at(&ledger, "aaaa", now - chrono::Duration::days(10)).await;
        insert_at(&ledger, "bbbb", now - chrono::Duration::days(1)).await;

        let week = ledger
            .since(now - chrono::Duration::days(7))
            .await
            .unwrap();
        assert_eq!(week, 1);
    }

    #[tokio::test]
    async fn recent_is_newest_first_and_limited() {
        let ledger = ledger().await;
        let now = Utc::now();
        for (hashed, minutes) in [("aaaa", 30i64), ("bbbb", 20), ("cccc", 10)] {
            insert_at(&ledger, hashed, now - chrono::Duration::minutes(minutes)).await;
        }

        let records = ledger.recent(2).await.unwrap();
        let hashes: Vec<&str> = records.iter().map(|r| r.hashed_address.as_str()).collect();
        assert_eq!(hashes, vec!["cccc", "bbbb"]);
    }
}
