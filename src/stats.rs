use crate::error::AppError;
use crate::ledger::VisitorLedger;
use crate::model::AdminStats;
use crate::store::LinkStore;
use chrono::{Duration, NaiveTime, Utc};

const TOP_URLS_LIMIT: i64 = 10;
const RECENT_VISITORS_LIMIT: i64 = 50;

/// All-or-nothing aggregation over the link store and the visitor ledger.
/// A single failed query fails the whole computation; no partial stats.
pub async fn compute_stats(
    links: &dyn LinkStore,
    ledger: &VisitorLedger,
) -> Result<AdminStats, AppError> {
    gather(links, ledger).await.map_err(|err| match err {
        AppError::Storage(source) => AppError::Aggregation(source),
        other => other,
    })
}

async fn gather(links: &dyn LinkStore, ledger: &VisitorLedger) -> Result<AdminStats, AppError> {
    let now = Utc::now();
    let today_start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    let week_start = now - Duration::days(7);

    Ok(AdminStats {
        total_visitors: ledger.total().await?,
        unique_visitors: ledger.unique().await?,
        total_urls: links.count().await?,
        total_clicks: links.total_clicks().await?,
        top_urls: links.top_by_clicks(TOP_URLS_LIMIT).await?,
        recent_visitors: ledger.recent(RECENT_VISITORS_LIMIT).await?,
        visitors_today: ledger.since(today_start).await?,
        visitors_this_week: ledger.since(week_start).await?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations;
    use crate::store::MemoryLinkStore;
    use chrono::DateTime;
    use sqlx::SqlitePool;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        migrations::run(&pool).await.unwrap();
        pool
    }

    async fn insert_visitor(pool: &SqlitePool, hashed: &str, timestamp: DateTime<Utc>) {
        sqlx::query(
            "insert into visitors (hashed_address, user_agent, path, timestamp) values (?, '', '/', ?)",
        )
        .bind(hashed)
        .bind(timestamp)
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn aggregates_cover_links_and_visitors() {
        let pool = pool().await;
        let ledger = VisitorLedger::new(pool.clone());
        let links = MemoryLinkStore::new();

        links.save("abc123", "https://example.com").await.unwrap();
        links.save("def456", "https://example.org").await.unwrap();
        links.increment_clicks("abc123").await.unwrap();
        links.increment_clicks("abc123").await.unwrap();
        links.increment_clicks("def456").await.unwrap();

        let now = Utc::now();
        insert_visitor(&pool, "aaaa", now).await;
        insert_visitor(&pool, "aaaa", now - Duration::days(2)).await;
        insert_visitor(&pool, "bbbb", now - Duration::days(30)).await;

        let stats = compute_stats(&links, &ledger).await.unwrap();
        assert_eq!(stats.total_urls, 2);
        assert_eq!(stats.total_clicks, 3);
        assert_eq!(stats.total_visitors, 3);
        assert_eq!(stats.unique_visitors, 2);
        assert_eq!(stats.visitors_today, 1);
        assert_eq!(stats.visitors_this_week, 2);
        assert_eq!(stats.top_urls[0].short_code, "abc123");
        assert_eq!(stats.recent_visitors.len(), 3);
        assert_eq!(stats.recent_visitors[0].hashed_address, "aaaa");
    }

    #[tokio::test]
    async fn empty_stores_produce_zeroed_stats() {
        let pool = pool().await;
        let ledger = VisitorLedger::new(pool);
        let links = MemoryLinkStore::new();

        let stats = compute_stats(&links, &ledger).await.unwrap();
        assert_eq!(stats.total_visitors, 0);
        assert_eq!(stats.unique_visitors, 0);
        assert_eq!(stats.total_urls, 0);
        assert_eq!(stats.total_clicks, 0);
        assert!(stats.top_urls.is_empty());
        assert!(stats.recent_visitors.is_empty());
    }

    #[tokio::test]
    async fn failed_queries_fail_the_whole_aggregation() {
        let pool = pool().await;
        let ledger = VisitorLedger::new(pool.clone());
        let links = MemoryLinkStore::new();

        sqlx::query("drop table visitors").execute(&pool).await.unwrap();

        assert!(matches!(
            compute_stats(&links, &ledger).await,
            Err(AppError::Aggregation(_))
        ));
    }
}
