use crate::error::AppError;
use crate::hasher::HASH_LENGTH;
use chrono::Utc;
use sha3::{Digest, Sha3_256};
use sqlx::{Row, SqlitePool};
use tracing::info;

/// Fixed, ordered migration steps. Append here, never reorder or edit a
/// shipped step.
const MIGRATIONS: &[(i64, &str)] = &[
    (1, "create links table"),
    (2, "create visitors table"),
    (3, "replace raw visitor addresses"),
];

/// Applies the pending steps in order, recording each in
/// `schema_migrations` so none runs twice.
pub async fn run(pool: &SqlitePool) -> Result<(), AppError> {
    sqlx::query(
        r#"
          create table if not exists schema_migrations (
              version integer primary key,
              name text not null,
              applied_at text not null default current_timestamp
          )
        "#,
    )
    .execute(pool)
    .await?;

    let applied: Vec<i64> =
        sqlx::query_scalar("select version from schema_migrations order by version")
            .fetch_all(pool)
            .await?;

    for (version, name) in MIGRATIONS.iter().copied() {
        if applied.contains(&version) {
            continue;
        }
        apply(pool, version).await?;
        sqlx::query("insert into schema_migrations (version, name) values (?, ?)")
            .bind(version)
            .bind(name)
            .execute(pool)
            .await?;
        info!(version, name, "applied schema migration");
    }
    Ok(())
}

async fn apply(pool: &SqlitePool, version: i64) -> Result<(), AppError> {
    match version {
        1 => create_links_table(pool).await,
        2 => create_visitors_table(pool).await,
        3 => replace_raw_addresses(pool).await,
        other => Err(AppError::Configuration(format!(
            "unknown schema migration version {other}"
        ))),
    }
}

async fn create_links_table(pool: &SqlitePool) -> Result<(), AppError> {
    sqlx::query(
        r#"
          create table if not exists links (
              short_code text primary key,
              original_url text not null,
              created_at text not null,
              clicks integer not null default 0
          )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_visitors_table(pool: &SqlitePool) -> Result<(), AppError> {
    sqlx::query(
        r#"
          create table if not exists visitors (
              id integer primary key autoincrement,
              hashed_address text not null,
              user_agent text not null default '',
              path text not null default '',
              timestamp text not null,
              country text
          )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// One-shot conversion of the historical schema that logged raw client
/// addresses. The real addresses are gone for good at this point, so every
/// migrated row gets a placeholder digest derived from its own id; rows
/// that already carry a hashed value keep it. Placeholders collapse the
/// historic unique-visitor signal; that loss is accepted.
async fn replace_raw_addresses(pool: &SqlitePool) -> Result<(), AppError> {
    let columns = table_columns(pool, "visitors").await?;
    if !columns.iter().any(|column| column == "ip") {
        return Ok(());
    }
    let has_hashed = columns.iter().any(|column| column == "hashed_address");

    sqlx::query("alter table visitors rename to visitors_legacy")
        .execute(pool)
        .await?;
    create_visitors_table(pool).await?;

    let select = if has_hashed {
        "select id, hashed_address, user_agent, path, timestamp, country from visitors_legacy order by id"
    } else {
        "select id, '' as hashed_address, user_agent, path, timestamp, country from visitors_legacy order by id"
    };
    let rows = sqlx::query(select).fetch_all(pool).await?;
    let mut migrated = 0u64;
    for row in rows {
        let id: i64 = row.get("id");
        let hashed: Option<String> = row.get("hashed_address");
        let hashed = match hashed.filter(|value| !value.is_empty()) {
            Some(existing) => existing,
            None => placeholder_hash(id),
        };
        let user_agent: Option<String> = row.get("user_agent");
        let path: Option<String> = row.get("path");
        let timestamp: Option<String> = row.get("timestamp");
        let country: Option<String> = row.get("country");
        sqlx::query(
            r#"
              insert into visitors (id, hashed_address, user_agent, path, timestamp, country)
              values (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(hashed)
        .bind(user_agent.unwrap_or_default())
        .bind(path.unwrap_or_default())
        .bind(timestamp.unwrap_or_else(|| Utc::now().to_rfc3339()))
        .bind(country)
        .execute(pool)
        .await?;
        migrated += 1;
    }

    sqlx::query("drop table visitors_legacy").execute(pool).await?;
    info!(rows = migrated, "replaced raw visitor addresses with placeholder hashes");
    Ok(())
}

/// Irreversible stand-in for an address that no longer exists, keyed by the
/// row's surrogate id. Matches the shape of live hashes.
fn placeholder_hash(id: i64) -> String {
    let mut digest = Sha3_256::new();
    digest.update(format!("legacy-visitor-{id}"));
    let mut hash = format!("{:x}", digest.finalize());
    hash.truncate(HASH_LENGTH);
    hash
}

async fn table_columns(pool: &SqlitePool, table: &str) -> Result<Vec<String>, AppError> {
    let rows = sqlx::query("select name from pragma_table_info(?)")
        .bind(table)
        .fetch_all(pool)
        .await?;
    Ok(rows
        .iter()
        .map(|row| row.get::<String, _>("name"))
        .collect())
}
