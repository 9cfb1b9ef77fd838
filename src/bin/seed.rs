//! Database seeder
//!
//! Creates the admin account and sample stores in Postgres.
//! Pass `--reset` to wipe users, stores and transactions first.

use anyhow::Context;

use market_stall::auth::PasswordHasher;
use market_stall::{db, seed, Config, Repositories};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "market_stall=info".into()),
        )
        .init();

    let reset = std::env::args().skip(1).any(|arg| arg == "--reset");

    let config = Config::from_env()?;
    let url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL is required to seed")?;

    let pool = db::connect(url, 2).await?;
    if !db::check_schema(&pool).await? {
        anyhow::bail!("Database schema incomplete. Run migrations first.");
    }

    if reset {
        tracing::warn!("Resetting users, stores and transactions");
        sqlx::query("TRUNCATE transactions, stores, users")
            .execute(&pool)
            .await?;
    }

    let hasher = PasswordHasher::new(
        config.password_hash_memory_kib,
        config.password_hash_iterations,
    )?;
    let password = std::env::var("SEED_ADMIN_PASSWORD").unwrap_or_else(|_| "123456".to_string());

    let report = seed::seed_defaults(&Repositories::postgres(pool.clone()), &hasher, &password)
        .await?;

    println!(
        "Admin {}: {}",
        if report.admin_created { "created" } else { "already present" },
        seed::ADMIN_EMAIL
    );
    println!(
        "Stores created: {}, skipped: {}",
        report.stores_created, report.stores_skipped
    );

    pool.close().await;
    Ok(())
}
