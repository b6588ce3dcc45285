use uuid::Uuid;

use crate::auth::hash_password;
use crate::db::Db;

/// Seeds the super-admin account and a default trainer.
/// Safe to call on every startup — existence is checked before inserting.
pub async fn seed_accounts(pool: &Db) -> anyhow::Result<()> {
    seed_super_admin(pool).await?;
    seed_default_trainer(pool).await?;

    Ok(())
}

async fn seed_super_admin(pool: &Db) -> anyhow::Result<()> {
    const ADMIN_NAME:     &str = "Super Admin";
    const ADMIN_EMAIL:    &str = "admin@fitcoach.local";
    const ADMIN_PASSWORD: &str = "admin";

    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ? AND role = 'SUPER_ADMIN')",
    )
    .bind(ADMIN_EMAIL)
    .fetch_one(pool)
    .await?;

    if !exists {
        let hash = hash_password(ADMIN_PASSWORD)?;
        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, role, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, 'SUPER_ADMIN', 'ACTIVE', UTC_TIMESTAMP(), UTC_TIMESTAMP())",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(ADMIN_NAME)
        .bind(ADMIN_EMAIL)
        .bind(hash)
        .execute(pool)
        .await?;
        tracing::info!("Seeded super-admin account (email: {ADMIN_EMAIL})");
    }

    Ok(())
}

/// The mobile self-service booking path needs a fallback trainer for users
/// without an assignment.
async fn seed_default_trainer(pool: &Db) -> anyhow::Result<()> {
    const TRAINER_NAME:     &str = "Default Trainer";
    const TRAINER_EMAIL:    &str = "trainer@fitcoach.local";
    const TRAINER_PASSWORD: &str = "trainer";

    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ? AND role = 'TRAINER')",
    )
    .bind(TRAINER_EMAIL)
    .fetch_one(pool)
    .await?;

    if !exists {
        let hash = hash_password(TRAINER_PASSWORD)?;
        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, role, status, specialization, created_at, updated_at)
             VALUES (?, ?, ?, ?, 'TRAINER', 'ACTIVE', 'General fitness', UTC_TIMESTAMP(), UTC_TIMESTAMP())",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(TRAINER_NAME)
        .bind(TRAINER_EMAIL)
        .bind(hash)
        .execute(pool)
        .await?;
        tracing::info!("Seeded default trainer account (email: {TRAINER_EMAIL})");
    }

    Ok(())
}
