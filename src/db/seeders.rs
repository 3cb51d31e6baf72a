//! Database seeders for bootstrap and demo data.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::info;

use super::{now_timestamp, Role};
use crate::crypto::hash_password;

/// Create the bootstrap admin account if no user with this email exists.
///
/// Returns true when a new account was created.
pub async fn ensure_admin_user(pool: &SqlitePool, email: &str, password: &str) -> Result<bool> {
    let email = email.trim().to_lowercase();
    let exists: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?")
        .bind(&email)
        .fetch_optional(pool)
        .await?;
    if exists.is_some() {
        return Ok(false);
    }

    insert_user(pool, &email, "Admin User", password, Role::Admin).await?;
    info!(email = %email, "Created admin user");
    Ok(true)
}

/// Demo businesses: (name, description, category, location, image_url)
const DEMO_BUSINESSES: [(&str, &str, &str, &str, &str); 4] = [
    (
        "Pizza Palace",
        "Best pizza in town with fresh ingredients",
        "Restaurant",
        "Downtown",
        "https://images.unsplash.com/photo-1513104890138-7c749659a591?w=400",
    ),
    (
        "Coffee Corner",
        "Cozy coffee shop with artisan brews",
        "Cafe",
        "Main Street",
        "https://images.unsplash.com/photo-1501339847302-ac426a4a7cbb?w=400",
    ),
    (
        "Tech Repair Shop",
        "Professional electronics repair service",
        "Service",
        "Tech District",
        "https://images.unsplash.com/photo-1581092160562-40aa08e78837?w=400",
    ),
    (
        "Fashion Boutique",
        "Trendy clothing and accessories",
        "Shop",
        "Shopping Mall",
        "https://images.unsplash.com/photo-1441986300917-64674bd600d8?w=400",
    ),
];

/// Seed a regular demo user and the sample businesses. Existing rows are left alone.
pub async fn seed_demo_data(pool: &SqlitePool) -> Result<()> {
    info!("Seeding demo data...");

    let demo_email = "user@example.com";
    let exists: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?")
        .bind(demo_email)
        .fetch_optional(pool)
        .await?;
    if exists.is_none() {
        insert_user(pool, demo_email, "John Doe", "user12345", Role::User).await?;
    }

    for (name, description, category, location, image_url) in DEMO_BUSINESSES {
        sqlx::query(
            r#"
            INSERT INTO businesses (id, name, description, category, location, image_url, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(name) DO NOTHING
            "#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(name)
        .bind(description)
        .bind(category)
        .bind(location)
        .bind(image_url)
        .bind(now_timestamp())
        .execute(pool)
        .await?;
    }

    info!("Demo data seeded");
    Ok(())
}

async fn insert_user(
    pool: &SqlitePool,
    email: &str,
    name: &str,
    password: &str,
    role: Role,
) -> Result<()> {
    let password_hash = hash_password(password)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;

    sqlx::query(
        "INSERT INTO users (id, email, name, password_hash, role, created_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(email)
    .bind(name)
    .bind(&password_hash)
    .bind(role.as_str())
    .bind(now_timestamp())
    .execute(pool)
    .await
    .with_context(|| format!("Failed to create user {}", email))?;

    Ok(())
}
