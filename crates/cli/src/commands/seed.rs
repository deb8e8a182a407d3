//! Reference data seeding.
//!
//! Inserts a baseline set of brands, categories, and tags so a fresh
//! database can serve catalog writes immediately. Idempotent: rows that
//! already exist are left alone.

use super::{CommandError, connect};

const BRANDS: &[(&str, &str)] = &[
    ("Northwind", "https://cdn.bazaar.test/brands/northwind.png"),
    ("Alpenglow", "https://cdn.bazaar.test/brands/alpenglow.png"),
    ("Tidecraft", "https://cdn.bazaar.test/brands/tidecraft.png"),
];

const CATEGORIES: &[(&str, &str)] = &[
    ("Shoes", "shoes"),
    ("Apparel", "apparel"),
    ("Accessories", "accessories"),
    ("Electronics", "electronics"),
];

const TAGS: &[&str] = &["new-season", "sale", "bestseller", "limited", "outdoor"];

/// Seed brands, categories, and tags.
///
/// # Errors
///
/// Returns `CommandError` when the database is unreachable or an insert
/// fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Seeding brands...");
    for (name, logo) in BRANDS {
        sqlx::query("INSERT INTO brand (name, logo) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(name)
            .bind(logo)
            .execute(&pool)
            .await?;
    }

    tracing::info!("Seeding categories...");
    for (name, slug) in CATEGORIES {
        sqlx::query("INSERT INTO category (name, slug) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(name)
            .bind(slug)
            .execute(&pool)
            .await?;
    }

    tracing::info!("Seeding tags...");
    for name in TAGS {
        sqlx::query("INSERT INTO tag (name) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(name)
            .execute(&pool)
            .await?;
    }

    tracing::info!("Seed complete");
    Ok(())
}
