//! Catalog seeding command.
//!
//! Inserts a demo catalog so a fresh install has something to sell. The
//! command is a no-op when the products table already has rows, so it is
//! safe to run on every deploy.

use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;

/// Errors that can occur during seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// One demo product. Prices are minor units (paise) to keep the table
/// readable.
struct DemoProduct {
    name: &'static str,
    description: &'static str,
    price: i64,
    discount_price: Option<i64>,
    category: &'static str,
    image: &'static str,
    stock: i32,
    rating: f64,
}

const DEMO_CATALOG: &[DemoProduct] = &[
    DemoProduct {
        name: "Wireless Headphones",
        description: "Over-ear headphones with active noise cancellation and 30 hour battery.",
        price: 7_999_00,
        discount_price: Some(5_999_00),
        category: "Electronics",
        image: "/static/img/placeholder.svg",
        stock: 25,
        rating: 4.5,
    },
    DemoProduct {
        name: "Smart Watch",
        description: "Fitness tracking, heart rate monitor, and a week of battery life.",
        price: 12_999_00,
        discount_price: None,
        category: "Electronics",
        image: "/static/img/placeholder.svg",
        stock: 15,
        rating: 4.2,
    },
    DemoProduct {
        name: "Denim Jacket",
        description: "Classic fit denim jacket in washed indigo.",
        price: 2_499_00,
        discount_price: Some(1_999_00),
        category: "Fashion",
        image: "/static/img/placeholder.svg",
        stock: 40,
        rating: 4.0,
    },
    DemoProduct {
        name: "Running Shoes",
        description: "Lightweight trainers with responsive cushioning.",
        price: 4_999_00,
        discount_price: None,
        category: "Sports",
        image: "/static/img/placeholder.svg",
        stock: 30,
        rating: 4.6,
    },
    DemoProduct {
        name: "Ceramic Dinner Set",
        description: "16 piece stoneware set, dishwasher and microwave safe.",
        price: 3_499_00,
        discount_price: Some(2_799_00),
        category: "Home",
        image: "/static/img/placeholder.svg",
        stock: 12,
        rating: 4.3,
    },
    DemoProduct {
        name: "The Silent City",
        description: "A mystery novel set in a town where nobody speaks after dark.",
        price: 499_00,
        discount_price: None,
        category: "Books",
        image: "/static/img/placeholder.svg",
        stock: 60,
        rating: 4.8,
    },
    DemoProduct {
        name: "Vitamin C Serum",
        description: "Brightening facial serum with 10% vitamin C.",
        price: 899_00,
        discount_price: Some(699_00),
        category: "Beauty",
        image: "/static/img/placeholder.svg",
        stock: 50,
        rating: 4.1,
    },
    DemoProduct {
        name: "Yoga Mat",
        description: "Non-slip 6mm mat with carry strap.",
        price: 1_299_00,
        discount_price: None,
        category: "Sports",
        image: "/static/img/placeholder.svg",
        stock: 35,
        rating: 4.4,
    },
];

/// Seed the catalog with demo products.
pub async fn run() -> Result<(), SeedError> {
    dotenvy::dotenv().ok();

    let database_url =
        super::database_url().ok_or(SeedError::MissingEnvVar("STORE_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    let pool = PgPool::connect(&database_url).await?;

    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products")
        .fetch_one(&pool)
        .await?;

    if count > 0 {
        tracing::info!("Catalog already has {count} products, skipping seed");
        return Ok(());
    }

    for product in DEMO_CATALOG {
        sqlx::query(
            "INSERT INTO products \
             (name, description, price, discount_price, category, image, stock, rating) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(product.name)
        .bind(product.description)
        .bind(Decimal::new(product.price, 2))
        .bind(product.discount_price.map(|p| Decimal::new(p, 2)))
        .bind(product.category)
        .bind(product.image)
        .bind(product.stock)
        .bind(product.rating)
        .execute(&pool)
        .await?;
    }

    tracing::info!("Seeded {} demo products", DEMO_CATALOG.len());
    Ok(())
}
