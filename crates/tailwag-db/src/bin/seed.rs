//! # Seed Data Generator
//!
//! Populates the database with development data: a small pet-food catalog,
//! tax rates for the states we ship to most, a welcome discount, and one
//! subscriber with an active weekly box.
//!
//! ## Usage
//! ```bash
//! cargo run -p tailwag-db --bin seed
//!
//! # Specify database path
//! cargo run -p tailwag-db --bin seed -- --db ./data/tailwag.db
//! ```

use chrono::{Duration, Utc};
use std::env;

use tailwag_core::types::CardBrand;
use tailwag_core::{DiscountType, Frequency, SubscriptionItem};
use tailwag_db::repository::discount::NewDiscountCode;
use tailwag_db::repository::payment_method::NewPaymentMethod;
use tailwag_db::repository::subscription::NewSubscription;
use tailwag_db::repository::tax_rate::NewTaxRate;
use tailwag_db::repository::variant::NewVariant;
use tailwag_db::{Database, DbConfig};
use uuid::Uuid;

/// Catalog rows: (sku, title, price_cents, weight_oz, quantity)
const VARIANTS: &[(&str, &str, i64, i64, i64)] = &[
    ("CHKN-BOWL-2LB", "Chicken & Rice Bowl - 2 lb", 2_499, 32, 40),
    ("CHKN-BOWL-5LB", "Chicken & Rice Bowl - 5 lb", 4_999, 80, 25),
    ("BEEF-BOWL-2LB", "Beef & Sweet Potato Bowl - 2 lb", 2_699, 32, 35),
    ("BEEF-BOWL-5LB", "Beef & Sweet Potato Bowl - 5 lb", 5_399, 80, 20),
    ("TRKY-BOWL-2LB", "Turkey & Pumpkin Bowl - 2 lb", 2_599, 32, 30),
    ("BEEF-TREAT-8OZ", "Beef Training Treats - 8 oz", 1_299, 8, 60),
    ("SALM-TREAT-8OZ", "Salmon Skin Treats - 8 oz", 1_499, 8, 45),
    ("BONE-BROTH-16OZ", "Bone Broth Topper - 16 oz", 1_599, 16, 50),
];

/// Tax rates: (state_code, state_name, county, zip, bps)
const TAX_RATES: &[(&str, &str, Option<&str>, Option<&str>, i64)] = &[
    ("NC", "North Carolina", None, None, 475),
    ("NC", "North Carolina", Some("Asheville"), None, 700),
    ("NC", "North Carolina", None, Some("28801"), 725),
    ("SC", "South Carolina", None, None, 600),
    ("GA", "Georgia", None, None, 400),
    ("TN", "Tennessee", None, None, 700),
    ("VA", "Virginia", None, None, 530),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./tailwag_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tailwag Commerce Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./tailwag_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Tailwag Commerce Seed Data Generator");
    println!("=======================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected, migrations applied");

    let existing = db.variants().list_available(1).await?;
    if !existing.is_empty() {
        println!("⚠ Database already seeded, skipping.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Catalog
    let product_id = Uuid::new_v4().to_string();
    let mut chicken_5lb_id = String::new();
    for (sku, title, price_cents, weight_oz, quantity) in VARIANTS {
        let variant = db
            .variants()
            .create(NewVariant {
                product_id: product_id.clone(),
                sku: (*sku).into(),
                title: (*title).into(),
                price_cents: *price_cents,
                weight_oz: Some(*weight_oz),
                initial_quantity: *quantity,
                low_stock_threshold: 5,
                track_inventory: true,
                allow_backorder: false,
            })
            .await?;
        if *sku == "CHKN-BOWL-5LB" {
            chicken_5lb_id = variant.id;
        }
    }
    println!("✓ {} variants", VARIANTS.len());

    // Tax table
    for (state_code, state_name, county, zip, bps) in TAX_RATES {
        db.tax_rates()
            .create(NewTaxRate {
                state_code: (*state_code).into(),
                state_name: (*state_name).into(),
                county: county.map(Into::into),
                zip_code: zip.map(Into::into),
                rate_bps: *bps,
                notes: None,
            })
            .await?;
    }
    println!("✓ {} tax rates", TAX_RATES.len());

    // Welcome discount: 15% off, 30-day window
    db.discounts()
        .create(NewDiscountCode {
            code: "WELCOME15".into(),
            discount_type: DiscountType::Percentage,
            value: 1_500,
            usage_limit: Some(500),
            minimum_purchase_cents: Some(2_500),
            starts_at: Some(Utc::now()),
            expires_at: Some(Utc::now() + Duration::days(30)),
        })
        .await?;
    println!("✓ Discount code WELCOME15");

    // One subscriber with a stored card and a weekly box
    let customer_id = Uuid::new_v4().to_string();
    let method = db
        .payment_methods()
        .create(NewPaymentMethod {
            customer_id: customer_id.clone(),
            customer_profile_id: "seed-profile-1".into(),
            payment_profile_id: "seed-payment-1".into(),
            card_brand: Some(CardBrand::Visa),
            last_four: Some("4242".into()),
            expiration_month: Some(12),
            expiration_year: Some(2028),
            make_default: true,
        })
        .await?;

    db.subscriptions()
        .create(NewSubscription {
            customer_id,
            frequency: Frequency::Weekly,
            amount_cents: 9_998,
            items: vec![SubscriptionItem {
                variant_id: chicken_5lb_id,
                sku: "CHKN-BOWL-5LB".into(),
                name: "Chicken & Rice Bowl - 5 lb".into(),
                quantity: 2,
                unit_price_cents: 4_999,
            }],
            payment_method_id: Some(method.id),
            first_billing_date: Utc::now().date_naive(),
            notes: Some("seed subscriber".into()),
        })
        .await?;
    println!("✓ 1 subscriber (weekly, due today)");

    println!();
    println!("Done.");
    Ok(())
}
