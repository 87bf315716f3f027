//! Shared test utilities for `target-commit`.
//!
//! This module provides common helper functions for setting up test databases
//! and creating a small organization with sensible defaults.

use crate::{
    core::{
        catalog::{self, NewProduct},
        hierarchy,
        role::Role,
    },
    entities,
    errors::Result,
};
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
/// Also installs the test tracing subscriber, so `RUST_LOG` works in tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    init_test_tracing();
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Installs a test-friendly tracing subscriber. Safe to call more than once.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Creates a test actor.
///
/// # Defaults
/// * `name`: "Actor {code}"
/// * `territory`: "Territory {code}"
pub async fn create_test_actor(
    db: &DatabaseConnection,
    code: &str,
    role: Role,
    manager_id: Option<i64>,
) -> Result<entities::actor::Model> {
    hierarchy::create_actor(
        db,
        code.to_string(),
        format!("Actor {code}"),
        role,
        format!("Territory {code}"),
        manager_id,
    )
    .await
}

/// Creates a test category named after its code.
pub async fn create_test_category(
    db: &DatabaseConnection,
    code: &str,
    is_revenue_only: bool,
) -> Result<entities::category::Model> {
    catalog::create_category(
        db,
        code.to_string(),
        format!("Category {code}"),
        "box".to_string(),
        "blue".to_string(),
        is_revenue_only,
    )
    .await
}

/// Creates a test product line.
///
/// # Defaults
/// * `unit_price`: 10.0
/// * `subcategory`: None
pub async fn create_test_product(
    db: &DatabaseConnection,
    code: &str,
    category_id: i64,
    owner_id: i64,
) -> Result<entities::product::Model> {
    create_custom_product(db, code, category_id, None, 10.0, owner_id).await
}

/// Creates a test product line with custom subcategory and price.
pub async fn create_custom_product(
    db: &DatabaseConnection,
    code: &str,
    category_id: i64,
    subcategory: Option<&str>,
    unit_price: f64,
    owner_id: i64,
) -> Result<entities::product::Model> {
    catalog::create_product(
        db,
        NewProduct {
            category_id,
            subcategory: subcategory.map(str::to_string),
            name: format!("Product {code}"),
            code: code.to_string(),
            unit_price,
            owner_id,
        },
    )
    .await
}

/// A full reporting chain plus an admin and one category.
pub struct TestOrg {
    /// In-memory database
    pub db: DatabaseConnection,
    /// Catalog admin, no manager
    pub admin: entities::actor::Model,
    /// Sales head, top of the chain
    pub head: entities::actor::Model,
    /// Reports to `head`
    pub zbm: entities::actor::Model,
    /// Reports to `zbm`
    pub abm: entities::actor::Model,
    /// Reports to `abm`
    pub tbm: entities::actor::Model,
    /// Reports to `tbm`
    pub rep: entities::actor::Model,
    /// "equipment", not revenue-only
    pub category: entities::category::Model,
}

/// Sets up head → ZBM → ABM → TBM → rep, an admin and an "equipment" category.
pub async fn setup_org() -> Result<TestOrg> {
    let db = setup_test_db().await?;
    let admin = create_test_actor(&db, "ADMIN", Role::Admin, None).await?;
    let head = create_test_actor(&db, "HEAD", Role::SalesHead, None).await?;
    let zbm = create_test_actor(&db, "ZBM", Role::Zbm, Some(head.id)).await?;
    let abm = create_test_actor(&db, "ABM", Role::Abm, Some(zbm.id)).await?;
    let tbm = create_test_actor(&db, "TBM", Role::Tbm, Some(abm.id)).await?;
    let rep = create_test_actor(&db, "REP", Role::SalesRep, Some(tbm.id)).await?;
    let category = create_test_category(&db, "equipment", false).await?;

    Ok(TestOrg {
        db,
        admin,
        head,
        zbm,
        abm,
        tbm,
        rep,
        category,
    })
}

/// Sets up the organization plus one draft product line owned by the rep.
/// Returns (org, product) for target-related tests.
pub async fn setup_with_product() -> Result<(TestOrg, entities::product::Model)> {
    let org = setup_org().await?;
    let product = create_test_product(&org.db, "P-1", org.category.id, org.rep.id).await?;
    Ok((org, product))
}
