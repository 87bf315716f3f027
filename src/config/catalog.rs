//! Seed catalog loading and seeding.
//!
//! The catalog file declares categories, the organization tree and the product
//! lines each actor enters targets for, optionally with last-year and AOP
//! figures per month. Seeding skips anything that already exists, so it is
//! safe to run on every start.

use crate::{
    core::{
        catalog::{self, NewProduct},
        hierarchy,
        period::FiscalMonth,
        role::Role,
        target::{self, ReferenceFigures},
    },
    entities::{Product, product},
    errors::{Error, Result},
};
use sea_orm::{DatabaseConnection, TransactionTrait, prelude::*};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info, warn};

/// Root of the catalog file
#[derive(Debug, Deserialize, Default)]
pub struct CatalogConfig {
    /// Product categories
    #[serde(default)]
    pub categories: Vec<CategoryConfig>,
    /// Organization members, managers listed before their reports
    #[serde(default)]
    pub actors: Vec<ActorConfig>,
    /// Product target lines
    #[serde(default)]
    pub products: Vec<ProductConfig>,
}

/// Category definition
#[derive(Debug, Deserialize, Clone)]
pub struct CategoryConfig {
    /// Unique slug
    pub code: String,
    /// Display name
    pub name: String,
    /// Icon name
    #[serde(default)]
    pub icon: String,
    /// Color tag
    #[serde(default)]
    pub color: String,
    /// Whether the category is tracked in revenue only
    #[serde(default)]
    pub revenue_only: bool,
}

/// Organization member definition
#[derive(Debug, Deserialize, Clone)]
pub struct ActorConfig {
    /// Unique employee code
    pub code: String,
    /// Display name
    pub name: String,
    /// Role (`sales_rep`, `tbm`, `abm`, `zbm`, `sales_head`, `admin`)
    pub role: Role,
    /// Territory, area or zone
    #[serde(default)]
    pub territory: String,
    /// Employee code of the manager
    #[serde(default)]
    pub manager: Option<String>,
}

/// Product line definition
#[derive(Debug, Deserialize, Clone)]
pub struct ProductConfig {
    /// Product code
    pub code: String,
    /// Product name
    pub name: String,
    /// Category code
    pub category: String,
    /// Optional subcategory
    #[serde(default)]
    pub subcategory: Option<String>,
    /// Unit price
    #[serde(default)]
    pub unit_price: f64,
    /// Employee code of the owner
    pub owner: String,
    /// Last year's units per month, April first (empty or twelve values)
    #[serde(default)]
    pub last_year_qty: Vec<i64>,
    /// Last year's revenue per month, April first (empty or twelve values)
    #[serde(default)]
    pub last_year_revenue: Vec<i64>,
    /// Plan units per month, April first (empty or twelve values)
    #[serde(default)]
    pub aop_qty: Vec<i64>,
    /// Plan revenue per month, April first (empty or twelve values)
    #[serde(default)]
    pub aop_revenue: Vec<i64>,
}

impl ProductConfig {
    fn has_reference_figures(&self) -> bool {
        !(self.last_year_qty.is_empty()
            && self.last_year_revenue.is_empty()
            && self.aop_qty.is_empty()
            && self.aop_revenue.is_empty())
    }

    /// Reference figures of one month; missing series read as zero.
    fn reference_figures(&self, month: FiscalMonth) -> Result<ReferenceFigures> {
        let pick = |field: &str, values: &[i64]| -> Result<i64> {
            match values.len() {
                0 => Ok(0),
                12 => Ok(values[month.index()]),
                n => Err(Error::Config {
                    message: format!(
                        "Product {}: {field} must have 12 monthly values, found {n}",
                        self.code
                    ),
                }),
            }
        };

        Ok(ReferenceFigures {
            last_year_qty: pick("last_year_qty", &self.last_year_qty)?,
            last_year_revenue: pick("last_year_revenue", &self.last_year_revenue)?,
            aop_qty: pick("aop_qty", &self.aop_qty)?,
            aop_revenue: pick("aop_revenue", &self.aop_revenue)?,
        })
    }
}

/// What a seeding run created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    /// Categories created
    pub categories: usize,
    /// Actors created
    pub actors: usize,
    /// Product lines created
    pub products: usize,
}

/// Loads the catalog from a TOML file.
///
/// # Errors
/// Returns an error if the file cannot be read or the TOML is invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CatalogConfig> {
    let path_ref = path.as_ref();
    debug!("Attempting to load catalog from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read catalog file {}: {e}", path_ref.display()),
    })?;

    parse_config(&contents)
}

/// Loads the catalog from `CATALOG_PATH`, or `./config.toml` when unset.
pub fn load_default_config() -> Result<CatalogConfig> {
    let path = std::env::var("CATALOG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_config(path)
}

/// Parses catalog TOML.
pub fn parse_config(contents: &str) -> Result<CatalogConfig> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse catalog: {e}"),
    })
}

/// Creates whatever part of the catalog does not exist yet.
///
/// Categories and actors are matched by code, product lines by code and owner.
///
/// # Errors
/// Returns an error if a reference (category, manager, owner) cannot be
/// resolved or a create operation fails. Each product line is written with its
/// reference figures in one transaction, so a failed line leaves nothing
/// behind. Everything created before the error stays; rerunning after fixing
/// the file completes the seed.
pub async fn seed_catalog(db: &DatabaseConnection, config: &CatalogConfig) -> Result<SeedSummary> {
    info!(
        "Seeding catalog: {} categories, {} actors, {} products in config",
        config.categories.len(),
        config.actors.len(),
        config.products.len()
    );
    let mut summary = SeedSummary::default();

    for cfg in &config.categories {
        if catalog::get_category_by_code(db, &cfg.code).await?.is_some() {
            debug!("Category '{}' already exists. Skipping.", cfg.code);
            continue;
        }
        catalog::create_category(
            db,
            cfg.code.clone(),
            cfg.name.clone(),
            cfg.icon.clone(),
            cfg.color.clone(),
            cfg.revenue_only,
        )
        .await?;
        summary.categories += 1;
    }

    for cfg in &config.actors {
        if hierarchy::get_actor_by_code(db, &cfg.code).await?.is_some() {
            debug!("Actor '{}' already exists. Skipping.", cfg.code);
            continue;
        }
        let manager_id = match &cfg.manager {
            Some(code) => Some(
                hierarchy::get_actor_by_code(db, code)
                    .await?
                    .ok_or_else(|| Error::Config {
                        message: format!(
                            "Manager '{code}' of '{}' must be declared before them",
                            cfg.code
                        ),
                    })?
                    .id,
            ),
            None => None,
        };
        hierarchy::create_actor(
            db,
            cfg.code.clone(),
            cfg.name.clone(),
            cfg.role,
            cfg.territory.clone(),
            manager_id,
        )
        .await?;
        summary.actors += 1;
    }

    for cfg in &config.products {
        let category = catalog::get_category_by_code(db, &cfg.category)
            .await?
            .ok_or_else(|| Error::CategoryNotFound {
                id: cfg.category.clone(),
            })?;
        let owner = hierarchy::get_actor_by_code(db, &cfg.owner)
            .await?
            .ok_or_else(|| Error::ActorNotFound {
                id: cfg.owner.clone(),
            })?;

        let exists = Product::find()
            .filter(product::Column::Code.eq(cfg.code.trim()))
            .filter(product::Column::OwnerId.eq(owner.id))
            .one(db)
            .await?
            .is_some();
        if exists {
            debug!("Product '{}' of '{}' already exists. Skipping.", cfg.code, cfg.owner);
            continue;
        }

        let mut figures = Vec::new();
        if cfg.has_reference_figures() {
            for month in FiscalMonth::ALL {
                figures.push((month, cfg.reference_figures(month)?));
            }
        }

        // The line and its reference figures land together or not at all
        let txn = db.begin().await?;
        let created = catalog::insert_product(
            &txn,
            NewProduct {
                category_id: category.id,
                subcategory: cfg.subcategory.clone(),
                name: cfg.name.clone(),
                code: cfg.code.clone(),
                unit_price: cfg.unit_price,
                owner_id: owner.id,
            },
        )
        .await?;
        for (month, value) in figures {
            target::write_reference_figures(&txn, created.id, month, value).await?;
        }
        txn.commit().await?;

        summary.products += 1;
    }

    if summary == SeedSummary::default() {
        warn!("Catalog seeding created nothing; database already up to date");
    } else {
        info!(
            "Catalog seeded: {} categories, {} actors, {} products created",
            summary.categories, summary.actors, summary.products
        );
    }

    Ok(summary)
}
