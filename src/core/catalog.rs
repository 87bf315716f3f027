//! Catalog business logic - categories and product target lines.
//!
//! A product line is created together with its twelve monthly target rows in
//! one database transaction, so every stored product always has a complete
//! fiscal year.

use crate::{
    core::{approval::TargetStatus, hierarchy, period::FiscalMonth},
    entities::{Category, MonthlyTarget, Product, actor, category, monthly_target, product},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{debug, info};

/// Arguments for [`create_product`].
#[derive(Debug, Clone)]
pub struct NewProduct {
    /// Category the product belongs to
    pub category_id: i64,
    /// Optional grouping inside the category
    pub subcategory: Option<String>,
    /// Product name
    pub name: String,
    /// Product code
    pub code: String,
    /// Unit price used to derive revenue from quantity
    pub unit_price: f64,
    /// Actor entering the targets
    pub owner_id: i64,
}

/// Creates a category.
///
/// # Errors
/// Returns an error if the code or name is blank or the insert fails
/// (for example on a duplicate code).
pub async fn create_category(
    db: &DatabaseConnection,
    code: String,
    name: String,
    icon: String,
    color: String,
    is_revenue_only: bool,
) -> Result<category::Model> {
    if code.trim().is_empty() || name.trim().is_empty() {
        return Err(Error::Config {
            message: "Category code and name cannot be empty".to_string(),
        });
    }

    let category = category::ActiveModel {
        code: Set(code.trim().to_string()),
        name: Set(name.trim().to_string()),
        icon: Set(icon),
        color: Set(color),
        is_revenue_only: Set(is_revenue_only),
        ..Default::default()
    };

    category.insert(db).await.map_err(Into::into)
}

/// All categories, ordered by name.
pub async fn get_all_categories<C>(db: &C) -> Result<Vec<category::Model>>
where
    C: ConnectionTrait,
{
    Category::find()
        .order_by_asc(category::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a category by its unique ID.
pub async fn get_category_by_id<C>(db: &C, category_id: i64) -> Result<Option<category::Model>>
where
    C: ConnectionTrait,
{
    Category::find_by_id(category_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a category by its code.
pub async fn get_category_by_code(
    db: &DatabaseConnection,
    code: &str,
) -> Result<Option<category::Model>> {
    Category::find()
        .filter(category::Column::Code.eq(code.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Like [`get_category_by_id`] but fails with [`Error::CategoryNotFound`] when missing.
pub async fn require_category<C>(db: &C, category_id: i64) -> Result<category::Model>
where
    C: ConnectionTrait,
{
    get_category_by_id(db, category_id)
        .await?
        .ok_or_else(|| Error::CategoryNotFound {
            id: category_id.to_string(),
        })
}

/// Creates a product line in `draft` with twelve zeroed months.
///
/// # Errors
/// Returns an error if:
/// - The name or code is empty or whitespace-only
/// - The unit price is negative or not finite
/// - The category or owner does not exist
/// - The owner's role does not enter targets
/// - Any database operation fails (nothing is written in that case)
pub async fn create_product(db: &DatabaseConnection, args: NewProduct) -> Result<product::Model> {
    let txn = db.begin().await?;
    let product = insert_product(&txn, args).await?;
    txn.commit().await?;

    Ok(product)
}

/// Inserts a product line and its twelve zeroed months on an open connection
/// or transaction. Commit is left to the caller.
pub(crate) async fn insert_product<C>(db: &C, args: NewProduct) -> Result<product::Model>
where
    C: ConnectionTrait,
{
    if args.name.trim().is_empty() || args.code.trim().is_empty() {
        return Err(Error::Config {
            message: "Product name and code cannot be empty".to_string(),
        });
    }

    validate_unit_price(args.unit_price)?;

    require_category(db, args.category_id).await?;
    let owner = hierarchy::require_actor(db, args.owner_id).await?;
    if !owner.role.capabilities().enters_targets {
        return Err(Error::PermissionDenied {
            role: owner.role.to_string(),
            action: "own target lines".to_string(),
        });
    }

    let now = chrono::Utc::now();
    let product = product::ActiveModel {
        category_id: Set(args.category_id),
        subcategory: Set(args
            .subcategory
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())),
        name: Set(args.name.trim().to_string()),
        code: Set(args.code.trim().to_string()),
        unit_price: Set(args.unit_price),
        owner_id: Set(args.owner_id),
        status: Set(TargetStatus::Draft),
        submitted_at: Set(None),
        reviewed_at: Set(None),
        reviewed_by: Set(None),
        rejection_reason: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let months = FiscalMonth::ALL.map(|month| monthly_target::ActiveModel {
        product_id: Set(product.id),
        month: Set(month),
        last_year_qty: Set(0),
        current_year_qty: Set(0),
        last_year_revenue: Set(0),
        current_year_revenue: Set(0),
        aop_qty: Set(0),
        aop_revenue: Set(0),
        ..Default::default()
    });
    MonthlyTarget::insert_many(months).exec(db).await?;

    debug!(product_id = product.id, code = %product.code, owner = %owner.code, "Created product line");
    Ok(product)
}

/// Finds a product line by its unique ID.
pub async fn get_product_by_id<C>(db: &C, product_id: i64) -> Result<Option<product::Model>>
where
    C: ConnectionTrait,
{
    Product::find_by_id(product_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Like [`get_product_by_id`] but fails with [`Error::ProductNotFound`] when missing.
pub async fn require_product<C>(db: &C, product_id: i64) -> Result<product::Model>
where
    C: ConnectionTrait,
{
    get_product_by_id(db, product_id)
        .await?
        .ok_or_else(|| Error::ProductNotFound {
            id: product_id.to_string(),
        })
}

/// Every product line, ordered by ID.
pub async fn get_all_products(db: &DatabaseConnection) -> Result<Vec<product::Model>> {
    Product::find()
        .order_by_asc(product::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Product lines owned by one actor, ordered by ID.
pub async fn get_products_for_owner(
    db: &DatabaseConnection,
    owner_id: i64,
) -> Result<Vec<product::Model>> {
    get_products_for_owners(db, &[owner_id]).await
}

/// Product lines owned by any of the given actors, ordered by ID.
pub async fn get_products_for_owners<C>(db: &C, owner_ids: &[i64]) -> Result<Vec<product::Model>>
where
    C: ConnectionTrait,
{
    if owner_ids.is_empty() {
        return Ok(Vec::new());
    }

    Product::find()
        .filter(product::Column::OwnerId.is_in(owner_ids.iter().copied()))
        .order_by_asc(product::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Product lines of one category, ordered by ID.
pub async fn get_products_in_category(
    db: &DatabaseConnection,
    category_id: i64,
) -> Result<Vec<product::Model>> {
    Product::find()
        .filter(product::Column::CategoryId.eq(category_id))
        .order_by_asc(product::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Changes the unit price of a product line. Catalog maintainers only.
///
/// Existing revenue figures are left as they are; the new price applies to
/// quantities entered afterwards.
///
/// # Errors
/// Returns an error if the actor may not manage the catalog, the price is
/// invalid, or the product does not exist.
pub async fn update_unit_price(
    db: &DatabaseConnection,
    actor: &actor::Model,
    product_id: i64,
    unit_price: f64,
) -> Result<product::Model> {
    if !actor.role.capabilities().manages_catalog {
        return Err(Error::PermissionDenied {
            role: actor.role.to_string(),
            action: "change unit prices".to_string(),
        });
    }

    validate_unit_price(unit_price)?;

    let mut product: product::ActiveModel = require_product(db, product_id).await?.into();
    product.unit_price = Set(unit_price);
    product.updated_at = Set(chrono::Utc::now());
    let product = product.update(db).await?;

    info!(product_id, unit_price, by = %actor.code, "Unit price changed");
    Ok(product)
}

fn validate_unit_price(unit_price: f64) -> Result<()> {
    if unit_price < 0.0 || !unit_price.is_finite() {
        return Err(Error::InvalidValue {
            field: "unit_price".to_string(),
            value: unit_price.to_string(),
        });
    }
    Ok(())
}
