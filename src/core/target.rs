//! Monthly target business logic - reading and editing the figures of a product line.
//!
//! Three kinds of writes exist, each with its own gate:
//! - the owner edits current-year figures while the line is `draft` or `rejected`
//! - the owner's approver corrects current-year figures while the line is `submitted`
//! - catalog maintainers set last-year and AOP reference figures at any time
//!
//! Reads return [`MonthlyTargets`] / [`ProductTargets`] snapshots for the
//! aggregation layer.

use crate::{
    core::{
        aggregate::{MonthlyFigures, MonthlyTargets, ProductTargets},
        approval::ApprovalAction,
        catalog, hierarchy,
        period::FiscalMonth,
        workflow,
    },
    entities::{Category, MonthlyTarget, actor, monthly_target, product},
    errors::{Error, Result},
};
use sea_orm::{Set, TransactionTrait, prelude::*};
use std::collections::HashMap;
use tracing::{debug, info};

/// Upper bound of any stored monthly figure. Twelve months of several
/// hundred thousand product lines still sum inside `i64`.
pub const MAX_FIGURE: i64 = 1_000_000_000_000;

/// Change to the current-year figures of one month. Fields left as `None` keep
/// their stored value.
///
/// When only the quantity is given for a unit-priced product, the revenue is
/// derived from the unit price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TargetUpdate {
    /// New current-year quantity
    pub current_year_qty: Option<i64>,
    /// New current-year revenue
    pub current_year_revenue: Option<i64>,
}

impl TargetUpdate {
    /// Quantity only; revenue follows from the unit price.
    #[must_use]
    pub const fn quantity(qty: i64) -> Self {
        Self {
            current_year_qty: Some(qty),
            current_year_revenue: None,
        }
    }

    /// Revenue only.
    #[must_use]
    pub const fn revenue(revenue: i64) -> Self {
        Self {
            current_year_qty: None,
            current_year_revenue: Some(revenue),
        }
    }

    const fn is_empty(&self) -> bool {
        self.current_year_qty.is_none() && self.current_year_revenue.is_none()
    }
}

/// Last-year and plan figures of one month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReferenceFigures {
    /// Units sold in the same month last year
    pub last_year_qty: i64,
    /// Revenue achieved in the same month last year
    pub last_year_revenue: i64,
    /// Plan reference, units
    pub aop_qty: i64,
    /// Plan reference, revenue
    pub aop_revenue: i64,
}

/// All twelve months of a product line.
pub async fn get_monthly_targets<C>(db: &C, product_id: i64) -> Result<MonthlyTargets>
where
    C: ConnectionTrait,
{
    let rows = MonthlyTarget::find()
        .filter(monthly_target::Column::ProductId.eq(product_id))
        .all(db)
        .await?;

    Ok(MonthlyTargets::from_months(
        rows.iter().map(|row| (row.month, MonthlyFigures::from(row))),
    ))
}

/// The stored row of one month of a product line.
pub async fn get_monthly_target<C>(
    db: &C,
    product_id: i64,
    month: FiscalMonth,
) -> Result<monthly_target::Model>
where
    C: ConnectionTrait,
{
    MonthlyTarget::find()
        .filter(monthly_target::Column::ProductId.eq(product_id))
        .filter(monthly_target::Column::Month.eq(month))
        .one(db)
        .await?
        .ok_or_else(|| Error::ProductNotFound {
            id: format!("{product_id}/{month}"),
        })
}

/// Turns product rows into aggregation snapshots, loading their months and
/// category flags in two queries.
pub async fn load_product_targets<C>(
    db: &C,
    products: Vec<product::Model>,
) -> Result<Vec<ProductTargets>>
where
    C: ConnectionTrait,
{
    if products.is_empty() {
        return Ok(Vec::new());
    }

    let revenue_only: HashMap<i64, bool> = Category::find()
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.id, c.is_revenue_only))
        .collect();

    let mut months: HashMap<i64, Vec<monthly_target::Model>> = HashMap::new();
    let rows = MonthlyTarget::find()
        .filter(monthly_target::Column::ProductId.is_in(products.iter().map(|p| p.id)))
        .all(db)
        .await?;
    for row in rows {
        months.entry(row.product_id).or_default().push(row);
    }

    Ok(products
        .into_iter()
        .map(|p| {
            let targets = MonthlyTargets::from_months(
                months
                    .get(&p.id)
                    .into_iter()
                    .flatten()
                    .map(|row| (row.month, MonthlyFigures::from(row))),
            );
            ProductTargets {
                product_id: p.id,
                is_revenue_only: revenue_only.get(&p.category_id).copied().unwrap_or(false),
                category_id: p.category_id,
                subcategory: p.subcategory,
                code: p.code,
                name: p.name,
                owner_id: p.owner_id,
                status: p.status,
                targets,
            }
        })
        .collect())
}

/// Snapshot of a single product line.
///
/// # Errors
/// Returns [`Error::ProductNotFound`] if the product does not exist.
pub async fn get_product_targets(db: &DatabaseConnection, product_id: i64) -> Result<ProductTargets> {
    let product = catalog::require_product(db, product_id).await?;
    let mut snapshots = load_product_targets(db, vec![product]).await?;
    snapshots.pop().ok_or_else(|| Error::ProductNotFound {
        id: product_id.to_string(),
    })
}

/// Owner edit of one month's current-year figures.
///
/// # Errors
/// Returns an error if:
/// - The actor does not own the product line
/// - The line is `submitted` or `approved`
/// - A figure is negative, or a quantity is given for a revenue-only product
/// - The update is empty
pub async fn update_monthly_target(
    db: &DatabaseConnection,
    actor: &actor::Model,
    product_id: i64,
    month: FiscalMonth,
    update: TargetUpdate,
) -> Result<monthly_target::Model> {
    let txn = db.begin().await?;

    let product = catalog::require_product(&txn, product_id).await?;
    if product.owner_id != actor.id {
        return Err(Error::PermissionDenied {
            role: actor.role.to_string(),
            action: format!("edit targets of product {}", product.code),
        });
    }

    if !product.status.is_editable_by_owner() {
        return Err(Error::NotEditable {
            status: product.status.to_string(),
        });
    }

    let row = write_current_year(&txn, &product, month, update).await?;
    touch_product(&txn, product).await?;

    txn.commit().await?;

    debug!(product_id, %month, by = %actor.code, "Target updated");
    Ok(row)
}

/// Approver correction of one month's current-year figures while the line
/// awaits review. The status stays `submitted`; a `correct` event is recorded.
///
/// # Errors
/// Returns an error if:
/// - The actor does not review the owner of the line
/// - The line is not `submitted`
/// - A figure is invalid or the update is empty
pub async fn correct_monthly_target(
    db: &DatabaseConnection,
    approver: &actor::Model,
    product_id: i64,
    month: FiscalMonth,
    update: TargetUpdate,
) -> Result<monthly_target::Model> {
    let txn = db.begin().await?;

    let product = catalog::require_product(&txn, product_id).await?;
    let owner = hierarchy::require_actor(&txn, product.owner_id).await?;
    hierarchy::ensure_approver_of(approver, &owner)?;

    let row = apply_correction(&txn, approver, &product, month, update).await?;
    touch_product(&txn, product).await?;

    txn.commit().await?;
    Ok(row)
}

/// Sets the last-year and plan figures of one month. Allowed in any status.
///
/// # Errors
/// Returns an error if the actor may not set reference figures, a figure is
/// negative, or a quantity is given for a revenue-only product.
pub async fn set_reference_figures(
    db: &DatabaseConnection,
    actor: &actor::Model,
    product_id: i64,
    month: FiscalMonth,
    figures: ReferenceFigures,
) -> Result<monthly_target::Model> {
    if !actor.role.capabilities().sets_reference_figures {
        return Err(Error::PermissionDenied {
            role: actor.role.to_string(),
            action: "set reference figures".to_string(),
        });
    }

    let txn = db.begin().await?;
    let row = write_reference_figures(&txn, product_id, month, figures).await?;
    txn.commit().await?;

    debug!(product_id, %month, by = %actor.code, "Reference figures set");
    Ok(row)
}

/// Applies an approver correction inside an open transaction. Shared with
/// [`workflow::approve`], which corrects before approving.
pub(crate) async fn apply_correction<C>(
    db: &C,
    approver: &actor::Model,
    product: &product::Model,
    month: FiscalMonth,
    update: TargetUpdate,
) -> Result<monthly_target::Model>
where
    C: ConnectionTrait,
{
    if !product.status.is_correctable() {
        return Err(Error::NotEditable {
            status: product.status.to_string(),
        });
    }

    let before = get_monthly_target(db, product.id, month).await?;
    let after = write_current_year(db, product, month, update).await?;

    let note = format!(
        "{month}: qty {} -> {}, revenue {} -> {}",
        before.current_year_qty,
        after.current_year_qty,
        before.current_year_revenue,
        after.current_year_revenue
    );
    workflow::record_event(
        db,
        product.id,
        approver.id,
        ApprovalAction::Correct,
        product.status,
        product.status,
        Some(note),
    )
    .await?;

    info!(product_id = product.id, %month, by = %approver.code, "Target corrected by approver");
    Ok(after)
}

/// Writes reference figures inside an open transaction without a role check.
/// Used by catalog seeding.
pub(crate) async fn write_reference_figures<C>(
    db: &C,
    product_id: i64,
    month: FiscalMonth,
    figures: ReferenceFigures,
) -> Result<monthly_target::Model>
where
    C: ConnectionTrait,
{
    let product = catalog::require_product(db, product_id).await?;
    let revenue_only = catalog::require_category(db, product.category_id)
        .await?
        .is_revenue_only;

    validate_figure("last_year_qty", figures.last_year_qty)?;
    validate_figure("last_year_revenue", figures.last_year_revenue)?;
    validate_figure("aop_qty", figures.aop_qty)?;
    validate_figure("aop_revenue", figures.aop_revenue)?;
    if revenue_only {
        ensure_no_quantity("last_year_qty", figures.last_year_qty)?;
        ensure_no_quantity("aop_qty", figures.aop_qty)?;
    }

    let mut row: monthly_target::ActiveModel = get_monthly_target(db, product_id, month).await?.into();
    row.last_year_qty = Set(figures.last_year_qty);
    row.last_year_revenue = Set(figures.last_year_revenue);
    row.aop_qty = Set(figures.aop_qty);
    row.aop_revenue = Set(figures.aop_revenue);
    row.update(db).await.map_err(Into::into)
}

/// Derives revenue from a quantity and unit price, rounded to the nearest unit.
///
/// # Errors
/// Returns [`Error::InvalidValue`] when the result does not fit a
/// figure in `0..=MAX_FIGURE`.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation
)]
pub fn derive_revenue(qty: i64, unit_price: f64) -> Result<i64> {
    let revenue = (qty as f64 * unit_price).round();
    if !revenue.is_finite() || revenue < 0.0 || revenue > MAX_FIGURE as f64 {
        return Err(Error::InvalidValue {
            field: "current_year_revenue".to_string(),
            value: revenue.to_string(),
        });
    }
    Ok(revenue as i64)
}

async fn write_current_year<C>(
    db: &C,
    product: &product::Model,
    month: FiscalMonth,
    update: TargetUpdate,
) -> Result<monthly_target::Model>
where
    C: ConnectionTrait,
{
    if update.is_empty() {
        return Err(Error::Config {
            message: "Nothing to update".to_string(),
        });
    }

    let revenue_only = catalog::require_category(db, product.category_id)
        .await?
        .is_revenue_only;
    let current = get_monthly_target(db, product.id, month).await?;

    let qty = update.current_year_qty.unwrap_or(current.current_year_qty);
    validate_figure("current_year_qty", qty)?;
    if revenue_only {
        ensure_no_quantity("current_year_qty", qty)?;
    }

    let revenue = match (update.current_year_revenue, update.current_year_qty) {
        (Some(revenue), _) => revenue,
        (None, Some(qty)) if !revenue_only => derive_revenue(qty, product.unit_price)?,
        (None, _) => current.current_year_revenue,
    };
    validate_figure("current_year_revenue", revenue)?;

    let mut row: monthly_target::ActiveModel = current.into();
    row.current_year_qty = Set(qty);
    row.current_year_revenue = Set(revenue);
    row.update(db).await.map_err(Into::into)
}

async fn touch_product<C>(db: &C, product: product::Model) -> Result<()>
where
    C: ConnectionTrait,
{
    let mut product: product::ActiveModel = product.into();
    product.updated_at = Set(chrono::Utc::now());
    product.update(db).await?;
    Ok(())
}

fn validate_figure(field: &str, value: i64) -> Result<()> {
    if !(0..=MAX_FIGURE).contains(&value) {
        return Err(Error::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
    Ok(())
}

fn ensure_no_quantity(field: &str, value: i64) -> Result<()> {
    if value != 0 {
        return Err(Error::InvalidValue {
            field: format!("{field} (revenue-only category)"),
            value: value.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        core::{
            aggregate::{Metric, Series, product_total},
            approval::TargetStatus,
        },
        test_utils::*,
    };

    #[tokio::test]
    async fn test_new_product_reads_as_zero_year() -> Result<()> {
        let (org, product) = setup_with_product().await?;

        let targets = get_monthly_targets(&org.db, product.id).await?;
        assert_eq!(targets, MonthlyTargets::default());

        let snapshot = get_product_targets(&org.db, product.id).await?;
        assert_eq!(snapshot.product_id, product.id);
        assert_eq!(snapshot.status, TargetStatus::Draft);

        Ok(())
    }

    #[tokio::test]
    async fn test_owner_update_derives_revenue() -> Result<()> {
        let (org, product) = setup_with_product().await?;

        let row = update_monthly_target(&org.db, &org.rep, product.id, FiscalMonth::May, TargetUpdate::quantity(7))
            .await?;
        assert_eq!(row.current_year_qty, 7);
        // unit price 10.0
        assert_eq!(row.current_year_revenue, 70);

        let row = update_monthly_target(
            &org.db,
            &org.rep,
            product.id,
            FiscalMonth::May,
            TargetUpdate::revenue(95),
        )
        .await?;
        assert_eq!(row.current_year_qty, 7);
        assert_eq!(row.current_year_revenue, 95);

        Ok(())
    }

    #[tokio::test]
    async fn test_yearly_total_matches_stored_months() -> Result<()> {
        let (org, product) = setup_with_product().await?;

        let mut expected = 0;
        for (i, month) in FiscalMonth::ALL.into_iter().enumerate() {
            let qty = i64::try_from(i).expect("month index fits in i64") + 1;
            expected += qty;
            update_monthly_target(&org.db, &org.rep, product.id, month, TargetUpdate::quantity(qty))
                .await?;
        }

        let snapshot = get_product_targets(&org.db, product.id).await?;
        assert_eq!(
            product_total(&snapshot, Metric::Quantity, Series::CurrentYear),
            expected
        );
        assert_eq!(
            product_total(&snapshot, Metric::Revenue, Series::CurrentYear),
            expected * 10
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_update_validation() -> Result<()> {
        let (org, product) = setup_with_product().await?;

        let negative = update_monthly_target(
            &org.db,
            &org.rep,
            product.id,
            FiscalMonth::Apr,
            TargetUpdate::quantity(-1),
        )
        .await;
        assert!(matches!(negative.unwrap_err(), Error::InvalidValue { .. }));

        let empty = update_monthly_target(
            &org.db,
            &org.rep,
            product.id,
            FiscalMonth::Apr,
            TargetUpdate::default(),
        )
        .await;
        assert!(matches!(empty.unwrap_err(), Error::Config { .. }));

        let not_owner = update_monthly_target(
            &org.db,
            &org.tbm,
            product.id,
            FiscalMonth::Apr,
            TargetUpdate::quantity(1),
        )
        .await;
        assert!(matches!(not_owner.unwrap_err(), Error::PermissionDenied { .. }));

        let missing = update_monthly_target(&org.db, &org.rep, 404, FiscalMonth::Apr, TargetUpdate::quantity(1))
            .await;
        assert!(matches!(missing.unwrap_err(), Error::ProductNotFound { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_revenue_only_product_rejects_quantity() -> Result<()> {
        let org = setup_org().await?;
        let services = create_test_category(&org.db, "services", true).await?;
        let product = create_test_product(&org.db, "SVC", services.id, org.rep.id).await?;

        let qty = update_monthly_target(
            &org.db,
            &org.rep,
            product.id,
            FiscalMonth::Jun,
            TargetUpdate::quantity(3),
        )
        .await;
        assert!(matches!(qty.unwrap_err(), Error::InvalidValue { .. }));

        let row = update_monthly_target(
            &org.db,
            &org.rep,
            product.id,
            FiscalMonth::Jun,
            TargetUpdate::revenue(5000),
        )
        .await?;
        assert_eq!(row.current_year_revenue, 5000);
        assert_eq!(row.current_year_qty, 0);

        let snapshot = get_product_targets(&org.db, product.id).await?;
        assert!(snapshot.is_revenue_only);

        Ok(())
    }

    #[tokio::test]
    async fn test_submitted_product_is_locked_for_owner() -> Result<()> {
        let (org, product) = setup_with_product().await?;
        workflow::submit(&org.db, &org.rep, product.id).await?;

        let result = update_monthly_target(
            &org.db,
            &org.rep,
            product.id,
            FiscalMonth::Apr,
            TargetUpdate::quantity(5),
        )
        .await;
        assert!(matches!(
            result.unwrap_err(),
            Error::NotEditable { status } if status == "submitted"
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_approver_correction_records_event() -> Result<()> {
        let (org, product) = setup_with_product().await?;
        update_monthly_target(&org.db, &org.rep, product.id, FiscalMonth::Jul, TargetUpdate::quantity(4))
            .await?;

        // Draft lines cannot be corrected
        let early = correct_monthly_target(
            &org.db,
            &org.tbm,
            product.id,
            FiscalMonth::Jul,
            TargetUpdate::quantity(6),
        )
        .await;
        assert!(matches!(early.unwrap_err(), Error::NotEditable { .. }));

        workflow::submit(&org.db, &org.rep, product.id).await?;

        let wrong_level = correct_monthly_target(
            &org.db,
            &org.abm,
            product.id,
            FiscalMonth::Jul,
            TargetUpdate::quantity(6),
        )
        .await;
        assert!(matches!(wrong_level.unwrap_err(), Error::PermissionDenied { .. }));

        let row = correct_monthly_target(
            &org.db,
            &org.tbm,
            product.id,
            FiscalMonth::Jul,
            TargetUpdate::quantity(6),
        )
        .await?;
        assert_eq!(row.current_year_qty, 6);
        assert_eq!(row.current_year_revenue, 60);

        let history = workflow::get_history(&org.db, product.id).await?;
        let last = history.last().unwrap();
        assert_eq!(last.action, "correct");
        assert_eq!(last.actor_id, org.tbm.id);
        assert_eq!(last.to_status, TargetStatus::Submitted);
        assert_eq!(last.reason.as_deref(), Some("jul: qty 4 -> 6, revenue 40 -> 60"));

        Ok(())
    }

    #[tokio::test]
    async fn test_reference_figures_admin_only() -> Result<()> {
        let (org, product) = setup_with_product().await?;
        let figures = ReferenceFigures {
            last_year_qty: 10,
            last_year_revenue: 100,
            aop_qty: 12,
            aop_revenue: 120,
        };

        let denied =
            set_reference_figures(&org.db, &org.rep, product.id, FiscalMonth::Aug, figures).await;
        assert!(matches!(denied.unwrap_err(), Error::PermissionDenied { .. }));

        let row =
            set_reference_figures(&org.db, &org.admin, product.id, FiscalMonth::Aug, figures).await?;
        assert_eq!(row.last_year_qty, 10);
        assert_eq!(row.aop_revenue, 120);

        // Allowed even after approval
        workflow::submit(&org.db, &org.rep, product.id).await?;
        workflow::approve(&org.db, &org.tbm, product.id, &[]).await?;
        let row = set_reference_figures(
            &org.db,
            &org.admin,
            product.id,
            FiscalMonth::Aug,
            ReferenceFigures {
                last_year_qty: 11,
                ..figures
            },
        )
        .await?;
        assert_eq!(row.last_year_qty, 11);

        let negative = set_reference_figures(
            &org.db,
            &org.admin,
            product.id,
            FiscalMonth::Aug,
            ReferenceFigures {
                aop_qty: -5,
                ..figures
            },
        )
        .await;
        assert!(matches!(negative.unwrap_err(), Error::InvalidValue { .. }));

        Ok(())
    }

    #[test]
    fn test_derive_revenue() {
        assert_eq!(derive_revenue(3, 12.5).unwrap(), 38);
        assert_eq!(derive_revenue(0, 99.0).unwrap(), 0);
        assert!(derive_revenue(1, f64::INFINITY).is_err());
        assert!(derive_revenue(MAX_FIGURE, 2.0).is_err());
    }

    #[tokio::test]
    async fn test_figures_are_bounded_so_reports_cannot_overflow() -> Result<()> {
        let (org, product) = setup_with_product().await?;

        let huge = update_monthly_target(
            &org.db,
            &org.rep,
            product.id,
            FiscalMonth::Apr,
            TargetUpdate::revenue(i64::MAX),
        )
        .await;
        assert!(matches!(huge.unwrap_err(), Error::InvalidValue { .. }));

        for month in FiscalMonth::ALL {
            update_monthly_target(
                &org.db,
                &org.rep,
                product.id,
                month,
                TargetUpdate::revenue(MAX_FIGURE),
            )
            .await?;
        }

        let report =
            crate::core::report::generate_target_report(&org.db, crate::core::report::ReportScope::All)
                .await?;
        assert_eq!(report.revenue.current_year, MAX_FIGURE * 12);

        Ok(())
    }
}
