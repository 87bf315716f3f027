//! Report generation business logic.
//!
//! This module builds the data behind the approval queues and the target
//! dashboards: organizational nodes (a product line joined with its owner),
//! organization-wide or team-wide rollups, and text formatting for logs and
//! plain-text summaries. All totals come from [`crate::core::aggregate`].

use crate::{
    core::{
        aggregate::{
            Metric, ProductTargets, Rollup, TargetFilter, breakdown_by_category,
            breakdown_by_quarter, breakdown_by_subcategory,
        },
        approval::TargetStatus,
        catalog, hierarchy,
        period::Quarter,
        role::Role,
        target,
    },
    entities::{Product, actor, category, product},
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, prelude::*};
use std::collections::HashMap;
use tracing::debug;

/// A product line as seen from the approval hierarchy: the line, its owner
/// and its yearly rollups.
#[derive(Debug, Clone)]
pub struct OrgNode {
    /// The product line
    pub product: product::Model,
    /// Owner id
    pub owner_id: i64,
    /// Owner name
    pub owner_name: String,
    /// Owner role
    pub owner_role: Role,
    /// Owner territory
    pub territory: String,
    /// Yearly quantity rollup
    pub quantity: Rollup,
    /// Yearly revenue rollup
    pub revenue: Rollup,
}

/// Which product lines a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportScope {
    /// Lines owned by one actor
    Actor(i64),
    /// Lines owned by an actor and everyone below them
    Team(i64),
    /// Every line
    All,
}

/// Number of lines per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    /// Lines in draft
    pub draft: usize,
    /// Lines awaiting review
    pub submitted: usize,
    /// Approved lines
    pub approved: usize,
    /// Rejected lines
    pub rejected: usize,
}

impl StatusCounts {
    fn add(&mut self, status: TargetStatus) {
        match status {
            TargetStatus::Draft => self.draft += 1,
            TargetStatus::Submitted => self.submitted += 1,
            TargetStatus::Approved => self.approved += 1,
            TargetStatus::Rejected => self.rejected += 1,
        }
    }

    /// Total number of lines counted.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.draft + self.submitted + self.approved + self.rejected
    }
}

/// Rollups of one category.
#[derive(Debug, Clone)]
pub struct CategoryRollup {
    /// The category
    pub category: category::Model,
    /// Quantity rollup (always zero for revenue-only categories)
    pub quantity: Rollup,
    /// Revenue rollup
    pub revenue: Rollup,
}

/// Rollups of one subcategory.
#[derive(Debug, Clone)]
pub struct SubcategoryRollup {
    /// Category id
    pub category_id: i64,
    /// Subcategory, None for products without one
    pub subcategory: Option<String>,
    /// Quantity rollup
    pub quantity: Rollup,
    /// Revenue rollup
    pub revenue: Rollup,
}

/// Dashboard data for a scope.
#[derive(Debug, Clone)]
pub struct TargetReport {
    /// What the report covers
    pub scope: ReportScope,
    /// When the report was built
    pub generated_at: DateTime<Utc>,
    /// Number of product lines included
    pub product_count: usize,
    /// Overall quantity rollup
    pub quantity: Rollup,
    /// Overall revenue rollup
    pub revenue: Rollup,
    /// Per-category rollups, ordered by category name
    pub by_category: Vec<CategoryRollup>,
    /// Per-subcategory rollups, ordered by category id then subcategory
    pub by_subcategory: Vec<SubcategoryRollup>,
    /// Per-quarter revenue rollups
    pub by_quarter: Vec<(Quarter, Rollup)>,
    /// Lines per status
    pub status_counts: StatusCounts,
}

/// Submitted lines waiting for `approver`: lines of every owner the approver
/// may review (see [`hierarchy::reviewable_owners`]).
pub async fn pending_approvals(
    db: &DatabaseConnection,
    approver: &actor::Model,
) -> Result<Vec<OrgNode>> {
    let owners: HashMap<i64, actor::Model> = hierarchy::reviewable_owners(db, approver)
        .await?
        .into_iter()
        .map(|a| (a.id, a))
        .collect();

    if owners.is_empty() {
        return Ok(Vec::new());
    }

    let products = Product::find()
        .filter(product::Column::OwnerId.is_in(owners.keys().copied()))
        .filter(product::Column::Status.eq(TargetStatus::Submitted))
        .order_by_asc(product::Column::SubmittedAt)
        .order_by_asc(product::Column::Id)
        .all(db)
        .await?;

    build_nodes(db, products, &owners).await
}

/// Every line owned by `manager` or anyone below them.
pub async fn team_nodes(db: &DatabaseConnection, manager: &actor::Model) -> Result<Vec<OrgNode>> {
    let mut owners: HashMap<i64, actor::Model> = hierarchy::team_members(db, manager.id)
        .await?
        .into_iter()
        .map(|a| (a.id, a))
        .collect();
    owners.insert(manager.id, manager.clone());

    let ids: Vec<i64> = owners.keys().copied().collect();
    let products = catalog::get_products_for_owners(db, &ids).await?;

    build_nodes(db, products, &owners).await
}

/// Builds the dashboard for `scope`.
pub async fn generate_target_report(
    db: &DatabaseConnection,
    scope: ReportScope,
) -> Result<TargetReport> {
    let products = match scope {
        ReportScope::Actor(id) => catalog::get_products_for_owner(db, id).await?,
        ReportScope::Team(id) => {
            let mut ids: Vec<i64> = hierarchy::team_members(db, id)
                .await?
                .into_iter()
                .map(|a| a.id)
                .collect();
            ids.push(id);
            catalog::get_products_for_owners(db, &ids).await?
        }
        ReportScope::All => catalog::get_all_products(db).await?,
    };

    let snapshots = target::load_product_targets(db, products).await?;
    let categories = catalog::get_all_categories(db).await?;

    let report = build_report(scope, &snapshots, &categories);
    debug!(?scope, products = report.product_count, "Generated target report");
    Ok(report)
}

/// Assembles a report from snapshots already loaded.
#[must_use]
pub fn build_report(
    scope: ReportScope,
    snapshots: &[ProductTargets],
    categories: &[category::Model],
) -> TargetReport {
    let mut status_counts = StatusCounts::default();
    for snapshot in snapshots {
        status_counts.add(snapshot.status);
    }

    let quantity_by_category = breakdown_by_category(snapshots, Metric::Quantity);
    let revenue_by_category = breakdown_by_category(snapshots, Metric::Revenue);
    let by_category = categories
        .iter()
        .filter_map(|c| {
            let revenue = *revenue_by_category.get(&c.id)?;
            let quantity = quantity_by_category.get(&c.id).copied().unwrap_or_default();
            Some(CategoryRollup {
                category: c.clone(),
                quantity,
                revenue,
            })
        })
        .collect();

    let quantity_by_sub = breakdown_by_subcategory(snapshots, Metric::Quantity);
    let by_subcategory = breakdown_by_subcategory(snapshots, Metric::Revenue)
        .into_iter()
        .map(|(key, revenue)| {
            let quantity = quantity_by_sub.get(&key).copied().unwrap_or_default();
            let (category_id, subcategory) = key;
            SubcategoryRollup {
                category_id,
                subcategory,
                quantity,
                revenue,
            }
        })
        .collect();

    TargetReport {
        scope,
        generated_at: Utc::now(),
        product_count: snapshots.len(),
        quantity: Rollup::for_products(snapshots, &TargetFilter::all(), Metric::Quantity),
        revenue: Rollup::for_products(snapshots, &TargetFilter::all(), Metric::Revenue),
        by_category,
        by_subcategory,
        by_quarter: breakdown_by_quarter(snapshots, Metric::Revenue),
        status_counts,
    }
}

/// Formats a growth percentage with an explicit sign, e.g. `+100.0%`.
#[must_use]
pub fn format_growth(growth: f64) -> String {
    format!("{growth:+.1}%")
}

/// Formats an amount with Indian digit grouping, e.g. `12,34,567`.
#[must_use]
pub fn format_amount(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let (head, tail) = if digits.len() > 3 {
        digits.split_at(digits.len() - 3)
    } else {
        ("", digits.as_str())
    };

    let mut groups = Vec::new();
    let mut rest = head;
    while rest.len() > 2 {
        let (front, pair) = rest.split_at(rest.len() - 2);
        groups.push(pair);
        rest = front;
    }
    if !rest.is_empty() {
        groups.push(rest);
    }
    groups.reverse();
    groups.push(tail);

    let body = groups.join(",");
    if value < 0 { format!("-{body}") } else { body }
}

/// Formats a revenue figure in rupees, e.g. `₹12,34,567`.
#[must_use]
pub fn format_currency(value: i64) -> String {
    let amount = format_amount(value);
    match amount.strip_prefix('-') {
        Some(digits) => format!("-₹{digits}"),
        None => format!("₹{amount}"),
    }
}

/// One line for an approval queue entry.
#[must_use]
pub fn format_org_node(node: &OrgNode) -> String {
    format!(
        "{} ({}, {}) | {} {} | Qty {} ({}) | Rev {} ({}) | {}",
        node.owner_name,
        node.owner_role,
        node.territory,
        node.product.code,
        node.product.name,
        format_amount(node.quantity.current_year),
        format_growth(node.quantity.growth),
        format_currency(node.revenue.current_year),
        format_growth(node.revenue.growth),
        node.product.status
    )
}

/// Multi-line plain-text summary of a report.
#[must_use]
pub fn format_report_summary(report: &TargetReport) -> String {
    use std::fmt::Write;

    let counts = &report.status_counts;
    let mut summary = format!(
        "Target Report - {} product lines ({} draft, {} submitted, {} approved, {} rejected)\n",
        report.product_count, counts.draft, counts.submitted, counts.approved, counts.rejected
    );

    // Writing to a String cannot fail
    let _ = writeln!(
        summary,
        "  Quantity: LY {} | CY {} | AOP {} | Growth {}",
        format_amount(report.quantity.last_year),
        format_amount(report.quantity.current_year),
        format_amount(report.quantity.aop),
        format_growth(report.quantity.growth)
    );
    let _ = writeln!(
        summary,
        "  Revenue:  LY {} | CY {} | AOP {} | Growth {}",
        format_currency(report.revenue.last_year),
        format_currency(report.revenue.current_year),
        format_currency(report.revenue.aop),
        format_growth(report.revenue.growth)
    );

    for entry in &report.by_category {
        let _ = writeln!(
            summary,
            "  {} - Rev {} ({})",
            entry.category.name,
            format_currency(entry.revenue.current_year),
            format_growth(entry.revenue.growth)
        );
    }

    for (quarter, rollup) in &report.by_quarter {
        let _ = writeln!(
            summary,
            "  {quarter} - Rev {} ({})",
            format_currency(rollup.current_year),
            format_growth(rollup.growth)
        );
    }

    summary
}

async fn build_nodes(
    db: &DatabaseConnection,
    products: Vec<product::Model>,
    owners: &HashMap<i64, actor::Model>,
) -> Result<Vec<OrgNode>> {
    let snapshots = target::load_product_targets(db, products.clone()).await?;

    Ok(products
        .into_iter()
        .zip(snapshots)
        .filter_map(|(product, snapshot)| {
            let owner = owners.get(&product.owner_id)?;
            let single = std::slice::from_ref(&snapshot);
            Some(OrgNode {
                owner_id: owner.id,
                owner_name: owner.name.clone(),
                owner_role: owner.role,
                territory: owner.territory.clone(),
                quantity: Rollup::for_products(single, &TargetFilter::all(), Metric::Quantity),
                revenue: Rollup::for_products(single, &TargetFilter::all(), Metric::Revenue),
                product,
            })
        })
        .collect())
}
