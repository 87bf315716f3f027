//! Target rollups - pure aggregation over product target snapshots.
//!
//! Nothing in here touches the database. Callers load [`ProductTargets`]
//! snapshots through [`crate::core::target::load_product_targets`] and every
//! dashboard total (month, quarter, year, category, subcategory) is computed
//! from them with the functions below.

use crate::{
    core::{
        approval::TargetStatus,
        period::{FiscalMonth, Quarter},
    },
    entities::monthly_target,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which figure to aggregate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Units
    Quantity,
    /// Currency
    Revenue,
}

/// Which column of a month to aggregate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Series {
    /// Last year's actuals
    LastYear,
    /// This year's commitment
    CurrentYear,
    /// Annual operating plan reference
    Aop,
}

/// All figures of a single month.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyFigures {
    /// Units sold in the same month last year
    pub last_year_qty: i64,
    /// Units committed for this year
    pub current_year_qty: i64,
    /// Revenue achieved in the same month last year
    pub last_year_revenue: i64,
    /// Revenue committed for this year
    pub current_year_revenue: i64,
    /// Plan reference, units
    pub aop_qty: i64,
    /// Plan reference, revenue
    pub aop_revenue: i64,
}

impl MonthlyFigures {
    /// Selects one figure.
    #[must_use]
    pub const fn get(&self, metric: Metric, series: Series) -> i64 {
        match (metric, series) {
            (Metric::Quantity, Series::LastYear) => self.last_year_qty,
            (Metric::Quantity, Series::CurrentYear) => self.current_year_qty,
            (Metric::Quantity, Series::Aop) => self.aop_qty,
            (Metric::Revenue, Series::LastYear) => self.last_year_revenue,
            (Metric::Revenue, Series::CurrentYear) => self.current_year_revenue,
            (Metric::Revenue, Series::Aop) => self.aop_revenue,
        }
    }
}

impl From<&monthly_target::Model> for MonthlyFigures {
    fn from(row: &monthly_target::Model) -> Self {
        Self {
            last_year_qty: row.last_year_qty,
            current_year_qty: row.current_year_qty,
            last_year_revenue: row.last_year_revenue,
            current_year_revenue: row.current_year_revenue,
            aop_qty: row.aop_qty,
            aop_revenue: row.aop_revenue,
        }
    }
}

/// The twelve months of a product line. Always complete: months that were
/// never stored read as zero.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyTargets([MonthlyFigures; 12]);

impl MonthlyTargets {
    /// Builds the full year from whatever months are given.
    pub fn from_months<I>(months: I) -> Self
    where
        I: IntoIterator<Item = (FiscalMonth, MonthlyFigures)>,
    {
        let mut figures = [MonthlyFigures::default(); 12];
        for (month, value) in months {
            figures[month.index()] = value;
        }
        Self(figures)
    }

    /// Figures of one month.
    #[must_use]
    pub const fn get(&self, month: FiscalMonth) -> &MonthlyFigures {
        &self.0[month.index()]
    }

    /// Mutable figures of one month.
    pub fn get_mut(&mut self, month: FiscalMonth) -> &mut MonthlyFigures {
        &mut self.0[month.index()]
    }

    /// Months in fiscal order with their figures.
    pub fn iter(&self) -> impl Iterator<Item = (FiscalMonth, &MonthlyFigures)> {
        FiscalMonth::ALL.into_iter().zip(self.0.iter())
    }

    /// Sum of one figure over the whole year.
    #[must_use]
    pub fn total(&self, metric: Metric, series: Series) -> i64 {
        self.0.iter().map(|f| f.get(metric, series)).sum()
    }
}

/// Read-only snapshot of one product line with its twelve months.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductTargets {
    /// Product line id
    pub product_id: i64,
    /// Product code
    pub code: String,
    /// Product name
    pub name: String,
    /// Category id
    pub category_id: i64,
    /// Optional subcategory
    pub subcategory: Option<String>,
    /// Quantity figures are ignored for revenue-only categories
    pub is_revenue_only: bool,
    /// Owner of the line
    pub owner_id: i64,
    /// Approval status
    pub status: TargetStatus,
    /// Monthly figures
    pub targets: MonthlyTargets,
}

impl ProductTargets {
    /// One figure of one month, honoring the revenue-only flag.
    #[must_use]
    pub const fn value(&self, month: FiscalMonth, metric: Metric, series: Series) -> i64 {
        if self.is_revenue_only && matches!(metric, Metric::Quantity) {
            return 0;
        }
        self.targets.get(month).get(metric, series)
    }
}

/// Year-over-year growth in percent.
///
/// A zero baseline reports `100.0` when there is any current-year figure and
/// `0.0` otherwise, so a brand-new product shows as +100% rather than
/// infinite growth.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn calc_growth(last_year: i64, current_year: i64) -> f64 {
    if last_year == 0 {
        return if current_year > 0 { 100.0 } else { 0.0 };
    }
    let last_year = last_year as f64;
    ((current_year as f64 - last_year) / last_year) * 100.0
}

/// Sum of one figure of a product over a subset of months.
#[must_use]
pub fn months_total(
    product: &ProductTargets,
    months: &[FiscalMonth],
    metric: Metric,
    series: Series,
) -> i64 {
    months
        .iter()
        .map(|&month| product.value(month, metric, series))
        .sum()
}

/// Sum of one figure of a product over the whole year.
#[must_use]
pub fn product_total(product: &ProductTargets, metric: Metric, series: Series) -> i64 {
    months_total(product, &FiscalMonth::ALL, metric, series)
}

/// Sum of one figure of a product over one quarter.
#[must_use]
pub fn quarter_total(
    product: &ProductTargets,
    quarter: Quarter,
    metric: Metric,
    series: Series,
) -> i64 {
    months_total(product, &quarter.months(), metric, series)
}

/// Selects which products and months take part in a rollup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TargetFilter {
    /// Only products of this category
    pub category_id: Option<i64>,
    /// Only products of this subcategory
    pub subcategory: Option<String>,
    /// Only these months; the whole year when None
    pub months: Option<Vec<FiscalMonth>>,
}

impl TargetFilter {
    /// Every product, every month.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Restricts to one category.
    #[must_use]
    pub fn category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    /// Restricts to one subcategory.
    #[must_use]
    pub fn subcategory(mut self, subcategory: impl Into<String>) -> Self {
        self.subcategory = Some(subcategory.into());
        self
    }

    /// Restricts to the months of one quarter.
    #[must_use]
    pub fn quarter(mut self, quarter: Quarter) -> Self {
        self.months = Some(quarter.months().to_vec());
        self
    }

    /// Restricts to an explicit month subset.
    #[must_use]
    pub fn months(mut self, months: &[FiscalMonth]) -> Self {
        self.months = Some(months.to_vec());
        self
    }

    /// Whether the product passes the category and subcategory restriction.
    #[must_use]
    pub fn matches(&self, product: &ProductTargets) -> bool {
        self.category_id.is_none_or(|id| product.category_id == id)
            && self
                .subcategory
                .as_deref()
                .is_none_or(|sub| product.subcategory.as_deref() == Some(sub))
    }

    fn month_set(&self) -> &[FiscalMonth] {
        self.months.as_deref().unwrap_or(&FiscalMonth::ALL)
    }
}

/// Sum of one figure across every product and month selected by `filter`.
#[must_use]
pub fn rollup_total(
    products: &[ProductTargets],
    filter: &TargetFilter,
    metric: Metric,
    series: Series,
) -> i64 {
    let months = filter.month_set();
    products
        .iter()
        .filter(|p| filter.matches(p))
        .map(|p| months_total(p, months, metric, series))
        .sum()
}

/// Yearly total of one category.
#[must_use]
pub fn category_total(
    products: &[ProductTargets],
    category_id: i64,
    metric: Metric,
    series: Series,
) -> i64 {
    rollup_total(
        products,
        &TargetFilter::all().category(category_id),
        metric,
        series,
    )
}

/// Yearly total of one subcategory within a category.
#[must_use]
pub fn subcategory_total(
    products: &[ProductTargets],
    category_id: i64,
    subcategory: &str,
    metric: Metric,
    series: Series,
) -> i64 {
    rollup_total(
        products,
        &TargetFilter::all()
            .category(category_id)
            .subcategory(subcategory),
        metric,
        series,
    )
}

/// Last year, current year and plan totals of one metric, with growth.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rollup {
    /// Last year total
    pub last_year: i64,
    /// Current year total
    pub current_year: i64,
    /// Plan total
    pub aop: i64,
    /// Growth of current year over last year, in percent
    pub growth: f64,
}

impl Rollup {
    /// Builds a rollup and computes its growth.
    #[must_use]
    pub fn new(last_year: i64, current_year: i64, aop: i64) -> Self {
        Self {
            last_year,
            current_year,
            aop,
            growth: calc_growth(last_year, current_year),
        }
    }

    /// Rollup of `metric` across the products and months selected by `filter`.
    #[must_use]
    pub fn for_products(products: &[ProductTargets], filter: &TargetFilter, metric: Metric) -> Self {
        Self::new(
            rollup_total(products, filter, metric, Series::LastYear),
            rollup_total(products, filter, metric, Series::CurrentYear),
            rollup_total(products, filter, metric, Series::Aop),
        )
    }

    /// Current year minus last year.
    #[must_use]
    pub const fn difference(&self) -> i64 {
        self.current_year - self.last_year
    }
}

/// Yearly rollup of every category present in `products`, keyed by category id.
#[must_use]
pub fn breakdown_by_category(products: &[ProductTargets], metric: Metric) -> BTreeMap<i64, Rollup> {
    let mut categories: Vec<i64> = products.iter().map(|p| p.category_id).collect();
    categories.sort_unstable();
    categories.dedup();

    categories
        .into_iter()
        .map(|id| {
            let rollup = Rollup::for_products(products, &TargetFilter::all().category(id), metric);
            (id, rollup)
        })
        .collect()
}

/// Yearly rollup of every `(category, subcategory)` pair present in `products`.
/// Products without a subcategory are grouped under `None`.
#[must_use]
pub fn breakdown_by_subcategory(
    products: &[ProductTargets],
    metric: Metric,
) -> BTreeMap<(i64, Option<String>), Rollup> {
    let mut groups: BTreeMap<(i64, Option<String>), Vec<ProductTargets>> = BTreeMap::new();
    for product in products {
        groups
            .entry((product.category_id, product.subcategory.clone()))
            .or_default()
            .push(product.clone());
    }

    groups
        .into_iter()
        .map(|(key, members)| {
            let rollup = Rollup::for_products(&members, &TargetFilter::all(), metric);
            (key, rollup)
        })
        .collect()
}

/// Rollup of each fiscal quarter, in order.
#[must_use]
pub fn breakdown_by_quarter(products: &[ProductTargets], metric: Metric) -> Vec<(Quarter, Rollup)> {
    Quarter::ALL
        .into_iter()
        .map(|q| {
            (
                q,
                Rollup::for_products(products, &TargetFilter::all().quarter(q), metric),
            )
        })
        .collect()
}

/// Rollup of each fiscal month, in order.
#[must_use]
pub fn breakdown_by_month(products: &[ProductTargets], metric: Metric) -> Vec<(FiscalMonth, Rollup)> {
    FiscalMonth::ALL
        .into_iter()
        .map(|m| {
            (
                m,
                Rollup::for_products(products, &TargetFilter::all().months(&[m]), metric),
            )
        })
        .collect()
}
