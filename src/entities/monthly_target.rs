//! Monthly target entity - Figures of one product line for one fiscal month.

use crate::core::period::FiscalMonth;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Monthly target database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "monthly_targets")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Product line these figures belong to
    pub product_id: i64,
    /// Fiscal month
    pub month: FiscalMonth,
    /// Units sold in the same month last year
    pub last_year_qty: i64,
    /// Units committed for this year
    pub current_year_qty: i64,
    /// Revenue achieved in the same month last year
    pub last_year_revenue: i64,
    /// Revenue committed for this year
    pub current_year_revenue: i64,
    /// Annual operating plan reference, units
    pub aop_qty: i64,
    /// Annual operating plan reference, revenue
    pub aop_revenue: i64,
}

/// Defines relationships between `MonthlyTarget` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each monthly target belongs to one product
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
