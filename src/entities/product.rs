//! Product entity - One actor's target line for a catalog product.
//!
//! Each row owns exactly twelve `monthly_targets` rows and carries the approval
//! status of those figures together with the review metadata.

use crate::core::approval::TargetStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Unique identifier for the product line
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Category this product belongs to
    pub category_id: i64,
    /// Optional grouping inside the category
    pub subcategory: Option<String>,
    /// Product name
    pub name: String,
    /// Product code
    pub code: String,
    /// Unit price used to derive revenue from quantity
    pub unit_price: f64,
    /// Actor who enters and submits these targets
    pub owner_id: i64,
    /// Approval status
    pub status: TargetStatus,
    /// When the line was last submitted
    pub submitted_at: Option<DateTimeUtc>,
    /// When the line was last approved or rejected
    pub reviewed_at: Option<DateTimeUtc>,
    /// Actor who last approved or rejected the line
    pub reviewed_by: Option<i64>,
    /// Reason given with the last rejection
    pub rejection_reason: Option<String>,
    /// When the line was created
    pub created_at: DateTimeUtc,
    /// When the line or its figures last changed
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Product and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each product belongs to one category
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
    /// Each product line is owned by one actor
    #[sea_orm(
        belongs_to = "super::actor::Entity",
        from = "Column::OwnerId",
        to = "super::actor::Column::Id"
    )]
    Owner,
    /// One product has twelve monthly targets
    #[sea_orm(has_many = "super::monthly_target::Entity")]
    MonthlyTargets,
    /// One product has many status events
    #[sea_orm(has_many = "super::status_event::Entity")]
    StatusEvents,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::actor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::monthly_target::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MonthlyTargets.def()
    }
}

impl Related<super::status_event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StatusEvents.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
