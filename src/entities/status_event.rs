//! Status event entity - Audit trail of approval actions on a product line.
//!
//! One row is written for every successful transition and for every approver
//! correction, inside the same database transaction as the change itself.

use crate::core::approval::TargetStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Status event database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "status_events")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Product line the action was taken on
    pub product_id: i64,
    /// Actor who took the action
    pub actor_id: i64,
    /// Action name: `"submit"`, `"approve"`, `"reject"`, `"resubmit"`, `"reopen"` or `"correct"`
    pub action: String,
    /// Status before the action
    pub from_status: TargetStatus,
    /// Status after the action
    pub to_status: TargetStatus,
    /// Rejection reason or correction note
    pub reason: Option<String>,
    /// When the action was taken
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `StatusEvent` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each event belongs to one product
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
