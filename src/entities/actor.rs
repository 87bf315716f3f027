//! Actor entity - A member of the sales organization.
//!
//! Actors form a tree through `manager_id`; the manager of an actor is the one
//! who reviews the targets that actor enters.

use crate::core::role::Role;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Actor database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "actors")]
pub struct Model {
    /// Unique identifier for the actor
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Employee code, unique across the organization
    #[sea_orm(unique)]
    pub code: String,
    /// Display name
    pub name: String,
    /// Position in the hierarchy
    pub role: Role,
    /// Territory, area or zone covered by this actor
    pub territory: String,
    /// Direct manager, None at the top of the tree
    pub manager_id: Option<i64>,
}

/// Defines relationships between Actor and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One actor owns many product target lines
    #[sea_orm(has_many = "super::product::Entity")]
    Products,
    /// Each actor may report to another actor
    #[sea_orm(belongs_to = "Entity", from = "Column::ManagerId", to = "Column::Id")]
    Manager,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Products.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
