//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod actor;
pub mod category;
pub mod monthly_target;
pub mod product;
pub mod status_event;

// Re-export specific types to avoid conflicts
pub use actor::{Column as ActorColumn, Entity as Actor, Model as ActorModel};
pub use category::{Column as CategoryColumn, Entity as Category, Model as CategoryModel};
pub use monthly_target::{
    Column as MonthlyTargetColumn, Entity as MonthlyTarget, Model as MonthlyTargetModel,
};
pub use product::{Column as ProductColumn, Entity as Product, Model as ProductModel};
pub use status_event::{
    Column as StatusEventColumn, Entity as StatusEvent, Model as StatusEventModel,
};
