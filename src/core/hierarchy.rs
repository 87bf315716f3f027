//! Organization hierarchy - actors and their reporting lines.
//!
//! Every actor except the top of the tree reports to a manager whose role is
//! the approver role of their own. The reporting line decides who reviews
//! whose targets.

use crate::{
    core::role::Role,
    entities::{Actor, actor},
    errors::{Error, Result},
};
use sea_orm::{Condition, QueryOrder, Set, prelude::*};
use std::collections::VecDeque;

/// Creates a new actor, validating the name and the reporting line.
///
/// # Errors
/// Returns an error if:
/// - The code or name is empty or whitespace-only
/// - The manager does not exist
/// - The manager's role is not the approver role of `role`
/// - The database insert operation fails
pub async fn create_actor(
    db: &DatabaseConnection,
    code: String,
    name: String,
    role: Role,
    territory: String,
    manager_id: Option<i64>,
) -> Result<actor::Model> {
    if code.trim().is_empty() {
        return Err(Error::Config {
            message: "Actor code cannot be empty".to_string(),
        });
    }

    if name.trim().is_empty() {
        return Err(Error::Config {
            message: "Actor name cannot be empty".to_string(),
        });
    }

    if let Some(manager_id) = manager_id {
        let manager = require_actor(db, manager_id).await?;
        if role.approver() != Some(manager.role) {
            return Err(Error::Config {
                message: format!(
                    "A {role} cannot report to {} ({})",
                    manager.name, manager.role
                ),
            });
        }
    }

    let actor = actor::ActiveModel {
        code: Set(code.trim().to_string()),
        name: Set(name.trim().to_string()),
        role: Set(role),
        territory: Set(territory.trim().to_string()),
        manager_id: Set(manager_id),
        ..Default::default()
    };

    actor.insert(db).await.map_err(Into::into)
}

/// Finds an actor by its unique ID.
pub async fn get_actor_by_id<C>(db: &C, actor_id: i64) -> Result<Option<actor::Model>>
where
    C: ConnectionTrait,
{
    Actor::find_by_id(actor_id).one(db).await.map_err(Into::into)
}

/// Finds an actor by employee code.
pub async fn get_actor_by_code(db: &DatabaseConnection, code: &str) -> Result<Option<actor::Model>> {
    Actor::find()
        .filter(actor::Column::Code.eq(code.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Like [`get_actor_by_id`] but fails with [`Error::ActorNotFound`] when missing.
pub async fn require_actor<C>(db: &C, actor_id: i64) -> Result<actor::Model>
where
    C: ConnectionTrait,
{
    get_actor_by_id(db, actor_id)
        .await?
        .ok_or_else(|| Error::ActorNotFound {
            id: actor_id.to_string(),
        })
}

/// Actors reporting directly to `manager_id`, ordered by name.
pub async fn direct_reports<C>(db: &C, manager_id: i64) -> Result<Vec<actor::Model>>
where
    C: ConnectionTrait,
{
    Actor::find()
        .filter(actor::Column::ManagerId.eq(manager_id))
        .order_by_asc(actor::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Every actor below `manager_id` in the tree, breadth first. The manager
/// itself is not included.
pub async fn team_members(db: &DatabaseConnection, manager_id: i64) -> Result<Vec<actor::Model>> {
    let mut members = Vec::new();
    let mut queue = VecDeque::from([manager_id]);

    while let Some(current) = queue.pop_front() {
        for report in direct_reports(db, current).await? {
            // Guards against a cycle introduced outside create_actor
            if report.id == manager_id || members.iter().any(|m: &actor::Model| m.id == report.id) {
                continue;
            }
            queue.push_back(report.id);
            members.push(report);
        }
    }

    Ok(members)
}

/// Every actor whose lines `approver` may review: direct reports of the
/// reviewed role, plus actors of that role with no manager on record.
/// Agrees with [`ensure_approver_of`]. Ordered by name.
pub async fn reviewable_owners<C>(db: &C, approver: &actor::Model) -> Result<Vec<actor::Model>>
where
    C: ConnectionTrait,
{
    let candidates = Actor::find()
        .filter(
            Condition::any()
                .add(actor::Column::ManagerId.eq(approver.id))
                .add(actor::Column::ManagerId.is_null()),
        )
        .order_by_asc(actor::Column::Name)
        .all(db)
        .await?;

    Ok(candidates
        .into_iter()
        .filter(|owner| ensure_approver_of(approver, owner).is_ok())
        .collect())
}

/// Checks that `approver` reviews the lines owned by `owner`.
///
/// The approver's role must sit directly above the owner's role. When the
/// owner has a manager on record, only that manager may review.
///
/// # Errors
/// Returns [`Error::PermissionDenied`] otherwise.
pub fn ensure_approver_of(approver: &actor::Model, owner: &actor::Model) -> Result<()> {
    let reports_line_ok = owner.manager_id.is_none_or(|id| id == approver.id);
    if approver.role.reviews(owner.role) && reports_line_ok {
        Ok(())
    } else {
        Err(Error::PermissionDenied {
            role: approver.role.to_string(),
            action: format!("review targets of {}", owner.name),
        })
    }
}
