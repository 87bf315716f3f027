//! Approval workflow - moving product lines through their statuses.
//!
//! Owner actions (submit, resubmit, reopen) and reviewer actions (approve,
//! reject) each run in one database transaction that updates the product row
//! and appends a `status_events` row. Whether a transition exists at all is
//! decided by [`TargetStatus::apply`].

use crate::{
    core::{
        approval::{ApprovalAction, TargetStatus},
        catalog, hierarchy,
        period::FiscalMonth,
        target::{self, TargetUpdate},
    },
    entities::{Product, StatusEvent, actor, product, status_event},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::info;

/// Owner hands a draft line to the approver. Sets `submitted_at`.
///
/// # Errors
/// Returns an error if the actor does not own the line, the role does not
/// enter targets, or the line is not a draft (a second submit fails with
/// [`Error::InvalidTransition`]).
pub async fn submit(
    db: &DatabaseConnection,
    actor: &actor::Model,
    product_id: i64,
) -> Result<product::Model> {
    owner_transition(db, actor, product_id, ApprovalAction::Submit).await
}

/// Owner sends a rejected line back for review. Clears the rejection reason.
pub async fn resubmit(
    db: &DatabaseConnection,
    actor: &actor::Model,
    product_id: i64,
) -> Result<product::Model> {
    owner_transition(db, actor, product_id, ApprovalAction::Resubmit).await
}

/// Owner moves a rejected line back to draft. The rejection reason is kept
/// until the line is submitted again.
pub async fn reopen(
    db: &DatabaseConnection,
    actor: &actor::Model,
    product_id: i64,
) -> Result<product::Model> {
    owner_transition(db, actor, product_id, ApprovalAction::Reopen).await
}

/// Submits every draft line of the owner in one transaction.
///
/// Returns the submitted lines; an owner without drafts gets an empty list.
pub async fn submit_all_drafts(
    db: &DatabaseConnection,
    actor: &actor::Model,
) -> Result<Vec<product::Model>> {
    ensure_permitted(actor, ApprovalAction::Submit)?;

    let txn = db.begin().await?;

    let drafts = Product::find()
        .filter(product::Column::OwnerId.eq(actor.id))
        .filter(product::Column::Status.eq(TargetStatus::Draft))
        .order_by_asc(product::Column::Id)
        .all(&txn)
        .await?;

    let mut submitted = Vec::with_capacity(drafts.len());
    for product in drafts {
        submitted.push(transition(&txn, actor, product, ApprovalAction::Submit, None).await?);
    }

    txn.commit().await?;

    info!(owner = %actor.code, count = submitted.len(), "Submitted all drafts");
    Ok(submitted)
}

/// Approver accepts a submitted line, applying `corrections` first.
///
/// Corrections and the approval are atomic: if any correction fails the
/// line stays submitted with its original figures.
///
/// # Errors
/// Returns an error if the approver does not review the owner, the line is
/// not submitted, or a correction is invalid.
pub async fn approve(
    db: &DatabaseConnection,
    approver: &actor::Model,
    product_id: i64,
    corrections: &[(FiscalMonth, TargetUpdate)],
) -> Result<product::Model> {
    ensure_permitted(approver, ApprovalAction::Approve)?;

    let txn = db.begin().await?;

    let product = catalog::require_product(&txn, product_id).await?;
    let owner = hierarchy::require_actor(&txn, product.owner_id).await?;
    hierarchy::ensure_approver_of(approver, &owner)?;
    product.status.apply(ApprovalAction::Approve)?;

    for &(month, update) in corrections {
        target::apply_correction(&txn, approver, &product, month, update).await?;
    }

    let approved = transition(&txn, approver, product, ApprovalAction::Approve, None).await?;
    txn.commit().await?;

    info!(
        product_id,
        by = %approver.code,
        corrections = corrections.len(),
        "Targets approved"
    );
    Ok(approved)
}

/// Approver sends a submitted line back to its owner.
///
/// # Errors
/// Returns an error if the reason is blank, the approver does not review the
/// owner, or the line is not submitted.
pub async fn reject(
    db: &DatabaseConnection,
    approver: &actor::Model,
    product_id: i64,
    reason: &str,
) -> Result<product::Model> {
    ensure_permitted(approver, ApprovalAction::Reject)?;

    let reason = reason.trim();
    if reason.is_empty() {
        return Err(Error::Config {
            message: "Rejection reason cannot be empty".to_string(),
        });
    }

    let txn = db.begin().await?;

    let product = catalog::require_product(&txn, product_id).await?;
    let owner = hierarchy::require_actor(&txn, product.owner_id).await?;
    hierarchy::ensure_approver_of(approver, &owner)?;

    let rejected = transition(
        &txn,
        approver,
        product,
        ApprovalAction::Reject,
        Some(reason.to_string()),
    )
    .await?;
    txn.commit().await?;

    info!(product_id, by = %approver.code, reason, "Targets rejected");
    Ok(rejected)
}

/// Status history of a product line, oldest first.
pub async fn get_history(
    db: &DatabaseConnection,
    product_id: i64,
) -> Result<Vec<status_event::Model>> {
    StatusEvent::find()
        .filter(status_event::Column::ProductId.eq(product_id))
        .order_by_asc(status_event::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Appends one row to the status history.
pub(crate) async fn record_event<C>(
    db: &C,
    product_id: i64,
    actor_id: i64,
    action: ApprovalAction,
    from_status: TargetStatus,
    to_status: TargetStatus,
    reason: Option<String>,
) -> Result<status_event::Model>
where
    C: ConnectionTrait,
{
    status_event::ActiveModel {
        product_id: Set(product_id),
        actor_id: Set(actor_id),
        action: Set(action.to_string()),
        from_status: Set(from_status),
        to_status: Set(to_status),
        reason: Set(reason),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

async fn owner_transition(
    db: &DatabaseConnection,
    actor: &actor::Model,
    product_id: i64,
    action: ApprovalAction,
) -> Result<product::Model> {
    ensure_permitted(actor, action)?;

    let txn = db.begin().await?;

    let product = catalog::require_product(&txn, product_id).await?;
    if product.owner_id != actor.id {
        return Err(Error::PermissionDenied {
            role: actor.role.to_string(),
            action: format!("{action} product {}", product.code),
        });
    }

    let updated = transition(&txn, actor, product, action, None).await?;
    txn.commit().await?;

    info!(product_id, owner = %actor.code, %action, status = %updated.status, "Status changed");
    Ok(updated)
}

/// Applies `action` to an already authorized line and records the event.
async fn transition<C>(
    db: &C,
    actor: &actor::Model,
    product: product::Model,
    action: ApprovalAction,
    reason: Option<String>,
) -> Result<product::Model>
where
    C: ConnectionTrait,
{
    let from = product.status;
    let to = from.apply(action)?;
    let now = chrono::Utc::now();
    let product_id = product.id;

    let mut active: product::ActiveModel = product.into();
    active.status = Set(to);
    active.updated_at = Set(now);
    match action {
        ApprovalAction::Submit | ApprovalAction::Resubmit => {
            active.submitted_at = Set(Some(now));
            active.rejection_reason = Set(None);
        }
        ApprovalAction::Approve => {
            active.reviewed_at = Set(Some(now));
            active.reviewed_by = Set(Some(actor.id));
        }
        ApprovalAction::Reject => {
            active.reviewed_at = Set(Some(now));
            active.reviewed_by = Set(Some(actor.id));
            active.rejection_reason = Set(reason.clone());
        }
        ApprovalAction::Reopen | ApprovalAction::Correct => {}
    }
    let updated = active.update(db).await?;

    record_event(db, product_id, actor.id, action, from, to, reason).await?;
    Ok(updated)
}

fn ensure_permitted(actor: &actor::Model, action: ApprovalAction) -> Result<()> {
    if actor.role.permits(action) {
        Ok(())
    } else {
        Err(Error::PermissionDenied {
            role: actor.role.to_string(),
            action: action.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{core::role::Role, test_utils::*};

    #[tokio::test]
    async fn test_submit_sets_timestamp_and_status() -> Result<()> {
        let (org, product) = setup_with_product().await?;

        let before = chrono::Utc::now();
        let submitted = submit(&org.db, &org.rep, product.id).await?;

        assert_eq!(submitted.status, TargetStatus::Submitted);
        let submitted_at = submitted.submitted_at.unwrap();
        assert!(submitted_at >= before - chrono::Duration::seconds(1));

        let history = get_history(&org.db, product.id).await?;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].action, "submit");
        assert_eq!(history[0].from_status, TargetStatus::Draft);
        assert_eq!(history[0].to_status, TargetStatus::Submitted);

        Ok(())
    }

    #[tokio::test]
    async fn test_second_submit_fails() -> Result<()> {
        let (org, product) = setup_with_product().await?;
        submit(&org.db, &org.rep, product.id).await?;

        let again = submit(&org.db, &org.rep, product.id).await;
        assert!(matches!(again.unwrap_err(), Error::InvalidTransition { .. }));

        // No extra history row for the failed attempt
        assert_eq!(get_history(&org.db, product.id).await?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_only_owner_submits() -> Result<()> {
        let (org, product) = setup_with_product().await?;

        let other_rep = create_test_actor(&org.db, "REP-X", Role::SalesRep, Some(org.tbm.id)).await?;
        let result = submit(&org.db, &other_rep, product.id).await;
        assert!(matches!(result.unwrap_err(), Error::PermissionDenied { .. }));

        let head = submit(&org.db, &org.head, product.id).await;
        assert!(matches!(head.unwrap_err(), Error::PermissionDenied { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_approve_with_corrections() -> Result<()> {
        let (org, product) = setup_with_product().await?;
        target::update_monthly_target(
            &org.db,
            &org.rep,
            product.id,
            FiscalMonth::Apr,
            TargetUpdate::quantity(10),
        )
        .await?;
        submit(&org.db, &org.rep, product.id).await?;

        let approved = approve(
            &org.db,
            &org.tbm,
            product.id,
            &[
                (FiscalMonth::Apr, TargetUpdate::quantity(12)),
                (FiscalMonth::Oct, TargetUpdate::revenue(500)),
            ],
        )
        .await?;

        assert_eq!(approved.status, TargetStatus::Approved);
        assert_eq!(approved.reviewed_by, Some(org.tbm.id));
        assert!(approved.reviewed_at.is_some());

        let apr = target::get_monthly_target(&org.db, product.id, FiscalMonth::Apr).await?;
        assert_eq!(apr.current_year_qty, 12);
        let oct = target::get_monthly_target(&org.db, product.id, FiscalMonth::Oct).await?;
        assert_eq!(oct.current_year_revenue, 500);

        let actions: Vec<String> = get_history(&org.db, product.id)
            .await?
            .into_iter()
            .map(|e| e.action)
            .collect();
        assert_eq!(actions, vec!["submit", "correct", "correct", "approve"]);

        Ok(())
    }

    #[tokio::test]
    async fn test_failed_correction_rolls_back_approval() -> Result<()> {
        let (org, product) = setup_with_product().await?;
        submit(&org.db, &org.rep, product.id).await?;

        let result = approve(
            &org.db,
            &org.tbm,
            product.id,
            &[
                (FiscalMonth::Apr, TargetUpdate::quantity(3)),
                (FiscalMonth::May, TargetUpdate::quantity(-3)),
            ],
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::InvalidValue { .. }));

        let current = catalog::require_product(&org.db, product.id).await?;
        assert_eq!(current.status, TargetStatus::Submitted);
        let apr = target::get_monthly_target(&org.db, product.id, FiscalMonth::Apr).await?;
        assert_eq!(apr.current_year_qty, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_approve_requires_direct_approver_and_submitted() -> Result<()> {
        let (org, product) = setup_with_product().await?;

        let draft = approve(&org.db, &org.tbm, product.id, &[]).await;
        assert!(matches!(draft.unwrap_err(), Error::InvalidTransition { .. }));

        submit(&org.db, &org.rep, product.id).await?;

        let skip_level = approve(&org.db, &org.abm, product.id, &[]).await;
        assert!(matches!(skip_level.unwrap_err(), Error::PermissionDenied { .. }));

        let rep = approve(&org.db, &org.rep, product.id, &[]).await;
        assert!(matches!(rep.unwrap_err(), Error::PermissionDenied { .. }));

        approve(&org.db, &org.tbm, product.id, &[]).await?;

        let again = approve(&org.db, &org.tbm, product.id, &[]).await;
        assert!(matches!(again.unwrap_err(), Error::InvalidTransition { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_reject_resubmit_cycle() -> Result<()> {
        let (org, product) = setup_with_product().await?;
        submit(&org.db, &org.rep, product.id).await?;

        let blank = reject(&org.db, &org.tbm, product.id, "   ").await;
        assert!(matches!(blank.unwrap_err(), Error::Config { .. }));

        let rejected = reject(&org.db, &org.tbm, product.id, "Q3 too low").await?;
        assert_eq!(rejected.status, TargetStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("Q3 too low"));

        // Rejected lines are editable again
        target::update_monthly_target(
            &org.db,
            &org.rep,
            product.id,
            FiscalMonth::Nov,
            TargetUpdate::quantity(40),
        )
        .await?;

        let resubmitted = resubmit(&org.db, &org.rep, product.id).await?;
        assert_eq!(resubmitted.status, TargetStatus::Submitted);
        assert!(resubmitted.rejection_reason.is_none());

        let history = get_history(&org.db, product.id).await?;
        assert_eq!(history[1].reason.as_deref(), Some("Q3 too low"));
        assert_eq!(history[2].action, "resubmit");

        Ok(())
    }

    #[tokio::test]
    async fn test_reopen_returns_to_draft() -> Result<()> {
        let (org, product) = setup_with_product().await?;

        let not_rejected = reopen(&org.db, &org.rep, product.id).await;
        assert!(matches!(not_rejected.unwrap_err(), Error::InvalidTransition { .. }));

        submit(&org.db, &org.rep, product.id).await?;
        reject(&org.db, &org.tbm, product.id, "Redo").await?;
        let reopened = reopen(&org.db, &org.rep, product.id).await?;
        assert_eq!(reopened.status, TargetStatus::Draft);
        assert_eq!(reopened.rejection_reason.as_deref(), Some("Redo"));

        let submitted = submit(&org.db, &org.rep, product.id).await?;
        assert!(submitted.rejection_reason.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_submit_all_drafts() -> Result<()> {
        let (org, first) = setup_with_product().await?;
        let second = create_test_product(&org.db, "P-2", org.category.id, org.rep.id).await?;
        let third = create_test_product(&org.db, "P-3", org.category.id, org.rep.id).await?;
        submit(&org.db, &org.rep, third.id).await?;

        let submitted = submit_all_drafts(&org.db, &org.rep).await?;
        assert_eq!(
            submitted.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![first.id, second.id]
        );
        assert!(submitted.iter().all(|p| p.status == TargetStatus::Submitted));

        assert!(submit_all_drafts(&org.db, &org.rep).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_tbm_lines_are_reviewed_by_abm() -> Result<()> {
        let org = setup_org().await?;
        let product = create_test_product(&org.db, "T-1", org.category.id, org.tbm.id).await?;
        submit(&org.db, &org.tbm, product.id).await?;

        let wrong = approve(&org.db, &org.tbm, product.id, &[]).await;
        assert!(matches!(wrong.unwrap_err(), Error::PermissionDenied { .. }));

        let approved = approve(&org.db, &org.abm, product.id, &[]).await?;
        assert_eq!(approved.status, TargetStatus::Approved);

        Ok(())
    }
}
