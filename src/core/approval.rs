//! Approval state machine for product target lines.
//!
//! A target line moves `draft -> submitted -> approved | rejected`. A rejected
//! line can be resubmitted after edits or reopened back to draft. Approved is
//! terminal. This module only knows about statuses and actions; who may act is
//! decided by [`crate::core::role`] and the workflow functions.

use crate::errors::{Error, Result};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Approval status of a product target line.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum TargetStatus {
    /// Being entered, editable by the owner
    #[default]
    #[sea_orm(string_value = "draft")]
    Draft,
    /// Waiting for the approver, locked for the owner
    #[sea_orm(string_value = "submitted")]
    Submitted,
    /// Accepted by the approver
    #[sea_orm(string_value = "approved")]
    Approved,
    /// Sent back to the owner with a reason
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl TargetStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 4] = [Self::Draft, Self::Submitted, Self::Approved, Self::Rejected];

    /// Lowercase status name as stored.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Returns the status reached by applying `action`, or
    /// [`Error::InvalidTransition`] when the action is not allowed from here.
    ///
    /// [`ApprovalAction::Correct`] leaves the status unchanged and is only
    /// valid while submitted.
    pub fn apply(self, action: ApprovalAction) -> Result<Self> {
        match (self, action) {
            (Self::Draft, ApprovalAction::Submit) | (Self::Rejected, ApprovalAction::Resubmit) => {
                Ok(Self::Submitted)
            }
            (Self::Submitted, ApprovalAction::Approve) => Ok(Self::Approved),
            (Self::Submitted, ApprovalAction::Reject) => Ok(Self::Rejected),
            (Self::Submitted, ApprovalAction::Correct) => Ok(Self::Submitted),
            (Self::Rejected, ApprovalAction::Reopen) => Ok(Self::Draft),
            (from, action) => Err(Error::InvalidTransition {
                from: from.to_string(),
                action: action.to_string(),
            }),
        }
    }

    /// The owner may change values only while drafting or after a rejection.
    #[must_use]
    pub const fn is_editable_by_owner(self) -> bool {
        matches!(self, Self::Draft | Self::Rejected)
    }

    /// The approver may correct values only while the line awaits review.
    #[must_use]
    pub const fn is_correctable(self) -> bool {
        matches!(self, Self::Submitted)
    }

    /// No further transitions exist.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Approved)
    }
}

impl fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actions that drive [`TargetStatus`] transitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalAction {
    /// Owner hands the draft to the approver
    Submit,
    /// Approver accepts the submitted line
    Approve,
    /// Approver sends the line back with a reason
    Reject,
    /// Owner sends a rejected line back for review
    Resubmit,
    /// Owner moves a rejected line back to draft
    Reopen,
    /// Approver adjusts values of a submitted line
    Correct,
}

impl ApprovalAction {
    /// Lowercase action name as recorded in the history.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Resubmit => "resubmit",
            Self::Reopen => "reopen",
            Self::Correct => "correct",
        }
    }

    /// Whether the action is taken by the approving role rather than the owner.
    #[must_use]
    pub const fn is_review(self) -> bool {
        matches!(self, Self::Approve | Self::Reject | Self::Correct)
    }
}

impl fmt::Display for ApprovalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
