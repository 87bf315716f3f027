//! Organization roles and what each of them may do.
//!
//! Every role that enters targets is reviewed by the role directly above it.
//! Permissions are a static capability table instead of per-screen branching.

use crate::core::approval::ApprovalAction;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Position of an actor in the sales organization.
#[derive(
    Clone,
    Copy,
    Debug,
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
pub enum Role {
    /// Enters targets for their own territory
    #[sea_orm(string_value = "sales_rep")]
    SalesRep,
    /// Territory Business Manager
    #[sea_orm(string_value = "tbm")]
    Tbm,
    /// Area Business Manager
    #[sea_orm(string_value = "abm")]
    Abm,
    /// Zonal Business Manager
    #[sea_orm(string_value = "zbm")]
    Zbm,
    /// Top of the approval chain
    #[sea_orm(string_value = "sales_head")]
    SalesHead,
    /// Maintains the catalog and reference figures
    #[sea_orm(string_value = "admin")]
    Admin,
}

/// What a role is allowed to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Capabilities {
    /// May own target lines and enter current-year figures
    pub enters_targets: bool,
    /// May review (approve, reject, correct) the lines of the role below
    pub approves: bool,
    /// May create categories and products
    pub manages_catalog: bool,
    /// May set last-year and AOP figures
    pub sets_reference_figures: bool,
}

impl Role {
    /// Lowercase role name as stored.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SalesRep => "sales_rep",
            Self::Tbm => "tbm",
            Self::Abm => "abm",
            Self::Zbm => "zbm",
            Self::SalesHead => "sales_head",
            Self::Admin => "admin",
        }
    }

    /// The role that reviews targets entered by this role.
    #[must_use]
    pub const fn approver(self) -> Option<Self> {
        match self {
            Self::SalesRep => Some(Self::Tbm),
            Self::Tbm => Some(Self::Abm),
            Self::Abm => Some(Self::Zbm),
            Self::Zbm => Some(Self::SalesHead),
            Self::SalesHead | Self::Admin => None,
        }
    }

    /// Capability table.
    #[must_use]
    pub const fn capabilities(self) -> Capabilities {
        match self {
            Self::SalesRep => Capabilities {
                enters_targets: true,
                approves: false,
                manages_catalog: false,
                sets_reference_figures: false,
            },
            Self::Tbm | Self::Abm | Self::Zbm => Capabilities {
                enters_targets: true,
                approves: true,
                manages_catalog: false,
                sets_reference_figures: false,
            },
            Self::SalesHead => Capabilities {
                enters_targets: false,
                approves: true,
                manages_catalog: false,
                sets_reference_figures: false,
            },
            Self::Admin => Capabilities {
                enters_targets: false,
                approves: false,
                manages_catalog: true,
                sets_reference_figures: true,
            },
        }
    }

    /// Whether this role may take `action` at all. Whether it may take it on a
    /// particular line also depends on ownership and reporting lines.
    #[must_use]
    pub const fn permits(self, action: ApprovalAction) -> bool {
        let caps = self.capabilities();
        if action.is_review() {
            caps.approves
        } else {
            caps.enters_targets
        }
    }

    /// Whether `self` is the role that reviews lines owned by `owner`.
    #[must_use]
    pub fn reviews(self, owner: Self) -> bool {
        owner.approver() == Some(self)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = crate::errors::Error;

    fn from_str(s: &str) -> crate::errors::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sales_rep" | "rep" => Ok(Self::SalesRep),
            "tbm" => Ok(Self::Tbm),
            "abm" => Ok(Self::Abm),
            "zbm" => Ok(Self::Zbm),
            "sales_head" | "head" => Ok(Self::SalesHead),
            "admin" => Ok(Self::Admin),
            other => Err(crate::errors::Error::Config {
                message: format!("Unknown role: {other}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_approval_chain() {
        let mut chain = vec![Role::SalesRep];
        while let Some(next) = chain.last().and_then(|r| r.approver()) {
            chain.push(next);
        }
        assert_eq!(
            chain,
            vec![Role::SalesRep, Role::Tbm, Role::Abm, Role::Zbm, Role::SalesHead]
        );
        assert_eq!(Role::Admin.approver(), None);
    }

    #[test]
    fn test_reviews_only_direct_level() {
        assert!(Role::Tbm.reviews(Role::SalesRep));
        assert!(!Role::Abm.reviews(Role::SalesRep));
        assert!(!Role::SalesRep.reviews(Role::SalesRep));
        assert!(Role::SalesHead.reviews(Role::Zbm));
    }

    #[test]
    fn test_permits() {
        assert!(Role::SalesRep.permits(ApprovalAction::Submit));
        assert!(!Role::SalesRep.permits(ApprovalAction::Approve));
        assert!(Role::Tbm.permits(ApprovalAction::Approve));
        assert!(Role::Tbm.permits(ApprovalAction::Submit));
        assert!(!Role::SalesHead.permits(ApprovalAction::Submit));
        assert!(!Role::Admin.permits(ApprovalAction::Reject));
        assert!(Role::Admin.capabilities().sets_reference_figures);
    }

    #[test]
    fn test_parse_role() {
        assert_eq!("TBM".parse::<Role>().unwrap(), Role::Tbm);
        assert_eq!("sales_rep".parse::<Role>().unwrap(), Role::SalesRep);
        assert!("intern".parse::<Role>().is_err());
    }
}
