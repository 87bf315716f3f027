//! Fiscal calendar - the April to March year used for every target.

use crate::errors::{Error, Result};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// One of the twelve fiscal months, in fiscal order (April first).
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(3))")]
#[serde(rename_all = "lowercase")]
pub enum FiscalMonth {
    /// April
    #[sea_orm(string_value = "apr")]
    Apr,
    /// May
    #[sea_orm(string_value = "may")]
    May,
    /// June
    #[sea_orm(string_value = "jun")]
    Jun,
    /// July
    #[sea_orm(string_value = "jul")]
    Jul,
    /// August
    #[sea_orm(string_value = "aug")]
    Aug,
    /// September
    #[sea_orm(string_value = "sep")]
    Sep,
    /// October
    #[sea_orm(string_value = "oct")]
    Oct,
    /// November
    #[sea_orm(string_value = "nov")]
    Nov,
    /// December
    #[sea_orm(string_value = "dec")]
    Dec,
    /// January
    #[sea_orm(string_value = "jan")]
    Jan,
    /// February
    #[sea_orm(string_value = "feb")]
    Feb,
    /// March
    #[sea_orm(string_value = "mar")]
    Mar,
}

impl FiscalMonth {
    /// All months in fiscal order.
    pub const ALL: [Self; 12] = [
        Self::Apr,
        Self::May,
        Self::Jun,
        Self::Jul,
        Self::Aug,
        Self::Sep,
        Self::Oct,
        Self::Nov,
        Self::Dec,
        Self::Jan,
        Self::Feb,
        Self::Mar,
    ];

    /// Lowercase three-letter key (`"apr"`, `"may"`, ...).
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Apr => "apr",
            Self::May => "may",
            Self::Jun => "jun",
            Self::Jul => "jul",
            Self::Aug => "aug",
            Self::Sep => "sep",
            Self::Oct => "oct",
            Self::Nov => "nov",
            Self::Dec => "dec",
            Self::Jan => "jan",
            Self::Feb => "feb",
            Self::Mar => "mar",
        }
    }

    /// Zero-based position within the fiscal year.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Fiscal quarter containing this month.
    #[must_use]
    pub const fn quarter(self) -> Quarter {
        match self {
            Self::Apr | Self::May | Self::Jun => Quarter::Q1,
            Self::Jul | Self::Aug | Self::Sep => Quarter::Q2,
            Self::Oct | Self::Nov | Self::Dec => Quarter::Q3,
            Self::Jan | Self::Feb | Self::Mar => Quarter::Q4,
        }
    }
}

impl fmt::Display for FiscalMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for FiscalMonth {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|m| m.key() == key)
            .ok_or(Error::InvalidMonth { key })
    }
}

/// Fiscal quarter. Q1 starts in April.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Quarter {
    /// April to June
    Q1,
    /// July to September
    Q2,
    /// October to December
    Q3,
    /// January to March
    Q4,
}

impl Quarter {
    /// All quarters in fiscal order.
    pub const ALL: [Self; 4] = [Self::Q1, Self::Q2, Self::Q3, Self::Q4];

    /// The three months making up this quarter.
    #[must_use]
    pub const fn months(self) -> [FiscalMonth; 3] {
        match self {
            Self::Q1 => [FiscalMonth::Apr, FiscalMonth::May, FiscalMonth::Jun],
            Self::Q2 => [FiscalMonth::Jul, FiscalMonth::Aug, FiscalMonth::Sep],
            Self::Q3 => [FiscalMonth::Oct, FiscalMonth::Nov, FiscalMonth::Dec],
            Self::Q4 => [FiscalMonth::Jan, FiscalMonth::Feb, FiscalMonth::Mar],
        }
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Q1 => "Q1",
            Self::Q2 => "Q2",
            Self::Q3 => "Q3",
            Self::Q4 => "Q4",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_fiscal_order_starts_in_april() {
        assert_eq!(FiscalMonth::ALL[0], FiscalMonth::Apr);
        assert_eq!(FiscalMonth::ALL[11], FiscalMonth::Mar);
        assert!(FiscalMonth::Dec < FiscalMonth::Jan);
        assert_eq!(FiscalMonth::Jan.index(), 9);
    }

    #[test]
    fn test_parse_month_key() {
        assert_eq!("apr".parse::<FiscalMonth>().unwrap(), FiscalMonth::Apr);
        assert_eq!(" MAR ".parse::<FiscalMonth>().unwrap(), FiscalMonth::Mar);

        let err = "april".parse::<FiscalMonth>().unwrap_err();
        assert!(matches!(err, Error::InvalidMonth { key } if key == "april"));
    }

    #[test]
    fn test_quarters_partition_the_year() {
        let mut seen: Vec<FiscalMonth> = Quarter::ALL.iter().flat_map(|q| q.months()).collect();
        seen.sort();
        assert_eq!(seen, FiscalMonth::ALL.to_vec());

        for month in FiscalMonth::ALL {
            assert!(month.quarter().months().contains(&month));
        }
    }
}
