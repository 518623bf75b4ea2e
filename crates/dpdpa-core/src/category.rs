//! Semantic categories shared by regulation requirements and policy clauses.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A semantic category of data-protection obligation.
///
/// Requirements carry exactly one category; clauses may be tagged with one
/// inferred category. Declaration order is the tie-break order used by the
/// classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Notice,
    Consent,
    ConsentWithdrawal,
    ConsentManager,
    LegitimateUse,
    PurposeLimitation,
    DataAccuracy,
    SecuritySafeguards,
    BreachNotification,
    DataRetention,
    DataPrincipalRights,
    GrievanceRedressal,
    ChildrensData,
    CrossBorderTransfer,
    SignificantDataFiduciary,
}

impl Category {
    pub const ALL: [Category; 15] = [
        Self::Notice,
        Self::Consent,
        Self::ConsentWithdrawal,
        Self::ConsentManager,
        Self::LegitimateUse,
        Self::PurposeLimitation,
        Self::DataAccuracy,
        Self::SecuritySafeguards,
        Self::BreachNotification,
        Self::DataRetention,
        Self::DataPrincipalRights,
        Self::GrievanceRedressal,
        Self::ChildrensData,
        Self::CrossBorderTransfer,
        Self::SignificantDataFiduciary,
    ];

    /// Stable machine identifier (matches the serde representation).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Notice => "notice",
            Self::Consent => "consent",
            Self::ConsentWithdrawal => "consent_withdrawal",
            Self::ConsentManager => "consent_manager",
            Self::LegitimateUse => "legitimate_use",
            Self::PurposeLimitation => "purpose_limitation",
            Self::DataAccuracy => "data_accuracy",
            Self::SecuritySafeguards => "security_safeguards",
            Self::BreachNotification => "breach_notification",
            Self::DataRetention => "data_retention",
            Self::DataPrincipalRights => "data_principal_rights",
            Self::GrievanceRedressal => "grievance_redressal",
            Self::ChildrensData => "childrens_data",
            Self::CrossBorderTransfer => "cross_border_transfer",
            Self::SignificantDataFiduciary => "significant_data_fiduciary",
        }
    }

    /// Human-readable label for reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Notice => "Notice",
            Self::Consent => "Consent",
            Self::ConsentWithdrawal => "Withdrawal of Consent",
            Self::ConsentManager => "Consent Manager",
            Self::LegitimateUse => "Legitimate Uses",
            Self::PurposeLimitation => "Purpose Limitation",
            Self::DataAccuracy => "Accuracy & Completeness",
            Self::SecuritySafeguards => "Security Safeguards",
            Self::BreachNotification => "Breach Notification",
            Self::DataRetention => "Retention & Erasure",
            Self::DataPrincipalRights => "Data Principal Rights",
            Self::GrievanceRedressal => "Grievance Redressal",
            Self::ChildrensData => "Children's Data",
            Self::CrossBorderTransfer => "Cross-Border Transfer",
            Self::SignificantDataFiduciary => "Significant Data Fiduciary",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == key)
            .ok_or_else(|| format!("unknown category '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_machine_and_spaced_names() {
        assert_eq!("childrens_data".parse::<Category>(), Ok(Category::ChildrensData));
        assert_eq!("Breach Notification".parse::<Category>(), Ok(Category::BreachNotification));
        assert_eq!("consent-manager".parse::<Category>(), Ok(Category::ConsentManager));
        assert!("marketing".parse::<Category>().is_err());
    }

    #[test]
    fn serde_matches_as_str() {
        for c in Category::ALL {
            let json = serde_json::to_string(&c).unwrap();
            assert_eq!(json, format!("\"{}\"", c.as_str()));
        }
    }
}
