//! Inbound loan leads
//!
//! Leads are transient: the caller owns their persistence and hands the
//! engine an already-validated submission.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LeadEngineError, Result};

/// One assignment request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    /// Requested loan amount
    #[serde(default)]
    pub amount: Option<f64>,

    /// Loan purpose category (e.g. `personal`, `business`)
    #[serde(default)]
    pub purpose: Option<String>,

    #[serde(default)]
    pub region: Option<String>,

    #[serde(default)]
    pub language: Option<String>,

    #[serde(default = "chrono::Utc::now")]
    pub requested_at: DateTime<Utc>,
}

impl Lead {
    pub fn new() -> Self {
        Self {
            amount: None,
            purpose: None,
            region: None,
            language: None,
            requested_at: Utc::now(),
        }
    }

    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_purpose(mut self, purpose: impl Into<String>) -> Self {
        self.purpose = Some(purpose.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Reject malformed input; nothing is coerced
    pub fn validate(&self) -> Result<()> {
        if let Some(amount) = self.amount {
            if !amount.is_finite() {
                return Err(LeadEngineError::invalid_lead(format!(
                    "amount {} is not a finite number",
                    amount
                )));
            }
            if amount < 0.0 {
                return Err(LeadEngineError::invalid_lead(format!(
                    "amount {} is negative",
                    amount
                )));
            }
        }

        for (field, value) in [
            ("purpose", &self.purpose),
            ("region", &self.region),
            ("language", &self.language),
        ] {
            if matches!(value, Some(v) if v.trim().is_empty()) {
                return Err(LeadEngineError::invalid_lead(format!("{} is blank", field)));
            }
        }
        Ok(())
    }
}

impl Default for Lead {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_partial_leads() {
        assert!(Lead::new().validate().is_ok());
        assert!(Lead::new().with_amount(0.0).validate().is_ok());
        assert!(Lead::new()
            .with_amount(25_000.0)
            .with_purpose("business")
            .with_region("Selangor")
            .with_language("Malay")
            .validate()
            .is_ok());
    }

    #[test]
    fn test_validate_rejects_malformed_input() {
        for lead in [
            Lead::new().with_amount(-1.0),
            Lead::new().with_amount(f64::NAN),
            Lead::new().with_amount(f64::INFINITY),
            Lead::new().with_purpose("   "),
            Lead::new().with_region(""),
        ] {
            assert!(matches!(lead.validate(), Err(LeadEngineError::InvalidLead(_))));
        }
    }

    #[test]
    fn test_deserialize_with_missing_fields() {
        let lead: Lead = serde_json::from_str(r#"{"amount": 5000}"#).unwrap();
        assert_eq!(lead.amount, Some(5000.0));
        assert!(lead.purpose.is_none());
    }
}
