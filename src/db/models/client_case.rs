//! Case assignment models linking clients to case workers.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::db::{FieldValue, SparseFilter};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ClientCase {
    pub client_id: i64,
    pub user_id: i64,
    pub employment_assistance: Option<bool>,
    pub life_stabilization: Option<bool>,
    pub retention_services: Option<bool>,
    pub specialized_services: Option<bool>,
    pub employment_related_financial_supports: Option<bool>,
    pub employer_financial_supports: Option<bool>,
    pub enhanced_referrals: Option<bool>,
    /// 0-100
    pub success_rate: Option<i64>,
}

/// Case row joined with the assigned worker's identifying info
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClientCaseWithWorker {
    pub client_id: i64,
    pub user_id: i64,
    pub employment_assistance: Option<bool>,
    pub life_stabilization: Option<bool>,
    pub retention_services: Option<bool>,
    pub specialized_services: Option<bool>,
    pub employment_related_financial_supports: Option<bool>,
    pub employer_financial_supports: Option<bool>,
    pub enhanced_referrals: Option<bool>,
    pub success_rate: Option<i64>,
    pub case_worker_username: String,
    pub case_worker_email: String,
}

/// The seven service flags, each optional.
///
/// Used both as a sparse search filter and as the flag part of a case update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceFlags {
    pub employment_assistance: Option<bool>,
    pub life_stabilization: Option<bool>,
    pub retention_services: Option<bool>,
    pub specialized_services: Option<bool>,
    pub employment_related_financial_supports: Option<bool>,
    pub employer_financial_supports: Option<bool>,
    pub enhanced_referrals: Option<bool>,
}

impl ServiceFlags {
    fn pairs(&self) -> [(&'static str, Option<bool>); 7] {
        [
            ("employment_assistance", self.employment_assistance),
            ("life_stabilization", self.life_stabilization),
            ("retention_services", self.retention_services),
            ("specialized_services", self.specialized_services),
            (
                "employment_related_financial_supports",
                self.employment_related_financial_supports,
            ),
            ("employer_financial_supports", self.employer_financial_supports),
            ("enhanced_referrals", self.enhanced_referrals),
        ]
    }

    pub fn to_filter(&self) -> SparseFilter {
        self.pairs()
            .into_iter()
            .fold(SparseFilter::new(), |filter, (col, v)| filter.eq(col, v))
    }
}

/// Partial update of a case row
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaseUpdate {
    pub employment_assistance: Option<bool>,
    pub life_stabilization: Option<bool>,
    pub retention_services: Option<bool>,
    pub specialized_services: Option<bool>,
    pub employment_related_financial_supports: Option<bool>,
    pub employer_financial_supports: Option<bool>,
    pub enhanced_referrals: Option<bool>,
    pub success_rate: Option<i64>,
}

impl CaseUpdate {
    fn flags(&self) -> ServiceFlags {
        ServiceFlags {
            employment_assistance: self.employment_assistance,
            life_stabilization: self.life_stabilization,
            retention_services: self.retention_services,
            specialized_services: self.specialized_services,
            employment_related_financial_supports: self.employment_related_financial_supports,
            employer_financial_supports: self.employer_financial_supports,
            enhanced_referrals: self.enhanced_referrals,
        }
    }

    /// The supplied fields as `(column, value)` pairs.
    pub fn assignments(&self) -> Vec<(&'static str, FieldValue)> {
        let mut out: Vec<_> = self
            .flags()
            .pairs()
            .into_iter()
            .filter_map(|(col, v)| v.map(|v| (col, FieldValue::Bool(v))))
            .collect();
        if let Some(rate) = self.success_rate {
            out.push(("success_rate", FieldValue::Int(rate)));
        }
        out
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuccessRateQuery {
    #[serde(default = "default_min_rate")]
    pub min_rate: i64,
}

fn default_min_rate() -> i64 {
    70
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaseAssignmentQuery {
    pub case_worker_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_flags_filter_skips_unset_flags() {
        let flags = ServiceFlags {
            life_stabilization: Some(true),
            enhanced_referrals: Some(false),
            ..Default::default()
        };
        assert_eq!(flags.to_filter().len(), 2);
        assert!(ServiceFlags::default().to_filter().is_empty());
    }

    #[test]
    fn test_case_update_assignments() {
        let update = CaseUpdate {
            retention_services: Some(true),
            success_rate: Some(85),
            ..Default::default()
        };
        assert_eq!(
            update.assignments(),
            vec![
                ("retention_services", FieldValue::Bool(true)),
                ("success_rate", FieldValue::Int(85)),
            ]
        );
    }
}
