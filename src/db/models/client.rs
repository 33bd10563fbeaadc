//! Client records and their request shapes.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::db::{FieldValue, SparseFilter};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub id: i64,
    pub age: Option<i64>,
    /// 1 = male, 2 = female
    pub gender: Option<i64>,
    pub work_experience: Option<i64>,
    pub canada_workex: Option<i64>,
    pub dep_num: Option<i64>,
    pub canada_born: Option<bool>,
    pub citizen_status: Option<bool>,
    pub level_of_schooling: Option<i64>,
    pub fluent_english: Option<bool>,
    pub reading_english_scale: Option<i64>,
    pub speaking_english_scale: Option<i64>,
    pub writing_english_scale: Option<i64>,
    pub numeracy_scale: Option<i64>,
    pub computer_scale: Option<i64>,
    pub transportation_bool: Option<bool>,
    pub caregiver_bool: Option<bool>,
    pub housing: Option<i64>,
    pub income_source: Option<i64>,
    pub felony_bool: Option<bool>,
    pub attending_school: Option<bool>,
    pub currently_employed: Option<bool>,
    pub substance_use: Option<bool>,
    pub time_unemployed: Option<i64>,
    pub need_mental_health_support_bool: Option<bool>,
}

/// Client columns for create and partial update.
///
/// An absent field is left untouched on update and stored as NULL on create.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientFields {
    pub age: Option<i64>,
    pub gender: Option<i64>,
    pub work_experience: Option<i64>,
    pub canada_workex: Option<i64>,
    pub dep_num: Option<i64>,
    pub canada_born: Option<bool>,
    pub citizen_status: Option<bool>,
    pub level_of_schooling: Option<i64>,
    pub fluent_english: Option<bool>,
    pub reading_english_scale: Option<i64>,
    pub speaking_english_scale: Option<i64>,
    pub writing_english_scale: Option<i64>,
    pub numeracy_scale: Option<i64>,
    pub computer_scale: Option<i64>,
    pub transportation_bool: Option<bool>,
    pub caregiver_bool: Option<bool>,
    pub housing: Option<i64>,
    pub income_source: Option<i64>,
    pub felony_bool: Option<bool>,
    pub attending_school: Option<bool>,
    pub currently_employed: Option<bool>,
    pub substance_use: Option<bool>,
    pub time_unemployed: Option<i64>,
    pub need_mental_health_support_bool: Option<bool>,
}

impl ClientFields {
    /// The supplied fields as `(column, value)` pairs, in table order.
    pub fn assignments(&self) -> Vec<(&'static str, FieldValue)> {
        let ints = [
            ("age", self.age),
            ("gender", self.gender),
            ("work_experience", self.work_experience),
            ("canada_workex", self.canada_workex),
            ("dep_num", self.dep_num),
            ("level_of_schooling", self.level_of_schooling),
            ("reading_english_scale", self.reading_english_scale),
            ("speaking_english_scale", self.speaking_english_scale),
            ("writing_english_scale", self.writing_english_scale),
            ("numeracy_scale", self.numeracy_scale),
            ("computer_scale", self.computer_scale),
            ("housing", self.housing),
            ("income_source", self.income_source),
            ("time_unemployed", self.time_unemployed),
        ];
        let bools = [
            ("canada_born", self.canada_born),
            ("citizen_status", self.citizen_status),
            ("fluent_english", self.fluent_english),
            ("transportation_bool", self.transportation_bool),
            ("caregiver_bool", self.caregiver_bool),
            ("felony_bool", self.felony_bool),
            ("attending_school", self.attending_school),
            ("currently_employed", self.currently_employed),
            ("substance_use", self.substance_use),
            (
                "need_mental_health_support_bool",
                self.need_mental_health_support_bool,
            ),
        ];

        ints.into_iter()
            .filter_map(|(col, v)| v.map(|v| (col, FieldValue::Int(v))))
            .chain(
                bools
                    .into_iter()
                    .filter_map(|(col, v)| v.map(|v| (col, FieldValue::Bool(v)))),
            )
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments().is_empty()
    }
}

/// Sparse search criteria over client fields.
///
/// `age_min` and the skill scales are lower thresholds; every other field is
/// matched exactly.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientSearchCriteria {
    #[serde(alias = "employment_status")]
    pub currently_employed: Option<bool>,
    #[serde(alias = "education_level")]
    pub level_of_schooling: Option<i64>,
    pub age_min: Option<i64>,
    pub gender: Option<i64>,
    pub work_experience: Option<i64>,
    pub canada_workex: Option<i64>,
    pub dep_num: Option<i64>,
    pub canada_born: Option<bool>,
    pub citizen_status: Option<bool>,
    pub fluent_english: Option<bool>,
    pub reading_english_scale: Option<i64>,
    pub speaking_english_scale: Option<i64>,
    pub writing_english_scale: Option<i64>,
    pub numeracy_scale: Option<i64>,
    pub computer_scale: Option<i64>,
    pub transportation_bool: Option<bool>,
    pub caregiver_bool: Option<bool>,
    pub housing: Option<i64>,
    pub income_source: Option<i64>,
    pub felony_bool: Option<bool>,
    pub attending_school: Option<bool>,
    pub substance_use: Option<bool>,
    pub time_unemployed: Option<i64>,
    pub need_mental_health_support_bool: Option<bool>,
}

impl ClientSearchCriteria {
    /// Numeric criteria as `(column, value)` pairs for range checking.
    pub fn numeric_values(&self) -> Vec<(&'static str, i64)> {
        [
            ("age", self.age_min),
            ("gender", self.gender),
            ("work_experience", self.work_experience),
            ("canada_workex", self.canada_workex),
            ("dep_num", self.dep_num),
            ("level_of_schooling", self.level_of_schooling),
            ("reading_english_scale", self.reading_english_scale),
            ("speaking_english_scale", self.speaking_english_scale),
            ("writing_english_scale", self.writing_english_scale),
            ("numeracy_scale", self.numeracy_scale),
            ("computer_scale", self.computer_scale),
            ("housing", self.housing),
            ("income_source", self.income_source),
            ("time_unemployed", self.time_unemployed),
        ]
        .into_iter()
        .filter_map(|(col, v)| v.map(|v| (col, v)))
        .collect()
    }

    pub fn to_filter(&self) -> SparseFilter {
        SparseFilter::new()
            .eq("currently_employed", self.currently_employed)
            .eq("level_of_schooling", self.level_of_schooling)
            .gte("age", self.age_min)
            .eq("gender", self.gender)
            .eq("work_experience", self.work_experience)
            .eq("canada_workex", self.canada_workex)
            .eq("dep_num", self.dep_num)
            .eq("canada_born", self.canada_born)
            .eq("citizen_status", self.citizen_status)
            .eq("fluent_english", self.fluent_english)
            .gte("reading_english_scale", self.reading_english_scale)
            .gte("speaking_english_scale", self.speaking_english_scale)
            .gte("writing_english_scale", self.writing_english_scale)
            .gte("numeracy_scale", self.numeracy_scale)
            .gte("computer_scale", self.computer_scale)
            .eq("transportation_bool", self.transportation_bool)
            .eq("caregiver_bool", self.caregiver_bool)
            .eq("housing", self.housing)
            .eq("income_source", self.income_source)
            .eq("felony_bool", self.felony_bool)
            .eq("attending_school", self.attending_school)
            .eq("substance_use", self.substance_use)
            .eq("time_unemployed", self.time_unemployed)
            .eq(
                "need_mental_health_support_bool",
                self.need_mental_health_support_bool,
            )
    }
}

/// Pagination query for client listing
#[derive(Debug, Clone, Deserialize)]
pub struct ListClientsQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

impl Default for ListClientsQuery {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: default_limit(),
        }
    }
}

/// One page of clients with the total row count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientListResponse {
    pub clients: Vec<Client>,
    pub total: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assignments_include_only_supplied_fields() {
        let fields = ClientFields {
            age: Some(30),
            canada_born: Some(false),
            housing: Some(4),
            ..Default::default()
        };
        assert_eq!(
            fields.assignments(),
            vec![
                ("age", FieldValue::Int(30)),
                ("housing", FieldValue::Int(4)),
                ("canada_born", FieldValue::Bool(false)),
            ]
        );
        assert!(ClientFields::default().is_empty());
    }

    #[test]
    fn test_unknown_client_field_is_rejected() {
        let parsed: Result<ClientFields, _> = serde_json::from_str(r#"{"favourite_colour": 3}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_search_aliases() {
        let criteria: ClientSearchCriteria =
            serde_json::from_str(r#"{"employment_status": true, "education_level": 9}"#).unwrap();
        assert_eq!(criteria.currently_employed, Some(true));
        assert_eq!(criteria.level_of_schooling, Some(9));
        assert_eq!(criteria.to_filter().len(), 2);
    }

    #[test]
    fn test_age_min_is_checked_against_age_rule() {
        let criteria = ClientSearchCriteria {
            age_min: Some(40),
            ..Default::default()
        };
        assert_eq!(criteria.numeric_values(), vec![("age", 40)]);
    }
}
