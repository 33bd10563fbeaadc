//! Sparse optional-filter composition.
//!
//! Search endpoints accept any subset of a record's fields. Instead of one
//! query per field combination, each optional constraint is offered to a
//! [`SparseFilter`]; absent values are dropped and the rest are folded into a
//! single `WHERE` clause with bound parameters.

use sqlx::{QueryBuilder, Sqlite};

/// A bindable column value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue {
    Int(i64),
    Bool(bool),
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl FieldValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(v) => Some(*v),
            FieldValue::Bool(_) => None,
        }
    }

    /// Bind this value as the next parameter of `qb`.
    pub fn push_bind(self, qb: &mut QueryBuilder<'_, Sqlite>) {
        match self {
            FieldValue::Int(v) => {
                qb.push_bind(v);
            }
            FieldValue::Bool(v) => {
                qb.push_bind(v);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterOp {
    Eq,
    Gte,
}

impl FilterOp {
    fn as_sql(&self) -> &'static str {
        match self {
            FilterOp::Eq => " = ",
            FilterOp::Gte => " >= ",
        }
    }
}

#[derive(Debug, Clone)]
struct Predicate {
    column: &'static str,
    op: FilterOp,
    value: FieldValue,
}

/// Builder folding optional column predicates into one conjunction.
///
/// Column names are compile-time identifiers supplied by the caller; values
/// are always bound, never interpolated.
#[derive(Debug, Clone, Default)]
pub struct SparseFilter {
    predicates: Vec<Predicate>,
}

impl SparseFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `column = value` when a value is present.
    pub fn eq<V: Into<FieldValue>>(self, column: &'static str, value: Option<V>) -> Self {
        self.with(column, FilterOp::Eq, value)
    }

    /// Require `column >= value` when a value is present.
    pub fn gte<V: Into<FieldValue>>(self, column: &'static str, value: Option<V>) -> Self {
        self.with(column, FilterOp::Gte, value)
    }

    fn with<V: Into<FieldValue>>(
        mut self,
        column: &'static str,
        op: FilterOp,
        value: Option<V>,
    ) -> Self {
        if let Some(value) = value {
            self.predicates.push(Predicate {
                column,
                op,
                value: value.into(),
            });
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    /// Append the predicates to `qb`, each prefixed by `qualifier.` when given.
    ///
    /// `has_where` tells whether the statement already carries a `WHERE`
    /// clause, in which case the predicates are chained with `AND`.
    pub fn push_conditions(
        &self,
        qb: &mut QueryBuilder<'_, Sqlite>,
        qualifier: Option<&str>,
        has_where: bool,
    ) {
        for (i, predicate) in self.predicates.iter().enumerate() {
            if i == 0 && !has_where {
                qb.push(" WHERE ");
            } else {
                qb.push(" AND ");
            }
            if let Some(q) = qualifier {
                qb.push(q);
                qb.push(".");
            }
            qb.push(predicate.column);
            qb.push(predicate.op.as_sql());
            predicate.value.push_bind(qb);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_values_are_skipped() {
        let filter = SparseFilter::new()
            .eq("gender", None::<i64>)
            .eq("canada_born", Some(true))
            .gte("age", None::<i64>);
        assert_eq!(filter.len(), 1);
    }

    #[test]
    fn test_empty_filter_adds_nothing() {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM clients");
        SparseFilter::new().push_conditions(&mut qb, None, false);
        assert_eq!(qb.sql(), "SELECT * FROM clients");
    }

    #[test]
    fn test_conditions_are_conjoined_and_bound() {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM clients");
        SparseFilter::new()
            .eq("gender", Some(2_i64))
            .gte("age", Some(30_i64))
            .eq("felony_bool", Some(false))
            .push_conditions(&mut qb, Some("c"), false);

        assert_eq!(
            qb.sql(),
            "SELECT * FROM clients WHERE c.gender = ? AND c.age >= ? AND c.felony_bool = ?"
        );
    }

    #[test]
    fn test_existing_where_is_extended() {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM client_cases WHERE client_id = 1");
        SparseFilter::new()
            .eq("life_stabilization", Some(true))
            .push_conditions(&mut qb, None, true);
        assert_eq!(
            qb.sql(),
            "SELECT * FROM client_cases WHERE client_id = 1 AND life_stabilization = ?"
        );
    }
}
