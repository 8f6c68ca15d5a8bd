use sea_orm::Value;

use super::{resolve_column_expression, search::sanitize_search_term};
use crate::{
    config::{DeclaredFilter, GridConfig},
    models::DrawRequest,
    plan::{LikeSide, QueryPlan},
};

/// A per-column filter declared on the grid, applied to every request.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnFilter {
    Equals(Value),
    /// Inclusive bounds; either side may be open.
    Range {
        min: Option<Value>,
        max: Option<Value>,
    },
    In(Vec<Value>),
    /// Condition text appended to the column, e.g. `IS NOT NULL`.
    Raw(String),
}

impl ColumnFilter {
    pub fn equals(value: impl Into<Value>) -> Self {
        Self::Equals(value.into())
    }

    pub fn between(min: impl Into<Value>, max: impl Into<Value>) -> Self {
        Self::Range {
            min: Some(min.into()),
            max: Some(max.into()),
        }
    }

    pub fn at_least(min: impl Into<Value>) -> Self {
        Self::Range {
            min: Some(min.into()),
            max: None,
        }
    }

    pub fn at_most(max: impl Into<Value>) -> Self {
        Self::Range {
            min: None,
            max: Some(max.into()),
        }
    }

    pub fn one_of<V, I>(values: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        Self::In(values.into_iter().map(Into::into).collect())
    }

    pub fn raw(condition: impl Into<String>) -> Self {
        Self::Raw(condition.into())
    }

    /// AND this filter on `column` into the plan.
    #[must_use]
    pub fn apply(&self, plan: QueryPlan, column: &str) -> QueryPlan {
        match self {
            Self::Equals(value) => plan.and_where(column, value.clone()),
            Self::Range { min, max } => {
                let plan = match min {
                    Some(min) => plan.and_where(format!("{column} >="), min.clone()),
                    None => plan,
                };
                match max {
                    Some(max) => plan.and_where(format!("{column} <="), max.clone()),
                    None => plan,
                }
            }
            Self::In(values) => plan.where_in(column, values.iter().cloned()),
            Self::Raw(condition) => plan.where_raw(format!("{column} {condition}")),
        }
    }
}

/// Apply every declared filter, regardless of which search mode ran.
#[must_use]
pub fn apply_declared_filters(plan: QueryPlan, filters: &[DeclaredFilter]) -> QueryPlan {
    filters
        .iter()
        .fold(plan, |plan, declared| declared.filter.apply(plan, &declared.column))
}

/// Numbers bind as numbers so range bounds compare numerically.
fn scalar_value(text: &str) -> Value {
    if let Ok(integer) = text.parse::<i64>() {
        return integer.into();
    }
    if let Ok(float) = text.parse::<f64>() {
        return float.into();
    }
    text.to_string().into()
}

/// Per-column search values sent by the client (`columns[i][search][value]`).
///
/// With a range separator configured, `"10~20"` becomes `>= 10 AND <= 20` and
/// either bound may be left empty. Other values match with LIKE.
#[must_use]
pub fn apply_column_search(plan: QueryPlan, config: &GridConfig, request: &DrawRequest) -> QueryPlan {
    let mut plan = plan;

    for (index, column) in request.columns.iter().enumerate() {
        let value = sanitize_search_term(&column.search.value);
        if !column.searchable || value.is_empty() {
            continue;
        }
        let Some(expression) = resolve_column_expression(&plan, config, index, column) else {
            continue;
        };

        let range = config
            .range_separator()
            .and_then(|separator| value.split_once(separator));

        plan = match range {
            Some((low, high)) => {
                let (low, high) = (low.trim(), high.trim());
                let plan = if low.is_empty() {
                    plan
                } else {
                    plan.and_where(format!("{expression} >="), scalar_value(low))
                };
                if high.is_empty() {
                    plan
                } else {
                    plan.and_where(format!("{expression} <="), scalar_value(high))
                }
            }
            None => plan.like(expression, value, LikeSide::Both),
        };
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::GridBuilder,
        models::{ColumnIdentifier, ColumnRequest, SearchRequest},
        plan::{Fragment, PredicateEntry},
    };

    fn fragments(plan: &QueryPlan) -> Vec<Fragment> {
        plan.predicates()
            .iter()
            .filter_map(|entry| match entry {
                PredicateEntry::Clause { fragment, .. } => Some(fragment.clone()),
                _ => None,
            })
            .collect()
    }

    fn searching(data: ColumnIdentifier, value: &str) -> ColumnRequest {
        ColumnRequest {
            data,
            search: SearchRequest {
                value: value.to_string(),
                regex: false,
            },
            ..ColumnRequest::default()
        }
    }

    #[test]
    fn test_range_filter() {
        let plan = ColumnFilter::between(10, 20).apply(QueryPlan::from_table("items"), "price");
        assert_eq!(
            fragments(&plan),
            vec![
                Fragment::Compare {
                    key: "price >=".to_string(),
                    value: 10.into()
                },
                Fragment::Compare {
                    key: "price <=".to_string(),
                    value: 20.into()
                },
            ]
        );

        let open = ColumnFilter::at_most(5).apply(QueryPlan::from_table("items"), "price");
        assert_eq!(fragments(&open).len(), 1);
    }

    #[test]
    fn test_equals_in_and_raw() {
        let plan = QueryPlan::from_table("users");
        let plan = ColumnFilter::equals("active").apply(plan, "status");
        let plan = ColumnFilter::one_of([1, 2]).apply(plan, "role_id");
        let plan = ColumnFilter::raw("IS NOT NULL").apply(plan, "email");
        let found = fragments(&plan);
        assert_eq!(found.len(), 3);
        assert!(matches!(&found[1], Fragment::In { values, .. } if values.len() == 2));
        assert_eq!(found[2], Fragment::Raw("email IS NOT NULL".to_string()));
    }

    #[test]
    fn test_declared_filters_apply_in_order() {
        let filters = vec![
            DeclaredFilter {
                column: "a".to_string(),
                filter: ColumnFilter::equals(1),
            },
            DeclaredFilter {
                column: "b".to_string(),
                filter: ColumnFilter::equals(2),
            },
        ];
        let plan = apply_declared_filters(QueryPlan::from_table("t"), &filters);
        let keys: Vec<String> = fragments(&plan)
            .into_iter()
            .filter_map(|fragment| match fragment {
                Fragment::Compare { key, .. } => Some(key),
                _ => None,
            })
            .collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_scalar_value() {
        assert_eq!(scalar_value("12"), Value::from(12i64));
        assert_eq!(scalar_value("1.5"), Value::from(1.5f64));
        assert_eq!(scalar_value("abc"), Value::from("abc".to_string()));
    }

    #[test]
    fn test_column_search_like_and_range() {
        let plan = QueryPlan::from_table("items").select("id, name, price");
        let config = GridBuilder::new(plan.clone())
            .range_separator("~")
            .build()
            .unwrap();
        let request = DrawRequest {
            columns: vec![
                searching(ColumnIdentifier::ByIndex(0), ""),
                searching(ColumnIdentifier::ByAlias("name".to_string()), "jo"),
                searching(ColumnIdentifier::ByIndex(2), "10~"),
            ],
            ..DrawRequest::default()
        };

        let found = fragments(&apply_column_search(plan, &config, &request));
        assert_eq!(
            found,
            vec![
                Fragment::Like {
                    key: "name".to_string(),
                    value: "jo".to_string(),
                    side: LikeSide::Both
                },
                Fragment::Compare {
                    key: "price >=".to_string(),
                    value: 10i64.into()
                },
            ]
        );
    }

    #[test]
    fn test_column_search_skips_unsearchable_and_unknown() {
        let plan = QueryPlan::from_table("items").select("id, name");
        let config = GridBuilder::new(plan.clone()).build().unwrap();
        let mut hidden = searching(ColumnIdentifier::ByIndex(1), "x");
        hidden.searchable = false;
        let request = DrawRequest {
            columns: vec![
                hidden,
                searching(ColumnIdentifier::ByAlias("nope".to_string()), "x"),
                searching(ColumnIdentifier::ByIndex(9), "x"),
            ],
            ..DrawRequest::default()
        };
        assert!(apply_column_search(plan, &config, &request).predicates().is_empty());
    }

    #[test]
    fn test_without_separator_ranges_are_like() {
        let plan = QueryPlan::from_table("items").select("price");
        let config = GridBuilder::new(plan.clone()).build().unwrap();
        let request = DrawRequest {
            columns: vec![searching(ColumnIdentifier::ByIndex(0), "10~20")],
            ..DrawRequest::default()
        };
        let found = fragments(&apply_column_search(plan, &config, &request));
        assert!(matches!(&found[0], Fragment::Like { value, .. } if value == "10~20"));
    }
}
