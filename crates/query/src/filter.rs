use crate::value;
use chrono::{DateTime, Utc};
use core_types::{FieldSelection, FilterOperator, FilterRule, Logic, QueryConfiguration};
use serde_json::Value;
use std::cmp::Ordering;

/// Inclusive bounds on a date-valued field.
#[derive(Debug, Clone, PartialEq)]
pub struct DateRange {
    pub field: FieldSelection,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    /// A value that is missing or not a date falls outside every range.
    pub fn contains(&self, value: &Value) -> bool {
        let Some(at) = value::as_datetime(value) else {
            return false;
        };
        self.start.is_none_or(|start| at >= start) && self.end.is_none_or(|end| at <= end)
    }
}

/// The row filter of a query.
///
/// Rules are folded left to right: the first rule seeds the result and every
/// later rule joins the accumulated result with its own `logic`, so
/// `[a, Or b, And c]` means `(a OR b) AND c`. An empty chain matches every
/// record. The date range, when present, is ANDed onto the whole chain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterPredicate {
    pub rules: Vec<FilterRule>,
    pub date_range: Option<DateRange>,
}

impl FilterPredicate {
    pub fn from_query(query: &QueryConfiguration) -> Self {
        let date_range = match (&query.date_range_field, query.start_date, query.end_date) {
            (Some(field), start, end) if start.is_some() || end.is_some() => Some(DateRange {
                field: field.clone(),
                start,
                end,
            }),
            _ => None,
        };
        Self {
            rules: query.filters.clone(),
            date_range,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.date_range.is_none()
    }

    /// Evaluates the predicate, reading field values through `resolve`.
    pub fn matches<F>(&self, resolve: F) -> bool
    where
        F: Fn(&FieldSelection) -> Value,
    {
        let mut accumulated: Option<bool> = None;
        for rule in &self.rules {
            let hit = rule_matches(rule, &resolve(&rule.field));
            accumulated = Some(match (accumulated, rule.logic) {
                (None, _) => hit,
                (Some(prev), Logic::And) => prev && hit,
                (Some(prev), Logic::Or) => prev || hit,
            });
        }

        accumulated.unwrap_or(true)
            && self
                .date_range
                .as_ref()
                .is_none_or(|range| range.contains(&resolve(&range.field)))
    }
}

/// Whether a single record value satisfies one rule.
pub fn rule_matches(rule: &FilterRule, actual: &Value) -> bool {
    let text = || value::as_text(actual).unwrap_or_default().to_lowercase();
    let needle = || value::as_text(&rule.value).unwrap_or_default().to_lowercase();

    match rule.operator {
        FilterOperator::IsEmpty => value::is_empty(actual),
        FilterOperator::IsNotEmpty => !value::is_empty(actual),
        _ if actual.is_null() => false,
        FilterOperator::Equals => value::compare(actual, &rule.value) == Ordering::Equal,
        FilterOperator::NotEquals => value::compare(actual, &rule.value) != Ordering::Equal,
        FilterOperator::GreaterThan => value::compare(actual, &rule.value) == Ordering::Greater,
        FilterOperator::GreaterThanOrEqual => value::compare(actual, &rule.value) != Ordering::Less,
        FilterOperator::LessThan => value::compare(actual, &rule.value) == Ordering::Less,
        FilterOperator::LessThanOrEqual => value::compare(actual, &rule.value) != Ordering::Greater,
        FilterOperator::Contains => text().contains(&needle()),
        FilterOperator::StartsWith => text().starts_with(&needle()),
        FilterOperator::EndsWith => text().ends_with(&needle()),
    }
}
