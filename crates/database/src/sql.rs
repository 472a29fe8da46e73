//! Compiles a `FetchRequest` into a parameterised SQLite `SELECT`.
//!
//! Native columns are checked against a whitelist before they are spliced
//! into the statement; everything user supplied, including custom-field JSON
//! paths, travels as a bound parameter.

use crate::error::DbError;
use core_types::{FieldSelection, FieldType, FilterOperator, FilterRule, Logic};
use query::{DateRange, FetchRequest, value};
use serde_json::Value;

/// The queryable columns of the `records` table with their display names and types.
pub const NATIVE_COLUMNS: &[(&str, &str, FieldType)] = &[
    ("id", "ID", FieldType::Number),
    ("name", "Name", FieldType::Text),
    ("company", "Company", FieldType::Text),
    ("email", "Email", FieldType::Text),
    ("status", "Status", FieldType::Dropdown),
    ("source", "Source", FieldType::Dropdown),
    ("revenue", "Revenue", FieldType::Number),
    ("deal_value", "Deal Value", FieldType::Number),
    ("created_at", "Created At", FieldType::Date),
];

pub(crate) const SELECT_RECORDS: &str = "SELECT id, name, company, email, status, source, revenue, deal_value, created_at, custom_fields FROM records";

const SQL_DATETIME: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq)]
pub enum SqlArg {
    Text(String),
    Real(f64),
    Int(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub args: Vec<SqlArg>,
}

/// Builds the statement for `request`. Arguments are pushed in the same
/// order their placeholders appear in the SQL text.
pub fn compile(request: &FetchRequest) -> Result<CompiledQuery, DbError> {
    let mut builder = Builder { args: Vec::new() };
    let mut sql = SELECT_RECORDS.to_string();

    let mut conjuncts = Vec::new();
    if let Some(chain) = builder.rule_chain(&request.predicate.rules)? {
        conjuncts.push(chain);
    }
    if let Some(range) = &request.predicate.date_range {
        conjuncts.extend(builder.date_range(range)?);
    }
    if !conjuncts.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conjuncts.join(" AND "));
    }

    if let Some(field) = &request.order_by {
        let expr = builder.field(field)?;
        let direction = if request.descending { "DESC" } else { "ASC" };
        // Text sorts case-insensitively; numbers are unaffected by the collation.
        sql.push_str(&format!(" ORDER BY {} COLLATE NOCASE {}, id ASC", expr, direction));
    } else {
        sql.push_str(" ORDER BY id ASC");
    }

    if let Some(limit) = request.limit {
        sql.push_str(" LIMIT ?");
        builder.args.push(SqlArg::Int(i64::try_from(limit).unwrap_or(i64::MAX)));
    }

    Ok(CompiledQuery { sql, args: builder.args })
}

pub fn native_column(name: &str) -> Option<&'static str> {
    NATIVE_COLUMNS
        .iter()
        .find(|(column, _, _)| *column == name)
        .map(|(column, _, _)| *column)
}

struct Builder {
    args: Vec<SqlArg>,
}

enum Comparison {
    Numeric(f64),
    Temporal(String),
    Textual(String),
}

impl Builder {
    /// SQL expression reading `field`; custom fields bind their JSON path.
    fn field(&mut self, field: &FieldSelection) -> Result<String, DbError> {
        match field.json_path() {
            None => native_column(&field.name)
                .map(str::to_string)
                .ok_or_else(|| DbError::UnknownColumn(field.name.clone())),
            Some(path) => {
                self.args.push(SqlArg::Text(path));
                Ok("json_extract(custom_fields, ?)".to_string())
            }
        }
    }

    /// Folds the rules left to right, parenthesising at every step.
    fn rule_chain(&mut self, rules: &[FilterRule]) -> Result<Option<String>, DbError> {
        let mut accumulated: Option<String> = None;
        for rule in rules {
            let prev = accumulated.take();
            let clause = self.rule(rule)?;
            accumulated = Some(match prev {
                None => clause,
                Some(prev) => {
                    let joiner = match rule.logic {
                        Logic::And => "AND",
                        Logic::Or => "OR",
                    };
                    format!("({} {} {})", prev, joiner, clause)
                }
            });
        }
        Ok(accumulated)
    }

    fn rule(&mut self, rule: &FilterRule) -> Result<String, DbError> {
        let op = match rule.operator {
            FilterOperator::IsEmpty => {
                let a = self.field(&rule.field)?;
                let b = self.field(&rule.field)?;
                return Ok(format!("({} IS NULL OR TRIM(CAST({} AS TEXT)) = '')", a, b));
            }
            FilterOperator::IsNotEmpty => {
                let a = self.field(&rule.field)?;
                let b = self.field(&rule.field)?;
                return Ok(format!("({} IS NOT NULL AND TRIM(CAST({} AS TEXT)) <> '')", a, b));
            }
            FilterOperator::Contains | FilterOperator::StartsWith | FilterOperator::EndsWith => {
                let needle = escape_like(&value::as_text(&rule.value).unwrap_or_default().to_lowercase());
                let pattern = match rule.operator {
                    FilterOperator::Contains => format!("%{}%", needle),
                    FilterOperator::StartsWith => format!("{}%", needle),
                    _ => format!("%{}", needle),
                };
                let expr = self.field(&rule.field)?;
                self.args.push(SqlArg::Text(pattern));
                return Ok(format!("LOWER(CAST({} AS TEXT)) LIKE ? ESCAPE '\\'", expr));
            }
            FilterOperator::Equals => "=",
            FilterOperator::NotEquals => "<>",
            FilterOperator::GreaterThan => ">",
            FilterOperator::GreaterThanOrEqual => ">=",
            FilterOperator::LessThan => "<",
            FilterOperator::LessThanOrEqual => "<=",
        };

        let expr = self.field(&rule.field)?;
        Ok(match comparison(&rule.value) {
            Comparison::Numeric(n) => {
                self.args.push(SqlArg::Real(n));
                format!("{} {} ?", expr, op)
            }
            Comparison::Temporal(at) => {
                self.args.push(SqlArg::Text(at));
                format!("datetime({}) {} datetime(?)", expr, op)
            }
            Comparison::Textual(text) => {
                self.args.push(SqlArg::Text(text));
                format!("LOWER(CAST({} AS TEXT)) {} LOWER(?)", expr, op)
            }
        })
    }

    fn date_range(&mut self, range: &DateRange) -> Result<Vec<String>, DbError> {
        let mut out = Vec::new();
        if let Some(start) = range.start {
            let expr = self.field(&range.field)?;
            self.args.push(SqlArg::Text(start.format(SQL_DATETIME).to_string()));
            out.push(format!("datetime({}) >= datetime(?)", expr));
        }
        if let Some(end) = range.end {
            let expr = self.field(&range.field)?;
            self.args.push(SqlArg::Text(end.format(SQL_DATETIME).to_string()));
            out.push(format!("datetime({}) <= datetime(?)", expr));
        }
        Ok(out)
    }
}

fn comparison(target: &Value) -> Comparison {
    if let Some(n) = value::as_number(target) {
        return Comparison::Numeric(n);
    }
    if let Some(at) = value::as_datetime(target) {
        return Comparison::Temporal(at.format(SQL_DATETIME).to_string());
    }
    Comparison::Textual(value::as_text(target).unwrap_or_default())
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
