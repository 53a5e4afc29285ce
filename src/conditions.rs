//! Sea-ORM conditions for bound filters.
//!
//! Plain columns compare through sea-query expressions. JSON key paths and
//! array membership need backend specific SQL; those are rendered as custom
//! expressions with bound parameters and identifiers quoted for the backend.

use sea_orm::sea_query::{Expr, Func, IntoColumnRef, LikeExpr, SimpleExpr};
use sea_orm::{ColumnTrait, Condition, DatabaseBackend, EntityName, Value};

use crate::fields::FieldTarget;
use crate::filter::{Filter, FilterKind, FilterValue};
use crate::lookups::Lookup;

/// Escape LIKE wildcards so user input only matches literally.
pub(crate) fn escape_like_wildcards(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Quote an identifier for inclusion in custom SQL.
pub(crate) fn quote_identifier(identifier: &str, backend: DatabaseBackend) -> String {
    match backend {
        DatabaseBackend::MySql => format!("`{}`", identifier.replace('`', "``")),
        DatabaseBackend::Postgres | DatabaseBackend::Sqlite => {
            format!("\"{}\"", identifier.replace('"', "\"\""))
        }
    }
}

fn qualified_column<C: ColumnTrait>(column: C, backend: DatabaseBackend) -> String {
    let table = C::EntityName::default();
    format!(
        "{}.{}",
        quote_identifier(table.table_name(), backend),
        quote_identifier(column.as_str(), backend)
    )
}

pub(crate) fn column_expr<C: ColumnTrait>(column: C) -> SimpleExpr {
    SimpleExpr::Column((C::EntityName::default(), column).into_column_ref())
}

/// `$."a"."b"` for SQLite and MySQL, `{a,b}` for Postgres.
fn json_path(path: &[String], backend: DatabaseBackend) -> String {
    match backend {
        DatabaseBackend::Postgres => format!("{{{}}}", path.join(",")),
        DatabaseBackend::Sqlite | DatabaseBackend::MySql => {
            let mut rendered = String::from("$");
            for key in path {
                rendered.push_str(&format!(".\"{key}\""));
            }
            rendered
        }
    }
}

const fn postgres_cast(kind: FilterKind) -> Option<&'static str> {
    match kind {
        FilterKind::Number
        | FilterKind::Decimal
        | FilterKind::ModelChoice
        | FilterKind::TreeNode
        | FilterKind::TagId => Some("numeric"),
        FilterKind::Date => Some("date"),
        FilterKind::DateTime => Some("timestamptz"),
        FilterKind::Time => Some("time"),
        FilterKind::Boolean => Some("boolean"),
        FilterKind::Uuid => Some("uuid"),
        _ => None,
    }
}

/// `json` columns have no containment or equality operators; compare as `jsonb`.
fn postgres_jsonb(column: &str) -> String {
    format!("CAST({column} AS jsonb)")
}

/// Scalar value at `path` inside a JSON column.
///
/// Postgres extracts text; with `kind` set the text is cast to the matching
/// SQL type so that comparisons are typed.
pub(crate) fn json_path_expr<C: ColumnTrait>(
    column: C,
    path: &[String],
    kind: Option<FilterKind>,
    backend: DatabaseBackend,
) -> SimpleExpr {
    let column = qualified_column(column, backend);
    let path_value = json_path(path, backend);
    match backend {
        DatabaseBackend::Sqlite => {
            Expr::cust_with_values(format!("json_extract({column}, ?)"), [path_value])
        }
        DatabaseBackend::MySql => Expr::cust_with_values(
            format!("JSON_UNQUOTE(JSON_EXTRACT({column}, ?))"),
            [path_value],
        ),
        DatabaseBackend::Postgres => {
            let extracted = format!("({column} #>> CAST(? AS text[]))");
            let sql = match kind.and_then(postgres_cast) {
                Some(sql_type) => format!("CAST({extracted} AS {sql_type})"),
                None => extracted,
            };
            Expr::cust_with_values(sql, [path_value])
        }
    }
}

/// JSON array at `path` (or the whole column) contains `value`.
pub(crate) fn json_contains_expr<C: ColumnTrait>(
    column: C,
    path: &[String],
    value: &serde_json::Value,
    backend: DatabaseBackend,
) -> SimpleExpr {
    let column = qualified_column(column, backend);
    match backend {
        DatabaseBackend::Sqlite => {
            let source = if path.is_empty() {
                format!("json_each({column})")
            } else {
                format!("json_each({column}, ?)")
            };
            let mut values: Vec<Value> = Vec::new();
            if !path.is_empty() {
                values.push(json_path(path, backend).into());
            }
            values.push(sqlite_json_scalar(value));
            Expr::cust_with_values(
                format!("EXISTS (SELECT 1 FROM {source} WHERE json_each.value = ?)"),
                values,
            )
        }
        DatabaseBackend::Postgres => {
            let candidate = serde_json::Value::Array(vec![value.clone()]).to_string();
            let document = postgres_jsonb(&column);
            if path.is_empty() {
                Expr::cust_with_values(format!("{document} @> CAST(? AS jsonb)"), [candidate])
            } else {
                Expr::cust_with_values(
                    format!("({document} #> CAST(? AS text[])) @> CAST(? AS jsonb)"),
                    [json_path(path, backend), candidate],
                )
            }
        }
        DatabaseBackend::MySql => {
            let path_value = if path.is_empty() {
                "$".to_string()
            } else {
                json_path(path, backend)
            };
            Expr::cust_with_values(
                format!("JSON_CONTAINS({column}, ?, ?)"),
                [value.to_string(), path_value],
            )
        }
    }
}

/// Value at `path` equals the JSON document `value`.
pub(crate) fn json_equals_expr<C: ColumnTrait>(
    column: C,
    path: &[String],
    value: &serde_json::Value,
    backend: DatabaseBackend,
) -> SimpleExpr {
    let path_value = json_path(path, backend);
    match backend {
        DatabaseBackend::Sqlite => {
            let extracted = json_path_expr(column, path, None, backend);
            match value {
                serde_json::Value::Null => Expr::expr(extracted).is_null(),
                serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                    let column = qualified_column(column, backend);
                    Expr::cust_with_values(
                        format!("json_extract({column}, ?) = json(?)"),
                        [path_value, value.to_string()],
                    )
                }
                scalar => Expr::expr(extracted).eq(sqlite_json_scalar(scalar)),
            }
        }
        DatabaseBackend::Postgres => {
            let document = postgres_jsonb(&qualified_column(column, backend));
            Expr::cust_with_values(
                format!("({document} #> CAST(? AS text[])) = CAST(? AS jsonb)"),
                [path_value, value.to_string()],
            )
        }
        DatabaseBackend::MySql => {
            let column = qualified_column(column, backend);
            Expr::cust_with_values(
                format!("JSON_EXTRACT({column}, ?) = CAST(? AS JSON)"),
                [path_value, value.to_string()],
            )
        }
    }
}

/// SQLite JSON functions return booleans as integers and strings unquoted.
fn sqlite_json_scalar(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Bool(flag) => i64::from(*flag).into(),
        serde_json::Value::Number(number) => number
            .as_i64()
            .map(Value::from)
            .or_else(|| number.as_f64().map(Value::from))
            .unwrap_or_else(|| number.to_string().into()),
        serde_json::Value::String(text) => text.clone().into(),
        other => other.to_string().into(),
    }
}

fn upper_like(expr: SimpleExpr, pattern: String) -> SimpleExpr {
    Expr::expr(Func::upper(expr)).like(LikeExpr::new(pattern).escape('\\'))
}

/// One lookup against one value.
fn compare(expr: &SimpleExpr, lookup: Lookup, value: &FilterValue) -> SimpleExpr {
    let target = || Expr::expr(expr.clone());

    if *value == FilterValue::Null && !lookup.is_presence_check() {
        return target().is_null();
    }

    let pattern = |prefix: &str, suffix: &str| {
        format!(
            "{prefix}{}{suffix}",
            escape_like_wildcards(&value.to_text().to_uppercase())
        )
    };

    match lookup {
        Lookup::Exact | Lookup::In | Lookup::Contains => target().eq(Value::from(value.clone())),
        Lookup::IExact => Expr::expr(Func::upper(expr.clone())).eq(value.to_text().to_uppercase()),
        Lookup::IContains => upper_like(expr.clone(), pattern("%", "%")),
        Lookup::IStartsWith => upper_like(expr.clone(), pattern("", "%")),
        Lookup::IEndsWith => upper_like(expr.clone(), pattern("%", "")),
        Lookup::Gt => target().gt(Value::from(value.clone())),
        Lookup::Gte => target().gte(Value::from(value.clone())),
        Lookup::Lt => target().lt(Value::from(value.clone())),
        Lookup::Lte => target().lte(Value::from(value.clone())),
        Lookup::IsNull => {
            if value.as_bool().unwrap_or(true) {
                target().is_null()
            } else {
                target().is_not_null()
            }
        }
        Lookup::Empty => {
            if value.as_bool().unwrap_or(true) {
                target().is_null().or(target().eq(""))
            } else {
                target().is_not_null().and(target().ne(""))
            }
        }
    }
}

/// Condition matching any of `values` through `lookup` against `expr`.
///
/// `exact` with several values and `in` render as `IN (...)`, plus
/// `IS NULL` when the null token was given.
pub(crate) fn values_condition(
    expr: &SimpleExpr,
    lookup: Lookup,
    values: &[FilterValue],
) -> Condition {
    if matches!(lookup, Lookup::Exact | Lookup::In) && (values.len() > 1 || lookup == Lookup::In) {
        let has_null = values.contains(&FilterValue::Null);
        let present: Vec<Value> = values
            .iter()
            .filter(|value| **value != FilterValue::Null)
            .cloned()
            .map(Value::from)
            .collect();

        let mut condition = Condition::any();
        if !present.is_empty() {
            condition = condition.add(Expr::expr(expr.clone()).is_in(present));
        }
        if has_null {
            condition = condition.add(Expr::expr(expr.clone()).is_null());
        }
        return condition;
    }

    values
        .iter()
        .fold(Condition::any(), |condition, value| {
            condition.add(compare(expr, lookup, value))
        })
}

/// Negate `condition`, keeping rows whose target is NULL.
///
/// Presence checks already decide on NULL themselves and are negated plainly.
pub(crate) fn exclude_condition(
    condition: Condition,
    target: &SimpleExpr,
    lookup: Lookup,
) -> Condition {
    if lookup.is_presence_check() {
        return condition.not();
    }
    Condition::any()
        .add(condition.not())
        .add(Expr::expr(target.clone()).is_null())
}

/// Condition for a plain or JSON path filter. Returns `None` without values or
/// for targets handled elsewhere (tags).
#[must_use]
pub fn lookup_condition<C: ColumnTrait>(
    target: &FieldTarget<C>,
    filter: &Filter,
    values: &[FilterValue],
    backend: DatabaseBackend,
) -> Option<Condition> {
    if values.is_empty() {
        return None;
    }
    let lookup = filter.lookup;

    let (condition, null_target) = match target {
        FieldTarget::Tags => return None,
        FieldTarget::Column(column) if lookup == Lookup::Contains => {
            let condition = values.iter().fold(Condition::any(), |condition, value| {
                condition.add(json_contains_expr(*column, &[], &value.to_json(), backend))
            });
            (condition, column_expr(*column))
        }
        FieldTarget::Column(column) => {
            let expr = column_expr(*column);
            (values_condition(&expr, lookup, values), expr)
        }
        FieldTarget::JsonPath { column, path } if lookup == Lookup::Contains => {
            let condition = values.iter().fold(Condition::any(), |condition, value| {
                condition.add(json_contains_expr(*column, path, &value.to_json(), backend))
            });
            (condition, json_path_expr(*column, path, None, backend))
        }
        FieldTarget::JsonPath { column, path } => {
            let typed = matches!(
                lookup,
                Lookup::Exact | Lookup::In | Lookup::Gt | Lookup::Gte | Lookup::Lt | Lookup::Lte
            );
            let kind = typed.then_some(filter.kind);
            let expr = json_path_expr(*column, path, kind, backend);
            (
                values_condition(&expr, lookup, values),
                json_path_expr(*column, path, None, backend),
            )
        }
    };

    Some(if filter.exclude {
        exclude_condition(condition, &null_target, lookup)
    } else {
        condition
    })
}
