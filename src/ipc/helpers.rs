use rusqlite::{params_from_iter, types::Value as SqlValue, Connection};
use rust_decimal::Decimal;
use serde_json::{json, Map, Value};
use std::str::FromStr;

use crate::calc::{EducationLevel, MarkType, Term};
use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};

pub type Reply<T> = Result<T, Value>;

pub fn db_conn<'a>(state: &'a AppState, req: &Request) -> Reply<&'a Connection> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn required_str(req: &Request, key: &str) -> Reply<String> {
    let v = req
        .params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))?;
    if v.is_empty() {
        return Err(err(
            &req.id,
            "bad_params",
            format!("{} must not be empty", key),
            None,
        ));
    }
    Ok(v)
}

pub fn optional_str(req: &Request, key: &str) -> Option<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
}

pub fn optional_bool(req: &Request, key: &str) -> Reply<Option<bool>> {
    match req.params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(other) => Err(err(
            &req.id,
            "bad_params",
            format!("{} must be a boolean", key),
            Some(json!({ key: other })),
        )),
    }
}

pub fn optional_year(req: &Request, key: &str) -> Reply<Option<i64>> {
    match req.params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => match v.as_i64() {
            Some(y) if (1900..=9999).contains(&y) => Ok(Some(y)),
            _ => Err(err(
                &req.id,
                "bad_params",
                format!("{} must be a four-digit year", key),
                Some(json!({ key: v })),
            )),
        },
    }
}

pub fn required_year(req: &Request, key: &str) -> Reply<i64> {
    optional_year(req, key)?
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn optional_term(req: &Request) -> Reply<Option<Term>> {
    match req.params.get("term") {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_i64()
            .and_then(Term::from_number)
            .map(Some)
            .ok_or_else(|| {
                err(
                    &req.id,
                    "bad_params",
                    "term must be 1, 2 or 3",
                    Some(json!({ "term": v })),
                )
            }),
    }
}

pub fn required_term(req: &Request) -> Reply<Term> {
    optional_term(req)?.ok_or_else(|| err(&req.id, "bad_params", "missing term", None))
}

/// `academicYear` and `term`, both required.
pub fn required_period(req: &Request) -> Reply<(i64, Term)> {
    Ok((required_year(req, "academicYear")?, required_term(req)?))
}

pub fn optional_level(req: &Request) -> Reply<Option<EducationLevel>> {
    match req.params.get("level") {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_str()
            .and_then(EducationLevel::parse)
            .map(Some)
            .ok_or_else(|| {
                err(
                    &req.id,
                    "bad_params",
                    "level must be O-Level or A-Level",
                    Some(json!({ "level": v })),
                )
            }),
    }
}

pub fn required_level(req: &Request) -> Reply<EducationLevel> {
    optional_level(req)?.ok_or_else(|| err(&req.id, "bad_params", "missing level", None))
}

pub fn required_mark_type(req: &Request) -> Reply<MarkType> {
    let raw = required_str(req, "markType")?;
    MarkType::parse(&raw).ok_or_else(|| {
        err(
            &req.id,
            "bad_params",
            "markType must be one of: BOT, MOT, EOT",
            Some(json!({ "markType": raw })),
        )
    })
}

/// Decimal from a JSON number or numeric string. Numbers go through their
/// shortest textual form so no binary float survives into the value.
pub fn decimal_from_json(v: &Value) -> Option<Decimal> {
    let text = match v {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

#[derive(Debug, Clone, Copy)]
pub enum ScoreRange {
    Percent,
    Points,
}

impl ScoreRange {
    fn accepts(self, d: Decimal) -> bool {
        match self {
            ScoreRange::Percent => d >= Decimal::ZERO && d <= Decimal::ONE_HUNDRED,
            ScoreRange::Points => d >= Decimal::ZERO,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            ScoreRange::Percent => "a number between 0 and 100",
            ScoreRange::Points => "a non-negative number",
        }
    }
}

/// Absent or null means "not entered".
pub fn optional_score(
    req: &Request,
    obj: &Value,
    key: &str,
    range: ScoreRange,
) -> Reply<Option<Decimal>> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => match decimal_from_json(v) {
            Some(d) if range.accepts(d) => Ok(Some(d)),
            _ => Err(err(
                &req.id,
                "bad_params",
                format!("{} must be {}", key, range.describe()),
                Some(json!({ key: v })),
            )),
        },
    }
}

/// Partial update built from `params.patch`. Only keys present in the patch
/// are written.
pub struct Patch<'r> {
    req: &'r Request,
    fields: &'r Map<String, Value>,
    set_parts: Vec<String>,
    bind_values: Vec<SqlValue>,
}

impl<'r> Patch<'r> {
    pub fn from_request(req: &'r Request) -> Reply<Self> {
        let fields = req
            .params
            .get("patch")
            .and_then(|v| v.as_object())
            .ok_or_else(|| err(&req.id, "bad_params", "missing/invalid patch", None))?;
        Ok(Patch {
            req,
            fields,
            set_parts: Vec::new(),
            bind_values: Vec::new(),
        })
    }

    fn bad(&self, message: String) -> Value {
        err(&self.req.id, "bad_params", message, None)
    }

    fn push(&mut self, column: &str, value: SqlValue) {
        self.set_parts.push(format!("{} = ?", column));
        self.bind_values.push(value);
    }

    pub fn get(&self, key: &str) -> Option<&'r Value> {
        self.fields.get(key)
    }

    pub fn text(&mut self, key: &str, column: &str) -> Reply<()> {
        let Some(v) = self.get(key) else {
            return Ok(());
        };
        let Some(s) = v.as_str() else {
            return Err(self.bad(format!("patch.{} must be a string", key)));
        };
        let s = s.trim().to_string();
        if s.is_empty() {
            return Err(self.bad(format!("{} must not be empty", key)));
        }
        self.push(column, SqlValue::Text(s));
        Ok(())
    }

    /// Empty strings and null clear the column.
    pub fn nullable_text(&mut self, key: &str, column: &str) -> Reply<()> {
        let Some(v) = self.get(key) else {
            return Ok(());
        };
        if v.is_null() {
            self.push(column, SqlValue::Null);
        } else if let Some(s) = v.as_str() {
            let t = s.trim().to_string();
            if t.is_empty() {
                self.push(column, SqlValue::Null);
            } else {
                self.push(column, SqlValue::Text(t));
            }
        } else {
            return Err(self.bad(format!("patch.{} must be a string or null", key)));
        }
        Ok(())
    }

    pub fn level(&mut self, key: &str, column: &str) -> Reply<()> {
        let Some(v) = self.get(key) else {
            return Ok(());
        };
        let Some(level) = v.as_str().and_then(EducationLevel::parse) else {
            return Err(self.bad(format!("patch.{} must be O-Level or A-Level", key)));
        };
        self.push(column, SqlValue::Text(level.as_str().to_string()));
        Ok(())
    }

    pub fn year(&mut self, key: &str, column: &str) -> Reply<()> {
        let Some(v) = self.get(key) else {
            return Ok(());
        };
        match v.as_i64() {
            Some(y) if (1900..=9999).contains(&y) => {
                self.push(column, SqlValue::Integer(y));
                Ok(())
            }
            _ => Err(self.bad(format!("patch.{} must be a four-digit year", key))),
        }
    }

    pub fn flag(&mut self, key: &str, column: &str) -> Reply<()> {
        let Some(v) = self.get(key) else {
            return Ok(());
        };
        let Some(b) = v.as_bool() else {
            return Err(self.bad(format!("patch.{} must be a boolean", key)));
        };
        self.push(column, SqlValue::Integer(if b { 1 } else { 0 }));
        Ok(())
    }

    /// Runs the UPDATE. `not_found` when no row has the id.
    pub fn apply(mut self, conn: &Connection, table: &str, id: &str, entity: &str) -> Reply<()> {
        if self.set_parts.is_empty() {
            return Err(self.bad("patch must include at least one field".into()));
        }
        let sql = format!("UPDATE {} SET {} WHERE id = ?", table, self.set_parts.join(", "));
        self.bind_values.push(SqlValue::Text(id.to_string()));
        let changed = conn
            .execute(&sql, params_from_iter(self.bind_values.iter()))
            .map_err(|e| {
                err(
                    &self.req.id,
                    "db_update_failed",
                    e.to_string(),
                    Some(json!({ "table": table })),
                )
            })?;
        if changed == 0 {
            return Err(err(
                &self.req.id,
                "not_found",
                format!("{} not found", entity),
                None,
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn req(params: Value) -> Request {
        Request {
            id: "1".into(),
            method: "test".into(),
            params,
        }
    }

    #[test]
    fn decimals_accept_numbers_and_strings() {
        assert_eq!(decimal_from_json(&json!(79.99)), Some(dec!(79.99)));
        assert_eq!(decimal_from_json(&json!(80)), Some(dec!(80)));
        assert_eq!(decimal_from_json(&json!("0.085")), Some(dec!(0.085)));
        assert_eq!(decimal_from_json(&json!(true)), None);
        assert_eq!(decimal_from_json(&json!("abc")), None);
    }

    #[test]
    fn scores_outside_range_are_bad_params() {
        let r = req(json!({ "bot": 100.5, "mot": null, "eot": "100" }));
        let e = optional_score(&r, &r.params, "bot", ScoreRange::Percent).unwrap_err();
        assert_eq!(e["error"]["code"], "bad_params");
        assert_eq!(
            optional_score(&r, &r.params, "mot", ScoreRange::Percent).expect("null"),
            None
        );
        assert_eq!(
            optional_score(&r, &r.params, "eot", ScoreRange::Percent).expect("string"),
            Some(dec!(100))
        );
    }

    #[test]
    fn term_must_be_one_to_three() {
        assert_eq!(required_term(&req(json!({ "term": 2 }))).expect("term"), Term::Two);
        let e = required_term(&req(json!({ "term": 4 }))).unwrap_err();
        assert_eq!(e["error"]["code"], "bad_params");
        let e = required_term(&req(json!({}))).unwrap_err();
        assert_eq!(e["error"]["message"], "missing term");
    }
}
