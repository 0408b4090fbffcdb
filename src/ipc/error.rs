use serde_json::json;

use crate::db::DbError;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

/// Reply to a line that did not parse as a request. It has no id to echo.
pub fn bad_json(message: impl Into<String>) -> serde_json::Value {
    json!({
        "ok": false,
        "error": { "code": "bad_json", "message": message.into() },
    })
}

pub fn db_err(id: &str, e: &DbError) -> serde_json::Value {
    err(id, e.code(), e.to_string(), None)
}

/// Serializes an engine result into an `ok` reply. Engine shapes hold only
/// strings, numbers and decimals, so `serialize_failed` is not expected.
pub fn ok_serialized<T: serde::Serialize>(id: &str, value: &T) -> serde_json::Value {
    match serde_json::to_value(value) {
        Ok(v) => ok(id, v),
        Err(e) => err(id, "serialize_failed", e.to_string(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_json_reply_has_no_id() {
        let reply = bad_json("expected value");
        assert!(reply.get("id").is_none());
        assert_eq!(reply["ok"], json!(false));
        assert_eq!(reply["error"]["code"], "bad_json");
    }

    #[test]
    fn db_errors_keep_their_wire_codes() {
        let e = DbError::Delete(rusqlite::Error::InvalidQuery);
        assert_eq!(db_err("7", &e)["error"]["code"], "db_delete_failed");
        let reply = db_err("8", &DbError::NotFound("subject"));
        assert_eq!(reply["error"]["message"], "subject not found");
        assert_eq!(ok_serialized("9", &vec![1, 2])["result"], json!([1, 2]));
    }
}
