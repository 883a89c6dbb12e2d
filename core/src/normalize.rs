//! Response Normalizer
//!
//! Reconciles every observed backend payload shape into one canonical
//! [`Message`]. The backend has been seen to answer with at least four
//! dialects for the same semantic content:
//!
//! ```text
//! { "status": "error", "message": "..." }                          // A
//! { "status": "error", "error": "..." }                            // B
//! { "llm_response" | "response": "...",
//!   "sql_query": "...", "query_result": [ {col: value}, ... ] }    // C (flat)
//! { "data": { "llm_response": "...", ... }, "status": "..." }      // D (nested)
//! ```
//!
//! Callers never branch on the shape; this module is the single place in
//! the crate that knows more than one dialect exists.
//!
//! Normalization is total over parsed JSON: every well-formed frame yields
//! exactly one message. Frames that fail to parse are the caller's problem
//! (see [`parse_frame`]); they are reported once and never replayed.

use serde_json::Value;

use crate::messages::{Message, TableRow};

/// Substitute text for a bot reply that carried no answer field
pub const NO_RESPONSE: &str = "No response.";

/// Substitute reason for an error frame without a reason field
pub const UNKNOWN_ERROR: &str = "Unknown error occurred";

/// Parse one raw inbound text frame and normalize it.
///
/// # Errors
///
/// Returns the JSON error when the frame is not well-formed JSON. The
/// frame is not persisted or retried; the engine surfaces one local error
/// entry and moves on.
pub fn parse_frame(raw: &str) -> Result<Message, serde_json::Error> {
    let value: Value = serde_json::from_str(raw)?;
    Ok(normalize(&value))
}

/// Normalize one parsed inbound frame into a canonical bot message.
///
/// Field resolution priority:
/// 1. a top-level error marker wins and suppresses any answer/SQL/rows,
/// 2. otherwise the answer text is located flat or under `data`,
/// 3. SQL and result rows are located independently; either may be absent.
#[must_use]
pub fn normalize(frame: &Value) -> Message {
    if is_error_frame(frame) {
        let reason = error_reason(frame).unwrap_or(UNKNOWN_ERROR);
        return Message::error(format!("Error: {reason}"));
    }

    let text = answer_text(frame).unwrap_or(NO_RESPONSE).to_string();
    let sql = sql_query(frame).map(str::to_string);
    let table = query_result(frame);

    Message::bot(text, sql, table)
}

/// Whether the frame carries a top-level error marker
fn is_error_frame(frame: &Value) -> bool {
    frame.get("status").and_then(Value::as_str) == Some("error")
}

/// Error reason, accepting both observed field names (variants A and B)
fn error_reason(frame: &Value) -> Option<&str> {
    frame
        .get("message")
        .or_else(|| frame.get("error"))
        .and_then(Value::as_str)
}

/// Look a field up flat, then under the `data` container
fn field<'a>(frame: &'a Value, name: &str) -> Option<&'a Value> {
    frame
        .get(name)
        .or_else(|| frame.get("data").and_then(|data| data.get(name)))
}

/// Natural-language answer text, flat or nested
fn answer_text(frame: &Value) -> Option<&str> {
    field(frame, "llm_response")
        .or_else(|| field(frame, "response"))
        .and_then(Value::as_str)
}

/// Generated SQL text, flat or nested
fn sql_query(frame: &Value) -> Option<&str> {
    field(frame, "sql_query").and_then(Value::as_str)
}

/// Result rows, flat or nested.
///
/// Non-object elements inside the array are skipped; object rows keep
/// their arrival order and key order.
fn query_result(frame: &Value) -> Option<Vec<TableRow>> {
    let rows = field(frame, "query_result")?.as_array()?;
    Some(
        rows.iter()
            .filter_map(|row| row.as_object().cloned())
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::Origin;
    use pretty_assertions::assert_eq;

    fn parse(raw: &str) -> Message {
        parse_frame(raw).expect("well-formed frame")
    }

    #[test]
    fn test_variant_a_error_with_message() {
        let msg = parse(r#"{"status":"error","message":"Query failed"}"#);
        assert_eq!(msg.origin, Origin::Bot);
        assert!(msg.is_error);
        assert_eq!(msg.text, "Error: Query failed");
        assert!(msg.sql.is_none());
        assert!(msg.table.is_none());
    }

    #[test]
    fn test_variant_b_error_with_error_field() {
        let msg = parse(r#"{"status":"error","error":"Timeout talking to database"}"#);
        assert!(msg.is_error);
        assert_eq!(msg.text, "Error: Timeout talking to database");
    }

    #[test]
    fn test_error_without_reason_uses_fallback() {
        let msg = parse(r#"{"status":"error"}"#);
        assert!(msg.is_error);
        assert_eq!(msg.text, "Error: Unknown error occurred");
    }

    #[test]
    fn test_error_marker_suppresses_payload() {
        // An error frame never exposes SQL or rows even if present.
        let msg = parse(
            r#"{"status":"error","message":"bad","sql_query":"SELECT 1","query_result":[{"a":1}]}"#,
        );
        assert!(msg.is_error);
        assert!(msg.sql.is_none());
        assert!(msg.table.is_none());
    }

    #[test]
    fn test_variant_c_flat_full() {
        let msg = parse(
            r#"{"llm_response":"Total revenue is $500.","sql_query":"SELECT SUM(revenue) FROM sales;","query_result":[{"total":500}]}"#,
        );
        assert!(!msg.is_error);
        assert_eq!(msg.text, "Total revenue is $500.");
        assert_eq!(msg.sql.as_deref(), Some("SELECT SUM(revenue) FROM sales;"));
        let table = msg.table.unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table[0]["total"], serde_json::json!(500));
    }

    #[test]
    fn test_variant_c_response_field_alias() {
        let msg = parse(r#"{"response":"Hi there."}"#);
        assert_eq!(msg.text, "Hi there.");
        assert!(msg.sql.is_none());
        assert!(msg.table.is_none());
    }

    #[test]
    fn test_variant_d_nested_under_data() {
        let msg = parse(
            r#"{"status":"success","data":{"llm_response":"Two rows.","sql_query":"SELECT * FROM t;","query_result":[{"a":1},{"a":2}]}}"#,
        );
        assert!(!msg.is_error);
        assert_eq!(msg.text, "Two rows.");
        assert_eq!(msg.sql.as_deref(), Some("SELECT * FROM t;"));
        assert_eq!(msg.table.unwrap().len(), 2);
    }

    #[test]
    fn test_missing_answer_uses_fallback() {
        let msg = parse(r#"{"sql_query":"SELECT 1;"}"#);
        assert_eq!(msg.text, "No response.");
        assert_eq!(msg.sql.as_deref(), Some("SELECT 1;"));
    }

    #[test]
    fn test_sql_and_rows_independent() {
        // Rows without SQL.
        let msg = parse(r#"{"llm_response":"Here.","query_result":[{"n":1}]}"#);
        assert!(msg.sql.is_none());
        assert!(msg.table.is_some());

        // SQL without rows.
        let msg = parse(r#"{"llm_response":"Here.","sql_query":"SELECT 1;"}"#);
        assert!(msg.sql.is_some());
        assert!(msg.table.is_none());
    }

    #[test]
    fn test_rows_preserve_order_and_keys() {
        let raw = r#"{"llm_response":"x","query_result":[{"b":2,"a":1},{"b":4,"a":3}]}"#;
        let msg = parse(raw);
        let table = msg.table.unwrap();
        let keys: Vec<&String> = table[0].keys().collect();
        assert_eq!(keys, ["b", "a"]);
        assert_eq!(table[1]["a"], serde_json::json!(3));
    }

    #[test]
    fn test_non_object_rows_skipped() {
        let msg = parse(r#"{"llm_response":"x","query_result":[{"a":1},42,{"a":2}]}"#);
        let table = msg.table.unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table[0]["a"], serde_json::json!(1));
        assert_eq!(table[1]["a"], serde_json::json!(2));
    }

    #[test]
    fn test_nested_cell_values_survive() {
        let msg = parse(r#"{"llm_response":"x","query_result":[{"meta":{"k":"v"}}]}"#);
        let table = msg.table.unwrap();
        assert_eq!(table[0]["meta"], serde_json::json!({"k":"v"}));
    }

    #[test]
    fn test_malformed_frame_is_a_parse_error() {
        assert!(parse_frame("not json at all").is_err());
        assert!(parse_frame("{\"truncated\":").is_err());
    }

    #[test]
    fn test_totality_over_odd_but_valid_json() {
        // Any well-formed frame yields a message, even unhelpful ones.
        let msg = parse("{}");
        assert_eq!(msg.text, "No response.");
        let msg = parse("[1,2,3]");
        assert_eq!(msg.text, "No response.");
        let msg = parse("\"just a string\"");
        assert_eq!(msg.text, "No response.");
    }
}
