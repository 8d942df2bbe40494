//! The value carried by each delayed escalation message.
//!
//! Wire form is a flat JSON record, `{"orderId": 17, "delayIndex": 2}`. Decoding accepts
//! either field as a number or a numeric string, since producers are not consistent about
//! quoting ids.

use super::error::EscalationError;
use crate::model::OrderId;
use serde_json::{json, Map, Value};

/// `(order, stage)` pair. A new token is built for every escalation; tokens are never
/// modified in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EscalationToken {
    pub order_id: OrderId,
    pub stage: usize,
}

impl EscalationToken {
    pub fn first(order_id: OrderId) -> Self {
        Self { order_id, stage: 0 }
    }

    pub fn next(&self) -> Self {
        Self {
            order_id: self.order_id,
            stage: self.stage + 1,
        }
    }

    pub fn encode(&self) -> String {
        json!({ "orderId": self.order_id.0, "delayIndex": self.stage }).to_string()
    }

    pub fn decode(payload: &str) -> Result<Self, EscalationError> {
        let value: Value = serde_json::from_str(payload)
            .map_err(|e| EscalationError::MalformedMessage(format!("not JSON: {e}")))?;
        let Value::Object(record) = value else {
            return Err(EscalationError::MalformedMessage(
                "expected a JSON object".into(),
            ));
        };

        let order_id = integer_field(&record, "orderId")?;
        let stage = integer_field(&record, "delayIndex")?;
        let stage = usize::try_from(stage).map_err(|_| {
            EscalationError::MalformedMessage(format!("delayIndex {stage} out of range"))
        })?;

        Ok(Self {
            order_id: OrderId(order_id),
            stage,
        })
    }
}

fn integer_field(record: &Map<String, Value>, name: &str) -> Result<u64, EscalationError> {
    let parsed = match record.get(name) {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        Some(_) => None,
        None => {
            return Err(EscalationError::MalformedMessage(format!(
                "missing field {name}"
            )))
        }
    };
    parsed.ok_or_else(|| {
        EscalationError::MalformedMessage(format!("{name} is not a non-negative integer"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_wire_form() {
        let token = EscalationToken {
            order_id: OrderId(17),
            stage: 2,
        };
        let value: Value = serde_json::from_str(&token.encode()).unwrap();
        assert_eq!(value, json!({ "orderId": 17, "delayIndex": 2 }));
    }

    #[test]
    fn test_decode_accepts_numeric_strings() {
        let token = EscalationToken::decode(r#"{"orderId":"42","delayIndex":"3"}"#).unwrap();
        assert_eq!(token.order_id, OrderId(42));
        assert_eq!(token.stage, 3);
    }

    #[test]
    fn test_decode_ignores_extra_fields() {
        let token =
            EscalationToken::decode(r#"{"orderId":5,"delayIndex":0,"source":"checkout"}"#).unwrap();
        assert_eq!(token, EscalationToken::first(OrderId(5)));
    }

    #[test]
    fn test_decode_rejects_malformed_payloads() {
        for payload in [
            "",
            "not json",
            "[1, 2]",
            r#"{"orderId":5}"#,
            r#"{"delayIndex":1}"#,
            r#"{"orderId":-1,"delayIndex":0}"#,
            r#"{"orderId":1.5,"delayIndex":0}"#,
            r#"{"orderId":"abc","delayIndex":0}"#,
            r#"{"orderId":true,"delayIndex":0}"#,
        ] {
            let err = EscalationToken::decode(payload).unwrap_err();
            assert!(err.is_malformed(), "{payload:?} should be malformed, got {err}");
        }
    }

    #[test]
    fn test_next_builds_new_token() {
        let first = EscalationToken::first(OrderId(9));
        let second = first.next();
        assert_eq!(first.stage, 0);
        assert_eq!(second.stage, 1);
        assert_eq!(second.order_id, OrderId(9));
    }
}
