//! Extraction of address submissions from inbound webhook payloads

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::models::{AddressInput, TypeformWebhook};
use crate::{HubMatchError, Result};

fn optional_string(object: &Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Read a flat `{address, email, name?, phone?, application_id?, metadata?}` payload
pub fn from_generic_payload(payload: &Value) -> Result<AddressInput> {
    let object = payload
        .as_object()
        .ok_or_else(|| HubMatchError::validation("Payload must be a JSON object"))?;

    let required = |key: &str| {
        object
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| HubMatchError::validation(format!("Missing required field: {key}")))
    };

    Ok(AddressInput {
        address: required("address")?,
        email: required("email")?,
        name: optional_string(object, "name"),
        phone: optional_string(object, "phone"),
        application_id: optional_string(object, "application_id"),
        metadata: object
            .get("metadata")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default(),
    })
}

/// Pull address and contact answers out of a Typeform form response.
///
/// Answers are recognized by their field id: an id containing `address`,
/// `email`, `name` or `phone` fills that part of the submission.
pub fn from_typeform(webhook: &TypeformWebhook) -> Result<AddressInput> {
    let response = &webhook.form_response;
    let answers = response
        .get("answers")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut address = None;
    let mut email = None;
    let mut name = None;
    let mut phone = None;

    for answer in answers {
        let Some(field) = answer.get("field") else {
            continue;
        };
        let field_id = field
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_lowercase();
        let field_type = field.get("type").and_then(Value::as_str).unwrap_or_default();
        let text = || answer.get("text").and_then(Value::as_str).map(str::to_string);

        if field_id.contains("address") && field_type == "text" {
            address = text();
        } else if field_id.contains("email") && field_type == "email" {
            email = answer
                .get("email")
                .and_then(Value::as_str)
                .map(str::to_string);
        } else if field_id.contains("name") && field_type == "text" {
            name = text();
        } else if field_id.contains("phone") && matches!(field_type, "text" | "phone_number") {
            phone = text().or_else(|| {
                answer
                    .get("phone_number")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            });
        }
    }

    let (Some(address), Some(email)) = (
        address.filter(|a| !a.trim().is_empty()),
        email.filter(|e| !e.trim().is_empty()),
    ) else {
        warn!(
            "Missing required fields in Typeform response {}",
            webhook.event_id
        );
        return Err(HubMatchError::validation(
            "Could not extract address from form response",
        ));
    };

    let token = optional_string(response, "token");
    let mut metadata = Map::new();
    metadata.insert("source".to_string(), Value::from("typeform"));
    for (key, source_key) in [
        ("form_id", "form_id"),
        ("submission_id", "token"),
        ("submitted_at", "submitted_at"),
    ] {
        metadata.insert(
            key.to_string(),
            Value::from(optional_string(response, source_key).unwrap_or_default()),
        );
    }

    debug!("Extracted Typeform submission for {}", email);
    Ok(AddressInput {
        address,
        email,
        name,
        phone,
        application_id: token,
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn typeform(answers: Value) -> TypeformWebhook {
        serde_json::from_value(json!({
            "event_id": "evt-1",
            "event_type": "form_response",
            "form_response": {
                "form_id": "form-9",
                "token": "tok-123",
                "submitted_at": "2024-05-01T12:00:00Z",
                "answers": answers
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_generic_payload() {
        let input = from_generic_payload(&json!({
            "address": "123 Main St, Springfield, IL",
            "email": "jane@example.com",
            "name": "Jane",
            "metadata": {"campaign": "spring"}
        }))
        .unwrap();
        assert_eq!(input.address, "123 Main St, Springfield, IL");
        assert_eq!(input.name.as_deref(), Some("Jane"));
        assert!(input.phone.is_none());
        assert_eq!(input.metadata["campaign"], "spring");
    }

    #[test]
    fn test_generic_payload_missing_field() {
        let err = from_generic_payload(&json!({"address": "123 Main St"})).unwrap_err();
        assert!(err.to_string().contains("Missing required field: email"));

        assert!(from_generic_payload(&json!(["not", "an", "object"])).is_err());
    }

    #[test]
    fn test_typeform_answers() {
        let webhook = typeform(json!([
            {"field": {"id": "home_address", "type": "text"}, "text": "123 Main St"},
            {"field": {"id": "contact_email", "type": "email"}, "email": "jane@example.com"},
            {"field": {"id": "full_name", "type": "text"}, "text": "Jane Doe"},
            {"field": {"id": "Phone", "type": "phone_number"}, "phone_number": "+15551234567"},
            {"field": {"id": "unrelated", "type": "choice"}, "choice": {"label": "x"}}
        ]));
        let input = from_typeform(&webhook).unwrap();
        assert_eq!(input.address, "123 Main St");
        assert_eq!(input.email, "jane@example.com");
        assert_eq!(input.name.as_deref(), Some("Jane Doe"));
        assert_eq!(input.phone.as_deref(), Some("+15551234567"));
        assert_eq!(input.application_id.as_deref(), Some("tok-123"));
        assert_eq!(input.metadata["source"], "typeform");
        assert_eq!(input.metadata["form_id"], "form-9");
        assert_eq!(input.metadata["submission_id"], "tok-123");
    }

    #[test]
    fn test_typeform_without_address() {
        let webhook = typeform(json!([
            {"field": {"id": "contact_email", "type": "email"}, "email": "jane@example.com"}
        ]));
        assert!(matches!(
            from_typeform(&webhook),
            Err(HubMatchError::Validation { .. })
        ));
    }
}
