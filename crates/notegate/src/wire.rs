//! Wire mapping for gateway outcomes.
//!
//! The transport itself (framing, headers, routing) is the embedding
//! service's concern; this module only fixes the response contract: which
//! status class each outcome belongs to and the shape of the JSON body.

use serde::Serialize;

use crate::error::GatewayError;
use crate::gateway::AccessView;

/// Coarse response classes, with their conventional HTTP codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// The protected field is in the body.
    Success,
    /// Missing or invalid credential.
    AuthenticationFailure,
    /// Missing or invalid `resource_id`.
    ValidationFailure,
    /// No grant and the request did not opt into spending.
    CreditRequired,
    /// Opted in, but the balance is exhausted.
    Forbidden,
    /// The resource identifier does not resolve.
    NotFound,
    /// Storage-layer abort; worth a retry.
    ServerError,
}

impl StatusClass {
    /// The conventional HTTP status code for this class.
    pub const fn code(self) -> u16 {
        match self {
            StatusClass::Success => 200,
            StatusClass::AuthenticationFailure => 401,
            StatusClass::ValidationFailure => 400,
            StatusClass::CreditRequired => 402,
            StatusClass::Forbidden => 403,
            StatusClass::NotFound => 404,
            StatusClass::ServerError => 500,
        }
    }
}

impl From<&GatewayError> for StatusClass {
    fn from(err: &GatewayError) -> Self {
        match err {
            GatewayError::Authentication(_) => StatusClass::AuthenticationFailure,
            GatewayError::MissingResourceId | GatewayError::InvalidResourceId(_) => {
                StatusClass::ValidationFailure
            }
            GatewayError::CreditRequired => StatusClass::CreditRequired,
            GatewayError::InsufficientCredit => StatusClass::Forbidden,
            GatewayError::ResourceNotFound(_) => StatusClass::NotFound,
            GatewayError::Transaction(_) => StatusClass::ServerError,
        }
    }
}

/// Success body: the protected field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotesBody {
    /// The protected field of the requested resource.
    pub notes: String,
}

/// Refusal body. `requiresToken` appears only on credit-required, so a
/// presentation layer can distinguish "spend to unlock" from every other
/// refusal without parsing the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    /// Human-readable refusal.
    pub error: String,

    /// Present and true only when a credit spend would unlock the field.
    #[serde(rename = "requiresToken", skip_serializing_if = "Option::is_none")]
    pub requires_token: Option<bool>,
}

impl From<&GatewayError> for ErrorBody {
    fn from(err: &GatewayError) -> Self {
        Self {
            error: err.to_string(),
            requires_token: matches!(err, GatewayError::CreditRequired).then_some(true),
        }
    }
}

/// Map a gateway result onto its status class and JSON body.
pub fn respond(result: &Result<AccessView, GatewayError>) -> (StatusClass, serde_json::Value) {
    match result {
        Ok(view) => {
            let body = NotesBody {
                notes: view.notes.clone(),
            };
            (StatusClass::Success, serde_json::json!(body))
        }
        Err(err) => (
            StatusClass::from(err),
            serde_json::json!(ErrorBody::from(err)),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notegate_auth::AuthError;
    use notegate_core::ResourceId;

    #[test]
    fn test_status_codes() {
        assert_eq!(StatusClass::Success.code(), 200);
        assert_eq!(StatusClass::CreditRequired.code(), 402);
        assert_eq!(StatusClass::Forbidden.code(), 403);
    }

    #[test]
    fn test_error_mapping() {
        let cases: Vec<(GatewayError, StatusClass)> = vec![
            (
                GatewayError::Authentication(AuthError::MissingCredential),
                StatusClass::AuthenticationFailure,
            ),
            (GatewayError::MissingResourceId, StatusClass::ValidationFailure),
            (GatewayError::InvalidResourceId(0), StatusClass::ValidationFailure),
            (GatewayError::CreditRequired, StatusClass::CreditRequired),
            (GatewayError::InsufficientCredit, StatusClass::Forbidden),
            (
                GatewayError::ResourceNotFound(ResourceId::new(4)),
                StatusClass::NotFound,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(StatusClass::from(&err), expected);
        }
    }

    #[test]
    fn test_requires_token_only_on_credit_required() {
        let body = ErrorBody::from(&GatewayError::CreditRequired);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["requiresToken"], serde_json::json!(true));

        let body = ErrorBody::from(&GatewayError::InsufficientCredit);
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("requiresToken").is_none());
    }

    #[test]
    fn test_success_body_shape() {
        let result = Ok(AccessView {
            notes: "14.5".to_string(),
            balance: Some(2),
        });
        let (status, body) = respond(&result);
        assert_eq!(status, StatusClass::Success);
        assert_eq!(body, serde_json::json!({ "notes": "14.5" }));
    }
}
