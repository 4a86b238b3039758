use actix_web::{error, http::StatusCode, HttpResponse, HttpResponseBuilder};
use derive_more::{Display, Error};

/// Failures surfaced by the security layer.
///
/// Bad credentials and disabled accounts display exactly the same text so a
/// caller cannot tell an unknown user from a disabled one.
#[derive(Debug, Display, Error, PartialEq, Eq)]
pub enum AuthError {
    #[display("bad credentials")]
    InvalidCredentials,
    #[display("bad credentials")]
    AccountDisabled,
    #[display("forbidden")]
    Forbidden,
    #[display("unauthorized")]
    Unauthorized,
    #[display("credential store unavailable")]
    DataStoreUnavailable,
}

impl error::ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        match *self {
            AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::AccountDisabled => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthError::DataStoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponseBuilder::new(self.status_code()).body(self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::ResponseError;

    #[test]
    fn test_status_codes() {
        assert_eq!(AuthError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AuthError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::DataStoreUnavailable.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_credential_failures_are_indistinguishable() {
        assert_eq!(
            AuthError::InvalidCredentials.to_string(),
            AuthError::AccountDisabled.to_string()
        );
        assert_eq!(
            AuthError::InvalidCredentials.status_code(),
            AuthError::AccountDisabled.status_code()
        );
    }
}
