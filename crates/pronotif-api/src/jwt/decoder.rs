//! JWT token validation.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use pronotif_core::config::AuthConfig;
use pronotif_core::error::AppError;

use super::claims::Claims;

/// Validates bearer tokens.
#[derive(Clone)]
pub struct JwtDecoder {
    /// HMAC secret key for verification.
    decoding_key: DecodingKey,
    /// Validation configuration.
    validation: Validation,
}

impl std::fmt::Debug for JwtDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtDecoder")
            .field("validation", &self.validation)
            .finish_non_exhaustive()
    }
}

impl JwtDecoder {
    /// Creates a new decoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 5;

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    /// Decodes a token, checking its signature and expiration.
    pub fn decode(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::authentication(format!("Invalid token: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::JwtEncoder;
    use pronotif_core::AccountKey;

    fn config(secret: &str) -> AuthConfig {
        AuthConfig {
            jwt_secret: secret.to_string(),
            token_ttl_days: 30,
        }
    }

    #[test]
    fn test_issued_token_decodes_to_same_account() {
        let key = AccountKey::new("eleve", "https://a.example/pronote/");
        let (token, _) = JwtEncoder::new(&config("s3cret"))
            .issue(&key, Some("fcm-token"))
            .unwrap();

        let claims = JwtDecoder::new(&config("s3cret")).decode(&token).unwrap();
        assert_eq!(claims.account_key(), key);
        assert_eq!(claims.device.as_deref(), Some("fcm-token"));
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let key = AccountKey::new("eleve", "https://a.example/pronote/");
        let (token, _) = JwtEncoder::new(&config("one")).issue(&key, None).unwrap();
        assert!(JwtDecoder::new(&config("two")).decode(&token).is_err());
    }
}
