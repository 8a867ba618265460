use crate::{error::AppError, AppContext};
use argon2::Argon2;
use axum::{
    async_trait,
    extract::{Extension, FromRequest, RequestParts, TypedHeader},
    headers::{authorization::Bearer, Authorization},
    http::StatusCode,
};
use jsonwebtoken::{
    errors::Result as JwtResult, DecodingKey, EncodingKey, Header, TokenData, Validation,
};
use password_hash::{
    self, rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

// 30 days, matching the expiry promised at login
pub const TOKEN_LIFETIME: Duration = Duration::from_secs(30 * 24 * 60 * 60);

pub fn hash_password(password: impl AsRef<[u8]>) -> password_hash::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_ref(), &salt)
        .map(|h| h.to_string())
}

pub fn verify_password(
    password: impl AsRef<[u8]>,
    password_hash: impl AsRef<str>,
) -> password_hash::Result<bool> {
    let parsed_hash = PasswordHash::new(password_hash.as_ref())?;
    Ok(Argon2::default()
        .verify_password(password.as_ref(), &parsed_hash)
        .is_ok())
}

pub struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Keys {
    pub fn from_secret(secret: &str) -> Keys {
        Keys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn generate_jwt(&self, username: &str, exp: Duration) -> JwtResult<String> {
        jsonwebtoken::encode(
            &Header::default(),
            &Claims {
                sub: username.to_string(),
                exp: jsonwebtoken::get_current_timestamp() + exp.as_secs(),
            },
            &self.encoding,
        )
    }

    pub fn validate_jwt(&self, token: &str) -> JwtResult<TokenData<Claims>> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &Validation::default())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: u64,
}

impl Claims {
    /// Profile routes may only be touched by the user named in the path.
    pub fn authorize(&self, username: &str) -> Result<(), AppError> {
        if self.sub == username {
            Ok(())
        } else {
            Err(AppError::from(StatusCode::UNAUTHORIZED, "Unauthorized"))
        }
    }
}

/// Rejects the request with a 401 unless it carries a valid bearer token.
pub struct ExtractAuth(pub Claims);

#[async_trait]
impl<B: Send> FromRequest<B> for ExtractAuth {
    type Rejection = AppError;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request(req)
                .await
                .map_err(|_| AppError::from(StatusCode::UNAUTHORIZED, "missing bearer token"))?;

        let Extension(ctx) = Extension::<AppContext>::from_request(req).await?;

        let token = ctx
            .keys
            .validate_jwt(bearer.token())
            .map_err(|_| AppError::from(StatusCode::UNAUTHORIZED, "invalid or expired token"))?;

        Ok(ExtractAuth(token.claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trip() {
        let hash = hash_password("hunter2").unwrap();
        assert!(verify_password("hunter2", &hash).unwrap());
        assert!(!verify_password("hunter3", &hash).unwrap());
    }

    #[test]
    fn hashes_are_salted() {
        let first = hash_password("hunter2").unwrap();
        let second = hash_password("hunter2").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn jwt_binds_identity() {
        let keys = Keys::from_secret("test-secret");
        let token = keys.generate_jwt("alice", TOKEN_LIFETIME).unwrap();
        let data = keys.validate_jwt(&token).unwrap();
        assert_eq!(data.claims.sub, "alice");
    }

    #[test]
    fn jwt_rejects_wrong_secret() {
        let keys = Keys::from_secret("test-secret");
        let token = keys.generate_jwt("alice", TOKEN_LIFETIME).unwrap();
        assert!(Keys::from_secret("other-secret").validate_jwt(&token).is_err());
    }

    #[test]
    fn jwt_rejects_expired_token() {
        let keys = Keys::from_secret("test-secret");
        // well past the default validation leeway
        let claims = Claims {
            sub: "alice".to_string(),
            exp: jsonwebtoken::get_current_timestamp() - 600,
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();
        assert!(keys.validate_jwt(&token).is_err());
    }

    #[test]
    fn authorize_checks_path_identity() {
        let claims = Claims {
            sub: "alice".to_string(),
            exp: 0,
        };
        assert!(claims.authorize("alice").is_ok());
        assert!(claims.authorize("bob").is_err());
    }
}
