//! Bearer-token issuance and Telegram login verification.
//!
//! Tokens are the compact `header.payload.signature` form: base64url
//! (no padding) segments, HMAC-SHA256 over `header.payload` with the
//! configured secret, `iat`/`exp` claims in the payload.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{ServiceError, ServiceResult};

type HmacSha256 = Hmac<Sha256>;

/// Login payloads older than this are rejected.
pub const MAX_LOGIN_AGE_SECS: i64 = 86_400;

const TOKEN_HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Claims carried in an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// User id.
    pub sub: i32,
    /// Issued at, unix seconds.
    pub iat: i64,
    /// Expiry, unix seconds.
    pub exp: i64,
}

/// The signed payload Telegram's login widget posts back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramLogin {
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub photo_url: Option<String>,
    pub auth_date: i64,
    pub hash: String,
}

impl TelegramLogin {
    /// Display name in preference order: full name, first name,
    /// username, numeric id.
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.clone(),
            _ => self
                .username
                .clone()
                .unwrap_or_else(|| self.id.to_string()),
        }
    }

    /// The data-check string: present fields except `hash`, sorted by
    /// key, joined as `key=value` lines.
    fn data_check_string(&self) -> String {
        let mut pairs: Vec<(&str, String)> = vec![
            ("auth_date", self.auth_date.to_string()),
            ("id", self.id.to_string()),
        ];
        if let Some(first_name) = &self.first_name {
            pairs.push(("first_name", first_name.clone()));
        }
        if let Some(last_name) = &self.last_name {
            pairs.push(("last_name", last_name.clone()));
        }
        if let Some(username) = &self.username {
            pairs.push(("username", username.clone()));
        }
        if let Some(photo_url) = &self.photo_url {
            pairs.push(("photo_url", photo_url.clone()));
        }
        pairs.sort_by(|a, b| a.0.cmp(b.0));
        pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Verifies a Telegram login payload against the bot token.
///
/// The signing key is SHA256(bot_token); the payload's `hash` field is
/// the hex HMAC-SHA256 of the data-check string under that key.
pub fn verify_telegram_login(
    login: &TelegramLogin,
    bot_token: &str,
    now_unix: i64,
) -> ServiceResult<()> {
    let age = now_unix - login.auth_date;
    if age > MAX_LOGIN_AGE_SECS {
        return Err(ServiceError::Auth("login payload has expired".to_string()));
    }

    let secret = Sha256::digest(bot_token.as_bytes());
    let mut mac = HmacSha256::new_from_slice(&secret)
        .map_err(|_| ServiceError::Auth("invalid signing key".to_string()))?;
    mac.update(login.data_check_string().as_bytes());

    let expected = hex::decode(login.hash.to_lowercase())
        .map_err(|_| ServiceError::Auth("malformed login hash".to_string()))?;
    mac.verify_slice(&expected)
        .map_err(|_| ServiceError::Auth("login signature mismatch".to_string()))?;
    Ok(())
}

/// Issues a signed access token for the user.
pub fn issue_token(secret: &[u8], user_id: i32, now_unix: i64, ttl_secs: i64) -> String {
    let claims = TokenClaims {
        sub: user_id,
        iat: now_unix,
        exp: now_unix + ttl_secs,
    };
    let header = URL_SAFE_NO_PAD.encode(TOKEN_HEADER.as_bytes());
    // serde_json never fails on this shape
    let payload =
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap_or_default());
    let signature = sign(secret, &header, &payload);
    format!("{header}.{payload}.{signature}")
}

/// Verifies a token's shape, signature and expiry; returns the user id.
pub fn verify_token(secret: &[u8], token: &str, now_unix: i64) -> ServiceResult<i32> {
    let mut segments = token.split('.');
    let (header, payload, signature) =
        match (segments.next(), segments.next(), segments.next(), segments.next()) {
            (Some(h), Some(p), Some(s), None) => (h, p, s),
            _ => return Err(ServiceError::Auth("malformed token".to_string())),
        };

    let provided = URL_SAFE_NO_PAD
        .decode(signature.as_bytes())
        .map_err(|_| ServiceError::Auth("malformed token signature".to_string()))?;
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|_| ServiceError::Auth("invalid signing key".to_string()))?;
    mac.update(format!("{header}.{payload}").as_bytes());
    mac.verify_slice(&provided)
        .map_err(|_| ServiceError::Auth("token signature mismatch".to_string()))?;

    let claims: TokenClaims = serde_json::from_slice(
        &URL_SAFE_NO_PAD
            .decode(payload.as_bytes())
            .map_err(|_| ServiceError::Auth("malformed token payload".to_string()))?,
    )
    .map_err(|_| ServiceError::Auth("malformed token claims".to_string()))?;

    if claims.exp <= now_unix {
        return Err(ServiceError::Auth("token has expired".to_string()));
    }
    Ok(claims.sub)
}

fn sign(secret: &[u8], header: &str, payload: &str) -> String {
    // new_from_slice only fails on zero-length keys for HMAC, which the
    // config layer rejects
    let mut mac = HmacSha256::new_from_slice(secret)
        .expect("HMAC accepts any key length");
    mac.update(format!("{header}.{payload}").as_bytes());
    URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret";

    #[test]
    fn token_round_trip() {
        let token = issue_token(SECRET, 42, 1_700_000_000, 3600);
        let user_id = verify_token(SECRET, &token, 1_700_000_100).unwrap();
        assert_eq!(user_id, 42);
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = issue_token(SECRET, 42, 1_700_000_000, 3600);
        let err = verify_token(SECRET, &token, 1_700_003_601).unwrap_err();
        assert!(matches!(err, ServiceError::Auth(_)));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let token = issue_token(SECRET, 42, 1_700_000_000, 3600);
        let mut segments: Vec<String> = token.split('.').map(str::to_string).collect();
        let forged = TokenClaims {
            sub: 43,
            iat: 1_700_000_000,
            exp: 1_700_003_600,
        };
        segments[1] = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
        let forged_token = segments.join(".");
        assert!(verify_token(SECRET, &forged_token, 1_700_000_100).is_err());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_token(SECRET, 42, 1_700_000_000, 3600);
        assert!(verify_token(b"other-secret", &token, 1_700_000_100).is_err());
    }

    #[test]
    fn malformed_token_is_rejected() {
        assert!(verify_token(SECRET, "not-a-token", 0).is_err());
        assert!(verify_token(SECRET, "a.b", 0).is_err());
        assert!(verify_token(SECRET, "a.b.c.d", 0).is_err());
    }

    fn signed_login(bot_token: &str, auth_date: i64) -> TelegramLogin {
        let mut login = TelegramLogin {
            id: 111,
            first_name: Some("Alice".to_string()),
            last_name: None,
            username: Some("alice".to_string()),
            photo_url: None,
            auth_date,
            hash: String::new(),
        };
        let secret = Sha256::digest(bot_token.as_bytes());
        let mut mac = HmacSha256::new_from_slice(&secret).unwrap();
        mac.update(login.data_check_string().as_bytes());
        login.hash = hex::encode(mac.finalize().into_bytes());
        login
    }

    #[test]
    fn telegram_login_verifies() {
        let login = signed_login("123:bot-token", 1_700_000_000);
        verify_telegram_login(&login, "123:bot-token", 1_700_000_500).unwrap();
    }

    #[test]
    fn telegram_login_rejects_wrong_bot_token() {
        let login = signed_login("123:bot-token", 1_700_000_000);
        assert!(verify_telegram_login(&login, "456:other", 1_700_000_500).is_err());
    }

    #[test]
    fn telegram_login_rejects_stale_auth_date() {
        let login = signed_login("123:bot-token", 1_700_000_000);
        let later = 1_700_000_000 + MAX_LOGIN_AGE_SECS + 1;
        assert!(verify_telegram_login(&login, "123:bot-token", later).is_err());
    }

    #[test]
    fn telegram_login_rejects_tampered_field() {
        let mut login = signed_login("123:bot-token", 1_700_000_000);
        login.id = 999;
        assert!(verify_telegram_login(&login, "123:bot-token", 1_700_000_500).is_err());
    }

    #[test]
    fn display_name_preference_order() {
        let login = signed_login("t", 0);
        assert_eq!(login.display_name(), "Alice");

        let full = TelegramLogin {
            last_name: Some("Doe".to_string()),
            ..login.clone()
        };
        assert_eq!(full.display_name(), "Alice Doe");

        let bare = TelegramLogin {
            first_name: None,
            username: None,
            ..login
        };
        assert_eq!(bare.display_name(), "111");
    }
}
