use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use tracing::debug;
use uuid::Uuid;

use shared_models::auth::{ApprovalStatus, AuthUser, JwtClaims, Role};

type HmacSha256 = Hmac<Sha256>;

/// Sign a session token for an authenticated user. HMAC-SHA256 over the
/// usual `header.claims` encoding; no external issuer is involved.
pub fn issue_token(user: &AuthUser, jwt_secret: &str, ttl_hours: i64) -> Result<String, String> {
    if jwt_secret.is_empty() {
        return Err("JWT secret is not set".to_string());
    }

    let now = Utc::now();
    let exp = now + Duration::hours(ttl_hours);

    let header = json!({
        "alg": "HS256",
        "typ": "JWT"
    });

    let claims = json!({
        "sub": user.id,
        "email": user.email,
        "role": user.role,
        "approval": user.approval_status,
        "iat": now.timestamp(),
        "exp": exp.timestamp()
    });

    let header_encoded = URL_SAFE_NO_PAD.encode(header.to_string());
    let claims_encoded = URL_SAFE_NO_PAD.encode(claims.to_string());
    let signing_input = format!("{}.{}", header_encoded, claims_encoded);

    let mut mac = HmacSha256::new_from_slice(jwt_secret.as_bytes())
        .map_err(|_| "Failed to create HMAC".to_string())?;
    mac.update(signing_input.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_encoded = URL_SAFE_NO_PAD.encode(signature);

    Ok(format!("{}.{}", signing_input, signature_encoded))
}

pub fn validate_token(token: &str, jwt_secret: &str) -> Result<AuthUser, String> {
    if jwt_secret.is_empty() {
        return Err("JWT secret is not set".to_string());
    }

    // Split token into parts
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err("Invalid token format".to_string());
    }

    let header_b64 = parts[0];
    let claims_b64 = parts[1];
    let signature_b64 = parts[2];

    let signature = match URL_SAFE_NO_PAD.decode(signature_b64) {
        Ok(sig) => sig,
        Err(e) => {
            debug!("Failed to decode signature: {}", e);
            return Err("Invalid signature encoding".to_string());
        }
    };

    let signing_input = format!("{}.{}", header_b64, claims_b64);

    let mut mac = match HmacSha256::new_from_slice(jwt_secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return Err("Failed to create HMAC".to_string()),
    };
    mac.update(signing_input.as_bytes());

    if mac.verify_slice(&signature).is_err() {
        debug!("Token signature verification failed");
        return Err("Invalid token signature".to_string());
    }

    // Decode claims
    let claims_json = match URL_SAFE_NO_PAD.decode(claims_b64) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(json_str) => json_str,
            Err(_) => return Err("Invalid claims encoding".to_string()),
        },
        Err(_) => return Err("Invalid claims encoding".to_string()),
    };

    let claims: JwtClaims = match serde_json::from_str(&claims_json) {
        Ok(c) => c,
        Err(e) => {
            debug!("Failed to parse claims: {}", e);
            return Err("Invalid claims format".to_string());
        }
    };

    // Check expiration
    if let Some(exp) = claims.exp {
        let now = Utc::now().timestamp() as u64;
        if exp < now {
            debug!("Token expired at {} (now: {})", exp, now);
            return Err("Token expired".to_string());
        }
    }

    let id = Uuid::parse_str(&claims.sub).map_err(|_| "Invalid subject claim".to_string())?;
    let role = claims
        .role
        .as_deref()
        .and_then(Role::parse)
        .ok_or_else(|| "Invalid role claim".to_string())?;
    let approval_status = claims.approval.as_deref().and_then(ApprovalStatus::parse);

    let user = AuthUser {
        id,
        email: claims.email,
        role,
        approval_status,
    };

    debug!("Token validated successfully for user: {}", user.id);
    Ok(user)
}
