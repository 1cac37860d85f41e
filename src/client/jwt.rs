use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use serde_json::Value;

/// 讀取 JWT payload 的 `exp`；無法解碼時回傳 `Err(())`
fn expiry(token: &str) -> Result<Option<i64>, ()> {
    let payload = token.split('.').nth(1).ok_or(())?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|_| ())?;
    let claims: Value = serde_json::from_slice(&bytes).map_err(|_| ())?;
    Ok(claims.get("exp").and_then(Value::as_i64))
}

/// token 是否已過期。無法解碼視為過期；沒有 `exp` 視為未過期。
pub fn is_token_expired(token: &str) -> bool {
    match expiry(token) {
        Ok(Some(exp)) => exp < Utc::now().timestamp(),
        Ok(None) => false,
        Err(()) => true,
    }
}

#[cfg(test)]
pub(crate) fn unsigned_token(claims: &Value) -> String {
    format!(
        "{}.{}.signature",
        URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(claims.to_string())
    )
}
