use std::fmt;

use cipherstudio_settings::TOKEN_ENV;

/// Opaque bearer credential attached to persistence calls.
/// 附加於儲存層呼叫的不透明 bearer 憑證。
///
/// The value is never printed; `Debug` shows a placeholder.
/// 憑證內容不會被輸出，`Debug` 僅顯示遮罩。
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    /// Accepts a raw token or a full `Bearer <token>` header value.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let value = value
            .strip_prefix("Bearer ")
            .or_else(|| value.strip_prefix("bearer "))
            .unwrap_or(value)
            .trim();
        (!value.is_empty()).then(|| Self(value.to_string()))
    }

    pub fn from_env() -> Option<Self> {
        std::env::var(TOKEN_ENV).ok().as_deref().and_then(Self::parse)
    }

    pub fn header_value(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_raw_and_prefixed_tokens() {
        assert_eq!(
            BearerToken::parse("abc").map(|t| t.header_value()),
            Some("Bearer abc".to_string())
        );
        assert_eq!(
            BearerToken::parse(" Bearer abc ").map(|t| t.header_value()),
            Some("Bearer abc".to_string())
        );
        assert!(BearerToken::parse("   ").is_none());
    }

    #[test]
    fn debug_is_redacted() {
        let token = BearerToken::parse("secret-value").unwrap();
        assert_eq!(format!("{token:?}"), "BearerToken(***)");
    }
}
