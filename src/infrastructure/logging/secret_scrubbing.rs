use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Replacement used when the scrubber itself could not be built.
const WITHHELD: &str = "[BODY_WITHHELD]";

static SCRUBBER: LazyLock<Option<SecretScrubber>> = LazyLock::new(|| match SecretScrubber::new() {
    Ok(scrubber) => Some(scrubber),
    Err(err) => {
        tracing::error!(error = %err, "secret scrubber patterns failed to compile");
        None
    }
});

/// Redact API keys, bearer tokens and credential fields from `text`.
///
/// Used on provider error bodies before they end up in logs or errors.
pub fn scrub_secrets(text: &str) -> String {
    SCRUBBER
        .as_ref()
        .map_or_else(|| WITHHELD.to_string(), |scrubber| scrubber.scrub_message(text))
}

/// Compiled redaction patterns.
#[derive(Clone)]
pub struct SecretScrubber {
    api_key_pattern: Regex,
    token_pattern: Regex,
    bearer_pattern: Regex,
    password_pattern: Regex,
}

impl SecretScrubber {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            // OpenAI (sk-...) and Anthropic (sk-ant-...) keys
            api_key_pattern: Regex::new(r"sk-[a-zA-Z0-9_-]{20,}")?,
            token_pattern: Regex::new(
                r#"["']?(api_key|apikey|token|secret)["']?\s*([:=])\s*["']?[a-zA-Z0-9_.\-]{12,}["']?"#,
            )?,
            bearer_pattern: Regex::new(r"Bearer\s+[a-zA-Z0-9_.\-]+")?,
            password_pattern: Regex::new(r#"["']?password["']?\s*[:=]\s*["']?[^"'\s,}]+["']?"#)?,
        })
    }

    pub fn scrub_message(&self, message: &str) -> String {
        let scrubbed = self
            .api_key_pattern
            .replace_all(message, "[API_KEY_REDACTED]");
        let scrubbed = self
            .bearer_pattern
            .replace_all(&scrubbed, "Bearer [TOKEN_REDACTED]");
        let scrubbed = self
            .token_pattern
            .replace_all(&scrubbed, "${1}${2}[REDACTED]");
        self.password_pattern
            .replace_all(&scrubbed, "password=[REDACTED]")
            .into_owned()
    }
}

impl fmt::Debug for SecretScrubber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretScrubber").finish()
    }
}
