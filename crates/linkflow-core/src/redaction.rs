use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

const REDACTED: &str = "***REDACTED***";

static RE_KV_SECRET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)\b(api[_-]?token|x[_-]amz[_-]signature|x[_-]amz[_-]credential|x[_-]amz[_-]security[_-]token)(["']?)\s*[:=]\s*["']?[^\s"'&,}]+["']?"#,
    )
    .expect("valid regex")
});

static RE_AUTH_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(Authorization)\s*:\s*(Bearer|Token)\s+([A-Za-z0-9._\-]+)")
        .expect("valid regex")
});

static RE_URL_QUERY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)([?&](?:api_key|token|x-amz-signature|x-amz-credential|x-amz-security-token)=)[^&\s]+",
    )
    .expect("valid regex")
});

/// Field names (compared case-insensitively, `_` treated as `-`) whose values
/// are signing material and must never reach the logs.
const SIGNING_SECRET_FIELDS: &[&str] = &[
    "policy",
    "x-amz-signature",
    "x-amz-credential",
    "x-amz-security-token",
];

/// Redact common secret patterns from arbitrary text.
pub fn redact_secrets_in_text(input: &str) -> String {
    let step1 = RE_AUTH_HEADER.replace_all(input, |caps: &regex::Captures| {
        format!("{}: {} {}", &caps[1], &caps[2], REDACTED)
    });
    let step2 = RE_KV_SECRET.replace_all(&step1, |caps: &regex::Captures| {
        format!("{}{}: {}", &caps[1], &caps[2], REDACTED)
    });
    let step3 = RE_URL_QUERY.replace_all(&step2, |caps: &regex::Captures| {
        format!("{}REDACTED", &caps[1])
    });
    step3.into_owned()
}

fn is_signing_secret(name: &str) -> bool {
    let normalized = name.to_ascii_lowercase().replace('_', "-");
    SIGNING_SECRET_FIELDS.contains(&normalized.as_str())
}

/// Copy of a JSON document with signing material masked, at any depth.
pub fn redact_signing_fields(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let v = if is_signing_secret(k) && !v.is_object() {
                        Value::String(REDACTED.to_string())
                    } else {
                        redact_signing_fields(v)
                    };
                    (k.clone(), v)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_signing_fields).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn redacts_authorization_header() {
        let out = redact_secrets_in_text("Authorization: Token abcdef123456");
        assert_eq!(out, "Authorization: Token ***REDACTED***");
    }

    #[test]
    fn redacts_signature_in_json_text() {
        let out = redact_secrets_in_text(r#"{"x-amz-signature": "sig123", "key": "media/1.pdf"}"#);
        assert!(!out.contains("sig123"));
        assert!(out.contains("media/1.pdf"));
    }

    #[test]
    fn redacts_presigned_query_params() {
        let out = redact_secrets_in_text(
            "https://s3.example/b?X-Amz-Credential=AKIA%2F1&X-Amz-Signature=deadbeef&other=1",
        );
        assert!(!out.contains("AKIA"));
        assert!(!out.contains("deadbeef"));
        assert!(out.contains("other=1"));
    }

    #[test]
    fn leaves_plain_text_alone() {
        let text = "AccessDenied: request expired";
        assert_eq!(redact_secrets_in_text(text), text);
    }

    #[test]
    fn masks_signing_fields_at_any_depth() {
        let value = json!({
            "id": 99,
            "policy": "cG9saWN5",
            "fields": {"key": "media/99.pdf", "X-Amz-Signature": "sig", "x_amz_credential": "cred"}
        });
        let masked = redact_signing_fields(&value);

        assert_eq!(masked["id"], 99);
        assert_eq!(masked["policy"], REDACTED);
        assert_eq!(masked["fields"]["key"], "media/99.pdf");
        assert_eq!(masked["fields"]["X-Amz-Signature"], REDACTED);
        assert_eq!(masked["fields"]["x_amz_credential"], REDACTED);
    }
}
