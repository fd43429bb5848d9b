//! Environment variable interpolation for config files.
//!
//! Supported syntax:
//! - `$VAR` / `${VAR}` - substitute the variable, error if missing
//! - `${VAR:-default}` - use the default if VAR is unset or empty
//! - `${VAR-default}` - use the default only if VAR is unset
//! - `$$` - literal `$`

use regex::Regex;
use std::env;
use std::sync::LazyLock;

static VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        \$\$                           # escaped dollar
        |
        \$\{
            ([A-Za-z_][A-Za-z0-9_]*)   # braced name (group 1)
            (?:
                (:?-)                  # :- or - (group 2)
                ([^}]*)                # default value (group 3)
            )?
        \}
        |
        \$([A-Za-z_][A-Za-z0-9_]*)     # bare $VAR (group 4)
        ",
    )
    .expect("Invalid regex pattern")
});

/// Result of interpolating a config document.
#[derive(Debug)]
pub struct InterpolationResult {
    /// The interpolated text.
    pub text: String,
    /// All errors encountered, accumulated so the operator sees every
    /// missing variable at once.
    pub errors: Vec<String>,
}

impl InterpolationResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Substitute environment variables in the given text.
pub fn interpolate(input: &str) -> InterpolationResult {
    let mut errors = Vec::new();

    let text = VAR_PATTERN
        .replace_all(input, |caps: &regex::Captures| {
            let full_match = caps.get(0).unwrap().as_str();
            if full_match == "$$" {
                return "$".to_string();
            }

            let name = caps
                .get(1)
                .or_else(|| caps.get(4))
                .map(|m| m.as_str())
                .unwrap_or("");
            let dash = caps.get(2).map(|m| m.as_str());
            let default = caps.get(3).map(|m| m.as_str());

            resolve(name, dash, default, &mut errors).unwrap_or_else(|| full_match.to_string())
        })
        .to_string();

    InterpolationResult { text, errors }
}

/// Resolve one variable reference. Returns `None` when the reference must be
/// left in place (an error was recorded).
fn resolve(
    name: &str,
    dash: Option<&str>,
    default: Option<&str>,
    errors: &mut Vec<String>,
) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            // Values are spliced into YAML, so embedded newlines could
            // smuggle in extra config keys.
            if value.contains('\n') || value.contains('\r') {
                errors.push(format!(
                    "environment variable '{name}' contains newlines, which is not allowed"
                ));
                return None;
            }
            if value.is_empty() && dash == Some(":-") {
                return Some(default.unwrap_or("").to_string());
            }
            Some(value)
        }
        Err(_) => match default {
            Some(d) => Some(d.to_string()),
            None => {
                errors.push(format!("environment variable '{name}' is not set"));
                None
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_braced_and_bare_vars() {
        unsafe { env::set_var("PLUME_TEST_BUCKET", "invoices") };
        let result = interpolate("url: s3://${PLUME_TEST_BUCKET}/$PLUME_TEST_BUCKET");
        assert!(result.is_ok());
        assert_eq!(result.text, "url: s3://invoices/invoices");
        unsafe { env::remove_var("PLUME_TEST_BUCKET") };
    }

    #[test]
    fn test_default_when_unset() {
        unsafe { env::remove_var("PLUME_TEST_MISSING") };
        let result = interpolate("addr: ${PLUME_TEST_MISSING:-8.8.8.8:53}");
        assert!(result.is_ok());
        assert_eq!(result.text, "addr: 8.8.8.8:53");
    }

    #[test]
    fn test_colon_dash_replaces_empty() {
        unsafe { env::set_var("PLUME_TEST_EMPTY", "") };
        // `:-` treats empty-but-set as unset; plain `-` keeps the empty value
        let result = interpolate("a: ${PLUME_TEST_EMPTY:-fallback} b: ${PLUME_TEST_EMPTY-kept}");
        assert!(result.is_ok());
        assert_eq!(result.text, "a: fallback b: ");
        unsafe { env::remove_var("PLUME_TEST_EMPTY") };
    }

    #[test]
    fn test_missing_var_accumulates_error() {
        unsafe { env::remove_var("PLUME_TEST_NOPE") };
        let result = interpolate("key: $PLUME_TEST_NOPE");
        assert!(!result.is_ok());
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("PLUME_TEST_NOPE"));
        // The unresolved reference stays in place
        assert_eq!(result.text, "key: $PLUME_TEST_NOPE");
    }

    #[test]
    fn test_escaped_dollar() {
        let result = interpolate("price: $$5");
        assert!(result.is_ok());
        assert_eq!(result.text, "price: $5");
    }

    #[test]
    fn test_newline_value_rejected() {
        unsafe { env::set_var("PLUME_TEST_EVIL", "a\nb") };
        let result = interpolate("key: ${PLUME_TEST_EVIL}");
        assert!(!result.is_ok());
        unsafe { env::remove_var("PLUME_TEST_EVIL") };
    }
}
