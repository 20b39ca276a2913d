//! Scrubbing credentials out of text that leaves the process.

use super::driver::DriverConfig;

pub const MASK: &str = "****";

/// Config keys whose values never appear in error text.
const SECRET_KEYS: &[&str] = &["password"];

/// Replace every occurrence of a configured secret in `text` with [`MASK`].
pub fn redact(text: &str, config: &DriverConfig) -> String {
    let mut out = text.to_string();
    for key in SECRET_KEYS {
        if let Some(secret) = config.get(*key)
            && !secret.is_empty()
        {
            out = out.replace(secret.as_str(), MASK);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_masked() {
        let mut config = DriverConfig::new();
        config.insert("user".into(), "me".into());
        config.insert("password".into(), "hunter2".into());

        let text = "connect failed for me:hunter2@db (hunter2)";
        assert_eq!(redact(text, &config), "connect failed for me:****@db (****)");
    }

    #[test]
    fn test_empty_password_leaves_text() {
        let mut config = DriverConfig::new();
        config.insert("password".into(), String::new());
        assert_eq!(redact("nothing secret", &config), "nothing secret");
        assert_eq!(redact("plain", &DriverConfig::new()), "plain");
    }
}
