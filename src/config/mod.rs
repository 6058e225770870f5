use crate::errors::DsiResult;

/// Defaults for feed channel metadata, read from the environment or a `.env`
/// file. Every value is optional; command line flags take precedence.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub feed_title: Option<String>,
    pub feed_link: Option<String>,
    pub feed_description: Option<String>,
    pub feed_language: Option<String>,
    pub author_name: Option<String>,
    pub author_email: Option<String>,
}

impl Config {
    /// Get the directory where the executable is located
    fn exe_dir() -> Option<std::path::PathBuf> {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    pub fn from_env() -> DsiResult<Self> {
        // Try to load .env from executable's directory first
        if let Some(dir) = Self::exe_dir() {
            let env_path = dir.join(".env");
            if env_path.exists() {
                dotenvy::from_path(&env_path).ok();
            }
        }
        // Fall back to current directory
        dotenvy::dotenv().ok();

        Ok(Self::from_lookup(|key| std::env::var(key).ok()))
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            feed_title: get("DSI_FEED_TITLE"),
            feed_link: get("DSI_FEED_LINK"),
            feed_description: get("DSI_FEED_DESCRIPTION"),
            feed_language: get("DSI_FEED_LANGUAGE"),
            author_name: get("DSI_AUTHOR_NAME"),
            author_email: get("DSI_AUTHOR_EMAIL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_from_lookup_reads_known_keys() {
        let vars: HashMap<&str, &str> = [
            ("DSI_FEED_TITLE", "My Status"),
            ("DSI_FEED_LINK", "https://example.com"),
            ("DSI_AUTHOR_EMAIL", "me@example.com"),
        ]
        .into_iter()
        .collect();

        let config = Config::from_lookup(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.feed_title.as_deref(), Some("My Status"));
        assert_eq!(config.feed_link.as_deref(), Some("https://example.com"));
        assert_eq!(config.author_email.as_deref(), Some("me@example.com"));
        assert!(config.author_name.is_none());
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let config = Config::from_lookup(|_| Some("   ".to_string()));
        assert!(config.feed_title.is_none());
        assert!(config.feed_language.is_none());
    }
}
