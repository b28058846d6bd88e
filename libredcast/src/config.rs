//! Configuration management for Redcast
//!
//! Two sources feed a run: the content directory (subreddit list, post
//! text and an optional image) and the environment (credentials, schedule
//! and pacing).

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveTime;
use chrono_tz::Tz;
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

use crate::error::ConfigError;
use crate::scheduling::{parse_post_time, parse_timezone};
use crate::types::PostRequest;

pub const SUBREDDITS_FILE: &str = "subreddits.txt";
pub const POST_CONTENT_FILE: &str = "post_content.txt";
pub const IMAGE_STEM: &str = "post_image";
pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];

pub const DEFAULT_USER_AGENT: &str = "redcast/0.1 (scheduled poster)";

/// Title, body and flair parsed from the content file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostContent {
    pub title: String,
    pub body: String,
    /// `None` when the file has no `[FLAIR]` section at all
    pub flair: Option<String>,
}

#[derive(Clone, Copy)]
enum Section {
    Title,
    Body,
    Flair,
}

/// Parse the subreddit list: one name per line, `#` comments and blanks skipped
pub fn parse_destinations(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Parse a `[TITLE]` / `[BODY]` / `[FLAIR]` sectioned content file
///
/// Non-empty lines inside a section are trimmed and joined with newlines.
/// Anything before the first marker is ignored.
pub fn parse_post_content(text: &str) -> PostContent {
    let mut content = PostContent::default();
    let mut current: Option<Section> = None;

    for line in text.lines().map(str::trim) {
        if line.starts_with("[TITLE]") {
            current = Some(Section::Title);
            continue;
        } else if line.starts_with("[BODY]") {
            current = Some(Section::Body);
            continue;
        } else if line.starts_with("[FLAIR]") {
            current = Some(Section::Flair);
            content.flair.get_or_insert_with(String::new);
            continue;
        }

        let Some(section) = current else { continue };
        if line.is_empty() {
            continue;
        }

        let target = match section {
            Section::Title => &mut content.title,
            Section::Body => &mut content.body,
            Section::Flair => content.flair.get_or_insert_with(String::new),
        };
        if !target.is_empty() {
            target.push('\n');
        }
        target.push_str(line);
    }

    content
}

/// Reads post content from a configuration directory
#[derive(Debug, Clone)]
pub struct ContentSource {
    dir: PathBuf,
}

impl ContentSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read the ordered subreddit list
    pub fn read_destinations(&self) -> Result<Vec<String>, ConfigError> {
        let path = self.dir.join(SUBREDDITS_FILE);
        let destinations = parse_destinations(&read_file(&path)?);
        info!(
            "Loaded {} subreddits from {}",
            destinations.len(),
            path.display()
        );
        Ok(destinations)
    }

    /// Read title, body and flair
    pub fn read_post_content(&self) -> Result<PostContent, ConfigError> {
        let path = self.dir.join(POST_CONTENT_FILE);
        let content = parse_post_content(&read_file(&path)?);
        info!("Loaded post content from {}", path.display());
        Ok(content)
    }

    /// Find `post_image.<ext>`, trying extensions in a fixed order
    pub fn find_image(&self) -> Option<PathBuf> {
        let found = IMAGE_EXTENSIONS
            .iter()
            .map(|ext| self.dir.join(format!("{IMAGE_STEM}.{ext}")))
            .find(|path| path.is_file());

        match &found {
            Some(path) => info!("Found post image: {}", path.display()),
            None => info!("No post image found"),
        }
        found
    }

    /// Load everything and validate it into a [`PostRequest`]
    pub fn load_request(&self) -> Result<PostRequest, ConfigError> {
        let destinations = self.read_destinations()?;
        let content = self.read_post_content()?;
        let image = self.find_image();

        let request = PostRequest::new(
            destinations,
            content.title,
            content.body,
            content.flair,
            image,
        )?;
        info!("Configuration validation passed");
        Ok(request)
    }
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Reddit script-app credentials
#[derive(Debug)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: SecretString,
    pub username: String,
    pub password: SecretString,
    pub user_agent: String,
}

impl Clone for RedditCredentials {
    fn clone(&self) -> Self {
        Self {
            client_id: self.client_id.clone(),
            client_secret: SecretString::from(self.client_secret.expose_secret().to_string()),
            username: self.username.clone(),
            password: SecretString::from(self.password.expose_secret().to_string()),
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Process-wide settings read from the environment
#[derive(Debug, Clone)]
pub struct Settings {
    pub credentials: RedditCredentials,
    pub post_time: NaiveTime,
    pub timezone: Tz,
    pub post_delay: Duration,
    pub settle_delay: Duration,
    pub config_dir: PathBuf,
    pub logs_dir: PathBuf,
}

impl Settings {
    /// Load settings from environment variables already in the process
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required credentials are missing or a value
    /// cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let require = |var: &str| -> Result<String, ConfigError> {
            get(var).ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
        };

        let or_default = |var: &str, default: &str| -> String {
            get(var).unwrap_or_else(|| default.to_string())
        };

        let parse_secs = |var: &str, default: &str| -> Result<Duration, ConfigError> {
            let raw = or_default(var, default);
            raw.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|e| ConfigError::InvalidEnvVar {
                    var: var.to_string(),
                    reason: e.to_string(),
                })
        };

        let expand_dir = |var: &str, default: &str| -> PathBuf {
            PathBuf::from(shellexpand::tilde(&or_default(var, default)).to_string())
        };

        let credentials = RedditCredentials {
            client_id: require("REDDIT_CLIENT_ID")?,
            client_secret: SecretString::from(require("REDDIT_CLIENT_SECRET")?),
            username: require("REDDIT_USERNAME")?,
            password: SecretString::from(require("REDDIT_PASSWORD")?),
            user_agent: or_default("REDDIT_USER_AGENT", DEFAULT_USER_AGENT),
        };

        let post_time = parse_post_time(&or_default("POST_TIME", "09:00")).map_err(|reason| {
            ConfigError::InvalidEnvVar {
                var: "POST_TIME".to_string(),
                reason,
            }
        })?;

        let timezone = parse_timezone(&or_default("TIMEZONE", "UTC")).map_err(|reason| {
            ConfigError::InvalidEnvVar {
                var: "TIMEZONE".to_string(),
                reason,
            }
        })?;

        Ok(Self {
            credentials,
            post_time,
            timezone,
            post_delay: parse_secs("POST_DELAY_SECONDS", "30")?,
            settle_delay: parse_secs("SETTLE_DELAY_SECONDS", "300")?,
            config_dir: expand_dir("REDCAST_CONFIG_DIR", "config"),
            logs_dir: expand_dir("REDCAST_LOGS_DIR", "logs"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn required_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("REDDIT_CLIENT_ID", "client-id"),
            ("REDDIT_CLIENT_SECRET", "client-secret"),
            ("REDDIT_USERNAME", "poster"),
            ("REDDIT_PASSWORD", "hunter2"),
        ])
    }

    fn settings_from(env: &HashMap<&str, &str>) -> Result<Settings, ConfigError> {
        Settings::from_lookup(|key| env.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn test_parse_destinations_skips_comments_and_blanks() {
        let text = "# main subs\nrust\n\n  programming  \n#disabled\ncoolgithubprojects\n";
        assert_eq!(
            parse_destinations(text),
            vec!["rust", "programming", "coolgithubprojects"]
        );
    }

    #[test]
    fn test_parse_post_content_sections() {
        let text = "\
ignored preamble
[TITLE]
Weekly server wipe
[BODY]
Fresh map tonight.

  Join us at 8pm.
[FLAIR]
Announcement
";
        let content = parse_post_content(text);
        assert_eq!(content.title, "Weekly server wipe");
        assert_eq!(content.body, "Fresh map tonight.\nJoin us at 8pm.");
        assert_eq!(content.flair.as_deref(), Some("Announcement"));
    }

    #[test]
    fn test_parse_post_content_flair_absent_vs_empty() {
        let without = parse_post_content("[TITLE]\nt\n[BODY]\nb\n");
        assert_eq!(without.flair, None);

        let empty = parse_post_content("[TITLE]\nt\n[BODY]\nb\n[FLAIR]\n\n");
        assert_eq!(empty.flair.as_deref(), Some(""));
    }

    #[test]
    fn test_content_source_load_request() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(SUBREDDITS_FILE), "a\nb\n").unwrap();
        std::fs::write(
            dir.path().join(POST_CONTENT_FILE),
            "[TITLE]\nHello\n[BODY]\nWorld\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("post_image.png"), b"png").unwrap();
        std::fs::write(dir.path().join("post_image.gif"), b"gif").unwrap();

        let request = ContentSource::new(dir.path()).load_request().unwrap();
        assert_eq!(request.destinations(), ["a", "b"]);
        assert_eq!(request.title(), "Hello");
        assert_eq!(request.body(), "World");
        assert_eq!(request.flair(), None);
        // png is probed before gif
        assert_eq!(
            request.image_path(),
            Some(dir.path().join("post_image.png").as_path())
        );
    }

    #[test]
    fn test_content_source_missing_file_is_read_error() {
        let dir = TempDir::new().unwrap();
        let err = ContentSource::new(dir.path()).load_request().unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_content_source_empty_list_is_invalid() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(SUBREDDITS_FILE), "# nothing yet\n").unwrap();
        std::fs::write(dir.path().join(POST_CONTENT_FILE), "[TITLE]\nt\n[BODY]\nb\n").unwrap();
        let err = ContentSource::new(dir.path()).load_request().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_settings_defaults() {
        let settings = settings_from(&required_env()).unwrap();
        assert_eq!(settings.credentials.client_id, "client-id");
        assert_eq!(settings.credentials.password.expose_secret(), "hunter2");
        assert_eq!(settings.credentials.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(settings.post_time, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(settings.timezone, chrono_tz::UTC);
        assert_eq!(settings.post_delay, Duration::from_secs(30));
        assert_eq!(settings.settle_delay, Duration::from_secs(300));
        assert_eq!(settings.config_dir, PathBuf::from("config"));
        assert_eq!(settings.logs_dir, PathBuf::from("logs"));
    }

    #[test]
    fn test_settings_overrides() {
        let mut env = required_env();
        env.insert("POST_TIME", "18:45");
        env.insert("TIMEZONE", "Europe/Berlin");
        env.insert("POST_DELAY_SECONDS", "5");
        env.insert("REDDIT_USER_AGENT", "custom/1.0");
        let settings = settings_from(&env).unwrap();
        assert_eq!(settings.post_time, NaiveTime::from_hms_opt(18, 45, 0).unwrap());
        assert_eq!(settings.timezone, chrono_tz::Europe::Berlin);
        assert_eq!(settings.post_delay, Duration::from_secs(5));
        assert_eq!(settings.credentials.user_agent, "custom/1.0");
    }

    #[test]
    fn test_settings_missing_credential() {
        let mut env = required_env();
        env.remove("REDDIT_PASSWORD");
        match settings_from(&env).unwrap_err() {
            ConfigError::MissingEnvVar(var) => assert_eq!(var, "REDDIT_PASSWORD"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_settings_empty_credential_counts_as_missing() {
        let mut env = required_env();
        env.insert("REDDIT_CLIENT_ID", "  ");
        assert!(matches!(
            settings_from(&env).unwrap_err(),
            ConfigError::MissingEnvVar(_)
        ));
    }

    #[test]
    fn test_settings_invalid_values() {
        let mut env = required_env();
        env.insert("POST_DELAY_SECONDS", "soon");
        assert!(matches!(
            settings_from(&env).unwrap_err(),
            ConfigError::InvalidEnvVar { var, .. } if var == "POST_DELAY_SECONDS"
        ));

        let mut env = required_env();
        env.insert("TIMEZONE", "Mars/Olympus");
        assert!(matches!(
            settings_from(&env).unwrap_err(),
            ConfigError::InvalidEnvVar { var, .. } if var == "TIMEZONE"
        ));
    }
}
