//! Reddit platform implementation
//!
//! Talks to the Reddit OAuth API as a script app: password grant for the
//! token, `/api/submit` for posts, `/api/info` for engagement counters.
//! Rate-limit headers from every API response are remembered and served by
//! [`Platform::rate_limit`].

use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::RedditCredentials;
use crate::error::{ConfigError, PlatformError, Result};
use crate::media::ImageMimeType;
use crate::platforms::{Platform, RateLimitStatus, Submission, SubmittedPost};
use crate::report::round1;
use crate::types::EngagementStats;

const DEFAULT_AUTH_BASE_URL: &str = "https://www.reddit.com/";
const DEFAULT_API_BASE_URL: &str = "https://oauth.reddit.com/";
const PERMALINK_BASE_URL: &str = "https://www.reddit.com";
const REQUEST_TIMEOUT_SECS: u64 = 60;
const LOOKUP_LIMIT: &str = "5";
const DEFAULT_LOOKUP_ATTEMPTS: u32 = 3;
const DEFAULT_LOOKUP_INTERVAL: Duration = Duration::from_secs(5);
/// Tolerated difference between the local clock and Reddit's `created_utc`
const CLOCK_SKEW_ALLOWANCE_SECS: i64 = 30;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct Identity {
    name: String,
}

#[derive(Deserialize)]
struct SubmitResponse {
    json: SubmitBody,
}

#[derive(Deserialize)]
struct SubmitBody {
    #[serde(default)]
    errors: Vec<Vec<serde_json::Value>>,
    data: Option<SubmitData>,
}

#[derive(Deserialize)]
struct SubmitData {
    id: Option<String>,
    url: Option<String>,
}

#[derive(Deserialize)]
struct MediaLease {
    args: LeaseArgs,
}

#[derive(Deserialize)]
struct LeaseArgs {
    action: String,
    fields: Vec<LeaseField>,
}

#[derive(Deserialize)]
struct LeaseField {
    name: String,
    value: String,
}

#[derive(Deserialize)]
struct Listing<T> {
    data: ListingData<T>,
}

#[derive(Deserialize)]
struct ListingData<T> {
    children: Vec<Thing<T>>,
}

#[derive(Deserialize)]
struct Thing<T> {
    data: T,
}

#[derive(Deserialize)]
struct ListedPost {
    id: String,
    permalink: String,
    subreddit: String,
    #[serde(default)]
    created_utc: Option<f64>,
}

impl ListedPost {
    /// True for a post in `destination` created no earlier than `since`
    fn is_new_in(&self, destination: &str, since: DateTime<Utc>) -> bool {
        let cutoff = (since.timestamp() - CLOCK_SKEW_ALLOWANCE_SECS) as f64;
        self.subreddit.eq_ignore_ascii_case(destination)
            && self.created_utc.is_some_and(|created| created >= cutoff)
    }
}

#[derive(Deserialize)]
struct PostInfo {
    score: i64,
    ups: i64,
    num_comments: i64,
    upvote_ratio: f64,
}

pub struct RedditClient {
    client: Client,
    credentials: RedditCredentials,
    auth_base: Url,
    api_base: Url,
    token: Option<SecretString>,
    rate_limit: Mutex<Option<RateLimitStatus>>,
    lookup_attempts: u32,
    lookup_interval: Duration,
}

impl RedditClient {
    /// Create a client pointed at the production Reddit endpoints
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Network` if the HTTP client cannot be built.
    pub fn new(credentials: &RedditCredentials) -> Result<Self> {
        Self::with_base_urls(credentials, DEFAULT_AUTH_BASE_URL, DEFAULT_API_BASE_URL)
    }

    /// Create a client with custom token and API base URLs (for tests)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for an unparseable URL and
    /// `PlatformError::Network` if the HTTP client cannot be built.
    pub fn with_base_urls(
        credentials: &RedditCredentials,
        auth_base: &str,
        api_base: &str,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(credentials.user_agent.as_str())
            .build()
            .map_err(|e| PlatformError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            credentials: credentials.clone(),
            auth_base: parse_base_url(auth_base)?,
            api_base: parse_base_url(api_base)?,
            token: None,
            rate_limit: Mutex::new(None),
            lookup_attempts: DEFAULT_LOOKUP_ATTEMPTS,
            lookup_interval: DEFAULT_LOOKUP_INTERVAL,
        })
    }

    /// How often and how far apart to look for a post Reddit did not echo back
    pub fn with_lookup_retry(mut self, attempts: u32, interval: Duration) -> Self {
        self.lookup_attempts = attempts.max(1);
        self.lookup_interval = interval;
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn endpoint(base: &Url, path: &str) -> Result<Url> {
        base.join(path).map_err(|e| {
            ConfigError::Invalid(format!("invalid endpoint '{}' on {}: {}", path, base, e)).into()
        })
    }

    fn bearer(&self) -> Result<&str> {
        self.token
            .as_ref()
            .map(|t| t.expose_secret())
            .ok_or_else(|| {
                PlatformError::Authentication(
                    "Reddit client is not authenticated; call authenticate() first".to_string(),
                )
                .into()
            })
    }

    /// Send a request and remember any rate-limit headers on the response
    async fn send(&self, request: RequestBuilder, context: &str) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| PlatformError::Network(format!("{}: {}", context, e)))?;
        self.record_rate_limit(response.headers());
        Ok(response)
    }

    fn record_rate_limit(&self, headers: &HeaderMap) {
        if let Some(status) = parse_rate_limit(headers) {
            debug!(
                remaining = status.remaining,
                used = status.used,
                "Rate limit headers"
            );
            *self.rate_limit.lock().unwrap_or_else(PoisonError::into_inner) = Some(status);
        }
    }

    /// Upload an image through a media lease and return its hosted URL
    async fn upload_media(&self, path: &Path, destination: &str) -> Result<String> {
        let mime = ImageMimeType::from_path(path).ok_or_else(|| {
            PlatformError::Validation(format!("Unsupported image type: {}", path.display()))
        })?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("post_image")
            .to_string();

        let url = Self::endpoint(&self.api_base, "api/media/asset.json")?;
        let request = self
            .client
            .post(url)
            .bearer_auth(self.bearer()?)
            .form(&[("filepath", file_name.as_str()), ("mimetype", mime.as_str())]);
        let response = self
            .send(request, &format!("Image upload lease for r/{}", destination))
            .await?;
        let response = check_status(response, destination, "requesting an image upload lease")?;
        let lease: MediaLease = response.json().await.map_err(|e| {
            PlatformError::Submission(format!(
                "Unexpected upload lease response for r/{}: {}",
                destination, e
            ))
        })?;

        let action = if lease.args.action.starts_with("//") {
            format!("https:{}", lease.args.action)
        } else {
            lease.args.action
        };
        let key = lease
            .args
            .fields
            .iter()
            .find(|f| f.name == "key")
            .map(|f| f.value.clone())
            .ok_or_else(|| {
                PlatformError::Submission(format!(
                    "Upload lease for r/{} has no key field",
                    destination
                ))
            })?;

        let bytes = tokio::fs::read(path).await.map_err(|e| {
            PlatformError::Validation(format!("Could not read image {}: {}", path.display(), e))
        })?;
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime.as_str())
            .map_err(|e| PlatformError::Validation(format!("Invalid image MIME type: {}", e)))?;
        let form = lease
            .args
            .fields
            .into_iter()
            .fold(Form::new(), |form, field| form.text(field.name, field.value))
            .part("file", part);

        let upload = self
            .client
            .post(action.as_str())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                PlatformError::Network(format!("Image upload for r/{}: {}", destination, e))
            })?;
        if !upload.status().is_success() {
            return Err(PlatformError::Submission(format!(
                "Image upload failed for r/{}: HTTP {}",
                destination,
                upload.status()
            ))
            .into());
        }

        let hosted = format!("{}/{}", action.trim_end_matches('/'), key);
        debug!("Uploaded {} to {}", path.display(), hosted);
        Ok(hosted)
    }

    /// Find the post just created in `destination`, used when Reddit does not
    /// echo the id
    ///
    /// Only posts created at or after `since` qualify, so an earlier post in
    /// the same subreddit is never mistaken for this one. Image posts appear
    /// in the listing with a delay, hence the bounded retries.
    async fn latest_submission(
        &self,
        destination: &str,
        since: DateTime<Utc>,
    ) -> Result<SubmittedPost> {
        for attempt in 1..=self.lookup_attempts {
            if let Some(post) = self.find_new_submission(destination, since).await? {
                return Ok(post);
            }
            if attempt < self.lookup_attempts {
                debug!(
                    "New post in r/{} not listed yet (attempt {}/{})",
                    destination, attempt, self.lookup_attempts
                );
                tokio::time::sleep(self.lookup_interval).await;
            }
        }

        warn!("Post to r/{} was accepted but never appeared", destination);
        Err(PlatformError::Submission(format!(
            "Post to r/{} was accepted but could not be located",
            destination
        ))
        .into())
    }

    async fn find_new_submission(
        &self,
        destination: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<SubmittedPost>> {
        let mut url = Self::endpoint(
            &self.api_base,
            &format!("user/{}/submitted", self.credentials.username),
        )?;
        url.query_pairs_mut()
            .append_pair("limit", LOOKUP_LIMIT)
            .append_pair("sort", "new")
            .append_pair("raw_json", "1");

        let request = self.client.get(url).bearer_auth(self.bearer()?);
        let response = self
            .send(request, &format!("Locating new post in r/{}", destination))
            .await?;
        let response = check_status(response, destination, "locating the new post")?;
        let listing: Listing<ListedPost> = response.json().await.map_err(|e| {
            PlatformError::Submission(format!(
                "Unexpected listing while locating post in r/{}: {}",
                destination, e
            ))
        })?;

        Ok(listing
            .data
            .children
            .into_iter()
            .map(|thing| thing.data)
            .find(|post| post.is_new_in(destination, since))
            .map(|post| SubmittedPost {
                url: format!("{}{}", PERMALINK_BASE_URL, post.permalink),
                post_id: post.id,
            }))
    }
}

fn parse_base_url(base: &str) -> Result<Url> {
    let normalised = format!("{}/", base.trim_end_matches('/'));
    Url::parse(&normalised)
        .map_err(|e| ConfigError::Invalid(format!("invalid base URL '{}': {}", base, e)).into())
}

fn parse_rate_limit(headers: &HeaderMap) -> Option<RateLimitStatus> {
    let value = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    let remaining = value("x-ratelimit-remaining")?.trim().parse::<f64>().ok()?;
    let used = value("x-ratelimit-used")
        .and_then(|v| v.trim().parse::<f64>().ok())
        .map_or(0, |v| v as u64);
    let reset_seconds = value("x-ratelimit-reset")
        .and_then(|v| v.trim().parse::<f64>().ok())
        .map(|v| v as u64);

    Some(RateLimitStatus {
        remaining,
        used,
        reset_seconds,
    })
}

/// Map HTTP failures on a per-subreddit call to platform errors
fn check_status(response: Response, destination: &str, action: &str) -> Result<Response> {
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(PlatformError::RateLimit(format!(
            "Reddit rate limit hit while {} for r/{}",
            action, destination
        ))
        .into());
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(PlatformError::Submission(format!(
            "Reddit API error while {} for r/{}: HTTP {} (not allowed)",
            action, destination, status
        ))
        .into());
    }
    if !status.is_success() {
        return Err(PlatformError::Submission(format!(
            "Reddit API error while {} for r/{}: HTTP {}",
            action, destination, status
        ))
        .into());
    }
    Ok(response)
}

/// Render `[[CODE, message, field], ...]` as `CODE: message; ...`
fn format_api_errors(errors: &[Vec<serde_json::Value>]) -> String {
    errors
        .iter()
        .map(|entry| {
            let parts: Vec<&str> = entry
                .iter()
                .take(2)
                .filter_map(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .collect();
            parts.join(": ")
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[async_trait]
impl Platform for RedditClient {
    async fn authenticate(&mut self) -> Result<()> {
        debug!("Requesting Reddit token for {}", self.credentials.username);

        let url = Self::endpoint(&self.auth_base, "api/v1/access_token")?;
        let request = self
            .client
            .post(url)
            .basic_auth(
                &self.credentials.client_id,
                Some(self.credentials.client_secret.expose_secret()),
            )
            .form(&[
                ("grant_type", "password"),
                ("username", self.credentials.username.as_str()),
                ("password", self.credentials.password.expose_secret()),
            ]);
        let response = request.send().await.map_err(|e| {
            PlatformError::Authentication(format!("Could not reach Reddit token endpoint: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PlatformError::Authentication(format!(
                "Reddit token request rejected: HTTP {}",
                status
            ))
            .into());
        }

        let body: TokenResponse = response.json().await.map_err(|e| {
            PlatformError::Authentication(format!("Unexpected token response: {}", e))
        })?;
        if let Some(error) = body.error {
            return Err(PlatformError::Authentication(format!(
                "Reddit rejected credentials for {}: {}",
                self.credentials.username, error
            ))
            .into());
        }
        let token = body.access_token.ok_or_else(|| {
            PlatformError::Authentication("Token response has no access_token".to_string())
        })?;

        // Identity check
        let url = Self::endpoint(&self.api_base, "api/v1/me")?;
        let request = self.client.get(url).bearer_auth(&token);
        let response = self
            .send(request, "Verifying Reddit identity")
            .await
            .map_err(|e| PlatformError::Authentication(e.to_string()))?;
        if !response.status().is_success() {
            return Err(PlatformError::Authentication(format!(
                "Identity check failed: HTTP {}",
                response.status()
            ))
            .into());
        }
        let identity: Identity = response.json().await.map_err(|e| {
            PlatformError::Authentication(format!("Unexpected identity response: {}", e))
        })?;
        if !identity.name.eq_ignore_ascii_case(&self.credentials.username) {
            return Err(PlatformError::Authentication(format!(
                "Token belongs to '{}', expected '{}'",
                identity.name, self.credentials.username
            ))
            .into());
        }

        self.token = Some(SecretString::from(token));
        info!("Successfully authenticated as {}", identity.name);
        Ok(())
    }

    async fn submit(&self, submission: &Submission<'_>) -> Result<SubmittedPost> {
        let destination = submission.destination;
        let token = self.bearer()?;

        let mut form: Vec<(&str, String)> = vec![
            ("api_type", "json".to_string()),
            ("sr", destination.to_string()),
            ("title", submission.title.to_string()),
            ("text", submission.body.to_string()),
            ("resubmit", "true".to_string()),
            ("sendreplies", "true".to_string()),
        ];
        match submission.image {
            Some(image) => {
                let hosted = self.upload_media(image, destination).await?;
                form.push(("kind", "image".to_string()));
                form.push(("url", hosted));
            }
            None => form.push(("kind", "self".to_string())),
        }
        // Reddit treats an empty flair the same as none
        if let Some(flair) = submission.flair.filter(|f| !f.trim().is_empty()) {
            form.push(("flair_text", flair.to_string()));
        }

        let url = Self::endpoint(&self.api_base, "api/submit")?;
        let submitted_at = Utc::now();
        let request = self.client.post(url).bearer_auth(token).form(&form);
        let response = self
            .send(request, &format!("Posting to r/{}", destination))
            .await?;
        let response = check_status(response, destination, "posting")?;
        let body: SubmitResponse = response.json().await.map_err(|e| {
            PlatformError::Submission(format!(
                "Unexpected response posting to r/{}: {}",
                destination, e
            ))
        })?;

        if !body.json.errors.is_empty() {
            return Err(PlatformError::Submission(format!(
                "Reddit API error posting to r/{}: {}",
                destination,
                format_api_errors(&body.json.errors)
            ))
            .into());
        }

        let posted = match body.json.data {
            Some(SubmitData {
                id: Some(post_id),
                url: Some(url),
            }) => SubmittedPost { url, post_id },
            _ => self.latest_submission(destination, submitted_at).await?,
        };

        info!(
            "{} post submitted to r/{}: {}",
            submission.kind(),
            destination,
            posted.url
        );
        Ok(posted)
    }

    async fn post_stats(&self, post_id: &str) -> Result<EngagementStats> {
        let mut url = Self::endpoint(&self.api_base, "api/info")?;
        url.query_pairs_mut()
            .append_pair("id", &format!("t3_{}", post_id))
            .append_pair("raw_json", "1");

        let request = self.client.get(url).bearer_auth(self.bearer()?);
        let response = self
            .send(request, &format!("Fetching stats for {}", post_id))
            .await?;
        if !response.status().is_success() {
            return Err(PlatformError::Stats(format!(
                "Stats request for {} failed: HTTP {}",
                post_id,
                response.status()
            ))
            .into());
        }

        let listing: Listing<PostInfo> = response.json().await.map_err(|e| {
            PlatformError::Stats(format!("Unexpected stats response for {}: {}", post_id, e))
        })?;
        let info = listing
            .data
            .children
            .into_iter()
            .next()
            .map(|thing| thing.data)
            .ok_or_else(|| PlatformError::Stats(format!("Post {} not found", post_id)))?;

        Ok(EngagementStats {
            score: info.score,
            upvotes: info.ups,
            comments: info.num_comments,
            upvote_ratio: round1(info.upvote_ratio * 100.0),
        })
    }

    async fn rate_limit(&self) -> Result<RateLimitStatus> {
        let current = *self.rate_limit.lock().unwrap_or_else(PoisonError::into_inner);
        current.ok_or_else(|| {
            PlatformError::RateLimit("No rate limit headers received yet".to_string()).into()
        })
    }

    fn name(&self) -> &str {
        "reddit"
    }
}
