//! GitHub public events.
//!
//! Only a handful of event types are interesting on a personal timeline;
//! everything else is dropped during mapping.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use folio_core::{ActivityItem, ActivityMetadata, ActivitySource, ActivityVerb};
use regex::Regex;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::error::FeedError;
use crate::http::{build_client, check_status, decode_json, join, parse_base_url, HttpConfig};
use crate::retry::retry_with_backoff;

const DEFAULT_BASE_URL: &str = "https://api.github.com/";
const WEB_URL: &str = "https://github.com";
const PER_PAGE: &str = "100";

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9-]{1,39}$").expect("valid regex"));

#[derive(Debug, Clone, Deserialize)]
pub struct GithubEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub repo: GithubRepo,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubRepo {
    /// `owner/name`.
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct PushPayload {
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    commits: Vec<serde_json::Value>,
    #[serde(default)]
    head: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatePayload {
    #[serde(rename = "ref")]
    git_ref: Option<String>,
    ref_type: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReleasePayload {
    release: Release,
}

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
    #[serde(default)]
    name: Option<String>,
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct PullRequestPayload {
    action: String,
    number: u64,
    pull_request: PullRequest,
}

#[derive(Debug, Deserialize)]
struct PullRequest {
    title: String,
    html_url: String,
    #[serde(default)]
    merged: bool,
}

#[derive(Debug, Deserialize)]
struct IssuesPayload {
    action: String,
    issue: Issue,
}

#[derive(Debug, Deserialize)]
struct Issue {
    number: u64,
    title: String,
    html_url: String,
}

fn payload<T: for<'de> Deserialize<'de>>(event: &GithubEvent) -> Option<T> {
    match serde_json::from_value(event.payload.clone()) {
        Ok(p) => Some(p),
        Err(e) => {
            tracing::debug!(
                id = %event.id,
                kind = %event.kind,
                error = %e,
                "skipping malformed event payload"
            );
            None
        }
    }
}

impl GithubEvent {
    fn repo_url(&self) -> String {
        format!("{WEB_URL}/{}", self.repo.name)
    }

    fn activity(&self, verb: ActivityVerb, title: String, href: String) -> ActivityItem {
        ActivityItem {
            id: format!("github:{}", self.id),
            source: ActivitySource::Github,
            verb,
            title,
            description: None,
            href,
            timestamp: self.created_at,
            metadata: ActivityMetadata::default(),
        }
    }

    /// Map to a timeline entry. Unhandled event types and actions (closing
    /// an issue, forking, comments) return `None`.
    #[must_use]
    pub fn into_activity(self) -> Option<ActivityItem> {
        let repo = self.repo.name.as_str();
        match self.kind.as_str() {
            "PushEvent" => {
                let p: PushPayload = payload(&self)?;
                let commits = p
                    .size
                    .unwrap_or_else(|| u64::try_from(p.commits.len()).unwrap_or(u64::MAX));
                let noun = if commits == 1 { "commit" } else { "commits" };
                let href = p.head.as_deref().map_or_else(
                    || self.repo_url(),
                    |sha| format!("{WEB_URL}/{repo}/commit/{sha}"),
                );
                let mut item = self.activity(
                    ActivityVerb::Pushed,
                    format!("Pushed {commits} {noun} to {repo}"),
                    href,
                );
                item.metadata.thread_key = Some(self.repo.name.clone());
                Some(item)
            }
            "CreateEvent" => {
                let p: CreatePayload = payload(&self)?;
                let title = match (p.ref_type.as_str(), p.git_ref.as_deref()) {
                    ("repository", _) | (_, None) => format!("Created repository {repo}"),
                    (kind, Some(name)) => format!("Created {kind} {name} in {repo}"),
                };
                let mut item = self.activity(ActivityVerb::Created, title, self.repo_url());
                item.description = p.description.filter(|d| !d.trim().is_empty());
                Some(item)
            }
            "ReleaseEvent" => {
                let p: ReleasePayload = payload(&self)?;
                let name = p
                    .release
                    .name
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or(p.release.tag_name);
                Some(self.activity(
                    ActivityVerb::Released,
                    format!("Released {name} of {repo}"),
                    p.release.html_url,
                ))
            }
            "WatchEvent" => Some(self.activity(
                ActivityVerb::Starred,
                format!("Starred {repo}"),
                self.repo_url(),
            )),
            "PullRequestEvent" => {
                let p: PullRequestPayload = payload(&self)?;
                let verb = match p.action.as_str() {
                    "opened" => ActivityVerb::Opened,
                    "closed" if p.pull_request.merged => ActivityVerb::Merged,
                    _ => return None,
                };
                let label = if verb == ActivityVerb::Merged { "Merged" } else { "Opened" };
                Some(self.activity(
                    verb,
                    format!("{label} PR #{} in {repo}: {}", p.number, p.pull_request.title),
                    p.pull_request.html_url,
                ))
            }
            "IssuesEvent" => {
                let p: IssuesPayload = payload(&self)?;
                if p.action != "opened" {
                    return None;
                }
                Some(self.activity(
                    ActivityVerb::Opened,
                    format!("Opened issue #{} in {repo}: {}", p.issue.number, p.issue.title),
                    p.issue.html_url,
                ))
            }
            _ => None,
        }
    }
}

/// Client for the GitHub REST API.
pub struct GithubClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
    config: HttpConfig,
}

impl GithubClient {
    /// # Errors
    ///
    /// Returns [`FeedError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(config: HttpConfig, token: Option<String>) -> Result<Self, FeedError> {
        Self::with_base_url(config, token, DEFAULT_BASE_URL)
    }

    /// # Errors
    ///
    /// Returns [`FeedError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`FeedError::InvalidInput`] if `base_url` does not parse.
    pub fn with_base_url(
        config: HttpConfig,
        token: Option<String>,
        base_url: &str,
    ) -> Result<Self, FeedError> {
        Ok(Self {
            client: build_client(&config)?,
            base_url: parse_base_url(base_url)?,
            token: token.filter(|t| !t.trim().is_empty()),
            config,
        })
    }

    /// Raw public events for `username`, as GitHub returns them.
    ///
    /// # Errors
    ///
    /// [`FeedError::InvalidInput`] for a malformed username (no request is
    /// sent); otherwise the status-mapped errors of the shared client.
    pub async fn fetch_public_events(&self, username: &str) -> Result<Vec<GithubEvent>, FeedError> {
        if !USERNAME_RE.is_match(username) {
            return Err(FeedError::InvalidInput {
                field: "username",
                reason: format!("'{username}' must match [A-Za-z0-9-]{{1,39}}"),
            });
        }

        let mut url = join(&self.base_url, &format!("users/{username}/events/public"))?;
        url.query_pairs_mut().append_pair("per_page", PER_PAGE);
        let context = format!("events(username={username})");
        let (url, context) = (&url, context.as_str());

        let events = retry_with_backoff(
            self.config.max_retries,
            self.config.backoff_base_ms,
            || async move {
                let mut request = self
                    .client
                    .get(url.clone())
                    .header(reqwest::header::ACCEPT, "application/vnd.github+json");
                if let Some(token) = self.token.as_deref() {
                    request = request.bearer_auth(token);
                }
                let response = check_status(request.send().await?, url)?;
                decode_json::<Vec<GithubEvent>>(response, context).await
            },
        )
        .await?;

        tracing::debug!(username, count = events.len(), "fetched github events");
        Ok(events)
    }

    /// Public events mapped to activities, dropping uninteresting ones.
    ///
    /// # Errors
    ///
    /// As [`Self::fetch_public_events`].
    pub async fn fetch_activities(&self, username: &str) -> Result<Vec<ActivityItem>, FeedError> {
        let events = self.fetch_public_events(username).await?;
        Ok(events
            .into_iter()
            .filter_map(GithubEvent::into_activity)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: &str, payload: serde_json::Value) -> GithubEvent {
        serde_json::from_value(serde_json::json!({
            "id": "1001",
            "type": kind,
            "repo": { "name": "octo/widgets" },
            "payload": payload,
            "created_at": "2025-02-01T10:00:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn push_event_threads_by_repo() {
        let item = event(
            "PushEvent",
            serde_json::json!({ "size": 3, "head": "abc123", "commits": [] }),
        )
        .into_activity()
        .unwrap();
        assert_eq!(item.id, "github:1001");
        assert_eq!(item.verb, ActivityVerb::Pushed);
        assert_eq!(item.title, "Pushed 3 commits to octo/widgets");
        assert_eq!(item.href, "https://github.com/octo/widgets/commit/abc123");
        assert_eq!(item.metadata.thread_key.as_deref(), Some("octo/widgets"));
    }

    #[test]
    fn single_commit_push_is_singular() {
        let item = event("PushEvent", serde_json::json!({ "commits": [{}] }))
            .into_activity()
            .unwrap();
        assert_eq!(item.title, "Pushed 1 commit to octo/widgets");
        assert_eq!(item.href, "https://github.com/octo/widgets");
    }

    #[test]
    fn create_release_and_star() {
        let created = event(
            "CreateEvent",
            serde_json::json!({ "ref": null, "ref_type": "repository", "description": "Widgets!" }),
        )
        .into_activity()
        .unwrap();
        assert_eq!(created.verb, ActivityVerb::Created);
        assert_eq!(created.title, "Created repository octo/widgets");
        assert_eq!(created.description.as_deref(), Some("Widgets!"));

        let tag = event(
            "CreateEvent",
            serde_json::json!({ "ref": "v1.0", "ref_type": "tag" }),
        )
        .into_activity()
        .unwrap();
        assert_eq!(tag.title, "Created tag v1.0 in octo/widgets");

        let release = event(
            "ReleaseEvent",
            serde_json::json!({ "action": "published", "release": {
                "tag_name": "v1.0", "name": "", "html_url": "https://github.com/octo/widgets/releases/v1.0"
            }}),
        )
        .into_activity()
        .unwrap();
        assert_eq!(release.verb, ActivityVerb::Released);
        assert_eq!(release.title, "Released v1.0 of octo/widgets");

        let star = event("WatchEvent", serde_json::json!({ "action": "started" }))
            .into_activity()
            .unwrap();
        assert_eq!(star.verb, ActivityVerb::Starred);
    }

    #[test]
    fn pull_requests_only_opened_or_merged() {
        let pr = |action: &str, merged: bool| {
            event(
                "PullRequestEvent",
                serde_json::json!({
                    "action": action,
                    "number": 7,
                    "pull_request": {
                        "title": "Fix it",
                        "html_url": "https://github.com/octo/widgets/pull/7",
                        "merged": merged
                    }
                }),
            )
            .into_activity()
        };
        assert_eq!(pr("opened", false).unwrap().verb, ActivityVerb::Opened);
        let merged = pr("closed", true).unwrap();
        assert_eq!(merged.verb, ActivityVerb::Merged);
        assert_eq!(merged.title, "Merged PR #7 in octo/widgets: Fix it");
        assert!(pr("closed", false).is_none());
        assert!(pr("reopened", false).is_none());
    }

    #[test]
    fn issues_and_unknown_events() {
        let issue = |action: &str| {
            event(
                "IssuesEvent",
                serde_json::json!({
                    "action": action,
                    "issue": { "number": 3, "title": "Bug", "html_url": "https://github.com/octo/widgets/issues/3" }
                }),
            )
            .into_activity()
        };
        assert_eq!(issue("opened").unwrap().verb, ActivityVerb::Opened);
        assert!(issue("closed").is_none());
        assert!(event("ForkEvent", serde_json::json!({})).into_activity().is_none());
        assert!(event("ReleaseEvent", serde_json::json!({})).into_activity().is_none());
    }
}
