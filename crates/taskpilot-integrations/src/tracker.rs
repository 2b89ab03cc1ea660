//! Project-tracker REST client and demo fallback.

use async_trait::async_trait;
use chrono::{Duration, Local, NaiveDate};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use taskpilot_core::{config::TrackerConfig, IntegrationError};

use crate::types::{Priority, Sprint, TaskStatus, TrackerProject, TrackerTask};

/// Maximum number of name suggestions returned for a failed lookup.
const MAX_SUGGESTIONS: usize = 5;

/// Tracker operations the status and task tools depend on.
#[async_trait]
pub trait Tracker: Send + Sync {
    /// Find a project by exact key, falling back to fuzzy name match.
    async fn find_project(&self, identifier: &str)
        -> Result<Option<TrackerProject>, IntegrationError>;

    /// Active sprint for a project, if any.
    async fn active_sprint(&self, project_key: &str) -> Result<Option<Sprint>, IntegrationError>;

    /// Tasks for a project, optionally scoped to one sprint.
    async fn project_tasks(
        &self,
        project_key: &str,
        sprint_id: Option<u64>,
    ) -> Result<Vec<TrackerTask>, IntegrationError>;

    /// Project name suggestions for a search term (up to five).
    async fn project_suggestions(&self, term: &str) -> Vec<String>;

    /// Open tasks across projects, optionally for one assignee.
    async fn open_tasks(&self, assignee: Option<&str>)
        -> Result<Vec<TrackerTask>, IntegrationError>;
}

/// Jira-compatible REST tracker using basic auth.
pub struct RestTracker {
    client: Client,
    base_url: String,
    email: String,
    api_token: String,
}

impl RestTracker {
    /// Build from configuration; fails when the connection settings are incomplete.
    pub fn from_config(config: &TrackerConfig) -> Result<Self, IntegrationError> {
        let (Some(base_url), Some(email), Some(api_token)) = (
            config.resolve_base_url(),
            config.resolve_email(),
            config.resolve_api_token(),
        ) else {
            return Err(IntegrationError::NotConfigured {
                service: "tracker".to_string(),
                env_var: Some("TRACKER_API_TOKEN".to_string()),
            });
        };

        Ok(Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            email,
            api_token,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, IntegrationError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .basic_auth(&self.email, Some(&self.api_token))
            .query(query)
            .send()
            .await
            .map_err(|e| IntegrationError::NetworkError {
                service: "tracker".to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(IntegrationError::AuthenticationFailed {
                service: "tracker".to_string(),
                message: format!("status {}", status.as_u16()),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IntegrationError::api_error("tracker", status.as_u16(), body));
        }

        response
            .json()
            .await
            .map_err(|e| IntegrationError::api_error("tracker", status.as_u16(), e.to_string()))
    }

    async fn all_projects(&self) -> Result<Vec<TrackerProject>, IntegrationError> {
        let page: ProjectPage = self
            .get_json("/rest/api/3/project/search", &[("maxResults", "200")])
            .await?;
        Ok(page
            .values
            .into_iter()
            .map(|p| TrackerProject {
                id: p.id,
                key: p.key,
                name: p.name,
            })
            .collect())
    }
}

#[async_trait]
impl Tracker for RestTracker {
    #[instrument(skip(self))]
    async fn find_project(
        &self,
        identifier: &str,
    ) -> Result<Option<TrackerProject>, IntegrationError> {
        // Exact key match first
        match self
            .get_json::<RawProject>(&format!("/rest/api/3/project/{}", identifier), &[])
            .await
        {
            Ok(p) => {
                return Ok(Some(TrackerProject {
                    id: p.id,
                    key: p.key,
                    name: p.name,
                }))
            }
            Err(IntegrationError::ApiError { status: 404, .. }) => {}
            Err(e @ IntegrationError::AuthenticationFailed { .. }) => return Err(e),
            Err(e @ IntegrationError::NetworkError { .. }) => return Err(e),
            Err(e) => {
                debug!("exact project lookup failed: {e}");
            }
        }

        // Fuzzy match on name
        let needle = identifier.to_lowercase();
        let projects = self.all_projects().await?;
        Ok(projects
            .into_iter()
            .find(|p| p.name.to_lowercase().contains(&needle)))
    }

    #[instrument(skip(self))]
    async fn active_sprint(&self, project_key: &str) -> Result<Option<Sprint>, IntegrationError> {
        let boards: ValuePage<RawBoard> = match self
            .get_json("/rest/agile/1.0/board", &[("projectKeyOrId", project_key)])
            .await
        {
            Ok(b) => b,
            Err(e) => {
                warn!("could not list boards: {e}");
                return Ok(None);
            }
        };

        let Some(board) = boards.values.first() else {
            return Ok(None);
        };

        let sprints: ValuePage<RawSprint> = match self
            .get_json(
                &format!("/rest/agile/1.0/board/{}/sprint", board.id),
                &[("state", "active")],
            )
            .await
        {
            Ok(s) => s,
            Err(e) => {
                warn!("could not list sprints: {e}");
                return Ok(None);
            }
        };

        Ok(sprints.values.into_iter().next().map(|s| Sprint {
            id: s.id,
            name: s.name,
            state: s.state,
            start_date: s.start_date,
            end_date: s.end_date,
        }))
    }

    #[instrument(skip(self))]
    async fn project_tasks(
        &self,
        project_key: &str,
        sprint_id: Option<u64>,
    ) -> Result<Vec<TrackerTask>, IntegrationError> {
        let mut jql = format!("project = {}", project_key);
        if let Some(id) = sprint_id {
            jql.push_str(&format!(" AND sprint = {}", id));
        }

        let page: IssuePage = self
            .get_json(
                "/rest/api/3/search",
                &[
                    ("jql", jql.as_str()),
                    ("maxResults", "1000"),
                    (
                        "fields",
                        "summary,status,priority,assignee,duedate,created,labels,customfield_10016",
                    ),
                ],
            )
            .await?;

        Ok(page
            .issues
            .into_iter()
            .map(|issue| issue.into_task(project_key))
            .collect())
    }

    async fn project_suggestions(&self, term: &str) -> Vec<String> {
        let needle = term.to_lowercase();
        match self.all_projects().await {
            Ok(projects) => projects
                .into_iter()
                .filter(|p| p.name.to_lowercase().contains(&needle))
                .map(|p| p.name)
                .take(MAX_SUGGESTIONS)
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    #[instrument(skip(self))]
    async fn open_tasks(
        &self,
        assignee: Option<&str>,
    ) -> Result<Vec<TrackerTask>, IntegrationError> {
        let jql = match assignee {
            Some(email) => format!("assignee = \"{}\" AND statusCategory != Done", email),
            None => "assignee = currentUser() AND statusCategory != Done".to_string(),
        };

        let page: IssuePage = self
            .get_json(
                "/rest/api/3/search",
                &[
                    ("jql", jql.as_str()),
                    ("maxResults", "200"),
                    (
                        "fields",
                        "summary,status,priority,assignee,duedate,created,labels,customfield_10016,project",
                    ),
                ],
            )
            .await?;

        Ok(page
            .issues
            .into_iter()
            .map(|issue| {
                let project = issue
                    .fields
                    .project
                    .as_ref()
                    .map(|p| p.name.clone())
                    .unwrap_or_default();
                issue.into_task(&project)
            })
            .collect())
    }
}

// Jira wire types

#[derive(Deserialize)]
struct RawProject {
    id: String,
    key: String,
    name: String,
}

#[derive(Deserialize)]
struct ProjectPage {
    #[serde(default)]
    values: Vec<RawProject>,
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct ValuePage<T> {
    #[serde(default)]
    values: Vec<T>,
}

#[derive(Deserialize)]
struct RawBoard {
    id: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSprint {
    id: u64,
    name: String,
    state: String,
    start_date: Option<String>,
    end_date: Option<String>,
}

#[derive(Deserialize)]
struct IssuePage {
    #[serde(default)]
    issues: Vec<RawIssue>,
}

#[derive(Deserialize)]
struct RawIssue {
    key: String,
    fields: RawFields,
}

#[derive(Deserialize)]
struct RawFields {
    summary: String,
    status: Option<NamedField>,
    priority: Option<NamedField>,
    assignee: Option<RawAssignee>,
    duedate: Option<NaiveDate>,
    created: Option<String>,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(rename = "customfield_10016")]
    story_points: Option<f64>,
    project: Option<NamedField>,
}

#[derive(Deserialize)]
struct NamedField {
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAssignee {
    display_name: Option<String>,
}

impl RawIssue {
    fn into_task(self, project: &str) -> TrackerTask {
        let status_name = self
            .fields
            .status
            .as_ref()
            .map(|s| s.name.to_lowercase())
            .unwrap_or_default();
        let status = match status_name.as_str() {
            "done" | "closed" | "resolved" => TaskStatus::Done,
            "in progress" => TaskStatus::InProgress,
            "blocked" => TaskStatus::Blocked,
            _ => TaskStatus::Todo,
        };

        let priority = self
            .fields
            .priority
            .as_ref()
            .map(|p| Priority::from_tracker_name(&p.name))
            .unwrap_or(Priority::Low);

        let created_date = self
            .fields
            .created
            .as_deref()
            .and_then(|s| s.get(..10))
            .and_then(|s| s.parse().ok());

        TrackerTask {
            id: self.key,
            title: self.fields.summary,
            project: project.to_string(),
            status,
            priority,
            due_date: self.fields.duedate,
            created_date,
            estimated_hours: None,
            story_points: self.fields.story_points.map(|p| p as u32),
            labels: self.fields.labels,
            assignee: self.fields.assignee.and_then(|a| a.display_name),
            blocked: status == TaskStatus::Blocked,
            blocker_reason: None,
        }
    }
}

/// Canned tracker data for demo mode: two projects and six open tasks.
pub struct DemoTracker;

impl DemoTracker {
    fn projects() -> Vec<TrackerProject> {
        vec![
            TrackerProject {
                id: "10001".to_string(),
                key: "PHOE".to_string(),
                name: "Phoenix".to_string(),
            },
            TrackerProject {
                id: "10002".to_string(),
                key: "ATLS".to_string(),
                name: "Atlas".to_string(),
            },
        ]
    }

    /// The demo task set, with due dates relative to today.
    pub fn sample_tasks(assignee: &str) -> Vec<TrackerTask> {
        let today = Local::now().date_naive();
        let task = |id: &str,
                    title: &str,
                    project: &str,
                    status: TaskStatus,
                    priority: Priority,
                    due: NaiveDate,
                    created_days_ago: i64,
                    hours: f64,
                    points: u32,
                    labels: &[&str]| TrackerTask {
            id: id.to_string(),
            title: title.to_string(),
            project: project.to_string(),
            status,
            priority,
            due_date: Some(due),
            created_date: Some(today - Duration::days(created_days_ago)),
            estimated_hours: Some(hours),
            story_points: Some(points),
            labels: labels.iter().map(|l| l.to_string()).collect(),
            assignee: Some(assignee.to_string()),
            blocked: false,
            blocker_reason: None,
        };

        let mut tasks = vec![
            task(
                "PHOE-178",
                "Review API spec for payment integration",
                "Phoenix",
                TaskStatus::Todo,
                Priority::High,
                today,
                3,
                2.0,
                5,
                &["review", "api", "critical-path"],
            ),
            task(
                "PHOE-145",
                "Follow up on vendor API key delay",
                "Phoenix",
                TaskStatus::InProgress,
                Priority::Critical,
                today + Duration::days(1),
                8,
                1.0,
                3,
                &["blocker", "external-dependency"],
            ),
            task(
                "PHOE-189",
                "Prepare sprint demo slides",
                "Phoenix",
                TaskStatus::Todo,
                Priority::Medium,
                today + Duration::days(4),
                2,
                1.5,
                3,
                &["demo", "presentation"],
            ),
            task(
                "ATLS-234",
                "Review Q1 roadmap with Atlas team",
                "Atlas",
                TaskStatus::Todo,
                Priority::High,
                today + Duration::days(3),
                5,
                2.0,
                5,
                &["planning", "roadmap"],
            ),
            task(
                "ATLS-245",
                "Approve design mockups for Atlas v2",
                "Atlas",
                TaskStatus::InProgress,
                Priority::Medium,
                today + Duration::days(7),
                1,
                1.0,
                2,
                &["design", "approval"],
            ),
            task(
                "PHOE-201",
                "Update user documentation for new payment flow",
                "Phoenix",
                TaskStatus::Todo,
                Priority::Low,
                today + Duration::days(7),
                0,
                3.0,
                5,
                &["documentation"],
            ),
        ];

        tasks[1].blocked = true;
        tasks[1].blocker_reason = Some("Waiting on vendor response".to_string());
        tasks
    }
}

#[async_trait]
impl Tracker for DemoTracker {
    async fn find_project(
        &self,
        identifier: &str,
    ) -> Result<Option<TrackerProject>, IntegrationError> {
        let needle = identifier.to_lowercase();
        Ok(Self::projects().into_iter().find(|p| {
            p.key.eq_ignore_ascii_case(identifier) || p.name.to_lowercase().contains(&needle)
        }))
    }

    async fn active_sprint(&self, project_key: &str) -> Result<Option<Sprint>, IntegrationError> {
        if project_key != "PHOE" {
            return Ok(None);
        }
        let today = Local::now().date_naive();
        Ok(Some(Sprint {
            id: 14,
            name: "Phoenix Sprint 14".to_string(),
            state: "active".to_string(),
            start_date: Some((today - Duration::days(7)).to_string()),
            end_date: Some((today + Duration::days(7)).to_string()),
        }))
    }

    async fn project_tasks(
        &self,
        project_key: &str,
        _sprint_id: Option<u64>,
    ) -> Result<Vec<TrackerTask>, IntegrationError> {
        let project = match project_key {
            "PHOE" => "Phoenix",
            "ATLS" => "Atlas",
            other => other,
        };
        Ok(Self::sample_tasks("john.doe@company.com")
            .into_iter()
            .filter(|t| t.project == project)
            .collect())
    }

    async fn project_suggestions(&self, term: &str) -> Vec<String> {
        let needle = term.to_lowercase();
        Self::projects()
            .into_iter()
            .filter(|p| p.name.to_lowercase().contains(&needle))
            .map(|p| p.name)
            .take(MAX_SUGGESTIONS)
            .collect()
    }

    async fn open_tasks(
        &self,
        assignee: Option<&str>,
    ) -> Result<Vec<TrackerTask>, IntegrationError> {
        Ok(Self::sample_tasks(assignee.unwrap_or("john.doe@company.com")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_demo_find_project_by_key_and_name() {
        let tracker = DemoTracker;
        let by_key = tracker.find_project("PHOE").await.unwrap();
        assert_eq!(by_key.unwrap().name, "Phoenix");

        let by_name = tracker.find_project("phoenix").await.unwrap();
        assert_eq!(by_name.unwrap().key, "PHOE");

        let missing = tracker.find_project("Zephyr").await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_demo_suggestions_are_capped() {
        let tracker = DemoTracker;
        let suggestions = tracker.project_suggestions("a").await;
        assert!(suggestions.len() <= MAX_SUGGESTIONS);
        assert!(suggestions.contains(&"Atlas".to_string()));
    }

    #[tokio::test]
    async fn test_demo_project_tasks_filters_by_project() {
        let tracker = DemoTracker;
        let phoenix = tracker.project_tasks("PHOE", None).await.unwrap();
        assert_eq!(phoenix.len(), 4);
        assert!(phoenix.iter().all(|t| t.project == "Phoenix"));

        let atlas = tracker.project_tasks("ATLS", None).await.unwrap();
        assert_eq!(atlas.len(), 2);
    }

    #[tokio::test]
    async fn test_demo_open_tasks_marks_the_blocker() {
        let tracker = DemoTracker;
        let tasks = tracker.open_tasks(None).await.unwrap();
        assert_eq!(tasks.len(), 6);
        let blocked: Vec<_> = tasks.iter().filter(|t| t.is_blocked()).collect();
        assert_eq!(blocked.len(), 1);
        assert_eq!(blocked[0].id, "PHOE-145");
    }

    #[test]
    fn test_rest_tracker_requires_full_config() {
        let config = TrackerConfig::default();
        // Only run the negative check when the environment has no tracker vars.
        if std::env::var("TRACKER_URL").is_err() {
            assert!(RestTracker::from_config(&config).is_err());
        }
    }
}
