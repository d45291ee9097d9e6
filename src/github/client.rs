use super::{
    CreatedItem, GithubApi, GithubError, IssueAuthor, IssueAuthorLookup, IssuePatch,
    NewDiscussion, NewIssue, NewProject, NewProjectStatusUpdate, NewPullRequest, NewReview,
    Release,
};
use crate::targeting::RepoSlug;
use serde::Deserialize;
use serde_json::{json, Value};

const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("safe-outputs/", env!("CARGO_PKG_VERSION"));

/// REST and GraphQL client authenticated with a workflow token.
#[derive(Debug, Clone)]
pub struct GithubClient {
    api_base: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct IssueResponse {
    html_url: String,
    number: u64,
    #[serde(default)]
    user: Option<UserResponse>,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    login: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommentResponse {
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct PullRequestResponse {
    html_url: String,
    number: u64,
    head: HeadResponse,
}

#[derive(Debug, Deserialize)]
struct HeadResponse {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ReleaseResponse {
    id: u64,
    tag_name: String,
    #[serde(default)]
    body: Option<String>,
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct ReviewResponse {
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct GraphQlEnvelope {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlErrorMessage>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorMessage {
    message: String,
}

impl GithubClient {
    /// The API base honors `SAFE_OUTPUTS_GITHUB_API_URL` so tests and GHES hosts can
    /// point elsewhere.
    pub fn new(token: String) -> Self {
        let api_base = std::env::var("SAFE_OUTPUTS_GITHUB_API_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_GITHUB_API_BASE.to_string());
        Self::with_api_base(api_base, token)
    }

    pub fn with_api_base(api_base: String, token: String) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Reads the token from `GITHUB_TOKEN`, then `GH_TOKEN`.
    pub fn from_env() -> Result<Self, GithubError> {
        let token = ["GITHUB_TOKEN", "GH_TOKEN"]
            .into_iter()
            .find_map(|key| std::env::var(key).ok().filter(|value| !value.trim().is_empty()))
            .ok_or_else(|| {
                GithubError::Request("set GITHUB_TOKEN or GH_TOKEN to dispatch".to_string())
            })?;
        Ok(Self::new(token))
    }

    fn repo_endpoint(&self, repo: &RepoSlug, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base,
            urlencoding::encode(&repo.owner),
            urlencoding::encode(&repo.repo),
            path
        )
    }

    fn request(&self, method: &str, url: &str) -> ureq::Request {
        ureq::request(method, url)
            .set("accept", "application/vnd.github+json")
            .set("user-agent", USER_AGENT)
            .set("x-github-api-version", "2022-11-28")
            .set("authorization", &format!("Bearer {}", self.token))
    }

    fn send<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        url: &str,
        body: Option<Value>,
    ) -> Result<T, GithubError> {
        let request = self.request(method, url);
        let result = match body {
            Some(body) => request.send_json(body),
            None => request.call(),
        };
        let response = match result {
            Ok(response) => response,
            Err(ureq::Error::Status(404, _)) => {
                return Err(GithubError::NotFound(url.to_string()))
            }
            Err(ureq::Error::Status(status, response)) => {
                let message = response
                    .into_string()
                    .unwrap_or_else(|err| format!("<unreadable body: {err}>"));
                return Err(GithubError::Status {
                    status,
                    url: url.to_string(),
                    message,
                });
            }
            Err(err) => return Err(GithubError::Request(format!("{url}: {err}"))),
        };
        response
            .into_json::<T>()
            .map_err(|err| GithubError::Response(format!("{url}: {err}")))
    }

    fn graphql(&self, query: &str, variables: Value) -> Result<Value, GithubError> {
        let url = format!("{}/graphql", self.api_base);
        let envelope: GraphQlEnvelope = self.send(
            "POST",
            &url,
            Some(json!({"query": query, "variables": variables})),
        )?;
        if !envelope.errors.is_empty() {
            return Err(GithubError::GraphQl(
                envelope
                    .errors
                    .into_iter()
                    .map(|error| error.message)
                    .collect::<Vec<_>>()
                    .join("; "),
            ));
        }
        envelope
            .data
            .ok_or_else(|| GithubError::Response("graphql response had no data".to_string()))
    }

    fn repository_owner_id(&self, login: &str) -> Result<String, GithubError> {
        let data = self.graphql(
            "query($login: String!) { repositoryOwner(login: $login) { id } }",
            json!({"login": login}),
        )?;
        string_at(&data, "/repositoryOwner/id")
            .ok_or_else(|| GithubError::NotFound(format!("owner `{login}`")))
    }

    fn project_id(&self, project_url: &str) -> Result<String, GithubError> {
        let (scope, login, number) = parse_project_url(project_url).ok_or_else(|| {
            GithubError::Response(format!(
                "`{project_url}` is not a project url like https://github.com/orgs/<org>/projects/<n>"
            ))
        })?;
        let root = if scope == "orgs" { "organization" } else { "user" };
        let query = format!(
            "query($login: String!, $number: Int!) {{ {root}(login: $login) {{ projectV2(number: $number) {{ id }} }} }}"
        );
        let data = self.graphql(&query, json!({"login": login, "number": number}))?;
        string_at(&data, &format!("/{root}/projectV2/id"))
            .ok_or_else(|| GithubError::NotFound(format!("project `{project_url}`")))
    }
}

fn string_at(value: &Value, pointer: &str) -> Option<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// `https://<host>/(orgs|users)/<login>/projects/<number>[/...]`.
fn parse_project_url(url: &str) -> Option<(&str, &str, u64)> {
    let rest = url.split_once("://")?.1;
    let mut segments = rest.split('/').skip(1);
    let scope = segments.next().filter(|scope| matches!(*scope, "orgs" | "users"))?;
    let login = segments.next().filter(|login| !login.is_empty())?;
    if segments.next()? != "projects" {
        return None;
    }
    let number = segments.next()?.parse::<u64>().ok()?;
    Some((scope, login, number))
}

impl IssueAuthorLookup for GithubClient {
    fn lookup_issue_author(
        &self,
        repo: &RepoSlug,
        number: u64,
    ) -> Result<Option<IssueAuthor>, GithubError> {
        let url = self.repo_endpoint(repo, &format!("issues/{number}"));
        match self.send::<IssueResponse>("GET", &url, None) {
            Ok(issue) => Ok(issue.user.map(|user| IssueAuthor {
                is_bot: user.kind.as_deref() == Some("Bot"),
                login: user.login,
            })),
            Err(GithubError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

impl GithubApi for GithubClient {
    fn create_issue(&self, repo: &RepoSlug, issue: &NewIssue) -> Result<CreatedItem, GithubError> {
        let body = serde_json::to_value(issue).map_err(|err| GithubError::Request(err.to_string()))?;
        let created: IssueResponse =
            self.send("POST", &self.repo_endpoint(repo, "issues"), Some(body))?;
        Ok(CreatedItem {
            url: created.html_url,
            number: Some(created.number),
        })
    }

    fn add_comment(
        &self,
        repo: &RepoSlug,
        number: u64,
        body: &str,
    ) -> Result<CreatedItem, GithubError> {
        let url = self.repo_endpoint(repo, &format!("issues/{number}/comments"));
        let created: CommentResponse = self.send("POST", &url, Some(json!({"body": body})))?;
        Ok(CreatedItem {
            url: created.html_url,
            number: Some(number),
        })
    }

    fn update_issue(
        &self,
        repo: &RepoSlug,
        number: u64,
        patch: &IssuePatch,
    ) -> Result<CreatedItem, GithubError> {
        let url = self.repo_endpoint(repo, &format!("issues/{number}"));
        let body = serde_json::to_value(patch).map_err(|err| GithubError::Request(err.to_string()))?;
        let updated: IssueResponse = self.send("PATCH", &url, Some(body))?;
        Ok(CreatedItem {
            url: updated.html_url,
            number: Some(updated.number),
        })
    }

    fn add_labels(
        &self,
        repo: &RepoSlug,
        number: u64,
        labels: &[String],
    ) -> Result<(), GithubError> {
        let url = self.repo_endpoint(repo, &format!("issues/{number}/labels"));
        let _: Value = self.send("POST", &url, Some(json!({"labels": labels})))?;
        Ok(())
    }

    fn create_pull_request(
        &self,
        repo: &RepoSlug,
        pull_request: &NewPullRequest,
    ) -> Result<CreatedItem, GithubError> {
        let body = serde_json::to_value(pull_request)
            .map_err(|err| GithubError::Request(err.to_string()))?;
        let created: PullRequestResponse =
            self.send("POST", &self.repo_endpoint(repo, "pulls"), Some(body))?;
        if !pull_request.labels.is_empty() {
            self.add_labels(repo, created.number, &pull_request.labels)?;
        }
        Ok(CreatedItem {
            url: created.html_url,
            number: Some(created.number),
        })
    }

    fn pull_request_head_sha(&self, repo: &RepoSlug, number: u64) -> Result<String, GithubError> {
        let url = self.repo_endpoint(repo, &format!("pulls/{number}"));
        let pull_request: PullRequestResponse = self.send("GET", &url, None)?;
        Ok(pull_request.head.sha)
    }

    fn release_by_tag(&self, repo: &RepoSlug, tag: &str) -> Result<Release, GithubError> {
        let url = self.repo_endpoint(
            repo,
            &format!("releases/tags/{}", urlencoding::encode(tag)),
        );
        let release: ReleaseResponse = self.send("GET", &url, None)?;
        Ok(Release {
            id: release.id,
            tag: release.tag_name,
            body: release.body.unwrap_or_default(),
            url: release.html_url,
        })
    }

    fn update_release_body(
        &self,
        repo: &RepoSlug,
        release_id: u64,
        body: &str,
    ) -> Result<CreatedItem, GithubError> {
        let url = self.repo_endpoint(repo, &format!("releases/{release_id}"));
        let release: ReleaseResponse = self.send("PATCH", &url, Some(json!({"body": body})))?;
        Ok(CreatedItem {
            url: release.html_url,
            number: None,
        })
    }

    fn create_discussion(
        &self,
        repo: &RepoSlug,
        discussion: &NewDiscussion,
    ) -> Result<CreatedItem, GithubError> {
        let data = self.graphql(
            "query($owner: String!, $name: String!) { repository(owner: $owner, name: $name) { id discussionCategories(first: 25) { nodes { id name slug } } } }",
            json!({"owner": repo.owner, "name": repo.repo}),
        )?;
        let repository_id = string_at(&data, "/repository/id")
            .ok_or_else(|| GithubError::NotFound(format!("repository `{repo}`")))?;
        let categories = data
            .pointer("/repository/discussionCategories/nodes")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let category = match &discussion.category {
            Some(wanted) => categories.iter().find(|node| {
                ["name", "slug"].iter().any(|key| {
                    node.get(*key)
                        .and_then(Value::as_str)
                        .is_some_and(|value| value.eq_ignore_ascii_case(wanted))
                })
            }),
            None => categories.first(),
        };
        let category_id = category
            .and_then(|node| string_at(node, "/id"))
            .ok_or_else(|| {
                GithubError::NotFound(format!(
                    "discussion category `{}` in `{repo}`",
                    discussion.category.as_deref().unwrap_or("<first>")
                ))
            })?;

        let data = self.graphql(
            "mutation($repositoryId: ID!, $categoryId: ID!, $title: String!, $body: String!) { createDiscussion(input: {repositoryId: $repositoryId, categoryId: $categoryId, title: $title, body: $body}) { discussion { number url } } }",
            json!({
                "repositoryId": repository_id,
                "categoryId": category_id,
                "title": discussion.title,
                "body": discussion.body,
            }),
        )?;
        let url = string_at(&data, "/createDiscussion/discussion/url")
            .ok_or_else(|| GithubError::Response("createDiscussion returned no url".to_string()))?;
        Ok(CreatedItem {
            url,
            number: data
                .pointer("/createDiscussion/discussion/number")
                .and_then(Value::as_u64),
        })
    }

    fn create_project(&self, project: &NewProject) -> Result<CreatedItem, GithubError> {
        let owner_id = self.repository_owner_id(&project.owner)?;
        let data = self.graphql(
            "mutation($ownerId: ID!, $title: String!) { createProjectV2(input: {ownerId: $ownerId, title: $title}) { projectV2 { number url } } }",
            json!({"ownerId": owner_id, "title": project.title}),
        )?;
        let url = string_at(&data, "/createProjectV2/projectV2/url")
            .ok_or_else(|| GithubError::Response("createProjectV2 returned no url".to_string()))?;
        Ok(CreatedItem {
            url,
            number: data
                .pointer("/createProjectV2/projectV2/number")
                .and_then(Value::as_u64),
        })
    }

    fn create_project_status_update(
        &self,
        update: &NewProjectStatusUpdate,
    ) -> Result<CreatedItem, GithubError> {
        let project_id = self.project_id(&update.project_url)?;
        let _ = self.graphql(
            "mutation($projectId: ID!, $body: String!, $status: ProjectV2StatusUpdateStatus, $startDate: Date, $targetDate: Date) { createProjectV2StatusUpdate(input: {projectId: $projectId, body: $body, status: $status, startDate: $startDate, targetDate: $targetDate}) { statusUpdate { id } } }",
            json!({
                "projectId": project_id,
                "body": update.body,
                "status": update.status.as_str(),
                "startDate": update.start_date.map(|date| date.format("%Y-%m-%d").to_string()),
                "targetDate": update.target_date.map(|date| date.format("%Y-%m-%d").to_string()),
            }),
        )?;
        Ok(CreatedItem {
            url: update.project_url.clone(),
            number: None,
        })
    }

    fn create_review(
        &self,
        repo: &RepoSlug,
        number: u64,
        review: &NewReview,
    ) -> Result<CreatedItem, GithubError> {
        let url = self.repo_endpoint(repo, &format!("pulls/{number}/reviews"));
        let body = serde_json::to_value(review).map_err(|err| GithubError::Request(err.to_string()))?;
        let created: ReviewResponse = self.send("POST", &url, Some(body))?;
        Ok(CreatedItem {
            url: created.html_url,
            number: Some(number),
        })
    }
}
