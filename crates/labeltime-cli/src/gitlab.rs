//! Minimal GitLab REST client: issues and their label events.

use anyhow::{Context as _, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use labeltime_core::error::LabeltimeError;
use labeltime_core::{Item, RawLabelEvent};
use serde::de::DeserializeOwned;
use std::cell::Cell;
use tracing::debug;
use url::Url;

const PER_PAGE: u32 = 100;

/// Filters applied server-side when listing issues.
#[derive(Debug, Clone, Default)]
pub struct IssueQuery {
    /// Restrict to a single issue.
    pub iid: Option<u64>,
    /// Only issues updated at or after this instant.
    pub updated_after: Option<DateTime<Utc>>,
}

pub struct GitLabClient {
    base_url: Url,
    token: Option<String>,
    requests: Cell<usize>,
}

impl GitLabClient {
    /// # Errors
    ///
    /// [`LabeltimeError::TrackerRequest`] when `base_url` is not an absolute
    /// URL that can carry a path.
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        let invalid = |reason: String| LabeltimeError::TrackerRequest {
            url: base_url.to_string(),
            reason,
        };

        let parsed = Url::parse(base_url.trim()).map_err(|err| invalid(err.to_string()))?;
        if parsed.cannot_be_a_base() {
            return Err(invalid("not a base URL".to_string()).into());
        }

        Ok(Self {
            base_url: parsed,
            token: token.filter(|token| !token.trim().is_empty()),
            requests: Cell::new(0),
        })
    }

    pub fn request_count(&self) -> usize {
        self.requests.get()
    }

    pub fn fetch_issues(&self, project: &str, query: &IssueQuery) -> Result<Vec<Item>> {
        self.get_paged(|page| issues_url(&self.base_url, project, query, page))
            .with_context(|| format!("failed to list issues of project {project}"))
    }

    pub fn fetch_label_events(&self, project: &str, iid: u64) -> Result<Vec<RawLabelEvent>> {
        self.get_paged(|page| label_events_url(&self.base_url, project, iid, page))
            .with_context(|| format!("failed to fetch label events for issue #{iid}"))
    }

    /// Follow `X-Next-Page` until the server reports no further page.
    fn get_paged<T: DeserializeOwned>(
        &self,
        url_for: impl Fn(u32) -> Result<Url>,
    ) -> Result<Vec<T>> {
        let mut records = Vec::new();
        let mut page = 1_u32;

        loop {
            let url = url_for(page)?;
            let (batch, next) = self.get_page::<T>(&url)?;
            debug!(url = %url, records = batch.len(), "fetched page");
            records.extend(batch);

            match next {
                Some(next) if next > page => page = next,
                _ => break,
            }
        }

        Ok(records)
    }

    fn get_page<T: DeserializeOwned>(&self, url: &Url) -> Result<(Vec<T>, Option<u32>)> {
        self.requests.set(self.requests.get() + 1);

        let mut request = ureq::get(url.as_str())
            .set("Accept", "application/json")
            .set("User-Agent", "labeltime-cli");

        if let Some(token) = &self.token {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }

        let response = request.call().map_err(|err| match err {
            ureq::Error::Status(status @ (401 | 403), _) => LabeltimeError::TrackerAuth {
                url: url.to_string(),
                status,
            },
            ureq::Error::Status(status, _) => LabeltimeError::TrackerRequest {
                url: url.to_string(),
                reason: format!("HTTP {status}"),
            },
            ureq::Error::Transport(transport) => LabeltimeError::TrackerRequest {
                url: url.to_string(),
                reason: transport.to_string(),
            },
        })?;

        let next = next_page(response.header("X-Next-Page"));
        let batch = response
            .into_json::<Vec<T>>()
            .with_context(|| format!("failed to decode GitLab JSON response from {url}"))?;

        Ok((batch, next))
    }
}

/// `<base>/api/v4/projects/<project>/<tail..>?per_page=..&page=..`.
///
/// The project is one path segment, so `group/project` is sent as
/// `group%2Fproject`.
fn project_endpoint(base: &Url, project: &str, tail: &[&str], page: u32) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| LabeltimeError::TrackerRequest {
            url: base.to_string(),
            reason: "not a base URL".to_string(),
        })?
        .pop_if_empty()
        .extend(["api", "v4", "projects", project])
        .extend(tail);
    url.query_pairs_mut()
        .append_pair("per_page", &PER_PAGE.to_string())
        .append_pair("page", &page.to_string());
    Ok(url)
}

fn issues_url(base: &Url, project: &str, query: &IssueQuery, page: u32) -> Result<Url> {
    let mut url = project_endpoint(base, project, &["issues"], page)?;
    {
        let mut pairs = url.query_pairs_mut();
        if let Some(iid) = query.iid {
            pairs.append_pair("iids[]", &iid.to_string());
        }
        if let Some(after) = query.updated_after {
            pairs.append_pair(
                "updated_after",
                &after.to_rfc3339_opts(SecondsFormat::Secs, true),
            );
        }
    }
    Ok(url)
}

fn label_events_url(base: &Url, project: &str, iid: u64, page: u32) -> Result<Url> {
    let iid = iid.to_string();
    project_endpoint(
        base,
        project,
        &["issues", &iid, "resource_label_events"],
        page,
    )
}

/// An empty or absent header means the last page.
fn next_page(header: Option<&str>) -> Option<u32> {
    header.and_then(|raw| raw.trim().parse().ok())
}
