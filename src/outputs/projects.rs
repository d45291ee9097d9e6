use super::fields::{optional_string, required_string};
use super::{BuildContext, RecordError};
use crate::shared::ids::TemporaryId;
use chrono::NaiveDate;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateProject {
    pub title: String,
    /// Organization or user login; defaults to the target repository's owner.
    pub owner: Option<String>,
    pub temporary_id: Option<TemporaryId>,
    pub repo: Option<String>,
}

impl CreateProject {
    pub fn from_fields(
        fields: &mut Map<String, Value>,
        _cx: &BuildContext<'_>,
    ) -> Result<Self, RecordError> {
        let temporary_id = optional_string(fields, "temporary_id")
            .map(|raw| TemporaryId::parse(&raw))
            .transpose()
            .map_err(|reason| RecordError::validation(format!("field `temporary_id` {reason}")))?;
        Ok(Self {
            title: required_string(fields, "title")?,
            owner: optional_string(fields, "owner"),
            temporary_id,
            repo: optional_string(fields, "repo"),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectStatus {
    OnTrack,
    AtRisk,
    OffTrack,
    Complete,
    Inactive,
}

impl ProjectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::OnTrack => "ON_TRACK",
            ProjectStatus::AtRisk => "AT_RISK",
            ProjectStatus::OffTrack => "OFF_TRACK",
            ProjectStatus::Complete => "COMPLETE",
            ProjectStatus::Inactive => "INACTIVE",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "ON_TRACK" => Some(ProjectStatus::OnTrack),
            "AT_RISK" => Some(ProjectStatus::AtRisk),
            "OFF_TRACK" => Some(ProjectStatus::OffTrack),
            "COMPLETE" => Some(ProjectStatus::Complete),
            "INACTIVE" => Some(ProjectStatus::Inactive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectStatusUpdate {
    /// Project URL or `#aw_...` reference to a project created earlier in the batch.
    pub project: String,
    pub body: String,
    pub status: ProjectStatus,
    pub start_date: Option<NaiveDate>,
    pub target_date: Option<NaiveDate>,
}

fn optional_date(fields: &Map<String, Value>, name: &str) -> Result<Option<NaiveDate>, RecordError> {
    optional_string(fields, name)
        .map(|raw| {
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
                RecordError::validation(format!("field `{name}` must be a YYYY-MM-DD date, got `{raw}`"))
            })
        })
        .transpose()
}

impl ProjectStatusUpdate {
    pub fn from_fields(
        fields: &mut Map<String, Value>,
        _cx: &BuildContext<'_>,
    ) -> Result<Self, RecordError> {
        let status_raw = optional_string(fields, "status").unwrap_or_else(|| "ON_TRACK".to_string());
        let status = ProjectStatus::parse(&status_raw).ok_or_else(|| {
            RecordError::validation(format!(
                "field `status` must be one of: ON_TRACK, AT_RISK, OFF_TRACK, COMPLETE, INACTIVE (got `{status_raw}`)"
            ))
        })?;
        let start_date = optional_date(fields, "start_date")?;
        let target_date = optional_date(fields, "target_date")?;
        if let (Some(start), Some(target)) = (start_date, target_date) {
            if target < start {
                return Err(RecordError::validation(format!(
                    "field `target_date` ({target}) must not be before `start_date` ({start})"
                )));
            }
        }
        Ok(Self {
            project: required_string(fields, "project")?,
            body: required_string(fields, "body")?,
            status,
            start_date,
            target_date,
        })
    }
}
