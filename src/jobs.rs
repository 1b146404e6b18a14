//! Registered vocabulary jobs
//!
//! Each job builds the task arguments a scheduler passes to the datastream
//! engine: a single `config` holding the pipeline preset.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::datastreams::presets::{
    DatastreamConfig, ddc_preset, gnd_import_preset, gnd_updates_preset, mesh_import_preset,
};
use crate::domain::{Result, SubjectError};
use crate::infrastructure::config::{MESH_FILE_URL_KEY, SubjectsConfig};

/// Default harvest window for incremental GND updates
pub const GND_UPDATE_WINDOW_MINUTES: i64 = 15;

/// Timestamp format of OAI-PMH `from`/`until` arguments
pub const OAI_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskArguments {
    pub config: DatastreamConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    ProcessDdc,
    ProcessGnd,
    ImportGnd,
    ImportMesh,
}

impl Job {
    pub const ALL: [Job; 4] = [Job::ProcessDdc, Job::ProcessGnd, Job::ImportGnd, Job::ImportMesh];

    pub fn id(&self) -> &'static str {
        match self {
            Job::ProcessDdc => "process_ddc_subjects",
            Job::ProcessGnd => "process_gnd_subjects",
            Job::ImportGnd => "import_gnd_subjects",
            Job::ImportMesh => "import_mesh_subjects",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Job::ProcessDdc => "Load DDC subjects",
            Job::ProcessGnd => "Update GND subjects",
            Job::ImportGnd => "Import GND subjects",
            Job::ImportMesh => "Import MeSH subjects",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Job::ProcessDdc => "Process DDC subjects",
            Job::ProcessGnd => "Process GND subject updates harvested via OAI-PMH",
            Job::ImportGnd => "Import all GND subjects from the DNB bulk file",
            Job::ImportMesh => "Import all MeSH subjects from the descriptor archive",
        }
    }

    pub fn from_id(id: &str) -> Option<Job> {
        Job::ALL.into_iter().find(|job| job.id() == id)
    }

    /// Build the task arguments for a run at `now`.
    ///
    /// `since` only applies to `process_gnd_subjects`, where it opens the
    /// harvest window (default: fifteen minutes before `now`).
    pub fn build_task_arguments(
        &self,
        config: &SubjectsConfig,
        since: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<TaskArguments> {
        let preset = match self {
            Job::ProcessDdc => ddc_preset(&config.ddc_file),
            Job::ProcessGnd => {
                let since = since.unwrap_or(now - Duration::minutes(GND_UPDATE_WINDOW_MINUTES));
                gnd_updates_preset(
                    &config.gnd_oai_url,
                    &since.format(OAI_TIMESTAMP_FORMAT).to_string(),
                    &now.format(OAI_TIMESTAMP_FORMAT).to_string(),
                )
            }
            Job::ImportGnd => gnd_import_preset(checked_url(&config.gnd_file_url)?),
            Job::ImportMesh => {
                let url = config.mesh_file_url.as_deref().ok_or_else(|| {
                    SubjectError::Config(format!("{} is not set", MESH_FILE_URL_KEY))
                })?;
                mesh_import_preset(checked_url(url)?)
            }
        };

        tracing::debug!("Built task arguments for {}", self.id());
        Ok(TaskArguments { config: preset })
    }
}

/// Rejects malformed URLs; valid ones pass through as configured.
fn checked_url(raw: &str) -> Result<&str> {
    url::Url::parse(raw)
        .map(|_| raw)
        .map_err(|e| SubjectError::Config(format!("Invalid file URL '{}': {}", raw, e)))
}
