use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const RESPONSE_MEMBER: &str = "response.txt";
pub const PROMPT_MEMBER: &str = "prompt.txt";
pub const METADATA_MEMBER: &str = "metadata.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveMetadata {
    pub job_id: String,
    pub model: String,
    pub generated_at_utc: String,
}

/// The three-member ZIP uploaded for every answered job.
#[derive(Debug, Clone)]
pub struct SubmissionArchive {
    pub job_id: String,
    pub prompt: String,
    pub answer: String,
    pub model_label: String,
    pub generated_at: DateTime<Utc>,
}

/// Job id reduced to characters that are safe inside a single path component.
pub fn path_safe_id(job_id: &str) -> String {
    job_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

pub fn archive_file_name(job_id: &str) -> String {
    format!("seedstr-job-{}-response.zip", path_safe_id(job_id))
}

impl SubmissionArchive {
    pub fn new(job_id: &str, prompt: &str, answer: &str, model_label: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            prompt: prompt.to_string(),
            answer: answer.to_string(),
            model_label: model_label.to_string(),
            generated_at: Utc::now(),
        }
    }

    pub fn metadata(&self) -> ArchiveMetadata {
        ArchiveMetadata {
            job_id: self.job_id.clone(),
            model: self.model_label.clone(),
            generated_at_utc: self.generated_at.to_rfc3339_opts(SecondsFormat::Micros, false),
        }
    }

    /// Serialize to ZIP bytes. Entry timestamps are pinned so identical
    /// inputs produce identical archives.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default());
        let metadata = serde_json::to_string_pretty(&self.metadata())?;

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file(RESPONSE_MEMBER, options)?;
        writer.write_all(format!("{}\n", self.answer.trim_end()).as_bytes())?;
        writer.start_file(PROMPT_MEMBER, options)?;
        writer.write_all(format!("{}\n", self.prompt.trim_end()).as_bytes())?;
        writer.start_file(METADATA_MEMBER, options)?;
        writer.write_all(metadata.as_bytes())?;

        Ok(writer.finish()?.into_inner())
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }
}
