use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use chrono::Utc;
use dashmap::DashMap;
use regex::Regex;
use tracing::debug;
use uuid::Uuid;

use super::types::{Job, JobStatus};
use crate::error::JobError;

/// In-memory job registry plus the scratch directory holding uploads and outputs.
///
/// Jobs live for the lifetime of the process. Files written under `temp_dir`
/// are never removed.
#[derive(Clone)]
pub struct JobStore {
    jobs: Arc<DashMap<String, Job>>,
    temp_dir: PathBuf,
}

fn unsafe_filename_chars() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"[\x00-\x1F/\\:*?"<>|]"#).expect("static regex"))
}

/// Reduce an uploaded filename to a single safe path component.
pub fn sanitize_filename(filename: &str) -> Result<String, JobError> {
    let name = Path::new(filename.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| JobError::InvalidFilename(filename.to_string()))?;

    if name.is_empty() || name.len() > 255 || unsafe_filename_chars().is_match(name) {
        return Err(JobError::InvalidFilename(filename.to_string()));
    }

    Ok(name.to_string())
}

impl JobStore {
    pub fn new(temp_dir: impl Into<PathBuf>) -> Result<Self, JobError> {
        let temp_dir = temp_dir.into();
        std::fs::create_dir_all(&temp_dir).map_err(|e| JobError::Storage {
            path: temp_dir.clone(),
            source: e,
        })?;

        Ok(Self {
            jobs: Arc::new(DashMap::new()),
            temp_dir,
        })
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Persist the uploaded bytes as `<id>_<filename>` and register a Pending job.
    pub fn create_job(&self, filename: &str, content: &[u8]) -> Result<Job, JobError> {
        let filename = sanitize_filename(filename)?;
        let id = Uuid::new_v4().to_string();
        let source_path = self.temp_dir.join(format!("{}_{}", id, filename));

        std::fs::write(&source_path, content).map_err(|e| JobError::Storage {
            path: source_path.clone(),
            source: e,
        })?;

        let job = Job {
            id: id.clone(),
            filename,
            status: JobStatus::Pending,
            created_at: Utc::now(),
            source_path,
            output_path: None,
            error: None,
        };

        debug!("Stored upload for job {} at {:?}", id, job.source_path);
        self.jobs.insert(id, job.clone());
        Ok(job)
    }

    pub fn get_job(&self, id: &str) -> Option<Job> {
        self.jobs.get(id).map(|entry| entry.value().clone())
    }

    /// All jobs, oldest first.
    pub fn list_jobs(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.iter().map(|e| e.value().clone()).collect();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        jobs
    }

    /// Move a job to `status`.
    ///
    /// Returns `Ok(false)` when the id is unknown. Completed is only reachable
    /// through [`JobStore::complete`], which also records the output file.
    pub fn set_status(&self, id: &str, status: JobStatus) -> Result<bool, JobError> {
        let Some(mut job) = self.jobs.get_mut(id) else {
            return Ok(false);
        };

        if status == JobStatus::Completed || !job.status.can_transition_to(status) {
            return Err(JobError::InvalidState {
                id: id.to_string(),
                status: job.status,
                action: "change status",
            });
        }

        job.status = status;
        Ok(true)
    }

    /// Atomically move a Pending job to InProgress and return a snapshot of it.
    pub fn claim(&self, id: &str) -> Result<Job, JobError> {
        let mut job = self
            .jobs
            .get_mut(id)
            .ok_or_else(|| JobError::NotFound(id.to_string()))?;

        if job.status != JobStatus::Pending {
            return Err(JobError::InvalidState {
                id: id.to_string(),
                status: job.status,
                action: "start translation",
            });
        }

        job.status = JobStatus::InProgress;
        Ok(job.clone())
    }

    pub fn complete(&self, id: &str, output_path: PathBuf) -> Result<Job, JobError> {
        let mut job = self
            .jobs
            .get_mut(id)
            .ok_or_else(|| JobError::NotFound(id.to_string()))?;

        if job.status != JobStatus::InProgress {
            return Err(JobError::InvalidState {
                id: id.to_string(),
                status: job.status,
                action: "complete",
            });
        }

        job.output_path = Some(output_path);
        job.status = JobStatus::Completed;
        Ok(job.clone())
    }

    pub fn fail(&self, id: &str, reason: String) -> Result<Job, JobError> {
        let mut job = self
            .jobs
            .get_mut(id)
            .ok_or_else(|| JobError::NotFound(id.to_string()))?;

        if !job.status.can_transition_to(JobStatus::Failed) {
            return Err(JobError::InvalidState {
                id: id.to_string(),
                status: job.status,
                action: "fail",
            });
        }

        job.status = JobStatus::Failed;
        job.error = Some(reason);
        Ok(job.clone())
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, JobStore) {
        let dir = TempDir::new().unwrap();
        let store = JobStore::new(dir.path().join("jobs")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_create_job_persists_upload() {
        let (_dir, store) = store();
        let job = store.create_job("report.docx", b"payload").unwrap();

        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.output_path.is_none());
        assert_eq!(job.filename, "report.docx");
        assert_eq!(
            job.source_path.file_name().unwrap().to_str().unwrap(),
            format!("{}_report.docx", job.id)
        );
        assert_eq!(std::fs::read(&job.source_path).unwrap(), b"payload");
    }

    #[test]
    fn test_same_filename_does_not_collide() {
        let (_dir, store) = store();
        let a = store.create_job("report.docx", b"a").unwrap();
        let b = store.create_job("report.docx", b"b").unwrap();

        assert_ne!(a.id, b.id);
        assert_ne!(a.source_path, b.source_path);
        assert_eq!(std::fs::read(&a.source_path).unwrap(), b"a");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_unknown_job_is_absent() {
        let (_dir, store) = store();
        assert!(store.get_job("fake-job-id").is_none());
        assert!(!store.set_status("fake-job-id", JobStatus::Failed).unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn test_upload_path_components_are_stripped() {
        let (dir, store) = store();
        let job = store.create_job("../../etc/slides.pptx", b"x").unwrap();

        assert_eq!(job.filename, "slides.pptx");
        assert!(job.source_path.starts_with(dir.path().join("jobs")));
    }

    #[test]
    fn test_rejects_unusable_filenames() {
        assert!(sanitize_filename("").is_err());
        assert!(sanitize_filename("..").is_err());
        assert!(sanitize_filename("bad\u{0007}name.docx").is_err());
        assert_eq!(sanitize_filename("  deck.pptx ").unwrap(), "deck.pptx");
    }

    #[test]
    fn test_claim_only_once() {
        let (_dir, store) = store();
        let job = store.create_job("report.docx", b"x").unwrap();

        let claimed = store.claim(&job.id).unwrap();
        assert_eq!(claimed.status, JobStatus::InProgress);

        match store.claim(&job.id) {
            Err(JobError::InvalidState { status, .. }) => assert_eq!(status, JobStatus::InProgress),
            other => panic!("Expected InvalidState, got {:?}", other.map(|j| j.status)),
        }
    }

    #[test]
    fn test_complete_sets_output_with_status() {
        let (_dir, store) = store();
        let job = store.create_job("report.docx", b"x").unwrap();
        store.claim(&job.id).unwrap();

        let done = store.complete(&job.id, PathBuf::from("/tmp/out.docx")).unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.output_path, Some(PathBuf::from("/tmp/out.docx")));

        assert!(store.fail(&job.id, "late".into()).is_err());
        assert!(store.set_status(&job.id, JobStatus::Failed).is_err());
    }

    #[test]
    fn test_set_status_cannot_complete_directly() {
        let (_dir, store) = store();
        let job = store.create_job("report.docx", b"x").unwrap();
        store.set_status(&job.id, JobStatus::InProgress).unwrap();

        assert!(store.set_status(&job.id, JobStatus::Completed).is_err());
        assert!(store.get_job(&job.id).unwrap().output_path.is_none());
    }

    #[test]
    fn test_fail_records_reason() {
        let (_dir, store) = store();
        let job = store.create_job("report.docx", b"x").unwrap();
        store.claim(&job.id).unwrap();

        let failed = store.fail(&job.id, "provider down".into()).unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("provider down"));
        assert!(failed.output_path.is_none());
    }

    #[test]
    fn test_list_jobs_oldest_first() {
        let (_dir, store) = store();
        let first = store.create_job("a.docx", b"x").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = store.create_job("b.pptx", b"x").unwrap();

        let ids: Vec<String> = store.list_jobs().into_iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }
}
