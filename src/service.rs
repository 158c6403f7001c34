use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::documents::{DocumentFormat, TranslationMap};
use crate::error::{JobError, Result, ServiceError};
use crate::jobs::{Job, JobStatus, JobStore};
use crate::translate::Translator;

/// Coordinates upload, extraction, translation and reinsertion for jobs.
pub struct TranslationService {
    store: JobStore,
    translator: Arc<dyn Translator>,
}

/// `<job id>_<stem>_translated<.suffix>`
pub fn output_filename(job_id: &str, filename: &str) -> String {
    let path = Path::new(filename);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    let suffix = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();
    format!("{}_{}_translated{}", job_id, stem, suffix)
}

async fn run_blocking<T, F>(task: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| ServiceError::Task(e.to_string()))?
}

impl TranslationService {
    pub fn new(store: JobStore, translator: Arc<dyn Translator>) -> Self {
        Self { store, translator }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// Validate the format, then persist the upload as a Pending job.
    pub async fn create_job(&self, filename: &str, content: Vec<u8>) -> Result<Job> {
        DocumentFormat::from_filename(filename)?;

        let store = self.store.clone();
        let filename = filename.to_string();
        let job = run_blocking(move || Ok(store.create_job(&filename, &content)?)).await?;

        info!("Created job {} for {}", job.id, job.filename);
        Ok(job)
    }

    pub fn get_job(&self, job_id: &str) -> Option<Job> {
        self.store.get_job(job_id)
    }

    pub fn list_jobs(&self) -> Vec<Job> {
        self.store.list_jobs()
    }

    /// Translate a Pending job into `target_language`.
    ///
    /// The job is claimed (Pending -> InProgress) before any document I/O, so a
    /// second concurrent call for the same id is rejected. If extraction,
    /// translation or reinsertion fails the job is marked Failed and the error
    /// is returned.
    pub async fn start_translation(&self, job_id: &str, target_language: &str) -> Result<Job> {
        let target_language = target_language.trim();
        if target_language.is_empty() {
            return Err(ServiceError::InvalidInput("target language is required".into()));
        }

        let job = self
            .store
            .get_job(job_id)
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;
        let format = DocumentFormat::from_filename(&job.filename)?;
        let job = self.store.claim(job_id)?;

        info!(
            "Translating job {} ({}) to {} with {}",
            job.id,
            job.filename,
            target_language,
            self.translator.name()
        );

        match self.process(&job, format, target_language).await {
            Ok(output_path) => {
                let job = self.store.complete(&job.id, output_path)?;
                info!("Job {} completed", job.id);
                Ok(job)
            }
            Err(err) => {
                debug!("Job {} failed: {}", job.id, err);
                self.store.fail(&job.id, err.to_string())?;
                Err(err)
            }
        }
    }

    async fn process(&self, job: &Job, format: DocumentFormat, target_language: &str) -> Result<PathBuf> {
        let source = job.source_path.clone();
        let fragments = run_blocking(move || Ok(format.handler().extract(&source)?)).await?;
        debug!("Job {}: {} distinct fragments", job.id, fragments.len());

        let mut translations = TranslationMap::new();
        for fragment in fragments {
            let translated = self.translator.translate(&fragment, target_language).await?;
            translations.insert(fragment, translated);
        }

        let output_path = self
            .store
            .temp_dir()
            .join(output_filename(&job.id, &job.filename));

        let source = job.source_path.clone();
        let output = output_path.clone();
        run_blocking(move || Ok(format.handler().reinsert(&source, &translations, &output)?)).await?;

        Ok(output_path)
    }

    /// Location and download name of a Completed job's output.
    pub fn output_for_download(&self, job_id: &str) -> Result<(PathBuf, String)> {
        let job = self
            .store
            .get_job(job_id)
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;

        match (job.status, job.output_path) {
            (JobStatus::Completed, Some(path)) => {
                let name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| output_filename(&job.id, &job.filename));
                Ok((path, name))
            }
            (status, _) => Err(JobError::InvalidState {
                id: job.id,
                status,
                action: "download",
            }
            .into()),
        }
    }
}
