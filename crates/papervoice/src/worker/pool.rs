use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, error, info};
use tokio::sync::broadcast;

use crate::artifact::{ArtifactStore, AudioArtifact};
use crate::broadcast::job_progress::JobProgressEvent;
use crate::broadcast::job_store::{JobStatusRecord, StatusStore};
use crate::pipeline::progress::StoreProgress;
use crate::pipeline::{Pipeline, PipelineConfig, PipelineContext};
use crate::worker::job::{Job, JobResult};

/// Builds the pipeline each worker thread runs. Production pools build
/// from config; tests inject a factory wiring collaborator fakes.
pub type PipelineFactory = Arc<dyn Fn() -> Pipeline + Send + Sync>;

pub struct WorkerPool {
    job_sender: Sender<Job>,
    result_receiver: Receiver<JobResult>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    status: Arc<StatusStore>,
    artifacts: Arc<ArtifactStore>,
    /// Kept alive so late subscribers can still attach; workers hold
    /// cloned Arcs.
    #[allow(dead_code)]
    progress_sender: Option<Arc<broadcast::Sender<JobProgressEvent>>>,
}

impl WorkerPool {
    pub fn new(config: Arc<PipelineConfig>, worker_count: usize) -> Self {
        Self::with_progress_sender(config, worker_count, None)
    }

    /// Creates a new worker pool with an optional progress broadcaster.
    ///
    /// # Panics
    /// Panics if `worker_count` is 0.
    pub fn with_progress_sender(
        config: Arc<PipelineConfig>,
        worker_count: usize,
        progress_sender: Option<Arc<broadcast::Sender<JobProgressEvent>>>,
    ) -> Self {
        let artifacts = Arc::new(ArtifactStore::new(
            config.audio_directory.clone(),
            config.artifact_ttl,
        ));
        let factory_artifacts = Arc::clone(&artifacts);
        let factory: PipelineFactory = Arc::new(move || {
            Pipeline::from_config(Arc::clone(&config), Arc::clone(&factory_artifacts))
        });

        Self::with_pipeline_factory(artifacts, worker_count, progress_sender, factory)
    }

    /// Creates a pool whose workers run pipelines built by `factory`.
    ///
    /// # Panics
    /// Panics if `worker_count` is 0.
    pub fn with_pipeline_factory(
        artifacts: Arc<ArtifactStore>,
        worker_count: usize,
        progress_sender: Option<Arc<broadcast::Sender<JobProgressEvent>>>,
        factory: PipelineFactory,
    ) -> Self {
        assert!(worker_count > 0, "worker_count must be > 0");
        let (job_sender, job_receiver) = bounded::<Job>(worker_count * 2);
        let (result_sender, result_receiver) = bounded::<JobResult>(worker_count * 2);
        let shutdown = Arc::new(AtomicBool::new(false));
        let status = Arc::new(StatusStore::new());

        let mut workers = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let job_rx = job_receiver.clone();
            let result_tx = result_sender.clone();
            let shutdown_flag = Arc::clone(&shutdown);
            let worker_status = Arc::clone(&status);
            let worker_factory = Arc::clone(&factory);
            let worker_progress = progress_sender.clone();

            let handle = thread::spawn(move || {
                run_worker(
                    worker_id,
                    job_rx,
                    result_tx,
                    shutdown_flag,
                    worker_status,
                    worker_factory,
                    worker_progress,
                );
            });

            workers.push(handle);
        }

        info!("Started {} workers", worker_count);

        Self {
            job_sender,
            result_receiver,
            workers,
            shutdown,
            status,
            artifacts,
            progress_sender,
        }
    }

    /// Enqueues a job. Idempotent per job id: resubmitting a known id is
    /// a no-op, so retried deliveries cannot run a job twice. The QUEUED
    /// record is registered before enqueueing, so a poller never sees
    /// not-found for an accepted job.
    pub fn submit(&self, job: Job) -> Result<(), crate::error::WorkerError> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(crate::error::WorkerError::ChannelClosed);
        }

        if !self.status.insert_queued(&job.id) {
            debug!("Job {} already submitted, ignoring duplicate", job.id);
            return Ok(());
        }

        self.job_sender
            .send(job)
            .map_err(|_| crate::error::WorkerError::ChannelClosed)
    }

    /// Status snapshot for a job id; `None` means the id was never
    /// accepted.
    pub fn status(&self, job_id: &str) -> Option<JobStatusRecord> {
        self.status.status(job_id)
    }

    /// The audio artifact for a completed job, while it is un-expired.
    pub fn artifact(&self, job_id: &str) -> Option<AudioArtifact> {
        self.artifacts.retrieve(job_id)
    }

    pub fn status_store(&self) -> Arc<StatusStore> {
        Arc::clone(&self.status)
    }

    pub fn artifact_store(&self) -> Arc<ArtifactStore> {
        Arc::clone(&self.artifacts)
    }

    pub fn try_recv_result(&self) -> Option<JobResult> {
        self.result_receiver.try_recv().ok()
    }

    pub fn recv_result(&self) -> Option<JobResult> {
        self.result_receiver.recv().ok()
    }

    pub fn shutdown(&self) {
        info!("Shutting down worker pool...");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn wait(self) {
        // Drop sender to signal workers to exit
        drop(self.job_sender);

        for (i, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        info!("All workers have stopped");
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

fn run_worker(
    worker_id: usize,
    job_receiver: Receiver<Job>,
    result_sender: Sender<JobResult>,
    shutdown: Arc<AtomicBool>,
    status: Arc<StatusStore>,
    factory: PipelineFactory,
    progress_sender: Option<Arc<broadcast::Sender<JobProgressEvent>>>,
) {
    debug!("Worker {} started", worker_id);

    let pipeline = factory();

    loop {
        if shutdown.load(Ordering::Relaxed) {
            debug!("Worker {} received shutdown signal", worker_id);
            break;
        }

        match job_receiver.recv_timeout(std::time::Duration::from_millis(100)) {
            Ok(job) => {
                debug!("Worker {} processing job {}", worker_id, job.id);

                let progress =
                    StoreProgress::new(&job.id, Arc::clone(&status), progress_sender.clone());
                let ctx = PipelineContext::new(job);
                let result = pipeline.run(ctx, &progress);

                if let Err(e) = result_sender.send(result) {
                    error!("Worker {} failed to send result: {}", worker_id, e);
                    break;
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                continue;
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                debug!("Worker {} job channel disconnected", worker_id);
                break;
            }
        }
    }

    debug!("Worker {} stopped", worker_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::DEFAULT_TTL;
    use crate::broadcast::job_progress::JobState;
    use crate::error::{ExtractionError, MathSpeechError, SynthesisError};
    use crate::extract::{
        DocumentAssembler, DocumentNode, ExtractionCoordinator, OcrExtractor, StructuredDocument,
        StructuredExtractor,
    };
    use crate::mathspeech::MathSpeech;
    use crate::synth::SpeechSynthesizer;
    use crate::worker::job::VoiceSettings;
    use std::path::{Path, PathBuf};
    use std::time::Duration;
    use tempfile::TempDir;

    struct LongTextExtractor;

    impl StructuredExtractor for LongTextExtractor {
        fn extract(&self, _document: &Path) -> Result<StructuredDocument, ExtractionError> {
            Ok(StructuredDocument {
                nodes: vec![DocumentNode::Text("lorem ipsum ".repeat(50))],
            })
        }
    }

    struct EmptyOcr;

    impl OcrExtractor for EmptyOcr {
        fn extract(&self, _document: &Path) -> Result<String, ExtractionError> {
            Ok(String::new())
        }
    }

    struct NoMath;

    impl MathSpeech for NoMath {
        fn convert(&self, _fragment: &str) -> Result<String, MathSpeechError> {
            Err(MathSpeechError::Engine {
                detail: "unused".to_string(),
            })
        }
    }

    struct FileWritingSynth;

    impl SpeechSynthesizer for FileWritingSynth {
        fn synthesize(
            &self,
            _text: &str,
            _voice: &VoiceSettings,
            destination: &Path,
        ) -> Result<(), SynthesisError> {
            std::fs::write(destination, b"RIFF").map_err(|_| SynthesisError::Rejected {
                message: "write failed".to_string(),
            })
        }
    }

    fn test_pipeline_config(audio_dir: &Path) -> Arc<PipelineConfig> {
        Arc::new(PipelineConfig {
            audio_directory: audio_dir.to_path_buf(),
            extraction_url: "http://unused/".to_string(),
            extraction_timeout: Duration::from_secs(1),
            ocr_url: "http://unused/".to_string(),
            ocr_timeout: Duration::from_secs(1),
            synthesis_url: "http://unused/".to_string(),
            synthesis_timeout: Duration::from_secs(1),
            math_command: vec!["unused".to_string()],
            math_timeout: Duration::from_secs(1),
            min_extracted_chars: 100,
            max_speech_chars: 5000,
            soft_timeout: Duration::from_secs(1500),
            hard_timeout: Duration::from_secs(1800),
            artifact_ttl: DEFAULT_TTL,
            voice_defaults: VoiceSettings::default(),
        })
    }

    fn fake_pool(audio_dir: &Path, worker_count: usize) -> WorkerPool {
        let artifacts = Arc::new(ArtifactStore::new(audio_dir.to_path_buf(), DEFAULT_TTL));
        let config = test_pipeline_config(audio_dir);
        let factory_artifacts = Arc::clone(&artifacts);
        let factory: PipelineFactory = Arc::new(move || {
            Pipeline::with_collaborators(
                Arc::clone(&config),
                Arc::clone(&factory_artifacts),
                ExtractionCoordinator::new(
                    Box::new(LongTextExtractor),
                    Box::new(EmptyOcr),
                    DocumentAssembler::new(Box::new(NoMath)),
                ),
                Box::new(FileWritingSynth),
            )
        });
        WorkerPool::with_pipeline_factory(artifacts, worker_count, None, factory)
    }

    fn write_source(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, b"%PDF-1.4").unwrap();
        path
    }

    #[test]
    fn test_worker_pool_creation_and_shutdown() {
        let dir = TempDir::new().unwrap();
        let pool = fake_pool(dir.path(), 2);

        assert!(!pool.is_shutdown());
        pool.shutdown();
        assert!(pool.is_shutdown());
        pool.wait();
    }

    #[test]
    fn test_submit_and_process_job() {
        let dir = TempDir::new().unwrap();
        let pool = fake_pool(dir.path(), 2);
        let source = write_source(&dir, "doc.pdf");

        let job = Job::new(source.clone(), VoiceSettings::default());
        let job_id = job.id.clone();
        pool.submit(job).unwrap();

        let result = pool.recv_result().unwrap();
        assert!(result.success, "Job failed: {:?}", result.error);
        assert!(!source.exists());

        let record = pool.status(&job_id).unwrap();
        assert!(matches!(record.state, JobState::Completed { .. }));
        assert_eq!(record.progress, 100);
        assert!(pool.artifact(&job_id).is_some());

        pool.shutdown();
        pool.wait();
    }

    #[test]
    fn test_duplicate_submission_is_noop() {
        let dir = TempDir::new().unwrap();
        let pool = fake_pool(dir.path(), 1);
        let source = write_source(&dir, "doc.pdf");

        let job = Job::new(source, VoiceSettings::default());
        let duplicate = job.clone();
        pool.submit(job).unwrap();
        pool.submit(duplicate).unwrap();

        assert!(pool.recv_result().is_some());
        // The duplicate never ran, so only one result is ever produced.
        assert!(pool.try_recv_result().is_none());

        pool.shutdown();
        pool.wait();
    }

    #[test]
    fn test_unknown_job_status_is_none() {
        let dir = TempDir::new().unwrap();
        let pool = fake_pool(dir.path(), 1);

        assert!(pool.status("never-submitted").is_none());

        pool.shutdown();
        pool.wait();
    }
}
