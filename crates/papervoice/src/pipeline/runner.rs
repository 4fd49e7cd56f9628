use std::sync::Arc;

use log::error;
use tracing::info_span;

use crate::artifact::ArtifactStore;
use crate::broadcast::job_progress::JobStage;
use crate::error::ExtractionError;
use crate::extract::{
    DocumentAssembler, ExtractionCoordinator, HttpOcrExtractor, HttpStructuredExtractor,
};
use crate::mathspeech::SidecarMathSpeech;
use crate::normalize::normalize_with_limit;
use crate::sanitize;
use crate::synth::{HttpSynthesisClient, SpeechSynthesizer};
use crate::worker::job::{JobOutput, JobResult};

use super::config::PipelineConfig;
use super::context::{PipelineContext, SourceFileGuard};
use super::deadline::JobDeadline;
use super::error::PipelineError;
use super::progress::{ProgressEvent, ProgressReporter};

pub struct Pipeline {
    config: Arc<PipelineConfig>,
    coordinator: ExtractionCoordinator,
    synthesizer: Box<dyn SpeechSynthesizer>,
    artifacts: Arc<ArtifactStore>,
}

impl Pipeline {
    /// Production constructor — builds all collaborators from config.
    pub fn from_config(config: Arc<PipelineConfig>, artifacts: Arc<ArtifactStore>) -> Self {
        let math = SidecarMathSpeech::new(config.math_command.clone(), config.math_timeout);
        let assembler = DocumentAssembler::new(Box::new(math));
        let primary =
            HttpStructuredExtractor::new(&config.extraction_url, config.extraction_timeout);
        let ocr = HttpOcrExtractor::new(&config.ocr_url, config.ocr_timeout);
        let coordinator = ExtractionCoordinator::new(Box::new(primary), Box::new(ocr), assembler)
            .with_min_chars(config.min_extracted_chars);
        let synthesizer: Box<dyn SpeechSynthesizer> = Box::new(HttpSynthesisClient::new(
            &config.synthesis_url,
            config.synthesis_timeout,
        ));

        Self {
            config,
            coordinator,
            synthesizer,
            artifacts,
        }
    }

    /// Constructor injecting specific collaborators, for tests wiring fakes.
    pub fn with_collaborators(
        config: Arc<PipelineConfig>,
        artifacts: Arc<ArtifactStore>,
        coordinator: ExtractionCoordinator,
        synthesizer: Box<dyn SpeechSynthesizer>,
    ) -> Self {
        Self {
            config,
            coordinator,
            synthesizer,
            artifacts,
        }
    }

    /// Run the full conversion for a single job.
    pub fn run(&self, mut ctx: PipelineContext, progress: &dyn ProgressReporter) -> JobResult {
        let filename = sanitize::redact_path(&ctx.job.source_path);
        let _pipeline_span = info_span!("pipeline",
            job_id = %ctx.job.id,
            filename = %filename,
        )
        .entered();

        // Owns the upload for the rest of the run; deletes it on every
        // exit path, including panics.
        let _source_guard = SourceFileGuard::new(ctx.job.source_path.clone());
        let mut deadline = JobDeadline::new(self.config.soft_timeout, self.config.hard_timeout);

        // Stage 1: Pre-flight analysis
        {
            let _step = info_span!("analyze").entered();
            progress.report(ProgressEvent::stage(
                JobStage::Analyzing,
                "Analyzing document structure...",
            ));
            if let Err(e) = self.step_analyze(&ctx) {
                return self.fail(&ctx, progress, JobStage::Analyzing, e);
            }
        }

        // Stage 2: Extraction (with conditional OCR fallback inside)
        {
            let _step = info_span!("extract").entered();
            if let Err(e) = deadline.check(&ctx.job.id) {
                return self.fail(&ctx, progress, JobStage::Extracting, e);
            }
            progress.report(ProgressEvent::stage(
                JobStage::Extracting,
                "Extracting text and mathematics...",
            ));
            match self.coordinator.extract(&ctx.job.source_path, progress) {
                Ok(extracted) => ctx.extracted = Some(extracted),
                Err(e) => {
                    // The coordinator always attempts OCR before giving
                    // up, so extraction failures surface at the fallback
                    // stage.
                    return self.fail(&ctx, progress, JobStage::OcrFallback, e.into());
                }
            }
        }

        // Stage 3: Normalization
        {
            let _step = info_span!("normalize").entered();
            if let Err(e) = deadline.check(&ctx.job.id) {
                return self.fail(&ctx, progress, JobStage::Processing, e);
            }
            progress.report(ProgressEvent::stage(
                JobStage::Processing,
                "Processing text for speech synthesis...",
            ));
            let extracted = ctx.extracted.as_ref().expect("extraction completed");
            ctx.speech_text = Some(normalize_with_limit(
                &extracted.text,
                self.config.max_speech_chars,
            ));
        }

        // Stage 4: Synthesis
        {
            let _step = info_span!("synthesize").entered();
            if let Err(e) = deadline.check(&ctx.job.id) {
                return self.fail(&ctx, progress, JobStage::Synthesizing, e);
            }
            progress.report(ProgressEvent::stage(
                JobStage::Synthesizing,
                "Generating audio...",
            ));
            let text = ctx.speech_text.as_ref().expect("normalization completed");
            let destination = self.artifacts.audio_path(&ctx.job.id);
            if let Err(e) =
                self.synthesizer
                    .synthesize(text, &ctx.job.voice_settings, &destination)
            {
                return self.fail(&ctx, progress, JobStage::Synthesizing, e.into());
            }
        }

        self.artifacts.register(&ctx.job.id);

        let text_length = ctx
            .speech_text
            .as_ref()
            .map(|t| t.chars().count())
            .unwrap_or(0);
        let output = JobOutput {
            audio_ref: format!("/audio/{}", ctx.job.id),
            text_length,
            voice_used: ctx.job.voice_settings.voice.clone(),
        };

        progress.report(ProgressEvent::Completed {
            output: output.clone(),
        });
        JobResult::success(&ctx.job, output)
    }

    fn step_analyze(&self, ctx: &PipelineContext) -> Result<(), PipelineError> {
        std::fs::metadata(&ctx.job.source_path).map_err(|e| {
            PipelineError::Extraction(ExtractionError::ReadDocument {
                path: ctx.job.source_path.clone(),
                source: e,
            })
        })?;
        Ok(())
    }

    fn fail(
        &self,
        ctx: &PipelineContext,
        progress: &dyn ProgressReporter,
        stage: JobStage,
        error: PipelineError,
    ) -> JobResult {
        let message = error.to_string();
        error!("Job {} failed at {}: {}", ctx.job.id, stage, message);
        progress.report(ProgressEvent::Failed {
            stage,
            error: message.clone(),
        });
        JobResult::failure(&ctx.job, stage, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::DEFAULT_TTL;
    use crate::error::{MathSpeechError, SynthesisError};
    use crate::extract::{DocumentNode, OcrExtractor, StructuredDocument, StructuredExtractor};
    use crate::mathspeech::MathSpeech;
    use crate::pipeline::progress::NoopProgress;
    use crate::worker::job::{Job, VoiceSettings};
    use std::path::{Path, PathBuf};
    use std::time::Duration;
    use tempfile::TempDir;

    struct FakeStructured(Vec<DocumentNode>);

    impl StructuredExtractor for FakeStructured {
        fn extract(&self, _document: &Path) -> Result<StructuredDocument, ExtractionError> {
            Ok(StructuredDocument {
                nodes: self.0.clone(),
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

    struct RejectingSynth;

    impl SpeechSynthesizer for RejectingSynth {
        fn synthesize(
            &self,
            _text: &str,
            _voice: &VoiceSettings,
            _destination: &Path,
        ) -> Result<(), SynthesisError> {
            Err(SynthesisError::Rejected {
                message: "voice not found".to_string(),
            })
        }
    }

    fn test_config(audio_dir: &Path) -> Arc<PipelineConfig> {
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

    fn test_pipeline(
        audio_dir: &Path,
        nodes: Vec<DocumentNode>,
        synthesizer: Box<dyn SpeechSynthesizer>,
    ) -> (Pipeline, Arc<ArtifactStore>) {
        let artifacts = Arc::new(ArtifactStore::new(audio_dir.to_path_buf(), DEFAULT_TTL));
        let coordinator = ExtractionCoordinator::new(
            Box::new(FakeStructured(nodes)),
            Box::new(EmptyOcr),
            DocumentAssembler::new(Box::new(NoMath)),
        );
        let pipeline = Pipeline::with_collaborators(
            test_config(audio_dir),
            Arc::clone(&artifacts),
            coordinator,
            synthesizer,
        );
        (pipeline, artifacts)
    }

    fn write_source(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("upload.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();
        path
    }

    #[test]
    fn test_successful_run_produces_output_and_deletes_source() {
        let dir = TempDir::new().unwrap();
        let source = write_source(&dir);
        let nodes = vec![DocumentNode::Text("lorem ipsum ".repeat(50))];
        let (pipeline, artifacts) = test_pipeline(dir.path(), nodes, Box::new(FileWritingSynth));

        let job = Job::new(source.clone(), VoiceSettings::default());
        let job_id = job.id.clone();
        let result = pipeline.run(PipelineContext::new(job), &NoopProgress);

        assert!(result.success, "run failed: {:?}", result.error);
        let output = result.output.unwrap();
        assert_eq!(output.audio_ref, format!("/audio/{}", job_id));
        assert_eq!(output.voice_used, "en_US-lessac-medium");
        assert!(output.text_length > 0);

        assert!(!source.exists(), "source file must be deleted");
        assert!(artifacts.retrieve(&job_id).is_some());
    }

    #[test]
    fn test_missing_source_fails_at_analyzing() {
        let dir = TempDir::new().unwrap();
        let (pipeline, _) = test_pipeline(dir.path(), vec![], Box::new(FileWritingSynth));

        let job = Job::new(dir.path().join("gone.pdf"), VoiceSettings::default());
        let result = pipeline.run(PipelineContext::new(job), &NoopProgress);

        assert!(!result.success);
        let (stage, _) = result.error.unwrap();
        assert_eq!(stage, JobStage::Analyzing);
    }

    #[test]
    fn test_no_usable_text_fails_at_fallback_and_deletes_source() {
        let dir = TempDir::new().unwrap();
        let source = write_source(&dir);
        let (pipeline, _) = test_pipeline(dir.path(), vec![], Box::new(FileWritingSynth));

        let job = Job::new(source.clone(), VoiceSettings::default());
        let result = pipeline.run(PipelineContext::new(job), &NoopProgress);

        assert!(!result.success);
        let (stage, message) = result.error.unwrap();
        assert_eq!(stage, JobStage::OcrFallback);
        assert!(message.contains("No usable text"));
        assert!(!source.exists());
    }

    #[test]
    fn test_synthesis_rejection_fails_at_synthesizing_and_deletes_source() {
        let dir = TempDir::new().unwrap();
        let source = write_source(&dir);
        let nodes = vec![DocumentNode::Text("lorem ipsum ".repeat(50))];
        let (pipeline, artifacts) = test_pipeline(dir.path(), nodes, Box::new(RejectingSynth));

        let job = Job::new(source.clone(), VoiceSettings::default());
        let job_id = job.id.clone();
        let result = pipeline.run(PipelineContext::new(job), &NoopProgress);

        assert!(!result.success);
        let (stage, message) = result.error.unwrap();
        assert_eq!(stage, JobStage::Synthesizing);
        assert!(message.contains("voice not found"));
        assert!(!source.exists());
        assert!(artifacts.retrieve(&job_id).is_none());
    }

    #[test]
    fn test_hard_deadline_fails_before_next_stage() {
        let dir = TempDir::new().unwrap();
        let source = write_source(&dir);
        let nodes = vec![DocumentNode::Text("lorem ipsum ".repeat(50))];
        let artifacts = Arc::new(ArtifactStore::new(dir.path().to_path_buf(), DEFAULT_TTL));
        let coordinator = ExtractionCoordinator::new(
            Box::new(FakeStructured(nodes)),
            Box::new(EmptyOcr),
            DocumentAssembler::new(Box::new(NoMath)),
        );
        let mut config = test_config(dir.path());
        {
            let config = Arc::get_mut(&mut config).unwrap();
            config.soft_timeout = Duration::ZERO;
            config.hard_timeout = Duration::ZERO;
        }
        let pipeline = Pipeline::with_collaborators(
            config,
            artifacts,
            coordinator,
            Box::new(FileWritingSynth),
        );

        let job = Job::new(source.clone(), VoiceSettings::default());
        let result = pipeline.run(PipelineContext::new(job), &NoopProgress);

        assert!(!result.success);
        let (stage, message) = result.error.unwrap();
        assert_eq!(stage, JobStage::Extracting);
        assert!(message.contains("hard time limit"));
        assert!(!source.exists());
    }
}
