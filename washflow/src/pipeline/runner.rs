//! The sequential eight-stage runner.

use crate::cancellation::CancellationToken;
use crate::config::RunnerConfig;
use crate::context::{RunContext, RunIdentity};
use crate::core::{
    GeneratedImage, ImageSource, OutputFormat, ReferenceImage, StageArtifact, StageKind,
};
use crate::errors::{InputError, PipelineError, StageError};
use crate::events::{self, EventSink, NoOpEventSink};
use crate::observability::{run_span, stage_span, SpanTimer};
use crate::pipeline::{RunReport, RunStatus};
use crate::providers::ImageGenerator;
use crate::stages::{
    effective_prompt, StageDefinition, StageRecord, StageResult, StageSet, DEFAULT_SYSTEM_PROMPT,
};
use crate::storage::{ArtifactStore, FsArtifactStore};
use serde_json::json;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

/// Inputs of one run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// The reference photograph.
    pub original: ImageSource,
    /// Instruction prepended to every stage prompt.
    pub system_prompt: String,
    /// The eight stages.
    pub stages: StageSet,
    /// Directory receiving the artifacts. Created if missing.
    pub output_root: PathBuf,
    /// Token the caller can use to stop the run.
    pub cancellation: Option<Arc<CancellationToken>>,
    /// Caller correlation ID, copied into events.
    pub request_id: Option<Uuid>,
}

impl RunRequest {
    /// Creates a request with the default watercolor stages and system prompt.
    #[must_use]
    pub fn new(original: impl Into<ImageSource>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            original: original.into(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            stages: StageSet::watercolor(),
            output_root: output_root.into(),
            cancellation: None,
            request_id: None,
        }
    }

    /// Sets the system prompt.
    #[must_use]
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    /// Sets the stages.
    #[must_use]
    pub fn with_stages(mut self, stages: StageSet) -> Self {
        self.stages = stages;
        self
    }

    /// Attaches a cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: Arc<CancellationToken>) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Sets the caller correlation ID.
    #[must_use]
    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = Some(request_id);
        self
    }
}

/// Runs the eight stages in order, stopping at the first failure.
///
/// A runner holds no per-run state and can serve concurrent runs, as long as
/// each run writes to its own output root.
pub struct StagePipelineRunner {
    generator: Arc<dyn ImageGenerator>,
    config: RunnerConfig,
    events: Arc<dyn EventSink>,
}

impl fmt::Debug for StagePipelineRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StagePipelineRunner")
            .field("generator", &self.generator.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl StagePipelineRunner {
    /// Creates a runner with the default configuration and no event sink.
    #[must_use]
    pub fn new(generator: Arc<dyn ImageGenerator>) -> Self {
        Self {
            generator,
            config: RunnerConfig::default(),
            events: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the configuration.
    #[must_use]
    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Runs against a filesystem store at `request.output_root`.
    pub async fn run(&self, request: RunRequest) -> Result<RunReport, PipelineError> {
        let store = FsArtifactStore::new(request.output_root.clone());
        self.run_with_store(request, &store).await
    }

    /// Runs against an arbitrary artifact store.
    ///
    /// Returns `Err` only when the inputs are invalid, before any stage runs.
    /// Every stage failure is reported through [`RunReport::status`].
    pub async fn run_with_store(
        &self,
        request: RunRequest,
        store: &dyn ArtifactStore,
    ) -> Result<RunReport, PipelineError> {
        let original = request.original.load()?;
        store.prepare().map_err(|e| InputError::OutputRoot {
            path: store.location(),
            reason: e.to_string(),
        })?;

        let mut identity = RunIdentity::new();
        if let Some(request_id) = request.request_id {
            identity = identity.with_request_id(request_id);
        }

        let span = run_span(&identity);
        Ok(self
            .execute(identity, original, &request, store)
            .instrument(span)
            .await)
    }

    async fn execute(
        &self,
        identity: RunIdentity,
        original: ReferenceImage,
        request: &RunRequest,
        store: &dyn ArtifactStore,
    ) -> RunReport {
        let timer = SpanTimer::start("pipeline_run");
        let deadline = self.config.run_timeout().map(|limit| Instant::now() + limit);
        let output_root = store.location();

        info!(
            generator = self.generator.name(),
            output_root = %output_root.display(),
            output_format = %self.config.output_format,
            "Pipeline run started"
        );
        self.events
            .emit(
                events::RUN_STARTED,
                Some(json!({
                    "run": identity.to_fields(),
                    "output_root": output_root.display().to_string(),
                    "output_format": self.config.output_format,
                    "generator": self.generator.name(),
                })),
            )
            .await;

        let cancellation = request.cancellation.as_deref();
        let mut ctx = RunContext::new(identity, original);

        for definition in &request.stages {
            let started_at = chrono::Utc::now();
            let stage_timer = SpanTimer::start(definition.kind.slug());

            let step = async {
                let result = self
                    .execute_stage(
                        &ctx,
                        definition,
                        &request.system_prompt,
                        cancellation,
                        deadline,
                        store,
                    )
                    .await;
                self.report_stage(&ctx, definition, &result, stage_timer.elapsed_ms())
                    .await;
                result
            };
            let result = step.instrument(stage_span(definition)).await;

            ctx = ctx.advance(definition, result, started_at, stage_timer.finish());
            if ctx.is_aborted() {
                break;
            }
        }

        let (identity, entries) = ctx.into_parts();
        let status = match entries.last().and_then(StageRecord::error) {
            Some(error) => RunStatus::Aborted {
                at_stage: error.stage(),
                error: error.clone(),
            },
            None => RunStatus::Complete,
        };

        if self.config.discard_stale_artifacts {
            let produced = entries.iter().filter(|e| e.is_produced()).count();
            self.discard_stale(&request.stages, produced, store);
        }

        let report = RunReport {
            run_id: identity.run_id,
            output_root,
            output_format: self.config.output_format,
            started_at: identity.started_at,
            finished_at: chrono::Utc::now(),
            duration_ms: timer.finish(),
            entries,
            status,
        };

        match &report.status {
            RunStatus::Complete => {
                info!(duration_ms = report.duration_ms, "Pipeline run complete");
                self.events
                    .emit(
                        events::RUN_COMPLETED,
                        Some(json!({
                            "run": identity.to_fields(),
                            "duration_ms": report.duration_ms,
                            "artifacts": report.artifacts().len(),
                        })),
                    )
                    .await;
            }
            RunStatus::Aborted { at_stage, error } => {
                warn!(
                    at_stage = %at_stage,
                    position = at_stage.position(),
                    error = %error,
                    duration_ms = report.duration_ms,
                    "Pipeline run aborted"
                );
                self.events
                    .emit(
                        events::RUN_ABORTED,
                        Some(json!({
                            "run": identity.to_fields(),
                            "at_stage": at_stage,
                            "position": at_stage.position(),
                            "error": error,
                            "duration_ms": report.duration_ms,
                        })),
                    )
                    .await;
            }
        }

        report
    }

    async fn execute_stage(
        &self,
        ctx: &RunContext,
        definition: &StageDefinition,
        system_prompt: &str,
        cancellation: Option<&CancellationToken>,
        deadline: Option<Instant>,
        store: &dyn ArtifactStore,
    ) -> StageResult {
        let stage = definition.kind;

        if let Some(token) = cancellation.filter(|t| t.is_cancelled()) {
            return cancelled(stage, token).into();
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return StageError::generation(stage, StageError::TIMEOUT).into();
        }

        let references = ctx.references();
        let prompt = effective_prompt(system_prompt, &definition.prompt_template);

        info!(references = references.len(), "Stage started");
        self.events
            .emit(
                events::STAGE_STARTED,
                Some(json!({
                    "run": ctx.identity().to_fields(),
                    "stage": stage,
                    "position": stage.position(),
                    "name": definition.name,
                    "references": references.len(),
                })),
            )
            .await;

        let generated = match self
            .call_generator(stage, &prompt, references.as_slice(), cancellation, deadline)
            .await
        {
            Ok(generated) => generated,
            Err(error) => return error.into(),
        };

        // A result that lands after cancellation is dropped unpersisted.
        if let Some(token) = cancellation.filter(|t| t.is_cancelled()) {
            return cancelled(stage, token).into();
        }

        match self.persist(definition, &generated, store) {
            Ok((image, artifact)) => StageResult::Produced { image, artifact },
            Err(error) => error.into(),
        }
    }

    /// Makes exactly one generation call, bounded by the timeouts and the token.
    async fn call_generator(
        &self,
        stage: StageKind,
        prompt: &str,
        references: &[ReferenceImage],
        cancellation: Option<&CancellationToken>,
        deadline: Option<Instant>,
    ) -> Result<GeneratedImage, StageError> {
        let call = self.generator.generate(prompt, references);
        let limit = self.call_limit(deadline);

        let bounded = async move {
            match limit {
                Some(limit) => tokio::time::timeout(limit, call)
                    .await
                    .map_err(|_| StageError::generation(stage, StageError::TIMEOUT)),
                None => Ok(call.await),
            }
        };

        let outcome = match cancellation {
            Some(token) => tokio::select! {
                biased;
                () = token.cancelled() => return Err(cancelled(stage, token)),
                outcome = bounded => outcome,
            },
            None => bounded.await,
        }?;

        match outcome {
            Ok(Some(image)) => Ok(image),
            Ok(None) => Err(StageError::generation(stage, StageError::NO_IMAGE)),
            Err(e) => Err(StageError::generation(stage, e.to_string())),
        }
    }

    fn call_limit(&self, deadline: Option<Instant>) -> Option<Duration> {
        let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
        match (self.config.stage_timeout(), remaining) {
            (Some(stage), Some(run)) => Some(stage.min(run)),
            (stage, run) => stage.or(run),
        }
    }

    /// Decodes, re-encodes and writes the generated image.
    fn persist(
        &self,
        definition: &StageDefinition,
        generated: &GeneratedImage,
        store: &dyn ArtifactStore,
    ) -> Result<(ReferenceImage, StageArtifact), StageError> {
        let stage = definition.kind;
        let format = self.config.output_format;

        let decoded = generated.decode().map_err(|e| {
            StageError::generation(stage, format!("returned image could not be decoded: {e}"))
        })?;
        let image = ReferenceImage::encode(&decoded, format, self.config.jpeg_quality())
            .map_err(|e| StageError::persistence(stage, format!("encoding failed: {e}")))?;

        let filename = definition.output_filename(format);
        let path = store
            .persist(&filename, image.bytes())
            .map_err(|e| StageError::persistence(stage, e.to_string()))?;

        let artifact = StageArtifact::new(stage, path, format, image.bytes(), image.dimensions());
        Ok((image, artifact))
    }

    async fn report_stage(
        &self,
        ctx: &RunContext,
        definition: &StageDefinition,
        result: &StageResult,
        duration_ms: u64,
    ) {
        let stage = definition.kind;
        match result {
            StageResult::Produced { artifact, .. } => {
                info!(
                    path = %artifact.path.display(),
                    bytes = artifact.byte_len,
                    duration_ms,
                    "Stage produced"
                );
                self.events
                    .emit(
                        events::STAGE_PRODUCED,
                        Some(json!({
                            "run": ctx.identity().to_fields(),
                            "stage": stage,
                            "position": stage.position(),
                            "artifact": artifact,
                            "duration_ms": duration_ms,
                        })),
                    )
                    .await;
            }
            StageResult::Failed(error) => {
                warn!(error = %error, duration_ms, "Stage failed");
                self.events
                    .emit(
                        events::STAGE_FAILED,
                        Some(json!({
                            "run": ctx.identity().to_fields(),
                            "stage": stage,
                            "position": stage.position(),
                            "error": error,
                            "duration_ms": duration_ms,
                        })),
                    )
                    .await;
            }
        }
    }

    /// Removes files left by earlier runs under any stage filename.
    ///
    /// The first `produced` stages keep only the file written in the current
    /// format. Every other stage loses its files in all formats.
    fn discard_stale(&self, stages: &StageSet, produced: usize, store: &dyn ArtifactStore) {
        for (index, definition) in stages.iter().enumerate() {
            for format in OutputFormat::ALL {
                if index < produced && format == self.config.output_format {
                    continue;
                }
                let filename = definition.output_filename(format);
                match store.discard(&filename) {
                    Ok(true) => {
                        debug!(stage = %definition.kind, filename = %filename, "Removed stale artifact");
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!(stage = %definition.kind, error = %e, "Failed to remove stale artifact");
                    }
                }
            }
        }
    }
}

fn cancelled(stage: StageKind, token: &CancellationToken) -> StageError {
    StageError::cancelled(stage, token.reason().unwrap_or_else(|| "cancelled".to_string()))
}

/// Runs the pipeline once with the default runner configuration.
///
/// `stages` must contain exactly eight definitions in pipeline order.
pub async fn run_pipeline(
    generator: Arc<dyn ImageGenerator>,
    original: impl Into<ImageSource>,
    system_prompt: impl Into<String>,
    stages: Vec<StageDefinition>,
    output_root: impl Into<PathBuf>,
) -> Result<RunReport, PipelineError> {
    let stages = StageSet::new(stages)?;
    let request = RunRequest::new(original, output_root)
        .with_system_prompt(system_prompt)
        .with_stages(stages);
    StagePipelineRunner::new(generator).run(request).await
}
