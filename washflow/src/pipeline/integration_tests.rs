//! End-to-end tests for the stage pipeline runner.

#[cfg(test)]
mod tests {
    use crate::cancellation::CancellationToken;
    use crate::config::RunnerConfig;
    use crate::core::{GeneratedImage, ImageSource, OutputFormat, ReferenceImage, StageKind};
    use crate::errors::{GenerationError, InputError, PipelineError, StageError, StorageError};
    use crate::events::{self, CollectingEventSink};
    use crate::pipeline::{run_pipeline, RunRequest, RunStatus, StagePipelineRunner};
    use crate::providers::ImageGenerator;
    use crate::stages::{StageDefinition, StageSet};
    use crate::storage::MockArtifactStore;
    use crate::testing::{
        assert_aborted_at, assert_artifacts_on_disk, assert_complete, labelled_stages, solid_png,
        stage_definitions, write_photo, ScriptedGenerator, ScriptedResponse,
    };
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Workspace {
        _dir: TempDir,
        photo: PathBuf,
        root: PathBuf,
    }

    fn workspace() -> Workspace {
        let dir = tempfile::tempdir().unwrap();
        let photo = write_photo(dir.path());
        let root = dir.path().join("out");
        Workspace {
            _dir: dir,
            photo,
            root,
        }
    }

    fn runner(generator: &Arc<ScriptedGenerator>) -> StagePipelineRunner {
        StagePipelineRunner::new(generator.clone())
    }

    fn file_names(root: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(root)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    const CANONICAL_JPG: [&str; 8] = [
        "step1_light_sketch.jpg",
        "step2_first_wash.jpg",
        "step3_second_wash.jpg",
        "step4_medium_tones.jpg",
        "step5_shadows.jpg",
        "step6_details.jpg",
        "step7_darkest_values.jpg",
        "step8_finished_watercolor.jpg",
    ];

    #[tokio::test]
    async fn test_all_stages_succeed() {
        let ws = workspace();
        let generator = Arc::new(ScriptedGenerator::succeeding());

        let report = runner(&generator)
            .run(RunRequest::new(ws.photo.clone(), &ws.root))
            .await
            .unwrap();

        assert_complete(&report);
        assert_artifacts_on_disk(&report);
        assert_eq!(report.entries.len(), 8);
        assert_eq!(generator.call_count(), 8);
        assert_eq!(file_names(&ws.root), CANONICAL_JPG.to_vec());

        for artifact in report.artifacts() {
            let bytes = std::fs::read(&artifact.path).unwrap();
            assert_eq!(image::guess_format(&bytes).unwrap(), image::ImageFormat::Jpeg);
            assert_eq!(artifact.byte_len, bytes.len() as u64);
            assert_eq!(artifact.sha256, crate::utils::sha256_hex(&bytes));
        }
    }

    #[tokio::test]
    async fn test_stage_five_without_image_aborts() {
        let ws = workspace();
        let generator = Arc::new(ScriptedGenerator::failing_at(5, ScriptedResponse::NoImage));

        let report = runner(&generator)
            .run(RunRequest::new(ws.photo.clone(), &ws.root))
            .await
            .unwrap();

        assert_aborted_at(&report, StageKind::Shadow);
        assert_artifacts_on_disk(&report);
        assert_eq!(report.entries.len(), 5);
        assert_eq!(
            report.failure(),
            Some(&StageError::generation(StageKind::Shadow, "no image returned"))
        );
        assert!(report.entries[4].output_path().is_none());
        assert_eq!(generator.call_count(), 5, "stages 6-8 must never be invoked");
        assert_eq!(file_names(&ws.root), CANONICAL_JPG[..4].to_vec());
    }

    #[tokio::test]
    async fn test_references_thread_previous_output() {
        let ws = workspace();
        let generator = Arc::new(ScriptedGenerator::succeeding());

        let report = runner(&generator)
            .run(RunRequest::new(ws.photo.clone(), &ws.root))
            .await
            .unwrap();
        assert_complete(&report);

        let original = std::fs::read(&ws.photo).unwrap();
        let calls = generator.calls();

        assert_eq!(calls[0].references.len(), 1);
        assert_eq!(calls[0].references[0].bytes(), original.as_slice());

        for (i, call) in calls.iter().enumerate().skip(1) {
            assert_eq!(call.references.len(), 2, "stage {}", i + 1);
            assert_eq!(call.references[0].bytes(), original.as_slice());
            let previous = std::fs::read(&report.entries[i - 1].artifact().unwrap().path).unwrap();
            assert_eq!(call.references[1].bytes(), previous.as_slice());
            assert_eq!(call.references[1].mime_type(), "image/jpeg");
        }
    }

    #[tokio::test]
    async fn test_prompt_is_system_then_stage() {
        let ws = workspace();
        let generator = Arc::new(ScriptedGenerator::succeeding());
        let request = RunRequest::new(ws.photo.clone(), &ws.root)
            .with_system_prompt("SYSTEM")
            .with_stages(labelled_stages());

        runner(&generator).run(request).await.unwrap();

        let prompts: Vec<String> = generator.calls().into_iter().map(|c| c.prompt).collect();
        let expected: Vec<String> = StageKind::ALL
            .iter()
            .map(|kind| format!("SYSTEM\n\npaint {kind}"))
            .collect();
        assert_eq!(prompts, expected);
    }

    #[tokio::test]
    async fn test_blank_system_prompt_is_sent_verbatim() {
        let ws = workspace();
        let generator = Arc::new(ScriptedGenerator::succeeding());
        let request = RunRequest::new(ws.photo.clone(), &ws.root)
            .with_system_prompt("  ")
            .with_stages(labelled_stages());

        runner(&generator).run(request).await.unwrap();

        let calls = generator.calls();
        assert_eq!(calls[0].prompt, "  \n\npaint sketch");
        assert_eq!(calls[7].prompt, "  \n\npaint finish");
    }

    #[tokio::test]
    async fn test_filenames_do_not_depend_on_prompts() {
        let ws = workspace();
        let generator = Arc::new(ScriptedGenerator::succeeding());
        let stages = StageSet::watercolor()
            .with_prompt(StageKind::Sketch, "completely different")
            .with_prompt(StageKind::Finish, "");

        let report = runner(&generator)
            .run(RunRequest::new(ws.photo.clone(), &ws.root).with_stages(stages))
            .await
            .unwrap();

        let names: Vec<&str> = report
            .artifacts()
            .iter()
            .map(|a| a.filename.as_str())
            .collect();
        assert_eq!(names, CANONICAL_JPG.to_vec());
    }

    #[tokio::test]
    async fn test_unreadable_original_is_invalid_input() {
        let ws = workspace();
        let generator = Arc::new(ScriptedGenerator::succeeding());
        let missing = ws.photo.with_file_name("missing.png");

        let err = runner(&generator)
            .run(RunRequest::new(missing, &ws.root))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::InvalidInput(InputError::UnreadableImage { .. })
        ));
        assert_eq!(generator.call_count(), 0);
        assert!(!ws.root.exists());
    }

    #[tokio::test]
    async fn test_undecodable_original_is_invalid_input() {
        let ws = workspace();
        let generator = Arc::new(ScriptedGenerator::succeeding());
        let source = ImageSource::bytes("upload.jpg", b"GIF89a but not really".to_vec());

        let err = runner(&generator)
            .run(RunRequest::new(source, &ws.root))
            .await
            .unwrap_err();

        assert!(matches!(err.input_error(), InputError::UndecodableImage { .. }));
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_run_pipeline_rejects_wrong_stage_list() {
        let ws = workspace();
        let generator = Arc::new(ScriptedGenerator::succeeding());

        let mut definitions = stage_definitions();
        definitions.remove(3);
        let err = run_pipeline(generator.clone(), ws.photo.clone(), "", definitions, &ws.root)
            .await
            .unwrap_err();
        assert!(matches!(
            err.input_error(),
            InputError::StageCount { expected: 8, actual: 7 }
        ));

        let mut definitions = stage_definitions();
        definitions.reverse();
        let err = run_pipeline(generator.clone(), ws.photo.clone(), "", definitions, &ws.root)
            .await
            .unwrap_err();
        assert!(matches!(err.input_error(), InputError::StageOrder { position: 1, .. }));

        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_run_pipeline_happy_path() {
        let ws = workspace();
        let generator = Arc::new(ScriptedGenerator::succeeding());
        let definitions: Vec<StageDefinition> = StageKind::ALL
            .into_iter()
            .map(|kind| StageDefinition::new(kind, format!("do {kind}")))
            .collect();

        let report = run_pipeline(generator.clone(), ws.photo.clone(), "", definitions, &ws.root)
            .await
            .unwrap();

        assert_complete(&report);
        assert_eq!(generator.calls()[0].prompt, "\n\ndo sketch");
    }

    #[tokio::test]
    async fn test_generator_error_aborts() {
        let ws = workspace();
        let generator = Arc::new(ScriptedGenerator::failing_at(
            2,
            ScriptedResponse::Error(GenerationError::Transport("connection reset".into())),
        ));

        let report = runner(&generator)
            .run(RunRequest::new(ws.photo.clone(), &ws.root))
            .await
            .unwrap();

        assert_aborted_at(&report, StageKind::Wash1);
        let failure = report.failure().unwrap();
        assert!(failure.is_generation());
        assert!(failure.reason().contains("connection reset"));
        assert_eq!(generator.call_count(), 2);
    }

    #[tokio::test]
    async fn test_undecodable_payload_aborts() {
        let ws = workspace();
        let generator = Arc::new(ScriptedGenerator::failing_at(
            3,
            ScriptedResponse::Payload(GeneratedImage::new(b"not an image".to_vec())),
        ));

        let report = runner(&generator)
            .run(RunRequest::new(ws.photo.clone(), &ws.root))
            .await
            .unwrap();

        assert_aborted_at(&report, StageKind::Wash2);
        assert!(report.failure().unwrap().is_generation());
        assert_artifacts_on_disk(&report);
    }

    #[tokio::test]
    async fn test_png_output_format() {
        let ws = workspace();
        let generator = Arc::new(ScriptedGenerator::succeeding());
        let report = runner(&generator)
            .with_config(RunnerConfig::new().with_output_format(OutputFormat::Png))
            .run(RunRequest::new(ws.photo.clone(), &ws.root))
            .await
            .unwrap();

        assert_complete(&report);
        assert_eq!(report.output_format, OutputFormat::Png);
        let finish = report.final_artifact().unwrap();
        assert_eq!(finish.filename, "step8_finished_watercolor.png");
        let bytes = std::fs::read(&finish.path).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), image::ImageFormat::Png);
        assert_eq!((finish.width, finish.height), (8, 6));
    }

    #[tokio::test]
    async fn test_rerun_overwrites_artifacts() {
        let ws = workspace();

        let first = runner(&Arc::new(ScriptedGenerator::succeeding()))
            .run(RunRequest::new(ws.photo.clone(), &ws.root))
            .await
            .unwrap();

        let red = GeneratedImage::new(solid_png(8, 6, [255, 0, 0]));
        let second_generator = Arc::new(ScriptedGenerator::new(Vec::new()).with_fallback(
            ScriptedResponse::Payload(red),
        ));
        let second = runner(&second_generator)
            .run(RunRequest::new(ws.photo.clone(), &ws.root))
            .await
            .unwrap();

        assert_complete(&second);
        assert_eq!(file_names(&ws.root), CANONICAL_JPG.to_vec());
        for (old, new) in first.artifacts().iter().zip(second.artifacts()) {
            assert_eq!(old.path, new.path);
            assert_ne!(old.sha256, new.sha256);
            let on_disk = std::fs::read(&new.path).unwrap();
            assert_eq!(crate::utils::sha256_hex(&on_disk), new.sha256);
        }
    }

    #[tokio::test]
    async fn test_abort_removes_stale_artifacts_from_earlier_run() {
        let ws = workspace();

        runner(&Arc::new(ScriptedGenerator::succeeding()))
            .run(RunRequest::new(ws.photo.clone(), &ws.root))
            .await
            .unwrap();
        assert_eq!(file_names(&ws.root).len(), 8);

        let generator = Arc::new(ScriptedGenerator::failing_at(5, ScriptedResponse::NoImage));
        let report = runner(&generator)
            .run(RunRequest::new(ws.photo.clone(), &ws.root))
            .await
            .unwrap();

        assert_aborted_at(&report, StageKind::Shadow);
        assert_artifacts_on_disk(&report);
        assert_eq!(file_names(&ws.root), CANONICAL_JPG[..4].to_vec());
    }

    #[tokio::test]
    async fn test_stale_artifacts_kept_when_discard_disabled() {
        let ws = workspace();

        runner(&Arc::new(ScriptedGenerator::succeeding()))
            .run(RunRequest::new(ws.photo.clone(), &ws.root))
            .await
            .unwrap();

        let generator = Arc::new(ScriptedGenerator::failing_at(2, ScriptedResponse::NoImage));
        let report = runner(&generator)
            .with_config(RunnerConfig::new().with_discard_stale_artifacts(false))
            .run(RunRequest::new(ws.photo.clone(), &ws.root))
            .await
            .unwrap();

        assert_aborted_at(&report, StageKind::Wash1);
        assert_eq!(file_names(&ws.root).len(), 8);
    }

    fn png_runner(generator: &Arc<ScriptedGenerator>) -> StagePipelineRunner {
        runner(generator).with_config(RunnerConfig::new().with_output_format(OutputFormat::Png))
    }

    #[tokio::test]
    async fn test_abort_removes_artifacts_of_other_format() {
        let ws = workspace();

        let first = png_runner(&Arc::new(ScriptedGenerator::succeeding()))
            .run(RunRequest::new(ws.photo.clone(), &ws.root))
            .await
            .unwrap();
        assert_complete(&first);

        let generator = Arc::new(ScriptedGenerator::failing_at(2, ScriptedResponse::NoImage));
        let report = runner(&generator)
            .run(RunRequest::new(ws.photo.clone(), &ws.root))
            .await
            .unwrap();

        assert_aborted_at(&report, StageKind::Wash1);
        assert_artifacts_on_disk(&report);
        assert_eq!(file_names(&ws.root), vec!["step1_light_sketch.jpg"]);
    }

    #[tokio::test]
    async fn test_complete_run_replaces_artifacts_of_other_format() {
        let ws = workspace();

        png_runner(&Arc::new(ScriptedGenerator::succeeding()))
            .run(RunRequest::new(ws.photo.clone(), &ws.root))
            .await
            .unwrap();

        let report = runner(&Arc::new(ScriptedGenerator::succeeding()))
            .run(RunRequest::new(ws.photo.clone(), &ws.root))
            .await
            .unwrap();

        assert_complete(&report);
        assert_artifacts_on_disk(&report);
        assert_eq!(file_names(&ws.root), CANONICAL_JPG.to_vec());
    }

    #[tokio::test]
    async fn test_stage_timeout() {
        let ws = workspace();
        let generator = Arc::new(ScriptedGenerator::failing_at(2, ScriptedResponse::Hang));

        let report = runner(&generator)
            .with_config(RunnerConfig::new().with_stage_timeout(0.05))
            .run(RunRequest::new(ws.photo.clone(), &ws.root))
            .await
            .unwrap();

        assert_aborted_at(&report, StageKind::Wash1);
        assert_eq!(
            report.failure(),
            Some(&StageError::generation(StageKind::Wash1, "timeout"))
        );
        assert_artifacts_on_disk(&report);
    }

    #[tokio::test]
    async fn test_run_timeout() {
        let ws = workspace();
        let generator = Arc::new(ScriptedGenerator::failing_at(1, ScriptedResponse::Hang));

        let report = runner(&generator)
            .with_config(RunnerConfig::new().with_run_timeout(0.05))
            .run(RunRequest::new(ws.photo.clone(), &ws.root))
            .await
            .unwrap();

        assert_aborted_at(&report, StageKind::Sketch);
        assert_eq!(report.failure().unwrap().reason(), StageError::TIMEOUT);
        assert!(file_names(&ws.root).is_empty());
    }

    #[tokio::test]
    async fn test_cancel_during_generation() {
        let ws = workspace();
        let generator = Arc::new(ScriptedGenerator::failing_at(3, ScriptedResponse::Hang));
        let token = Arc::new(CancellationToken::new());

        let canceller = {
            let generator = generator.clone();
            let token = token.clone();
            tokio::spawn(async move {
                while generator.call_count() < 3 {
                    tokio::time::sleep(Duration::from_millis(2)).await;
                }
                token.cancel("user interrupt");
            })
        };

        let report = tokio::time::timeout(
            Duration::from_secs(10),
            runner(&generator).run(
                RunRequest::new(ws.photo.clone(), &ws.root).with_cancellation(token.clone()),
            ),
        )
        .await
        .expect("cancellation should stop the run")
        .unwrap();
        canceller.await.unwrap();

        assert_aborted_at(&report, StageKind::Wash2);
        assert_eq!(
            report.failure(),
            Some(&StageError::cancelled(StageKind::Wash2, "user interrupt"))
        );
        assert_artifacts_on_disk(&report);
        assert_eq!(file_names(&ws.root), CANONICAL_JPG[..2].to_vec());
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let ws = workspace();
        let generator = Arc::new(ScriptedGenerator::succeeding());
        let token = Arc::new(CancellationToken::new());
        token.cancel("shutting down");

        let report = runner(&generator)
            .run(RunRequest::new(ws.photo.clone(), &ws.root).with_cancellation(token))
            .await
            .unwrap();

        assert_aborted_at(&report, StageKind::Sketch);
        assert!(report.failure().unwrap().is_cancelled());
        assert_eq!(generator.call_count(), 0);
    }

    /// Cancels the token from inside the second call, then still returns an image.
    struct CancelsOnSecondCall {
        inner: ScriptedGenerator,
        token: Arc<CancellationToken>,
    }

    #[async_trait]
    impl ImageGenerator for CancelsOnSecondCall {
        fn name(&self) -> &str {
            "cancels-on-second-call"
        }

        async fn generate(
            &self,
            prompt: &str,
            references: &[ReferenceImage],
        ) -> Result<Option<GeneratedImage>, GenerationError> {
            if self.inner.call_count() == 1 {
                self.token.cancel("late");
            }
            self.inner.generate(prompt, references).await
        }
    }

    #[tokio::test]
    async fn test_result_after_cancellation_is_not_persisted() {
        let ws = workspace();
        let token = Arc::new(CancellationToken::new());
        let generator = Arc::new(CancelsOnSecondCall {
            inner: ScriptedGenerator::succeeding(),
            token: token.clone(),
        });

        let report = StagePipelineRunner::new(generator.clone())
            .run(RunRequest::new(ws.photo.clone(), &ws.root).with_cancellation(token))
            .await
            .unwrap();

        assert_aborted_at(&report, StageKind::Wash1);
        assert!(report.failure().unwrap().is_cancelled());
        assert_eq!(generator.inner.call_count(), 2);
        assert_eq!(file_names(&ws.root), vec!["step1_light_sketch.jpg"]);
    }

    #[tokio::test]
    async fn test_lifecycle_events() {
        let ws = workspace();
        let sink = Arc::new(CollectingEventSink::new());
        let generator = Arc::new(ScriptedGenerator::failing_at(2, ScriptedResponse::NoImage));

        let report = runner(&generator)
            .with_event_sink(sink.clone())
            .run(RunRequest::new(ws.photo.clone(), &ws.root).with_request_id(uuid::Uuid::nil()))
            .await
            .unwrap();

        assert_eq!(
            sink.event_types(),
            vec![
                events::RUN_STARTED,
                events::STAGE_STARTED,
                events::STAGE_PRODUCED,
                events::STAGE_STARTED,
                events::STAGE_FAILED,
                events::RUN_ABORTED,
            ]
        );

        let events = sink.events();
        let started = events[0].1.as_ref().unwrap();
        assert_eq!(started["run"]["run_id"], report.run_id.to_string());
        assert_eq!(started["run"]["request_id"], uuid::Uuid::nil().to_string());

        let failed = events[4].1.as_ref().unwrap();
        assert_eq!(failed["stage"], "wash-1");
        assert_eq!(failed["error"]["reason"], "no image returned");

        let aborted = events[5].1.as_ref().unwrap();
        assert_eq!(aborted["position"], 2);
    }

    #[tokio::test]
    async fn test_completed_event_counts_artifacts() {
        let ws = workspace();
        let sink = Arc::new(CollectingEventSink::new());
        let generator = Arc::new(ScriptedGenerator::succeeding());

        runner(&generator)
            .with_event_sink(sink.clone())
            .run(RunRequest::new(ws.photo.clone(), &ws.root))
            .await
            .unwrap();

        assert_eq!(sink.events_of_type("stage.produced").len(), 8);
        let (kind, data) = sink.events().pop().unwrap();
        assert_eq!(kind, events::RUN_COMPLETED);
        assert_eq!(data.unwrap()["artifacts"], 8);
    }

    #[tokio::test]
    async fn test_persistence_failure_aborts() {
        let ws = workspace();
        let generator = Arc::new(ScriptedGenerator::succeeding());

        let mut store = MockArtifactStore::new();
        store
            .expect_location()
            .return_const(PathBuf::from("/virtual/out"));
        store.expect_prepare().times(1).returning(|| Ok(()));
        let mut writes = 0;
        store.expect_persist().times(3).returning(move |filename, _bytes| {
            writes += 1;
            if writes == 3 {
                Err(StorageError::Write {
                    path: PathBuf::from(filename),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                })
            } else {
                Ok(PathBuf::from("/virtual/out").join(filename))
            }
        });
        // Two produced stages drop their PNG name; six stages drop both names.
        store
            .expect_discard()
            .times(2 + 6 * 2)
            .returning(|_| Ok(false));

        let report = runner(&generator)
            .run_with_store(RunRequest::new(ws.photo.clone(), &ws.root), &store)
            .await
            .unwrap();

        assert_aborted_at(&report, StageKind::Wash2);
        let failure = report.failure().unwrap();
        assert!(failure.is_persistence());
        assert!(failure.reason().contains("disk full"));
        assert_eq!(report.output_root, PathBuf::from("/virtual/out"));
        assert_eq!(generator.call_count(), 3);
    }

    #[tokio::test]
    async fn test_discard_errors_do_not_change_status() {
        let ws = workspace();
        let generator = Arc::new(ScriptedGenerator::failing_at(7, ScriptedResponse::NoImage));

        let mut store = MockArtifactStore::new();
        store.expect_location().return_const(PathBuf::from("/virtual"));
        store.expect_prepare().returning(|| Ok(()));
        store
            .expect_persist()
            .times(6)
            .returning(|filename, _| Ok(PathBuf::from("/virtual").join(filename)));
        store.expect_discard().times(6 + 2 * 2).returning(|filename| {
            Err(StorageError::Remove {
                path: PathBuf::from(filename),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            })
        });

        let report = runner(&generator)
            .run_with_store(RunRequest::new(ws.photo.clone(), &ws.root), &store)
            .await
            .unwrap();

        assert_aborted_at(&report, StageKind::DarkestValue);
        assert!(report.failure().unwrap().is_generation());
    }

    #[tokio::test]
    async fn test_unwritable_output_root_is_invalid_input() {
        let ws = workspace();
        let generator = Arc::new(ScriptedGenerator::succeeding());

        let mut store = MockArtifactStore::new();
        store.expect_location().return_const(PathBuf::from("/read-only"));
        store.expect_prepare().returning(|| {
            Err(StorageError::Prepare {
                path: PathBuf::from("/read-only"),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            })
        });
        store.expect_persist().never();

        let err = runner(&generator)
            .run_with_store(RunRequest::new(ws.photo.clone(), &ws.root), &store)
            .await
            .unwrap_err();

        assert!(matches!(err.input_error(), InputError::OutputRoot { .. }));
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_report_serializes() {
        let ws = workspace();
        let generator = Arc::new(ScriptedGenerator::failing_at(4, ScriptedResponse::NoImage));

        let report = runner(&generator)
            .run(RunRequest::new(ws.photo.clone(), &ws.root))
            .await
            .unwrap();

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"]["state"], "aborted");
        assert_eq!(json["status"]["at_stage"], "medium-tone");
        assert_eq!(json["entries"][0]["status"], "produced");
        assert_eq!(json["entries"][3]["status"], "failed");
        assert_eq!(json["output_format"], "jpeg");

        let back: crate::pipeline::RunReport = serde_json::from_value(json).unwrap();
        assert_eq!(back, report);
        assert!(matches!(back.status, RunStatus::Aborted { .. }));
    }

    #[tokio::test]
    async fn test_concurrent_runs_share_a_runner() {
        let first = workspace();
        let second = workspace();
        let generator = Arc::new(ScriptedGenerator::succeeding());
        let runner = runner(&generator);

        let (a, b) = tokio::join!(
            runner.run(RunRequest::new(first.photo.clone(), &first.root)),
            runner.run(RunRequest::new(second.photo.clone(), &second.root)),
        );

        let (a, b) = (a.unwrap(), b.unwrap());
        assert_complete(&a);
        assert_complete(&b);
        assert_ne!(a.run_id, b.run_id);
        assert_eq!(generator.call_count(), 16);
    }
}
