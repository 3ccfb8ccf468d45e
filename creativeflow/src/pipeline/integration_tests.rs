//! End-to-end tests for both execution modes.

#[cfg(test)]
mod tests {
    use crate::config::{PipelineConfig, RetryConfig, TimeoutConfig};
    use crate::context::PipelineRequest;
    use crate::core::{
        CreativeIdeas, GeneratedContent, StepKind, StepRecord, StepSchema, StreamEvent,
    };
    use crate::errors::{CreativeflowError, ModelError};
    use crate::events::{event_types, CollectingEventSink};
    use crate::model::{FragmentStream, MockModelService};
    use crate::pipeline::{CreativePipeline, JitterStrategy};
    use crate::testing::{canned_reply, lumen_request, Script, ScriptedModel};
    use futures::StreamExt;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use tokio::sync::mpsc;
    use tokio_test::{assert_err, assert_ok};

    fn pipeline(model: &Arc<ScriptedModel>) -> CreativePipeline {
        CreativePipeline::new(model.clone(), PipelineConfig::default())
    }

    fn pipeline_with(
        model: &Arc<ScriptedModel>,
        config: PipelineConfig,
        sink: &Arc<CollectingEventSink>,
    ) -> CreativePipeline {
        CreativePipeline::new(model.clone(), config).with_event_sink(sink.clone())
    }

    async fn collect_stream(pipeline: &CreativePipeline, request: PipelineRequest) -> Vec<StreamEvent> {
        pipeline.stream(request).unwrap().collect().await
    }

    fn complete_text(events: &[StreamEvent], step: StepKind) -> Option<String> {
        events.iter().find_map(|e| match e {
            StreamEvent::StepComplete { step: s, data } if *s == step.index() => Some(data.clone()),
            _ => None,
        })
    }

    // ---- streaming ----

    #[tokio::test]
    async fn test_streaming_steps_run_in_order() {
        let model = Arc::new(ScriptedModel::new());
        let events = collect_stream(&pipeline(&model), lumen_request()).await;

        // Per-step event sequence: start, one or more fragments, complete.
        let mut expected_step = 1;
        let mut iter = events.iter().peekable();
        while expected_step <= 6 {
            assert_eq!(
                iter.next(),
                Some(&StreamEvent::step_start(StepKind::from_index(expected_step).unwrap()))
            );
            let mut fragments = 0;
            while let Some(StreamEvent::StepStream { step, .. }) = iter.peek() {
                assert_eq!(*step, expected_step);
                fragments += 1;
                iter.next();
            }
            assert!(fragments > 0, "step {expected_step} streamed nothing");
            assert!(matches!(
                iter.next(),
                Some(StreamEvent::StepComplete { step, .. }) if *step == expected_step
            ));
            expected_step += 1;
        }
        assert!(matches!(iter.next(), Some(StreamEvent::Complete { .. })));
        assert_eq!(iter.next(), None);

        assert_eq!(
            model.calls(),
            vec![
                "product_analysis",
                "audience_analysis",
                "creative_ideation",
                "content_generation",
                "marketing_suggestions",
                "final_content",
            ]
        );
    }

    #[tokio::test]
    async fn test_streaming_fragments_concatenate_to_step_result() {
        let model = Arc::new(ScriptedModel::new().with_script(
            "creative_ideation",
            Script::Fragments(vec!["Pure ".into(), "Morning".into(), "".into(), " ☀".into()]),
        ));
        let events = collect_stream(&pipeline(&model), lumen_request()).await;

        let mut streamed: BTreeMap<u8, String> = BTreeMap::new();
        for event in &events {
            if let StreamEvent::StepStream { step, content } = event {
                streamed.entry(*step).or_default().push_str(content);
            }
        }
        for step in StepKind::ALL {
            assert_eq!(
                streamed.get(&step.index()).cloned(),
                complete_text(&events, step),
                "fragments of {step} do not add up"
            );
        }
        assert_eq!(
            complete_text(&events, StepKind::CreativeIdeation).as_deref(),
            Some("Pure Morning ☀")
        );

        let Some(StreamEvent::Complete { final_content }) = events.last() else {
            panic!("stream did not complete");
        };
        assert_eq!(Some(final_content.clone()), complete_text(&events, StepKind::FinalSynthesis));
    }

    #[tokio::test]
    async fn test_streamed_text_feeds_later_prompts_verbatim() {
        let model = Arc::new(ScriptedModel::new().with_script(
            "product_analysis",
            Script::reply("Not JSON at all, and that is fine here."),
        ));
        let events = collect_stream(&pipeline(&model), lumen_request()).await;
        assert!(matches!(events.last(), Some(StreamEvent::Complete { .. })));

        let ideation = model.prompts_for("creative_ideation");
        assert_eq!(ideation.len(), 1);
        assert!(ideation[0].text.contains("Not JSON at all, and that is fine here."));
    }

    #[tokio::test]
    async fn test_streaming_mid_step_failure_ends_with_one_error() {
        let model = Arc::new(ScriptedModel::new().with_script(
            "content_generation",
            Script::FailAfter(vec!["Lumen: all ".into()], ModelError::transport("connection reset")),
        ));
        let sink = Arc::new(CollectingEventSink::new());
        let events = collect_stream(&pipeline_with(&model, PipelineConfig::default(), &sink), lumen_request()).await;

        let errors: Vec<&StreamEvent> = events
            .iter()
            .filter(|e| matches!(e, StreamEvent::Error { .. }))
            .collect();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            events.last(),
            Some(StreamEvent::Error { step: Some(4), message }) if message.contains("connection reset")
        ));

        assert!(events.iter().all(|e| e.step().map_or(true, |s| s <= 4)));
        assert!(!events.iter().any(|e| matches!(e, StreamEvent::Complete { .. })));
        assert!(complete_text(&events, StepKind::ContentGeneration).is_none());
        assert_eq!(model.call_count(), 4);
        assert_eq!(sink.events_of_type(event_types::PIPELINE_FAILED).len(), 1);
    }

    #[tokio::test]
    async fn test_streaming_failure_before_first_fragment() {
        let model = Arc::new(ScriptedModel::new().with_script("product_analysis", Script::fail("refused")));
        let events = collect_stream(&pipeline(&model), lumen_request()).await;

        assert_eq!(events.len(), 2);
        assert_eq!(events[0], StreamEvent::step_start(StepKind::ProductAnalysis));
        assert!(matches!(&events[1], StreamEvent::Error { step: Some(1), .. }));
    }

    #[tokio::test]
    async fn test_streaming_step_timeout_is_fatal() {
        let model = Arc::new(ScriptedModel::new().with_script("audience_analysis", Script::Hang));
        let config = PipelineConfig::new().with_timeouts(TimeoutConfig::default().with_step_timeout(0.05));
        let sink = Arc::new(CollectingEventSink::new());
        let events = collect_stream(&pipeline_with(&model, config, &sink), lumen_request()).await;

        assert!(matches!(
            events.last(),
            Some(StreamEvent::Error { step: Some(2), message }) if message.starts_with("Timed out after 0.05s")
        ));
        assert_eq!(model.call_count(), 2);
    }

    #[tokio::test]
    async fn test_streaming_run_timeout_is_fatal() {
        let model = Arc::new(ScriptedModel::new().with_script("creative_ideation", Script::Hang));
        let config = PipelineConfig::new().with_timeouts(TimeoutConfig::default().with_run_timeout(0.05));
        let sink = Arc::new(CollectingEventSink::new());
        let events = collect_stream(&pipeline_with(&model, config, &sink), lumen_request()).await;

        let errors: Vec<&StreamEvent> = events
            .iter()
            .filter(|e| matches!(e, StreamEvent::Error { .. }))
            .collect();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            events.last(),
            Some(StreamEvent::Error { step: Some(3), message }) if message.contains("(run)")
        ));
        assert_eq!(model.call_count(), 3);
        assert_eq!(sink.events_of_type(event_types::PIPELINE_FAILED).len(), 1);
    }

    #[tokio::test]
    async fn test_streaming_with_unrepresentable_step_timeout_completes() {
        let config = PipelineConfig::from_lookup(|key| {
            (key == "STEP_TIMEOUT_SECS").then(|| "1e19".to_string())
        })
        .unwrap();
        assert!(config.timeouts.step_timeout().is_some());

        let model = Arc::new(ScriptedModel::new());
        let pipeline = CreativePipeline::new(model.clone(), config);
        let events = collect_stream(&pipeline, lumen_request()).await;

        assert!(matches!(events.last(), Some(StreamEvent::Complete { .. })));
        assert_eq!(model.call_count(), 6);
    }

    #[tokio::test]
    async fn test_streaming_model_panic_still_ends_with_error() {
        let mut mock = MockModelService::new();
        mock.expect_stream()
            .returning(|_| -> Result<FragmentStream, ModelError> { panic!("model service bug") });

        let pipeline = CreativePipeline::new(Arc::new(mock), PipelineConfig::default());
        let events: Vec<StreamEvent> = pipeline.stream(lumen_request()).unwrap().collect().await;

        assert_eq!(events[0], StreamEvent::step_start(StepKind::ProductAnalysis));
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
        assert!(matches!(events.last(), Some(StreamEvent::Error { step: None, .. })));
    }

    #[tokio::test]
    async fn test_dropping_receiver_stops_the_run() {
        let model = Arc::new(ScriptedModel::new());
        let pipeline = pipeline(&model);
        let (tx, mut rx) = mpsc::channel(1);

        let handle = tokio::spawn({
            let pipeline = pipeline.clone();
            async move { pipeline.run_streaming(lumen_request(), tx).await }
        });

        while let Some(event) = rx.recv().await {
            if matches!(event, StreamEvent::StepComplete { step: 1, .. }) {
                break;
            }
        }
        drop(rx);

        let outcome = handle.await.unwrap();
        assert!(matches!(outcome, Err(CreativeflowError::Cancelled(_))));
        assert!(model.call_count() <= 2, "made {} calls after cancel", model.call_count());
    }

    #[tokio::test]
    async fn test_streaming_rejects_invalid_request_before_any_call() {
        let model = Arc::new(ScriptedModel::new());
        let pipeline = pipeline(&model);
        let mut request = lumen_request();
        request.tone_of_voice.clear();

        match pipeline.stream(request.clone()) {
            Err(err) => assert!(err.has_field("tone_of_voice")),
            Ok(_) => panic!("invalid request was accepted"),
        }

        let (tx, mut rx) = mpsc::channel(4);
        assert_err!(pipeline.run_streaming(request, tx).await);
        assert!(matches!(rx.recv().await, Some(StreamEvent::Error { step: None, .. })));
        assert_eq!(rx.recv().await, None);
        assert_eq!(model.call_count(), 0);
    }

    // ---- batch ----

    #[tokio::test]
    async fn test_batch_lumen_scenario() {
        let model = Arc::new(ScriptedModel::new());
        let sink = Arc::new(CollectingEventSink::new());
        let result = assert_ok!(
            pipeline_with(&model, PipelineConfig::default(), &sink)
                .run(lumen_request(), true)
                .await
        );

        assert_eq!(result.client_name, "Lumen");
        assert!(!result.generated_content.is_empty());
        assert!(!result.creative_angle.is_empty());
        assert!(!result.key_messages.is_empty());
        assert_eq!(
            result.marketing_suggestions,
            vec![
                "Reels with taste tests (Instagram)".to_string(),
                "Free samples after classes (Gyms)".to_string(),
            ]
        );
        let report = result.executive_report.unwrap();
        assert!(report.check().is_ok());

        let mut expected = vec![event_types::PIPELINE_STARTED.to_string()];
        expected.extend(std::iter::repeat(event_types::STEP_COMPLETED.to_string()).take(6));
        expected.push(event_types::PIPELINE_COMPLETED.to_string());
        assert_eq!(sink.event_types(), expected);
    }

    #[tokio::test]
    async fn test_batch_failed_step_uses_fallback_downstream() {
        let model = Arc::new(ScriptedModel::new().with_script("creative_ideation", Script::fail("upstream 503")));
        let sink = Arc::new(CollectingEventSink::new());
        let result = assert_ok!(
            pipeline_with(&model, PipelineConfig::default(), &sink)
                .run(lumen_request(), false)
                .await
        );
        assert!(!result.generated_content.is_empty());

        let fallbacks = sink.events_of_type(event_types::STEP_FALLBACK);
        assert_eq!(fallbacks.len(), 1);
        assert_eq!(fallbacks[0].as_ref().unwrap()["step"], 3);

        // Step 4 was prompted with the fallback ideas.
        let fallback: StepRecord = CreativeIdeas::fallback(&lumen_request()).into();
        let prompts = model.prompts_for("content_generation");
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].text.contains(&fallback.to_prompt_text().unwrap()));
    }

    #[tokio::test]
    async fn test_batch_malformed_reply_falls_back() {
        let model = Arc::new(ScriptedModel::new().with_script(
            "content_generation",
            Script::reply(r#"{"generated_content": "", "creative_angle_used": "x", "key_messages": []}"#),
        ));
        let result = assert_ok!(pipeline(&model).run(lumen_request(), false).await);

        let fallback = GeneratedContent::fallback(&lumen_request());
        assert_eq!(result.generated_content, fallback.generated_content);
        assert_eq!(result.creative_angle, fallback.creative_angle_used);
        assert_eq!(result.key_messages, fallback.key_messages);
    }

    #[tokio::test]
    async fn test_batch_every_step_failing_still_returns_schema_valid_result() {
        let mut model = ScriptedModel::new();
        for template in [
            "product_analysis",
            "audience_analysis",
            "creative_ideation",
            "content_generation",
            "marketing_suggestions",
            "executive_report",
        ] {
            model = model.with_script(template, Script::reply("I cannot help with that."));
        }
        let model = Arc::new(model);
        let result = assert_ok!(pipeline(&model).run(lumen_request(), true).await);

        assert_eq!(result.marketing_suggestions.len(), 3);
        assert!(result.executive_report.unwrap().check().is_ok());
    }

    #[tokio::test]
    async fn test_batch_fenced_json_is_accepted() {
        let fenced = format!(
            "Here you go:\n```json\n{}\n```",
            canned_reply("content_generation").unwrap()
        );
        let model = Arc::new(ScriptedModel::new().with_script("content_generation", Script::Reply(fenced)));
        let result = assert_ok!(pipeline(&model).run(lumen_request(), false).await);
        assert_eq!(result.creative_angle, "Transparency");
    }

    #[tokio::test]
    async fn test_batch_retry_recovers_before_fallback() {
        let model = Arc::new(ScriptedModel::new().with_sequence(
            "content_generation",
            vec![Script::fail("blip"), Script::reply(canned_reply("content_generation").unwrap())],
        ));
        let config = PipelineConfig::new().with_retry(
            RetryConfig::new()
                .with_max_attempts(2)
                .with_base_delay_ms(1)
                .with_jitter(JitterStrategy::None),
        );
        let sink = Arc::new(CollectingEventSink::new());
        let result = assert_ok!(pipeline_with(&model, config, &sink).run(lumen_request(), false).await);

        assert_eq!(result.creative_angle, "Transparency");
        assert!(sink.events_of_type(event_types::STEP_FALLBACK).is_empty());
        assert_eq!(model.prompts_for("content_generation").len(), 2);
    }

    #[tokio::test]
    async fn test_batch_step_timeout_falls_back() {
        let model = Arc::new(ScriptedModel::new().with_script("content_generation", Script::Hang));
        let config = PipelineConfig::new().with_timeouts(TimeoutConfig::default().with_step_timeout(0.05));
        let result = assert_ok!(pipeline_with(&model, config, &Arc::default()).run(lumen_request(), false).await);

        assert_eq!(
            result.generated_content,
            GeneratedContent::fallback(&lumen_request()).generated_content
        );
        assert_eq!(model.call_count(), 5);
    }

    #[tokio::test]
    async fn test_batch_run_timeout_is_fatal() {
        let model = Arc::new(ScriptedModel::new().with_script("audience_analysis", Script::Hang));
        let config = PipelineConfig::new().with_timeouts(TimeoutConfig::default().with_run_timeout(0.05));
        let sink = Arc::new(CollectingEventSink::new());
        let err = assert_err!(pipeline_with(&model, config, &sink).run(lumen_request(), false).await);

        assert!(matches!(err, CreativeflowError::Timeout { ref scope, .. } if scope == "run"));
        assert_eq!(sink.events_of_type(event_types::PIPELINE_FAILED).len(), 1);
    }

    #[tokio::test]
    async fn test_batch_rejects_invalid_request_before_any_call() {
        let model = Arc::new(ScriptedModel::new());
        let mut request = lumen_request();
        request.product_description = "too short".to_string();

        let err = assert_err!(pipeline(&model).run(request, false).await);
        assert!(err.is_validation());
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_executive_report_only_when_requested() {
        for (include, calls) in [(false, 5_usize), (true, 6)] {
            let mut mock = MockModelService::new();
            mock.expect_complete()
                .times(calls)
                .returning(|prompt| Ok(canned_reply(&prompt.template).unwrap()));
            mock.expect_stream().never();

            let pipeline = CreativePipeline::new(Arc::new(mock), PipelineConfig::default());
            let result = assert_ok!(pipeline.run(lumen_request(), include).await);
            assert_eq!(result.executive_report.is_some(), include);
        }
    }
}
