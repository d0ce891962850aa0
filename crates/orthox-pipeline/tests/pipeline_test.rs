//! Orchestrator behaviour against the in-memory store and mock capabilities.

use std::sync::Arc;
use std::time::Duration;

use orthox_core::defaults::{AO_COMPENDIUM_URL, INSUFFICIENT_DATA_SENTINEL};
use orthox_db::memory::InMemoryCaseStore;
use orthox_inference::mock::{MockCapabilities, MockFailure, MOCK_FINDINGS};
use orthox_inference::FallbackReasoner;
use orthox_pipeline::{
    Capabilities, Capability, Case, CaseStore, CaseUpdate, CreateCaseRequest, Error, MediaBlob,
    PipelineConfig, PipelineOrchestrator, Stage, StageState, VisionFindings,
};
use uuid::Uuid;

struct Harness {
    store: InMemoryCaseStore,
    mock: MockCapabilities,
    orchestrator: PipelineOrchestrator,
}

fn harness() -> Harness {
    harness_with(MockCapabilities::new(), PipelineConfig::default())
}

fn harness_with(mock: MockCapabilities, config: PipelineConfig) -> Harness {
    let store = InMemoryCaseStore::new();
    let orchestrator = PipelineOrchestrator::new(
        Arc::new(store.clone()),
        Capabilities::uniform(Arc::new(mock.clone())),
        config,
    );
    Harness {
        store,
        mock,
        orchestrator,
    }
}

fn xray() -> Vec<MediaBlob> {
    vec![MediaBlob::inline(
        vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A],
        "image/png",
    )]
}

async fn new_case(store: &InMemoryCaseStore, reference: &str) -> Case {
    store
        .create_case(CreateCaseRequest {
            patient_reference_id: Some(reference.to_string()),
            low_resource_mode: false,
        })
        .await
        .unwrap()
}

async fn reload(store: &InMemoryCaseStore, id: Uuid) -> Case {
    store.get_case(id).await.unwrap().case
}

#[tokio::test]
async fn test_diagnosis_without_media_is_insufficient() {
    let h = harness();
    let case = new_case(&h.store, "p-001").await;

    let err = h.orchestrator.run_diagnosis(case.id, &[]).await.unwrap_err();

    assert!(matches!(
        err,
        Error::InsufficientMedia {
            stage: Stage::Diagnosis
        }
    ));
    assert_eq!(reload(&h.store, case.id).await.diagnosis, None);
    assert!(h.mock.calls().is_empty());
    assert_eq!(h.store.update_count(case.id).await, 0);
}

#[tokio::test]
async fn test_diagnosis_persists_reasoning() {
    let h = harness();
    let case = new_case(&h.store, "p-002").await;

    let result = h.orchestrator.run_diagnosis(case.id, &xray()).await.unwrap();

    assert_eq!(result.diagnosis, "Mock clinical reasoning");
    assert_eq!(result.findings.as_str(), MOCK_FINDINGS);

    let stored = reload(&h.store, case.id).await;
    assert_eq!(stored.diagnosis.as_deref(), Some("Mock clinical reasoning"));
    assert_eq!(stored.treatment_plan, None);

    // Reasoning received the vision findings plus the fixed context.
    let reasoning = h.mock.calls_for(Capability::Reasoning);
    assert_eq!(reasoning.len(), 1);
    assert!(reasoning[0].input.starts_with(MOCK_FINDINGS));
    assert!(reasoning[0]
        .input
        .ends_with(&PipelineConfig::default().diagnosis_context));

    let updates = h.store.updates().await;
    assert_eq!(updates.len(), 1);
    assert_eq!(
        updates[0].1,
        CaseUpdate {
            diagnosis: Some("Mock clinical reasoning".to_string()),
            ..Default::default()
        }
    );
}

#[tokio::test]
async fn test_unknown_case_is_not_found() {
    let h = harness();
    let missing = Uuid::now_v7();

    let err = h
        .orchestrator
        .run_diagnosis(missing, &xray())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CaseNotFound(id) if id == missing));
    assert!(h.mock.calls().is_empty());
}

#[tokio::test]
async fn test_treatment_requires_diagnosis() {
    let h = harness();
    let case = new_case(&h.store, "p-003").await;

    let err = h
        .orchestrator
        .run_treatment(case.id, "45 year old", None)
        .await
        .unwrap_err();

    match err {
        Error::PreconditionFailed { stage, missing } => {
            assert_eq!(stage, Stage::Treatment);
            assert_eq!(missing, "diagnosis");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(reload(&h.store, case.id).await.treatment_plan, None);
    assert_eq!(h.mock.call_count(Capability::GroundedAdvice), 0);
}

#[tokio::test]
async fn test_implant_requires_treatment_plan() {
    let h = harness();
    let case = new_case(&h.store, "p-004").await;
    h.store
        .update_case_fields(
            case.id,
            CaseUpdate {
                diagnosis: Some("Distal radius fracture".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let err = h
        .orchestrator
        .run_implant(case.id, Some(false))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::PreconditionFailed {
            stage: Stage::Implant,
            ..
        }
    ));
    assert_eq!(reload(&h.store, case.id).await.implant_choice, None);
}

#[tokio::test]
async fn test_full_workflow() {
    let h = harness();
    let case = new_case(&h.store, "p-005").await;

    h.orchestrator.run_diagnosis(case.id, &xray()).await.unwrap();
    let treatment = h
        .orchestrator
        .run_treatment(case.id, "Active, 30y", None)
        .await
        .unwrap();
    assert_eq!(treatment.sources.len(), 1);
    assert!(!treatment.low_resource_mode);

    h.orchestrator.run_implant(case.id, None).await.unwrap();
    h.orchestrator
        .run_outcome(case.id, &xray(), "Week 12, full weight bearing")
        .await
        .unwrap();

    let workflow = h.orchestrator.workflow(case.id).await.unwrap();
    for stage in Stage::ALL {
        assert_eq!(workflow.state(stage), StageState::Populated);
    }

    // Implant advice was built from the stored diagnosis and plan.
    let advice_calls = h.mock.calls_for(Capability::GroundedAdvice);
    assert_eq!(advice_calls.len(), 2);
    assert_eq!(
        advice_calls[1].input,
        format!("Mock clinical reasoning\n{}", treatment.advice)
    );
}

#[tokio::test]
async fn test_capability_failure_leaves_case_unchanged() {
    let h = harness();
    let case = new_case(&h.store, "p-006").await;
    h.orchestrator.run_diagnosis(case.id, &xray()).await.unwrap();
    h.orchestrator
        .run_treatment(case.id, "ctx", None)
        .await
        .unwrap();
    let before = reload(&h.store, case.id).await;
    let updates_before = h.store.update_count(case.id).await;

    h.mock
        .set_failure(Capability::Reasoning, MockFailure::Unavailable);
    let err = h
        .orchestrator
        .run_diagnosis(case.id, &xray())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::CapabilityUnavailable {
            capability: Capability::Reasoning,
            ..
        }
    ));

    h.mock
        .set_failure(Capability::GroundedAdvice, MockFailure::BadResponse);
    let err = h
        .orchestrator
        .run_implant(case.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CapabilityBadResponse { .. }));

    assert_eq!(reload(&h.store, case.id).await, before);
    assert_eq!(h.store.update_count(case.id).await, updates_before);
}

#[tokio::test]
async fn test_vision_failure_skips_reasoning() {
    let mock = MockCapabilities::new().with_failure(Capability::Vision, MockFailure::Unavailable);
    let h = harness_with(mock, PipelineConfig::default());
    let case = new_case(&h.store, "p-007").await;

    let err = h
        .orchestrator
        .run_outcome(case.id, &xray(), "status")
        .await
        .unwrap_err();

    assert_eq!(err.capability(), Some(Capability::Vision));
    assert_eq!(h.mock.call_count(Capability::OutcomeAssessment), 0);
    assert_eq!(reload(&h.store, case.id).await.outcome_notes, None);
}

#[tokio::test]
async fn test_rerun_overwrites_only_owned_field() {
    let h = harness();
    let case = new_case(&h.store, "p-008").await;
    h.orchestrator.run_diagnosis(case.id, &xray()).await.unwrap();
    h.orchestrator
        .run_outcome(case.id, &xray(), "Week 6")
        .await
        .unwrap();
    let before = reload(&h.store, case.id).await;

    h.mock
        .set_response(Capability::Reasoning, "Revised: comminuted fracture");
    h.orchestrator.run_diagnosis(case.id, &xray()).await.unwrap();

    let after = reload(&h.store, case.id).await;
    assert_eq!(after.diagnosis.as_deref(), Some("Revised: comminuted fracture"));
    assert_eq!(after.outcome_notes, before.outcome_notes);
    assert_eq!(after.treatment_plan, before.treatment_plan);
    assert_eq!(after.patient_name, before.patient_name);
    assert_eq!(after.low_resource_mode, before.low_resource_mode);
}

#[tokio::test]
async fn test_low_resource_toggle_reaches_advisor() {
    let h = harness();
    let case = new_case(&h.store, "p-009").await;
    h.orchestrator.run_diagnosis(case.id, &xray()).await.unwrap();

    let first = h
        .orchestrator
        .run_treatment(case.id, "ctx", None)
        .await
        .unwrap();
    assert!(!first.low_resource_mode);

    h.store
        .update_case_fields(
            case.id,
            CaseUpdate {
                low_resource_mode: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let before_second = reload(&h.store, case.id).await;

    let second = h
        .orchestrator
        .run_treatment(case.id, "ctx", None)
        .await
        .unwrap();
    assert!(second.low_resource_mode);

    let flags: Vec<_> = h
        .mock
        .calls_for(Capability::GroundedAdvice)
        .into_iter()
        .map(|c| c.low_resource)
        .collect();
    assert_eq!(flags, vec![Some(false), Some(true)]);

    let after = reload(&h.store, case.id).await;
    assert_eq!(after.diagnosis, before_second.diagnosis);
    assert_eq!(after.outcome_notes, before_second.outcome_notes);
    assert!(after.low_resource_mode);
}

#[tokio::test]
async fn test_caller_override_does_not_persist_flag() {
    let h = harness();
    let case = new_case(&h.store, "p-010").await;
    h.orchestrator.run_diagnosis(case.id, &xray()).await.unwrap();

    let result = h
        .orchestrator
        .run_treatment(case.id, "ctx", Some(true))
        .await
        .unwrap();

    assert!(result.low_resource_mode);
    assert!(!reload(&h.store, case.id).await.low_resource_mode);
}

#[tokio::test]
async fn test_low_resource_snapshot_ignores_mid_run_toggle() {
    let mock = MockCapabilities::new().with_latency_ms(50);
    let h = harness_with(mock, PipelineConfig::default());
    let case = new_case(&h.store, "p-011").await;
    h.orchestrator.run_diagnosis(case.id, &xray()).await.unwrap();

    let orchestrator = h.orchestrator.clone();
    let run = tokio::spawn(async move { orchestrator.run_treatment(case.id, "ctx", None).await });

    tokio::time::sleep(Duration::from_millis(10)).await;
    h.store
        .update_case_fields(
            case.id,
            CaseUpdate {
                low_resource_mode: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let result = run.await.unwrap().unwrap();
    assert!(!result.low_resource_mode);
    let calls = h.mock.calls_for(Capability::GroundedAdvice);
    assert_eq!(calls.last().unwrap().low_resource, Some(false));
}

#[tokio::test]
async fn test_classification_sentinel_stored_as_note() {
    let mock = MockCapabilities::new()
        .with_response(Capability::Classification, INSUFFICIENT_DATA_SENTINEL);
    let h = harness_with(mock, PipelineConfig::default());
    let case = new_case(&h.store, "p-012").await;

    let diagnosis = h.orchestrator.run_diagnosis(case.id, &xray()).await.unwrap();
    assert_eq!(diagnosis.findings.as_str(), r#"{"fracture":"present"}"#);

    let result = h
        .orchestrator
        .run_classification(case.id, &diagnosis.findings)
        .await
        .unwrap();

    assert!(result.insufficient_data);
    assert_eq!(result.code, None);
    assert_eq!(result.classification, INSUFFICIENT_DATA_SENTINEL);
    assert_eq!(result.note.content, INSUFFICIENT_DATA_SENTINEL);
    assert_eq!(result.note.source_url.as_deref(), Some(AO_COMPENDIUM_URL));

    let full = h.store.get_case(case.id).await.unwrap();
    assert_eq!(full.notes.len(), 1);
    assert_eq!(full.notes[0].content, INSUFFICIENT_DATA_SENTINEL);
    assert_eq!(full.case.diagnosis, Some(diagnosis.diagnosis));
    // Only the diagnosis write touched case fields.
    assert_eq!(h.store.update_count(case.id).await, 1);
}

#[tokio::test]
async fn test_classification_coded_result() {
    let h = harness();
    let case = new_case(&h.store, "p-013").await;

    let result = h
        .orchestrator
        .run_classification(case.id, &VisionFindings::new(MOCK_FINDINGS))
        .await
        .unwrap();

    assert!(!result.insufficient_data);
    assert_eq!(result.code.as_deref(), Some("32-A1"));
    assert!(result.note.content.starts_with("32-A1"));
}

#[tokio::test]
async fn test_classification_requires_findings() {
    let h = harness();
    let case = new_case(&h.store, "p-014").await;

    let err = h
        .orchestrator
        .run_classification(case.id, &VisionFindings::new("   "))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::PreconditionFailed { .. }));
    assert!(h.store.get_case(case.id).await.unwrap().notes.is_empty());
    assert_eq!(h.mock.call_count(Capability::Classification), 0);
}

#[tokio::test]
async fn test_blank_reasoning_is_bad_response() {
    let mock = MockCapabilities::new().with_response(Capability::Reasoning, "  ");
    let h = harness_with(mock, PipelineConfig::default());
    let case = new_case(&h.store, "p-015").await;

    let err = h
        .orchestrator
        .run_diagnosis(case.id, &xray())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CapabilityBadResponse { .. }));
    assert_eq!(reload(&h.store, case.id).await.diagnosis, None);
}

#[tokio::test(start_paused = true)]
async fn test_hanging_capability_times_out() {
    let mock = MockCapabilities::new().with_failure(Capability::Vision, MockFailure::Hang);
    let config = PipelineConfig::default().with_capability_timeout(Duration::from_secs(30));
    let h = harness_with(mock, config);
    let case = new_case(&h.store, "p-016").await;

    let err = h
        .orchestrator
        .run_diagnosis(case.id, &xray())
        .await
        .unwrap_err();

    match err {
        Error::CapabilityTimeout {
            capability,
            timeout_secs,
        } => {
            assert_eq!(capability, Capability::Vision);
            assert_eq!(timeout_secs, 30);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(reload(&h.store, case.id).await.diagnosis, None);
}

#[tokio::test(start_paused = true)]
async fn test_sub_second_timeout_reports_whole_second() {
    let mock = MockCapabilities::new().with_failure(Capability::Vision, MockFailure::Hang);
    let config = PipelineConfig::default().with_capability_timeout(Duration::from_millis(250));
    let h = harness_with(mock, config);
    let case = new_case(&h.store, "p-016b").await;

    let err = h
        .orchestrator
        .run_diagnosis(case.id, &xray())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::CapabilityTimeout {
            capability: Capability::Vision,
            timeout_secs: 1
        }
    ));
    assert_eq!(err.to_string(), "vision timed out after 1s");
}

#[tokio::test(start_paused = true)]
async fn test_hanging_dedicated_reasoner_falls_back_within_budget() {
    let dedicated =
        MockCapabilities::new().with_failure(Capability::Reasoning, MockFailure::Hang);
    let general = MockCapabilities::new()
        .with_response(Capability::Reasoning, "General backend reasoning")
        .with_latency_ms(5_000);
    let reasoner = Arc::new(FallbackReasoner::new(
        Some(Arc::new(dedicated.clone())),
        Arc::new(general.clone()),
    ));

    let mut caps = Capabilities::uniform(Arc::new(general.clone()));
    caps.reasoner = reasoner.clone();
    let store = InMemoryCaseStore::new();
    let orchestrator =
        PipelineOrchestrator::new(Arc::new(store.clone()), caps, PipelineConfig::default());
    let case = new_case(&store, "p-016c").await;

    let result = orchestrator.run_diagnosis(case.id, &xray()).await.unwrap();

    assert_eq!(result.diagnosis, "General backend reasoning");
    assert_eq!(
        reload(&store, case.id).await.diagnosis.as_deref(),
        Some("General backend reasoning")
    );
    assert_eq!(dedicated.call_count(Capability::Reasoning), 1);
    assert_eq!(general.call_count(Capability::Reasoning), 1);
    assert_eq!(reasoner.fallback_count(), 1);
}

#[tokio::test]
async fn test_cancelled_run_writes_nothing() {
    let mock = MockCapabilities::new().with_latency_ms(200);
    let h = harness_with(mock, PipelineConfig::default());
    let case = new_case(&h.store, "p-017").await;

    let orchestrator = h.orchestrator.clone();
    let run = tokio::spawn(async move { orchestrator.run_diagnosis(case.id, &xray()).await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    run.abort();
    assert!(run.await.unwrap_err().is_cancelled());

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(reload(&h.store, case.id).await.diagnosis, None);
    assert_eq!(h.store.update_count(case.id).await, 0);
}

#[tokio::test]
async fn test_concurrent_runs_on_one_case() {
    let mock = MockCapabilities::new().with_latency_ms(20);
    let h = harness_with(mock, PipelineConfig::default());
    let case = new_case(&h.store, "p-018").await;
    h.orchestrator.run_diagnosis(case.id, &xray()).await.unwrap();

    let media = xray();
    let (treatment, outcome) = futures::join!(
        h.orchestrator.run_treatment(case.id, "ctx", None),
        h.orchestrator.run_outcome(case.id, &media, "Week 8"),
    );
    let treatment = treatment.unwrap();
    let outcome = outcome.unwrap();

    let stored = reload(&h.store, case.id).await;
    assert_eq!(stored.treatment_plan, Some(treatment.advice));
    assert_eq!(stored.outcome_notes, Some(outcome.outcome));
    assert_eq!(stored.diagnosis.as_deref(), Some("Mock clinical reasoning"));
}

#[tokio::test]
async fn test_concurrent_runs_across_cases() {
    let mock = MockCapabilities::new().with_latency_ms(20);
    let h = harness_with(mock, PipelineConfig::default());

    let mut handles = Vec::new();
    for i in 0..8 {
        let case = new_case(&h.store, &format!("p-1{:02}", i)).await;
        let orchestrator = h.orchestrator.clone();
        handles.push(tokio::spawn(async move {
            orchestrator.run_diagnosis(case.id, &xray()).await.map(|_| case.id)
        }));
    }

    for handle in handles {
        let id = handle.await.unwrap().unwrap();
        assert!(reload(&h.store, id).await.diagnosis.is_some());
    }
    assert_eq!(h.mock.call_count(Capability::Vision), 8);
}
