//! Pipeline orchestrator: sequences capability calls and writes artifacts back.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use orthox_core::defaults::AO_COMPENDIUM_URL;
use orthox_core::{
    AdviceRequest, Capability, CaseFull, CaseStore, Classifier, ClinicalReasoner,
    CreateNoteRequest, Error, GroundedAdvisor, MediaBlob, Note, OutcomeAssessor, Result,
    SourceCitation, Stage, VisionExtractor, VisionFindings, WorkflowState,
};

use crate::config::PipelineConfig;

/// The capability adapters a pipeline run may call.
#[derive(Clone)]
pub struct Capabilities {
    pub vision: Arc<dyn VisionExtractor>,
    pub reasoner: Arc<dyn ClinicalReasoner>,
    pub classifier: Arc<dyn Classifier>,
    pub advisor: Arc<dyn GroundedAdvisor>,
    pub assessor: Arc<dyn OutcomeAssessor>,
}

impl Capabilities {
    /// Use one value for every capability (e.g. a test double).
    pub fn uniform<T>(backend: Arc<T>) -> Self
    where
        T: VisionExtractor
            + ClinicalReasoner
            + Classifier
            + GroundedAdvisor
            + OutcomeAssessor
            + 'static,
    {
        Self {
            vision: backend.clone(),
            reasoner: backend.clone(),
            classifier: backend.clone(),
            advisor: backend.clone(),
            assessor: backend,
        }
    }
}

/// Output of the diagnosis pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosisResult {
    /// Reasoning text persisted as the case diagnosis.
    pub diagnosis: String,
    /// Vision findings, returned so the caller can request classification.
    pub findings: VisionFindings,
}

/// Output of classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    /// Stored note text: the coded classification or the insufficient-data
    /// sentinel.
    pub classification: String,
    pub code: Option<String>,
    pub insufficient_data: bool,
    pub note: Note,
}

/// Output of the treatment and implant flows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdviceResult {
    pub advice: String,
    pub sources: Vec<SourceCitation>,
    /// Low-resource flag the run actually used.
    pub low_resource_mode: bool,
}

/// Output of the outcome pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeResult {
    pub outcome: String,
}

/// Runs the clinical pipelines for a case.
///
/// Stateless between calls. Every run loads the case, checks preconditions,
/// calls capabilities in order and finally writes the single field its
/// stage owns. A failed or cancelled run writes nothing.
#[derive(Clone)]
pub struct PipelineOrchestrator {
    store: Arc<dyn CaseStore>,
    caps: Capabilities,
    config: PipelineConfig,
}

impl PipelineOrchestrator {
    pub fn new(store: Arc<dyn CaseStore>, caps: Capabilities, config: PipelineConfig) -> Self {
        Self {
            store,
            caps,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn CaseStore> {
        &self.store
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Current workflow state of a case.
    pub async fn workflow(&self, case_id: Uuid) -> Result<WorkflowState> {
        let full = self.store.get_case(case_id).await?;
        Ok(WorkflowState::of(&full.case))
    }

    /// Vision extraction followed by clinical reasoning; persists the
    /// reasoning as the case diagnosis.
    pub async fn run_diagnosis(
        &self,
        case_id: Uuid,
        media: &[MediaBlob],
    ) -> Result<DiagnosisResult> {
        let stage = Stage::Diagnosis;
        let start = Instant::now();
        self.load_runnable(case_id, stage).await?;
        if media.is_empty() {
            return Err(Error::InsufficientMedia { stage });
        }

        let findings = self.extract_findings(case_id, stage, media).await?;
        let diagnosis = self
            .call(
                case_id,
                stage,
                Capability::Reasoning,
                self.caps
                    .reasoner
                    .reason(&findings, &self.config.diagnosis_context),
            )
            .await?;
        let diagnosis = require_text(Capability::Reasoning, diagnosis)?;

        self.write_artifact(case_id, stage, &diagnosis).await?;
        info!(
            subsystem = "pipeline",
            op = "run_diagnosis",
            case_id = %case_id,
            media_count = media.len(),
            response_len = diagnosis.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Diagnosis pipeline complete"
        );

        Ok(DiagnosisResult {
            diagnosis,
            findings,
        })
    }

    /// Classify previously extracted findings and store the result as a note.
    ///
    /// Case fields are never modified. An insufficient-data outcome is a
    /// success and stores the sentinel text.
    pub async fn run_classification(
        &self,
        case_id: Uuid,
        findings: &VisionFindings,
    ) -> Result<ClassificationResult> {
        let stage = Stage::Diagnosis;
        let start = Instant::now();
        self.store.get_case(case_id).await?;
        if findings.is_blank() {
            return Err(Error::PreconditionFailed {
                stage,
                missing: "vision findings".to_string(),
            });
        }

        let classification = self
            .call(
                case_id,
                stage,
                Capability::Classification,
                self.caps.classifier.classify(findings),
            )
            .await?;

        let note = self
            .store
            .add_note(CreateNoteRequest {
                case_id,
                content: classification.as_text().to_string(),
                source_url: Some(AO_COMPENDIUM_URL.to_string()),
            })
            .await?;

        info!(
            subsystem = "pipeline",
            op = "run_classification",
            case_id = %case_id,
            insufficient_data = classification.is_insufficient(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Classification stored as note"
        );

        Ok(ClassificationResult {
            classification: classification.as_text().to_string(),
            code: classification.code().map(str::to_string),
            insufficient_data: classification.is_insufficient(),
            note,
        })
    }

    /// Grounded treatment advice from the stored diagnosis.
    ///
    /// `low_resource` overrides the case flag for this run only.
    pub async fn run_treatment(
        &self,
        case_id: Uuid,
        patient_context: &str,
        low_resource: Option<bool>,
    ) -> Result<AdviceResult> {
        let stage = Stage::Treatment;
        let full = self.load_runnable(case_id, stage).await?;
        let low_resource = snapshot_low_resource(&full, low_resource, stage);
        let diagnosis = required_artifact(&full, stage, Stage::Diagnosis)?;

        let request = AdviceRequest::treatment(diagnosis, patient_context, low_resource);
        self.run_advice(case_id, stage, request).await
    }

    /// Grounded implant advice from the stored diagnosis and treatment plan.
    pub async fn run_implant(
        &self,
        case_id: Uuid,
        low_resource: Option<bool>,
    ) -> Result<AdviceResult> {
        let stage = Stage::Implant;
        let full = self.load_runnable(case_id, stage).await?;
        let low_resource = snapshot_low_resource(&full, low_resource, stage);
        let diagnosis = required_artifact(&full, stage, Stage::Diagnosis)?;
        let plan = required_artifact(&full, stage, Stage::Treatment)?;

        let request = AdviceRequest::implant(diagnosis, plan, low_resource);
        self.run_advice(case_id, stage, request).await
    }

    /// Vision extraction followed by outcome assessment; persists the
    /// assessment as the case outcome notes.
    pub async fn run_outcome(
        &self,
        case_id: Uuid,
        media: &[MediaBlob],
        clinical_status: &str,
    ) -> Result<OutcomeResult> {
        let stage = Stage::Outcome;
        let start = Instant::now();
        self.load_runnable(case_id, stage).await?;
        if media.is_empty() {
            return Err(Error::InsufficientMedia { stage });
        }

        let findings = self.extract_findings(case_id, stage, media).await?;
        let outcome = self
            .call(
                case_id,
                stage,
                Capability::OutcomeAssessment,
                self.caps.assessor.assess(&findings, clinical_status),
            )
            .await?;
        let outcome = require_text(Capability::OutcomeAssessment, outcome)?;

        self.write_artifact(case_id, stage, &outcome).await?;
        info!(
            subsystem = "pipeline",
            op = "run_outcome",
            case_id = %case_id,
            media_count = media.len(),
            response_len = outcome.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Outcome pipeline complete"
        );

        Ok(OutcomeResult { outcome })
    }

    async fn run_advice(
        &self,
        case_id: Uuid,
        stage: Stage,
        request: AdviceRequest,
    ) -> Result<AdviceResult> {
        let start = Instant::now();
        let advice = self
            .call(
                case_id,
                stage,
                Capability::GroundedAdvice,
                self.caps.advisor.advise(&request),
            )
            .await?;
        let text = require_text(Capability::GroundedAdvice, advice.text)?;

        self.write_artifact(case_id, stage, &text).await?;
        info!(
            subsystem = "pipeline",
            op = "run_advice",
            case_id = %case_id,
            stage = %stage,
            low_resource = request.low_resource,
            source_count = advice.sources.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Advice flow complete"
        );

        Ok(AdviceResult {
            advice: text,
            sources: advice.sources,
            low_resource_mode: request.low_resource,
        })
    }

    /// Load the case and check the stage's prerequisites.
    async fn load_runnable(&self, case_id: Uuid, stage: Stage) -> Result<CaseFull> {
        let full = self.store.get_case(case_id).await?;
        WorkflowState::of(&full.case).check_can_run(stage)?;
        Ok(full)
    }

    async fn extract_findings(
        &self,
        case_id: Uuid,
        stage: Stage,
        media: &[MediaBlob],
    ) -> Result<VisionFindings> {
        let findings = self
            .call(
                case_id,
                stage,
                Capability::Vision,
                self.caps.vision.extract(media),
            )
            .await?;
        if findings.is_blank() {
            return Err(Error::CapabilityBadResponse {
                capability: Capability::Vision,
                message: "empty findings".to_string(),
            });
        }
        Ok(findings)
    }

    /// Run one capability call under the configured timeout.
    async fn call<T, F>(
        &self,
        case_id: Uuid,
        stage: Stage,
        capability: Capability,
        fut: F,
    ) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let start = Instant::now();
        let result = match tokio::time::timeout(self.config.capability_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::capability_timeout(
                capability,
                self.config.capability_timeout,
            )),
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(_) => debug!(
                subsystem = "pipeline",
                component = "orchestrator",
                case_id = %case_id,
                stage = %stage,
                capability = %capability,
                duration_ms,
                success = true,
                "Capability call succeeded"
            ),
            Err(e) => warn!(
                subsystem = "pipeline",
                component = "orchestrator",
                case_id = %case_id,
                stage = %stage,
                capability = %capability,
                duration_ms,
                success = false,
                error = %e,
                "Capability call failed, case left unchanged"
            ),
        }
        result
    }

    async fn write_artifact(&self, case_id: Uuid, stage: Stage, text: &str) -> Result<()> {
        self.store
            .update_case_fields(case_id, stage.artifact_update(text))
            .await
    }
}

/// Fix the low-resource flag for the whole run.
fn snapshot_low_resource(full: &CaseFull, requested: Option<bool>, stage: Stage) -> bool {
    let low_resource = requested.unwrap_or(full.case.low_resource_mode);
    debug!(
        subsystem = "pipeline",
        case_id = %full.case.id,
        stage = %stage,
        low_resource,
        overridden = requested.is_some(),
        "Low-resource flag fixed for run"
    );
    low_resource
}

fn required_artifact(full: &CaseFull, stage: Stage, prerequisite: Stage) -> Result<String> {
    prerequisite
        .artifact(&full.case)
        .map(str::to_string)
        .ok_or_else(|| Error::PreconditionFailed {
            stage,
            missing: prerequisite.artifact_name().to_string(),
        })
}

/// Reject blank artifact text so an empty field never counts as populated.
fn require_text(capability: Capability, text: String) -> Result<String> {
    if text.trim().is_empty() {
        Err(Error::CapabilityBadResponse {
            capability,
            message: "empty response".to_string(),
        })
    } else {
        Ok(text)
    }
}
