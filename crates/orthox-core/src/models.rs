//! Data model for cases, notes, media, and pipeline artifacts.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::defaults::INSUFFICIENT_DATA_SENTINEL;
use crate::error::{Error, Result};
use crate::traits::Capability;

// =============================================================================
// CASE AGGREGATE
// =============================================================================

/// One patient encounter.
///
/// `patient_name` is derived from the pseudonymous reference and never holds
/// raw PHI. Artifact fields are written only by successful pipeline runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Case {
    pub id: Uuid,
    pub patient_reference_id: String,
    pub patient_name: String,
    pub diagnosis: Option<String>,
    pub treatment_plan: Option<String>,
    pub implant_choice: Option<String>,
    pub outcome_notes: Option<String>,
    pub low_resource_mode: bool,
    pub phi_confirmed: bool,
    pub created_at: DateTime<Utc>,
}

/// A case together with its notes and media, both oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CaseFull {
    #[serde(flatten)]
    pub case: Case,
    pub notes: Vec<Note>,
    pub media: Vec<Media>,
}

/// Append-only annotation on a case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Note {
    pub id: Uuid,
    pub case_id: Uuid,
    pub content: String,
    pub source_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Persisted media reference attached to a case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Media {
    pub id: Uuid,
    pub case_id: Uuid,
    #[serde(rename = "type")]
    pub media_type: MediaKind,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// Kind of persisted media item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Youtube,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Youtube => "youtube",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "image" => Ok(MediaKind::Image),
            "video" => Ok(MediaKind::Video),
            "youtube" => Ok(MediaKind::Youtube),
            other => Err(Error::InvalidInput(format!("unknown media type: {}", other))),
        }
    }
}

// =============================================================================
// STORE REQUESTS
// =============================================================================

/// Request to create a case.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateCaseRequest {
    /// Pseudonymous reference. Generated when absent.
    #[serde(default)]
    pub patient_reference_id: Option<String>,
    #[serde(default)]
    pub low_resource_mode: bool,
}

/// Partial update of a case. Only `Some` fields are applied.
///
/// `phi_confirmed` is one-way: `Some(false)` never clears a confirmed case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseUpdate {
    pub diagnosis: Option<String>,
    pub treatment_plan: Option<String>,
    pub implant_choice: Option<String>,
    pub outcome_notes: Option<String>,
    pub low_resource_mode: Option<bool>,
    pub phi_confirmed: Option<bool>,
}

impl CaseUpdate {
    pub fn is_empty(&self) -> bool {
        self.diagnosis.is_none()
            && self.treatment_plan.is_none()
            && self.implant_choice.is_none()
            && self.outcome_notes.is_none()
            && self.low_resource_mode.is_none()
            && self.phi_confirmed.is_none()
    }

    /// Apply this update to a case in place, with the same semantics the
    /// stores implement.
    pub fn apply_to(&self, case: &mut Case) {
        if let Some(v) = &self.diagnosis {
            case.diagnosis = Some(v.clone());
        }
        if let Some(v) = &self.treatment_plan {
            case.treatment_plan = Some(v.clone());
        }
        if let Some(v) = &self.implant_choice {
            case.implant_choice = Some(v.clone());
        }
        if let Some(v) = &self.outcome_notes {
            case.outcome_notes = Some(v.clone());
        }
        if let Some(v) = self.low_resource_mode {
            case.low_resource_mode = v;
        }
        if let Some(v) = self.phi_confirmed {
            case.phi_confirmed = case.phi_confirmed || v;
        }
    }
}

/// Request to append a note to a case.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateNoteRequest {
    pub case_id: Uuid,
    pub content: String,
    #[serde(default)]
    pub source_url: Option<String>,
}

/// Request to attach a media reference to a case.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateMediaRequest {
    pub case_id: Uuid,
    #[serde(rename = "type")]
    pub media_type: MediaKind,
    pub url: String,
}

// =============================================================================
// PIPELINE VALUES
// =============================================================================

/// Structured findings produced by vision extraction.
///
/// Opaque to the pipeline: the text is passed through to reasoning,
/// classification and outcome assessment without interpretation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct VisionFindings(String);

impl VisionFindings {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for VisionFindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A grounding source cited by generated advice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SourceCitation {
    pub title: String,
    pub url: String,
}

/// Search-grounded advice text and its ordered sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GroundedAdvice {
    pub text: String,
    pub sources: Vec<SourceCitation>,
}

/// Which grounded recommendation is being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdviceKind {
    Treatment,
    Implant,
}

/// Input to the grounded advisor.
#[derive(Debug, Clone, PartialEq)]
pub struct AdviceRequest {
    pub kind: AdviceKind,
    pub diagnosis: String,
    /// Present for implant advice.
    pub treatment_plan: Option<String>,
    /// Free-text patient context for treatment advice.
    pub patient_context: Option<String>,
    /// Prefer generic, widely available fixation methods.
    pub low_resource: bool,
}

impl AdviceRequest {
    pub fn treatment(
        diagnosis: impl Into<String>,
        patient_context: impl Into<String>,
        low_resource: bool,
    ) -> Self {
        Self {
            kind: AdviceKind::Treatment,
            diagnosis: diagnosis.into(),
            treatment_plan: None,
            patient_context: Some(patient_context.into()),
            low_resource,
        }
    }

    pub fn implant(
        diagnosis: impl Into<String>,
        treatment_plan: impl Into<String>,
        low_resource: bool,
    ) -> Self {
        Self {
            kind: AdviceKind::Implant,
            diagnosis: diagnosis.into(),
            treatment_plan: Some(treatment_plan.into()),
            patient_context: None,
            low_resource,
        }
    }
}

/// AO/OTA 2018 fracture code: bone, optional segment (digit or letter plus
/// digit, e.g. `2R3`, `4F2`), optional qualifier letter, optional hyphen,
/// type, group and optional sub-group. Matches `32-A1`, `32A1`, `23r-C2.1`,
/// `2R3-A2.1` and `4F2-A1`.
static AO_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[1-9](?:[0-9]|[A-Za-z][0-9])?[a-z]?-?[A-C][1-3](?:\.[1-3])?\b")
        .expect("valid AO code regex")
});

/// Phrase identifying an insufficient-data answer regardless of punctuation.
const INSUFFICIENT_PHRASE: &str = "cannot be determined from provided views";

/// Outcome of document-grounded classification.
///
/// An insufficient-data result is a successful outcome, never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Model output containing a code, description and compendium reference.
    Coded(String),
    /// Findings do not support a confident code.
    InsufficientData,
}

impl Classification {
    /// Interpret raw classifier output.
    ///
    /// The insufficiency phrase is the only route to `InsufficientData`, and
    /// it wins over any code the model hedged with. Output with neither a
    /// code nor the phrase is a bad response, not a guess either way.
    pub fn from_model_output(text: &str) -> Result<Self> {
        if text.to_lowercase().contains(INSUFFICIENT_PHRASE) {
            return Ok(Classification::InsufficientData);
        }
        if AO_CODE.is_match(text) {
            return Ok(Classification::Coded(text.trim().to_string()));
        }
        Err(Error::CapabilityBadResponse {
            capability: Capability::Classification,
            message: "classifier output carries neither an AO/OTA code nor the insufficient-data statement".to_string(),
        })
    }

    /// First AO/OTA code in a coded classification.
    pub fn code(&self) -> Option<&str> {
        match self {
            Classification::Coded(text) => AO_CODE.find(text).map(|m| m.as_str()),
            Classification::InsufficientData => None,
        }
    }

    pub fn is_insufficient(&self) -> bool {
        matches!(self, Classification::InsufficientData)
    }

    /// Text persisted as the classification note.
    pub fn as_text(&self) -> &str {
        match self {
            Classification::Coded(text) => text,
            Classification::InsufficientData => INSUFFICIENT_DATA_SENTINEL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_case() -> Case {
        Case {
            id: Uuid::now_v7(),
            patient_reference_id: "p-001".to_string(),
            patient_name: "Patient_p-001".to_string(),
            diagnosis: Some("dx".to_string()),
            treatment_plan: None,
            implant_choice: None,
            outcome_notes: None,
            low_resource_mode: false,
            phi_confirmed: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_case_update_applies_only_present_fields() {
        let mut case = sample_case();
        let update = CaseUpdate {
            treatment_plan: Some("ORIF".to_string()),
            ..Default::default()
        };
        update.apply_to(&mut case);

        assert_eq!(case.diagnosis.as_deref(), Some("dx"));
        assert_eq!(case.treatment_plan.as_deref(), Some("ORIF"));
        assert!(!case.low_resource_mode);
    }

    #[test]
    fn test_case_update_phi_confirmed_is_one_way() {
        let mut case = sample_case();
        CaseUpdate {
            phi_confirmed: Some(true),
            ..Default::default()
        }
        .apply_to(&mut case);
        assert!(case.phi_confirmed);

        CaseUpdate {
            phi_confirmed: Some(false),
            ..Default::default()
        }
        .apply_to(&mut case);
        assert!(case.phi_confirmed);
    }

    #[test]
    fn test_case_update_is_empty() {
        assert!(CaseUpdate::default().is_empty());
        assert!(!CaseUpdate {
            low_resource_mode: Some(false),
            ..Default::default()
        }
        .is_empty());
    }

    #[test]
    fn test_media_serializes_kind_as_type() {
        let media = Media {
            id: Uuid::nil(),
            case_id: Uuid::nil(),
            media_type: MediaKind::Youtube,
            url: "https://youtu.be/abc".to_string(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&media).unwrap();
        assert_eq!(json["type"], "youtube");
        assert!(json.get("media_type").is_none());
    }

    #[test]
    fn test_media_kind_from_str() {
        assert_eq!("video".parse::<MediaKind>().unwrap(), MediaKind::Video);
        assert!("gif".parse::<MediaKind>().is_err());
    }

    #[test]
    fn test_case_full_flattens_case_fields() {
        let full = CaseFull {
            case: sample_case(),
            notes: vec![],
            media: vec![],
        };
        let json = serde_json::to_value(&full).unwrap();
        assert_eq!(json["patient_reference_id"], "p-001");
        assert!(json["notes"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_vision_findings_blank() {
        assert!(VisionFindings::new("  \n").is_blank());
        assert!(!VisionFindings::new(r#"{"fracture":"present"}"#).is_blank());
        assert_eq!(
            serde_json::to_string(&VisionFindings::new("x")).unwrap(),
            "\"x\""
        );
    }

    #[test]
    fn test_classification_coded() {
        let output = "- 32-A1\n- Spiral fracture of the femoral diaphysis\n- Compendium section 32";
        let classification = Classification::from_model_output(output).unwrap();
        assert_eq!(classification.code(), Some("32-A1"));
        assert!(!classification.is_insufficient());
        assert_eq!(classification.as_text(), output);
    }

    #[test]
    fn test_classification_subgroup_code() {
        let classification =
            Classification::from_model_output("Code: 23r-C2.1 intra-articular").unwrap();
        assert_eq!(classification.code(), Some("23r-C2.1"));
    }

    #[test]
    fn test_classification_segment_letter_codes() {
        let cases = [
            ("- 2R3-A2.1\n- Distal radius, extra-articular, simple\n- Section 2R3", "2R3-A2.1"),
            ("- 4F2-A1\n- Fibula diaphysis, simple\n- Section 4F2", "4F2-A1"),
            ("- 32A1\n- Femur diaphysis, spiral\n- Section 32", "32A1"),
        ];
        for (output, code) in cases {
            let classification = Classification::from_model_output(output).unwrap();
            assert!(!classification.is_insufficient(), "{} read as insufficient", code);
            assert_eq!(classification.code(), Some(code));
            assert_eq!(classification.as_text(), output);
        }
    }

    #[test]
    fn test_classification_ignores_codes_inside_words() {
        assert!(Classification::from_model_output("see figure X32A1B only").is_err());
    }

    #[test]
    fn test_classification_without_code_is_bad_response() {
        let err = Classification::from_model_output("The fracture appears to involve the femur.")
            .unwrap_err();
        assert_eq!(err.kind(), "capability_bad_response");
        assert_eq!(err.capability(), Some(Capability::Classification));
    }

    #[test]
    fn test_classification_sentinel_is_insufficient() {
        let classification = Classification::from_model_output(INSUFFICIENT_DATA_SENTINEL).unwrap();
        assert_eq!(classification, Classification::InsufficientData);
        assert_eq!(
            classification.as_text(),
            "(Precise sub-group cannot be determined from provided views per Compendium guidelines)."
        );
    }

    #[test]
    fn test_classification_sentinel_overrides_code() {
        let output = "Likely 32-A1. (Precise sub-group cannot be determined from provided views per Compendium guidelines).";
        let classification = Classification::from_model_output(output).unwrap();
        assert!(classification.is_insufficient());
        assert_eq!(classification.as_text(), INSUFFICIENT_DATA_SENTINEL);
    }

    #[test]
    fn test_advice_request_constructors() {
        let req = AdviceRequest::treatment("dx", "65yo, diabetic", true);
        assert_eq!(req.kind, AdviceKind::Treatment);
        assert_eq!(req.patient_context.as_deref(), Some("65yo, diabetic"));
        assert!(req.treatment_plan.is_none());
        assert!(req.low_resource);

        let req = AdviceRequest::implant("dx", "ORIF", false);
        assert_eq!(req.kind, AdviceKind::Implant);
        assert_eq!(req.treatment_plan.as_deref(), Some("ORIF"));
    }
}
