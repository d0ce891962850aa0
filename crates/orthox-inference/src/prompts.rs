//! Prompt builders for every capability.
//!
//! Policy that must hold regardless of backend (descriptive-only vision
//! output, the insufficient-data sentinel, inline citations, the
//! low-resource recommendation policy) lives in these prompts.

use orthox_core::defaults::{
    AO_COMPENDIUM_URL, AO_SEARCH_DOMAINS, INSUFFICIENT_DATA_SENTINEL, NO_GUIDELINE_STATEMENT,
};
use orthox_core::{AdviceKind, AdviceRequest, VisionFindings};

/// Low-resource policy embedded in treatment requests.
pub const LOW_RESOURCE_TREATMENT_POLICY: &str = "LOW-RESOURCE SETTING ENABLED: Prioritize and recommend generic, widely available fixation methods (e.g., external fixators, standard tubular plates, K-wires, casts) over proprietary manufacturer systems.";

/// Low-resource policy embedded in implant requests.
pub const LOW_RESOURCE_IMPLANT_POLICY: &str = "LOW-RESOURCE SETTING ENABLED: Recommend generic fixation methods (e.g., standard plates, screws, K-wires) that maximize global clinical impact over proprietary systems.";

/// Instruction appended after the media parts of a vision request.
pub fn vision_extraction() -> &'static str {
    "You are a radiologic extractor. Convert the visual data in these images and videos \
     into structured JSON. Identify fracture lines, displacement, articular step-off, \
     hardware positioning and anatomical landmarks. Describe what is visible; DO NOT make \
     definitive clinical diagnoses. Output ONLY valid JSON."
}

/// Role framing for general-purpose reasoning.
pub fn reasoning_system() -> &'static str {
    "You are a specialized medical reasoning model fine-tuned for orthopedic trauma. \
     Reason carefully from the structured imaging findings and the patient context you are given."
}

pub fn reasoning_prompt(findings: &VisionFindings, context: &str) -> String {
    format!(
        "Patient Context: {}\n\nVision Data: {}\n\n\
         Perform high-fidelity clinical reasoning. Assess risks, identify red flags, \
         and suggest next workflow steps.",
        context,
        findings.as_str()
    )
}

pub fn classification_prompt(findings: &VisionFindings) -> String {
    format!(
        "Based on this vision data: {findings}, classify the fracture using the AO/OTA 2018 Compendium.\n\
         You MUST use ONLY the definitions and morphological descriptions from the compendium at {url}.\n\
         Output format:\n\
         - Alphanumeric Code (e.g., 32-A1)\n\
         - Exact clinical description from the compendium\n\
         - Compendium Reference (citing the section)\n\
         Never guess a code. If the data is insufficient, state exactly: \"{sentinel}\"",
        findings = findings.as_str(),
        url = AO_COMPENDIUM_URL,
        sentinel = INSUFFICIENT_DATA_SENTINEL,
    )
}

/// Treatment or implant advice prompt, including the search query.
pub fn advice_prompt(request: &AdviceRequest) -> String {
    let mut prompt = match request.kind {
        AdviceKind::Treatment => format!(
            "Based on the diagnosis: \"{}\" and patient context: \"{}\", provide evidence-based \
             treatment advice strictly grounded in AO Foundation guidelines.\n\
             Every clinical claim or operative step MUST be followed by an inline markdown \
             hyperlink to its direct source.\n\
             If no direct AO Foundation guideline is found, explicitly state: \"{}\" before \
             providing general advice.",
            request.diagnosis,
            request.patient_context.as_deref().unwrap_or(""),
            NO_GUIDELINE_STATEMENT,
        ),
        AdviceKind::Implant => format!(
            "For a patient with: {} undergoing: {}, suggest appropriate orthopedic implants.\n\
             Strictly ground suggestions in AO Foundation approved hardware.\n\
             Every suggestion MUST be followed by an inline markdown hyperlink to its direct source.\n\
             If no direct AO Foundation guideline is found, explicitly state: \"{}\".",
            request.diagnosis,
            request.treatment_plan.as_deref().unwrap_or(""),
            NO_GUIDELINE_STATEMENT,
        ),
    };

    if request.low_resource {
        prompt.push_str("\n\n");
        prompt.push_str(match request.kind {
            AdviceKind::Treatment => LOW_RESOURCE_TREATMENT_POLICY,
            AdviceKind::Implant => LOW_RESOURCE_IMPLANT_POLICY,
        });
    }

    let topic = match request.kind {
        AdviceKind::Treatment => "treatment guidelines",
        AdviceKind::Implant => "implant selection",
    };
    prompt.push_str(&format!(
        "\n\nSearch query: \"{} {} {}\"",
        request.diagnosis, topic, AO_SEARCH_DOMAINS
    ));
    prompt
}

pub fn outcome_prompt(findings: &VisionFindings, clinical_status: &str) -> String {
    format!(
        "Vision Data (Post-Op): {}\n\nClinical Status: {}\n\n\
         Evaluate post-operative recovery. Extract hardware positioning, alignment and \
         range-of-motion metrics. Screen for complications (hardware failure, infection signs). \
         Calculate functional recovery scores.",
        findings.as_str(),
        clinical_status
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vision_prompt_forbids_diagnosis() {
        assert!(vision_extraction().contains("DO NOT make definitive clinical diagnoses"));
        assert!(vision_extraction().contains("JSON"));
    }

    #[test]
    fn test_classification_prompt_carries_sentinel_and_compendium() {
        let prompt = classification_prompt(&VisionFindings::new(r#"{"fracture":"present"}"#));
        assert!(prompt.contains(AO_COMPENDIUM_URL));
        assert!(prompt.contains(INSUFFICIENT_DATA_SENTINEL));
        assert!(prompt.contains(r#"{"fracture":"present"}"#));
    }

    #[test]
    fn test_treatment_prompt_low_resource_policy() {
        let standard = advice_prompt(&AdviceRequest::treatment("Tibial shaft fracture", "", false));
        let low = advice_prompt(&AdviceRequest::treatment("Tibial shaft fracture", "", true));

        assert!(!standard.contains("LOW-RESOURCE"));
        assert!(low.contains(LOW_RESOURCE_TREATMENT_POLICY));
        assert!(low.contains("external fixators"));
        assert!(low.contains("treatment guidelines"));
        assert!(low.contains(AO_SEARCH_DOMAINS));
    }

    #[test]
    fn test_implant_prompt_uses_treatment_plan() {
        let prompt = advice_prompt(&AdviceRequest::implant("dx", "Intramedullary nailing", true));
        assert!(prompt.contains("undergoing: Intramedullary nailing"));
        assert!(prompt.contains(LOW_RESOURCE_IMPLANT_POLICY));
        assert!(prompt.contains("implant selection"));
    }

    #[test]
    fn test_advice_prompt_requires_citations() {
        let prompt = advice_prompt(&AdviceRequest::treatment("dx", "ctx", false));
        assert!(prompt.contains("inline markdown hyperlink"));
        assert!(prompt.contains(NO_GUIDELINE_STATEMENT));
    }

    #[test]
    fn test_outcome_prompt_includes_status() {
        let prompt = outcome_prompt(&VisionFindings::new("{}"), "6 weeks post-op, afebrile");
        assert!(prompt.contains("6 weeks post-op, afebrile"));
        assert!(prompt.contains("hardware failure"));
    }
}
