//! In-memory case store.
//!
//! Same semantics as the PostgreSQL store, including one-way PHI
//! confirmation and `CaseNotFound` on writes to unknown cases. Every
//! `update_case_fields` call is recorded so tests can assert exactly what
//! the orchestrator wrote.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use orthox_core::{
    new_patient_reference, new_v7, patient_label, Case, CaseFull, CaseStore, CaseUpdate,
    CreateCaseRequest, CreateMediaRequest, CreateNoteRequest, Error, Media, Note, Result,
};

#[derive(Default)]
struct State {
    cases: Vec<Case>,
    notes: Vec<Note>,
    media: Vec<Media>,
    updates: Vec<(Uuid, CaseUpdate)>,
}

impl State {
    fn case_mut(&mut self, id: Uuid) -> Option<&mut Case> {
        self.cases.iter_mut().find(|c| c.id == id)
    }

    fn contains(&self, id: Uuid) -> bool {
        self.cases.iter().any(|c| c.id == id)
    }
}

/// Case store held in process memory. Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct InMemoryCaseStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryCaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `update_case_fields` call that succeeded, in order.
    pub async fn updates(&self) -> Vec<(Uuid, CaseUpdate)> {
        self.state.read().await.updates.clone()
    }

    /// Number of successful `update_case_fields` calls for one case.
    pub async fn update_count(&self, case_id: Uuid) -> usize {
        self.state
            .read()
            .await
            .updates
            .iter()
            .filter(|(id, _)| *id == case_id)
            .count()
    }
}

#[async_trait]
impl CaseStore for InMemoryCaseStore {
    async fn create_case(&self, req: CreateCaseRequest) -> Result<Case> {
        let reference = match req.patient_reference_id {
            Some(r) if !r.trim().is_empty() => r.trim().to_string(),
            _ => new_patient_reference(),
        };
        let case = Case {
            id: new_v7(),
            patient_name: patient_label(&reference),
            patient_reference_id: reference,
            diagnosis: None,
            treatment_plan: None,
            implant_choice: None,
            outcome_notes: None,
            low_resource_mode: req.low_resource_mode,
            phi_confirmed: false,
            created_at: Utc::now(),
        };

        self.state.write().await.cases.push(case.clone());
        debug!(
            subsystem = "db",
            component = "memory_store",
            op = "create_case",
            case_id = %case.id,
            "Created case"
        );
        Ok(case)
    }

    async fn get_case(&self, id: Uuid) -> Result<CaseFull> {
        let state = self.state.read().await;
        let case = state
            .cases
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or(Error::CaseNotFound(id))?;

        let notes = state
            .notes
            .iter()
            .filter(|n| n.case_id == id)
            .cloned()
            .collect();
        let media = state
            .media
            .iter()
            .filter(|m| m.case_id == id)
            .cloned()
            .collect();

        Ok(CaseFull { case, notes, media })
    }

    async fn list_cases(&self) -> Result<Vec<Case>> {
        // Reverse insertion order breaks created_at ties.
        let mut cases: Vec<Case> = self.state.read().await.cases.iter().rev().cloned().collect();
        cases.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(cases)
    }

    async fn update_case_fields(&self, id: Uuid, update: CaseUpdate) -> Result<()> {
        let mut state = self.state.write().await;
        let case = state.case_mut(id).ok_or(Error::CaseNotFound(id))?;
        update.apply_to(case);
        state.updates.push((id, update));

        debug!(
            subsystem = "db",
            component = "memory_store",
            op = "update_case_fields",
            case_id = %id,
            "Updated case fields"
        );
        Ok(())
    }

    async fn add_note(&self, req: CreateNoteRequest) -> Result<Note> {
        let mut state = self.state.write().await;
        if !state.contains(req.case_id) {
            return Err(Error::CaseNotFound(req.case_id));
        }
        let note = Note {
            id: new_v7(),
            case_id: req.case_id,
            content: req.content,
            source_url: req.source_url,
            created_at: Utc::now(),
        };
        state.notes.push(note.clone());
        Ok(note)
    }

    async fn add_media(&self, req: CreateMediaRequest) -> Result<Media> {
        let mut state = self.state.write().await;
        if !state.contains(req.case_id) {
            return Err(Error::CaseNotFound(req.case_id));
        }
        let media = Media {
            id: new_v7(),
            case_id: req.case_id,
            media_type: req.media_type,
            url: req.url,
            created_at: Utc::now(),
        };
        state.media.push(media.clone());
        Ok(media)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
