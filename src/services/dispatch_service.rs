// src/services/dispatch_service.rs

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use tokio::sync::RwLock;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{AllocationError, AppError},
    models::{
        allocation::{LoadingSheetNo, Notice, VehicleAssignment},
        indent::{BatchDetail, BatchQuery, IndentDataQuery, IndentProductRow},
        loading_sheet::{CreationData, LoadingSheet, LoadingSheetPayload, SavedLoadingSheet, SubmissionReceipt},
    },
    services::{
        gateway::DispatchGateway,
        indent_editor::{EditorAction, SingleTruckState, SingleTruckView},
        vehicle_aggregator::{Action, AllocationState, AllocationView},
    },
};

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60 * 60);

// --- Sessões em memória ---

// Dono da sessão e última vez que ele a usou
#[derive(Debug, Clone)]
struct Ownership {
    operator: String,
    touched: Instant,
}

impl Ownership {
    fn new(operator: &str) -> Self {
        Self { operator: operator.to_string(), touched: Instant::now() }
    }

    fn check(&self, id: Uuid, operator: &str) -> Result<(), AppError> {
        if self.operator != operator {
            return Err(AppError::SessionForbidden(id));
        }
        Ok(())
    }

    fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.touched)
    }
}

trait Owned {
    fn ownership(&self) -> &Ownership;
    fn ownership_mut(&mut self) -> &mut Ownership;
}

#[derive(Debug, Clone)]
struct MultiTruckSession {
    owner: Ownership,
    state: AllocationState,
    notices: Vec<Notice>,
    // Um "Save All" em andamento bloqueia novas edições e um segundo envio
    saving: bool,
}

#[derive(Debug, Clone)]
struct EditorSession {
    owner: Ownership,
    state: SingleTruckState,
    notices: Vec<Notice>,
}

impl Owned for MultiTruckSession {
    fn ownership(&self) -> &Ownership {
        &self.owner
    }

    fn ownership_mut(&mut self) -> &mut Ownership {
        &mut self.owner
    }
}

impl Owned for EditorSession {
    fn ownership(&self) -> &Ownership {
        &self.owner
    }

    fn ownership_mut(&mut self) -> &mut Ownership {
        &mut self.owner
    }
}

/// Sessão do operador, marcada como usada agora.
fn claim<'a, S: Owned>(
    sessions: &'a mut HashMap<Uuid, S>,
    id: Uuid,
    operator: &str,
) -> Result<&'a mut S, AppError> {
    let session = sessions.get_mut(&id).ok_or(AppError::SessionNotFound(id))?;
    session.ownership().check(id, operator)?;
    session.ownership_mut().touched = Instant::now();
    Ok(session)
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session_id: Uuid,
    pub saving: bool,
    #[serde(flatten)]
    pub allocation: AllocationView,
    pub notices: Vec<Notice>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EditorSessionView {
    pub session_id: Uuid,
    #[serde(flatten)]
    pub sheet: SingleTruckView,
    pub notices: Vec<Notice>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpenEditorPayload {
    pub sheet: LoadingSheet,
    // Indents a acrescentar à folha, buscados entre os disponíveis
    #[serde(default)]
    pub indent_nos: Vec<String>,
}

#[derive(Clone)]
pub struct DispatchService {
    gateway: Arc<dyn DispatchGateway>,
    sessions: Arc<RwLock<HashMap<Uuid, MultiTruckSession>>>,
    editors: Arc<RwLock<HashMap<Uuid, EditorSession>>>,
    idle_timeout: Duration,
}

impl DispatchService {
    pub fn new(gateway: Arc<dyn DispatchGateway>) -> Self {
        Self {
            gateway,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            editors: Arc::new(RwLock::new(HashMap::new())),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    // =========================================================================
    //  CONSULTAS
    // =========================================================================

    /// Indents disponíveis e o próximo número de folha do mês.
    pub async fn creation_data(&self, today: NaiveDate) -> Result<CreationData, AppError> {
        let available_indents_for_selection = self.gateway.available_indents().await?;
        let last = self.gateway.last_loading_sheet_no().await?;
        let next_loading_sheet_no = LoadingSheetNo::following(last, today)?;

        Ok(CreationData {
            next_loading_sheet_no,
            available_indents_for_selection,
        })
    }

    pub async fn search_indent(&self, query: &IndentDataQuery) -> Result<Vec<IndentProductRow>, AppError> {
        self.gateway.fetch_indent_data(query).await
    }

    pub async fn batch_details(&self, query: &BatchQuery) -> Result<Vec<BatchDetail>, AppError> {
        self.gateway.get_batch_details(query).await
    }

    // =========================================================================
    //  MULTI-CAMINHÃO
    // =========================================================================

    pub async fn open_session(&self, today: NaiveDate, operator: &str) -> Result<SessionView, AppError> {
        // Busca fora do lock
        let data = self.creation_data(today).await?;
        let session = MultiTruckSession {
            owner: Ownership::new(operator),
            state: AllocationState::new(data.available_indents_for_selection, data.next_loading_sheet_no),
            notices: Vec::new(),
            saving: false,
        };

        let id = Uuid::new_v4();
        let view = session_view(id, &session);
        self.sessions.write().await.insert(id, session);

        tracing::info!(session_id = %id, operator, sheet_no = %data.next_loading_sheet_no, "Sessão multi-caminhão aberta");
        Ok(view)
    }

    pub async fn session(&self, id: Uuid, operator: &str) -> Result<SessionView, AppError> {
        let mut sessions = self.sessions.write().await;
        let session = claim(&mut sessions, id, operator)?;
        Ok(session_view(id, session))
    }

    /// Aplica uma ação ao estado da sessão. Em caso de rejeição o ledger não muda,
    /// mas uma quantidade inválida volta a 0 no rascunho guardado.
    pub async fn apply_action(&self, id: Uuid, operator: &str, action: Action) -> Result<SessionView, AppError> {
        let mut sessions = self.sessions.write().await;
        let session = claim(&mut sessions, id, operator)?;
        if session.saving {
            return Err(AppError::SubmissionInProgress(id));
        }

        match session.state.reduce(action.clone()) {
            Ok(transition) => {
                if matches!(action, Action::AssignVehicle { .. }) {
                    tracing::info!(session_id = %id, vehicles = transition.state.assignments().len(), "Veículo atribuído");
                }
                session.state = transition.state;
                session.notices = transition.notices;
                Ok(session_view(id, session))
            }
            Err(err) => {
                tracing::debug!(session_id = %id, error = %err, "Ação rejeitada");
                session.state = session.state.after_rejection(&action);
                session.notices = vec![Notice::error(err.to_string())];
                Err(err.into())
            }
        }
    }

    pub async fn remove_assignment(&self, id: Uuid, operator: &str, index: usize) -> Result<SessionView, AppError> {
        self.apply_action(id, operator, Action::RemoveAssignment { index }).await
    }

    /// "Save All": envia a lista inteira numa chamada. Sucesso limpa a sessão; falha a preserva.
    pub async fn save_all(&self, id: Uuid, operator: &str) -> Result<SubmissionReceipt, AppError> {
        // 1. Marca o envio em andamento e tira uma cópia da lista
        let assignments = {
            let mut sessions = self.sessions.write().await;
            let session = claim(&mut sessions, id, operator)?;
            if session.saving {
                return Err(AppError::SubmissionInProgress(id));
            }
            let assignments = session.state.submission()?;
            session.saving = true;
            assignments
        };

        // 2 e 3 rodam numa task própria: se a requisição for abandonada no meio,
        // o resultado ainda é aplicado e a flag `saving` sempre volta a false.
        let service = self.clone();
        let submission = tokio::spawn(async move { service.finish_save(id, assignments).await });

        match submission.await {
            Ok(result) => result,
            Err(join_err) => {
                if let Some(session) = self.sessions.write().await.get_mut(&id) {
                    session.saving = false;
                }
                tracing::error!(session_id = %id, error = %join_err, "Envio multi-caminhão interrompido");
                Err(AppError::InternalServerError(anyhow::anyhow!(
                    "envio da sessão {id} interrompido: {join_err}"
                )))
            }
        }
    }

    async fn finish_save(&self, id: Uuid, assignments: Vec<VehicleAssignment>) -> Result<SubmissionReceipt, AppError> {
        // 2. Chamada externa sem segurar o lock
        let result = self.gateway.create_multi_truck_loading_sheet(&assignments).await;

        // 3. Aplica o resultado
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(&id) else {
            tracing::warn!(session_id = %id, "Sessão removida durante o envio");
            return result;
        };
        session.saving = false;

        match result {
            Ok(receipt) => {
                // A numeração continua depois do último número realmente gravado
                let next = receipt
                    .loading_sheet_nos
                    .last()
                    .and_then(|last| last.next().ok())
                    .unwrap_or_else(|| session.state.loading_sheet_no());
                session.state = session.state.cleared(next);
                session.notices = vec![Notice::info(format!(
                    "{} loading sheet(s) saved successfully.",
                    receipt.loading_sheet_nos.len()
                ))];
                tracing::info!(session_id = %id, sheets = receipt.loading_sheet_nos.len(), "Folhas multi-caminhão salvas");
                Ok(receipt)
            }
            Err(err) => {
                tracing::warn!(session_id = %id, error = %err, "Falha ao salvar folhas; sessão preservada");
                session.notices = vec![Notice::error(err.to_string())];
                Err(err)
            }
        }
    }

    /// Descarta a sessão. Não é permitido enquanto um envio está em andamento.
    pub async fn close_session(&self, id: Uuid, operator: &str) -> Result<(), AppError> {
        let mut sessions = self.sessions.write().await;
        let session = claim(&mut sessions, id, operator)?;
        if session.saving {
            return Err(AppError::SubmissionInProgress(id));
        }
        sessions.remove(&id);

        tracing::info!(session_id = %id, operator, "Sessão multi-caminhão encerrada");
        Ok(())
    }

    // =========================================================================
    //  EDITOR DE UM CAMINHÃO
    // =========================================================================

    pub async fn open_editor(&self, payload: OpenEditorPayload, operator: &str) -> Result<EditorSessionView, AppError> {
        let mut picked = Vec::new();
        if !payload.indent_nos.is_empty() {
            let available = self.gateway.available_indents().await?;
            for indent_no in &payload.indent_nos {
                let indent = available
                    .iter()
                    .find(|indent| &indent.indent_no == indent_no)
                    .ok_or_else(|| AllocationError::IndentNotAvailable(indent_no.clone()))?;
                picked.push(indent.clone());
            }
        }

        let session = EditorSession {
            owner: Ownership::new(operator),
            state: SingleTruckState::new(payload.sheet).with_indents(&picked),
            notices: Vec::new(),
        };

        let id = Uuid::new_v4();
        let view = editor_view(id, &session);
        self.editors.write().await.insert(id, session);

        tracing::info!(session_id = %id, operator, "Editor de folha aberto");
        Ok(view)
    }

    pub async fn editor(&self, id: Uuid, operator: &str) -> Result<EditorSessionView, AppError> {
        let mut editors = self.editors.write().await;
        let session = claim(&mut editors, id, operator)?;
        Ok(editor_view(id, session))
    }

    pub async fn apply_editor_action(
        &self,
        id: Uuid,
        operator: &str,
        action: EditorAction,
    ) -> Result<EditorSessionView, AppError> {
        // FIFO marcado: os lotes vêm de getBatchDetails antes de entrar no estado
        let action = match action {
            EditorAction::SetFifo { item_id, is_fifo: true, .. } => {
                let query = {
                    let mut editors = self.editors.write().await;
                    let session = claim(&mut editors, id, operator)?;
                    let editor = session.state.editor().ok_or(AllocationError::NoIndentSelected)?;
                    editor.batch_query(&item_id)?
                };
                let batches = self.gateway.get_batch_details(&query).await?;
                EditorAction::SetFifo { item_id, is_fifo: true, batches }
            }
            other => other,
        };

        let mut editors = self.editors.write().await;
        let session = claim(&mut editors, id, operator)?;

        match session.state.reduce(action.clone()) {
            Ok(transition) => {
                session.state = transition.state;
                session.notices = transition.notices;
                Ok(editor_view(id, session))
            }
            Err(err) => {
                session.state = session.state.after_rejection(&action);
                session.notices = vec![Notice::error(err.to_string())];
                Err(err.into())
            }
        }
    }

    pub async fn save_changes(&self, id: Uuid, operator: &str) -> Result<EditorSessionView, AppError> {
        self.apply_editor_action(id, operator, EditorAction::SaveChanges).await
    }

    /// createLoadingSheet para folhas novas, updateLoadingSheet para as existentes.
    pub async fn submit_editor(&self, id: Uuid, operator: &str) -> Result<SavedLoadingSheet, AppError> {
        let sheet = {
            let mut editors = self.editors.write().await;
            let session = claim(&mut editors, id, operator)?;
            session.state.sheet().clone()
        };
        sheet.validate().map_err(AppError::ValidationError)?;

        let payload = LoadingSheetPayload::from(&sheet);
        let saved_id = match sheet.id {
            Some(existing) => self.gateway.update_loading_sheet(existing, &payload).await?,
            None => self.gateway.create_loading_sheet(&payload).await?,
        };

        self.editors.write().await.remove(&id);
        tracing::info!(session_id = %id, sheet_id = %saved_id, sheet_no = %sheet.loading_sheet_no, "Folha de carregamento salva");

        Ok(SavedLoadingSheet {
            id: saved_id,
            loading_sheet_no: sheet.loading_sheet_no,
        })
    }

    pub async fn close_editor(&self, id: Uuid, operator: &str) -> Result<(), AppError> {
        let mut editors = self.editors.write().await;
        claim(&mut editors, id, operator)?;
        editors.remove(&id);

        tracing::info!(session_id = %id, operator, "Editor de folha encerrado");
        Ok(())
    }

    // =========================================================================
    //  LIMPEZA
    // =========================================================================

    /// Remove sessões sem uso há `idle_timeout` ou mais. Sessões com envio em
    /// andamento ficam. Devolve quantas foram removidas.
    pub async fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let timeout = self.idle_timeout;

        let sessions_evicted = {
            let mut sessions = self.sessions.write().await;
            let before = sessions.len();
            sessions.retain(|_, session| session.saving || session.owner.idle_for(now) < timeout);
            before - sessions.len()
        };
        let editors_evicted = {
            let mut editors = self.editors.write().await;
            let before = editors.len();
            editors.retain(|_, session| session.owner.idle_for(now) < timeout);
            before - editors.len()
        };

        let evicted = sessions_evicted + editors_evicted;
        if evicted > 0 {
            tracing::info!(sessions = sessions_evicted, editors = editors_evicted, "Sessões ociosas removidas");
        }
        evicted
    }
}

fn session_view(id: Uuid, session: &MultiTruckSession) -> SessionView {
    SessionView {
        session_id: id,
        saving: session.saving,
        allocation: session.state.view(),
        notices: session.notices.clone(),
    }
}

fn editor_view(id: Uuid, session: &EditorSession) -> EditorSessionView {
    EditorSessionView {
        session_id: id,
        sheet: session.state.view(),
        notices: session.notices.clone(),
    }
}
