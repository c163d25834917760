// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Indents ---
        handlers::indents::creation_data,
        handlers::indents::search_indent,
        handlers::indents::batch_details,

        // --- Multi-Truck ---
        handlers::multi_truck::open_session,
        handlers::multi_truck::get_session,
        handlers::multi_truck::close_session,
        handlers::multi_truck::apply_action,
        handlers::multi_truck::remove_assignment,
        handlers::multi_truck::save_all,

        // --- Loading Sheets ---
        handlers::loading_sheets::open_editor,
        handlers::loading_sheets::get_editor,
        handlers::loading_sheets::close_editor,
        handlers::loading_sheets::apply_editor_action,
        handlers::loading_sheets::save_changes,
        handlers::loading_sheets::submit,
    ),
    components(
        schemas(
            // --- Indents ---
            models::indent::IndentItem,
            models::indent::ItemKey,
            models::indent::Indent,
            models::indent::IndentDataQuery,
            models::indent::IndentProductRow,
            models::indent::BatchQuery,
            models::indent::BatchDetail,

            // --- Alocação ---
            models::allocation::DispatchType,
            models::allocation::Allocation,
            models::allocation::SplitId,
            models::allocation::Slot,
            models::allocation::NoticeLevel,
            models::allocation::Notice,
            models::allocation::VehicleForm,
            models::allocation::AssignedItem,
            models::allocation::VehicleAssignment,
            models::allocation::LoadingSheetNo,

            // --- Folhas ---
            models::loading_sheet::BatchSelection,
            models::loading_sheet::SheetItem,
            models::loading_sheet::SelectedIndent,
            models::loading_sheet::LoadingSheet,
            models::loading_sheet::LoadingSheetPayload,
            models::loading_sheet::CreationData,
            models::loading_sheet::SubmissionReceipt,
            models::loading_sheet::SavedLoadingSheet,

            // --- Visões das sessões ---
            services::vehicle_aggregator::Phase,
            services::vehicle_aggregator::LedgerRow,
            services::vehicle_aggregator::AllocationView,
            services::assignment_builder::SplitView,
            services::assignment_builder::ItemDraftView,
            services::indent_editor::FifoBatch,
            services::indent_editor::EditorView,
            services::indent_editor::SingleTruckView,
            services::dispatch_service::SessionView,
            services::dispatch_service::EditorSessionView,
            services::dispatch_service::OpenEditorPayload,
        )
    ),
    tags(
        (name = "Indents", description = "Indents abertos, linhas de produto e lotes FIFO"),
        (name = "Multi-Truck", description = "Alocação de um indent em vários caminhões"),
        (name = "Loading Sheets", description = "Edição e envio de uma folha de carregamento")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
