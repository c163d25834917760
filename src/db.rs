// src/db.rs

pub mod indent_repo;
pub use indent_repo::IndentRepository;
pub mod loading_sheet_repo;
pub use loading_sheet_repo::LoadingSheetRepository;
pub mod pg_gateway;
pub use pg_gateway::PgDispatchGateway;
