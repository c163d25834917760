// src/services.rs

pub mod assignment_builder;
pub mod dispatch_service;
pub mod gateway;
pub mod indent_editor;
pub mod ledger;
pub mod vehicle_aggregator;

pub use dispatch_service::DispatchService;
