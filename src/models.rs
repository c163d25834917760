// src/models.rs

pub mod allocation;
pub mod indent;
pub mod loading_sheet;
