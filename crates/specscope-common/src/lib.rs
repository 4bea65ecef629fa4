//! Core library for SpecScope RF spectrum interference analysis.
//!
//! This crate contains:
//! - **Data model**: raw and enriched readings, bands, calendar bins
//! - **Enrichment**: timestamp parsing and derived features
//! - **Labeling**: threshold, training-label and spike/overlap policies
//! - **Reporting**: per-bucket interference aggregation
//! - **Datasets**: CSV/JSON loading and prediction output
//! - **Data sources**: external simulator process and built-in generator
//! - **Model**: classifier seam, random forest, training and evaluation
//! - **Prediction**: the facade used by the HTTP service and batch replay

pub mod config;
pub mod dataset;
pub mod enrich;
pub mod error;
pub mod labeling;
pub mod model;
pub mod models;
pub mod predict;
pub mod report;
pub mod simulate;
pub mod training;

pub use error::{Result, SpecscopeError};
