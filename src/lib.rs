//! Identity Document PDF Generation
//!
//! This library provides the core functionality for the idcard-pdf system,
//! which lays out front/back identity document photos onto a single PDF page,
//! names the output from an OCR recognition call (falling back to synthetic
//! data when the provider is unreachable), and packages batches into a ZIP
//! archive.

pub mod app_state;
pub mod config;
pub mod models;
pub mod routes;
pub mod services;
