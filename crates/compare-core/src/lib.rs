//! Shared types for the page comparison and signature classification engines.

pub mod document;
pub mod error;
pub mod options;
pub mod plugin;
pub mod raster;
pub mod report;
