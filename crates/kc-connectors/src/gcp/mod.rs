//! Google Cloud connectors.

pub mod gke;

pub use gke::{GkeConfig, GkeConnector};
