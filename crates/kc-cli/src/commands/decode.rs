//! Decode command - turns a lease's kubeconfig string into YAML.

use anyhow::{Context, Result};
use kc_core::decode_access_config;
use std::io::Read;

/// Reads the encoded kubeconfig from the argument, or stdin when it is `-`.
pub fn read_input(arg: &str) -> Result<String> {
    if arg == "-" {
        let mut input = String::new();
        std::io::stdin()
            .read_to_string(&mut input)
            .context("Failed to read kubeconfig from stdin")?;
        Ok(input)
    } else {
        Ok(arg.to_string())
    }
}

/// Decodes a base64 kubeconfig and renders the document as YAML.
///
/// The output mirrors the encoded JSON (camelCase keys, name-keyed maps), so
/// it is meant for reading, not for loading into `kubectl`.
pub fn decode_to_yaml(encoded: &str) -> Result<String> {
    let config = decode_access_config(encoded).context("Invalid kubeconfig")?;
    serde_yaml::to_string(&config).context("Failed to render kubeconfig as YAML")
}
