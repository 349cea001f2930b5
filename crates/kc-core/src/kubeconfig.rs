//! Kubeconfig materialization.
//!
//! A leased cluster is handed out as a kubeconfig document encoded as
//! base64 of its JSON form, so it fits in a header or a JSON string field.
//! Every map in [`AccessConfig`] is ordered, which makes the encoding
//! byte-stable: the same cluster always produces the same string.

use crate::cluster::Cluster;
use crate::error::{AllocationError, AllocationResult};
use crate::secure_string::SecureString;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Format version stamped into every kubeconfig.
pub const KUBECONFIG_API_VERSION: &str = "v1";

/// A self-contained kubeconfig for one cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessConfig {
    pub current_context: String,
    pub api_version: String,
    pub clusters: BTreeMap<String, ClusterEntry>,
    pub contexts: BTreeMap<String, ContextEntry>,
    pub auth_infos: BTreeMap<String, AuthInfoEntry>,
}

/// How to reach a cluster's API server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterEntry {
    pub server: String,
    pub certificate_authority_data: String,
}

/// Binds a cluster entry to an auth-info entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextEntry {
    pub cluster: String,
    pub auth_info: String,
}

/// Client credentials for a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthInfoEntry {
    pub client_certificate_data: String,
    pub client_key_data: SecureString,
    pub username: String,
    pub password: SecureString,
}

/// Errors from turning an encoded kubeconfig back into a document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Invalid base64: {0}")]
    Base64(String),

    #[error("Invalid kubeconfig JSON: {0}")]
    Json(String),

    #[error("Inconsistent kubeconfig: {0}")]
    Inconsistent(String),
}

/// Builds the kubeconfig for a cluster.
///
/// The lower-cased cluster name names both the context and the auth-info;
/// the cluster entry keeps the original name. Auth material is copied
/// verbatim, empty values included.
pub fn build_access_config(cluster: &Cluster) -> AccessConfig {
    let context_name = cluster.name.to_lowercase();
    let auth_info_name = context_name.clone();

    let clusters = BTreeMap::from([(
        cluster.name.clone(),
        ClusterEntry {
            server: cluster.endpoint.clone(),
            certificate_authority_data: cluster.auth.cluster_ca_certificate.clone(),
        },
    )]);
    let contexts = BTreeMap::from([(
        context_name.clone(),
        ContextEntry {
            cluster: cluster.name.clone(),
            auth_info: auth_info_name.clone(),
        },
    )]);
    let auth_infos = BTreeMap::from([(
        auth_info_name,
        AuthInfoEntry {
            client_certificate_data: cluster.auth.client_certificate.clone(),
            client_key_data: cluster.auth.client_key.clone(),
            username: cluster.auth.username.clone(),
            password: cluster.auth.password.clone(),
        },
    )]);

    AccessConfig {
        current_context: context_name,
        api_version: KUBECONFIG_API_VERSION.to_string(),
        clusters,
        contexts,
        auth_infos,
    }
}

/// Encodes a kubeconfig as single-line base64 of its JSON form.
pub fn encode_access_config(config: &AccessConfig) -> AllocationResult<String> {
    let json =
        serde_json::to_vec(config).map_err(|e| AllocationError::Serialization(e.to_string()))?;
    Ok(BASE64.encode(json))
}

/// Decodes a string produced by [`encode_access_config`] and checks that
/// its context resolves.
pub fn decode_access_config(encoded: &str) -> Result<AccessConfig, DecodeError> {
    let json = BASE64
        .decode(encoded.trim())
        .map_err(|e| DecodeError::Base64(e.to_string()))?;
    let config: AccessConfig =
        serde_json::from_slice(&json).map_err(|e| DecodeError::Json(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

impl AccessConfig {
    /// Checks that the current context names a context whose cluster and
    /// auth-info entries exist in the document.
    pub fn validate(&self) -> Result<(), DecodeError> {
        let context = self.contexts.get(&self.current_context).ok_or_else(|| {
            DecodeError::Inconsistent(format!(
                "current context '{}' is not defined",
                self.current_context
            ))
        })?;
        if !self.clusters.contains_key(&context.cluster) {
            return Err(DecodeError::Inconsistent(format!(
                "context '{}' references unknown cluster '{}'",
                self.current_context, context.cluster
            )));
        }
        if !self.auth_infos.contains_key(&context.auth_info) {
            return Err(DecodeError::Inconsistent(format!(
                "context '{}' references unknown auth info '{}'",
                self.current_context, context.auth_info
            )));
        }
        Ok(())
    }

    /// Returns the cluster entry the current context points at.
    pub fn current_cluster(&self) -> Option<&ClusterEntry> {
        self.contexts
            .get(&self.current_context)
            .and_then(|ctx| self.clusters.get(&ctx.cluster))
    }

    /// Returns the auth-info entry the current context points at.
    pub fn current_auth_info(&self) -> Option<&AuthInfoEntry> {
        self.contexts
            .get(&self.current_context)
            .and_then(|ctx| self.auth_infos.get(&ctx.auth_info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::ClusterAuth;

    fn prod_east() -> Cluster {
        Cluster::new(
            "Prod-East",
            "https://1.2.3.4",
            ClusterAuth {
                cluster_ca_certificate: "CAFE".to_string(),
                client_certificate: "BEEF".to_string(),
                client_key: SecureString::from("F00D"),
                username: String::new(),
                password: SecureString::default(),
            },
        )
    }

    #[test]
    fn test_build_normalizes_context_and_auth_info_names() {
        let config = build_access_config(&prod_east());

        assert_eq!(config.current_context, "prod-east");
        assert_eq!(config.api_version, "v1");
        assert_eq!(config.clusters.len(), 1);
        assert_eq!(config.contexts.len(), 1);
        assert_eq!(config.auth_infos.len(), 1);

        let cluster = &config.clusters["Prod-East"];
        assert_eq!(cluster.server, "https://1.2.3.4");
        assert_eq!(cluster.certificate_authority_data, "CAFE");

        let context = &config.contexts["prod-east"];
        assert_eq!(context.cluster, "Prod-East");
        assert_eq!(context.auth_info, "prod-east");

        let auth = &config.auth_infos["prod-east"];
        assert_eq!(auth.client_certificate_data, "BEEF");
        assert_eq!(auth.client_key_data.expose_secret(), "F00D");
        assert_eq!(auth.username, "");
        assert!(auth.password.is_empty());

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_credentials_are_serialized_not_omitted() {
        let encoded = encode_access_config(&build_access_config(&prod_east())).unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&BASE64.decode(encoded).unwrap()).unwrap();

        let auth = &json["authInfos"]["prod-east"];
        assert_eq!(auth["username"], "");
        assert_eq!(auth["password"], "");
        assert_eq!(auth["clientKeyData"], "F00D");
        assert_eq!(json["currentContext"], "prod-east");
        assert_eq!(json["apiVersion"], "v1");
        assert_eq!(json["clusters"]["Prod-East"]["server"], "https://1.2.3.4");
        assert_eq!(json["contexts"]["prod-east"]["authInfo"], "prod-east");
    }

    #[test]
    fn test_encoding_is_byte_stable() {
        let first = encode_access_config(&build_access_config(&prod_east())).unwrap();
        let second = encode_access_config(&build_access_config(&prod_east())).unwrap();
        assert_eq!(first, second);
        assert!(!first.contains('\n'));
    }

    #[test]
    fn test_decode_restores_document() {
        let mut cluster = prod_east();
        cluster.auth.username = "admin".to_string();
        cluster.auth.password = SecureString::from("s3cret");

        let config = build_access_config(&cluster);
        let decoded = decode_access_config(&encode_access_config(&config).unwrap()).unwrap();

        assert_eq!(decoded, config);
        let auth = decoded.current_auth_info().unwrap();
        assert_eq!(auth.username, "admin");
        assert_eq!(auth.password.expose_secret(), "s3cret");
        assert_eq!(decoded.current_cluster().unwrap().server, "https://1.2.3.4");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_access_config("not base64!!"),
            Err(DecodeError::Base64(_))
        ));
        assert!(matches!(
            decode_access_config(&BASE64.encode("[1,2,3]")),
            Err(DecodeError::Json(_))
        ));
    }

    #[test]
    fn test_decode_rejects_dangling_context() {
        let mut config = build_access_config(&prod_east());
        config.current_context = "elsewhere".to_string();
        let encoded = encode_access_config(&config).unwrap();

        assert!(matches!(
            decode_access_config(&encoded),
            Err(DecodeError::Inconsistent(_))
        ));
    }

    #[test]
    fn test_validate_rejects_missing_auth_info() {
        let mut config = build_access_config(&prod_east());
        config.auth_infos.clear();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("auth info"));
    }
}
