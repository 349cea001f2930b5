//! Shared fixtures for handler tests.

use axum::http::request::Builder;
use axum::http::Request;
use kc_core::{
    Allocator, AllocatorConfig, Cluster, ClusterAuth, ClusterMap, InMemoryLeaseStore,
    InventoryCache, SecureString,
};
use std::sync::Arc;
use std::time::Duration;

use crate::state::AppState;

/// Bearer token accepted by test states.
pub const TEST_TOKEN: &str = "test-token";

/// The cluster used throughout the API tests.
pub fn prod_east() -> Cluster {
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

/// State with `Prod-East` and `Prod-West` in the pool.
pub fn create_test_state() -> AppState {
    let mut west = prod_east();
    west.name = "Prod-West".to_string();
    west.endpoint = "https://5.6.7.8".to_string();
    state_for(vec![prod_east(), west])
}

/// State whose pool holds one bare cluster per name.
pub fn create_test_state_with_clusters(names: &[&str]) -> AppState {
    state_for(
        names
            .iter()
            .map(|n| Cluster::new(*n, format!("https://{}.test", n), ClusterAuth::default()))
            .collect(),
    )
}

fn state_for(clusters: Vec<Cluster>) -> AppState {
    let map: ClusterMap = clusters.into_iter().collect();
    let allocator = Allocator::new(
        Arc::new(InventoryCache::new(map)),
        Arc::new(InMemoryLeaseStore::new()),
        AllocatorConfig {
            max_lease_duration: Duration::from_secs(3600),
        },
    );
    AppState::new(Arc::new(allocator)).with_auth_token(SecureString::from(TEST_TOKEN))
}

/// Request builder carrying the test bearer token.
pub fn authorized_request(method: &str, uri: &str) -> Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", TEST_TOKEN))
}
