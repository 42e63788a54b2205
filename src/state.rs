/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - verifier: 起動時に選ばれた CredentialVerifier (local / remote)
 *   - forwarder: プロセス共有の pooled client を持つ Forwarder
 *   - routes: 静的な RouteTable
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;

use crate::services::auth::CredentialVerifier;
use crate::services::proxy::{Forwarder, RouteTable};

#[derive(Clone, Debug)]
pub struct AppState {
    pub verifier: Arc<dyn CredentialVerifier>,
    pub forwarder: Forwarder,
    pub routes: Arc<RouteTable>,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(
        verifier: Arc<dyn CredentialVerifier>,
        forwarder: Forwarder,
        routes: Arc<RouteTable>,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            verifier,
            forwarder,
            routes,
            max_body_bytes,
        }
    }
}
