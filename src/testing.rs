//! Helpers shared by the unit tests.

use std::sync::Arc;

use crate::{
    api::DuelApi,
    credentials::CredentialStore,
    gateway::Gateway,
    transport::{ApiRequest, ApiResponse, Transport},
};

/// Transport whose every request fails to connect.
pub(crate) struct Offline;

impl Transport for Offline {
    fn send(&self, request: &ApiRequest) -> anyhow::Result<ApiResponse> {
        anyhow::bail!("no service behind {}", request.url)
    }
}

pub(crate) fn offline_api() -> DuelApi {
    let gateway = Gateway::new(Arc::new(Offline), CredentialStore::new(), "http://duel.test/api");
    DuelApi::new(Arc::new(gateway))
}
