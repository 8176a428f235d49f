//! Reconciliation of configured OAuth clients with the live client registry.
//!
//! Configuration is always the source of truth. In [`ClientPersistence::InMemory`]
//! mode the configured clients become a transient, process-lifetime registry and
//! the client store is never touched. In [`ClientPersistence::Persisted`] mode
//! every configured client replaces any stored client with the same id.
//!
//! Replacement is delete-then-insert per client. A failed insert after a
//! successful delete leaves that client absent until the next successful run;
//! there is no batch-wide transaction.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::errors::{ClientRegistryError, StorageError};
use crate::oauth::types::ClientRegistration;
use crate::storage::traits::ClientStore;

/// Where reconciled clients live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientPersistence {
    InMemory,
    Persisted,
}

impl ClientPersistence {
    /// `true` selects the persisted client store
    pub fn from_use_database(use_database: bool) -> Self {
        if use_database {
            Self::Persisted
        } else {
            Self::InMemory
        }
    }
}

/// The set of clients recognized by the authorization server
#[derive(Clone)]
pub enum ClientRegistry {
    Transient(Arc<BTreeMap<String, ClientRegistration>>),
    Persisted(Arc<dyn ClientStore>),
}

impl std::fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transient(clients) => f
                .debug_tuple("Transient")
                .field(&clients.keys().collect::<Vec<_>>())
                .finish(),
            Self::Persisted(_) => f.debug_tuple("Persisted").finish(),
        }
    }
}

impl ClientRegistry {
    pub fn persistence(&self) -> ClientPersistence {
        match self {
            Self::Transient(_) => ClientPersistence::InMemory,
            Self::Persisted(_) => ClientPersistence::Persisted,
        }
    }

    pub async fn find_client(
        &self,
        client_id: &str,
    ) -> Result<Option<ClientRegistration>, StorageError> {
        match self {
            Self::Transient(clients) => Ok(clients.get(client_id).cloned()),
            Self::Persisted(store) => store.get_client(client_id).await,
        }
    }

    pub async fn client_ids(&self) -> Result<Vec<String>, StorageError> {
        match self {
            Self::Transient(clients) => Ok(clients.keys().cloned().collect()),
            Self::Persisted(store) => store.list_client_ids().await,
        }
    }

    /// Look up a client and check its secret
    pub async fn authenticate(
        &self,
        client_id: &str,
        secret: &str,
    ) -> Result<Option<ClientRegistration>, StorageError> {
        let client = self.find_client(client_id).await?;
        Ok(client.filter(|client| client.secret_matches(secret)))
    }
}

/// Make the live client set match `configured` exactly.
///
/// Must complete before the server accepts requests; any error is fatal to startup.
pub async fn reconcile(
    configured: &[ClientRegistration],
    persistence: ClientPersistence,
    store: Arc<dyn ClientStore>,
) -> Result<ClientRegistry, ClientRegistryError> {
    let mut seen = HashSet::new();
    for client in configured {
        if !seen.insert(client.client_id.as_str()) {
            return Err(ClientRegistryError::DuplicateClientId(
                client.client_id.clone(),
            ));
        }
    }

    match persistence {
        ClientPersistence::InMemory => {
            let clients: BTreeMap<String, ClientRegistration> = configured
                .iter()
                .map(|client| (client.client_id.clone(), client.clone()))
                .collect();
            tracing::info!(clients = clients.len(), "registered in-memory OAuth clients");
            Ok(ClientRegistry::Transient(Arc::new(clients)))
        }
        ClientPersistence::Persisted => {
            let existing: HashSet<String> = store
                .list_client_ids()
                .await
                .map_err(ClientRegistryError::ListFailed)?
                .into_iter()
                .collect();

            let mut replaced = 0usize;
            for client in configured {
                if existing.contains(&client.client_id) {
                    tracing::debug!(client_id = %client.client_id, "removing stored client");
                    store.delete_client(&client.client_id).await.map_err(|source| {
                        ClientRegistryError::DeleteFailed {
                            client_id: client.client_id.clone(),
                            source,
                        }
                    })?;
                    replaced += 1;
                }

                tracing::debug!(client_id = %client.client_id, "inserting configured client");
                store.insert_client(client).await.map_err(|source| {
                    ClientRegistryError::InsertFailed {
                        client_id: client.client_id.clone(),
                        source,
                    }
                })?;
            }

            tracing::info!(
                clients = configured.len(),
                replaced,
                "reconciled persisted OAuth clients"
            );
            Ok(ClientRegistry::Persisted(store))
        }
    }
}
