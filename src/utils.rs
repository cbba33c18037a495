use serde::de::DeserializeOwned;

use crate::chain::{ChainClient, StorageKey};
use crate::error::{GovernanceError, Result};

/// Reads a storage entry and decodes it from bcs. `None` when the key is empty.
pub async fn query_decoded<C, T>(
    chain: &C,
    key: StorageKey,
    what: &'static str,
) -> Result<Option<T>>
where
    C: ChainClient,
    T: DeserializeOwned,
{
    match chain.query(key).await? {
        Some(bytes) => bcs::from_bytes(&bytes)
            .map(Some)
            .map_err(|source| GovernanceError::Decode { what, source }),
        None => Ok(None),
    }
}
