//! Named vector store initialization.

use tracing::{debug, info};

use chatrelay_core::Result;

use crate::providers::FileService;
use crate::types::VectorStore;

/// Return the vector store called `name`, creating it if none exists.
///
/// List-then-create: two concurrent cold-start calls can both miss the
/// store and create duplicates. The provider has no create-if-absent call,
/// so later lookups simply reuse the first match by listing order.
pub async fn ensure_vector_store(files: &dyn FileService, name: &str) -> Result<VectorStore> {
    if let Some(store) = find_vector_store(files, name).await? {
        debug!("Reusing vector store {} ({})", name, store.id);
        return Ok(store);
    }

    let store = files.create_vector_store(name).await?;
    info!("Created vector store {} ({})", name, store.id);
    Ok(store)
}

/// Walk every page of vector stores looking for `name`.
pub async fn find_vector_store(files: &dyn FileService, name: &str) -> Result<Option<VectorStore>> {
    let mut after: Option<String> = None;

    loop {
        let page = files.list_vector_stores(after.as_deref()).await?;

        let cursor = page
            .last_id
            .clone()
            .or_else(|| page.data.last().map(|s| s.id.clone()));

        if let Some(store) = page
            .data
            .into_iter()
            .find(|s| s.name.as_deref() == Some(name))
        {
            return Ok(Some(store));
        }

        match cursor {
            Some(next) if page.has_more && after.as_deref() != Some(next.as_str()) => {
                after = Some(next);
            }
            _ => return Ok(None),
        }
    }
}
