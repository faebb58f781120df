use crate::database::VectorStore;
use crate::error::Result;
use std::path::Path;

/// Fold `new_store` into the snapshot at `path`.
///
/// With no usable file (missing or zero length) `new_store` is written as is;
/// otherwise the existing records come first and the new ones follow. The
/// file is always rewritten in full.
pub fn merge_and_persist(new_store: &VectorStore, path: impl AsRef<Path>) -> Result<VectorStore> {
    let path = path.as_ref();
    let existing = load_if_present(path)?;
    if let Some(existing) = &existing {
        log::info!(
            "Merging {} new records into {} existing ones",
            new_store.len(),
            existing.len()
        );
    }
    let merged = VectorStore::merge_optional(existing.as_ref(), Some(new_store))?;

    merged.serialize(path)?;
    Ok(merged)
}

/// Load the snapshot at `path`, or `None` when there is nothing to load.
pub fn load_if_present(path: impl AsRef<Path>) -> Result<Option<VectorStore>> {
    match VectorStore::deserialize(path) {
        Ok(store) => Ok(Some(store)),
        Err(e) if e.is_missing_store() => Ok(None),
        Err(e) => Err(e),
    }
}
