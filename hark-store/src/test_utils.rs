use crate::Store;

/// Helper to create an in-memory store with the schema applied
pub async fn create_test_store() -> Store {
    Store::in_memory()
        .await
        .expect("Failed to create in-memory store")
}
