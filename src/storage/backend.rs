//! Trait do armazenamento de blobs.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    /// Chave sem arquivo correspondente
    #[error("Objeto não encontrado: {0}")]
    NotFound(String),

    /// Chave que escaparia da raiz (`..`, caminho absoluto)
    #[error("Chave inválida: {0}")]
    InvalidKey(String),

    #[error("Erro de IO: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Armazenamento endereçado por chave relativa.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()>;

    /// `StorageError::NotFound` quando a chave não existe.
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Remover uma chave inexistente não é erro.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    async fn exists(&self, key: &str) -> StorageResult<bool>;
}
