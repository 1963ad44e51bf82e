//! Armazenamento dos anexos.
//!
//! O `AttachmentService` é o único que monta as chaves; aqui só guardamos
//! bytes por chave relativa (`<sr_no>/<campo>_<timestamp>.<ext>`).

mod backend;
mod local;

pub use backend::{BlobStore, StorageError, StorageResult};
pub use local::LocalStorage;
