pub mod blob;

pub use blob::{BlobKind, BlobStore, StoredBlob, UPLOADS_URL_PREFIX};
