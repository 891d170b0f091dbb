pub mod captioning;
pub mod database;
pub mod pending;
pub mod storage;

pub use captioning::{CaptionProvider, HuggingFaceCaptioner, HuggingFaceConfig, MockCaptioner};
pub use database::{InMemoryStore, MongoDb, RecordStore};
pub use pending::{collect_pending, PendingComplaints};
pub use storage::{GcsStorage, GcsUrlSigner, LocalStorage, Storage, StoredObject};
