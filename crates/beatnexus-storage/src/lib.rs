//! BeatNexus Storage Library
//!
//! Object storage for submitted battle videos, with a Supabase storage
//! backend and a local filesystem backend.
//!
//! # Storage key format
//!
//! Every backend writes objects at `{user_id}/{random}.{ext}`, where the random
//! part is 16 lowercase alphanumerics. Keys must not contain `..` or a
//! leading `/`. Key generation is centralized in the `keys` module.

pub mod factory;
pub mod keys;
pub mod local;
pub mod supabase;
pub mod traits;

// Re-export commonly used types
pub use beatnexus_core::StorageBackendKind;
pub use factory::create_storage;
pub use keys::generate_storage_key;
pub use local::LocalStorage;
pub use supabase::SupabaseStorage;
pub use traits::{Storage, StorageError, StorageResult};
