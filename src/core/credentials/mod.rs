pub mod credential_hasher;

pub use credential_hasher::{CredentialError, CredentialHasher, HashingConfig};
