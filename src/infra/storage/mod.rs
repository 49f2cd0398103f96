// KvStore implementations.

pub mod in_memory;
pub mod json_file_store;

pub use in_memory::InMemoryKvStore;
pub use json_file_store::JsonFileKvStore;
