pub mod storage;
mod sorted_set;

pub use storage::MemoryStore;
