//! In-memory store of emitted artifacts.

mod store;

pub use store::OutputStore;
