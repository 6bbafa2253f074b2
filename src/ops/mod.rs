pub mod codec;
pub mod debounce;
pub mod filter;
pub mod reorder;
pub mod session;
pub mod store;
