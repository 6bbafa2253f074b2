pub mod task;
pub mod theme;
pub mod config;

pub use task::*;
pub use theme::*;
pub use config::*;
