pub mod ops;
pub mod serve;

// Re-export command functions for convenience
pub use ops::{clear, generate, resolve, stats};
pub use serve::serve;
