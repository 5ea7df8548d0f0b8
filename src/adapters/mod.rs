// Adapters layer: concrete implementations for external systems.

pub mod toolchain;

pub use toolchain::CommandToolchain;
