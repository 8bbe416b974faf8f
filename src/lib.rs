// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod audio;
pub mod config;
pub mod game;
pub mod hole;
pub mod runtime;
pub mod scheduler;
