pub mod engine;
pub mod traits;
