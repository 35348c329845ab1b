pub mod engine;
pub mod notifier;
pub mod rules;
pub mod types;
