pub mod config;
pub mod format;
pub mod generate;
pub mod manifest;
pub mod output;
pub mod render;

pub use config::GeneratorConfig;
pub use generate::Generator;
pub use manifest::{PluginEntry, PluginManifest};
