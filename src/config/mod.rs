//! Configuration for an org-accounts run

pub mod settings;

pub use settings::{
    DirectoryConfig, EngineConfig, OverridesConfig, ResolutionConfig, SlurmAccountLine,
    SlurmConfig, SlurmUserLine,
};
