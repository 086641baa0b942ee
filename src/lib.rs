pub mod api;
pub mod archive;
pub mod config;
pub mod errors;
pub mod exec;
pub mod jobs;
pub mod oracle;
pub mod pipeline;
pub mod repo;
pub mod server;
pub mod synth;
