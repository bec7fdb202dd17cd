//! Core library for the `exposure` evaluation pipeline.
//!
//! Evaluates a table of (profession, task) records with several independent
//! raters (local generative models driven in one batch each, plus a remote
//! judge service), reconciles the ratings into a consensus score, and runs a
//! second API-backed classification pass over the consensus. Every stage is
//! checkpointed so an interrupted run is resumed by simply re-invoking it.

pub mod checkpoint;
pub mod config;
pub mod consensus;
pub mod dataset;
pub mod engine;
pub mod errors;
pub mod identity;
pub mod judge;
pub mod limiter;
pub mod model;
pub mod pipeline;
pub mod prompt;
pub mod providers;
pub mod raters;

pub use config::PipelineConfig;
pub use errors::JudgeError;
pub use judge::JudgeClient;
pub use limiter::RateLimiter;
pub use model::{RaterOutcome, RecordId, SecondaryOutcome, TaskRecord, WorkTable};
pub use pipeline::Pipeline;
