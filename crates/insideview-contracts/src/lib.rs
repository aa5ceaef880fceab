//! Shared types for InsideView: generation parameters, prompt templates and
//! their resolution, model registry, result shapes, studio command parsing
//! and the session event trace.

pub mod chat;
pub mod events;
pub mod layout;
pub mod models;
pub mod presets;
pub mod prompt;
pub mod request;
pub mod results;
pub mod templates;
