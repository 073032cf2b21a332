//! devpair starts a backend/frontend development server pair, relays their
//! output with per-service labels, watches their liveness, and guarantees
//! both are terminated when the run ends for any reason.

pub mod cli;
pub mod commands;
pub mod error;
pub mod preflight;
pub mod supervisor;
