//! jobstream - websocket report worker to HTTP event-stream bridge
//!
//! A report worker accepts one job request on a websocket and answers with a
//! sequence of typed JSON events. jobstream proxies those jobs to HTTP clients
//! as a `text/event-stream` body, accumulating the report text along the way
//! and saving the finished transcript.
//!
//! ## Ways to run a job
//!
//! 1. **Bridge (primary)**: `POST /analyze` on the local server. Each report
//!    frame carries the fragment and the full transcript so far.
//!
//! 2. **Direct**: the client talks to the worker socket itself and keeps its
//!    own accumulator (`jobstream run`).

pub mod bridge;
pub mod config;
pub mod domain;
pub mod server;
pub mod store;
pub mod stream;
pub mod worker;

pub use domain::*;
