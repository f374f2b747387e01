//! HTTP middleware for request identification, logging, and authentication.
//!
//! - **Request ID**: reuse or mint `X-Request-ID`, attach a request span
//! - **Logging**: entry and completion lines with status-based severity
//! - **Recover**: panics become a minimal 500 response
//! - **Authentication**: bearer / static-key chain with constant-time comparison
//!
//! The order is declared once in [`Pipeline`].

pub mod auth;
pub mod logging;
pub mod pipeline;
pub mod recover;
pub mod request_id;

pub use auth::AuthLayer;
pub use logging::{LoggingLayer, completion_level};
pub use pipeline::{Pipeline, Stage};
pub use request_id::{REQUEST_ID_HEADER, RequestIdLayer};
