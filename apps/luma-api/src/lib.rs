//! HTTP API stub for Luma.
//!
//! Serves two fixed JSON routes under `/api/v1/`. The same binary is packaged
//! into the container image the API stack deploys behind API Gateway.
//!
//! | Route | Response |
//! |-------|----------|
//! | `GET /api/v1/` | `{"message":"hello world"}` |
//! | `GET /api/v1/hello` | `{"message":"helloooo"}` |

pub mod body;
pub mod config;
pub mod error;
pub mod response;
pub mod router;
pub mod server;
pub mod service;

pub use config::ApiConfig;
pub use error::ApiError;
pub use service::ApiService;
