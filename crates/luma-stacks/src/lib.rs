//! The Luma infrastructure: auth, API and frontend stacks.
//!
//! [`compose`] builds all three into a [`luma_cdk::App`] in dependency order.
//! The API stack receives the built [`AuthStack`] directly and imports the
//! values it needs, so the auth stack is always deployed first.

pub mod api;
pub mod auth;
pub mod compose;
pub mod frontend;

pub use auth::{AuthStack, AuthStackProps};
pub use compose::{AssetPaths, compose};
