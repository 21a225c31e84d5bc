//! Declaration graph and CloudFormation synthesis for the Luma infrastructure.
//!
//! Stacks are declared in Rust through [`Stack`] and the constructs in
//! [`constructs`], then [`App::synth`] writes a cloud assembly that the
//! standard deployment CLI can deploy.

pub mod app;
pub mod asset;
pub mod config;
pub mod constructs;
pub mod error;
pub mod intrinsic;
pub mod logical_id;
pub mod stack;
pub mod synthesizer;
pub mod template;
pub mod types;

pub use app::{App, CloudAssembly, StackArtifact};
pub use config::AppConfig;
pub use error::{CdkError, CdkResult};
pub use intrinsic::{Expr, Pseudo};
pub use stack::{CfnOutput, CfnResource, ExportedValue, RemovalPolicy, Stack, StackProps};
pub use template::Template;
pub use types::{AccountId, AwsRegion, Environment};
