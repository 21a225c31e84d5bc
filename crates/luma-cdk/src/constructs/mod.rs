//! Higher-level constructs that declare groups of related resources.
//!
//! Each construct takes the stack it declares into plus a construct ID, and
//! places its resources under that ID so logical IDs stay stable.

pub mod apigateway;
pub mod cloudfront;
pub mod cognito;
pub mod iam;
pub mod lambda;
pub mod s3;
pub mod s3_deployment;
