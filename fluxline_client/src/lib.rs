#![doc = include_str!("../README.md")]

/// Delay-sequence strategies for host re-admission.
pub mod backoff;

/// The driver facade.
pub mod client;

/// Client construction settings and connection strings.
pub mod config;

/// Error types.
pub mod error;

/// `where`-clause combinators.
pub mod expression;

/// Endpoint records with per-host transport options.
pub mod host;

/// Multi-host request dispatch.
pub mod pool;

/// Query response parsing.
pub mod results;

/// Administrative statement assembly.
pub mod statement;

pub use backoff::{Backoff, ConstantBackoff, ExponentialBackoff};
pub use client::{Client, ParamValue, QueryOptions, UserInfo, WriteOptions};
pub use config::{ClientConfig, HostConfig};
pub use error::{ClientError, ClientResult};
pub use expression::{Condition, QueryValue};
pub use host::{Host, TransportOptions};
pub use pool::{Method, PingResult, Pool, PoolOptions, PoolRequest};
pub use results::{GroupRef, Results, Row, WireResponse};
pub use statement::{Privilege, RetentionPolicyOptions};
