//! Assembly of administrative statements.
//!
//! Each function renders one single-statement query text; identifiers are
//! double-quoted and literals single-quoted unless the caller passes a
//! [`Raw`](fluxline_line::escape::Raw) value.

use std::fmt::{self, Display, Formatter};
use std::fmt::Write;

use fluxline_line::escape::Ident;

/// A grantable privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    Read,
    Write,
    All,
}

impl Display for Privilege {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => "read".fmt(f),
            Self::Write => "write".fmt(f),
            Self::All => "all".fmt(f),
        }
    }
}

/// Settings for creating or altering a retention policy.
#[derive(Debug, Clone)]
pub struct RetentionPolicyOptions {
    /// Retention duration, e.g. `1d` or `30m`.
    pub duration: String,
    /// Replication factor.
    pub replication: usize,
    /// Optional shard group duration.
    pub shard_duration: Option<String>,
    /// Marks the policy as the database default.
    pub is_default: bool,
}

pub fn create_database<I: Into<Ident>>(name: I) -> String {
    format!("create database {}", name.into().to_quoted())
}

pub fn drop_database<I: Into<Ident>>(name: I) -> String {
    format!("drop database {}", name.into().to_quoted())
}

pub fn show_databases() -> String {
    "show databases".into()
}

pub fn show_measurements() -> String {
    "show measurements".into()
}

pub fn drop_measurement<I: Into<Ident>>(measurement: I) -> String {
    format!("drop measurement {}", measurement.into().to_quoted())
}

pub fn drop_series<I: Into<Ident>>(measurement: Option<I>, where_clause: Option<&str>) -> String {
    let mut statement = String::from("drop series");
    if let Some(measurement) = measurement {
        let _ = write!(statement, " from {}", measurement.into().to_quoted());
    }
    if let Some(where_clause) = where_clause {
        let _ = write!(statement, " where {where_clause}");
    }
    statement
}

pub fn show_users() -> String {
    "show users".into()
}

pub fn create_user<I: Into<Ident>, P: Into<Ident>>(name: I, password: P, admin: bool) -> String {
    let mut statement = format!(
        "create user {} with password {}",
        name.into().to_quoted(),
        password.into().to_string_literal()
    );
    if admin {
        statement.push_str(" with all privileges");
    }
    statement
}

pub fn set_password<I: Into<Ident>, P: Into<Ident>>(name: I, password: P) -> String {
    format!(
        "set password for {} = {}",
        name.into().to_quoted(),
        password.into().to_string_literal()
    )
}

pub fn drop_user<I: Into<Ident>>(name: I) -> String {
    format!("drop user {}", name.into().to_quoted())
}

pub fn grant_privilege<D: Into<Ident>, U: Into<Ident>>(
    privilege: Privilege,
    database: D,
    user: U,
) -> String {
    format!(
        "grant {privilege} on {} to {}",
        database.into().to_quoted(),
        user.into().to_quoted()
    )
}

pub fn revoke_privilege<D: Into<Ident>, U: Into<Ident>>(
    privilege: Privilege,
    database: D,
    user: U,
) -> String {
    format!(
        "revoke {privilege} on {} from {}",
        database.into().to_quoted(),
        user.into().to_quoted()
    )
}

pub fn grant_admin_privilege<U: Into<Ident>>(user: U) -> String {
    format!("grant all privileges to {}", user.into().to_quoted())
}

pub fn revoke_admin_privilege<U: Into<Ident>>(user: U) -> String {
    format!("revoke all privileges from {}", user.into().to_quoted())
}

pub fn create_retention_policy<N: Into<Ident>, D: Into<Ident>>(
    name: N,
    database: D,
    options: &RetentionPolicyOptions,
) -> String {
    format!(
        "create retention policy {} on {}{}",
        name.into().to_quoted(),
        database.into().to_quoted(),
        retention_policy_clauses(options)
    )
}

pub fn alter_retention_policy<N: Into<Ident>, D: Into<Ident>>(
    name: N,
    database: D,
    options: &RetentionPolicyOptions,
) -> String {
    format!(
        "alter retention policy {} on {}{}",
        name.into().to_quoted(),
        database.into().to_quoted(),
        retention_policy_clauses(options)
    )
}

pub fn drop_retention_policy<N: Into<Ident>, D: Into<Ident>>(name: N, database: D) -> String {
    format!(
        "drop retention policy {} on {}",
        name.into().to_quoted(),
        database.into().to_quoted()
    )
}

pub fn show_retention_policies<D: Into<Ident>>(database: Option<D>) -> String {
    match database {
        Some(database) => format!(
            "show retention policies on {}",
            database.into().to_quoted()
        ),
        None => "show retention policies".into(),
    }
}

fn retention_policy_clauses(options: &RetentionPolicyOptions) -> String {
    let mut clauses = format!(
        " duration {} replication {}",
        options.duration, options.replication
    );
    if let Some(shard_duration) = &options.shard_duration {
        let _ = write!(clauses, " shard duration {shard_duration}");
    }
    if options.is_default {
        clauses.push_str(" default");
    }
    clauses
}
