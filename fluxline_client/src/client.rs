//! The driver facade: queries, writes, and administration over the pool.

use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use url::form_urlencoded;
use url::Url;

use fluxline_common::precision::Precision;
use fluxline_line::encoder::encode_points;
use fluxline_line::escape::Ident;
use fluxline_line::point::Point;
use fluxline_line::schema::SchemaRegistry;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::host::TransportOptions;
use crate::pool::{PingResult, Pool, PoolOptions, PoolRequest};
use crate::results::{self, Results, WireResponse};
use crate::statement::{self, Privilege, RetentionPolicyOptions};

/// A placeholder value substituted by the server.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    String(String),
    Integer(i64),
    Float(f64),
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::String(value.into())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// Settings for one read query.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Database override; falls back to the client default.
    pub database: Option<String>,
    /// Requested timestamp precision. Nanoseconds (the default) is served
    /// as lossless ISO strings rather than integers.
    pub precision: Option<Precision>,
    /// Retention policy to read from.
    pub retention_policy: Option<String>,
    /// Placeholder values, JSON-encoded into the `params` query argument.
    pub params: BTreeMap<String, ParamValue>,
}

/// Settings for one batch write.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Database override; falls back to the client default.
    pub database: Option<String>,
    /// Timestamp precision of the batch.
    pub precision: Precision,
    /// Retention policy to write into.
    pub retention_policy: Option<String>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            database: None,
            precision: Precision::Nanoseconds,
            retention_policy: None,
        }
    }
}

/// A user row from `show users`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub user: String,
    pub admin: bool,
}

/// The database client.
///
/// Composes the encoder, the result parser, and the connection pool; every
/// operation is a single logical request dispatched across the configured
/// hosts.
#[derive(Debug, Clone)]
pub struct Client {
    pool: Pool,
    auth: Option<(String, String)>,
    database: Option<String>,
    schemas: SchemaRegistry,
}

impl Client {
    /// Builds a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any host URL is unsupported or an HTTP client
    /// cannot be constructed.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let auth = config
            .username
            .clone()
            .map(|username| (username, config.password.clone()));
        let pool = Pool::new(
            PoolOptions {
                request_timeout: config.request_timeout,
                max_retries: config.max_retries,
                backoff: config.backoff,
            },
            auth.clone(),
        );
        for host in config.hosts {
            pool.add_host(host.url, host.transport)?;
        }
        let mut schemas = SchemaRegistry::new();
        for schema in config.schemas {
            schemas.insert(schema);
        }
        Ok(Self {
            pool,
            auth,
            database: config.database,
            schemas,
        })
    }

    /// Builds a client from a connection string
    /// (`scheme://[user[:pass]@]host[:port][/database]`).
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] for unparseable input.
    pub fn from_dsn(dsn: &str) -> ClientResult<Self> {
        Self::new(ClientConfig::from_dsn(dsn)?)
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Adds a host at runtime. Hosts cannot be removed.
    ///
    /// # Errors
    ///
    /// Returns an error for an unsupported URL.
    pub fn add_host(&self, url: Url, transport: TransportOptions) -> ClientResult<()> {
        self.pool.add_host(url, transport)
    }

    /// Probes every configured host.
    pub async fn ping(&self, timeout: Duration) -> Vec<PingResult> {
        self.pool.ping(timeout, "/ping").await
    }

    /// Runs a single-statement read query and parses its result entry.
    pub async fn query(&self, q: &str, options: &QueryOptions) -> ClientResult<Results> {
        let precision = options.precision.unwrap_or(Precision::Nanoseconds);
        let response: WireResponse = self.pool.json(&self.read_request(q, options)?).await?;
        results::parse_single(&response, precision)
    }

    /// Runs several statements in one request, one result entry each.
    pub async fn query_many(
        &self,
        statements: &[&str],
        options: &QueryOptions,
    ) -> ClientResult<Vec<Results>> {
        let precision = options.precision.unwrap_or(Precision::Nanoseconds);
        let q = statements.join(";");
        let response: WireResponse = self.pool.json(&self.read_request(&q, options)?).await?;
        results::parse_many(&response, precision)
    }

    /// Runs a read query and returns the decoded JSON body unparsed.
    ///
    /// # Errors
    ///
    /// Propagates transport and request errors.
    pub async fn query_raw(
        &self,
        q: &str,
        options: &QueryOptions,
    ) -> ClientResult<serde_json::Value> {
        self.pool.json(&self.read_request(q, options)?).await
    }

    /// Writes a batch of points.
    ///
    /// Points are encoded in caller order and sent in one request.
    ///
    /// # Errors
    ///
    /// Returns a validation error before transport for malformed points, and
    /// propagates transport and request errors.
    pub async fn write_points(&self, points: &[Point], options: &WriteOptions) -> ClientResult<()> {
        let database = options
            .database
            .clone()
            .or_else(|| self.database.clone())
            .ok_or(ClientError::DatabaseRequired)?;
        let body = encode_points(points, &self.schemas, &database, options.precision)?;
        let mut request = PoolRequest::post("/write")
            .with_query("db", database)
            .with_query("precision", options.precision.as_str())
            .with_body(body);
        if let Some(retention_policy) = &options.retention_policy {
            request = request.with_query("rp", retention_policy.clone());
        }
        self.pool.discard(&request).await
    }

    /// Writes points into one measurement, overriding each point's
    /// measurement name.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Client::write_points`].
    pub async fn write_measurement(
        &self,
        measurement: &str,
        mut points: Vec<Point>,
        options: &WriteOptions,
    ) -> ClientResult<()> {
        for point in &mut points {
            point.measurement = measurement.into();
        }
        self.write_points(&points, options).await
    }

    /// Creates a database.
    pub async fn create_database<I: Into<Ident>>(&self, name: I) -> ClientResult<()> {
        self.execute(statement::create_database(name), None).await
    }

    /// Drops a database.
    pub async fn drop_database<I: Into<Ident>>(&self, name: I) -> ClientResult<()> {
        self.execute(statement::drop_database(name), None).await
    }

    /// Lists database names.
    pub async fn get_database_names(&self) -> ClientResult<Vec<String>> {
        let results = self
            .query(&statement::show_databases(), &QueryOptions::default())
            .await?;
        Ok(column_values(&results, "name"))
    }

    /// Lists measurement names in a database.
    ///
    /// # Errors
    ///
    /// Fails with [`ClientError::DatabaseRequired`] when no database is
    /// known; otherwise propagates transport, request, and result errors.
    pub async fn get_measurements(&self, database: Option<&str>) -> ClientResult<Vec<String>> {
        let database = database
            .map(str::to_string)
            .or_else(|| self.database.clone())
            .ok_or(ClientError::DatabaseRequired)?;
        let options = QueryOptions {
            database: Some(database),
            ..QueryOptions::default()
        };
        let results = self.query(&statement::show_measurements(), &options).await?;
        Ok(column_values(&results, "name"))
    }

    /// Drops a measurement from a database.
    pub async fn drop_measurement<I: Into<Ident>>(
        &self,
        measurement: I,
        database: &str,
    ) -> ClientResult<()> {
        self.execute(statement::drop_measurement(measurement), Some(database))
            .await
    }

    /// Drops series, optionally restricted to a measurement and a
    /// `where` clause.
    pub async fn drop_series<I: Into<Ident>>(
        &self,
        measurement: Option<I>,
        where_clause: Option<&str>,
        database: &str,
    ) -> ClientResult<()> {
        self.execute(
            statement::drop_series(measurement, where_clause),
            Some(database),
        )
        .await
    }

    /// Lists users and their admin status.
    pub async fn get_users(&self) -> ClientResult<Vec<UserInfo>> {
        let results = self
            .query(&statement::show_users(), &QueryOptions::default())
            .await?;
        Ok(results
            .rows()
            .iter()
            .filter_map(|row| {
                Some(UserInfo {
                    user: row.get_str("user")?.to_string(),
                    admin: row.get("admin").and_then(serde_json::Value::as_bool)?,
                })
            })
            .collect())
    }

    /// Creates a user, optionally with admin privileges.
    pub async fn create_user<N: Into<Ident>, P: Into<Ident>>(
        &self,
        name: N,
        password: P,
        admin: bool,
    ) -> ClientResult<()> {
        self.execute(statement::create_user(name, password, admin), None)
            .await
    }

    /// Changes a user's password.
    pub async fn set_password<N: Into<Ident>, P: Into<Ident>>(
        &self,
        name: N,
        password: P,
    ) -> ClientResult<()> {
        self.execute(statement::set_password(name, password), None)
            .await
    }

    /// Drops a user.
    pub async fn drop_user<I: Into<Ident>>(&self, name: I) -> ClientResult<()> {
        self.execute(statement::drop_user(name), None).await
    }

    /// Grants a privilege on a database to a user.
    pub async fn grant_privilege<D: Into<Ident>, U: Into<Ident>>(
        &self,
        privilege: Privilege,
        database: D,
        user: U,
    ) -> ClientResult<()> {
        self.execute(statement::grant_privilege(privilege, database, user), None)
            .await
    }

    /// Revokes a privilege on a database from a user.
    pub async fn revoke_privilege<D: Into<Ident>, U: Into<Ident>>(
        &self,
        privilege: Privilege,
        database: D,
        user: U,
    ) -> ClientResult<()> {
        self.execute(statement::revoke_privilege(privilege, database, user), None)
            .await
    }

    /// Grants admin privileges to a user.
    pub async fn grant_admin_privilege<U: Into<Ident>>(&self, user: U) -> ClientResult<()> {
        self.execute(statement::grant_admin_privilege(user), None)
            .await
    }

    /// Revokes admin privileges from a user.
    pub async fn revoke_admin_privilege<U: Into<Ident>>(&self, user: U) -> ClientResult<()> {
        self.execute(statement::revoke_admin_privilege(user), None)
            .await
    }

    /// Creates a retention policy on a database.
    pub async fn create_retention_policy<N: Into<Ident>, D: Into<Ident>>(
        &self,
        name: N,
        database: D,
        options: &RetentionPolicyOptions,
    ) -> ClientResult<()> {
        self.execute(
            statement::create_retention_policy(name, database, options),
            None,
        )
        .await
    }

    /// Alters a retention policy on a database.
    pub async fn alter_retention_policy<N: Into<Ident>, D: Into<Ident>>(
        &self,
        name: N,
        database: D,
        options: &RetentionPolicyOptions,
    ) -> ClientResult<()> {
        self.execute(
            statement::alter_retention_policy(name, database, options),
            None,
        )
        .await
    }

    /// Drops a retention policy from a database.
    pub async fn drop_retention_policy<N: Into<Ident>, D: Into<Ident>>(
        &self,
        name: N,
        database: D,
    ) -> ClientResult<()> {
        self.execute(statement::drop_retention_policy(name, database), None)
            .await
    }

    /// Lists retention policies, for one database or all.
    pub async fn show_retention_policies(&self, database: Option<&str>) -> ClientResult<Results> {
        self.query(
            &statement::show_retention_policies(database),
            &QueryOptions::default(),
        )
        .await
    }

    fn read_request(&self, q: &str, options: &QueryOptions) -> ClientResult<PoolRequest> {
        let mut request = PoolRequest::get("/query").with_query("q", q);
        if let Some(database) = options.database.as_ref().or(self.database.as_ref()) {
            request = request.with_query("db", database.clone());
        }
        // Nanosecond integers overflow 64-bit floats on some runtimes;
        // omitting `epoch` makes the server answer with ISO strings.
        if let Some(precision) = options.precision {
            if precision != Precision::Nanoseconds {
                request = request.with_query("epoch", precision.as_str());
            }
        }
        if let Some(retention_policy) = &options.retention_policy {
            request = request.with_query("rp", retention_policy.clone());
        }
        if !options.params.is_empty() {
            request = request.with_query("params", serde_json::to_string(&options.params)?);
        }
        Ok(request)
    }

    /// Runs one mutation statement as a form-encoded POST.
    async fn execute(&self, statement: String, database: Option<&str>) -> ClientResult<()> {
        let mut form = form_urlencoded::Serializer::new(String::new());
        if let Some((username, password)) = &self.auth {
            form.append_pair("u", username);
            form.append_pair("p", password);
        }
        form.append_pair("q", &statement);
        let mut request = PoolRequest::post("/query")
            .with_content_type("application/x-www-form-urlencoded")
            .with_body(form.finish());
        if let Some(database) = database {
            request = request.with_query("db", database);
        }
        let response: WireResponse = self.pool.json(&request).await?;
        results::assert_no_errors(&response)
    }
}

fn column_values(results: &Results, column: &str) -> Vec<String> {
    results
        .rows()
        .iter()
        .filter_map(|row| row.get_str(column))
        .map(str::to_string)
        .collect()
}
