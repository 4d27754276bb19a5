/// Repository configuration: which table to address and how the read and
/// delete paths treat soft-deleted records.
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    /// Table every operation is issued against
    pub table_name: String,

    /// Separator between the type prefix and the identifier in composite keys
    /// (`user#123`)
    pub key_delimiter: char,

    /// Exclude records carrying `deletedAt` from queries and scans unless the
    /// request says otherwise
    pub filter_deleted: bool,

    /// Turn deletes into `deletedAt` updates unless the request says otherwise
    pub soft_delete: bool,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            table_name: String::new(),
            key_delimiter: '#',
            filter_deleted: true,
            soft_delete: true,
        }
    }
}

impl RepositoryConfig {
    /// Create a configuration for a table with default settings
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            ..Self::default()
        }
    }

    /// Set the composite key delimiter
    pub fn with_key_delimiter(mut self, delimiter: char) -> Self {
        self.key_delimiter = delimiter;
        self
    }

    /// Set the default for soft-delete filtering on reads
    pub fn with_filter_deleted(mut self, filter_deleted: bool) -> Self {
        self.filter_deleted = filter_deleted;
        self
    }

    /// Set the default delete semantics
    pub fn with_soft_delete(mut self, soft_delete: bool) -> Self {
        self.soft_delete = soft_delete;
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.table_name.trim().is_empty() {
            return Err("table_name must not be empty".to_string());
        }

        if self.key_delimiter.is_alphanumeric() {
            return Err("key_delimiter must not be alphanumeric".to_string());
        }

        Ok(())
    }
}

/// Deployment stage the store client is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// DynamoDB Local on the developer machine
    Local,
    /// The managed service, resolved through the SDK's default chain
    Production,
}

/// Store client configuration for the DynamoDB backend.
///
/// Resolving a stage from the process environment is the caller's job; this
/// struct only describes the client that should be built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DynamoConfig {
    /// AWS region (SDK default if not specified)
    pub region: Option<String>,
    /// Endpoint override (e.g. DynamoDB Local)
    pub endpoint: Option<String>,
    /// Operation timeout in milliseconds
    pub timeout_ms: Option<u64>,
}

impl DynamoConfig {
    /// Endpoint used by DynamoDB Local
    pub const LOCAL_ENDPOINT: &'static str = "http://localhost:8000";

    /// Configuration for DynamoDB Local
    pub fn local() -> Self {
        Self {
            region: Some("local".to_string()),
            endpoint: Some(Self::LOCAL_ENDPOINT.to_string()),
            timeout_ms: None,
        }
    }

    /// Configuration relying on SDK defaults for region and endpoint
    pub fn production() -> Self {
        Self::default()
    }

    /// Configuration for a deployment stage
    pub fn for_stage(stage: Stage) -> Self {
        match stage {
            Stage::Local => Self::local(),
            Stage::Production => Self::production(),
        }
    }

    /// Override the region
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Override the endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the operation timeout
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }
}
