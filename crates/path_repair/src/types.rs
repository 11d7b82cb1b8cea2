//! Core types shared by the path repair components.
//!
//! A [`ServerDescriptor`] is owned by the server repository; the resolver only
//! ever rewrites its two path fields, and only after a remote check has
//! confirmed the new value.

use crate::error::RepairError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use uuid::Uuid;

/// Isolation boundary under which servers are grouped (a community/guild id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub u64);

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Repository record id of a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerId(pub Uuid);

impl ServerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ServerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two kinds of remote artifacts a server integration needs to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathCategory {
    /// Directory of structured kill/death CSV files.
    KillLog,
    /// Directory holding the rotating raw server log.
    TextLog,
}

impl PathCategory {
    pub const ALL: [PathCategory; 2] = [PathCategory::KillLog, PathCategory::TextLog];

    pub fn label(self) -> &'static str {
        match self {
            PathCategory::KillLog => "killlog",
            PathCategory::TextLog => "textlog",
        }
    }

    /// Fragment every plausible path of this category contains.
    pub fn expected_fragment(self) -> &'static str {
        match self {
            PathCategory::KillLog => "deathlogs",
            PathCategory::TextLog => "Logs",
        }
    }

    /// Artifacts whose presence proves a directory is the right one.
    pub fn artifact_pattern(self) -> ArtifactPattern {
        match self {
            PathCategory::KillLog => ArtifactPattern::Extension("csv"),
            PathCategory::TextLog => ArtifactPattern::FileName("Deadside.log"),
        }
    }

    /// Cheap structural check, no I/O.
    pub fn is_plausible(self, path: &str) -> bool {
        path.contains(self.expected_fragment())
    }
}

impl fmt::Display for PathCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Name pattern a transport filters directory listings with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactPattern {
    /// Any file with this extension (case-insensitive, without the dot).
    Extension(&'static str),
    /// Exactly this file name.
    FileName(&'static str),
}

impl ArtifactPattern {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            ArtifactPattern::Extension(ext) => Path::new(name)
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(ext)),
            ArtifactPattern::FileName(file) => name == *file,
        }
    }
}

impl fmt::Display for ArtifactPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactPattern::Extension(ext) => write!(f, "*.{}", ext),
            ArtifactPattern::FileName(file) => f.write_str(file),
        }
    }
}

/// A game server registered under a tenant.
///
/// Instances are not meant to be shared between concurrently running
/// resolutions; clone before handing one to another task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDescriptor {
    pub id: ServerId,
    pub tenant_id: TenantId,
    /// Display name
    pub name: String,
    /// Stable identifier used in remote directory names
    #[serde(default)]
    pub server_key: Option<String>,
    /// Remote (SFTP) host
    #[serde(default)]
    pub sftp_host: Option<String>,
    /// Generic host, used when no remote host is configured
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub killlog_path: String,
    #[serde(default)]
    pub textlog_path: String,
    /// Excluded from the periodic health sweep
    #[serde(default)]
    pub repair_exempt: bool,
}

impl ServerDescriptor {
    pub fn new(tenant_id: TenantId, name: impl Into<String>) -> Self {
        Self {
            id: ServerId::new(),
            tenant_id,
            name: name.into(),
            server_key: None,
            sftp_host: None,
            hostname: None,
            killlog_path: String::new(),
            textlog_path: String::new(),
            repair_exempt: false,
        }
    }

    pub fn with_server_key(mut self, key: impl Into<String>) -> Self {
        self.server_key = Some(key.into());
        self
    }

    pub fn with_sftp_host(mut self, host: impl Into<String>) -> Self {
        self.sftp_host = Some(host.into());
        self
    }

    pub fn with_hostname(mut self, host: impl Into<String>) -> Self {
        self.hostname = Some(host.into());
        self
    }

    pub fn with_path(mut self, category: PathCategory, path: impl Into<String>) -> Self {
        self.set_path(category, path.into());
        self
    }

    pub fn with_repair_exempt(mut self, exempt: bool) -> Self {
        self.repair_exempt = exempt;
        self
    }

    /// Currently configured path for `category`, possibly empty.
    pub fn path(&self, category: PathCategory) -> &str {
        match category {
            PathCategory::KillLog => &self.killlog_path,
            PathCategory::TextLog => &self.textlog_path,
        }
    }

    pub(crate) fn set_path(&mut self, category: PathCategory, path: String) {
        match category {
            PathCategory::KillLog => self.killlog_path = path,
            PathCategory::TextLog => self.textlog_path = path,
        }
    }

    /// Host used in path templates: the remote host, else the generic one.
    pub fn effective_host(&self) -> Option<&str> {
        non_blank(self.sftp_host.as_deref()).or_else(|| non_blank(self.hostname.as_deref()))
    }

    /// Server token used in path templates: the stable identifier, else the
    /// display name with whitespace replaced by underscores.
    pub fn server_token(&self) -> Option<String> {
        if let Some(key) = non_blank(self.server_key.as_deref()) {
            return Some(key.to_string());
        }
        non_blank(Some(self.name.as_str())).map(|name| {
            name.chars()
                .map(|c| if c.is_whitespace() { '_' } else { c })
                .collect()
        })
    }

    /// Rejects descriptors no resolution can work with.
    pub fn validate(&self) -> Result<(), RepairError> {
        if self.tenant_id.0 == 0 {
            return Err(RepairError::InvalidInput(format!(
                "server {} has no tenant",
                self.id
            )));
        }
        if self.server_token().is_none() {
            return Err(RepairError::InvalidInput(format!(
                "server {} has neither an identifier nor a name",
                self.id
            )));
        }
        Ok(())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Why a resolution did not produce a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    InvalidInput(String),
    NoValidPathFound,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::InvalidInput(reason) => write!(f, "invalid input: {}", reason),
            FailureReason::NoValidPathFound => f.write_str("no valid path found"),
        }
    }
}

/// Result of resolving one server + category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionOutcome {
    pub category: PathCategory,
    pub success: bool,
    pub resolved_path: Option<String>,
    /// Configured path at entry
    pub original_path: String,
    /// Every path handed to the validator, in order
    pub candidates_tried: Vec<String>,
    /// The configured path was replaced
    pub changed: bool,
    /// False only when a replacement could not be persisted
    pub durable: bool,
    pub failure: Option<FailureReason>,
}

impl ResolutionOutcome {
    pub(crate) fn invalid(category: PathCategory, original_path: String, reason: String) -> Self {
        Self {
            category,
            success: false,
            resolved_path: None,
            original_path,
            candidates_tried: Vec::new(),
            changed: false,
            durable: true,
            failure: Some(FailureReason::InvalidInput(reason)),
        }
    }

    pub(crate) fn not_found(
        category: PathCategory,
        original_path: String,
        candidates_tried: Vec<String>,
    ) -> Self {
        Self {
            category,
            success: false,
            resolved_path: None,
            original_path,
            candidates_tried,
            changed: false,
            durable: true,
            failure: Some(FailureReason::NoValidPathFound),
        }
    }

    pub(crate) fn unchanged(
        category: PathCategory,
        original_path: String,
        resolved: String,
        candidates_tried: Vec<String>,
    ) -> Self {
        Self {
            category,
            success: true,
            resolved_path: Some(resolved),
            original_path,
            candidates_tried,
            changed: false,
            durable: true,
            failure: None,
        }
    }

    pub(crate) fn repaired(
        category: PathCategory,
        original_path: String,
        resolved: String,
        candidates_tried: Vec<String>,
        durable: bool,
    ) -> Self {
        Self {
            category,
            success: true,
            resolved_path: Some(resolved),
            original_path,
            candidates_tried,
            changed: true,
            durable,
            failure: None,
        }
    }
}
