//! Deployment log index
//!
//! The index is newline-delimited JSON, one record per line:
//!
//! ```text
//! ["2024-05-01T10:00:00Z", "dep-1", {"variant": "Role", "fields": ["web", "2024-05-01", 512]}, "RoleStart"]
//! ```
//!
//! Each record points into one of the log files by segment and byte
//! offset, so a record can seed a tail at the place it describes.

use crate::error::IndexError;
use crate::range::RangeRequest;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Path of the latest index file
pub const INDEX_PATH: &str = "/v1/log/index/latest";
/// Bytes of the index read from its end
pub const INDEX_TAIL_BYTES: u64 = 1_048_576;
/// Bytes shown when opening a log at a pointer
pub const VIEW_WINDOW: u64 = 65_536;
/// Upper bound on filtered records kept for display
pub const MAX_FILTERED: usize = 200;

/// Location of an entry in one of the log files
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogPointer {
    /// Global deployment log
    Global { segment: String, offset: u64 },
    /// Log of configuration changes
    Changes { segment: String, offset: u64 },
    /// Per-role log
    Role {
        role: String,
        segment: String,
        offset: u64,
    },
    /// Log written by an external tool
    External { name: String, offset: u64 },
}

impl LogPointer {
    fn from_value(value: &Value) -> Result<Self, IndexError> {
        let variant = value
            .get("variant")
            .and_then(Value::as_str)
            .ok_or_else(|| IndexError::shape("pointer without variant"))?;
        let fields = value
            .get("fields")
            .and_then(Value::as_array)
            .ok_or_else(|| IndexError::shape("pointer without fields"))?;

        let text = |idx: usize| {
            fields
                .get(idx)
                .and_then(Value::as_str)
                .map(str::to_owned)
                .ok_or_else(|| IndexError::shape(format!("{variant} field {idx} is not a string")))
        };
        let number = |idx: usize| {
            fields
                .get(idx)
                .and_then(Value::as_u64)
                .ok_or_else(|| IndexError::shape(format!("{variant} field {idx} is not an offset")))
        };

        match variant {
            "Global" => Ok(Self::Global {
                segment: text(0)?,
                offset: number(1)?,
            }),
            "Changes" => Ok(Self::Changes {
                segment: text(0)?,
                offset: number(1)?,
            }),
            "Role" => Ok(Self::Role {
                role: text(0)?,
                segment: text(1)?,
                offset: number(2)?,
            }),
            "External" => Ok(Self::External {
                name: text(0)?,
                offset: number(1)?,
            }),
            other => Err(IndexError::shape(format!("unknown pointer variant {other}"))),
        }
    }

    /// First field of the pointer: segment, role or external log name
    #[must_use]
    pub fn ident(&self) -> &str {
        match self {
            Self::Global { segment, .. } | Self::Changes { segment, .. } => segment,
            Self::Role { role, .. } => role,
            Self::External { name, .. } => name,
        }
    }

    /// Byte offset into the log file
    #[must_use]
    pub fn offset(&self) -> u64 {
        match self {
            Self::Global { offset, .. }
            | Self::Changes { offset, .. }
            | Self::Role { offset, .. }
            | Self::External { offset, .. } => *offset,
        }
    }

    /// URL path of the log file
    #[must_use]
    pub fn view_path(&self) -> String {
        match self {
            Self::Global { segment, .. } => format!("/v1/log/global/log.{segment}.txt"),
            Self::Changes { segment, .. } => format!("/v1/log/changes/log.{segment}.txt"),
            Self::Role { role, segment, .. } => format!("/v1/log/role/{role}/log.{segment}.txt"),
            Self::External { name, .. } => format!("/v1/log/external/{name}"),
        }
    }

    /// Window shown when opening the log at this pointer
    #[must_use]
    pub fn view_range(&self) -> RangeRequest {
        let offset = self.offset();
        RangeRequest::span(offset, offset + VIEW_WINDOW)
    }
}

/// Event recorded by an index entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Marker {
    DeploymentStart,
    RoleStart,
    /// Named action began
    ActionStart(String),
    /// Named action ended
    ActionFinish(String),
    /// An external log was attached
    ExternalLog,
    RoleFinish,
    DeploymentFinish,
    DeploymentError,
}

impl Marker {
    fn from_value(value: &Value) -> Result<Self, IndexError> {
        if let Some(name) = value.as_str() {
            return match name {
                "DeploymentStart" => Ok(Self::DeploymentStart),
                "RoleStart" => Ok(Self::RoleStart),
                "ExternalLog" => Ok(Self::ExternalLog),
                "RoleFinish" => Ok(Self::RoleFinish),
                "DeploymentFinish" => Ok(Self::DeploymentFinish),
                "DeploymentError" => Ok(Self::DeploymentError),
                other => Err(IndexError::shape(format!("unknown marker {other}"))),
            };
        }
        let variant = value.get("variant").and_then(Value::as_str);
        let action = value
            .get("fields")
            .and_then(|f| f.get(0))
            .and_then(Value::as_str)
            .map(str::to_owned);
        match (variant, action) {
            (Some("ActionStart"), Some(action)) => Ok(Self::ActionStart(action)),
            (Some("ActionFinish"), Some(action)) => Ok(Self::ActionFinish(action)),
            _ => Err(IndexError::shape(format!("unknown marker {value}"))),
        }
    }
}

/// One index entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRecord {
    /// Timestamp as written by the daemon
    pub time: String,
    /// Deployment identifier
    pub deployment: String,
    /// Where the entry points
    pub pointer: LogPointer,
    /// What happened
    pub marker: Marker,
    /// Role the entry belongs to, derived from surrounding records
    pub role: Option<String>,
}

impl IndexRecord {
    /// Parse one JSON line (role left unset)
    ///
    /// # Errors
    /// `IndexError::Json` on invalid JSON, `IndexError::Shape` otherwise
    pub fn from_line(line: &str) -> Result<Self, IndexError> {
        let value: Value = serde_json::from_str(line)?;
        let items = value
            .as_array()
            .filter(|items| items.len() == 4)
            .ok_or_else(|| IndexError::shape("record is not a 4-element array"))?;
        let string = |idx: usize, what: &str| {
            items[idx]
                .as_str()
                .map(str::to_owned)
                .ok_or_else(|| IndexError::shape(format!("{what} is not a string")))
        };
        Ok(Self {
            time: string(0, "time")?,
            deployment: string(1, "deployment")?,
            pointer: LogPointer::from_value(&items[2])?,
            marker: Marker::from_value(&items[3])?,
            role: None,
        })
    }
}

/// Parse an index chunk into records
///
/// The last line is always empty or cut off and is dropped. Unless the
/// chunk starts at byte 0 the first line is also partial and dropped.
/// Unparsable lines are skipped.
#[must_use]
pub fn parse_index(text: &str, from_file_start: bool) -> Vec<IndexRecord> {
    let mut lines: Vec<&str> = text.split('\n').collect();
    lines.pop();
    let lines = if from_file_start || lines.is_empty() {
        &lines[..]
    } else {
        &lines[1..]
    };

    let mut records = Vec::with_capacity(lines.len());
    let mut in_role: Option<String> = None;
    for line in lines {
        let mut record = match IndexRecord::from_line(line) {
            Ok(record) => record,
            Err(e) => {
                debug!(error = %e, line, "bad index line");
                continue;
            }
        };
        let mut in_role_next = in_role.clone();
        match record.marker {
            Marker::RoleStart => {
                in_role = Some(record.pointer.ident().to_owned());
                in_role_next.clone_from(&in_role);
            }
            Marker::RoleFinish => in_role_next = None,
            _ => {}
        }
        record.role.clone_from(&in_role);
        records.push(record);
        in_role = in_role_next;
    }
    records
}

/// Role filter for index records
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleFilter {
    /// Everything (`""`)
    All,
    /// Records outside any role (`"-"`)
    Unassigned,
    /// Roles containing the substring
    Contains(String),
}

impl RoleFilter {
    /// Parse filter text
    #[must_use]
    pub fn parse(filter: &str) -> Self {
        match filter {
            "" => Self::All,
            "-" => Self::Unassigned,
            other => Self::Contains(other.to_owned()),
        }
    }

    /// Whether `record` passes
    #[must_use]
    pub fn matches(&self, record: &IndexRecord) -> bool {
        match self {
            Self::All => true,
            Self::Unassigned => record.role.is_none(),
            Self::Contains(needle) => record
                .role
                .as_deref()
                .is_some_and(|role| role.contains(needle.as_str())),
        }
    }
}

/// Records passing `filter`, keeping the latest [`MAX_FILTERED`]
#[must_use]
pub fn filtered<'a>(records: &'a [IndexRecord], filter: &RoleFilter) -> Vec<&'a IndexRecord> {
    let mut result: Vec<&IndexRecord> = records.iter().filter(|r| filter.matches(r)).collect();
    if result.len() > MAX_FILTERED {
        result.drain(..result.len() - MAX_FILTERED);
    }
    result
}

/// Role lifecycle within one deployment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentTrail {
    /// `RoleStart` record
    pub start: Option<IndexRecord>,
    /// `RoleFinish` record
    pub finish: Option<IndexRecord>,
    /// Latest `ExternalLog` record per external log name
    pub externals: BTreeMap<String, IndexRecord>,
}

/// Per-deployment trail of `role`
#[must_use]
pub fn role_deployments(records: &[IndexRecord], role: &str) -> BTreeMap<String, DeploymentTrail> {
    let mut deploys: BTreeMap<String, DeploymentTrail> = BTreeMap::new();
    let mut in_role = false;
    for record in records {
        let ident = record.pointer.ident();
        if ident != role && !in_role {
            continue;
        }
        let trail = deploys.entry(record.deployment.clone()).or_default();
        match record.marker {
            Marker::RoleStart => {
                trail.start = Some(record.clone());
                in_role = true;
            }
            Marker::RoleFinish => {
                trail.finish = Some(record.clone());
                in_role = false;
            }
            Marker::ExternalLog => {
                trail.externals.insert(ident.to_owned(), record.clone());
            }
            _ => {}
        }
    }
    deploys
}
