use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Display label used wherever a unit has no status.
pub const NO_STATUS_LABEL: &str = "No Status Set";

/// Inspection stage of a unit.
///
/// Values outside the known stages are kept verbatim so they can still be
/// shown; they are never rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Status {
    OkToPreRock,
    OkToPreInsulate,
    OkToCover,
    Approved,
    Issue,
    Other(String),
}

impl Status {
    pub const RECOGNIZED: [Status; 5] = [
        Status::OkToPreRock,
        Status::OkToPreInsulate,
        Status::OkToCover,
        Status::Approved,
        Status::Issue,
    ];

    pub fn label(&self) -> &str {
        match self {
            Status::OkToPreRock => "Ok to Pre-Rock",
            Status::OkToPreInsulate => "Ok to Pre-Insulate",
            Status::OkToCover => "Ok to Cover",
            Status::Approved => "Approved",
            Status::Issue => "Issue",
            Status::Other(label) => label,
        }
    }

    /// Blank labels mean "no status".
    pub fn from_label(label: &str) -> Option<Self> {
        if label.is_empty() {
            return None;
        }
        let status = Self::RECOGNIZED
            .into_iter()
            .find(|known| known.label() == label)
            .unwrap_or_else(|| Status::Other(label.to_string()));
        Some(status)
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Status::Other(_))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Status::from_label(&label).unwrap_or(Status::Other(label)))
    }
}

pub fn display_status(status: Option<&Status>) -> &str {
    status.map(Status::label).unwrap_or(NO_STATUS_LABEL)
}

fn deserialize_status<'de, D>(deserializer: D) -> Result<Option<Status>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(Status::from_label))
}

/// Unit numbers and level labels arrive as strings or bare integers.
fn deserialize_label<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Label {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Label::deserialize(deserializer)? {
        Label::Text(text) => text,
        Label::Number(number) => number.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Area {
    Number(serde_json::Number),
    Text(String),
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Area::Number(number) => write!(f, "{number}"),
            Area::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub resolved: bool,
}

/// Server-side snapshot of one unit. Always complete; never a partial patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    #[serde(deserialize_with = "deserialize_label")]
    pub unit_number: String,
    #[serde(deserialize_with = "deserialize_label")]
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sq_ft: Option<Area>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub unit_type: Option<String>,
    #[serde(default, deserialize_with = "deserialize_status")]
    pub status: Option<Status>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Unit {
    pub fn new(unit_number: impl Into<String>, level: impl Into<String>) -> Self {
        Self {
            record_id: None,
            unit_number: unit_number.into(),
            level: level.into(),
            sq_ft: None,
            unit_type: None,
            status: None,
            comments: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: Option<Status>) -> Self {
        self.status = status;
        self
    }

    pub fn with_comments(mut self, comments: Vec<Comment>) -> Self {
        self.comments = comments;
        self
    }

    pub fn display_status(&self) -> &str {
        display_status(self.status.as_ref())
    }

    /// Same record as `other`. Store ids win when both sides carry one.
    pub fn same_identity(&self, other: &Unit) -> bool {
        match (&self.record_id, &other.record_id) {
            (Some(lhs), Some(rhs)) => lhs == rhs,
            _ => self.unit_number == other.unit_number,
        }
    }
}

/// First run of ASCII digits in `label`, e.g. `"Level 12"` -> `12`.
pub fn embedded_number(label: &str) -> Option<u64> {
    let start = label.find(|c: char| c.is_ascii_digit())?;
    let digits = &label[start..];
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse().ok()
}
