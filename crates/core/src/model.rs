use serde::{Deserialize, Serialize};

/// Lateness tier derived from a trip's delay in minutes.
///
/// Ordered from least to most severe so tiers compare with `<`/`>`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Severity {
    #[default]
    OnTime,
    Late,
    VeryLate,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::OnTime => "on_time",
            Severity::Late => "late",
            Severity::VeryLate => "very_late",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::OnTime => write!(f, "OnTime"),
            Severity::Late => write!(f, "Late"),
            Severity::VeryLate => write!(f, "VeryLate"),
            Severity::Critical => write!(f, "Critical"),
        }
    }
}

/// Operator-assigned weighting. Informational only, never a sort key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TripPriority {
    Low,
    #[default]
    Medium,
    High,
}

/// A scheduled departure tracked by the delay monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: String,
    pub bus_id: String,
    pub route: String,
    /// Time-of-day as delivered by the catalog (`08:00`, `08:00:00`, `8:00 AM`).
    #[serde(default)]
    pub scheduled_departure: Option<String>,
    #[serde(default)]
    pub last_known_location: Option<String>,
    #[serde(default)]
    pub priority: TripPriority,
    /// Recomputed on every monitor tick.
    #[serde(default)]
    pub current_delay_minutes: u32,
    /// Recomputed on every monitor tick.
    #[serde(default)]
    pub severity: Severity,
}

impl Trip {
    pub fn new(
        id: impl Into<String>,
        bus_id: impl Into<String>,
        route: impl Into<String>,
        scheduled_departure: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            bus_id: bus_id.into(),
            route: route.into(),
            scheduled_departure: Some(scheduled_departure.into()),
            last_known_location: None,
            priority: TripPriority::default(),
            current_delay_minutes: 0,
            severity: Severity::OnTime,
        }
    }

    pub fn with_priority(mut self, priority: TripPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.last_known_location = Some(location.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatorType {
    #[serde(rename = "SLTB", alias = "sltb")]
    Sltb,
    #[serde(rename = "Private", alias = "private")]
    Private,
}

impl std::fmt::Display for OperatorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperatorType::Sltb => write!(f, "SLTB"),
            OperatorType::Private => write!(f, "Private"),
        }
    }
}

/// A bus that is idle and available for assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdleBus {
    pub bus_id: String,
    pub registration: String,
    pub operator_type: OperatorType,
    pub capacity: u32,
}

impl IdleBus {
    pub fn new(
        bus_id: impl Into<String>,
        registration: impl Into<String>,
        operator_type: OperatorType,
        capacity: u32,
    ) -> Self {
        Self {
            bus_id: bus_id.into(),
            registration: registration.into(),
            operator_type,
            capacity,
        }
    }
}
