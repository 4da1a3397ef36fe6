use jiff::tz::TimeZone;
use jiff::{SignedDuration, Timestamp};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum ResourceKind {
    Job,
    CronJob,
    Workflow,
    CronWorkflow,
    Sensor,
    EventSource,
}

impl ResourceKind {
    pub const ALL: [Self; 6] = [
        Self::Job,
        Self::CronJob,
        Self::Workflow,
        Self::CronWorkflow,
        Self::Sensor,
        Self::EventSource,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Self::Job => "Job",
            Self::CronJob => "CronJob",
            Self::Workflow => "Workflow",
            Self::CronWorkflow => "CronWorkflow",
            Self::Sensor => "Sensor",
            Self::EventSource => "EventSource",
        }
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
pub enum ResourceStatus {
    Running,
    Succeeded,
    Failed,
    Pending,
    #[default]
    Unknown,
}

impl ResourceStatus {
    /// Rank used by the status ordering; lower sorts first.
    pub fn priority(self) -> u8 {
        match self {
            Self::Running => 0,
            Self::Failed => 1,
            Self::Pending => 2,
            Self::Succeeded => 3,
            Self::Unknown => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Running => "Running",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Pending => "Pending",
            Self::Unknown => "Unknown",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Self::Running => "●",
            Self::Succeeded => "✓",
            Self::Failed => "✗",
            Self::Pending => "○",
            Self::Unknown => "?",
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct DagNode {
    pub name: String,
    pub node_type: String,
    pub phase: String,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ParentRef {
    pub kind: ResourceKind,
    pub name: String,
}

/// Kind-agnostic view of one monitored resource, rebuilt on every poll.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    pub kind: ResourceKind,
    pub name: String,
    pub namespace: String,
    pub status: ResourceStatus,
    pub start_time: Option<Timestamp>,
    pub end_time: Option<Timestamp>,
    pub message: String,
    pub retries: u32,
    pub max_retries: u32,
    pub success_count: u32,
    pub failure_count: u32,
    /// Completions per minute.
    pub throughput: f64,
    pub queue_depth: u32,
    pub schedule: Option<String>,
    pub timezone: Option<String>,
    pub last_run: Option<Timestamp>,
    pub next_run: Option<Timestamp>,
    pub parent: Option<ParentRef>,
    pub dag_nodes: Vec<DagNode>,
    pub event_source_name: String,
    pub event_names: Vec<String>,
    pub trigger_names: Vec<String>,
    pub event_type: String,
}

impl CanonicalRecord {
    pub fn new(kind: ResourceKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            namespace: namespace.into(),
            status: ResourceStatus::Unknown,
            start_time: None,
            end_time: None,
            message: String::new(),
            retries: 0,
            max_retries: 0,
            success_count: 0,
            failure_count: 0,
            throughput: 0.0,
            queue_depth: 0,
            schedule: None,
            timezone: None,
            last_run: None,
            next_run: None,
            parent: None,
            dag_nodes: Vec::new(),
            event_source_name: String::new(),
            event_names: Vec::new(),
            trigger_names: Vec::new(),
            event_type: String::new(),
        }
    }

    pub fn identity(&self) -> (ResourceKind, &str, &str) {
        (self.kind, self.namespace.as_str(), self.name.as_str())
    }

    pub fn parent_name(&self) -> Option<&str> {
        self.parent
            .as_ref()
            .map(|parent| parent.name.as_str())
            .filter(|name| !name.is_empty())
    }

    /// Elapsed run time. Unfinished resources are measured against `now`, so callers
    /// evaluate this on every render instead of caching it.
    pub fn duration_at(&self, now: Timestamp) -> SignedDuration {
        let elapsed = match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => end.duration_since(start),
            (Some(start), None) => now.duration_since(start),
            _ => SignedDuration::ZERO,
        };
        elapsed.max(SignedDuration::ZERO)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum ViewMode {
    #[default]
    All,
    Jobs,
    Workflows,
    Events,
}

impl ViewMode {
    pub const ALL: [Self; 4] = [Self::All, Self::Jobs, Self::Workflows, Self::Events];

    pub fn title(self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Jobs => "Jobs",
            Self::Workflows => "Workflows",
            Self::Events => "Events",
        }
    }

    pub fn admits(self, kind: ResourceKind) -> bool {
        match self {
            Self::All => true,
            Self::Jobs => matches!(kind, ResourceKind::Job | ResourceKind::CronJob),
            Self::Workflows => matches!(kind, ResourceKind::Workflow | ResourceKind::CronWorkflow),
            Self::Events => matches!(kind, ResourceKind::Sensor | ResourceKind::EventSource),
        }
    }

    pub fn index(self) -> usize {
        Self::ALL
            .iter()
            .position(|mode| *mode == self)
            .unwrap_or_default()
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum SortMode {
    #[default]
    ByStatus,
    ByNextRun,
}

impl SortMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::ByStatus => "status",
            Self::ByNextRun => "next",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::ByStatus => Self::ByNextRun,
            Self::ByNextRun => Self::ByStatus,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum DisplayZone {
    #[default]
    Utc,
    Local,
}

impl DisplayZone {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "utc" | "z" | "etc/utc" => Some(Self::Utc),
            "local" | "system" => Some(Self::Local),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Utc => "UTC",
            Self::Local => "local",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Utc => Self::Local,
            Self::Local => Self::Utc,
        }
    }

    pub fn time_zone(self) -> TimeZone {
        match self {
            Self::Utc => TimeZone::UTC,
            Self::Local => TimeZone::system(),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum NamespaceScope {
    All,
    Named(String),
}

impl NamespaceScope {
    /// An empty namespace means every namespace.
    pub fn from_namespace(namespace: &str) -> Self {
        let namespace = namespace.trim();
        if namespace.is_empty() {
            Self::All
        } else {
            Self::Named(namespace.to_string())
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::All => "all".to_string(),
            Self::Named(namespace) => namespace.clone(),
        }
    }
}

impl Display for NamespaceScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Named(namespace) => write!(f, "{namespace}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum BranchMarker {
    Root,
    Mid,
    Last,
}

impl BranchMarker {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Root => "",
            Self::Mid => "┣ ",
            Self::Last => "┗ ",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplayRow {
    pub record: CanonicalRecord,
    pub marker: BranchMarker,
}
