//! Node and job state classification.
//!
//! slurmrestd reports states as upper-case strings (`MIXED`, `DRAIN`,
//! `PENDING`, ...). They are lower-cased and matched against static ordered
//! `(prefix, state)` tables; the first matching prefix wins. The tables are
//! kept ordered so that no entry is shadowed by an earlier, shorter prefix,
//! which makes first-match equivalent to longest-prefix-wins.

use crate::error::ParseError;

/// Canonical node state. A node may hold several at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeState {
    Alloc,
    Comp,
    Down,
    Drain,
    Fail,
    Err,
    Idle,
    Maint,
    Mix,
    Planned,
    Resv,
    NotResponding,
    InvalidReg,
    Future,
    Unknown,
    Cloud,
    Power,
    Reboot,
    Dynamic,
}

const NODE_STATE_PREFIXES: &[(&str, NodeState)] = &[
    ("alloc", NodeState::Alloc),
    ("comp", NodeState::Comp),
    ("down", NodeState::Down),
    ("drain", NodeState::Drain),
    ("fail", NodeState::Fail),
    ("err", NodeState::Err),
    ("idle", NodeState::Idle),
    ("maint", NodeState::Maint),
    ("mix", NodeState::Mix),
    ("planned", NodeState::Planned),
    ("res", NodeState::Resv),
    ("not_responding", NodeState::NotResponding),
    ("invalid_reg", NodeState::InvalidReg),
    ("future", NodeState::Future),
    ("unknown", NodeState::Unknown),
    ("cloud", NodeState::Cloud),
    ("power", NodeState::Power),
    ("reboot", NodeState::Reboot),
    ("dynamic", NodeState::Dynamic),
];

impl NodeState {
    /// Every node state, in table order.
    pub fn all() -> impl Iterator<Item = NodeState> {
        NODE_STATE_PREFIXES.iter().map(|(_, state)| *state)
    }

    /// Classifies one raw node state string.
    pub fn classify(raw: &str) -> Result<Self, ParseError> {
        classify(NODE_STATE_PREFIXES, raw).ok_or_else(|| ParseError::UnknownState {
            kind: "node",
            value: raw.to_string(),
        })
    }

    /// Classifies a node's state list element-wise, keeping order and duplicates.
    pub fn classify_all<S: AsRef<str>>(raw: &[S]) -> Result<Vec<Self>, ParseError> {
        raw.iter().map(|s| Self::classify(s.as_ref())).collect()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeState::Alloc => "alloc",
            NodeState::Comp => "comp",
            NodeState::Down => "down",
            NodeState::Drain => "drain",
            NodeState::Fail => "fail",
            NodeState::Err => "err",
            NodeState::Idle => "idle",
            NodeState::Maint => "maint",
            NodeState::Mix => "mix",
            NodeState::Planned => "planned",
            NodeState::Resv => "resv",
            NodeState::NotResponding => "not_responding",
            NodeState::InvalidReg => "invalid_reg",
            NodeState::Future => "future",
            NodeState::Unknown => "unknown",
            NodeState::Cloud => "cloud",
            NodeState::Power => "power",
            NodeState::Reboot => "reboot",
            NodeState::Dynamic => "dynamic",
        }
    }
}

/// Canonical job state, taken from the first entry of a job's state list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JobState {
    Completed,
    Pending,
    Failed,
    Running,
    Suspended,
    OutOfMemory,
    Timeout,
    Cancelled,
    Completing,
    Configuring,
    NodeFail,
    Preempted,
}

const JOB_STATE_PREFIXES: &[(&str, JobState)] = &[
    ("completed", JobState::Completed),
    ("pending", JobState::Pending),
    ("failed", JobState::Failed),
    ("running", JobState::Running),
    ("suspended", JobState::Suspended),
    ("out_of_memory", JobState::OutOfMemory),
    ("timeout", JobState::Timeout),
    ("cancelled", JobState::Cancelled),
    ("completing", JobState::Completing),
    ("configuring", JobState::Configuring),
    ("node_fail", JobState::NodeFail),
    ("preempted", JobState::Preempted),
];

impl JobState {
    pub fn all() -> impl Iterator<Item = JobState> {
        JOB_STATE_PREFIXES.iter().map(|(_, state)| *state)
    }

    pub fn classify(raw: &str) -> Result<Self, ParseError> {
        classify(JOB_STATE_PREFIXES, raw).ok_or_else(|| ParseError::UnknownState {
            kind: "job",
            value: raw.to_string(),
        })
    }

    /// Classifies a job from its state list; only the first entry counts.
    pub fn classify_first<S: AsRef<str>>(raw: &[S]) -> Result<Self, ParseError> {
        match raw.first() {
            Some(first) => Self::classify(first.as_ref()),
            None => Err(ParseError::MissingField {
                record: "job",
                field: "job_state",
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Completed => "completed",
            JobState::Pending => "pending",
            JobState::Failed => "failed",
            JobState::Running => "running",
            JobState::Suspended => "suspended",
            JobState::OutOfMemory => "out_of_memory",
            JobState::Timeout => "timeout",
            JobState::Cancelled => "cancelled",
            JobState::Completing => "completing",
            JobState::Configuring => "configuring",
            JobState::NodeFail => "node_fail",
            JobState::Preempted => "preempted",
        }
    }
}

fn classify<T: Copy>(table: &[(&str, T)], raw: &str) -> Option<T> {
    let lowered = raw.to_lowercase();
    table
        .iter()
        .find(|(prefix, _)| lowered.starts_with(prefix))
        .map(|(_, value)| *value)
}
