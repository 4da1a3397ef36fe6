use jiff::Timestamp;
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{OwnerReference, Time};
use kube::ResourceExt;
use kube::core::DynamicObject;
use serde_json::Value;

use crate::model::{CanonicalRecord, DagNode, ParentRef, ResourceKind, ResourceStatus};
use crate::schedule;

// Kubernetes applies this backoff limit when a Job leaves it unset.
const DEFAULT_BACKOFF_LIMIT: u32 = 6;

// Spec keys of an EventSource that name an event source family.
const EVENT_SOURCE_FAMILIES: &[&str] = &[
    "amqp",
    "azureEventsHub",
    "azureQueueStorage",
    "azureServiceBus",
    "bitbucket",
    "bitbucketserver",
    "calendar",
    "emitter",
    "file",
    "generic",
    "gerrit",
    "github",
    "gitlab",
    "hdfs",
    "kafka",
    "minio",
    "mqtt",
    "nats",
    "nsq",
    "pubSub",
    "pulsar",
    "redis",
    "redisStream",
    "resource",
    "sftp",
    "slack",
    "sns",
    "sqs",
    "storageGrid",
    "stripe",
    "webhook",
];

/// Listing result for an optional resource family.
#[derive(Debug, Clone)]
pub enum Family<T> {
    Listed(Vec<T>),
    /// The family's CRD is not installed in the cluster.
    Unavailable,
}

impl<T> Family<T> {
    pub fn items(&self) -> &[T] {
        match self {
            Self::Listed(items) => items,
            Self::Unavailable => &[],
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Listed(_))
    }
}

impl<T> Default for Family<T> {
    fn default() -> Self {
        Self::Listed(Vec::new())
    }
}

/// One poll worth of raw resources.
#[derive(Debug, Clone)]
pub struct RawBatch {
    /// Reference instant for every schedule evaluation in this batch.
    pub observed_at: Timestamp,
    pub jobs: Vec<Job>,
    pub cron_jobs: Vec<CronJob>,
    pub workflows: Family<DynamicObject>,
    pub cron_workflows: Family<DynamicObject>,
    pub sensors: Family<DynamicObject>,
    pub event_sources: Family<DynamicObject>,
}

impl RawBatch {
    #[cfg(test)]
    pub fn empty(observed_at: Timestamp) -> Self {
        Self {
            observed_at,
            jobs: Vec::new(),
            cron_jobs: Vec::new(),
            workflows: Family::default(),
            cron_workflows: Family::default(),
            sensors: Family::default(),
            event_sources: Family::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
            + self.cron_jobs.len()
            + self.workflows.items().len()
            + self.cron_workflows.items().len()
            + self.sensors.items().len()
            + self.event_sources.items().len()
    }
}

pub fn normalize_batch(batch: &RawBatch) -> Vec<CanonicalRecord> {
    let now = batch.observed_at;
    let mut records = Vec::with_capacity(batch.len());
    records.extend(batch.jobs.iter().map(job_to_record));
    records.extend(
        batch
            .cron_jobs
            .iter()
            .map(|cron_job| cron_job_to_record(cron_job, now)),
    );
    records.extend(batch.workflows.items().iter().map(workflow_to_record));
    records.extend(
        batch
            .cron_workflows
            .items()
            .iter()
            .map(|object| cron_workflow_to_record(object, now)),
    );
    records.extend(batch.sensors.items().iter().map(sensor_to_record));
    records.extend(
        batch
            .event_sources
            .items()
            .iter()
            .map(event_source_to_record),
    );
    records
}

pub fn job_to_record(job: &Job) -> CanonicalRecord {
    let mut record = CanonicalRecord::new(
        ResourceKind::Job,
        job.namespace().unwrap_or_default(),
        job.name_any(),
    );
    record.parent = parent_ref(job.owner_references(), ResourceKind::CronJob);
    record.max_retries = job
        .spec
        .as_ref()
        .and_then(|spec| spec.backoff_limit)
        .and_then(|limit| u32::try_from(limit).ok())
        .unwrap_or(DEFAULT_BACKOFF_LIMIT);

    let Some(status) = job.status.as_ref() else {
        record.status = ResourceStatus::Pending;
        return record;
    };

    record.start_time = status.start_time.as_ref().map(timestamp);
    record.end_time = status.completion_time.as_ref().map(timestamp);

    let succeeded = count(status.succeeded);
    let failed = count(status.failed);
    let active = count(status.active);
    record.success_count = succeeded;
    record.failure_count = failed;
    record.throughput = completion_rate(succeeded, record.start_time, record.end_time);
    record.status = if succeeded > 0 {
        ResourceStatus::Succeeded
    } else if failed > 0 {
        record.retries = failed;
        ResourceStatus::Failed
    } else if active > 0 {
        ResourceStatus::Running
    } else {
        ResourceStatus::Pending
    };

    record.message = status
        .conditions
        .as_deref()
        .unwrap_or_default()
        .iter()
        .find(|condition| condition.type_ == "Failed" && condition.status == "True")
        .and_then(|condition| condition.message.clone())
        .unwrap_or_default();

    record
}

pub fn cron_job_to_record(cron_job: &CronJob, now: Timestamp) -> CanonicalRecord {
    let mut record = CanonicalRecord::new(
        ResourceKind::CronJob,
        cron_job.namespace().unwrap_or_default(),
        cron_job.name_any(),
    );
    record.status = ResourceStatus::Running;

    if let Some(spec) = cron_job.spec.as_ref() {
        record.schedule = Some(spec.schedule.clone()).filter(|schedule| !schedule.is_empty());
        record.timezone = spec.time_zone.clone().filter(|zone| !zone.is_empty());
        if spec.suspend.unwrap_or(false) {
            record.status = ResourceStatus::Pending;
        }
    }

    if let Some(status) = cron_job.status.as_ref() {
        record.last_run = status.last_schedule_time.as_ref().map(timestamp);
        record.end_time = status.last_successful_time.as_ref().map(timestamp);
        record.queue_depth = status
            .active
            .as_ref()
            .map(|active| u32::try_from(active.len()).unwrap_or(u32::MAX))
            .unwrap_or(0);
    }

    record.next_run = scheduled_next_run(&record, now);
    record
}

pub fn workflow_to_record(object: &DynamicObject) -> CanonicalRecord {
    let mut record = CanonicalRecord::new(
        ResourceKind::Workflow,
        object.namespace().unwrap_or_default(),
        object.name_any(),
    );
    record.parent = parent_ref(object.owner_references(), ResourceKind::CronWorkflow);

    let Some(status) = object.data.get("status") else {
        return record;
    };

    record.status = match str_at(status, &["phase"]) {
        Some("Running") => ResourceStatus::Running,
        Some("Succeeded") => ResourceStatus::Succeeded,
        Some("Failed") | Some("Error") => ResourceStatus::Failed,
        Some("Pending") => ResourceStatus::Pending,
        _ => ResourceStatus::Unknown,
    };
    record.message = str_at(status, &["message"]).unwrap_or_default().to_string();
    record.start_time = time_at(status, &["startedAt"]);
    record.end_time = time_at(status, &["finishedAt"]);

    if let Some(nodes) = status.get("nodes").and_then(Value::as_object) {
        let mut ordered = nodes
            .values()
            .filter(|node| str_at(node, &["displayName"]).is_some_and(|name| !name.is_empty()))
            .collect::<Vec<_>>();
        ordered.sort_by(|left, right| {
            let left_start = time_at(left, &["startedAt"]);
            let right_start = time_at(right, &["startedAt"]);
            match (left_start, right_start) {
                (Some(left_start), Some(right_start)) => left_start.cmp(&right_start),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            }
            .then_with(|| str_at(left, &["displayName"]).cmp(&str_at(right, &["displayName"])))
        });

        record.dag_nodes = ordered
            .iter()
            .map(|node| DagNode {
                name: str_at(node, &["displayName"]).unwrap_or_default().to_string(),
                node_type: str_at(node, &["type"]).unwrap_or_default().to_string(),
                phase: str_at(node, &["phase"]).unwrap_or_default().to_string(),
            })
            .collect();

        // A Retry node has one child per attempt.
        record.retries = nodes
            .values()
            .filter(|node| str_at(node, &["type"]) == Some("Retry"))
            .map(|node| {
                let attempts = node
                    .get("children")
                    .and_then(Value::as_array)
                    .map_or(0, Vec::len);
                u32::try_from(attempts.saturating_sub(1)).unwrap_or(u32::MAX)
            })
            .sum();
    }

    record
}

pub fn cron_workflow_to_record(object: &DynamicObject, now: Timestamp) -> CanonicalRecord {
    let mut record = CanonicalRecord::new(
        ResourceKind::CronWorkflow,
        object.namespace().unwrap_or_default(),
        object.name_any(),
    );
    record.status = ResourceStatus::Running;

    if let Some(spec) = object.data.get("spec") {
        record.schedule = str_at(spec, &["schedule"])
            .or_else(|| {
                spec.get("schedules")
                    .and_then(Value::as_array)
                    .and_then(|schedules| schedules.first())
                    .and_then(Value::as_str)
            })
            .filter(|schedule| !schedule.is_empty())
            .map(str::to_string);
        record.timezone = str_at(spec, &["timezone"])
            .filter(|zone| !zone.is_empty())
            .map(str::to_string);
        if spec.get("suspend").and_then(Value::as_bool) == Some(true) {
            record.status = ResourceStatus::Pending;
        }
    }

    if let Some(status) = object.data.get("status") {
        record.last_run = time_at(status, &["lastScheduledTime"]);
        record.success_count = u32_at(status, &["succeeded"]).unwrap_or(0);
        record.failure_count = u32_at(status, &["failed"]).unwrap_or(0);
        record.queue_depth = status
            .get("active")
            .and_then(Value::as_array)
            .map(|active| u32::try_from(active.len()).unwrap_or(u32::MAX))
            .unwrap_or(0);
    }

    record.next_run = scheduled_next_run(&record, now);
    record
}

pub fn sensor_to_record(object: &DynamicObject) -> CanonicalRecord {
    let mut record = CanonicalRecord::new(
        ResourceKind::Sensor,
        object.namespace().unwrap_or_default(),
        object.name_any(),
    );
    apply_ready_condition(&mut record, &object.data);

    let Some(spec) = object.data.get("spec") else {
        return record;
    };

    let dependencies = spec
        .get("dependencies")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    record.event_source_name = dependencies
        .iter()
        .find_map(|dependency| str_at(dependency, &["eventSourceName"]))
        .unwrap_or_default()
        .to_string();
    record.event_names = dependencies
        .iter()
        .filter_map(|dependency| str_at(dependency, &["eventName"]))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();
    record.trigger_names = spec
        .get("triggers")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .filter_map(|trigger| str_at(trigger, &["template", "name"]))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();

    record
}

pub fn event_source_to_record(object: &DynamicObject) -> CanonicalRecord {
    let mut record = CanonicalRecord::new(
        ResourceKind::EventSource,
        object.namespace().unwrap_or_default(),
        object.name_any(),
    );
    apply_ready_condition(&mut record, &object.data);

    let Some(spec) = object.data.get("spec").and_then(Value::as_object) else {
        return record;
    };

    let Some((family, events)) = EVENT_SOURCE_FAMILIES
        .iter()
        .find_map(|family| spec.get(*family).map(|events| (*family, events)))
    else {
        return record;
    };

    record.event_type = family.to_string();
    if let Some(events) = events.as_object() {
        record.event_names = events.keys().cloned().collect();
        record.event_names.sort();
    }
    record
}

fn apply_ready_condition(record: &mut CanonicalRecord, data: &Value) {
    let ready = data
        .get("status")
        .and_then(|status| status.get("conditions"))
        .and_then(Value::as_array)
        .and_then(|conditions| {
            conditions
                .iter()
                .rev()
                .find(|condition| str_at(condition, &["type"]) == Some("Ready"))
        });

    let Some(ready) = ready else {
        return;
    };

    if str_at(ready, &["status"]) == Some("True") {
        record.status = ResourceStatus::Running;
    } else {
        record.status = ResourceStatus::Failed;
        record.message = str_at(ready, &["message"]).unwrap_or_default().to_string();
    }
}

fn scheduled_next_run(record: &CanonicalRecord, now: Timestamp) -> Option<Timestamp> {
    let schedule = record.schedule.as_deref()?;
    schedule::next_run(schedule, record.timezone.as_deref(), now)
}

fn parent_ref(owners: &[OwnerReference], kind: ResourceKind) -> Option<ParentRef> {
    owners
        .iter()
        .find(|owner| owner.kind == kind.title() && !owner.name.is_empty())
        .map(|owner| ParentRef {
            kind,
            name: owner.name.clone(),
        })
}

/// Completions per minute over a finished run.
fn completion_rate(completions: u32, start: Option<Timestamp>, end: Option<Timestamp>) -> f64 {
    let (Some(start), Some(end)) = (start, end) else {
        return 0.0;
    };
    let elapsed = end.duration_since(start).as_secs_f64();
    if completions == 0 || elapsed <= 0.0 {
        return 0.0;
    }
    f64::from(completions) * 60.0 / elapsed
}

fn timestamp(time: &Time) -> Timestamp {
    time.0
}

fn count(value: Option<i32>) -> u32 {
    value
        .and_then(|value| u32::try_from(value).ok())
        .unwrap_or(0)
}

fn value_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(key))
}

fn str_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    value_at(value, path)?.as_str()
}

fn u32_at(value: &Value, path: &[&str]) -> Option<u32> {
    value_at(value, path)?
        .as_u64()
        .and_then(|count| u32::try_from(count).ok())
}

fn time_at(value: &Value, path: &[&str]) -> Option<Timestamp> {
    str_at(value, path)?.parse().ok()
}
