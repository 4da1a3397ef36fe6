use anyhow::{Context, Result};
use jiff::Timestamp;
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::ListParams;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::{Api, Client, Config, Resource};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::{debug, warn};

use crate::model::NamespaceScope;
use crate::normalize::{Family, RawBatch};

const ARGO_GROUP: &str = "argoproj.io";
const ARGO_FALLBACK_VERSION: &str = "v1alpha1";

#[derive(Clone)]
pub struct KubeGateway {
    client: Client,
    context: String,
    cluster: String,
}

/// Argo custom resource families that may or may not be installed.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum ArgoFamily {
    Workflow,
    CronWorkflow,
    Sensor,
    EventSource,
}

impl ArgoFamily {
    fn kind(self) -> &'static str {
        match self {
            Self::Workflow => "Workflow",
            Self::CronWorkflow => "CronWorkflow",
            Self::Sensor => "Sensor",
            Self::EventSource => "EventSource",
        }
    }

    fn plural(self) -> &'static str {
        match self {
            Self::Workflow => "workflows",
            Self::CronWorkflow => "cronworkflows",
            Self::Sensor => "sensors",
            Self::EventSource => "eventsources",
        }
    }

    fn crd_name(self) -> String {
        format!("{}.{ARGO_GROUP}", self.plural())
    }

    fn api_resource(self, version: &str) -> ApiResource {
        let gvk = GroupVersionKind::gvk(ARGO_GROUP, version, self.kind());
        ApiResource::from_gvk_with_plural(&gvk, self.plural())
    }
}

impl KubeGateway {
    pub async fn new(context: Option<String>) -> Result<Self> {
        Self::from_kube_selection(context).await
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    async fn from_kube_selection(context: Option<String>) -> Result<Self> {
        let kubeconfig = Kubeconfig::read().ok();

        let config = if let Some(kubeconfig_value) = kubeconfig.clone() {
            let options = KubeConfigOptions {
                context: context.clone(),
                cluster: None,
                user: None,
            };
            Config::from_custom_kubeconfig(kubeconfig_value, &options)
                .await
                .context("failed to infer Kubernetes configuration")?
        } else {
            if context.is_some() {
                anyhow::bail!("kubeconfig not found; --context is unavailable in this environment");
            }
            Config::infer()
                .await
                .context("failed to infer Kubernetes configuration")?
        };

        let cluster_url = config.cluster_url.to_string();
        let client = Client::try_from(config).context("failed to initialize Kubernetes client")?;

        let active_context = context
            .or_else(|| {
                kubeconfig
                    .as_ref()
                    .and_then(|cfg| cfg.current_context.clone())
            })
            .unwrap_or_else(|| "in-cluster".to_string());

        Ok(Self {
            client,
            context: active_context,
            cluster: cluster_url,
        })
    }

    /// Lists every monitored resource in `scope`. Argo families whose CRDs are missing come
    /// back as `Family::Unavailable`. A kind the API server refuses to list counts as zero
    /// resources; only transport failures abort the whole poll.
    pub async fn list_all(&self, scope: &NamespaceScope) -> Result<RawBatch> {
        let observed_at = Timestamp::now();
        let (jobs, cron_jobs, workflows, cron_workflows, sensors, event_sources) = tokio::join!(
            self.list_typed::<Job>(scope),
            self.list_typed::<CronJob>(scope),
            self.list_family(ArgoFamily::Workflow, scope),
            self.list_family(ArgoFamily::CronWorkflow, scope),
            self.list_family(ArgoFamily::Sensor, scope),
            self.list_family(ArgoFamily::EventSource, scope),
        );

        let batch = RawBatch {
            observed_at,
            jobs: zero_on_api_status(jobs, "jobs")?,
            cron_jobs: zero_on_api_status(cron_jobs, "cronjobs")?,
            workflows,
            cron_workflows,
            sensors,
            event_sources,
        };
        let unavailable = [
            &batch.workflows,
            &batch.cron_workflows,
            &batch.sensors,
            &batch.event_sources,
        ]
        .iter()
        .filter(|family| !family.is_available())
        .count();
        debug!(
            "listed {} resources in {scope}, {unavailable} optional families unavailable",
            batch.len()
        );
        Ok(batch)
    }

    async fn list_typed<K>(&self, scope: &NamespaceScope) -> kube::Result<Vec<K>>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        <K as Resource>::DynamicType: Default,
    {
        let api: Api<K> = match scope {
            NamespaceScope::All => Api::all(self.client.clone()),
            NamespaceScope::Named(namespace) => Api::namespaced(self.client.clone(), namespace),
        };
        list_pages(&api).await
    }

    async fn list_family(&self, family: ArgoFamily, scope: &NamespaceScope) -> Family<DynamicObject> {
        let version = match self.served_version(family).await {
            Ok(Some(version)) => version,
            Ok(None) => {
                debug!("{} CRD not installed", family.crd_name());
                return Family::Unavailable;
            }
            Err(error) => {
                // Discovery can be forbidden while listing is allowed.
                debug!("CRD lookup for {} failed: {error:#}", family.crd_name());
                ARGO_FALLBACK_VERSION.to_string()
            }
        };

        let api_resource = family.api_resource(&version);
        let api: Api<DynamicObject> = match scope {
            NamespaceScope::All => Api::all_with(self.client.clone(), &api_resource),
            NamespaceScope::Named(namespace) => {
                Api::namespaced_with(self.client.clone(), namespace, &api_resource)
            }
        };

        match list_pages(&api).await {
            Ok(items) => Family::Listed(items),
            Err(error) => {
                warn!("listing {} failed: {error:#}", family.plural());
                Family::Unavailable
            }
        }
    }

    /// Storage version of the family's CRD, `None` when the CRD does not exist.
    async fn served_version(&self, family: ArgoFamily) -> Result<Option<String>> {
        let crd_api: Api<CustomResourceDefinition> = Api::all(self.client.clone());
        let Some(crd) = crd_api.get_opt(&family.crd_name()).await? else {
            return Ok(None);
        };

        let versions = &crd.spec.versions;
        let version = versions
            .iter()
            .find(|version| version.storage)
            .or_else(|| versions.first())
            .map(|version| version.name.clone())
            .unwrap_or_else(|| ARGO_FALLBACK_VERSION.to_string());
        Ok(Some(version))
    }
}

/// Keeps a listing that the API server answered with a status (forbidden, not found) as an
/// empty kind. Anything else is a fetch failure.
fn zero_on_api_status<K>(result: kube::Result<Vec<K>>, plural: &str) -> Result<Vec<K>> {
    match result {
        Ok(items) => Ok(items),
        Err(kube::Error::Api(status)) => {
            warn!(
                "listing {plural} rejected ({} {}): {}",
                status.code, status.reason, status.message
            );
            Ok(Vec::new())
        }
        Err(error) => Err(anyhow::Error::new(error).context(format!("failed to list {plural}"))),
    }
}

/// Follows continue tokens until the server reports no more pages.
async fn list_pages<K>(api: &Api<K>) -> kube::Result<Vec<K>>
where
    K: Clone + DeserializeOwned + Debug,
{
    let mut items = Vec::new();
    let mut params = list_params();
    loop {
        let page = api.list(&params).await?;
        let next = page
            .metadata
            .continue_
            .clone()
            .filter(|token| !token.is_empty());
        items.extend(page.items);
        match next {
            Some(token) => params = list_params().continue_token(&token),
            None => return Ok(items),
        }
    }
}

fn list_params() -> ListParams {
    ListParams::default().limit(500)
}

#[cfg(test)]
mod tests {
    use super::{ArgoFamily, KubeGateway};
    use crate::model::NamespaceScope;
    use http::{Request, Response, StatusCode};
    use kube::Client;
    use kube::client::Body;
    use serde_json::{Value, json};
    use std::convert::Infallible;

    fn gateway(client: Client) -> KubeGateway {
        KubeGateway {
            client,
            context: "test".to_string(),
            cluster: "https://cluster.test".to_string(),
        }
    }

    fn json_response(status: StatusCode, body: Value) -> Response<Body> {
        Response::builder()
            .status(status)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).expect("serialize body")))
            .expect("build response")
    }

    fn status_response(status: StatusCode, reason: &str, message: &str) -> Response<Body> {
        json_response(
            status,
            json!({
                "apiVersion": "v1",
                "kind": "Status",
                "metadata": {},
                "status": "Failure",
                "message": message,
                "reason": reason,
                "code": status.as_u16(),
            }),
        )
    }

    /// Jobs list fine, CronJobs are forbidden and no Argo CRDs are installed.
    async fn restricted_cluster(request: Request<Body>) -> Result<Response<Body>, Infallible> {
        let response = match request.uri().path() {
            "/apis/batch/v1/jobs" => json_response(
                StatusCode::OK,
                json!({
                    "apiVersion": "batch/v1",
                    "kind": "JobList",
                    "metadata": {},
                    "items": [{
                        "apiVersion": "batch/v1",
                        "kind": "Job",
                        "metadata": {"name": "backup", "namespace": "ops"},
                        "status": {"active": 1}
                    }]
                }),
            ),
            "/apis/batch/v1/cronjobs" => status_response(
                StatusCode::FORBIDDEN,
                "Forbidden",
                "cronjobs is forbidden",
            ),
            _ => status_response(StatusCode::NOT_FOUND, "NotFound", "not found"),
        };
        Ok(response)
    }

    #[tokio::test]
    async fn forbidden_kind_counts_as_zero_resources() {
        let client = Client::new(tower::service_fn(restricted_cluster), "default");
        let batch = gateway(client)
            .list_all(&NamespaceScope::All)
            .await
            .expect("poll survives a forbidden kind");

        assert_eq!(batch.jobs.len(), 1);
        assert!(batch.cron_jobs.is_empty());
        assert!(!batch.workflows.is_available());
        assert!(!batch.event_sources.is_available());
    }

    #[tokio::test]
    async fn transport_failure_fails_the_poll() {
        let client = Client::new(
            tower::service_fn(|_request: Request<Body>| async {
                Err::<Response<Body>, _>(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "connection refused",
                ))
            }),
            "default",
        );
        let error = gateway(client)
            .list_all(&NamespaceScope::All)
            .await
            .expect_err("transport errors are fetch failures");

        assert!(format!("{error:#}").contains("failed to list jobs"));
    }

    #[test]
    fn argo_families_resolve_crd_names() {
        assert_eq!(ArgoFamily::Workflow.crd_name(), "workflows.argoproj.io");
        assert_eq!(ArgoFamily::EventSource.crd_name(), "eventsources.argoproj.io");
    }

    #[test]
    fn argo_api_resource_uses_plural_and_version() {
        let resource = ArgoFamily::CronWorkflow.api_resource("v1alpha1");
        assert_eq!(resource.group, "argoproj.io");
        assert_eq!(resource.version, "v1alpha1");
        assert_eq!(resource.api_version, "argoproj.io/v1alpha1");
        assert_eq!(resource.kind, "CronWorkflow");
        assert_eq!(resource.plural, "cronworkflows");
    }
}
