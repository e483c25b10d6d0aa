use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::util::{is_false, is_zero, lenient_text};

pub const GCS_RESOURCE_TYPE: &str = "gcs-resource";
pub const GITHUB_RELEASE_RESOURCE_TYPE: &str = "github-release";
pub const BOSH_IO_STEMCELL_RESOURCE_TYPE: &str = "bosh-io-stemcell";
pub const GIT_RESOURCE_TYPE: &str = "git";
pub const MERGE_REQUEST_RESOURCE_TYPE: &str = "merge-request";
pub const SLACK_NOTIFICATION_RESOURCE_TYPE: &str = "slack-notification";
pub const POOL_RESOURCE_TYPE: &str = "pool";
pub const SEMVER_RESOURCE_TYPE: &str = "semver";
pub const DOCKER_IMAGE_RESOURCE_TYPE: &str = "docker-image";

/// Resource types whose `source` has a typed projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Gcs,
    GithubRelease,
    BoshIoStemcell,
    Git,
    MergeRequest,
    SlackNotification,
    Pool,
    Semver,
    DockerImage,
}

impl SourceKind {
    pub fn of(type_name: &str) -> Option<SourceKind> {
        match type_name {
            GCS_RESOURCE_TYPE => Some(SourceKind::Gcs),
            GITHUB_RELEASE_RESOURCE_TYPE => Some(SourceKind::GithubRelease),
            BOSH_IO_STEMCELL_RESOURCE_TYPE => Some(SourceKind::BoshIoStemcell),
            GIT_RESOURCE_TYPE => Some(SourceKind::Git),
            MERGE_REQUEST_RESOURCE_TYPE => Some(SourceKind::MergeRequest),
            SLACK_NOTIFICATION_RESOURCE_TYPE => Some(SourceKind::SlackNotification),
            POOL_RESOURCE_TYPE => Some(SourceKind::Pool),
            SEMVER_RESOURCE_TYPE => Some(SourceKind::Semver),
            DOCKER_IMAGE_RESOURCE_TYPE => Some(SourceKind::DockerImage),
            _ => None,
        }
    }

    pub fn same(self, a: Option<&Value>, b: Option<&Value>) -> Result<bool> {
        match self {
            SourceKind::Gcs => same::<GcsSource>(a, b),
            SourceKind::GithubRelease => same::<GithubReleaseSource>(a, b),
            SourceKind::BoshIoStemcell => same::<BoshIoStemcellSource>(a, b),
            SourceKind::Git => same::<GitSource>(a, b),
            SourceKind::MergeRequest => same::<MergeRequestSource>(a, b),
            SourceKind::SlackNotification => same::<SlackNotificationSource>(a, b),
            SourceKind::Pool => same::<PoolSource>(a, b),
            SourceKind::Semver => same::<SemverSource>(a, b),
            SourceKind::DockerImage => same::<DockerImageSource>(a, b),
        }
    }

    pub fn merge(self, old: Option<&Value>, new: Option<&Value>) -> Result<Value> {
        match self {
            SourceKind::Gcs => merged::<GcsSource>(old, new),
            SourceKind::GithubRelease => merged::<GithubReleaseSource>(old, new),
            SourceKind::BoshIoStemcell => merged::<BoshIoStemcellSource>(old, new),
            SourceKind::Git => merged::<GitSource>(old, new),
            SourceKind::MergeRequest => merged::<MergeRequestSource>(old, new),
            SourceKind::SlackNotification => merged::<SlackNotificationSource>(old, new),
            SourceKind::Pool => merged::<PoolSource>(old, new),
            SourceKind::Semver => merged::<SemverSource>(old, new),
            SourceKind::DockerImage => merged::<DockerImageSource>(old, new),
        }
    }
}

/// Field-wise update: non-empty values of `new` win, booleans always come from `new`.
trait Source: Serialize + DeserializeOwned + Default + PartialEq {
    const TYPE: &'static str;

    fn merge(&mut self, new: Self);

    fn normalized(self) -> Self {
        self
    }
}

fn decode<T: Source>(source: Option<&Value>) -> Result<T> {
    match source {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => serde_json::from_value(value.clone())
            .with_context(|| format!("unrecognized {} source: {value}", T::TYPE)),
    }
}

fn same<T: Source>(a: Option<&Value>, b: Option<&Value>) -> Result<bool> {
    Ok(decode::<T>(a)?.normalized() == decode::<T>(b)?.normalized())
}

fn merged<T: Source>(old: Option<&Value>, new: Option<&Value>) -> Result<Value> {
    let mut current = decode::<T>(old)?;
    current.merge(decode::<T>(new)?);
    Ok(serde_json::to_value(current)?)
}

fn take_str(old: &mut String, new: String) {
    if !new.is_empty() {
        *old = new;
    }
}

fn take_list<T>(old: &mut Vec<T>, new: Vec<T>) {
    if !new.is_empty() {
        *old = new;
    }
}

fn take_count(old: &mut u32, new: u32) {
    if new != 0 {
        *old = new;
    }
}

fn take_extra(old: &mut Map<String, Value>, new: Map<String, Value>) {
    for (key, value) in new {
        old.insert(key, value);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GcsSource {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bucket: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub json_key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub regexp: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub versioned_file: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Source for GcsSource {
    const TYPE: &'static str = GCS_RESOURCE_TYPE;

    fn merge(&mut self, new: Self) {
        take_str(&mut self.bucket, new.bucket);
        take_str(&mut self.json_key, new.json_key);
        take_str(&mut self.regexp, new.regexp);
        take_str(&mut self.versioned_file, new.versioned_file);
        take_extra(&mut self.extra, new.extra);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GithubReleaseSource {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub owner: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub repository: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub access_token: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub github_api_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub github_uploads_url: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub insecure: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub release: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub pre_release: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub drafts: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tag_filter: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Source for GithubReleaseSource {
    const TYPE: &'static str = GITHUB_RELEASE_RESOURCE_TYPE;

    fn merge(&mut self, new: Self) {
        take_str(&mut self.owner, new.owner);
        take_str(&mut self.repository, new.repository);
        take_str(&mut self.access_token, new.access_token);
        take_str(&mut self.github_api_url, new.github_api_url);
        take_str(&mut self.github_uploads_url, new.github_uploads_url);
        take_str(&mut self.tag_filter, new.tag_filter);
        self.insecure = new.insecure;
        self.release = new.release;
        self.pre_release = new.pre_release;
        self.drafts = new.drafts;
        take_extra(&mut self.extra, new.extra);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoshIoStemcellSource {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version_family: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub force_regular: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Source for BoshIoStemcellSource {
    const TYPE: &'static str = BOSH_IO_STEMCELL_RESOURCE_TYPE;

    fn merge(&mut self, new: Self) {
        take_str(&mut self.name, new.name);
        take_str(&mut self.version_family, new.version_family);
        self.force_regular = new.force_regular;
        take_extra(&mut self.extra, new.extra);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GitConfigEntry {
    pub name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpsTunnel {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub proxy_host: String,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "String::is_empty"
    )]
    pub proxy_port: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub proxy_user: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub proxy_password: String,
}

impl HttpsTunnel {
    pub fn is_empty(&self) -> bool {
        *self == HttpsTunnel::default()
    }

    fn merge(&mut self, new: HttpsTunnel) {
        take_str(&mut self.proxy_host, new.proxy_host);
        take_str(&mut self.proxy_port, new.proxy_port);
        take_str(&mut self.proxy_user, new.proxy_user);
        take_str(&mut self.proxy_password, new.proxy_password);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitSource {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uri: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub branch: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub private_key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore_paths: Vec<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub skip_ssl_verification: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tag_filter: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub git_config: Vec<GitConfigEntry>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub disable_ci_skip: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commit_verification_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commit_verification_key_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub gpg_keyserver: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub git_crypt_key: String,
    #[serde(default, skip_serializing_if = "HttpsTunnel::is_empty")]
    pub https_tunnel: HttpsTunnel,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Source for GitSource {
    const TYPE: &'static str = GIT_RESOURCE_TYPE;

    fn merge(&mut self, new: Self) {
        take_str(&mut self.uri, new.uri);
        take_str(&mut self.branch, new.branch);
        take_str(&mut self.private_key, new.private_key);
        take_str(&mut self.username, new.username);
        take_str(&mut self.password, new.password);
        take_str(&mut self.tag_filter, new.tag_filter);
        take_str(&mut self.gpg_keyserver, new.gpg_keyserver);
        take_str(&mut self.git_crypt_key, new.git_crypt_key);
        take_list(&mut self.paths, new.paths);
        take_list(&mut self.ignore_paths, new.ignore_paths);
        take_list(&mut self.commit_verification_keys, new.commit_verification_keys);
        take_list(
            &mut self.commit_verification_key_ids,
            new.commit_verification_key_ids,
        );
        // git_config is replaced as a whole, never merged entry by entry
        take_list(&mut self.git_config, new.git_config);
        self.skip_ssl_verification = new.skip_ssl_verification;
        self.disable_ci_skip = new.disable_ci_skip;
        self.https_tunnel.merge(new.https_tunnel);
        take_extra(&mut self.extra, new.extra);
    }

    fn normalized(mut self) -> Self {
        self.git_config.sort();
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergeRequestSource {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uri: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub private_token: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub private_key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub no_ssl: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub skip_ssl_verification: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Source for MergeRequestSource {
    const TYPE: &'static str = MERGE_REQUEST_RESOURCE_TYPE;

    fn merge(&mut self, new: Self) {
        take_str(&mut self.uri, new.uri);
        take_str(&mut self.private_token, new.private_token);
        take_str(&mut self.private_key, new.private_key);
        take_str(&mut self.username, new.username);
        take_str(&mut self.password, new.password);
        self.no_ssl = new.no_ssl;
        self.skip_ssl_verification = new.skip_ssl_verification;
        take_extra(&mut self.extra, new.extra);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlackNotificationSource {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Source for SlackNotificationSource {
    const TYPE: &'static str = SLACK_NOTIFICATION_RESOURCE_TYPE;

    fn merge(&mut self, new: Self) {
        take_str(&mut self.url, new.url);
        take_extra(&mut self.extra, new.extra);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolSource {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uri: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub branch: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pool: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub private_key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "String::is_empty"
    )]
    pub retry_delay: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Source for PoolSource {
    const TYPE: &'static str = POOL_RESOURCE_TYPE;

    fn merge(&mut self, new: Self) {
        take_str(&mut self.uri, new.uri);
        take_str(&mut self.branch, new.branch);
        take_str(&mut self.pool, new.pool);
        take_str(&mut self.private_key, new.private_key);
        take_str(&mut self.username, new.username);
        take_str(&mut self.password, new.password);
        take_str(&mut self.retry_delay, new.retry_delay);
        take_extra(&mut self.extra, new.extra);
    }
}

/// Semver sources; the fields of the gcs, s3 and git drivers share one projection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SemverSource {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub driver: String,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "String::is_empty"
    )]
    pub initial_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bucket: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub json_key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub access_key_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub secret_access_key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub session_token: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub region_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub disable_ssl: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uri: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub branch: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub file: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub private_key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub git_user: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub commit_message: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub skip_ssl_verification: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Source for SemverSource {
    const TYPE: &'static str = SEMVER_RESOURCE_TYPE;

    fn merge(&mut self, new: Self) {
        take_str(&mut self.driver, new.driver);
        take_str(&mut self.initial_version, new.initial_version);
        take_str(&mut self.bucket, new.bucket);
        take_str(&mut self.key, new.key);
        take_str(&mut self.json_key, new.json_key);
        take_str(&mut self.access_key_id, new.access_key_id);
        take_str(&mut self.secret_access_key, new.secret_access_key);
        take_str(&mut self.session_token, new.session_token);
        take_str(&mut self.region_name, new.region_name);
        take_str(&mut self.endpoint, new.endpoint);
        take_str(&mut self.uri, new.uri);
        take_str(&mut self.branch, new.branch);
        take_str(&mut self.file, new.file);
        take_str(&mut self.private_key, new.private_key);
        take_str(&mut self.username, new.username);
        take_str(&mut self.password, new.password);
        take_str(&mut self.git_user, new.git_user);
        take_str(&mut self.commit_message, new.commit_message);
        self.disable_ssl = new.disable_ssl;
        self.skip_ssl_verification = new.skip_ssl_verification;
        take_extra(&mut self.extra, new.extra);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CaCert {
    pub domain: String,
    pub cert: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientCert {
    pub domain: String,
    pub cert: String,
    pub key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DockerImageSource {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub repository: String,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "String::is_empty"
    )]
    pub tag: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub aws_access_key_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub aws_secret_access_key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub aws_session_token: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub insecure_registries: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub registry_mirror: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ca_certs: Vec<CaCert>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub client_certs: Vec<ClientCert>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub max_concurrent_downloads: u32,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub max_concurrent_uploads: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Source for DockerImageSource {
    const TYPE: &'static str = DOCKER_IMAGE_RESOURCE_TYPE;

    fn merge(&mut self, new: Self) {
        take_str(&mut self.repository, new.repository);
        take_str(&mut self.tag, new.tag);
        take_str(&mut self.username, new.username);
        take_str(&mut self.password, new.password);
        take_str(&mut self.aws_access_key_id, new.aws_access_key_id);
        take_str(&mut self.aws_secret_access_key, new.aws_secret_access_key);
        take_str(&mut self.aws_session_token, new.aws_session_token);
        take_str(&mut self.registry_mirror, new.registry_mirror);
        take_list(&mut self.insecure_registries, new.insecure_registries);
        take_list(&mut self.ca_certs, new.ca_certs);
        take_list(&mut self.client_certs, new.client_certs);
        take_count(&mut self.max_concurrent_downloads, new.max_concurrent_downloads);
        take_count(&mut self.max_concurrent_uploads, new.max_concurrent_uploads);
        take_extra(&mut self.extra, new.extra);
    }

    // registries and certificates compare as sets
    fn normalized(mut self) -> Self {
        self.insecure_registries.sort();
        self.ca_certs.sort();
        self.client_certs.sort();
        self
    }
}
