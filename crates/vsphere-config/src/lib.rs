//! vSphere cloud configuration rendering.
//!
//! [`CloudConfig`] holds the settings the vSphere cloud provider reads from
//! `/etc/kubernetes/cloud-config`. [`CloudConfig::render`] materializes it
//! into the INI-style text form, with every value passed through
//! [`ini::escape`] so credentials and names cannot break the file's syntax.

pub mod ini;

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tera::{Context, Tera, Value};

const CLOUD_CONFIG_TEMPLATE: &str = r#"[Global]
user              = {{ global.user | ini_escape }}
password          = {{ global.password | ini_escape }}
port              = {{ global.port | ini_escape }}
insecure-flag     = {{ global.insecure_flag }}
working-dir       = {{ global.working_dir | ini_escape }}
datacenter        = {{ global.datacenter | ini_escape }}
datastore         = {{ global.default_datastore | ini_escape }}
server            = {{ global.server | ini_escape }}
{%- if global.ip_family %}
ip-family         = {{ global.ip_family | ini_escape }}
{%- endif %}

[Disk]
scsicontrollertype = {{ disk.scsi_controller_type | ini_escape }}

[Workspace]
server            = {{ workspace.server | ini_escape }}
datacenter        = {{ workspace.datacenter | ini_escape }}
folder            = {{ workspace.folder | ini_escape }}
default-datastore = {{ workspace.default_datastore | ini_escape }}
resourcepool-path = {{ workspace.resource_pool_path | ini_escape }}
{% for name, vc in virtual_center %}
[VirtualCenter {{ name | ini_escape }}]
user = {{ vc.user | ini_escape }}
password = {{ vc.password | ini_escape }}
port = {{ vc.port | ini_escape }}
datacenters = {{ vc.datacenters | ini_escape }}
{%- if vc.ip_family %}
ip-family = {{ vc.ip_family | ini_escape }}
{%- endif %}
{% endfor %}"#;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to parse the cloud config template: {0}")]
    Parse(#[source] tera::Error),

    #[error("failed to build the cloud config template context: {0}")]
    Context(#[source] tera::Error),

    #[error("failed to render the cloud config template: {0}")]
    Render(#[source] tera::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Settings shared by every virtual center.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    pub user: String,
    pub password: String,
    pub port: String,
    pub insecure_flag: bool,
    pub working_dir: String,
    pub datacenter: String,
    pub default_datastore: String,
    pub server: String,
    /// Only honored with an out-of-tree cloud controller manager.
    #[serde(default)]
    pub ip_family: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiskConfig {
    pub scsi_controller_type: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    pub server: String,
    pub datacenter: String,
    pub folder: String,
    pub default_datastore: String,
    pub resource_pool_path: String,
}

/// Per-virtual-center override section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VirtualCenterConfig {
    pub user: String,
    pub password: String,
    pub port: String,
    pub datacenters: String,
    #[serde(default)]
    pub ip_family: Option<String>,
}

/// The cloud configuration handed to the vSphere cloud provider.
///
/// Built fresh per request (usually deserialized from the request's
/// provider spec), rendered once, and discarded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CloudConfig {
    pub global: GlobalConfig,
    pub disk: DiskConfig,
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub virtual_center: BTreeMap<String, VirtualCenterConfig>,
}

impl CloudConfig {
    /// Render the configuration into its textual form.
    ///
    /// Output is deterministic: virtual center sections appear in
    /// lexicographic name order, and equal documents render byte-identical
    /// text. Optional fields emit no line at all when unset.
    pub fn render(&self) -> Result<String> {
        let mut tera = Tera::default();
        tera.register_filter("ini_escape", ini_escape);
        tera.add_raw_template("cloud-config", CLOUD_CONFIG_TEMPLATE)
            .map_err(Error::Parse)?;
        let context = Context::from_serialize(self).map_err(Error::Context)?;
        tera.render("cloud-config", &context).map_err(Error::Render)
    }
}

/// Tera filter quoting a string value for the INI dialect.
fn ini_escape(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let s = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("ini_escape filter expects a string"))?;
    Ok(Value::String(ini::escape(s)))
}
