use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// Environment variable holding the serialized [`UserDataRequest`].
pub const ENV_USER_DATA_REQUEST: &str = "MACHINE_USER_DATA_REQUEST";

/// Request for generating the user data of a single machine.
///
/// The controller always serializes every field, so deserialization is
/// strict: a missing field means the two sides disagree on the schema.
/// Unknown fields are ignored to leave room for newer controllers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDataRequest {
    pub machine_spec: MachineSpec,
    /// Cloud the machine is provisioned on (e.g. "aws", "vsphere").
    pub cloud_provider_name: String,
    /// Provider-specific settings, interpreted by the plugin.
    pub cloud_provider_spec: serde_json::Value,
    /// Cluster DNS resolver addresses.
    pub dns_ips: Vec<IpAddr>,
    pub ssh_public_keys: Vec<String>,
    /// Run the kubelet against an external cloud controller manager.
    pub external_cloud_provider: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineSpec {
    /// Machine (and host) name.
    pub name: String,
    pub versions: MachineVersions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineVersions {
    /// Kubelet version to install, without a leading "v".
    pub kubelet: String,
}

/// Result of one plugin invocation.
///
/// Exactly one field is populated; empty fields are omitted on the wire.
/// Consumers treat a populated `err` as authoritative.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserDataResponse {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user_data: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub err: String,
}

impl UserDataResponse {
    pub fn success(user_data: impl Into<String>) -> Self {
        Self {
            user_data: user_data.into(),
            err: String::new(),
        }
    }

    pub fn failure(err: impl Into<String>) -> Self {
        Self {
            user_data: String::new(),
            err: err.into(),
        }
    }

    pub fn is_err(&self) -> bool {
        !self.err.is_empty()
    }
}
