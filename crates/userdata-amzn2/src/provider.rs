//! User data generation for Amazon Linux 2 machines.
//!
//! The payload is a cloud-init `#cloud-config` document. File contents are
//! embedded base64-encoded so arbitrary bytes survive the YAML layer; the
//! few scalars interpolated directly are single-quoted.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tracing::debug;

use userdata_plugin::{Provider, ProviderError, UserDataRequest};
use vsphere_config::CloudConfig;

const CLOUD_CONFIG_PATH: &str = "/etc/kubernetes/cloud-config";
const KUBELET_DROPIN_PATH: &str = "/etc/systemd/system/kubelet.service.d/10-machine.conf";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid vsphere cloud provider spec: {0}")]
    InvalidCloudProviderSpec(#[source] serde_json::Error),

    #[error("failed to render vsphere cloud config: {0}")]
    CloudConfig(#[from] vsphere_config::Error),
}

/// Provider for Amazon Linux 2.
pub struct Amzn2Provider;

impl Provider for Amzn2Provider {
    fn user_data(&self, req: &UserDataRequest) -> Result<String, ProviderError> {
        Ok(generate(req)?)
    }
}

fn generate(req: &UserDataRequest) -> Result<String, Error> {
    let cloud_config = match req.cloud_provider_name.as_str() {
        "vsphere" => {
            let config: CloudConfig = serde_json::from_value(req.cloud_provider_spec.clone())
                .map_err(Error::InvalidCloudProviderSpec)?;
            Some(config.render()?)
        }
        _ => None,
    };

    let mut out = String::new();
    out.push_str("#cloud-config\n\n");
    out.push_str(&format!(
        "hostname: {}\n",
        yaml_quote(&req.machine_spec.name)
    ));

    if !req.ssh_public_keys.is_empty() {
        out.push_str("\nssh_authorized_keys:\n");
        for key in &req.ssh_public_keys {
            out.push_str(&format!("- {}\n", yaml_quote(key)));
        }
    }

    out.push_str("\nwrite_files:\n");
    if let Some(rendered) = &cloud_config {
        debug!(bytes = rendered.len(), "embedding vsphere cloud config");
        out.push_str(&write_file_b64(CLOUD_CONFIG_PATH, "0600", rendered));
    }
    let dropin = kubelet_dropin(&kubelet_extra_args(req, cloud_config.is_some()));
    out.push_str(&write_file_b64(KUBELET_DROPIN_PATH, "0644", &dropin));

    let package = sh_quote(&format!("kubelet-{}", req.machine_spec.versions.kubelet));
    out.push_str("\nruncmd:\n");
    out.push_str(&format!("- yum install -y {package}\n"));
    out.push_str("- systemctl daemon-reload\n");
    out.push_str("- systemctl enable --now kubelet\n");

    Ok(out)
}

fn kubelet_extra_args(req: &UserDataRequest, has_cloud_config: bool) -> String {
    let mut args = vec![format!("--hostname-override={}", req.machine_spec.name)];
    if !req.dns_ips.is_empty() {
        let ips: Vec<String> = req.dns_ips.iter().map(ToString::to_string).collect();
        args.push(format!("--cluster-dns={}", ips.join(",")));
    }
    if req.external_cloud_provider {
        args.push("--cloud-provider=external".into());
    } else if has_cloud_config {
        args.push(format!("--cloud-provider={}", req.cloud_provider_name));
        args.push(format!("--cloud-config={CLOUD_CONFIG_PATH}"));
    }
    args.join(" ")
}

fn kubelet_dropin(extra_args: &str) -> String {
    format!("[Service]\nEnvironment=\"KUBELET_EXTRA_ARGS={extra_args}\"\n")
}

/// One cloud-init `write_files` entry with base64-encoded content.
fn write_file_b64(path: &str, mode: &str, content: &str) -> String {
    format!(
        "- path: {path}\n  permissions: '{mode}'\n  encoding: b64\n  content: {}\n",
        STANDARD.encode(content)
    )
}

/// Single-quote a YAML scalar.
fn yaml_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Single-quote a shell word.
fn sh_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use userdata_plugin::{MachineSpec, MachineVersions};

    fn request(cloud: &str, spec: serde_json::Value) -> UserDataRequest {
        UserDataRequest {
            machine_spec: MachineSpec {
                name: "node0".into(),
                versions: MachineVersions {
                    kubelet: "1.29.4".into(),
                },
            },
            cloud_provider_name: cloud.into(),
            cloud_provider_spec: spec,
            dns_ips: vec!["10.10.10.10".parse().unwrap()],
            ssh_public_keys: vec!["ssh-ed25519 AAAAC3Nza node0".into()],
            external_cloud_provider: false,
        }
    }

    fn vsphere_spec() -> serde_json::Value {
        serde_json::json!({
            "global": {
                "user": "admin",
                "password": r#"p"w"#,
                "port": "443",
                "insecure_flag": false,
                "working_dir": "/vms",
                "datacenter": "dc0",
                "default_datastore": "ds0",
                "server": "vcenter.local"
            },
            "disk": {"scsi_controller_type": "pvscsi"},
            "workspace": {
                "server": "vcenter.local",
                "datacenter": "dc0",
                "folder": "kubernetes",
                "default_datastore": "ds0",
                "resource_pool_path": "/pool"
            },
            "virtual_center": {
                "dc1": {
                    "user": "admin",
                    "password": r#"p"w"#,
                    "port": "443",
                    "datacenters": "dc0"
                }
            }
        })
    }

    fn decoded_file(user_data: &str, path: &str) -> String {
        let entry = user_data
            .split("- path: ")
            .find(|e| e.starts_with(path))
            .unwrap_or_else(|| panic!("no write_files entry for {path}"));
        let encoded = entry
            .lines()
            .find_map(|l| l.trim().strip_prefix("content: "))
            .expect("content line");
        String::from_utf8(STANDARD.decode(encoded).expect("valid base64")).unwrap()
    }

    #[test]
    fn builds_a_cloud_init_document() {
        let user_data = generate(&request("aws", serde_json::json!({}))).unwrap();
        assert!(user_data.starts_with("#cloud-config\n"));
        assert!(user_data.contains("hostname: 'node0'\n"));
        assert!(user_data.contains("- 'ssh-ed25519 AAAAC3Nza node0'\n"));
        assert!(user_data.contains("- yum install -y 'kubelet-1.29.4'\n"));
    }

    #[test]
    fn kubelet_dropin_carries_dns_and_hostname() {
        let user_data = generate(&request("aws", serde_json::json!({}))).unwrap();
        let dropin = decoded_file(&user_data, KUBELET_DROPIN_PATH);
        assert!(dropin.contains("--hostname-override=node0"));
        assert!(dropin.contains("--cluster-dns=10.10.10.10"));
        assert!(!dropin.contains("--cloud-provider"));
    }

    #[test]
    fn embeds_the_rendered_vsphere_cloud_config() {
        let user_data = generate(&request("vsphere", vsphere_spec())).unwrap();
        let embedded = decoded_file(&user_data, CLOUD_CONFIG_PATH);
        let rendered = serde_json::from_value::<CloudConfig>(vsphere_spec())
            .unwrap()
            .render()
            .unwrap();
        assert_eq!(embedded, rendered);
        assert!(embedded.contains(r#"[VirtualCenter "dc1"]"#));

        let dropin = decoded_file(&user_data, KUBELET_DROPIN_PATH);
        assert!(dropin.contains("--cloud-provider=vsphere"));
        assert!(dropin.contains("--cloud-config=/etc/kubernetes/cloud-config"));
    }

    #[test]
    fn external_cloud_provider_overrides_the_in_tree_flags() {
        let mut req = request("vsphere", vsphere_spec());
        req.external_cloud_provider = true;
        let user_data = generate(&req).unwrap();
        let dropin = decoded_file(&user_data, KUBELET_DROPIN_PATH);
        assert!(dropin.contains("--cloud-provider=external"));
        assert!(!dropin.contains("--cloud-config="));
        // The config file is still written for the external manager to read.
        assert!(user_data.contains(CLOUD_CONFIG_PATH));
    }

    #[test]
    fn non_vsphere_machines_get_no_cloud_config_file() {
        let user_data = generate(&request("aws", serde_json::json!({}))).unwrap();
        assert!(!user_data.contains(CLOUD_CONFIG_PATH));
    }

    #[test]
    fn invalid_provider_spec_is_a_descriptive_error() {
        let err = generate(&request("vsphere", serde_json::json!({"global": 42}))).unwrap_err();
        assert!(matches!(err, Error::InvalidCloudProviderSpec(_)));
        assert!(err.to_string().contains("cloud provider spec"));
    }

    #[test]
    fn quoting_helpers_neutralize_quotes() {
        assert_eq!(yaml_quote("it's"), "'it''s'");
        assert_eq!(sh_quote("a'b"), r"'a'\''b'");
    }
}
