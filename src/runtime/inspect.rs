use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

use super::RuntimeError;
use super::types::{ContainerState, ContainerSummary, MountPoint, ObservedContainer};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectContainer {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    config: InspectConfig,
    #[serde(default)]
    state: InspectState,
    #[serde(default)]
    mounts: Option<Vec<InspectMount>>,
    #[serde(default)]
    host_config: Option<InspectHostConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectConfig {
    #[serde(default)]
    image: String,
    #[serde(default)]
    cmd: Option<Vec<String>>,
    #[serde(default)]
    env: Option<Vec<String>>,
    #[serde(default)]
    labels: Option<BTreeMap<String, String>>,
    #[serde(default)]
    user: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectState {
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectMount {
    destination: String,
    #[serde(default)]
    source: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectHostConfig {
    #[serde(default)]
    port_bindings: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectImage {
    #[serde(default)]
    config: InspectImageConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InspectImageConfig {
    #[serde(default)]
    env: Option<Vec<String>>,
}

/// One line of `docker ps --format '{{json .}}'`.
#[derive(Debug, Deserialize)]
struct PsLine {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Names", default)]
    names: String,
    #[serde(rename = "Image", default)]
    image: String,
    #[serde(rename = "State", default)]
    state: String,
}

/// Parse `docker inspect` output. An empty array means the container is gone.
pub fn parse_container_inspect(json: &str) -> Result<Option<ObservedContainer>, RuntimeError> {
    if json.trim().is_empty() {
        return Ok(None);
    }
    let mut containers: Vec<InspectContainer> = serde_json::from_str(json)?;
    if containers.is_empty() {
        return Ok(None);
    }
    let c = containers.swap_remove(0);

    // Only published ports count. NetworkSettings also lists the image's
    // EXPOSE entries, which the service never asked for.
    let mut ports: Vec<String> = c
        .host_config
        .and_then(|h| h.port_bindings)
        .map(|m| m.into_keys().collect())
        .unwrap_or_default();
    ports.sort();

    Ok(Some(ObservedContainer {
        id: c.id,
        name: c.name.trim_start_matches('/').to_string(),
        image: c.config.image,
        state: ContainerState::parse(&c.state.status),
        cmd: c.config.cmd.unwrap_or_default(),
        env: c.config.env.unwrap_or_default(),
        image_env: Vec::new(),
        ports,
        mounts: c
            .mounts
            .unwrap_or_default()
            .into_iter()
            .map(|m| MountPoint {
                destination: m.destination,
                source: m.source,
            })
            .collect(),
        labels: c.config.labels.unwrap_or_default(),
        user: c.config.user,
    }))
}

/// Environment baked into an image, from `docker image inspect`.
pub fn parse_image_env(json: &str) -> Result<Vec<String>, RuntimeError> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    let images: Vec<InspectImage> = serde_json::from_str(json)?;
    Ok(images
        .into_iter()
        .next()
        .and_then(|i| i.config.env)
        .unwrap_or_default())
}

/// Parse newline-delimited `docker ps` JSON rows.
pub fn parse_container_list(output: &str) -> Result<Vec<ContainerSummary>, RuntimeError> {
    output
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|line| {
            let row: PsLine = serde_json::from_str(line)?;
            Ok(ContainerSummary {
                id: row.id,
                name: row
                    .names
                    .split(',')
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_string(),
                image: row.image,
                state: ContainerState::parse(&row.state),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::diff;
    use crate::model::{ContainerSpec, Owner};

    const INSPECT: &str = r#"[{
        "Id": "abc123",
        "Name": "/web",
        "State": {"Status": "running", "Running": true},
        "Config": {
            "Image": "nginx:alpine",
            "Cmd": ["nginx", "-g", "daemon off;"],
            "Env": ["PORT=8080", "PATH=/usr/bin"],
            "Labels": {"svs_user": "alice", "service_id": "7"},
            "User": "1000:1001"
        },
        "Mounts": [
            {"Type": "bind", "Source": "/var/svs/volumes/5/abc", "Destination": "/data", "RW": true}
        ],
        "HostConfig": {
            "PortBindings": {"80/tcp": [{"HostIp": "", "HostPort": ""}], "443/tcp": [{"HostIp": "", "HostPort": "8443"}]}
        },
        "NetworkSettings": {"Ports": {"9000/tcp": null}}
    }]"#;

    #[test]
    fn parses_running_container() {
        let c = parse_container_inspect(INSPECT).unwrap().unwrap();
        assert_eq!(c.id, "abc123");
        assert_eq!(c.name, "web");
        assert_eq!(c.state, ContainerState::Running);
        assert_eq!(c.cmd.join(" "), "nginx -g daemon off;");
        assert_eq!(c.env.len(), 2);
        assert_eq!(c.ports, vec!["443/tcp", "80/tcp"]);
        assert_eq!(c.mounts[0].destination, "/data");
        assert_eq!(c.label("service_id"), Some("7"));
        assert_eq!(c.user, "1000:1001");
    }

    #[test]
    fn image_exposed_ports_are_not_observed() {
        let json = r#"[{
            "Id": "x",
            "Config": {"Image": "nginx", "Cmd": null, "Env": null, "Labels": null},
            "State": {"Status": "running"},
            "Mounts": null,
            "HostConfig": {"PortBindings": {}},
            "NetworkSettings": {"Ports": {"80/tcp": null}}
        }]"#;
        let c = parse_container_inspect(json).unwrap().unwrap();
        assert!(c.ports.is_empty());
        assert!(c.cmd.is_empty());
        assert!(c.mounts.is_empty());

        let desired = ContainerSpec::new("x", "nginx", Owner::new(5, "alice"));
        assert!(diff(&c, &desired).is_empty());
    }

    #[test]
    fn empty_array_is_absent() {
        assert!(parse_container_inspect("[]").unwrap().is_none());
        assert!(parse_container_inspect("").unwrap().is_none());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = parse_container_inspect("{not json").unwrap_err();
        assert!(matches!(err, RuntimeError::Parse(_)));
    }

    #[test]
    fn image_env_is_read_from_config() {
        let env = parse_image_env(r#"[{"Config": {"Env": ["PATH=/usr/bin", "NGINX_VERSION=1.25"]}}]"#)
            .unwrap();
        assert_eq!(env, vec!["PATH=/usr/bin", "NGINX_VERSION=1.25"]);
    }

    #[test]
    fn list_rows_parse() {
        let out = concat!(
            r#"{"ID":"a1","Names":"web","Image":"nginx","State":"running","Status":"Up 2 minutes"}"#,
            "\n",
            r#"{"ID":"b2","Names":"db,db-alias","Image":"postgres","State":"exited","Status":"Exited (0)"}"#,
            "\n"
        );
        let rows = parse_container_list(out).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].name, "db");
        assert_eq!(rows[1].state, ContainerState::Exited);
    }
}
