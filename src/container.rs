//! Containers and their links, rendered as a flat Graphviz graph.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::image::null_as_empty;
use crate::render::truncate_id;

/// A published or exposed port of a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    #[serde(default, rename = "IP", skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(rename = "PrivatePort")]
    pub private_port: u16,
    #[serde(default, rename = "PublicPort", skip_serializing_if = "Option::is_none")]
    pub public_port: Option<u16>,
    #[serde(default = "default_protocol", rename = "Type")]
    pub protocol: String,
}

fn default_protocol() -> String {
    "tcp".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(default, rename = "Image")]
    pub image: String,
    /// Names as reported by the runtime, e.g. `/db` and, for links, `/web/db`.
    #[serde(default, rename = "Names", deserialize_with = "null_as_empty")]
    pub names: Vec<String>,
    #[serde(default, rename = "Ports", deserialize_with = "null_as_empty")]
    pub ports: Vec<Port>,
    #[serde(default, rename = "Created")]
    pub created: i64,
    #[serde(default, rename = "Status")]
    pub status: String,
    #[serde(default, rename = "Command")]
    pub command: String,
}

impl Container {
    /// The container's own name: the one entry with a single `/`, without it.
    pub fn display_name(&self) -> &str {
        self.names
            .iter()
            .rev()
            .find(|name| name.matches('/').count() == 1)
            .map(|name| name.trim_start_matches('/'))
            .unwrap_or_default()
    }

    /// `(container, alias)` pairs for every link name such as `/web/db`.
    pub fn links(&self) -> Vec<(&str, &str)> {
        self.names
            .iter()
            .filter_map(|name| {
                let parts: Vec<&str> = name.split('/').collect();
                if parts.len() > 2 {
                    Some((parts[1], parts[parts.len() - 1]))
                } else {
                    None
                }
            })
            .collect()
    }

    pub fn is_exited(&self) -> bool {
        self.status.contains("Exited")
    }
}

pub fn decode_containers(raw: &[u8]) -> Result<Vec<Container>> {
    let containers: Vec<Container> = serde_json::from_slice(raw)?;
    log::debug!("Decoded {} container records", containers.len());
    Ok(containers)
}

pub fn containers_to_dot(containers: &[Container], no_trunc: bool) -> String {
    let mut buffer = String::from("digraph docker {\n");

    for container in containers {
        let name = container.display_name();

        for (linked, alias) in container.links() {
            buffer.push_str(&format!(
                " \"{}\" -> \"{}\" [label = \" {}\" ]\n",
                name, linked, alias
            ));
        }

        let background = if container.is_exited() {
            "lightgrey"
        } else {
            "paleturquoise"
        };

        let mut label = format!("{}\\n{}", name, truncate_id(&container.id, no_trunc));
        for port in container.ports.iter() {
            if let Some(public) = port.public_port {
                label.push_str(&format!(
                    "\\n{}->{}/{}",
                    public, port.private_port, port.protocol
                ));
            }
        }

        buffer.push_str(&format!(
            " \"{}\" [label=\"{}\",shape=box,fillcolor=\"{}\",style=\"filled,rounded\"];\n",
            name, label, background
        ));
    }

    buffer.push_str("}\n");
    buffer
}
