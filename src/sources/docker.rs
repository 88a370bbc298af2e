use std::io::ErrorKind;
use std::process::Command;

use chrono::DateTime;
use log::{debug, info, trace};
use serde::Deserialize;

use super::Source;
use crate::config::ConnectionConfig;
use crate::container::{Container, Port};
use crate::error::{Result, VizError};
use crate::history::HistoryEntry;
use crate::image::{null_as_empty, ImageRecord, UNTAGGED};

/// Image ids passed to one `docker image inspect` call, keeping argv below ARG_MAX.
const INSPECT_BATCH: usize = 500;

/// Queries a live runtime through the `docker` CLI.
pub struct DockerSource {
    config: ConnectionConfig,
}

#[derive(Debug, Deserialize)]
struct InspectedImage {
    #[serde(rename = "Id")]
    id: String,
    #[serde(default, rename = "Parent")]
    parent: String,
    #[serde(default, rename = "RepoTags", deserialize_with = "null_as_empty")]
    repo_tags: Vec<String>,
    #[serde(default, rename = "Size")]
    size: i64,
    // Dropped by newer API versions
    #[serde(default, rename = "VirtualSize")]
    virtual_size: Option<i64>,
    #[serde(default, rename = "Created")]
    created: String,
}

#[derive(Debug, Deserialize)]
struct HistoryLine {
    #[serde(rename = "ID")]
    id: String,
    #[serde(default, rename = "CreatedBy")]
    created_by: String,
    #[serde(default, rename = "CreatedAt")]
    created_at: String,
    #[serde(default, rename = "Size")]
    size: String,
}

#[derive(Debug, Deserialize)]
struct ContainerLine {
    #[serde(rename = "ID")]
    id: String,
    #[serde(default, rename = "Image")]
    image: String,
    #[serde(default, rename = "Names")]
    names: String,
    #[serde(default, rename = "Ports")]
    ports: String,
    #[serde(default, rename = "CreatedAt")]
    created_at: String,
    #[serde(default, rename = "Status")]
    status: String,
    #[serde(default, rename = "Command")]
    command: String,
}

impl DockerSource {
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        let source = Self { config };
        let version = source.run_command(&["--version"])?;
        debug!("Using {}", version.trim());
        Ok(source)
    }

    fn run_command(&self, args: &[&str]) -> Result<String> {
        let mut command = Command::new("docker");
        command.args(self.config.docker_args()).args(args);
        trace!("Running {:?}", command);

        let output = command.output().map_err(|e| {
            let detail = if e.kind() == ErrorKind::NotFound {
                "the docker CLI was not found in PATH".to_string()
            } else {
                format!("failed to execute docker {:?}: {}", args, e)
            };
            VizError::Transport {
                endpoint: self.config.endpoint().to_string(),
                detail,
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(classify_failure(self.config.endpoint(), stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

fn classify_failure(endpoint: &str, stderr: String) -> VizError {
    if stderr.to_lowercase().contains("permission denied") {
        VizError::SocketAccess {
            endpoint: endpoint.to_string(),
            detail: stderr,
        }
    } else {
        VizError::Transport {
            endpoint: endpoint.to_string(),
            detail: stderr,
        }
    }
}

impl Source for DockerSource {
    fn name(&self) -> &str {
        "docker"
    }

    fn list_images(&self) -> Result<Vec<ImageRecord>> {
        let listing = self.run_command(&["image", "ls", "--all", "--no-trunc", "--quiet"])?;
        let mut ids: Vec<&str> = Vec::new();
        for id in listing.lines().map(str::trim).filter(|id| !id.is_empty()) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        info!("Found {} images", ids.len());
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut images = Vec::with_capacity(ids.len());
        for args in inspect_commands(&ids) {
            let raw = self.run_command(&args)?;
            let inspected: Vec<InspectedImage> = serde_json::from_str(&raw)?;
            images.extend(inspected.into_iter().map(into_record));
        }
        Ok(images)
    }

    fn image_history(&self, image: &ImageRecord) -> Result<Vec<HistoryEntry>> {
        let raw = self.run_command(&[
            "history",
            "--no-trunc",
            "--human=false",
            "--format",
            "{{json .}}",
            &image.id,
        ])?;

        let mut history = parse_history(&raw)?;
        if let Some(newest) = history.last_mut() {
            newest.tags = image
                .repo_tags
                .iter()
                .filter(|tag| *tag != UNTAGGED)
                .cloned()
                .collect();
        }
        trace!("{} has {} history entries", image.id, history.len());
        Ok(history)
    }

    fn list_containers(&self) -> Result<Vec<Container>> {
        let raw = self.run_command(&["ps", "--all", "--no-trunc", "--format", "{{json .}}"])?;
        let mut containers = Vec::new();
        for line in raw.lines().filter(|line| !line.trim().is_empty()) {
            let line: ContainerLine = serde_json::from_str(line)?;
            containers.push(Container {
                id: line.id,
                image: line.image,
                names: line
                    .names
                    .split(',')
                    .filter(|name| !name.is_empty())
                    .map(|name| format!("/{}", name))
                    .collect(),
                ports: parse_ports(&line.ports),
                created: parse_timestamp(&line.created_at),
                status: line.status,
                command: line.command,
            });
        }
        info!("Found {} containers", containers.len());
        Ok(containers)
    }
}

fn inspect_commands<'a>(ids: &[&'a str]) -> Vec<Vec<&'a str>> {
    ids.chunks(INSPECT_BATCH)
        .map(|batch| {
            let mut args = vec!["image", "inspect"];
            args.extend_from_slice(batch);
            args
        })
        .collect()
}

fn into_record(image: InspectedImage) -> ImageRecord {
    let repo_tags = if image.repo_tags.is_empty() {
        vec![UNTAGGED.to_string()]
    } else {
        image.repo_tags
    };
    ImageRecord {
        id: image.id,
        parent_id: image.parent,
        repo_tags,
        size: image.size,
        virtual_size: image.virtual_size.unwrap_or(image.size),
        created: parse_timestamp(&image.created),
        origin_id: None,
        created_by: None,
    }
}

/// `docker history` prints newest first; return oldest first.
fn parse_history(raw: &str) -> Result<Vec<HistoryEntry>> {
    let mut history = Vec::new();
    for line in raw.lines().filter(|line| !line.trim().is_empty()) {
        let line: HistoryLine = serde_json::from_str(line)?;
        history.push(HistoryEntry {
            id: line.id,
            created_by: line.created_by,
            created: parse_timestamp(&line.created_at),
            size: parse_size(&line.size),
            tags: Vec::new(),
        });
    }
    history.reverse();
    Ok(history)
}

/// Seconds since epoch from RFC 3339 or the CLI's `2006-01-02 15:04:05 -0700 MST` form.
fn parse_timestamp(value: &str) -> i64 {
    if let Ok(time) = DateTime::parse_from_rfc3339(value) {
        return time.timestamp();
    }
    let without_zone: Vec<&str> = value.split_whitespace().take(3).collect();
    DateTime::parse_from_str(&without_zone.join(" "), "%Y-%m-%d %H:%M:%S %z")
        .map(|time| time.timestamp())
        .unwrap_or(0)
}

fn parse_size(value: &str) -> i64 {
    let digits: String = value.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}

/// Parse the CLI's port column, e.g. `0.0.0.0:8080->80/tcp, 443/tcp`.
fn parse_ports(value: &str) -> Vec<Port> {
    let mut ports = Vec::new();
    for entry in value.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (public, private) = match entry.split_once("->") {
            Some((public, private)) => (Some(public), private),
            None => (None, entry),
        };
        let (private_port, protocol) = private.split_once('/').unwrap_or((private, "tcp"));
        let Ok(private_port) = private_port.parse::<u16>() else {
            debug!("Skipping unsupported port entry {}", entry);
            continue;
        };

        let (ip, public_port) = match public.and_then(|p| p.rsplit_once(':')) {
            Some((ip, port)) => (Some(ip.to_string()), port.parse::<u16>().ok()),
            None => (None, None),
        };

        ports.push(Port {
            ip,
            private_port,
            public_port,
            protocol: protocol.to_string(),
        });
    }
    ports
}
