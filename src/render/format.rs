/// Length of a truncated image id.
pub const SHORT_ID_LEN: usize = 12;

const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Format a byte count with decimal units and one decimal place, e.g. `662.6 MB`.
pub fn human_size(bytes: i64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    format!("{:.1} {}", value, SIZE_UNITS[unit])
}

/// Display form of an id: without its `<algorithm>:` prefix and, unless `no_trunc`,
/// cut to [`SHORT_ID_LEN`] characters.
pub fn truncate_id(id: &str, no_trunc: bool) -> &str {
    let id = id.rsplit_once(':').map_or(id, |(_, digest)| digest);
    if no_trunc {
        return id;
    }
    match id.char_indices().nth(SHORT_ID_LEN) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

/// Make a build-step command safe and short enough for a dot label.
pub fn sanitize_command(command: &str, width: usize) -> String {
    let command = command.strip_prefix("/bin/sh -c ").unwrap_or(command);
    let command = command.trim_start();
    let command = command.strip_prefix("#(nop) ").unwrap_or(command);

    command
        .replace(['"', '\''], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(width)
        .collect()
}
