//! Directory listings
//!
//! Builds `ls -l` style text natively from file metadata: type and
//! permission bits, link count, owner, group, size, modification time and
//! name.

use chrono::{DateTime, Local};
use std::fs::{self, Metadata};
use std::io;
use std::path::Path;

/// Entries older (or further in the future) than this show a year instead
/// of a time of day, as `ls` does.
const RECENT_DAYS: i64 = 180;

/// Lists `path`. A directory yields one line per entry sorted by name; a
/// regular file yields its own single line.
pub fn list(path: &Path) -> io::Result<String> {
    let metadata = fs::symlink_metadata(path)?;
    if !metadata.is_dir() {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        return Ok(format!("{}\r\n", format_entry(&name, &metadata, None)));
    }

    let mut entries: Vec<(String, Metadata, Option<String>)> = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        let link_target = if metadata.file_type().is_symlink() {
            fs::read_link(entry.path())
                .ok()
                .map(|target| target.display().to_string())
        } else {
            None
        };
        entries.push((name, metadata, link_target));
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut out = String::new();
    for (name, metadata, link_target) in &entries {
        out.push_str(&format_entry(name, metadata, link_target.as_deref()));
        out.push_str("\r\n");
    }
    Ok(out)
}

/// Formats one listing line.
pub fn format_entry(name: &str, metadata: &Metadata, link_target: Option<&str>) -> String {
    let (mode, links, owner, group) = ownership(metadata);
    let modified = metadata
        .modified()
        .map(|time| format_mtime(DateTime::<Local>::from(time), Local::now()))
        .unwrap_or_else(|_| "Jan  1  1970".to_string());
    let name = match link_target {
        Some(target) => format!("{name} -> {target}"),
        None => name.to_string(),
    };
    format!(
        "{mode} {links:>3} {owner:<8} {group:<8} {size:>12} {modified} {name}",
        size = metadata.len()
    )
}

#[cfg(unix)]
fn ownership(metadata: &Metadata) -> (String, u64, String, String) {
    use std::os::unix::fs::MetadataExt;
    (
        mode_string(metadata.mode()),
        metadata.nlink(),
        metadata.uid().to_string(),
        metadata.gid().to_string(),
    )
}

#[cfg(not(unix))]
fn ownership(metadata: &Metadata) -> (String, u64, String, String) {
    let mode = if metadata.is_dir() {
        "drwxr-xr-x"
    } else if metadata.permissions().readonly() {
        "-r--r--r--"
    } else {
        "-rw-r--r--"
    };
    (mode.to_string(), 1, "owner".to_string(), "group".to_string())
}

/// Renders POSIX mode bits the way `ls -l` prints them, e.g. `drwxr-x---`.
pub fn mode_string(mode: u32) -> String {
    let kind = match mode & 0o170000 {
        0o040000 => 'd',
        0o120000 => 'l',
        0o020000 => 'c',
        0o060000 => 'b',
        0o010000 => 'p',
        0o140000 => 's',
        _ => '-',
    };
    let mut out = String::with_capacity(10);
    out.push(kind);
    for shift in [6u32, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    out
}

fn format_mtime(modified: DateTime<Local>, now: DateTime<Local>) -> String {
    if (now - modified).num_days().abs() < RECENT_DAYS {
        modified.format("%b %e %H:%M").to_string()
    } else {
        modified.format("%b %e  %Y").to_string()
    }
}
