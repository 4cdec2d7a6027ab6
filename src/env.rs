use std::collections::HashSet;
use std::ffi::OsString;

use crate::error::{EnvredisError, Result};

/// Rewrites `name` so it is a valid POSIX environment variable name.
///
/// The name is uppercased, then every character outside `A-Z`, `0-9` and `_`
/// becomes `_`, as does a leading digit.
pub fn sanitize(name: &str) -> String {
    name.to_uppercase()
        .chars()
        .enumerate()
        .map(|(idx, c)| {
            let allowed = c == '_' || c.is_ascii_uppercase() || (idx > 0 && c.is_ascii_digit());
            if allowed { c } else { '_' }
        })
        .collect()
}

pub fn is_posix_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first == '_' || first.is_ascii_uppercase()) {
        return false;
    }
    chars.all(|c| c == '_' || c.is_ascii_uppercase() || c.is_ascii_digit())
}

/// Builds the environment for a child process.
///
/// Remote entries are appended after `parent`. A parent entry whose name is
/// also present remotely is dropped, so every name appears once and the
/// remote value wins.
///
/// Fails with `Unexportable` when a remote entry cannot be placed in a
/// process environment at all.
pub fn resolve<P>(
    parent: P,
    remote: Vec<(String, String)>,
    posix: bool,
) -> Result<Vec<(OsString, OsString)>>
where
    P: IntoIterator<Item = (OsString, OsString)>,
{
    let mut resolved: Vec<(OsString, OsString)> = Vec::with_capacity(remote.len());
    let mut seen = HashSet::new();

    // Walk remote entries last-to-first so a later duplicate shadows an earlier one.
    for (name, value) in remote.into_iter().rev() {
        let name = if posix { sanitize(&name) } else { name };
        check_exportable(&name, &value)?;
        if !is_posix_name(&name) {
            tracing::debug!(name = %name, "passing non-POSIX variable name to child");
        }
        if seen.insert(OsString::from(&name)) {
            resolved.push((name.into(), value.into()));
        }
    }
    resolved.reverse();

    let mut child: Vec<(OsString, OsString)> =
        parent.into_iter().filter(|(name, _)| !seen.contains(name)).collect();
    child.extend(resolved);
    Ok(child)
}

fn check_exportable(name: &str, value: &str) -> Result<()> {
    let reason = if name.is_empty() {
        "name is empty"
    } else if name.contains('=') {
        "name contains `=`"
    } else if name.contains('\0') {
        "name contains a NUL byte"
    } else if value.contains('\0') {
        "value contains a NUL byte"
    } else {
        return Ok(());
    };
    Err(EnvredisError::Unexportable { name: name.to_string(), reason })
}

/// Renders `NAME=VALUE` for display, single-quoting values that contain whitespace.
pub fn display_line(name: &str, value: &str) -> String {
    if value.chars().any(char::is_whitespace) {
        format!("{name}='{value}'")
    } else {
        format!("{name}={value}")
    }
}
