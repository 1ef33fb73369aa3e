//! Expansion of collection roots.
//!
//! Roots may use `~`, be relative to the home directory, or reference
//! environment variables in Unix (`$VAR`, `${VAR}`) or Windows (`%VAR%`)
//! form. `HOME` and `USERPROFILE` always resolve to the configured home so a
//! synthetic home directory stays self-contained.

use anyhow::{bail, Result};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::path::{Path, PathBuf};

use crate::security::path_validator::resolve_under;

lazy_static! {
    static ref ENV_VAR: Regex = Regex::new(
        r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)|%([A-Za-z_][A-Za-z0-9_()]*)%"
    )
    .expect("environment variable pattern must compile");
}

/// Substitute variables using `lookup`. Any unresolved variable makes the
/// whole expansion fail.
pub fn expand_vars_with<F>(raw: &str, lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut missing = false;
    let expanded = ENV_VAR.replace_all(raw, |caps: &Captures| {
        let name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .or_else(|| caps.get(3))
            .map(|m| m.as_str())
            .unwrap_or_default();
        match lookup(name) {
            Some(value) => value,
            None => {
                missing = true;
                String::new()
            }
        }
    });
    if missing {
        None
    } else {
        Some(expanded.into_owned())
    }
}

/// Normalize path separators for the current OS
pub fn normalize_path_for_os(path: &str) -> String {
    if cfg!(windows) {
        path.replace('/', "\\")
    } else {
        path.replace('\\', "/")
    }
}

/// Resolve a configured root against `home`.
///
/// Relative roots must stay inside `home`; absolute roots are taken as-is.
pub fn expand_root(raw: &str, home: &Path) -> Result<PathBuf> {
    let home_str = home.to_string_lossy().into_owned();
    let expanded = expand_vars_with(raw, |name| match name {
        "HOME" | "USERPROFILE" => Some(home_str.clone()),
        other => std::env::var(other).ok(),
    });
    let Some(expanded) = expanded else {
        bail!("Unresolved environment variable in root: {}", raw);
    };
    let expanded = normalize_path_for_os(&expanded);

    if expanded == "~" {
        return Ok(home.to_path_buf());
    }
    if let Some(rest) = expanded.strip_prefix("~/").or_else(|| expanded.strip_prefix("~\\")) {
        return resolve_under(home, Path::new(rest));
    }

    let path = Path::new(&expanded);
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        resolve_under(home, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_env(name: &str) -> Option<String> {
        match name {
            "APPDATA" => Some("/users/u/AppData/Roaming".to_string()),
            "XDG_CONFIG_HOME" => Some("/users/u/.config".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_expand_vars_forms() {
        assert_eq!(
            expand_vars_with("%APPDATA%/Cursor", fake_env).as_deref(),
            Some("/users/u/AppData/Roaming/Cursor")
        );
        assert_eq!(
            expand_vars_with("${XDG_CONFIG_HOME}/Claude", fake_env).as_deref(),
            Some("/users/u/.config/Claude")
        );
        assert_eq!(
            expand_vars_with("$XDG_CONFIG_HOME/Claude", fake_env).as_deref(),
            Some("/users/u/.config/Claude")
        );
        assert_eq!(expand_vars_with("plain/path", fake_env).as_deref(), Some("plain/path"));
    }

    #[test]
    fn test_missing_variable_fails() {
        assert_eq!(expand_vars_with("$NOT_SET_ANYWHERE/x", fake_env), None);
        assert_eq!(expand_vars_with("%NOT_SET%/x", fake_env), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_expand_root_uses_configured_home() {
        let home = Path::new("/synthetic/home");
        assert_eq!(expand_root("~", home).unwrap(), PathBuf::from("/synthetic/home"));
        assert_eq!(
            expand_root("~/.claude", home).unwrap(),
            PathBuf::from("/synthetic/home/.claude")
        );
        assert_eq!(
            expand_root("$HOME/.codex", home).unwrap(),
            PathBuf::from("/synthetic/home/.codex")
        );
        assert_eq!(
            expand_root(".ollama", home).unwrap(),
            PathBuf::from("/synthetic/home/.ollama")
        );
        assert_eq!(expand_root("/var/log", home).unwrap(), PathBuf::from("/var/log"));
    }

    #[test]
    fn test_expand_root_rejects_traversal() {
        let home = Path::new("/synthetic/home");
        assert!(expand_root("../other-user", home).is_err());
        assert!(expand_root("~/../../etc", home).is_err());
    }
}
