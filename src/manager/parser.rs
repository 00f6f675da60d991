//! Parsers for package manager output.

use serde::Deserialize;

use crate::inventory::Package;

#[derive(Debug, Deserialize)]
struct ListEntry {
    name: String,
    version: String,
}

/// Parse `pip list --format=json` output.
///
/// Tolerates noise before the JSON array (some pip builds print warnings
/// to stdout).
pub fn parse_pip_json(stdout: &str) -> Result<Vec<Package>, String> {
    let start = stdout
        .find('[')
        .ok_or_else(|| "no JSON array in output".to_string())?;
    let entries: Vec<ListEntry> =
        serde_json::from_str(stdout[start..].trim_end()).map_err(|e| e.to_string())?;
    Ok(entries
        .into_iter()
        .map(|e| Package::new(e.name, e.version))
        .collect())
}

/// Parse `pip freeze` output (`name==version` per line).
///
/// Editable installs, direct URL requirements and comments have no
/// comparable version and are skipped.
pub fn parse_pip_freeze(stdout: &str) -> Vec<Package> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('-'))
        .filter_map(|line| {
            let (name, version) = line.split_once("==")?;
            let version = version.trim_start_matches('=').trim();
            let name = name.trim();
            if name.is_empty() || version.is_empty() || name.contains(' ') {
                return None;
            }
            Some(Package::new(name, version))
        })
        .collect()
}

/// Parse `conda list --json` output.
pub fn parse_conda_json(stdout: &str) -> Result<Vec<Package>, String> {
    let entries: Vec<ListEntry> = serde_json::from_str(stdout.trim()).map_err(|e| e.to_string())?;
    Ok(entries
        .into_iter()
        .map(|e| Package::new(e.name, e.version))
        .collect())
}

/// Extract the `Version:` field from `pip show` output.
pub fn parse_show_version(stdout: &str) -> Option<String> {
    stdout.lines().find_map(|line| {
        line.strip_prefix("Version:")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pip_json_parses_entries() {
        let out = r#"[{"name": "requests", "version": "2.28.0"}, {"name": "black", "version": "23.1.0", "editable_project_location": "/src/black"}]"#;
        let pkgs = parse_pip_json(out).unwrap();
        assert_eq!(pkgs.len(), 2);
        assert_eq!(pkgs[0], Package::new("requests", "2.28.0"));
        assert_eq!(pkgs[1].name, "black");
    }

    #[test]
    fn pip_json_skips_leading_noise() {
        let out = "WARNING: something odd\n[{\"name\": \"rich\", \"version\": \"13.7.0\"}]\n";
        let pkgs = parse_pip_json(out).unwrap();
        assert_eq!(pkgs, vec![Package::new("rich", "13.7.0")]);
    }

    #[test]
    fn pip_json_rejects_garbage() {
        assert!(parse_pip_json("Usage: pip list").is_err());
        assert!(parse_pip_json("[{\"name\": 1}]").is_err());
    }

    #[test]
    fn freeze_parses_pinned_lines() {
        let out = "requests==2.28.0\n-e git+https://github.com/x/y.git#egg=y\nfoo @ file:///tmp/foo\n# comment\nweird===1.0-custom\n\n";
        let pkgs = parse_pip_freeze(out);
        assert_eq!(
            pkgs,
            vec![
                Package::new("requests", "2.28.0"),
                Package::new("weird", "1.0-custom")
            ]
        );
    }

    #[test]
    fn conda_json_parses_entries() {
        let out = r#"[
          {"base_url": "https://repo.anaconda.com/pkgs/main", "channel": "pkgs/main", "name": "numpy", "version": "1.26.0", "build_string": "py311"},
          {"base_url": "https://pypi.org", "channel": "pypi", "name": "httpx", "version": "0.27.0"}
        ]"#;
        let pkgs = parse_conda_json(out).unwrap();
        assert_eq!(pkgs.len(), 2);
        assert_eq!(pkgs[1], Package::new("httpx", "0.27.0"));
    }

    #[test]
    fn conda_error_object_is_malformed() {
        let out = r#"{"error": "EnvironmentLocationNotFound: Not a conda environment"}"#;
        assert!(parse_conda_json(out).is_err());
    }

    #[test]
    fn show_version_extracts_field() {
        let out = "Name: requests\nVersion: 2.31.0\nSummary: HTTP for Humans.\n";
        assert_eq!(parse_show_version(out), Some("2.31.0".to_string()));
        assert_eq!(parse_show_version("Name: x\n"), None);
    }
}
