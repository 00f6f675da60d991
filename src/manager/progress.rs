//! Progress events recognized in package manager output.

use std::fmt;

/// A step reported by pip or conda while an action runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Collecting(String),
    Downloading(String),
    Building(String),
    AlreadySatisfied(String),
    Installing(Vec<String>),
    Installed(Vec<String>),
    Uninstalling(String),
    Uninstalled(String),
    Solving,
    Transaction,
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Collecting(p) => write!(f, "Collecting {}", p),
            Self::Downloading(p) => write!(f, "Downloading {}", p),
            Self::Building(p) => write!(f, "Building {}", p),
            Self::AlreadySatisfied(p) => write!(f, "{} already satisfied", p),
            Self::Installing(pkgs) => write!(f, "Installing {}", pkgs.join(", ")),
            Self::Installed(pkgs) => write!(f, "Installed {}", pkgs.join(", ")),
            Self::Uninstalling(p) => write!(f, "Uninstalling {}", p),
            Self::Uninstalled(p) => write!(f, "Uninstalled {}", p),
            Self::Solving => write!(f, "Solving environment"),
            Self::Transaction => write!(f, "Executing transaction"),
        }
    }
}

fn first_word(rest: &str) -> String {
    rest.split_whitespace().next().unwrap_or_default().to_string()
}

fn word_list(rest: &str) -> Vec<String> {
    rest.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Recognize a single line of output. Unrecognized lines return `None`.
pub fn parse_progress_line(line: &str) -> Option<ProgressEvent> {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix("Collecting ") {
        return Some(ProgressEvent::Collecting(first_word(rest)));
    }
    if let Some(rest) = line.strip_prefix("Downloading ") {
        return Some(ProgressEvent::Downloading(first_word(rest)));
    }
    if let Some(rest) = line.strip_prefix("Building wheel for ") {
        return Some(ProgressEvent::Building(first_word(rest)));
    }
    if let Some(rest) = line.strip_prefix("Requirement already satisfied: ") {
        return Some(ProgressEvent::AlreadySatisfied(first_word(rest)));
    }
    if let Some(rest) = line.strip_prefix("Installing collected packages: ") {
        return Some(ProgressEvent::Installing(word_list(rest)));
    }
    if let Some(rest) = line.strip_prefix("Successfully installed ") {
        return Some(ProgressEvent::Installed(word_list(rest)));
    }
    if let Some(rest) = line.strip_prefix("Successfully uninstalled ") {
        return Some(ProgressEvent::Uninstalled(first_word(rest)));
    }
    if let Some(rest) = line.strip_prefix("Uninstalling ") {
        return Some(ProgressEvent::Uninstalling(
            first_word(rest).trim_end_matches(':').to_string(),
        ));
    }
    if line.starts_with("Solving environment") {
        return Some(ProgressEvent::Solving);
    }
    if line.starts_with("Executing transaction") {
        return Some(ProgressEvent::Transaction);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_pip_install_steps() {
        assert_eq!(
            parse_progress_line("Collecting requests==2.31.0"),
            Some(ProgressEvent::Collecting("requests==2.31.0".into()))
        );
        assert_eq!(
            parse_progress_line("  Downloading requests-2.31.0-py3-none-any.whl (62 kB)"),
            Some(ProgressEvent::Downloading("requests-2.31.0-py3-none-any.whl".into()))
        );
        assert_eq!(
            parse_progress_line("Installing collected packages: urllib3, requests"),
            Some(ProgressEvent::Installing(vec!["urllib3".into(), "requests".into()]))
        );
        assert_eq!(
            parse_progress_line("Successfully installed requests-2.31.0 urllib3-2.0.7"),
            Some(ProgressEvent::Installed(vec![
                "requests-2.31.0".into(),
                "urllib3-2.0.7".into()
            ]))
        );
    }

    #[test]
    fn recognizes_uninstall_steps() {
        assert_eq!(
            parse_progress_line("Found existing installation: requests 2.28.0"),
            None
        );
        assert_eq!(
            parse_progress_line("  Uninstalling requests-2.28.0:"),
            Some(ProgressEvent::Uninstalling("requests-2.28.0".into()))
        );
        assert_eq!(
            parse_progress_line("  Successfully uninstalled requests-2.28.0"),
            Some(ProgressEvent::Uninstalled("requests-2.28.0".into()))
        );
    }

    #[test]
    fn recognizes_conda_steps() {
        assert_eq!(
            parse_progress_line("Solving environment: done"),
            Some(ProgressEvent::Solving)
        );
        assert_eq!(
            parse_progress_line("Executing transaction: done"),
            Some(ProgressEvent::Transaction)
        );
    }

    #[test]
    fn display_is_readable() {
        let event = ProgressEvent::AlreadySatisfied("six".into());
        assert_eq!(event.to_string(), "six already satisfied");
    }

    #[test]
    fn ignores_noise() {
        assert_eq!(parse_progress_line(""), None);
        assert_eq!(parse_progress_line("     |████████| 62 kB 1.2 MB/s"), None);
    }
}
