//! HTTP client for the package index.

use regex::Regex;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::LazyLock;
use std::thread;
use std::time::Duration;

use super::{IndexError, IndexSettings};

/// Responses larger than this are rejected.
pub const MAX_RESPONSE_BYTES: u64 = 50 * 1024 * 1024;

const USER_AGENT: &str = concat!("pyscope/", env!("CARGO_PKG_VERSION"));

/// Project metadata from the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectInfo {
    pub name: String,
    pub version: String,
    pub summary: Option<String>,
}

/// Read access to a package index.
pub trait IndexClient: Send + Sync {
    /// Metadata for a project, by exact name.
    fn project(&self, name: &str) -> Result<ProjectInfo, IndexError>;

    /// Projects matching a free-text search.
    fn search_page(&self, term: &str) -> Result<Vec<ProjectInfo>, IndexError>;

    /// Latest published version of a project.
    fn latest_version(&self, name: &str) -> Result<String, IndexError> {
        self.project(name).map(|p| p.version)
    }
}

/// Client for PyPI's JSON API (or a compatible mirror).
#[derive(Debug, Clone)]
pub struct PypiClient {
    client: Client,
    base_url: String,
    attempts: u32,
    retry_pause: Duration,
    max_bytes: u64,
}

impl PypiClient {
    pub fn new(settings: &IndexSettings) -> Result<Self, IndexError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.timeout)
            .build()
            .map_err(|e| IndexError::Network {
                detail: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            base_url: settings.url.trim_end_matches('/').to_string(),
            attempts: settings.retries.max(1),
            retry_pause: settings.retry_pause,
            max_bytes: MAX_RESPONSE_BYTES,
        })
    }

    /// Lower the response size limit.
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>, IndexError> {
        let mut attempt = 1;
        loop {
            match self.fetch_once(url) {
                Err(err) if err.is_retryable() && attempt < self.attempts => {
                    tracing::debug!("Attempt {} for {} failed: {}", attempt, url, err);
                    attempt += 1;
                    thread::sleep(self.retry_pause);
                }
                other => return other,
            }
        }
    }

    fn fetch_once(&self, url: &str) -> Result<Vec<u8>, IndexError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| transport_error(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IndexError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        if response.content_length().is_some_and(|len| len > self.max_bytes) {
            return Err(IndexError::TooLarge {
                limit: self.max_bytes,
            });
        }

        let body = response.bytes().map_err(|e| transport_error(url, &e))?;
        if body.len() as u64 > self.max_bytes {
            return Err(IndexError::TooLarge {
                limit: self.max_bytes,
            });
        }
        Ok(body.to_vec())
    }
}

fn transport_error(url: &str, err: &reqwest::Error) -> IndexError {
    if err.is_timeout() {
        IndexError::Timeout {
            url: url.to_string(),
        }
    } else {
        IndexError::Network {
            detail: err.to_string(),
        }
    }
}

fn not_found_as(name: &str, err: IndexError) -> IndexError {
    match err {
        IndexError::Http { status, .. } if status == StatusCode::NOT_FOUND.as_u16() => {
            IndexError::NotFound {
                name: name.to_string(),
            }
        }
        other => other,
    }
}

impl IndexClient for PypiClient {
    fn project(&self, name: &str) -> Result<ProjectInfo, IndexError> {
        let url = format!("{}/pypi/{}/json", self.base_url, urlencoding::encode(name.trim()));
        let body = self.fetch(&url).map_err(|e| not_found_as(name, e))?;
        parse_project(&body)
    }

    fn search_page(&self, term: &str) -> Result<Vec<ProjectInfo>, IndexError> {
        let url = format!("{}/search/?q={}", self.base_url, urlencoding::encode(term.trim()));
        let body = self.fetch(&url)?;
        Ok(parse_search_html(&String::from_utf8_lossy(&body)))
    }
}

#[derive(Deserialize)]
struct ProjectResponse {
    info: ProjectInfoJson,
}

#[derive(Deserialize)]
struct ProjectInfoJson {
    name: Option<String>,
    version: Option<String>,
    summary: Option<String>,
}

fn parse_project(body: &[u8]) -> Result<ProjectInfo, IndexError> {
    let response: ProjectResponse =
        serde_json::from_slice(body).map_err(|e| IndexError::Malformed {
            detail: e.to_string(),
        })?;
    let info = response.info;
    let version = info
        .version
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| IndexError::Malformed {
            detail: "no info.version in response".to_string(),
        })?;
    Ok(ProjectInfo {
        name: info.name.as_deref().unwrap_or_default().trim().to_string(),
        version: version.to_string(),
        summary: info
            .summary
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
    })
}

static SNIPPET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)<span[^>]*class="[^"]*package-snippet__name[^"]*"[^>]*>([^<]{1,100})</span>.*?<span[^>]*class="[^"]*package-snippet__version[^"]*"[^>]*>([^<]{1,50})</span>"#,
    )
    .unwrap()
});

static DESCRIPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<p[^>]*class="[^"]*package-snippet__description[^"]*"[^>]*>([^<]*)</p>"#)
        .unwrap()
});

/// Extract `(name, version, summary)` triples from the index search page.
pub(crate) fn parse_search_html(html: &str) -> Vec<ProjectInfo> {
    let matches: Vec<_> = SNIPPET.captures_iter(html).collect();
    matches
        .iter()
        .enumerate()
        .filter_map(|(i, caps)| {
            let whole = caps.get(0)?;
            let next = matches
                .get(i + 1)
                .and_then(|c| c.get(0))
                .map_or(html.len(), |m| m.start());
            let summary = DESCRIPTION
                .captures(&html[whole.end()..next])
                .map(|c| decode_entities(c[1].trim()))
                .filter(|s| !s.is_empty());
            let name = decode_entities(caps[1].trim());
            if name.is_empty() {
                return None;
            }
            Some(ProjectInfo {
                name,
                version: decode_entities(caps[2].trim()),
                summary,
            })
        })
        .collect()
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(server: &MockServer) -> PypiClient {
        let settings = IndexSettings {
            url: server.base_url(),
            retry_pause: Duration::from_millis(10),
            ..Default::default()
        };
        PypiClient::new(&settings).unwrap()
    }

    #[test]
    fn reads_latest_version_from_project_json() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/pypi/requests/json");
            then.status(200).json_body(json!({
                "info": {"name": "requests", "version": "2.31.0", "summary": "Python HTTP for Humans."}
            }));
        });

        let client = client(&server);
        assert_eq!(client.latest_version("requests").unwrap(), "2.31.0");
        let project = client.project("requests").unwrap();
        assert_eq!(project.summary.as_deref(), Some("Python HTTP for Humans."));
        mock.assert_calls(2);
    }

    #[test]
    fn sends_user_agent() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/pypi/rich/json")
                .header("user-agent", USER_AGENT);
            then.status(200).json_body(json!({"info": {"version": "13.7.0"}}));
        });
        client(&server).latest_version("rich").unwrap();
        mock.assert();
    }

    #[test]
    fn missing_project_is_not_found_without_retry() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/pypi/ghost/json");
            then.status(404).body("Not Found");
        });

        let err = client(&server).latest_version("ghost").unwrap_err();
        assert_eq!(err, IndexError::NotFound { name: "ghost".into() });
        mock.assert_calls(1);
    }

    #[test]
    fn server_errors_are_retried() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/pypi/flaky/json");
            then.status(503);
        });

        let err = client(&server).latest_version("flaky").unwrap_err();
        assert!(matches!(err, IndexError::Http { status: 503, .. }));
        mock.assert_calls(3);
    }

    #[test]
    fn missing_version_is_malformed() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/pypi/odd/json");
            then.status(200).json_body(json!({"info": {"name": "odd"}}));
        });
        let err = client(&server).latest_version("odd").unwrap_err();
        assert!(matches!(err, IndexError::Malformed { .. }));
    }

    #[test]
    fn oversized_response_is_rejected() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/pypi/huge/json");
            then.status(200).body("x".repeat(2048));
        });
        let err = client(&server)
            .with_max_bytes(1024)
            .latest_version("huge")
            .unwrap_err();
        assert_eq!(err, IndexError::TooLarge { limit: 1024 });
    }

    #[test]
    fn unreachable_index_is_network_error() {
        let settings = IndexSettings {
            url: "http://127.0.0.1:9".to_string(),
            retries: 1,
            ..Default::default()
        };
        let err = PypiClient::new(&settings)
            .unwrap()
            .latest_version("requests")
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn search_page_is_scraped() {
        let html = r#"
<ul>
  <li><a class="package-snippet" href="/project/httpx/">
    <h3 class="package-snippet__title">
      <span class="package-snippet__name">httpx</span>
      <span class="package-snippet__version">0.27.0</span>
    </h3>
    <p class="package-snippet__description">The next generation HTTP client.</p>
  </a></li>
  <li><a class="package-snippet" href="/project/http-tools/">
    <h3 class="package-snippet__title">
      <span class="package-snippet__name">http-tools</span>
      <span class="package-snippet__version">1.0</span>
    </h3>
  </a></li>
</ul>"#;
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/search/").query_param("q", "http client");
            then.status(200).body(html);
        });

        let results = client(&server).search_page("http client").unwrap();
        mock.assert();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].name, "httpx");
        assert_eq!(
            results[0].summary.as_deref(),
            Some("The next generation HTTP client.")
        );
        assert_eq!(results[1].version, "1.0");
        assert!(results[1].summary.is_none());
    }

    #[test]
    fn entities_are_decoded() {
        assert_eq!(decode_entities("a &amp; b &lt;c&gt;"), "a & b <c>");
    }

    #[test]
    fn search_term_is_percent_encoded() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/search/").query_param("q", "a&b=c");
            then.status(200).body("<ul></ul>");
        });
        assert!(client(&server).search_page("a&b=c").unwrap().is_empty());
        mock.assert();
    }

    #[test]
    fn null_fields_in_project_json_are_tolerated() {
        let project = parse_project(
            br#"{"info": {"name": null, "version": " 1.2.0 ", "summary": null}, "releases": {}}"#,
        )
        .unwrap();
        assert_eq!(project.name, "");
        assert_eq!(project.version, "1.2.0");
        assert!(project.summary.is_none());
    }
}
