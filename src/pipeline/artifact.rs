//! Writing generated agents to disk and listing what has been written

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::client::template::OUTPUT_DIR;
use crate::error::{ClientError, ClientResult};
use crate::models::GenerateResponse;

const AGENT_SUFFIX: &str = "_agent.py";

/// Docstring lines scanned for the role
const HEADER_LINES: usize = 20;

const DEFAULT_ROLE: &str = "Agente AI";

/// A generated agent found on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedAgent {
    pub filename: String,
    pub filepath: PathBuf,
    pub name: String,
    pub role: String,
    pub size_bytes: u64,
    pub lines: usize,
    pub modified_at: DateTime<Utc>,
}

/// Write the artifact below `root`, returning the full path written
pub fn save(root: &Path, artifact: &GenerateResponse) -> ClientResult<PathBuf> {
    let relative = Path::new(&artifact.filepath);
    if relative.as_os_str().is_empty() || !relative.components().all(|c| matches!(c, Component::Normal(_))) {
        return Err(ClientError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("artifact path '{}' escapes the output directory", artifact.filepath),
        )));
    }

    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, &artifact.code)?;
    debug!(path = %path.display(), bytes = artifact.size_bytes, "artifact saved");
    Ok(path)
}

/// List generated agents below `root`, newest first
pub fn list(root: &Path) -> ClientResult<Vec<GeneratedAgent>> {
    let dir = root.join(OUTPUT_DIR);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut agents = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        let filename = entry.file_name().to_string_lossy().to_string();
        let Some(name) = filename.strip_suffix(AGENT_SUFFIX) else {
            continue;
        };
        let name = name.to_string();
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }

        let content = match fs::read_to_string(entry.path()) {
            Ok(content) => content,
            Err(e) => {
                warn!(file = %filename, error = %e, "skipping unreadable artifact");
                continue;
            }
        };
        let modified_at = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        agents.push(GeneratedAgent {
            filepath: entry.path(),
            role: docstring_role(&content).unwrap_or_else(|| DEFAULT_ROLE.to_string()),
            lines: content.lines().count(),
            size_bytes: metadata.len(),
            modified_at,
            filename,
            name,
        });
    }

    agents.sort_by(|a, b| {
        b.modified_at
            .cmp(&a.modified_at)
            .then_with(|| a.filename.cmp(&b.filename))
    });
    Ok(agents)
}

/// Role recorded on the `Rol:` line of the module docstring
fn docstring_role(content: &str) -> Option<String> {
    let mut in_docstring = false;
    for line in content.lines().take(HEADER_LINES) {
        if line.contains("\"\"\"") {
            if in_docstring {
                return None;
            }
            in_docstring = true;
            continue;
        }
        if in_docstring {
            if let Some(role) = line.trim().strip_prefix("Rol:") {
                return Some(role.trim().to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::template;
    use crate::models::AgentPlan;
    use tempfile::TempDir;

    fn artifact(name: &str, role: &str) -> GenerateResponse {
        template::build_response(AgentPlan::new(name, role), "2024-01-01T00:00:00Z".to_string())
    }

    #[test]
    fn test_save_and_list() {
        let temp_dir = TempDir::new().unwrap();
        let path = save(temp_dir.path(), &artifact("news_search", "Searches news")).unwrap();
        assert!(path.ends_with("generated/agents/news_search_agent.py"));
        assert!(path.exists());

        let agents = list(temp_dir.path()).unwrap();
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].name, "news_search");
        assert_eq!(agents[0].role, "Searches news");
        assert_eq!(agents[0].filename, "news_search_agent.py");
        assert!(agents[0].lines > 10);
    }

    #[test]
    fn test_save_rejects_escaping_names() {
        let temp_dir = TempDir::new().unwrap();
        let err = save(temp_dir.path(), &artifact("../../etc/evil", "x")).unwrap_err();
        match err {
            ClientError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::InvalidInput),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(list(temp_dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        assert!(list(temp_dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_list_ignores_other_files() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join(OUTPUT_DIR);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("notes.txt"), "hello").unwrap();
        fs::write(dir.join("bare_agent.py"), "print('hi')\n").unwrap();

        let agents = list(temp_dir.path()).unwrap();
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].role, DEFAULT_ROLE);
    }
}
