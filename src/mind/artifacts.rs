use std::{
    path::{Path, PathBuf},
    sync::{Arc, LazyLock},
};

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::mind::error::{MindError, mind_not_found};

pub const META_AXIOMS_PATH: &str = "artifacts/meta_axioms.md";
pub const DECISION_HEURISTICS_PATH: &str = "artifacts/decision_heuristics.md";
pub const TASK_PLAYBOOK_PATH: &str = "sources/documents/task_management_playbook.md";
pub const SYSTEM_PROMPT_PATH: &str = "system_prompts/system_prompt.md";

pub const DEFAULT_MIND_ID: &str = "pedro_valerio";

static YAML_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```ya?ml\r?\n([\s\S]*?)\r?\n```").expect("yaml block pattern is valid")
});

/// Where a mind may live on disk, in lookup order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLocations {
    pub mind_id: String,
    pub primary: PathBuf,
    pub legacy: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBase {
    pub path: PathBuf,
    pub legacy: bool,
}

impl ArtifactLocations {
    pub fn for_mind(root: impl AsRef<Path>, mind_id: &str) -> Self {
        let root = root.as_ref();
        Self {
            mind_id: mind_id.to_string(),
            primary: root.join("minds").join(mind_id),
            legacy: root.join("outputs").join("minds").join(mind_id),
        }
    }

    pub async fn resolve(&self) -> Result<ResolvedBase, MindError> {
        if tokio::fs::try_exists(&self.primary).await.unwrap_or(false) {
            return Ok(ResolvedBase {
                path: self.primary.clone(),
                legacy: false,
            });
        }
        if tokio::fs::try_exists(&self.legacy).await.unwrap_or(false) {
            tracing::warn!(
                target: "mind",
                mind_id = %self.mind_id,
                legacy_path = %self.legacy.display(),
                preferred_path = %self.primary.display(),
                "mind_loaded_from_deprecated_location"
            );
            return Ok(ResolvedBase {
                path: self.legacy.clone(),
                legacy: true,
            });
        }
        Err(mind_not_found(&self.mind_id, &self.primary, &self.legacy))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "content", rename_all = "snake_case")]
pub enum SectionBody {
    Text(String),
    Structured(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactSection {
    pub title: String,
    pub body: SectionBody,
}

/// A markdown document split on its top-level `# ` headings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MarkdownArtifact {
    pub sections: Vec<ArtifactSection>,
}

impl MarkdownArtifact {
    pub fn parse(content: &str) -> Self {
        let mut raw_sections: Vec<(String, Vec<&str>)> = Vec::new();
        for line in content.lines() {
            if let Some(title) = line.strip_prefix("# ") {
                raw_sections.push((title.trim().to_string(), Vec::new()));
            } else if let Some((_, lines)) = raw_sections.last_mut() {
                lines.push(line);
            }
        }

        let sections = raw_sections
            .into_iter()
            .map(|(title, lines)| {
                let text = lines.join("\n").trim().to_string();
                let body = parse_section_body(&title, text);
                ArtifactSection { title, body }
            })
            .collect();
        Self { sections }
    }

    pub fn section(&self, title: &str) -> Option<&SectionBody> {
        self.sections
            .iter()
            .find(|section| section.title == title)
            .map(|section| &section.body)
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|section| section.title.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

fn parse_section_body(title: &str, text: String) -> SectionBody {
    let Some(captures) = YAML_BLOCK.captures(&text) else {
        return SectionBody::Text(text);
    };
    match serde_yaml::from_str::<Value>(&captures[1]) {
        Ok(value) => SectionBody::Structured(value),
        Err(err) => {
            tracing::warn!(
                target: "mind",
                section = %title,
                error = %err,
                "artifact_yaml_section_unparseable"
            );
            SectionBody::Text(text)
        }
    }
}

/// Read-only textual artifacts of one mind.
#[derive(Debug, Clone, PartialEq)]
pub struct MindArtifacts {
    pub base_path: PathBuf,
    pub meta_axioms: Arc<MarkdownArtifact>,
    pub decision_heuristics: Arc<MarkdownArtifact>,
    pub task_playbook: Arc<MarkdownArtifact>,
    pub system_prompt: Arc<str>,
}

impl MindArtifacts {
    pub fn keys(&self) -> Vec<&'static str> {
        vec![
            "meta_axioms",
            "decision_heuristics",
            "task_playbook",
            "system_prompt",
        ]
    }
}
