//! Preset templates: trigger keywords plus a system prompt.
//!
//! Presets are on-disk files, one per file, with YAML frontmatter
//! declaring the trigger keywords and a markdown body that becomes the
//! system prompt. The store reads the directory eagerly on every lookup
//! so edits are picked up without a restart, and seeds the bundled
//! default on first run.

use anyhow::Result;
use ncore::ChatMessage;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// The preset bundled as the first-run default.
const DEFAULT_PRESET: &str = include_str!("../presets/assistant.md");

/// YAML frontmatter of a preset file.
#[derive(Deserialize)]
struct PresetFrontmatter {
    keywords: Vec<String>,
}

/// A parsed preset.
#[derive(Debug, Clone)]
pub struct PresetTemplate {
    /// Keywords that select this preset.
    pub keywords: Vec<String>,
    /// The system prompt template.
    pub system_prompt: String,
}

impl PresetTemplate {
    /// The system prompts a session built from this preset starts with.
    pub fn system_prompts(&self) -> Vec<ChatMessage> {
        vec![ChatMessage::system(self.system_prompt.clone())]
    }
}

/// Parse a preset file (YAML frontmatter + markdown body).
pub fn parse_preset(content: &str) -> Result<PresetTemplate> {
    let (frontmatter, body) = split_yaml_frontmatter(content)?;
    let fm: PresetFrontmatter = serde_yml::from_str(frontmatter)?;
    if fm.keywords.is_empty() {
        anyhow::bail!("preset declares no keywords");
    }

    Ok(PresetTemplate {
        keywords: fm.keywords,
        system_prompt: body.trim().to_owned(),
    })
}

/// Split `---` delimited YAML frontmatter from the body.
fn split_yaml_frontmatter(content: &str) -> Result<(&str, &str)> {
    let rest = content
        .strip_prefix("---")
        .ok_or_else(|| anyhow::anyhow!("preset is missing YAML frontmatter"))?;
    let Some((frontmatter, body)) = rest.split_once("\n---") else {
        anyhow::bail!("preset frontmatter is not terminated");
    };
    Ok((frontmatter, body))
}

/// On-disk preset storage.
pub struct PresetStore {
    dir: PathBuf,
}

impl PresetStore {
    /// Create a store over the given directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The default preset directory under the user's config dir.
    pub fn default_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("narwhal")
            .join("presets")
    }

    /// The directory this store reads from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read every preset from disk, seeding the bundled default when the
    /// directory does not exist yet. No caching across calls.
    pub fn load_all(&self) -> Result<Vec<PresetTemplate>> {
        self.ensure_seeded()?;

        let mut entries: Vec<_> = fs::read_dir(&self.dir)?.filter_map(|e| e.ok()).collect();
        entries.sort_by_key(|entry| entry.file_name());

        let mut presets = Vec::with_capacity(entries.len());
        for entry in entries {
            if !entry.path().is_file() {
                continue;
            }
            let content = fs::read_to_string(entry.path())?;
            presets.push(parse_preset(&content)?);
        }
        Ok(presets)
    }

    /// Find a preset by trigger keyword. Reloads from disk.
    pub fn get(&self, keyword: &str) -> Result<PresetTemplate> {
        self.load_all()?
            .into_iter()
            .find(|preset| preset.keywords.iter().any(|k| k == keyword))
            .ok_or_else(|| anyhow::anyhow!("no preset found for keyword `{keyword}`"))
    }

    /// The bundled default preset.
    pub fn default_preset(&self) -> Result<PresetTemplate> {
        self.get("assistant")
    }

    /// The keyword lists of every preset.
    pub fn list(&self) -> Result<Vec<String>> {
        Ok(self
            .load_all()?
            .iter()
            .map(|preset| preset.keywords.join(", "))
            .collect())
    }

    fn ensure_seeded(&self) -> Result<()> {
        if self.dir.exists() {
            return Ok(());
        }
        tracing::debug!("seeding default presets into {}", self.dir.display());
        fs::create_dir_all(&self.dir)?;
        fs::write(self.dir.join("assistant.md"), DEFAULT_PRESET)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_preset, split_yaml_frontmatter};

    #[test]
    fn parses_frontmatter_and_body() {
        let preset = parse_preset(
            "---\nkeywords: [poet, bard]\n---\n\nYou are a poet. Answer in verse.\n",
        )
        .unwrap();
        assert_eq!(preset.keywords, ["poet", "bard"]);
        assert_eq!(preset.system_prompt, "You are a poet. Answer in verse.");
    }

    #[test]
    fn rejects_missing_frontmatter() {
        assert!(parse_preset("just a prompt").is_err());
        assert!(parse_preset("---\nkeywords: [x]\nno terminator").is_err());
    }

    #[test]
    fn rejects_empty_keywords() {
        assert!(parse_preset("---\nkeywords: []\n---\nbody").is_err());
    }

    #[test]
    fn split_keeps_body_intact() {
        let (fm, body) = split_yaml_frontmatter("---\na: 1\n---\nhello\n---\nworld").unwrap();
        assert_eq!(fm, "\na: 1");
        assert_eq!(body, "\nhello\n---\nworld");
    }
}
