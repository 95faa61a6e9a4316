//! Configuration loading, preset overlays, and validation.
//!
//! Configuration is YAML. A file either describes the whole setup, or it is
//! an overlay on a preset (it names a `preset`, or uses `add_feeds`,
//! `remove_feeds`, `add_keywords`, `remove_keywords` or `max_items`).
//! After merging, [`ConfigFile::validate`] turns the loose file shape into a
//! [`PipelineConfig`] with every default applied and the keyword taxonomy
//! compiled. Validation runs before the pipeline touches any file.

use crate::classify::{KeywordClassifier, TopicKeywords};
use crate::scoring::{DEFAULT_MAX_ITEMS, DEFAULT_SOURCE_WEIGHT, SourceWeights};
use crate::seen::DEFAULT_RETENTION_DAYS;
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Preset used when an overlay does not name one.
pub const DEFAULT_PRESET: &str = "ai-engineering";

const BUILTIN_AI_ENGINEERING: &str = include_str!("../presets/ai-engineering.yaml");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("preset not found: {0}")]
    UnknownPreset(String),
    #[error("keyword taxonomy is empty; configure at least one topic under `keywords`")]
    MissingKeywords,
    #[error("topic '{0}' has no keywords")]
    EmptyTopic(String),
    #[error("topic '{0}' has a blank keyword")]
    BlankKeyword(String),
    #[error("scoring.max_items must be at least 1, got {0}")]
    InvalidMaxItems(i64),
    #[error("retention.seen_urls_days must be at least 1, got {0}")]
    InvalidRetention(i64),
    #[error("weight for source '{0}' is not a finite number")]
    InvalidWeight(String),
    #[error("keyword taxonomy cannot be compiled: {0}")]
    Pattern(#[from] regex::Error),
}

/// Topic → keywords, in the order they appear in the file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Taxonomy(pub Vec<TopicKeywords>);

impl Taxonomy {
    /// Replace a topic's keywords in place, or append a new topic.
    pub fn upsert(&mut self, topic: TopicKeywords) {
        match self.0.iter_mut().find(|t| t.topic == topic.topic) {
            Some(existing) => existing.keywords = topic.keywords,
            None => self.0.push(topic),
        }
    }

    pub fn remove(&mut self, topic: &str) {
        self.0.retain(|t| t.topic != topic);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for Taxonomy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TaxonomyVisitor;

        impl<'de> Visitor<'de> for TaxonomyVisitor {
            type Value = Taxonomy;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping of topic names to keyword lists")
            }

            fn visit_unit<E: de::Error>(self) -> Result<Taxonomy, E> {
                Ok(Taxonomy::default())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Taxonomy, A::Error> {
                let mut topics = Vec::new();
                while let Some((topic, keywords)) = map.next_entry::<String, Vec<String>>()? {
                    topics.push(TopicKeywords { topic, keywords });
                }
                Ok(Taxonomy(topics))
            }
        }

        deserializer.deserialize_any(TaxonomyVisitor)
    }
}

/// One configured feed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeedConfig {
    pub name: String,
    pub url: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub is_release: bool,
}

fn default_weight() -> f64 {
    DEFAULT_SOURCE_WEIGHT
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ScoringSection {
    pub max_items: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RetentionSection {
    pub seen_urls_days: Option<i64>,
}

/// Hacker News front-page collection settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HnSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_min_points")]
    pub min_points: i64,
    #[serde(default = "default_hn_limit")]
    pub limit: u32,
}

impl Default for HnSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            min_points: default_min_points(),
            limit: default_hn_limit(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_min_points() -> i64 {
    100
}

fn default_hn_limit() -> u32 {
    200
}

/// The loose, as-written shape of a config or preset file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConfigFile {
    pub preset: Option<String>,
    #[serde(default)]
    pub feeds: Vec<FeedConfig>,
    #[serde(default)]
    pub keywords: Taxonomy,
    #[serde(default)]
    pub scoring: ScoringSection,
    #[serde(default)]
    pub retention: RetentionSection,
    /// Trust weights for sources that are not feeds, such as "Hacker News".
    #[serde(default)]
    pub weights: HashMap<String, f64>,
    #[serde(default)]
    pub hn: HnSettings,
    #[serde(default)]
    pub tavily_queries: Vec<String>,
    pub schedule_time: Option<String>,
    pub timezone: Option<String>,

    // Overlay keys.
    #[serde(default)]
    pub add_feeds: Vec<FeedConfig>,
    #[serde(default)]
    pub remove_feeds: Vec<String>,
    #[serde(default)]
    pub add_keywords: Taxonomy,
    #[serde(default)]
    pub remove_keywords: Vec<String>,
    pub max_items: Option<i64>,
}

/// Validated settings passed by reference through every stage.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub feeds: Vec<FeedConfig>,
    pub taxonomy: Vec<TopicKeywords>,
    pub classifier: KeywordClassifier,
    pub source_weights: SourceWeights,
    pub max_items: usize,
    pub retention_days: u32,
    pub hn: HnSettings,
    pub tavily_queries: Vec<String>,
}

impl ConfigFile {
    /// Parse a YAML document. `origin` only labels errors.
    pub fn from_yaml(yaml: &str, origin: &Path) -> Result<Self, ConfigError> {
        // An empty document is null, which is the same as `{}` here.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&yaml, path)
    }

    /// Whether this file layers on a preset rather than standing alone.
    pub fn is_overlay(&self) -> bool {
        self.preset.is_some()
            || !self.add_feeds.is_empty()
            || !self.remove_feeds.is_empty()
            || !self.add_keywords.is_empty()
            || !self.remove_keywords.is_empty()
            || self.max_items.is_some()
    }

    /// Layer `overlay` on top of `self`.
    ///
    /// Only overlay keys and `schedule_time`/`timezone` are read from the
    /// overlay; the preset's own sections are kept otherwise.
    pub fn apply_overlay(mut self, overlay: &ConfigFile) -> ConfigFile {
        self.feeds.extend(overlay.add_feeds.iter().cloned());
        if !overlay.remove_feeds.is_empty() {
            self.feeds.retain(|f| !overlay.remove_feeds.contains(&f.name));
        }
        for topic in &overlay.add_keywords.0 {
            self.keywords.upsert(topic.clone());
        }
        for topic in &overlay.remove_keywords {
            self.keywords.remove(topic);
        }
        if let Some(max_items) = overlay.max_items {
            self.scoring.max_items = Some(max_items);
        }
        if overlay.schedule_time.is_some() {
            self.schedule_time = overlay.schedule_time.clone();
        }
        if overlay.timezone.is_some() {
            self.timezone = overlay.timezone.clone();
        }
        self
    }

    /// Check every value and apply defaults.
    pub fn validate(self) -> Result<PipelineConfig, ConfigError> {
        if self.keywords.is_empty() {
            return Err(ConfigError::MissingKeywords);
        }
        for topic in &self.keywords.0 {
            if topic.keywords.is_empty() {
                return Err(ConfigError::EmptyTopic(topic.topic.clone()));
            }
            if topic.keywords.iter().any(|k| k.trim().is_empty()) {
                return Err(ConfigError::BlankKeyword(topic.topic.clone()));
            }
        }

        let max_items = self.scoring.max_items.unwrap_or(DEFAULT_MAX_ITEMS as i64);
        if max_items < 1 {
            return Err(ConfigError::InvalidMaxItems(max_items));
        }
        let retention = self
            .retention
            .seen_urls_days
            .unwrap_or(i64::from(DEFAULT_RETENTION_DAYS));
        let retention_days =
            u32::try_from(retention).map_err(|_| ConfigError::InvalidRetention(retention))?;
        if retention_days == 0 {
            return Err(ConfigError::InvalidRetention(retention));
        }

        let mut weights = HashMap::new();
        for feed in &self.feeds {
            weights.insert(feed.name.clone(), feed.weight);
        }
        for (source, weight) in &self.weights {
            weights.insert(source.clone(), *weight);
        }
        if let Some((source, _)) = weights.iter().find(|(_, w)| !w.is_finite()) {
            return Err(ConfigError::InvalidWeight(source.clone()));
        }

        let classifier = KeywordClassifier::new(&self.keywords.0)?;
        debug!(
            topics = self.keywords.0.len(),
            feeds = self.feeds.len(),
            max_items,
            retention_days,
            "Validated configuration"
        );

        Ok(PipelineConfig {
            feeds: self.feeds,
            taxonomy: self.keywords.0,
            classifier,
            source_weights: SourceWeights::new(weights),
            max_items: max_items as usize,
            retention_days,
            hn: self.hn,
            tavily_queries: self.tavily_queries,
        })
    }
}

/// Load a preset by name: `blank`, a file in `preset_dir`, or a built-in.
pub fn load_preset(name: &str, preset_dir: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    if name == "blank" {
        return Ok(ConfigFile::default());
    }
    if let Some(dir) = preset_dir {
        let path = dir.join(format!("{name}.yaml"));
        if path.exists() {
            return ConfigFile::load(&path);
        }
    }
    match name {
        DEFAULT_PRESET => ConfigFile::from_yaml(
            BUILTIN_AI_ENGINEERING,
            Path::new("presets/ai-engineering.yaml"),
        ),
        other => Err(ConfigError::UnknownPreset(other.to_string())),
    }
}

/// Resolve the effective configuration.
///
/// - With an explicit `config_path`, the file must exist. An overlay file is
///   merged onto its preset; any other file is used as-is.
/// - Without one, `default_path` is read if it exists and always merged onto
///   a preset, so a missing user config means "preset only".
pub fn resolve_config(
    config_path: Option<&Path>,
    default_path: &Path,
    preset_dir: Option<&Path>,
) -> Result<ConfigFile, ConfigError> {
    if let Some(path) = config_path {
        let user = ConfigFile::load(path)?;
        if !user.is_overlay() {
            info!(path = %path.display(), "Using standalone config");
            return Ok(user);
        }
        return overlay_on_preset(user, preset_dir);
    }

    let user = if default_path.exists() {
        ConfigFile::load(default_path)?
    } else {
        debug!(path = %default_path.display(), "No user config; using preset defaults");
        ConfigFile::default()
    };
    overlay_on_preset(user, preset_dir)
}

fn overlay_on_preset(user: ConfigFile, preset_dir: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    let preset = user.preset.as_deref().unwrap_or(DEFAULT_PRESET);
    info!(preset, "Applying config overlay on preset");
    Ok(load_preset(preset, preset_dir)?.apply_overlay(&user))
}
