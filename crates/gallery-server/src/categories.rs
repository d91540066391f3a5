//! Keyword categories derived from file names.

use std::collections::{BTreeMap, HashMap};

use crate::catalog::CatalogEntry;

/// Category assigned when no keyword matches.
pub const FALLBACK_CATEGORY: &str = "general";

const DEFAULT_CATEGORIES: &[(&str, &[&str])] = &[
    ("concert", &["concert", "live-set", "gig", "festival"]),
    ("gaming", &["gameplay", "speedrun", "lets-play", "walkthrough"]),
    ("home-video", &["homemade", "home-video", "family", "birthday"]),
    ("music", &["music-video", "musicvideo", "album", "cover-song"]),
    ("nature", &["nature", "wildlife", "forest", "ocean"]),
    ("sports", &["match", "highlights", "soccer", "football", "tennis"]),
    ("travel", &["travel", "vacation", "roadtrip", "road-trip", "beach"]),
    ("tutorial", &["tutorial", "howto", "how-to", "lesson", "course"]),
    ("vlog", &["vlog", "daily", "diary"]),
];

/// Ordered keyword table: a file name belongs to every category with at
/// least one keyword contained in its lowercased name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategoryMap {
    categories: BTreeMap<String, Vec<String>>,
}

impl Default for CategoryMap {
    fn default() -> Self {
        Self::new(
            DEFAULT_CATEGORIES
                .iter()
                .map(|(name, keywords)| {
                    (
                        name.to_string(),
                        keywords.iter().map(|k| k.to_string()).collect(),
                    )
                })
                .collect(),
        )
    }
}

impl CategoryMap {
    /// Build from a configured table. Names and keywords are lowercased;
    /// blank keywords are dropped.
    pub fn new(table: HashMap<String, Vec<String>>) -> Self {
        let categories = table
            .into_iter()
            .map(|(name, keywords)| {
                let keywords = keywords
                    .into_iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect();
                (name.trim().to_lowercase(), keywords)
            })
            .filter(|(name, _)| !name.is_empty())
            .collect();
        Self { categories }
    }

    /// Categories of `file_name`, never empty.
    pub fn categorize(&self, file_name: &str) -> Vec<String> {
        let name = file_name.to_lowercase();
        let matched = self
            .categories
            .iter()
            .filter(|(_, keywords)| keywords.iter().any(|k| name.contains(k.as_str())))
            .map(|(category, _)| category.clone())
            .collect::<Vec<_>>();
        if matched.is_empty() {
            vec![FALLBACK_CATEGORY.to_string()]
        } else {
            matched
        }
    }

    pub fn has_category(&self, entry: &CatalogEntry, category: &str) -> bool {
        let wanted = category.trim().to_lowercase();
        self.categorize(&entry.file_name).contains(&wanted)
    }

    /// `(category, count)` over `entries`, most used first, then by name.
    pub fn tally(&self, entries: &[CatalogEntry]) -> Vec<(String, usize)> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for entry in entries {
            for category in self.categorize(&entry.file_name) {
                *counts.entry(category).or_default() += 1;
            }
        }
        let mut out = counts.into_iter().collect::<Vec<_>>();
        out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        out
    }
}
