//! Filtered, ordered and paginated views over a catalog scan.

use std::cmp::Ordering;
use std::path::Path;

use gallery_types::SortOrder;

use crate::artifacts::ArtifactTargets;
use crate::catalog::{CatalogEntry, Scanner};
use crate::categories::CategoryMap;
use crate::errors::CatalogError;
use crate::naming::{DisplayInfo, extract};
use crate::shuffle::shuffled_indices;

/// One listing request, with a zero-based start index.
#[derive(Clone, Debug, Default)]
pub struct CatalogQuery {
    pub start: usize,
    pub limit: usize,
    pub search: Option<String>,
    pub collection: Option<String>,
    pub category: Option<String>,
    pub sort: SortOrder,
}

impl CatalogQuery {
    fn search_term(&self) -> Option<String> {
        non_blank(self.search.as_deref()).map(str::to_lowercase)
    }

    fn collection_filter(&self) -> Option<&str> {
        non_blank(self.collection.as_deref())
    }

    fn category_filter(&self) -> Option<&str> {
        non_blank(self.category.as_deref())
    }
}

/// A catalog entry with its presentation and artifact state.
#[derive(Clone, Debug)]
pub struct EnrichedEntry {
    pub entry: CatalogEntry,
    pub info: DisplayInfo,
    pub categories: Vec<String>,
    pub targets: ArtifactTargets,
    pub thumbnail_exists: bool,
    pub preview_exists: bool,
}

impl EnrichedEntry {
    pub fn new(entry: CatalogEntry, categories: &CategoryMap, artifacts_dir: &Path) -> Self {
        let info = extract(&entry.file_name);
        let categories = categories.categorize(&entry.file_name);
        let targets = ArtifactTargets::for_entry(&entry, artifacts_dir);
        Self {
            thumbnail_exists: targets.thumbnail.is_file(),
            preview_exists: targets.preview.is_file(),
            entry,
            info,
            categories,
            targets,
        }
    }
}

#[derive(Clone, Debug)]
pub struct QueryPage {
    pub items: Vec<EnrichedEntry>,
    pub has_more: bool,
    /// Number of entries matching the filters in the scan that served this page.
    pub total: usize,
}

/// Scan the catalog and return one page of `query` under `seed`.
pub fn run(
    scanner: &Scanner,
    seed: f64,
    categories: &CategoryMap,
    artifacts_dir: &Path,
    query: &CatalogQuery,
) -> Result<QueryPage, CatalogError> {
    let (window, total) = select(scanner.scan()?, seed, categories, query);
    let has_more = query.start + window.len() < total;
    let items = window
        .into_iter()
        .map(|entry| EnrichedEntry::new(entry, categories, artifacts_dir))
        .collect();
    Ok(QueryPage {
        items,
        has_more,
        total,
    })
}

/// Filter, order and window a scan. Returns the page and the filtered total.
pub fn select(
    entries: Vec<CatalogEntry>,
    seed: f64,
    categories: &CategoryMap,
    query: &CatalogQuery,
) -> (Vec<CatalogEntry>, usize) {
    let search = query.search_term();
    let collection = query.collection_filter();
    let category = query.category_filter();
    let filtered = collection.is_some() || search.is_some() || category.is_some();

    let mut matches = entries
        .into_iter()
        .filter(|entry| collection.is_none_or(|c| entry.collection.as_deref() == Some(c)))
        .filter(|entry| search.as_deref().is_none_or(|term| matches_search(entry, term)))
        .filter(|entry| category.is_none_or(|c| categories.has_category(entry, c)))
        .collect::<Vec<_>>();

    match query.sort {
        SortOrder::Random if !filtered => {
            let mut slots = matches.into_iter().map(Some).collect::<Vec<_>>();
            matches = shuffled_indices(seed, slots.len())
                .into_iter()
                .filter_map(|i| slots[i].take())
                .collect();
        }
        SortOrder::Random => {}
        SortOrder::Newest => matches.sort_by(by_modified_desc),
        SortOrder::Oldest => matches.sort_by(by_modified),
        SortOrder::Name => matches.sort_by_cached_key(|entry| extract(&entry.file_name).title.to_lowercase()),
    }

    let total = matches.len();
    let window = matches
        .into_iter()
        .skip(query.start)
        .take(query.limit)
        .collect();
    (window, total)
}

/// Case-insensitive containment over title, collection display name and file name.
pub fn matches_search(entry: &CatalogEntry, term_lower: &str) -> bool {
    if extract(&entry.file_name).title.to_lowercase().contains(term_lower) {
        return true;
    }
    if entry
        .collection_display_name()
        .is_some_and(|name| name.to_lowercase().contains(term_lower))
    {
        return true;
    }
    entry.file_name.to_lowercase().contains(term_lower)
}

/// Ascending by modification time; unknown times sort last.
fn by_modified(a: &CatalogEntry, b: &CatalogEntry) -> Ordering {
    match (a.modified, b.modified) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Descending by modification time; unknown times still sort last.
fn by_modified_desc(a: &CatalogEntry, b: &CatalogEntry) -> Ordering {
    match (a.modified, b.modified) {
        (Some(a), Some(b)) => b.cmp(&a),
        _ => by_modified(a, b),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
