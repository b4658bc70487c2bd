//! Merging of per-chunk results into one clean item set

use factwire_dedup::{is_similar_fact, SimilarityConfig};
use factwire_domain::{ExtractedItem, Layer, ProviderResult, Region};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Configuration for the [`Merger`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergeConfig {
    /// When two facts count as the same fact
    pub similarity: SimilarityConfig,
}

/// Counts describing one merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeMetadata {
    /// Chunk results merged
    pub total_chunks: usize,
    /// Items across all chunks
    pub original_count: usize,
    /// Items after merging
    pub merged_count: usize,
    /// Items removed as duplicates or for an empty fact
    pub dedup_count: usize,
}

/// Merged items with their counts
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutput {
    /// Deduplicated, conflict-resolved items
    pub items: Vec<ExtractedItem>,
    /// Merge counts
    pub metadata: MergeMetadata,
}

/// Collapses near-duplicate facts and fills unknown labels
#[derive(Debug, Clone, Default)]
pub struct Merger {
    config: MergeConfig,
}

impl Merger {
    /// Create a new merger
    pub fn new(config: MergeConfig) -> Self {
        Self { config }
    }

    /// Merge chunk results in chunk order
    pub fn merge(&self, results: &[ProviderResult]) -> MergeOutput {
        let all_items: Vec<&ExtractedItem> =
            results.iter().flat_map(|result| result.items.iter()).collect();
        let original_count = all_items.len();

        let mut items = self.deduplicate(all_items);
        resolve_conflicts(&mut items);

        let metadata = MergeMetadata {
            total_chunks: results.len(),
            original_count,
            merged_count: items.len(),
            dedup_count: original_count - items.len(),
        };
        info!(
            original = original_count,
            merged = metadata.merged_count,
            "Merged chunk results"
        );

        MergeOutput { items, metadata }
    }

    /// Collapse similar facts; the more confident item survives in the earlier position
    fn deduplicate(&self, items: Vec<&ExtractedItem>) -> Vec<ExtractedItem> {
        let mut kept: Vec<ExtractedItem> = Vec::new();

        for item in items {
            if item.fact.trim().is_empty() {
                continue;
            }

            let existing = kept
                .iter()
                .position(|k| is_similar_fact(&item.fact, &k.fact, &self.config.similarity));

            match existing {
                Some(pos) => {
                    if item.confidence > kept[pos].confidence {
                        debug!(fact = %item.fact, "Replacing duplicate fact with a more confident one");
                        kept[pos] = item.clone();
                    }
                }
                None => kept.push(item.clone()),
            }
        }

        kept
    }
}

/// Replace unknown region and layer with the most frequent known value
///
/// Ties go to the value seen first. If no item has a known value the
/// field stays unknown.
fn resolve_conflicts(items: &mut [ExtractedItem]) {
    let region = most_common(items.iter().map(|item| item.region).filter(Region::is_known));
    let layer = most_common(items.iter().map(|item| item.layer).filter(Layer::is_known));

    for item in items.iter_mut() {
        if let (Region::Unknown, Some(region)) = (item.region, region) {
            item.region = region;
        }
        if let (Layer::Unknown, Some(layer)) = (item.layer, layer) {
            item.layer = layer;
        }
    }
}

fn most_common<T: PartialEq + Copy>(values: impl Iterator<Item = T>) -> Option<T> {
    let mut counts: Vec<(T, usize)> = Vec::new();
    for value in values {
        match counts.iter_mut().find(|(v, _)| *v == value) {
            Some((_, count)) => *count += 1,
            None => counts.push((value, 1)),
        }
    }

    let mut best: Option<(T, usize)> = None;
    for (value, count) in counts {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value)
}

/// Drop low-confidence, short and blank facts
pub fn filter_quality(
    items: Vec<ExtractedItem>,
    min_confidence: f64,
    min_fact_length: usize,
) -> Vec<ExtractedItem> {
    let before = items.len();
    let filtered: Vec<ExtractedItem> = items
        .into_iter()
        .filter(|item| {
            let fact = item.fact.trim();
            if fact.is_empty() {
                debug!("Dropping item with blank fact");
                return false;
            }
            if item.confidence < min_confidence {
                debug!(confidence = item.confidence, "Dropping low-confidence item");
                return false;
            }
            if fact.chars().count() < min_fact_length {
                debug!(fact = %fact, "Dropping short fact");
                return false;
            }
            true
        })
        .collect();

    info!("Quality filter: {} -> {}", before, filtered.len());
    filtered
}

/// Drop items below their layer's finance-relevance floor
pub fn filter_relevance(items: Vec<ExtractedItem>) -> Vec<ExtractedItem> {
    let before = items.len();
    let filtered: Vec<ExtractedItem> = items
        .into_iter()
        .filter(|item| {
            let keep = item.finance_relevance >= item.layer.min_finance_relevance();
            if !keep {
                debug!(
                    layer = %item.layer,
                    relevance = item.finance_relevance,
                    "Dropping item with low finance relevance"
                );
            }
            keep
        })
        .collect();

    info!("Relevance filter: {} -> {}", before, filtered.len());
    filtered
}
