//! Token-budget-aware chunking of long documents

use factwire_domain::language::is_cjk;
use factwire_domain::Language;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

/// Tokens per English word
const TOKENS_PER_WORD: f64 = 1.3;

/// Estimate the token count of `text`
///
/// Chinese counts one token per character, English 1.3 tokens per
/// whitespace-separated word, mixed text the CJK characters plus 1.3 per
/// remaining word.
pub fn estimate_tokens(text: &str, lang: Language) -> usize {
    if text.is_empty() {
        return 0;
    }

    match lang {
        Language::Zh => text.chars().count(),
        Language::En => words_to_tokens(text.split_whitespace().count()),
        Language::Mixed => {
            let cjk = text.chars().filter(|c| is_cjk(*c)).count();
            let rest: String = text.chars().filter(|c| !is_cjk(*c)).collect();
            cjk + words_to_tokens(rest.split_whitespace().count())
        }
    }
}

fn words_to_tokens(words: usize) -> usize {
    (words as f64 * TOKENS_PER_WORD) as usize
}

/// Classify the dominant language of `text`
pub fn detect_language(text: &str) -> Language {
    Language::detect(text)
}

/// What to do when a document needs more chunks than allowed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DegradeStrategy {
    /// Keep the first `max_chunks` chunks and drop the rest
    #[default]
    #[serde(rename = "summary_then_extract")]
    SummaryThenExtract,

    /// Keep the first `max_chunks - 1` chunks plus an overall-summary placeholder
    #[serde(rename = "headN_plus_overall")]
    HeadNPlusOverall,
}

impl DegradeStrategy {
    /// Get the strategy name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            DegradeStrategy::SummaryThenExtract => "summary_then_extract",
            DegradeStrategy::HeadNPlusOverall => "headN_plus_overall",
        }
    }

    /// Parse a strategy name (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "summary_then_extract" => Some(DegradeStrategy::SummaryThenExtract),
            "headn_plus_overall" => Some(DegradeStrategy::HeadNPlusOverall),
            _ => None,
        }
    }
}

impl fmt::Display for DegradeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DegradeStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid degrade strategy: {}", s))
    }
}

/// One unit of text sent to a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk text, including any overlap
    pub text: String,

    /// Estimated tokens of `text`
    pub estimated_tokens: usize,

    /// Leading characters repeated from the previous chunk
    pub overlap_chars: usize,

    /// Synthetic placeholder rather than source text
    #[serde(default)]
    pub synthetic: bool,
}

impl Chunk {
    fn new(text: String, lang: Language, overlap_chars: usize) -> Self {
        let estimated_tokens = estimate_tokens(&text, lang);
        Self {
            text,
            estimated_tokens,
            overlap_chars,
            synthetic: false,
        }
    }

    /// Characters of `text` that do not repeat the previous chunk
    pub fn new_chars(&self) -> usize {
        self.text.chars().count().saturating_sub(self.overlap_chars)
    }
}

/// A plan that had to give up part of the document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegradedPlan {
    /// Strategy that produced this plan
    pub strategy: DegradeStrategy,

    /// Chunks to extract
    pub chunks: Vec<Chunk>,

    /// Chunks the document would naturally need
    pub total_chunks: usize,

    /// Source chunks kept
    pub selected_chunks: usize,

    /// Source chunks not extracted
    pub dropped_chunks: usize,

    /// Whether the plan ends with a summary placeholder
    pub needs_summary: bool,
}

/// Result of planning a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChunkPlan {
    /// Every part of the document is covered
    Chunks {
        /// Chunks in document order
        chunks: Vec<Chunk>,
    },

    /// Too many chunks, degraded by a strategy
    Degraded(DegradedPlan),
}

impl ChunkPlan {
    /// Chunks to extract, in order
    pub fn chunks(&self) -> &[Chunk] {
        match self {
            ChunkPlan::Chunks { chunks } => chunks,
            ChunkPlan::Degraded(plan) => &plan.chunks,
        }
    }

    /// Take the chunks out of the plan
    pub fn into_chunks(self) -> Vec<Chunk> {
        match self {
            ChunkPlan::Chunks { chunks } => chunks,
            ChunkPlan::Degraded(plan) => plan.chunks,
        }
    }

    /// Number of chunks to extract
    pub fn len(&self) -> usize {
        self.chunks().len()
    }

    /// Whether there is nothing to extract
    pub fn is_empty(&self) -> bool {
        self.chunks().is_empty()
    }

    /// Whether a degrade strategy was applied
    pub fn is_degraded(&self) -> bool {
        matches!(self, ChunkPlan::Degraded(_))
    }

    /// The degraded plan, if any
    pub fn degraded(&self) -> Option<&DegradedPlan> {
        match self {
            ChunkPlan::Degraded(plan) => Some(plan),
            ChunkPlan::Chunks { .. } => None,
        }
    }
}

/// Options for [`ChunkPlanner`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanOptions {
    /// Maximum estimated tokens per chunk
    pub token_budget: usize,

    /// Characters carried from the end of one chunk into the next
    pub overlap_chars: usize,

    /// Maximum chunks before degrading
    pub max_chunks: usize,

    /// Degrade strategy
    pub strategy: DegradeStrategy,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            token_budget: 44_800,
            overlap_chars: 200,
            max_chunks: 8,
            strategy: DegradeStrategy::SummaryThenExtract,
        }
    }
}

/// Splits documents into chunks that fit a token budget
#[derive(Debug, Clone, Default)]
pub struct ChunkPlanner {
    options: PlanOptions,
}

impl ChunkPlanner {
    /// Create a new planner
    pub fn new(options: PlanOptions) -> Self {
        Self { options }
    }

    /// Get the planner options
    pub fn options(&self) -> &PlanOptions {
        &self.options
    }

    /// Plan the chunks of `text`
    pub fn plan(&self, text: &str, lang: Language) -> ChunkPlan {
        if text.is_empty() {
            return ChunkPlan::Chunks { chunks: Vec::new() };
        }

        let budget = self.options.token_budget;
        let total_tokens = estimate_tokens(text, lang);
        debug!(total_tokens, budget, "Planning chunks");

        if total_tokens <= budget {
            return ChunkPlan::Chunks {
                chunks: vec![Chunk::new(text.to_string(), lang, 0)],
            };
        }

        let segments = split_segments(text);
        let chunks = self.pack(&segments, lang);
        info!(chunks = chunks.len(), "Document split into chunks");

        if chunks.len() > self.options.max_chunks {
            return ChunkPlan::Degraded(self.degrade(chunks));
        }

        ChunkPlan::Chunks { chunks }
    }

    /// Greedy packing of segments into chunks
    fn pack(&self, segments: &[&str], lang: Language) -> Vec<Chunk> {
        let budget = self.options.token_budget;
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_tokens = 0;
        let mut current_overlap = 0;

        for segment in segments {
            let segment_tokens = estimate_tokens(segment, lang);

            if segment_tokens > budget {
                if !current.is_empty() {
                    chunks.push(Chunk::new(std::mem::take(&mut current), lang, current_overlap));
                }
                warn!(
                    tokens = segment_tokens,
                    budget, "Segment exceeds the token budget, keeping it as one chunk"
                );
                chunks.push(Chunk::new(segment.to_string(), lang, 0));
                current_tokens = 0;
                current_overlap = 0;
                continue;
            }

            if !current.is_empty() && current_tokens + segment_tokens > budget {
                let closed = std::mem::take(&mut current);
                let overlap = tail_chars(&closed, self.options.overlap_chars);
                chunks.push(Chunk::new(closed, lang, current_overlap));

                current_overlap = overlap.chars().count();
                current = overlap;
                current.push_str(segment);
                current_tokens = estimate_tokens(&current, lang);
            } else {
                current.push_str(segment);
                current_tokens += segment_tokens;
            }
        }

        if !current.is_empty() {
            chunks.push(Chunk::new(current, lang, current_overlap));
        }

        chunks
    }

    fn degrade(&self, chunks: Vec<Chunk>) -> DegradedPlan {
        let total_chunks = chunks.len();
        let max_chunks = self.options.max_chunks;
        let strategy = self.options.strategy;

        warn!(
            total_chunks,
            max_chunks,
            strategy = %strategy,
            "Too many chunks, degrading plan"
        );

        match strategy {
            DegradeStrategy::SummaryThenExtract => {
                let kept: Vec<Chunk> = chunks.into_iter().take(max_chunks).collect();
                let selected_chunks = kept.len();
                DegradedPlan {
                    strategy,
                    chunks: kept,
                    total_chunks,
                    selected_chunks,
                    dropped_chunks: total_chunks - selected_chunks,
                    needs_summary: false,
                }
            }
            DegradeStrategy::HeadNPlusOverall => {
                let head = max_chunks.saturating_sub(1);
                let mut kept: Vec<Chunk> = chunks.into_iter().take(head).collect();
                let selected_chunks = kept.len();
                let dropped_chunks = total_chunks - selected_chunks;
                let placeholder = format!(
                    "[Overall summary]\nThe first {} sections were extracted in detail; \
                     the remaining {} sections need an overall summary.",
                    selected_chunks, dropped_chunks
                );
                kept.push(Chunk {
                    estimated_tokens: placeholder.chars().count(),
                    text: placeholder,
                    overlap_chars: 0,
                    synthetic: true,
                });
                DegradedPlan {
                    strategy,
                    chunks: kept,
                    total_chunks,
                    selected_chunks,
                    dropped_chunks,
                    needs_summary: true,
                }
            }
        }
    }
}

/// Split text into paragraphs, or into sentences if there is only one paragraph
///
/// Separators stay attached to the preceding segment, so the segments
/// concatenate back to `text`.
fn split_segments(text: &str) -> Vec<&str> {
    let paragraphs = split_paragraphs(text);
    if paragraphs.len() > 1 {
        return paragraphs;
    }
    split_sentences(text)
}

fn split_paragraphs(text: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut newlines = 0;

    for (idx, c) in text.char_indices() {
        if c == '\n' {
            newlines += 1;
            continue;
        }
        if newlines >= 2 && idx > start {
            segments.push(&text[start..idx]);
            start = idx;
        }
        newlines = 0;
    }

    if start < text.len() {
        segments.push(&text[start..]);
    }
    segments
}

fn split_sentences(text: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut after_terminator = false;

    for (idx, c) in text.char_indices() {
        if after_terminator && !c.is_whitespace() {
            segments.push(&text[start..idx]);
            start = idx;
            after_terminator = false;
        }
        if matches!(c, '.' | '!' | '?' | '。' | '！' | '？') {
            after_terminator = true;
        }
    }

    if start < text.len() {
        segments.push(&text[start..]);
    }
    segments
}

/// The last `n` characters of `text`
fn tail_chars(text: &str, n: usize) -> String {
    if n == 0 {
        return String::new();
    }
    let len = text.chars().count();
    text.chars().skip(len.saturating_sub(n)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planner(token_budget: usize, overlap_chars: usize, max_chunks: usize) -> ChunkPlanner {
        ChunkPlanner::new(PlanOptions {
            token_budget,
            overlap_chars,
            max_chunks,
            strategy: DegradeStrategy::SummaryThenExtract,
        })
    }

    fn covered(plan: &ChunkPlan) -> usize {
        plan.chunks().iter().map(Chunk::new_chars).sum()
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens("", Language::Zh), 0);
        assert_eq!(estimate_tokens("央行宣布加息", Language::Zh), 6);
        // 10 words * 1.3
        assert_eq!(estimate_tokens(&"word ".repeat(10), Language::En), 13);
        // 4 CJK characters + 1 word * 1.3
        assert_eq!(estimate_tokens("央行加息 rate", Language::Mixed), 5);
    }

    #[test]
    fn test_no_chunking_needed_for_small_text() {
        let text = "Short text here.";
        let plan = planner(100, 10, 8).plan(text, Language::En);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.chunks()[0].text, text);
        assert_eq!(plan.chunks()[0].overlap_chars, 0);
        assert!(!plan.is_degraded());
    }

    #[test]
    fn test_empty_text() {
        let plan = planner(100, 10, 8).plan("", Language::Zh);
        assert!(plan.is_empty());
        assert!(!plan.is_degraded());
    }

    #[test]
    fn test_split_paragraphs_keeps_separators() {
        let text = "First.\n\nSecond.\n\n\nThird.";
        let segments = split_paragraphs(text);
        assert_eq!(segments, vec!["First.\n\n", "Second.\n\n\n", "Third."]);
        assert_eq!(segments.concat(), text);
    }

    #[test]
    fn test_split_sentences_keeps_whitespace() {
        let text = "央行加息。市场震荡！Rates up. Why? done";
        let segments = split_sentences(text);
        assert_eq!(
            segments,
            vec!["央行加息。", "市场震荡！", "Rates up. ", "Why? ", "done"]
        );
        assert_eq!(segments.concat(), text);
    }

    #[test]
    fn test_chunk_by_paragraph_with_overlap() {
        let text = "一二三四五六七八九十\n\n一二三四五六七八九十\n\n一二三四五六七八九十";
        let plan = planner(15, 3, 8).plan(text, Language::Zh);

        assert_eq!(plan.len(), 3);
        assert_eq!(plan.chunks()[0].overlap_chars, 0);
        assert_eq!(plan.chunks()[1].overlap_chars, 3);
        assert!(plan.chunks()[1].text.starts_with("十\n\n"));
        assert_eq!(covered(&plan), text.chars().count());
    }

    #[test]
    fn test_single_paragraph_split_by_sentence() {
        let text = "央行宣布加息。市场出现震荡。银行股普遍上涨。";
        let plan = planner(8, 0, 8).plan(text, Language::Zh);

        assert_eq!(plan.len(), 3);
        assert_eq!(plan.chunks()[0].text, "央行宣布加息。");
        assert_eq!(covered(&plan), text.chars().count());
    }

    #[test]
    fn test_oversized_segment_is_its_own_chunk() {
        let long = "长".repeat(30);
        let text = format!("短句。{}。短句。", long);
        let plan = planner(10, 2, 8).plan(&text, Language::Zh);

        let chunks = plan.chunks();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text, "短句。");
        assert_eq!(chunks[1].text, format!("{}。", long));
        assert_eq!(chunks[1].overlap_chars, 0);
        assert_eq!(chunks[2].overlap_chars, 0);
        assert!(chunks[1].estimated_tokens > 10);
        assert_eq!(covered(&plan), text.chars().count());
    }

    #[test]
    fn test_summary_then_extract_degrade() {
        let text = "段落内容。\n\n".repeat(10);
        let plan = planner(6, 0, 3).plan(&text, Language::Zh);

        let degraded = plan.degraded().unwrap();
        assert_eq!(degraded.strategy, DegradeStrategy::SummaryThenExtract);
        assert_eq!(degraded.total_chunks, 10);
        assert_eq!(degraded.selected_chunks, 3);
        assert_eq!(degraded.dropped_chunks, 7);
        assert_eq!(degraded.chunks.len(), 3);
        assert!(!degraded.needs_summary);
    }

    #[test]
    fn test_head_n_plus_overall_degrade() {
        let text = "段落内容。\n\n".repeat(10);
        let planner = ChunkPlanner::new(PlanOptions {
            token_budget: 6,
            overlap_chars: 0,
            max_chunks: 3,
            strategy: DegradeStrategy::HeadNPlusOverall,
        });
        let plan = planner.plan(&text, Language::Zh);

        let degraded = plan.degraded().unwrap();
        assert_eq!(degraded.selected_chunks, 2);
        assert_eq!(degraded.dropped_chunks, 8);
        assert_eq!(degraded.chunks.len(), 3);
        assert!(degraded.needs_summary);
        assert!(degraded.chunks[2].synthetic);
        assert!(degraded.total_chunks > degraded.selected_chunks);
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!(
            "headN_plus_overall".parse::<DegradeStrategy>(),
            Ok(DegradeStrategy::HeadNPlusOverall)
        );
        assert_eq!(
            DegradeStrategy::parse("SUMMARY_THEN_EXTRACT"),
            Some(DegradeStrategy::SummaryThenExtract)
        );
        assert!("truncate".parse::<DegradeStrategy>().is_err());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn plan_covers_every_character(
                text in "[a-z央行。. \n]{1,300}",
                budget in 3usize..40,
                overlap in 0usize..10,
            ) {
                let plan = planner(budget, overlap, usize::MAX).plan(&text, Language::Zh);
                prop_assert!(!plan.is_empty());
                prop_assert!(!plan.is_degraded());
                prop_assert_eq!(covered(&plan), text.chars().count());
            }

            #[test]
            fn degrades_when_over_max_chunks(
                paragraphs in 5usize..20,
                max_chunks in 1usize..4,
            ) {
                let text = "一二三四五\n\n".repeat(paragraphs);
                let plan = planner(7, 0, max_chunks).plan(&text, Language::Zh);
                let degraded = plan.degraded().unwrap();
                prop_assert!(degraded.total_chunks > degraded.selected_chunks);
                prop_assert_eq!(degraded.chunks.len(), max_chunks);
            }
        }
    }
}
