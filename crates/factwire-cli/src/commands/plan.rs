//! Plan command implementation.

use crate::cli::PlanArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use factwire_domain::{Document, Language};
use factwire_extractor::{detect_language, estimate_tokens, ChunkPlan, ChunkPlanner};
use serde::{Deserialize, Serialize};
use std::fs;

/// A chunk plan with the inputs that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanReport {
    /// Language used for token estimation
    pub language: Language,
    /// Characters of the planned text
    pub document_length: usize,
    /// Estimated tokens of the whole text
    pub estimated_tokens: usize,
    /// Token budget per chunk
    pub token_budget: usize,
    /// The plan
    pub plan: ChunkPlan,
}

/// Execute the plan command.
pub fn execute_plan(args: PlanArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let report = run_plan(&args, config)?;
    println!("{}", formatter.format_plan(&report)?);
    Ok(())
}

/// Plan the text named in `args`
pub fn run_plan(args: &PlanArgs, config: &Config) -> Result<PlanReport> {
    let contents = fs::read_to_string(&args.file)?;
    let (text, hint) = if args.document {
        let document: Document = serde_json::from_str(&contents)?;
        (document.content_text, document.lang_hint)
    } else {
        (contents, None)
    };

    let text = text.trim();
    let language = args
        .lang
        .map(Language::from)
        .or(hint)
        .unwrap_or_else(|| detect_language(text));

    let options = config.extractor.plan_options();
    let token_budget = options.token_budget;
    let plan = ChunkPlanner::new(options).plan(text, language);

    Ok(PlanReport {
        language,
        document_length: text.chars().count(),
        estimated_tokens: estimate_tokens(text, language),
        token_budget,
        plan,
    })
}
