//! Prompt template for fact/opinion extraction

use factwire_llm::ChatMessage;

/// Builds the messages sent to a provider for one chunk
pub struct PromptBuilder {
    text: String,
    position: Option<(usize, usize)>,
}

impl PromptBuilder {
    /// Create a new prompt builder
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            position: None,
        }
    }

    /// Mark the text as chunk `index` (0-based) of `total`
    pub fn with_chunk_position(mut self, index: usize, total: usize) -> Self {
        if total > 1 {
            self.position = Some((index, total));
        }
        self
    }

    /// Build the user prompt
    pub fn build(&self) -> String {
        let mut prompt = String::new();

        prompt.push_str(EXTRACTION_INSTRUCTIONS);
        prompt.push_str("\n\n");

        if let Some((index, total)) = self.position {
            prompt.push_str(&format!(
                "This is part {} of {} of a longer article. Extract only what this part states.\n\n",
                index + 1,
                total
            ));
        }

        prompt.push_str("Article:\n");
        prompt.push_str("---\n");
        prompt.push_str(&self.text);
        prompt.push_str("\n---\n\n");

        prompt.push_str(OUTPUT_FORMAT_REMINDER);

        prompt
    }

    /// System and user messages for the chat call
    pub fn messages(&self) -> Vec<ChatMessage> {
        vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(self.build())]
    }
}

const SYSTEM_PROMPT: &str =
    "You are a financial intelligence analyst who extracts the key facts and opinions from news articles.";

const EXTRACTION_INSTRUCTIONS: &str = r#"Extract intelligence that is strongly related to the financial industry from the article below.
Every item must be relevant to finance; this feeds a daily financial intelligence report.

For each item provide:
- fact: an objective event, figure or announcement (required)
- opinion: a view, forecast or comment by the author or an institution (may be an empty string)
- region: "domestic" | "foreign" | "unknown" (domestic means mainland China)
- layer: one of
  - "financial_policy": central bank policy, financial regulation, capital market rules, financial law
  - "financial_economy": equities, bonds, FX, financing, IPOs, M&A, results of financial institutions, market data
  - "financial_ai_models": progress of large models themselves, such as releases, breakthroughs and benchmarks
  - "fintech_applications": AI, big data or blockchain used in finance, fintech companies, payment innovation
  - "unknown"
- evidence_span: the sentence of the article that supports the item
- confidence: 0.0-1.0, how explicitly the article states it
- finance_relevance: 0.0-1.0, how closely it relates to finance
  - 1.0 direct financial content (IPO, central bank policy, fintech product)
  - 0.7-0.9 indirect financial impact (commercial potential of models, tech valuations)
  - 0.4-0.6 weak link (technology that may affect financial applications)
  - 0.2-0.3 large-model technology itself
  - 0.0-0.1 unrelated

Rules:
- Drop items with finance_relevance below 0.4, or below 0.2 for the financial_ai_models layer
- Drop purely political events without a regulatory angle, and general social news
- If nothing in the article is related to finance, return {"items": []}"#;

const OUTPUT_FORMAT_REMINDER: &str = r#"Output format (JSON object only, no additional text):
{
  "items": [
    {
      "fact": "objective fact",
      "opinion": "",
      "region": "domestic",
      "layer": "financial_economy",
      "evidence_span": "supporting sentence",
      "confidence": 0.85,
      "finance_relevance": 0.9
    }
  ]
}

Remember: use plain ASCII double quotes for every JSON string, no markdown code blocks, no explanations."#;
