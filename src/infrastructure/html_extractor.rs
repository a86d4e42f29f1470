//! Candidate extraction from storefront listing markup.
//!
//! The storefront reworks its markup every few months, so every locator is
//! an ordered chain of CSS selector strategies tried first-match-wins: one
//! chain locates product cards on the page, and per-card chains locate the
//! name and price. When no card strategy matches at all, the page layout has
//! drifted beyond what the configured chains cover and the crawl must stop —
//! an empty result would be indistinguishable from the end of the catalogue.

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::application::crawler::RawCandidate;

/// Extraction failure over one page of markup.
#[derive(Error, Debug, Clone)]
pub enum ExtractionError {
    /// No card strategy matched anything: upstream layout changed.
    #[error("product grid not found with any configured selector (tried {tried_selectors:?})")]
    StructuralDrift { tried_selectors: Vec<String> },

    /// Every selector string for a field failed to compile.
    #[error("no usable {field} selectors: {errors:?}")]
    NoValidSelectors {
        field: String,
        errors: Vec<String>,
    },
}

impl ExtractionError {
    pub fn structural_drift(tried_selectors: Vec<String>) -> Self {
        Self::StructuralDrift { tried_selectors }
    }
}

/// Ordered selector strategy chains, most likely first.
///
/// Operator-editable through the config file: when the storefront drifts,
/// updating these chains is the repair path — no rebuild needed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Product card locators, tried in order; the first one that matches
    /// at least once owns the whole page.
    pub card: Vec<String>,
    /// Name locators within a card.
    pub name: Vec<String>,
    /// Price locators within a card.
    pub price: Vec<String>,
    /// Next-page affordance locators.
    pub next_page: Vec<String>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            card: vec![
                "div[data-testid='product-card']".to_string(),
                "article[class*='product']".to_string(),
                "div[class*='ProductCard']".to_string(),
                "div[class*='productCard']".to_string(),
                ".product-item".to_string(),
                "li[class*='product']".to_string(),
            ],
            name: vec![
                "h3".to_string(),
                "h4".to_string(),
                "[class*='name']".to_string(),
                "[class*='title']".to_string(),
                "a[class*='name']".to_string(),
            ],
            price: vec![
                "[data-testid='price']".to_string(),
                "[class*='price']".to_string(),
                ".price-amount".to_string(),
                "span[class*='value']".to_string(),
                "strong".to_string(),
            ],
            next_page: vec![
                "a[aria-label*='seuraava']".to_string(),
                "a[class*='next']".to_string(),
                "[rel='next']".to_string(),
                "button[class*='next']".to_string(),
                "a[href*='page=']".to_string(),
            ],
        }
    }
}

struct CompiledStrategy {
    source: String,
    selector: Selector,
}

/// Extracts raw (name, price text) candidates from one page of markup.
///
/// Pure over the given document; selectors are compiled once at
/// construction.
pub struct HtmlExtractor {
    card_strategies: Vec<CompiledStrategy>,
    name_strategies: Vec<CompiledStrategy>,
    price_strategies: Vec<CompiledStrategy>,
    next_page_strategies: Vec<CompiledStrategy>,
}

impl HtmlExtractor {
    pub fn new() -> Result<Self, ExtractionError> {
        Self::with_config(&SelectorConfig::default())
    }

    pub fn with_config(config: &SelectorConfig) -> Result<Self, ExtractionError> {
        Ok(Self {
            card_strategies: compile_strategies("card", &config.card)?,
            name_strategies: compile_strategies("name", &config.name)?,
            price_strategies: compile_strategies("price", &config.price)?,
            next_page_strategies: compile_strategies("next-page", &config.next_page)?,
        })
    }

    /// Extract all candidates from one listing page.
    ///
    /// The first card strategy with at least one match is final for the
    /// page, even if the cards it finds are incomplete — mixing strategies
    /// would double-count cards matched by overlapping selectors. A card
    /// missing a name or price yields an empty field; the controller drops
    /// such candidates as per-item failures.
    pub fn extract_candidates(&self, html: &Html) -> Result<Vec<RawCandidate>, ExtractionError> {
        for strategy in &self.card_strategies {
            let cards: Vec<ElementRef> = html.select(&strategy.selector).collect();
            if cards.is_empty() {
                continue;
            }
            debug!(selector = %strategy.source, cards = cards.len(), "card strategy matched");

            let candidates = cards
                .iter()
                .map(|card| RawCandidate {
                    name: self.first_text(card, &self.name_strategies).unwrap_or_default(),
                    price_text: self
                        .first_text(card, &self.price_strategies)
                        .unwrap_or_default(),
                })
                .collect();
            return Ok(candidates);
        }

        Err(ExtractionError::structural_drift(
            self.card_strategies
                .iter()
                .map(|s| s.source.clone())
                .collect(),
        ))
    }

    /// Whether the page carries any next-page affordance.
    pub fn has_next_page(&self, html: &Html) -> bool {
        self.next_page_strategies
            .iter()
            .any(|strategy| html.select(&strategy.selector).next().is_some())
    }

    /// First non-empty text match within an element, in strategy order.
    fn first_text(&self, element: &ElementRef, strategies: &[CompiledStrategy]) -> Option<String> {
        strategies.iter().find_map(|strategy| {
            element
                .select(&strategy.selector)
                .next()
                .map(|found| found.text().collect::<String>().trim().to_string())
                .filter(|text| !text.is_empty())
        })
    }
}

/// Compile a strategy chain, skipping invalid selector strings.
fn compile_strategies(
    field: &str,
    sources: &[String],
) -> Result<Vec<CompiledStrategy>, ExtractionError> {
    let mut strategies = Vec::new();
    let mut errors = Vec::new();

    for source in sources {
        match Selector::parse(source) {
            Ok(selector) => strategies.push(CompiledStrategy {
                source: source.clone(),
                selector,
            }),
            Err(e) => {
                warn!(selector = %source, "skipping invalid {field} selector: {e}");
                errors.push(format!("'{source}': {e}"));
            }
        }
    }

    if strategies.is_empty() {
        return Err(ExtractionError::NoValidSelectors {
            field: field.to_string(),
            errors,
        });
    }
    Ok(strategies)
}
