//! Article generation from the day's answer
//!
//! [`ContentProducer`] is the seam between the scheduler and whatever renders
//! articles. [`TemplateProducer`] is the built-in implementation: one
//! Handlebars template per [`ContentCategory`].

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use handlebars::Handlebars;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;

use crate::models::{AnswerRecord, ContentCategory, ContentItem};
use crate::utils::{normalize_whitespace, truncate_text};

const HINTS_TEMPLATE: &str = include_str!("../../templates/hints.hbs");
const ANSWER_TEMPLATE: &str = include_str!("../../templates/answer.hbs");
const ANALYSIS_TEMPLATE: &str = include_str!("../../templates/word-analysis.hbs");

const VOWELS: &[char] = &['A', 'E', 'I', 'O', 'U'];

/// Excerpts longer than this are cut with an ellipsis
const EXCERPT_MAX_CHARS: usize = 160;

/// Date information handed to producers alongside the answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateContext {
    pub date: NaiveDate,
    pub sequence_number: i64,
    pub generated_at: DateTime<Utc>,
}

impl DateContext {
    pub fn for_answer(answer: &AnswerRecord, generated_at: DateTime<Utc>) -> Self {
        Self {
            date: answer.date,
            sequence_number: answer.sequence_number,
            generated_at,
        }
    }
}

/// Turns a resolved answer into articles
pub trait ContentProducer: Send + Sync {
    fn produce(&self, answer: &AnswerRecord, ctx: &DateContext) -> Vec<ContentItem>;
}

/// Template data for rendering
#[derive(Debug, Serialize)]
struct WordTemplateData {
    word: String,
    date: String,
    sequence_number: i64,
    letters: Vec<String>,
    first_letter: String,
    last_letter: String,
    vowels: Vec<String>,
    consonants: Vec<String>,
    vowel_count: usize,
    single_vowel: bool,
    repeated_letters: Vec<String>,
    is_authoritative: bool,
    source: String,
}

impl WordTemplateData {
    fn new(answer: &AnswerRecord, ctx: &DateContext) -> Self {
        let letters: Vec<char> = answer.word.chars().collect();

        let mut seen = BTreeSet::new();
        let mut repeated = BTreeSet::new();
        for c in &letters {
            if !seen.insert(*c) {
                repeated.insert(*c);
            }
        }

        let (vowels, consonants): (Vec<char>, Vec<char>) =
            letters.iter().copied().partition(|c| VOWELS.contains(c));

        Self {
            word: answer.word.clone(),
            date: ctx.date.format("%Y-%m-%d").to_string(),
            sequence_number: ctx.sequence_number,
            letters: letters.iter().map(char::to_string).collect(),
            first_letter: letters.first().map(char::to_string).unwrap_or_default(),
            last_letter: letters.last().map(char::to_string).unwrap_or_default(),
            vowel_count: vowels.len(),
            single_vowel: vowels.len() == 1,
            vowels: vowels.iter().map(char::to_string).collect(),
            consonants: consonants.iter().map(char::to_string).collect(),
            repeated_letters: repeated.iter().map(char::to_string).collect(),
            is_authoritative: answer.is_authoritative,
            source: answer.source.clone(),
        }
    }
}

/// Handlebars-backed producer emitting one item per category
pub struct TemplateProducer {
    handlebars: Handlebars<'static>,
}

impl TemplateProducer {
    /// Create a producer with the bundled templates
    pub fn new() -> Result<Self> {
        let mut handlebars = Handlebars::new();

        for (category, template) in [
            (ContentCategory::Hints, HINTS_TEMPLATE),
            (ContentCategory::Answer, ANSWER_TEMPLATE),
            (ContentCategory::WordAnalysis, ANALYSIS_TEMPLATE),
        ] {
            handlebars
                .register_template_string(category.as_str(), template)
                .with_context(|| format!("Failed to register {category} template"))?;
        }

        Ok(Self { handlebars })
    }

    /// Override bundled templates with `{category}.hbs` files found in `dir`
    pub fn with_template_dir(dir: &Path) -> Result<Self> {
        let mut producer = Self::new()?;

        for category in ContentCategory::all() {
            let path = dir.join(format!("{}.hbs", category.as_str()));
            if path.exists() {
                producer
                    .handlebars
                    .register_template_file(category.as_str(), &path)
                    .with_context(|| format!("Failed to register template: {}", path.display()))?;
                tracing::debug!(path = %path.display(), "Loaded custom template");
            }
        }

        Ok(producer)
    }

    fn render(&self, category: ContentCategory, data: &WordTemplateData) -> Result<String> {
        self.handlebars
            .render(category.as_str(), data)
            .with_context(|| format!("Failed to render {category} template"))
    }

    fn build_item(
        &self,
        category: ContentCategory,
        answer: &AnswerRecord,
        ctx: &DateContext,
        data: &WordTemplateData,
    ) -> Result<ContentItem> {
        let body = self.render(category, data)?;
        let number = ctx.sequence_number;

        let (title, excerpt) = match category {
            ContentCategory::Hints => (
                format!("Hints for puzzle #{number} ({})", data.date),
                format!(
                    "Starts with {}, {} vowel(s), no spoilers.",
                    data.first_letter, data.vowel_count
                ),
            ),
            ContentCategory::Answer => (
                format!("Answer for puzzle #{number}: {}", answer.word),
                format!("The answer for {} is {}.", data.date, answer.word),
            ),
            ContentCategory::WordAnalysis => (
                format!("Word analysis: {}", answer.word),
                format!(
                    "Letters, vowels and repeats in {} (puzzle #{number}).",
                    answer.word
                ),
            ),
        };

        let excerpt = truncate_text(&normalize_whitespace(&excerpt), EXCERPT_MAX_CHARS);

        // Offline answers may be replaced later in the day
        let quality = if answer.is_authoritative { 80 } else { 50 };

        Ok(ContentItem::new(
            &answer.word,
            category.as_str(),
            title,
            excerpt,
            body,
            ctx.generated_at,
        )
        .with_tags([
            category.as_str().to_string(),
            format!("puzzle-{number}"),
            data.date.clone(),
            format!("starts-with-{}", data.first_letter),
        ])
        .with_quality_score(quality))
    }
}

impl ContentProducer for TemplateProducer {
    fn produce(&self, answer: &AnswerRecord, ctx: &DateContext) -> Vec<ContentItem> {
        let data = WordTemplateData::new(answer, ctx);

        ContentCategory::all()
            .into_iter()
            .filter_map(|category| match self.build_item(category, answer, ctx, &data) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::warn!(
                        category = %category,
                        word = %answer.word,
                        error = %e,
                        "Skipping article"
                    );
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::fallback_record;
    use chrono::TimeZone;

    fn answer(word: &str, authoritative: bool) -> AnswerRecord {
        let mut record = fallback_record(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        record.word = word.to_string();
        record.is_authoritative = authoritative;
        record
    }

    fn ctx(answer: &AnswerRecord) -> DateContext {
        DateContext::for_answer(answer, Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 5).unwrap())
    }

    #[test]
    fn test_produces_one_item_per_category() {
        let producer = TemplateProducer::new().unwrap();
        let answer = answer("CRANE", true);
        let items = producer.produce(&answer, &ctx(&answer));

        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|i| i.key == "crane"));
        let categories: BTreeSet<&str> = items.iter().map(|i| i.category.as_str()).collect();
        assert_eq!(categories, BTreeSet::from(["answer", "hints", "word-analysis"]));
    }

    #[test]
    fn test_hints_do_not_reveal_word() {
        let producer = TemplateProducer::new().unwrap();
        let answer = answer("CRANE", true);
        let items = producer.produce(&answer, &ctx(&answer));

        let hints = items.iter().find(|i| i.category == "hints").unwrap();
        assert!(!hints.body.contains("CRANE"));
        assert!(hints.body.contains("#940"));
        assert!(hints.tags.contains("puzzle-940"));
    }

    #[test]
    fn test_fallback_answer_is_flagged() {
        let producer = TemplateProducer::new().unwrap();
        let answer = answer("SLATE", false);
        let items = producer.produce(&answer, &ctx(&answer));

        let page = items.iter().find(|i| i.category == "answer").unwrap();
        assert!(page.body.contains("derived offline"));
        assert_eq!(page.quality_score, 50);
    }

    #[test]
    fn test_repeated_letters() {
        let answer = answer("SISSY", true);
        let data = WordTemplateData::new(&answer, &ctx(&answer));
        assert_eq!(data.repeated_letters, vec!["S".to_string()]);
        assert_eq!(data.vowel_count, 1);
        assert!(data.single_vowel);
    }

    #[test]
    fn test_regeneration_keeps_ids() {
        let producer = TemplateProducer::new().unwrap();
        let answer = answer("CRANE", true);
        let first = producer.produce(&answer, &ctx(&answer));
        let second = producer.produce(&answer, &ctx(&answer));

        let ids = |items: &[ContentItem]| items.iter().map(|i| i.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
    }
}
