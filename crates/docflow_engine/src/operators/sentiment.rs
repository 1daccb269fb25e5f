use super::missing_field;
use crate::error::{OperatorError, OperatorResult};
use crate::operator::Operator;
use docflow_document::{Document, Documents, Value};
use std::collections::HashSet;

const POSITIVE: &[&str] = &[
    "good", "great", "excellent", "happy", "love", "loved", "nice", "wonderful", "amazing",
    "fantastic", "best", "pleased", "enjoy", "enjoyed", "awesome", "glad", "perfect",
];

const NEGATIVE: &[&str] = &[
    "bad", "terrible", "awful", "sad", "hate", "hated", "poor", "horrible", "worst", "angry",
    "disappointed", "broken", "annoying", "useless", "ugly", "wrong", "fail",
];

/// Label written when the score is below the threshold.
pub const NO_SENTIMENT: &str = "No sentiment detected";

/// Scores text by counting words from positive and negative lexicons.
///
/// Writes `{label, score}` under `_sentiment_.<field>.<alias>`, or just a
/// label of [`NO_SENTIMENT`] when `|score|` is below `min_score`.
#[derive(Debug, Clone)]
pub struct LexiconSentimentOperator {
    input_fields: Vec<String>,
    output_fields: Vec<String>,
    output_field: String,
    positive: HashSet<String>,
    negative: HashSet<String>,
    min_score: f64,
}

impl LexiconSentimentOperator {
    /// Creates an operator over `text_field` with the built-in lexicons.
    pub fn new(text_field: impl Into<String>) -> Self {
        Self::with_alias(text_field, "lexicon")
    }

    /// Creates an operator writing under the given alias.
    pub fn with_alias(text_field: impl Into<String>, alias: &str) -> Self {
        let text_field = text_field.into();
        let output_field = format!("_sentiment_.{text_field}.{alias}");
        Self {
            input_fields: vec![text_field],
            output_fields: vec![
                format!("{output_field}.label"),
                format!("{output_field}.score"),
            ],
            output_field,
            positive: POSITIVE.iter().map(|w| w.to_string()).collect(),
            negative: NEGATIVE.iter().map(|w| w.to_string()).collect(),
            min_score: 0.1,
        }
    }

    /// Sets the minimum score magnitude reported as a sentiment.
    #[must_use]
    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = min_score;
        self
    }

    /// Adds words to the lexicons.
    #[must_use]
    pub fn with_words<'a>(
        mut self,
        positive: impl IntoIterator<Item = &'a str>,
        negative: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        self.positive.extend(positive.into_iter().map(str::to_lowercase));
        self.negative.extend(negative.into_iter().map(str::to_lowercase));
        self
    }

    /// Path of the sentiment object.
    pub fn output_field(&self) -> &str {
        &self.output_field
    }

    /// Score in `[-1, 1]`: (positive - negative) / matched words.
    pub fn score(&self, text: &str) -> f64 {
        let (mut positive, mut negative) = (0u32, 0u32);
        for word in text
            .split(|c: char| !c.is_alphanumeric() && c != '\'')
            .filter(|w| !w.is_empty())
        {
            let word = word.to_lowercase();
            if self.positive.contains(&word) {
                positive += 1;
            } else if self.negative.contains(&word) {
                negative += 1;
            }
        }
        let matched = positive + negative;
        if matched == 0 {
            return 0.0;
        }
        (f64::from(positive) - f64::from(negative)) / f64::from(matched)
    }

    fn sentiment(&self, score: f64) -> Value {
        let mut sentiment = Value::empty_map();
        if score.abs() < self.min_score {
            sentiment.insert("label", Value::from(NO_SENTIMENT));
        } else {
            let label = if score > 0.0 { "positive" } else { "negative" };
            sentiment.insert("label", Value::from(label));
            sentiment.insert("score", Value::from(score.abs()));
        }
        sentiment
    }
}

impl Operator for LexiconSentimentOperator {
    fn name(&self) -> &str {
        "lexicon-sentiment"
    }

    fn input_fields(&self) -> &[String] {
        &self.input_fields
    }

    fn output_fields(&self) -> &[String] {
        &self.output_fields
    }

    fn transform(&mut self, mut documents: Vec<Document>) -> OperatorResult<Vec<Document>> {
        let field = &self.input_fields[0];
        let texts = documents.get_field(field);
        let mut sentiments = Vec::with_capacity(texts.len());
        for (document, value) in documents.iter().zip(texts) {
            let value = value.ok_or_else(|| missing_field(document, field))?;
            let text = value.as_text().ok_or_else(|| OperatorError::InvalidValue {
                field: field.clone(),
                message: format!("expected text, found {}", value.kind()),
            })?;
            sentiments.push(self.sentiment(self.score(text)));
        }
        documents.set_field_each(&self.output_field, sentiments)?;
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(text: &str) -> Document {
        Document::from_json(json!({"_id": "1", "review": text})).unwrap()
    }

    #[test]
    fn scores_words() {
        let op = LexiconSentimentOperator::new("review");
        assert_eq!(op.score("Great food, terrible service, great view"), 1.0 / 3.0);
        assert_eq!(op.score("nothing to see"), 0.0);
        assert_eq!(op.score("BAD. Awful!"), -1.0);
    }

    #[test]
    fn writes_label_and_score() {
        let mut op = LexiconSentimentOperator::with_alias("review", "v1");
        let out = op
            .transform(vec![doc("I love it"), doc("the weather")])
            .unwrap();

        assert_eq!(
            out[0].get("_sentiment_.review.v1"),
            Some(&Value::from(json!({"label": "positive", "score": 1.0})))
        );
        assert_eq!(
            out[1].get("_sentiment_.review.v1.label"),
            Some(&Value::from(NO_SENTIMENT))
        );
        assert!(!out[1].contains("_sentiment_.review.v1.score"));
    }

    #[test]
    fn custom_words_and_threshold() {
        let op = LexiconSentimentOperator::new("review")
            .with_words(["Tasty"], ["Bland"])
            .with_min_score(0.5);
        assert_eq!(op.score("tasty"), 1.0);
        assert_eq!(op.score("bland"), -1.0);
        assert_eq!(
            op.sentiment(0.4).get("label"),
            Some(&Value::from(NO_SENTIMENT))
        );
    }

    #[test]
    fn missing_or_non_text_field() {
        let mut op = LexiconSentimentOperator::new("review");
        let err = op.transform(vec![Document::with_id("x")]).unwrap_err();
        assert!(matches!(err, OperatorError::MissingField { .. }));

        let bad = Document::from_json(json!({"_id": "y", "review": 3})).unwrap();
        let err = op.transform(vec![bad]).unwrap_err();
        assert!(matches!(err, OperatorError::InvalidValue { .. }));
    }
}
