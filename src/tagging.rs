use async_graphql::Enum;
use serde::{Deserialize, Serialize};

use crate::lexicon::Lexicon;

/// Sentiment of the review text, derived from the lexicon polarity score.
#[derive(Enum, Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub(crate) enum Sentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl Sentiment {
    pub(crate) fn from_label(label: &str) -> Option<Self> {
        match label {
            "Positive" => Some(Self::Positive),
            "Neutral" => Some(Self::Neutral),
            "Negative" => Some(Self::Negative),
            _ => None,
        }
    }
}

/// Delivery-time bucket.
#[derive(Enum, Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub(crate) enum Performance {
    Fast,
    #[default]
    Average,
    Slow,
}

impl Performance {
    pub(crate) fn from_label(label: &str) -> Option<Self> {
        match label {
            "Fast" => Some(Self::Fast),
            "Average" => Some(Self::Average),
            "Slow" => Some(Self::Slow),
            _ => None,
        }
    }
}

/// Order-accuracy axis. Classification emits `OrderAccurate` or
/// `OrderMistake`; manual edits use the `OrderAccurate`/`Incorrect`
/// vocabulary. All three are valid stored values.
#[derive(Enum, Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub(crate) enum Accuracy {
    #[default]
    #[serde(rename = "Order Accurate")]
    OrderAccurate,
    #[serde(rename = "Order Mistake")]
    OrderMistake,
    Incorrect,
}

/// Customer-declared feedback polarity; selects the complaint subset.
#[derive(Enum, Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub(crate) enum FeedbackType {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl FeedbackType {
    pub(crate) fn from_label(label: &str) -> Option<Self> {
        match label {
            "Positive" => Some(Self::Positive),
            "Neutral" => Some(Self::Neutral),
            "Negative" => Some(Self::Negative),
            _ => None,
        }
    }
}

/// The three labels assigned to a review at ingestion time.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Tags {
    pub(crate) sentiment: Sentiment,
    pub(crate) performance: Performance,
    pub(crate) accuracy: Accuracy,
}

/// Classify one review. Pure and total: every input, including empty text,
/// produces a value on all three axes.
pub(crate) fn auto_tag(
    lexicon: &Lexicon,
    review_text: &str,
    delivery_time_minutes: f64,
    order_accuracy_text: &str,
) -> Tags {
    let score: i32 = review_text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| lexicon.weight(token))
        .sum();
    let sentiment = if score > 2 {
        Sentiment::Positive
    } else if score >= -2 {
        Sentiment::Neutral
    } else {
        Sentiment::Negative
    };

    let performance = if delivery_time_minutes <= 30.0 {
        Performance::Fast
    } else if delivery_time_minutes <= 60.0 {
        Performance::Average
    } else {
        Performance::Slow
    };

    // Empty accuracy text counts as accurate rather than failing the record.
    let accuracy = if order_accuracy_text.to_lowercase().contains("mistake") {
        Accuracy::OrderMistake
    } else {
        Accuracy::OrderAccurate
    };

    Tags {
        sentiment,
        performance,
        accuracy,
    }
}

#[cfg(test)]
mod tests {
    use super::{auto_tag, Accuracy, Performance, Sentiment};
    use crate::lexicon::Lexicon;

    fn tag_text(text: &str) -> Sentiment {
        auto_tag(&Lexicon::default(), text, 30.0, "").sentiment
    }

    fn tag_minutes(minutes: f64) -> Performance {
        auto_tag(&Lexicon::default(), "", minutes, "").performance
    }

    fn tag_accuracy(text: &str) -> Accuracy {
        auto_tag(&Lexicon::default(), "", 30.0, text).accuracy
    }

    #[test]
    fn sentiment_thresholds() {
        // "good" weighs 3, above the positive threshold of 2
        assert_eq!(tag_text("good"), Sentiment::Positive);
        // "fine" weighs exactly 2, which stays neutral
        assert_eq!(tag_text("fine"), Sentiment::Neutral);
        // "poor" weighs -2, the inclusive lower edge of neutral
        assert_eq!(tag_text("poor"), Sentiment::Neutral);
        assert_eq!(tag_text("bad"), Sentiment::Negative);
        assert_eq!(tag_text("great delicious food"), Sentiment::Positive);
        assert_eq!(tag_text("cold and stale and late"), Sentiment::Negative);
    }

    #[test]
    fn sentiment_ignores_unmatched_tokens() {
        assert_eq!(tag_text("zxqv asdfgh qwerty"), Sentiment::Neutral);
        assert_eq!(tag_text(""), Sentiment::Neutral);
    }

    #[test]
    fn sentiment_tokenizes_punctuation_and_case() {
        assert_eq!(tag_text("GREAT!!! Amazing, truly."), Sentiment::Positive);
    }

    #[test]
    fn performance_buckets() {
        assert_eq!(tag_minutes(30.0), Performance::Fast);
        assert_eq!(tag_minutes(31.0), Performance::Average);
        assert_eq!(tag_minutes(60.0), Performance::Average);
        assert_eq!(tag_minutes(61.0), Performance::Slow);
    }

    #[test]
    fn accuracy_substring_match() {
        assert_eq!(
            tag_accuracy("Customer reported a mistake"),
            Accuracy::OrderMistake
        );
        assert_eq!(tag_accuracy("All correct"), Accuracy::OrderAccurate);
        assert_eq!(tag_accuracy("MISTAKE in packing"), Accuracy::OrderMistake);
        assert_eq!(tag_accuracy(""), Accuracy::OrderAccurate);
    }
}
