//! Lexical polarity/subjectivity scorer.
//!
//! Lightweight word-list NLP used by the fallback sentiment tier: each known
//! word carries a polarity weight in [-1, 1] and a subjectivity weight in
//! [0, 1]; a text scores as the average over matched words, with a
//! single-token negation flip ("not good" scores like "bad"). No external ML
//! dependencies, fully deterministic.

use once_cell::sync::Lazy;
use std::collections::HashMap;

static POLARITY: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    let entries: &[(&str, f64)] = &[
        // strong positive
        ("excellent", 1.0),
        ("amazing", 0.9),
        ("outstanding", 1.0),
        ("fantastic", 0.9),
        ("wonderful", 1.0),
        ("superb", 0.9),
        ("perfect", 1.0),
        ("love", 0.8),
        ("loved", 0.8),
        ("best", 1.0),
        ("awesome", 1.0),
        ("brilliant", 0.9),
        ("exceptional", 0.9),
        ("delighted", 0.9),
        ("impressed", 0.8),
        // moderate positive
        ("great", 0.8),
        ("good", 0.7),
        ("nice", 0.6),
        ("happy", 0.8),
        ("comfortable", 0.6),
        ("comfy", 0.6),
        ("sturdy", 0.5),
        ("durable", 0.5),
        ("stylish", 0.5),
        ("beautiful", 0.85),
        ("solid", 0.4),
        ("recommend", 0.6),
        ("recommended", 0.6),
        ("satisfied", 0.6),
        ("pleased", 0.6),
        ("worth", 0.4),
        ("quality", 0.3),
        ("favorite", 0.7),
        ("favourite", 0.7),
        ("reliable", 0.5),
        ("soft", 0.3),
        ("warm", 0.3),
        // strong negative
        ("terrible", -1.0),
        ("awful", -1.0),
        ("horrible", -1.0),
        ("worst", -1.0),
        ("hate", -0.8),
        ("hated", -0.8),
        ("garbage", -0.9),
        ("useless", -0.8),
        ("scam", -0.9),
        ("fraud", -0.9),
        ("defective", -0.8),
        ("broken", -0.7),
        ("disappointed", -0.75),
        ("disappointing", -0.75),
        ("regret", -0.7),
        // moderate negative
        ("bad", -0.7),
        ("poor", -0.6),
        ("cheap", -0.4),
        ("flimsy", -0.6),
        ("uncomfortable", -0.6),
        ("painful", -0.7),
        ("stiff", -0.3),
        ("heavy", -0.2),
        ("overpriced", -0.6),
        ("expensive", -0.3),
        ("annoying", -0.6),
        ("annoyed", -0.6),
        ("frustrating", -0.6),
        ("frustrated", -0.6),
        ("upset", -0.6),
        ("unhappy", -0.6),
        ("misleading", -0.6),
        ("fake", -0.6),
        ("waste", -0.6),
        ("slow", -0.3),
        ("problem", -0.4),
        ("problems", -0.4),
        ("issue", -0.3),
        ("issues", -0.3),
        ("blisters", -0.5),
        ("hurt", -0.6),
        ("hurts", -0.6),
    ];
    entries.iter().copied().collect()
});

static SUBJECTIVITY: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    let entries: &[(&str, f64)] = &[
        ("excellent", 1.0),
        ("amazing", 0.9),
        ("terrible", 1.0),
        ("awful", 1.0),
        ("horrible", 1.0),
        ("perfect", 1.0),
        ("worst", 1.0),
        ("best", 0.9),
        ("love", 0.9),
        ("hate", 0.9),
        ("great", 0.75),
        ("good", 0.6),
        ("bad", 0.65),
        ("nice", 0.8),
        ("beautiful", 0.9),
        ("wonderful", 1.0),
        ("comfortable", 0.7),
        ("uncomfortable", 0.7),
        ("happy", 0.9),
        ("unhappy", 0.9),
        ("disappointed", 0.8),
        ("disappointing", 0.8),
        ("recommend", 0.6),
        ("stylish", 0.8),
        ("cheap", 0.6),
        ("expensive", 0.6),
        ("overpriced", 0.8),
        ("poor", 0.6),
        ("quality", 0.4),
        ("sturdy", 0.5),
        ("durable", 0.5),
        ("painful", 0.8),
        ("annoying", 0.8),
        ("useless", 0.9),
        ("heavy", 0.4),
        ("soft", 0.5),
        ("stiff", 0.5),
        ("waste", 0.7),
        ("impressed", 0.85),
        ("satisfied", 0.8),
        ("pleased", 0.8),
    ];
    entries.iter().copied().collect()
});

/// Negation tokens that flip the polarity of the following word.
const NEGATIONS: [&str; 7] = ["not", "no", "never", "isnt", "wasnt", "dont", "didnt"];

/// Polarity + subjectivity for one text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LexicalScore {
    /// [-1.0, 1.0]; 0.0 when no lexicon word matched.
    pub polarity: f64,
    /// [0.0, 1.0]; 0.0 when no lexicon word matched.
    pub subjectivity: f64,
}

/// Score a text by averaging matched word weights.
pub fn score(text: &str) -> LexicalScore {
    let lowered = text.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .collect();

    let mut polarity_sum = 0.0;
    let mut polarity_hits = 0usize;
    let mut subjectivity_sum = 0.0;
    let mut subjectivity_hits = 0usize;

    for (i, word) in words.iter().enumerate() {
        if let Some(p) = POLARITY.get(word) {
            let negated = i > 0 && NEGATIONS.contains(&words[i - 1]);
            polarity_sum += if negated { -p * 0.5 } else { *p };
            polarity_hits += 1;
        }
        if let Some(s) = SUBJECTIVITY.get(word) {
            subjectivity_sum += s;
            subjectivity_hits += 1;
        }
    }

    LexicalScore {
        polarity: if polarity_hits > 0 {
            (polarity_sum / polarity_hits as f64).clamp(-1.0, 1.0)
        } else {
            0.0
        },
        subjectivity: if subjectivity_hits > 0 {
            (subjectivity_sum / subjectivity_hits as f64).clamp(0.0, 1.0)
        } else {
            0.0
        },
    }
}
