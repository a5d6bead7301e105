//! Sentence splitting with abbreviation protection.
//!
//! A boundary is sentence-ending punctuation followed by whitespace and a
//! capital letter. Known abbreviations are masked with placeholders before
//! the scan so "Dr. Smith" never splits.

/// Abbreviations whose trailing period is not a sentence boundary.
/// "Mrs." is masked before "Mr." so the shorter form never clips it.
const ABBREVIATIONS: [&str; 19] = [
    "Mrs.", "Mr.", "Ms.", "Dr.", "Prof.",
    "Inc.", "Ltd.", "Corp.", "Jr.", "Sr.",
    "e.g.", "i.e.", "etc.", "vs.", "fig.",
    "approx.", "dept.", "est.", "vol.",
];

fn placeholder(i: usize) -> String {
    format!("__ABBR{i}__")
}

/// Whether `rest` begins with the placeholder of a capitalized abbreviation,
/// i.e. a masked capital letter.
fn opens_with_masked_capital(rest: &str) -> bool {
    ABBREVIATIONS.iter().enumerate().any(|(i, abbr)| {
        abbr.chars().next().is_some_and(char::is_uppercase) && rest.starts_with(&placeholder(i))
    })
}

/// Split text into sentences. Trimmed, empties dropped.
pub fn split_sentences(text: &str) -> Vec<String> {
    // Mask abbreviations so their periods survive the boundary scan.
    let mut protected = text.to_string();
    for (i, abbr) in ABBREVIATIONS.iter().enumerate() {
        if protected.contains(abbr) {
            protected = protected.replace(abbr, &placeholder(i));
        }
    }

    let chars: Vec<(usize, char)> = protected.char_indices().collect();
    let mut raw: Vec<String> = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;
    while i < chars.len() {
        let (pos, ch) = chars[i];
        if matches!(ch, '.' | '!' | '?') {
            let mut j = i + 1;
            while j < chars.len() && chars[j].1.is_whitespace() {
                j += 1;
            }
            // Boundary only when whitespace follows and the next sentence
            // opens with a capital, which may be hidden inside the
            // placeholder of a capitalized abbreviation.
            let opens_sentence = j > i + 1
                && j < chars.len()
                && (chars[j].1.is_uppercase()
                    || opens_with_masked_capital(&protected[chars[j].0..]));
            if opens_sentence {
                raw.push(protected[start..pos + ch.len_utf8()].to_string());
                start = chars[j].0;
                i = j;
                continue;
            }
        }
        i += 1;
    }
    if start < protected.len() {
        raw.push(protected[start..].to_string());
    }

    let mut restored = Vec::with_capacity(raw.len());
    for mut sentence in raw {
        for (i, abbr) in ABBREVIATIONS.iter().enumerate() {
            let ph = placeholder(i);
            if sentence.contains(&ph) {
                sentence = sentence.replace(&ph, abbr);
            }
        }
        let sentence = sentence.trim();
        if !sentence.is_empty() {
            restored.push(sentence.to_string());
        }
    }
    restored
}
