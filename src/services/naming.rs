use crate::models::recognition::RecognitionOutcome;

/// Characters not allowed in an archive entry or download file name.
const FORBIDDEN_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

const DOCUMENT_SUFFIX: &str = "_idcard";
const SYNTHETIC_SUFFIX: &str = "_idcard_synthetic";

/// Derive a document file name (without extension) from a recognition outcome.
///
/// Outcomes without a usable name fall back to `fallback`. Synthetic
/// outcomes are marked in the name so they are never mistaken for real ones.
pub fn document_file_name(outcome: &RecognitionOutcome, fallback: &str) -> String {
    if !outcome.succeeded {
        return fallback.to_string();
    }

    let name = sanitize(&outcome.name);
    if name.is_empty() {
        return fallback.to_string();
    }

    let suffix = if outcome.is_synthetic {
        SYNTHETIC_SUFFIX
    } else {
        DOCUMENT_SUFFIX
    };
    format!("{}{}", name, suffix)
}

/// Name for the batch item at `index` when recognition yields nothing usable.
pub fn batch_fallback_name(index: usize) -> String {
    format!("idcard_{}", index + 1)
}

/// Remove path and shell-reserved characters and surrounding whitespace.
pub fn sanitize(raw: &str) -> String {
    raw.chars()
        .filter(|c| !FORBIDDEN_CHARS.contains(c) && !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}
