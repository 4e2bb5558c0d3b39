//! Tag normalization and the additive/subtractive tag edit used by
//! `task edit`.

/// Lowercases, sorts, and deduplicates a tag list.
///
/// Tags are case-insensitive set members persisted as a sequence, so two
/// lists that differ only in case or order normalize to the same value.
/// Applying this to an already normalized list is a no-op.
#[must_use]
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut normalized: Vec<String> = tags
        .into_iter()
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect();
    normalized.sort();
    normalized.dedup();
    normalized
}

/// A single user-supplied tag edit token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagEdit {
    /// `tag` or `+tag`.
    Add(String),
    /// `-tag`.
    Remove(String),
}

impl TagEdit {
    /// Parses a token; returns `None` when nothing is left after the prefix.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        let trimmed = token.trim();
        let (edit, tag): (fn(String) -> Self, &str) =
            if let Some(rest) = trimmed.strip_prefix('-') {
                (Self::Remove, rest)
            } else if let Some(rest) = trimmed.strip_prefix('+') {
                (Self::Add, rest)
            } else {
                (Self::Add, trimmed)
            };
        let tag = tag.trim().to_lowercase();
        (!tag.is_empty()).then(|| edit(tag))
    }
}

/// Applies tag edit tokens to a task's current tags.
///
/// Every `-tag` token removes that tag when present. Bare and `+` tokens are
/// kept only when the tag is already among `current`; a token naming a tag
/// the task does not carry yet is dropped. Surviving additions not already
/// in the result are appended in token order.
///
/// The result is neither sorted nor deduplicated beyond the append check;
/// saving the task normalizes it.
///
/// Known quirk: because additions must already be present, the only
/// addition with any effect is re-adding a tag that a `-` token in the same
/// edit removed.
#[must_use]
pub fn apply_tag_edits<S: AsRef<str>>(current: &[String], tokens: &[S]) -> Vec<String> {
    let edits: Vec<TagEdit> = tokens
        .iter()
        .filter_map(|token| TagEdit::parse(token.as_ref()))
        .collect();
    let is_current = |tag: &str| current.iter().any(|existing| existing.to_lowercase() == tag);

    let mut result: Vec<String> = current
        .iter()
        .filter(|existing| {
            let lowered = existing.to_lowercase();
            !edits
                .iter()
                .any(|edit| matches!(edit, TagEdit::Remove(tag) if *tag == lowered))
        })
        .cloned()
        .collect();

    for edit in &edits {
        let TagEdit::Add(tag) = edit else { continue };
        let already_in_result = result.iter().any(|existing| existing.to_lowercase() == *tag);
        if is_current(tag) && !already_in_result {
            result.push(tag.clone());
        }
    }
    result
}
