use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static WRAPPING_QUOTES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^(?:"(.*)"|'(.*)'|`(.*)`)$"#).expect("valid regex"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Tidies entity names returned by the model.
///
/// Names are matched exactly (ignoring case) against graph ids, so only
/// whitespace and a matching pair of wrapping quotes are removed. Punctuation
/// inside or at the edge of a name is kept.
pub struct EntityNormalizer;

impl EntityNormalizer {
    /// Collapse whitespace and drop one pair of wrapping quotes.
    pub fn clean(name: &str) -> String {
        let collapsed = WHITESPACE.replace_all(name.trim(), " ");

        match WRAPPING_QUOTES.captures(&collapsed) {
            Some(caps) => caps
                .iter()
                .skip(1)
                .flatten()
                .next()
                .map(|inner| inner.as_str().trim().to_string())
                .unwrap_or_default(),
            None => collapsed.into_owned(),
        }
    }

    /// Clean every name, drop empties and case-insensitive repeats.
    /// First occurrence wins, so the primary entity stays first.
    pub fn normalize_all(names: Vec<String>) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut cleaned = Vec::with_capacity(names.len());

        for name in names {
            let name = Self::clean(&name);
            if name.is_empty() {
                continue;
            }
            if seen.insert(name.to_lowercase()) {
                cleaned.push(name);
            }
        }

        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean() {
        assert_eq!(EntityNormalizer::clean("  Acme   Corp  "), "Acme Corp");
        assert_eq!(EntityNormalizer::clean("\"Acme\""), "Acme");
        assert_eq!(EntityNormalizer::clean("' Acme '"), "Acme");
        assert_eq!(EntityNormalizer::clean("O'Neil"), "O'Neil");
        assert_eq!(EntityNormalizer::clean("\"\""), "");
    }

    #[test]
    fn test_punctuation_belonging_to_ids_is_kept() {
        let names = vec![
            "Acme Inc.".to_string(),
            "U.S.".to_string(),
            "Yahoo!".to_string(),
            "Microsoft (Redmond)".to_string(),
            "\"Acme\"".to_string(),
        ];

        assert_eq!(
            EntityNormalizer::normalize_all(names),
            vec![
                "Acme Inc.".to_string(),
                "U.S.".to_string(),
                "Yahoo!".to_string(),
                "Microsoft (Redmond)".to_string(),
                "Acme".to_string(),
            ]
        );
    }

    #[test]
    fn test_normalize_all_keeps_first_spelling() {
        let names = vec![
            "YouTube".to_string(),
            " ".to_string(),
            "youtube".to_string(),
            "Google".to_string(),
            " YOUTUBE ".to_string(),
        ];

        assert_eq!(
            EntityNormalizer::normalize_all(names),
            vec!["YouTube".to_string(), "Google".to_string()]
        );
    }
}
