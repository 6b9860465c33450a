/// Canonical form of an ingredient name: trimmed, lowercased, with runs
/// of whitespace collapsed to a single space.
pub fn normalize_ingredient_name(name: &str) -> String {
    name.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split a free-text ingredient list on commas and semicolons.
pub fn split_ingredients(text: &str) -> Vec<String> {
    text.split([',', ';'])
        .map(normalize_ingredient_name)
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_ingredient_name() {
        assert_eq!(normalize_ingredient_name("  Olive   Oil "), "olive oil");
        assert_eq!(normalize_ingredient_name("TOMATO"), "tomato");
        assert_eq!(normalize_ingredient_name("green\tchili\npepper"), "green chili pepper");
        assert_eq!(normalize_ingredient_name("   "), "");
    }

    #[test]
    fn test_split_ingredients() {
        assert_eq!(
            split_ingredients("Tomato, basil;; Olive  Oil ,"),
            vec!["tomato", "basil", "olive oil"]
        );
        assert!(split_ingredients("").is_empty());
        assert!(split_ingredients(" , ; ").is_empty());
    }
}
