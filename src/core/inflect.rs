//! English singular/plural forms for namespace keys
//!
//! Used by [`NamespaceOpts`](crate::core::options::NamespaceOpts) to derive
//! `plural_name` from `name` (and back) when only one of them is declared.

const VOWELS: [char; 5] = ['a', 'e', 'i', 'o', 'u'];

/// Words whose plural only appends `s` despite ending in consonant + `o`
const PLAIN_O_PLURALS: [&str; 4] = ["photo", "piano", "halo", "memo"];

/// Words ending in `f`/`fe` whose plural only appends `s`
const PLAIN_F_PLURALS: [&str; 10] = [
    "roof", "proof", "chief", "belief", "chef", "brief", "reef", "gulf", "safe", "cafe",
];

/// Plural form of an English noun (`user` → `users`, `category` → `categories`)
pub fn pluralize(singular: &str) -> String {
    let Some(last) = singular.chars().last() else {
        return String::new();
    };
    let before_last = singular.chars().rev().nth(1);
    let stem = |drop: usize| &singular[..singular.len() - drop];

    match last {
        'y' if before_last.is_some_and(|c| !VOWELS.contains(&c)) => format!("{}ies", stem(1)),
        's' | 'x' | 'z' => format!("{}es", singular),
        'h' if matches!(before_last, Some('s' | 'c')) => format!("{}es", singular),
        'f' | 'e' if ends_with_any(singular, &PLAIN_F_PLURALS) => format!("{}s", singular),
        'f' if before_last == Some('f') => format!("{}s", singular),
        'f' if singular.len() > 1 => format!("{}ves", stem(1)),
        'e' if before_last == Some('f') && singular.len() > 2 => format!("{}ves", stem(2)),
        'o' if before_last.is_some_and(|c| !VOWELS.contains(&c))
            && !PLAIN_O_PLURALS.contains(&singular) =>
        {
            format!("{}es", singular)
        }
        _ => format!("{}s", singular),
    }
}

fn ends_with_any(word: &str, endings: &[&str]) -> bool {
    endings.iter().any(|end| word.ends_with(end))
}

/// Singular form of an English noun (`companies` → `company`)
pub fn singularize(plural: &str) -> String {
    let strip = |suffix: &str| plural.strip_suffix(suffix).filter(|s| !s.is_empty());

    if let Some(stem) = strip("ies") {
        return format!("{}y", stem);
    }
    if let Some(stem) = strip("ves") {
        if ["l", "ea", "oa", "ie"].iter().any(|end| stem.ends_with(end)) {
            return format!("{}f", stem);
        }
        if ["kni", "wi"].iter().any(|end| stem.ends_with(end)) || stem == "li" {
            return format!("{}fe", stem);
        }
    }
    for suffix in ["sses", "shes", "ches", "xes", "zes", "oes"] {
        if let Some(stem) = strip(suffix) {
            return format!("{}{}", stem, &suffix[..suffix.len() - 2]);
        }
    }
    // `buses` → `bus`, `statuses` → `status`; `houses`/`causes` keep their `e`
    if let Some(stem) = strip("uses") {
        if stem.chars().last().is_some_and(|c| !VOWELS.contains(&c)) {
            return format!("{}us", stem);
        }
    }
    match strip("s") {
        Some(stem) if !stem.ends_with('s') => stem.to_string(),
        _ => plural.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pluralize_regular() {
        assert_eq!(pluralize("user"), "users");
        assert_eq!(pluralize("author"), "authors");
    }

    #[test]
    fn test_pluralize_y_ending() {
        assert_eq!(pluralize("company"), "companies");
        assert_eq!(pluralize("day"), "days");
        assert_eq!(pluralize("key"), "keys");
    }

    #[test]
    fn test_pluralize_sibilants() {
        assert_eq!(pluralize("address"), "addresses");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("church"), "churches");
        assert_eq!(pluralize("dish"), "dishes");
        assert_eq!(pluralize("month"), "months");
    }

    #[test]
    fn test_pluralize_f_and_o_endings() {
        assert_eq!(pluralize("knife"), "knives");
        assert_eq!(pluralize("wolf"), "wolves");
        assert_eq!(pluralize("hero"), "heroes");
        assert_eq!(pluralize("photo"), "photos");
        assert_eq!(pluralize("video"), "videos");
    }

    #[test]
    fn test_singularize() {
        assert_eq!(singularize("users"), "user");
        assert_eq!(singularize("companies"), "company");
        assert_eq!(singularize("addresses"), "address");
        assert_eq!(singularize("boxes"), "box");
        assert_eq!(singularize("heroes"), "hero");
        assert_eq!(singularize("child"), "child");
    }

    #[test]
    fn test_pluralize_plain_f_words() {
        assert_eq!(pluralize("staff"), "staffs");
        assert_eq!(pluralize("roof"), "roofs");
        assert_eq!(pluralize("chief"), "chiefs");
        assert_eq!(pluralize("cafe"), "cafes");
        assert_eq!(pluralize("leaf"), "leaves");
    }

    #[test]
    fn test_singularize_us_and_ves_endings() {
        assert_eq!(singularize("buses"), "bus");
        assert_eq!(singularize("statuses"), "status");
        assert_eq!(singularize("houses"), "house");
        assert_eq!(singularize("wolves"), "wolf");
        assert_eq!(singularize("knives"), "knife");
        assert_eq!(singularize("archives"), "archive");
        assert_eq!(singularize("staffs"), "staff");
    }

    #[test]
    fn test_roundtrip_common_nouns() {
        for word in ["user", "company", "address", "box", "day", "book", "status", "staff", "roof", "wife", "shelf"] {
            assert_eq!(singularize(&pluralize(word)), word, "roundtrip failed for {}", word);
        }
    }

    #[test]
    fn test_empty_string() {
        assert_eq!(pluralize(""), "");
        assert_eq!(singularize(""), "");
    }
}
