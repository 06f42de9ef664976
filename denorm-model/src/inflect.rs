//! Minimal English inflection for schema and relation names.
//!
//! Only what relation naming needs: `parent` ↔ `Parent`, `ParentItem` →
//! `parent_item`, and `child` → `children`.

const IRREGULAR: &[(&str, &str)] = &[
    ("child", "children"),
    ("person", "people"),
    ("man", "men"),
    ("woman", "women"),
    ("mouse", "mice"),
    ("goose", "geese"),
    ("foot", "feet"),
    ("tooth", "teeth"),
    ("ox", "oxen"),
];

const UNCOUNTABLE: &[&str] = &["equipment", "information", "money", "series", "species"];

/// Converts `parent_item` to `ParentItem`.
pub fn camelize(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Converts `ParentItem` to `parent_item`.
pub fn underscore(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c.is_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.extend(c.to_lowercase());
            prev_lower = false;
        } else {
            out.push(c);
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
        }
    }
    out
}

/// Pluralizes a lowercase word: `child` → `children`, `category` →
/// `categories`, `box` → `boxes`, `item` → `items`.
///
/// Only the last `_`-separated segment is inflected (`line_item` → `line_items`).
pub fn pluralize(word: &str) -> String {
    let (head, last) = match word.rfind('_') {
        Some(idx) => word.split_at(idx + 1),
        None => ("", word),
    };

    if last.is_empty() || UNCOUNTABLE.contains(&last) {
        return word.to_string();
    }
    if let Some((_, plural)) = IRREGULAR.iter().find(|(singular, _)| *singular == last) {
        return format!("{head}{plural}");
    }
    if IRREGULAR.iter().any(|(_, plural)| *plural == last) {
        return word.to_string();
    }

    let plural = if ["s", "x", "z", "ch", "sh"].iter().any(|end| last.ends_with(end)) {
        format!("{last}es")
    } else if let Some(stem) = last.strip_suffix('y') {
        let before_y = stem.chars().last();
        if before_y.is_some_and(|c| !"aeiou".contains(c)) {
            format!("{stem}ies")
        } else {
            format!("{last}s")
        }
    } else {
        format!("{last}s")
    };

    format!("{head}{plural}")
}
