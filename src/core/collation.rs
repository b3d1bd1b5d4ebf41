/*
 * Path ordering for `ProjectFileSet`, using the Unicode collation algorithm with
 * the CLDR root locale. Punctuation is not ignored, so `_` sorts before `-`,
 * which sorts before `.` and `/`. Accented letters sort with their base letter,
 * and at equal strength lowercase sorts before uppercase. Strings the collator
 * considers equal are ordered by code point so the order stays total.
 */
use icu_collator::{Collator, CollatorOptions};
use std::cmp::Ordering;

thread_local! {
    static ROOT_COLLATOR: Option<Collator> = root_collator();
}

fn root_collator() -> Option<Collator> {
    match Collator::try_new(&Default::default(), CollatorOptions::new()) {
        Ok(collator) => Some(collator),
        Err(e) => {
            log::error!("Collation: Root collator unavailable, using code point order: {e}");
            None
        }
    }
}

pub fn locale_compare(a: &str, b: &str) -> Ordering {
    ROOT_COLLATOR
        .with(|collator| match collator {
            Some(collator) => collator.compare(a, b),
            None => Ordering::Equal,
        })
        .then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(mut items: Vec<&str>) -> Vec<&str> {
        items.sort_by(|a, b| locale_compare(a, b));
        items
    }

    #[test]
    fn test_case_is_folded_before_comparison() {
        assert_eq!(
            sorted(vec!["proj/src/main.rs", "proj/README.md", "proj/Cargo.toml"]),
            vec!["proj/Cargo.toml", "proj/README.md", "proj/src/main.rs"]
        );
    }

    #[test]
    fn test_lowercase_sorts_before_uppercase_on_tie() {
        assert_eq!(
            sorted(vec!["B.txt", "b.txt", "a.txt"]),
            vec!["a.txt", "b.txt", "B.txt"]
        );
    }

    #[test]
    fn test_punctuation_before_digits_before_letters() {
        assert_eq!(
            sorted(vec!["x/a", "x/1", "x/_"]),
            vec!["x/_", "x/1", "x/a"]
        );
    }

    #[test]
    fn test_underscore_sorts_before_other_punctuation() {
        assert_eq!(locale_compare("src_x/", "src/"), Ordering::Less);
        assert_eq!(
            sorted(vec!["a.txt", "a-b.txt", "a_b.txt"]),
            vec!["a_b.txt", "a-b.txt", "a.txt"]
        );
    }

    #[test]
    fn test_accents_sort_with_base_letter() {
        assert_eq!(locale_compare("\u{e9}a", "eb"), Ordering::Less);
        assert_eq!(locale_compare("ea", "\u{e9}a"), Ordering::Less);
    }

    #[test]
    fn test_mixed_paths_follow_root_collation() {
        assert_eq!(
            sorted(vec![
                ".env.example",
                "__init__.py",
                "a-b.txt",
                "a.txt",
                "a_b.txt",
                "eb.txt",
                "src/x.rs",
                "src_x/y.rs",
                "\u{e9}a.txt",
            ]),
            vec![
                "__init__.py",
                ".env.example",
                "a_b.txt",
                "a-b.txt",
                "a.txt",
                "\u{e9}a.txt",
                "eb.txt",
                "src_x/y.rs",
                "src/x.rs",
            ]
        );
    }

    #[test]
    fn test_prefix_sorts_first() {
        assert_eq!(locale_compare("src", "src/lib.rs"), Ordering::Less);
        assert_eq!(locale_compare("same", "same"), Ordering::Equal);
    }
}
