/*
 * The exclusion filter decides which candidate paths are dropped before any
 * content is read. Rules come in three shapes, recognized from their text:
 * `*.ext` (extension glob), `name/` (directory anchor) and anything else (plain
 * segment). A path is excluded when any rule matches; the rule list has no
 * precedence, only a deterministic evaluation order.
 */
use std::fmt;

/*
 * Built-in rules covering dependency directories, VCS metadata, build output,
 * log files and local secrets. Custom rules are appended after these.
 */
pub const DEFAULT_EXCLUSIONS: &[&str] = &[
    "node_modules",
    ".git",
    ".svn",
    ".hg",
    ".vscode",
    ".idea",
    "dist",
    "build",
    "target",
    "out",
    ".next",
    ".cache",
    "coverage",
    "__pycache__",
    ".venv",
    "venv",
    "*.log",
    "*.pyc",
    ".DS_Store",
    ".env",
    ".env.local",
    "package-lock.json",
    "yarn.lock",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExclusionRule {
    /// Matches paths ending with the stored suffix (including the dot).
    ExtensionGlob(String),
    /// Matches `/name/` anywhere, or `name/` at the start of the path.
    DirectoryAnchor(String),
    /// Matches `/name/` anywhere, or any segment equal to `name`.
    PlainSegment(String),
}

impl ExclusionRule {
    /*
     * Classifies a single trimmed rule line. Returns `None` for blank input.
     * The `*.` prefix is checked first, so `*.tmp/` is an extension glob
     * with suffix `.tmp/`.
     */
    pub fn parse(line: &str) -> Option<Self> {
        let pattern = line.trim();
        if pattern.is_empty() {
            return None;
        }
        if let Some(suffix) = pattern.strip_prefix('*').filter(|s| s.starts_with('.')) {
            return Some(ExclusionRule::ExtensionGlob(suffix.to_string()));
        }
        if let Some(name) = pattern.strip_suffix('/') {
            return Some(ExclusionRule::DirectoryAnchor(name.to_string()));
        }
        Some(ExclusionRule::PlainSegment(pattern.to_string()))
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            ExclusionRule::ExtensionGlob(suffix) => path.ends_with(suffix.as_str()),
            ExclusionRule::DirectoryAnchor(name) => {
                path.contains(&format!("/{name}/")) || path.starts_with(&format!("{name}/"))
            }
            ExclusionRule::PlainSegment(name) => {
                path.contains(&format!("/{name}/")) || path.split('/').any(|segment| segment == name)
            }
        }
    }
}

impl fmt::Display for ExclusionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionRule::ExtensionGlob(suffix) => write!(f, "*{suffix}"),
            ExclusionRule::DirectoryAnchor(name) => write!(f, "{name}/"),
            ExclusionRule::PlainSegment(name) => write!(f, "{name}"),
        }
    }
}

pub fn is_excluded(path: &str, rules: &[ExclusionRule]) -> bool {
    rules.iter().any(|rule| rule.matches(path))
}

/*
 * Splits a newline-separated block of custom rules. Lines are trimmed and blank
 * lines are skipped; CRLF input is handled by the trim.
 */
pub fn parse_custom_rules(text: &str) -> Vec<ExclusionRule> {
    text.lines().filter_map(ExclusionRule::parse).collect()
}

/*
 * The ordered union of the built-in defaults and caller-supplied rules.
 * Immutable once built; a packaging run only reads it.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionRuleSet {
    rules: Vec<ExclusionRule>,
}

impl ExclusionRuleSet {
    pub fn with_defaults<S: AsRef<str>>(custom: &[S]) -> Self {
        let mut rules: Vec<ExclusionRule> = DEFAULT_EXCLUSIONS
            .iter()
            .filter_map(|line| ExclusionRule::parse(line))
            .collect();
        rules.extend(Self::parse_lines(custom));
        ExclusionRuleSet { rules }
    }

    pub fn custom_only<S: AsRef<str>>(custom: &[S]) -> Self {
        ExclusionRuleSet {
            rules: Self::parse_lines(custom),
        }
    }

    fn parse_lines<S: AsRef<str>>(lines: &[S]) -> Vec<ExclusionRule> {
        lines
            .iter()
            .flat_map(|entry| parse_custom_rules(entry.as_ref()))
            .collect()
    }

    pub fn rules(&self) -> &[ExclusionRule] {
        &self.rules
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        let hit = self.rules.iter().find(|rule| rule.matches(path));
        if let Some(rule) = hit {
            log::trace!("ExclusionFilter: '{path}' excluded by rule '{rule}'.");
        }
        hit.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(lines: &[&str]) -> Vec<ExclusionRule> {
        lines.iter().filter_map(|l| ExclusionRule::parse(l)).collect()
    }

    #[test]
    fn test_parse_classifies_rule_shapes() {
        assert_eq!(
            ExclusionRule::parse("*.log"),
            Some(ExclusionRule::ExtensionGlob(".log".to_string()))
        );
        assert_eq!(
            ExclusionRule::parse("  dist/ "),
            Some(ExclusionRule::DirectoryAnchor("dist".to_string()))
        );
        assert_eq!(
            ExclusionRule::parse(".env"),
            Some(ExclusionRule::PlainSegment(".env".to_string()))
        );
        assert_eq!(
            ExclusionRule::parse("*.tmp/"),
            Some(ExclusionRule::ExtensionGlob(".tmp/".to_string()))
        );
        assert_eq!(ExclusionRule::parse("   "), None);
    }

    #[test]
    fn test_extension_glob_matches_suffix_only() {
        let rule = ExclusionRule::parse("*.log").unwrap();
        assert!(rule.matches("proj/debug.log"));
        assert!(rule.matches("e.log"));
        assert!(!rule.matches("proj/log/readme.md"));
        assert!(!rule.matches("proj/debug.log.txt"));
        // The suffix is literal, so a bare file named ".log" also matches.
        assert!(rule.matches("proj/.log"));
    }

    #[test]
    fn test_directory_anchor_matches_interior_and_root() {
        let rule = ExclusionRule::parse("dist/").unwrap();
        assert!(rule.matches("dist/x.js"));
        assert!(rule.matches("proj/dist/x.js"));
        assert!(!rule.matches("proj/dist"));
        assert!(!rule.matches("proj/distribution/x.js"));
        assert!(!rule.matches("proj/src/dist.js"));
    }

    #[test]
    fn test_plain_segment_matches_any_segment() {
        let rule = ExclusionRule::parse(".env").unwrap();
        assert!(rule.matches("proj/.env"));
        assert!(rule.matches(".env"));
        assert!(rule.matches("proj/.env/inner.txt"));
        assert!(!rule.matches("proj/.env.example"));

        let dir_rule = ExclusionRule::parse("build").unwrap();
        assert!(dir_rule.matches("proj/build/out.o"));
        assert!(dir_rule.matches("build/out.o"));
        assert!(!dir_rule.matches("proj/rebuild/out.o"));
    }

    #[test]
    fn test_anchor_and_segment_overlap_on_interior_directory() {
        let anchor = ExclusionRule::parse("vendor/").unwrap();
        let segment = ExclusionRule::parse("vendor").unwrap();
        let path = "proj/vendor/lib.js";
        assert!(anchor.matches(path));
        assert!(segment.matches(path));
        // Only the plain segment matches a trailing file segment.
        assert!(!anchor.matches("proj/vendor"));
        assert!(segment.matches("proj/vendor"));
    }

    #[test]
    fn test_interior_substring_spans_segment_boundaries() {
        // `/a/b/` is found as a substring even though no single segment equals `a/b`.
        let rule = ExclusionRule::PlainSegment("a/b".to_string());
        assert!(rule.matches("proj/a/b/c.txt"));
        assert!(!rule.matches("a/b/c.txt"));
    }

    #[test]
    fn test_is_excluded_is_logical_or() {
        let set = rules(&["*.log", "dist/"]);
        let survivors: Vec<&str> = ["src/a.ts", "dist/x.js", "e.log"]
            .into_iter()
            .filter(|p| !is_excluded(p, &set))
            .collect();
        assert_eq!(survivors, vec!["src/a.ts"]);
    }

    #[test]
    fn test_rule_order_does_not_change_result() {
        let forward = rules(&["*.log", "dist/", ".env"]);
        let mut reversed = forward.clone();
        reversed.reverse();
        for path in [
            "proj/a.log",
            "proj/dist/a.js",
            "proj/.env",
            "proj/src/main.rs",
            "dist/readme.md",
        ] {
            assert_eq!(is_excluded(path, &forward), is_excluded(path, &reversed));
        }
    }

    #[test]
    fn test_empty_rule_list_excludes_nothing() {
        assert!(!is_excluded("proj/anything.log", &[]));
    }

    #[test]
    fn test_parse_custom_rules_skips_blank_lines() {
        let parsed = parse_custom_rules("dist\r\n\n  *.log  \n\t\n.env\n");
        assert_eq!(parsed, rules(&["dist", "*.log", ".env"]));
    }

    #[test]
    fn test_rule_set_appends_custom_after_defaults() {
        let set = ExclusionRuleSet::with_defaults(&["secrets/"]);
        assert_eq!(set.rules().len(), DEFAULT_EXCLUSIONS.len() + 1);
        assert_eq!(
            set.rules().last(),
            Some(&ExclusionRule::DirectoryAnchor("secrets".to_string()))
        );
        assert!(set.is_excluded("proj/node_modules/react/index.js"));
        assert!(set.is_excluded("proj/.git/HEAD"));
        assert!(set.is_excluded("proj/secrets/key.pem"));
        assert!(!set.is_excluded("proj/src/main.rs"));
    }

    #[test]
    fn test_custom_only_set_has_no_defaults() {
        let set = ExclusionRuleSet::custom_only(&["*.tmp"]);
        assert!(!set.is_excluded("proj/node_modules/a.js"));
        assert!(set.is_excluded("proj/a.tmp"));
    }

    #[test]
    fn test_rule_display_round_trips_text() {
        for text in ["*.log", "dist/", ".env"] {
            assert_eq!(ExclusionRule::parse(text).unwrap().to_string(), text);
        }
    }
}
