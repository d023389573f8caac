//! Transform rule set and the text forms it round-trips through.
//!
//! Rule fields are stored per dataset folder as plain strings (comma lists,
//! one map rule per line), so parsing lives here next to the types.

use std::collections::BTreeSet;

/// A single tag mapping rule: if any source tag is present, all source tags
/// are removed and the targets are inserted at the first removed position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapRule {
    pub sources: Vec<String>,
    pub targets: Vec<String>,
}

/// The full transform rule set for one dataset folder.
#[derive(Debug, Clone, Default)]
pub struct TagRules {
    /// Replace ASCII underscores with spaces in tag strings.
    pub replace_underscores: bool,

    /// Drop a general tag when the same string exists among the selected
    /// character tags.
    pub trim_general_tag_dupes: bool,

    /// Escape literal parentheses for downstream prompt consumers.
    pub escape_brackets: bool,

    /// Tags emitted before the `BREAK` separator, in declared order.
    pub prefix_tags: Vec<String>,

    /// Tags exempt from banning.
    pub keep_tags: BTreeSet<String>,

    /// Tags dropped from the output (unless also in `keep_tags`).
    pub ban_tags: BTreeSet<String>,

    /// Mapping rules, applied in declared order.
    pub map_tags: Vec<MapRule>,

    /// Tags that keep literal underscores even when `replace_underscores`
    /// is set. Empty by default.
    pub keep_underscore_tags: BTreeSet<String>,
}

impl TagRules {
    /// Build a rule set from the stored string forms of the four rule fields.
    pub fn with_rule_text(mut self, prefix: &str, keep: &str, ban: &str, map: &str) -> Self {
        self.prefix_tags = parse_tag_list(prefix);
        self.keep_tags = parse_tag_list(keep).into_iter().collect();
        self.ban_tags = parse_tag_list(ban).into_iter().collect();
        self.map_tags = parse_map_rules(map);
        self
    }
}

/// Parse a comma-separated tag list, trimming whitespace and dropping
/// empty entries.
pub fn parse_tag_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// Parse map rules, one per line: `src1, src2, ... : tgt1, tgt2, ...`.
///
/// Lines without a colon or with an empty source list are skipped with a
/// warning rather than failing the whole rule set.
pub fn parse_map_rules(text: &str) -> Vec<MapRule> {
    let mut rules = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Some((sources_text, targets_text)) = line.split_once(':') else {
            tracing::warn!("Ignoring map rule without ':' separator: {line:?}");
            continue;
        };

        let sources = parse_tag_list(sources_text);
        if sources.is_empty() {
            tracing::warn!("Ignoring map rule with no source tags: {line:?}");
            continue;
        }

        rules.push(MapRule {
            sources,
            targets: parse_tag_list(targets_text),
        });
    }

    rules
}
