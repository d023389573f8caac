//! Tag transform pipeline: selected tags in, final caption out.
//!
//! The processing order is fixed and load-bearing — reordering the steps
//! changes output:
//!
//! 1. sort general tags by confidence descending (character tags lead)
//! 2. trim general tags duplicated among character tags
//! 3. ban tags (keep list wins)
//! 4. map rules, in declared order
//! 5. underscore -> space
//! 6. escape parentheses
//! 7. prefix segment + `BREAK`
//! 8. join with `", "`

mod rules;

pub use rules::{parse_map_rules, parse_tag_list, MapRule, TagRules};

use crate::threshold::{select_tags, ThresholdOptions};
use crate::types::{Caption, RawPrediction, ScoreMap, TagOutput};

/// Separator token emitted between the prefix segment and the tag sequence.
pub const PREFIX_SEPARATOR: &str = "BREAK";

/// Run the full post-processing pipeline on a raw prediction.
pub fn process_prediction(
    prediction: &RawPrediction,
    general: ThresholdOptions,
    character: ThresholdOptions,
    rules: &TagRules,
) -> TagOutput {
    let selected_general = select_tags(&prediction.general, general);
    let selected_character = select_tags(&prediction.character, character);

    let general_map: ScoreMap = selected_general.iter().cloned().collect();
    let character_map: ScoreMap = selected_character.iter().cloned().collect();

    // Character tags lead the sequence; both halves are confidence-sorted.
    let mut sequence: Vec<String> = selected_character
        .iter()
        .map(|(tag, _)| tag.clone())
        .collect();
    for (tag, _) in &selected_general {
        if rules.trim_general_tag_dupes && character_map.contains_key(tag) {
            continue;
        }
        sequence.push(tag.clone());
    }

    apply_bans(&mut sequence, rules);
    apply_map_rules(&mut sequence, &rules.map_tags);

    if rules.replace_underscores {
        for tag in &mut sequence {
            if !rules.keep_underscore_tags.contains(tag.as_str()) {
                *tag = tag.replace('_', " ");
            }
        }
    }

    if rules.escape_brackets {
        for tag in &mut sequence {
            *tag = escape_brackets(tag);
        }
    }

    if !rules.prefix_tags.is_empty() {
        let mut prefixed = rules.prefix_tags.clone();
        prefixed.push(PREFIX_SEPARATOR.to_string());
        prefixed.append(&mut sequence);
        sequence = prefixed;
    }

    TagOutput {
        caption: Caption::from_tags(sequence),
        rating: prediction.rating.clone(),
        general: general_map,
        character: character_map,
    }
}

/// Drop banned tags; the keep list takes precedence over the ban list.
fn apply_bans(sequence: &mut Vec<String>, rules: &TagRules) {
    if rules.ban_tags.is_empty() {
        return;
    }
    sequence.retain(|tag| !rules.ban_tags.contains(tag) || rules.keep_tags.contains(tag));
}

/// Apply map rules in declared order.
///
/// A rule fires if any of its sources is present: every source occurrence is
/// removed and the targets are spliced in at the position of the first
/// removed tag. Tags consumed by an earlier rule are gone from the sequence
/// and so are not eligible for later rules.
fn apply_map_rules(sequence: &mut Vec<String>, map_rules: &[MapRule]) {
    for rule in map_rules {
        let positions: Vec<usize> = sequence
            .iter()
            .enumerate()
            .filter(|(_, tag)| rule.sources.iter().any(|s| s == *tag))
            .map(|(i, _)| i)
            .collect();

        if positions.is_empty() {
            continue;
        }

        let insert_at = positions[0];
        for &i in positions.iter().rev() {
            sequence.remove(i);
        }
        for (offset, target) in rule.targets.iter().enumerate() {
            sequence.insert(insert_at + offset, target.clone());
        }
    }
}

/// Escape literal parentheses (significant to webui-style prompt parsers).
fn escape_brackets(tag: &str) -> String {
    tag.replace('(', "\\(").replace(')', "\\)")
}
