//! Manual-edit reconciliation.
//!
//! When an operator hand-edits a caption and the dataset is later
//! reprocessed (new thresholds, new model), the fresh auto caption must
//! absorb the operator's edit without asking again. The edit is recovered as
//! a tag-level diff between the auto caption the operator saw and what they
//! saved, then replayed against the new auto caption.
//!
//! This is a best-effort structural merge, not a lossless one: where the new
//! model output changed in the edited region, the human content wins and is
//! placed at the nearest surviving anchor (or appended at the end).

use crate::types::Caption;

/// One operation in a tag-level edit script, anchored to `previous_auto`.
#[derive(Debug, Clone, PartialEq, Eq)]
enum EditOp {
    /// Tag untouched by the operator; used to locate positions in the new
    /// caption by content.
    Anchor(String),
    /// Tag the operator removed.
    Remove(String),
    /// Tag the operator inserted.
    Add(String),
}

/// Reapply a recorded human edit onto a freshly regenerated caption.
///
/// Pure function: identical inputs always produce identical output, so
/// repeated reconciliation is idempotent. `reconcile(p, h, p) == h` holds
/// for any previous caption `p` and human edit `h`.
pub fn reconcile(previous_auto: &Caption, human_edited: &Caption, new_auto: &Caption) -> Caption {
    let script = diff(previous_auto.tags(), human_edited.tags());
    Caption::from_tags(replay(&script, new_auto.tags()))
}

/// Compute the tag-level edit script via longest-common-subsequence.
fn diff(previous: &[String], edited: &[String]) -> Vec<EditOp> {
    let n = previous.len();
    let m = edited.len();

    // lcs[i][j] = LCS length of previous[i..] and edited[j..]
    let mut lcs = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if previous[i] == edited[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut ops = Vec::with_capacity(n + m);
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if previous[i] == edited[j] {
            ops.push(EditOp::Anchor(previous[i].clone()));
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            ops.push(EditOp::Remove(previous[i].clone()));
            i += 1;
        } else {
            ops.push(EditOp::Add(edited[j].clone()));
            j += 1;
        }
    }
    for tag in &previous[i..] {
        ops.push(EditOp::Remove(tag.clone()));
    }
    for tag in &edited[j..] {
        ops.push(EditOp::Add(tag.clone()));
    }
    ops
}

/// Replay an edit script against a new tag sequence.
///
/// The cursor tracks the insertion point: each matched anchor moves it just
/// past the anchor's position in the working sequence. Anchors are matched
/// forward from the cursor so a repeated tag binds to its own occurrence,
/// not an earlier duplicate; only when the suffix has no match does the
/// search wrap to the whole sequence. A missed anchor leaves the cursor at
/// the last matched one; if no anchor has matched at all, subsequent
/// insertions go to the end.
fn replay(script: &[EditOp], new_auto: &[String]) -> Vec<String> {
    let mut out: Vec<String> = new_auto.to_vec();
    let mut cursor: usize = 0;
    let mut matched_any = false;

    for op in script {
        match op {
            EditOp::Anchor(tag) => {
                let hit = out[cursor..]
                    .iter()
                    .position(|t| t == tag)
                    .map(|i| i + cursor)
                    .or_else(|| out.iter().position(|t| t == tag));
                if let Some(i) = hit {
                    cursor = i + 1;
                    matched_any = true;
                } else if !matched_any {
                    cursor = out.len();
                }
            }
            EditOp::Remove(tag) => {
                if let Some(i) = out.iter().position(|t| t == tag) {
                    out.remove(i);
                    if i < cursor {
                        cursor -= 1;
                    }
                }
            }
            EditOp::Add(tag) => {
                let at = cursor.min(out.len());
                out.insert(at, tag.clone());
                cursor = at + 1;
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caption(text: &str) -> Caption {
        Caption::parse(text)
    }

    #[test]
    fn unchanged_new_auto_returns_the_human_edit() {
        let p = caption("1girl, long hair, solo, smile");
        let h = caption("1girl, braided hair, solo");
        assert_eq!(reconcile(&p, &h, &p), h);
    }

    #[test]
    fn round_trip_holds_for_pure_insertion() {
        let p = caption("a, b, c");
        let h = caption("a, x, b, c, y");
        assert_eq!(reconcile(&p, &h, &p), h);
    }

    #[test]
    fn round_trip_holds_for_leading_insertion() {
        let p = caption("a, b");
        let h = caption("z, a, b");
        assert_eq!(reconcile(&p, &h, &p), h);
    }

    #[test]
    fn round_trip_holds_with_duplicate_tags() {
        let p = caption("a, a");
        let h = caption("a, a, z");
        assert_eq!(reconcile(&p, &h, &p), h);
    }

    #[test]
    fn insertion_between_duplicate_tags_stays_in_place() {
        let p = caption("a, a");
        let h = caption("a, x, a");
        assert_eq!(reconcile(&p, &h, &p), h);
    }

    #[test]
    fn deletion_carries_over_to_new_caption() {
        let p = caption("1girl, hat, solo");
        let h = caption("1girl, solo");
        let n = caption("1girl, hat, smile, solo");
        assert_eq!(reconcile(&p, &h, &n), caption("1girl, smile, solo"));
    }

    #[test]
    fn insertion_follows_its_anchor_in_the_new_caption() {
        let p = caption("a, b");
        let h = caption("a, inserted, b");
        // The anchor "a" moved; the insertion follows it.
        let n = caption("x, a, b");
        assert_eq!(reconcile(&p, &h, &n), caption("x, a, inserted, b"));
    }

    #[test]
    fn missing_anchor_falls_back_to_earlier_anchor() {
        let p = caption("a, b, c");
        let h = caption("a, b, human, c");
        // "b" vanished from the new output; the insertion lands after "a".
        let n = caption("a, c2, c");
        let result = reconcile(&p, &h, &n);
        let tags = result.tags();
        let a = tags.iter().position(|t| t == "a").unwrap();
        let human = tags.iter().position(|t| t == "human").unwrap();
        assert!(human > a, "insertion must stay after its earlier anchor");
        assert!(tags.contains(&"c".to_string()));
    }

    #[test]
    fn no_matching_anchor_appends_at_end() {
        let p = caption("a");
        let h = caption("a, z");
        let n = caption("q, r");
        assert_eq!(reconcile(&p, &h, &n), caption("q, r, z"));
    }

    #[test]
    fn deletion_of_absent_tag_is_a_no_op() {
        let p = caption("a, gone");
        let h = caption("a");
        let n = caption("a, b");
        assert_eq!(reconcile(&p, &h, &n), caption("a, b"));
    }

    #[test]
    fn reconciliation_is_idempotent_for_fixed_inputs() {
        let p = caption("a, b, c, d");
        let h = caption("a, x, c");
        let n = caption("a, c, d, e");
        let once = reconcile(&p, &h, &n);
        let twice = reconcile(&p, &h, &n);
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_previous_treats_whole_edit_as_insertion() {
        let p = caption("");
        let h = caption("hand, made");
        let n = caption("auto");
        // No anchors exist; the hand-written tags lead, new output follows.
        assert_eq!(reconcile(&p, &h, &n), caption("hand, made, auto"));
    }

    #[test]
    fn empty_human_edit_removes_everything_that_survived() {
        let p = caption("a, b");
        let h = caption("");
        let n = caption("a, c");
        assert_eq!(reconcile(&p, &h, &n), caption("c"));
    }
}
