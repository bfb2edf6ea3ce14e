//! Character-level diff over UTF-16 code units.
//!
//! Raw runs come from `similar`'s Myers diff. On top of that sit the two cleanup passes
//! the patch encoder relies on: a lossless merge/normalise pass and an efficiency pass
//! that trades a few extra changed characters for fewer ops.

use similar::{capture_diff_slices, Algorithm, DiffOp};

/// Kind of a diff run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiffKind {
    Equal,
    Delete,
    Insert,
}

/// A run of characters that are kept, removed or added.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diff {
    pub kind: DiffKind,
    pub text: Vec<u16>,
}

impl Diff {
    pub fn new(kind: DiffKind, text: &[u16]) -> Self {
        Self { kind, text: text.to_vec() }
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Diff `old` against `new`. The result is sound (replaying it rebuilds both texts)
/// and already normalised by [`cleanup_merge`].
pub fn diff(old: &[u16], new: &[u16]) -> Vec<Diff> {
    let mut diffs = Vec::new();
    for op in capture_diff_slices(Algorithm::Myers, old, new) {
        match op {
            DiffOp::Equal { old_index, len, .. } => {
                diffs.push(Diff::new(DiffKind::Equal, &old[old_index..old_index + len]));
            }
            DiffOp::Delete { old_index, old_len, .. } => {
                diffs.push(Diff::new(DiffKind::Delete, &old[old_index..old_index + old_len]));
            }
            DiffOp::Insert { new_index, new_len, .. } => {
                diffs.push(Diff::new(DiffKind::Insert, &new[new_index..new_index + new_len]));
            }
            DiffOp::Replace { old_index, old_len, new_index, new_len } => {
                diffs.push(Diff::new(DiffKind::Delete, &old[old_index..old_index + old_len]));
                diffs.push(Diff::new(DiffKind::Insert, &new[new_index..new_index + new_len]));
            }
        }
    }
    cleanup_merge(&mut diffs);
    diffs
}

/// Merge adjacent runs of the same kind, factor shared affixes out of delete/insert
/// pairs and slide single edits sideways to absorb neighbouring equalities.
pub fn cleanup_merge(diffs: &mut Vec<Diff>) {
    diffs.retain(|d| !d.is_empty());
    // Sentinel so the trailing edit group gets flushed.
    diffs.push(Diff { kind: DiffKind::Equal, text: Vec::new() });

    let mut pointer = 0usize;
    let mut count_delete = 0usize;
    let mut count_insert = 0usize;
    let mut text_delete: Vec<u16> = Vec::new();
    let mut text_insert: Vec<u16> = Vec::new();

    while pointer < diffs.len() {
        match diffs[pointer].kind {
            DiffKind::Insert => {
                count_insert += 1;
                text_insert.extend_from_slice(&diffs[pointer].text);
                pointer += 1;
            }
            DiffKind::Delete => {
                count_delete += 1;
                text_delete.extend_from_slice(&diffs[pointer].text);
                pointer += 1;
            }
            DiffKind::Equal => {
                if count_delete + count_insert > 1 {
                    if count_delete != 0 && count_insert != 0 {
                        let prefix = common_prefix(&text_insert, &text_delete);
                        if prefix != 0 {
                            let head = text_insert[..prefix].to_vec();
                            let before = pointer.checked_sub(count_delete + count_insert + 1);
                            match before {
                                Some(x) if diffs[x].kind == DiffKind::Equal => {
                                    diffs[x].text.extend_from_slice(&head);
                                }
                                _ => {
                                    diffs.insert(0, Diff { kind: DiffKind::Equal, text: head });
                                    pointer += 1;
                                }
                            }
                            text_insert.drain(..prefix);
                            text_delete.drain(..prefix);
                        }
                        let suffix = common_suffix(&text_insert, &text_delete);
                        if suffix != 0 {
                            let mut tail = text_insert[text_insert.len() - suffix..].to_vec();
                            tail.extend_from_slice(&diffs[pointer].text);
                            diffs[pointer].text = tail;
                            text_insert.truncate(text_insert.len() - suffix);
                            text_delete.truncate(text_delete.len() - suffix);
                        }
                    }

                    let start = pointer - count_delete - count_insert;
                    let mut merged = Vec::with_capacity(2);
                    if !text_delete.is_empty() {
                        merged.push(Diff { kind: DiffKind::Delete, text: std::mem::take(&mut text_delete) });
                    }
                    if !text_insert.is_empty() {
                        merged.push(Diff { kind: DiffKind::Insert, text: std::mem::take(&mut text_insert) });
                    }
                    let n = merged.len();
                    diffs.splice(start..pointer, merged);
                    pointer = start + n + 1;
                } else if pointer != 0 && diffs[pointer - 1].kind == DiffKind::Equal {
                    let text = diffs.remove(pointer).text;
                    diffs[pointer - 1].text.extend_from_slice(&text);
                } else {
                    pointer += 1;
                }
                count_delete = 0;
                count_insert = 0;
                text_delete.clear();
                text_insert.clear();
            }
        }
    }
    if diffs.last().is_some_and(Diff::is_empty) {
        diffs.pop();
    }

    // Second pass: single edits surrounded by equalities that can be shifted to
    // eliminate one of them, eg `A<ins>BA</ins>C` -> `<ins>AB</ins>AC`.
    let mut changes = false;
    let mut pointer = 1usize;
    while pointer + 1 < diffs.len() {
        if diffs[pointer - 1].kind == DiffKind::Equal && diffs[pointer + 1].kind == DiffKind::Equal {
            let prev = diffs[pointer - 1].text.clone();
            let next = diffs[pointer + 1].text.clone();
            let cur = diffs[pointer].text.clone();
            if cur.ends_with(&prev) {
                if !prev.is_empty() {
                    let mut shifted = prev.clone();
                    shifted.extend_from_slice(&cur[..cur.len() - prev.len()]);
                    diffs[pointer].text = shifted;
                    let mut after = prev;
                    after.extend_from_slice(&next);
                    diffs[pointer + 1].text = after;
                    diffs.remove(pointer - 1);
                    changes = true;
                }
            } else if cur.starts_with(&next) {
                diffs[pointer - 1].text.extend_from_slice(&next);
                let mut shifted = cur[next.len()..].to_vec();
                shifted.extend_from_slice(&next);
                diffs[pointer].text = shifted;
                diffs.remove(pointer + 1);
                changes = true;
            }
        }
        pointer += 1;
    }
    if changes {
        cleanup_merge(diffs);
    }
}

/// Fold short equalities that sit between edits into those edits.
///
/// An equality shorter than `edit_cost` is absorbed when it has edits of both kinds on
/// both sides, or when it is shorter than half the cost and three of the four
/// surrounding edit slots are filled. Larger `edit_cost` means fewer, longer ops.
/// Equalities rejected by `absorbable` are always kept as they are.
pub fn cleanup_efficiency(
    diffs: &mut Vec<Diff>,
    edit_cost: usize,
    absorbable: impl Fn(&[u16]) -> bool,
) {
    let mut changes = false;
    // Indices of candidate equalities.
    let mut equalities: Vec<usize> = Vec::new();
    let mut last_equality: Option<Vec<u16>> = None;
    let mut pointer: isize = 0;
    let (mut pre_ins, mut pre_del) = (false, false);
    let (mut post_ins, mut post_del) = (false, false);

    while (pointer as usize) < diffs.len() {
        let p = pointer as usize;
        if diffs[p].kind == DiffKind::Equal {
            if diffs[p].len() < edit_cost && (post_ins || post_del) && absorbable(&diffs[p].text) {
                equalities.push(p);
                pre_ins = post_ins;
                pre_del = post_del;
                last_equality = Some(diffs[p].text.clone());
            } else {
                equalities.clear();
                last_equality = None;
            }
            post_ins = false;
            post_del = false;
        } else {
            if diffs[p].kind == DiffKind::Delete {
                post_del = true;
            } else {
                post_ins = true;
            }

            let filled = [pre_ins, pre_del, post_ins, post_del].iter().filter(|f| **f).count();
            let absorb = match &last_equality {
                Some(eq) if !eq.is_empty() => filled == 4 || (eq.len() * 2 < edit_cost && filled == 3),
                _ => false,
            };

            if absorb {
                if let (Some(&at), Some(text)) = (equalities.last(), last_equality.take()) {
                    diffs.insert(at, Diff { kind: DiffKind::Delete, text: text.clone() });
                    diffs[at + 1] = Diff { kind: DiffKind::Insert, text };
                    equalities.pop();
                    if pre_ins && pre_del {
                        // No changes made which could affect previous entry, keep going.
                        post_ins = true;
                        post_del = true;
                        equalities.clear();
                    } else {
                        // Throw away the previous equality, it needs to be re-evaluated.
                        equalities.pop();
                        pointer = equalities.last().map_or(-1, |&i| i as isize);
                        post_ins = false;
                        post_del = false;
                    }
                    changes = true;
                }
            }
        }
        pointer += 1;
    }

    if changes {
        cleanup_merge(diffs);
    }
}

fn common_prefix(a: &[u16], b: &[u16]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

fn common_suffix(a: &[u16], b: &[u16]) -> usize {
    a.iter().rev().zip(b.iter().rev()).take_while(|(x, y)| x == y).count()
}
