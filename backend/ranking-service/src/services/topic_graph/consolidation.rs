use super::TopicNode;
use std::collections::{BTreeMap, HashMap};

/// Reduces a topic name to the key used to detect near-duplicate topics.
///
/// Swappable so the merge precision can be tuned without touching the graph
/// builder.
pub trait StemPolicy: Send + Sync {
    fn stem(&self, name: &str) -> String;
}

/// Lowercase, separator folding and naive English depluralization.
///
/// "Techs" → "tech", "Categories" → "category", "Physics" stays "physics"
/// (ends in "is"), "Status" stays "status" (ends in "us").
#[derive(Debug, Clone, Copy, Default)]
pub struct NaiveDepluralizer;

impl StemPolicy for NaiveDepluralizer {
    fn stem(&self, name: &str) -> String {
        let mut s = name.trim().to_lowercase().replace(|c: char| c == '-' || c == '_', " ");

        let len = s.chars().count();
        if len > 4 && s.ends_with("ies") {
            s.truncate(s.len() - 3);
            s.push('y');
        } else if len > 3 && s.ends_with('s') {
            let before = s[..s.len() - 1].chars().last();
            if !matches!(before, Some('s') | Some('u') | Some('i')) {
                s.pop();
            }
        }

        s.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

/// Map every non-canonical member of a stem group to its canonical topic.
///
/// The canonical member is the one with the highest clip_count; equal counts
/// resolve to the lexicographically smallest id. Canonical topics never
/// appear as keys, so the map is single-level.
pub fn build_canonical_map<'a, I>(nodes: I, policy: &dyn StemPolicy) -> HashMap<String, String>
where
    I: IntoIterator<Item = &'a TopicNode>,
{
    let mut groups: BTreeMap<String, Vec<&TopicNode>> = BTreeMap::new();
    for node in nodes {
        groups.entry(policy.stem(&node.name)).or_default().push(node);
    }

    let mut canonical = HashMap::new();
    for (_, mut group) in groups {
        if group.len() <= 1 {
            continue;
        }
        group.sort_by(|a, b| b.clip_count.cmp(&a.clip_count).then_with(|| a.id.cmp(&b.id)));
        let canon_id = group[0].id.clone();
        for node in &group[1..] {
            canonical.insert(node.id.clone(), canon_id.clone());
        }
    }
    canonical
}
