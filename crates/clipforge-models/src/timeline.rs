//! Deterministic long-form ordering and input fingerprints.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::{ArtifactKey, Clip, ClipId, ReviewState};

/// Order clips for assembly: `order` ascending, ties by `id` ascending.
pub fn assembly_order<'a, I>(clips: I) -> Vec<&'a Clip>
where
    I: IntoIterator<Item = &'a Clip>,
{
    let mut ordered: Vec<&Clip> = clips.into_iter().collect();
    ordered.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
    ordered
}

/// Approved clips of a project in assembly order.
pub fn approved_in_order(clips: &[Clip]) -> Vec<&Clip> {
    assembly_order(clips.iter().filter(|c| c.review_state == ReviewState::Approved))
}

/// Fingerprint of an ordered assembly input set.
///
/// Hex SHA-256 over `id \0 path \n` for each entry, so both membership and
/// order changes produce a new value.
pub fn fingerprint<'a, I>(entries: I) -> String
where
    I: IntoIterator<Item = (&'a ClipId, &'a ArtifactKey)>,
{
    let mut hasher = Sha256::new();
    for (id, path) in entries {
        hasher.update(id.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(path.as_str().as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

/// Fingerprint of an already ordered clip slice; clips without a rendered
/// artifact are skipped.
pub fn fingerprint_clips(ordered: &[&Clip]) -> String {
    fingerprint(
        ordered
            .iter()
            .copied()
            .filter_map(|c| c.rendered_path.as_ref().map(|p| (&c.id, p))),
    )
}

/// Long-form pacing arrangement.
///
/// The highest scoring clip opens the cut, then the remaining clips are
/// interleaved round-robin across emotion labels. Inside a label clips go by
/// score descending; labels are visited in order of their best score. Every
/// comparison falls back to the clip id so the result is deterministic.
///
/// Returns `(clip id, new order)` pairs, order values starting at 0.
pub fn arrange_for_longform(clips: &[&Clip]) -> Vec<(ClipId, i64)> {
    let mut by_score: Vec<&Clip> = clips.to_vec();
    by_score.sort_by(|a, b| compare_score_desc(a, b));

    let Some((cold_open, rest)) = by_score.split_first() else {
        return Vec::new();
    };

    let mut groups: BTreeMap<&str, Vec<&Clip>> = BTreeMap::new();
    for clip in rest {
        groups.entry(clip.emotion_label.as_str()).or_default().push(*clip);
    }

    // Each group is already score-descending because `rest` is.
    let mut lanes: Vec<Vec<&Clip>> = groups.into_values().collect();
    lanes.sort_by(|a, b| compare_score_desc(a[0], b[0]));

    let mut arranged: Vec<&Clip> = vec![*cold_open];
    let mut cursor = vec![0usize; lanes.len()];
    while arranged.len() < by_score.len() {
        for (lane, idx) in lanes.iter().zip(cursor.iter_mut()) {
            if let Some(clip) = lane.get(*idx) {
                arranged.push(*clip);
                *idx += 1;
            }
        }
    }

    arranged
        .into_iter()
        .enumerate()
        .map(|(position, clip)| (clip.id.clone(), position as i64))
        .collect()
}

fn compare_score_desc(a: &Clip, b: &Clip) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NewClip, ProjectId, RenderState};

    fn clip(id: &str, order: i64) -> Clip {
        Clip::new(NewClip {
            id: ClipId::from(id),
            project_id: ProjectId::from("p1"),
            source_path: format!("/raw/{id}.mp4"),
            start: None,
            end: None,
            order: Some(order),
            emotion_label: "Funny".to_string(),
            score: 0.5,
        })
    }

    fn scored(id: &str, label: &str, score: f64) -> Clip {
        let mut c = clip(id, 0);
        c.emotion_label = label.to_string();
        c.score = score;
        c
    }

    fn rendered(mut c: Clip) -> Clip {
        c.review_state = ReviewState::Approved;
        c.render_state = RenderState::Rendered;
        c.rendered_path = Some(ArtifactKey::new(format!("shorts/p1/{}.mp4", c.id)).unwrap());
        c
    }

    #[test]
    fn test_order_then_id() {
        // A(order=2), B(order=1), C(order=1, id=c1), D(order=1, id=c0)
        let clips = vec![clip("clip-a", 2), clip("clip-b", 1), clip("c1", 1), clip("c0", 1)];
        let ordered: Vec<&str> = assembly_order(&clips).iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ordered, vec!["c0", "c1", "clip-b", "clip-a"]);
    }

    #[test]
    fn test_order_is_input_order_independent() {
        let a = vec![clip("x", 3), clip("y", 1), clip("z", 1)];
        let b = vec![clip("z", 1), clip("x", 3), clip("y", 1)];
        let ids = |v: &Vec<Clip>| -> Vec<String> {
            assembly_order(v).iter().map(|c| c.id.to_string()).collect()
        };
        assert_eq!(ids(&a), ids(&b));
    }

    #[test]
    fn test_approved_filter() {
        let mut pending = clip("p", 0);
        pending.review_state = ReviewState::Pending;
        let mut approved = clip("a", 5);
        approved.review_state = ReviewState::Approved;
        let clips = vec![pending, approved];
        let ids: Vec<&str> = approved_in_order(&clips).iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[test]
    fn test_fingerprint_sensitive_to_order_and_paths() {
        let a = rendered(clip("a", 0));
        let b = rendered(clip("b", 1));
        let ab = fingerprint_clips(&[&a, &b]);
        let ba = fingerprint_clips(&[&b, &a]);
        assert_ne!(ab, ba);
        assert_eq!(ab, fingerprint_clips(&[&a, &b]));

        let mut b2 = b.clone();
        b2.rendered_path = Some(ArtifactKey::new("shorts/p1/b-v2.mp4").unwrap());
        assert_ne!(ab, fingerprint_clips(&[&a, &b2]));
        assert_eq!(ab.len(), 64);
    }

    #[test]
    fn test_arrange_cold_open_and_round_robin() {
        let clips = vec![
            scored("f1", "Funny", 0.9),
            scored("f2", "Funny", 0.7),
            scored("f3", "Funny", 0.2),
            scored("s1", "Sad", 0.8),
            scored("s2", "Sad", 0.1),
            scored("w1", "Wow", 0.95),
        ];
        let refs: Vec<&Clip> = clips.iter().collect();
        let arranged: Vec<String> = arrange_for_longform(&refs)
            .into_iter()
            .map(|(id, _)| id.to_string())
            .collect();

        // w1 opens; lanes ordered by best score: Funny(0.9), Sad(0.8)
        assert_eq!(arranged, vec!["w1", "f1", "s1", "f2", "s2", "f3"]);
    }

    #[test]
    fn test_arrange_empty() {
        assert!(arrange_for_longform(&[]).is_empty());
    }
}
