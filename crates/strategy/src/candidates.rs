//! Bounded sampling of lap-count partitions.
//!
//! Deliberately not an exhaustive integer-partition enumeration: a small
//! practically-motivated sample around even splits keeps the search tiny.
//! Changing the sampling rule changes which plans win, so the offsets and
//! ranges here are load-bearing.

use std::collections::HashSet;

/// Offsets applied around the even split, inclusive both ends.
const SPLIT_OFFSET: i64 = 3;

fn push_unique(seen: &mut HashSet<Vec<u32>>, out: &mut Vec<Vec<u32>>, partition: Vec<u32>) {
    if seen.insert(partition.clone()) {
        out.push(partition);
    }
}

/// Candidate partitions of `total_laps` into 1..=4 stints, deduplicated by
/// the literal lap-count sequence, in generation order.
pub fn lap_partitions(total_laps: u32) -> Vec<Vec<u32>> {
    let total = total_laps as i64;
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    // 1-stop: jitter around the half split.
    let half = total / 2;
    for offset in -SPLIT_OFFSET..=SPLIT_OFFSET {
        let first = (half + offset).max(1);
        let second = total - first;
        if second > 0 {
            push_unique(&mut seen, &mut out, vec![first as u32, second as u32]);
        }
    }

    // 2-stop: jitter the first two stints around the third split.
    let third = total / 3;
    for o1 in -SPLIT_OFFSET..=SPLIT_OFFSET {
        for o2 in -SPLIT_OFFSET..=SPLIT_OFFSET {
            let a = (third + o1).max(1);
            let b = (third + o2).max(1);
            let c = total - a - b;
            if c > 0 {
                push_unique(&mut seen, &mut out, vec![a as u32, b as u32, c as u32]);
            }
        }
    }

    // 3-stop: single quarter-split baseline, last stint absorbs the remainder.
    let quarter = (total / 4).max(1);
    let last = total - 3 * quarter;
    if last > 0 {
        push_unique(
            &mut seen,
            &mut out,
            vec![quarter as u32, quarter as u32, quarter as u32, last as u32],
        );
    }

    // No-stop candidate.
    push_unique(&mut seen, &mut out, vec![total_laps]);

    out
}
