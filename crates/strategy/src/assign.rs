//! Legal compound assignments for a stint count.

use model::Compound;

/// Regulation floor: at least two different dry compounds per race.
pub const MIN_DISTINCT_COMPOUNDS: usize = 2;

fn distinct_count(seq: &[Compound]) -> usize {
    Compound::ALL.iter().filter(|c| seq.contains(*c)).count()
}

/// Every sequence of `stints` compound choices using at least
/// [`MIN_DISTINCT_COMPOUNDS`] distinct compounds, in Cartesian order
/// (soft before medium before hard at every position).
///
/// A single stint can never satisfy the two-compound floor, so `stints == 1`
/// yields an empty set and no-stop plans are never selectable.
pub fn compound_assignments(stints: usize) -> Vec<Vec<Compound>> {
    if stints == 0 {
        return Vec::new();
    }
    let mut seqs: Vec<Vec<Compound>> = vec![Vec::with_capacity(stints)];
    for _ in 0..stints {
        let mut next = Vec::with_capacity(seqs.len() * Compound::ALL.len());
        for seq in &seqs {
            for &compound in &Compound::ALL {
                let mut extended = seq.clone();
                extended.push(compound);
                next.push(extended);
            }
        }
        seqs = next;
    }
    seqs.retain(|seq| distinct_count(seq) >= MIN_DISTINCT_COMPOUNDS);
    seqs
}
