use crate::libs::gene::{QueryGene, QueryIndex};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Scrambles which gene sits at which position.
///
/// Every location keeps its scaffold and coordinates, only the gene ids are
/// permuted over all scaffolds. Walking the result gives the background rate
/// of chance blocks for a given minimum block size.
pub fn shuffle_genes<R: Rng + ?Sized>(index: &QueryIndex, rng: &mut R) -> QueryIndex {
    let mut names: Vec<&String> = vec![];
    let mut slots: Vec<(&String, &QueryGene)> = vec![];
    for (scaffold, genes) in index {
        for (name, gene) in genes {
            names.push(name);
            slots.push((scaffold, gene));
        }
    }

    names.shuffle(rng);

    let mut shuffled = QueryIndex::new();
    for (name, (scaffold, gene)) in names.into_iter().zip(slots) {
        shuffled
            .entry(scaffold.clone())
            .or_default()
            .insert(name.clone(), gene.clone());
    }
    log::info!("Randomized {} genes", shuffled.values().map(|g| g.len()).sum::<usize>());

    shuffled
}

/// Seeded when a seed is given, otherwise from the thread RNG.
pub fn shuffle_with_seed(index: &QueryIndex, seed: Option<u64>) -> QueryIndex {
    log::info!("Randomizing query gene positions");
    match seed {
        Some(seed) => shuffle_genes(index, &mut StdRng::seed_from_u64(seed)),
        None => shuffle_genes(index, &mut rand::thread_rng()),
    }
}
