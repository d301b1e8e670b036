use crate::libs::gene::{ordered_genes, QueryGene, QueryIndex, RefGene, RefIndex};
use crate::libs::homology::HomologyMap;
use indexmap::IndexMap;
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Walking parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkOpts {
    /// Shortest chain reported as a block, at least 2
    pub min_block: usize,
    /// Consecutive unmatched query genes tolerated
    pub max_span: usize,
    /// Largest gap in bases, on either genome
    pub max_distance: i64,
}

impl WalkOpts {
    /// ```
    /// # use msyn::libs::synteny::WalkOpts;
    /// let opts = WalkOpts::new(1, 5, 30000);
    /// assert_eq!(opts.min_block, 2);
    /// ```
    pub fn new(min_block: usize, max_span: usize, max_distance: i64) -> Self {
        let min_block = if min_block < 2 {
            log::warn!(
                "Minimum colinearity must be greater than 1, {} given; setting it to 2",
                min_block
            );
            2
        } else {
            min_block
        };
        Self {
            min_block,
            max_span,
            max_distance: max_distance.max(0),
        }
    }
}

impl Default for WalkOpts {
    fn default() -> Self {
        Self {
            min_block: 3,
            max_span: 5,
            max_distance: 30000,
        }
    }
}

/// A query gene linked to a reference gene.
#[derive(Debug, Clone, PartialEq)]
pub struct Pair {
    pub query_id: String,
    pub query: QueryGene,
    pub ref_id: String,
    pub reference: RefGene,
    pub score: f64,
}

/// A collinear run of pairs on one query scaffold and one reference scaffold.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// 1-based, assigned in scaffold then position order
    pub id: usize,
    pub scaffold: String,
    pub ref_scaffold: String,
    pub pairs: Vec<Pair>,
    pub q_start: i64,
    pub q_end: i64,
    pub r_start: i64,
    pub r_end: i64,
    pub strand: char,
}

impl Block {
    fn from_pairs(scaffold: &str, ref_scaffold: &str, pairs: Vec<Pair>) -> Self {
        let first = &pairs[0];
        let last = &pairs[pairs.len() - 1];
        let q_start = first.query.start;
        let q_end = last.query.end;

        // Only the outermost pairs decide the orientation
        let mut r_start = first.reference.start;
        let mut r_end = last.reference.end;
        let strand = if r_end > r_start {
            '+'
        } else {
            std::mem::swap(&mut r_start, &mut r_end);
            '-'
        };

        Self {
            id: 0,
            scaffold: scaffold.to_string(),
            ref_scaffold: ref_scaffold.to_string(),
            pairs,
            q_start,
            q_end,
            r_start,
            r_end,
            strand,
        }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn label(&self) -> String {
        format!("blk-{}", self.id)
    }

    /// Bases covered on the query scaffold
    pub fn span(&self) -> i64 {
        self.q_end - self.q_start
    }
}

/// Summary of a whole run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunStats {
    /// block length => number of blocks
    pub histogram: BTreeMap<usize, usize>,
    pub base_total: i64,
    pub max_scaffold_genes: usize,
    /// Anchors whose best hit repeats the previous anchor's best hit
    pub split_genes: usize,
}

impl RunStats {
    pub fn blocks(&self) -> usize {
        self.histogram.values().sum()
    }

    pub fn genes(&self) -> usize {
        self.histogram.iter().map(|(len, n)| len * n).sum()
    }

    pub fn longest(&self) -> usize {
        self.histogram.keys().next_back().copied().unwrap_or(0)
    }

    pub fn mean(&self) -> f64 {
        let blocks = self.blocks();
        if blocks == 0 {
            0.0
        } else {
            self.genes() as f64 / blocks as f64
        }
    }

    fn add_block(&mut self, block: &Block) {
        *self.histogram.entry(block.len()).or_default() += 1;
        self.base_total += block.span();
    }
}

/// Result of walking one scaffold. Blocks are not numbered yet.
#[derive(Debug, Default)]
pub struct ScaffoldWalk {
    pub blocks: Vec<Block>,
    pub gene_count: usize,
    pub split_genes: usize,
    /// Best hit of the first anchor tried, compared against the previous scaffold
    pub first_top: Option<String>,
    pub last_top: Option<String>,
}

/// A chain under construction.
struct Chain<'a> {
    ref_scaffold: &'a str,
    ref_start: i64,
    ref_end: i64,
    last_ref: &'a str,
    query_end: i64,
    /// (gene index, reference id, score)
    links: Vec<(usize, &'a str, f64)>,
    /// Gene indices claimed by this chain, continuations included
    taken: Vec<usize>,
}

impl<'a> Chain<'a> {
    fn new(
        anchor: usize,
        gene: &QueryGene,
        ref_id: &'a str,
        model: &'a RefGene,
        score: f64,
    ) -> Self {
        Self {
            ref_scaffold: &model.scaffold,
            ref_start: model.start,
            ref_end: model.end,
            last_ref: ref_id,
            query_end: gene.end,
            links: vec![(anchor, ref_id, score)],
            taken: vec![anchor],
        }
    }
}

struct Walker<'a> {
    scaffold: &'a str,
    genes: Vec<(&'a str, &'a QueryGene)>,
    refs: &'a RefIndex,
    homology: &'a HomologyMap,
    opts: WalkOpts,
}

impl<'a> Walker<'a> {
    /// Extends a chain from `anchor` over the following genes.
    ///
    /// `consumed` marks genes already in blocks on this scaffold. The returned
    /// chain lists the genes it would claim; nothing is committed here.
    fn extend(
        &self,
        anchor: usize,
        ref_id: &'a str,
        model: &'a RefGene,
        score: f64,
        consumed: &[bool],
    ) -> Chain<'a> {
        let opts = &self.opts;
        let mut chain = Chain::new(anchor, self.genes[anchor].1, ref_id, model, score);
        let mut budget = opts.max_span;

        for j in anchor + 1..self.genes.len() {
            let (next_id, next_gene) = self.genes[j];
            if budget == 0 {
                log::debug!(
                    "Limit reached at {}, stopping walk for {}",
                    next_id,
                    self.genes[anchor].0
                );
                break;
            }

            let gap = next_gene.start - chain.query_end;
            if gap > opts.max_distance {
                log::debug!("Next gene {} is {} bases away, stopping walk", next_id, gap);
                break;
            }
            chain.query_end = next_gene.end;

            if consumed[j] {
                log::debug!("{} already in a block, skipping gene", next_id);
                budget -= 1;
                continue;
            }

            let cands = match self.homology.candidates(next_id) {
                Some(cands) => cands,
                None => {
                    log::debug!("No blast matches for {}, skipping gene", next_id);
                    budget -= 1;
                    continue;
                }
            };

            let mut handled = false;
            for cand in cands {
                if cand.ref_id == chain.last_ref {
                    // Same reference gene again, the query gene may be split
                    chain.taken.push(j);
                    handled = true;
                    continue;
                }

                let next_ref = match self.refs.get(&cand.ref_id) {
                    Some(model) if model.scaffold == chain.ref_scaffold => model,
                    Some(model) => {
                        log::debug!(
                            "{} matches {} on wrong scaffold {}",
                            next_id,
                            cand.ref_id,
                            model.scaffold
                        );
                        continue;
                    }
                    None => continue,
                };

                // Strand is not considered, one of the two is negative
                let dist_next = next_ref.start - chain.ref_end;
                let dist_prev = chain.ref_start - next_ref.end;
                if dist_next > opts.max_distance || dist_prev > opts.max_distance {
                    log::debug!(
                        "{} match to {} is too far, {}bp, ignoring match",
                        next_id,
                        cand.ref_id,
                        dist_next.max(dist_prev)
                    );
                    continue;
                }

                log::debug!("Match {} found for {} on {}", cand.ref_id, next_id, self.scaffold);
                chain.ref_start = next_ref.start;
                chain.ref_end = next_ref.end;
                chain.last_ref = cand.ref_id.as_str();
                chain.links.push((j, cand.ref_id.as_str(), cand.score));
                chain.taken.push(j);
                budget = opts.max_span;
                handled = true;
                break;
            }

            if !handled {
                budget -= 1;
            }
        }

        chain
    }

    fn block_of(&self, chain: &Chain) -> Block {
        let pairs = chain
            .links
            .iter()
            .map(|&(idx, ref_id, score)| {
                let (query_id, query) = self.genes[idx];
                Pair {
                    query_id: query_id.to_string(),
                    query: query.clone(),
                    ref_id: ref_id.to_string(),
                    reference: self.refs[ref_id].clone(),
                    score,
                }
            })
            .collect();
        Block::from_pairs(self.scaffold, chain.ref_scaffold, pairs)
    }

    fn run(&self) -> ScaffoldWalk {
        let mut result = ScaffoldWalk {
            gene_count: self.genes.len(),
            ..Default::default()
        };
        let mut consumed = vec![false; self.genes.len()];

        for (i, &(anchor_id, _)) in self.genes.iter().enumerate() {
            let cands = match self.homology.candidates(anchor_id) {
                Some(cands) => cands,
                None => {
                    log::debug!("No blast matches for {}, skipping walk", anchor_id);
                    continue;
                }
            };

            let top = cands[0].ref_id.as_str();
            match &result.last_top {
                Some(last) if last == top => result.split_genes += 1,
                Some(_) => {}
                None => {
                    if result.first_top.is_none() {
                        result.first_top = Some(top.to_string());
                    }
                }
            }

            if consumed[i] {
                log::debug!("Gene {} already has match on {}, skipping", anchor_id, self.scaffold);
                continue;
            }
            result.last_top = Some(top.to_string());

            // Best candidate that can be placed on the reference
            let start = cands
                .iter()
                .find_map(|c| self.refs.get(&c.ref_id).map(|model| (c, model)));
            let (cand, model) = match start {
                Some(found) => found,
                None => continue,
            };

            log::debug!(
                "Starting walk from gene {} on scaffold {} against {}",
                anchor_id,
                self.scaffold,
                cand.ref_id
            );
            let chain = self.extend(i, &cand.ref_id, model, cand.score, &consumed);

            if chain.links.len() >= self.opts.min_block {
                log::debug!(
                    "Found block of {} genes starting from {} on {}",
                    chain.links.len(),
                    anchor_id,
                    self.scaffold
                );
                for &j in &chain.taken {
                    consumed[j] = true;
                }
                result.blocks.push(self.block_of(&chain));
            } else {
                log::debug!("Block only contained {} genes, ignoring block", chain.links.len());
            }
        }

        result
    }
}

/// Walks a single query scaffold.
pub fn walk_scaffold(
    scaffold: &str,
    genes: &IndexMap<String, QueryGene>,
    refs: &RefIndex,
    homology: &HomologyMap,
    opts: &WalkOpts,
) -> ScaffoldWalk {
    if genes.len() < opts.min_block {
        log::debug!(
            "Only {} genes on scaffold {}, skipping scaffold",
            genes.len(),
            scaffold
        );
        return ScaffoldWalk {
            gene_count: genes.len(),
            ..Default::default()
        };
    }

    log::debug!("Scanning scaffold {} with {} genes", scaffold, genes.len());
    let walker = Walker {
        scaffold,
        genes: ordered_genes(genes),
        refs,
        homology,
        opts: *opts,
    };
    walker.run()
}

/// Finds all synteny blocks between the query and the reference.
///
/// Scaffolds are walked in parallel and merged in name order, which is where
/// block numbers are handed out. Finding no block at all is an error: it
/// almost always means the gene ids of the annotations and the hits disagree.
pub fn walk(
    query: &QueryIndex,
    refs: &RefIndex,
    homology: &HomologyMap,
    opts: &WalkOpts,
) -> anyhow::Result<(Vec<Block>, RunStats)> {
    log::info!(
        "Searching for colinear blocks of at least {} genes, with up to {} intervening genes",
        opts.min_block,
        opts.max_span
    );

    let scaffolds: Vec<(&String, &IndexMap<String, QueryGene>)> = query.iter().collect();
    let walks: Vec<(&String, ScaffoldWalk)> = scaffolds
        .par_iter()
        .map(|&(scaffold, genes)| (scaffold, walk_scaffold(scaffold, genes, refs, homology, opts)))
        .collect();

    let mut blocks = vec![];
    let mut stats = RunStats::default();
    let mut last_top: Option<String> = None;

    for (scaffold, walk) in walks {
        stats.max_scaffold_genes = stats.max_scaffold_genes.max(walk.gene_count);
        stats.split_genes += walk.split_genes;
        if walk.first_top.is_some() && walk.first_top == last_top {
            stats.split_genes += 1;
        }
        if walk.last_top.is_some() {
            last_top = walk.last_top;
        }

        for mut block in walk.blocks {
            block.id = blocks.len() + 1;
            if block.len() > stats.longest() {
                log::info!(
                    "New longest block {} of {} on {}",
                    block.label(),
                    block.len(),
                    scaffold
                );
            }
            stats.add_block(&block);
            blocks.push(block);
        }
    }

    log::info!("Found {} possible split genes", stats.split_genes);
    log::info!("Most genes on a query scaffold was {}", stats.max_scaffold_genes);
    log::info!(
        "Found {} total putative synteny blocks for {} genes",
        stats.blocks(),
        stats.genes()
    );

    if blocks.is_empty() {
        anyhow::bail!("No synteny detected, check gene id format parameters -Q -D");
    }

    log::info!(
        "Average block is {:.2}, longest block was {} genes",
        stats.mean(),
        stats.longest()
    );
    log::info!("Total block span was {} bases", stats.base_total);
    for (len, count) in &stats.histogram {
        log::info!("{} {}", len, count);
    }

    Ok((blocks, stats))
}
