use crate::libs::gene::trim_id;
use anyhow::Context;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::io::BufRead;

/// A reference gene hit by a query gene.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub ref_id: String,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct BlastOpts {
    pub evalue: f64,
    pub query_delimiter: String,
    pub ref_delimiter: String,
    /// Swap the roles of the first two columns
    pub switch: bool,
    pub max_hits: usize,
}

impl Default for BlastOpts {
    fn default() -> Self {
        Self {
            evalue: 1e-4,
            query_delimiter: "|".to_string(),
            ref_delimiter: "|".to_string(),
            switch: false,
            max_hits: 100,
        }
    }
}

/// query gene => candidates, best score first
#[derive(Debug, Default, Clone)]
pub struct HomologyMap {
    hits: HashMap<String, Vec<Candidate>>,
}

impl HomologyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the map from per-query score tables. Candidates are ranked by
    /// descending score, equal scores by ascending reference id.
    pub fn from_scores(scores: HashMap<String, IndexMap<String, f64>>) -> Self {
        let hits = scores
            .into_iter()
            .map(|(query, subjects)| {
                let mut cands: Vec<Candidate> = subjects
                    .into_iter()
                    .map(|(ref_id, score)| Candidate { ref_id, score })
                    .collect();
                cands.sort_by(|a, b| {
                    b.score
                        .total_cmp(&a.score)
                        .then_with(|| a.ref_id.cmp(&b.ref_id))
                });
                (query, cands)
            })
            .collect();
        Self { hits }
    }

    pub fn candidates(&self, query: &str) -> Option<&[Candidate]> {
        self.hits
            .get(query)
            .map(|v| v.as_slice())
            .filter(|v| !v.is_empty())
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn queries(&self) -> impl Iterator<Item = &String> {
        self.hits.keys()
    }
}

/// Counters collected while reading hits.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BlastStats {
    pub kept: usize,
    pub evalue_removed: usize,
    pub cap_removed: usize,
}

/// Reads tabular BLAST (`-outfmt 6`).
///
/// Hits above the e-value cutoff are dropped. Each query keeps at most
/// `max_hits` hits, the first ones met in the file, regardless of score.
pub fn read_blast<R: BufRead>(
    reader: R,
    opts: &BlastOpts,
) -> anyhow::Result<(HomologyMap, BlastStats)> {
    let mut scores: HashMap<String, IndexMap<String, f64>> = HashMap::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut stats = BlastStats::default();
    let mut last_parsed: Option<(String, String, String, String)> = None;

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // qseqid sseqid pident length mismatch gapopen qstart qend sstart send evalue bitscore
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 12 {
            anyhow::bail!("line {}: expected 12 columns, found {}", i + 1, fields.len());
        }

        let (query, subject) = if opts.switch {
            (
                trim_id(fields[1], Some(&opts.ref_delimiter)),
                trim_id(fields[0], Some(&opts.query_delimiter)),
            )
        } else {
            (
                trim_id(fields[0], Some(&opts.query_delimiter)),
                trim_id(fields[1], Some(&opts.ref_delimiter)),
            )
        };

        let evalue: f64 = fields[10]
            .parse()
            .with_context(|| format!("line {}: invalid evalue {}", i + 1, fields[10]))?;
        if evalue > opts.evalue {
            stats.evalue_removed += 1;
            continue;
        }

        let count = counts.entry(query.to_string()).or_insert(0);
        if *count >= opts.max_hits {
            stats.cap_removed += 1;
            continue;
        }

        let score: f64 = fields[11]
            .parse()
            .with_context(|| format!("line {}: invalid bitscore {}", i + 1, fields[11]))?;
        scores
            .entry(query.to_string())
            .or_default()
            .insert(subject.to_string(), score);
        *count += 1;
        stats.kept += 1;

        last_parsed = Some((
            query.to_string(),
            fields[0].to_string(),
            subject.to_string(),
            fields[1].to_string(),
        ));
    }

    let map = HomologyMap::from_scores(scores);
    log::info!("Found blast hits for {} query sequences", map.len());
    log::info!(
        "Removed {} hits by evalue, kept {} hits",
        stats.evalue_removed,
        stats.kept
    );
    if let Some((query, q_raw, subject, s_raw)) = last_parsed {
        log::info!(
            "Names parsed as {} from {}, and {} from {}",
            query,
            q_raw,
            subject,
            s_raw
        );
    }

    Ok((map, stats))
}

pub fn read_homology(infile: &str, opts: &BlastOpts) -> anyhow::Result<HomologyMap> {
    log::info!("Parsing tabular blast output {}", infile);
    let (map, _) = read_blast(crate::reader(infile)?, opts)
        .with_context(|| format!("failed to parse {}", infile))?;
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blast_line(query: &str, subject: &str, evalue: &str, score: &str) -> String {
        format!(
            "{}\t{}\t90.0\t100\t10\t0\t1\t100\t1\t100\t{}\t{}\n",
            query, subject, evalue, score
        )
    }

    #[test]
    fn test_read_blast_ranked() {
        let input = [
            blast_line("q1.t1", "r1|x", "1e-20", "50"),
            blast_line("q1.t1", "r3|x", "1e-30", "80"),
            blast_line("q1.t1", "r2|x", "1e-30", "80"),
            blast_line("q2.t1", "r9|x", "0.5", "20"),
        ]
        .concat();
        let opts = BlastOpts {
            query_delimiter: ".".to_string(),
            ..Default::default()
        };
        let (map, stats) = read_blast(input.as_bytes(), &opts).unwrap();

        assert_eq!(map.len(), 1);
        assert_eq!(stats.kept, 3);
        assert_eq!(stats.evalue_removed, 1);
        assert!(map.candidates("q2").is_none());

        let ids: Vec<&str> = map
            .candidates("q1")
            .unwrap()
            .iter()
            .map(|c| c.ref_id.as_str())
            .collect();
        assert_eq!(ids, vec!["r2", "r3", "r1"]);
    }

    #[test]
    fn test_read_blast_cap_keeps_file_order() {
        let input = [
            blast_line("q1", "r1", "1e-10", "10"),
            blast_line("q1", "r2", "1e-10", "20"),
            blast_line("q1", "r3", "1e-90", "300"),
        ]
        .concat();
        let opts = BlastOpts {
            max_hits: 2,
            ..Default::default()
        };
        let (map, stats) = read_blast(input.as_bytes(), &opts).unwrap();
        assert_eq!(stats.cap_removed, 1);

        let cands = map.candidates("q1").unwrap();
        assert_eq!(cands.len(), 2);
        assert_eq!(cands[0].ref_id, "r2");
        assert_eq!(cands[1].ref_id, "r1");
    }

    #[test]
    fn test_read_blast_switch() {
        let input = blast_line("r1.p1", "q1|m", "1e-10", "10");
        let opts = BlastOpts {
            query_delimiter: ".".to_string(),
            switch: true,
            ..Default::default()
        };
        let (map, _) = read_blast(input.as_bytes(), &opts).unwrap();
        let cands = map.candidates("q1").unwrap();
        assert_eq!(cands[0].ref_id, "r1");
    }

    #[test]
    fn test_repeated_pair_counts_toward_cap() {
        let input = [
            blast_line("q1", "r1", "1e-10", "10"),
            blast_line("q1", "r1", "1e-10", "15"),
            blast_line("q1", "r2", "1e-10", "99"),
        ]
        .concat();
        let opts = BlastOpts {
            max_hits: 2,
            ..Default::default()
        };
        let (map, _) = read_blast(input.as_bytes(), &opts).unwrap();
        let cands = map.candidates("q1").unwrap();
        assert_eq!(cands.len(), 1);
        assert_eq!(cands[0].score, 15.0);
    }

    #[test]
    fn test_malformed_line() {
        let input = "q1\tr1\t90.0\n";
        assert!(read_blast(input.as_bytes(), &BlastOpts::default()).is_err());
    }
}
