use anyhow::Context;
use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::BufRead;

/// A gene on a query scaffold. Coordinates are 1-based, inclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryGene {
    pub start: i64,
    pub end: i64,
    pub strand: String,
}

/// A reference gene, looked up by id alone.
#[derive(Debug, Clone, PartialEq)]
pub struct RefGene {
    pub scaffold: String,
    pub start: i64,
    pub end: i64,
    pub strand: String,
}

/// scaffold => gene id => location
///
/// Scaffolds iterate in name order, genes in the order they appear in the file.
pub type QueryIndex = BTreeMap<String, IndexMap<String, QueryGene>>;

/// gene id => location
pub type RefIndex = HashMap<String, RefGene>;

//----------------------------
// Identifier extraction
//----------------------------
pub trait IdExtractor {
    fn extract<'a>(&self, attributes: &'a str) -> Option<&'a str>;
}

/// Captures the first group of a pattern in the attribute column.
pub struct AttrRule(Regex);

impl AttrRule {
    pub fn new(pattern: &str) -> Self {
        Self(Regex::new(pattern).unwrap())
    }
}

impl IdExtractor for AttrRule {
    fn extract<'a>(&self, attributes: &'a str) -> Option<&'a str> {
        self.0
            .captures(attributes)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

/// Rules are tried in order, the first match wins.
impl<T: IdExtractor> IdExtractor for [T] {
    fn extract<'a>(&self, attributes: &'a str) -> Option<&'a str> {
        self.iter().find_map(|rule| rule.extract(attributes))
    }
}

lazy_static! {
    static ref GENE_RULES: Vec<AttrRule> = vec![
        AttrRule::new(r#"gene_id "([\w.|-]+)""#),
        AttrRule::new(r"ID=([\w.|-]+)"),
    ];
    static ref EXON_RULES: Vec<AttrRule> = vec![
        AttrRule::new(r#"gene_id "([\w.|-]+)""#),
        AttrRule::new(r#"name "([\w.|-]+)""#),
    ];
}

/// Keeps the part before the last `delimiter`.
///
/// ```
/// # use msyn::libs::gene::trim_id;
/// assert_eq!(trim_id("avic.12345.1", Some(".")), "avic.12345");
/// assert_eq!(trim_id("avic.12345.1", Some("|")), "avic.12345.1");
/// assert_eq!(trim_id("sp|P12345|KIN", Some("|")), "sp|P12345");
/// assert_eq!(trim_id("avic.12345.1", None), "avic.12345.1");
/// ```
pub fn trim_id<'a>(id: &'a str, delimiter: Option<&str>) -> &'a str {
    match delimiter {
        Some(d) if !d.is_empty() => id.rsplit_once(d).map(|(left, _)| left).unwrap_or(id),
        _ => id,
    }
}

//----------------------------
// Parsing
//----------------------------
#[derive(Debug, Default, Clone)]
pub struct GtfOpts {
    /// Genes are not annotated, build them from exon extents
    pub exons_to_genes: bool,
    pub delimiter: Option<String>,
    pub exclude: Option<HashSet<String>>,
}

/// One gene-level record, either read directly or merged from exons.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneRecord {
    pub scaffold: String,
    pub id: String,
    pub start: i64,
    pub end: i64,
    pub strand: String,
}

/// Reads gene-level records from a GTF or GFF3 stream.
///
/// `gene`, `transcript` and `mRNA` features are taken as they are. Exons are
/// only used when `exons_to_genes` is set and the file has no gene-level
/// features at all; the gene then spans its outermost exons and takes the
/// strand of the last exon seen. `delimiter` trims gene-level ids only.
pub fn read_genes<R: BufRead>(reader: R, opts: &GtfOpts) -> anyhow::Result<Vec<GeneRecord>> {
    let delimiter = opts.delimiter.as_deref();

    let mut genes: Vec<GeneRecord> = vec![];
    let mut exons: IndexMap<String, GeneRecord> = IndexMap::new();
    let mut exon_count = 0usize;

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 9 {
            anyhow::bail!("line {}: expected 9 columns, found {}", i + 1, fields.len());
        }

        let scaffold = fields[0];
        if let Some(exclude) = &opts.exclude {
            if exclude.contains(scaffold) {
                continue;
            }
        }

        let feature = fields[2];
        let attributes = fields[8];
        let is_gene = matches!(feature, "gene" | "transcript" | "mRNA");
        let is_exon = opts.exons_to_genes && feature == "exon";
        if !is_gene && !is_exon {
            continue;
        }

        let rules = if is_gene {
            GENE_RULES.as_slice()
        } else {
            EXON_RULES.as_slice()
        };
        let id = rules
            .extract(attributes)
            .with_context(|| format!("line {}: no gene id in [{}]", i + 1, attributes))?;
        // Exon gene ids are kept whole
        let id = if is_gene {
            trim_id(id, delimiter).to_string()
        } else {
            id.to_string()
        };

        let start: i64 = fields[3]
            .parse()
            .with_context(|| format!("line {}: invalid start {}", i + 1, fields[3]))?;
        let end: i64 = fields[4]
            .parse()
            .with_context(|| format!("line {}: invalid end {}", i + 1, fields[4]))?;
        let strand = fields[6].to_string();

        if is_gene {
            genes.push(GeneRecord {
                scaffold: scaffold.to_string(),
                id,
                start,
                end,
                strand,
            });
        } else {
            exon_count += 1;
            let entry = exons.entry(id.clone()).or_insert_with(|| GeneRecord {
                scaffold: scaffold.to_string(),
                id,
                start,
                end,
                strand: strand.clone(),
            });
            entry.scaffold = scaffold.to_string();
            entry.start = entry.start.min(start);
            entry.end = entry.end.max(end);
            entry.strand = strand;
        }
    }

    if !genes.is_empty() || exons.is_empty() {
        log::info!("Found {} gene records", genes.len());
        Ok(genes)
    } else {
        log::info!(
            "Estimated {} genes from {} exons",
            exons.len(),
            exon_count
        );
        Ok(exons.into_values().collect())
    }
}

/// Groups records by scaffold.
pub fn query_index(records: Vec<GeneRecord>) -> QueryIndex {
    let mut index = QueryIndex::new();
    for rec in records {
        index.entry(rec.scaffold).or_default().insert(
            rec.id,
            QueryGene {
                start: rec.start,
                end: rec.end,
                strand: rec.strand,
            },
        );
    }
    index
}

/// Keys records by gene id; a later duplicate replaces an earlier one.
pub fn ref_index(records: Vec<GeneRecord>) -> RefIndex {
    let mut index = RefIndex::new();
    for rec in records {
        index.insert(
            rec.id,
            RefGene {
                scaffold: rec.scaffold,
                start: rec.start,
                end: rec.end,
                strand: rec.strand,
            },
        );
    }
    index
}

pub fn read_query_index(infile: &str, opts: &GtfOpts) -> anyhow::Result<QueryIndex> {
    log::info!("Parsing query annotation {}", infile);
    let records = read_genes(crate::reader(infile)?, opts)
        .with_context(|| format!("failed to parse {}", infile))?;
    let index = query_index(records);
    log::info!(
        "Indexed {} genes on {} scaffolds",
        index.values().map(|genes| genes.len()).sum::<usize>(),
        index.len()
    );
    Ok(index)
}

pub fn read_ref_index(infile: &str, opts: &GtfOpts) -> anyhow::Result<RefIndex> {
    log::info!("Parsing reference annotation {}", infile);
    let records = read_genes(crate::reader(infile)?, opts)
        .with_context(|| format!("failed to parse {}", infile))?;
    let index = ref_index(records);
    log::info!("Indexed {} reference genes", index.len());
    Ok(index)
}

/// Genes of one scaffold in walking order: ascending start, ties in file order.
pub fn ordered_genes(genes: &IndexMap<String, QueryGene>) -> Vec<(&str, &QueryGene)> {
    let mut ordered: Vec<(&str, &QueryGene)> =
        genes.iter().map(|(id, g)| (id.as_str(), g)).collect();
    ordered.sort_by_key(|(_, g)| g.start);
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    const GTF: &str = "\
##gff-version 2
scf1\tAUGUSTUS\tgene\t5000\t6000\t.\t-\t.\tgene_id \"g2\";
scf1\tAUGUSTUS\ttranscript\t100\t900\t.\t+\t.\tgene_id \"g1.t1\"; transcript_id \"g1.t1\";
scf1\tAUGUSTUS\texon\t100\t300\t.\t+\t.\tgene_id \"g1\";

scf2\tAUGUSTUS\tmRNA\t10\t20\t.\t+\t.\tID=g3.t1;Parent=g3
bad\tAUGUSTUS\tgene\t1\t2\t.\t+\t.\tgene_id \"g9\";
";

    #[test]
    fn test_extract_rules() {
        let rules = GENE_RULES.as_slice();
        assert_eq!(
            rules.extract("gene_id \"Avic.1\"; transcript_id \"Avic.1.t1\";"),
            Some("Avic.1")
        );
        assert_eq!(rules.extract("ID=mRNA-7|x;Parent=gene-7"), Some("mRNA-7|x"));
        assert_eq!(rules.extract("Parent=gene-7"), None);

        let rules = EXON_RULES.as_slice();
        assert_eq!(rules.extract("name \"Exon_gene\";"), Some("Exon_gene"));
    }

    #[test]
    fn test_read_genes() {
        let opts = GtfOpts {
            delimiter: Some(".".to_string()),
            exclude: Some(["bad".to_string()].into_iter().collect()),
            ..Default::default()
        };
        let records = read_genes(GTF.as_bytes(), &opts).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].id, "g2");
        assert_eq!(records[1].id, "g1");
        assert_eq!(records[2].id, "g3");
        assert_eq!(records[2].scaffold, "scf2");

        let index = query_index(records);
        assert_eq!(index.len(), 2);
        let ordered = ordered_genes(&index["scf1"]);
        assert_eq!(ordered[0].0, "g1");
        assert_eq!(ordered[1].0, "g2");
        assert_eq!(ordered[1].1.strand, "-");
    }

    #[test]
    fn test_genes_from_exons() {
        let gtf = "\
scf1\tsrc\texon\t500\t600\t.\t+\t.\tgene_id \"e1\";
scf1\tsrc\texon\t100\t200\t.\t+\t.\tgene_id \"e1\";
scf1\tsrc\texon\t900\t950\t.\t-\t.\tgene_id \"e1\";
scf1\tsrc\texon\t2000\t2100\t.\t+\t.\tname \"e2\";
scf1\tsrc\tCDS\t2000\t2100\t.\t+\t0\tname \"e2\";
";
        let opts = GtfOpts {
            exons_to_genes: true,
            ..Default::default()
        };
        let records = read_genes(gtf.as_bytes(), &opts).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].start, 100);
        assert_eq!(records[0].end, 950);
        // strand of the last exon
        assert_eq!(records[0].strand, "-");
        assert_eq!(records[1].id, "e2");

        let index = ref_index(records);
        assert_eq!(index["e1"].scaffold, "scf1");
    }

    #[test]
    fn test_exon_ids_not_trimmed() {
        let gtf = "\
chr1\tsrc\texon\t100\t900\t.\t+\t.\tgene_id \"chr1_g1\";
chr1\tsrc\texon\t3000\t3900\t.\t+\t.\tgene_id \"chr1_g2\";
chr1\tsrc\texon\t8000\t9200\t.\t-\t.\tgene_id \"chr1_g3\";
";
        let opts = GtfOpts {
            exons_to_genes: true,
            delimiter: Some("_".to_string()),
            ..Default::default()
        };
        let records = read_genes(gtf.as_bytes(), &opts).unwrap();
        assert_eq!(records.len(), 3);
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["chr1_g1", "chr1_g2", "chr1_g3"]);
        assert_eq!((records[2].start, records[2].end), (8000, 9200));

        // gene-level ids still lose their suffix
        let gtf = "chr1\tsrc\tgene\t100\t900\t.\t+\t.\tgene_id \"chr1_g1\";\n";
        let records = read_genes(gtf.as_bytes(), &opts).unwrap();
        assert_eq!(records[0].id, "chr1");
    }

    #[test]
    fn test_exons_ignored_when_genes_present() {
        let gtf = "\
scf1\tsrc\tgene\t100\t900\t.\t+\t.\tgene_id \"g1\";
scf1\tsrc\texon\t2000\t2100\t.\t+\t.\tgene_id \"g2\";
";
        let opts = GtfOpts {
            exons_to_genes: true,
            ..Default::default()
        };
        let records = read_genes(gtf.as_bytes(), &opts).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "g1");
    }

    #[test]
    fn test_missing_id_is_fatal() {
        let gtf = "scf1\tsrc\tgene\t100\t900\t.\t+\t.\tNote=nothing\n";
        let err = read_genes(gtf.as_bytes(), &GtfOpts::default()).unwrap_err();
        assert!(err.to_string().contains("no gene id"));
    }

    #[test]
    fn test_short_line_is_fatal() {
        let gtf = "scf1\tsrc\tgene\t100\n";
        assert!(read_genes(gtf.as_bytes(), &GtfOpts::default()).is_err());
    }
}
