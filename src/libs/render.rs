use crate::libs::synteny::Block;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// 12 columns, one line per gene pair
    Tabular,
    /// One `match` line per block followed by `match_part` lines
    Gff,
}

/// Scores keep at least one decimal place.
///
/// ```
/// # use msyn::libs::render::fmt_score;
/// assert_eq!(fmt_score(55.0), "55.0");
/// assert_eq!(fmt_score(55.3), "55.3");
/// assert_eq!(fmt_score(1234.5), "1234.5");
/// ```
pub fn fmt_score(score: f64) -> String {
    if score.is_finite() && score.fract() == 0.0 {
        format!("{:.1}", score)
    } else {
        format!("{}", score)
    }
}

impl Block {
    /// query-scaffold ref-scaffold block query-gene start end strand
    /// ref-gene start end strand score
    pub fn to_tsv(&self) -> String {
        let label = self.label();
        let mut out = String::new();
        for pair in &self.pairs {
            writeln!(
                out,
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                self.scaffold,
                self.ref_scaffold,
                label,
                pair.query_id,
                pair.query.start,
                pair.query.end,
                pair.query.strand,
                pair.ref_id,
                pair.reference.start,
                pair.reference.end,
                pair.reference.strand,
                fmt_score(pair.score),
            )
            .unwrap();
        }
        out
    }

    /// The parent feature scores the block length and targets the reference
    /// scaffold; each part scores its hit and targets the reference gene.
    pub fn to_gff(&self) -> String {
        let label = self.label();
        let mut out = String::new();
        writeln!(
            out,
            "{}\tmicrosynteny\tmatch\t{}\t{}\t{}\t{}\t.\tID={};Name={}_to_{};Target={} {} {}",
            self.scaffold,
            self.q_start,
            self.q_end,
            self.len(),
            self.strand,
            label,
            label,
            self.ref_scaffold,
            self.ref_scaffold,
            self.r_start,
            self.r_end,
        )
        .unwrap();

        for (j, pair) in self.pairs.iter().enumerate() {
            writeln!(
                out,
                "{}\tmicrosynteny\tmatch_part\t{}\t{}\t{}\t{}\t.\tID={}.{}.{};Parent={};Target={} {} {} {}",
                self.scaffold,
                pair.query.start,
                pair.query.end,
                fmt_score(pair.score),
                pair.query.strand,
                label,
                j + 1,
                pair.query_id,
                label,
                pair.ref_id,
                pair.reference.start,
                pair.reference.end,
                pair.reference.strand,
            )
            .unwrap();
        }
        out
    }

    pub fn render(&self, format: Format) -> String {
        match format {
            Format::Tabular => self.to_tsv(),
            Format::Gff => self.to_gff(),
        }
    }
}

/// Writes blocks in order.
pub fn write_blocks<W: std::io::Write>(
    writer: &mut W,
    blocks: &[Block],
    format: Format,
) -> anyhow::Result<()> {
    for block in blocks {
        writer.write_all(block.render(format).as_bytes())?;
    }
    writer.flush()?;
    Ok(())
}
