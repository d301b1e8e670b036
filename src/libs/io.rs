use anyhow::Context;
use std::collections::HashSet;
use std::io::{BufRead, BufReader, BufWriter, Write};

/// Opens `input` for line reading. `stdin` reads standard input, a `.gz`
/// extension is decompressed on the fly.
///
/// ```
/// use std::io::BufRead;
/// let reader = msyn::reader("tests/msyn/query.gtf").unwrap();
/// let lines: Vec<_> = reader.lines().collect();
/// assert!(lines.len() > 10);
///
/// assert!(msyn::reader("tests/msyn/not_exists.gtf").is_err());
/// ```
pub fn reader(input: &str) -> anyhow::Result<Box<dyn BufRead>> {
    let reader: Box<dyn BufRead> = if input == "stdin" {
        Box::new(BufReader::new(std::io::stdin()))
    } else {
        let path = std::path::Path::new(input);
        let file = std::fs::File::open(path)
            .with_context(|| format!("could not open {}", path.display()))?;

        if path.extension() == Some(std::ffi::OsStr::new("gz")) {
            Box::new(BufReader::new(flate2::read::MultiGzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        }
    };

    Ok(reader)
}

pub fn writer(output: &str) -> anyhow::Result<Box<dyn Write>> {
    let writer: Box<dyn Write> = if output == "stdout" {
        Box::new(BufWriter::new(std::io::stdout()))
    } else {
        let file = std::fs::File::create(output)
            .with_context(|| format!("could not create {}", output))?;
        Box::new(BufWriter::new(file))
    };

    Ok(writer)
}

/// Scaffold names to leave out of both annotations.
///
/// One name per line, a leading `>` is stripped so FASTA headers can be pasted
/// in directly. Blank lines are rejected.
///
/// ```
/// let set = msyn::read_exclusion("tests/msyn/exclude.list").unwrap();
/// assert!(set.contains("scf_bad"));
/// assert!(set.contains("scf_junk"));
/// ```
pub fn read_exclusion(input: &str) -> anyhow::Result<HashSet<String>> {
    parse_exclusion(reader(input)?)
}

pub fn parse_exclusion<R: BufRead>(reader: R) -> anyhow::Result<HashSet<String>> {
    let mut set = HashSet::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let term = line.trim();
        if term.is_empty() {
            anyhow::bail!("empty entry at line {} of exclusion list", i + 1);
        }
        let term = term.strip_prefix('>').unwrap_or(term);
        set.insert(term.to_string());
    }
    Ok(set)
}
