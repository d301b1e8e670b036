use clap::*;
use itertools::Itertools;
use msyn::libs::homology::{read_blast, BlastOpts};
use msyn::libs::render::fmt_score;
use std::io::Write;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("hits")
        .about("Ranked BLAST candidates as seen by the walker")
        .after_help(
            r###"
Filters tabular BLAST the same way `msyn walk` does and prints the
candidates of each query, best first:
query ref score

Queries are sorted by name. Equal scores are ordered by reference name.

Examples:
1. Check how names are trimmed:
   msyn hits query_vs_ref.tab --blast-query-delimiter '.'

2. Keep the first 5 hits of each query:
   msyn hits query_vs_ref.tab.gz --max-hits 5 -e 1e-10

"###,
        )
        .arg(
            Arg::new("infile")
                .required(true)
                .num_args(1)
                .index(1)
                .help("Tabular blast output. [stdin] for standard input"),
        )
        .arg(
            Arg::new("blast_query_delimiter")
                .long("blast-query-delimiter")
                .num_args(1)
                .default_value("|")
                .help("Gene transcript separator for blast query"),
        )
        .arg(
            Arg::new("blast_db_delimiter")
                .long("blast-db-delimiter")
                .num_args(1)
                .default_value("|")
                .help("Gene transcript separator for blast ref"),
        )
        .arg(
            Arg::new("evalue")
                .long("evalue")
                .short('e')
                .num_args(1)
                .default_value("1e-4")
                .value_parser(value_parser!(f64))
                .help("Evalue cutoff"),
        )
        .arg(
            Arg::new("max_hits")
                .long("max-hits")
                .num_args(1)
                .default_value("100")
                .value_parser(value_parser!(usize))
                .help("Keep at most this many hits per query, in file order"),
        )
        .arg(
            Arg::new("switch_query")
                .long("switch-query")
                .short('S')
                .action(ArgAction::SetTrue)
                .help("Switch query and subject"),
        )
        .arg(
            Arg::new("outfile")
                .long("outfile")
                .short('o')
                .num_args(1)
                .default_value("stdout")
                .help("Output filename. [stdout] for screen"),
        )
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    let opts = BlastOpts {
        evalue: *args.get_one::<f64>("evalue").unwrap(),
        query_delimiter: args.get_one::<String>("blast_query_delimiter").unwrap().clone(),
        ref_delimiter: args.get_one::<String>("blast_db_delimiter").unwrap().clone(),
        switch: args.get_flag("switch_query"),
        max_hits: *args.get_one::<usize>("max_hits").unwrap(),
    };

    let reader = msyn::reader(args.get_one::<String>("infile").unwrap())?;
    let (map, _) = read_blast(reader, &opts)?;

    let mut writer = msyn::writer(args.get_one::<String>("outfile").unwrap())?;
    for query in map.queries().sorted() {
        for cand in map.candidates(query).unwrap_or_default() {
            writeln!(writer, "{}\t{}\t{}", query, cand.ref_id, fmt_score(cand.score))?;
        }
    }
    writer.flush()?;

    Ok(())
}
