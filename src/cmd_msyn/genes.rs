use clap::*;
use msyn::libs::gene::{ordered_genes, read_query_index, GtfOpts};
use msyn::libs::shuffle::shuffle_with_seed;
use std::io::Write;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("genes")
        .about("Gene locations as seen by the walker")
        .after_help(
            r###"
Prints the genes of a GTF/GFF file in walking order, one per line:
scaffold gene start end strand

Useful to check that gene ids come out the same way as in the BLAST file.

Examples:
1. Genes of a GFF3 file, transcript suffix removed:
   msyn genes ref.gff -D '.'

2. Genes inferred from exons, shuffled over all positions:
   msyn genes query.gtf -g --randomize --seed 42

"###,
        )
        .arg(
            Arg::new("infile")
                .required(true)
                .num_args(1)
                .index(1)
                .help("Input GTF/GFF file. [stdin] for standard input"),
        )
        .arg(
            Arg::new("delimiter")
                .long("delimiter")
                .short('D')
                .num_args(1)
                .help("Gene transcript separator"),
        )
        .arg(
            Arg::new("exclude")
                .long("exclude")
                .short('E')
                .num_args(1)
                .help("File of contigs to leave out"),
        )
        .arg(
            Arg::new("no_genes")
                .long("no-genes")
                .short('g')
                .action(ArgAction::SetTrue)
                .help("Genes are not defined, get gene ID for each exon"),
        )
        .arg(
            Arg::new("randomize")
                .long("randomize")
                .short('R')
                .action(ArgAction::SetTrue)
                .help("Randomize positions of genes"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .num_args(1)
                .value_parser(value_parser!(u64))
                .help("Seed for --randomize"),
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
    let exclude = match args.get_one::<String>("exclude") {
        Some(infile) => Some(msyn::read_exclusion(infile)?),
        None => None,
    };
    let opts = GtfOpts {
        exons_to_genes: args.get_flag("no_genes"),
        delimiter: args.get_one::<String>("delimiter").cloned(),
        exclude,
    };

    let mut index = read_query_index(args.get_one::<String>("infile").unwrap(), &opts)?;
    if args.get_flag("randomize") {
        index = shuffle_with_seed(&index, args.get_one::<u64>("seed").copied());
    }

    let mut writer = msyn::writer(args.get_one::<String>("outfile").unwrap())?;
    for (scaffold, genes) in &index {
        for (id, gene) in ordered_genes(genes) {
            writeln!(
                writer,
                "{}\t{}\t{}\t{}\t{}",
                scaffold, id, gene.start, gene.end, gene.strand
            )?;
        }
    }
    writer.flush()?;

    Ok(())
}
