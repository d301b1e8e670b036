use clap::*;
use msyn::libs::gene::{read_query_index, read_ref_index, GtfOpts};
use msyn::libs::homology::{read_homology, BlastOpts};
use msyn::libs::render::{write_blocks, Format};
use msyn::libs::shuffle::shuffle_with_seed;
use msyn::libs::synteny::{walk, WalkOpts};

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("walk")
        .about("Find collinear blocks of homologous genes")
        .after_help(
            r###"
Walks along each query scaffold and follows BLAST hits on the reference genome,
keeping chains of at least --minimum collinear genes.

Notes:
* Hits come from tabular BLAST, e.g.
  blastx -query query.fasta -db ref_prots.fasta -outfmt 6 -evalue 1e-5
* The gene_id (GTF) or ID (GFF) of each annotation must match the BLAST names
  after trimming; e.g. gene avic.12345 and BLAST query avic.12345.1 need
  --blast-query-delimiter '.'
* If no block is found, check -Q, -D and the BLAST delimiters first
* Tabular output, 12 columns:
  query-scaffold ref-scaffold block query-gene start end strand
  ref-gene start end strand score
* GFF output (--make-gff): one `match` per block, scored by its length and
  targeting the ref scaffold, then one `match_part` per gene, scored by bitscore
* Fused or split genes are not detected; three query genes fused into one in
  the reference still count as a block of three
* To choose --minimum, rerun on the same data with --randomize; blocks of 2
  are common by chance, 3 is rare, so -m 3 is usually sufficient

Examples:
1. Tabular blocks:
   msyn walk -q query.gtf -d ref.gtf -b query_vs_ref.tab -D '_' --blast-query-delimiter '.'

2. GFF blocks, genes inferred from exons:
   msyn walk -q query.gtf -d ref.gtf -b query_vs_ref.tab.gz -g --make-gff

"###,
        )
        .arg(
            Arg::new("blast")
                .long("blast")
                .short('b')
                .required(true)
                .num_args(1)
                .help("Tabular blast output, may be gzipped"),
        )
        .arg(
            Arg::new("query_gtf")
                .long("query-gtf")
                .short('q')
                .required(true)
                .num_args(1)
                .help("GTF/GFF of query genes"),
        )
        .arg(
            Arg::new("db_gtf")
                .long("db-gtf")
                .short('d')
                .required(true)
                .num_args(1)
                .help("GTF/GFF of reference genes"),
        )
        .arg(
            Arg::new("query_delimiter")
                .long("query-delimiter")
                .short('Q')
                .num_args(1)
                .help("Gene transcript separator for query"),
        )
        .arg(
            Arg::new("db_delimiter")
                .long("db-delimiter")
                .short('D')
                .num_args(1)
                .help("Gene transcript separator for db"),
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
                .help("Evalue cutoff for post blast filtering"),
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
            Arg::new("exclude")
                .long("exclude")
                .short('E')
                .num_args(1)
                .help("File of bad contigs, from either genome"),
        )
        .arg(
            Arg::new("no_genes")
                .long("no-genes")
                .short('g')
                .action(ArgAction::SetTrue)
                .help("Genes are not defined, get gene ID for each exon"),
        )
        .arg(
            Arg::new("minimum")
                .long("minimum")
                .short('m')
                .num_args(1)
                .default_value("3")
                .value_parser(value_parser!(usize))
                .help("Minimum syntenic genes to keep block, must be >= 2"),
        )
        .arg(
            Arg::new("span")
                .long("span")
                .short('s')
                .num_args(1)
                .default_value("5")
                .value_parser(value_parser!(usize))
                .help("Max number of skippable genes"),
        )
        .arg(
            Arg::new("distance")
                .long("distance")
                .short('z')
                .num_args(1)
                .default_value("30000")
                .value_parser(value_parser!(u32))
                .help("Max distance between neighbouring genes, on either genome"),
        )
        .arg(
            Arg::new("make_gff")
                .long("make-gff")
                .short('G')
                .action(ArgAction::SetTrue)
                .help("Make GFF output, instead of tabular blocks"),
        )
        .arg(
            Arg::new("randomize")
                .long("randomize")
                .short('R')
                .action(ArgAction::SetTrue)
                .help("Randomize positions of query genes"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .num_args(1)
                .value_parser(value_parser!(u64))
                .help("Seed for --randomize"),
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
    //----------------------------
    // Args
    //----------------------------
    let is_switch = args.get_flag("switch_query");
    let query_delimiter = args.get_one::<String>("query_delimiter").cloned();
    let db_delimiter = args.get_one::<String>("db_delimiter").cloned();

    let exclude = match args.get_one::<String>("exclude") {
        Some(infile) => {
            log::info!("Reading exclusion list {}", infile);
            let set = msyn::read_exclusion(infile)?;
            log::info!("Found {} contigs to exclude", set.len());
            Some(set)
        }
        None => None,
    };

    // The walk goes along the query side; -S puts the db genome there
    let (query_gtf, query_opts, ref_gtf, ref_opts) = {
        let opts_of = |delimiter: Option<String>| GtfOpts {
            exons_to_genes: args.get_flag("no_genes"),
            delimiter,
            exclude: exclude.clone(),
        };
        let query_gtf = args.get_one::<String>("query_gtf").unwrap();
        let db_gtf = args.get_one::<String>("db_gtf").unwrap();
        if is_switch {
            (db_gtf, opts_of(db_delimiter), query_gtf, opts_of(query_delimiter))
        } else {
            (query_gtf, opts_of(query_delimiter), db_gtf, opts_of(db_delimiter))
        }
    };

    let blast_opts = BlastOpts {
        evalue: *args.get_one::<f64>("evalue").unwrap(),
        query_delimiter: args.get_one::<String>("blast_query_delimiter").unwrap().clone(),
        ref_delimiter: args.get_one::<String>("blast_db_delimiter").unwrap().clone(),
        switch: is_switch,
        max_hits: *args.get_one::<usize>("max_hits").unwrap(),
    };

    let walk_opts = WalkOpts::new(
        *args.get_one::<usize>("minimum").unwrap(),
        *args.get_one::<usize>("span").unwrap(),
        *args.get_one::<u32>("distance").unwrap() as i64,
    );

    let format = if args.get_flag("make_gff") {
        log::info!("Making GFF output");
        Format::Gff
    } else {
        Format::Tabular
    };

    //----------------------------
    // Indexes
    //----------------------------
    let mut query = read_query_index(query_gtf, &query_opts)?;
    let refs = read_ref_index(ref_gtf, &ref_opts)?;
    let homology = read_homology(args.get_one::<String>("blast").unwrap(), &blast_opts)?;

    if args.get_flag("randomize") {
        query = shuffle_with_seed(&query, args.get_one::<u64>("seed").copied());
    }

    //----------------------------
    // Output
    //----------------------------
    let (blocks, _) = walk(&query, &refs, &homology, &walk_opts)?;

    let mut writer = msyn::writer(args.get_one::<String>("outfile").unwrap())?;
    write_blocks(&mut writer, &blocks, format)?;

    Ok(())
}
