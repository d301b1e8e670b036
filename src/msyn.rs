extern crate clap;
use clap::*;

mod cmd_msyn;

fn main() -> anyhow::Result<()> {
    let app = Command::new("msyn")
        .version(crate_version!())
        .author(crate_authors!())
        .about("`msyn` - Microsynteny between two genomes")
        .propagate_version(true)
        .arg_required_else_help(true)
        .color(ColorChoice::Auto)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Report every walk decision on stderr"),
        )
        .subcommand(cmd_msyn::walk::make_subcommand())
        .subcommand(cmd_msyn::genes::make_subcommand())
        .subcommand(cmd_msyn::hits::make_subcommand())
        .after_help(
            r###"Subcommands:

* walk  - Find collinear blocks of homologous genes
* genes - Gene locations as seen by the walker
* hits  - Ranked BLAST candidates as seen by the walker

"###,
        );

    let matches = app.get_matches();

    env_logger::Builder::new()
        .filter_level(if matches.get_flag("verbose") {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .format_timestamp(None)
        .init();

    // Check which subcomamnd the user ran...
    match matches.subcommand() {
        Some(("walk", sub_matches)) => cmd_msyn::walk::execute(sub_matches),
        Some(("genes", sub_matches)) => cmd_msyn::genes::execute(sub_matches),
        Some(("hits", sub_matches)) => cmd_msyn::hits::execute(sub_matches),
        _ => unreachable!(),
    }?;

    Ok(())
}
