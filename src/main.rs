use anyhow::{anyhow, Result};
use clap::{App, Arg};
use std::path::Path;

use taghord::build::build_site;
use taghord::config::Config;

fn main() -> Result<()> {
    env_logger::init();

    let matches = App::new("taghord")
        .version(clap::crate_version!())
        .about("Builds a tag-indexed static blog")
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .value_name("DIR")
                .help("The directory into which the site is rendered")
                .takes_value(true)
                .required(true),
        )
        .arg(
            Arg::with_name("project")
                .short("p")
                .long("project")
                .value_name("DIR")
                .help("The project directory (defaults to the working directory)")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("threads")
                .long("threads")
                .value_name("N")
                .help("The number of parser threads (defaults to the CPU count)")
                .takes_value(true),
        )
        .get_matches();

    let output = Path::new(matches.value_of("output").unwrap()).to_owned();
    let project = match matches.value_of("project") {
        Some(dir) => Path::new(dir).to_owned(),
        None => std::env::current_dir()?,
    };
    let threads = matches
        .value_of("threads")
        .map(|threads| {
            threads
                .parse::<usize>()
                .map_err(|e| anyhow!("Invalid --threads value `{}`: {}", threads, e))
        })
        .transpose()?;

    let config = Config::from_directory(&project, &output, threads)?;
    build_site(config)?;
    Ok(())
}
