use method_record::agent::Agent;
use method_record::config::Config;
use method_record::offline;

use clap::{value_parser, Arg, Command};
use std::path::PathBuf;

fn main() -> Result<(), method_record::jvm::Error> {
    env_logger::init();

    let matches = Command::new("JVM method entry recorder")
        .version(clap::crate_version!())
        .about("Instrument class files so that they report the methods they enter")
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .value_name("DIRECTORY")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Directory into which the instrumented files are written"),
        )
        .arg(
            Arg::new("args")
                .long("args")
                .value_name("FILE")
                .required(false)
                .value_parser(value_parser!(PathBuf))
                .help("Properties file with the agent arguments"),
        )
        .arg(
            Arg::new("build-dir")
                .long("build-dir")
                .value_name("DIRECTORY")
                .default_value(".")
                .value_parser(value_parser!(PathBuf))
                .help("Directory containing `defects4j.build.properties`"),
        )
        .arg(
            Arg::new("INPUT")
                .help("Class file or directory of class files to instrument")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .index(1),
        )
        .get_matches();

    let output: &PathBuf = matches.get_one("output").expect("required argument");
    let input: &PathBuf = matches.get_one("INPUT").expect("required argument");
    let build_dir: &PathBuf = matches.get_one("build-dir").expect("defaulted argument");
    let args: Option<&PathBuf> = matches.get_one("args");

    let config = Config::load(build_dir, args.map(PathBuf::as_path));
    let agent = Agent::from_config(config);

    log::info!("Instrumenting '{}'", input.display());
    let summary = offline::instrument_path(agent.rewriter(), input, output)?;
    log::info!("{}", summary);

    Ok(())
}
