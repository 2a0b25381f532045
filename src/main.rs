use clap::Parser as _;
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};
use vallox_mv_tools::commands;

#[derive(clap::Parser)]
#[clap(version, about)]
enum Commands {
    Registers(commands::registers::Args),
    Fields(commands::fields::Args),
    Status(commands::status::Args),
    Set(commands::set::Args),
}

fn end<E: std::error::Error>(r: Result<(), E>) {
    std::process::exit(match r {
        Ok(_) => 0,
        Err(e) => {
            eprintln!("error: {e}");
            let mut cause = e.source();
            while let Some(e) = cause {
                eprintln!("  because: {e}");
                cause = e.source();
            }
            1
        }
    });
}

fn main() {
    let filter_description = std::env::var("VALLOX_MV_TOOLS_LOG").unwrap_or_default();
    let filter = filter_description
        .parse::<tracing_subscriber::filter::targets::Targets>()
        .expect("could not parse the VALLOX_MV_TOOLS_LOG filter description");
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
    match Commands::parse() {
        Commands::Registers(args) => end(commands::registers::run(args)),
        Commands::Fields(args) => end(commands::fields::run(args)),
        Commands::Status(args) => end(commands::status::run(args)),
        Commands::Set(args) => end(commands::set::run(args)),
    }
}
