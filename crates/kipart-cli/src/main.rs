use clap::Parser;

use kipart_cli::generate::{self, KipartArgs};

fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::init();

    let args = KipartArgs::parse();
    generate::execute(args)
}
