use clap::Parser;

use kipart_cli::export::{self, Kilib2CsvArgs};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Kilib2CsvArgs::parse();
    export::execute(args)
}
