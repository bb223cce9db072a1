use anyhow::Result;
use clap::Parser;

use asm65816::{
    assembler::{assemble, AssemblyArgs},
    instrumentation,
};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[clap(long)]
    #[clap(help = "Enable chrome tracing")]
    #[clap(long_help = "Enable chrome tracing which on program exit will generate
a json file to be opened with a chrome tracing compatible
viewer.")]
    trace: bool,
    #[clap(short, long, action = clap::ArgAction::Count)]
    #[clap(help = "Log more to stderr, repeat for more detail")]
    verbose: u8,
    #[command(flatten)]
    args: AssemblyArgs,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _trace_guard = instrumentation::init(cli.trace, cli.verbose);

    assemble(&cli.args)
}
