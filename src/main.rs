use clap::Parser;
use miette::Result;
use packtrace::cli::{Cli, Commands};

fn main() -> Result<()> {
    // Install miette's fancy error handler for terminal diagnostics
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .build(),
        )
    }))?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Audit(args) => packtrace::cli::commands::audit::run(args),
        Commands::Readiness(args) => packtrace::cli::commands::readiness::run(args),
        Commands::Evidence(args) => packtrace::cli::commands::evidence::run(args),
    }
}
