use clap::Parser;
use fst::cli::{Cli, Commands};
use miette::Result;

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    // This is standard practice for CLI tools that output to stdout.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    // Install miette's fancy error handler for beautiful diagnostics
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;

    match cli.command {
        Commands::Init(args) => fst::cli::commands::init::run(args),
        Commands::Client(cmd) => fst::cli::commands::client::run(cmd, &global),
        Commands::Tech(cmd) => fst::cli::commands::tech::run(cmd, &global),
        Commands::Material(cmd) => fst::cli::commands::material::run(cmd, &global),
        Commands::Project(cmd) => fst::cli::commands::project::run(cmd, &global),
        Commands::Quote(cmd) => fst::cli::commands::quote::run(cmd, &global),
        Commands::Wo(cmd) => fst::cli::commands::wo::run(cmd, &global),
        Commands::Link(cmd) => fst::cli::commands::link::run(cmd, &global),
        Commands::History(args) => fst::cli::commands::history::run(args, &global),
    }
}
