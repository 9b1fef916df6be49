use anyhow::Result;
use clap::Args;
use clap_complete::Shell;
use std::io::{self, Write};

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate the script for.
    #[arg(value_enum)]
    pub shell: Shell,
}

pub fn run_completions(shell: Shell, command: &mut clap::Command) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_completions(shell, command, &mut out);
    out.flush()?;
    Ok(())
}

/// The script registers under the command's own name, so renaming the
/// binary only touches the `Cli` definition.
fn write_completions(shell: Shell, command: &mut clap::Command, out: &mut dyn Write) {
    let name = command.get_name().to_string();
    clap_complete::generate(shell, command, name, out);
}
