//! CLI definitions and argument types.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use fsmc::Layout;

/// Exit code for success.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code for failure.
pub const EXIT_FAILURE: i32 = 1;

#[derive(Parser)]
#[command(name = "fsmc")]
#[command(about = "Flat-table scanner generator - compiles reduced automata to Crystal")]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (sets RUST_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output (only show errors)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub silent: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate the scanner source for an automaton
    Emit {
        /// Input automaton (JSON)
        #[arg(value_name = "AUTOMATON")]
        input: PathBuf,

        /// Output file (defaults to the input name with a .cr extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Machine name used as the constant prefix
        #[arg(long, default_value = "fsm")]
        name: String,

        /// Emit constants without the machine-name prefix
        #[arg(long)]
        no_prefix: bool,

        /// Omit `# line` directives before action code
        #[arg(long)]
        no_line_directives: bool,

        /// Transition table layout
        #[arg(long, value_enum, default_value = "auto")]
        layout: LayoutArg,

        /// Do not test for the end of the buffer
        #[arg(long)]
        no_end: bool,
    },
    /// Show the layout decision and table widths without emitting code
    Stats {
        /// Input automaton (JSON)
        #[arg(value_name = "AUTOMATON")]
        input: PathBuf,

        /// Transition table layout
        #[arg(long, value_enum, default_value = "auto")]
        layout: LayoutArg,
    },
}

/// Transition table layout.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum LayoutArg {
    /// Pick the smaller layout
    #[default]
    Auto,
    /// Per-state slots index a shared transition array
    Indexed,
    /// Per-state slots hold targets and actions
    Direct,
}

impl From<LayoutArg> for Option<Layout> {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Auto => None,
            LayoutArg::Indexed => Some(Layout::Indexed),
            LayoutArg::Direct => Some(Layout::Direct),
        }
    }
}
