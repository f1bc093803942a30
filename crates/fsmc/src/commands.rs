//! Command implementations.

use std::path::Path;

use console::style;
use fsmc::{GenOptions, Layout};
use tracing::{error, info};

use crate::cli::{Cli, Commands, EXIT_FAILURE, EXIT_SUCCESS, LayoutArg};

/// Dispatch CLI command to the appropriate handler.
pub fn run_command(cli: &Cli) -> i32 {
    match &cli.command {
        Commands::Emit {
            input,
            output,
            name,
            no_prefix,
            no_line_directives,
            layout,
            no_end,
        } => {
            let opts = GenOptions::new(name.as_str())
                .with_no_prefix(*no_prefix)
                .with_line_directives(!*no_line_directives)
                .with_layout((*layout).into())
                .with_no_end(*no_end);
            let output = output
                .clone()
                .unwrap_or_else(|| input.with_extension("cr"));
            cmd_emit(input, &output, &opts)
        }
        Commands::Stats { input, layout } => cmd_stats(input, *layout),
    }
}

fn cmd_emit(input: &Path, output: &Path, opts: &GenOptions) -> i32 {
    info!(input = %input.display(), output = %output.display(), "generating");
    match fsmc::generate_file(input, output, opts) {
        Ok(code) => {
            eprintln!(
                "{} {} ({} layout, {} table bytes)",
                style("✓").green().bold(),
                output.display(),
                code.tables.layout(),
                code.tables.byte_size()
            );
            EXIT_SUCCESS
        }
        Err(e) => {
            error!(error = %e, "generation failed");
            eprintln!("{} {e}", style("✗").red().bold());
            EXIT_FAILURE
        }
    }
}

fn cmd_stats(input: &Path, layout: LayoutArg) -> i32 {
    let tables = match fsmc::load_fsm(input).and_then(|fsm| fsmc::plan(&fsm, layout.into())) {
        Ok(tables) => tables,
        Err(e) => {
            error!(error = %e, "planning failed");
            eprintln!("{} {e}", style("✗").red().bold());
            return EXIT_FAILURE;
        }
    };

    let plan = &tables.plan;
    let marker = |l: Layout| if plan.layout == l { "*" } else { " " };
    println!("{}", style(input.display()).bold());
    println!("  states          {}", tables.state_count());
    println!("  key type        {}", tables.key_type);
    println!(
        "  {} indexed       {} bytes",
        marker(Layout::Indexed),
        plan.size_with_indices
    );
    println!(
        "  {} direct        {} bytes",
        marker(Layout::Direct),
        plan.size_without_indices
    );
    if plan.forced {
        println!("  {}", style("layout forced").yellow());
    }
    println!();
    println!("  {:<20} {:>8} {:>8} {:>10}", "array", "type", "length", "bytes");
    for array in tables.arrays() {
        println!(
            "  {:<20} {:>8} {:>8} {:>10}",
            array.kind.base_name(),
            array.ty.to_string(),
            array.len(),
            array.byte_size()
        );
    }
    println!("  {:<20} {:>8} {:>8} {:>10}", "total", "", "", tables.byte_size());
    EXIT_SUCCESS
}
