// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Thin CLI front end for `lower_core`: parses a JS file, lowers it, and
//! writes the result back out as JS-like source text.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser as ClapParser;
use oxc_allocator::Allocator;
use oxc_diagnostics::OxcDiagnostic;
use oxc_parser::Parser as OxcParser;
use oxc_semantic::{SemanticBuilder, SemanticBuilderReturn};
use oxc_span::SourceType;

#[derive(Debug, ClapParser)]
#[command(name = "lower")]
#[command(about = "Lowers a JS file into labeled basic blocks", long_about = None)]
struct Args {
    /// The source file to lower.
    #[arg(default_value = "test.js")]
    input: PathBuf,

    /// Where to write the lowered output.
    #[arg(default_value = "test.out.js")]
    output: PathBuf,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let source = match std::fs::read_to_string(&args.input) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error reading {}: {err}", args.input.display());
            return ExitCode::FAILURE;
        }
    };

    let allocator = Allocator::default();
    let source_type = SourceType::default().with_typescript(false);
    let parsed = OxcParser::new(&allocator, &source, source_type).parse();

    if !parsed.errors.is_empty() {
        exit_with_parse_errors(parsed.errors, &args.input, source);
    }

    let SemanticBuilderReturn { errors, .. } = SemanticBuilder::new()
        .with_check_syntax_error(true)
        .build(&parsed.program);

    if !errors.is_empty() {
        exit_with_parse_errors(errors, &args.input, source);
    }

    match lower_core::lower_program(&parsed.program) {
        Ok(program) => {
            if let Err(err) = std::fs::write(&args.output, program.to_string()) {
                eprintln!("error writing {}: {err}", args.output.display());
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("lowering failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn exit_with_parse_errors(errors: Vec<OxcDiagnostic>, path: &Path, source: String) -> ! {
    miette::set_hook(Box::new(|_| {
        Box::new(oxc_diagnostics::GraphicalReportHandler::new())
    }))
    .ok();

    let named_source = miette::NamedSource::new(path.display().to_string(), source);

    eprintln!("SyntaxError:");
    for error in errors {
        let report = error.with_source_code(named_source.clone());
        eprintln!("{report:?}");
    }

    std::process::exit(1);
}
