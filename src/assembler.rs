use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use crate::ast::Line;

/// Lexes code into tokens.
///
/// Converts a string into tokens. For example, the line `lda #$10` is
/// converted into the following tokens:
///
/// ```text
/// [
///     Token { token: TokenType::Identifier, literal: "lda", line: 1 },
///     Token { token: TokenType::Hash, literal: "#", line: 1 },
///     Token { token: TokenType::Hex, literal: "10", line: 1 },
///     Token { token: TokenType::Eof, literal: "", line: 1 },
/// ]
/// ```
pub mod lexer;

/// Parses tokens into [`Line`]s.
pub mod parser;

/// Symbol table with global and scoped local labels.
pub mod symbols;

/// Expression evaluation against the symbol table.
pub mod eval;

/// Mnemonic and directive lookup.
pub mod registry;

/// State carried through a pass.
pub mod context;

/// Addressing-mode selection and instruction encoding.
pub mod encoder;

/// Multi-pass layout driver.
pub mod compiler;

/// Writes the final memory image.
pub mod codegen;

/// Assembly diagnostics.
pub mod error;

pub use compiler::{Options, DEFAULT_MAX_PASSES};
pub use error::{CompilerError, ErrorKind};

use self::{
    codegen::CodeGenError, compiler::Compiler, parser::ParseError, registry::INSTRUCTIONS,
    symbols::SymbolTable,
};

#[derive(Debug, thiserror::Error)]
pub enum AssemblerError {
    #[error("Parser error: {0}")]
    Parse(#[from] ParseError),
    #[error("Compiler error: {0}")]
    Compile(#[from] CompilerError),
    #[error("Code generation error: {0}")]
    CodeGen(#[from] CodeGenError),
}

/// Result of assembling a program.
#[derive(Debug)]
pub struct Assembly {
    pub image: Vec<u8>,
    /// Address of the first byte in `image`.
    pub origin: i32,
    pub lines: Vec<Line>,
    pub symbols: SymbolTable,
    pub passes: u32,
}

/// Assemble already parsed lines.
#[tracing::instrument(skip_all)]
pub fn assemble_lines(mut lines: Vec<Line>, options: &Options) -> Result<Assembly, AssemblerError> {
    let include_dir = options.include_dir.clone();
    let mut compiler = Compiler::new(&INSTRUCTIONS, options.clone());
    compiler.compile(&mut lines)?;

    let image = codegen::generate(&lines, &INSTRUCTIONS, include_dir.as_deref())?;
    let passes = compiler.passes();
    let origin = compiler.origin().unwrap_or(0);
    info!(bytes = image.len(), passes, "assembled");

    Ok(Assembly {
        image,
        origin,
        lines,
        symbols: compiler.into_symbols(),
        passes,
    })
}

/// Assemble a program held in memory.
#[tracing::instrument(skip(source))]
pub fn assemble_source(source: &str, options: &Options) -> Result<Assembly, AssemblerError> {
    let lines = parser::parse_source(source, None, options.include_dir.as_deref())?;
    assemble_lines(lines, options)
}

/// Assemble the program stored at `path`.
#[tracing::instrument]
pub fn assemble_file(path: &Path, options: &Options) -> Result<Assembly, AssemblerError> {
    let lines = parser::parse_file(path, options.include_dir.as_deref())?;
    assemble_lines(lines, options)
}

/// Utility function for generating machine code from an assembly program.
#[tracing::instrument]
pub fn compile_code(input: &str) -> Result<Vec<u8>, AssemblerError> {
    Ok(assemble_source(input, &Options::default())?.image)
}

/// `name = $XXXXXX` per symbol, sorted by name.
pub fn symbol_listing(symbols: &SymbolTable) -> String {
    symbols
        .iter()
        .map(|(name, value)| format!("{} = ${:06X}\n", name, value))
        .collect::<String>()
}

#[derive(Args, Debug)]
pub struct AssemblyArgs {
    #[clap(help = "Assembly source file")]
    pub input: PathBuf,
    #[clap(short, long)]
    #[clap(help = "Output binary [default: <INPUT> with a .bin extension]")]
    pub output: Option<PathBuf>,
    #[clap(long, value_name = "FILE")]
    #[clap(help = "Write the final symbol values to FILE")]
    pub symbols: Option<PathBuf>,
    #[clap(long)]
    #[clap(help = "Print a hexdump of the assembled image")]
    pub hexdump: bool,
    #[clap(short = 'I', long, value_name = "DIR")]
    #[clap(help = "Base directory for incsrc and incbin [default: directory of <INPUT>]")]
    pub include_dir: Option<PathBuf>,
    #[clap(long, default_value_t = DEFAULT_MAX_PASSES)]
    #[clap(help = "Give up when the layout has not settled after this many passes")]
    pub max_passes: u32,
}

/// Assemble the file named on the command line and write its image.
pub fn assemble(args: &AssemblyArgs) -> Result<()> {
    let include_dir = args
        .include_dir
        .clone()
        .or_else(|| args.input.parent().map(Path::to_path_buf));
    let options = Options {
        include_dir,
        max_passes: args.max_passes,
    };

    let assembly = assemble_file(&args.input, &options)
        .with_context(|| format!("Unable to assemble {}", args.input.display()))?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.input.with_extension("bin"));
    fs::write(&output, &assembly.image)
        .with_context(|| format!("Unable to write {}", output.display()))?;
    eprintln!(
        "Wrote {} bytes to {} in {} passes",
        assembly.image.len(),
        output.display(),
        assembly.passes
    );

    if let Some(path) = &args.symbols {
        fs::write(path, symbol_listing(&assembly.symbols))
            .with_context(|| format!("Unable to write {}", path.display()))?;
    }

    if args.hexdump {
        println!(
            "{}",
            crate::hexdump::hexdump(&assembly.image, assembly.origin as u32, 16)
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn test_compile_code() -> Result<(), AssemblerError> {
        let tests = vec![
            ("org $8000\nlda #$01\nrts\n", vec![0xA9, 0x01, 0x60]),
            ("org $8000\nloop: nop\nbra loop\n", vec![0xEA, 0x80, 0xFD]),
            ("db 1, 2, 3\ndw $1234\n", vec![0x01, 0x02, 0x03, 0x34, 0x12]),
        ];

        for (input, expected) in tests {
            assert_eq!(compile_code(input)?, expected, "{}", input);
        }
        Ok(())
    }

    #[test]
    fn test_symbol_listing() -> Result<(), AssemblerError> {
        let assembly = assemble_source(
            "org $8000\nmain: nop\n.loop: bra .loop\nCOUNT equ 3\n",
            &Options::default(),
        )?;

        assert_eq!(assembly.origin, 0x8000);
        assert_eq!(
            symbol_listing(&assembly.symbols),
            "COUNT = $000003\nmain = $008000\nmain:loop = $008001\n"
        );
        Ok(())
    }

    #[test]
    fn test_assemble_writes_nothing_on_failure() {
        let dir = std::env::temp_dir().join("asm65816-assemble-test");
        fs::create_dir_all(&dir).unwrap();
        let input = dir.join("broken.s");
        let output = dir.join("broken.bin");
        fs::write(&input, "  lda UndefinedLabel\n").unwrap();
        let _ = fs::remove_file(&output);

        let args = AssemblyArgs {
            input,
            output: None,
            symbols: None,
            hexdump: false,
            include_dir: None,
            max_passes: DEFAULT_MAX_PASSES,
        };
        let err = assemble(&args).unwrap_err();

        assert!(format!("{:#}", err).contains("undefined symbol 'UndefinedLabel'"));
        assert!(!output.exists());
    }

    #[test]
    fn test_assemble_writes_image_and_symbols() {
        let dir = std::env::temp_dir().join("asm65816-assemble-ok-test");
        fs::create_dir_all(&dir).unwrap();
        let input = dir.join("ok.s");
        fs::write(&input, "  org $8000\nstart: bra start\n").unwrap();

        let args = AssemblyArgs {
            input: input.clone(),
            output: None,
            symbols: Some(dir.join("ok.sym")),
            hexdump: false,
            include_dir: None,
            max_passes: DEFAULT_MAX_PASSES,
        };
        assemble(&args).unwrap();

        assert_eq!(fs::read(input.with_extension("bin")).unwrap(), vec![0x80, 0xFE]);
        assert_eq!(
            fs::read_to_string(dir.join("ok.sym")).unwrap(),
            "start = $008000\n"
        );
    }

    #[test]
    fn test_error_kinds() {
        let parse = compile_code("lda (").unwrap_err();
        assert!(matches!(parse, AssemblerError::Parse(_)));

        let compile = compile_code("lda missing").unwrap_err();
        assert!(matches!(compile, AssemblerError::Compile(_)));
    }
}
