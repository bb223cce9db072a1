/// Data model shared by the front-end and the assembler.
pub mod ast;

/// Transforms 65816 assembly code to machine code.
///
/// The steps are:
/// 1. **Lexing** - converting a string into tokens
/// 2. **Parsing** - converting tokens into [`ast::Line`]s, splicing in `incsrc` files
/// 3. **Compiling** - laying out and encoding the lines in multiple passes
///     - Pass 1: every symbol is collected, forward references assume the widest encoding
///     - Later passes: encodings shrink to fit the known addresses until no size changes
/// 4. **Code generation** - writing the memory image
pub mod assembler;

/// Hexdump utility
pub mod hexdump;

/// Logging and chrome tracing setup
pub mod instrumentation;
