use std::path::{Path, PathBuf};

use super::symbols::SymbolTable;

/// Compile-time model of the 65816 registers plus the bookkeeping one
/// assembly run needs.
///
/// `pc`, the register widths and the local scope start over with every
/// pass. `direct_page` and `data_bank` only change through `setd` and
/// `setdbr` and otherwise carry over from pass to pass. `pass` only ever
/// grows.
#[derive(Debug, Default)]
pub struct AssemblerContext {
    pub pc: i32,
    pub acc16: bool,
    pub index16: bool,
    /// Hint for the `D` register.
    pub direct_page: i32,
    /// Hint for the `DBR` register.
    pub data_bank: i32,
    pub pass: u32,
    /// Set when a symbol could not be resolved during a tolerant pass.
    pub missing_labels: bool,
    pub symbols: SymbolTable,
    include_dir: Option<PathBuf>,
}

impl AssemblerContext {
    pub fn new(include_dir: Option<PathBuf>) -> Self {
        Self {
            include_dir,
            ..Default::default()
        }
    }

    /// Reset the per-pass state and stamp new definitions with the current
    /// pass number.
    pub fn begin_pass(&mut self) {
        self.pc = 0;
        self.acc16 = false;
        self.index16 = false;
        self.missing_labels = false;
        self.symbols.begin_pass(self.pass);
    }

    /// Only the very first pass may leave symbols unresolved.
    pub fn tolerates_missing_symbols(&self) -> bool {
        self.pass == 0
    }

    /// Resolve a path named in the source against the include directory.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        resolve_path(self.include_dir.as_deref(), path)
    }
}

pub(crate) fn resolve_path(include_dir: Option<&Path>, path: &str) -> PathBuf {
    let path = Path::new(path);
    match include_dir {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn test_begin_pass_keeps_register_hints() {
        let mut ctx = AssemblerContext::new(None);
        ctx.pc = 0x8000;
        ctx.acc16 = true;
        ctx.index16 = true;
        ctx.direct_page = 0x0200;
        ctx.data_bank = 0x7E;
        ctx.missing_labels = true;
        ctx.pass = 3;

        ctx.begin_pass();

        assert_eq!(ctx.pc, 0);
        assert!(!ctx.acc16);
        assert!(!ctx.index16);
        assert!(!ctx.missing_labels);
        assert_eq!(ctx.direct_page, 0x0200);
        assert_eq!(ctx.data_bank, 0x7E);
        assert_eq!(ctx.pass, 3);
        assert!(!ctx.tolerates_missing_symbols());
    }

    #[test]
    fn test_resolve_path() {
        let tests = vec![
            (None, "gfx.bin", PathBuf::from("gfx.bin")),
            (Some("assets"), "gfx.bin", PathBuf::from("assets/gfx.bin")),
            (Some("assets"), "/abs/gfx.bin", PathBuf::from("/abs/gfx.bin")),
        ];

        for (dir, path, expected) in tests {
            let ctx = AssemblerContext::new(dir.map(PathBuf::from));
            assert_eq!(ctx.resolve_path(path), expected);
        }
    }
}
