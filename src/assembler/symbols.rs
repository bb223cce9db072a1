use std::collections::HashMap;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SymbolError {
    #[error("redefinition of label {0}")]
    Redefined(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Symbol {
    value: i32,
    /// Pass in which the value was last stored
    pass: u32,
}

/// Scoped name to value store.
///
/// Global names and local names (those starting with `.`) live in separate
/// namespaces. A local name is stored under `<scope>:<name>`, where the scope
/// is the most recent global label seen in program order. `:` can't appear
/// in a label so scoped keys never collide with user-written names.
///
/// Each stored value remembers the pass it was defined in. Defining a name
/// twice within the same pass is an error, while defining it again in a
/// later pass simply replaces the value.
#[derive(Debug, Default)]
pub struct SymbolTable {
    globals: HashMap<String, Symbol>,
    locals: HashMap<String, Symbol>,
    scope: Option<String>,
    pass: u32,
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable::default()
    }

    pub fn is_local(name: &str) -> bool {
        name.starts_with('.')
    }

    /// Start stamping definitions with `pass` and leave any local scope.
    pub fn begin_pass(&mut self, pass: u32) {
        self.pass = pass;
        self.scope = None;
    }

    /// Make `label` the enclosing scope for local names that follow.
    ///
    /// Local labels never open a scope of their own.
    pub fn enter_scope(&mut self, label: &str) {
        if !Self::is_local(label) {
            self.scope = Some(label.to_owned());
        }
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Key a local name is stored under in the current scope. Locals that
    /// appear before any global label live in the anonymous scope `""`.
    fn scoped_key(&self, name: &str) -> String {
        format!(
            "{}:{}",
            self.scope.as_deref().unwrap_or_default(),
            name.trim_start_matches('.')
        )
    }

    fn find(&self, name: &str) -> Option<&Symbol> {
        if Self::is_local(name) {
            self.locals.get(&self.scoped_key(name))
        } else {
            self.globals.get(name)
        }
    }

    /// Store `value` under `name`, failing if `name` was already defined
    /// during the current pass.
    #[tracing::instrument(skip(self))]
    pub fn define(&mut self, name: &str, value: i32) -> Result<(), SymbolError> {
        if self.find(name).is_some_and(|symbol| symbol.pass == self.pass) {
            return Err(SymbolError::Redefined(name.to_owned()));
        }

        let symbol = Symbol {
            value,
            pass: self.pass,
        };
        if Self::is_local(name) {
            let key = self.scoped_key(name);
            self.locals.insert(key, symbol);
        } else {
            self.globals.insert(name.to_owned(), symbol);
        }
        Ok(())
    }

    /// Latest value of `name` from any pass, or `None` if it has never been
    /// defined.
    pub fn lookup(&self, name: &str) -> Option<i32> {
        self.find(name).map(|symbol| symbol.value)
    }

    /// Drop every local name regardless of scope.
    #[tracing::instrument(skip(self))]
    pub fn forget_locals(&mut self) {
        self.locals.clear();
    }

    /// All symbols sorted by name. Locals are reported under their scoped
    /// key, e.g. `main:loop`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i32)> {
        let mut symbols = self
            .globals
            .iter()
            .chain(self.locals.iter())
            .map(|(name, symbol)| (name.as_str(), symbol.value))
            .collect::<Vec<_>>();
        symbols.sort();
        symbols.into_iter()
    }
}
