//! Flat symbol table with two linkage classes.
//!
//! A linear scan over a `Vec` is deliberate: the table holds at most a few
//! hundred entries, lookups are rare next to token reads, and the flat
//! layout keeps iteration deterministic without pulling in a hash map.

use inkwell::values::{FunctionValue, PointerValue};
use micc_par::{Name, Type};
use micc_util::Diagnostic;

/// Whether a symbol survives past the function body that created it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolLinkage {
    /// Visible for the rest of the module.
    Global,
    /// Confined to the current function body.
    Local,
}

/// The backend handle a symbol resolves to.
#[derive(Clone, Copy, Debug)]
pub enum SymbolValue<'ctx> {
    /// Functions are values themselves.
    Function(FunctionValue<'ctx>),
    /// Variables resolve to their storage pointer: a global for module
    /// variables, an alloca for locals and spilled parameters.
    Storage(PointerValue<'ctx>),
}

/// A resolved name.
#[derive(Clone, Debug)]
pub struct Symbol<'ctx> {
    pub ty: Type,
    pub name: Name,
    pub linkage: SymbolLinkage,
    pub value: SymbolValue<'ctx>,
}

/// Ordered sequence of symbols; no two entries share a name.
#[derive(Debug, Default)]
pub struct SymbolTable<'ctx> {
    symbols: Vec<Symbol<'ctx>>,
}

impl<'ctx> SymbolTable<'ctx> {
    pub fn new() -> Self {
        Self {
            symbols: Vec::new(),
        }
    }

    /// Append a symbol, rejecting name collisions.
    pub fn set(&mut self, symbol: Symbol<'ctx>) -> Result<(), Diagnostic> {
        for existing in &self.symbols {
            if existing.name.text == symbol.name.text {
                return Err(Diagnostic::error(
                    symbol.name.loc,
                    format!("redefinition of '{}'", existing.name.text),
                ));
            }
        }

        self.symbols.push(symbol);

        Ok(())
    }

    /// Find a symbol by name.
    pub fn lookup(&self, name: &Name) -> Result<&Symbol<'ctx>, Diagnostic> {
        self.symbols
            .iter()
            .find(|symbol| symbol.name.text == name.text)
            .ok_or_else(|| Diagnostic::error(name.loc, format!("undefined '{}'", name.text)))
    }

    /// Drop every non-global symbol. Called after each function body.
    ///
    /// The surviving order is not observable, so any compaction would do;
    /// `retain` keeps it stable anyway.
    pub fn reset(&mut self) {
        self.symbols
            .retain(|symbol| symbol.linkage == SymbolLinkage::Global);
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
