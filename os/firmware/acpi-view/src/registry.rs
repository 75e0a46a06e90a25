//! # Parser registry
//!
//! Maps table signatures to the functions that parse them. The default
//! registry holds every built-in parser; hosts may add their own or replace
//! a built-in one by unregistering it first.

use crate::{Session, Signature, Table};
use alloc::collections::BTreeMap;

/// A table-specific parser.
///
/// Receives the session (for output, options and recursion into referenced
/// tables) and the table being processed.
pub type TableParser = fn(&mut Session<'_>, &Table<'_>);

/// Registry operation failed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("a parser for {0} is already registered")]
    AlreadyRegistered(Signature),
    #[error("no parser is registered for {0}")]
    NotFound(Signature),
}

/// Signature to parser mapping. At most one parser per signature.
#[derive(Clone)]
pub struct ParserRegistry {
    parsers: BTreeMap<Signature, TableParser>,
}

impl ParserRegistry {
    /// A registry without any parsers.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            parsers: BTreeMap::new(),
        }
    }

    /// Add a parser for `signature`.
    ///
    /// # Errors
    /// [`RegistryError::AlreadyRegistered`] if the signature already has a
    /// parser; the existing one stays in effect.
    pub fn register(
        &mut self,
        signature: Signature,
        parser: TableParser,
    ) -> Result<(), RegistryError> {
        if self.parsers.contains_key(&signature) {
            return Err(RegistryError::AlreadyRegistered(signature));
        }
        self.parsers.insert(signature, parser);
        Ok(())
    }

    /// Remove the parser for `signature`.
    ///
    /// # Errors
    /// [`RegistryError::NotFound`] if no parser was registered.
    pub fn unregister(&mut self, signature: Signature) -> Result<(), RegistryError> {
        self.parsers
            .remove(&signature)
            .map(|_| ())
            .ok_or(RegistryError::NotFound(signature))
    }

    /// The parser for `signature`.
    ///
    /// # Errors
    /// [`RegistryError::NotFound`] if no parser is registered.
    pub fn lookup(&self, signature: Signature) -> Result<TableParser, RegistryError> {
        self.parsers
            .get(&signature)
            .copied()
            .ok_or(RegistryError::NotFound(signature))
    }

    #[must_use]
    pub fn contains(&self, signature: Signature) -> bool {
        self.parsers.contains_key(&signature)
    }

    /// Registered signatures in ascending order.
    pub fn signatures(&self) -> impl Iterator<Item = Signature> + '_ {
        self.parsers.keys().copied()
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        crate::tables::register_all(&mut registry);
        registry
    }
}
