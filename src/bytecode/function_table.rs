//! Function table: name → entry metadata for compiled functions.

use indexmap::IndexMap;

/// Where a compiled function lives and how big its frame is.
///
/// `num_locals` counts parameters plus every `let` in the body, lexically
/// flattened; slots are never reused across sibling scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionInfo {
    pub entry_pc: usize,
    pub num_params: usize,
    pub num_locals: usize,
}

/// Insertion-ordered mapping from function name to [`FunctionInfo`].
///
/// `CALL` operands are indices into this table, so iteration order is part
/// of the bytecode contract.
#[derive(Debug, Clone, Default)]
pub struct FunctionTable {
    functions: IndexMap<String, FunctionInfo>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a function; returns false if the name is already present.
    pub fn insert(&mut self, name: String, info: FunctionInfo) -> bool {
        if self.functions.contains_key(&name) {
            return false;
        }
        self.functions.insert(name, info);
        true
    }

    pub fn get(&self, name: &str) -> Option<&FunctionInfo> {
        self.functions.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut FunctionInfo> {
        self.functions.get_mut(name)
    }

    pub fn get_index(&self, index: usize) -> Option<(&String, &FunctionInfo)> {
        self.functions.get_index(index)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.functions.get_index_of(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FunctionInfo)> {
        self.functions.iter()
    }
}
