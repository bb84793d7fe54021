//! Scoped variable and function environment for the type checker.

use std::collections::HashMap;

use crate::span::Span;
use crate::types::type_repr::Type;

/// A function signature visible to call sites.
#[derive(Debug, Clone)]
pub struct FunctionSig {
    pub params: Vec<Type>,
    pub return_type: Type,
    pub span: Span,
}

/// A borrow held by a reference binding: which variable it borrows and
/// whether the borrow is unique.
#[derive(Debug, Clone)]
pub struct BorrowRecord {
    pub target: String,
    pub is_mut: bool,
}

/// What the checker knows about one binding.
#[derive(Debug, Clone)]
pub struct VariableInfo {
    pub ty: Type,
    pub is_mut: bool,
    /// Set when this binding was initialized by borrowing a named local.
    pub borrow: Option<BorrowRecord>,
    /// Cleared when a conflicting borrow or assignment invalidates the
    /// borrow this binding holds.
    pub borrow_valid: bool,
}

impl VariableInfo {
    pub fn new(ty: Type, is_mut: bool) -> Self {
        Self {
            ty,
            is_mut,
            borrow: None,
            borrow_valid: true,
        }
    }
}

/// Lexically scoped bindings plus the program's function signatures.
#[derive(Debug, Default)]
pub struct TypeEnvironment {
    scopes: Vec<HashMap<String, VariableInfo>>,
    functions: HashMap<String, FunctionSig>,
}

impl TypeEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// Declare a binding in the innermost scope. Shadowing is allowed, both
    /// across scopes and within one.
    pub fn declare(&mut self, name: String, info: VariableInfo) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, info);
        }
    }

    pub fn get(&self, name: &str) -> Option<&VariableInfo> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Invalidate borrows of `target` held by any visible binding.
    ///
    /// With `only_mut` set, only unique borrows are invalidated (a new
    /// shared borrow can coexist with other shared borrows).
    pub fn invalidate_borrows_of(&mut self, target: &str, only_mut: bool) {
        for scope in &mut self.scopes {
            for info in scope.values_mut() {
                if let Some(borrow) = &info.borrow {
                    if borrow.target == target && (!only_mut || borrow.is_mut) {
                        info.borrow_valid = false;
                    }
                }
            }
        }
    }

    /// Record a function signature; returns false if the name is taken.
    pub fn define_function(&mut self, name: String, sig: FunctionSig) -> bool {
        if self.functions.contains_key(&name) {
            return false;
        }
        self.functions.insert(name, sig);
        true
    }

    pub fn get_function(&self, name: &str) -> Option<&FunctionSig> {
        self.functions.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_lookup() {
        let mut env = TypeEnvironment::new();
        env.push_scope();
        env.declare("x".to_string(), VariableInfo::new(Type::I32, false));
        env.push_scope();
        env.declare("x".to_string(), VariableInfo::new(Type::Bool, false));

        assert_eq!(env.get("x").unwrap().ty, Type::Bool);
        env.pop_scope();
        assert_eq!(env.get("x").unwrap().ty, Type::I32);
    }

    #[test]
    fn test_borrow_invalidation() {
        let mut env = TypeEnvironment::new();
        env.push_scope();
        let mut y = VariableInfo::new(Type::Ref(Box::new(Type::I32)), false);
        y.borrow = Some(BorrowRecord {
            target: "x".to_string(),
            is_mut: false,
        });
        env.declare("y".to_string(), y);

        // A shared borrow does not kill other shared borrows.
        env.invalidate_borrows_of("x", true);
        assert!(env.get("y").unwrap().borrow_valid);

        // A unique borrow kills everything.
        env.invalidate_borrows_of("x", false);
        assert!(!env.get("y").unwrap().borrow_valid);
    }
}
