//! The scope tree.
//!
//! Scopes and declarations live in arenas owned by [`ScopeTree`]; parents
//! and owning scopes are plain indices. Index 0 is always the ambient scope
//! holding injected globals, with the program scope as its only child.

use crate::range::TextRange;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    /// Function body or program root: declarations visible from the start.
    Hoist,
    /// Lexical block, block-scoped loop head, switch body or class scope.
    Block,
    Catch,
}

/// The syntax node that owns a scope, keyed by its source range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeOwner {
    Ambient,
    Program,
    Function(TextRange),
    Block(TextRange),
    Catch(TextRange),
    /// `for` / `for-in` / `for-of` with a `let` or `const` head
    LoopHead(TextRange),
    Switch(TextRange),
    /// Named class expression; holds the inner class-name binding
    Class(TextRange),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKind {
    Var,
    Let,
    Const,
    Param,
    Caught,
    Fun,
}

impl DeclKind {
    pub fn is_block_scoped(&self) -> bool {
        matches!(self, DeclKind::Let | DeclKind::Const)
    }
}

#[derive(Debug, Clone)]
pub struct Declaration {
    pub name: String,
    pub kind: DeclKind,
    pub scope: ScopeId,
    /// Range of the first binding identifier; empty for implicit bindings.
    pub range: TextRange,
    /// Offset from which a block-scoped binding may be read.
    pub visible_from: u32,
    /// The declarator or parameter slot that introduced the binding.
    pub origin: Option<TextRange>,
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub owner: ScopeOwner,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    pub range: TextRange,
    pub depth: u32,
    pub decls: HashMap<String, DeclId>,
    /// Names referenced from inside this scope that resolve further out.
    pub propagates: HashSet<String>,
    /// Declared temporaries free for reuse (hoisting scopes only).
    pub temps: Vec<String>,
    pub strict: bool,
    pub is_function: bool,
    pub is_arrow: bool,
    /// Where hoisted helper declarations go: just past the directive
    /// prologue. `None` for scopes without a statement body.
    pub insert_at: Option<u32>,
}

impl Scope {
    fn new(kind: ScopeKind, owner: ScopeOwner, parent: Option<ScopeId>, range: TextRange, depth: u32) -> Self {
        Self {
            kind,
            owner,
            parent,
            children: Vec::new(),
            range,
            depth,
            decls: HashMap::new(),
            propagates: HashSet::new(),
            temps: Vec::new(),
            strict: false,
            is_function: false,
            is_arrow: false,
            insert_at: None,
        }
    }

    pub fn is_hoist(&self) -> bool {
        self.kind == ScopeKind::Hoist
    }
}

#[derive(Debug, Clone)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    decls: Vec<Declaration>,
    owners: HashMap<ScopeOwner, ScopeId>,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    pub fn new() -> Self {
        let ambient = Scope::new(
            ScopeKind::Hoist,
            ScopeOwner::Ambient,
            None,
            TextRange::new(0, u32::MAX),
            0,
        );
        let mut owners = HashMap::new();
        owners.insert(ScopeOwner::Ambient, ScopeId(0));
        Self {
            scopes: vec![ambient],
            decls: Vec::new(),
            owners,
        }
    }

    pub fn ambient(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn add_scope(
        &mut self,
        parent: ScopeId,
        kind: ScopeKind,
        owner: ScopeOwner,
        range: TextRange,
    ) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        let depth = self.scope(parent).depth + 1;
        self.scopes
            .push(Scope::new(kind, owner, Some(parent), range, depth));
        self.scope_mut(parent).children.push(id);
        self.owners.insert(owner, id);
        id
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0 as usize]
    }

    pub fn decl(&self, id: DeclId) -> &Declaration {
        &self.decls[id.0 as usize]
    }

    /// Scopes in creation order, which is source pre-order.
    pub fn scope_ids(&self) -> impl Iterator<Item = ScopeId> {
        (0..self.scopes.len() as u32).map(ScopeId)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn owned(&self, owner: &ScopeOwner) -> Option<ScopeId> {
        self.owners.get(owner).copied()
    }

    /// Add a declaration to `scope`. A name that is already declared there
    /// keeps its first declaration, whose id is returned.
    pub fn declare(&mut self, scope: ScopeId, decl: Declaration) -> DeclId {
        if let Some(&existing) = self.scope(scope).decls.get(&decl.name) {
            return existing;
        }
        self.insert_decl(scope, decl)
    }

    /// Add a declaration to `scope`, replacing any same-named one.
    pub fn override_decl(&mut self, scope: ScopeId, decl: Declaration) -> DeclId {
        self.insert_decl(scope, decl)
    }

    fn insert_decl(&mut self, scope: ScopeId, decl: Declaration) -> DeclId {
        let id = DeclId(self.decls.len() as u32);
        let name = decl.name.clone();
        self.decls.push(Declaration { scope, ..decl });
        self.scope_mut(scope).decls.insert(name, id);
        id
    }

    /// `from` and its ancestors, innermost first.
    pub fn ancestors(&self, from: ScopeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: Some(from),
        }
    }

    /// Find the declaration `name` resolves to when used in `from`.
    pub fn lookup(&self, from: ScopeId, name: &str) -> Option<DeclId> {
        self.ancestors(from)
            .find_map(|s| self.scope(s).decls.get(name).copied())
    }

    pub fn hoist_scope(&self, from: ScopeId) -> ScopeId {
        self.ancestors(from)
            .find(|&s| self.scope(s).is_hoist())
            .unwrap_or(ScopeId(0))
    }

    /// Nearest hoisting scope that can receive inserted declarations.
    pub fn insertion_scope(&self, from: ScopeId) -> ScopeId {
        self.ancestors(from)
            .find(|&s| self.scope(s).is_hoist() && self.scope(s).insert_at.is_some())
            .unwrap_or(ScopeId(0))
    }

    /// Nearest enclosing function scope, if any.
    pub fn function_scope(&self, from: ScopeId) -> Option<ScopeId> {
        self.ancestors(from).find(|&s| self.scope(s).is_function)
    }

    pub fn is_ancestor_or_self(&self, ancestor: ScopeId, of: ScopeId) -> bool {
        self.ancestors(of).any(|s| s == ancestor)
    }

    /// Whether a function boundary lies on the path from `from` up to, but
    /// excluding, `to`.
    pub fn crosses_function(&self, from: ScopeId, to: ScopeId) -> bool {
        self.ancestors(from)
            .take_while(|&s| s != to)
            .any(|s| self.scope(s).is_function)
    }

    /// Lowest common ancestor, by climbing from the deeper scope.
    pub fn lca(&self, a: ScopeId, b: ScopeId) -> ScopeId {
        let (mut a, mut b) = (a, b);
        while self.scope(a).depth > self.scope(b).depth {
            a = self.parent_or_root(a);
        }
        while self.scope(b).depth > self.scope(a).depth {
            b = self.parent_or_root(b);
        }
        while a != b {
            a = self.parent_or_root(a);
            b = self.parent_or_root(b);
        }
        a
    }

    fn parent_or_root(&self, id: ScopeId) -> ScopeId {
        self.scope(id).parent.unwrap_or(ScopeId(0))
    }
}

pub struct Ancestors<'a> {
    tree: &'a ScopeTree,
    next: Option<ScopeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = ScopeId;

    fn next(&mut self) -> Option<ScopeId> {
        let current = self.next?;
        self.next = self.tree.scope(current).parent;
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl(name: &str, kind: DeclKind) -> Declaration {
        Declaration {
            name: name.to_string(),
            kind,
            scope: ScopeId(0),
            range: TextRange::default(),
            visible_from: 0,
            origin: None,
        }
    }

    fn sample() -> (ScopeTree, [ScopeId; 4]) {
        let mut tree = ScopeTree::new();
        let program = tree.add_scope(
            tree.ambient(),
            ScopeKind::Hoist,
            ScopeOwner::Program,
            TextRange::new(0, 100),
        );
        let f = tree.add_scope(
            program,
            ScopeKind::Hoist,
            ScopeOwner::Function(TextRange::new(10, 50)),
            TextRange::new(10, 50),
        );
        let block = tree.add_scope(
            f,
            ScopeKind::Block,
            ScopeOwner::Block(TextRange::new(20, 40)),
            TextRange::new(20, 40),
        );
        let g = tree.add_scope(
            program,
            ScopeKind::Hoist,
            ScopeOwner::Function(TextRange::new(60, 90)),
            TextRange::new(60, 90),
        );
        (tree, [program, f, block, g])
    }

    #[test]
    fn test_lookup_walks_outward() {
        let (mut tree, [program, f, block, _]) = sample();
        let outer = tree.declare(program, decl("x", DeclKind::Var));
        assert_eq!(tree.lookup(block, "x"), Some(outer));
        let inner = tree.declare(f, decl("x", DeclKind::Let));
        assert_eq!(tree.lookup(block, "x"), Some(inner));
        assert_eq!(tree.lookup(block, "y"), None);
    }

    #[test]
    fn test_declare_keeps_first() {
        let (mut tree, [program, ..]) = sample();
        let first = tree.declare(program, decl("a", DeclKind::Fun));
        let second = tree.declare(program, decl("a", DeclKind::Var));
        assert_eq!(first, second);
        assert_eq!(tree.decl(first).kind, DeclKind::Fun);
        let replaced = tree.override_decl(program, decl("a", DeclKind::Const));
        assert_ne!(first, replaced);
        assert_eq!(tree.lookup(program, "a"), Some(replaced));
    }

    #[test]
    fn test_lca() {
        let (tree, [program, f, block, g]) = sample();
        assert_eq!(tree.lca(block, g), program);
        assert_eq!(tree.lca(block, f), f);
        assert_eq!(tree.lca(g, g), g);
        assert_eq!(tree.lca(tree.ambient(), block), tree.ambient());
    }

    #[test]
    fn test_hoist_and_function_scopes() {
        let (mut tree, [program, f, block, _]) = sample();
        tree.scope_mut(f).is_function = true;
        assert_eq!(tree.hoist_scope(block), f);
        assert_eq!(tree.function_scope(block), Some(f));
        assert_eq!(tree.function_scope(program), None);
        assert!(tree.crosses_function(block, program));
        assert!(!tree.crosses_function(block, f));
    }

    #[test]
    fn test_insertion_scope_skips_bodiless() {
        let (mut tree, [program, f, block, _]) = sample();
        tree.scope_mut(program).insert_at = Some(0);
        assert_eq!(tree.insertion_scope(block), program);
        tree.scope_mut(f).insert_at = Some(11);
        assert_eq!(tree.insertion_scope(block), f);
    }
}
