//! Arena-allocated program model.
//!
//! The analyses consume a class-based, single-inheritance IR with dynamic
//! dispatch, static/instance fields and heap allocation. Every entity lives
//! in a central arena on [`Program`] and is referenced by an integer handle,
//! so the (cyclic) graphs built on top of the IR never own their nodes.
//!
//! [`ProgramBuilder`] is the construction surface for the loader/front-end
//! layer (and for tests). `finish` freezes the per-variable relational
//! indexes the pointer analyses rely on: for a variable `x`, the statements
//! `x.f = y`, `y = x.f`, `x[i] = y`, `y = x[i]` and the instance calls with
//! receiver `x`.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Handle of a class in the program arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassId(pub u32);

/// Handle of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldId(pub u32);

/// Handle of a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodId(pub u32);

/// Handle of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarId(pub u32);

/// Handle of a statement. Also serves as allocation-site identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StmtId(pub u32);

/// Primitive kinds of the IR type system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimKind {
    Byte,
    Short,
    Int,
    Char,
    Boolean,
    Long,
    Float,
    Double,
}

/// Variable/field types. Arrays are untyped at the element level; the
/// pointer analyses collapse all indices of an array object anyway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Prim(PrimKind),
    Ref(ClassId),
    Array,
    Void,
}

impl Type {
    /// Whether constant propagation tracks variables of this type.
    #[inline]
    pub fn can_hold_int(&self) -> bool {
        matches!(
            self,
            Type::Prim(
                PrimKind::Byte | PrimKind::Short | PrimKind::Int | PrimKind::Char | PrimKind::Boolean
            )
        )
    }
}

/// Invocation kinds of the bytecode-like IR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallKind {
    Static,
    Special,
    Virtual,
    Interface,
    Dynamic,
}

/// Unresolved method reference at a call site: declaring class plus
/// subsignature (name + descriptor).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodRef {
    pub class: ClassId,
    pub subsignature: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShiftOp {
    /// Logical left shift.
    Shl,
    /// Arithmetic right shift.
    Shr,
    /// Unsigned (logical) right shift.
    Ushr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BitwiseOp {
    And,
    Or,
    Xor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Arith(ArithOp),
    Shift(ShiftOp),
    Bitwise(BitwiseOp),
    Condition(ConditionOp),
}

/// Binary expression over two variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BinaryExp {
    pub op: BinaryOp,
    pub lhs: VarId,
    pub rhs: VarId,
}

/// Branch condition of an `If` statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConditionExp {
    pub op: ConditionOp,
    pub lhs: VarId,
    pub rhs: VarId,
}

/// Right-hand sides of general assignments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Exp {
    IntLiteral(i32),
    Var(VarId),
    Binary(BinaryExp),
    Cast { ty: Type, var: VarId },
}

/// A call site. `recv` is `None` exactly for `Static` and `Dynamic` kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Invoke {
    pub kind: CallKind,
    pub method_ref: MethodRef,
    pub recv: Option<VarId>,
    pub args: Vec<VarId>,
    pub result: Option<VarId>,
}

/// Statement taxonomy. Control-flow targets (branches, switch cases) are
/// carried by the CFG's typed edges, not by the statements themselves, so
/// there is a single source of truth for successor sets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StmtKind {
    /// Synthetic entry/exit marker.
    Nop,
    Assign { lhs: VarId, rhs: Exp },
    Copy { lhs: VarId, rhs: VarId },
    New { lhs: VarId, class: ClassId },
    LoadField {
        lhs: VarId,
        /// `None` for static fields.
        base: Option<VarId>,
        field: FieldId,
    },
    StoreField {
        base: Option<VarId>,
        field: FieldId,
        rhs: VarId,
    },
    LoadArray { lhs: VarId, base: VarId, index: VarId },
    StoreArray { base: VarId, index: VarId, rhs: VarId },
    Invoke(Invoke),
    If { cond: ConditionExp },
    Switch { var: VarId },
    Return { vars: Vec<VarId> },
    Goto,
}

/// A statement plus its position: owning method and index within it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stmt {
    pub kind: StmtKind,
    pub method: MethodId,
    pub index: u32,
}

/// A local variable with the relational indexes frozen by
/// [`ProgramBuilder::finish`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Var {
    pub name: String,
    pub ty: Type,
    pub method: MethodId,
    store_fields: Vec<StmtId>,
    load_fields: Vec<StmtId>,
    store_arrays: Vec<StmtId>,
    load_arrays: Vec<StmtId>,
    invokes: Vec<StmtId>,
}

impl Var {
    /// Statements `x.f = y` with this variable as base `x`.
    #[inline]
    pub fn store_fields(&self) -> &[StmtId] {
        &self.store_fields
    }

    /// Statements `y = x.f` with this variable as base `x`.
    #[inline]
    pub fn load_fields(&self) -> &[StmtId] {
        &self.load_fields
    }

    /// Statements `x[i] = y` with this variable as base `x`.
    #[inline]
    pub fn store_arrays(&self) -> &[StmtId] {
        &self.store_arrays
    }

    /// Statements `y = x[i]` with this variable as base `x`.
    #[inline]
    pub fn load_arrays(&self) -> &[StmtId] {
        &self.load_arrays
    }

    /// Instance call sites with this variable as receiver.
    #[inline]
    pub fn invokes(&self) -> &[StmtId] {
        &self.invokes
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub class: ClassId,
    pub ty: Type,
    pub is_static: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    pub class: ClassId,
    pub subsignature: String,
    pub is_abstract: bool,
    params: Vec<VarId>,
    this_var: Option<VarId>,
    return_vars: Vec<VarId>,
    stmts: Vec<StmtId>,
}

impl Method {
    #[inline]
    pub fn params(&self) -> &[VarId] {
        &self.params
    }

    #[inline]
    pub fn this_var(&self) -> Option<VarId> {
        self.this_var
    }

    /// Variables returned by the `Return` statements of this method.
    #[inline]
    pub fn return_vars(&self) -> &[VarId] {
        &self.return_vars
    }

    #[inline]
    pub fn stmts(&self) -> &[StmtId] {
        &self.stmts
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Class {
    pub name: String,
    pub superclass: Option<ClassId>,
    pub interfaces: Vec<ClassId>,
    pub is_interface: bool,
    pub is_abstract: bool,
    methods: FxHashMap<String, MethodId>,
}

impl Class {
    /// The method this class itself declares for a subsignature, if any.
    #[inline]
    pub fn declared_method(&self, subsignature: &str) -> Option<MethodId> {
        self.methods.get(subsignature).copied()
    }

    pub fn declared_methods(&self) -> impl Iterator<Item = MethodId> + '_ {
        self.methods.values().copied()
    }
}

/// The frozen whole program. Read-only during analysis runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    classes: Vec<Class>,
    fields: Vec<Field>,
    methods: Vec<Method>,
    vars: Vec<Var>,
    stmts: Vec<Stmt>,
}

impl Program {
    #[inline]
    pub fn class(&self, id: ClassId) -> &Class {
        &self.classes[id.0 as usize]
    }

    #[inline]
    pub fn field(&self, id: FieldId) -> &Field {
        &self.fields[id.0 as usize]
    }

    #[inline]
    pub fn method(&self, id: MethodId) -> &Method {
        &self.methods[id.0 as usize]
    }

    #[inline]
    pub fn var(&self, id: VarId) -> &Var {
        &self.vars[id.0 as usize]
    }

    #[inline]
    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.0 as usize]
    }

    pub fn class_ids(&self) -> impl Iterator<Item = ClassId> {
        (0..self.classes.len() as u32).map(ClassId)
    }

    pub fn method_ids(&self) -> impl Iterator<Item = MethodId> {
        (0..self.methods.len() as u32).map(MethodId)
    }

    #[inline]
    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    #[inline]
    pub fn contains_method(&self, id: MethodId) -> bool {
        (id.0 as usize) < self.methods.len()
    }

    /// The variable a statement defines, if any.
    pub fn def_of(&self, s: StmtId) -> Option<VarId> {
        match &self.stmt(s).kind {
            StmtKind::Assign { lhs, .. }
            | StmtKind::Copy { lhs, .. }
            | StmtKind::New { lhs, .. }
            | StmtKind::LoadField { lhs, .. }
            | StmtKind::LoadArray { lhs, .. } => Some(*lhs),
            StmtKind::Invoke(inv) => inv.result,
            _ => None,
        }
    }

    /// The variables a statement uses.
    pub fn uses_of(&self, s: StmtId) -> Vec<VarId> {
        match &self.stmt(s).kind {
            StmtKind::Assign { rhs, .. } => match rhs {
                Exp::IntLiteral(_) => Vec::new(),
                Exp::Var(v) => vec![*v],
                Exp::Binary(b) => vec![b.lhs, b.rhs],
                Exp::Cast { var, .. } => vec![*var],
            },
            StmtKind::Copy { rhs, .. } => vec![*rhs],
            StmtKind::LoadField { base, .. } => base.iter().copied().collect(),
            StmtKind::StoreField { base, rhs, .. } => {
                base.iter().copied().chain([*rhs]).collect()
            }
            StmtKind::LoadArray { base, index, .. } => vec![*base, *index],
            StmtKind::StoreArray { base, index, rhs } => vec![*base, *index, *rhs],
            StmtKind::Invoke(inv) => {
                inv.recv.iter().copied().chain(inv.args.iter().copied()).collect()
            }
            StmtKind::If { cond } => vec![cond.lhs, cond.rhs],
            StmtKind::Switch { var } => vec![*var],
            StmtKind::Return { vars } => vars.clone(),
            StmtKind::Nop | StmtKind::New { .. } | StmtKind::Goto => Vec::new(),
        }
    }
}

/// Mutable construction surface for [`Program`].
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    classes: Vec<Class>,
    fields: Vec<Field>,
    methods: Vec<Method>,
    vars: Vec<Var>,
    stmts: Vec<Stmt>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_class(
        &mut self,
        name: impl Into<String>,
        superclass: Option<ClassId>,
        interfaces: Vec<ClassId>,
        is_interface: bool,
        is_abstract: bool,
    ) -> ClassId {
        let id = ClassId(self.classes.len() as u32);
        self.classes.push(Class {
            name: name.into(),
            superclass,
            interfaces,
            is_interface,
            is_abstract,
            methods: FxHashMap::default(),
        });
        id
    }

    pub fn add_field(
        &mut self,
        class: ClassId,
        name: impl Into<String>,
        ty: Type,
        is_static: bool,
    ) -> FieldId {
        let id = FieldId(self.fields.len() as u32);
        self.fields.push(Field {
            name: name.into(),
            class,
            ty,
            is_static,
        });
        id
    }

    /// Declares a method on a class. The subsignature doubles as the
    /// dispatch key; redeclaring it on the same class replaces the entry.
    pub fn add_method(
        &mut self,
        class: ClassId,
        subsignature: impl Into<String>,
        is_abstract: bool,
    ) -> MethodId {
        let subsignature = subsignature.into();
        let id = MethodId(self.methods.len() as u32);
        self.methods.push(Method {
            name: subsignature.clone(),
            class,
            subsignature: subsignature.clone(),
            is_abstract,
            params: Vec::new(),
            this_var: None,
            return_vars: Vec::new(),
            stmts: Vec::new(),
        });
        self.classes[class.0 as usize].methods.insert(subsignature, id);
        id
    }

    pub fn add_var(&mut self, method: MethodId, name: impl Into<String>, ty: Type) -> VarId {
        let id = VarId(self.vars.len() as u32);
        self.vars.push(Var {
            name: name.into(),
            ty,
            method,
            store_fields: Vec::new(),
            load_fields: Vec::new(),
            store_arrays: Vec::new(),
            load_arrays: Vec::new(),
            invokes: Vec::new(),
        });
        id
    }

    pub fn set_params(&mut self, method: MethodId, params: Vec<VarId>) {
        self.methods[method.0 as usize].params = params;
    }

    pub fn set_this(&mut self, method: MethodId, this_var: VarId) {
        self.methods[method.0 as usize].this_var = Some(this_var);
    }

    /// Appends a statement to a method body, assigning the next index.
    pub fn add_stmt(&mut self, method: MethodId, kind: StmtKind) -> StmtId {
        let id = StmtId(self.stmts.len() as u32);
        let m = &mut self.methods[method.0 as usize];
        let index = m.stmts.len() as u32;
        m.stmts.push(id);
        self.stmts.push(Stmt { kind, method, index });
        id
    }

    /// Freezes the program: collects method return variables and the
    /// per-variable relational indexes consumed by the pointer analyses.
    pub fn finish(mut self) -> Program {
        for i in 0..self.stmts.len() {
            let s = StmtId(i as u32);
            let (method, kind) = {
                let st = &self.stmts[i];
                (st.method, st.kind.clone())
            };
            match kind {
                StmtKind::StoreField { base: Some(b), .. } => {
                    self.vars[b.0 as usize].store_fields.push(s)
                }
                StmtKind::LoadField { base: Some(b), .. } => {
                    self.vars[b.0 as usize].load_fields.push(s)
                }
                StmtKind::StoreArray { base, .. } => {
                    self.vars[base.0 as usize].store_arrays.push(s)
                }
                StmtKind::LoadArray { base, .. } => {
                    self.vars[base.0 as usize].load_arrays.push(s)
                }
                StmtKind::Invoke(inv) => {
                    if let Some(r) = inv.recv {
                        self.vars[r.0 as usize].invokes.push(s);
                    }
                }
                StmtKind::Return { vars } => {
                    let rv = &mut self.methods[method.0 as usize].return_vars;
                    for v in vars {
                        if !rv.contains(&v) {
                            rv.push(v);
                        }
                    }
                }
                _ => {}
            }
        }
        Program {
            classes: self.classes,
            fields: self.fields,
            methods: self.methods,
            vars: self.vars,
            stmts: self.stmts,
        }
    }
}
