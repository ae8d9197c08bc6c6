use serde::{Deserialize, Serialize};
use std::fmt;

/// Jump target marker. Labels travel with the instruction they are attached
/// to, so inserting code never invalidates a branch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct Label(pub u32);

/// Index into a routine's local variable table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct LocalSlot(pub u16);

impl fmt::Display for LocalSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V_{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalKind {
    Bool,
    Int32,
    Float32,
    Object(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodRef {
    pub owner: String,
    pub name: String,
}

impl MethodRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.owner, self.name)
    }
}

/// The subset of the host's stack-machine opcodes the search routine uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpCode {
    Nop,
    LdArg,
    LdLoc,
    /// Push the address of a local (by-reference argument).
    LdLocA,
    StLoc,
    LdcI4,
    LdNull,
    LdFld,
    Call,
    CallVirt,
    Br,
    BrTrue,
    BrFalse,
    Beq,
    Bgt,
    Bge,
    Blt,
    Ble,
    Pop,
    Ret,
}

impl OpCode {
    pub fn is_branch(self) -> bool {
        matches!(
            self,
            OpCode::Br
                | OpCode::BrTrue
                | OpCode::BrFalse
                | OpCode::Beq
                | OpCode::Bgt
                | OpCode::Bge
                | OpCode::Blt
                | OpCode::Ble
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    None,
    Arg(u16),
    Local(LocalSlot),
    Int(i64),
    Field(String),
    Method(MethodRef),
    Target(Label),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: OpCode,
    pub operand: Operand,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<Label>,
}

impl Instruction {
    pub fn new(opcode: OpCode, operand: Operand) -> Self {
        Self {
            opcode,
            operand,
            labels: Vec::new(),
        }
    }

    pub fn op(opcode: OpCode) -> Self {
        Self::new(opcode, Operand::None)
    }

    pub fn ldarg(index: u16) -> Self {
        Self::new(OpCode::LdArg, Operand::Arg(index))
    }

    pub fn ldloc(slot: LocalSlot) -> Self {
        Self::new(OpCode::LdLoc, Operand::Local(slot))
    }

    pub fn ldloca(slot: LocalSlot) -> Self {
        Self::new(OpCode::LdLocA, Operand::Local(slot))
    }

    pub fn stloc(slot: LocalSlot) -> Self {
        Self::new(OpCode::StLoc, Operand::Local(slot))
    }

    pub fn ldc(value: i64) -> Self {
        Self::new(OpCode::LdcI4, Operand::Int(value))
    }

    pub fn call(method: MethodRef) -> Self {
        Self::new(OpCode::Call, Operand::Method(method))
    }

    pub fn branch(opcode: OpCode, target: Label) -> Self {
        debug_assert!(opcode.is_branch());
        Self::new(opcode, Operand::Target(target))
    }

    pub fn with_label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    pub fn is_stloc(&self, slot: LocalSlot) -> bool {
        self.opcode == OpCode::StLoc && self.operand == Operand::Local(slot)
    }

    pub fn is_ldloc(&self, slot: LocalSlot) -> bool {
        self.opcode == OpCode::LdLoc && self.operand == Operand::Local(slot)
    }

    pub fn is_ldarg(&self, index: u16) -> bool {
        self.opcode == OpCode::LdArg && self.operand == Operand::Arg(index)
    }

    pub fn branch_target(&self) -> Option<Label> {
        match self.operand {
            Operand::Target(label) if self.opcode.is_branch() => Some(label),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for label in &self.labels {
            write!(f, "L{}: ", label.0)?;
        }
        write!(f, "{:?}", self.opcode)?;
        match &self.operand {
            Operand::None => Ok(()),
            Operand::Arg(i) => write!(f, " arg{i}"),
            Operand::Local(slot) => write!(f, " {slot}"),
            Operand::Int(v) => write!(f, " {v}"),
            Operand::Field(name) => write!(f, " {name}"),
            Operand::Method(m) => write!(f, " {m}"),
            Operand::Target(label) => write!(f, " L{}", label.0),
        }
    }
}

/// Compiled body of one host routine plus its local variable table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Routine {
    pub name: String,
    pub locals: Vec<LocalKind>,
    pub body: Vec<Instruction>,
}

impl Routine {
    pub fn new(name: impl Into<String>, locals: Vec<LocalKind>, body: Vec<Instruction>) -> Self {
        Self {
            name: name.into(),
            locals,
            body,
        }
    }

    /// Append a local to the frame and return its slot, or `None` when the
    /// frame already uses every addressable slot.
    pub fn declare_local(&mut self, kind: LocalKind) -> Option<LocalSlot> {
        let slot = LocalSlot(u16::try_from(self.locals.len()).ok()?);
        self.locals.push(kind);
        Some(slot)
    }

    /// Index of the instruction carrying `label`.
    pub fn resolve_label(&self, label: Label) -> Option<usize> {
        self.body.iter().position(|i| i.labels.contains(&label))
    }

    /// Every label defined in the body, in body order.
    pub fn labels(&self) -> impl Iterator<Item = (Label, usize)> + '_ {
        self.body
            .iter()
            .enumerate()
            .flat_map(|(idx, i)| i.labels.iter().map(move |l| (*l, idx)))
    }

    /// Branch targets that no instruction defines.
    pub fn dangling_targets(&self) -> Vec<Label> {
        self.body
            .iter()
            .filter_map(Instruction::branch_target)
            .filter(|target| self.resolve_label(*target).is_none())
            .collect()
    }

    pub fn listing(&self) -> String {
        self.body
            .iter()
            .enumerate()
            .map(|(idx, i)| format!("{idx:04}  {i}\n"))
            .collect()
    }
}
