use std::ops::Index;

use arrayvec::ArrayVec;
use indexmap::IndexMap;
use slotmap::{new_key_type, SlotMap};

use crate::ast_context::AstNodeId;
use crate::builtins::BuiltinKind;
use crate::num_ops::{FloatValue, IntValue};
use crate::source_info::SourceInfo;
use crate::type_data::Type;

new_key_type! { pub struct InstId; }

// A missing source component is the "invalid location" that downgrades some
// conversion errors to warnings
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Loc {
   pub source: Option<SourceInfo>,
   pub ast: Option<AstNodeId>,
}

impl Loc {
   #[must_use]
   pub fn none() -> Loc {
      Loc::default()
   }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Callee {
   pub name: String,
   pub semantics: Option<String>,
}

impl Callee {
   #[must_use]
   pub fn has_semantics(&self, attr: &str) -> bool {
      self.semantics.as_deref() == Some(attr)
   }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckedCastKind {
   Branch,
   AddrBranch,
   Unconditional,
   UnconditionalAddr,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Inst {
   IntLiteral(IntValue),
   FloatLiteral(FloatValue),
   Builtin {
      kind: BuiltinKind,
      type_args: ArrayVec<Type, 2>,
      args: Vec<InstId>,
   },
   Tuple(Vec<InstId>),
   Struct(IndexMap<String, InstId>),
   TupleExtract(InstId, usize),
   StructExtract(InstId, String),
   Index {
      base: InstId,
      offset: InstId,
   },
   CondFail(InstId),
   Call {
      callee: Callee,
      args: Vec<InstId>,
   },
   CheckedCast {
      kind: CheckedCastKind,
      operand: InstId,
      target: Type,
   },
   // An opaque value the folder can never see through
   Argument(u32),
}

impl Inst {
   #[must_use]
   pub fn as_int_literal(&self) -> Option<&IntValue> {
      match self {
         Inst::IntLiteral(v) => Some(v),
         _ => None,
      }
   }

   #[must_use]
   pub fn as_float_literal(&self) -> Option<FloatValue> {
      match self {
         Inst::FloatLiteral(v) => Some(*v),
         _ => None,
      }
   }

   #[must_use]
   pub fn is_builtin_of(&self, expected: BuiltinKind) -> bool {
      matches!(self, Inst::Builtin { kind, .. } if *kind == expected)
   }
}

pub struct InstNode {
   pub inst: Inst,
   pub result_type: Type,
   pub loc: Loc,
   users: Vec<InstId>,
}

fn operand_ids(inst: &Inst) -> Vec<InstId> {
   match inst {
      Inst::Builtin { args, .. } | Inst::Tuple(args) | Inst::Call { args, .. } => args.clone(),
      Inst::Struct(fields) => fields.values().copied().collect(),
      Inst::TupleExtract(agg, _) | Inst::StructExtract(agg, _) => vec![*agg],
      Inst::Index { base, offset } => vec![*base, *offset],
      Inst::CondFail(op) | Inst::CheckedCast { operand: op, .. } => vec![*op],
      Inst::IntLiteral(_) | Inst::FloatLiteral(_) | Inst::Argument(_) => Vec::new(),
   }
}

fn operand_slots(inst: &mut Inst) -> Vec<&mut InstId> {
   match inst {
      Inst::Builtin { args, .. } | Inst::Tuple(args) | Inst::Call { args, .. } => args.iter_mut().collect(),
      Inst::Struct(fields) => fields.values_mut().collect(),
      Inst::TupleExtract(agg, _) | Inst::StructExtract(agg, _) => vec![agg],
      Inst::Index { base, offset } => vec![base, offset],
      Inst::CondFail(op) | Inst::CheckedCast { operand: op, .. } => vec![op],
      Inst::IntLiteral(_) | Inst::FloatLiteral(_) | Inst::Argument(_) => Vec::new(),
   }
}

pub struct Function {
   pub name: String,
   pub is_specialization: bool,
   insts: SlotMap<InstId, InstNode>,
   body: Vec<InstId>,
}

impl Function {
   #[must_use]
   pub fn new(name: &str) -> Function {
      Function {
         name: name.to_string(),
         is_specialization: false,
         insts: SlotMap::with_key(),
         body: Vec::new(),
      }
   }

   fn add_node(&mut self, inst: Inst, result_type: Type, loc: Loc) -> InstId {
      debug_assert!(match (&inst, &result_type) {
         (Inst::IntLiteral(v), Type::Int(w)) => v.width() == *w,
         (Inst::IntLiteral(_), _) => false,
         _ => true,
      });
      let operands = operand_ids(&inst);
      let id = self.insts.insert(InstNode {
         inst,
         result_type,
         loc,
         users: Vec::new(),
      });
      for op in operands {
         self.insts[op].users.push(id);
      }
      id
   }

   pub fn push(&mut self, inst: Inst, result_type: Type, loc: Loc) -> InstId {
      let id = self.add_node(inst, result_type, loc);
      self.body.push(id);
      id
   }

   // Replacement literals take the position (and location) of the
   // instruction they stand in for
   pub fn insert_before(&mut self, before: InstId, inst: Inst, result_type: Type, loc: Loc) -> InstId {
      let id = self.add_node(inst, result_type, loc);
      let pos = self.body.iter().position(|x| *x == before).unwrap_or(self.body.len());
      self.body.insert(pos, id);
      id
   }

   #[must_use]
   pub fn contains(&self, id: InstId) -> bool {
      self.insts.contains_key(id)
   }

   #[must_use]
   pub fn body(&self) -> &[InstId] {
      &self.body
   }

   #[must_use]
   pub fn users(&self, id: InstId) -> &[InstId] {
      &self.insts[id].users
   }

   #[must_use]
   pub fn operands(&self, id: InstId) -> Vec<InstId> {
      operand_ids(&self.insts[id].inst)
   }

   #[must_use]
   pub fn is_terminator(&self, id: InstId) -> bool {
      matches!(
         self.insts[id].inst,
         Inst::CheckedCast {
            kind: CheckedCastKind::Branch | CheckedCastKind::AddrBranch,
            ..
         }
      )
   }

   // Rewrites every use. The users list is a multiset with one entry per
   // using operand, so each entry accounts for exactly one slot.
   pub fn replace_all_uses(&mut self, of: InstId, with: InstId) {
      debug_assert!(of != with || self.insts[of].users.is_empty());
      if of == with {
         return;
      }
      let users = std::mem::take(&mut self.insts[of].users);
      for user in users {
         for slot in operand_slots(&mut self.insts[user].inst) {
            if *slot == of {
               *slot = with;
               break;
            }
         }
         self.insts[with].users.push(user);
      }
   }

   pub fn erase(&mut self, id: InstId) {
      let node = self.insts.remove(id).unwrap();
      debug_assert!(node.users.is_empty());
      for op in operand_ids(&node.inst) {
         if let Some(op_node) = self.insts.get_mut(op) {
            if let Some(pos) = op_node.users.iter().position(|u| *u == id) {
               op_node.users.swap_remove(pos);
            }
         }
      }
      if let Some(pos) = self.body.iter().position(|x| *x == id) {
         self.body.remove(pos);
      }
   }
}

impl Index<InstId> for Function {
   type Output = InstNode;

   fn index(&self, id: InstId) -> &InstNode {
      &self.insts[id]
   }
}
