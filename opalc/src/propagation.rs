use std::collections::HashSet;

use indexmap::IndexSet;

use crate::ast_context::AstContext;
use crate::builtins::BuiltinKind;
use crate::constant_folding::{self, FoldingContext};
use crate::error_handling::error_handling_macros::opalc_warn;
use crate::error_handling::{DiagnosticKind, ErrorManager};
use crate::mir::{Function, Inst, InstId};
use crate::num_ops::IntValue;
use crate::{AssertConfiguration, FoldConfiguration};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Invalidation {
   pub instructions: bool,
   pub branches: bool,
   pub calls: bool,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct FoldOutcome {
   pub invalidation: Invalidation,
   pub folded_count: usize,
}

// The channels the external cast optimizer is allowed to mutate the
// function through
pub struct CastActions<'a> {
   pub func: &'a mut Function,
   worklist: &'a mut IndexSet<InstId>,
   invalidation: &'a mut Invalidation,
}

impl CastActions<'_> {
   pub fn replace_uses(&mut self, of: InstId, with: InstId) {
      self.invalidation.instructions = true;
      self.func.replace_all_uses(of, with);
   }

   pub fn erase(&mut self, inst: InstId) {
      if self.func.is_terminator(inst) {
         self.invalidation.branches = true;
      }
      self.invalidation.instructions = true;
      self.worklist.swap_remove(&inst);
      self.func.erase(inst);
   }
}

pub trait CastOptimizer {
   // Returns a replacement checked cast to be reconsidered, if any
   fn optimize_cast(&mut self, cast: InstId, actions: &mut CastActions<'_>) -> Option<InstId>;
}

pub trait StringFolder {
   fn fold_concat(&mut self, call: InstId, func: &mut Function) -> Option<InstId>;
}

pub struct NoopCastOptimizer;

impl CastOptimizer for NoopCastOptimizer {
   fn optimize_cast(&mut self, _cast: InstId, _actions: &mut CastActions<'_>) -> Option<InstId> {
      None
   }
}

pub struct NoopStringFolder;

impl StringFolder for NoopStringFolder {
   fn fold_concat(&mut self, _call: InstId, _func: &mut Function) -> Option<InstId> {
      None
   }
}

pub struct FoldDelegates<'a> {
   pub cast_optimizer: &'a mut dyn CastOptimizer,
   pub string_folder: &'a mut dyn StringFolder,
   pub visit_callback: Option<&'a mut dyn FnMut(InstId)>,
}

pub fn fold_function(
   func: &mut Function,
   ast: &AstContext,
   config: &FoldConfiguration,
   err_manager: &mut ErrorManager,
   delegates: &mut FoldDelegates<'_>,
) -> FoldOutcome {
   let mut worklist = initialize_worklist(func, ast, config, err_manager);
   process_worklist(func, ast, config, err_manager, delegates, &mut worklist)
}

fn initialize_worklist(
   func: &Function,
   ast: &AstContext,
   config: &FoldConfiguration,
   err_manager: &mut ErrorManager,
) -> IndexSet<InstId> {
   let mut worklist: IndexSet<InstId> = IndexSet::new();
   for inst in func.body().iter().copied() {
      let node = &func[inst];

      // A float literal that is already infinite overflowed even the widest
      // format in the source text. Say so, but let it fold normally.
      if let Inst::FloatLiteral(v) = &node.inst {
         if config.enable_diagnostics && v.is_infinite() {
            let literal_text = constant_folding::try_extract_literal_text(node.loc, ast).unwrap_or_default();
            opalc_warn!(
               err_manager,
               node.loc.source,
               DiagnosticKind::WarningFloatOverflowsMaxbuiltin,
               literal_text,
               v.is_negative()
            );
         }
      }

      match &node.inst {
         Inst::IntLiteral(_) | Inst::FloatLiteral(_) => {
            if !func.users(inst).is_empty() {
               worklist.insert(inst);
            }
         }
         Inst::Builtin {
            kind: BuiltinKind::AssertConf | BuiltinKind::CondUnreachable,
            ..
         } => {
            if config.assert_configuration != AssertConfiguration::DisableReplacement {
               worklist.insert(inst);
            }
         }
         Inst::CheckedCast { .. } => {
            worklist.insert(inst);
         }
         Inst::Call { callee, .. } => {
            if callee.has_semantics("string.concat") {
               worklist.insert(inst);
            }
         }
         _ => (),
      }
   }
   worklist
}

fn process_worklist(
   func: &mut Function,
   ast: &AstContext,
   config: &FoldConfiguration,
   err_manager: &mut ErrorManager,
   delegates: &mut FoldDelegates<'_>,
   worklist: &mut IndexSet<InstId>,
) -> FoldOutcome {
   let mut invalidation = Invalidation::default();
   let mut folded_count = 0;

   // Instructions whose evaluation produced a diagnostic; a second visit
   // from a different user path must not repeat it
   let mut error_set: HashSet<InstId> = HashSet::new();

   let mut folded_users: IndexSet<InstId> = IndexSet::new();

   while let Some(inst) = worklist.pop() {
      debug_assert!(func.contains(inst));

      if let Some(callback) = delegates.visit_callback.as_mut() {
         callback(inst);
      }

      // Replace assert_configuration by its constant even when nothing else
      // around it can be propagated
      if let AssertConfiguration::Level(level) = config.assert_configuration {
         if func[inst].inst.is_builtin_of(BuiltinKind::AssertConf) {
            let result_type = func[inst].result_type.clone();
            let width = result_type.int_width().unwrap_or(32);
            let loc = func[inst].loc;
            let literal = func.insert_before(inst, Inst::IntLiteral(IntValue::from_u64(width, level)), result_type, loc);
            func.replace_all_uses(inst, literal);
            worklist.insert(literal);
            recursively_delete_if_dead(func, inst, worklist, true);
            invalidation.instructions = true;
            continue;
         }

         // Once assert configurations are resolved, conditional
         // unreachables have no further meaning
         if func[inst].inst.is_builtin_of(BuiltinKind::CondUnreachable) {
            debug_assert!(func.users(inst).is_empty());
            recursively_delete_if_dead(func, inst, worklist, true);
            invalidation.instructions = true;
            continue;
         }
      }

      if matches!(func[inst].inst, Inst::Call { .. }) {
         // A call only reaches the worklist through string.concat semantics
         debug_assert!(
            matches!(&func[inst].inst, Inst::Call { callee, .. } if callee.has_semantics("string.concat"))
         );
         if fold_string_concatenation(inst, func, delegates.string_folder, worklist) {
            invalidation.instructions = true;
            invalidation.calls = true;
         }
         continue;
      }

      if matches!(func[inst].inst, Inst::CheckedCast { .. }) {
         let new_cast = {
            let mut actions = CastActions {
               func: &mut *func,
               worklist: &mut *worklist,
               invalidation: &mut invalidation,
            };
            delegates.cast_optimizer.optimize_cast(inst, &mut actions)
         };
         if let Some(new_cast) = new_cast {
            if func.contains(new_cast) && matches!(func[new_cast].inst, Inst::CheckedCast { .. }) {
               worklist.insert(new_cast);
            }
         }
         continue;
      }

      // The popped instruction produces a constant value; try to fold each
      // of its users
      folded_users.clear();
      for user in func.users(inst).to_vec() {
         // The users list carries one entry per using operand
         if folded_users.contains(&user) {
            continue;
         }

         if error_set.contains(&user) {
            continue;
         }

         // Aggregates of constants can let their own users fold
         if matches!(func[user].inst, Inst::Struct(_) | Inst::Tuple(_)) {
            worklist.insert(user);
            continue;
         }

         // A cond_fail fed a folded false condition is dead; it produces no
         // value, so the folding logic below cannot reach it
         if matches!(func[user].inst, Inst::CondFail(_)) {
            folded_users.insert(user);
         }

         let mut results_in_error = if config.enable_diagnostics { Some(false) } else { None };
         let replacement = {
            let mut fold_ctx = FoldingContext {
               func: &mut *func,
               ast,
               err_manager: &mut *err_manager,
            };
            constant_folding::constant_fold_instruction(user, &mut fold_ctx, &mut results_in_error)
         };
         if results_in_error == Some(true) {
            error_set.insert(user);
         }
         let Some(replacement) = replacement else {
            continue;
         };

         folded_users.insert(user);
         folded_count += 1;

         // When the replacement is a tuple, route tuple_extract users of the
         // folded instruction straight to the element values instead of
         // leaving them to re-extract
         if matches!(func[replacement].inst, Inst::Tuple(_)) {
            for extract in func.users(user).to_vec() {
               let Inst::TupleExtract(_, index) = &func[extract].inst else {
                  continue;
               };
               let index = *index;
               let Inst::Tuple(elems) = &func[replacement].inst else {
                  unreachable!()
               };
               let element = elems[index];
               func.replace_all_uses(extract, element);
               folded_users.insert(extract);
               worklist.insert(element);
            }
         }

         func.replace_all_uses(user, replacement);

         // The new constant may enable further folding
         worklist.insert(replacement);
      }

      if !folded_users.is_empty() {
         invalidation.instructions = true;
      }

      // Delete eagerly, but only after the user walk so no iterator is held
      // across the mutation
      while let Some(dead) = folded_users.pop() {
         recursively_delete_if_dead(func, dead, worklist, false);
      }
   }

   FoldOutcome {
      invalidation,
      folded_count,
   }
}

fn fold_string_concatenation(
   call: InstId,
   func: &mut Function,
   string_folder: &mut dyn StringFolder,
   worklist: &mut IndexSet<InstId>,
) -> bool {
   let Some(concatenated) = string_folder.fold_concat(call, func) else {
      return false;
   };

   func.replace_all_uses(call, concatenated);

   let operands = func.operands(call);
   worklist.swap_remove(&call);
   func.erase(call);

   // Operand calls can only be applies of the pure string-encoding functions
   for op in operands {
      if !func.contains(op) || !func.users(op).is_empty() {
         continue;
      }
      if let Inst::Call { callee, .. } = &func[op].inst {
         debug_assert!(callee.has_semantics("string.utf8") || callee.has_semantics("string.utf16"));
      }
      recursively_delete_if_dead(func, op, worklist, true);
   }

   // Of the new value's users, only the string.concat calls can fold further
   for user in func.users(concatenated).to_vec() {
      if let Inst::Call { callee, .. } = &func[user].inst {
         if callee.has_semantics("string.concat") {
            worklist.insert(user);
         }
      }
   }

   true
}

fn is_trivially_dead(func: &Function, inst: InstId) -> bool {
   match &func[inst].inst {
      Inst::CondFail(condition) => func[*condition].inst.as_int_literal().map_or(false, IntValue::is_zero),
      // Arguments are defined by the caller, not by this function
      Inst::Call { .. } | Inst::CheckedCast { .. } | Inst::Argument(_) => false,
      Inst::Builtin {
         kind: BuiltinKind::CondUnreachable,
         ..
      } => false,
      _ => true,
   }
}

// Deleting an instruction can strand its operands; sweep them too. Anything
// deleted here must also leave the worklist.
fn recursively_delete_if_dead(func: &mut Function, inst: InstId, worklist: &mut IndexSet<InstId>, force: bool) {
   if !func.contains(inst) {
      return;
   }
   if !func.users(inst).is_empty() {
      return;
   }
   if !force && !is_trivially_dead(func, inst) {
      return;
   }
   let operands = func.operands(inst);
   worklist.swap_remove(&inst);
   func.erase(inst);
   for op in operands {
      recursively_delete_if_dead(func, op, worklist, false);
   }
}
