use arrayvec::ArrayVec;
use num_bigint::BigInt;

use crate::ast_context::AstContext;
use crate::builtins::BuiltinKind;
use crate::constant_folding::{self, FoldingContext};
use crate::error_handling::ErrorManager;
use crate::mir::{Function, Inst, InstId, Loc};
use crate::num_ops::{FloatValue, IntValue};
use crate::propagation::{fold_function, FoldDelegates, FoldOutcome, NoopCastOptimizer, NoopStringFolder};
use crate::source_info::{FileId, SourceInfo};
use crate::type_data::{FloatWidth, Type};
use crate::FoldConfiguration;

pub fn loc_at(line: usize) -> Loc {
   Loc {
      source: Some(SourceInfo::single(FileId(0), line, 0)),
      ast: None,
   }
}

pub fn int_lit(func: &mut Function, width: u32, val: i128) -> InstId {
   func.push(
      Inst::IntLiteral(IntValue::from_bigint(width, &BigInt::from(val))),
      Type::Int(width),
      loc_at(1),
   )
}

pub fn float_lit(func: &mut Function, width: FloatWidth, text: &str) -> InstId {
   func.push(
      Inst::FloatLiteral(FloatValue::from_text(width, text).unwrap()),
      Type::Float(width),
      loc_at(1),
   )
}

pub fn argument(func: &mut Function, ty: Type) -> InstId {
   func.push(Inst::Argument(0), ty, Loc::none())
}

pub fn builtin(func: &mut Function, kind: BuiltinKind, type_args: &[Type], args: &[InstId], result_type: Type) -> InstId {
   builtin_at(func, kind, type_args, args, result_type, loc_at(2))
}

pub fn builtin_at(
   func: &mut Function,
   kind: BuiltinKind,
   type_args: &[Type],
   args: &[InstId],
   result_type: Type,
   loc: Loc,
) -> InstId {
   func.push(
      Inst::Builtin {
         kind,
         type_args: type_args.iter().cloned().collect::<ArrayVec<Type, 2>>(),
         args: args.to_vec(),
      },
      result_type,
      loc,
   )
}

pub fn overflow_tuple_type(width: u32) -> Type {
   Type::Tuple(vec![Type::Int(width), Type::Int(1)])
}

// Runs the builtin/structural folder directly on one instruction with
// diagnostics enabled
pub fn fold_once(func: &mut Function, ast: &AstContext, inst: InstId) -> (Option<InstId>, Option<bool>, ErrorManager) {
   let mut err_manager = ErrorManager::new();
   let mut results_in_error = Some(false);
   let replacement = {
      let mut ctx = FoldingContext {
         func,
         ast,
         err_manager: &mut err_manager,
      };
      constant_folding::constant_fold_instruction(inst, &mut ctx, &mut results_in_error)
   };
   (replacement, results_in_error, err_manager)
}

pub fn run_fold(func: &mut Function) -> (FoldOutcome, ErrorManager) {
   let ast = AstContext::new();
   run_fold_configured(func, &ast, &FoldConfiguration::new())
}

pub fn run_fold_configured(func: &mut Function, ast: &AstContext, config: &FoldConfiguration) -> (FoldOutcome, ErrorManager) {
   let mut err_manager = ErrorManager::new();
   let mut cast_optimizer = NoopCastOptimizer;
   let mut string_folder = NoopStringFolder;
   let mut delegates = FoldDelegates {
      cast_optimizer: &mut cast_optimizer,
      string_folder: &mut string_folder,
      visit_callback: None,
   };
   let outcome = fold_function(func, ast, config, &mut err_manager, &mut delegates);
   (outcome, err_manager)
}
