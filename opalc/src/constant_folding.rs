use arrayvec::ArrayVec;

use crate::ast_context::{AstContext, AstNode};
use crate::builtins::BuiltinKind;
use crate::error_handling::error_handling_macros::{opalc_error, opalc_warn};
use crate::error_handling::{DiagnosticKind, ErrorManager};
use crate::mir::{Function, Inst, InstId, Loc};
use crate::num_ops::{self, FloatValue, IntValue, Status};
use crate::pattern_match;
use crate::type_data::{Type, LITERAL_SENTINEL_WIDTH};

// An implicit construction of this type may be an intermediate step of an
// explicit conversion chain, so its warnings are suppressed
const CANONICAL_DOUBLE: &str = "Double";

pub struct FoldingContext<'a> {
   pub func: &'a mut Function,
   pub ast: &'a AstContext,
   pub err_manager: &'a mut ErrorManager,
}

// Tri-state diagnostics toggle: None = diagnostics off, Some(false) =
// diagnostics on, Some(true) = this instruction has produced one
pub fn constant_fold_instruction(
   inst: InstId,
   ctx: &mut FoldingContext,
   results_in_error: &mut Option<bool>,
) -> Option<InstId> {
   match &ctx.func[inst].inst {
      Inst::Builtin { .. } => constant_fold_builtin(inst, ctx, results_in_error),
      Inst::TupleExtract(agg, index) => match &ctx.func[*agg].inst {
         Inst::Tuple(elems) => Some(elems[*index]),
         _ => None,
      },
      Inst::StructExtract(agg, field) => match &ctx.func[*agg].inst {
         Inst::Struct(fields) => fields.get(field).copied(),
         _ => None,
      },
      Inst::Index { base, offset } => match ctx.func[*offset].inst.as_int_literal() {
         Some(v) if v.is_zero() => Some(*base),
         _ => None,
      },
      _ => None,
   }
}

fn int_literal(func: &Function, value: InstId) -> Option<IntValue> {
   func[value].inst.as_int_literal().cloned()
}

fn float_literal(func: &Function, value: InstId) -> Option<FloatValue> {
   func[value].inst.as_float_literal()
}

fn make_int_literal(func: &mut Function, at: InstId, result_type: Type, val: IntValue) -> InstId {
   let loc = func[at].loc;
   func.insert_before(at, Inst::IntLiteral(val), result_type, loc)
}

fn make_float_literal(func: &mut Function, at: InstId, result_type: Type, val: FloatValue) -> InstId {
   let loc = func[at].loc;
   func.insert_before(at, Inst::FloatLiteral(val), result_type, loc)
}

// (value, i1 overflow) for the checked arithmetic and conversion builtins
fn construct_overflow_tuple(func: &mut Function, bi: InstId, result: IntValue, overflow: bool) -> InstId {
   let tuple_type = func[bi].result_type.clone();
   let elems = tuple_type.tuple_elements().unwrap().to_vec();
   debug_assert!(elems.len() == 2);
   let loc = func[bi].loc;
   let value_lit = func.insert_before(bi, Inst::IntLiteral(result), elems[0].clone(), loc);
   let flag_lit = func.insert_before(bi, Inst::IntLiteral(IntValue::from_bool(overflow)), elems[1].clone(), loc);
   func.insert_before(bi, Inst::Tuple(vec![value_lit, flag_lit]), tuple_type, loc)
}

// MARK: AST recovery

// Walks a chain of folded constructor calls down to the float literal the
// user wrote, to echo its original digits in a diagnostic
pub(crate) fn try_extract_literal_text(loc: Loc, ast: &AstContext) -> Option<String> {
   let mut node = loc.ast?;
   loop {
      match ast.get(node) {
         AstNode::Call(ce) if ce.is_constructor && ce.args.len() == 1 => node = ce.args[0],
         _ => break,
      }
   }
   match ast.get(node) {
      AstNode::FloatLiteral { digits, negative } => Some(if *negative {
         format!("-{}", digits)
      } else {
         digits.clone()
      }),
      _ => None,
   }
}

// As above, but only through implicit constructions, and asking whether the
// literal was spelled in hex-float notation
fn is_hex_literal_in_source(loc: Loc, ast: &AstContext) -> bool {
   let Some(mut node) = loc.ast else {
      return false;
   };
   loop {
      match ast.get(node) {
         AstNode::Call(ce) if ce.is_implicit && ce.is_constructor && ce.args.len() == 1 => node = ce.args[0],
         _ => break,
      }
   }
   match ast.get(node) {
      AstNode::FloatLiteral { digits, .. } => digits.starts_with("0x"),
      _ => false,
   }
}

fn maybe_explicit_fp_cons(loc: Loc, ast: &AstContext) -> bool {
   let Some(call) = ast.as_call(loc.ast) else {
      // not enough information here, so err on the safer side
      return true;
   };
   if !call.is_constructor || !call.is_implicit {
      return true;
   }
   call.result_type == CANONICAL_DOUBLE
}

// MARK: Builtin folding

fn constant_fold_builtin(bi: InstId, ctx: &mut FoldingContext, results_in_error: &mut Option<bool>) -> Option<InstId> {
   let Inst::Builtin { kind, type_args, args } = &ctx.func[bi].inst else {
      unreachable!()
   };
   let kind = *kind;
   let type_args = type_args.clone();
   let args = args.clone();

   match kind {
      // Unfoldable by choice: exact division is not easily computable and
      // FRem would have to match the runtime's fmod bit for bit
      BuiltinKind::ExactSDiv | BuiltinKind::ExactUDiv | BuiltinKind::FRem => None,

      // No uses in lowered code reach these unchecked forms
      BuiltinKind::Add | BuiltinKind::Sub | BuiltinKind::Mul => None,

      BuiltinKind::SDiv | BuiltinKind::SRem | BuiltinKind::UDiv | BuiltinKind::URem => {
         fold_and_check_division(bi, kind, &args, ctx, results_in_error)
      }

      BuiltinKind::And
      | BuiltinKind::Or
      | BuiltinKind::Xor
      | BuiltinKind::Shl
      | BuiltinKind::LShr
      | BuiltinKind::AShr => fold_bitwise(bi, kind, &args, ctx, results_in_error),

      BuiltinKind::FAdd | BuiltinKind::FSub | BuiltinKind::FMul | BuiltinKind::FDiv => {
         let lhs = float_literal(ctx.func, args[0])?;
         let rhs = float_literal(ctx.func, args[1])?;
         let result = num_ops::fold_float_binary(lhs, rhs, kind);
         let result_type = ctx.func[bi].result_type.clone();
         Some(make_float_literal(ctx.func, bi, result_type, result))
      }

      BuiltinKind::IcmpEq
      | BuiltinKind::IcmpNe
      | BuiltinKind::IcmpSlt
      | BuiltinKind::IcmpSgt
      | BuiltinKind::IcmpSle
      | BuiltinKind::IcmpSge
      | BuiltinKind::IcmpUlt
      | BuiltinKind::IcmpUgt
      | BuiltinKind::IcmpUle
      | BuiltinKind::IcmpUge => fold_comparison(bi, kind, &args, ctx),

      BuiltinKind::SAddOver
      | BuiltinKind::UAddOver
      | BuiltinKind::SSubOver
      | BuiltinKind::USubOver
      | BuiltinKind::SMulOver
      | BuiltinKind::UMulOver => {
         let report = args
            .get(2)
            .and_then(|flag| int_literal(ctx.func, *flag))
            .map_or(false, |flag| flag.is_one());
         fold_binary_with_overflow(bi, kind, &args, report, ctx, results_in_error)
      }

      // The intrinsic spellings never report
      BuiltinKind::SAddWithOverflow
      | BuiltinKind::UAddWithOverflow
      | BuiltinKind::SSubWithOverflow
      | BuiltinKind::USubWithOverflow
      | BuiltinKind::SMulWithOverflow
      | BuiltinKind::UMulWithOverflow => fold_binary_with_overflow(bi, kind, &args, false, ctx, results_in_error),

      BuiltinKind::Trunc
      | BuiltinKind::ZExt
      | BuiltinKind::SExt
      | BuiltinKind::TruncOrBitCast
      | BuiltinKind::ZExtOrBitCast
      | BuiltinKind::SExtOrBitCast => {
         let val = int_literal(ctx.func, args[0])?;
         let dest_width = type_args.get(1)?.int_width()?;
         let result = num_ops::fold_integer_cast(&val, dest_width, kind);
         let result_type = ctx.func[bi].result_type.clone();
         Some(make_int_literal(ctx.func, bi, result_type, result))
      }

      BuiltinKind::SToSCheckedTrunc
      | BuiltinKind::UToUCheckedTrunc
      | BuiltinKind::SToUCheckedTrunc
      | BuiltinKind::UToSCheckedTrunc
      | BuiltinKind::SUCheckedConversion
      | BuiltinKind::USCheckedConversion => {
         fold_and_check_integer_conversions(bi, kind, &type_args, &args, ctx, results_in_error)
      }

      BuiltinKind::IntToFPWithOverflow => fold_int_to_fp(bi, &type_args, &args, ctx, results_in_error),

      BuiltinKind::FPTrunc => fold_fp_trunc(bi, &type_args, &args, ctx, results_in_error),

      BuiltinKind::FPToSI | BuiltinKind::FPToUI => fold_fp_to_int(bi, kind, &type_args, &args, ctx, results_in_error),

      BuiltinKind::AssumeNonNegative => {
         let val = int_literal(ctx.func, args[0])?;
         if val.is_negative() && results_in_error.is_some() {
            let loc = ctx.func[bi].loc;
            opalc_error!(
               ctx.err_manager,
               loc.source,
               DiagnosticKind::WrongNonNegativeAssumption,
               val.to_decimal_string(true)
            );
            *results_in_error = Some(true);
         }
         // The builtin is the identity on its value
         Some(args[0])
      }

      // Left for the driver
      BuiltinKind::AssertConf | BuiltinKind::CondUnreachable => None,

      BuiltinKind::Ctlz => fold_ctlz(bi, &args, ctx),

      BuiltinKind::Expect => {
         int_literal(ctx.func, args[0])?;
         Some(args[0])
      }
   }
}

fn fold_binary_with_overflow(
   bi: InstId,
   kind: BuiltinKind,
   args: &[InstId],
   report_overflow: bool,
   ctx: &mut FoldingContext,
   results_in_error: &mut Option<bool>,
) -> Option<InstId> {
   let lhs = int_literal(ctx.func, args[0])?;
   let rhs = int_literal(ctx.func, args[1])?;

   let (result, overflow) = num_ops::fold_binary_with_overflow(&lhs, &rhs, kind);

   if results_in_error.is_some() && overflow && report_overflow {
      // Issues in compiler-generated specializations do not map back to
      // anything the user wrote
      if ctx.func.is_specialization {
         return None;
      }

      let (op, signed) = kind.overflow_op().unwrap();
      let loc = ctx.func[bi].loc;

      // If the lowered call took two arguments of one type, that type is the
      // one the user operated on; this catches `+` and `+=`
      let op_type = ctx.ast.as_call(loc.ast).and_then(|ce| {
         if ce.arg_types.len() == 2 && ce.arg_types[0] == ce.arg_types[1] {
            Some(ce.arg_types[1].clone())
         } else {
            None
         }
      });

      let lhs_str = lhs.to_decimal_string(signed);
      let rhs_str = rhs.to_decimal_string(signed);
      if let Some(op_type) = op_type {
         opalc_error!(
            ctx.err_manager,
            loc.source,
            DiagnosticKind::ArithmeticOperationOverflow,
            lhs_str,
            op.symbol(),
            rhs_str,
            op_type
         );
      } else {
         opalc_error!(
            ctx.err_manager,
            loc.source,
            DiagnosticKind::ArithmeticOperationOverflowGenericType,
            lhs_str,
            op.symbol(),
            rhs_str,
            signed,
            lhs.width()
         );
      }
      *results_in_error = Some(true);
      return None;
   }

   Some(construct_overflow_tuple(ctx.func, bi, result, overflow))
}

fn fold_and_check_division(
   bi: InstId,
   kind: BuiltinKind,
   args: &[InstId],
   ctx: &mut FoldingContext,
   results_in_error: &mut Option<bool>,
) -> Option<InstId> {
   let denominator = int_literal(ctx.func, args[1])?;

   if denominator.is_zero() {
      if results_in_error.is_some() {
         let loc = ctx.func[bi].loc;
         opalc_error!(ctx.err_manager, loc.source, DiagnosticKind::DivisionByZero);
         *results_in_error = Some(true);
      }
      return None;
   }

   let numerator = int_literal(ctx.func, args[0])?;
   let (result, overflowed) = num_ops::fold_division(&numerator, &denominator, kind);

   if overflowed {
      if results_in_error.is_some() {
         let is_rem = matches!(kind, BuiltinKind::SRem | BuiltinKind::URem);
         let loc = ctx.func[bi].loc;
         opalc_error!(
            ctx.err_manager,
            loc.source,
            DiagnosticKind::DivisionOverflow,
            numerator.to_decimal_string(true),
            if is_rem { "%" } else { "/" },
            denominator.to_decimal_string(true)
         );
         *results_in_error = Some(true);
      }
      return None;
   }

   let result_type = ctx.func[bi].result_type.clone();
   Some(make_int_literal(ctx.func, bi, result_type, result))
}

fn fold_bitwise(
   bi: InstId,
   kind: BuiltinKind,
   args: &[InstId],
   ctx: &mut FoldingContext,
   results_in_error: &mut Option<bool>,
) -> Option<InstId> {
   let lhs = int_literal(ctx.func, args[0])?;
   let rhs = int_literal(ctx.func, args[1])?;

   // Shifting away every significant bit would make the result meaningless
   if kind.is_shift() && rhs.to_u128().map_or(true, |count| count >= u128::from(lhs.width())) {
      if results_in_error.is_some() {
         let count_loc = ctx.func[args[1]].loc;
         opalc_error!(
            ctx.err_manager,
            count_loc.source,
            DiagnosticKind::ShiftingAllSignificantBits
         );
         *results_in_error = Some(true);
      }
      return None;
   }

   let result = num_ops::fold_bit_operation(&lhs, &rhs, kind);
   let result_type = ctx.func[bi].result_type.clone();
   Some(make_int_literal(ctx.func, bi, result_type, result))
}

fn fold_comparison(bi: InstId, kind: BuiltinKind, args: &[InstId], ctx: &mut FoldingContext) -> Option<InstId> {
   if let (Some(lhs), Some(rhs)) = (int_literal(ctx.func, args[0]), int_literal(ctx.func, args[1])) {
      let result = num_ops::fold_comparison(&lhs, &rhs, kind);
      let result_type = ctx.func[bi].result_type.clone();
      return Some(make_int_literal(ctx.func, bi, result_type, result));
   }

   pattern_match::simplify_comparison(bi, ctx.func)
}

fn fold_and_check_integer_conversions(
   bi: InstId,
   kind: BuiltinKind,
   type_args: &ArrayVec<Type, 2>,
   args: &[InstId],
   ctx: &mut FoldingContext,
   results_in_error: &mut Option<bool>,
) -> Option<InstId> {
   let val = int_literal(ctx.func, args[0])?;
   let src_width = val.width();
   let (src_signed, dst_signed) = kind.conversion_signedness();

   let same_width = matches!(
      kind,
      BuiltinKind::SUCheckedConversion | BuiltinKind::USCheckedConversion
   );
   let (dest_type, dest_width) = if same_width {
      (type_args[0].clone(), src_width)
   } else {
      let dest = type_args.get(1)?.clone();
      let width = dest.int_width()?;
      (dest, width)
   };

   let (result, overflow) = num_ops::fold_checked_conversion(&val, kind, dest_width);

   if overflow {
      if results_in_error.is_none() {
         return None;
      }

      let loc = ctx.func[bi].loc;
      let src_type = type_args[0].clone();

      // Primitive heuristics to recover the user-written types
      let (user_src, user_dst) = match ctx.ast.as_call(loc.ast) {
         Some(ce) if ce.arg_types.len() == 1 => (Some(ce.arg_types[0].clone()), Some(ce.result_type.clone())),
         _ => (None, None),
      };

      let literal = src_width == LITERAL_SENTINEL_WIDTH;

      // Without a valid location there is no hard error to point at, so
      // downgrade to the warning forms
      if loc.source.is_none() {
         if literal {
            opalc_warn!(
               ctx.err_manager,
               loc.source,
               DiagnosticKind::IntegerLiteralOverflowWarn,
               user_dst.unwrap_or_else(|| dest_type.to_string())
            );
         } else {
            opalc_warn!(
               ctx.err_manager,
               loc.source,
               DiagnosticKind::IntegerConversionOverflowWarn,
               user_src.unwrap_or_else(|| src_type.to_string()),
               user_dst.unwrap_or_else(|| dest_type.to_string())
            );
         }
         *results_in_error = Some(true);
         return None;
      }

      if literal {
         let src_str = val.to_decimal_string(src_signed);
         if let Some(user_dst) = user_dst {
            let diag = if src_signed && !dst_signed && val.is_negative() {
               DiagnosticKind::NegativeIntegerLiteralOverflowUnsigned
            } else {
               DiagnosticKind::IntegerLiteralOverflow
            };
            opalc_error!(ctx.err_manager, loc.source, diag, user_dst, src_str);
         } else {
            opalc_error!(
               ctx.err_manager,
               loc.source,
               DiagnosticKind::IntegerLiteralOverflowBuiltinTypes,
               dst_signed,
               dest_type,
               src_str
            );
         }
      } else if kind == BuiltinKind::SUCheckedConversion {
         opalc_error!(
            ctx.err_manager,
            loc.source,
            DiagnosticKind::IntegerConversionSignError,
            user_dst.unwrap_or_else(|| dest_type.to_string())
         );
      } else if let (Some(user_src), Some(user_dst)) = (user_src, user_dst) {
         opalc_error!(
            ctx.err_manager,
            loc.source,
            DiagnosticKind::IntegerConversionOverflow,
            user_src,
            user_dst
         );
      } else {
         // Builtin integers are sign-agnostic, so spell the signedness out
         opalc_error!(
            ctx.err_manager,
            loc.source,
            DiagnosticKind::IntegerConversionOverflowBuiltinTypes,
            src_signed,
            src_type,
            dst_signed,
            dest_type
         );
      }

      *results_in_error = Some(true);
      return None;
   }

   Some(construct_overflow_tuple(ctx.func, bi, result, false))
}

fn fold_int_to_fp(
   bi: InstId,
   type_args: &ArrayVec<Type, 2>,
   args: &[InstId],
   ctx: &mut FoldingContext,
   results_in_error: &mut Option<bool>,
) -> Option<InstId> {
   let val = int_literal(ctx.func, args[0])?;
   let dest = type_args.get(1)?.float_width()?;

   let (converted, status) = num_ops::fold_int_to_float(&val, dest);
   let overflow = status.intersects(Status::OVERFLOW);
   let inexact = status.intersects(Status::INEXACT);

   if overflow || inexact {
      let loc = ctx.func[bi].loc;
      // Warnings are suppressed for conversions through explicit
      // initializers, errors are not
      if results_in_error.is_some() && (overflow || !maybe_explicit_fp_cons(loc, ctx.ast)) {
         let user_type = ctx
            .ast
            .as_call(loc.ast)
            .map_or_else(|| type_args[1].to_string(), |ce| ce.result_type.clone());
         let src_str = val.to_decimal_string(true);
         if overflow {
            opalc_error!(
               ctx.err_manager,
               loc.source,
               DiagnosticKind::IntegerLiteralOverflow,
               user_type,
               src_str
            );
         } else {
            opalc_warn!(
               ctx.err_manager,
               loc.source,
               DiagnosticKind::WarningIntToFpInexact,
               user_type,
               src_str,
               converted.to_integer_string()
            );
         }
         *results_in_error = Some(true);
      }
      if overflow {
         return None;
      }
   }

   let result_type = ctx.func[bi].result_type.clone();
   Some(make_float_literal(ctx.func, bi, result_type, converted))
}

fn fold_fp_trunc(
   bi: InstId,
   type_args: &ArrayVec<Type, 2>,
   args: &[InstId],
   ctx: &mut FoldingContext,
   results_in_error: &mut Option<bool>,
) -> Option<InstId> {
   let val = float_literal(ctx.func, args[0])?;
   let dest = type_args.get(1)?.float_width()?;

   let (trunc_val, status) = num_ops::fold_float_convert(val, dest);
   let loc = ctx.func[bi].loc;

   if results_in_error.is_some() && !maybe_explicit_fp_cons(loc, ctx.ast) {
      let overflow = status.intersects(Status::OVERFLOW);
      let tiny_inexact = num_ops::is_lossy_underflow(val, dest);
      let hex_inexact = status != Status::OK && is_hex_literal_in_source(ctx.func[args[0]].loc, ctx.ast);

      if overflow || tiny_inexact || hex_inexact {
         let literal_text = try_extract_literal_text(ctx.func[args[0]].loc, ctx.ast).unwrap_or_default();
         let user_type = ctx
            .ast
            .as_call(loc.ast)
            .map_or_else(|| type_args[1].to_string(), |ce| ce.result_type.clone());
         let diag = if overflow {
            DiagnosticKind::WarningFloatTruncOverflow
         } else if hex_inexact {
            DiagnosticKind::WarningFloatTruncHexInexact
         } else {
            DiagnosticKind::WarningFloatTruncUnderflow
         };
         opalc_warn!(
            ctx.err_manager,
            loc.source,
            diag,
            literal_text,
            user_type,
            trunc_val.is_negative()
         );
         *results_in_error = Some(true);
      }
   }

   // Subnormality, invalid operation and underflow abort the fold; plain
   // imprecision and even overflow to infinity do not
   if status.intersects(Status::INVALID_OP | Status::DIV_BY_ZERO | Status::UNDERFLOW) || trunc_val.is_denormal() {
      return None;
   }

   let result_type = ctx.func[bi].result_type.clone();
   Some(make_float_literal(ctx.func, bi, result_type, trunc_val))
}

fn fold_fp_to_int(
   bi: InstId,
   kind: BuiltinKind,
   type_args: &ArrayVec<Type, 2>,
   args: &[InstId],
   ctx: &mut FoldingContext,
   results_in_error: &mut Option<bool>,
) -> Option<InstId> {
   let to_unsigned = kind == BuiltinKind::FPToUI;
   let val = float_literal(ctx.func, args[0])?;
   let dest_type = type_args.get(1)?.clone();
   let dest_width = dest_type.int_width()?;

   // A strictly negative source can never convert to an unsigned integer
   if to_unsigned && val.is_negative() && !val.is_zero() {
      if results_in_error.is_some() {
         let loc = ctx.func[bi].loc;
         let call = ctx.ast.as_call(loc.ast);
         let literal_text =
            try_extract_literal_text(ctx.func[args[0]].loc, ctx.ast).unwrap_or_else(|| val.to_string());
         let user_type = call.map_or_else(|| dest_type.to_string(), |ce| ce.result_type.clone());
         let unsigned_flag = if call.is_some() { false } else { to_unsigned };
         opalc_error!(
            ctx.err_manager,
            loc.source,
            DiagnosticKind::NegativeFpLiteralOverflowUnsigned,
            literal_text,
            user_type,
            unsigned_flag
         );
         *results_in_error = Some(true);
      }
      return None;
   }

   let (result, status) = num_ops::fold_float_to_int(val, dest_width, to_unsigned)?;

   if status.intersects(Status::INVALID_OP) {
      if results_in_error.is_some() {
         let loc = ctx.func[bi].loc;
         let call = ctx.ast.as_call(loc.ast);
         let literal_text =
            try_extract_literal_text(ctx.func[args[0]].loc, ctx.ast).unwrap_or_else(|| val.to_string());
         let user_type = call.map_or_else(|| dest_type.to_string(), |ce| ce.result_type.clone());
         let implicit = call.map_or(false, |ce| ce.is_implicit);
         opalc_error!(
            ctx.err_manager,
            loc.source,
            DiagnosticKind::FloatToIntOverflow,
            literal_text,
            user_type,
            implicit
         );
         *results_in_error = Some(true);
      }
      return None;
   }

   if status != Status::OK && status != Status::INEXACT {
      return None;
   }

   let result_type = ctx.func[bi].result_type.clone();
   Some(make_int_literal(ctx.func, bi, result_type, result))
}

fn fold_ctlz(bi: InstId, args: &[InstId], ctx: &mut FoldingContext) -> Option<InstId> {
   let val = int_literal(ctx.func, args[0])?;

   let count = if val.is_zero() {
      // Zero input is undefined unless the second argument says otherwise
      let is_zero_undef = int_literal(ctx.func, args[1])?;
      if !is_zero_undef.is_zero() {
         return None;
      }
      val.width()
   } else {
      val.leading_zeros()
   };

   let result = IntValue::from_u64(val.width(), u64::from(count));
   let result_type = ctx.func[args[0]].result_type.clone();
   Some(make_int_literal(ctx.func, bi, result_type, result))
}
