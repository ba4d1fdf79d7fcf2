use crate::builtins::BuiltinKind;
use crate::mir::{Function, Inst, InstId};
use crate::num_ops::IntValue;

// A small declarative matcher: patterns describe an opcode tree and bind the
// operand positions a simplification wants to look at afterwards. Bindings
// are only meaningful when the whole match succeeds.
pub enum Pat {
   Any,
   Bind(usize),
   Zero,
   One,
   IntLiteral(usize),
   Builtin(BuiltinKind, Vec<Pat>),
   TupleExtract(Box<Pat>, usize),
}

pub fn match_value(func: &Function, value: InstId, pat: &Pat, binds: &mut [Option<InstId>]) -> bool {
   match pat {
      Pat::Any => true,
      Pat::Bind(slot) => {
         binds[*slot] = Some(value);
         true
      }
      Pat::Zero => func[value].inst.as_int_literal().map_or(false, IntValue::is_zero),
      Pat::One => func[value].inst.as_int_literal().map_or(false, IntValue::is_one),
      Pat::IntLiteral(slot) => {
         if func[value].inst.as_int_literal().is_some() {
            binds[*slot] = Some(value);
            true
         } else {
            false
         }
      }
      Pat::Builtin(kind, operands) => match &func[value].inst {
         Inst::Builtin { kind: k, args, .. } if k == kind && args.len() == operands.len() => args
            .iter()
            .zip(operands.iter())
            .all(|(arg, p)| match_value(func, *arg, p, binds)),
         _ => false,
      },
      Pat::TupleExtract(aggregate, index) => match &func[value].inst {
         Inst::TupleExtract(agg, i) if i == index => match_value(func, *agg, aggregate, binds),
         _ => false,
      },
   }
}

pub fn match_builtin(
   func: &Function,
   inst: InstId,
   kind: BuiltinKind,
   operands: &[Pat],
   binds: &mut [Option<InstId>],
) -> bool {
   match &func[inst].inst {
      Inst::Builtin { kind: k, args, .. } if *k == kind && args.len() == operands.len() => args
         .iter()
         .zip(operands.iter())
         .all(|(arg, p)| match_value(func, *arg, p, binds)),
      _ => false,
   }
}

// MARK: Comparison identities

// Simplifies a comparison with at least one non-literal operand. Returns the
// fresh 1-bit literal; no operand is consumed.
pub fn simplify_comparison(bi: InstId, func: &mut Function) -> Option<InstId> {
   let result = simplified_comparison_value(func, bi)?;
   let ty = func[bi].result_type.clone();
   let loc = func[bi].loc;
   Some(func.insert_before(bi, Inst::IntLiteral(IntValue::from_bool(result)), ty, loc))
}

fn literal_is_int_max(func: &Function, value: Option<InstId>) -> bool {
   value
      .and_then(|id| func[id].inst.as_int_literal())
      .map_or(false, IntValue::is_max_signed_value)
}

// A logical shift right by at least one bit can never exceed the signed max
fn shifted_right_by_positive(func: &Function, value: Option<InstId>) -> bool {
   let Some(id) = value else {
      return false;
   };
   let binds: &mut [Option<InstId>] = &mut [None];
   match_value(
      func,
      id,
      &Pat::Builtin(BuiltinKind::LShr, vec![Pat::Any, Pat::IntLiteral(0)]),
      binds,
   ) && func[binds[0].unwrap()]
      .inst
      .as_int_literal()
      .unwrap()
      .is_strictly_positive()
}

fn is_checked_unsigned_with_report(func: &Function, value: Option<InstId>) -> bool {
   let Some(id) = value else {
      return false;
   };
   match &func[id].inst {
      Inst::Builtin {
         kind: BuiltinKind::UAddOver | BuiltinKind::USubOver | BuiltinKind::UMulOver,
         args,
         ..
      } => args.len() == 3 && match_value(func, args[2], &Pat::One, &mut []),
      _ => false,
   }
}

fn simplified_comparison_value(func: &Function, bi: InstId) -> Option<bool> {
   use BuiltinKind::{
      IcmpSge, IcmpSgt, IcmpSle, IcmpSlt, IcmpUge, IcmpUgt, IcmpUle, IcmpUlt,
   };
   use Pat::{Any, Bind, Builtin, IntLiteral, TupleExtract, Zero};

   let non_negative = || Builtin(BuiltinKind::AssumeNonNegative, vec![Any]);
   let no_binds: &mut [Option<InstId>] = &mut [];

   // Comparisons of an unsigned value (or a value assumed non-negative)
   // against zero
   if match_builtin(func, bi, IcmpUlt, &[Any, Zero], no_binds)
      || match_builtin(func, bi, IcmpUgt, &[Zero, Any], no_binds)
      || match_builtin(func, bi, IcmpSlt, &[non_negative(), Zero], no_binds)
      || match_builtin(func, bi, IcmpSgt, &[Zero, non_negative()], no_binds)
   {
      return Some(false);
   }
   if match_builtin(func, bi, IcmpUge, &[Any, Zero], no_binds)
      || match_builtin(func, bi, IcmpUle, &[Zero, Any], no_binds)
      || match_builtin(func, bi, IcmpSge, &[non_negative(), Zero], no_binds)
      || match_builtin(func, bi, IcmpSle, &[Zero, non_negative()], no_binds)
   {
      return Some(true);
   }

   // Signed comparisons against the type maximum
   {
      let binds: &mut [Option<InstId>] = &mut [None];
      if (match_builtin(func, bi, IcmpSlt, &[IntLiteral(0), Any], binds)
         || match_builtin(func, bi, IcmpSgt, &[Any, IntLiteral(0)], binds))
         && literal_is_int_max(func, binds[0])
      {
         return Some(false);
      }
      if (match_builtin(func, bi, IcmpSge, &[IntLiteral(0), Any], binds)
         || match_builtin(func, bi, IcmpSle, &[Any, IntLiteral(0)], binds))
         && literal_is_int_max(func, binds[0])
      {
         return Some(true);
      }
   }

   // Unsigned (and signed) comparisons against the type maximum where the
   // other side is a logical shift right by a strictly positive count
   {
      let binds: &mut [Option<InstId>] = &mut [None, None];
      if (match_builtin(func, bi, IcmpUge, &[IntLiteral(0), Bind(1)], binds)
         || match_builtin(func, bi, IcmpUle, &[Bind(1), IntLiteral(0)], binds)
         || match_builtin(func, bi, IcmpSge, &[IntLiteral(0), Bind(1)], binds)
         || match_builtin(func, bi, IcmpSle, &[Bind(1), IntLiteral(0)], binds))
         && literal_is_int_max(func, binds[0])
         && shifted_right_by_positive(func, binds[1])
      {
         return Some(true);
      }
      if (match_builtin(func, bi, IcmpUlt, &[IntLiteral(0), Bind(1)], binds)
         || match_builtin(func, bi, IcmpUgt, &[Bind(1), IntLiteral(0)], binds)
         || match_builtin(func, bi, IcmpSlt, &[IntLiteral(0), Bind(1)], binds)
         || match_builtin(func, bi, IcmpSgt, &[Bind(1), IntLiteral(0)], binds))
         && literal_is_int_max(func, binds[0])
         && shifted_right_by_positive(func, binds[1])
      {
         return Some(false);
      }
   }

   // The value component of a checked unsigned operation is never negative
   // when the operation's overflow check is enabled
   {
      let binds: &mut [Option<InstId>] = &mut [None];
      if match_builtin(func, bi, IcmpSlt, &[TupleExtract(Box::new(Bind(0)), 0), Zero], binds)
         && is_checked_unsigned_with_report(func, binds[0])
      {
         return Some(false);
      }
      if match_builtin(func, bi, IcmpSge, &[TupleExtract(Box::new(Bind(0)), 0), Zero], binds)
         && is_checked_unsigned_with_report(func, binds[0])
      {
         return Some(true);
      }
   }

   None
}
