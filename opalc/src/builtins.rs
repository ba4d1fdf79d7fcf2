#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BuiltinKind {
   Add,
   Sub,
   Mul,
   SDiv,
   SRem,
   UDiv,
   URem,
   ExactSDiv,
   ExactUDiv,
   And,
   Or,
   Xor,
   Shl,
   LShr,
   AShr,
   FAdd,
   FSub,
   FMul,
   FDiv,
   FRem,
   IcmpEq,
   IcmpNe,
   IcmpSlt,
   IcmpSgt,
   IcmpSle,
   IcmpSge,
   IcmpUlt,
   IcmpUgt,
   IcmpUle,
   IcmpUge,
   SAddOver,
   UAddOver,
   SSubOver,
   USubOver,
   SMulOver,
   UMulOver,
   Trunc,
   ZExt,
   SExt,
   TruncOrBitCast,
   ZExtOrBitCast,
   SExtOrBitCast,
   SToSCheckedTrunc,
   UToUCheckedTrunc,
   SToUCheckedTrunc,
   UToSCheckedTrunc,
   SUCheckedConversion,
   USCheckedConversion,
   FPTrunc,
   IntToFPWithOverflow,
   FPToSI,
   FPToUI,
   AssumeNonNegative,
   AssertConf,
   CondUnreachable,
   // LLVM-style intrinsics
   Ctlz,
   Expect,
   SAddWithOverflow,
   UAddWithOverflow,
   SSubWithOverflow,
   USubWithOverflow,
   SMulWithOverflow,
   UMulWithOverflow,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverflowOp {
   Add,
   Sub,
   Mul,
}

impl OverflowOp {
   #[must_use]
   pub fn symbol(self) -> &'static str {
      match self {
         OverflowOp::Add => "+",
         OverflowOp::Sub => "-",
         OverflowOp::Mul => "*",
      }
   }
}

impl BuiltinKind {
   // (operation, signed) for the checked builtins and the intrinsic spellings
   #[must_use]
   pub fn overflow_op(self) -> Option<(OverflowOp, bool)> {
      match self {
         BuiltinKind::SAddOver | BuiltinKind::SAddWithOverflow => Some((OverflowOp::Add, true)),
         BuiltinKind::UAddOver | BuiltinKind::UAddWithOverflow => Some((OverflowOp::Add, false)),
         BuiltinKind::SSubOver | BuiltinKind::SSubWithOverflow => Some((OverflowOp::Sub, true)),
         BuiltinKind::USubOver | BuiltinKind::USubWithOverflow => Some((OverflowOp::Sub, false)),
         BuiltinKind::SMulOver | BuiltinKind::SMulWithOverflow => Some((OverflowOp::Mul, true)),
         BuiltinKind::UMulOver | BuiltinKind::UMulWithOverflow => Some((OverflowOp::Mul, false)),
         _ => None,
      }
   }

   #[must_use]
   pub fn is_shift(self) -> bool {
      matches!(self, BuiltinKind::Shl | BuiltinKind::LShr | BuiltinKind::AShr)
   }

   #[must_use]
   pub fn is_comparison(self) -> bool {
      matches!(
         self,
         BuiltinKind::IcmpEq
            | BuiltinKind::IcmpNe
            | BuiltinKind::IcmpSlt
            | BuiltinKind::IcmpSgt
            | BuiltinKind::IcmpSle
            | BuiltinKind::IcmpSge
            | BuiltinKind::IcmpUlt
            | BuiltinKind::IcmpUgt
            | BuiltinKind::IcmpUle
            | BuiltinKind::IcmpUge
      )
   }

   #[must_use]
   pub fn is_checked_conversion(self) -> bool {
      matches!(
         self,
         BuiltinKind::SToSCheckedTrunc
            | BuiltinKind::UToUCheckedTrunc
            | BuiltinKind::SToUCheckedTrunc
            | BuiltinKind::UToSCheckedTrunc
            | BuiltinKind::SUCheckedConversion
            | BuiltinKind::USCheckedConversion
      )
   }

   // (source signed, destination signed)
   #[must_use]
   pub fn conversion_signedness(self) -> (bool, bool) {
      let src_signed = matches!(
         self,
         BuiltinKind::SToSCheckedTrunc | BuiltinKind::SToUCheckedTrunc | BuiltinKind::SUCheckedConversion
      );
      let dst_signed = matches!(
         self,
         BuiltinKind::SToSCheckedTrunc | BuiltinKind::UToSCheckedTrunc | BuiltinKind::USCheckedConversion
      );
      (src_signed, dst_signed)
   }
}
