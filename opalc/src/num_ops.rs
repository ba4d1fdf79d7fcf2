use num_bigint::{BigInt, BigUint};
use num_traits::{One, ToPrimitive, Zero};
use rustc_apfloat::ieee::{Double, Single, X87DoubleExtended};
use rustc_apfloat::{Float, FloatConvert, Round};

pub use rustc_apfloat::Status;

use crate::builtins::{BuiltinKind, OverflowOp};
use crate::type_data::FloatWidth;

// MARK: Integers

// A two's complement value at a fixed bit width. Signedness is a property of
// the operation, not the value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IntValue {
   bits: BigUint,
   width: u32,
}

fn width_mask(width: u32) -> BigUint {
   (BigUint::one() << width as usize) - BigUint::one()
}

impl IntValue {
   #[must_use]
   pub fn new(width: u32, bits: BigUint) -> IntValue {
      debug_assert!(width >= 1);
      IntValue {
         bits: bits & width_mask(width),
         width,
      }
   }

   #[must_use]
   pub fn from_u64(width: u32, val: u64) -> IntValue {
      IntValue::new(width, BigUint::from(val))
   }

   #[must_use]
   pub fn from_bigint(width: u32, val: &BigInt) -> IntValue {
      let modulus = BigInt::one() << width as usize;
      let mut rem = val % &modulus;
      if rem.sign() == num_bigint::Sign::Minus {
         rem += &modulus;
      }
      IntValue {
         bits: rem.to_biguint().unwrap(),
         width,
      }
   }

   #[must_use]
   pub fn from_bool(val: bool) -> IntValue {
      IntValue::from_u64(1, u64::from(val))
   }

   #[must_use]
   pub fn zero(width: u32) -> IntValue {
      IntValue {
         bits: BigUint::zero(),
         width,
      }
   }

   #[must_use]
   pub fn max_signed(width: u32) -> IntValue {
      IntValue {
         bits: width_mask(width) >> 1,
         width,
      }
   }

   #[must_use]
   pub fn min_signed(width: u32) -> IntValue {
      IntValue {
         bits: BigUint::one() << (width as usize - 1),
         width,
      }
   }

   #[must_use]
   pub fn width(&self) -> u32 {
      self.width
   }

   #[must_use]
   pub fn bits(&self) -> &BigUint {
      &self.bits
   }

   #[must_use]
   pub fn as_signed(&self) -> BigInt {
      if self.is_negative() {
         BigInt::from(self.bits.clone()) - (BigInt::one() << self.width as usize)
      } else {
         BigInt::from(self.bits.clone())
      }
   }

   #[must_use]
   pub fn is_zero(&self) -> bool {
      self.bits.is_zero()
   }

   #[must_use]
   pub fn is_one(&self) -> bool {
      self.bits.is_one()
   }

   // The sign bit under a signed interpretation
   #[must_use]
   pub fn is_negative(&self) -> bool {
      self.bits.bits() == u64::from(self.width)
   }

   #[must_use]
   pub fn is_max_signed_value(&self) -> bool {
      self.bits == IntValue::max_signed(self.width).bits
   }

   #[must_use]
   pub fn is_strictly_positive(&self) -> bool {
      !self.bits.is_zero() && !self.is_negative()
   }

   #[must_use]
   pub fn leading_zeros(&self) -> u32 {
      self.width - u32::try_from(self.bits.bits()).unwrap()
   }

   #[must_use]
   pub fn to_u128(&self) -> Option<u128> {
      self.bits.to_u128()
   }

   #[must_use]
   pub fn to_decimal_string(&self, signed: bool) -> String {
      if signed {
         self.as_signed().to_str_radix(10)
      } else {
         self.bits.to_str_radix(10)
      }
   }

   #[must_use]
   pub fn trunc(&self, dest_width: u32) -> IntValue {
      debug_assert!(dest_width <= self.width);
      if dest_width == 0 {
         // A zero-width truncation only arises as an intermediate in overflow checks
         return IntValue {
            bits: BigUint::zero(),
            width: 0,
         };
      }
      IntValue {
         bits: &self.bits & width_mask(dest_width),
         width: dest_width,
      }
   }

   #[must_use]
   pub fn zext(&self, dest_width: u32) -> IntValue {
      debug_assert!(dest_width >= self.width);
      IntValue {
         bits: self.bits.clone(),
         width: dest_width,
      }
   }

   #[must_use]
   pub fn sext(&self, dest_width: u32) -> IntValue {
      debug_assert!(dest_width >= self.width);
      let bits = if self.is_negative() {
         &self.bits | (width_mask(dest_width) ^ width_mask(self.width))
      } else {
         self.bits.clone()
      };
      IntValue {
         bits,
         width: dest_width,
      }
   }
}

#[must_use]
pub fn fold_bit_operation(lhs: &IntValue, rhs: &IntValue, kind: BuiltinKind) -> IntValue {
   debug_assert!(lhs.width == rhs.width);
   let width = lhs.width;
   let bits = match kind {
      BuiltinKind::And => &lhs.bits & &rhs.bits,
      BuiltinKind::Or => &lhs.bits | &rhs.bits,
      BuiltinKind::Xor => &lhs.bits ^ &rhs.bits,
      // Shift counts below the operand width are the caller's precondition
      BuiltinKind::Shl => {
         let count = rhs.bits.to_usize().unwrap();
         (&lhs.bits << count) & width_mask(width)
      }
      BuiltinKind::LShr => {
         let count = rhs.bits.to_usize().unwrap();
         &lhs.bits >> count
      }
      BuiltinKind::AShr => {
         let count = rhs.bits.to_usize().unwrap();
         let shifted = &lhs.bits >> count;
         if lhs.is_negative() {
            shifted | (width_mask(width) ^ (width_mask(width) >> count))
         } else {
            shifted
         }
      }
      _ => unreachable!(),
   };
   IntValue { bits, width }
}

// Returns the 1-bit comparison result
#[must_use]
pub fn fold_comparison(lhs: &IntValue, rhs: &IntValue, kind: BuiltinKind) -> IntValue {
   debug_assert!(kind.is_comparison());
   debug_assert!(lhs.width == rhs.width);
   let result = match kind {
      BuiltinKind::IcmpEq => lhs.bits == rhs.bits,
      BuiltinKind::IcmpNe => lhs.bits != rhs.bits,
      BuiltinKind::IcmpSlt => lhs.as_signed() < rhs.as_signed(),
      BuiltinKind::IcmpSgt => lhs.as_signed() > rhs.as_signed(),
      BuiltinKind::IcmpSle => lhs.as_signed() <= rhs.as_signed(),
      BuiltinKind::IcmpSge => lhs.as_signed() >= rhs.as_signed(),
      BuiltinKind::IcmpUlt => lhs.bits < rhs.bits,
      BuiltinKind::IcmpUgt => lhs.bits > rhs.bits,
      BuiltinKind::IcmpUle => lhs.bits <= rhs.bits,
      BuiltinKind::IcmpUge => lhs.bits >= rhs.bits,
      _ => unreachable!(),
   };
   IntValue::from_bool(result)
}

#[must_use]
pub fn fold_binary_with_overflow(lhs: &IntValue, rhs: &IntValue, kind: BuiltinKind) -> (IntValue, bool) {
   debug_assert!(lhs.width == rhs.width);
   let width = lhs.width;
   let (op, signed) = kind.overflow_op().unwrap();
   let (a, b) = if signed {
      (lhs.as_signed(), rhs.as_signed())
   } else {
      (BigInt::from(lhs.bits.clone()), BigInt::from(rhs.bits.clone()))
   };
   let math_result = match op {
      OverflowOp::Add => a + b,
      OverflowOp::Sub => a - b,
      OverflowOp::Mul => a * b,
   };
   let overflow = if signed {
      let min = -(BigInt::one() << (width as usize - 1));
      let max = (BigInt::one() << (width as usize - 1)) - BigInt::one();
      math_result < min || math_result > max
   } else {
      let max = BigInt::from(width_mask(width));
      math_result < BigInt::zero() || math_result > max
   };
   (IntValue::from_bigint(width, &math_result), overflow)
}

// Caller has already rejected a zero divisor
#[must_use]
pub fn fold_division(lhs: &IntValue, rhs: &IntValue, kind: BuiltinKind) -> (IntValue, bool) {
   debug_assert!(lhs.width == rhs.width);
   debug_assert!(!rhs.is_zero());
   let width = lhs.width;
   match kind {
      BuiltinKind::SDiv | BuiltinKind::SRem => {
         let a = lhs.as_signed();
         let b = rhs.as_signed();
         let quotient = &a / &b;
         let max = BigInt::from(IntValue::max_signed(width).bits.clone());
         // The only way to overflow is min_signed / -1
         let overflow = quotient > max;
         let result = if kind == BuiltinKind::SDiv { quotient } else { &a % &b };
         (IntValue::from_bigint(width, &result), overflow)
      }
      BuiltinKind::UDiv => (
         IntValue {
            bits: &lhs.bits / &rhs.bits,
            width,
         },
         false,
      ),
      BuiltinKind::URem => (
         IntValue {
            bits: &lhs.bits % &rhs.bits,
            width,
         },
         false,
      ),
      _ => unreachable!(),
   }
}

#[must_use]
pub fn fold_integer_cast(val: &IntValue, dest_width: u32, kind: BuiltinKind) -> IntValue {
   if val.width == dest_width {
      return val.clone();
   }
   match kind {
      BuiltinKind::Trunc | BuiltinKind::TruncOrBitCast => val.trunc(dest_width),
      BuiltinKind::ZExt | BuiltinKind::ZExtOrBitCast => val.zext(dest_width),
      BuiltinKind::SExt | BuiltinKind::SExtOrBitCast => val.sext(dest_width),
      _ => unreachable!(),
   }
}

#[must_use]
pub fn fold_checked_conversion(val: &IntValue, kind: BuiltinKind, dest_width: u32) -> (IntValue, bool) {
   debug_assert!(kind.is_checked_conversion());
   match kind {
      // Same-width signedness conversions overflow iff the sign bit is set
      BuiltinKind::SUCheckedConversion | BuiltinKind::USCheckedConversion => {
         debug_assert!(dest_width == val.width);
         (val.clone(), val.is_negative())
      }
      // The signed destination loses a bit to the sign, so check the
      // round-trip at one bit less than the destination width
      BuiltinKind::UToSCheckedTrunc => {
         let result = val.trunc(dest_width);
         let narrowed = val.trunc(dest_width - 1);
         let overflow = val.bits != narrowed.bits;
         (result, overflow)
      }
      _ => {
         let result = val.trunc(dest_width);
         let ext = if kind == BuiltinKind::SToSCheckedTrunc {
            result.sext(val.width)
         } else {
            result.zext(val.width)
         };
         let overflow = ext.bits != val.bits;
         (result, overflow)
      }
   }
}

// MARK: Floats

#[derive(Clone, Copy, PartialEq)]
pub enum FloatValue {
   Single(Single),
   Double(Double),
   X87(X87DoubleExtended),
}

impl std::fmt::Debug for FloatValue {
   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      match self {
         FloatValue::Single(v) => write!(f, "Single({})", v),
         FloatValue::Double(v) => write!(f, "Double({})", v),
         FloatValue::X87(v) => write!(f, "X87({})", v),
      }
   }
}

impl std::fmt::Display for FloatValue {
   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      match self {
         FloatValue::Single(v) => write!(f, "{}", v),
         FloatValue::Double(v) => write!(f, "{}", v),
         FloatValue::X87(v) => write!(f, "{}", v),
      }
   }
}

impl FloatValue {
   #[must_use]
   pub fn from_text(width: FloatWidth, text: &str) -> Option<FloatValue> {
      Some(match width {
         FloatWidth::Four => FloatValue::Single(text.parse().ok()?),
         FloatWidth::Eight => FloatValue::Double(text.parse().ok()?),
         FloatWidth::Ten => FloatValue::X87(text.parse().ok()?),
      })
   }

   #[must_use]
   pub fn width(&self) -> FloatWidth {
      match self {
         FloatValue::Single(_) => FloatWidth::Four,
         FloatValue::Double(_) => FloatWidth::Eight,
         FloatValue::X87(_) => FloatWidth::Ten,
      }
   }

   #[must_use]
   pub fn is_negative(&self) -> bool {
      match self {
         FloatValue::Single(v) => v.is_negative(),
         FloatValue::Double(v) => v.is_negative(),
         FloatValue::X87(v) => v.is_negative(),
      }
   }

   #[must_use]
   pub fn is_zero(&self) -> bool {
      match self {
         FloatValue::Single(v) => v.is_zero(),
         FloatValue::Double(v) => v.is_zero(),
         FloatValue::X87(v) => v.is_zero(),
      }
   }

   #[must_use]
   pub fn is_nan(&self) -> bool {
      match self {
         FloatValue::Single(v) => v.is_nan(),
         FloatValue::Double(v) => v.is_nan(),
         FloatValue::X87(v) => v.is_nan(),
      }
   }

   #[must_use]
   pub fn is_infinite(&self) -> bool {
      match self {
         FloatValue::Single(v) => v.is_infinite(),
         FloatValue::Double(v) => v.is_infinite(),
         FloatValue::X87(v) => v.is_infinite(),
      }
   }

   #[must_use]
   pub fn is_denormal(&self) -> bool {
      match self {
         FloatValue::Single(v) => v.is_denormal(),
         FloatValue::Double(v) => v.is_denormal(),
         FloatValue::X87(v) => v.is_denormal(),
      }
   }

   #[must_use]
   pub fn bit_pattern(&self) -> u128 {
      match self {
         FloatValue::Single(v) => v.to_bits(),
         FloatValue::Double(v) => v.to_bits(),
         FloatValue::X87(v) => v.to_bits(),
      }
   }

   #[must_use]
   pub fn ilogb(&self) -> i32 {
      i32::from(match self {
         FloatValue::Single(v) => v.ilogb(),
         FloatValue::Double(v) => v.ilogb(),
         FloatValue::X87(v) => v.ilogb(),
      })
   }

   // Renders the value in integer form, to make representation error of a
   // converted integer visible next to the original digits
   #[must_use]
   pub fn to_integer_string(&self) -> String {
      if self.is_nan() || self.is_infinite() || self.is_zero() || self.is_denormal() {
         return self.to_string();
      }
      let width = self.width();
      let sig_bits = width.significand_bits();
      let frac = BigUint::from(self.bit_pattern() & ((1u128 << sig_bits) - 1));
      let significand = frac | (BigUint::one() << sig_bits as usize);
      let exponent = i64::from(self.ilogb()) - i64::from(sig_bits);
      let magnitude = if exponent >= 0 {
         significand << usize::try_from(exponent).unwrap()
      } else {
         significand >> usize::try_from(-exponent).unwrap()
      };
      if self.is_negative() {
         format!("-{}", magnitude.to_str_radix(10))
      } else {
         magnitude.to_str_radix(10)
      }
   }
}

// Round-to-nearest-ties-to-even; the status flags are deliberately not
// consulted for plain float arithmetic
#[must_use]
pub fn fold_float_binary(lhs: FloatValue, rhs: FloatValue, kind: BuiltinKind) -> FloatValue {
   fn op<F: Float>(lhs: F, rhs: F, kind: BuiltinKind) -> F {
      match kind {
         BuiltinKind::FAdd => lhs.add_r(rhs, Round::NearestTiesToEven).value,
         BuiltinKind::FSub => lhs.sub_r(rhs, Round::NearestTiesToEven).value,
         BuiltinKind::FMul => lhs.mul_r(rhs, Round::NearestTiesToEven).value,
         BuiltinKind::FDiv => lhs.div_r(rhs, Round::NearestTiesToEven).value,
         _ => unreachable!(),
      }
   }
   match (lhs, rhs) {
      (FloatValue::Single(a), FloatValue::Single(b)) => FloatValue::Single(op(a, b, kind)),
      (FloatValue::Double(a), FloatValue::Double(b)) => FloatValue::Double(op(a, b, kind)),
      (FloatValue::X87(a), FloatValue::X87(b)) => FloatValue::X87(op(a, b, kind)),
      _ => unreachable!(),
   }
}

#[must_use]
pub fn fold_float_convert(val: FloatValue, dest: FloatWidth) -> (FloatValue, Status) {
   fn conv<F, T>(val: F, wrap: fn(T) -> FloatValue) -> (FloatValue, Status)
   where
      F: Float + FloatConvert<T>,
      T: Float,
   {
      let mut loses_info = false;
      let converted = val.convert_r(Round::NearestTiesToEven, &mut loses_info);
      (wrap(converted.value), converted.status)
   }
   if val.width() == dest {
      return (val, Status::OK);
   }
   match (val, dest) {
      (FloatValue::Single(v), FloatWidth::Eight) => conv(v, FloatValue::Double),
      (FloatValue::Single(v), FloatWidth::Ten) => conv(v, FloatValue::X87),
      (FloatValue::Double(v), FloatWidth::Four) => conv(v, FloatValue::Single),
      (FloatValue::Double(v), FloatWidth::Ten) => conv(v, FloatValue::X87),
      (FloatValue::X87(v), FloatWidth::Four) => conv(v, FloatValue::Single),
      (FloatValue::X87(v), FloatWidth::Eight) => conv(v, FloatValue::Double),
      _ => unreachable!(),
   }
}

// Given a binary fraction 1.significand x 2^exponent, does conversion to
// dest underflow with a loss of significand precision?
fn is_lossy_underflow_parts(src_exponent: i32, src_significand: u64, src: FloatWidth, dest: FloatWidth) -> bool {
   let dest_min = dest.min_exponent();
   if src_exponent >= dest_min {
      return false;
   }

   // Smaller than the smallest non-zero value of the destination?
   if src_exponent < dest_min - i32::try_from(dest.significand_bits()).unwrap() {
      return true;
   }

   let bit_width_decrease = src.significand_bits() - dest.significand_bits();
   let trunc_significand = src_significand >> bit_width_decrease;

   // The integer part: 1 will use up a significand bit in denormal form
   let additional_loss = u32::try_from(dest_min - src_exponent + 1).unwrap();

   // Is a set LSB lost to the subnormal representation?
   let lost_lsb_mask = (1u64 << additional_loss) - 1;
   trunc_significand & lost_lsb_mask != 0
}

#[must_use]
pub fn is_lossy_underflow(val: FloatValue, dest: FloatWidth) -> bool {
   if val.is_nan() || val.is_zero() || val.is_infinite() {
      return false;
   }

   let src = val.width();
   if src.bit_width() <= dest.bit_width() {
      return false;
   }

   if val.is_denormal() {
      // A denormal of a wider format reduces to zero in the narrower one
      return true;
   }

   let significand = u64::try_from(val.bit_pattern() & ((1u128 << src.significand_bits()) - 1)).unwrap();
   is_lossy_underflow_parts(val.ilogb(), significand, src, dest)
}

// Conversion toward zero. None if the destination is too wide for the kernel
// to carry the result exactly (beyond 128 bits nothing in the source language
// reaches this path).
#[must_use]
pub fn fold_float_to_int(val: FloatValue, dest_width: u32, to_unsigned: bool) -> Option<(IntValue, Status)> {
   if dest_width > 128 {
      return None;
   }
   fn go<F: Float>(val: F, dest_width: u32, to_unsigned: bool) -> (IntValue, Status) {
      let mut is_exact = false;
      if to_unsigned {
         let converted = val.to_u128_r(dest_width as usize, Round::TowardZero, &mut is_exact);
         (IntValue::new(dest_width, BigUint::from(converted.value)), converted.status)
      } else {
         let converted = val.to_i128_r(dest_width as usize, Round::TowardZero, &mut is_exact);
         (IntValue::from_bigint(dest_width, &BigInt::from(converted.value)), converted.status)
      }
   }
   Some(match val {
      FloatValue::Single(v) => go(v, dest_width, to_unsigned),
      FloatValue::Double(v) => go(v, dest_width, to_unsigned),
      FloatValue::X87(v) => go(v, dest_width, to_unsigned),
   })
}

// Signed interpretation of the source, round-to-nearest-ties-to-even.
// Conversion goes through the decimal rendering so that sources wider than
// the host word are still correctly rounded.
#[must_use]
pub fn fold_int_to_float(val: &IntValue, dest: FloatWidth) -> (FloatValue, Status) {
   fn go<F: Float>(decimal: &str, wrap: fn(F) -> FloatValue) -> (FloatValue, Status) {
      let converted = F::from_str_r(decimal, Round::NearestTiesToEven).unwrap();
      (wrap(converted.value), converted.status)
   }
   let decimal = val.to_decimal_string(true);
   match dest {
      FloatWidth::Four => go(&decimal, FloatValue::Single),
      FloatWidth::Eight => go(&decimal, FloatValue::Double),
      FloatWidth::Ten => go(&decimal, FloatValue::X87),
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   fn iv(width: u32, val: i128) -> IntValue {
      IntValue::from_bigint(width, &BigInt::from(val))
   }

   #[test]
   fn logical_shift_right_is_unsigned_floor_division() {
      for x in 0u64..=255 {
         for c in 0u64..8 {
            let folded = fold_bit_operation(&IntValue::from_u64(8, x), &IntValue::from_u64(8, c), BuiltinKind::LShr);
            assert_eq!(folded.to_u128(), Some(u128::from(x >> c)));
         }
      }
   }

   #[test]
   fn arithmetic_shift_right_is_signed_floor_division() {
      for x in -128i128..=127 {
         for c in 0u64..8 {
            let folded = fold_bit_operation(&iv(8, x), &IntValue::from_u64(8, c), BuiltinKind::AShr);
            let expected = (x as i8) >> c;
            assert_eq!(folded.as_signed(), BigInt::from(expected));
         }
      }
   }

   #[test]
   fn shl_discards_high_bits() {
      let folded = fold_bit_operation(&IntValue::from_u64(8, 0xC1), &IntValue::from_u64(8, 4), BuiltinKind::Shl);
      assert_eq!(folded.to_u128(), Some(0x10));
   }

   #[test]
   fn extension_round_trips() {
      let x = IntValue::from_u64(16, 0x00AB);
      let narrowed = x.trunc(8);
      assert_eq!(narrowed.zext(16), x);

      let negative = iv(16, -5);
      let narrowed = negative.trunc(8);
      assert_eq!(narrowed.sext(16), negative);
   }

   #[test]
   fn same_width_cast_is_identity_for_every_kind() {
      let x = IntValue::from_u64(8, 0x80);
      for kind in [BuiltinKind::Trunc, BuiltinKind::ZExt, BuiltinKind::SExt] {
         assert_eq!(fold_integer_cast(&x, 8, kind), x);
      }
   }

   #[test]
   fn checked_add_flags() {
      let (res, over) = fold_binary_with_overflow(&iv(32, 2_147_483_647), &iv(32, 1), BuiltinKind::SAddOver);
      assert!(over);
      assert_eq!(res.as_signed(), BigInt::from(-2_147_483_648i64));

      let (res, over) = fold_binary_with_overflow(&iv(32, 2_147_483_647), &iv(32, 1), BuiltinKind::UAddOver);
      assert!(!over);
      assert_eq!(res.to_u128(), Some(2_147_483_648));

      let (_, over) = fold_binary_with_overflow(&IntValue::from_u64(8, 255), &IntValue::from_u64(8, 1), BuiltinKind::UAddOver);
      assert!(over);
   }

   #[test]
   fn checked_sub_and_mul_flags() {
      let (res, over) = fold_binary_with_overflow(&iv(8, 0), &iv(8, 1), BuiltinKind::USubOver);
      assert!(over);
      assert_eq!(res.to_u128(), Some(255));

      let (_, over) = fold_binary_with_overflow(&iv(8, -128), &iv(8, 1), BuiltinKind::SSubOver);
      assert!(!over);
      let (_, over) = fold_binary_with_overflow(&iv(8, -128), &iv(8, -1), BuiltinKind::SSubOver);
      assert!(over);

      let (res, over) = fold_binary_with_overflow(&iv(8, 16), &iv(8, 16), BuiltinKind::SMulOver);
      assert!(over);
      // The wrapped result is still the value mod 2^w
      assert_eq!(res.to_u128(), Some(0));
   }

   #[test]
   fn division_overflow_is_min_over_minus_one() {
      let (_, over) = fold_division(&iv(32, -2_147_483_648), &iv(32, -1), BuiltinKind::SDiv);
      assert!(over);
      let (_, over) = fold_division(&iv(32, -2_147_483_648), &iv(32, -1), BuiltinKind::SRem);
      assert!(over);
      let (res, over) = fold_division(&iv(32, -7), &iv(32, 2), BuiltinKind::SDiv);
      assert!(!over);
      assert_eq!(res.as_signed(), BigInt::from(-3));
      let (res, _) = fold_division(&iv(32, -7), &iv(32, 2), BuiltinKind::SRem);
      assert_eq!(res.as_signed(), BigInt::from(-1));
   }

   #[test]
   fn unsigned_division_never_overflows() {
      let (res, over) = fold_division(&IntValue::from_u64(32, 10), &IntValue::from_u64(32, 3), BuiltinKind::UDiv);
      assert!(!over);
      assert_eq!(res.to_u128(), Some(3));
      let (res, over) = fold_division(&IntValue::from_u64(32, 10), &IntValue::from_u64(32, 3), BuiltinKind::URem);
      assert!(!over);
      assert_eq!(res.to_u128(), Some(1));
   }

   #[test]
   fn comparisons_respect_signedness() {
      let minus_one = iv(8, -1);
      let zero = iv(8, 0);
      assert!(fold_comparison(&minus_one, &zero, BuiltinKind::IcmpSlt).is_one());
      assert!(fold_comparison(&minus_one, &zero, BuiltinKind::IcmpUgt).is_one());
      assert!(fold_comparison(&minus_one, &minus_one, BuiltinKind::IcmpEq).is_one());
      assert!(fold_comparison(&minus_one, &zero, BuiltinKind::IcmpNe).is_one());
   }

   #[test]
   fn checked_trunc_round_trip_detects_overflow() {
      // 255 does not fit into 4 unsigned bits
      let (_, over) = fold_checked_conversion(&IntValue::from_u64(8, 255), BuiltinKind::UToUCheckedTrunc, 4);
      assert!(over);
      let (res, over) = fold_checked_conversion(&IntValue::from_u64(8, 12), BuiltinKind::UToUCheckedTrunc, 4);
      assert!(!over);
      assert_eq!(res.to_u128(), Some(12));

      // 12 fits u4 but not i4
      let (_, over) = fold_checked_conversion(&IntValue::from_u64(8, 12), BuiltinKind::UToSCheckedTrunc, 4);
      assert!(over);
      let (res, over) = fold_checked_conversion(&IntValue::from_u64(8, 7), BuiltinKind::UToSCheckedTrunc, 4);
      assert!(!over);
      assert_eq!(res.to_u128(), Some(7));

      let (_, over) = fold_checked_conversion(&iv(8, -1), BuiltinKind::SToUCheckedTrunc, 4);
      assert!(over);
      let (_, over) = fold_checked_conversion(&iv(8, -8), BuiltinKind::SToSCheckedTrunc, 4);
      assert!(!over);
      let (_, over) = fold_checked_conversion(&iv(8, -9), BuiltinKind::SToSCheckedTrunc, 4);
      assert!(over);
   }

   #[test]
   fn same_width_signedness_conversions_check_the_sign_bit() {
      let (_, over) = fold_checked_conversion(&iv(8, -1), BuiltinKind::SUCheckedConversion, 8);
      assert!(over);
      let (_, over) = fold_checked_conversion(&IntValue::from_u64(8, 127), BuiltinKind::USCheckedConversion, 8);
      assert!(!over);
      let (_, over) = fold_checked_conversion(&IntValue::from_u64(8, 128), BuiltinKind::USCheckedConversion, 8);
      assert!(over);
   }

   #[test]
   fn literal_width_values_work() {
      use crate::type_data::LITERAL_SENTINEL_WIDTH;
      let big = IntValue::from_u64(LITERAL_SENTINEL_WIDTH, 300);
      let (_, over) = fold_checked_conversion(&big, BuiltinKind::UToUCheckedTrunc, 8);
      assert!(over);
      let (res, over) = fold_checked_conversion(&IntValue::from_u64(LITERAL_SENTINEL_WIDTH, 255), BuiltinKind::UToUCheckedTrunc, 8);
      assert!(!over);
      assert_eq!(res.to_u128(), Some(255));
   }

   #[test]
   fn leading_zeros() {
      assert_eq!(IntValue::from_u64(32, 1).leading_zeros(), 31);
      assert_eq!(IntValue::from_u64(32, 0x8000_0000).leading_zeros(), 0);
      assert_eq!(IntValue::from_u64(32, 0).leading_zeros(), 32);
   }

   #[test]
   fn decimal_strings() {
      assert_eq!(iv(8, -1).to_decimal_string(true), "-1");
      assert_eq!(iv(8, -1).to_decimal_string(false), "255");
   }

   #[test]
   fn float_binary_ops() {
      let a = FloatValue::from_text(FloatWidth::Eight, "1.5").unwrap();
      let b = FloatValue::from_text(FloatWidth::Eight, "0.25").unwrap();
      let sum = fold_float_binary(a, b, BuiltinKind::FAdd);
      assert_eq!(sum, FloatValue::from_text(FloatWidth::Eight, "1.75").unwrap());
      let quotient = fold_float_binary(a, b, BuiltinKind::FDiv);
      assert_eq!(quotient, FloatValue::from_text(FloatWidth::Eight, "6.0").unwrap());
   }

   #[test]
   fn float_trunc_status() {
      let tiny = FloatValue::from_text(FloatWidth::Eight, "1.0e-320").unwrap();
      let (_, status) = fold_float_convert(tiny, FloatWidth::Four);
      assert!(status.intersects(Status::UNDERFLOW));

      let exact = FloatValue::from_text(FloatWidth::Eight, "1.5").unwrap();
      let (narrowed, status) = fold_float_convert(exact, FloatWidth::Four);
      assert_eq!(status, Status::OK);
      assert_eq!(narrowed, FloatValue::from_text(FloatWidth::Four, "1.5").unwrap());

      let huge = FloatValue::from_text(FloatWidth::Eight, "1.0e300").unwrap();
      let (_, status) = fold_float_convert(huge, FloatWidth::Four);
      assert!(status.intersects(Status::OVERFLOW));
   }

   #[test]
   fn lossy_underflow_classification() {
      let tiny = FloatValue::from_text(FloatWidth::Eight, "1.0e-320").unwrap();
      assert!(is_lossy_underflow(tiny, FloatWidth::Four));

      let normal = FloatValue::from_text(FloatWidth::Eight, "1.5").unwrap();
      assert!(!is_lossy_underflow(normal, FloatWidth::Four));

      // Representable exactly as a single subnormal: 2^-140
      let exact_subnormal = FloatValue::from_text(FloatWidth::Eight, "0x1.0p-140").unwrap();
      assert!(!is_lossy_underflow(exact_subnormal, FloatWidth::Four));

      // The 2^-152 bit falls below the smallest single subnormal (2^-149)
      let lossy = FloatValue::from_text(FloatWidth::Eight, "0x1.1p-148").unwrap();
      assert!(is_lossy_underflow(lossy, FloatWidth::Four));
   }

   #[test]
   fn float_to_int_outcomes() {
      let v = FloatValue::from_text(FloatWidth::Eight, "42.75").unwrap();
      let (res, status) = fold_float_to_int(v, 32, false).unwrap();
      assert!(status.intersects(Status::INEXACT));
      assert_eq!(res.to_u128(), Some(42));

      let nan = FloatValue::Double(Double::qnan(None));
      let (_, status) = fold_float_to_int(nan, 32, false).unwrap();
      assert!(status.intersects(Status::INVALID_OP));

      let out_of_range = FloatValue::from_text(FloatWidth::Eight, "1.0e10").unwrap();
      let (_, status) = fold_float_to_int(out_of_range, 16, false).unwrap();
      assert!(status.intersects(Status::INVALID_OP));

      let exact = FloatValue::from_text(FloatWidth::Eight, "-8.0").unwrap();
      let (res, status) = fold_float_to_int(exact, 32, false).unwrap();
      assert_eq!(status, Status::OK);
      assert_eq!(res.as_signed(), BigInt::from(-8));
   }

   #[test]
   fn int_to_float_statuses() {
      let exact = IntValue::from_u64(64, 1 << 30);
      let (_, status) = fold_int_to_float(&exact, FloatWidth::Eight);
      assert_eq!(status, Status::OK);

      let inexact = IntValue::from_u64(64, (1 << 53) + 1);
      let (_, status) = fold_int_to_float(&inexact, FloatWidth::Eight);
      assert!(status.intersects(Status::INEXACT));

      // 2^1100 overflows Float64
      let huge = IntValue::new(2048, BigUint::one() << 1100);
      let (val, status) = fold_int_to_float(&huge, FloatWidth::Eight);
      assert!(status.intersects(Status::OVERFLOW));
      assert!(val.is_infinite());
   }

   #[test]
   fn integer_rendering_of_floats() {
      let (val, _) = fold_int_to_float(&IntValue::from_u64(64, (1 << 53) + 1), FloatWidth::Eight);
      assert_eq!(val.to_integer_string(), "9007199254740992");
   }
}
