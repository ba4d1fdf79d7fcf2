use std::io::Write;

use crate::source_info::SourceInfo;

pub(crate) mod error_handling_macros {
   macro_rules! opalc_error {
      ($dst:expr, $loc:expr, $kind:expr $(, $arg:expr)* $(,)?) => ($dst.emit_error($kind, $loc, vec![$($arg.to_string()),*]))
   }

   macro_rules! opalc_warn {
      ($dst:expr, $loc:expr, $kind:expr $(, $arg:expr)* $(,)?) => ($dst.emit_warning($kind, $loc, vec![$($arg.to_string()),*]))
   }

   pub(crate) use {opalc_error, opalc_warn};
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
   ArithmeticOperationOverflow,
   ArithmeticOperationOverflowGenericType,
   DivisionByZero,
   DivisionOverflow,
   ShiftingAllSignificantBits,
   IntegerLiteralOverflow,
   NegativeIntegerLiteralOverflowUnsigned,
   IntegerLiteralOverflowBuiltinTypes,
   IntegerConversionOverflow,
   IntegerConversionOverflowBuiltinTypes,
   IntegerConversionSignError,
   IntegerLiteralOverflowWarn,
   IntegerConversionOverflowWarn,
   WarningIntToFpInexact,
   WarningFloatTruncOverflow,
   WarningFloatTruncUnderflow,
   WarningFloatTruncHexInexact,
   WarningFloatOverflowsMaxbuiltin,
   NegativeFpLiteralOverflowUnsigned,
   FloatToIntOverflow,
   WrongNonNegativeAssumption,
}

impl DiagnosticKind {
   #[must_use]
   pub fn name(self) -> &'static str {
      match self {
         DiagnosticKind::ArithmeticOperationOverflow => "arithmetic_operation_overflow",
         DiagnosticKind::ArithmeticOperationOverflowGenericType => "arithmetic_operation_overflow_generic_type",
         DiagnosticKind::DivisionByZero => "division_by_zero",
         DiagnosticKind::DivisionOverflow => "division_overflow",
         DiagnosticKind::ShiftingAllSignificantBits => "shifting_all_significant_bits",
         DiagnosticKind::IntegerLiteralOverflow => "integer_literal_overflow",
         DiagnosticKind::NegativeIntegerLiteralOverflowUnsigned => "negative_integer_literal_overflow_unsigned",
         DiagnosticKind::IntegerLiteralOverflowBuiltinTypes => "integer_literal_overflow_builtin_types",
         DiagnosticKind::IntegerConversionOverflow => "integer_conversion_overflow",
         DiagnosticKind::IntegerConversionOverflowBuiltinTypes => "integer_conversion_overflow_builtin_types",
         DiagnosticKind::IntegerConversionSignError => "integer_conversion_sign_error",
         DiagnosticKind::IntegerLiteralOverflowWarn => "integer_literal_overflow_warn",
         DiagnosticKind::IntegerConversionOverflowWarn => "integer_conversion_overflow_warn",
         DiagnosticKind::WarningIntToFpInexact => "warning_int_to_fp_inexact",
         DiagnosticKind::WarningFloatTruncOverflow => "warning_float_trunc_overflow",
         DiagnosticKind::WarningFloatTruncUnderflow => "warning_float_trunc_underflow",
         DiagnosticKind::WarningFloatTruncHexInexact => "warning_float_trunc_hex_inexact",
         DiagnosticKind::WarningFloatOverflowsMaxbuiltin => "warning_float_overflows_maxbuiltin",
         DiagnosticKind::NegativeFpLiteralOverflowUnsigned => "negative_fp_literal_overflow_unsigned",
         DiagnosticKind::FloatToIntOverflow => "float_to_int_overflow",
         DiagnosticKind::WrongNonNegativeAssumption => "wrong_non_negative_assumption",
      }
   }
}

// Rendering the message text belongs to the host; the folder only records the
// kind, the positional arguments, and where it happened
pub struct Diagnostic {
   pub kind: DiagnosticKind,
   pub args: Vec<String>,
   pub location: Option<SourceInfo>,
}

pub struct ErrorManager {
   pub errors: Vec<Diagnostic>,
   pub warnings: Vec<Diagnostic>,
}

impl ErrorManager {
   #[must_use]
   pub fn new() -> ErrorManager {
      ErrorManager {
         errors: Vec::new(),
         warnings: Vec::new(),
      }
   }

   pub fn clear(&mut self) {
      self.errors.clear();
      self.warnings.clear();
   }

   pub fn emit_error(&mut self, kind: DiagnosticKind, location: Option<SourceInfo>, args: Vec<String>) {
      self.errors.push(Diagnostic { kind, args, location });
   }

   pub fn emit_warning(&mut self, kind: DiagnosticKind, location: Option<SourceInfo>, args: Vec<String>) {
      self.warnings.push(Diagnostic { kind, args, location });
   }

   pub fn write_out_diagnostics<W: Write>(&self, err_stream: &mut W) {
      write_out_diagnostic_buf(err_stream, &self.errors);

      if self.errors.is_empty() {
         write_out_diagnostic_buf(err_stream, &self.warnings);
      }
   }
}

pub fn write_out_diagnostic_buf<W: Write>(err_stream: &mut W, buf: &[Diagnostic]) {
   for diagnostic in buf.iter() {
      write!(err_stream, "{}", diagnostic.kind.name()).unwrap();
      for arg in diagnostic.args.iter() {
         write!(err_stream, " {}", arg).unwrap();
      }
      writeln!(err_stream).unwrap();
      if let Some(loc) = diagnostic.location {
         writeln!(
            err_stream,
            "↳ line {}, column {}",
            loc.begin.line + 1,
            loc.begin.col + 1
         )
         .unwrap();
      }
   }
}
