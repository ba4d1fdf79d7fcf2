#![warn(clippy::pedantic)]
#![allow(clippy::uninlined_format_args)] // I'm an old man and I like the way it was before
#![allow(clippy::explicit_iter_loop)] // I find explicit iter more readable
#![allow(clippy::match_same_arms)] // Sometimes I find this more clear (when it's just calling something)
#![allow(clippy::too_many_lines)] // A procedure should have however many lines as it needs. More procedures is not better.
#![allow(clippy::too_many_arguments)] // Similar to above, take the amount that you need
#![allow(clippy::single_match_else)] // Not always an improvement in my opinion
#![allow(clippy::missing_errors_doc)] // Nothing is documented
#![allow(clippy::missing_panics_doc)] // Nothing is documented
#![allow(clippy::module_name_repetitions)] // I don't really care that much
#![allow(clippy::new_without_default)] // I don't want dead code

pub mod ast_context;
pub mod builtins;
pub mod constant_folding;
pub mod error_handling;
pub mod mir;
pub mod num_ops;
pub mod pattern_match;
pub mod propagation;
pub mod source_info;
pub mod type_data;

#[cfg(test)]
mod test_support;

pub use propagation::{
   fold_function, CastActions, CastOptimizer, FoldDelegates, FoldOutcome, Invalidation, NoopCastOptimizer,
   NoopStringFolder, StringFolder,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssertConfiguration {
   Level(u64),
   DisableReplacement,
}

pub struct FoldConfiguration {
   pub enable_diagnostics: bool,
   pub assert_configuration: AssertConfiguration,
}

impl FoldConfiguration {
   #[must_use]
   pub fn new() -> FoldConfiguration {
      FoldConfiguration {
         enable_diagnostics: true,
         assert_configuration: AssertConfiguration::DisableReplacement,
      }
   }
}
