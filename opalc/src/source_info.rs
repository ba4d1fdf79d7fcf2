#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SourcePosition {
   pub line: usize,
   pub col: usize,
}

impl SourcePosition {
   #[must_use]
   pub fn col_plus(&self, n: usize) -> SourcePosition {
      SourcePosition {
         line: self.line,
         col: self.col + n,
      }
   }
}

// Resolving a FileId back to a path is the host's concern
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FileId(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SourceInfo {
   pub begin: SourcePosition,
   pub end: SourcePosition,
   pub file: FileId,
}

impl SourceInfo {
   #[must_use]
   pub fn single(file: FileId, line: usize, col: usize) -> SourceInfo {
      let begin = SourcePosition { line, col };
      SourceInfo {
         begin,
         end: begin.col_plus(1),
         file,
      }
   }
}
