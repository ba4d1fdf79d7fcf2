use slotmap::{new_key_type, SlotMap};

new_key_type! { pub struct AstNodeId; }

// The slice of the AST that diagnostics need: enough of a call expression to
// recover user-written types, and enough of a float literal to echo its
// original digits
pub struct CallExpr {
   pub is_implicit: bool,
   pub is_constructor: bool,
   pub result_type: String,
   pub arg_types: Vec<String>,
   pub args: Vec<AstNodeId>,
}

pub enum AstNode {
   Call(CallExpr),
   FloatLiteral { digits: String, negative: bool },
}

pub struct AstContext {
   nodes: SlotMap<AstNodeId, AstNode>,
}

impl AstContext {
   #[must_use]
   pub fn new() -> AstContext {
      AstContext {
         nodes: SlotMap::with_key(),
      }
   }

   pub fn add(&mut self, node: AstNode) -> AstNodeId {
      self.nodes.insert(node)
   }

   #[must_use]
   pub fn get(&self, id: AstNodeId) -> &AstNode {
      &self.nodes[id]
   }

   #[must_use]
   pub fn as_call(&self, id: Option<AstNodeId>) -> Option<&CallExpr> {
      match self.nodes.get(id?) {
         Some(AstNode::Call(call)) => Some(call),
         _ => None,
      }
   }
}
