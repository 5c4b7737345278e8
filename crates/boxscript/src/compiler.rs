//! The compiled artifact shape. Compilation, in this pipeline, does no lowering
//! of its own — the validated/linked AST body already is the executable form. What
//! would be a bytecode-emission pass in the teacher's `compiler.rs` is here just a move.
//!
//! `CompiledAst` intentionally holds no `FunctionTable`: native builtins carry raw `fn`
//! pointers and host functions carry `Arc<dyn Fn>`, neither of which `postcard` can
//! serialize, and a table captured at compile time would go stale the moment a host
//! registers a different function set on reload anyway. Linking against the function
//! table therefore always happens again after a `CompiledAst` is deserialized — see
//! `pipeline::Pipeline::compile_from_artifact`.

use serde::{Deserialize, Serialize};

use crate::ast::{AstProgram, Stmt};

/// A validated, linked, serializable program body, ready to execute or persist as a
/// precompiled artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledAst {
    pub body: Vec<Stmt>,
}

#[must_use]
pub fn compile(ast: AstProgram) -> CompiledAst {
    CompiledAst { body: ast.body }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::parser::parse;

    #[test]
    fn compiling_preserves_the_statement_count() {
        let ast = parse("var x = 1\nreturn x").expect("source must parse");
        let compiled = compile(ast);
        assert_eq!(compiled.body.len(), 2);
    }

    #[test]
    fn compiled_ast_round_trips_through_postcard() {
        let ast = parse("return data").expect("source must parse");
        let compiled = compile(ast);
        let bytes = postcard::to_allocvec(&compiled).expect("serializes");
        let restored: CompiledAst = postcard::from_bytes(&bytes).expect("deserializes");
        assert_eq!(restored.body.len(), compiled.body.len());
    }
}
