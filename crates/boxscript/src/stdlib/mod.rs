//! The standard library: every function a script can call without the host
//! registering anything of its own.
//!
//! Grounded in the teacher's `builtins/` module (one submodule per builtin function,
//! aggregated by a `Builtins` registry in `builtins/mod.rs`) and `modules/` (stdlib
//! modules like `re`, `json`, `math` registered as importable namespaces). This
//! language has no module/import system, so every stdlib function
//! lives in one flat namespace — the split into submodules here is purely for
//! organization by functional area, matching how the teacher groups `modules/re.rs`,
//! `modules/math_mod.rs`, etc. by concern even though Python's `import` has no
//! equivalent a script author here ever writes.
//!
//! Each submodule registers its functions into a [`FunctionTable`] via a `register`
//! free function; [`standard_table`] builds the complete table once per process (it
//! is cheap to call per-compile too — registration is a handful of `IndexMap`
//! inserts, not parsing or codegen).

mod array;
mod combinators;
mod datetime;
mod helpers;
mod math;
mod regexp;
mod schema;
mod string;
mod utility;

use crate::function_table::FunctionTable;

/// Builds the engine-shipped function table: every builtin, nothing host-specific.
/// `pipeline::Pipeline::compile` merges this with the host's own table via
/// [`FunctionTable::merged_with_host`].
#[must_use]
pub fn standard_table() -> FunctionTable {
    let mut table = FunctionTable::new();
    array::register(&mut table);
    combinators::register(&mut table);
    math::register(&mut table);
    datetime::register(&mut table);
    schema::register(&mut table);
    regexp::register(&mut table);
    string::register(&mut table);
    utility::register(&mut table);
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_category_contributes_at_least_one_function() {
        let table = standard_table();
        for name in ["Append", "Map", "Abs", "NowIso8601", "HasRequiredFields", "RegexMatch", "PadLeft", "TypeOf"] {
            assert!(table.get(name).is_some(), "missing builtin {name}");
        }
    }
}
