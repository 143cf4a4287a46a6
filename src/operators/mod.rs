//! Compile-time operator inventory. In place of the reference engine's
//! dynamic module-scanning discovery, every operator is registered here by
//! hand; `crate::registry::OperatorRegistry::load` still does the sorting,
//! normalization, and validation a registry is responsible for.

mod boundary_delimiter_injection;
mod expand_context;
mod fake_tool_instruction_injection;
mod homoglyph_injection;
mod markdown_wrapper;
mod override_instructions;
mod polite_prefix;
mod punctuation_resegmentation;
mod refusal_suppression;
mod schema_preserving_mutation;
mod shorten;
mod structured_wrapper;
mod tool_call_argument_perturbation;
mod unbounded_consumption;
mod whitespace_noise;
mod whitespace_perturb;

use std::sync::Arc;

use crate::operator::Operator;

/// All 16 registered operators. Order does not matter: the registry sorts
/// by `op_id` at load time.
pub fn all() -> Vec<Arc<dyn Operator>> {
    vec![
        boundary_delimiter_injection::operator(),
        expand_context::operator(),
        fake_tool_instruction_injection::operator(),
        homoglyph_injection::operator(),
        markdown_wrapper::operator(),
        override_instructions::operator(),
        polite_prefix::operator(),
        punctuation_resegmentation::operator(),
        refusal_suppression::operator(),
        schema_preserving_mutation::operator(),
        shorten::operator(),
        structured_wrapper::operator(),
        tool_call_argument_perturbation::operator(),
        unbounded_consumption::operator(),
        whitespace_noise::operator(),
        whitespace_perturb::operator(),
    ]
}
