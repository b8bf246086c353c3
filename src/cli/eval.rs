//! Evaluate a single driver expression

use super::CliError;
use crate::{
    Evaluator, Language,
    convert::{json_to_value, value_to_json},
    parser::parse_expression,
};

/// Options for the eval command
#[derive(Debug, Clone)]
pub struct EvalOptions {
    /// The expression, in `language`'s syntax
    pub expression: String,
    pub language: Language,
    /// `NAME=JSON` pairs bound before evaluation
    pub bindings: Vec<String>,
    /// Only check that the expression parses and compiles
    pub syntax_only: bool,
}

/// Result of an eval operation
#[derive(Debug)]
pub enum EvalResult {
    SyntaxValid,
    Success(serde_json::Value),
}

fn split_binding(binding: &str) -> Result<(&str, &str), CliError> {
    let (name, json) = binding
        .split_once('=')
        .ok_or_else(|| CliError::Binding(binding.to_string()))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(CliError::Binding(binding.to_string()));
    }
    Ok((name, json))
}

pub fn execute_eval(options: &EvalOptions) -> Result<EvalResult, CliError> {
    let expr = parse_expression(options.expression.trim(), options.language)?;

    let mut evaluator = Evaluator::new(options.language);
    for binding in &options.bindings {
        let (name, json) = split_binding(binding)?;
        let value: serde_json::Value = serde_json::from_str(json)?;
        evaluator.bind(name, json_to_value(value));
    }

    if options.syntax_only {
        evaluator.compile(&expr)?;
        return Ok(EvalResult::SyntaxValid);
    }

    let result = evaluator.eval(&expr)?;
    Ok(EvalResult::Success(value_to_json(result)))
}
