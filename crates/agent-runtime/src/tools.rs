//! Built-in tools.
//!
//! Both are plain functions wrapped with [`FunctionTool::from_fn`], so their
//! parameter schemas come from the argument structs.

use std::sync::Arc;

use agent_core::registry::{ToolSource, Toolkit};
use agent_core::{FunctionTool, Tool, ToolError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct CalculatorArgs {
    expression: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct DateTimeArgs {
    format: Option<String>,
}

/// Calculator and date/time tools
#[derive(Clone, Copy, Debug, Default)]
pub struct BuiltinTools;

impl Toolkit for BuiltinTools {
    fn tools(&self) -> Vec<Arc<dyn Tool>> {
        vec![Arc::new(calculator()), Arc::new(datetime())]
    }
}

/// All built-in tools, ready for `AgentBuilder::tool`
pub fn builtin_tools() -> ToolSource {
    ToolSource::toolkit(&BuiltinTools)
}

pub fn calculator() -> FunctionTool {
    FunctionTool::from_fn(
        "calculator",
        "Evaluate an arithmetic expression with + - * / ^ and parentheses",
        |args: CalculatorArgs| evaluate(&args.expression).map_err(ToolError::Execution),
    )
    .describe("expression", "Expression to evaluate, e.g. '(2 + 3) * 4'")
}

pub fn datetime() -> FunctionTool {
    FunctionTool::from_fn(
        "datetime",
        "Get the current UTC date and time",
        |args: DateTimeArgs| {
            let now = chrono::Utc::now();
            Ok::<_, ToolError>(match args.format.as_deref() {
                Some("iso") => now.to_rfc3339(),
                Some("unix") => now.timestamp().to_string(),
                _ => now.format("%A, %B %d, %Y at %H:%M:%S UTC").to_string(),
            })
        },
    )
    .describe("format", "One of 'human' (default), 'iso' or 'unix'")
}

/// Recursive-descent evaluation over `+ - * / ^`, unary minus and parentheses
fn evaluate(expression: &str) -> Result<f64, String> {
    let tokens: Vec<char> = expression.chars().filter(|c| !c.is_whitespace()).collect();
    if tokens.is_empty() {
        return Err("Empty expression".into());
    }

    let mut parser = Evaluator { tokens, pos: 0 };
    let value = parser.sum()?;
    match parser.peek() {
        None => Ok(value),
        Some(c) => Err(format!("Unexpected '{c}' at position {}", parser.pos)),
    }
}

struct Evaluator {
    tokens: Vec<char>,
    pos: usize,
}

impl Evaluator {
    fn peek(&self) -> Option<char> {
        self.tokens.get(self.pos).copied()
    }

    fn sum(&mut self) -> Result<f64, String> {
        let mut value = self.product()?;
        while let Some(op @ ('+' | '-')) = self.peek() {
            self.pos += 1;
            let rhs = self.product()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn product(&mut self) -> Result<f64, String> {
        let mut value = self.power()?;
        while let Some(op @ ('*' | '/')) = self.peek() {
            self.pos += 1;
            let rhs = self.power()?;
            if op == '/' {
                if rhs == 0.0 {
                    return Err("Division by zero".into());
                }
                value /= rhs;
            } else {
                value *= rhs;
            }
        }
        Ok(value)
    }

    // Right associative
    fn power(&mut self) -> Result<f64, String> {
        let base = self.unary()?;
        if self.peek() == Some('^') {
            self.pos += 1;
            let exponent = self.power()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn unary(&mut self) -> Result<f64, String> {
        if self.peek() == Some('-') {
            self.pos += 1;
            return Ok(-self.unary()?);
        }
        self.atom()
    }

    fn atom(&mut self) -> Result<f64, String> {
        if self.peek() == Some('(') {
            self.pos += 1;
            let value = self.sum()?;
            if self.peek() != Some(')') {
                return Err("Missing closing parenthesis".into());
            }
            self.pos += 1;
            return Ok(value);
        }

        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || c == '.')
        {
            self.pos += 1;
        }
        let number: String = self.tokens[start..self.pos].iter().collect();
        number.parse::<f64>().map_err(|e| match self.peek() {
            Some(c) if number.is_empty() => format!("Unexpected '{c}' at position {start}"),
            _ => format!("Parse error: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::{ToolDispatcher, ToolRegistry};
    use serde_json::json;

    #[test]
    fn test_evaluate() {
        assert!((evaluate("2 + 2").unwrap() - 4.0).abs() < f64::EPSILON);
        assert!((evaluate("10 - 4 - 3").unwrap() - 3.0).abs() < f64::EPSILON);
        assert!((evaluate("(2 + 3) * 4").unwrap() - 20.0).abs() < f64::EPSILON);
        assert!((evaluate("2 ^ 3 ^ 2").unwrap() - 512.0).abs() < f64::EPSILON);
        assert!((evaluate("-3 * -2").unwrap() - 6.0).abs() < f64::EPSILON);
        assert_eq!(evaluate("1 / 0").unwrap_err(), "Division by zero");
        assert!(evaluate("2 +").is_err());
        assert!(evaluate("(1 + 2").is_err());
    }

    #[test]
    fn test_schemas_come_from_argument_structs() {
        let calc = calculator().schema();
        assert_eq!(calc.parameters.len(), 1);
        assert_eq!(calc.parameters[0].param_type, "str");
        assert!(calc.parameters[0].required);

        let clock = datetime().schema();
        assert_eq!(clock.parameters[0].name, "format");
        assert!(!clock.parameters[0].required);
    }

    #[tokio::test]
    async fn test_builtin_tools_dispatch() {
        let mut registry = ToolRegistry::new();
        assert_eq!(registry.register(builtin_tools()).unwrap(), 2);
        assert_eq!(registry.names(), vec!["calculator", "datetime"]);

        let dispatcher = ToolDispatcher::new(Arc::new(registry));
        let result = dispatcher
            .invoke_one("calculator", &json!({"expression": "17 * 23"}))
            .await;
        assert!(result.is_success());
        assert_eq!(result.result, json!(391.0));

        let result = dispatcher
            .invoke_one("datetime", &json!({"format": "unix"}))
            .await;
        assert!(result.is_success());
        assert!(result.observation().parse::<i64>().is_ok());

        let result = dispatcher
            .invoke_one("calculator", &json!({"expression": "1 / 0"}))
            .await;
        assert_eq!(
            result.observation(),
            "Error executing tool 'calculator': Division by zero"
        );
    }
}
