//! Built-in tool registry for function calling.

use serde_json::{json, Value};
use thiserror::Error;

/// Tool dispatch errors.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("tool execution failed: {0}")]
    Execution(String),
}

/// Registry of the built-in functions, dispatched by name.
#[derive(Debug, Default)]
pub struct ToolRegistry;

impl ToolRegistry {
    pub fn new() -> Self {
        Self
    }

    /// Names of every registered tool.
    pub fn names(&self) -> Vec<&'static str> {
        vec![
            "add",
            "subtract",
            "multiply",
            "divide",
            "random_number",
            "evaluate_equation",
            "normalize_value",
            "get_weather",
        ]
    }

    /// OpenAI-shaped tool declarations for the chat payload.
    pub fn schemas(&self) -> Vec<Value> {
        fn two_number_schema(name: &str, description: &str, a: &str, b: &str) -> Value {
            json!({
                "type": "function",
                "function": {
                    "name": name,
                    "description": description,
                    "parameters": {
                        "type": "object",
                        "properties": {
                            "a": { "type": "number", "description": a },
                            "b": { "type": "number", "description": b }
                        },
                        "required": ["a", "b"]
                    }
                }
            })
        }

        vec![
            two_number_schema("add", "Add two numbers together", "First number", "Second number"),
            two_number_schema(
                "subtract",
                "Subtract one number from another",
                "Number to subtract from",
                "Number to subtract",
            ),
            two_number_schema("multiply", "Multiply two numbers", "First number", "Second number"),
            two_number_schema("divide", "Divide one number by another", "Numerator", "Denominator"),
            json!({
                "type": "function",
                "function": {
                    "name": "random_number",
                    "description": "Generate a deterministic random number with a seed",
                    "parameters": {
                        "type": "object",
                        "properties": {
                            "seed": { "type": "integer", "description": "Random seed" },
                            "min": { "type": "number", "description": "Minimum value" },
                            "max": { "type": "number", "description": "Maximum value" }
                        },
                        "required": ["seed", "min", "max"]
                    }
                }
            }),
            json!({
                "type": "function",
                "function": {
                    "name": "evaluate_equation",
                    "description": "Evaluate a mathematical equation",
                    "parameters": {
                        "type": "object",
                        "properties": {
                            "equation": { "type": "string", "description": "Mathematical equation to evaluate" }
                        },
                        "required": ["equation"]
                    }
                }
            }),
            json!({
                "type": "function",
                "function": {
                    "name": "normalize_value",
                    "description": "Normalize a value to a 0-1 range",
                    "parameters": {
                        "type": "object",
                        "properties": {
                            "value": { "type": "number", "description": "Value to normalize" },
                            "min_val": { "type": "number", "description": "Minimum of range" },
                            "max_val": { "type": "number", "description": "Maximum of range" }
                        },
                        "required": ["value", "min_val", "max_val"]
                    }
                }
            }),
            json!({
                "type": "function",
                "function": {
                    "name": "get_weather",
                    "description": "Get the current weather for a location (stub)",
                    "parameters": {
                        "type": "object",
                        "properties": {
                            "location": { "type": "string", "description": "City name" }
                        },
                        "required": ["location"]
                    }
                }
            }),
        ]
    }

    /// Execute a tool by name with JSON arguments.
    pub fn dispatch(&self, name: &str, args: &Value) -> Result<Value, ToolError> {
        match name {
            "add" => Ok(json!(num(args, "a")? + num(args, "b")?)),
            "subtract" => Ok(json!(num(args, "a")? - num(args, "b")?)),
            "multiply" => Ok(json!(num(args, "a")? * num(args, "b")?)),
            "divide" => {
                let b = num(args, "b")?;
                if b == 0.0 {
                    return Err(ToolError::Execution("cannot divide by zero".to_string()));
                }
                Ok(json!(num(args, "a")? / b))
            }
            "random_number" => {
                let seed = num(args, "seed")?;
                let min = num(args, "min")?;
                let max = num(args, "max")?;
                Ok(json!(seeded_random(seed, min, max)))
            }
            "evaluate_equation" => {
                let equation = text(args, "equation")?;
                Ok(json!(evaluate_equation(&equation)?))
            }
            "normalize_value" => {
                let value = num(args, "value")?;
                let min_val = num(args, "min_val")?;
                let max_val = num(args, "max_val")?;
                if max_val == min_val {
                    return Err(ToolError::Execution("range is empty".to_string()));
                }
                Ok(json!((value - min_val) / (max_val - min_val)))
            }
            "get_weather" => {
                let location = text(args, "location")?;
                // Stub: the API demo has no real weather backend.
                Ok(json!({
                    "location": location,
                    "temperature_c": 21,
                    "conditions": "partly cloudy",
                    "stub": true,
                }))
            }
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }
}

fn num(args: &Value, key: &str) -> Result<f64, ToolError> {
    args.get(key)
        .and_then(Value::as_f64)
        .ok_or_else(|| ToolError::InvalidArguments(format!("missing number argument {key:?}")))
}

fn text(args: &Value, key: &str) -> Result<String, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .map(|s| s.to_string())
        .ok_or_else(|| ToolError::InvalidArguments(format!("missing string argument {key:?}")))
}

/// Deterministic pseudo-random value from a seed: fractional part of
/// `sin(seed) * 10000`, scaled into `[min, max)`.
fn seeded_random(seed: f64, min: f64, max: f64) -> f64 {
    let x = seed.sin() * 10_000.0;
    let frac = x - x.floor();
    min + frac * (max - min)
}

/// Evaluate an arithmetic expression over `+ - * / ( )` and numbers.
///
/// Replaces the reference's string eval with a recursive-descent parser;
/// any other character is rejected up front.
pub fn evaluate_equation(input: &str) -> Result<f64, ToolError> {
    if !input
        .chars()
        .all(|c| c.is_ascii_digit() || "+-*/.() \t".contains(c))
    {
        return Err(ToolError::InvalidArguments(
            "equation contains invalid characters".to_string(),
        ));
    }

    let mut parser = ExprParser {
        input: input.as_bytes(),
        pos: 0,
    };
    let value = parser.expr()?;
    parser.skip_ws();
    if parser.pos != parser.input.len() {
        return Err(ToolError::InvalidArguments(format!(
            "unexpected input at offset {}",
            parser.pos
        )));
    }
    Ok(value)
}

struct ExprParser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl ExprParser<'_> {
    fn skip_ws(&mut self) {
        while self.pos < self.input.len() && (self.input[self.pos] == b' ' || self.input[self.pos] == b'\t') {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<u8> {
        self.skip_ws();
        self.input.get(self.pos).copied()
    }

    fn expr(&mut self) -> Result<f64, ToolError> {
        let mut value = self.term()?;
        while let Some(op) = self.peek() {
            match op {
                b'+' => {
                    self.pos += 1;
                    value += self.term()?;
                }
                b'-' => {
                    self.pos += 1;
                    value -= self.term()?;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, ToolError> {
        let mut value = self.factor()?;
        while let Some(op) = self.peek() {
            match op {
                b'*' => {
                    self.pos += 1;
                    value *= self.factor()?;
                }
                b'/' => {
                    self.pos += 1;
                    let divisor = self.factor()?;
                    if divisor == 0.0 {
                        return Err(ToolError::Execution("division by zero".to_string()));
                    }
                    value /= divisor;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    fn factor(&mut self) -> Result<f64, ToolError> {
        match self.peek() {
            Some(b'-') => {
                self.pos += 1;
                Ok(-self.factor()?)
            }
            Some(b'(') => {
                self.pos += 1;
                let value = self.expr()?;
                if self.peek() != Some(b')') {
                    return Err(ToolError::InvalidArguments("unclosed parenthesis".to_string()));
                }
                self.pos += 1;
                Ok(value)
            }
            Some(c) if c.is_ascii_digit() || c == b'.' => self.number(),
            _ => Err(ToolError::InvalidArguments("expected a number".to_string())),
        }
    }

    fn number(&mut self) -> Result<f64, ToolError> {
        self.skip_ws();
        let start = self.pos;
        while self.pos < self.input.len()
            && (self.input[self.pos].is_ascii_digit() || self.input[self.pos] == b'.')
        {
            self.pos += 1;
        }
        std::str::from_utf8(&self.input[start..self.pos])
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .ok_or_else(|| ToolError::InvalidArguments("malformed number".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic_dispatch() {
        let registry = ToolRegistry::new();
        assert_eq!(registry.dispatch("add", &json!({"a": 2, "b": 3})).unwrap(), json!(5.0));
        assert_eq!(
            registry.dispatch("subtract", &json!({"a": 10, "b": 4})).unwrap(),
            json!(6.0)
        );
        assert_eq!(
            registry.dispatch("multiply", &json!({"a": 6, "b": 7})).unwrap(),
            json!(42.0)
        );
        assert_eq!(
            registry.dispatch("divide", &json!({"a": 9, "b": 2})).unwrap(),
            json!(4.5)
        );
    }

    #[test]
    fn test_divide_by_zero() {
        let registry = ToolRegistry::new();
        assert!(matches!(
            registry.dispatch("divide", &json!({"a": 1, "b": 0})),
            Err(ToolError::Execution(_))
        ));
    }

    #[test]
    fn test_unknown_tool() {
        let registry = ToolRegistry::new();
        assert!(matches!(
            registry.dispatch("teleport", &json!({})),
            Err(ToolError::UnknownTool(_))
        ));
    }

    #[test]
    fn test_missing_argument() {
        let registry = ToolRegistry::new();
        assert!(matches!(
            registry.dispatch("add", &json!({"a": 1})),
            Err(ToolError::InvalidArguments(_))
        ));
    }

    #[test]
    fn test_random_number_is_deterministic() {
        let a = seeded_random(42.0, 0.0, 100.0);
        let b = seeded_random(42.0, 0.0, 100.0);
        assert_eq!(a, b);
        assert!((0.0..100.0).contains(&a));
        assert_ne!(a, seeded_random(43.0, 0.0, 100.0));
    }

    #[test]
    fn test_normalize_value() {
        let registry = ToolRegistry::new();
        assert_eq!(
            registry
                .dispatch("normalize_value", &json!({"value": 5, "min_val": 0, "max_val": 10}))
                .unwrap(),
            json!(0.5)
        );
    }

    #[test]
    fn test_evaluate_equation() {
        assert_eq!(evaluate_equation("2 + 3 * 4").unwrap(), 14.0);
        assert_eq!(evaluate_equation("(2 + 3) * 4").unwrap(), 20.0);
        assert_eq!(evaluate_equation("-3 + 1.5").unwrap(), -1.5);
        assert_eq!(evaluate_equation("10 / 4").unwrap(), 2.5);
    }

    #[test]
    fn test_evaluate_equation_rejects_bad_input() {
        assert!(evaluate_equation("2 + x").is_err());
        assert!(evaluate_equation("system()").is_err());
        assert!(evaluate_equation("(1 + 2").is_err());
        assert!(evaluate_equation("1 / 0").is_err());
        assert!(evaluate_equation("1 2").is_err());
    }

    #[test]
    fn test_schemas_cover_every_tool() {
        let registry = ToolRegistry::new();
        let schemas = registry.schemas();
        let schema_names: Vec<&str> = schemas
            .iter()
            .filter_map(|s| s["function"]["name"].as_str())
            .collect();
        assert_eq!(schema_names, registry.names());
    }
}
