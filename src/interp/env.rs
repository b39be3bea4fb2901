//! Runtime values and the per-track variable environment.

use std::collections::HashMap;

use crate::dsl::note::parse_spn;

/// A runtime value. Notes keep their name so a variable can flow back into a
/// note argument unchanged; arithmetic coerces via [`Value::as_number`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Note(String),
    Text(String),
}

impl Value {
    /// Numeric view of the value. Notes coerce to their MIDI number, text to
    /// a parsed float. `None` when no numeric reading exists.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Note(name) => parse_spn(name).map(f64::from),
            Value::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Flat variable scope. One per track; loops and sync blocks share it.
#[derive(Debug, Default)]
pub struct Environment {
    variables: HashMap<String, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_passthrough() {
        assert_eq!(Value::Number(2.5).as_number(), Some(2.5));
    }

    #[test]
    fn note_coerces_to_midi() {
        assert_eq!(Value::Note("C4".to_string()).as_number(), Some(60.0));
        assert_eq!(Value::Note("A4".to_string()).as_number(), Some(69.0));
    }

    #[test]
    fn out_of_range_note_has_no_number() {
        assert_eq!(Value::Note("B9".to_string()).as_number(), None);
    }

    #[test]
    fn text_parses_or_fails() {
        assert_eq!(Value::Text("1.5".to_string()).as_number(), Some(1.5));
        assert_eq!(Value::Text("loud".to_string()).as_number(), None);
    }

    #[test]
    fn environment_set_get() {
        let mut env = Environment::new();
        assert!(env.get("x").is_none());
        env.set("x", Value::Number(1.0));
        assert_eq!(env.get("x"), Some(&Value::Number(1.0)));
        env.set("x", Value::Number(2.0));
        assert_eq!(env.get("x"), Some(&Value::Number(2.0)));
    }
}
