use serde_json::Value;

/// What a finished script handed back, as seen by either backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptReturn {
    /// Nothing returned.
    Nothing,
    /// An integral number, used as the exit code.
    Code(i32),
    /// Anything else. Printed, and the run counts as a success.
    Value(String),
}

impl ScriptReturn {
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => Self::Nothing,
            Some(Value::Number(n)) => match n.as_i64() {
                Some(i) => Self::Code(i.clamp(i32::MIN as i64, i32::MAX as i64) as i32),
                None => match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.is_finite() => {
                        Self::Code(f.clamp(i32::MIN as f64, i32::MAX as f64) as i32)
                    }
                    _ => Self::Value(n.to_string()),
                },
            },
            Some(Value::String(s)) => Self::Value(s.clone()),
            Some(other) => Self::Value(other.to_string()),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Code(code) => *code,
            Self::Nothing | Self::Value(_) => 0,
        }
    }

    /// Text worth showing to the user, if any.
    pub fn display(&self) -> Option<&str> {
        match self {
            Self::Value(s) => Some(s.as_str()),
            _ => None,
        }
    }
}
