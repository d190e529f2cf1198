//! Column values.

use std::fmt;

use fc_core::{AgentId, ResourceId, Tick, TransactionId};

/// One cell of a recorded row.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Double(f64),
    Str(String),
}

/// The type of a `Value`, fixed per column by the first datum of a table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Bool,
    Int,
    UInt,
    Double,
    Str,
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_)   => ValueKind::Bool,
            Value::Int(_)    => ValueKind::Int,
            Value::UInt(_)   => ValueKind::UInt,
            Value::Double(_) => ValueKind::Double,
            Value::Str(_)    => ValueKind::Str,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Double(v) => Some(v),
            Value::Int(v)    => Some(v as f64),
            Value::UInt(v)   => Some(v as f64),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::UInt(v) => Some(v),
            Value::Int(v) if v >= 0 => Some(v as u64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValueKind::Bool   => "bool",
            ValueKind::Int    => "int",
            ValueKind::UInt   => "uint",
            ValueKind::Double => "double",
            ValueKind::Str    => "string",
        };
        f.write_str(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v)   => write!(f, "{v}"),
            Value::Int(v)    => write!(f, "{v}"),
            Value::UInt(v)   => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Str(v)    => write!(f, "{v:?}"),
        }
    }
}

// ── Conversions ───────────────────────────────────────────────────────────────

macro_rules! value_from {
    ($($t:ty => $variant:ident as $cast:ty),* $(,)?) => {
        $(impl From<$t> for Value {
            #[inline]
            fn from(v: $t) -> Value {
                Value::$variant(v as $cast)
            }
        })*
    };
}

value_from! {
    i32   => Int as i64,
    i64   => Int as i64,
    u32   => UInt as u64,
    u64   => UInt as u64,
    usize => UInt as u64,
    f64   => Double as f64,
}

impl From<bool> for Value {
    fn from(v: bool) -> Value {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Value {
        Value::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Value {
        Value::Str(v)
    }
}

impl From<AgentId> for Value {
    fn from(v: AgentId) -> Value {
        Value::UInt(v.0 as u64)
    }
}

impl From<ResourceId> for Value {
    fn from(v: ResourceId) -> Value {
        Value::UInt(v.0)
    }
}

impl From<TransactionId> for Value {
    fn from(v: TransactionId) -> Value {
        Value::UInt(v.0)
    }
}

impl From<Tick> for Value {
    fn from(v: Tick) -> Value {
        Value::UInt(v.0)
    }
}
