//! Constant-propagation abstract values.
//!
//! Three-level flat lattice: `Undef ⊑ Const(n) ⊑ Nac`, distinct constants
//! incomparable. Integers are 32-bit two's-complement with wrapping
//! arithmetic.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An element of the constant-propagation lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    /// No value has reached this point yet (lattice bottom).
    Undef,
    /// A single known 32-bit constant.
    Const(i32),
    /// Not a constant (lattice top).
    Nac,
}

impl Value {
    #[inline]
    pub fn is_undef(&self) -> bool {
        matches!(self, Value::Undef)
    }

    #[inline]
    pub fn is_constant(&self) -> bool {
        matches!(self, Value::Const(_))
    }

    #[inline]
    pub fn is_nac(&self) -> bool {
        matches!(self, Value::Nac)
    }

    #[inline]
    pub fn const_value(&self) -> Option<i32> {
        match self {
            Value::Const(n) => Some(*n),
            _ => None,
        }
    }

    /// Greatest lower bound of two values.
    pub fn meet(self, other: Value) -> Value {
        match (self, other) {
            (Value::Nac, _) | (_, Value::Nac) => Value::Nac,
            (Value::Undef, v) => v,
            (v, Value::Undef) => v,
            (Value::Const(a), Value::Const(b)) => {
                if a == b {
                    Value::Const(a)
                } else {
                    Value::Nac
                }
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undef => write!(f, "UNDEF"),
            Value::Const(n) => write!(f, "#{}", n),
            Value::Nac => write!(f, "NAC"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meet_table() {
        assert_eq!(Value::Nac.meet(Value::Const(1)), Value::Nac);
        assert_eq!(Value::Undef.meet(Value::Const(1)), Value::Const(1));
        assert_eq!(Value::Const(1).meet(Value::Undef), Value::Const(1));
        assert_eq!(Value::Const(1).meet(Value::Const(1)), Value::Const(1));
        assert_eq!(Value::Const(1).meet(Value::Const(2)), Value::Nac);
        assert_eq!(Value::Undef.meet(Value::Undef), Value::Undef);
    }

    #[test]
    fn test_meet_commutative_idempotent() {
        let samples = [Value::Undef, Value::Const(0), Value::Const(-3), Value::Nac];
        for &a in &samples {
            assert_eq!(a.meet(a), a, "idempotence");
            for &b in &samples {
                assert_eq!(a.meet(b), b.meet(a), "commutativity");
            }
        }
    }

    #[test]
    fn test_serde_round_trip() {
        for v in [Value::Undef, Value::Const(42), Value::Nac] {
            let json = serde_json::to_string(&v).unwrap();
            let back: Value = serde_json::from_str(&json).unwrap();
            assert_eq!(v, back);
        }
    }
}
