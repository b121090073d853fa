//! Variable declarations and the per-instance variable bank.
//!
//! Declarations are asset data (name, dense index, type, default); the bank
//! is the per-instance mutable storage driving blend parameters and
//! transition conditions. Triggers are booleans that transitions reset on
//! consumption.

use serde::{Deserialize, Serialize};

use crate::math::Fp;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum VariableType {
    Fp,
    Int,
    Bool,
    Trigger,
}

/// Runtime value slot. Triggers share the `Bool` variant.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum VariableValue {
    Fp(Fp),
    Int(i32),
    Bool(bool),
}

/// Declared variable in the graph asset. Indices are dense (0..N-1) and
/// stable; `Graph::validate` enforces this.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VariableDecl {
    pub name: String,
    pub index: usize,
    pub ty: VariableType,
    pub default: VariableValue,
}

impl VariableDecl {
    pub fn fp(name: &str, index: usize, default: Fp) -> Self {
        Self {
            name: name.to_string(),
            index,
            ty: VariableType::Fp,
            default: VariableValue::Fp(default),
        }
    }

    pub fn int(name: &str, index: usize, default: i32) -> Self {
        Self {
            name: name.to_string(),
            index,
            ty: VariableType::Int,
            default: VariableValue::Int(default),
        }
    }

    pub fn bool(name: &str, index: usize, default: bool) -> Self {
        Self {
            name: name.to_string(),
            index,
            ty: VariableType::Bool,
            default: VariableValue::Bool(default),
        }
    }

    pub fn trigger(name: &str, index: usize) -> Self {
        Self {
            name: name.to_string(),
            index,
            ty: VariableType::Trigger,
            default: VariableValue::Bool(false),
        }
    }

    /// Value a fresh bank slot takes for this declaration.
    pub fn default_value(&self) -> VariableValue {
        match (self.ty, self.default) {
            (VariableType::Fp, v @ VariableValue::Fp(_)) => v,
            (VariableType::Int, v @ VariableValue::Int(_)) => v,
            (VariableType::Bool, v @ VariableValue::Bool(_)) => v,
            (VariableType::Trigger, v @ VariableValue::Bool(_)) => v,
            // Mismatched declaration: fall back to the type's zero value.
            (VariableType::Fp, _) => VariableValue::Fp(Fp::ZERO),
            (VariableType::Int, _) => VariableValue::Int(0),
            (VariableType::Bool | VariableType::Trigger, _) => VariableValue::Bool(false),
        }
    }
}

/// Per-instance variable storage, one slot per declaration, addressed by
/// the declaration's dense index.
///
/// Out-of-range indices are a precondition violation (stale index or freed
/// record) and abort via `assert!`; type mismatches are configuration
/// errors and degrade to warn + default.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VariableBank {
    values: Vec<VariableValue>,
}

impl VariableBank {
    pub fn from_declarations(decls: &[VariableDecl]) -> Self {
        let mut bank = Self {
            values: Vec::with_capacity(decls.len()),
        };
        for decl in decls {
            bank.values.push(decl.default_value());
        }
        bank
    }

    /// Re-apply declared defaults in place.
    pub fn reset(&mut self, decls: &[VariableDecl]) {
        assert_eq!(self.values.len(), decls.len());
        for decl in decls {
            self.values[decl.index] = decl.default_value();
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn value(&self, index: usize) -> VariableValue {
        assert!(index < self.values.len(), "variable index out of range");
        self.values[index]
    }

    pub fn get_fp(&self, index: usize) -> Fp {
        match self.value(index) {
            VariableValue::Fp(v) => v,
            other => {
                log::warn!("variable {index} read as fp but holds {other:?}");
                Fp::ZERO
            }
        }
    }

    pub fn set_fp(&mut self, index: usize, value: Fp) {
        assert!(index < self.values.len(), "variable index out of range");
        match self.values[index] {
            VariableValue::Fp(_) => self.values[index] = VariableValue::Fp(value),
            other => log::warn!("variable {index} written as fp but holds {other:?}"),
        }
    }

    pub fn get_int(&self, index: usize) -> i32 {
        match self.value(index) {
            VariableValue::Int(v) => v,
            other => {
                log::warn!("variable {index} read as int but holds {other:?}");
                0
            }
        }
    }

    pub fn set_int(&mut self, index: usize, value: i32) {
        assert!(index < self.values.len(), "variable index out of range");
        match self.values[index] {
            VariableValue::Int(_) => self.values[index] = VariableValue::Int(value),
            other => log::warn!("variable {index} written as int but holds {other:?}"),
        }
    }

    pub fn get_bool(&self, index: usize) -> bool {
        match self.value(index) {
            VariableValue::Bool(v) => v,
            other => {
                log::warn!("variable {index} read as bool but holds {other:?}");
                false
            }
        }
    }

    pub fn set_bool(&mut self, index: usize, value: bool) {
        assert!(index < self.values.len(), "variable index out of range");
        match self.values[index] {
            VariableValue::Bool(_) => self.values[index] = VariableValue::Bool(value),
            other => log::warn!("variable {index} written as bool but holds {other:?}"),
        }
    }

    #[inline]
    pub fn set_trigger(&mut self, index: usize) {
        self.set_bool(index, true);
    }

    #[inline]
    pub fn reset_trigger(&mut self, index: usize) {
        self.set_bool(index, false);
    }

    #[inline]
    pub fn is_trigger_active(&self, index: usize) -> bool {
        self.get_bool(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decls() -> Vec<VariableDecl> {
        vec![
            VariableDecl::fp("Speed", 0, Fp::from_num(0.5)),
            VariableDecl::int("Combo", 1, 3),
            VariableDecl::bool("Grounded", 2, true),
            VariableDecl::trigger("Jump", 3),
        ]
    }

    #[test]
    fn defaults_fill_the_bank() {
        let bank = VariableBank::from_declarations(&decls());
        assert_eq!(bank.get_fp(0), Fp::from_num(0.5));
        assert_eq!(bank.get_int(1), 3);
        assert!(bank.get_bool(2));
        assert!(!bank.is_trigger_active(3));
    }

    #[test]
    fn reset_restores_defaults() {
        let d = decls();
        let mut bank = VariableBank::from_declarations(&d);
        bank.set_fp(0, Fp::from_num(9));
        bank.set_trigger(3);
        bank.reset(&d);
        assert_eq!(bank.get_fp(0), Fp::from_num(0.5));
        assert!(!bank.is_trigger_active(3));
    }

    #[test]
    fn type_mismatch_degrades_to_default() {
        let mut bank = VariableBank::from_declarations(&decls());
        bank.set_fp(1, Fp::ONE);
        assert_eq!(bank.get_int(1), 3);
        assert_eq!(bank.get_fp(1), Fp::ZERO);
    }

    #[test]
    #[should_panic]
    fn out_of_range_index_is_fatal() {
        let bank = VariableBank::from_declarations(&decls());
        let _ = bank.value(17);
    }
}
