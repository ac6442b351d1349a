//! Static per-operator schemas
//!
//! Each operator declares its ordered input slots (required ones first) and
//! its attributes with default values. Construction-time validation of
//! constant inputs and attributes is driven entirely by these tables.

use super::attrs::{AttrValue, Attrs};

/// One positional input slot
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InputSpec {
    pub name: &'static str,
    pub required: bool,
}

/// One attribute with its default value
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AttrSpec {
    pub name: &'static str,
    pub default: AttrValue,
}

pub const fn required(name: &'static str) -> InputSpec {
    InputSpec {
        name,
        required: true,
    }
}

pub const fn optional(name: &'static str) -> InputSpec {
    InputSpec {
        name,
        required: false,
    }
}

pub const fn attr(name: &'static str, default: AttrValue) -> AttrSpec {
    AttrSpec { name, default }
}

/// Input slots and attributes of one operator type
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OpSchema {
    pub inputs: &'static [InputSpec],
    pub attrs: &'static [AttrSpec],
}

impl OpSchema {
    /// Total number of input slots
    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    /// Number of inputs without a default
    pub fn num_required(&self) -> usize {
        self.inputs.iter().filter(|i| i.required).count()
    }

    pub fn input_index(&self, name: &str) -> Option<usize> {
        self.inputs.iter().position(|i| i.name == name)
    }

    pub fn input_name(&self, index: usize) -> Option<&'static str> {
        self.inputs.get(index).map(|i| i.name)
    }

    pub fn attr(&self, name: &str) -> Option<&AttrSpec> {
        self.attrs.iter().find(|a| a.name == name)
    }

    /// Comma-separated input names, for error messages
    pub fn input_names(&self) -> String {
        self.inputs
            .iter()
            .map(|i| i.name)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Comma-separated attribute names, for error messages
    pub fn attr_names(&self) -> String {
        let mut names: Vec<_> = self.attrs.iter().map(|a| a.name).collect();
        names.sort_unstable();
        names.join(", ")
    }

    pub fn default_attrs(&self) -> Attrs {
        self.attrs
            .iter()
            .map(|a| (a.name.to_string(), a.default))
            .collect()
    }

    /// Check the table is well formed
    pub fn validate(&self) -> Result<(), String> {
        if self.inputs.is_empty() {
            return Err("declares no inputs".to_string());
        }
        if self.num_required() == 0 {
            return Err("declares no required input".to_string());
        }
        if let Some(pos) = self.inputs.iter().position(|i| !i.required) {
            if self.inputs[pos..].iter().any(|i| i.required) {
                return Err("required inputs must precede optional ones".to_string());
            }
        }
        for (i, input) in self.inputs.iter().enumerate() {
            if self.inputs[..i].iter().any(|prev| prev.name == input.name) {
                return Err(format!("duplicate input '{}'", input.name));
            }
            if self.attr(input.name).is_some() {
                return Err(format!("'{}' is both an input and an attribute", input.name));
            }
        }
        for (i, a) in self.attrs.iter().enumerate() {
            if self.attrs[..i].iter().any(|prev| prev.name == a.name) {
                return Err(format!("duplicate attribute '{}'", a.name));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GEMM_LIKE: OpSchema = OpSchema {
        inputs: &[required("a"), required("b"), optional("c")],
        attrs: &[attr("beta", AttrValue::Float(1.0)), attr("alpha", AttrValue::Float(1.0))],
    };

    #[test]
    fn test_counts_and_lookup() {
        assert_eq!(GEMM_LIKE.num_inputs(), 3);
        assert_eq!(GEMM_LIKE.num_required(), 2);
        assert_eq!(GEMM_LIKE.input_index("c"), Some(2));
        assert_eq!(GEMM_LIKE.input_index("z"), None);
        assert_eq!(GEMM_LIKE.input_name(1), Some("b"));
        assert_eq!(GEMM_LIKE.attr_names(), "alpha, beta");
        assert!(GEMM_LIKE.validate().is_ok());
    }

    #[test]
    fn test_default_attrs() {
        let attrs = GEMM_LIKE.default_attrs();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs.get("alpha"), Some(&AttrValue::Float(1.0)));
    }

    const EMPTY: OpSchema = OpSchema {
        inputs: &[],
        attrs: &[],
    };
    const MISORDERED: OpSchema = OpSchema {
        inputs: &[optional("a"), required("b")],
        attrs: &[],
    };
    const DUPLICATED: OpSchema = OpSchema {
        inputs: &[required("x"), optional("x")],
        attrs: &[],
    };
    const NAME_CLASH: OpSchema = OpSchema {
        inputs: &[required("x")],
        attrs: &[attr("x", AttrValue::Int(0))],
    };

    #[test]
    fn test_validate_rejects_bad_tables() {
        assert!(EMPTY.validate().is_err());
        assert!(MISORDERED.validate().is_err());
        assert!(DUPLICATED.validate().is_err());
        assert!(NAME_CLASH.validate().is_err());
    }
}
