//! Process-wide operator registry
//!
//! A static descriptor table indexed by ONNX operator tag. The index is built
//! and validated once on first lookup and is read-only afterwards.

use super::attrs::AttrValue;
use super::reference::{self, ReferenceImpl};
use super::schema::{attr, optional, required, OpSchema};
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

/// How `apply` executes an operator
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Execution {
    /// Dequantize, run the reference implementation, requantize the output
    FloatDomain,
    /// Integer matmul with a single final float rescale
    IntegerGemm,
}

/// Static description of one operator type
pub struct OpDescriptor {
    pub tag: &'static str,
    pub schema: OpSchema,
    pub reference: ReferenceImpl,
    pub execution: Execution,
}

impl fmt::Debug for OpDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpDescriptor")
            .field("tag", &self.tag)
            .field("schema", &self.schema)
            .field("execution", &self.execution)
            .finish()
    }
}

const fn float_domain(tag: &'static str, schema: OpSchema, reference: ReferenceImpl) -> OpDescriptor {
    OpDescriptor {
        tag,
        schema,
        reference,
        execution: Execution::FloatDomain,
    }
}

const UNARY: OpSchema = OpSchema {
    inputs: &[required("x")],
    attrs: &[],
};

const GEMM: OpSchema = OpSchema {
    inputs: &[required("a"), required("b"), optional("c")],
    attrs: &[
        attr("alpha", AttrValue::Float(1.0)),
        attr("beta", AttrValue::Float(1.0)),
        attr("transA", AttrValue::Int(0)),
        attr("transB", AttrValue::Int(0)),
    ],
};

static OPERATORS: &[OpDescriptor] = &[
    float_domain("Sigmoid", UNARY, reference::sigmoid),
    float_domain(
        "HardSigmoid",
        OpSchema {
            inputs: &[required("x")],
            attrs: &[
                attr("alpha", AttrValue::Float(0.2)),
                attr("beta", AttrValue::Float(0.5)),
            ],
        },
        reference::hard_sigmoid,
    ),
    float_domain("Relu", UNARY, reference::relu),
    float_domain(
        "LeakyRelu",
        OpSchema {
            inputs: &[required("x")],
            attrs: &[attr("alpha", AttrValue::Float(0.01))],
        },
        reference::leaky_relu,
    ),
    float_domain(
        "Elu",
        OpSchema {
            inputs: &[required("x")],
            attrs: &[attr("alpha", AttrValue::Float(1.0))],
        },
        reference::elu,
    ),
    float_domain(
        "Selu",
        OpSchema {
            inputs: &[required("x")],
            attrs: &[
                attr("alpha", AttrValue::Float(1.673_263_192_176_818_8)),
                attr("gamma", AttrValue::Float(1.050_701_022_148_132_3)),
            ],
        },
        reference::selu,
    ),
    float_domain(
        "Celu",
        OpSchema {
            inputs: &[required("x")],
            attrs: &[attr("alpha", AttrValue::Float(1.0))],
        },
        reference::celu,
    ),
    float_domain(
        "Clip",
        OpSchema {
            inputs: &[required("x"), optional("min"), optional("max")],
            attrs: &[],
        },
        reference::clip,
    ),
    OpDescriptor {
        tag: "Gemm",
        schema: GEMM,
        reference: reference::gemm,
        execution: Execution::IntegerGemm,
    },
    // Same contract as Gemm, exposed under the torch layer name
    OpDescriptor {
        tag: "Linear",
        schema: GEMM,
        reference: reference::gemm,
        execution: Execution::IntegerGemm,
    },
    float_domain("Tanh", UNARY, reference::tanh),
    float_domain("Softplus", UNARY, reference::softplus),
    float_domain("Exp", UNARY, reference::exp),
];

type Index = BTreeMap<&'static str, &'static OpDescriptor>;

static REGISTRY: LazyLock<std::result::Result<Index, String>> =
    LazyLock::new(|| build_index(OPERATORS));

fn build_index(table: &'static [OpDescriptor]) -> std::result::Result<Index, String> {
    let mut index = Index::new();
    for descriptor in table {
        descriptor
            .schema
            .validate()
            .map_err(|e| format!("operator {}: {e}", descriptor.tag))?;
        if index.insert(descriptor.tag, descriptor).is_some() {
            return Err(format!("operator {} registered twice", descriptor.tag));
        }
    }
    tracing::debug!(count = index.len(), "operator registry initialised");
    Ok(index)
}

fn index() -> Result<&'static Index> {
    REGISTRY
        .as_ref()
        .map_err(|e| Error::ConfigError(format!("invalid operator registry: {e}")))
}

/// Look up an operator type by tag
pub fn lookup(tag: &str) -> Result<&'static OpDescriptor> {
    let index = index()?;
    index.get(tag).copied().ok_or_else(|| {
        Error::ConfigError(format!(
            "unknown operator '{tag}'. Registered operators: {}",
            index.keys().copied().collect::<Vec<_>>().join(", ")
        ))
    })
}

/// All registered operators, sorted by tag
pub fn registered_ops() -> Result<Vec<&'static OpDescriptor>> {
    Ok(index()?.values().copied().collect())
}

pub fn is_registered(tag: &str) -> bool {
    index().map(|i| i.contains_key(tag)).unwrap_or(false)
}
