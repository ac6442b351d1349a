//! Calibratable quantized operator
//!
//! A [`QuantizedOp`] wraps one registered reference implementation. Its life
//! cycle has two phases:
//!
//! 1. `calibrate` runs the float implementation on representative samples and
//!    fixes the output scale and zero point (exactly once).
//! 2. `apply` consumes [`QuantizedArray`] inputs and produces a quantized
//!    output, either through the float domain (activations, which later become
//!    table lookups) or through the integer Gemm algorithm.

use super::attrs::{type_mismatch, AttrValue, Attrs};
use super::gemm;
use super::registry::{self, Execution, OpDescriptor};
use super::schema::OpSchema;
use crate::error::{Error, Result};
use crate::quant::{calibrate_min_max, check_n_bits, QuantParams, QuantizedArray};
use ndarray::{Array, ArrayD, Dimension};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// Value bound to an input slot at construction time
#[derive(Clone, Debug, PartialEq)]
pub enum ConstantInput {
    /// Pre-quantized tensor, e.g. layer weights
    Quantized(QuantizedArray),
    /// Plain float tensor, e.g. a Clip bound
    Float(ArrayD<f64>),
}

impl ConstantInput {
    /// Value seen by the reference float implementation
    pub fn float_values(&self) -> Cow<'_, ArrayD<f64>> {
        match self {
            ConstantInput::Quantized(q) => q.values(),
            ConstantInput::Float(values) => Cow::Borrowed(values),
        }
    }

    pub fn as_quantized(&self) -> Option<&QuantizedArray> {
        match self {
            ConstantInput::Quantized(q) => Some(q),
            ConstantInput::Float(_) => None,
        }
    }
}

impl From<QuantizedArray> for ConstantInput {
    fn from(q: QuantizedArray) -> Self {
        ConstantInput::Quantized(q)
    }
}

impl<D: Dimension> From<Array<f64, D>> for ConstantInput {
    fn from(values: Array<f64, D>) -> Self {
        ConstantInput::Float(values.into_dyn())
    }
}

/// Reference to an input slot, by schema name or position
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum InputRef {
    Name(String),
    Index(usize),
}

impl From<&str> for InputRef {
    fn from(name: &str) -> Self {
        InputRef::Name(name.to_string())
    }
}

impl From<String> for InputRef {
    fn from(name: String) -> Self {
        InputRef::Name(name)
    }
}

impl From<usize> for InputRef {
    fn from(index: usize) -> Self {
        InputRef::Index(index)
    }
}

impl fmt::Display for InputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputRef::Name(name) => write!(f, "'{name}'"),
            InputRef::Index(index) => write!(f, "#{index}"),
        }
    }
}

/// Content of an assembled input slot
#[derive(Debug)]
pub(crate) enum Slot<'a, T> {
    /// Supplied at call time
    Runtime(T),
    /// Bound at construction time
    Constant(&'a ConstantInput),
}

/// Calibration phase of an operator
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CalibrationState {
    Uncalibrated,
    Calibrated(QuantParams),
}

/// Quantized operator instance
#[derive(Clone, Debug)]
pub struct QuantizedOp {
    descriptor: &'static OpDescriptor,
    n_bits: u32,
    constant_inputs: BTreeMap<usize, ConstantInput>,
    attrs: Attrs,
    state: CalibrationState,
}

impl QuantizedOp {
    /// Instantiate the operator registered under `tag`
    ///
    /// Constant input keys may be schema names or slot indices; attributes
    /// must be declared by the schema and are merged over its defaults.
    pub fn new<C, A>(tag: &str, n_bits: u32, constant_inputs: C, attrs: A) -> Result<Self>
    where
        C: IntoIterator<Item = (InputRef, ConstantInput)>,
        A: IntoIterator<Item = (String, AttrValue)>,
    {
        let descriptor = registry::lookup(tag)?;
        let schema = &descriptor.schema;
        check_n_bits(n_bits)?;

        let mut constants = BTreeMap::new();
        for (key, value) in constant_inputs {
            let index = resolve_input(tag, schema, &key)?;
            if constants.insert(index, value).is_some() {
                return Err(Error::ConfigError(format!(
                    "{tag}: input {key} bound more than once"
                )));
            }
        }

        let mut merged = schema.default_attrs();
        for (name, value) in attrs {
            let spec = schema.attr(&name).ok_or_else(|| {
                let accepted = if schema.attrs.is_empty() {
                    format!("{tag} does not accept attributes.")
                } else {
                    format!("Accepted attributes: {}.", schema.attr_names())
                };
                Error::ConfigError(format!("{tag}: unknown attribute '{name}'. {accepted}"))
            })?;
            let value = value
                .coerce_like(&spec.default)
                .ok_or_else(|| type_mismatch(tag, &name, &value, &spec.default))?;
            merged.insert(name, value);
        }

        if descriptor.execution == Execution::IntegerGemm {
            gemm::validate_config(tag, &merged, &constants)?;
        }

        tracing::debug!(
            op = tag,
            n_bits,
            constants = constants.len(),
            "quantized operator created"
        );

        Ok(Self {
            descriptor,
            n_bits,
            constant_inputs: constants,
            attrs: merged,
            state: CalibrationState::Uncalibrated,
        })
    }

    /// Start building an operator
    pub fn builder(tag: impl Into<String>, n_bits: u32) -> OpBuilder {
        OpBuilder {
            tag: tag.into(),
            n_bits,
            constants: Vec::new(),
            attrs: Vec::new(),
        }
    }

    /// Quantized equivalent of a torch `Linear` layer: `x @ weights + bias`
    ///
    /// `weights` is laid out `[in_features, out_features]`.
    pub fn linear(
        n_bits: u32,
        weights: QuantizedArray,
        bias: Option<QuantizedArray>,
    ) -> Result<Self> {
        let mut constants = vec![(InputRef::from("b"), ConstantInput::from(weights))];
        if let Some(bias) = bias {
            constants.push((InputRef::from("c"), ConstantInput::from(bias)));
        }
        Self::new("Linear", n_bits, constants, std::iter::empty())
    }

    /// Run the float implementation on samples and fix the output quantization
    ///
    /// Returns the float output so downstream operators can calibrate on
    /// realistic ranges. Calibrating twice is a state error.
    pub fn calibrate(&mut self, samples: &[ArrayD<f64>]) -> Result<ArrayD<f64>> {
        if let CalibrationState::Calibrated(_) = self.state {
            return Err(Error::StateError(format!(
                "{} is already calibrated; recalibration is not supported",
                self.tag()
            )));
        }

        let output = self.call_reference(samples.to_vec())?;
        let params = calibrate_min_max(&output, self.n_bits)?;
        self.state = CalibrationState::Calibrated(params);

        tracing::debug!(
            op = self.tag(),
            scale = params.scale,
            zero_point = params.zero_point,
            "operator calibrated"
        );

        Ok(output)
    }

    /// Quantized forward pass
    pub fn apply(&self, inputs: &[&QuantizedArray]) -> Result<QuantizedArray> {
        let output = self.output_params()?;
        tracing::trace!(op = self.tag(), inputs = inputs.len(), "apply");

        match self.descriptor.execution {
            Execution::FloatDomain => self.apply_float_domain(inputs, output),
            Execution::IntegerGemm => gemm::q_impl(self, inputs, output),
        }
    }

    fn apply_float_domain(
        &self,
        inputs: &[&QuantizedArray],
        output: QuantParams,
    ) -> Result<QuantizedArray> {
        let floats = inputs.iter().map(|q| q.dequant()).collect();
        let result = self.call_reference(floats)?;
        if let Some(bad) = result.iter().find(|v| v.is_nan()) {
            return Err(Error::RangeError(format!("{} produced {bad}", self.tag())));
        }
        QuantizedArray::from_quantized_with_params(output.quantize(&result), output)
    }

    /// Assemble inputs and run the reference implementation in float space
    fn call_reference(&self, runtime: Vec<ArrayD<f64>>) -> Result<ArrayD<f64>> {
        let inputs: Vec<Option<ArrayD<f64>>> = self
            .prepare_inputs(runtime)?
            .into_iter()
            .map(|slot| {
                slot.map(|slot| match slot {
                    Slot::Runtime(values) => values,
                    Slot::Constant(constant) => constant.float_values().into_owned(),
                })
            })
            .collect();

        let mut outputs = (self.descriptor.reference)(&inputs, &self.attrs)?;
        if outputs.len() != 1 {
            return Err(Error::ConfigError(format!(
                "{}: only single-output operators are supported, got {} outputs",
                self.tag(),
                outputs.len()
            )));
        }
        Ok(outputs.remove(0))
    }

    /// Place constants at their bound slots, then fill the remaining slots
    /// left to right with the runtime inputs
    pub(crate) fn prepare_inputs<T>(&self, runtime: Vec<T>) -> Result<Vec<Option<Slot<'_, T>>>> {
        let schema = self.schema();
        let total = schema.num_inputs();
        let required = schema.num_required();
        let provided = runtime.len() + self.constant_inputs.len();

        if provided < required || provided > total {
            return Err(Error::ArityError {
                min: required,
                max: total,
                got: provided,
            });
        }

        let mut slots: Vec<Option<Slot<'_, T>>> = (0..total).map(|_| None).collect();
        for (&index, constant) in &self.constant_inputs {
            slots[index] = Some(Slot::Constant(constant));
        }

        let mut next = 0;
        for value in runtime {
            while slots[next].is_some() {
                next += 1;
            }
            slots[next] = Some(Slot::Runtime(value));
            next += 1;
        }

        if let Some(missing) = schema
            .inputs
            .iter()
            .zip(&slots)
            .find(|(spec, slot)| spec.required && slot.is_none())
        {
            tracing::debug!(op = self.tag(), input = missing.0.name, "required slot left empty");
            return Err(Error::ArityError {
                min: required,
                max: total,
                got: provided,
            });
        }

        Ok(slots)
    }

    pub fn tag(&self) -> &'static str {
        self.descriptor.tag
    }

    pub fn schema(&self) -> &'static OpSchema {
        &self.descriptor.schema
    }

    pub fn descriptor(&self) -> &'static OpDescriptor {
        self.descriptor
    }

    pub fn n_bits(&self) -> u32 {
        self.n_bits
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    pub fn constant_inputs(&self) -> &BTreeMap<usize, ConstantInput> {
        &self.constant_inputs
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    pub fn is_calibrated(&self) -> bool {
        matches!(self.state, CalibrationState::Calibrated(_))
    }

    /// Output quantization; a state error before calibration
    pub fn output_params(&self) -> Result<QuantParams> {
        match self.state {
            CalibrationState::Calibrated(params) => Ok(params),
            CalibrationState::Uncalibrated => Err(Error::StateError(format!(
                "{} is not calibrated; call calibrate with sample data first",
                self.tag()
            ))),
        }
    }

    pub fn output_scale(&self) -> Result<f64> {
        Ok(self.output_params()?.scale)
    }

    pub fn output_zero_point(&self) -> Result<i64> {
        Ok(self.output_params()?.zero_point)
    }

    /// Restore calibration from persisted state
    pub(crate) fn restore_calibration(&mut self, params: QuantParams) -> Result<()> {
        if params.n_bits != self.n_bits {
            return Err(Error::RangeError(format!(
                "{}: output n_bits {} does not match operator n_bits {}",
                self.tag(),
                params.n_bits,
                self.n_bits
            )));
        }
        self.state = CalibrationState::Calibrated(params);
        Ok(())
    }
}

fn resolve_input(tag: &str, schema: &OpSchema, key: &InputRef) -> Result<usize> {
    let index = match key {
        InputRef::Name(name) => schema.input_index(name),
        InputRef::Index(index) => Some(*index).filter(|&i| i < schema.num_inputs()),
    };
    index.ok_or_else(|| {
        Error::ConfigError(format!(
            "{tag}: invalid constant input {key}. Valid inputs: {}",
            schema.input_names()
        ))
    })
}

/// Builder for [`QuantizedOp`]
#[derive(Debug)]
pub struct OpBuilder {
    tag: String,
    n_bits: u32,
    constants: Vec<(InputRef, ConstantInput)>,
    attrs: Vec<(String, AttrValue)>,
}

impl OpBuilder {
    /// Bind a constant to an input slot
    pub fn constant(mut self, input: impl Into<InputRef>, value: impl Into<ConstantInput>) -> Self {
        self.constants.push((input.into(), value.into()));
        self
    }

    /// Set an attribute
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    pub fn build(self) -> Result<QuantizedOp> {
        QuantizedOp::new(&self.tag, self.n_bits, self.constants, self.attrs)
    }
}
