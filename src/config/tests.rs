//! Integration tests for config module

use super::*;
use crate::ops::{AttrValue, ConstantInput};
use ndarray::arr2;
use std::io::Write;
use tempfile::NamedTempFile;

const MLP: &str = r#"
input_n_bits: 8
n_bits: 8
layers:
  - op: Gemm
    attrs: { transB: 1 }
    constants:
      b: { shape: [2, 2], data: [1, 0, 0, 1] }
      c: { shape: [2], data: [0.5, -0.5], quantize: false }
  - op: LeakyRelu
    attrs: { alpha: 0.1 }
"#;

#[test]
fn test_end_to_end_config_loading() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(MLP.as_bytes()).unwrap();

    let spec = load_config(temp_file.path()).unwrap();
    assert_eq!(spec.layers.len(), 2);
    assert_eq!(spec.layers[0].attrs["transB"], AttrValue::Int(1));
    assert!(spec.layers[0].constants["b"].quantize);
    assert!(!spec.layers[0].constants["c"].quantize);

    let pipeline = build_pipeline(&spec).unwrap();
    let gemm = &pipeline.layers()[0];
    assert!(matches!(gemm.constant_inputs()[&1], ConstantInput::Quantized(_)));
    assert_eq!(
        pipeline.layers()[1].attrs().get("alpha"),
        Some(&AttrValue::Float(0.1))
    );
}

#[test]
fn test_config_pipeline_calibrates() {
    let spec = parse_config(MLP).unwrap();
    let mut pipeline = build_pipeline(&spec).unwrap();

    let sample = arr2(&[[1.0, -2.0], [0.0, 3.0]]).into_dyn();
    let float_out = pipeline.calibrate(&sample).unwrap();
    // identity weights: x + c, then leaky relu
    assert_eq!(float_out, arr2(&[[1.5, -0.25], [0.5, 2.5]]).into_dyn());
}

#[test]
fn test_minimal_config() {
    let spec = parse_config("layers:\n  - op: Exp\n").unwrap();

    // Check defaults are applied
    assert_eq!(spec.input_n_bits, 8);
    assert_eq!(spec.n_bits, 8);
    assert!(spec.layers[0].attrs.is_empty());
    assert!(spec.layers[0].constants.is_empty());
}

#[test]
fn test_unknown_attr_rejected_at_build() {
    let spec = parse_config("layers:\n  - op: Relu\n    attrs: { alpha: 0.5 }\n").unwrap();
    assert!(build_pipeline(&spec).is_err());
}

#[test]
fn test_gemm_float_weights_rejected_at_build() {
    let yaml = r#"
layers:
  - op: Gemm
    constants:
      b: { shape: [1, 1], data: [2.0], quantize: false }
"#;
    let spec = parse_config(yaml).unwrap();
    let err = build_pipeline(&spec).unwrap_err();
    assert!(err.to_string().contains("quantized weights"));
}

#[test]
fn test_spec_yaml_round_trip() {
    let spec = parse_config(MLP).unwrap();
    let yaml = serde_yaml::to_string(&spec).unwrap();
    assert_eq!(parse_config(&yaml).unwrap(), spec);
}
