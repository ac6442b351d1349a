//! Property tests for YAML pipeline specs

#[cfg(test)]
mod tests {
    use crate::config::schema::*;
    use crate::config::validate::{validate_config, ValidationError};
    use crate::ops::AttrValue;
    use crate::quant::{TensorData, MAX_N_BITS};
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    // ============================================================
    // Arbitrary Generators
    // ============================================================

    fn arb_unary_op() -> impl Strategy<Value = String> {
        prop_oneof!["Relu", "Sigmoid", "Tanh", "Exp", "Softplus", "Elu", "LeakyRelu"]
            .prop_map(String::from)
    }

    fn arb_tensor() -> impl Strategy<Value = TensorData> {
        proptest::collection::vec(1usize..4, 1..3).prop_flat_map(|shape| {
            let len = shape.iter().product::<usize>();
            proptest::collection::vec(-10.0f64..10.0, len)
                .prop_map(move |data| TensorData::new(shape.clone(), data))
        })
    }

    fn arb_layer() -> impl Strategy<Value = LayerSpec> {
        (
            arb_unary_op(),
            proptest::option::of(1u32..=MAX_N_BITS),
            proptest::option::of(0.01f64..2.0),
        )
            .prop_map(|(op, n_bits, alpha)| {
                let mut attrs = BTreeMap::new();
                if let (Some(alpha), true) = (alpha, op == "Elu" || op == "LeakyRelu") {
                    attrs.insert("alpha".to_string(), AttrValue::Float(alpha));
                }
                LayerSpec {
                    op,
                    n_bits,
                    attrs,
                    constants: BTreeMap::new(),
                }
            })
    }

    fn arb_pipeline_spec() -> impl Strategy<Value = PipelineSpec> {
        (
            1u32..=MAX_N_BITS,
            1u32..=MAX_N_BITS,
            proptest::collection::vec(arb_layer(), 1..6),
        )
            .prop_map(|(input_n_bits, n_bits, layers)| PipelineSpec {
                input_n_bits,
                n_bits,
                layers,
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_valid_specs_pass_validation(spec in arb_pipeline_spec()) {
            prop_assert!(validate_config(&spec).is_ok());
        }

        #[test]
        fn prop_yaml_round_trip(spec in arb_pipeline_spec()) {
            let yaml = serde_yaml::to_string(&spec).unwrap();
            let parsed: PipelineSpec = serde_yaml::from_str(&yaml).unwrap();
            prop_assert_eq!(parsed, spec);
        }

        #[test]
        fn prop_out_of_range_bits_rejected(
            spec in arb_pipeline_spec(),
            bits in (MAX_N_BITS + 1)..64,
        ) {
            let mut spec = spec;
            spec.n_bits = bits;
            let is_bits_error = matches!(
                validate_config(&spec),
                Err(ValidationError::InvalidBits { .. })
            );
            prop_assert!(is_bits_error);
        }

        #[test]
        fn prop_constant_round_trip(tensor in arb_tensor(), quantize in any::<bool>()) {
            let constant = ConstantSpec { tensor, quantize };
            let yaml = serde_yaml::to_string(&constant).unwrap();
            let parsed: ConstantSpec = serde_yaml::from_str(&yaml).unwrap();
            prop_assert_eq!(parsed.tensor.to_array().unwrap(), constant.tensor.to_array().unwrap());
            prop_assert_eq!(parsed.quantize, constant.quantize);
        }

        #[test]
        fn prop_truncated_constant_rejected(tensor in arb_tensor()) {
            let mut tensor = tensor;
            tensor.data.pop();
            let mut layer = LayerSpec::new("Clip");
            layer.constants.insert("min".to_string(), ConstantSpec { tensor, quantize: false });
            let spec = PipelineSpec { input_n_bits: 8, n_bits: 8, layers: vec![layer] };
            let is_shape_error = matches!(
                validate_config(&spec),
                Err(ValidationError::ConstantShape { .. })
            );
            prop_assert!(is_shape_error);
        }
    }
}
