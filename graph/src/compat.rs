//! Tensor size limits of restricted runtimes
//!
//! Proving runtimes cap the number of elements per tensor. The cap applies
//! to a single sample, so a leading symbolic batch dimension is excluded
//! from the count.

use serde::{Deserialize, Serialize};

use crate::runtime::Session;
use crate::types::{Dim, ValueSpec};

/// Element cap used when no limit is configured
pub const DEFAULT_MAX_TENSOR_SIZE: usize = 64;

/// Size check for one declared input or output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorSizeCheck {
    pub name: String,
    pub shape: String,
    /// Per-sample element count; `None` when a non-batch dim is symbolic
    pub elements: Option<usize>,
    pub within_limit: bool,
}

impl TensorSizeCheck {
    pub fn for_spec(spec: &ValueSpec, max_tensor_size: usize) -> Self {
        let elements = per_sample_elements(&spec.dims);
        Self {
            name: spec.name.clone(),
            shape: spec.shape_string(),
            elements,
            within_limit: elements.map_or(false, |n| n <= max_tensor_size),
        }
    }
}

/// Compatibility of a model's interface with a tensor size cap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityReport {
    pub max_tensor_size: usize,
    pub inputs: Vec<TensorSizeCheck>,
    pub outputs: Vec<TensorSizeCheck>,
    pub compatible: bool,
}

impl CompatibilityReport {
    pub fn from_specs(inputs: &[ValueSpec], outputs: &[ValueSpec], max_tensor_size: usize) -> Self {
        let inputs: Vec<TensorSizeCheck> = inputs
            .iter()
            .map(|spec| TensorSizeCheck::for_spec(spec, max_tensor_size))
            .collect();
        let outputs: Vec<TensorSizeCheck> = outputs
            .iter()
            .map(|spec| TensorSizeCheck::for_spec(spec, max_tensor_size))
            .collect();
        let compatible = inputs.iter().chain(outputs.iter()).all(|c| c.within_limit);

        Self {
            max_tensor_size,
            inputs,
            outputs,
            compatible,
        }
    }

    pub fn for_session(session: &Session, max_tensor_size: usize) -> Self {
        Self::from_specs(session.inputs(), session.outputs(), max_tensor_size)
    }

    /// Checks that exceed the cap
    pub fn violations(&self) -> impl Iterator<Item = &TensorSizeCheck> {
        self.inputs
            .iter()
            .chain(self.outputs.iter())
            .filter(|c| !c.within_limit)
    }
}

fn per_sample_elements(dims: &[Dim]) -> Option<usize> {
    let rest = match dims.split_first() {
        Some((first, rest)) if first.is_symbolic() => rest,
        _ => dims,
    };

    rest.iter().try_fold(1usize, |acc, dim| match dim {
        Dim::Fixed(n) => Some(acc * n),
        Dim::Symbolic(_) => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataType;

    #[test]
    fn test_batch_dim_is_excluded() {
        let spec = ValueSpec::new("input", DataType::Float, vec![Dim::batch(), Dim::Fixed(60)]);
        let check = TensorSizeCheck::for_spec(&spec, DEFAULT_MAX_TENSOR_SIZE);
        assert_eq!(check.elements, Some(60));
        assert!(check.within_limit);
    }

    #[test]
    fn test_oversized_and_unknown_dims_fail() {
        let wide = ValueSpec::new("x", DataType::Float, vec![Dim::batch(), Dim::Fixed(65)]);
        let open = ValueSpec::new(
            "y",
            DataType::Float,
            vec![Dim::batch(), Dim::Symbolic("n".to_string())],
        );

        let report = CompatibilityReport::from_specs(&[wide], &[open], 64);
        assert!(!report.compatible);
        assert_eq!(report.violations().count(), 2);
        assert_eq!(report.outputs[0].elements, None);
    }

    #[test]
    fn test_fixed_batch_counts_fully() {
        let spec = ValueSpec::new("x", DataType::Int64, vec![Dim::Fixed(2), Dim::Fixed(40)]);
        assert_eq!(TensorSizeCheck::for_spec(&spec, 64).elements, Some(80));
    }
}
