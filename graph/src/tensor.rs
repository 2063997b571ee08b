//! Dense runtime tensors and their protobuf encoding

use ndarray::{ArrayD, IxDyn};

use crate::error::{GraphError, Result};
use crate::proto::TensorProto;
use crate::types::DataType;

/// A dense tensor of one of the supported element types
#[derive(Debug, Clone, PartialEq)]
pub enum Tensor {
    Float(ArrayD<f32>),
    Int64(ArrayD<i64>),
    Bool(ArrayD<bool>),
}

impl Tensor {
    /// Build a float tensor from a flat buffer and shape
    pub fn float(shape: &[usize], values: Vec<f32>) -> Result<Self> {
        ArrayD::from_shape_vec(IxDyn(shape), values)
            .map(Tensor::Float)
            .map_err(|e| GraphError::invalid_tensor("float", e.to_string().as_str()))
    }

    /// Build an int64 tensor from a flat buffer and shape
    pub fn int64(shape: &[usize], values: Vec<i64>) -> Result<Self> {
        ArrayD::from_shape_vec(IxDyn(shape), values)
            .map(Tensor::Int64)
            .map_err(|e| GraphError::invalid_tensor("int64", e.to_string().as_str()))
    }

    /// Build a bool tensor from a flat buffer and shape
    pub fn bool(shape: &[usize], values: Vec<bool>) -> Result<Self> {
        ArrayD::from_shape_vec(IxDyn(shape), values)
            .map(Tensor::Bool)
            .map_err(|e| GraphError::invalid_tensor("bool", e.to_string().as_str()))
    }

    /// Rank-0 float tensor
    pub fn scalar_f32(value: f32) -> Self {
        Tensor::Float(ArrayD::from_elem(IxDyn(&[]), value))
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Tensor::Float(_) => DataType::Float,
            Tensor::Int64(_) => DataType::Int64,
            Tensor::Bool(_) => DataType::Bool,
        }
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            Tensor::Float(a) => a.shape(),
            Tensor::Int64(a) => a.shape(),
            Tensor::Bool(a) => a.shape(),
        }
    }

    pub fn len(&self) -> usize {
        self.shape().iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_float(&self) -> Result<&ArrayD<f32>> {
        match self {
            Tensor::Float(a) => Ok(a),
            other => Err(type_mismatch(DataType::Float, other.data_type())),
        }
    }

    pub fn as_int64(&self) -> Result<&ArrayD<i64>> {
        match self {
            Tensor::Int64(a) => Ok(a),
            other => Err(type_mismatch(DataType::Int64, other.data_type())),
        }
    }

    pub fn as_bool(&self) -> Result<&ArrayD<bool>> {
        match self {
            Tensor::Bool(a) => Ok(a),
            other => Err(type_mismatch(DataType::Bool, other.data_type())),
        }
    }

    /// Encode as a named `TensorProto` (typed data fields, no raw_data)
    pub fn to_proto(&self, name: &str) -> TensorProto {
        let mut proto = TensorProto {
            dims: self.shape().iter().map(|&d| d as i64).collect(),
            data_type: self.data_type().code(),
            name: name.to_string(),
            ..Default::default()
        };

        match self {
            Tensor::Float(a) => proto.float_data = a.iter().copied().collect(),
            Tensor::Int64(a) => proto.int64_data = a.iter().copied().collect(),
            Tensor::Bool(a) => proto.int32_data = a.iter().map(|&b| b as i32).collect(),
        }

        proto
    }

    /// Decode a `TensorProto`, accepting either typed fields or little-endian `raw_data`
    pub fn from_proto(proto: &TensorProto) -> Result<Self> {
        let shape: Vec<usize> = proto
            .dims
            .iter()
            .map(|&d| {
                usize::try_from(d).map_err(|_| {
                    GraphError::invalid_tensor(proto.name.as_str(), "negative dimension")
                })
            })
            .collect::<Result<_>>()?;
        let expected: usize = shape.iter().product();

        let tensor = match DataType::try_from(proto.data_type)? {
            DataType::Float => {
                let values = if proto.raw_data.is_empty() {
                    proto.float_data.clone()
                } else {
                    decode_raw(&proto.raw_data, &proto.name, f32::from_le_bytes)?
                };
                check_len(&proto.name, expected, values.len())?;
                Tensor::float(&shape, values)?
            }
            DataType::Int64 => {
                let values = if proto.raw_data.is_empty() {
                    proto.int64_data.clone()
                } else {
                    decode_raw(&proto.raw_data, &proto.name, i64::from_le_bytes)?
                };
                check_len(&proto.name, expected, values.len())?;
                Tensor::int64(&shape, values)?
            }
            DataType::Bool => {
                let values: Vec<bool> = if proto.raw_data.is_empty() {
                    proto.int32_data.iter().map(|&v| v != 0).collect()
                } else {
                    proto.raw_data.iter().map(|&b| b != 0).collect()
                };
                check_len(&proto.name, expected, values.len())?;
                Tensor::bool(&shape, values)?
            }
        };

        Ok(tensor)
    }
}

impl From<ArrayD<f32>> for Tensor {
    fn from(array: ArrayD<f32>) -> Self {
        Tensor::Float(array)
    }
}

impl From<ArrayD<i64>> for Tensor {
    fn from(array: ArrayD<i64>) -> Self {
        Tensor::Int64(array)
    }
}

impl From<ArrayD<bool>> for Tensor {
    fn from(array: ArrayD<bool>) -> Self {
        Tensor::Bool(array)
    }
}

fn type_mismatch(expected: DataType, actual: DataType) -> GraphError {
    GraphError::TypeMismatch {
        name: "tensor".to_string(),
        expected: expected.to_string(),
        actual: actual.to_string(),
    }
}

fn check_len(name: &str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(GraphError::invalid_tensor(
            name.to_string(),
            format!("dims describe {} elements but data holds {}", expected, actual),
        ));
    }
    Ok(())
}

fn decode_raw<T, const N: usize>(
    raw: &[u8],
    name: &str,
    convert: fn([u8; N]) -> T,
) -> Result<Vec<T>> {
    if raw.len() % N != 0 {
        return Err(GraphError::invalid_tensor(
            name.to_string(),
            format!("raw_data length {} is not a multiple of {}", raw.len(), N),
        ));
    }

    Ok(raw
        .chunks_exact(N)
        .map(|chunk| {
            let mut bytes = [0u8; N];
            bytes.copy_from_slice(chunk);
            convert(bytes)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proto_conversion_keeps_values() {
        let tensor = Tensor::float(&[2, 2], vec![1.0, -2.5, 0.0, 3.25]).unwrap();
        let decoded = Tensor::from_proto(&tensor.to_proto("w")).unwrap();
        assert_eq!(decoded, tensor);

        let flags = Tensor::bool(&[3], vec![true, false, true]).unwrap();
        assert_eq!(Tensor::from_proto(&flags.to_proto("b")).unwrap(), flags);
    }

    #[test]
    fn test_raw_data_decoding() {
        let mut raw = Vec::new();
        for v in [1i64, -7, 42] {
            raw.extend_from_slice(&v.to_le_bytes());
        }
        let proto = TensorProto {
            dims: vec![3],
            data_type: DataType::Int64.code(),
            raw_data: raw,
            ..Default::default()
        };

        let tensor = Tensor::from_proto(&proto).unwrap();
        assert_eq!(tensor.as_int64().unwrap().as_slice().unwrap(), &[1, -7, 42]);
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        let proto = TensorProto {
            dims: vec![2, 3],
            data_type: DataType::Float.code(),
            float_data: vec![0.0; 5],
            name: "bad".to_string(),
            ..Default::default()
        };

        let err = Tensor::from_proto(&proto).unwrap_err();
        assert!(err.is_construction_bug());
    }
}
