//! Element types, dimensions and typed value descriptions

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};
use crate::proto::{
    tensor_shape_proto::{dimension, Dimension},
    type_proto, TensorShapeProto, TypeProto, ValueInfoProto,
};

/// Tensor element types used by the builders (`TensorProto.DataType`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Float,
    Int64,
    Bool,
}

impl DataType {
    /// Wire value in `TensorProto.DataType`
    pub fn code(&self) -> i32 {
        match self {
            DataType::Float => 1,
            DataType::Int64 => 7,
            DataType::Bool => 9,
        }
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Float => "float32",
            DataType::Int64 => "int64",
            DataType::Bool => "bool",
        }
    }
}

impl TryFrom<i32> for DataType {
    type Error = GraphError;

    fn try_from(code: i32) -> Result<Self> {
        match code {
            1 => Ok(DataType::Float),
            7 => Ok(DataType::Int64),
            9 => Ok(DataType::Bool),
            other => Err(GraphError::UnsupportedDataType(other)),
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A declared tensor dimension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dim {
    /// Fixed extent
    Fixed(usize),
    /// Named free dimension, resolved at run time
    Symbolic(String),
}

impl Dim {
    /// The conventional dynamic batch dimension
    pub fn batch() -> Self {
        Dim::Symbolic("batch_size".to_string())
    }

    pub fn is_symbolic(&self) -> bool {
        matches!(self, Dim::Symbolic(_))
    }

    fn to_proto(&self) -> Dimension {
        let value = match self {
            Dim::Fixed(n) => dimension::Value::DimValue(*n as i64),
            Dim::Symbolic(name) => dimension::Value::DimParam(name.clone()),
        };
        Dimension {
            denotation: String::new(),
            value: Some(value),
        }
    }

    fn from_proto(dim: &Dimension) -> Self {
        match &dim.value {
            Some(dimension::Value::DimValue(n)) if *n >= 0 => Dim::Fixed(*n as usize),
            Some(dimension::Value::DimParam(name)) => Dim::Symbolic(name.clone()),
            _ => Dim::Symbolic(String::new()),
        }
    }
}

impl std::fmt::Display for Dim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dim::Fixed(n) => write!(f, "{}", n),
            Dim::Symbolic(name) if name.is_empty() => write!(f, "?"),
            Dim::Symbolic(name) => write!(f, "{}", name),
        }
    }
}

/// Typed description of a graph input or output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueSpec {
    pub name: String,
    pub data_type: DataType,
    pub dims: Vec<Dim>,
}

impl ValueSpec {
    pub fn new<S: Into<String>>(name: S, data_type: DataType, dims: Vec<Dim>) -> Self {
        Self {
            name: name.into(),
            data_type,
            dims,
        }
    }

    /// Encode as a `ValueInfoProto` with a tensor type
    pub fn to_proto(&self) -> ValueInfoProto {
        ValueInfoProto {
            name: self.name.clone(),
            r#type: Some(TypeProto {
                denotation: String::new(),
                value: Some(type_proto::Value::TensorType(type_proto::Tensor {
                    elem_type: self.data_type.code(),
                    shape: Some(TensorShapeProto {
                        dim: self.dims.iter().map(Dim::to_proto).collect(),
                    }),
                })),
            }),
            doc_string: String::new(),
        }
    }

    /// Decode from a `ValueInfoProto`; only tensor types are accepted
    pub fn from_proto(info: &ValueInfoProto) -> Result<Self> {
        let tensor = match info.r#type.as_ref().and_then(|t| t.value.as_ref()) {
            Some(type_proto::Value::TensorType(tensor)) => tensor,
            None => {
                return Err(GraphError::invalid_tensor(
                    info.name.as_str(),
                    "value has no tensor type",
                ))
            }
        };

        let data_type = DataType::try_from(tensor.elem_type)?;
        let dims = tensor
            .shape
            .as_ref()
            .map(|shape| shape.dim.iter().map(Dim::from_proto).collect())
            .unwrap_or_default();

        Ok(Self::new(info.name.clone(), data_type, dims))
    }

    /// Render the shape as `[batch_size, 60]`
    pub fn shape_string(&self) -> String {
        let dims: Vec<String> = self.dims.iter().map(|d| d.to_string()).collect();
        format!("[{}]", dims.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_codes() {
        for dt in [DataType::Float, DataType::Int64, DataType::Bool] {
            assert_eq!(DataType::try_from(dt.code()).unwrap(), dt);
        }
        assert!(DataType::try_from(8).is_err()); // STRING
    }

    #[test]
    fn test_value_spec_proto_conversion() {
        let spec = ValueSpec::new("tokens", DataType::Int64, vec![Dim::batch(), Dim::Fixed(60)]);
        let decoded = ValueSpec::from_proto(&spec.to_proto()).unwrap();

        assert_eq!(decoded, spec);
        assert_eq!(decoded.shape_string(), "[batch_size, 60]");
    }
}
