//! Reference implementations of the supported ONNX operators
//!
//! Only the operators the model builders emit are implemented, with the
//! attribute subset they use. Binary element-wise operators follow numpy
//! (multidirectional) broadcasting.

use ndarray::{ArrayD, Axis, Ix2, IxDyn, Zip};

use crate::error::{GraphError, Result};
use crate::proto::{AttributeProto, NodeProto};
use crate::tensor::Tensor;
use crate::types::DataType;

/// Operators the reference runtime can evaluate
pub const SUPPORTED_OPS: &[&str] = &[
    "Add", "Cast", "Div", "Gather", "Gemm", "Greater", "Identity", "MatMul", "Mul",
    "ReduceSum", "Relu", "Sigmoid", "Sub",
];

pub fn is_supported(op_type: &str) -> bool {
    SUPPORTED_OPS.contains(&op_type)
}

/// Evaluate one node. `inputs` is positional; absent optional inputs are `None`.
pub fn evaluate(node: &NodeProto, inputs: &[Option<&Tensor>]) -> Result<Vec<Tensor>> {
    let ctx = NodeContext { node, inputs };

    let output = match node.op_type.as_str() {
        "Add" => ctx.float_binary(|a, b| a + b)?,
        "Sub" => ctx.float_binary(|a, b| a - b)?,
        "Mul" => ctx.float_binary(|a, b| a * b)?,
        "Div" => ctx.float_binary(|a, b| a / b)?,
        "Greater" => ctx.greater()?,
        "Relu" => Tensor::Float(ctx.float_input(0)?.mapv(|v| v.max(0.0))),
        "Sigmoid" => Tensor::Float(ctx.float_input(0)?.mapv(|v| 1.0 / (1.0 + (-v).exp()))),
        "Identity" => ctx.input(0)?.clone(),
        "Cast" => ctx.cast()?,
        "Gather" => ctx.gather()?,
        "ReduceSum" => ctx.reduce_sum()?,
        "Gemm" => ctx.gemm()?,
        "MatMul" => ctx.matmul()?,
        other => {
            return Err(GraphError::UnsupportedOperator {
                op_type: other.to_string(),
            })
        }
    };

    Ok(vec![output])
}

struct NodeContext<'a> {
    node: &'a NodeProto,
    inputs: &'a [Option<&'a Tensor>],
}

impl<'a> NodeContext<'a> {
    fn fail<S: Into<String>>(&self, message: S) -> GraphError {
        GraphError::Evaluation {
            node: self.node.name.clone(),
            op_type: self.node.op_type.clone(),
            message: message.into(),
        }
    }

    fn input(&self, index: usize) -> Result<&'a Tensor> {
        self.inputs
            .get(index)
            .copied()
            .flatten()
            .ok_or_else(|| self.fail(format!("missing input #{}", index)))
    }

    fn optional_input(&self, index: usize) -> Option<&'a Tensor> {
        self.inputs.get(index).copied().flatten()
    }

    fn float_input(&self, index: usize) -> Result<&'a ArrayD<f32>> {
        self.input(index)?
            .as_float()
            .map_err(|e| self.fail(format!("input #{}: {}", index, e)))
    }

    fn attribute(&self, name: &str) -> Option<&'a AttributeProto> {
        self.node.attribute.iter().find(|a| a.name == name)
    }

    fn attr_i(&self, name: &str, default: i64) -> i64 {
        self.attribute(name).and_then(|a| a.i).unwrap_or(default)
    }

    fn attr_f(&self, name: &str, default: f32) -> f32 {
        self.attribute(name).and_then(|a| a.f).unwrap_or(default)
    }

    fn float_binary(&self, op: impl Fn(f32, f32) -> f32) -> Result<Tensor> {
        let a = self.float_input(0)?;
        let b = self.float_input(1)?;
        let out = self.zip_broadcast(a, b, |x, y| op(*x, *y))?;
        Ok(Tensor::Float(out))
    }

    fn greater(&self) -> Result<Tensor> {
        let out = match (self.input(0)?, self.input(1)?) {
            (Tensor::Float(a), Tensor::Float(b)) => self.zip_broadcast(a, b, |x, y| x > y)?,
            (Tensor::Int64(a), Tensor::Int64(b)) => self.zip_broadcast(a, b, |x, y| x > y)?,
            (a, b) => {
                return Err(self.fail(format!(
                    "incompatible operand types {} and {}",
                    a.data_type(),
                    b.data_type()
                )))
            }
        };
        Ok(Tensor::Bool(out))
    }

    fn zip_broadcast<A, B, C>(
        &self,
        a: &ArrayD<A>,
        b: &ArrayD<B>,
        f: impl Fn(&A, &B) -> C,
    ) -> Result<ArrayD<C>> {
        let shape = broadcast_shape(a.shape(), b.shape()).ok_or_else(|| {
            self.fail(format!(
                "cannot broadcast {:?} with {:?}",
                a.shape(),
                b.shape()
            ))
        })?;

        let a_view = a
            .broadcast(shape.as_slice())
            .ok_or_else(|| self.fail("left operand broadcast failed"))?;
        let b_view = b
            .broadcast(shape.as_slice())
            .ok_or_else(|| self.fail("right operand broadcast failed"))?;

        Ok(Zip::from(&a_view).and(&b_view).map_collect(|x, y| f(x, y)))
    }

    fn cast(&self) -> Result<Tensor> {
        let to = i32::try_from(self.attr_i("to", 0))
            .map_err(|_| self.fail("cast target out of range"))
            .and_then(|code| DataType::try_from(code).map_err(|e| self.fail(e.to_string())))?;

        let out = match (self.input(0)?, to) {
            (t, target) if t.data_type() == target => t.clone(),
            (Tensor::Float(a), DataType::Int64) => Tensor::Int64(a.mapv(|v| v as i64)),
            (Tensor::Float(a), DataType::Bool) => Tensor::Bool(a.mapv(|v| v != 0.0)),
            (Tensor::Int64(a), DataType::Float) => Tensor::Float(a.mapv(|v| v as f32)),
            (Tensor::Int64(a), DataType::Bool) => Tensor::Bool(a.mapv(|v| v != 0)),
            (Tensor::Bool(a), DataType::Float) => Tensor::Float(a.mapv(|v| v as u8 as f32)),
            (Tensor::Bool(a), DataType::Int64) => Tensor::Int64(a.mapv(|v| v as i64)),
            (t, target) => {
                return Err(self.fail(format!("cannot cast {} to {}", t.data_type(), target)))
            }
        };
        Ok(out)
    }

    fn gather(&self) -> Result<Tensor> {
        if self.attr_i("axis", 0) != 0 {
            return Err(self.fail("only axis 0 is supported"));
        }
        let indices = self
            .input(1)?
            .as_int64()
            .map_err(|e| self.fail(format!("indices: {}", e)))?;

        let gathered = match self.input(0)? {
            Tensor::Float(data) => gather_rows(data, indices).map(Tensor::Float),
            Tensor::Int64(data) => gather_rows(data, indices).map(Tensor::Int64),
            Tensor::Bool(data) => gather_rows(data, indices).map(Tensor::Bool),
        };
        gathered.map_err(|message| self.fail(message))
    }

    fn reduce_sum(&self) -> Result<Tensor> {
        let data = self.float_input(0)?;
        let rank = data.ndim() as i64;

        // Opset 13 moved `axes` from an attribute to an optional input
        let raw_axes: Vec<i64> = match self.optional_input(1) {
            Some(axes) => axes
                .as_int64()
                .map_err(|e| self.fail(format!("axes: {}", e)))?
                .iter()
                .copied()
                .collect(),
            None => self
                .attribute("axes")
                .map(|a| a.ints.clone())
                .unwrap_or_default(),
        };

        let mut axes = Vec::with_capacity(raw_axes.len());
        for axis in raw_axes {
            let normalized = if axis < 0 { axis + rank } else { axis };
            if normalized < 0 || normalized >= rank {
                return Err(self.fail(format!("axis {} out of range for rank {}", axis, rank)));
            }
            axes.push(normalized as usize);
        }
        if axes.is_empty() {
            axes = (0..data.ndim()).collect();
        }
        axes.sort_unstable();
        axes.dedup();

        let mut out = data.clone();
        for &axis in axes.iter().rev() {
            out = out.sum_axis(Axis(axis));
        }
        if self.attr_i("keepdims", 1) != 0 {
            for &axis in &axes {
                out = out.insert_axis(Axis(axis));
            }
        }

        Ok(Tensor::Float(out))
    }

    fn gemm(&self) -> Result<Tensor> {
        let a = self.matrix(0)?;
        let b = self.matrix(1)?;
        let a = if self.attr_i("transA", 0) != 0 { a.reversed_axes() } else { a };
        let b = if self.attr_i("transB", 0) != 0 { b.reversed_axes() } else { b };

        if a.ncols() != b.nrows() {
            return Err(self.fail(format!(
                "inner dimensions differ: {:?} x {:?}",
                a.shape(),
                b.shape()
            )));
        }

        let alpha = self.attr_f("alpha", 1.0);
        let beta = self.attr_f("beta", 1.0);

        let mut y = a.dot(&b);
        if alpha != 1.0 {
            y.mapv_inplace(|v| v * alpha);
        }

        if let Some(c) = self.optional_input(2) {
            let c = c.as_float().map_err(|e| self.fail(format!("C: {}", e)))?;
            let c = c
                .broadcast(y.raw_dim())
                .ok_or_else(|| self.fail(format!("cannot broadcast C {:?}", c.shape())))?;
            y.zip_mut_with(&c, |acc, bias| *acc += beta * bias);
        }

        Ok(Tensor::Float(y.into_dyn()))
    }

    fn matmul(&self) -> Result<Tensor> {
        let a = self.matrix(0)?;
        let b = self.matrix(1)?;
        if a.ncols() != b.nrows() {
            return Err(self.fail(format!(
                "inner dimensions differ: {:?} x {:?}",
                a.shape(),
                b.shape()
            )));
        }
        Ok(Tensor::Float(a.dot(&b).into_dyn()))
    }

    fn matrix(&self, index: usize) -> Result<ndarray::ArrayView2<'a, f32>> {
        self.float_input(index)?
            .view()
            .into_dimensionality::<Ix2>()
            .map_err(|_| self.fail(format!("input #{} must be rank 2", index)))
    }
}

/// Result shape of numpy-style broadcasting, or `None` if incompatible
pub fn broadcast_shape(a: &[usize], b: &[usize]) -> Option<Vec<usize>> {
    let rank = a.len().max(b.len());
    let mut shape = Vec::with_capacity(rank);

    for i in 0..rank {
        let da = dim_from_right(a, rank, i);
        let db = dim_from_right(b, rank, i);
        let d = match (da, db) {
            (x, y) if x == y => x,
            (1, y) => y,
            (x, 1) => x,
            _ => return None,
        };
        shape.push(d);
    }

    Some(shape)
}

fn dim_from_right(shape: &[usize], rank: usize, i: usize) -> usize {
    let offset = rank - shape.len();
    if i < offset {
        1
    } else {
        shape[i - offset]
    }
}

fn gather_rows<T: Clone>(
    data: &ArrayD<T>,
    indices: &ArrayD<i64>,
) -> std::result::Result<ArrayD<T>, String> {
    if data.ndim() == 0 {
        return Err("cannot gather from a scalar".to_string());
    }

    let rows = data.shape()[0] as i64;
    let row_len: usize = data.shape()[1..].iter().product();
    let mut values = Vec::with_capacity(indices.len() * row_len);

    for &index in indices.iter() {
        let row = if index < 0 { index + rows } else { index };
        if row < 0 || row >= rows {
            return Err(format!("index {} out of range for {} rows", index, rows));
        }
        values.extend(data.index_axis(Axis(0), row as usize).iter().cloned());
    }

    let mut shape = indices.shape().to_vec();
    shape.extend_from_slice(&data.shape()[1..]);
    ArrayD::from_shape_vec(IxDyn(&shape), values).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{attr_int, attr_ints};

    fn node(op_type: &str, attributes: Vec<AttributeProto>) -> NodeProto {
        NodeProto {
            name: format!("{}_test", op_type),
            op_type: op_type.to_string(),
            attribute: attributes,
            ..Default::default()
        }
    }

    fn run(op: &NodeProto, inputs: &[&Tensor]) -> Tensor {
        let inputs: Vec<Option<&Tensor>> = inputs.iter().map(|t| Some(*t)).collect();
        evaluate(op, &inputs).unwrap().remove(0)
    }

    #[test]
    fn test_broadcast_shape() {
        assert_eq!(broadcast_shape(&[4, 60], &[60]), Some(vec![4, 60]));
        assert_eq!(broadcast_shape(&[2, 1], &[]), Some(vec![2, 1]));
        assert_eq!(broadcast_shape(&[3, 1], &[1, 5]), Some(vec![3, 5]));
        assert_eq!(broadcast_shape(&[4, 60], &[59]), None);
    }

    #[test]
    fn test_sub_broadcasts_row_vector() {
        let x = Tensor::float(&[2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let mean = Tensor::float(&[3], vec![1.0, 1.0, 1.0]).unwrap();

        let out = run(&node("Sub", vec![]), &[&x, &mean]);
        assert_eq!(
            out.as_float().unwrap().iter().copied().collect::<Vec<_>>(),
            vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]
        );
    }

    #[test]
    fn test_gather_reduce_sum_greater() {
        let table = Tensor::float(&[4, 1], vec![0.0, 2.0, -3.0, 0.5]).unwrap();
        let tokens = Tensor::int64(&[2, 3], vec![1, 3, 0, 2, 0, 0]).unwrap();

        let gathered = run(&node("Gather", vec![attr_int("axis", 0)]), &[&table, &tokens]);
        assert_eq!(gathered.shape(), &[2, 3, 1]);

        let summed = run(
            &node("ReduceSum", vec![attr_ints("axes", &[1]), attr_int("keepdims", 0)]),
            &[&gathered],
        );
        assert_eq!(summed.shape(), &[2, 1]);
        assert_eq!(summed.as_float().unwrap().as_slice().unwrap(), &[2.5, -3.0]);

        let zero = Tensor::scalar_f32(0.0);
        let label = run(&node("Greater", vec![]), &[&summed, &zero]);
        assert_eq!(label.as_bool().unwrap().as_slice().unwrap(), &[true, false]);
    }

    #[test]
    fn test_gather_rejects_out_of_range() {
        let table = Tensor::float(&[2, 1], vec![1.0, 2.0]).unwrap();
        let tokens = Tensor::int64(&[1, 1], vec![5]).unwrap();
        let result = evaluate(&node("Gather", vec![]), &[Some(&table), Some(&tokens)]);
        assert!(matches!(result, Err(GraphError::Evaluation { .. })));
    }

    #[test]
    fn test_gemm_with_bias() {
        let a = Tensor::float(&[1, 2], vec![1.0, 2.0]).unwrap();
        let b = Tensor::float(&[2, 2], vec![1.0, 0.0, 0.0, 1.0]).unwrap();
        let c = Tensor::float(&[2], vec![0.5, -0.5]).unwrap();

        let y = run(&node("Gemm", vec![]), &[&a, &b, &c]);
        assert_eq!(y.as_float().unwrap().as_slice().unwrap(), &[1.5, 1.5]);
    }

    #[test]
    fn test_relu_and_cast() {
        let x = Tensor::float(&[3], vec![-1.0, 0.0, 2.0]).unwrap();
        let relu = run(&node("Relu", vec![]), &[&x]);
        assert_eq!(relu.as_float().unwrap().as_slice().unwrap(), &[0.0, 0.0, 2.0]);

        let flags = Tensor::bool(&[2], vec![true, false]).unwrap();
        let cast = run(&node("Cast", vec![attr_int("to", DataType::Int64.code() as i64)]), &[&flags]);
        assert_eq!(cast.as_int64().unwrap().as_slice().unwrap(), &[1, 0]);
    }

    #[test]
    fn test_unsupported_operator() {
        let x = Tensor::scalar_f32(1.0);
        let result = evaluate(&node("Softmax", vec![]), &[Some(&x)]);
        assert!(matches!(result, Err(GraphError::UnsupportedOperator { .. })));
    }
}
