//! Name resolution for parsed index notation.
//!
//! A `TensorEnv` maps names in source text to variables. Index variables
//! and tensors are created the first time their name is seen; a tensor's
//! shape comes from the dimensions registered for the index variables of
//! its first access, and its format from any format registered under its
//! name.

use crate::ir::types::{Datatype, Dimension, Format, Type};
use crate::ir::var::{IndexVar, TensorVar};
use crate::utils::errors::{ParseError, ParseErrorKind};
use crate::utils::location::Span;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct TensorEnv {
    dimensions: HashMap<String, Dimension>,
    formats: HashMap<String, Format>,
    datatypes: HashMap<String, Datatype>,
    default_datatype: Datatype,
    tensors: HashMap<String, TensorVar>,
    index_vars: HashMap<String, IndexVar>,
}

impl TensorEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Range of the index variable `name`, used when creating tensors.
    pub fn set_dimension(&mut self, name: &str, dimension: Dimension) {
        self.dimensions.insert(name.to_string(), dimension);
    }

    /// Storage format of the tensor `name`.
    pub fn set_format(&mut self, name: &str, format: Format) {
        self.formats.insert(name.to_string(), format);
    }

    /// Component type of the tensor `name`.
    pub fn set_datatype(&mut self, name: &str, datatype: Datatype) {
        self.datatypes.insert(name.to_string(), datatype);
    }

    /// Component type of tensors without an explicit one.
    pub fn set_default_datatype(&mut self, datatype: Datatype) {
        self.default_datatype = datatype;
    }

    /// Bind `name` to an existing tensor.
    pub fn declare(&mut self, name: &str, tensor: TensorVar) {
        self.tensors.insert(name.to_string(), tensor);
    }

    pub fn tensor(&self, name: &str) -> Option<&TensorVar> {
        self.tensors.get(name)
    }

    /// All tensors seen so far, sorted by name.
    pub fn tensors(&self) -> Vec<(&str, &TensorVar)> {
        let mut tensors: Vec<_> = self.tensors.iter().map(|(n, t)| (n.as_str(), t)).collect();
        tensors.sort_by(|a, b| a.0.cmp(b.0));
        tensors
    }

    /// The index variable called `name`, created on first use.
    pub fn index_var(&mut self, name: &str) -> IndexVar {
        *self
            .index_vars
            .entry(name.to_string())
            .or_insert_with(|| IndexVar::new(name))
    }

    /// The tensor called `name`, created on first use with one mode per
    /// index.
    pub(crate) fn resolve_tensor(
        &mut self,
        name: &str,
        indices: &[String],
        span: Span,
    ) -> Result<TensorVar, ParseError> {
        if let Some(tensor) = self.tensors.get(name) {
            if tensor.order() != indices.len() {
                return Err(order_mismatch(name, tensor.order(), indices.len(), span));
            }
            return Ok(tensor.clone());
        }

        let shape = indices
            .iter()
            .map(|index| self.dimensions.get(index).copied().unwrap_or(Dimension::Variable))
            .collect();
        let datatype = self.datatypes.get(name).copied().unwrap_or(self.default_datatype);
        let format = match self.formats.get(name) {
            Some(format) if format.order() != indices.len() => {
                return Err(order_mismatch(name, format.order(), indices.len(), span));
            }
            Some(format) => format.clone(),
            None => Format::dense(indices.len()),
        };
        let tensor = TensorVar::with_format(name, Type::new(datatype, shape), format);
        self.tensors.insert(name.to_string(), tensor.clone());
        Ok(tensor)
    }
}

fn order_mismatch(name: &str, order: usize, found: usize, span: Span) -> ParseError {
    ParseError {
        message: format!("Tensor {} has order {} but is accessed with {} indices", name, order, found),
        span,
        kind: ParseErrorKind::OrderMismatch,
        expected: vec![order.to_string()],
        found: Some(found.to_string()),
    }
}
