//! Neural Network inference.
//!
//! Models are loaded from ONNX files and executed on the CPU by [`tract`][tract_onnx].

pub mod tensor;

use tensor::Tensor;
use tract_onnx::prelude::{
    tvec, Datum, Framework, Graph, InferenceFact, InferenceModelExt, SimplePlan, TValue, TVec,
    TypedFact, TypedOp,
};

use std::{borrow::Cow, path::Path, sync::Arc};

use anyhow::Context;

type Model = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Neural network loader.
pub struct Loader<'a> {
    model_data: Cow<'a, [u8]>,
    input_shape: Option<Vec<usize>>,
}

impl<'a> Loader<'a> {
    fn new(data: Cow<'a, [u8]>) -> Self {
        Self {
            model_data: data,
            input_shape: None,
        }
    }

    /// Pins the shape of the network's first input.
    ///
    /// Networks exported with a symbolic batch dimension (eg. `[N, 42]`) cannot be optimized until
    /// their input shape is known. Passing the concrete shape (eg. `[1, 42]`) here fixes that.
    pub fn with_input_shape<S: Into<Vec<usize>>>(mut self, shape: S) -> Self {
        self.input_shape = Some(shape.into());
        self
    }

    /// Loads and optimizes the network.
    ///
    /// Returns an error if the network data is malformed, if the network data is incomplete, if
    /// the network uses unimplemented operations, or if any of its input or output shapes are not
    /// fully known.
    pub fn load(self) -> anyhow::Result<NeuralNetwork> {
        let mut graph = tract_onnx::onnx()
            .model_for_read(&mut &*self.model_data)
            .context("failed to parse ONNX model")?;
        if let Some(shape) = &self.input_shape {
            graph = graph.with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), shape.clone()),
            )?;
        }
        let graph = graph
            .into_optimized()
            .context("failed to optimize ONNX model")?;

        let inputs = graph
            .input_outlets()?
            .iter()
            .map(|outlet| -> anyhow::Result<_> {
                let fact = graph.outlet_fact(*outlet)?;
                Ok(NodeInfo {
                    name: graph.node(outlet.node).name.clone(),
                    shape: concrete_shape(fact, "input")?,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        let outputs = graph
            .output_outlets()?
            .iter()
            .map(|outlet| -> anyhow::Result<_> {
                let fact = graph.outlet_fact(*outlet)?;
                Ok(NodeInfo {
                    name: graph.node(outlet.node).name.clone(),
                    shape: concrete_shape(fact, "output")?,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let model = SimplePlan::new(graph)?;

        for info in &inputs {
            log::debug!("network input '{}': {:?}", info.name, info.shape);
        }
        for info in &outputs {
            log::debug!("network output '{}': {:?}", info.name, info.shape);
        }

        Ok(NeuralNetwork(Arc::new(NeuralNetworkImpl {
            inner: model,
            inputs,
            outputs,
        })))
    }
}

fn concrete_shape(fact: &TypedFact, what: &str) -> anyhow::Result<Vec<usize>> {
    match fact.shape.as_concrete() {
        Some(shape) => Ok(shape.to_vec()),
        None => anyhow::bail!(
            "network {} has symbolic shape {:?}; pin it with `Loader::with_input_shape`",
            what,
            fact.shape,
        ),
    }
}

/// A neural network that can be used for inference.
///
/// This is a cheaply [`Clone`]able handle to the underlying network structures.
#[derive(Clone)]
pub struct NeuralNetwork(Arc<NeuralNetworkImpl>);

struct NeuralNetworkImpl {
    inner: Model,
    inputs: Vec<NodeInfo>,
    outputs: Vec<NodeInfo>,
}

impl NeuralNetwork {
    /// Loads a pre-trained model from an ONNX file path.
    ///
    /// The path must have a `.onnx` extension.
    pub fn from_path<'a, P: AsRef<Path>>(path: P) -> anyhow::Result<Loader<'a>> {
        Self::from_path_impl(path.as_ref())
    }

    fn from_path_impl<'a>(path: &Path) -> anyhow::Result<Loader<'a>> {
        match path.extension() {
            Some(ext) if ext == "onnx" => {}
            _ => anyhow::bail!(
                "neural network file '{}' must have `.onnx` extension",
                path.display()
            ),
        }

        let model_data = std::fs::read(path)
            .with_context(|| format!("failed to read model file '{}'", path.display()))?;
        Ok(Loader::new(model_data.into()))
    }

    /// Loads a pre-trained model from an in-memory ONNX file.
    pub fn from_onnx(raw: &[u8]) -> Loader<'_> {
        Loader::new(raw.into())
    }

    /// Returns the number of input nodes of the network.
    pub fn num_inputs(&self) -> usize {
        self.0.inputs.len()
    }

    /// Returns the number of output nodes of the network.
    pub fn num_outputs(&self) -> usize {
        self.0.outputs.len()
    }

    /// Returns an iterator over the network's input node information.
    ///
    /// To perform inference, a matching input tensor has to be provided for each input.
    pub fn inputs(&self) -> impl Iterator<Item = &NodeInfo> {
        self.0.inputs.iter()
    }

    /// Returns an iterator over the network's output node information.
    pub fn outputs(&self) -> impl Iterator<Item = &NodeInfo> {
        self.0.outputs.iter()
    }

    /// Runs the network on a set of [`Inputs`], returning the estimated [`Outputs`].
    #[doc(alias = "infer")]
    pub fn estimate(&self, inputs: &Inputs) -> anyhow::Result<Outputs> {
        let inputs = inputs
            .iter()
            .map(|t| Ok(TValue::from_const(Arc::new(t.to_tract()?))))
            .collect::<anyhow::Result<TVec<_>>>()?;
        let outputs = self.0.inner.run(inputs)?;
        let inner = outputs
            .iter()
            .map(|tract| Tensor::from_tract(tract))
            .collect::<anyhow::Result<TVec<_>>>()?;
        Ok(Outputs { inner })
    }
}

/// Information about a neural network input or output node.
#[derive(Debug, Clone)]
pub struct NodeInfo {
    name: String,
    shape: Vec<usize>,
}

impl NodeInfo {
    /// Returns the tensor shape of this node.
    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }
}

/// The result of a neural network inference pass.
///
/// This is a list of tensors corresponding to the network's output nodes.
#[derive(Debug)]
pub struct Outputs {
    inner: TVec<Tensor>,
}

impl Outputs {
    /// Takes ownership of the first output tensor.
    pub fn into_first(self) -> Option<Tensor> {
        self.inner.into_iter().next()
    }
}

/// List of input tensors for neural network inference.
#[derive(Debug)]
pub struct Inputs {
    inner: TVec<Tensor>,
}

impl Inputs {
    /// Returns the number of input tensors stored in `self`.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn iter(&self) -> impl Iterator<Item = &Tensor> {
        self.inner.iter()
    }
}

impl From<Tensor> for Inputs {
    fn from(t: Tensor) -> Self {
        Self { inner: tvec![t] }
    }
}
