//! Observation and action records exchanged with a policy
//!
//! Observation fields are kept in alphabetical order; a flattened
//! observation is the concatenation of its fields in that order, and its
//! width always equals the declared space's `flat_width`.

use serde::{Deserialize, Serialize};

use crate::actions::component::ActionDims;
use crate::core::error::{CraftError, Result};

/// Dense row-major array of `f32`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl Tensor {
    pub fn zeros(shape: &[usize]) -> Self {
        Self::filled(shape, 0.0)
    }

    pub fn filled(shape: &[usize], value: f32) -> Self {
        Self {
            shape: shape.to_vec(),
            data: vec![value; shape.iter().product()],
        }
    }

    pub fn from_vec(data: Vec<f32>) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn offset(&self, index: &[usize]) -> usize {
        debug_assert_eq!(index.len(), self.shape.len());
        index
            .iter()
            .zip(&self.shape)
            .fold(0, |offset, (i, dim)| offset * dim + i)
    }

    pub fn get(&self, index: &[usize]) -> f32 {
        self.data[self.offset(index)]
    }

    pub fn set(&mut self, index: &[usize], value: f32) {
        let offset = self.offset(index);
        self.data[offset] = value;
    }

    /// Rows along the first axis
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        let width = self.shape.iter().skip(1).product::<usize>().max(1);
        self.data.chunks(width)
    }
}

/// A record of named tensors in alphabetical field order
pub trait TensorRecord {
    fn fields(&self) -> Vec<(&'static str, &Tensor)>;

    fn flatten(&self) -> Vec<f32> {
        self.fields()
            .into_iter()
            .flat_map(|(_, tensor)| tensor.data.iter().copied())
            .collect()
    }
}

/// Build-order environment observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// `[rows, width]`, 1 where the code must be masked
    pub action_mask: Tensor,
    /// `[W², rows]` legal gate-opening vectors, padded with -1
    pub gate_openers: Tensor,
    /// `[L]`, 1 on padding lines
    pub line_mask: Tensor,
    /// `[L, 2]`, `[1 + required, 1 + building code]` per line
    pub lines: Tensor,
    /// `[B + 1 + 2 + N, W, W]`: buildings, pending, resources, workers
    pub obs: Tensor,
    /// `[N + 2]` worker bits, building code, coord code
    pub partial_action: Tensor,
    pub ptr: Tensor,
    /// `[2]` minerals, gas
    pub resources: Tensor,
}

impl Observation {
    pub const FIELD_NAMES: [&'static str; 8] = [
        "action_mask",
        "gate_openers",
        "line_mask",
        "lines",
        "obs",
        "partial_action",
        "ptr",
        "resources",
    ];
}

impl TensorRecord for Observation {
    fn fields(&self) -> Vec<(&'static str, &Tensor)> {
        let tensors = [
            &self.action_mask,
            &self.gate_openers,
            &self.line_mask,
            &self.lines,
            &self.obs,
            &self.partial_action,
            &self.ptr,
            &self.resources,
        ];
        Self::FIELD_NAMES.into_iter().zip(tensors).collect()
    }
}

/// Declared shape of every observation field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationSpace {
    pub fields: Vec<(String, Vec<usize>)>,
}

impl ObservationSpace {
    /// Shapes for the build-order environment with `lines` observed lines
    pub fn build_order(dims: &ActionDims, lines: usize) -> Self {
        let side = dims.world_size.side();
        let shapes = [
            vec![dims.rows(), dims.row_width()],
            vec![dims.coord_space(), dims.rows()],
            vec![lines],
            vec![lines, 2],
            vec![dims.building_space() + 1 + 2 + dims.num_workers, side, side],
            vec![dims.num_workers + 2],
            vec![1],
            vec![2],
        ];
        Self {
            fields: Observation::FIELD_NAMES
                .iter()
                .map(|name| name.to_string())
                .zip(shapes)
                .collect(),
        }
    }

    pub fn shape(&self, name: &str) -> Option<&[usize]> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, shape)| shape.as_slice())
    }

    pub fn flat_width(&self) -> usize {
        self.fields
            .iter()
            .map(|(_, shape)| shape.iter().product::<usize>())
            .sum()
    }

    /// Whether every field of `record` has its declared shape
    pub fn contains(&self, record: &impl TensorRecord) -> bool {
        let fields = record.fields();
        fields.len() == self.fields.len()
            && fields
                .iter()
                .zip(&self.fields)
                .all(|((name, tensor), (declared, shape))| {
                    name == declared && &tensor.shape == shape && tensor.len() == tensor.shape.iter().product::<usize>()
                })
    }
}

/// Multi-discrete action sizes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSpace {
    pub nvec: Vec<usize>,
}

impl ActionSpace {
    /// `[2L, 2, L]` followed by one entry per input row
    pub fn build_order(dims: &ActionDims, lines: usize) -> Self {
        let mut nvec = vec![2 * lines, 2, lines];
        nvec.extend(std::iter::repeat(dims.row_width()).take(dims.rows()));
        Self { nvec }
    }

    pub fn contains(&self, flat: &[usize]) -> bool {
        flat.len() == self.nvec.len() && flat.iter().zip(&self.nvec).all(|(x, n)| x < n)
    }
}

/// Build-order action: pointer moves, gate, pointer and the input vector
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawAction {
    pub delta: usize,
    pub dg: usize,
    pub ptr: usize,
    /// One code per input row
    pub a: Vec<usize>,
}

impl RawAction {
    /// Split a flat vector `[delta, dg, ptr, a...]`
    pub fn parse(flat: &[usize], dims: &ActionDims) -> Result<Self> {
        let expected = 3 + dims.rows();
        match flat {
            [delta, dg, ptr, a @ ..] if flat.len() == expected => Ok(Self {
                delta: *delta,
                dg: *dg,
                ptr: *ptr,
                a: a.to_vec(),
            }),
            _ => Err(CraftError::ActionLength {
                expected,
                got: flat.len(),
            }),
        }
    }

    pub fn flatten(&self) -> Vec<usize> {
        let mut flat = vec![self.delta, self.dg, self.ptr];
        flat.extend(&self.a);
        flat
    }
}
