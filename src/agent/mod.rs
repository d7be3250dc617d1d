//! Agent I/O: observation tensors, action records and the policy contract

pub mod observation;
pub mod policy;

pub use observation::{ActionSpace, Observation, ObservationSpace, RawAction, Tensor, TensorRecord};
pub use policy::{Policy, PolicyOutput, RandomPolicy, RecurrentState};
