pub mod assignment;
pub mod matrix;
pub(crate) mod min_cost_flow;

pub use assignment::{max_weight_assignment, Assignment};
pub use matrix::WeightMatrix;
