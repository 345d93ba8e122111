pub mod call;
pub mod evaluation;
pub mod result;
