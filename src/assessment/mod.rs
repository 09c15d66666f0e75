// src/assessment/mod.rs

//! Question model rules: which shapes are valid, how answers are read, and
//! how they are scored. Everything here is pure and synchronous; storage and
//! HTTP live in `store` and `handlers`.

pub mod error;
pub mod grading;
pub mod normalizer;
pub mod registry;
pub mod scorer;
pub mod validator;

pub use error::{InvalidQuestion, QuestionError};
pub use scorer::{Score, Scored, score};
pub use validator::validate;
