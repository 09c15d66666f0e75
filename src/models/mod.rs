// src/models/mod.rs

pub mod package;
pub mod question;
pub mod student_answer;
pub mod user;
