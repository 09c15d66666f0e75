// src/handlers/mod.rs

pub mod admin;
pub mod answer;
pub mod auth;
pub mod package;
pub mod question;
