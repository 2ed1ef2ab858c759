#![allow(clippy::doc_lazy_continuation)]
#![allow(clippy::len_zero)]
// src/lib.rs

pub mod api;
pub mod audit;
pub mod blockchain;
pub mod cli;
pub mod core;
pub mod tools;
