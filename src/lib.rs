#![no_std]
extern crate alloc;

pub mod common;
pub mod cursor;
pub mod decode;
pub mod encode;
pub mod error;
pub mod schema;
pub mod unordered_map;
