#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod balancer;
pub mod cache;
pub mod collector;
pub mod component;
pub mod config;
pub mod error;
pub mod error_passer;
pub mod job;
pub mod listener;
pub mod middleware;
pub mod panic_handler;
pub mod router;
pub mod session;
pub mod storage;
mod utility;
pub mod writer;

pub use error::{Error, Result};
