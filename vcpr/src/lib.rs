#![warn(unused_extern_crates)]
#![allow(clippy::missing_errors_doc)]
pub mod error;
pub mod json;
pub mod perforce;
pub mod report;
pub mod ux;

use std::fmt::Display;

use vcpp::Consume;

#[macro_use]
extern crate prettytable;

/// A consumer whose collected results can be printed after the scan
pub trait ConsumeDisplay: Consume + Display {}

impl<T: Consume + Display> ConsumeDisplay for T {}
