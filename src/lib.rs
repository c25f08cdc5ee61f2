#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;

#[macro_use]
pub mod error;
#[macro_use]
pub mod assertion;
#[macro_use]
pub mod graphics;
#[macro_use]
pub mod check;

pub mod averror;
pub mod config;
pub mod domain;
pub mod prelude;
pub mod scope;
