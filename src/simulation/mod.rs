pub mod catalog;
pub mod generator;
pub mod responder;
