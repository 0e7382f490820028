//! Integration tests exercising the public crate surface end to end.


pub mod support;
