/// Unit tests over the public crate surface
mod engine_tests;
