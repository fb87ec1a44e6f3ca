//! Core contracts for keyrun: the secret store and the external command runner.
//! Kept free of crypto and process code so both sides can be swapped in tests.

pub mod keystore;
pub mod runner;
