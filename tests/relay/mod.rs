//! Relay module tests.

mod runner_test;
