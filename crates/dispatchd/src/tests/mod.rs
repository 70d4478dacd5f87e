//! Test suites for the dispatch server.

mod support;
