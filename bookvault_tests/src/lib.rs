//! System and load tests for a running bookvault deployment. Both suites
//! talk to a live server over HTTP and are disabled unless the matching
//! feature is enabled.


#[cfg(all(test, feature = "system_tests"))]
mod system_tests;
