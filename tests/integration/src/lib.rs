//! End-to-end tests for login-broker live in `tests/`.
