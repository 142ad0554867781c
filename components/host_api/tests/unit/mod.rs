//! Unit test runner for host_api

mod test_buffer;
mod test_handles;
mod test_value;
