//! Contract tests for quickjs_runtime
//!
//! Each module pins one guarantee the runtime makes to its host: values
//! survive the trip into the engine and back, handles balance their
//! references, proxies keep their identity, errors cross the boundary only
//! when typed, and the bytecode cache is transparent to scripts.

mod test_contract_compliance;
