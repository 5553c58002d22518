pub mod bench_support;

pub use storage_quota_monitor;
