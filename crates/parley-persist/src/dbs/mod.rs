pub mod kv;
#[cfg(feature = "sql")]
pub mod sql;
