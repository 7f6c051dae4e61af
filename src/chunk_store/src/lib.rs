mod chunked_array;
mod pool;
mod store_config;
mod store_layout;
mod store_mgr;

pub use chunked_array::*;
pub use pool::*;
pub use store_config::*;
pub use store_layout::*;
pub use store_mgr::*;

#[cfg(test)]
mod test_store_mgr;
