pub mod file_loader;

pub use file_loader::{load_blueprint, load_pool, load_pools_in_folder};
