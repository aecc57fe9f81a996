pub mod cli;
pub mod decode;
pub mod error;
pub mod fetch;
pub mod importer;

pub mod util {
    pub mod db;
    pub mod env;
}

pub use error::ImportError;
