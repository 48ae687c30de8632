//! Storage for generated designs, served back for download

mod store;

pub use store::{ImageData, ImageStore, ImageStoreError};
