pub mod assets;
pub mod local_store;
pub mod logging;
pub mod response;
