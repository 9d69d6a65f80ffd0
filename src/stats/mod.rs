pub mod file;
pub mod http;
pub mod provider;
pub mod table;

pub use file::FileStatProvider;
pub use http::HttpStatProvider;
pub use provider::StatProvider;
pub use table::StatTable;
