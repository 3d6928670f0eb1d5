pub mod connection;
pub mod schema;
pub mod submissions;

pub use connection::Database;
