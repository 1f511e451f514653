mod connection;
pub(crate) mod schema;
mod sink;

pub use connection::Database;
pub use sink::{ExtractionRecord, LibSqlSink, ResultSink};
