mod command;
pub use command::*;
mod framer;
pub use framer::*;
mod ingest;
pub use ingest::*;
mod session;
pub use session::*;
