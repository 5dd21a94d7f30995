pub mod claude;
pub mod schema;
pub mod util;

pub use claude::Claude;
pub use schema::StructuredOutput;
