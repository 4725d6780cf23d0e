mod exchange;
mod project;
mod user;

pub use exchange::*;
pub use project::*;
pub use user::*;
