pub mod attendance;
pub mod calendar;
pub mod leave;
pub mod macros;
pub mod user;

pub use attendance::*;
pub use calendar::*;
pub use leave::*;
pub use user::*;
