mod engagements;
mod follows;
mod ingredients;
mod recipes;
mod tags;
mod users;

pub use engagements::*;
pub use follows::*;
pub use ingredients::*;
pub use recipes::*;
pub use tags::*;
pub use users::*;
