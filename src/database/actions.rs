mod ingredients;
mod memberships;
mod recipes;
mod tags;
mod users;

pub use ingredients::*;
pub use memberships::*;
pub use recipes::*;
pub use tags::*;
pub use users::*;
