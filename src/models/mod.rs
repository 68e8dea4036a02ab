pub mod post;
pub mod profile;
pub mod user;

pub use post::Post;
pub use profile::{Gender, Profile};
pub use user::{TokenData, User};
