pub mod comment;
pub mod story;
pub mod user;

pub use comment::{Comment, Visibility};
pub use story::Story;
pub use user::User;
