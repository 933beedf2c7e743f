pub use comment::*;
pub use like::*;
pub use timestamp::*;
pub use user::*;
pub use video::*;

mod comment;
mod like;
mod timestamp;
mod user;
mod video;
