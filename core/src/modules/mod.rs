pub mod attachments;
pub mod comments;
pub mod hacktivity;
pub mod renderer;
