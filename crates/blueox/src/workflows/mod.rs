pub mod admin;
pub mod applications;
pub mod conversation;
pub mod jobs;
pub mod matching;
