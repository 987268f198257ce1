pub mod feed;
pub mod repos;
pub mod status;
