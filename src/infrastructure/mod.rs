pub mod audio;
pub mod observability;
pub mod persistence;
pub mod storage;
pub mod vendors;
