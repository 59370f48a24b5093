pub mod access;
pub mod check;
pub mod completion;
pub mod init;
pub mod item;
pub mod prereq;
