pub mod psychologist;
pub mod student;
