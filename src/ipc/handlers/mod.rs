pub mod backup;
pub mod classes;
pub mod core;
pub mod groups;
pub mod homework;
pub mod seating;
pub mod settings;
pub mod students;
pub mod sync;
