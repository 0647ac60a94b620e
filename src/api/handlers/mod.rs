pub mod forms;
pub mod galleries;
pub mod health;
pub mod media;
