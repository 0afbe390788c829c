pub mod contact;
pub mod converter;
pub mod health;
pub mod media;
pub mod pdf;
pub mod tools;
pub mod upload;
