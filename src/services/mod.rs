pub mod background;
pub mod converter;
pub mod estimator;
pub mod imaging;
pub mod mailer;
pub mod media;
pub mod pdf;
pub mod process;
pub mod scratch;
pub mod storage;
pub mod tools;
