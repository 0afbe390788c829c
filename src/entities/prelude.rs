pub use super::tools::Entity as Tools;
