pub mod extract;
pub mod info;
pub mod inspect;
pub mod list;
