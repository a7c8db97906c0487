pub mod club;
pub mod principal;
