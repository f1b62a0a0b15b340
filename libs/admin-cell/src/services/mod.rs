pub mod approval;
pub mod users;
